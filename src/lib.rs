//! gridlink - hardware surface synchronization core
//!
//! Keeps a pad-grid MIDI controller and an external application in sync:
//! incoming hardware events are classified and dispatched to bound commands,
//! and outgoing LED/display state is reconciled against last-sent caches on
//! a fixed-rate flush tick.
//!
//! The pieces compose bottom-up:
//! - [`midi`] is the wire codec, [`config`] the device layout.
//! - [`command`] defines what a control can be bound to; [`manager`] holds
//!   the active view/mode with one level of history and the hold-to-preview
//!   temporary activation.
//! - [`surface`] owns the binding tables and turns raw MIDI into
//!   DOWN/UP/LONG trigger events and continuous value changes, resolving the
//!   shift layer live at dispatch time.
//! - [`reconciler`] diffs desired output state against what the hardware
//!   last received and writes only the difference through [`transport`].
//! - [`follower`] keeps a dependent selection in the application consistent
//!   across navigation, debounced via [`debounce`].
//! - [`host`] is the boundary to the external application; the core consumes
//!   those traits and never implements them.

pub mod canvas;
pub mod command;
pub mod config;
pub mod debounce;
pub mod follower;
pub mod host;
pub mod manager;
pub mod midi;
pub mod reconciler;
pub mod surface;
pub mod transport;

pub use canvas::{GridBuffer, LightState};
pub use command::{ActivateCommand, ButtonEvent, ContinuousCommand, ControlValue, TriggerCommand};
pub use config::{ControlId, PadIndex, SurfaceLayout, DEFAULT_LAYOUT};
pub use follower::SelectionFollower;
pub use manager::{Mode, ModeId, ModeManager, View, ViewId, ViewManager};
pub use reconciler::Reconciler;
pub use surface::Surface;
pub use transport::{MidirTransport, Transport};
