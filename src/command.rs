//! Command binding types
//!
//! A command is the unit of behavior a physical control is bound to. Trigger
//! commands receive classified button events; continuous commands receive
//! encoder deltas or normalized absolute values. Commands run on the dispatch
//! task and must not block: they snapshot-read host state and fire
//! asynchronous host mutations only.

use crate::manager::ActivationManager;
use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Classified button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Control was pressed
    Down,
    /// Control was released
    Up,
    /// Control stayed pressed past the long-press threshold; fires at most
    /// once per press, always between Down and Up
    Long,
}

/// Value carried by a continuous control event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    /// Absolute control (fader), normalized to 0.0-1.0
    Absolute(f32),
    /// Relative encoder, signed detent delta
    Relative(i32),
}

/// Command bound to a button-like control.
///
/// `execute_shifted` defaults to the normal entry point so commands that do
/// not care about the shift layer only implement `execute`.
#[async_trait]
pub trait TriggerCommand: Send + Sync {
    async fn execute(&self, event: ButtonEvent);

    async fn execute_shifted(&self, event: ButtonEvent) {
        self.execute(event).await;
    }
}

/// Command bound to a knob or fader.
#[async_trait]
pub trait ContinuousCommand: Send + Sync {
    async fn value_change(&self, value: ControlValue);

    async fn value_change_shifted(&self, value: ControlValue) {
        self.value_change(value).await;
    }
}

/// Ready-made activation command implementing the hold-to-preview pattern
/// on a view or mode manager.
///
/// DOWN activates the target id. If the press lasts into a LONG event the
/// activation is marked temporary, so the UP restores the previous id; a
/// short press leaves the target sticky. One physical button thus serves as
/// both a momentary preview and a toggle, decided by hold duration.
pub struct ActivateCommand<I, H: ?Sized> {
    manager: Arc<ActivationManager<I, H>>,
    id: I,
}

impl<I, H: ?Sized> ActivateCommand<I, H> {
    pub fn new(manager: Arc<ActivationManager<I, H>>, id: I) -> Self {
        Self { manager, id }
    }
}

#[async_trait]
impl<I, H> TriggerCommand for ActivateCommand<I, H>
where
    I: Copy + Eq + Hash + Debug + Send + Sync + 'static,
    H: ?Sized + Send + Sync + 'static,
{
    async fn execute(&self, event: ButtonEvent) {
        match event {
            ButtonEvent::Down => self.manager.set_active(self.id),
            ButtonEvent::Long => self.manager.mark_temporary(),
            ButtonEvent::Up => self.manager.restore_if_temporary(),
        }
    }
}
