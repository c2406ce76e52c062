//! Control surface - resolution of hardware events to commands
//!
//! The Surface composes the binding tables, both activation managers and the
//! Shift modifier. Incoming hardware events are classified (DOWN/UP/LONG for
//! buttons, deltas/absolute values for continuous controls) and dispatched
//! to the command bound for the control on the live shift layer.

mod dispatch;

#[cfg(test)]
mod tests;

use crate::command::{ContinuousCommand, TriggerCommand};
use crate::config::{ControlId, SurfaceLayout};
use crate::manager::{ModeManager, ViewManager};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Binding layer, selected by the live state of the Shift modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Normal,
    Shift,
}

/// One control surface instance: bindings, managers, shift state, pressed
/// set. Owns its managers outright - there are no process-wide registries.
pub struct Surface {
    pub(crate) layout: Arc<SurfaceLayout>,
    pub(crate) views: Arc<ViewManager>,
    pub(crate) modes: Arc<ModeManager>,
    pub(crate) triggers: RwLock<HashMap<(ControlId, Layer), Arc<dyn TriggerCommand>>>,
    pub(crate) continuous: RwLock<HashMap<(ControlId, Layer), Arc<dyn ContinuousCommand>>>,
    /// Currently held controls, each with the press epoch that identifies
    /// this particular press for long-press classification
    pub(crate) pressed: Mutex<HashMap<ControlId, u64>>,
    pub(crate) press_counter: AtomicU64,
    pub(crate) shift_pressed: AtomicBool,
    /// Pending long-press timers, aborted on release
    pub(crate) long_tasks: Mutex<HashMap<ControlId, JoinHandle<()>>>,
}

impl Surface {
    pub fn new(layout: Arc<SurfaceLayout>) -> Arc<Self> {
        Arc::new(Self {
            layout,
            views: Arc::new(ViewManager::new("view")),
            modes: Arc::new(ModeManager::new("mode")),
            triggers: RwLock::new(HashMap::new()),
            continuous: RwLock::new(HashMap::new()),
            pressed: Mutex::new(HashMap::new()),
            press_counter: AtomicU64::new(0),
            shift_pressed: AtomicBool::new(false),
            long_tasks: Mutex::new(HashMap::new()),
        })
    }

    pub fn layout(&self) -> &Arc<SurfaceLayout> {
        &self.layout
    }

    pub fn views(&self) -> &Arc<ViewManager> {
        &self.views
    }

    pub fn modes(&self) -> &Arc<ModeManager> {
        &self.modes
    }

    /// Bind a trigger command on the normal layer
    pub fn bind(&self, control: ControlId, command: Arc<dyn TriggerCommand>) {
        self.bind_layer(control, Layer::Normal, command);
    }

    /// Bind a trigger command on the shift layer
    pub fn bind_shifted(&self, control: ControlId, command: Arc<dyn TriggerCommand>) {
        self.bind_layer(control, Layer::Shift, command);
    }

    fn bind_layer(&self, control: ControlId, layer: Layer, command: Arc<dyn TriggerCommand>) {
        if self
            .triggers
            .write()
            .insert((control, layer), command)
            .is_some()
        {
            warn!("control {} rebound on {:?} layer", control, layer);
        }
    }

    /// Bind a continuous command on the normal layer
    pub fn bind_continuous(&self, control: ControlId, command: Arc<dyn ContinuousCommand>) {
        self.bind_continuous_layer(control, Layer::Normal, command);
    }

    /// Bind a continuous command on the shift layer
    pub fn bind_continuous_shifted(&self, control: ControlId, command: Arc<dyn ContinuousCommand>) {
        self.bind_continuous_layer(control, Layer::Shift, command);
    }

    fn bind_continuous_layer(
        &self,
        control: ControlId,
        layer: Layer,
        command: Arc<dyn ContinuousCommand>,
    ) {
        if self
            .continuous
            .write()
            .insert((control, layer), command)
            .is_some()
        {
            warn!("continuous control {} rebound on {:?} layer", control, layer);
        }
    }

    /// Whether a control is currently held
    pub fn is_pressed(&self, control: ControlId) -> bool {
        self.pressed.lock().contains_key(&control)
    }

    /// Live state of the Shift modifier
    pub fn is_shift_pressed(&self) -> bool {
        self.shift_pressed.load(Ordering::Acquire)
    }
}
