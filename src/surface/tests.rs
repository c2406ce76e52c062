//! Tests for Surface dispatch

use super::*;
use crate::canvas::GridBuffer;
use crate::command::{ActivateCommand, ButtonEvent, ContinuousCommand, ControlValue, TriggerCommand};
use crate::config::{PadIndex, DEFAULT_LAYOUT};
use crate::manager::{View, ViewId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const SHIFT: ControlId = ControlId(1);
const PLAY: ControlId = ControlId(2);
const BROWSE: ControlId = ControlId(6);
const SCENE1: ControlId = ControlId(10);
const KNOB1: ControlId = ControlId(20);
const FADER: ControlId = ControlId(30);

fn make_surface() -> Arc<Surface> {
    Surface::new(Arc::new(DEFAULT_LAYOUT.clone()))
}

/// Records every trigger invocation with the entry point it arrived on
#[derive(Default)]
struct Recorder {
    events: parking_lot::Mutex<Vec<(ButtonEvent, bool)>>,
}

impl Recorder {
    fn events(&self) -> Vec<(ButtonEvent, bool)> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl TriggerCommand for Recorder {
    async fn execute(&self, event: ButtonEvent) {
        self.events.lock().push((event, false));
    }

    async fn execute_shifted(&self, event: ButtonEvent) {
        self.events.lock().push((event, true));
    }
}

#[derive(Default)]
struct ValueRecorder {
    values: parking_lot::Mutex<Vec<ControlValue>>,
}

#[async_trait]
impl ContinuousCommand for ValueRecorder {
    async fn value_change(&self, value: ControlValue) {
        self.values.lock().push(value);
    }
}

#[tokio::test]
async fn down_dispatches_bound_command_exactly_once() {
    let surface = make_surface();
    let bound = Arc::new(Recorder::default());
    let other = Arc::new(Recorder::default());
    surface.bind(SCENE1, bound.clone());
    surface.bind(PLAY, other.clone());

    surface.on_button(SCENE1, true).await;

    assert_eq!(bound.events(), vec![(ButtonEvent::Down, false)]);
    assert!(other.events().is_empty());
}

#[tokio::test]
async fn unbound_control_is_dropped_silently() {
    let surface = make_surface();
    // Must not panic or error
    surface.on_button(ControlId(99), true).await;
    surface.on_button(ControlId(99), false).await;
    surface
        .on_continuous(ControlId(99), ControlValue::Relative(1))
        .await;
}

#[tokio::test]
async fn release_dispatches_up() {
    let surface = make_surface();
    let command = Arc::new(Recorder::default());
    surface.bind(PLAY, command.clone());

    surface.on_button(PLAY, true).await;
    assert!(surface.is_pressed(PLAY));
    surface.on_button(PLAY, false).await;
    assert!(!surface.is_pressed(PLAY));

    assert_eq!(
        command.events(),
        vec![(ButtonEvent::Down, false), (ButtonEvent::Up, false)]
    );
}

#[tokio::test(start_paused = true)]
async fn long_press_fires_once_after_threshold() {
    let surface = make_surface();
    let command = Arc::new(Recorder::default());
    surface.bind(PLAY, command.clone());

    surface.on_button(PLAY, true).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    surface.on_button(PLAY, false).await;

    assert_eq!(
        command.events(),
        vec![
            (ButtonEvent::Down, false),
            (ButtonEvent::Long, false),
            (ButtonEvent::Up, false)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn quick_release_never_fires_long() {
    let surface = make_surface();
    let command = Arc::new(Recorder::default());
    surface.bind(PLAY, command.clone());

    surface.on_button(PLAY, true).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    surface.on_button(PLAY, false).await;
    // Well past the threshold; the aborted timer must stay silent
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(
        command.events(),
        vec![(ButtonEvent::Down, false), (ButtonEvent::Up, false)]
    );
}

#[tokio::test(start_paused = true)]
async fn re_press_does_not_inherit_old_timer() {
    let surface = make_surface();
    let command = Arc::new(Recorder::default());
    surface.bind(PLAY, command.clone());

    surface.on_button(PLAY, true).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    surface.on_button(PLAY, false).await;
    surface.on_button(PLAY, true).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Neither press lasted past the threshold on its own
    let longs = command
        .events()
        .iter()
        .filter(|(e, _)| *e == ButtonEvent::Long)
        .count();
    assert_eq!(longs, 0);
}

#[tokio::test]
async fn shift_layer_binding_wins_while_shift_held() {
    let surface = make_surface();
    let normal = Arc::new(Recorder::default());
    let shifted = Arc::new(Recorder::default());
    surface.bind(PLAY, normal.clone());
    surface.bind_shifted(PLAY, shifted.clone());

    surface.on_button(SHIFT, true).await;
    assert!(surface.is_shift_pressed());
    surface.on_button(PLAY, true).await;
    surface.on_button(PLAY, false).await;
    surface.on_button(SHIFT, false).await;

    surface.on_button(PLAY, true).await;

    // Shift-layer binding got the held press via its normal entry point
    assert_eq!(
        shifted.events(),
        vec![(ButtonEvent::Down, false), (ButtonEvent::Up, false)]
    );
    assert_eq!(normal.events(), vec![(ButtonEvent::Down, false)]);
}

#[tokio::test]
async fn shift_without_dedicated_binding_uses_shifted_entry_point() {
    let surface = make_surface();
    let command = Arc::new(Recorder::default());
    surface.bind(PLAY, command.clone());

    surface.on_button(SHIFT, true).await;
    surface.on_button(PLAY, true).await;

    assert_eq!(command.events(), vec![(ButtonEvent::Down, true)]);
}

#[tokio::test]
async fn shift_state_is_read_at_dispatch_time() {
    let surface = make_surface();
    let command = Arc::new(Recorder::default());
    surface.bind(PLAY, command.clone());

    // Press plain, then press shift before releasing: the UP must see the
    // live shift state, not the state at press time.
    surface.on_button(PLAY, true).await;
    surface.on_button(SHIFT, true).await;
    surface.on_button(PLAY, false).await;

    assert_eq!(
        command.events(),
        vec![(ButtonEvent::Down, false), (ButtonEvent::Up, true)]
    );
}

#[tokio::test]
async fn relative_knob_midi_delivers_signed_deltas() {
    let surface = make_surface();
    let values = Arc::new(ValueRecorder::default());
    surface.bind_continuous(KNOB1, values.clone());

    surface.on_midi(&[0xB0, 71, 2]).await;
    surface.on_midi(&[0xB0, 71, 126]).await;
    surface.on_midi(&[0xB0, 71, 64]).await; // no movement, dropped

    assert_eq!(
        *values.values.lock(),
        vec![ControlValue::Relative(2), ControlValue::Relative(-2)]
    );
}

#[tokio::test]
async fn fader_pitch_bend_delivers_normalized_absolute() {
    let surface = make_surface();
    let values = Arc::new(ValueRecorder::default());
    surface.bind_continuous(FADER, values.clone());

    surface.on_midi(&[0xE0, 0x7F, 0x7F]).await;

    let got = values.values.lock().clone();
    assert_eq!(got.len(), 1);
    match got[0] {
        ControlValue::Absolute(v) => assert!((v - 1.0).abs() < 0.001),
        other => panic!("expected absolute value, got {:?}", other),
    }
}

struct PadRecorder {
    pads: parking_lot::Mutex<Vec<(PadIndex, u8)>>,
}

impl View for PadRecorder {
    fn name(&self) -> &str {
        "pad-recorder"
    }

    fn draw_grid(&self, _grid: &mut GridBuffer) {}

    fn on_grid_note(&self, pad: PadIndex, velocity: u8) {
        self.pads.lock().push((pad, velocity));
    }
}

#[tokio::test]
async fn grid_notes_route_to_active_view() {
    let surface = make_surface();
    let view = Arc::new(PadRecorder {
        pads: parking_lot::Mutex::new(Vec::new()),
    });
    surface.views().register(ViewId::Session, view.clone());

    // Grid channel is 9; note 36 is pad (0,0), note 45 is pad (1,1)
    surface.on_midi(&[0x99, 36, 100]).await;
    surface.on_midi(&[0x99, 45, 64]).await;
    surface.on_midi(&[0x89, 36, 0]).await; // release

    assert_eq!(
        *view.pads.lock(),
        vec![
            (PadIndex { x: 0, y: 0 }, 100),
            (PadIndex { x: 1, y: 1 }, 64),
            (PadIndex { x: 0, y: 0 }, 0),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn held_view_button_previews_and_restores() {
    let surface = make_surface();
    let session = Arc::new(PadRecorder {
        pads: parking_lot::Mutex::new(Vec::new()),
    });
    let browser = Arc::new(PadRecorder {
        pads: parking_lot::Mutex::new(Vec::new()),
    });
    surface.views().register(ViewId::Session, session);
    surface.views().register(ViewId::Browser, browser);
    surface.bind(
        BROWSE,
        Arc::new(ActivateCommand::new(surface.views().clone(), ViewId::Browser)),
    );

    // Hold past the long-press threshold: preview, then back on release
    surface.on_button(BROWSE, true).await;
    assert!(surface.views().is_active(ViewId::Browser));
    tokio::time::sleep(Duration::from_millis(500)).await;
    surface.on_button(BROWSE, false).await;
    assert!(surface.views().is_active(ViewId::Session));
}

#[tokio::test(start_paused = true)]
async fn quick_view_button_press_sticks() {
    let surface = make_surface();
    let session = Arc::new(PadRecorder {
        pads: parking_lot::Mutex::new(Vec::new()),
    });
    let browser = Arc::new(PadRecorder {
        pads: parking_lot::Mutex::new(Vec::new()),
    });
    surface.views().register(ViewId::Session, session);
    surface.views().register(ViewId::Browser, browser);
    surface.bind(
        BROWSE,
        Arc::new(ActivateCommand::new(surface.views().clone(), ViewId::Browser)),
    );

    surface.on_button(BROWSE, true).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    surface.on_button(BROWSE, false).await;
    assert!(surface.views().is_active(ViewId::Browser));
}
