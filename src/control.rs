//! Control surface: rotary knobs driven by pointer drags, plus the
//! keyboard shortcut map.
//!
//! Knobs only compute values; applying them to the graph is the caller's
//! job, done synchronously with each accepted change.

use serde::{Deserialize, Serialize};

use crate::effects::{LowcutStep, FILTER_CENTER};

pub const DEFAULT_SENSITIVITY: f64 = 0.15;
/// The filter knob snaps to centre within this distance.
pub const SNAP_RADIUS: f64 = 3.0;
pub const ROTATION_MIN_DEG: f64 = -135.0;
pub const ROTATION_RANGE_DEG: f64 = 270.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Knob {
    Filter,
    Reverb,
}

impl Knob {
    /// Value restored by a double activation.
    pub fn default_value(self) -> u8 {
        match self {
            Knob::Filter => FILTER_CENTER,
            Knob::Reverb => 0,
        }
    }
}

/// Value for a drag that started at `start_value` and has moved by
/// `(dx, dy)` pixels. Right and up increase.
pub fn knob_drag_value(knob: Knob, start_value: u8, dx: f64, dy: f64, sensitivity: f64) -> u8 {
    let delta = (dx - dy) * sensitivity;
    let mut value = (start_value as f64 + delta).round();
    if knob == Knob::Filter && (value - FILTER_CENTER as f64).abs() <= SNAP_RADIUS {
        value = FILTER_CENTER as f64;
    }
    value.clamp(0.0, 100.0) as u8
}

/// Indicator angle in degrees for a knob value.
pub fn knob_rotation(value: u8) -> f64 {
    ROTATION_MIN_DEG + value.min(100) as f64 / 100.0 * ROTATION_RANGE_DEG
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { knob: Knob, x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
    Leave,
    DoubleActivate { knob: Knob },
}

/// An accepted knob value, ready to render and apply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnobChange {
    pub knob: Knob,
    pub value: u8,
    pub rotation: f64,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    knob: Knob,
    start_x: f64,
    start_y: f64,
    start_value: u8,
}

#[derive(Debug, Clone)]
pub struct ControlSurface {
    sensitivity: f64,
    filter: u8,
    reverb: u8,
    drag: Option<Drag>,
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVITY)
    }
}

impl ControlSurface {
    pub fn new(sensitivity: f64) -> Self {
        ControlSurface {
            sensitivity,
            filter: Knob::Filter.default_value(),
            reverb: Knob::Reverb.default_value(),
            drag: None,
        }
    }

    pub fn value(&self, knob: Knob) -> u8 {
        match knob {
            Knob::Filter => self.filter,
            Knob::Reverb => self.reverb,
        }
    }

    pub fn rotation(&self, knob: Knob) -> f64 {
        knob_rotation(self.value(knob))
    }

    pub fn is_tracking(&self) -> bool {
        self.drag.is_some()
    }

    fn slot(&mut self, knob: Knob) -> &mut u8 {
        match knob {
            Knob::Filter => &mut self.filter,
            Knob::Reverb => &mut self.reverb,
        }
    }

    fn change(knob: Knob, value: u8) -> KnobChange {
        KnobChange {
            knob,
            value,
            rotation: knob_rotation(value),
        }
    }

    /// Set a knob directly (slider input, keyboard). `None` when the value
    /// did not change.
    pub fn set_value(&mut self, knob: Knob, value: u8) -> Option<KnobChange> {
        let value = value.min(100);
        let slot = self.slot(knob);
        if *slot == value {
            return None;
        }
        *slot = value;
        Some(Self::change(knob, value))
    }

    /// Put a knob back to its default. Always reports, so the caller
    /// reapplies it even if the value was already there.
    pub fn reset(&mut self, knob: Knob) -> KnobChange {
        let value = knob.default_value();
        *self.slot(knob) = value;
        Self::change(knob, value)
    }

    /// Both knobs to defaults without reporting (new track).
    pub fn reset_all(&mut self) {
        self.filter = Knob::Filter.default_value();
        self.reverb = Knob::Reverb.default_value();
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<KnobChange> {
        match event {
            PointerEvent::Down { knob, x, y } => {
                self.drag = Some(Drag {
                    knob,
                    start_x: x,
                    start_y: y,
                    start_value: self.value(knob),
                });
                None
            }
            PointerEvent::Move { x, y } => {
                let drag = self.drag?;
                let value = knob_drag_value(
                    drag.knob,
                    drag.start_value,
                    x - drag.start_x,
                    y - drag.start_y,
                    self.sensitivity,
                );
                self.set_value(drag.knob, value)
            }
            PointerEvent::Up | PointerEvent::Leave => {
                self.drag = None;
                None
            }
            PointerEvent::DoubleActivate { knob } => Some(self.reset(knob)),
        }
    }
}

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCommand {
    TogglePlayback,
    ToggleTheme,
    ResetKnob(Knob),
    ToggleFilter,
    ToggleReverb,
    /// Volume change in percent points.
    Volume(i8),
    /// Filter knob change in knob units.
    Filter(i8),
    Lowcut(LowcutStep),
}

/// Map a `KeyboardEvent.code` to a command. Keys typed into a text field
/// are never shortcuts.
pub fn key_command(code: &str, in_text_input: bool) -> Option<KeyCommand> {
    if in_text_input {
        return None;
    }
    let command = match code {
        "Space" => KeyCommand::TogglePlayback,
        "KeyT" => KeyCommand::ToggleTheme,
        "KeyR" => KeyCommand::ResetKnob(Knob::Filter),
        "KeyB" => KeyCommand::ResetKnob(Knob::Reverb),
        "KeyF" => KeyCommand::ToggleFilter,
        "KeyV" => KeyCommand::ToggleReverb,
        "ArrowUp" => KeyCommand::Volume(5),
        "ArrowDown" => KeyCommand::Volume(-5),
        "ArrowRight" => KeyCommand::Filter(2),
        "ArrowLeft" => KeyCommand::Filter(-2),
        "BracketRight" => KeyCommand::Lowcut(LowcutStep::Up),
        "BracketLeft" => KeyCommand::Lowcut(LowcutStep::Down),
        _ => return None,
    };
    Some(command)
}

/// Add a signed step to a 0–100 value, saturating at the ends.
pub fn nudge(value: u8, step: i8) -> u8 {
    (value as i16 + step as i16).clamp(0, 100) as u8
}
