//! Operator controls
//!
//! Velocity-scale presets, action modes and the keyboard mode/key map that
//! turn key presses into dispatcher calls. Motion magnitudes come from the
//! joint tables scaled by the selected preset.

use crate::dispatcher::{CommandDispatcher, VelocityHandle};
use crate::joints::{increment_of, velocity_of, JointId};
use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Named velocity preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityScale {
    pub label: &'static str,
    pub scale: f64,
}

pub const VELOCITY_SCALES: [VelocityScale; 5] = [
    VelocityScale { label: "Slowest", scale: 0.2 },
    VelocityScale { label: "Slow", scale: 0.4 },
    VelocityScale { label: "Medium", scale: 0.8 },
    VelocityScale { label: "Fast", scale: 1.2 },
    VelocityScale { label: "Fastest", scale: 1.6 },
];

pub const DEFAULT_VELOCITY_SCALE: f64 = 0.8;

/// Look up a preset by label, ignoring case
pub fn velocity_scale_for(label: &str) -> Result<f64> {
    VELOCITY_SCALES
        .iter()
        .find(|preset| preset.label.eq_ignore_ascii_case(label))
        .map(|preset| preset.scale)
        .ok_or_else(|| BridgeError::UnknownVariant(format!("velocity scale '{}'", label)))
}

/// How a press on a control maps to motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionMode {
    /// One incremental move per press
    #[default]
    StepActuate,
    /// Move while held, stop on release
    PressRelease,
    /// First click starts, second click stops
    ClickClick,
}

impl FromStr for ActionMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "step-actuate" | "step" => Ok(ActionMode::StepActuate),
            "press-release" | "press" => Ok(ActionMode::PressRelease),
            "click-click" | "click" => Ok(ActionMode::ClickClick),
            _ => Err(BridgeError::UnknownVariant(format!("action mode '{}'", s))),
        }
    }
}

/// Which subsystem the letter keys drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardMode {
    Base,
    Wrist,
    Arm,
}

/// Motion bound to a key in the current keyboard mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    /// Base translation, +1 forward
    Translate(f64),
    /// Base rotation, +1 counter-clockwise
    Rotate(f64),
    Jog(JointId, f64),
}

/// Key binding for `mode`. Arrow keys jog the head in every mode.
pub fn key_action(mode: KeyboardMode, key: &str) -> Option<KeyAction> {
    let action = match (key, mode) {
        ("ArrowUp", _) => KeyAction::Jog(JointId::HeadTilt, 1.0),
        ("ArrowDown", _) => KeyAction::Jog(JointId::HeadTilt, -1.0),
        ("ArrowLeft", _) => KeyAction::Jog(JointId::HeadPan, 1.0),
        ("ArrowRight", _) => KeyAction::Jog(JointId::HeadPan, -1.0),

        ("w", KeyboardMode::Base) => KeyAction::Translate(1.0),
        ("s", KeyboardMode::Base) => KeyAction::Translate(-1.0),
        ("a", KeyboardMode::Base) => KeyAction::Rotate(1.0),
        ("d", KeyboardMode::Base) => KeyAction::Rotate(-1.0),

        ("a", KeyboardMode::Wrist) => KeyAction::Jog(JointId::WristYaw, 1.0),
        ("d", KeyboardMode::Wrist) => KeyAction::Jog(JointId::WristYaw, -1.0),
        ("w", KeyboardMode::Wrist) => KeyAction::Jog(JointId::GripperFingerLeft, 1.0),
        ("s", KeyboardMode::Wrist) => KeyAction::Jog(JointId::GripperFingerLeft, -1.0),

        ("w", KeyboardMode::Arm) => KeyAction::Jog(JointId::Lift, 1.0),
        ("s", KeyboardMode::Arm) => KeyAction::Jog(JointId::Lift, -1.0),
        ("a", KeyboardMode::Arm) => KeyAction::Jog(JointId::WristExtension, 1.0),
        ("d", KeyboardMode::Arm) => KeyAction::Jog(JointId::WristExtension, -1.0),

        _ => return None,
    };
    Some(action)
}

/// Operator-side control state: presets, modes and live key handles
#[derive(Debug)]
pub struct OperatorControls {
    velocity_scale: f64,
    action_mode: ActionMode,
    keyboard_mode: KeyboardMode,
    held: BTreeMap<String, VelocityHandle>,
}

impl Default for OperatorControls {
    fn default() -> Self {
        Self::new(DEFAULT_VELOCITY_SCALE, ActionMode::default())
    }
}

impl OperatorControls {
    pub fn new(velocity_scale: f64, action_mode: ActionMode) -> Self {
        Self {
            velocity_scale,
            action_mode,
            keyboard_mode: KeyboardMode::Base,
            held: BTreeMap::new(),
        }
    }

    pub fn velocity_scale(&self) -> f64 {
        self.velocity_scale
    }

    pub fn set_velocity_scale(&mut self, scale: f64) {
        info!("Velocity scale set to {}", scale);
        self.velocity_scale = scale;
    }

    pub fn action_mode(&self) -> ActionMode {
        self.action_mode
    }

    /// Switch action mode; motions held under the old mode are stopped first
    pub fn set_action_mode(&mut self, mode: ActionMode) -> Result<()> {
        if mode != self.action_mode {
            self.stop_all()?;
            info!("Action mode set to {:?}", mode);
            self.action_mode = mode;
        }
        Ok(())
    }

    pub fn keyboard_mode(&self) -> KeyboardMode {
        self.keyboard_mode
    }

    /// Number of motions currently held open by keys
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    fn start(&self, dispatcher: &CommandDispatcher, action: KeyAction) -> Result<Option<VelocityHandle>> {
        let step = self.action_mode == ActionMode::StepActuate;
        let handle = match action {
            KeyAction::Translate(sign) if step => self.jog(dispatcher, JointId::TranslateMobileBase, sign)?,
            KeyAction::Rotate(sign) if step => self.jog(dispatcher, JointId::RotateMobileBase, sign)?,
            KeyAction::Translate(sign) => velocity_of(JointId::TranslateMobileBase)
                .map(|v| dispatcher.drive_base(sign * v * self.velocity_scale, 0.0))
                .transpose()?,
            KeyAction::Rotate(sign) => velocity_of(JointId::RotateMobileBase)
                .map(|v| dispatcher.drive_base(0.0, sign * v * self.velocity_scale))
                .transpose()?,
            KeyAction::Jog(joint, sign) => self.jog(dispatcher, joint, sign)?,
        };
        Ok(handle)
    }

    fn jog(&self, dispatcher: &CommandDispatcher, joint: JointId, sign: f64) -> Result<Option<VelocityHandle>> {
        match increment_of(joint) {
            Some(increment) => Ok(Some(dispatcher.incremental_move(joint, sign * increment * self.velocity_scale)?)),
            None => {
                warn!("No default increment for {}, ignoring key", joint);
                Ok(None)
            }
        }
    }

    /// Handle a key going down. Returns the handle of any motion started.
    pub fn key_press(&mut self, dispatcher: &CommandDispatcher, key: &str) -> Result<Option<VelocityHandle>> {
        let mode = match key {
            "1" => Some(KeyboardMode::Base),
            "2" => Some(KeyboardMode::Wrist),
            "3" => Some(KeyboardMode::Arm),
            _ => None,
        };
        if let Some(mode) = mode {
            info!("{:?} mode enabled", mode);
            self.keyboard_mode = mode;
            return Ok(None);
        }

        let Some(action) = key_action(self.keyboard_mode, key) else {
            debug!("Key '{}' unbound in {:?} mode", key, self.keyboard_mode);
            return Ok(None);
        };

        match self.action_mode {
            ActionMode::StepActuate => self.start(dispatcher, action),
            ActionMode::PressRelease => {
                // Key repeat while held keeps the existing motion alive
                if let Some(handle) = self.held.get(key) {
                    handle.affirm()?;
                    return Ok(Some(handle.clone()));
                }
                let handle = self.start(dispatcher, action)?;
                if let Some(handle) = &handle {
                    self.held.insert(key.to_string(), handle.clone());
                }
                Ok(handle)
            }
            ActionMode::ClickClick => {
                if let Some(handle) = self.held.remove(key) {
                    if let Err(e) = handle.stop() {
                        self.held.insert(key.to_string(), handle);
                        return Err(e);
                    }
                    return Ok(None);
                }
                let handle = self.start(dispatcher, action)?;
                if let Some(handle) = &handle {
                    self.held.insert(key.to_string(), handle.clone());
                }
                Ok(handle)
            }
        }
    }

    /// Handle a key going up. Returns `true` when a held motion was stopped.
    pub fn key_release(&mut self, key: &str) -> Result<bool> {
        if self.action_mode != ActionMode::PressRelease {
            return Ok(false);
        }
        match self.held.remove(key) {
            Some(handle) => {
                if let Err(e) = handle.stop() {
                    self.held.insert(key.to_string(), handle);
                    return Err(e);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stop every motion held open by a key
    ///
    /// Motions whose stop failed stay held; the first error is returned after
    /// every stop was attempted.
    pub fn stop_all(&mut self) -> Result<usize> {
        let held = std::mem::take(&mut self.held);
        let mut stopped = 0;
        let mut first_error = None;
        for (key, handle) in held {
            debug!("Stopping motion held by '{}'", key);
            match handle.stop() {
                Ok(()) => stopped += 1,
                Err(e) => {
                    warn!("Failed to stop motion held by '{}': {}", key, e);
                    first_error.get_or_insert(e);
                    self.held.insert(key, handle);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(stopped),
        }
    }
}
