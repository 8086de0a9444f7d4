//! Line-oriented operator console
//!
//! Parses one operator line into an [`OperatorInput`] and executes it against
//! a [`TeleopBridge`]. Plain verbs map to robot commands; `@`-prefixed verbs
//! are console meta commands (telemetry injection, recordings, status).

use crate::bridge::{InboundOutcome, TeleopBridge};
use crate::command::{Camera, Pose2D, RobotMode, ToggleKind};
use crate::controls::{velocity_scale_for, ActionMode};
use crate::dispatcher::{Motion, VelocityHandle};
use crate::joints::{JointId, RobotPose};
use crate::{BridgeError, Result};
use std::str::FromStr;
use tracing::{info, warn};

pub const HELP: &str = "\
drive <lin> <ang>            drive the base
jog <joint> <increment>      incremental joint move
bounded <joint> <target>     move a joint to a target inside its limits
stop                         stop every live motion
mode position|navigation     set robot mode
camera <camera> <view>       set camera perspective
pose <joint>=<value> ...     set robot pose
movebase <x> <y> [theta]     navigate the base
toggle <switch> on|off       followGripper or depthSensing
lookat                       look at gripper
grid                         request occupancy grid
key <k> / release <k>        keyboard control
speed <label>                velocity preset
action <mode>                step-actuate, press-release or click-click
@telemetry <json>            inject an inbound message
@record / @save <name>       record poses
@recordings                  list recordings
@play <index> / @delete <index>
@status / @help";

/// One parsed operator line
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorInput {
    Drive { lin_vel: f64, ang_vel: f64 },
    Jog { joint: JointId, increment: f64 },
    Bounded { joint: JointId, target: f64 },
    Stop,
    Mode(RobotMode),
    Camera { camera: Camera, perspective: String },
    Pose(RobotPose),
    MoveBase(Pose2D),
    Toggle { kind: ToggleKind, value: bool },
    LookAtGripper,
    OccupancyGrid,
    KeyPress(String),
    KeyRelease(String),
    Speed(f64),
    Action(ActionMode),
    Telemetry(String),
    Record,
    Save(String),
    Recordings,
    Play(usize),
    Delete(usize),
    Status,
    Help,
}

fn arg<'a>(args: &[&'a str], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .copied()
        .ok_or_else(|| BridgeError::InvalidInput(format!("missing {}", what)))
}

fn number<T: FromStr>(args: &[&str], index: usize, what: &str) -> Result<T> {
    let raw = arg(args, index, what)?;
    raw.parse()
        .map_err(|_| BridgeError::InvalidInput(format!("{} '{}' is not a number", what, raw)))
}

/// Parse a float argument; NaN and infinities are rejected
fn real(raw: &str, what: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(BridgeError::InvalidInput(format!("{} '{}' must be finite", what, raw))),
        Err(_) => Err(BridgeError::InvalidInput(format!("{} '{}' is not a number", what, raw))),
    }
}

fn real_arg(args: &[&str], index: usize, what: &str) -> Result<f64> {
    real(arg(args, index, what)?, what)
}

fn switch(raw: &str) -> Result<bool> {
    match raw {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => Err(BridgeError::InvalidInput(format!("expected on/off, got '{}'", other))),
    }
}

impl OperatorInput {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        if head == "@telemetry" {
            let json = rest.trim();
            if json.is_empty() {
                return Err(BridgeError::InvalidInput("missing telemetry payload".to_string()));
            }
            return Ok(OperatorInput::Telemetry(json.to_string()));
        }

        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| BridgeError::InvalidInput("empty line".to_string()))?;
        let args: Vec<&str> = words.collect();

        let input = match verb {
            "drive" => OperatorInput::Drive {
                lin_vel: real_arg(&args, 0, "linear velocity")?,
                ang_vel: real_arg(&args, 1, "angular velocity")?,
            },
            "jog" => OperatorInput::Jog {
                joint: arg(&args, 0, "joint")?.parse()?,
                increment: real_arg(&args, 1, "increment")?,
            },
            "bounded" => OperatorInput::Bounded {
                joint: arg(&args, 0, "joint")?.parse()?,
                target: real_arg(&args, 1, "target")?,
            },
            "stop" => OperatorInput::Stop,
            "mode" => OperatorInput::Mode(arg(&args, 0, "mode")?.parse()?),
            "camera" => OperatorInput::Camera {
                camera: arg(&args, 0, "camera")?.parse()?,
                perspective: arg(&args, 1, "perspective")?.to_string(),
            },
            "pose" => {
                if args.is_empty() {
                    return Err(BridgeError::InvalidInput("pose needs at least one joint=value".to_string()));
                }
                let mut pose = RobotPose::new();
                for pair in &args {
                    let (joint, value) = pair
                        .split_once('=')
                        .ok_or_else(|| BridgeError::InvalidInput(format!("expected joint=value, got '{}'", pair)))?;
                    pose.insert(joint.parse()?, real(value, joint)?);
                }
                OperatorInput::Pose(pose)
            }
            "movebase" => OperatorInput::MoveBase(Pose2D {
                x: real_arg(&args, 0, "x")?,
                y: real_arg(&args, 1, "y")?,
                theta: if args.len() > 2 { Some(real_arg(&args, 2, "theta")?) } else { None },
            }),
            "toggle" => OperatorInput::Toggle {
                kind: arg(&args, 0, "switch")?.parse()?,
                value: switch(arg(&args, 1, "on/off")?)?,
            },
            "lookat" => OperatorInput::LookAtGripper,
            "grid" => OperatorInput::OccupancyGrid,
            "key" => OperatorInput::KeyPress(arg(&args, 0, "key")?.to_string()),
            "release" => OperatorInput::KeyRelease(arg(&args, 0, "key")?.to_string()),
            "speed" => OperatorInput::Speed(velocity_scale_for(arg(&args, 0, "velocity preset")?)?),
            "action" => OperatorInput::Action(arg(&args, 0, "action mode")?.parse()?),
            "@record" => OperatorInput::Record,
            "@save" => OperatorInput::Save(arg(&args, 0, "recording name")?.to_string()),
            "@recordings" => OperatorInput::Recordings,
            "@play" => OperatorInput::Play(number(&args, 0, "recording index")?),
            "@delete" => OperatorInput::Delete(number(&args, 0, "recording index")?),
            "@status" => OperatorInput::Status,
            "@help" => OperatorInput::Help,
            other => return Err(BridgeError::UnknownVariant(format!("command '{}'", other))),
        };
        Ok(input)
    }
}

/// Bridge session plus the motion handles started from the console
pub struct Console {
    bridge: TeleopBridge,
    live: Vec<VelocityHandle>,
}

fn same_target(a: Motion, b: Motion) -> bool {
    match (a, b) {
        (Motion::Drive { .. }, Motion::Drive { .. }) => true,
        (Motion::Incremental { joint: a, .. }, Motion::Incremental { joint: b, .. }) => a == b,
        _ => false,
    }
}

impl Console {
    pub fn new(bridge: TeleopBridge) -> Self {
        Self {
            bridge,
            live: Vec::new(),
        }
    }

    pub fn bridge(&self) -> &TeleopBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut TeleopBridge {
        &mut self.bridge
    }

    pub fn live_motions(&self) -> usize {
        self.live.len() + self.bridge.controls().held_count()
    }

    /// A new motion replaces a live one on the same target
    fn track(&mut self, handle: VelocityHandle) {
        let motion = handle.motion();
        self.live.retain(|live| !same_target(live.motion(), motion));
        self.live.push(handle);
    }

    /// Stop every live motion. With nothing live, the base still gets a
    /// neutral drive command.
    ///
    /// Every handle gets a stop attempt even when an earlier one fails.
    /// Handles whose stop failed stay live and the first error is returned.
    pub fn stop_all(&mut self) -> Result<usize> {
        let mut stopped = 0;
        let mut first_error = None;
        let mut failed = Vec::new();
        for handle in self.live.drain(..) {
            match handle.stop() {
                Ok(()) => stopped += 1,
                Err(e) => {
                    warn!("Failed to stop {:?}: {}", handle.motion(), e);
                    first_error.get_or_insert(e);
                    failed.push(handle);
                }
            }
        }
        self.live = failed;

        let (controls, _) = self.bridge.controls_mut();
        match controls.stop_all() {
            Ok(count) => stopped += count,
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if stopped == 0 {
            self.bridge.dispatcher().drive_base(0.0, 0.0)?;
        }
        Ok(stopped)
    }

    /// Re-send every live console motion
    pub fn affirm_all(&self) -> Result<()> {
        for handle in &self.live {
            handle.affirm()?;
        }
        Ok(())
    }

    pub fn execute_line(&mut self, line: &str) -> Result<String> {
        let input = OperatorInput::parse(line)?;
        self.execute(input)
    }

    /// Apply one operator input and describe what happened
    pub fn execute(&mut self, input: OperatorInput) -> Result<String> {
        let reply = match input {
            OperatorInput::Drive { lin_vel, ang_vel } => {
                let handle = self.bridge.dispatcher().drive_base(lin_vel, ang_vel)?;
                self.track(handle);
                format!("driving lin={} ang={}", lin_vel, ang_vel)
            }
            OperatorInput::Jog { joint, increment } => {
                let handle = self.bridge.dispatcher().incremental_move(joint, increment)?;
                self.track(handle);
                format!("jogging {} by {}", joint, increment)
            }
            OperatorInput::Bounded { joint, target } => {
                self.bridge.dispatcher().move_joint_bounded(joint, target)?;
                format!("moving {} toward {}", joint, target)
            }
            OperatorInput::Stop => format!("stopped {} motion(s)", self.stop_all()?),
            OperatorInput::Mode(mode) => {
                self.bridge.dispatcher().set_robot_mode(mode)?;
                format!("mode {}", mode)
            }
            OperatorInput::Camera { camera, perspective } => {
                self.bridge.dispatcher().set_camera_perspective(camera, &perspective)?;
                format!("{:?} camera set to {}", camera, perspective)
            }
            OperatorInput::Pose(pose) => {
                let joints = pose.len();
                self.bridge.dispatcher().set_robot_pose(pose)?;
                format!("pose sent for {} joint(s)", joints)
            }
            OperatorInput::MoveBase(pose) => {
                self.bridge.dispatcher().move_base(pose)?;
                format!("navigating to ({}, {})", pose.x, pose.y)
            }
            OperatorInput::Toggle { kind, value } => {
                self.bridge.dispatcher().set_toggle(kind, value)?;
                format!("{:?} {}", kind, if value { "on" } else { "off" })
            }
            OperatorInput::LookAtGripper => {
                self.bridge.dispatcher().look_at_gripper()?;
                "looking at gripper".to_string()
            }
            OperatorInput::OccupancyGrid => {
                self.bridge.dispatcher().get_occupancy_grid()?;
                "occupancy grid requested".to_string()
            }
            OperatorInput::KeyPress(key) => {
                let (controls, dispatcher) = self.bridge.controls_mut();
                match controls.key_press(dispatcher, &key)? {
                    Some(handle) => format!("key {} -> {:?}", key, handle.motion()),
                    None => format!("key {} ({:?} mode)", key, controls.keyboard_mode()),
                }
            }
            OperatorInput::KeyRelease(key) => {
                let (controls, _) = self.bridge.controls_mut();
                if controls.key_release(&key)? {
                    format!("released {}", key)
                } else {
                    format!("{} was not held", key)
                }
            }
            OperatorInput::Speed(scale) => {
                let (controls, _) = self.bridge.controls_mut();
                controls.set_velocity_scale(scale);
                format!("velocity scale {}", scale)
            }
            OperatorInput::Action(mode) => {
                let (controls, _) = self.bridge.controls_mut();
                controls.set_action_mode(mode)?;
                format!("action mode {:?}", mode)
            }
            OperatorInput::Telemetry(raw) => match self.bridge.handle_inbound(&raw) {
                InboundOutcome::Ignored => "telemetry ignored".to_string(),
                outcome => format!("telemetry applied: {:?}", outcome),
            },
            OperatorInput::Record => {
                self.bridge.recorder_mut().start_recording();
                "recording".to_string()
            }
            OperatorInput::Save(name) => {
                self.bridge.recorder_mut().save_recording(&name)?;
                format!("saved '{}'", name)
            }
            OperatorInput::Recordings => {
                let names = self.bridge.recorder().recording_names();
                if names.is_empty() {
                    "no recordings".to_string()
                } else {
                    names
                        .iter()
                        .enumerate()
                        .map(|(index, name)| format!("{}: {}", index, name))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            OperatorInput::Play(index) => {
                let poses = self.bridge.play_recording(index)?;
                format!("played {} pose(s)", poses)
            }
            OperatorInput::Delete(index) => {
                let removed = self.bridge.recorder_mut().delete_recording(index)?;
                format!("deleted '{}'", removed.name)
            }
            OperatorInput::Status => self.status()?,
            OperatorInput::Help => HELP.to_string(),
        };
        info!("{}", reply);
        Ok(reply)
    }

    fn status(&self) -> Result<String> {
        let controls = self.bridge.controls();
        let status = serde_json::json!({
            "pose": self.bridge.reconciler().pose(),
            "map_pose": self.bridge.dispatcher().map_pose(),
            "velocity_scale": controls.velocity_scale(),
            "action_mode": controls.action_mode(),
            "keyboard_mode": format!("{:?}", controls.keyboard_mode()),
            "live_motions": self.live_motions(),
            "recording": self.bridge.recorder().is_recording(),
            "recordings": self.bridge.recorder().recording_names(),
        });
        Ok(serde_json::to_string_pretty(&status)?)
    }
}
