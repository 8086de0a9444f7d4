//! Outbound command vocabulary
//!
//! Every message the console can send to the robot is one variant of
//! [`Command`]. The set is closed: consumers match on it exhaustively, so a new
//! variant fails to compile anywhere it is not handled.

use crate::joints::{JointId, RobotPose};
use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base velocity pair carried by a drive command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveModifier {
    #[serde(rename = "linVel")]
    pub lin_vel: f64,
    #[serde(rename = "angVel")]
    pub ang_vel: f64,
}

/// Operating mode of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotMode {
    Position,
    Navigation,
}

/// Camera whose perspective can be switched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Camera {
    Overhead,
    Realsense,
    Gripper,
}

/// Named boolean switch on the robot side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    FollowGripper,
    DepthSensing,
}

/// Navigation target on the map plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub theta: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Localization transform of the robot in the map frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

/// A single outbound instruction to the robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    DriveBase {
        modifier: DriveModifier,
    },
    IncrementalMove {
        #[serde(rename = "jointName")]
        joint_name: JointId,
        increment: f64,
    },
    Stop,
    SetRobotMode {
        modifier: RobotMode,
    },
    SetCameraPerspective {
        camera: Camera,
        perspective: String,
    },
    SetRobotPose {
        pose: RobotPose,
    },
    MoveBase {
        pose: Pose2D,
    },
    SetFollowGripper {
        toggle: bool,
    },
    SetDepthSensing {
        toggle: bool,
    },
    LookAtGripper,
    GetOccupancyGrid,
}

impl Command {
    pub fn drive(lin_vel: f64, ang_vel: f64) -> Self {
        Command::DriveBase {
            modifier: DriveModifier { lin_vel, ang_vel },
        }
    }

    pub fn toggle(kind: ToggleKind, toggle: bool) -> Self {
        match kind {
            ToggleKind::FollowGripper => Command::SetFollowGripper { toggle },
            ToggleKind::DepthSensing => Command::SetDepthSensing { toggle },
        }
    }

    /// Wire tag of the command
    pub fn kind(&self) -> &'static str {
        match self {
            Command::DriveBase { .. } => "driveBase",
            Command::IncrementalMove { .. } => "incrementalMove",
            Command::Stop => "stop",
            Command::SetRobotMode { .. } => "setRobotMode",
            Command::SetCameraPerspective { .. } => "setCameraPerspective",
            Command::SetRobotPose { .. } => "setRobotPose",
            Command::MoveBase { .. } => "moveBase",
            Command::SetFollowGripper { .. } => "setFollowGripper",
            Command::SetDepthSensing { .. } => "setDepthSensing",
            Command::LookAtGripper => "lookAtGripper",
            Command::GetOccupancyGrid => "getOccupancyGrid",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl FromStr for RobotMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "position" => Ok(RobotMode::Position),
            "navigation" => Ok(RobotMode::Navigation),
            other => Err(BridgeError::UnknownVariant(format!("robot mode '{}'", other))),
        }
    }
}

impl FromStr for Camera {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overhead" => Ok(Camera::Overhead),
            "realsense" => Ok(Camera::Realsense),
            "gripper" => Ok(Camera::Gripper),
            other => Err(BridgeError::UnknownVariant(format!("camera '{}'", other))),
        }
    }
}

impl FromStr for ToggleKind {
    type Err = BridgeError;

    /// Accepts both the console names and the wire tags
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "followGripper" | "setFollowGripper" => Ok(ToggleKind::FollowGripper),
            "depthSensing" | "setDepthSensing" => Ok(ToggleKind::DepthSensing),
            other => Err(BridgeError::UnknownVariant(format!("toggle '{}'", other))),
        }
    }
}

impl fmt::Display for RobotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotMode::Position => f.write_str("position"),
            RobotMode::Navigation => f.write_str("navigation"),
        }
    }
}
