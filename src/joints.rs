//! Joint vocabulary and motion tables
//!
//! The closed set of joints the robot exposes, plus the static limit,
//! velocity and increment tables used to bound and scale operator motions.
//! Not every joint has an entry in every table; lookups return `None` and the
//! caller decides the fallback.

use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One degree of freedom of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JointId {
    #[serde(rename = "joint_head_tilt")]
    HeadTilt,
    #[serde(rename = "joint_head_pan")]
    HeadPan,
    #[serde(rename = "joint_gripper_finger_left")]
    GripperFingerLeft,
    #[serde(rename = "wrist_extension")]
    WristExtension,
    #[serde(rename = "joint_lift")]
    Lift,
    #[serde(rename = "joint_wrist_yaw")]
    WristYaw,
    #[serde(rename = "translate_mobile_base")]
    TranslateMobileBase,
    #[serde(rename = "rotate_mobile_base")]
    RotateMobileBase,
    #[serde(rename = "gripper_aperture")]
    GripperAperture,
    #[serde(rename = "joint_arm_l0")]
    ArmL0,
    #[serde(rename = "joint_arm_l1")]
    ArmL1,
    #[serde(rename = "joint_arm_l2")]
    ArmL2,
    #[serde(rename = "joint_arm_l3")]
    ArmL3,
}

/// Mapping from joint to scalar position. Partial: absent joints are unknown.
pub type RobotPose = BTreeMap<JointId, f64>;

/// `(within_lower_bound, within_upper_bound)`
pub type JointStatePair = (bool, bool);

/// Per-joint limit or collision state. A missing key means no information yet.
pub type JointStateMap = BTreeMap<JointId, JointStatePair>;

impl JointId {
    pub const ALL: [JointId; 13] = [
        JointId::HeadTilt,
        JointId::HeadPan,
        JointId::GripperFingerLeft,
        JointId::WristExtension,
        JointId::Lift,
        JointId::WristYaw,
        JointId::TranslateMobileBase,
        JointId::RotateMobileBase,
        JointId::GripperAperture,
        JointId::ArmL0,
        JointId::ArmL1,
        JointId::ArmL2,
        JointId::ArmL3,
    ];

    /// Wire name of the joint
    pub fn as_str(self) -> &'static str {
        match self {
            JointId::HeadTilt => "joint_head_tilt",
            JointId::HeadPan => "joint_head_pan",
            JointId::GripperFingerLeft => "joint_gripper_finger_left",
            JointId::WristExtension => "wrist_extension",
            JointId::Lift => "joint_lift",
            JointId::WristYaw => "joint_wrist_yaw",
            JointId::TranslateMobileBase => "translate_mobile_base",
            JointId::RotateMobileBase => "rotate_mobile_base",
            JointId::GripperAperture => "gripper_aperture",
            JointId::ArmL0 => "joint_arm_l0",
            JointId::ArmL1 => "joint_arm_l1",
            JointId::ArmL2 => "joint_arm_l2",
            JointId::ArmL3 => "joint_arm_l3",
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        JointId::ALL
            .iter()
            .copied()
            .find(|joint| joint.as_str() == s)
            .ok_or_else(|| BridgeError::UnknownVariant(format!("joint '{}'", s)))
    }
}

/// Position limits `[lower, upper]` for a joint
pub fn limits_of(joint: JointId) -> Option<(f64, f64)> {
    match joint {
        JointId::WristExtension => Some((0.0, 0.518)),
        JointId::WristYaw => Some((-1.38, 4.45)),
        JointId::Lift => Some((0.1, 1.05)),
        JointId::TranslateMobileBase => Some((-30.0, 30.0)),
        JointId::RotateMobileBase => Some((-3.14, 3.14)),
        JointId::GripperFingerLeft => Some((-0.375, 0.166)),
        JointId::HeadTilt => Some((-1.67, 0.4)),
        JointId::HeadPan => Some((-4.0, 1.8)),
        _ => None,
    }
}

/// Nominal velocity for continuous motion of a joint
pub fn velocity_of(joint: JointId) -> Option<f64> {
    match joint {
        JointId::HeadTilt | JointId::HeadPan => Some(0.3),
        JointId::WristExtension | JointId::Lift => Some(0.04),
        JointId::WristYaw => Some(0.1),
        JointId::TranslateMobileBase => Some(0.1),
        JointId::RotateMobileBase => Some(0.3),
        _ => None,
    }
}

/// Default step size for incremental moves of a joint
pub fn increment_of(joint: JointId) -> Option<f64> {
    match joint {
        JointId::HeadTilt | JointId::HeadPan => Some(0.1),
        JointId::GripperFingerLeft | JointId::WristExtension | JointId::Lift => Some(0.075),
        JointId::WristYaw => Some(0.2),
        JointId::TranslateMobileBase => Some(0.1),
        JointId::RotateMobileBase => Some(0.2),
        _ => None,
    }
}

/// Clamp `value` into the joint's limits. Joints without limits pass through.
pub fn clamp_to_limits(joint: JointId, value: f64) -> f64 {
    match limits_of(joint) {
        Some((lower, upper)) => value.clamp(lower, upper),
        None => value,
    }
}
