//! Inbound telemetry decoding
//!
//! Turns raw channel payloads into typed [`InboundMessage`] values. Joint maps
//! are decoded leniently: names outside the joint vocabulary are dropped with
//! a warning instead of failing the whole sample.

use crate::command::Transform;
use crate::joints::{JointId, JointStateMap, JointStatePair, RobotPose};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Pose plus limit/collision state from one sensor-loop tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointStateUpdate {
    pub pose: RobotPose,
    pub in_joint_limits: JointStateMap,
    pub in_collision: JointStateMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalName {
    Nav,
    Pose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Success,
    Failure,
}

/// Kind of value carried by a sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorName {
    Effort,
    Transform,
    Value,
}

/// Result report for a navigation or pose goal
#[derive(Debug, Clone, PartialEq)]
pub struct GoalReport {
    pub name: GoalName,
    pub status: GoalStatus,
    pub value: serde_json::Value,
}

/// Raw sensor reading forwarded by the robot
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub subtype: String,
    pub name: SensorName,
    pub value: serde_json::Value,
}

/// Every message the robot may send to the console
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    JointState(JointStateUpdate),
    MapPose(Transform),
    Goal(GoalReport),
    Sensor(SensorReading),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireMessage {
    #[serde(rename = "validJointState")]
    ValidJointState {
        #[serde(rename = "robotPose", default)]
        robot_pose: BTreeMap<String, f64>,
        #[serde(rename = "jointsInLimits", default)]
        joints_in_limits: BTreeMap<String, JointStatePair>,
        #[serde(rename = "jointsInCollision", default)]
        joints_in_collision: BTreeMap<String, JointStatePair>,
    },
    #[serde(rename = "jointState")]
    JointState {
        #[serde(rename = "jointState")]
        joint_state: BTreeMap<String, f64>,
    },
    #[serde(rename = "mapPose")]
    MapPose { transform: Transform },
    #[serde(rename = "goal")]
    Goal {
        name: GoalName,
        status: GoalStatus,
        #[serde(default)]
        value: serde_json::Value,
    },
    #[serde(rename = "sensor")]
    Sensor {
        subtype: String,
        name: SensorName,
        #[serde(default)]
        value: serde_json::Value,
    },
}

/// Keep only entries whose key is a known joint
fn typed_joints<V>(raw: BTreeMap<String, V>, field: &str) -> BTreeMap<JointId, V> {
    raw.into_iter()
        .filter_map(|(name, value)| match name.parse::<JointId>() {
            Ok(joint) => Some((joint, value)),
            Err(_) => {
                warn!("Ignoring unknown joint '{}' in {}", name, field);
                None
            }
        })
        .collect()
}

/// Decode one inbound payload
pub fn decode_message(raw: &str) -> Result<InboundMessage> {
    let message = match serde_json::from_str::<WireMessage>(raw)? {
        WireMessage::ValidJointState {
            robot_pose,
            joints_in_limits,
            joints_in_collision,
        } => InboundMessage::JointState(JointStateUpdate {
            pose: typed_joints(robot_pose, "robotPose"),
            in_joint_limits: typed_joints(joints_in_limits, "jointsInLimits"),
            in_collision: typed_joints(joints_in_collision, "jointsInCollision"),
        }),
        WireMessage::JointState { joint_state } => InboundMessage::JointState(JointStateUpdate {
            pose: typed_joints(joint_state, "jointState"),
            ..JointStateUpdate::default()
        }),
        WireMessage::MapPose { transform } => InboundMessage::MapPose(transform),
        WireMessage::Goal { name, status, value } => {
            InboundMessage::Goal(GoalReport { name, status, value })
        }
        WireMessage::Sensor { subtype, name, value } => {
            InboundMessage::Sensor(SensorReading { subtype, name, value })
        }
    };
    Ok(message)
}
