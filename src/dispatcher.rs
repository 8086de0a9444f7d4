//! CommandDispatcher - operator actions to outbound commands
//!
//! Each operation builds exactly one [`Command`] and hands it to the transport.
//! Continuous motions (base drive, joint jog) return a [`VelocityHandle`] that
//! can stop or re-affirm the motion later, independently of anything else the
//! dispatcher sends in the meantime.

use crate::command::{Camera, Command, Pose2D, RobotMode, ToggleKind, Transform};
use crate::joints::{clamp_to_limits, JointId, RobotPose};
use crate::transport::Transport;
use crate::{BridgeError, Result};
use std::sync::Arc;
use tracing::debug;

/// Motion a velocity handle was created for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Drive { lin_vel: f64, ang_vel: f64 },
    Incremental { joint: JointId, increment: f64 },
}

/// Reject NaN and infinities; JSON would carry them as `null`
fn ensure_finite(what: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BridgeError::InvalidInput(format!("{} must be finite, got {}", what, value)))
    }
}

impl Motion {
    /// Command that starts (or keeps alive) the motion
    pub fn command(&self) -> Command {
        match *self {
            Motion::Drive { lin_vel, ang_vel } => Command::drive(lin_vel, ang_vel),
            Motion::Incremental { joint, increment } => Command::IncrementalMove {
                joint_name: joint,
                increment,
            },
        }
    }

    /// Neutral command for the motion. Drive stops with a typed zero-velocity
    /// drive; joint jogs use the generic stop.
    pub fn stop_command(&self) -> Command {
        match self {
            Motion::Drive { .. } => Command::drive(0.0, 0.0),
            Motion::Incremental { .. } => Command::Stop,
        }
    }
}

/// Control object for one continuous-motion gesture
///
/// Holds only the motion parameters and a shared reference to the send
/// capability. Handles never expire; `stop` does not prevent a later `affirm`.
#[derive(Clone)]
pub struct VelocityHandle {
    motion: Motion,
    transport: Arc<dyn Transport>,
}

impl VelocityHandle {
    pub fn motion(&self) -> Motion {
        self.motion
    }

    /// Send the neutral form of the motion
    pub fn stop(&self) -> Result<()> {
        debug!("Stopping {:?}", self.motion);
        self.transport.send(&self.motion.stop_command())
    }

    /// Re-send the original motion command
    pub fn affirm(&self) -> Result<()> {
        self.transport.send(&self.motion.command())
    }
}

impl std::fmt::Debug for VelocityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VelocityHandle").field("motion", &self.motion).finish()
    }
}

/// Outward-facing command API of the bridge
#[derive(Clone)]
pub struct CommandDispatcher {
    transport: Arc<dyn Transport>,
    map_pose: Transform,
}

impl CommandDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            map_pose: Transform::default(),
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        debug!("Dispatching {} command", command.kind());
        self.transport.send(&command)
    }

    fn start(&self, motion: Motion) -> Result<VelocityHandle> {
        match motion {
            Motion::Drive { lin_vel, ang_vel } => {
                ensure_finite("linear velocity", lin_vel)?;
                ensure_finite("angular velocity", ang_vel)?;
            }
            Motion::Incremental { joint, increment } => ensure_finite(joint.as_str(), increment)?,
        }
        self.send(motion.command())?;
        Ok(VelocityHandle {
            motion,
            transport: Arc::clone(&self.transport),
        })
    }

    /// Drive the mobile base at the given linear and angular velocity
    pub fn drive_base(&self, lin_vel: f64, ang_vel: f64) -> Result<VelocityHandle> {
        self.start(Motion::Drive { lin_vel, ang_vel })
    }

    /// Move one joint by a signed increment
    pub fn incremental_move(&self, joint: JointId, increment: f64) -> Result<VelocityHandle> {
        self.start(Motion::Incremental { joint, increment })
    }

    pub fn set_robot_mode(&self, mode: RobotMode) -> Result<()> {
        self.send(Command::SetRobotMode { modifier: mode })
    }

    pub fn set_camera_perspective(&self, camera: Camera, perspective: &str) -> Result<()> {
        self.send(Command::SetCameraPerspective {
            camera,
            perspective: perspective.to_string(),
        })
    }

    pub fn set_robot_pose(&self, pose: RobotPose) -> Result<()> {
        for (joint, value) in &pose {
            ensure_finite(joint.as_str(), *value)?;
        }
        self.send(Command::SetRobotPose { pose })
    }

    /// Send a single joint to `target`, clamped into its limits when the joint
    /// has any
    pub fn move_joint_bounded(&self, joint: JointId, target: f64) -> Result<()> {
        ensure_finite(joint.as_str(), target)?;
        let bounded = clamp_to_limits(joint, target);
        if bounded != target {
            debug!("Clamped {} target {} to {}", joint, target, bounded);
        }
        let mut pose = RobotPose::new();
        pose.insert(joint, bounded);
        self.set_robot_pose(pose)
    }

    pub fn move_base(&self, pose: Pose2D) -> Result<()> {
        ensure_finite("x", pose.x)?;
        ensure_finite("y", pose.y)?;
        if let Some(theta) = pose.theta {
            ensure_finite("theta", theta)?;
        }
        self.send(Command::MoveBase { pose })
    }

    pub fn set_toggle(&self, kind: ToggleKind, value: bool) -> Result<()> {
        self.send(Command::toggle(kind, value))
    }

    pub fn look_at_gripper(&self) -> Result<()> {
        self.send(Command::LookAtGripper)
    }

    pub fn get_occupancy_grid(&self) -> Result<()> {
        self.send(Command::GetOccupancyGrid)
    }

    /// Store the latest localization transform (last write wins)
    pub fn set_map_pose(&mut self, transform: Transform) {
        debug!("Map pose updated: {:?}", transform);
        self.map_pose = transform;
    }

    pub fn map_pose(&self) -> Transform {
        self.map_pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Quaternion, Vector3};
    use crate::transport::RecordingTransport;
    use serde_json::json;

    fn dispatcher() -> (CommandDispatcher, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        (CommandDispatcher::new(transport.clone()), transport)
    }

    #[test]
    fn test_drive_stop_sends_zero_velocity() {
        let (dispatcher, transport) = dispatcher();
        let handle = dispatcher.drive_base(0.7, -0.3).unwrap();
        handle.stop().unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            serde_json::to_value(&sent[1]).unwrap(),
            json!({"type": "driveBase", "modifier": {"linVel": 0.0, "angVel": 0.0}})
        );
    }

    #[test]
    fn test_drive_affirm_resends_original_velocities() {
        let (dispatcher, transport) = dispatcher();
        let handle = dispatcher.drive_base(0.5, 0.0).unwrap();
        handle.affirm().unwrap();

        assert_eq!(transport.sent(), vec![Command::drive(0.5, 0.0), Command::drive(0.5, 0.0)]);
    }

    #[test]
    fn test_incremental_stop_is_generic() {
        let (dispatcher, transport) = dispatcher();
        let handle = dispatcher.incremental_move(JointId::Lift, 0.075).unwrap();
        handle.stop().unwrap();

        let sent = transport.sent();
        assert_eq!(
            sent[0],
            Command::IncrementalMove { joint_name: JointId::Lift, increment: 0.075 }
        );
        assert_eq!(serde_json::to_value(&sent[1]).unwrap(), json!({"type": "stop"}));
    }

    #[test]
    fn test_handles_are_independent_and_do_not_expire() {
        let (dispatcher, transport) = dispatcher();
        let drive = dispatcher.drive_base(0.1, 0.2).unwrap();
        let jog = dispatcher.incremental_move(JointId::WristYaw, -0.2).unwrap();
        dispatcher.look_at_gripper().unwrap();
        dispatcher.set_robot_mode(RobotMode::Position).unwrap();

        jog.stop().unwrap();
        drive.affirm().unwrap();
        drive.stop().unwrap();
        drive.affirm().unwrap();

        let tail: Vec<Command> = transport.sent().into_iter().skip(4).collect();
        assert_eq!(
            tail,
            vec![
                Command::Stop,
                Command::drive(0.1, 0.2),
                Command::drive(0.0, 0.0),
                Command::drive(0.1, 0.2),
            ]
        );
    }

    #[test]
    fn test_one_shot_operations_send_in_invocation_order() {
        let (dispatcher, transport) = dispatcher();
        dispatcher.set_robot_mode(RobotMode::Navigation).unwrap();
        dispatcher.set_camera_perspective(Camera::Realsense, "gripper").unwrap();
        dispatcher.move_base(Pose2D { x: 1.0, y: -1.0, theta: Some(0.5) }).unwrap();
        dispatcher.set_toggle(ToggleKind::FollowGripper, true).unwrap();
        dispatcher.look_at_gripper().unwrap();
        dispatcher.get_occupancy_grid().unwrap();

        let kinds: Vec<&str> = transport.sent().iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "setRobotMode",
                "setCameraPerspective",
                "moveBase",
                "setFollowGripper",
                "lookAtGripper",
                "getOccupancyGrid",
            ]
        );
    }

    #[test]
    fn test_bounded_move_clamps_to_limits() {
        let (dispatcher, transport) = dispatcher();
        dispatcher.move_joint_bounded(JointId::Lift, 3.0).unwrap();
        dispatcher.move_joint_bounded(JointId::GripperAperture, 3.0).unwrap();

        let sent = transport.sent();
        assert_eq!(
            serde_json::to_value(&sent[0]).unwrap(),
            json!({"type": "setRobotPose", "pose": {"joint_lift": 1.05}})
        );
        assert_eq!(
            serde_json::to_value(&sent[1]).unwrap(),
            json!({"type": "setRobotPose", "pose": {"gripper_aperture": 3.0}})
        );
    }

    #[test]
    fn test_non_finite_values_never_reach_the_wire() {
        let (dispatcher, transport) = dispatcher();
        assert!(matches!(dispatcher.drive_base(f64::NAN, 0.0), Err(BridgeError::InvalidInput(_))));
        assert!(matches!(dispatcher.drive_base(0.1, f64::INFINITY), Err(BridgeError::InvalidInput(_))));
        assert!(matches!(
            dispatcher.incremental_move(JointId::Lift, f64::NEG_INFINITY),
            Err(BridgeError::InvalidInput(_))
        ));
        assert!(matches!(
            dispatcher.move_joint_bounded(JointId::Lift, f64::NAN),
            Err(BridgeError::InvalidInput(_))
        ));
        assert!(matches!(
            dispatcher.move_base(Pose2D { x: 1.0, y: 0.0, theta: Some(f64::NAN) }),
            Err(BridgeError::InvalidInput(_))
        ));
        assert!(transport.is_empty());
    }

    #[test]
    fn test_map_pose_last_write_wins() {
        let (mut dispatcher, transport) = dispatcher();
        assert_eq!(dispatcher.map_pose(), Transform::default());

        let first = Transform {
            translation: Vector3 { x: 1.0, y: 0.0, z: 0.0 },
            rotation: Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 },
        };
        let second = Transform {
            translation: Vector3 { x: 2.0, y: 3.0, z: 0.0 },
            ..first
        };
        dispatcher.set_map_pose(first);
        dispatcher.set_map_pose(second);

        assert_eq!(dispatcher.map_pose(), second);
        assert!(transport.is_empty());
    }
}
