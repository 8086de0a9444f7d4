//! Teleop Bridge - command/telemetry bridge for a mobile manipulator console
//!
//! This library sits between an operator interface and a real-time data
//! channel to the robot. It has no opinion on the channel itself: commands
//! leave through a single [`Transport::send`] and inbound payloads enter
//! through [`TeleopBridge::handle_inbound`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teleop_bridge::{JointId, JsonLinesTransport, TeleopBridge};
//!
//! fn main() -> teleop_bridge::Result<()> {
//!     let mut bridge = TeleopBridge::new(Arc::new(JsonLinesTransport::new()));
//!
//!     bridge.reconciler_mut().register_observer(|limits, collisions| {
//!         println!("limits changed: {:?}, collisions changed: {:?}", limits, collisions);
//!     });
//!
//!     // Drive forward, keep the motion alive, then stop
//!     let handle = bridge.dispatcher().drive_base(0.1, 0.0)?;
//!     handle.affirm()?;
//!     handle.stop()?;
//!
//!     bridge.dispatcher().incremental_move(JointId::Lift, 0.075)?;
//!     bridge.handle_inbound(r#"{"type": "jointState", "jointState": {"joint_lift": 0.6}}"#);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **joints / command**: closed joint and command vocabulary, motion tables
//! - **TelemetryReconciler**: pose and limit/collision state, change-only notification
//! - **CommandDispatcher**: operator actions to commands, velocity handles
//! - **Transport**: outbound seam (closure, in-memory, JSON lines, zenoh)
//! - **TeleopBridge**: one session wiring the above, inbound routing
//! - **OperatorControls / PoseRecorder / Console**: operator-side features

pub mod bridge;
pub mod command;
pub mod config;
pub mod console;
pub mod controls;
pub mod dispatcher;
pub mod error;
pub mod joints;
pub mod reconciler;
pub mod recorder;
pub mod telemetry;
pub mod transport;

// High-level exports for easy usage
pub use bridge::{InboundOutcome, TeleopBridge};
pub use config::{BridgeConfig, TransportKind};
pub use console::{Console, OperatorInput};
pub use dispatcher::{CommandDispatcher, Motion, VelocityHandle};
pub use error::{BridgeError, Result};
pub use reconciler::TelemetryReconciler;
pub use transport::{FnTransport, JsonLinesTransport, RecordingTransport, Transport};

// Vocabulary exports
pub use command::{Camera, Command, DriveModifier, Pose2D, Quaternion, RobotMode, ToggleKind, Transform, Vector3};
pub use joints::{
    clamp_to_limits, increment_of, limits_of, velocity_of, JointId, JointStateMap, JointStatePair, RobotPose,
};
pub use telemetry::{decode_message, InboundMessage, JointStateUpdate, SensorName};

// Operator-side exports
pub use controls::{ActionMode, KeyboardMode, OperatorControls, VELOCITY_SCALES};
pub use recorder::{PoseRecorder, Recording};

#[cfg(feature = "zenoh-integration")]
pub use transport::ZenohTransport;
