//! TeleopBridge - one operator session
//!
//! Wires the dispatcher, reconciler, recorder and operator controls around a
//! single transport. Inbound channel payloads enter through
//! [`TeleopBridge::handle_inbound`].

use crate::config::BridgeConfig;
use crate::controls::OperatorControls;
use crate::dispatcher::CommandDispatcher;
use crate::reconciler::TelemetryReconciler;
use crate::recorder::PoseRecorder;
use crate::telemetry::{decode_message, GoalStatus, InboundMessage};
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What an inbound payload did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Joint state applied; `notified` is true when the observer was reached
    JointState { notified: bool },
    MapPose,
    Goal,
    Sensor,
    /// Payload could not be decoded; state left untouched
    Ignored,
}

pub struct TeleopBridge {
    dispatcher: CommandDispatcher,
    reconciler: TelemetryReconciler,
    recorder: PoseRecorder,
    controls: OperatorControls,
}

impl TeleopBridge {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(transport),
            reconciler: TelemetryReconciler::new(),
            recorder: PoseRecorder::new(),
            controls: OperatorControls::default(),
        }
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: &BridgeConfig) -> Self {
        let recorder = match config.recorder.max_recordings() {
            Some(max) => PoseRecorder::with_limit(max),
            None => PoseRecorder::new(),
        };
        Self {
            dispatcher: CommandDispatcher::new(transport),
            reconciler: TelemetryReconciler::new(),
            recorder,
            controls: OperatorControls::new(
                config.controls.velocity_scale(),
                config.controls.action_mode(),
            ),
        }
    }

    /// Decode and route one inbound payload
    ///
    /// A malformed payload is logged and dropped; one bad sample never ends
    /// the session.
    pub fn handle_inbound(&mut self, raw: &str) -> InboundOutcome {
        let message = match decode_message(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring malformed telemetry: {}", e);
                return InboundOutcome::Ignored;
            }
        };
        self.handle_message(message)
    }

    pub fn handle_message(&mut self, message: InboundMessage) -> InboundOutcome {
        match message {
            InboundMessage::JointState(update) => {
                self.recorder.capture(&update.pose);
                let notified = self.reconciler.apply(update);
                InboundOutcome::JointState { notified }
            }
            InboundMessage::MapPose(transform) => {
                self.dispatcher.set_map_pose(transform);
                InboundOutcome::MapPose
            }
            InboundMessage::Goal(report) => {
                match report.status {
                    GoalStatus::Success => info!("{:?} goal succeeded", report.name),
                    GoalStatus::Failure => warn!("{:?} goal failed: {}", report.name, report.value),
                }
                InboundOutcome::Goal
            }
            InboundMessage::Sensor(reading) => {
                debug!("Sensor {}/{:?} = {}", reading.subtype, reading.name, reading.value);
                InboundOutcome::Sensor
            }
        }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn reconciler(&self) -> &TelemetryReconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut TelemetryReconciler {
        &mut self.reconciler
    }

    pub fn recorder(&self) -> &PoseRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut PoseRecorder {
        &mut self.recorder
    }

    pub fn controls(&self) -> &OperatorControls {
        &self.controls
    }

    /// Controls together with the dispatcher they drive
    pub fn controls_mut(&mut self) -> (&mut OperatorControls, &CommandDispatcher) {
        (&mut self.controls, &self.dispatcher)
    }

    /// Play recording `index` through this session's dispatcher
    pub fn play_recording(&self, index: usize) -> crate::Result<usize> {
        self.recorder.load_recording(index, &self.dispatcher)
    }
}
