//! In-memory pose recorder
//!
//! Captures the pose stream while recording, stores named recordings and
//! plays them back as a sequence of pose commands. Nothing is persisted.

use crate::dispatcher::CommandDispatcher;
use crate::joints::RobotPose;
use crate::{BridgeError, Result};
use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub name: String,
    pub recorded_at: DateTime<Utc>,
    pub poses: Vec<RobotPose>,
}

#[derive(Debug, Default)]
pub struct PoseRecorder {
    recordings: Vec<Recording>,
    active: Option<Vec<RobotPose>>,
    max_recordings: Option<usize>,
}

impl PoseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that evicts the oldest recording beyond `max` entries
    pub fn with_limit(max: usize) -> Self {
        Self {
            max_recordings: Some(max),
            ..Self::default()
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Begin a new capture, discarding any unsaved one
    pub fn start_recording(&mut self) {
        info!("Pose recording started");
        self.active = Some(Vec::new());
    }

    /// Append a pose to the active capture. Ignored when not recording;
    /// a pose equal to the previous capture is skipped.
    pub fn capture(&mut self, pose: &RobotPose) {
        if let Some(poses) = self.active.as_mut() {
            if pose.is_empty() || poses.last() == Some(pose) {
                return;
            }
            poses.push(pose.clone());
        }
    }

    /// Finish the active capture and store it under `name`. An existing
    /// recording with the same name is replaced.
    pub fn save_recording(&mut self, name: &str) -> Result<()> {
        let poses = self
            .active
            .take()
            .ok_or_else(|| BridgeError::InvalidState("save requested while not recording".to_string()))?;
        if poses.is_empty() {
            return Err(BridgeError::InvalidState(format!("recording '{}' captured no poses", name)));
        }

        let recording = Recording {
            name: name.to_string(),
            recorded_at: Utc::now(),
            poses,
        };
        info!("Saved recording '{}' with {} poses", name, recording.poses.len());

        match self.recordings.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = recording,
            None => self.recordings.push(recording),
        }
        if let Some(max) = self.max_recordings {
            while self.recordings.len() > max {
                let evicted = self.recordings.remove(0);
                info!("Evicted recording '{}'", evicted.name);
            }
        }
        Ok(())
    }

    pub fn recording_names(&self) -> Vec<String> {
        self.recordings.iter().map(|recording| recording.name.clone()).collect()
    }

    pub fn recording(&self, index: usize) -> Option<&Recording> {
        self.recordings.get(index)
    }

    pub fn delete_recording(&mut self, index: usize) -> Result<Recording> {
        if index >= self.recordings.len() {
            return Err(BridgeError::InvalidState(format!("no recording at index {}", index)));
        }
        Ok(self.recordings.remove(index))
    }

    /// Play a recording back as one pose command per captured pose
    pub fn load_recording(&self, index: usize, dispatcher: &CommandDispatcher) -> Result<usize> {
        let recording = self
            .recordings
            .get(index)
            .ok_or_else(|| BridgeError::InvalidState(format!("no recording at index {}", index)))?;
        info!("Playing recording '{}'", recording.name);
        for pose in &recording.poses {
            dispatcher.set_robot_pose(pose.clone())?;
        }
        Ok(recording.poses.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::joints::JointId;
    use crate::transport::RecordingTransport;
    use std::sync::Arc;

    fn pose(lift: f64) -> RobotPose {
        [(JointId::Lift, lift)].into_iter().collect()
    }

    #[test]
    fn test_capture_requires_active_recording() {
        let mut recorder = PoseRecorder::new();
        recorder.capture(&pose(0.2));
        assert!(matches!(recorder.save_recording("idle"), Err(BridgeError::InvalidState(_))));
    }

    #[test]
    fn test_empty_capture_cannot_be_saved() {
        let mut recorder = PoseRecorder::new();
        recorder.start_recording();
        assert!(matches!(recorder.save_recording("empty"), Err(BridgeError::InvalidState(_))));
        assert!(!recorder.is_recording());
    }

    #[test]
    fn test_record_and_play_back_in_order() {
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = CommandDispatcher::new(transport.clone());
        let mut recorder = PoseRecorder::new();

        recorder.start_recording();
        recorder.capture(&pose(0.2));
        recorder.capture(&pose(0.2));
        recorder.capture(&pose(0.5));
        recorder.save_recording("reach").unwrap();

        assert_eq!(recorder.recording_names(), vec!["reach".to_string()]);
        assert_eq!(recorder.load_recording(0, &dispatcher).unwrap(), 2);
        assert_eq!(
            transport.sent(),
            vec![
                Command::SetRobotPose { pose: pose(0.2) },
                Command::SetRobotPose { pose: pose(0.5) },
            ]
        );
    }

    #[test]
    fn test_same_name_overwrites_and_delete_by_index() {
        let mut recorder = PoseRecorder::new();
        for (name, lift) in [("a", 0.1), ("b", 0.2), ("a", 0.3)] {
            recorder.start_recording();
            recorder.capture(&pose(lift));
            recorder.save_recording(name).unwrap();
        }
        assert_eq!(recorder.recording_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(recorder.recording(0).unwrap().poses, vec![pose(0.3)]);

        let removed = recorder.delete_recording(0).unwrap();
        assert_eq!(removed.name, "a");
        assert!(matches!(recorder.delete_recording(5), Err(BridgeError::InvalidState(_))));
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut recorder = PoseRecorder::with_limit(2);
        for name in ["one", "two", "three"] {
            recorder.start_recording();
            recorder.capture(&pose(0.4));
            recorder.save_recording(name).unwrap();
        }
        assert_eq!(recorder.recording_names(), vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn test_load_unknown_index_is_invalid_state() {
        let dispatcher = CommandDispatcher::new(Arc::new(RecordingTransport::new()));
        let recorder = PoseRecorder::new();
        assert!(matches!(recorder.load_recording(0, &dispatcher), Err(BridgeError::InvalidState(_))));
    }
}
