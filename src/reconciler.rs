//! Telemetry Reconciler
//!
//! Holds the last known robot pose and per-joint limit/collision state, and
//! notifies a single observer only when a limit or collision pair actually
//! changes. Telemetry arrives at sensor-loop rate; without the diff every
//! sample would trigger downstream work.
//!
//! There is no sequence number on telemetry, so the stored state is simply
//! the most recent sample: out-of-order delivery overwrites fresh values with
//! stale ones.

use crate::joints::{JointId, JointStateMap, JointStatePair, RobotPose};
use crate::telemetry::JointStateUpdate;
use tracing::debug;

/// Callback receiving `(changed_limit_state, changed_collision_state)`
pub type JointStateObserver = Box<dyn FnMut(&JointStateMap, &JointStateMap) + Send>;

const HEAD_JOINTS: [JointId; 2] = [JointId::HeadTilt, JointId::HeadPan];
const GRIPPER_JOINTS: [JointId; 2] = [JointId::WristYaw, JointId::GripperFingerLeft];
const ARM_JOINTS: [JointId; 2] = [JointId::Lift, JointId::WristExtension];

#[derive(Default)]
pub struct TelemetryReconciler {
    pose: RobotPose,
    in_joint_limits: JointStateMap,
    in_collision: JointStateMap,
    observer: Option<JointStateObserver>,
}

/// Remove entries equal to the stored pair, store the rest
fn retain_changed(stored: &mut JointStateMap, delta: JointStateMap) -> JointStateMap {
    delta
        .into_iter()
        .filter(|(joint, pair)| {
            if stored.get(joint) == Some(pair) {
                false
            } else {
                stored.insert(*joint, *pair);
                true
            }
        })
        .collect()
}

impl TelemetryReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored pose with the incoming snapshot
    pub fn update_pose(&mut self, pose: RobotPose) {
        self.pose = pose;
    }

    /// Diff both deltas against stored state and notify on any change
    ///
    /// Returns `true` when the observer slot was reached with a non-empty
    /// change set (whether or not an observer is registered).
    pub fn update_joint_state(
        &mut self,
        limit_delta: JointStateMap,
        collision_delta: JointStateMap,
    ) -> bool {
        let changed_limits = retain_changed(&mut self.in_joint_limits, limit_delta);
        let changed_collisions = retain_changed(&mut self.in_collision, collision_delta);

        if changed_limits.is_empty() && changed_collisions.is_empty() {
            return false;
        }

        debug!(
            "Joint state changed: limits={:?} collision={:?}",
            changed_limits, changed_collisions
        );
        if let Some(observer) = self.observer.as_mut() {
            observer(&changed_limits, &changed_collisions);
        }
        true
    }

    /// Apply a full decoded update: pose first, then limit/collision diff
    pub fn apply(&mut self, update: JointStateUpdate) -> bool {
        self.update_pose(update.pose);
        self.update_joint_state(update.in_joint_limits, update.in_collision)
    }

    /// Install the observer, replacing any previous one
    pub fn register_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&JointStateMap, &JointStateMap) + Send + 'static,
    {
        if self.observer.is_some() {
            debug!("Replacing joint state observer");
        }
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Subset of the stored pose for the requested subsystems
    ///
    /// Head: tilt and pan. Gripper: wrist yaw and left finger. Arm: lift and
    /// wrist extension. Joints missing from the stored pose are left out.
    pub fn filtered_pose(&self, include_head: bool, include_gripper: bool, include_arm: bool) -> RobotPose {
        let groups = [
            (include_head, &HEAD_JOINTS),
            (include_gripper, &GRIPPER_JOINTS),
            (include_arm, &ARM_JOINTS),
        ];
        groups
            .into_iter()
            .filter(|(included, _)| *included)
            .flat_map(|(_, joints)| joints.iter())
            .filter_map(|joint| self.pose.get(joint).map(|position| (*joint, *position)))
            .collect()
    }

    pub fn pose(&self) -> RobotPose {
        self.pose.clone()
    }

    pub fn limit_state(&self, joint: JointId) -> Option<JointStatePair> {
        self.in_joint_limits.get(&joint).copied()
    }

    pub fn collision_state(&self, joint: JointId) -> Option<JointStatePair> {
        self.in_collision.get(&joint).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<(JointStateMap, JointStateMap)>>>;

    fn observed(reconciler: &mut TelemetryReconciler) -> Calls {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        reconciler.register_observer(move |limits, collisions| {
            sink.lock().unwrap().push((limits.clone(), collisions.clone()));
        });
        calls
    }

    fn states(entries: &[(JointId, JointStatePair)]) -> JointStateMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_identical_update_is_silent() {
        let mut reconciler = TelemetryReconciler::new();
        let calls = observed(&mut reconciler);

        assert!(reconciler.update_joint_state(states(&[(JointId::Lift, (true, true))]), JointStateMap::new()));
        assert!(!reconciler.update_joint_state(states(&[(JointId::Lift, (true, true))]), JointStateMap::new()));

        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_change_reports_only_changed_keys() {
        let mut reconciler = TelemetryReconciler::new();
        reconciler.update_joint_state(
            states(&[(JointId::Lift, (true, true)), (JointId::HeadPan, (true, true))]),
            JointStateMap::new(),
        );
        let calls = observed(&mut reconciler);

        reconciler.update_joint_state(
            states(&[(JointId::Lift, (true, false)), (JointId::HeadPan, (true, true))]),
            JointStateMap::new(),
        );

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, states(&[(JointId::Lift, (true, false))]));
        assert!(calls[0].1.is_empty());
        assert_eq!(reconciler.limit_state(JointId::Lift), Some((true, false)));
    }

    #[test]
    fn test_limit_and_collision_maps_diff_independently() {
        let mut reconciler = TelemetryReconciler::new();
        let calls = observed(&mut reconciler);

        // Same pair in both maps is new to each of them
        reconciler.update_joint_state(
            states(&[(JointId::WristYaw, (true, true))]),
            states(&[(JointId::WristYaw, (true, true))]),
        );
        reconciler.update_joint_state(
            states(&[(JointId::WristYaw, (true, true))]),
            states(&[(JointId::WristYaw, (false, true))]),
        );

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0.len(), 1);
        assert_eq!(calls[0].1.len(), 1);
        assert!(calls[1].0.is_empty());
        assert_eq!(calls[1].1, states(&[(JointId::WristYaw, (false, true))]));
    }

    #[test]
    fn test_absent_key_differs_from_true_true() {
        let mut reconciler = TelemetryReconciler::new();
        assert_eq!(reconciler.limit_state(JointId::HeadTilt), None);
        assert!(reconciler.update_joint_state(states(&[(JointId::HeadTilt, (true, true))]), JointStateMap::new()));
    }

    #[test]
    fn test_empty_update_never_notifies() {
        let mut reconciler = TelemetryReconciler::new();
        let calls = observed(&mut reconciler);
        assert!(!reconciler.update_joint_state(JointStateMap::new(), JointStateMap::new()));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reregistering_replaces_observer() {
        let mut reconciler = TelemetryReconciler::new();
        let first = observed(&mut reconciler);
        let second = observed(&mut reconciler);

        reconciler.update_joint_state(states(&[(JointId::Lift, (false, true))]), JointStateMap::new());

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_state_tracks_without_observer() {
        let mut reconciler = TelemetryReconciler::new();
        reconciler.update_joint_state(states(&[(JointId::Lift, (true, true))]), JointStateMap::new());
        let calls = observed(&mut reconciler);

        reconciler.update_joint_state(states(&[(JointId::Lift, (true, true))]), JointStateMap::new());
        assert!(calls.lock().unwrap().is_empty());

        reconciler.clear_observer();
        assert!(!reconciler.has_observer());
    }

    #[test]
    fn test_filtered_pose_head_only() {
        let mut reconciler = TelemetryReconciler::new();
        let pose: RobotPose = [
            (JointId::HeadTilt, -0.5),
            (JointId::HeadPan, 0.2),
            (JointId::Lift, 0.8),
            (JointId::WristYaw, 1.0),
        ]
        .into_iter()
        .collect();
        reconciler.update_pose(pose);

        let head = reconciler.filtered_pose(true, false, false);
        assert_eq!(head.keys().copied().collect::<Vec<_>>(), vec![JointId::HeadTilt, JointId::HeadPan]);

        let gripper_and_arm = reconciler.filtered_pose(false, true, true);
        assert_eq!(gripper_and_arm.get(&JointId::WristYaw), Some(&1.0));
        assert_eq!(gripper_and_arm.get(&JointId::Lift), Some(&0.8));
        // Missing joints are omitted rather than reported as zero
        assert!(!gripper_and_arm.contains_key(&JointId::GripperFingerLeft));
        assert!(!gripper_and_arm.contains_key(&JointId::WristExtension));

        assert!(reconciler.filtered_pose(false, false, false).is_empty());
    }

    #[test]
    fn test_pose_update_replaces_instead_of_merging() {
        let mut reconciler = TelemetryReconciler::new();
        reconciler.update_pose([(JointId::Lift, 0.3)].into_iter().collect());
        reconciler.update_pose([(JointId::HeadPan, 0.1)].into_iter().collect());

        let pose = reconciler.pose();
        assert_eq!(pose.len(), 1);
        assert!(!pose.contains_key(&JointId::Lift));
    }

    #[test]
    fn test_apply_runs_pose_and_joint_state() {
        let mut reconciler = TelemetryReconciler::new();
        let calls = observed(&mut reconciler);
        let update = JointStateUpdate {
            pose: [(JointId::Lift, 0.4)].into_iter().collect(),
            in_joint_limits: states(&[(JointId::Lift, (true, true))]),
            in_collision: JointStateMap::new(),
        };

        assert!(reconciler.apply(update.clone()));
        assert!(!reconciler.apply(update));
        assert_eq!(reconciler.pose().get(&JointId::Lift), Some(&0.4));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }
}
