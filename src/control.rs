//! Decimated policy-control loop.
//!
//! The policy runs at `physics_rate / decimation`; between evaluations the
//! last action is held (zero-order hold) and the joint targets are
//! recomputed from it every physics step.

use anyhow::Result;

use crate::command::CommandVector;
use crate::config::EnvConfig;
use crate::host::{Articulation, RobotStateSource};
use crate::observation::{build_observation, NUM_JOINTS};
use crate::policy::Policy;

/// Per-instance control state: step counter plus the held action pair.
pub struct LocomotionController {
    decimation: u32,
    action_scale: f64,
    default_pose: Vec<f64>,
    counter: u64,
    previous_action: Vec<f64>,
    current_action: Vec<f64>,
}

impl LocomotionController {
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            decimation: config.decimation,
            action_scale: config.action_scale,
            default_pose: config.default_pose.clone(),
            counter: 0,
            previous_action: vec![0.0; NUM_JOINTS],
            current_action: vec![0.0; NUM_JOINTS],
        }
    }

    /// One control step, called once per physics step.
    ///
    /// Evaluates the policy on decimation boundaries, recomputes the joint
    /// targets from the held action, and applies them to the articulation.
    pub fn step<R>(
        &mut self,
        dt: f64,
        command: CommandVector,
        robot: &mut R,
        policy: &mut dyn Policy,
    ) -> Result<()>
    where
        R: RobotStateSource + Articulation,
    {
        if self.counter % u64::from(self.decimation) == 0 {
            let state = robot.snapshot();
            let obs = build_observation(&state, command, &self.previous_action, &self.default_pose);
            let action = policy.infer(&obs)?;
            self.previous_action.copy_from_slice(&action);
            self.current_action = action;
        }

        // Recomputed from the held action even on non-evaluation steps.
        let targets: Vec<f64> = self
            .default_pose
            .iter()
            .zip(self.current_action.iter())
            .map(|(&home, &act)| home + act * self.action_scale)
            .collect();
        robot.apply_joint_targets(&targets)?;

        tracing::trace!(counter = self.counter, dt, "control step");
        self.counter += 1;
        Ok(())
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RobotState;

    /// Policy stub that returns a constant-per-call action and counts
    /// invocations.
    struct CountingPolicy {
        calls: u64,
    }

    impl Policy for CountingPolicy {
        fn infer(&mut self, observation: &[f64]) -> Result<Vec<f64>> {
            assert_eq!(observation.len(), crate::observation::OBS_DIM);
            self.calls += 1;
            Ok(vec![self.calls as f64; NUM_JOINTS])
        }
    }

    /// Minimal robot recording every applied target vector.
    struct RecordingRobot {
        applied: Vec<Vec<f64>>,
    }

    impl RobotStateSource for RecordingRobot {
        fn linear_velocity(&self) -> [f64; 3] {
            [0.0; 3]
        }
        fn angular_velocity(&self) -> [f64; 3] {
            [0.0; 3]
        }
        fn world_pose(&self) -> ([f64; 3], [f64; 4]) {
            ([0.0, 0.0, 0.76], [1.0, 0.0, 0.0, 0.0])
        }
        fn joint_positions(&self) -> Vec<f64> {
            vec![0.0; NUM_JOINTS]
        }
        fn joint_velocities(&self) -> Vec<f64> {
            vec![0.0; NUM_JOINTS]
        }
    }

    impl Articulation for RecordingRobot {
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }
        fn apply_joint_targets(&mut self, targets: &[f64]) -> Result<()> {
            self.applied.push(targets.to_vec());
            Ok(())
        }
    }

    fn config_with(decimation: u32, action_scale: f64, home: f64) -> EnvConfig {
        let mut config: EnvConfig = serde_json::from_str("{}").unwrap();
        config.decimation = decimation;
        config.action_scale = action_scale;
        config.default_pose = vec![home; NUM_JOINTS];
        config
    }

    #[test]
    fn policy_runs_only_on_decimation_boundaries() {
        let decimation = 4;
        let config = config_with(decimation, 0.5, 0.0);
        let mut controller = LocomotionController::new(&config);
        let mut policy = CountingPolicy { calls: 0 };
        let mut robot = RecordingRobot { applied: Vec::new() };

        for n in 0..(3 * decimation as u64) {
            let before = policy.calls;
            controller
                .step(0.01, CommandVector::ZERO, &mut robot, &mut policy)
                .unwrap();
            let evaluated = policy.calls > before;
            assert_eq!(evaluated, n % u64::from(decimation) == 0, "step {}", n);
        }
        assert_eq!(policy.calls, 3);
    }

    #[test]
    fn action_is_held_between_evaluations() {
        let decimation = 4;
        let config = config_with(decimation, 0.5, 0.0);
        let mut controller = LocomotionController::new(&config);
        // CountingPolicy output changes on every call, so a target change
        // proves a fresh evaluation.
        let mut policy = CountingPolicy { calls: 0 };
        let mut robot = RecordingRobot { applied: Vec::new() };

        for _ in 0..(2 * decimation as usize) {
            controller
                .step(0.01, CommandVector::ZERO, &mut robot, &mut policy)
                .unwrap();
        }

        let applied = &robot.applied;
        assert_eq!(applied.len(), 2 * decimation as usize);
        // First window holds the first action, second window the second.
        for step in 0..decimation as usize {
            assert_eq!(applied[step], applied[0], "step {}", step);
        }
        for step in decimation as usize..(2 * decimation as usize) {
            assert_eq!(applied[step], applied[decimation as usize], "step {}", step);
        }
        assert_ne!(applied[0], applied[decimation as usize]);
    }

    #[test]
    fn targets_are_default_pose_plus_scaled_action() {
        let decimation = 4;
        let home = 0.3;
        let config = config_with(decimation, 0.5, home);
        let mut controller = LocomotionController::new(&config);
        let mut policy = CountingPolicy { calls: 0 };
        let mut robot = RecordingRobot { applied: Vec::new() };
        let command = CommandVector::new(0.5, 0.0, 0.0);

        for _ in 0..(2 * decimation as usize) {
            controller.step(0.01, command, &mut robot, &mut policy).unwrap();
        }

        // Evaluations happen at steps 0 and 4: actions 1.0 and 2.0.
        for (step, targets) in robot.applied.iter().enumerate() {
            let action = if step < decimation as usize { 1.0 } else { 2.0 };
            for &t in targets {
                assert!((t - (home + action * 0.5)).abs() < 1e-12, "step {}", step);
            }
        }
    }

    #[test]
    fn previous_action_feeds_the_next_observation() {
        // Policy that echoes back what it saw in the previous-action slot.
        struct EchoPolicy {
            seen: Vec<Vec<f64>>,
        }
        impl Policy for EchoPolicy {
            fn infer(&mut self, observation: &[f64]) -> Result<Vec<f64>> {
                self.seen
                    .push(observation[crate::observation::SEG_PREV_ACTION].to_vec());
                Ok(vec![self.seen.len() as f64; NUM_JOINTS])
            }
        }

        let config = config_with(2, 0.5, 0.0);
        let mut controller = LocomotionController::new(&config);
        let mut policy = EchoPolicy { seen: Vec::new() };
        let mut robot = RecordingRobot { applied: Vec::new() };

        for _ in 0..4 {
            controller
                .step(0.01, CommandVector::ZERO, &mut robot, &mut policy)
                .unwrap();
        }

        // First evaluation sees zeros, second sees the first action.
        assert_eq!(policy.seen[0], vec![0.0; NUM_JOINTS]);
        assert_eq!(policy.seen[1], vec![1.0; NUM_JOINTS]);
    }
}
