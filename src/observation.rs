//! Fixed-layout observation vector for the locomotion policy.
//!
//! The layout must match the training-time environment exactly:
//!
//! ```text
//! [0:3)    base linear velocity, body frame
//! [3:6)    base angular velocity, body frame
//! [6:9)    gravity direction, body frame
//! [9:12)   command (vx, vy, wz)
//! [12:49)  joint positions - default pose
//! [49:86)  joint velocities
//! [86:123) previous action
//! ```

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::ops::Range;

use crate::command::CommandVector;
use crate::host::RobotState;

/// Degrees of freedom of the articulation.
pub const NUM_JOINTS: usize = 37;

/// Total observation length.
pub const OBS_DIM: usize = 123;

pub const SEG_LIN_VEL: Range<usize> = 0..3;
pub const SEG_ANG_VEL: Range<usize> = 3..6;
pub const SEG_GRAVITY: Range<usize> = 6..9;
pub const SEG_COMMAND: Range<usize> = 9..12;
pub const SEG_JOINT_POS: Range<usize> = 12..49;
pub const SEG_JOINT_VEL: Range<usize> = 49..86;
pub const SEG_PREV_ACTION: Range<usize> = 86..123;

/// Build the policy observation from a state snapshot.
///
/// Pure transform, no side effects. The snapshot must come from an
/// initialized articulation; `previous_action` and `default_pose` must
/// both have `NUM_JOINTS` entries.
pub fn build_observation(
    state: &RobotState,
    command: CommandVector,
    previous_action: &[f64],
    default_pose: &[f64],
) -> Vec<f64> {
    debug_assert_eq!(state.joint_positions.len(), NUM_JOINTS);
    debug_assert_eq!(state.joint_velocities.len(), NUM_JOINTS);
    debug_assert_eq!(previous_action.len(), NUM_JOINTS);
    debug_assert_eq!(default_pose.len(), NUM_JOINTS);

    let [w, x, y, z] = state.orientation;
    // q_ib rotates body to world; the inverse transform is R_BI = R_IB^T.
    let q_ib = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));

    let lin_vel_b = q_ib.inverse_transform_vector(&Vector3::from(state.linear_velocity));
    let ang_vel_b = q_ib.inverse_transform_vector(&Vector3::from(state.angular_velocity));
    let gravity_b = q_ib.inverse_transform_vector(&Vector3::new(0.0, 0.0, -1.0));

    let mut obs = vec![0.0; OBS_DIM];
    obs[SEG_LIN_VEL].copy_from_slice(lin_vel_b.as_slice());
    obs[SEG_ANG_VEL].copy_from_slice(ang_vel_b.as_slice());
    obs[SEG_GRAVITY].copy_from_slice(gravity_b.as_slice());
    obs[SEG_COMMAND].copy_from_slice(&[command.vx, command.vy, command.wz]);
    for (slot, (&pos, &home)) in obs[SEG_JOINT_POS]
        .iter_mut()
        .zip(state.joint_positions.iter().zip(default_pose.iter()))
    {
        *slot = pos - home;
    }
    obs[SEG_JOINT_VEL].copy_from_slice(&state.joint_velocities);
    obs[SEG_PREV_ACTION].copy_from_slice(previous_action);
    obs
}
