//! IK 关节约束
//!
//! 约束作用于求解器的局部变换链（第 `i` 个关节的父关节为 `i - 1`），
//! 可以在 [`CcdSolver::solve_with`](super::CcdSolver::solve_with) 的回调中逐轮施加，
//! 也可以在求解结束后施加一次。

use glam::{Quat, Vec3};

use super::{chain_global, IK_EPSILON};
use crate::animation::transform::{rotation_between, Transform};

/// 关节约束
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointConstraint {
    /// 铰链：关节只能绕父关节坐标系中的 `axis` 旋转
    Hinge { axis: Vec3 },
    /// 球窝：关节 +Z 方向与父关节 +Z 方向的夹角不超过 `limit` 弧度
    BallSocket { limit: f32 },
}

impl JointConstraint {
    pub fn apply(&self, chain: &mut [Transform], joint: usize) {
        match *self {
            JointConstraint::Hinge { axis } => apply_hinge(chain, joint, axis),
            JointConstraint::BallSocket { limit } => apply_ball_socket(chain, joint, limit),
        }
    }
}

/// 按顺序施加一组 `(关节, 约束)`
pub fn apply_constraints(chain: &mut [Transform], constraints: &[(usize, JointConstraint)]) {
    for (joint, constraint) in constraints {
        if *joint < chain.len() {
            constraint.apply(chain, *joint);
        }
    }
}

fn parent_rotation(chain: &[Transform], joint: usize) -> Quat {
    match joint {
        0 => Quat::IDENTITY,
        _ => chain_global(chain, joint - 1).rotation,
    }
}

/// 在关节处施加世界空间旋转 `rotation`
///
/// 局部旋转更新为 `Rparent⁻¹ · rotation · Rparent · L`，使关节世界旋转变为 `rotation · Rjoint`。
pub fn rotate_joint_world(chain: &mut [Transform], joint: usize, rotation: Quat) {
    let parent = parent_rotation(chain, joint);
    let local = &mut chain[joint];
    local.rotation = (parent.inverse() * rotation * parent * local.rotation).normalize();
}

/// 铰链约束：把关节的铰链轴对齐回父关节的铰链轴
pub fn apply_hinge(chain: &mut [Transform], joint: usize, axis: Vec3) {
    let parent = parent_rotation(chain, joint);
    let current = chain_global(chain, joint).rotation;
    let current_axis = current * axis;
    let desired_axis = parent * axis;
    rotate_joint_world(chain, joint, rotation_between(current_axis, desired_axis));
}

/// 球窝约束：夹角超出 `limit` 时旋转回锥面上（保留扭转）
pub fn apply_ball_socket(chain: &mut [Transform], joint: usize, limit: f32) {
    let parent_dir = parent_rotation(chain, joint) * Vec3::Z;
    let this_dir = chain_global(chain, joint).rotation * Vec3::Z;

    let angle = parent_dir.angle_between(this_dir);
    if angle <= limit {
        return;
    }
    let Some(axis) = parent_dir.cross(this_dir).try_normalize() else {
        return;
    };
    let clamped_dir = Quat::from_axis_angle(axis, limit) * parent_dir;
    rotate_joint_world(chain, joint, rotation_between(this_dir, clamped_dir));
}

/// 修正反向弯曲的膝盖
///
/// 以 `forward`（世界空间）为参考判断膝盖是否位于 髋 -> 踝 连线的后侧；
/// 是则把膝盖镜像到连线另一侧：髋关节转过 `-2α`，膝关节转过 `-2β`（符号随弯曲方向），
/// 踝关节位置保持不变。发生修正时返回 `true`。
pub fn correct_backward_knee(
    chain: &mut [Transform],
    hip: usize,
    knee: usize,
    ankle: usize,
    forward: Vec3,
) -> bool {
    let h = chain_global(chain, hip).position;
    let k = chain_global(chain, knee).position;
    let a = chain_global(chain, ankle).position;

    let hip_to_ankle = a - h;
    let hip_to_knee = k - h;
    let knee_to_ankle = a - k;
    if hip_to_ankle.length_squared() < IK_EPSILON || hip_to_knee.length_squared() < IK_EPSILON {
        return false;
    }

    let bend = hip_to_ankle.cross(hip_to_knee);
    if bend.dot(hip_to_ankle.cross(forward)) >= 0.0 {
        return false;
    }
    let Some(axis) = bend.try_normalize() else {
        return false;
    };

    let alpha = hip_to_ankle.angle_between(hip_to_knee);
    let beta = hip_to_knee.angle_between(knee_to_ankle);
    let sign = hip_to_knee.cross(knee_to_ankle).dot(axis).signum();

    rotate_joint_world(chain, hip, Quat::from_axis_angle(axis, -2.0 * alpha));
    rotate_joint_world(chain, knee, Quat::from_axis_angle(axis, -2.0 * sign * beta));

    tracing::trace!(target: "ik", alpha, beta, "Backward knee corrected");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    /// 髋关节绕 X 转 `theta`，膝关节反向转 `2 theta`
    fn bent_leg(theta: f32) -> Vec<Transform> {
        vec![
            Transform::from_position_rotation(Vec3::ZERO, Quat::from_rotation_x(theta)),
            Transform::from_position_rotation(Vec3::new(0.0, -1.0, 0.0), Quat::from_rotation_x(-2.0 * theta)),
            Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
        ]
    }

    #[test]
    fn test_backward_knee_is_mirrored() {
        let mut chain = bent_leg(0.4);
        let ankle_before = chain_global(&chain, 2).position;
        let knee_before = chain_global(&chain, 1).position;
        assert!(knee_before.z < 0.0);

        assert!(correct_backward_knee(&mut chain, 0, 1, 2, Vec3::Z));

        let knee_after = chain_global(&chain, 1).position;
        let ankle_after = chain_global(&chain, 2).position;
        assert!(ankle_after.abs_diff_eq(ankle_before, 1e-5));
        assert!(knee_after.abs_diff_eq(Vec3::new(0.0, knee_before.y, -knee_before.z), 1e-5));
    }

    #[test]
    fn test_forward_knee_untouched() {
        let mut chain = bent_leg(-0.4);
        let before = chain.clone();
        assert!(!correct_backward_knee(&mut chain, 0, 1, 2, Vec3::Z));
        assert_eq!(chain, before);

        // 伸直的腿没有弯曲方向
        let mut straight = bent_leg(0.0);
        assert!(!correct_backward_knee(&mut straight, 0, 1, 2, Vec3::Z));
    }

    #[test]
    fn test_hinge_removes_off_axis_rotation() {
        let mut chain = vec![
            Transform::from_position_rotation(Vec3::ZERO, Quat::from_rotation_y(0.5)),
            Transform::from_position_rotation(
                Vec3::Y,
                Quat::from_rotation_x(0.7) * Quat::from_rotation_z(0.3),
            ),
        ];
        apply_hinge(&mut chain, 1, Vec3::X);

        let parent = chain_global(&chain, 0).rotation;
        let joint = chain_global(&chain, 1).rotation;
        assert!((joint * Vec3::X).abs_diff_eq(parent * Vec3::X, 1e-5));
    }

    #[test]
    fn test_ball_socket_clamps_cone() {
        let mut chain = vec![
            Transform::IDENTITY,
            Transform::from_position_rotation(Vec3::Y, Quat::from_rotation_x(1.2)),
        ];
        apply_ball_socket(&mut chain, 1, FRAC_PI_4);
        let dir = chain_global(&chain, 1).rotation * Vec3::Z;
        assert!((dir.angle_between(Vec3::Z) - FRAC_PI_4).abs() < 1e-4);

        // 锥内不变
        let mut inside = vec![
            Transform::IDENTITY,
            Transform::from_position_rotation(Vec3::Y, Quat::from_rotation_x(0.3)),
        ];
        let before = inside.clone();
        JointConstraint::BallSocket { limit: FRAC_PI_4 }.apply(&mut inside, 1);
        assert_eq!(inside, before);
    }

    #[test]
    fn test_apply_constraints_skips_out_of_range() {
        let mut chain = vec![Transform::IDENTITY];
        apply_constraints(
            &mut chain,
            &[(3, JointConstraint::Hinge { axis: Vec3::X })],
        );
        assert_eq!(chain, vec![Transform::IDENTITY]);
    }
}
