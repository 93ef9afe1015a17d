//! 腿部 IK
//!
//! 把骨骼上的 髋 -> 膝 -> 踝 三个关节绑定到一条 FABRIK 链，
//! 求解结果写回姿态副本。脚钉权重由剪辑库中的
//! [`FootPins`](crate::animation::FootPins) 提供，腿部本身不保存。

use glam::Vec3;

use super::constraints::correct_backward_knee;
use super::fabrik::FabrikSolver;
use crate::animation::pose::Pose;
use crate::animation::skeleton::Skeleton;
use crate::animation::transform::Transform;
use crate::config::LegConfig;
use crate::error::{AnimationError, AnimationResult};

/// 三关节腿部 IK
#[derive(Debug, Clone)]
pub struct IkLeg {
    solver: FabrikSolver,
    adjusted_pose: Pose,
    hip: usize,
    knee: usize,
    ankle: usize,
    toe: Option<usize>,
    ankle_to_ground_offset: f32,
    knee_forward: Vec3,
    correct_backward_knee: bool,
}

impl IkLeg {
    /// 按关节名称绑定腿部
    ///
    /// 名称找不到时返回 [`AnimationError::JointNotFound`]；
    /// 膝关节的父关节不是髋、或踝关节的父关节不是膝时返回 [`AnimationError::InvalidChain`]。
    pub fn new(
        skeleton: &Skeleton,
        hip: &str,
        knee: &str,
        ankle: &str,
        toe: Option<&str>,
        config: &LegConfig,
    ) -> AnimationResult<Self> {
        let hip_index = skeleton.require_joint(hip)?;
        let knee_index = skeleton.require_joint(knee)?;
        let ankle_index = skeleton.require_joint(ankle)?;
        let toe_index = toe.map(|name| skeleton.require_joint(name)).transpose()?;

        let rest = skeleton.rest_pose();
        if rest.parent(knee_index) != Some(hip_index) {
            return Err(AnimationError::InvalidChain(format!(
                "{knee} is not a child of {hip}"
            )));
        }
        if rest.parent(ankle_index) != Some(knee_index) {
            return Err(AnimationError::InvalidChain(format!(
                "{ankle} is not a child of {knee}"
            )));
        }
        if let Some(toe_index) = toe_index {
            if !rest.is_in_hierarchy(ankle_index, toe_index) || toe_index == ankle_index {
                return Err(AnimationError::InvalidChain(format!(
                    "toe joint is not below {ankle}"
                )));
            }
        }

        let solver = FabrikSolver::from_config(&config.solver())
            .with_chain(vec![Transform::IDENTITY; 3]);

        tracing::debug!(
            target: "ik",
            hip = hip_index,
            knee = knee_index,
            ankle = ankle_index,
            "Leg bound"
        );

        Ok(Self {
            solver,
            adjusted_pose: rest.clone(),
            hip: hip_index,
            knee: knee_index,
            ankle: ankle_index,
            toe: toe_index,
            ankle_to_ground_offset: config.ankle_to_ground_offset,
            knee_forward: config.knee_forward,
            correct_backward_knee: config.correct_backward_knee,
        })
    }

    /// 把踝关节移动到 `ankle_target`（世界空间）
    ///
    /// `model` 为角色的世界变换。目标会上移 `ankle_to_ground_offset`。
    /// 结果写入 [`adjusted_pose`](Self::adjusted_pose)，返回求解器是否收敛。
    pub fn solve_for_leg(&mut self, model: &Transform, pose: &Pose, ankle_target: Vec3) -> bool {
        self.adjusted_pose.clone_from(pose);

        let chain = self.solver.chain_mut();
        chain[0] = Transform::combine(model, &pose.global_transform(self.hip));
        chain[1] = pose.local_transform(self.knee);
        chain[2] = pose.local_transform(self.ankle);

        let forward = model.rotation * self.knee_forward;
        self.solver.set_bend_hint(Some(forward));

        let target = ankle_target + Vec3::Y * self.ankle_to_ground_offset;
        let converged = self.solver.solve(target);

        if self.correct_backward_knee {
            correct_backward_knee(self.solver.chain_mut(), 0, 1, 2, forward);
        }

        let root_world = match pose.parent(self.hip) {
            Some(parent) => Transform::combine(model, &pose.global_transform(parent)),
            None => *model,
        };
        let hip_local = Transform::combine(&root_world.inverse(), &self.solver.local_transform(0));

        self.adjusted_pose.set_local_transform(self.hip, hip_local);
        self.adjusted_pose
            .set_local_transform(self.knee, self.solver.local_transform(1));
        self.adjusted_pose
            .set_local_transform(self.ankle, self.solver.local_transform(2));

        converged
    }

    /// 最近一次求解后的姿态
    pub fn adjusted_pose(&self) -> &Pose {
        &self.adjusted_pose
    }

    pub fn hip(&self) -> usize {
        self.hip
    }

    pub fn knee(&self) -> usize {
        self.knee
    }

    pub fn ankle(&self) -> usize {
        self.ankle
    }

    pub fn toe(&self) -> Option<usize> {
        self.toe
    }

    pub fn ankle_to_ground_offset(&self) -> f32 {
        self.ankle_to_ground_offset
    }

    pub fn set_ankle_to_ground_offset(&mut self, offset: f32) {
        self.ankle_to_ground_offset = offset;
    }

    pub fn solver(&self) -> &FabrikSolver {
        &self.solver
    }
}
