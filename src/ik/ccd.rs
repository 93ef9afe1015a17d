//! 循环坐标下降（CCD）求解器

use glam::{Quat, Vec3};

use super::{chain_global, IK_EPSILON};
use crate::animation::transform::{rotation_between, Transform};
use crate::config::SolverConfig;

/// CCD 求解器
///
/// 链上第 `i` 个关节的父关节为 `i - 1`，第一个关节的变换即链根的世界变换。
#[derive(Debug, Clone, PartialEq)]
pub struct CcdSolver {
    chain: Vec<Transform>,
    iterations: u32,
    threshold: f32,
}

impl Default for CcdSolver {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl CcdSolver {
    pub fn new(iterations: u32, threshold: f32) -> Self {
        Self {
            chain: Vec::new(),
            iterations,
            threshold,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(config.iterations, config.threshold)
    }

    pub fn with_chain(mut self, chain: Vec<Transform>) -> Self {
        self.chain = chain;
        self
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn resize(&mut self, size: usize) {
        self.chain.resize(size, Transform::IDENTITY);
    }

    pub fn chain(&self) -> &[Transform] {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut [Transform] {
        &mut self.chain
    }

    pub fn local_transform(&self, index: usize) -> Transform {
        self.chain[index]
    }

    pub fn set_local_transform(&mut self, index: usize, transform: Transform) {
        self.chain[index] = transform;
    }

    pub fn global_transform(&self, index: usize) -> Transform {
        chain_global(&self.chain, index)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.iterations = iterations;
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// 求解，收敛时返回 `true`
    pub fn solve(&mut self, goal: Vec3) -> bool {
        self.solve_with(goal, |_| {})
    }

    /// 求解，每轮迭代结束后调用 `after_iteration`（通常用于施加关节约束）
    pub fn solve_with(&mut self, goal: Vec3, mut after_iteration: impl FnMut(&mut [Transform])) -> bool {
        let size = self.chain.len();
        if size == 0 {
            return false;
        }
        let last = size - 1;
        let threshold_sq = self.threshold * self.threshold;

        if self.effector_distance_sq(goal) < threshold_sq {
            return true;
        }

        for iteration in 0..self.iterations {
            for joint in (0..last).rev() {
                let world = self.global_transform(joint);
                let effector = self.global_transform(last).position;

                let to_effector = effector - world.position;
                let to_goal = goal - world.position;
                let rotation = if to_effector.length_squared() < IK_EPSILON
                    || to_goal.length_squared() < IK_EPSILON
                {
                    Quat::IDENTITY
                } else {
                    rotation_between(to_effector, to_goal)
                };

                // 世界空间旋转换算到关节自身坐标系
                let delta = world.rotation.inverse() * rotation * world.rotation;
                let local = &mut self.chain[joint];
                local.rotation = (local.rotation * delta).normalize();

                if self.effector_distance_sq(goal) < threshold_sq {
                    tracing::trace!(target: "ik", iteration, "CCD converged");
                    return true;
                }
            }
            after_iteration(&mut self.chain);
        }

        tracing::debug!(
            target: "ik",
            iterations = self.iterations,
            distance = self.effector_distance_sq(goal).sqrt(),
            "CCD did not converge"
        );
        false
    }

    fn effector_distance_sq(&self, goal: Vec3) -> f32 {
        match self.chain.len() {
            0 => f32::INFINITY,
            size => (self.global_transform(size - 1).position - goal).length_squared(),
        }
    }
}
