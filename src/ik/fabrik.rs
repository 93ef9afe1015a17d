//! FABRIK（前后向迭代）求解器

use glam::Vec3;

use super::chain_global;
use crate::animation::transform::{rotation_between, Transform};
use crate::config::SolverConfig;

/// 关节到 "根 -> 目标" 直线的距离小于 `链长 * 该比例` 时视为共线
const COLLINEAR_RATIO: f32 = 1e-3;

/// FABRIK 求解器
///
/// 每次求解都从局部变换链重新计算世界位置和骨骼长度，迭代结束后把世界位置还原为局部旋转。
#[derive(Debug, Clone, PartialEq)]
pub struct FabrikSolver {
    chain: Vec<Transform>,
    iterations: u32,
    threshold: f32,
    /// 直链弯曲方向（世界空间）
    bend_hint: Option<Vec3>,
    world_positions: Vec<Vec3>,
    lengths: Vec<f32>,
}

impl Default for FabrikSolver {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl FabrikSolver {
    pub fn new(iterations: u32, threshold: f32) -> Self {
        Self {
            chain: Vec::new(),
            iterations,
            threshold,
            bend_hint: None,
            world_positions: Vec::new(),
            lengths: Vec::new(),
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

    pub fn bend_hint(&self) -> Option<Vec3> {
        self.bend_hint
    }

    /// 设置直链弯曲方向；求解前位于 "根 -> 目标" 直线上的中间关节沿该方向偏移半个骨骼长度
    pub fn set_bend_hint(&mut self, hint: Option<Vec3>) {
        self.bend_hint = hint.and_then(Vec3::try_normalize);
    }

    /// 求解，末端在阈值内时返回 `true`
    pub fn solve(&mut self, goal: Vec3) -> bool {
        let size = self.chain.len();
        if size == 0 {
            return false;
        }
        let last = size - 1;
        let threshold_sq = self.threshold * self.threshold;

        self.chain_to_world();
        if (self.world_positions[last] - goal).length_squared() < threshold_sq {
            return true;
        }
        self.apply_bend_hint(goal);

        let base = self.world_positions[0];
        let mut converged = false;
        for iteration in 0..self.iterations {
            if (self.world_positions[last] - goal).length_squared() < threshold_sq {
                converged = true;
                break;
            }
            self.iterate_backward(goal);
            self.iterate_forward(base);
            if (self.world_positions[last] - goal).length_squared() < threshold_sq {
                tracing::trace!(target: "ik", iteration, "FABRIK converged");
                converged = true;
                break;
            }
        }

        self.world_to_chain();

        if !converged {
            tracing::debug!(
                target: "ik",
                iterations = self.iterations,
                distance = self.world_positions[last].distance(goal),
                "FABRIK did not converge"
            );
        }
        converged
    }

    fn chain_to_world(&mut self) {
        let size = self.chain.len();
        let chain = &self.chain;
        self.world_positions.clear();
        self.world_positions
            .extend((0..size).map(|i| chain_global(chain, i).position));

        self.lengths.clear();
        self.lengths.push(0.0);
        for i in 1..size {
            let length = self.world_positions[i].distance(self.world_positions[i - 1]);
            self.lengths.push(length);
        }
    }

    fn apply_bend_hint(&mut self, goal: Vec3) {
        let Some(hint) = self.bend_hint else {
            return;
        };
        let size = self.world_positions.len();
        if size < 3 {
            return;
        }
        let root = self.world_positions[0];
        let axis = (goal - root).normalize_or_zero();
        for i in 1..size - 1 {
            let offset = self.world_positions[i] - root;
            let perpendicular = offset - axis * offset.dot(axis);
            if perpendicular.length() < COLLINEAR_RATIO * self.lengths[i] {
                self.world_positions[i] += hint * (0.5 * self.lengths[i]);
            }
        }
    }

    /// 末端贴到目标，逐个向根方向放置关节
    fn iterate_backward(&mut self, goal: Vec3) {
        let last = self.world_positions.len() - 1;
        self.world_positions[last] = goal;
        for i in (0..last).rev() {
            let direction = (self.world_positions[i] - self.world_positions[i + 1]).normalize_or_zero();
            self.world_positions[i] = self.world_positions[i + 1] + direction * self.lengths[i + 1];
        }
    }

    /// 根贴回原位，逐个向末端放置关节
    fn iterate_forward(&mut self, base: Vec3) {
        self.world_positions[0] = base;
        for i in 1..self.world_positions.len() {
            let direction = (self.world_positions[i] - self.world_positions[i - 1]).normalize_or_zero();
            self.world_positions[i] = self.world_positions[i - 1] + direction * self.lengths[i];
        }
    }

    /// 把世界位置还原为局部旋转（旋转差在关节自身坐标系中计算）
    fn world_to_chain(&mut self) {
        let size = self.chain.len();
        for i in 0..size.saturating_sub(1) {
            let world = self.global_transform(i);
            let next = self.global_transform(i + 1).position;
            let inverse_rotation = world.rotation.inverse();

            let to_next = inverse_rotation * (next - world.position);
            let to_desired = inverse_rotation * (self.world_positions[i + 1] - world.position);

            let delta = rotation_between(to_next, to_desired);
            let local = &mut self.chain[i];
            local.rotation = (local.rotation * delta).normalize();
        }
    }
}
