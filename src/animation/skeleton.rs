//! 骨骼数据结构
//!
//! 静止姿态、绑定姿态、关节名称与逆绑定矩阵。构建后不可变。

use bevy_ecs::prelude::*;
use glam::Mat4;

use super::pose::Pose;
use crate::error::{AnimationError, AnimationResult};

// ============================================================================
// 骨骼（Skeleton）
// ============================================================================

/// 骨骼组件
#[derive(Component, Clone, Debug)]
pub struct Skeleton {
    rest_pose: Pose,
    bind_pose: Pose,
    joint_names: Vec<String>,
    /// 绑定姿态全局矩阵的逆（模型空间 -> 关节空间）
    inverse_bind_matrices: Vec<Mat4>,
    /// 父索引是否全部小于子索引
    sorted: bool,
}

impl Skeleton {
    /// 创建骨骼并校验层级
    ///
    /// 三个输入长度必须一致，父索引必须在范围内且不成环。
    /// 父索引不满足 `parent < child` 时只记录警告，之后的矩阵调色板走回溯路径。
    pub fn new(rest_pose: Pose, bind_pose: Pose, joint_names: Vec<String>) -> AnimationResult<Self> {
        let count = rest_pose.len();
        for found in [bind_pose.len(), joint_names.len()] {
            if found != count {
                return Err(AnimationError::JointCountMismatch {
                    expected: count,
                    found,
                });
            }
        }
        validate_hierarchy(&rest_pose)?;
        validate_hierarchy(&bind_pose)?;

        let sorted = rest_pose.is_topologically_sorted() && bind_pose.is_topologically_sorted();
        if !sorted {
            tracing::warn!(
                target: "animation",
                joints = count,
                "Skeleton joints are not ordered parent-before-child; palettes will walk parent chains"
            );
        }

        let inverse_bind_matrices = (0..count)
            .map(|joint| bind_pose.global_transform(joint).to_matrix().inverse())
            .collect();

        tracing::debug!(target: "animation", joints = count, sorted, "Skeleton created");

        Ok(Self {
            rest_pose,
            bind_pose,
            joint_names,
            inverse_bind_matrices,
            sorted,
        })
    }

    /// 绑定姿态与静止姿态相同的骨骼
    pub fn from_rest_pose(rest_pose: Pose, joint_names: Vec<String>) -> AnimationResult<Self> {
        let bind_pose = rest_pose.clone();
        Self::new(rest_pose, bind_pose, joint_names)
    }

    pub fn rest_pose(&self) -> &Pose {
        &self.rest_pose
    }

    pub fn bind_pose(&self) -> &Pose {
        &self.bind_pose
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    pub fn joint_name(&self, joint: usize) -> Option<&str> {
        self.joint_names.get(joint).map(String::as_str)
    }

    /// 获取骨骼数量
    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// 通过名称获取关节索引
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joint_names.iter().position(|n| n == name)
    }

    /// 通过名称获取关节索引，失败返回 [`AnimationError::JointNotFound`]
    pub fn require_joint(&self, name: &str) -> AnimationResult<usize> {
        self.joint_index(name)
            .ok_or_else(|| AnimationError::JointNotFound {
                name: name.to_string(),
            })
    }

    pub fn inverse_bind_matrices(&self) -> &[Mat4] {
        &self.inverse_bind_matrices
    }

    /// 姿态的模型空间矩阵
    pub fn matrix_palette(&self, pose: &Pose, out: &mut Vec<Mat4>) {
        if self.sorted {
            pose.matrix_palette(out);
        } else {
            pose.matrix_palette_unordered(out);
        }
    }

    /// 蒙皮矩阵：`palette[i] * inverse_bind[i]`
    pub fn skin_matrices(&self, pose: &Pose, out: &mut Vec<Mat4>) {
        self.matrix_palette(pose, out);
        for (matrix, inverse_bind) in out.iter_mut().zip(&self.inverse_bind_matrices) {
            *matrix *= *inverse_bind;
        }
    }
}

fn validate_hierarchy(pose: &Pose) -> AnimationResult<()> {
    let count = pose.len();
    for joint in 0..count {
        if let Some(parent) = pose.parent(joint) {
            if parent >= count {
                return Err(AnimationError::InvalidParent { joint, parent });
            }
        }
    }
    for joint in 0..count {
        let mut steps = 0;
        let mut current = pose.parent(joint);
        while let Some(parent) = current {
            steps += 1;
            if steps > count {
                return Err(AnimationError::HierarchyCycle { joint });
            }
            current = pose.parent(parent);
        }
    }
    Ok(())
}
