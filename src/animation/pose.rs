//! 骨骼姿态
//!
//! 以关节索引组织的局部变换数组与父关节索引数组。父索引小于子索引时，
//! 矩阵调色板可以单次前向遍历复用父节点结果；不满足该顺序的关节逐个回溯父链。

use glam::Mat4;
use serde::{Deserialize, Serialize};

use super::transform::Transform;
use crate::error::{AnimationError, AnimationResult};

/// 骨骼姿态 - 存储所有关节的局部变换与层级
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    joints: Vec<Transform>,
    parents: Vec<Option<usize>>,
}

impl Pose {
    /// 创建指定关节数的姿态（单位变换，全部为根）
    pub fn new(joint_count: usize) -> Self {
        Self {
            joints: vec![Transform::IDENTITY; joint_count],
            parents: vec![None; joint_count],
        }
    }

    /// 由局部变换与父索引构建
    ///
    /// # Panics
    ///
    /// 两个数组长度不一致时 panic；数据来自外部输入时使用 [`try_from_parts`](Self::try_from_parts)。
    pub fn from_parts(joints: Vec<Transform>, parents: Vec<Option<usize>>) -> Self {
        assert_eq!(
            joints.len(),
            parents.len(),
            "pose joints and parents must have the same length"
        );
        Self { joints, parents }
    }

    /// 由局部变换与父索引构建，长度不一致时返回 [`AnimationError::JointCountMismatch`]
    pub fn try_from_parts(
        joints: Vec<Transform>,
        parents: Vec<Option<usize>>,
    ) -> AnimationResult<Self> {
        if joints.len() != parents.len() {
            return Err(AnimationError::JointCountMismatch {
                expected: joints.len(),
                found: parents.len(),
            });
        }
        Ok(Self { joints, parents })
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// 调整关节数；新增关节为单位变换的根关节
    pub fn resize(&mut self, joint_count: usize) {
        self.joints.resize(joint_count, Transform::IDENTITY);
        self.parents.resize(joint_count, None);
    }

    pub fn parent(&self, joint: usize) -> Option<usize> {
        self.parents[joint]
    }

    pub fn set_parent(&mut self, joint: usize, parent: Option<usize>) {
        debug_assert!(parent.map_or(true, |p| p < self.len()));
        self.parents[joint] = parent;
    }

    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    pub fn local_transform(&self, joint: usize) -> Transform {
        self.joints[joint]
    }

    pub fn set_local_transform(&mut self, joint: usize, transform: Transform) {
        self.joints[joint] = transform;
    }

    pub fn local_transforms(&self) -> &[Transform] {
        &self.joints
    }

    /// 关节的模型空间变换（沿父链逐级组合）
    pub fn global_transform(&self, joint: usize) -> Transform {
        let mut result = self.joints[joint];
        let mut parent = self.parents[joint];
        while let Some(p) = parent {
            result = Transform::combine(&self.joints[p], &result);
            parent = self.parents[p];
        }
        result
    }

    /// 计算每个关节的模型空间矩阵
    ///
    /// 父索引小于自身的关节直接复用 `out[parent]`（O(n)），其余关节回溯父链。
    pub fn matrix_palette(&self, out: &mut Vec<Mat4>) {
        out.resize(self.len(), Mat4::IDENTITY);
        for joint in 0..self.len() {
            out[joint] = match self.parents[joint] {
                None => self.joints[joint].to_matrix(),
                Some(parent) if parent < joint => out[parent] * self.joints[joint].to_matrix(),
                Some(_) => self.global_transform(joint).to_matrix(),
            };
        }
    }

    /// 所有关节都按回溯方式计算的调色板
    pub fn matrix_palette_unordered(&self, out: &mut Vec<Mat4>) {
        out.clear();
        out.extend((0..self.len()).map(|joint| self.global_transform(joint).to_matrix()));
    }

    /// 父索引是否全部小于子索引
    pub fn is_topologically_sorted(&self) -> bool {
        self.parents
            .iter()
            .enumerate()
            .all(|(joint, parent)| parent.map_or(true, |p| p < joint))
    }

    /// `search` 是否位于以 `root` 为根的子树中（包含 `root` 本身）
    pub fn is_in_hierarchy(&self, root: usize, search: usize) -> bool {
        if search == root {
            return true;
        }
        let mut parent = self.parents[search];
        let mut steps = 0;
        while let Some(p) = parent {
            if p == root {
                return true;
            }
            steps += 1;
            if steps > self.len() {
                // 存在环
                return false;
            }
            parent = self.parents[p];
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn chain_pose() -> Pose {
        let joints = vec![
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            Transform::from_position_rotation(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_z(0.5)),
            Transform::new(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_x(-0.3), Vec3::splat(1.5)),
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
        ];
        Pose::from_parts(joints, vec![None, Some(0), Some(1), Some(2)])
    }

    #[test]
    fn test_try_from_parts_rejects_length_mismatch() {
        let err = Pose::try_from_parts(vec![Transform::IDENTITY; 3], vec![None, Some(0)]).unwrap_err();
        assert_eq!(err, AnimationError::JointCountMismatch { expected: 3, found: 2 });

        let pose = Pose::try_from_parts(vec![Transform::IDENTITY; 2], vec![None, Some(0)]).unwrap();
        assert_eq!(pose.parent(1), Some(0));
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_from_parts_panics_on_length_mismatch() {
        Pose::from_parts(vec![Transform::IDENTITY; 2], vec![None]);
    }

    #[test]
    fn test_global_transform_walks_parents() {
        let pose = chain_pose();
        let expected = Transform::combine(
            &Transform::combine(&pose.local_transform(0), &pose.local_transform(1)),
            &pose.local_transform(2),
        );
        assert!(pose.global_transform(2).abs_diff_eq(&expected, 1e-5));
    }

    #[test]
    fn test_matrix_palette_matches_global_transforms() {
        let pose = chain_pose();
        let mut palette = Vec::new();
        pose.matrix_palette(&mut palette);
        assert_eq!(palette.len(), 4);
        for (joint, matrix) in palette.iter().enumerate() {
            let expected = pose.global_transform(joint).to_matrix();
            assert!(matrix.abs_diff_eq(expected, 1e-5), "joint {joint}");
        }
    }

    #[test]
    fn test_matrix_palette_unsorted_falls_back() {
        // 子关节 0 的父关节是 2
        let joints = vec![
            Transform::from_position(Vec3::X),
            Transform::from_position(Vec3::Y),
            Transform::from_position(Vec3::Z),
        ];
        let pose = Pose::from_parts(joints, vec![Some(2), None, Some(1)]);
        assert!(!pose.is_topologically_sorted());

        let mut palette = Vec::new();
        pose.matrix_palette(&mut palette);
        let origin = palette[0].transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(1.0, 1.0, 1.0), 1e-6));

        let mut walked = Vec::new();
        pose.matrix_palette_unordered(&mut walked);
        for (a, b) in palette.iter().zip(&walked) {
            assert!(a.abs_diff_eq(*b, 1e-6));
        }
    }

    #[test]
    fn test_is_in_hierarchy() {
        let pose = Pose::from_parts(
            vec![Transform::IDENTITY; 5],
            vec![None, Some(0), Some(1), Some(0), Some(3)],
        );
        assert!(pose.is_in_hierarchy(1, 2));
        assert!(pose.is_in_hierarchy(1, 1));
        assert!(pose.is_in_hierarchy(0, 4));
        assert!(!pose.is_in_hierarchy(1, 4));
        assert!(!pose.is_in_hierarchy(2, 1));
    }

    #[test]
    fn test_resize_and_clone_are_deep() {
        let mut pose = Pose::new(2);
        pose.set_parent(1, Some(0));
        let snapshot = pose.clone();
        pose.set_local_transform(1, Transform::from_position(Vec3::X));
        pose.resize(3);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.local_transform(1), Transform::IDENTITY);
        assert_eq!(pose.parent(2), None);
    }
}
