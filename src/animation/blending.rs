//! 姿态混合
//!
//! 线性混合（可限制在子层级内）与叠加混合。

use super::clip::Playable;
use super::pose::Pose;
use super::skeleton::Skeleton;
use super::transform::Transform;

/// 混合两个姿态写入 `out`
///
/// `root` 为 `None` 时混合全部关节，否则只混合 `root` 子树，其余关节复制自 `a`。
/// `t` 不做截断。
pub fn blend(a: &Pose, b: &Pose, t: f32, root: Option<usize>, out: &mut Pose) {
    out.clone_from(a);
    blend_in_place(out, b, t, root);
}

/// 把 `b` 按权重 `t` 混合进 `pose`
pub fn blend_in_place(pose: &mut Pose, b: &Pose, t: f32, root: Option<usize>) {
    debug_assert_eq!(pose.len(), b.len(), "blended poses must have the same joint count");
    let count = pose.len().min(b.len());
    for joint in 0..count {
        if let Some(root) = root {
            if !pose.is_in_hierarchy(root, joint) {
                continue;
            }
        }
        let mixed = Transform::mix(&pose.local_transform(joint), &b.local_transform(joint), t);
        pose.set_local_transform(joint, mixed);
    }
}

/// 生成叠加基准姿态：在剪辑起始时间采样
pub fn make_additive_pose<C: Playable>(skeleton: &Skeleton, clip: &C) -> Pose {
    let mut pose = skeleton.rest_pose().clone();
    clip.sample(&mut pose, clip.start_time());
    pose
}

/// 叠加混合：`out = base + (additive - additive_base)`
///
/// 位置与缩放逐分量相加差值，旋转为 `base * (additive_base⁻¹ * additive)`。
pub fn add(
    base: &Pose,
    additive: &Pose,
    additive_base: &Pose,
    root: Option<usize>,
    out: &mut Pose,
) {
    out.clone_from(base);
    let count = base.len().min(additive.len()).min(additive_base.len());
    for joint in 0..count {
        if let Some(root) = root {
            if !base.is_in_hierarchy(root, joint) {
                continue;
            }
        }
        let input = base.local_transform(joint);
        let layer = additive.local_transform(joint);
        let reference = additive_base.local_transform(joint);

        let delta_rotation = reference.rotation.inverse() * layer.rotation;
        let result = Transform {
            position: input.position + (layer.position - reference.position),
            rotation: (input.rotation * delta_rotation).normalize(),
            scale: input.scale + (layer.scale - reference.scale),
        };
        out.set_local_transform(joint, result);
    }
}
