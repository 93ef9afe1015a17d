//! ECS 集成
//!
//! 每帧顺序：`crossfade_update_system` 推进控制器并写出 [`AnimatedPose`]，
//! 之后（可选的脚部 IK 修改姿态）`skinning_system` 计算蒙皮矩阵并驱动蒙皮网格。

use bevy_ecs::prelude::*;
use glam::Mat4;

use super::clip::Playable;
use super::crossfade::CrossFade;
use super::library::ClipLibrary;
use super::pose::Pose;
use super::skeleton::Skeleton;
use super::skinned_mesh::SkinnedMesh;

/// 帧时间资源
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct Time {
    pub delta_seconds: f32,
    pub elapsed_seconds: f64,
}

impl Time {
    /// 推进一帧
    pub fn advance(&mut self, delta_seconds: f32) {
        self.delta_seconds = delta_seconds;
        self.elapsed_seconds += f64::from(delta_seconds);
    }
}

/// 本帧最终姿态（动画 + IK）
#[derive(Component, Clone, Debug, Default)]
pub struct AnimatedPose(pub Pose);

/// 本帧蒙皮矩阵
#[derive(Component, Clone, Debug, Default)]
pub struct SkinMatrices(pub Vec<Mat4>);

/// 推进所有 `T` 类型的控制器
pub fn crossfade_update_system<T, C>(
    time: Res<Time>,
    library: Res<ClipLibrary<C>>,
    mut query: Query<(&mut T, Option<&mut AnimatedPose>)>,
) where
    T: CrossFade + Component,
    C: Playable + Send + Sync + 'static,
{
    for (mut controller, pose) in &mut query {
        controller.update(&*library, time.delta_seconds);
        if let Some(mut pose) = pose {
            pose.0.clone_from(controller.current_pose());
        }
    }
}

/// 计算蒙皮矩阵，并按网格的蒙皮方式应用
pub fn skinning_system(
    mut query: Query<(
        &AnimatedPose,
        &Skeleton,
        &mut SkinMatrices,
        Option<&mut SkinnedMesh>,
    )>,
) {
    for (pose, skeleton, mut skin, mesh) in &mut query {
        skeleton.skin_matrices(&pose.0, &mut skin.0);
        if let Some(mut mesh) = mesh {
            mesh.apply(&skin.0);
        }
    }
}
