//! 动画系统模块
//!
//! 骨骼姿态、关键帧采样、剪辑混合与交叉淡入淡出、蒙皮。
//!
//! ## 功能特性
//!
//! - 关节变换与层级姿态，矩阵调色板
//! - 标量/向量/四元数关键帧轨道（常量、线性、三次 Hermite）
//! - 预计算轨道（查找表 + 三次系数）
//! - 剪辑库与 [`ClipId`] 句柄
//! - 线性混合、叠加混合
//! - 四种交叉淡入淡出控制器
//! - GPU/CPU 蒙皮
//!
//! ## 使用示例
//!
//! ```rust
//! use stride_anim::animation::{
//!     Clip, ClipLibrary, CrossFade, CrossFadeController, Pose, Skeleton, Transform,
//! };
//! use glam::{Quat, Vec3};
//!
//! let rest = Pose::from_parts(
//!     vec![Transform::IDENTITY, Transform::from_position(Vec3::Y)],
//!     vec![None, Some(0)],
//! );
//! let skeleton = Skeleton::from_rest_pose(rest, vec!["root".into(), "spine".into()]).unwrap();
//!
//! let mut wave = Clip::new("wave");
//! let track = wave.track_mut(1);
//! track.rotation.add_keyframe(0.0, Quat::IDENTITY);
//! track.rotation.add_keyframe(1.0, Quat::from_rotation_z(0.5));
//! wave.recalculate_duration();
//!
//! let mut library = ClipLibrary::new();
//! let wave = library.add(wave);
//!
//! let mut controller = CrossFadeController::new(skeleton.rest_pose().clone());
//! controller.play(&library, wave);
//! controller.update(&library, 0.5);
//!
//! let mut skin = Vec::new();
//! skeleton.skin_matrices(controller.current_pose(), &mut skin);
//! assert_eq!(skin.len(), 2);
//! ```

pub mod blending;
pub mod clip;
pub mod crossfade;
pub mod fast_track;
pub mod keyframe;
pub mod library;
pub mod pose;
pub mod skeleton;
pub mod skinned_mesh;
pub mod systems;
pub mod transform;
pub mod transform_track;

pub use blending::{add, blend, blend_in_place, make_additive_pose};
pub use clip::{optimize_clip, AnimationClip, Clip, FastClip, Playable};
pub use crossfade::{
    CrossFade, CrossFadeArray, CrossFadeController, CrossFadeQueue, CrossFadeTarget,
    IkCrossFadeController,
};
pub use fast_track::{FastQuaternionTrack, FastScalarTrack, FastTrack, FastVectorTrack};
pub use keyframe::{
    Curve, InterpolationMode, Keyframe, KeyframeTrack, QuaternionTrack, ScalarTrack, TrackValue,
    VectorTrack,
};
pub use library::{ClipId, ClipLibrary, FootPins};
pub use pose::Pose;
pub use skeleton::Skeleton;
pub use skinned_mesh::{gpu_palette, skin_vertex, SkinnedMesh, SkinnedVertex3D, SkinningMode};
pub use systems::{crossfade_update_system, skinning_system, AnimatedPose, SkinMatrices, Time};
pub use transform::{nlerp, rotation_between, Transform};
pub use transform_track::{FastTransformTrack, TransformTrack};
