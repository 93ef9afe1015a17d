//! # Stride Anim
//!
//! 骨骼动画核心：剪辑采样、交叉淡入淡出、CCD/FABRIK 逆向运动学与不平地面上的脚部贴地。
//!
//! ## Features
//!
//! - **Clip Sampling**: 常量/线性/三次关键帧轨道，朴素与预计算两种采样实现
//! - **Blending**: 线性混合（可限制在子层级）与叠加混合
//! - **CrossFade**: 单目标、队列、数组与带脚钉权重的控制器
//! - **IK**: CCD、FABRIK、关节约束、腿部 IK 与地面查询
//! - **Skinning**: 蒙皮矩阵、CPU 蒙皮与可直接上传的 GPU 调色板
//! - **ECS**: 基于 `bevy_ecs` 的组件、资源与系统
//!
//! ## Architecture Design
//!
//! - **Data**: [`Pose`](animation::Pose)、[`Skeleton`](animation::Skeleton)、剪辑与轨道
//! - **Library**: 剪辑由调用方持有的 [`ClipLibrary`](animation::ClipLibrary) 保存，
//!   控制器只持有 [`ClipId`](animation::ClipId) 句柄
//! - **System**: ECS 系统按 交叉淡入淡出 -> 脚部贴地 -> 蒙皮 的顺序运行
//!
//! ## Modules
//!
//! - [`animation`]: 姿态、轨道、剪辑、混合、交叉淡入淡出与蒙皮
//! - [`ik`]: 逆向运动学
//! - [`config`]: 配置系统
//! - [`logging`]: 日志初始化
//! - [`error`]: 错误类型

/// 宏定义
#[macro_use]
pub mod macros;

/// 动画系统
pub mod animation;
/// 配置系统
pub mod config;
/// 错误类型
pub mod error;
/// 逆向运动学
pub mod ik;
/// 日志初始化
pub mod logging;

pub use animation::{
    Clip, ClipId, ClipLibrary, CrossFade, CrossFadeController, IkCrossFadeController, Pose,
    Skeleton, Transform,
};
pub use config::{AnimationConfig, ConfigError, ConfigResult};
pub use error::{AnimationError, AnimationResult};
pub use ik::{CcdSolver, FabrikSolver, FootPlacement, IkLeg};
pub use logging::init_logging;
