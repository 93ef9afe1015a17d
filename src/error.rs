//! 动画核心错误类型
//!
//! 采样、混合与 IK 求解等每帧热路径不返回错误（按降级策略静默处理）；
//! 只有构造路径（骨骼、IK 腿、剪辑库查找）返回 [`AnimationResult`]。

use thiserror::Error;

/// 动画核心错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// 按名称查找关节失败
    #[error("Joint not found: {name}")]
    JointNotFound { name: String },

    /// 姿态/名称列表长度不一致
    #[error("Joint count mismatch: expected {expected}, found {found}")]
    JointCountMismatch { expected: usize, found: usize },

    /// 父关节索引越界
    #[error("Joint {joint} has invalid parent index {parent}")]
    InvalidParent { joint: usize, parent: usize },

    /// 层级中存在环
    #[error("Joint hierarchy contains a cycle at joint {joint}")]
    HierarchyCycle { joint: usize },

    /// IK 链配置无效
    #[error("Invalid IK chain: {0}")]
    InvalidChain(String),

    /// 剪辑库中找不到剪辑
    #[error("Unknown clip: {0}")]
    UnknownClip(String),
}

pub type AnimationResult<T> = Result<T, AnimationError>;
