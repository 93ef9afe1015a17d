/// 统一配置系统
///
/// 提供TOML/JSON配置文件与环境变量覆盖
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod ik;
pub mod playback;
pub mod skinning;

pub use ik::{IkConfig, LegConfig, SolverConfig};
pub use playback::PlaybackConfig;
pub use skinning::SkinningConfig;

use crate::animation::skinned_mesh::SkinningMode;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 动画系统主配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// IK 配置
    #[serde(default)]
    pub ik: IkConfig,

    /// 蒙皮配置
    #[serde(default)]
    pub skinning: SkinningConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AnimationConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 从环境变量覆盖配置
    ///
    /// - `ANIM_IK_ITERATIONS`：所有求解器的迭代次数
    /// - `ANIM_IK_THRESHOLD`：所有求解器的收敛距离
    /// - `ANIM_SKINNING_MODE`：`gpu` 或 `cpu`
    /// - `ANIM_FADE_DURATION`：默认淡入时长
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// 以任意键值来源覆盖配置（无法解析的值被忽略）
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(iterations) = lookup("ANIM_IK_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.ik.ccd.iterations = iterations;
            self.ik.fabrik.iterations = iterations;
            self.ik.leg.iterations = iterations;
        }
        if let Some(threshold) = lookup("ANIM_IK_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.ik.ccd.threshold = threshold;
            self.ik.fabrik.threshold = threshold;
            self.ik.leg.threshold = threshold;
        }
        if let Some(mode) = lookup("ANIM_SKINNING_MODE") {
            match mode.trim().to_ascii_lowercase().as_str() {
                "gpu" => self.skinning.mode = SkinningMode::Gpu,
                "cpu" => self.skinning.mode = SkinningMode::Cpu,
                other => {
                    tracing::warn!(target: "config", value = other, "Unknown ANIM_SKINNING_MODE")
                }
            }
        }
        if let Some(duration) = lookup("ANIM_FADE_DURATION").and_then(|v| v.parse().ok()) {
            self.playback.default_fade_duration = duration;
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.playback.validate()?;
        self.ik.validate()?;
        self.skinning.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./config.toml
    /// 2. ./config.json
    /// 3. ~/.config/stride_anim/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("config.toml") {
            tracing::info!(target: "config", "Loaded config from config.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("config.json") {
            tracing::info!(target: "config", "Loaded config from config.json");
            return config;
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("stride_anim")
                .join("config.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "config", path = ?config_path, "Loaded config");
                return config;
            }
        }

        tracing::info!(target: "config", "Using default configuration");
        Self::default()
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_to_console: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// `EnvFilter` 指令字符串
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
