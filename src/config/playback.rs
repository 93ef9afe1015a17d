use super::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// 播放配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// 默认淡入时长 (秒)
    pub default_fade_duration: f32,

    /// 预计算轨道查找表采样率 (Hz)
    pub fast_track_sample_rate: f32,

    /// 加载后是否把剪辑转换为预计算剪辑
    pub optimize_clips: bool,
}

impl_default!(PlaybackConfig {
    default_fade_duration: 0.25,
    fast_track_sample_rate: 60.0,
    optimize_clips: true,
});

impl PlaybackConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.default_fade_duration >= 0.0) {
            return Err(ConfigError::ValidationError(
                "Fade duration must be non-negative".to_string(),
            ));
        }
        if !(self.fast_track_sample_rate > 0.0) {
            return Err(ConfigError::ValidationError(
                "Fast track sample rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
