use super::{ConfigError, ConfigResult};
use crate::animation::skinned_mesh::{SkinningMode, DEFAULT_MAX_PALETTE_SIZE};
use serde::{Deserialize, Serialize};

/// 蒙皮配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinningConfig {
    /// 蒙皮方式
    pub mode: SkinningMode,

    /// GPU 调色板容量
    pub max_palette_size: usize,
}

impl_default!(SkinningConfig {
    mode: SkinningMode::Gpu,
    max_palette_size: DEFAULT_MAX_PALETTE_SIZE,
});

impl SkinningConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_palette_size == 0 {
            return Err(ConfigError::ValidationError(
                "Palette size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
