use super::{ConfigError, ConfigResult};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// IK 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IkConfig {
    /// CCD 求解器
    pub ccd: SolverConfig,

    /// FABRIK 求解器
    pub fabrik: SolverConfig,

    /// 腿部 IK
    pub leg: LegConfig,
}

impl_default!(IkConfig {
    ccd: SolverConfig::default(),
    fabrik: SolverConfig::default(),
    leg: LegConfig::default(),
});

impl IkConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.ccd.validate("ccd")?;
        self.fabrik.validate("fabrik")?;
        self.leg.validate()
    }
}

/// 迭代求解器配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 最大迭代次数
    pub iterations: u32,

    /// 收敛距离
    pub threshold: f32,
}

impl_default!(SolverConfig {
    iterations: 15,
    threshold: 1e-5,
});

impl SolverConfig {
    fn validate(&self, name: &str) -> ConfigResult<()> {
        validate_solver(name, self.iterations, self.threshold)
    }
}

/// 腿部 IK 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegConfig {
    pub iterations: u32,

    pub threshold: f32,

    /// 踝关节到脚底的高度
    pub ankle_to_ground_offset: f32,

    /// 膝盖朝向（模型空间），用于直腿弯曲方向和反膝修正
    pub knee_forward: Vec3,

    /// 求解后修正反向弯曲的膝盖
    pub correct_backward_knee: bool,

    /// 地面探测射线起点在踝关节上方的高度
    pub ground_probe_height: f32,
}

impl_default!(LegConfig {
    iterations: 24,
    threshold: 1e-4,
    ankle_to_ground_offset: 0.0,
    knee_forward: Vec3::Z,
    correct_backward_knee: true,
    ground_probe_height: 1.0,
});

impl LegConfig {
    /// 腿部求解器使用的迭代设置
    pub fn solver(&self) -> SolverConfig {
        SolverConfig {
            iterations: self.iterations,
            threshold: self.threshold,
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        validate_solver("leg", self.iterations, self.threshold)?;
        if self.knee_forward.try_normalize().is_none() {
            return Err(ConfigError::ValidationError(
                "Leg knee_forward must be a non-zero vector".to_string(),
            ));
        }
        if !(self.ground_probe_height >= 0.0) {
            return Err(ConfigError::ValidationError(
                "Leg ground_probe_height must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_solver(name: &str, iterations: u32, threshold: f32) -> ConfigResult<()> {
    if iterations == 0 || iterations > 1000 {
        return Err(ConfigError::ValidationError(format!(
            "Invalid {name} iteration count: {iterations}"
        )));
    }
    if !(threshold > 0.0) {
        return Err(ConfigError::ValidationError(format!(
            "Invalid {name} threshold: {threshold}"
        )));
    }
    Ok(())
}
