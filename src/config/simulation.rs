use super::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// 默认 tick 时长（秒），20 Hz
pub const DEFAULT_TICK_DURATION: f32 = 0.05;

/// 默认竖直加速度（沿 z 轴，带符号）
pub const DEFAULT_GRAVITY: f32 = -9.81;

/// 模拟配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 每个 tick 的时长（秒），也是预模拟的步长
    pub tick_duration: f32,

    /// 全局重力，定义中的 `gravity` 是它的倍数
    pub default_gravity: f32,

    /// 随机种子，`None` 时使用系统熵
    pub seed: Option<u64>,

    /// 最大粒子数，0 表示不限制
    pub max_particles: usize,
}

impl_default!(SimulationConfig {
    tick_duration: DEFAULT_TICK_DURATION,
    default_gravity: DEFAULT_GRAVITY,
    seed: None,
    max_particles: 0,
});

impl SimulationConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.tick_duration.is_finite() || self.tick_duration <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "tick_duration must be positive and finite, got {}",
                self.tick_duration
            )));
        }
        if !self.default_gravity.is_finite() {
            return Err(ConfigError::ValidationError(
                "default_gravity must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// 每秒 tick 数
    pub fn ticks_per_second(&self) -> f32 {
        1.0 / self.tick_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(SimulationConfig::default().validate().is_ok());

        let config = SimulationConfig {
            tick_duration: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            default_gravity: f32::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ticks_per_second() {
        assert!((SimulationConfig::default().ticks_per_second() - 20.0).abs() < 1e-4);
    }
}
