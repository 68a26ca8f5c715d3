//! 容器配置

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 未显式声明且不覆盖其他 Bean 时使用的默认排序值
pub const DEFAULT_RANK: i32 = 5000;

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 跨线程等待单例创建的最长时间（毫秒）
    pub creation_timeout_ms: u64,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 默认排序值
    pub default_rank: i32,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            creation_timeout_ms: 5000,
            max_resolution_depth: 100,
            default_rank: DEFAULT_RANK,
        }
    }
}

impl ContainerConfig {
    /// 设置跨线程等待时间
    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 设置最大解析深度
    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    /// 跨线程等待时间
    pub fn creation_timeout(&self) -> Duration {
        Duration::from_millis(self.creation_timeout_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.creation_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "creation_timeout_ms 必须大于 0".to_string(),
            });
        }
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_resolution_depth 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ContainerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.creation_timeout(), Duration::from_secs(5));
        assert_eq!(config.default_rank, DEFAULT_RANK);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let config = ContainerConfig::default().with_creation_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
