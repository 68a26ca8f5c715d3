//! 平台配置
//!
//! 配置按以下顺序合并（后者覆盖前者）：
//!
//! 1. 内置默认值
//! 2. `config/platform.*`、`config/local.*`（可选）
//! 3. 显式指定的配置文件（必须存在）
//! 4. `BEANS_` 前缀的环境变量，层级之间用 `__` 分隔，
//!    如 `BEANS_CONTAINER__CREATION_TIMEOUT_MS=2000`

use infrastructure_common::{ConfigError, ConfigResult, ContainerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error};

/// 默认的环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "BEANS";

/// 平台配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// 容器配置
    pub container: ContainerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// `await_started` 未指定超时时使用的等待时间（毫秒）
    pub start_timeout_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            container: ContainerConfig::default(),
            logging: LoggingConfig::default(),
            start_timeout_ms: 30_000,
        }
    }
}

impl PlatformConfig {
    /// 从默认配置源加载
    pub fn load() -> ConfigResult<Self> {
        PlatformConfigLoader::new().with_default_files().load()
    }

    /// 创建配置加载器
    pub fn loader() -> PlatformConfigLoader {
        PlatformConfigLoader::new()
    }

    /// 默认的启动等待时间
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// 校验配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.container.validate()?;
        if self.start_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "start_timeout_ms 必须大于 0".to_string(),
            });
        }
        self.logging.level()?;
        Ok(())
    }
}

/// 平台配置加载器
#[derive(Debug, Clone)]
pub struct PlatformConfigLoader {
    default_files: bool,
    files: Vec<PathBuf>,
    env_prefix: Option<String>,
}

impl PlatformConfigLoader {
    /// 创建加载器（默认只读取环境变量）
    pub fn new() -> Self {
        Self {
            default_files: false,
            files: Vec::new(),
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }

    /// 读取 `config/platform` 和 `config/local`（不存在时忽略）
    pub fn with_default_files(mut self) -> Self {
        self.default_files = true;
        self
    }

    /// 添加必须存在的配置文件
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// 设置环境变量前缀
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// 不读取环境变量
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// 加载并校验配置
    pub fn load(self) -> ConfigResult<PlatformConfig> {
        let mut builder = config::Config::builder();

        if self.default_files {
            builder = builder
                .add_source(config::File::with_name("config/platform").required(false))
                .add_source(config::File::with_name("config/local").required(false));
        }

        for path in &self.files {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("添加配置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let settings = builder.build().map_err(|e| {
            error!("配置构建失败: {}", e);
            ConfigError::ParseError { source: Box::new(e) }
        })?;

        let config: PlatformConfig = settings.try_deserialize().map_err(|e| {
            error!("配置绑定失败: {}", e);
            ConfigError::ParseError { source: Box::new(e) }
        })?;

        config.validate()?;
        debug!("平台配置加载完成: {:?}", config);
        Ok(config)
    }
}

impl Default for PlatformConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（trace / debug / info / warn / error）
    pub level: String,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 解析后的日志级别
    pub fn level(&self) -> ConfigResult<tracing::Level> {
        tracing::Level::from_str(&self.level).map_err(|_| ConfigError::ValidationError {
            message: format!("无效的日志级别: {}", self.level),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlatformConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.start_timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let config = PlatformConfig {
            logging: LoggingConfig {
                level: "loud".to_string(),
                ..LoggingConfig::default()
            },
            ..PlatformConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_logging_presets() {
        assert_eq!(LoggingConfig::development().level().unwrap(), tracing::Level::DEBUG);
        assert!(LoggingConfig::production().json_format);
    }
}
