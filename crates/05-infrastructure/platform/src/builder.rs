//! 平台构建器

use crate::config::{LoggingConfig, PlatformConfig, PlatformConfigLoader};
use crate::platform::{Platform, PlatformListener};
use infrastructure_common::{ConfigError, InfrastructureError, InfrastructureResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 平台构建器
///
/// 使用建造者模式组装配置、日志和监听器
pub struct PlatformBuilder {
    /// 显式给出的配置（不再从配置源加载）
    config: Option<PlatformConfig>,
    /// 显式的配置文件
    config_files: Vec<PathBuf>,
    /// 是否读取默认配置文件
    default_config_files: bool,
    /// 环境变量前缀
    env_prefix: Option<String>,
    /// 覆盖配置中的创建等待时间
    creation_timeout: Option<Duration>,
    /// 监听器列表
    listeners: Vec<Arc<dyn PlatformListener>>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置（未设置时使用加载到的配置）
    logging_config: Option<LoggingConfig>,
}

impl PlatformBuilder {
    /// 创建新的平台构建器
    pub fn new() -> Self {
        Self {
            config: None,
            config_files: Vec::new(),
            default_config_files: false,
            env_prefix: None,
            creation_timeout: None,
            listeners: Vec::new(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: None,
        }
    }

    /// 直接使用给定配置
    pub fn with_config(mut self, config: PlatformConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 添加配置文件
    pub fn add_config_file<P: AsRef<Path>>(mut self, path: P) -> InfrastructureResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        info!("添加配置文件: {}", path.display());
        self.config_files.push(path.to_path_buf());
        Ok(self)
    }

    /// 读取 `config/platform` 与 `config/local`
    pub fn with_default_config_files(mut self) -> Self {
        self.default_config_files = true;
        self
    }

    /// 设置环境变量前缀
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("环境变量配置前缀: {}", prefix);
        self.env_prefix = Some(prefix);
        self
    }

    /// 设置跨线程等待单例创建的上限
    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout = Some(timeout);
        self
    }

    /// 添加状态监听器
    pub fn with_listener<L: PlatformListener + 'static>(mut self, listener: L) -> Self {
        debug!("添加平台监听器");
        self.listeners.push(Arc::new(listener));
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 构建平台
    pub fn build(self) -> InfrastructureResult<Platform> {
        let mut config = match self.config {
            Some(config) => config,
            None => {
                let mut loader = PlatformConfigLoader::new();
                if self.default_config_files {
                    loader = loader.with_default_files();
                }
                for path in &self.config_files {
                    loader = loader.file(path);
                }
                if let Some(prefix) = &self.env_prefix {
                    loader = loader.env_prefix(prefix.clone());
                }
                loader.load()?
            }
        };

        if let Some(timeout) = self.creation_timeout {
            config.container = config.container.with_creation_timeout(timeout);
        }
        if let Some(logging) = self.logging_config {
            config.logging = logging;
        }
        config.validate()?;

        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            initialize_logging(&config.logging)?;
        }

        let platform = Platform::new(config);
        for listener in self.listeners {
            platform.add_listener(listener);
        }

        info!("平台构建完成");
        Ok(platform)
    }
}

impl Default for PlatformBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 初始化日志系统
pub fn initialize_logging(config: &LoggingConfig) -> InfrastructureResult<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(config.level()?)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}
