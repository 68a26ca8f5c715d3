//! # 平台启动与生命周期
//!
//! 这个 crate 把 Bean 容器组装成一个可启动、可停止的平台。
//!
//! ## 主要功能
//!
//! - **平台构建器**: 从配置文件、环境变量组装平台并初始化日志
//! - **生命周期管理**: `Preparing -> Validated -> Started -> Stopping -> Stopped`
//! - **启动等待**: 阻塞的 `await_started` 与异步的 `wait_started`
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_abstractions::{BeanContainer, BeanSpec};
//! use infrastructure_platform::PlatformBuilder;
//!
//! struct Clock;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let platform = PlatformBuilder::new().with_default_config_files().build()?;
//!     platform.beans().register(BeanSpec::new(|_| Ok(Clock)).singleton())?;
//!
//!     platform.start()?;
//!     let _clock = platform.beans().get::<Clock>()?;
//!
//!     platform.stop()?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod platform;

#[cfg(test)]
mod tests;

// 重新导出主要类型
pub use builder::{initialize_logging, PlatformBuilder};
pub use config::{LoggingConfig, PlatformConfig, PlatformConfigLoader, DEFAULT_ENV_PREFIX};
pub use platform::{Platform, PlatformEvent, PlatformListener};

// 重新导出错误类型
pub use infrastructure_common::{InfrastructureError, PlatformState};
