//! 错误类型定义

use crate::lifecycle::PlatformState;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// Bean 创建失败的根因
///
/// 由构造函数、字段注入或 post-construct 钩子返回的错误。内部使用 `Arc`
/// 共享，同一次创建尝试的失败可以同时交付给所有等待线程。
#[derive(Clone)]
pub struct CreationCause(Arc<anyhow::Error>);

impl CreationCause {
    /// 包装一个创建错误
    pub fn new(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }

    /// 按具体类型查找根因链中的错误
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// 根因是否为容器自身的依赖错误
    pub fn as_dependency_error(&self) -> Option<&DependencyError> {
        self.downcast_ref::<DependencyError>()
    }
}

impl From<anyhow::Error> for CreationCause {
    fn from(error: anyhow::Error) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for CreationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for CreationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl StdError for CreationCause {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let inner: &(dyn StdError + Send + Sync + 'static) = (*self.0).as_ref();
        Some(inner)
    }
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("Bean 未注册: {type_name}")]
    BeanNotFound { type_name: String },

    #[error("Bean 解析不唯一: {type_name}, 候选: {}", .candidates.join(", "))]
    AmbiguousBean {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("Bean 创建失败: {bean}, 原因: {cause}")]
    CreationFailed {
        bean: String,
        #[source]
        cause: CreationCause,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("等待其他线程创建 Bean 超时（疑似死锁）: {bean}, 已等待 {waited_ms} ms")]
    CreationTimeout { bean: String, waited_ms: u64 },

    #[error("超过最大解析深度 {depth}: {dependency_chain}")]
    ResolutionDepthExceeded {
        depth: usize,
        dependency_chain: String,
    },

    #[error("不能覆盖契约类型: {type_name} 覆盖 {target}")]
    InterfaceOverride { type_name: String, target: String },

    #[error("Bean 描述符无效: {type_name}, 原因: {message}")]
    InvalidDescriptor { type_name: String, message: String },

    #[error("注册句柄不存在: {handle}")]
    HandleNotFound { handle: String },

    #[error("类型转换失败: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("容器已关闭")]
    ContainerShutDown,
}

impl DependencyError {
    /// 创建描述符无效错误
    pub fn invalid_descriptor(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// 遍历错误链（自身在前）
    pub fn chain(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        std::iter::successors(Some(self as &(dyn StdError + 'static)), |e| (*e).source())
    }

    /// 错误链中的依赖错误
    fn dependency_errors(&self) -> impl Iterator<Item = &Self> {
        self.chain().filter_map(|e| e.downcast_ref::<Self>())
    }

    /// 错误链中是否包含循环依赖
    pub fn is_circular_dependency(&self) -> bool {
        self.dependency_errors()
            .any(|e| matches!(e, Self::CircularDependency { .. }))
    }

    /// 错误链中是否包含跨线程等待超时
    pub fn is_creation_timeout(&self) -> bool {
        self.dependency_errors()
            .any(|e| matches!(e, Self::CreationTimeout { .. }))
    }

    /// 是否为解析错误（未找到或不唯一）
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::BeanNotFound { .. } | Self::AmbiguousBean { .. })
    }

    /// 是否为注册时的配置错误
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InterfaceOverride { .. } | Self::InvalidDescriptor { .. }
        )
    }
}

/// 生命周期管理错误类型
#[derive(Error, Debug, Clone)]
pub enum LifecycleError {
    #[error("predestroy 钩子执行失败: {bean}::{hook}, 原因: {message}")]
    PreDestroyFailed {
        bean: String,
        hook: String,
        message: String,
    },

    #[error("实例类型与描述符不匹配: {bean}")]
    InstanceMismatch { bean: String },
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("生命周期错误: {source}")]
    LifecycleError {
        #[from]
        source: LifecycleError,
    },

    #[error("平台状态迁移无效: {from} -> {to}")]
    InvalidStateTransition {
        from: PlatformState,
        to: PlatformState,
    },

    #[error("平台启动失败: {message}")]
    BootstrapFailed { message: String },

    #[error("等待平台启动超时: {waited_ms} ms")]
    StartTimeout { waited_ms: u64 },

    #[error("平台关闭失败: {message}")]
    ShutdownFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
