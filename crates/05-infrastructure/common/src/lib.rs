//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn ADSP Bean 容器各层共用的基础类型。
//!
//! ## 核心内容
//!
//! - [`DependencyError`] - 注册、解析、创建阶段的错误分类
//! - [`TypeInfo`] - 替代反射的类型元数据（具体类型 / 契约类型）
//! - [`Lifetime`] - Bean 作用域（单例 / 每次请求）
//! - [`PlatformState`] - 平台生命周期状态序列
//! - [`ContainerConfig`] - 容器配置
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 显式描述符代替注解扫描
//! - 容器是显式构造的实例，不存在隐式全局状态

pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
