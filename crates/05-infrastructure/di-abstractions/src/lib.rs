//! # Dependency Injection Abstractions
//!
//! Bean 容器抽象层，定义描述符、解析上下文和容器的核心接口。
//!
//! ## 核心接口
//!
//! - [`BeanSpec`] - 显式的 Bean 描述（代替注解与反射）
//! - [`BeanDescriptor`] - 注册后的类型擦除描述符
//! - [`LifecycleHooks`] - post-construct / predestroy 钩子声明
//! - [`CreationContext`] - 沿调用链传递的创建上下文，用于循环依赖检测
//! - [`BeanResolver`] - 对象安全的解析接口
//! - [`BeanFactory`] - 实例生产接口
//! - [`BeanContainer`] - 容器门面（`get` / `opt` / `all`）

pub mod container;
pub mod context;
pub mod descriptor;
pub mod factory;
pub mod hooks;
pub mod resolver;

pub use container::*;
pub use context::*;
pub use descriptor::*;
pub use factory::*;
pub use hooks::*;
pub use resolver::*;
