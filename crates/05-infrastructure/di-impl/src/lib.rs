//! # Bean 容器具体实现
//!
//! 提供 [`BeanManager`] 以及它依赖的各个部件：
//!
//! - [`DescriptorStore`] - 描述符存储与类型索引
//! - [`OverrideResolver`] - 覆盖遮蔽、排序值继承与排序
//! - [`BeanProducer`] - 构造、字段注入、post-construct / predestroy 钩子
//! - [`SingletonSlot`] - 单例的一次性并发创建与跨线程有界等待
//!
//! ```ignore
//! use di_abstractions::{BeanContainer, BeanSpec};
//! use di_impl::BeanManager;
//!
//! let manager = BeanManager::new();
//! manager.register(BeanSpec::new(|_| Ok(Clock::system())).singleton())?;
//! let clock = manager.get::<Clock>()?;
//! manager.shutdown();
//! ```

pub mod manager;
pub mod override_resolver;
pub mod producer;
pub mod singleton;
pub mod store;

pub use manager::BeanManager;
pub use override_resolver::{Candidate, OverrideResolver};
pub use producer::BeanProducer;
pub use singleton::SingletonSlot;
pub use store::{DescriptorStore, RegisteredBean};
