//! Bean 工厂抽象接口
//!
//! 类型擦除后的实例生产接口，由描述符持有

use crate::context::BeanContext;
use infrastructure_common::LifecycleError;
use std::any::Any;
use std::sync::Arc;

/// 类型擦除的实例（内部是实现类型的 `Arc`）
pub type ErasedInstance = Arc<dyn Any + Send + Sync>;

/// Bean 工厂 trait
///
/// 用于创建和销毁实例
pub trait BeanFactory: Send + Sync {
    /// 创建实例（构造、字段注入、post-construct）
    fn produce(&self, ctx: &BeanContext<'_>) -> anyhow::Result<ErasedInstance>;

    /// 预先构建好的实例，容器不会为它调用 predestroy 钩子
    fn prebuilt(&self) -> Option<ErasedInstance> {
        None
    }

    /// 执行 predestroy 钩子，返回每个失败的钩子
    fn destroy(&self, bean: &str, instance: &ErasedInstance) -> Vec<LifecycleError>;

    /// post-construct 钩子数量
    fn post_construct_count(&self) -> usize {
        0
    }

    /// predestroy 钩子数量
    fn pre_destroy_count(&self) -> usize {
        0
    }
}
