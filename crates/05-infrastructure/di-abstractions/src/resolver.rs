//! Bean 解析器抽象接口
//!
//! 对象安全的解析接口，构造函数与字段注入通过它递归地查找依赖

use crate::context::CreationContext;
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::any::Any;
use std::sync::Arc;

/// 已转换为查询类型的 Bean
///
/// 内部是一个 `Arc<T>`，`T` 为查询类型（可以是 `dyn Trait`）。
pub type BoxedBean = Box<dyn Any + Send + Sync>;

/// Bean 解析器 trait
///
/// 所有方法都接收调用方的 [`CreationContext`]，以便发现同一调用链上的循环依赖。
pub trait BeanResolver: Send + Sync {
    /// 解析唯一的 Bean（不存在或排序值并列时失败）
    fn resolve_one(&self, contract: &TypeInfo, ctx: &CreationContext) -> DependencyResult<BoxedBean>;

    /// 解析可选的 Bean（不存在或排序值并列时返回 `None`）
    fn resolve_opt(
        &self,
        contract: &TypeInfo,
        ctx: &CreationContext,
    ) -> DependencyResult<Option<BoxedBean>>;

    /// 解析全部有效 Bean
    fn resolve_all(&self, contract: &TypeInfo, ctx: &CreationContext) -> DependencyResult<Vec<BoxedBean>>;
}

/// 把解析结果还原为 `Arc<T>`
pub fn downcast_bean<T>(contract: &TypeInfo, bean: BoxedBean) -> DependencyResult<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    bean.downcast::<Arc<T>>()
        .map(|typed| *typed)
        .map_err(|_| DependencyError::TypeMismatch {
            expected: contract.name.to_string(),
            actual: "<unknown>".to_string(),
        })
}
