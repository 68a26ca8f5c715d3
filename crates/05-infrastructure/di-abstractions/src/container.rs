//! Bean 容器抽象接口
//!
//! 提供 Bean 容器门面：注册、注销、查询与关闭

use crate::context::CreationContext;
use crate::descriptor::{BeanDescriptor, BeanHandle, BeanSpec, EffectiveBean};
use crate::resolver::{downcast_bean, BeanResolver};
use infrastructure_common::{DependencyResult, LifecycleError, TypeInfo};
use std::sync::Arc;

/// Bean 容器 trait
///
/// 查询方法只返回有效 Bean（未被覆盖者遮蔽），并按有效排序值升序排列。
pub trait BeanContainer: BeanResolver {
    /// 注册 Bean
    fn register<T>(&self, spec: BeanSpec<T>) -> DependencyResult<BeanHandle>
    where
        T: Send + Sync + 'static,
        Self: Sized;

    /// 注销 Bean，已创建的单例实例被丢弃但不会调用 predestroy 钩子
    fn unregister(&self, handle: &BeanHandle) -> DependencyResult<Arc<BeanDescriptor>>;

    /// 查询类型的全部有效 Bean（按排序值升序）
    fn effective_beans(&self, type_info: &TypeInfo) -> DependencyResult<Vec<EffectiveBean>>;

    /// 查询类型的唯一有效 Bean
    fn get_descriptor(&self, type_info: &TypeInfo) -> DependencyResult<EffectiveBean>;

    /// 查询类型的唯一有效 Bean（不存在或排序值并列时为 `None`）
    fn opt_descriptor(&self, type_info: &TypeInfo) -> DependencyResult<Option<EffectiveBean>>;

    /// 全部已注册的描述符（按注册顺序）
    fn registered_beans(&self) -> Vec<Arc<BeanDescriptor>>;

    /// 外部调用使用的根创建上下文
    fn root_context(&self) -> CreationContext;

    /// 检查容器中的描述符
    fn validate(&self) -> ValidationReport;

    /// 关闭容器，对已完成创建的单例执行 predestroy 钩子
    fn shutdown(&self) -> ShutdownReport;

    /// 获取唯一的 Bean
    fn get<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        let contract = TypeInfo::contract::<T>();
        let bean = self.resolve_one(&contract, &self.root_context())?;
        downcast_bean(&contract, bean)
    }

    /// 获取可选的 Bean（不存在或排序值并列时为 `None`）
    fn opt<T>(&self) -> DependencyResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        let contract = TypeInfo::contract::<T>();
        self.resolve_opt(&contract, &self.root_context())?
            .map(|bean| downcast_bean(&contract, bean))
            .transpose()
    }

    /// 获取全部有效 Bean（按排序值升序）
    fn all<T>(&self) -> DependencyResult<Vec<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
        Self: Sized,
    {
        let contract = TypeInfo::contract::<T>();
        self.resolve_all(&contract, &self.root_context())?
            .into_iter()
            .map(|bean| downcast_bean(&contract, bean))
            .collect()
    }

    /// 查询类型的全部有效 Bean 描述
    fn descriptors<T>(&self) -> DependencyResult<Vec<EffectiveBean>>
    where
        T: ?Sized + 'static,
        Self: Sized,
    {
        self.effective_beans(&TypeInfo::contract::<T>())
    }

    /// 是否存在可以满足该类型的 Bean
    fn is_registered<T>(&self) -> bool
    where
        T: ?Sized + 'static,
        Self: Sized,
    {
        self.effective_beans(&TypeInfo::contract::<T>())
            .map(|beans| !beans.is_empty())
            .unwrap_or(false)
    }
}

/// 容器检查结果
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// 检查出的警告（不阻止启动）
    pub warnings: Vec<String>,
    /// 已注册的描述符数量
    pub bean_count: usize,
}

impl ValidationReport {
    /// 是否没有任何警告
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// 容器关闭结果
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    /// 执行过 predestroy 的 Bean（按执行顺序）
    pub destroyed: Vec<String>,
    /// 失败的 predestroy 钩子
    pub failures: Vec<LifecycleError>,
}

impl ShutdownReport {
    /// 是否没有失败的钩子
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

