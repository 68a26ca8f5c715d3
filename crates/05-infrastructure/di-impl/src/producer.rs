//! 实例生产
//!
//! 按顺序执行：构造函数（构造注入） -> 字段注入 -> post-construct 钩子。
//! 任意阶段失败都会中止本次创建，已经执行的副作用不回滚。

use anyhow::Context;
use di_abstractions::{
    BeanContext, BeanFactory, ErasedInstance, FieldInjection, HookPhase, InstanceSource, LifecycleHooks,
};
use infrastructure_common::LifecycleError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// 基于 [`di_abstractions::BeanSpec`] 的实例工厂
pub struct BeanProducer<T> {
    bean: String,
    source: InstanceSource<T>,
    injections: Vec<FieldInjection<T>>,
    hooks: LifecycleHooks<T>,
}

impl<T: Send + Sync + 'static> BeanProducer<T> {
    /// 创建实例工厂
    pub fn new(
        bean: impl Into<String>,
        source: InstanceSource<T>,
        injections: Vec<FieldInjection<T>>,
        hooks: LifecycleHooks<T>,
    ) -> Self {
        Self {
            bean: bean.into(),
            source,
            injections,
            hooks,
        }
    }

    fn construct(&self, ctx: &BeanContext<'_>) -> anyhow::Result<Arc<T>> {
        let constructor = match &self.source {
            InstanceSource::Constructor(constructor) => constructor,
            InstanceSource::Instance(instance) => return Ok(Arc::clone(instance)),
        };

        debug!("构造 Bean: {}", self.bean);
        let mut instance = constructor(ctx)?;

        for injection in &self.injections {
            debug!("注入字段: {}.{}", self.bean, injection.field);
            (injection.inject)(&mut instance, ctx)
                .with_context(|| format!("字段注入失败: {}.{}", self.bean, injection.field))?;
        }

        let instance = Arc::new(instance);
        for hook in self.hooks.hooks(HookPhase::PostConstruct) {
            debug!("执行 post-construct: {}::{}", hook.owner, hook.name);
            (hook.run)(&*instance)
                .with_context(|| format!("post-construct 钩子失败: {}::{}", hook.owner, hook.name))?;
        }

        Ok(instance)
    }
}

impl<T: Send + Sync + 'static> BeanFactory for BeanProducer<T> {
    fn produce(&self, ctx: &BeanContext<'_>) -> anyhow::Result<ErasedInstance> {
        Ok(self.construct(ctx)? as ErasedInstance)
    }

    fn prebuilt(&self) -> Option<ErasedInstance> {
        match &self.source {
            InstanceSource::Instance(instance) => Some(Arc::clone(instance) as ErasedInstance),
            InstanceSource::Constructor(_) => None,
        }
    }

    fn destroy(&self, bean: &str, instance: &ErasedInstance) -> Vec<LifecycleError> {
        let Ok(instance) = Arc::clone(instance).downcast::<T>() else {
            return vec![LifecycleError::InstanceMismatch {
                bean: bean.to_string(),
            }];
        };

        let mut failures = Vec::new();
        for hook in self.hooks.hooks(HookPhase::PreDestroy) {
            debug!("执行 predestroy: {}::{}", hook.owner, hook.name);
            if let Err(error) = (hook.run)(&*instance) {
                warn!("predestroy 钩子失败: {}::{}, 错误: {:#}", hook.owner, hook.name, error);
                failures.push(LifecycleError::PreDestroyFailed {
                    bean: bean.to_string(),
                    hook: format!("{}::{}", hook.owner, hook.name),
                    message: format!("{error:#}"),
                });
            }
        }
        failures
    }

    fn post_construct_count(&self) -> usize {
        self.hooks.count(HookPhase::PostConstruct)
    }

    fn pre_destroy_count(&self) -> usize {
        self.hooks.count(HookPhase::PreDestroy)
    }
}

impl<T> fmt::Debug for BeanProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanProducer")
            .field("bean", &self.bean)
            .field("injections", &self.injections.len())
            .field("hooks", &self.hooks)
            .finish()
    }
}
