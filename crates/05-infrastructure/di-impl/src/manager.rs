//! Bean 容器门面
//!
//! [`BeanManager`] 组合描述符存储、覆盖解析、实例生产和单例生命周期管理，
//! 并负责关闭时的 predestroy 调用。

use crate::override_resolver::{Candidate, OverrideResolver};
use crate::producer::BeanProducer;
use crate::store::{DescriptorStore, RegisteredBean};
use di_abstractions::{
    BeanContainer, BeanContext, BeanDescriptor, BeanHandle, BeanResolver, BeanSpec, BoxedBean,
    CreationContext, EffectiveBean, ErasedInstance, ExposedType, InstanceSource, ShutdownReport,
    ValidationReport,
};
use infrastructure_common::{
    ContainerConfig, CreationCause, DependencyError, DependencyResult, Lifetime, TypeInfo,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Bean 容器
///
/// 显式构造、显式关闭，不存在全局实例。可以在多个线程之间共享（`Arc<BeanManager>`）。
pub struct BeanManager {
    config: ContainerConfig,
    store: DescriptorStore,
    /// 单例进入 READY 的全局顺序
    ready_sequence: AtomicU64,
    shut_down: AtomicBool,
}

impl BeanManager {
    /// 使用默认配置创建容器
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// 使用指定配置创建容器
    pub fn with_config(config: ContainerConfig) -> Self {
        info!(
            "创建 Bean 容器, 创建等待上限: {} ms, 最大解析深度: {}",
            config.creation_timeout_ms, config.max_resolution_depth
        );
        Self {
            config,
            store: DescriptorStore::new(),
            ready_sequence: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        }
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// 是否已关闭
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// 已注册的描述符数量
    pub fn bean_count(&self) -> usize {
        self.store.len()
    }

    fn ensure_running(&self) -> DependencyResult<()> {
        if self.is_shut_down() {
            return Err(DependencyError::ContainerShutDown);
        }
        Ok(())
    }

    fn resolver(&self) -> OverrideResolver<'_> {
        OverrideResolver::new(&self.store, self.config.default_rank)
    }

    fn candidates(&self, query: &TypeInfo) -> DependencyResult<Vec<Candidate>> {
        self.ensure_running()?;
        Ok(self.resolver().resolve_effective(query))
    }

    /// 获取（必要时创建）一个 Bean 的实例
    fn instantiate(&self, bean: &RegisteredBean, ctx: &CreationContext) -> DependencyResult<ErasedInstance> {
        let descriptor = &bean.descriptor;
        if let Some(instance) = descriptor.factory.prebuilt() {
            return Ok(instance);
        }
        if let Some(instance) = bean.slot.as_ref().and_then(|slot| slot.instance()) {
            return Ok(instance);
        }
        if ctx.contains(descriptor.id) {
            return Err(ctx.circular(&descriptor.name));
        }

        let child = ctx.enter(descriptor.id, &descriptor.name)?;
        let produce = || descriptor.factory.produce(&BeanContext::new(self, &child));

        match &bean.slot {
            Some(slot) => slot.obtain(
                ctx,
                self.config.creation_timeout(),
                &self.ready_sequence,
                produce,
            ),
            None => {
                debug!("创建非单例 Bean: {}", descriptor.name);
                produce().map_err(|error| DependencyError::CreationFailed {
                    bean: descriptor.name.clone(),
                    cause: CreationCause::new(error),
                })
            }
        }
    }

    fn produce_as(
        &self,
        query: &TypeInfo,
        candidate: &Candidate,
        ctx: &CreationContext,
    ) -> DependencyResult<BoxedBean> {
        let instance = self.instantiate(&candidate.bean, ctx)?;
        let descriptor = &candidate.bean.descriptor;
        descriptor
            .cast_to(query, instance)
            .ok_or_else(|| DependencyError::TypeMismatch {
                expected: query.name.to_string(),
                actual: descriptor.implementation.name.to_string(),
            })
    }

    /// 创建所有需要立即创建且未被覆盖的单例
    pub fn instantiate_eager(&self) -> DependencyResult<usize> {
        self.ensure_running()?;
        let ctx = self.root_context();
        let mut created = 0;

        for bean in self.store.all() {
            let descriptor = &bean.descriptor;
            if !descriptor.create_immediately || bean.slot.is_none() {
                continue;
            }
            if self.store.is_overridden(descriptor) {
                debug!("跳过已被覆盖的立即创建 Bean: {}", descriptor.name);
                continue;
            }
            self.instantiate(&bean, &ctx)?;
            created += 1;
        }

        info!("立即创建单例完成: {} 个", created);
        Ok(created)
    }

    fn build_descriptor<T>(&self, spec: BeanSpec<T>) -> DependencyResult<BeanDescriptor>
    where
        T: Send + Sync + 'static,
    {
        let implementation = TypeInfo::of::<T>();
        let parts = spec.into_parts();
        let prebuilt = matches!(parts.source, InstanceSource::Instance(_));

        if prebuilt && parts.lifetime == Lifetime::Transient {
            return Err(DependencyError::invalid_descriptor(
                implementation.name,
                "预构建实例只能是单例",
            ));
        }
        if parts.create_immediately && parts.lifetime == Lifetime::Transient {
            return Err(DependencyError::invalid_descriptor(
                implementation.name,
                "只有单例可以立即创建",
            ));
        }

        let name = parts
            .name
            .unwrap_or_else(|| implementation.short_name().to_string());

        let mut exposed = vec![ExposedType::implementation::<T>()];
        for extra in parts.exposed {
            if !exposed.iter().any(|e| e.type_info == extra.type_info) {
                exposed.push(extra);
            }
        }

        let factory = Arc::new(BeanProducer::new(
            name.clone(),
            parts.source,
            parts.injections,
            parts.hooks,
        ));

        Ok(BeanDescriptor {
            id: self.store.next_id(),
            handle: BeanHandle::new(),
            name,
            implementation,
            exposed,
            lifetime: parts.lifetime,
            rank: parts.rank,
            overrides: parts.overrides,
            create_immediately: parts.create_immediately,
            factory,
            registered_at: chrono::Utc::now(),
        })
    }
}

impl Default for BeanManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanResolver for BeanManager {
    fn resolve_one(&self, contract: &TypeInfo, ctx: &CreationContext) -> DependencyResult<BoxedBean> {
        let candidates = self.candidates(contract)?;
        let candidate = OverrideResolver::select_one(contract, &candidates)?;
        self.produce_as(contract, &candidate, ctx)
    }

    fn resolve_opt(
        &self,
        contract: &TypeInfo,
        ctx: &CreationContext,
    ) -> DependencyResult<Option<BoxedBean>> {
        let candidates = self.candidates(contract)?;
        OverrideResolver::select_opt(contract, &candidates)
            .map(|candidate| self.produce_as(contract, &candidate, ctx))
            .transpose()
    }

    fn resolve_all(&self, contract: &TypeInfo, ctx: &CreationContext) -> DependencyResult<Vec<BoxedBean>> {
        self.candidates(contract)?
            .iter()
            .map(|candidate| self.produce_as(contract, candidate, ctx))
            .collect()
    }
}

impl BeanContainer for BeanManager {
    fn register<T>(&self, spec: BeanSpec<T>) -> DependencyResult<BeanHandle>
    where
        T: Send + Sync + 'static,
    {
        self.ensure_running()?;
        let descriptor = self.build_descriptor(spec)?;
        let registered = self.store.insert(descriptor)?;
        let descriptor = &registered.descriptor;

        info!(
            "注册 Bean: {} ({}), 作用域: {}, 排序值: {:?}, 覆盖: {:?}",
            descriptor.name,
            descriptor.implementation.name,
            descriptor.lifetime,
            descriptor.rank,
            descriptor.overrides.as_ref().map(|t| t.name)
        );
        Ok(descriptor.handle)
    }

    fn unregister(&self, handle: &BeanHandle) -> DependencyResult<Arc<BeanDescriptor>> {
        self.ensure_running()?;
        let removed = self.store.remove(handle)?;
        info!("注销 Bean: {} ({})", removed.name(), handle);
        Ok(Arc::clone(&removed.descriptor))
    }

    fn effective_beans(&self, type_info: &TypeInfo) -> DependencyResult<Vec<EffectiveBean>> {
        Ok(self
            .candidates(type_info)?
            .iter()
            .map(Candidate::to_effective)
            .collect())
    }

    fn get_descriptor(&self, type_info: &TypeInfo) -> DependencyResult<EffectiveBean> {
        let candidates = self.candidates(type_info)?;
        OverrideResolver::select_one(type_info, &candidates).map(|candidate| candidate.to_effective())
    }

    fn opt_descriptor(&self, type_info: &TypeInfo) -> DependencyResult<Option<EffectiveBean>> {
        let candidates = self.candidates(type_info)?;
        Ok(OverrideResolver::select_opt(type_info, &candidates).map(|candidate| candidate.to_effective()))
    }

    fn registered_beans(&self) -> Vec<Arc<BeanDescriptor>> {
        self.store
            .all()
            .iter()
            .map(|bean| Arc::clone(&bean.descriptor))
            .collect()
    }

    fn root_context(&self) -> CreationContext {
        CreationContext::root(self.config.max_resolution_depth)
    }

    fn validate(&self) -> ValidationReport {
        let beans = self.store.all();
        let mut warnings = Vec::new();

        for bean in &beans {
            let descriptor = &bean.descriptor;
            if let Some(target) = &descriptor.overrides {
                if self.store.implementing(target.id).is_empty() {
                    warnings.push(format!("{} 覆盖的 {} 未注册", descriptor.name, target.name));
                }
            }
            if descriptor.create_immediately && self.store.is_overridden(descriptor) {
                warnings.push(format!("{} 已被覆盖, 不会立即创建", descriptor.name));
            }
        }

        for warning in &warnings {
            warn!("容器检查: {}", warning);
        }
        info!("容器检查完成: {} 个 Bean, {} 条警告", beans.len(), warnings.len());

        ValidationReport {
            warnings,
            bean_count: beans.len(),
        }
    }

    fn shutdown(&self) -> ShutdownReport {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("容器已经关闭");
            return ShutdownReport::default();
        }
        info!("开始关闭 Bean 容器");

        // 进行中的创建完成后才能进入快照
        let deadline = Instant::now() + self.config.creation_timeout();
        let unsettled = self
            .store
            .all()
            .iter()
            .filter_map(|bean| bean.slot.as_ref())
            .filter(|slot| !slot.close(deadline))
            .count();
        if unsettled > 0 {
            warn!("{} 个单例在关闭时仍未创建完成", unsettled);
        }

        let mut ready: Vec<(u64, Arc<RegisteredBean>, ErasedInstance)> = self
            .store
            .all()
            .into_iter()
            .filter_map(|bean| {
                let slot = bean.slot.as_ref()?;
                let seq = slot.ready_sequence()?;
                let instance = slot.instance()?;
                Some((seq, Arc::clone(&bean), instance))
            })
            .collect();
        ready.sort_by(|a, b| b.0.cmp(&a.0));

        let mut report = ShutdownReport::default();
        for (_, bean, instance) in ready {
            let failures = bean.descriptor.factory.destroy(bean.name(), &instance);
            report.destroyed.push(bean.name().to_string());
            report.failures.extend(failures);
        }

        info!(
            "Bean 容器已关闭: 销毁 {} 个单例, {} 个 predestroy 失败",
            report.destroyed.len(),
            report.failures.len()
        );
        report
    }
}

impl fmt::Debug for BeanManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanManager")
            .field("config", &self.config)
            .field("beans", &self.store.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
