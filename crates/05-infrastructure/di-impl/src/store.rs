//! Bean 描述符存储
//!
//! 只负责保存描述符及其索引，不做任何解析。写操作（注册、注销）串行执行，
//! 读操作可以与写操作并发，注册变化对之后发起的查询可见。

use crate::singleton::SingletonSlot;
use dashmap::DashMap;
use di_abstractions::{BeanDescriptor, BeanHandle, BeanId};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 已注册的 Bean：描述符和（单例的）实例槽位
#[derive(Debug)]
pub struct RegisteredBean {
    /// 描述符
    pub descriptor: Arc<BeanDescriptor>,
    /// 单例槽位（每次请求创建的 Bean 和预构建实例没有槽位）
    pub slot: Option<Arc<SingletonSlot>>,
}

impl RegisteredBean {
    /// 内部编号
    pub fn id(&self) -> BeanId {
        self.descriptor.id
    }

    /// 诊断名称
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// 描述符存储
#[derive(Debug, Default)]
pub struct DescriptorStore {
    next_id: AtomicU64,
    beans: DashMap<BeanId, Arc<RegisteredBean>>,
    /// 暴露类型 -> 描述符
    by_exposed: DashMap<TypeId, Vec<BeanId>>,
    /// 实现类型 -> 描述符
    by_implementation: DashMap<TypeId, Vec<BeanId>>,
    handles: DashMap<BeanHandle, BeanId>,
    writes: Mutex<()>,
}

impl DescriptorStore {
    /// 创建空的存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配新的描述符编号
    pub fn next_id(&self) -> BeanId {
        BeanId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// 校验并插入描述符
    pub fn insert(&self, descriptor: BeanDescriptor) -> DependencyResult<Arc<RegisteredBean>> {
        let _writes = self.writes.lock();
        self.check_override(&descriptor)?;

        let slot = (descriptor.is_singleton() && descriptor.factory.prebuilt().is_none())
            .then(|| Arc::new(SingletonSlot::new(descriptor.name.clone())));
        let registered = Arc::new(RegisteredBean {
            descriptor: Arc::new(descriptor),
            slot,
        });

        let descriptor = &registered.descriptor;
        let id = descriptor.id;
        for exposed in &descriptor.exposed {
            self.by_exposed.entry(exposed.type_info.id).or_default().push(id);
        }
        self.by_implementation
            .entry(descriptor.implementation.id)
            .or_default()
            .push(id);
        self.handles.insert(descriptor.handle, id);
        self.beans.insert(id, Arc::clone(&registered));

        Ok(registered)
    }

    /// 按句柄移除描述符
    pub fn remove(&self, handle: &BeanHandle) -> DependencyResult<Arc<RegisteredBean>> {
        let _writes = self.writes.lock();
        let (_, id) = self
            .handles
            .remove(handle)
            .ok_or_else(|| DependencyError::HandleNotFound {
                handle: handle.to_string(),
            })?;
        let (_, registered) = self
            .beans
            .remove(&id)
            .ok_or_else(|| DependencyError::HandleNotFound {
                handle: handle.to_string(),
            })?;

        let descriptor = &registered.descriptor;
        for exposed in &descriptor.exposed {
            Self::unindex(&self.by_exposed, exposed.type_info.id, id);
        }
        Self::unindex(&self.by_implementation, descriptor.implementation.id, id);

        Ok(registered)
    }

    fn unindex(index: &DashMap<TypeId, Vec<BeanId>>, key: TypeId, id: BeanId) {
        if let Some(mut ids) = index.get_mut(&key) {
            ids.retain(|existing| *existing != id);
        }
        index.remove_if(&key, |_, ids| ids.is_empty());
    }

    /// 按编号查找
    pub fn get(&self, id: BeanId) -> Option<Arc<RegisteredBean>> {
        self.beans.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn lookup(&self, index: &DashMap<TypeId, Vec<BeanId>>, key: TypeId) -> Vec<Arc<RegisteredBean>> {
        let ids = index.get(&key).map(|ids| ids.value().clone()).unwrap_or_default();
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// 暴露了指定类型的全部描述符（按注册顺序）
    pub fn exposing(&self, type_info: &TypeInfo) -> Vec<Arc<RegisteredBean>> {
        self.lookup(&self.by_exposed, type_info.id)
    }

    /// 实现类型为指定类型的全部描述符（按注册顺序）
    pub fn implementing(&self, type_id: TypeId) -> Vec<Arc<RegisteredBean>> {
        self.lookup(&self.by_implementation, type_id)
    }

    /// 全部描述符（按注册顺序）
    pub fn all(&self) -> Vec<Arc<RegisteredBean>> {
        let mut beans: Vec<_> = self.beans.iter().map(|entry| Arc::clone(entry.value())).collect();
        beans.sort_by_key(|bean| bean.id());
        beans
    }

    /// 描述符数量
    pub fn len(&self) -> usize {
        self.beans.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }

    /// 沿覆盖边（目标 -> 目标的目标 ...）能否从 `from` 到达 `target` 实现类型
    pub fn overrides_reach(&self, from: &BeanDescriptor, target: TypeId) -> bool {
        let mut visited = HashSet::new();
        let mut pending: Vec<TypeId> = from.overrides.iter().map(|t| t.id).collect();

        while let Some(current) = pending.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            pending.extend(
                self.implementing(current)
                    .iter()
                    .filter_map(|bean| bean.descriptor.overrides.as_ref().map(|t| t.id)),
            );
        }
        false
    }

    /// 是否有其他已注册描述符覆盖了该实现类型
    pub fn is_overridden(&self, descriptor: &BeanDescriptor) -> bool {
        self.all().iter().any(|other| {
            other.id() != descriptor.id && self.overrides_reach(&other.descriptor, descriptor.implementation.id)
        })
    }

    fn check_override(&self, descriptor: &BeanDescriptor) -> DependencyResult<()> {
        let Some(target) = descriptor.overrides.as_ref() else {
            return Ok(());
        };
        let type_name = descriptor.implementation.name.to_string();

        if target.is_contract() {
            return Err(DependencyError::InterfaceOverride {
                type_name,
                target: target.name.to_string(),
            });
        }
        if *target == descriptor.implementation {
            return Err(DependencyError::invalid_descriptor(type_name, "不能覆盖自身"));
        }
        if self.overrides_reach(descriptor, descriptor.implementation.id) {
            return Err(DependencyError::invalid_descriptor(
                type_name,
                format!("覆盖 {} 会形成覆盖环", target.name),
            ));
        }
        Ok(())
    }
}
