//! 创建上下文
//!
//! 记录"当前调用链"正在创建的 Bean，随构造函数参数解析和字段注入一起向下传递。
//! 它是一个普通的值，不依赖线程本地状态。

use crate::descriptor::BeanId;
use crate::resolver::{downcast_bean, BeanResolver};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::fmt;
use std::sync::Arc;

/// 调用链上的一个节点
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChainEntry {
    id: BeanId,
    name: String,
}

/// 创建上下文
#[derive(Debug, Clone)]
pub struct CreationContext {
    /// 当前创建链，用于检测循环依赖
    chain: Vec<ChainEntry>,
    /// 最大解析深度
    max_depth: usize,
}

impl CreationContext {
    /// 创建根上下文（外部调用的起点）
    pub fn root(max_depth: usize) -> Self {
        Self {
            chain: Vec::new(),
            max_depth,
        }
    }

    /// 调用链中是否已经包含指定 Bean
    pub fn contains(&self, id: BeanId) -> bool {
        self.chain.iter().any(|entry| entry.id == id)
    }

    /// 当前深度
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// 是否为根上下文
    pub fn is_root(&self) -> bool {
        self.chain.is_empty()
    }

    /// 进入一个 Bean 的创建，返回子上下文
    pub fn enter(&self, id: BeanId, name: &str) -> DependencyResult<Self> {
        if self.contains(id) {
            return Err(self.circular(name));
        }
        if self.chain.len() >= self.max_depth {
            return Err(DependencyError::ResolutionDepthExceeded {
                depth: self.max_depth,
                dependency_chain: self.describe(name),
            });
        }

        let mut chain = self.chain.clone();
        chain.push(ChainEntry {
            id,
            name: name.to_string(),
        });
        Ok(Self {
            chain,
            max_depth: self.max_depth,
        })
    }

    /// 以 `name` 结尾的循环依赖错误
    pub fn circular(&self, name: &str) -> DependencyError {
        DependencyError::CircularDependency {
            dependency_chain: self.describe(name),
        }
    }

    /// 可读的调用链，如 `A -> B -> C -> A`
    pub fn describe(&self, next: &str) -> String {
        self.chain
            .iter()
            .map(|entry| entry.name.as_str())
            .chain(std::iter::once(next))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl Default for CreationContext {
    fn default() -> Self {
        Self::root(infrastructure_common::ContainerConfig::default().max_resolution_depth)
    }
}

impl fmt::Display for CreationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.chain.iter().map(|entry| entry.name.as_str()).collect();
        write!(f, "[{}]", names.join(" -> "))
    }
}

/// 传给构造函数和注入函数的 Bean 上下文
///
/// 通过它发起的查找都会携带当前的 [`CreationContext`]。
#[derive(Clone, Copy)]
pub struct BeanContext<'a> {
    resolver: &'a dyn BeanResolver,
    creation: &'a CreationContext,
}

impl<'a> BeanContext<'a> {
    /// 创建 Bean 上下文
    pub fn new(resolver: &'a dyn BeanResolver, creation: &'a CreationContext) -> Self {
        Self { resolver, creation }
    }

    /// 获取唯一的 Bean
    pub fn get<T>(&self) -> DependencyResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let contract = TypeInfo::contract::<T>();
        let bean = self.resolver.resolve_one(&contract, self.creation)?;
        downcast_bean(&contract, bean)
    }

    /// 获取可选的 Bean（不存在或不唯一时为 `None`）
    pub fn opt<T>(&self) -> DependencyResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let contract = TypeInfo::contract::<T>();
        self.resolver
            .resolve_opt(&contract, self.creation)?
            .map(|bean| downcast_bean(&contract, bean))
            .transpose()
    }

    /// 获取全部有效 Bean（按排序值升序）
    pub fn all<T>(&self) -> DependencyResult<Vec<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let contract = TypeInfo::contract::<T>();
        self.resolver
            .resolve_all(&contract, self.creation)?
            .into_iter()
            .map(|bean| downcast_bean(&contract, bean))
            .collect()
    }

    /// 当前创建上下文
    pub fn creation_context(&self) -> &'a CreationContext {
        self.creation
    }
}

impl fmt::Debug for BeanContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanContext")
            .field("creation", &self.creation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_detects_cycle() {
        let root = CreationContext::root(10);
        let a = root.enter(BeanId(1), "A").unwrap();
        let b = a.enter(BeanId(2), "B").unwrap();
        let c = b.enter(BeanId(3), "C").unwrap();

        match c.enter(BeanId(1), "A") {
            Err(DependencyError::CircularDependency { dependency_chain }) => {
                assert_eq!(dependency_chain, "A -> B -> C -> A");
            }
            other => panic!("期望循环依赖错误, 实际: {:?}", other),
        }
        // 父上下文不受子上下文影响
        assert_eq!(a.depth(), 1);
        assert!(root.is_root());
    }

    #[test]
    fn test_enter_respects_max_depth() {
        let root = CreationContext::root(1);
        let a = root.enter(BeanId(1), "A").unwrap();
        assert!(matches!(
            a.enter(BeanId(2), "B"),
            Err(DependencyError::ResolutionDepthExceeded { depth: 1, .. })
        ));
    }
}
