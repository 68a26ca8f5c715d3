//! 覆盖解析
//!
//! 给定查询类型，计算有效 Bean 集合：
//!
//! 1. 收集所有暴露了查询类型的描述符
//! 2. 去掉被集合中其他描述符（直接或沿覆盖链间接）覆盖的描述符；按实现类型本身查询时，
//!    任何已注册的覆盖者都会遮蔽它
//! 3. 兄弟覆盖者同时保留，由排序值区分
//! 4. 按有效排序值升序、实现类型名称升序排序
//!
//! 未显式声明排序值的覆盖者继承被覆盖者的有效排序值，可以跨越多层覆盖。

use crate::store::{DescriptorStore, RegisteredBean};
use di_abstractions::{BeanDescriptor, EffectiveBean};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// 一个有效候选
#[derive(Debug, Clone)]
pub struct Candidate {
    /// 已注册的 Bean
    pub bean: Arc<RegisteredBean>,
    /// 有效排序值
    pub rank: i32,
}

impl Candidate {
    /// 转换为对外的有效 Bean 描述
    pub fn to_effective(&self) -> EffectiveBean {
        EffectiveBean {
            descriptor: Arc::clone(&self.bean.descriptor),
            rank: self.rank,
        }
    }

    fn type_name(&self) -> &'static str {
        self.bean.descriptor.implementation.name
    }
}

/// 覆盖解析器
#[derive(Debug, Clone, Copy)]
pub struct OverrideResolver<'a> {
    store: &'a DescriptorStore,
    default_rank: i32,
}

impl<'a> OverrideResolver<'a> {
    /// 创建解析器
    pub fn new(store: &'a DescriptorStore, default_rank: i32) -> Self {
        Self { store, default_rank }
    }

    /// 计算查询类型的有效候选（按排序值升序）
    pub fn resolve_effective(&self, query: &TypeInfo) -> Vec<Candidate> {
        let collected = self.store.exposing(query);

        let mut candidates: Vec<Candidate> = collected
            .iter()
            .filter(|bean| !self.is_shadowed(bean, query, &collected))
            .map(|bean| Candidate {
                bean: Arc::clone(bean),
                rank: self.effective_rank(&bean.descriptor),
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| a.type_name().cmp(b.type_name()))
                .then_with(|| a.bean.id().cmp(&b.bean.id()))
        });

        debug!(
            "解析 {}: 收集 {} 个, 有效 {} 个",
            query.name,
            collected.len(),
            candidates.len()
        );
        candidates
    }

    fn is_shadowed(&self, bean: &RegisteredBean, query: &TypeInfo, collected: &[Arc<RegisteredBean>]) -> bool {
        let implementation = bean.descriptor.implementation.id;
        if query.id == implementation {
            // 覆盖者不必暴露被覆盖的具体类型
            return self.store.is_overridden(&bean.descriptor);
        }
        collected.iter().any(|other| {
            other.id() != bean.id() && self.store.overrides_reach(&other.descriptor, implementation)
        })
    }

    /// 有效排序值：显式声明优先，否则沿覆盖链继承，最后使用默认值
    pub fn effective_rank(&self, descriptor: &BeanDescriptor) -> i32 {
        let mut visited = HashSet::new();
        self.rank_of(descriptor, &mut visited)
    }

    fn rank_of(&self, descriptor: &BeanDescriptor, visited: &mut HashSet<TypeId>) -> i32 {
        if let Some(rank) = descriptor.rank {
            return rank;
        }
        let Some(target) = descriptor.overrides.as_ref() else {
            return self.default_rank;
        };
        if !visited.insert(descriptor.implementation.id) {
            return self.default_rank;
        }

        // 同一实现类型可能重复注册，取其中最优的排序值
        self.store
            .implementing(target.id)
            .iter()
            .map(|base| self.rank_of(&base.descriptor, visited))
            .min()
            .unwrap_or(self.default_rank)
    }

    /// 选择唯一候选
    ///
    /// 没有候选时返回 [`DependencyError::BeanNotFound`]，排序最靠前的两个候选
    /// 排序值相同时返回 [`DependencyError::AmbiguousBean`]。
    pub fn select_one(query: &TypeInfo, candidates: &[Candidate]) -> DependencyResult<Candidate> {
        match candidates {
            [] => Err(DependencyError::BeanNotFound {
                type_name: query.name.to_string(),
            }),
            [first, second, ..] if first.rank == second.rank => Err(DependencyError::AmbiguousBean {
                type_name: query.name.to_string(),
                candidates: candidates
                    .iter()
                    .take_while(|candidate| candidate.rank == first.rank)
                    .map(|candidate| candidate.bean.name().to_string())
                    .collect(),
            }),
            [first, ..] => Ok(first.clone()),
        }
    }

    /// 选择可选候选（没有或不唯一时为 `None`）
    pub fn select_opt(query: &TypeInfo, candidates: &[Candidate]) -> Option<Candidate> {
        Self::select_one(query, candidates).ok()
    }
}
