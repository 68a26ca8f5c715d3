//! 生命周期钩子声明
//!
//! post-construct 与 predestroy 钩子按声明类型显式登记，不依赖虚分派：
//! 基类型的钩子总是排在子类型的钩子之前。

use std::fmt;
use std::sync::Arc;

/// 钩子阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// 创建完成后执行
    PostConstruct,
    /// 容器关闭前执行
    PreDestroy,
}

/// 钩子函数类型
pub type HookFn<T> = Arc<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// 单个钩子声明
pub struct HookDecl<T> {
    /// 声明该钩子的类型名称
    pub owner: &'static str,
    /// 钩子名称
    pub name: &'static str,
    /// 钩子阶段
    pub phase: HookPhase,
    /// 钩子函数
    pub run: HookFn<T>,
}

impl<T> HookDecl<T> {
    fn same_key(&self, owner: &str, name: &str, phase: HookPhase) -> bool {
        self.owner == owner && self.name == name && self.phase == phase
    }
}

impl<T> Clone for HookDecl<T> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            name: self.name,
            phase: self.phase,
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> fmt::Debug for HookDecl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDecl")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("phase", &self.phase)
            .finish()
    }
}

/// 一个类型的全部生命周期钩子
///
/// 钩子以 (声明类型, 名称, 阶段) 为键，同一个键只登记一次。
pub struct LifecycleHooks<T> {
    hooks: Vec<HookDecl<T>>,
}

impl<T: Send + Sync + 'static> LifecycleHooks<T> {
    /// 创建空的钩子集合
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// 声明 post-construct 钩子
    pub fn post_construct<F>(self, name: &'static str, hook: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.declare(HookPhase::PostConstruct, name, Arc::new(hook))
    }

    /// 声明 predestroy 钩子
    pub fn pre_destroy<F>(self, name: &'static str, hook: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.declare(HookPhase::PreDestroy, name, Arc::new(hook))
    }

    fn declare(mut self, phase: HookPhase, name: &'static str, run: HookFn<T>) -> Self {
        let owner = std::any::type_name::<T>();
        if !self.contains(owner, name, phase) {
            self.hooks.push(HookDecl {
                owner,
                name,
                phase,
                run,
            });
        }
        self
    }

    /// 继承基类型的钩子
    ///
    /// `project` 从当前类型取出内嵌的基类型部分。基类型钩子排在已有钩子之前，
    /// 已经登记过的同键钩子被跳过。
    pub fn inherit<B, P>(mut self, base: &LifecycleHooks<B>, project: P) -> Self
    where
        B: Send + Sync + 'static,
        P: Fn(&T) -> &B + Send + Sync + 'static,
    {
        let project = Arc::new(project);
        let inherited: Vec<HookDecl<T>> = base
            .hooks
            .iter()
            .filter(|decl| !self.contains(decl.owner, decl.name, decl.phase))
            .map(|decl| {
                let run = Arc::clone(&decl.run);
                let project = Arc::clone(&project);
                HookDecl {
                    owner: decl.owner,
                    name: decl.name,
                    phase: decl.phase,
                    run: Arc::new(move |bean: &T| run((*project)(bean))) as HookFn<T>,
                }
            })
            .collect();

        let own = std::mem::take(&mut self.hooks);
        self.hooks = inherited;
        self.hooks.extend(own);
        self
    }

    fn contains(&self, owner: &str, name: &str, phase: HookPhase) -> bool {
        self.hooks.iter().any(|decl| decl.same_key(owner, name, phase))
    }

    /// 指定阶段的钩子（基类型在前）
    pub fn hooks(&self, phase: HookPhase) -> impl Iterator<Item = &HookDecl<T>> {
        self.hooks.iter().filter(move |decl| decl.phase == phase)
    }

    /// 指定阶段的钩子数量
    pub fn count(&self, phase: HookPhase) -> usize {
        self.hooks(phase).count()
    }

    /// 是否没有任何钩子
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl<T: Send + Sync + 'static> Default for LifecycleHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for LifecycleHooks<T> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

impl<T> fmt::Debug for LifecycleHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.hooks.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Base {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    struct Derived {
        base: Base,
    }

    fn base_hooks() -> LifecycleHooks<Base> {
        LifecycleHooks::new()
            .post_construct("init", |b: &Base| {
                b.log.lock().push("base.init");
                Ok(())
            })
            .pre_destroy("close", |b: &Base| {
                b.log.lock().push("base.close");
                Ok(())
            })
    }

    #[test]
    fn test_base_hooks_run_before_derived_hooks() {
        let hooks = LifecycleHooks::<Derived>::new()
            .post_construct("init", |d: &Derived| {
                d.base.log.lock().push("derived.init");
                Ok(())
            })
            .inherit(&base_hooks(), |d: &Derived| &d.base);

        let log = Arc::new(Mutex::new(Vec::new()));
        let bean = Derived {
            base: Base {
                log: Arc::clone(&log),
            },
        };
        for hook in hooks.hooks(HookPhase::PostConstruct) {
            (hook.run)(&bean).unwrap();
        }

        assert_eq!(*log.lock(), vec!["base.init", "derived.init"]);
        assert_eq!(hooks.count(HookPhase::PostConstruct), 2);
        assert_eq!(hooks.count(HookPhase::PreDestroy), 1);
    }

    #[test]
    fn test_duplicate_declaration_is_ignored() {
        let hooks = LifecycleHooks::<Base>::new()
            .post_construct("init", |_b: &Base| Ok(()))
            .post_construct("init", |_b: &Base| Ok(()))
            .post_construct("warmup", |_b: &Base| Ok(()));

        assert_eq!(hooks.count(HookPhase::PostConstruct), 2);
    }
}
