//! Bean 描述符
//!
//! [`BeanSpec`] 是调用方构建的强类型描述，注册后由容器转换为类型擦除的
//! [`BeanDescriptor`]。描述符本身只是数据，不包含解析行为。

use crate::context::BeanContext;
use crate::factory::{BeanFactory, ErasedInstance};
use crate::hooks::LifecycleHooks;
use infrastructure_common::{Lifetime, TypeInfo};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 描述符的内部编号（按注册顺序递增）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BeanId(pub u64);

impl fmt::Display for BeanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 注册句柄，用于注销
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BeanHandle(uuid::Uuid);

impl BeanHandle {
    /// 生成新的句柄
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for BeanHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BeanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type CastFn = Arc<dyn Fn(ErasedInstance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Bean 对外暴露的一个类型及其转换函数
#[derive(Clone)]
pub struct ExposedType {
    /// 暴露的类型
    pub type_info: TypeInfo,
    cast: CastFn,
}

impl ExposedType {
    /// 暴露实现类型本身
    pub fn implementation<T: Send + Sync + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            cast: Arc::new(|instance: ErasedInstance| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|typed| Box::new(typed) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// 通过显式转换函数暴露一个契约类型
    pub fn contract<T, I, F>(cast: F) -> Self
    where
        T: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Self {
            type_info: TypeInfo::contract::<I>(),
            cast: Arc::new(move |instance: ErasedInstance| {
                instance
                    .downcast::<T>()
                    .ok()
                    .map(|typed| Box::new(cast(typed)) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// 把实例转换为暴露类型（结果内部是 `Arc<I>`）
    pub fn cast(&self, instance: ErasedInstance) -> Option<Box<dyn Any + Send + Sync>> {
        (self.cast)(instance)
    }
}

impl fmt::Debug for ExposedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExposedType").field(&self.type_info.name).finish()
    }
}

/// 注册后的 Bean 描述符
pub struct BeanDescriptor {
    /// 内部编号
    pub id: BeanId,
    /// 注册句柄
    pub handle: BeanHandle,
    /// 诊断名称
    pub name: String,
    /// 实现类型
    pub implementation: TypeInfo,
    /// 暴露的类型（第一个总是实现类型本身）
    pub exposed: Vec<ExposedType>,
    /// 作用域
    pub lifetime: Lifetime,
    /// 显式声明的排序值
    pub rank: Option<i32>,
    /// 覆盖目标
    pub overrides: Option<TypeInfo>,
    /// 平台启动时是否立即创建
    pub create_immediately: bool,
    /// 实例工厂
    pub factory: Arc<dyn BeanFactory>,
    /// 注册时间
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

impl BeanDescriptor {
    /// 是否为单例
    pub fn is_singleton(&self) -> bool {
        self.lifetime == Lifetime::Singleton
    }

    /// 是否暴露指定类型
    pub fn exposes(&self, type_info: &TypeInfo) -> bool {
        self.exposed.iter().any(|exposed| &exposed.type_info == type_info)
    }

    /// 把实例转换为查询类型
    pub fn cast_to(
        &self,
        type_info: &TypeInfo,
        instance: ErasedInstance,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        self.exposed
            .iter()
            .find(|exposed| &exposed.type_info == type_info)
            .and_then(|exposed| exposed.cast(instance))
    }
}

impl fmt::Debug for BeanDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDescriptor")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("name", &self.name)
            .field("implementation", &self.implementation.name)
            .field("exposed", &self.exposed)
            .field("lifetime", &self.lifetime)
            .field("rank", &self.rank)
            .field("overrides", &self.overrides.as_ref().map(|t| t.name))
            .field("create_immediately", &self.create_immediately)
            .field("factory", &"<factory>")
            .finish()
    }
}

/// 查询得到的有效 Bean 及其有效排序值
#[derive(Debug, Clone)]
pub struct EffectiveBean {
    /// 描述符
    pub descriptor: Arc<BeanDescriptor>,
    /// 有效排序值（显式声明或沿覆盖链继承）
    pub rank: i32,
}

impl EffectiveBean {
    /// 实现类型名称
    pub fn type_name(&self) -> &'static str {
        self.descriptor.implementation.name
    }
}

/// 构造函数类型
pub type Constructor<T> = Arc<dyn Fn(&BeanContext<'_>) -> anyhow::Result<T> + Send + Sync>;

/// 字段注入函数类型
pub type Injector<T> = Arc<dyn Fn(&mut T, &BeanContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// 实例来源
pub enum InstanceSource<T> {
    /// 通过构造函数创建
    Constructor(Constructor<T>),
    /// 预先构建的实例
    Instance(Arc<T>),
}

/// 一个待注入的字段
pub struct FieldInjection<T> {
    /// 字段名称（用于日志和错误信息）
    pub field: &'static str,
    /// 注入函数
    pub inject: Injector<T>,
}

/// Bean 描述（注册入参）
///
/// ```ignore
/// let spec = BeanSpec::new(|ctx| Ok(Greeting::new(ctx.get::<dyn Clock>()?)))
///     .singleton()
///     .rank(11)
///     .exposes::<dyn Greeter, _>(|bean| bean as Arc<dyn Greeter>)
///     .post_construct("warmup", |bean| bean.warmup());
/// ```
pub struct BeanSpec<T> {
    name: Option<String>,
    lifetime: Lifetime,
    rank: Option<i32>,
    overrides: Option<TypeInfo>,
    create_immediately: bool,
    source: InstanceSource<T>,
    injections: Vec<FieldInjection<T>>,
    hooks: LifecycleHooks<T>,
    exposed: Vec<ExposedType>,
}

/// 拆解后的 Bean 描述，供容器实现使用
pub struct BeanSpecParts<T> {
    /// 诊断名称
    pub name: Option<String>,
    /// 作用域
    pub lifetime: Lifetime,
    /// 显式排序值
    pub rank: Option<i32>,
    /// 覆盖目标
    pub overrides: Option<TypeInfo>,
    /// 平台启动时立即创建
    pub create_immediately: bool,
    /// 实例来源
    pub source: InstanceSource<T>,
    /// 字段注入
    pub injections: Vec<FieldInjection<T>>,
    /// 生命周期钩子
    pub hooks: LifecycleHooks<T>,
    /// 额外暴露的类型（不含实现类型本身）
    pub exposed: Vec<ExposedType>,
}

impl<T: Send + Sync + 'static> BeanSpec<T> {
    fn from_source(source: InstanceSource<T>, lifetime: Lifetime) -> Self {
        Self {
            name: None,
            lifetime,
            rank: None,
            overrides: None,
            create_immediately: false,
            source,
            injections: Vec::new(),
            hooks: LifecycleHooks::new(),
            exposed: Vec::new(),
        }
    }

    /// 使用构造函数（构造函数注入通过 [`BeanContext`] 完成）
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(&BeanContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::from_source(InstanceSource::Constructor(Arc::new(constructor)), Lifetime::default())
    }

    /// 使用预先构建的实例（总是单例）
    pub fn instance(instance: Arc<T>) -> Self {
        Self::from_source(InstanceSource::Instance(instance), Lifetime::Singleton)
    }

    /// 设置诊断名称
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 设置作用域
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// 单例作用域
    pub fn singleton(self) -> Self {
        self.lifetime(Lifetime::Singleton)
    }

    /// 每次请求都创建新实例
    pub fn transient(self) -> Self {
        self.lifetime(Lifetime::Transient)
    }

    /// 设置排序值（越小越优先）
    pub fn rank(mut self, rank: i32) -> Self {
        self.rank = Some(rank);
        self
    }

    /// 覆盖指定的具体类型
    pub fn overrides<B: 'static>(self) -> Self {
        self.overrides_type(TypeInfo::of::<B>())
    }

    /// 覆盖指定类型（契约类型会在注册时被拒绝）
    pub fn overrides_type(mut self, target: TypeInfo) -> Self {
        self.overrides = Some(target);
        self
    }

    /// 平台启动时立即创建
    pub fn create_immediately(mut self) -> Self {
        self.create_immediately = true;
        self
    }

    /// 以契约类型暴露
    pub fn exposes<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.exposed.push(ExposedType::contract::<T, I, F>(cast));
        self
    }

    /// 字段注入
    pub fn inject<F>(mut self, field: &'static str, inject: F) -> Self
    where
        F: Fn(&mut T, &BeanContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.injections.push(FieldInjection {
            field,
            inject: Arc::new(inject),
        });
        self
    }

    /// 注入唯一的 Bean
    pub fn inject_one<I, S>(self, field: &'static str, set: S) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        S: Fn(&mut T, Arc<I>) + Send + Sync + 'static,
    {
        self.inject(field, move |bean: &mut T, ctx: &BeanContext<'_>| {
            set(bean, ctx.get::<I>()?);
            Ok(())
        })
    }

    /// 注入可选的 Bean
    pub fn inject_opt<I, S>(self, field: &'static str, set: S) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        S: Fn(&mut T, Option<Arc<I>>) + Send + Sync + 'static,
    {
        self.inject(field, move |bean: &mut T, ctx: &BeanContext<'_>| {
            set(bean, ctx.opt::<I>()?);
            Ok(())
        })
    }

    /// 注入全部有效 Bean
    pub fn inject_all<I, S>(self, field: &'static str, set: S) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        S: Fn(&mut T, Vec<Arc<I>>) + Send + Sync + 'static,
    {
        self.inject(field, move |bean: &mut T, ctx: &BeanContext<'_>| {
            set(bean, ctx.all::<I>()?);
            Ok(())
        })
    }

    /// 声明 post-construct 钩子
    pub fn post_construct<F>(mut self, name: &'static str, hook: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks = self.hooks.post_construct(name, hook);
        self
    }

    /// 声明 predestroy 钩子
    pub fn pre_destroy<F>(mut self, name: &'static str, hook: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks = self.hooks.pre_destroy(name, hook);
        self
    }

    /// 继承基类型声明的钩子（排在本类型钩子之前）
    pub fn inherit_hooks<B, P>(mut self, base: &LifecycleHooks<B>, project: P) -> Self
    where
        B: Send + Sync + 'static,
        P: Fn(&T) -> &B + Send + Sync + 'static,
    {
        self.hooks = self.hooks.inherit(base, project);
        self
    }

    /// 直接设置完整的钩子集合
    pub fn hooks(mut self, hooks: LifecycleHooks<T>) -> Self {
        self.hooks = hooks;
        self
    }

    /// 实现类型
    pub fn implementation(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    /// 拆解为各组成部分
    pub fn into_parts(self) -> BeanSpecParts<T> {
        BeanSpecParts {
            name: self.name,
            lifetime: self.lifetime,
            rank: self.rank,
            overrides: self.overrides,
            create_immediately: self.create_immediately,
            source: self.source,
            injections: self.injections,
            hooks: self.hooks,
            exposed: self.exposed,
        }
    }
}

impl<T: Default + Send + Sync + 'static> BeanSpec<T> {
    /// 使用 `Default` 构造
    pub fn default_constructed() -> Self {
        Self::new(|_ctx: &BeanContext<'_>| Ok(T::default()))
    }
}

impl<T> fmt::Debug for BeanSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanSpec")
            .field("implementation", &std::any::type_name::<T>())
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .field("rank", &self.rank)
            .field("overrides", &self.overrides.as_ref().map(|t| t.name))
            .field("create_immediately", &self.create_immediately)
            .field("injections", &self.injections.len())
            .field("hooks", &self.hooks)
            .field("exposed", &self.exposed)
            .finish()
    }
}
