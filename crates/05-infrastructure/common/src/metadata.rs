//! 元数据定义
//!
//! 提供 Bean 查询和注册所使用的类型元数据

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// 具体实现类型（可以被实例化、可以作为覆盖目标）
    Concrete,
    /// 契约类型（trait object，仅描述接口）
    Contract,
}

/// 类型信息
///
/// 相等性与哈希只基于 [`TypeId`]，`kind` 只描述该类型以何种身份被引用。
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// 完整类型名称（包含模块路径）
    pub name: &'static str,
    /// 类型ID
    pub id: TypeId,
    /// 类型种类
    pub kind: TypeKind,
}

impl TypeInfo {
    /// 具体类型的类型信息
    pub fn of<T: 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
            kind: TypeKind::Concrete,
        }
    }

    /// 契约类型（通常是 `dyn Trait`）的类型信息
    pub fn contract<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
            kind: TypeKind::Contract,
        }
    }

    /// 是否为契约类型
    pub fn is_contract(&self) -> bool {
        self.kind == TypeKind::Contract
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        let name = self.name;
        // 泛型参数中也可能出现 "::"，只截取最外层路径
        let head = name.split('<').next().unwrap_or(name);
        match head.rfind("::") {
            Some(pos) => &name[pos + 2..],
            None => name,
        }
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(other.name).then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
