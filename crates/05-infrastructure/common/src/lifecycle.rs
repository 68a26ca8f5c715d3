//! Bean 与平台生命周期

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bean 生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// 单例模式 - 每个容器只创建一个实例（延迟创建）
    Singleton,
    /// 瞬时模式 - 每次请求都创建新实例
    Transient,
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::Transient
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => f.write_str("singleton"),
            Self::Transient => f.write_str("transient"),
        }
    }
}

/// 平台生命周期状态
///
/// 状态严格按 `Preparing -> Validated -> Started -> Stopping -> Stopped` 推进，
/// 启动失败时允许从任意未停止的状态直接进入 `Stopping`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformState {
    /// 准备中，监听器可以在此阶段注册默认描述符
    Preparing,
    /// 描述符存储已校验
    Validated,
    /// 已启动
    Started,
    /// 停止中
    Stopping,
    /// 已停止
    Stopped,
}

impl PlatformState {
    /// 是否允许迁移到目标状态
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Preparing, Self::Validated)
                | (Self::Validated, Self::Started)
                | (Self::Preparing | Self::Validated | Self::Started, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
        )
    }

    /// 是否已经到达（或越过）启动状态
    pub fn is_started(self) -> bool {
        self >= Self::Started
    }
}

impl fmt::Display for PlatformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preparing => "preparing",
            Self::Validated => "validated",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_state_transitions() {
        assert!(PlatformState::Preparing.can_transition_to(PlatformState::Validated));
        assert!(PlatformState::Validated.can_transition_to(PlatformState::Started));
        assert!(PlatformState::Started.can_transition_to(PlatformState::Stopping));
        assert!(PlatformState::Preparing.can_transition_to(PlatformState::Stopping));
        assert!(PlatformState::Stopping.can_transition_to(PlatformState::Stopped));

        assert!(!PlatformState::Preparing.can_transition_to(PlatformState::Started));
        assert!(!PlatformState::Stopped.can_transition_to(PlatformState::Preparing));
        assert!(!PlatformState::Started.can_transition_to(PlatformState::Validated));
    }

    #[test]
    fn test_default_lifetime_is_transient() {
        assert_eq!(Lifetime::default(), Lifetime::Transient);
        assert!(PlatformState::Stopping.is_started());
        assert!(!PlatformState::Validated.is_started());
    }
}
