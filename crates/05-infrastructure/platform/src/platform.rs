//! 平台生命周期
//!
//! 平台拥有一个 [`BeanManager`]，按 `Preparing -> Validated -> Started -> Stopping -> Stopped`
//! 推进状态。任意线程都可以通过 [`Platform::await_started`] 等待启动完成，
//! 异步代码使用 [`Platform::wait_started`]。

use crate::config::PlatformConfig;
use chrono::{DateTime, Utc};
use di_abstractions::{BeanContainer, ShutdownReport};
use di_impl::BeanManager;
use infrastructure_common::{InfrastructureError, InfrastructureResult, PlatformState};
use parking_lot::{Condvar, Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// 状态迁移事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformEvent {
    /// 迁移前的状态
    pub previous: PlatformState,
    /// 迁移后的状态
    pub state: PlatformState,
    /// 迁移时间
    pub at: DateTime<Utc>,
}

/// 平台状态监听器
///
/// 在 `Preparing` 事件中注册默认描述符是最常见的用法。启动过程中监听器
/// 返回错误会中止启动。
pub trait PlatformListener: Send + Sync {
    /// 状态发生变化
    fn state_changed(&self, event: &PlatformEvent, platform: &Platform) -> anyhow::Result<()>;
}

impl<F> PlatformListener for F
where
    F: Fn(&PlatformEvent, &Platform) -> anyhow::Result<()> + Send + Sync,
{
    fn state_changed(&self, event: &PlatformEvent, platform: &Platform) -> anyhow::Result<()> {
        self(event, platform)
    }
}

#[derive(Debug)]
struct PlatformStatus {
    state: PlatformState,
    starting: bool,
    has_started: bool,
    /// 已有调用方负责进入 `Stopping`/`Stopped`
    stop_claimed: bool,
    failure: Option<String>,
}

/// 平台
pub struct Platform {
    config: PlatformConfig,
    beans: Arc<BeanManager>,
    status: Mutex<PlatformStatus>,
    state_changed: Condvar,
    watch: watch::Sender<PlatformState>,
    listeners: RwLock<Vec<Arc<dyn PlatformListener>>>,
}

impl Platform {
    /// 创建平台（处于 `Preparing` 状态）
    pub fn new(config: PlatformConfig) -> Self {
        let beans = Arc::new(BeanManager::with_config(config.container.clone()));
        let (watch, _) = watch::channel(PlatformState::Preparing);
        Self {
            config,
            beans,
            status: Mutex::new(PlatformStatus {
                state: PlatformState::Preparing,
                starting: false,
                has_started: false,
                stop_claimed: false,
                failure: None,
            }),
            state_changed: Condvar::new(),
            watch,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 平台配置
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Bean 容器
    pub fn beans(&self) -> &Arc<BeanManager> {
        &self.beans
    }

    /// 当前状态
    pub fn state(&self) -> PlatformState {
        self.status.lock().state
    }

    /// 是否已启动（且未停止）
    pub fn is_started(&self) -> bool {
        self.state() == PlatformState::Started
    }

    /// 启动失败的原因
    pub fn failure(&self) -> Option<String> {
        self.status.lock().failure.clone()
    }

    /// 添加状态监听器
    pub fn add_listener(&self, listener: Arc<dyn PlatformListener>) {
        self.listeners.write().push(listener);
        debug!("添加平台监听器, 当前数量: {}", self.listeners.read().len());
    }

    /// 启动平台
    ///
    /// 依次通知 `Preparing`，校验描述符并进入 `Validated`，创建立即创建的单例并进入
    /// `Started`。任一步骤失败时关闭容器并进入 `Stopped`。
    pub fn start(&self) -> InfrastructureResult<()> {
        {
            let mut status = self.status.lock();
            if status.state != PlatformState::Preparing || status.starting || status.stop_claimed {
                return Err(InfrastructureError::InvalidStateTransition {
                    from: status.state,
                    to: PlatformState::Validated,
                });
            }
            status.starting = true;
        }
        info!("启动平台");

        match self.run_start() {
            Ok(()) => {
                info!("平台启动完成");
                Ok(())
            }
            Err(e) => {
                error!("平台启动失败: {}", e);
                self.status.lock().failure = Some(e.to_string());
                self.abort_start();
                Err(e)
            }
        }
    }

    fn run_start(&self) -> InfrastructureResult<()> {
        let preparing = PlatformEvent {
            previous: PlatformState::Preparing,
            state: PlatformState::Preparing,
            at: Utc::now(),
        };
        self.notify(&preparing, true)?;

        let report = self.beans.validate();
        info!("描述符检查完成: {} 个 Bean, {} 条警告", report.bean_count, report.warnings.len());
        self.transition(PlatformState::Validated, true)?;

        let created = self.beans.instantiate_eager()?;
        debug!("立即创建的单例: {} 个", created);
        self.transition(PlatformState::Started, true)
    }

    fn abort_start(&self) {
        if !self.claim_stop() {
            debug!("平台已在停止, 跳过启动失败后的关闭");
            return;
        }
        if let Err(e) = self.transition(PlatformState::Stopping, false) {
            warn!("启动失败后无法进入 stopping: {}", e);
        }
        let report = self.beans.shutdown();
        log_shutdown(&report);
        if let Err(e) = self.transition(PlatformState::Stopped, false) {
            warn!("启动失败后无法进入 stopped: {}", e);
        }
    }

    /// 停止平台，返回容器关闭结果
    pub fn stop(&self) -> InfrastructureResult<ShutdownReport> {
        if self.state() == PlatformState::Stopped {
            debug!("平台已经停止");
            return Ok(ShutdownReport::default());
        }
        if !self.claim_stop() {
            debug!("平台正在停止");
            return Ok(ShutdownReport::default());
        }
        info!("停止平台");

        self.transition(PlatformState::Stopping, false)?;
        let report = self.beans.shutdown();
        log_shutdown(&report);
        self.transition(PlatformState::Stopped, false)?;

        info!("平台已停止");
        Ok(report)
    }

    /// 只有第一个调用方负责关闭
    fn claim_stop(&self) -> bool {
        let mut status = self.status.lock();
        !std::mem::replace(&mut status.stop_claimed, true)
    }

    /// 阻塞等待平台启动，超时或启动失败时返回错误
    pub fn await_started(&self, timeout: Duration) -> InfrastructureResult<()> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut status = self.status.lock();

        loop {
            if let Some(outcome) = Self::start_outcome(&status) {
                return outcome;
            }
            if self.state_changed.wait_until(&mut status, deadline).timed_out() {
                if let Some(outcome) = Self::start_outcome(&status) {
                    return outcome;
                }
                return Err(InfrastructureError::StartTimeout {
                    waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                });
            }
        }
    }

    /// 使用配置中的超时时间等待平台启动
    pub fn await_started_default(&self) -> InfrastructureResult<()> {
        self.await_started(self.config.start_timeout())
    }

    /// 异步等待平台启动
    pub async fn wait_started(&self) -> InfrastructureResult<()> {
        let mut receiver = self.watch.subscribe();
        // 启动失败最终进入 Stopped，同样满足条件
        receiver
            .wait_for(|state| state.is_started())
            .await
            .map_err(|e| InfrastructureError::BootstrapFailed {
                message: format!("平台状态通道已关闭: {e}"),
            })?;
        let status = self.status.lock();
        Self::start_outcome(&status).unwrap_or_else(|| {
            Err(InfrastructureError::BootstrapFailed {
                message: format!("平台未启动, 当前状态: {}", status.state),
            })
        })
    }

    fn start_outcome(status: &PlatformStatus) -> Option<InfrastructureResult<()>> {
        if let Some(failure) = &status.failure {
            return Some(Err(InfrastructureError::BootstrapFailed {
                message: failure.clone(),
            }));
        }
        if status.has_started {
            return Some(Ok(()));
        }
        if status.state == PlatformState::Stopped {
            return Some(Err(InfrastructureError::BootstrapFailed {
                message: "平台在启动前已停止".to_string(),
            }));
        }
        None
    }

    fn transition(&self, next: PlatformState, fail_on_listener: bool) -> InfrastructureResult<()> {
        let event = {
            let mut status = self.status.lock();
            let previous = status.state;
            if !previous.can_transition_to(next) {
                return Err(InfrastructureError::InvalidStateTransition { from: previous, to: next });
            }
            status.state = next;
            PlatformEvent {
                previous,
                state: next,
                at: Utc::now(),
            }
        };

        info!("平台状态: {} -> {}", event.previous, event.state);
        let notified = self.notify(&event, fail_on_listener);
        if next == PlatformState::Started && notified.is_ok() {
            self.status.lock().has_started = true;
        }

        // 等待者在监听器执行完之后才被唤醒
        self.watch.send_replace(next);
        self.state_changed.notify_all();
        notified
    }

    fn notify(&self, event: &PlatformEvent, fail_on_listener: bool) -> InfrastructureResult<()> {
        let listeners: Vec<Arc<dyn PlatformListener>> = self.listeners.read().clone();
        for listener in listeners {
            if let Err(e) = listener.state_changed(event, self) {
                if fail_on_listener {
                    return Err(InfrastructureError::BootstrapFailed {
                        message: format!("监听器处理 {} 失败: {:#}", event.state, e),
                    });
                }
                warn!("监听器处理 {} 失败: {:#}", event.state, e);
            }
        }
        Ok(())
    }
}

fn log_shutdown(report: &ShutdownReport) {
    for failure in &report.failures {
        warn!("容器关闭: {}", failure);
    }
    info!(
        "容器关闭完成: 销毁 {} 个单例, {} 个失败",
        report.destroyed.len(),
        report.failures.len()
    );
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("state", &self.state())
            .field("beans", &self.beans)
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}
