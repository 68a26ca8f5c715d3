//! 单例生命周期管理
//!
//! 每个单例描述符拥有一个独立的 [`SingletonSlot`]：
//!
//! - 已发布的实例保存在 `OnceCell` 中，读取无需加锁
//! - 创建过程由 `Mutex` + `Condvar` 协调，同一时刻只有一个线程在创建
//! - 同一线程重入正在创建的槽位立即返回循环依赖错误
//! - 跨线程等待有上限，超时返回包装了 [`DependencyError::CreationTimeout`] 的创建失败
//! - 创建失败不会被缓存，槽位回到空闲状态
//! - 关闭时先拒绝新的创建，再等待进行中的创建完成；等待超时后完成的创建不再发布

use di_abstractions::{CreationContext, ErasedInstance};
use infrastructure_common::{CreationCause, DependencyError, DependencyResult};
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 槽位状态（READY 由 `OnceCell` 表达）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// 没有线程在创建
    Idle,
    /// 某个线程正在执行第 `generation` 次创建
    Creating { owner: ThreadId, generation: u64 },
}

#[derive(Debug)]
struct SlotInner {
    state: SlotState,
    /// 最近一次创建尝试的编号
    generation: u64,
    /// 最近一次失败的尝试及其原因
    last_failure: Option<(u64, CreationCause)>,
    /// 容器正在关闭，不再开始新的创建
    draining: bool,
    /// 关闭已完成快照，进行中的创建不再发布
    closed: bool,
}

/// 加锁期间做出的决定
enum Step {
    Done(DependencyResult<ErasedInstance>),
    Create(u64),
}

/// 单例槽位
pub struct SingletonSlot {
    bean: String,
    instance: OnceCell<ErasedInstance>,
    /// 进入 READY 的顺序号，0 表示从未就绪
    ready_seq: AtomicU64,
    inner: Mutex<SlotInner>,
    changed: Condvar,
}

impl SingletonSlot {
    /// 创建空槽位
    pub fn new(bean: impl Into<String>) -> Self {
        Self {
            bean: bean.into(),
            instance: OnceCell::new(),
            ready_seq: AtomicU64::new(0),
            inner: Mutex::new(SlotInner {
                state: SlotState::Idle,
                generation: 0,
                last_failure: None,
                draining: false,
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Bean 名称
    pub fn bean(&self) -> &str {
        &self.bean
    }

    /// 已发布的实例
    pub fn instance(&self) -> Option<ErasedInstance> {
        self.instance.get().cloned()
    }

    /// 是否已就绪
    pub fn is_ready(&self) -> bool {
        self.instance.get().is_some()
    }

    /// 是否有线程正在创建
    pub fn is_creating(&self) -> bool {
        matches!(self.inner.lock().state, SlotState::Creating { .. })
    }

    /// 进入 READY 的顺序号
    pub fn ready_sequence(&self) -> Option<u64> {
        match self.ready_seq.load(Ordering::Acquire) {
            0 => None,
            seq => Some(seq),
        }
    }

    /// 创建尝试次数
    pub fn attempts(&self) -> u64 {
        self.inner.lock().generation
    }

    /// 拒绝新的创建，并等待进行中的创建结束（最多到 `deadline`）
    ///
    /// 返回 `false` 表示仍有创建未结束，它完成后不会再发布实例。
    pub fn close(&self, deadline: Instant) -> bool {
        let me = thread::current().id();
        let mut inner = self.inner.lock();
        inner.draining = true;

        loop {
            let state = inner.state;
            match state {
                SlotState::Idle => break,
                // 在当前线程的创建过程中关闭容器，无法等待自己
                SlotState::Creating { owner, .. } if owner == me => break,
                SlotState::Creating { .. } => {
                    debug!("关闭前等待单例创建完成: {}", self.bean);
                    if self.changed.wait_until(&mut inner, deadline).timed_out() {
                        break;
                    }
                }
            }
        }

        inner.closed = true;
        let settled = inner.state == SlotState::Idle;
        if !settled {
            warn!("关闭时单例仍在创建, 创建结果将被丢弃: {}", self.bean);
        }
        settled
    }

    /// 获取实例，必要时调用 `create` 创建
    ///
    /// `sequence` 是容器级别的就绪计数器，用于关闭时的逆序销毁。
    pub fn obtain<F>(
        &self,
        ctx: &CreationContext,
        timeout: Duration,
        sequence: &AtomicU64,
        create: F,
    ) -> DependencyResult<ErasedInstance>
    where
        F: FnOnce() -> anyhow::Result<ErasedInstance>,
    {
        if let Some(instance) = self.instance.get() {
            return Ok(Arc::clone(instance));
        }

        match self.next_step(ctx, timeout) {
            Step::Done(result) => result,
            Step::Create(generation) => {
                debug!("开始创建单例: {} (第 {} 次尝试)", self.bean, generation);
                let attempt = CreationAttempt {
                    slot: self,
                    generation,
                    finished: false,
                };
                attempt.finish(create(), sequence)
            }
        }
    }

    fn next_step(&self, ctx: &CreationContext, timeout: Duration) -> Step {
        let me = thread::current().id();
        let started = Instant::now();
        let deadline = started + timeout;
        let mut awaited: Option<u64> = None;
        let mut inner = self.inner.lock();

        loop {
            if let Some(instance) = self.instance.get() {
                return Step::Done(Ok(Arc::clone(instance)));
            }

            // 等待过的那次尝试失败了，共享同一个失败原因
            if let (Some(waited_for), Some((failed, cause))) = (awaited, &inner.last_failure) {
                if waited_for == *failed {
                    return Step::Done(Err(DependencyError::CreationFailed {
                        bean: self.bean.clone(),
                        cause: cause.clone(),
                    }));
                }
            }

            let state = inner.state;
            match state {
                SlotState::Idle if inner.draining => {
                    return Step::Done(Err(DependencyError::ContainerShutDown));
                }
                SlotState::Idle => {
                    inner.generation += 1;
                    let generation = inner.generation;
                    inner.state = SlotState::Creating {
                        owner: me,
                        generation,
                    };
                    return Step::Create(generation);
                }
                SlotState::Creating { owner, .. } if owner == me => {
                    return Step::Done(Err(ctx.circular(&self.bean)));
                }
                SlotState::Creating { generation, .. } => {
                    awaited = Some(generation);
                    if Instant::now() >= deadline {
                        let waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                        let timeout = DependencyError::CreationTimeout {
                            bean: self.bean.clone(),
                            waited_ms,
                        };
                        return Step::Done(Err(DependencyError::CreationFailed {
                            bean: self.bean.clone(),
                            cause: CreationCause::new(anyhow::Error::new(timeout)),
                        }));
                    }
                    debug!("等待其他线程创建单例: {}", self.bean);
                    self.changed.wait_until(&mut inner, deadline);
                }
            }
        }
    }

    fn complete(
        &self,
        generation: u64,
        result: anyhow::Result<ErasedInstance>,
        sequence: &AtomicU64,
    ) -> DependencyResult<ErasedInstance> {
        let mut inner = self.inner.lock();
        if matches!(inner.state, SlotState::Creating { generation: current, .. } if current == generation) {
            inner.state = SlotState::Idle;
        }

        let outcome = match result {
            Ok(_) if inner.closed => {
                warn!("容器已关闭, 丢弃刚创建的单例: {}", self.bean);
                Err(DependencyError::ContainerShutDown)
            }
            Ok(instance) => {
                let published = Arc::clone(self.instance.get_or_init(|| instance));
                let seq = sequence.fetch_add(1, Ordering::AcqRel) + 1;
                self.ready_seq.store(seq, Ordering::Release);
                debug!("单例已就绪: {}", self.bean);
                Ok(published)
            }
            Err(error) => {
                let cause = CreationCause::new(error);
                inner.last_failure = Some((generation, cause.clone()));
                debug!("单例创建失败: {}, 原因: {}", self.bean, cause);
                Err(DependencyError::CreationFailed {
                    bean: self.bean.clone(),
                    cause,
                })
            }
        };

        self.changed.notify_all();
        outcome
    }
}

impl std::fmt::Debug for SingletonSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonSlot")
            .field("bean", &self.bean)
            .field("ready", &self.is_ready())
            .field("ready_seq", &self.ready_sequence())
            .finish_non_exhaustive()
    }
}

/// 一次进行中的创建尝试
///
/// 创建函数 panic 时由 `Drop` 把槽位恢复为空闲并唤醒等待者。
struct CreationAttempt<'a> {
    slot: &'a SingletonSlot,
    generation: u64,
    finished: bool,
}

impl CreationAttempt<'_> {
    fn finish(
        mut self,
        result: anyhow::Result<ErasedInstance>,
        sequence: &AtomicU64,
    ) -> DependencyResult<ErasedInstance> {
        self.finished = true;
        self.slot.complete(self.generation, result, sequence)
    }
}

impl Drop for CreationAttempt<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut inner = self.slot.inner.lock();
        if matches!(inner.state, SlotState::Creating { generation, .. } if generation == self.generation) {
            inner.state = SlotState::Idle;
            inner.last_failure = Some((
                self.generation,
                CreationCause::new(anyhow::anyhow!("创建 {} 时发生 panic", self.slot.bean)),
            ));
        }
        self.slot.changed.notify_all();
    }
}
