//! 结果聚合器（ResultAggregator）
//!
//! 每次异步触发创建一个聚合器，按监听器完成顺序收集结果，并提供一次性的完成信号：
//! - `Pending → Completed`：结果数量达到监听器总数；
//! - `Pending → Cancelled`：调用 `cancel()`；
//! - `Pending → Faulted`：调用 `set_error()`。
//!
//! 三种终态互斥，通过原子比较交换保证只有第一次转换生效，后续转换被静默忽略。
//! 完成信号基于 `tokio::sync::watch`，可被多个等待方同时 `wait()`。
//!
//! 注意：触发循环因取消令牌而提前停止时，聚合器保持 `Pending`，
//! 需要调用方显式 `cancel()` 才会以取消终态结束。
//!
use crate::error::{EventError, EventResult};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// 聚合器状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateState {
    Pending,
    Completed,
    Cancelled,
    Faulted,
}

impl AggregateState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Completed => 1,
            Self::Cancelled => 2,
            Self::Faulted => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Completed,
            2 => Self::Cancelled,
            _ => Self::Faulted,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

/// 单次触发的结果聚合器
pub struct ResultAggregator<R: ?Sized> {
    event: String,
    total: usize,
    results: Mutex<Vec<Arc<R>>>,
    state: AtomicU8,
    fault: OnceLock<String>,
    token: CancellationToken,
    signal: watch::Sender<AggregateState>,
}

impl<R: ?Sized> ResultAggregator<R> {
    pub fn new(event: impl Into<String>, total_listeners: usize) -> Self {
        Self::with_token(event, total_listeners, CancellationToken::new())
    }

    /// 使用外部取消令牌创建；监听器总数为 0 时直接处于完成态
    pub fn with_token(
        event: impl Into<String>,
        total_listeners: usize,
        token: CancellationToken,
    ) -> Self {
        let initial = if total_listeners == 0 {
            AggregateState::Completed
        } else {
            AggregateState::Pending
        };
        let (signal, _rx) = watch::channel(initial);

        Self {
            event: event.into(),
            total: total_listeners,
            results: Mutex::new(Vec::with_capacity(total_listeners)),
            state: AtomicU8::new(initial.as_u8()),
            fault: OnceLock::new(),
            token,
            signal,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn total_listeners(&self) -> usize {
        self.total
    }

    pub fn completed_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count() == self.total
    }

    /// 已收集结果的有序副本
    pub fn results(&self) -> Vec<Arc<R>> {
        self.lock().clone()
    }

    pub fn state(&self) -> AggregateState {
        AggregateState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// 失败终态的原因（仅 `Faulted` 时存在）
    pub fn fault_reason(&self) -> Option<&str> {
        self.fault.get().map(String::as_str)
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 追加结果；已满或已处于终态时拒绝并返回 false
    pub fn add_result(&self, value: Arc<R>) -> bool {
        let mut results = self.lock();
        if self.state().is_terminal() || results.len() >= self.total {
            return false;
        }

        results.push(value);
        if results.len() == self.total {
            self.transition(AggregateState::Completed);
        }
        true
    }

    /// 发出取消信号，并尝试以取消终态结束
    pub fn cancel(&self) {
        self.token.cancel();
        self.transition(AggregateState::Cancelled);
    }

    /// 尝试以失败终态结束，记录错误描述
    pub fn set_error(&self, err: &EventError) {
        if self.transition_with(AggregateState::Faulted, || {
            let _ = self.fault.set(err.to_string());
        }) {
            tracing::debug!(event = %self.event, error = %err, "aggregator faulted");
        }
    }

    /// 等待终态：完成时返回全部结果，取消/失败时返回对应错误
    pub async fn wait(&self) -> EventResult<Vec<Arc<R>>> {
        let mut rx = self.signal.subscribe();
        let state = match rx.wait_for(|s| s.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };

        match state {
            AggregateState::Completed => Ok(self.results()),
            AggregateState::Faulted => Err(EventError::Faulted {
                event: self.event.clone(),
                reason: self.fault_reason().unwrap_or_default().to_string(),
            }),
            AggregateState::Cancelled | AggregateState::Pending => Err(EventError::Cancelled {
                event: self.event.clone(),
            }),
        }
    }

    fn transition(&self, to: AggregateState) -> bool {
        self.transition_with(to, || {})
    }

    // 三路比较交换：只有从 Pending 出发的第一次转换生效
    fn transition_with(&self, to: AggregateState, on_win: impl FnOnce()) -> bool {
        let won = self
            .state
            .compare_exchange(
                AggregateState::Pending.as_u8(),
                to.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if won {
            on_win();
            self.signal.send_replace(to);
        }
        won
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<R>>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: ?Sized> fmt::Debug for ResultAggregator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultAggregator")
            .field("event", &self.event)
            .field("total", &self.total)
            .field("completed", &self.completed_count())
            .field("state", &self.state())
            .finish()
    }
}
