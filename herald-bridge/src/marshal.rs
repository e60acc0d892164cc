//! 执行上下文调度（Marshal）
//!
//! 将闭包投递到指定的执行上下文运行，用于把事件回调切回“主线程”一类的单消费者上下文：
//! - `ContextMarshal`：基于 tokio mpsc 的单消费者上下文，由 `MarshalContext` 驱动执行；
//! - `InlineMarshal`：在调用处直接执行。
//!
use crate::error::{BridgeError, BridgeResult};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// 投递到执行上下文的任务
pub type MarshalTask = Box<dyn FnOnce() + Send + 'static>;

#[async_trait]
pub trait Marshal: Send + Sync {
    /// 投递任务，不等待其执行
    fn post(&self, task: MarshalTask) -> BridgeResult<()>;

    /// 投递任务并等待其在目标上下文执行完毕
    async fn run(&self, task: MarshalTask) -> BridgeResult<()> {
        let (tx, rx) = oneshot::channel();
        self.post(Box::new(move || {
            task();
            let _ = tx.send(());
        }))?;
        rx.await.map_err(|_| BridgeError::ContextClosed)
    }
}

/// 在调用处直接执行
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineMarshal;

impl Marshal for InlineMarshal {
    fn post(&self, task: MarshalTask) -> BridgeResult<()> {
        task();
        Ok(())
    }
}

/// 投递端，可克隆并跨任务共享
#[derive(Clone, Debug)]
pub struct ContextMarshal {
    tx: mpsc::UnboundedSender<MarshalTask>,
}

/// 执行端：唯一消费者，按投递顺序执行任务
#[derive(Debug)]
pub struct MarshalContext {
    rx: mpsc::UnboundedReceiver<MarshalTask>,
}

impl ContextMarshal {
    pub fn channel() -> (ContextMarshal, MarshalContext) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ContextMarshal { tx }, MarshalContext { rx })
    }
}

impl Marshal for ContextMarshal {
    fn post(&self, task: MarshalTask) -> BridgeResult<()> {
        self.tx.send(task).map_err(|_| BridgeError::ContextClosed)
    }
}

impl MarshalContext {
    /// 持续执行直到所有投递端被丢弃
    pub async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            task();
        }
        trace!("marshal context drained");
    }

    /// 执行当前已排队的任务，返回执行数量
    pub fn run_pending(&mut self) -> usize {
        let mut executed = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            executed += 1;
        }
        executed
    }
}
