//! 事件系统统一错误定义
//!
//! 覆盖契约校验、订阅、触发与结果聚合的最小必要集合。
//! 触发未注册事件、取消未订阅的监听器均为静默操作，不产生错误。
//!
use crate::payload::ContractRole;
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    // --- 注册/订阅 ---
    #[error("invalid contract: {role} type {type_name}: {reason}")]
    InvalidContract {
        role: ContractRole,
        type_name: &'static str,
        reason: String,
    },
    #[error("invalid listener shape: event={event}, reason={reason}")]
    InvalidListenerShape { event: String, reason: String },
    #[error("unknown event: {event}")]
    UnknownEvent { event: String },

    // --- 触发 ---
    #[error("contract mismatch: event={event}, {role} expected={expected}, found={found}")]
    ContractMismatch {
        event: String,
        role: ContractRole,
        expected: String,
        found: String,
    },
    #[error("listener failure: event={event}, reason={source}")]
    ListenerFailure {
        event: String,
        #[source]
        source: anyhow::Error,
    },

    // --- 结果聚合终态 ---
    #[error("trigger cancelled: event={event}")]
    Cancelled { event: String },
    #[error("trigger faulted: event={event}, reason={reason}")]
    Faulted { event: String, reason: String },
}

/// 统一 Result 类型别名
pub type EventResult<T> = Result<T, EventError>;

impl EventError {
    pub(crate) fn invalid_shape(event: &str, reason: impl Into<String>) -> Self {
        Self::InvalidListenerShape {
            event: event.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn listener_failure(event: &str, source: anyhow::Error) -> Self {
        Self::ListenerFailure {
            event: event.to_string(),
            source,
        }
    }
}
