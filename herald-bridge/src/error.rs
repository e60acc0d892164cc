//! 桥接层错误定义
//!
use herald_core::EventError;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("no response: event={event}, responder dropped without answering")]
    NoResponse { event: String },
    #[error("marshal context closed")]
    ContextClosed,
}

pub type BridgeResult<T> = Result<T, BridgeError>;
