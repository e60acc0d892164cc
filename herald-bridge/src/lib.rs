//! herald 桥接层（herald-bridge）
//!
//! 构建在 `herald-core` 公共接口之上的薄适配层：
//! - `asset`：以“名称 + 描述 + 契约”定义的可复用事件，首次使用时惰性注册；
//! - `binding`：启用/禁用即订阅/取消订阅的监听器绑定，丢弃时自动取消；
//! - `marshal`：把回调投递到指定执行上下文（如单消费者的“主线程”）；
//! - `notification`：无结果事件的上下文投递桥接；
//! - `request_response`：回调风格响应函数到异步监听器的桥接。
//!
pub mod asset;
pub mod binding;
pub mod error;
pub mod marshal;
pub mod notification;
pub mod request_response;

pub use asset::{EventAsset, EventAssetDef};
pub use binding::ListenerBinding;
pub use error::{BridgeError, BridgeResult};
pub use marshal::{ContextMarshal, InlineMarshal, Marshal, MarshalContext, MarshalTask};
pub use notification::NotificationBridge;
pub use request_response::{RequestResponseBridge, Responder};
