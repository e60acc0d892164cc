//! herald 事件核心库（herald-core）
//!
//! 进程内的类型化发布/订阅事件总线：
//! - 载荷契约（`payload`）：参数/结果类型的标记能力与运行时描述符；
//! - 事件注册（`registration`）：事件名对应的契约与监听器列表，订阅时校验监听器形状；
//! - 监听器（`listener`）：同步/异步调用器的类型擦除句柄；
//! - 结果聚合（`aggregator`）：异步触发时按完成顺序收集结果，支持取消与错误传播；
//! - 调度器（`dispatcher`）：注册、按优先级订阅、同步/异步触发；
//! - 类型化事件键（`key`）：在编译期绑定事件名与契约。
//!
//! 典型用法：
//! 1. 用 `#[payload]` 声明参数/结果契约 trait 及其载体类型；
//! 2. 构造 `Dispatcher` 并注册事件；
//! 3. 订阅监听器（可指定优先级，数值越大越先执行）；
//! 4. 同步触发，或异步触发后通过 `ResultAggregator::wait` 获取全部结果。
//!
pub mod aggregator;
pub mod dispatcher;
pub mod error;
pub mod key;
pub mod listener;
pub mod payload;
pub mod registration;

pub use aggregator::{AggregateState, ResultAggregator};
pub use dispatcher::{Dispatcher, DispatcherConfig, EventInfo, ListenerInfo, TriggerOptions};
pub use error::{EventError, EventResult};
pub use key::{EventKey, TypedListener};
pub use listener::{Listener, ListenerCancelled, ListenerId, RequestHandler};
pub use payload::{NoPayload, Payload, PayloadType, TypeDescriptor};
pub use registration::EventContract;

pub use herald_macros::payload;

// 允许在本 crate 内部通过 ::herald_core 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::herald_core 路径。
extern crate self as herald_core;
