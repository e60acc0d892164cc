//! 触发路径
//!
//! - 同步触发：在调用线程上按顺序执行，首个错误中止后续监听器（fail-fast）；
//! - 异步触发：逐个等待监听器完成并写入结果聚合器，监听器之间检查取消令牌，
//!   每条结果记录后等待可选的进度回调。
//!
//! 触发未注册事件不会报错：同步触发直接返回，异步触发返回 0 监听器的已完成聚合器。
//!
use super::Dispatcher;
use crate::aggregator::ResultAggregator;
use crate::error::{EventError, EventResult};
use crate::listener::{ErasedArg, ListenerCancelled, downcast_value, erase_arg};
use crate::payload::{ContractRole, PayloadType, TypeDescriptor, describe};
use crate::registration::EventRegistration;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// 进度回调：`(result, completed, total)`
pub type ProgressFn<R> =
    Arc<dyn Fn(Arc<R>, usize, usize) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// 异步触发选项
pub struct TriggerOptions<R: ?Sized> {
    on_each: Option<ProgressFn<R>>,
    cancellation: Option<CancellationToken>,
}

impl<R: ?Sized> Default for TriggerOptions<R> {
    fn default() -> Self {
        Self {
            on_each: None,
            cancellation: None,
        }
    }
}

impl<R: ?Sized> TriggerOptions<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每条结果记录后等待的回调
    pub fn on_each<F, Fut>(mut self, f: F) -> Self
    where
        R: 'static,
        F: Fn(Arc<R>, usize, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_each = Some(Arc::new(
            move |result: Arc<R>, completed: usize, total: usize| {
                f(result, completed, total).boxed()
            },
        ));
        self
    }

    /// 使用外部取消令牌，聚合器与调用方共享
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl<R: ?Sized> fmt::Debug for TriggerOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerOptions")
            .field("on_each", &self.on_each.is_some())
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl Dispatcher {
    /// 同步触发无参数事件
    pub fn trigger(&self, name: &str) -> EventResult<()> {
        self.dispatch_sync(name, None, None)
    }

    /// 同步触发带参数事件
    pub fn trigger_sync<P>(&self, name: &str, parameter: Arc<P>) -> EventResult<()>
    where
        P: PayloadType + ?Sized,
    {
        let found = TypeDescriptor::contract::<P>();
        self.dispatch_sync(name, found, Some(erase_arg(parameter)))
    }

    /// 异步触发并收集结果
    pub async fn trigger_async<P, R>(
        &self,
        name: &str,
        parameter: Option<Arc<P>>,
    ) -> EventResult<Arc<ResultAggregator<R>>>
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
    {
        self.trigger_async_with(name, parameter, TriggerOptions::default())
            .await
    }

    /// 异步触发（带进度回调与取消令牌）
    ///
    /// 返回的聚合器在全部监听器完成时为 `Completed`；因取消令牌或
    /// [`ListenerCancelled`] 提前停止时保持 `Pending`，由调用方决定是否 `cancel()`。
    /// 监听器或回调出错时聚合器进入 `Faulted`，同时返回 `ListenerFailure`。
    #[instrument(level = "debug", skip_all, fields(event = name))]
    pub async fn trigger_async_with<P, R>(
        &self,
        name: &str,
        parameter: Option<Arc<P>>,
        options: TriggerOptions<R>,
    ) -> EventResult<Arc<ResultAggregator<R>>>
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
    {
        let TriggerOptions {
            on_each,
            cancellation,
        } = options;
        let token = cancellation.unwrap_or_default();

        let Some(registration) = self.registration(name) else {
            debug!("event not registered, nothing to trigger");
            return Ok(Arc::new(ResultAggregator::with_token(name, 0, token)));
        };

        let found = parameter.as_ref().and(TypeDescriptor::contract::<P>());
        check_parameter(&registration, found)?;
        check_async_result::<R>(&registration)?;

        let listeners = self.sorted_snapshot(&registration);
        let total = listeners.len();
        let aggregator = Arc::new(ResultAggregator::with_token(name, total, token));
        let arg = parameter.map(erase_arg);
        debug!(listeners = total, "async trigger started");

        for listener in listeners {
            if aggregator.is_cancelled() {
                debug!(
                    completed = aggregator.completed_count(),
                    total, "trigger cancelled between listeners"
                );
                break;
            }

            let outcome = match listener.invoke(arg.as_ref()).await {
                Ok(value) => downcast_value::<R>(value),
                Err(e) => Err(e),
            };
            let value = match outcome {
                Ok(value) => value,
                Err(e) if e.is::<ListenerCancelled>() => {
                    debug!(listener = %listener.id(), "listener cancelled the trigger");
                    break;
                }
                Err(e) => return Err(fault(&aggregator, name, e)),
            };

            aggregator.add_result(value.clone());

            if let Some(on_each) = &on_each {
                match on_each(value, aggregator.completed_count(), total).await {
                    Ok(()) => {}
                    Err(e) if e.is::<ListenerCancelled>() => {
                        debug!("progress callback cancelled the trigger");
                        break;
                    }
                    Err(e) => return Err(fault(&aggregator, name, e)),
                }
            }
        }

        Ok(aggregator)
    }

    #[instrument(level = "debug", skip(self, found, arg), err)]
    fn dispatch_sync(
        &self,
        name: &str,
        found: Option<TypeDescriptor>,
        arg: Option<ErasedArg>,
    ) -> EventResult<()> {
        let Some(registration) = self.registration(name) else {
            debug!("event not registered, nothing to trigger");
            return Ok(());
        };

        check_parameter(&registration, found)?;
        if let Some(expected) = registration.result_type() {
            return Err(EventError::ContractMismatch {
                event: name.to_string(),
                role: ContractRole::Result,
                expected: expected.to_string(),
                found: describe(None),
            });
        }

        let listeners = self.sorted_snapshot(&registration);
        debug!(listeners = listeners.len(), "sync trigger started");

        for listener in &listeners {
            listener.invoke_now(arg.as_ref()).map_err(|e| {
                warn!(listener = %listener.id(), error = %e, "listener failed, aborting trigger");
                EventError::listener_failure(name, e)
            })?;
        }
        Ok(())
    }
}

fn check_parameter(
    registration: &EventRegistration,
    found: Option<TypeDescriptor>,
) -> EventResult<()> {
    if registration.parameter_type() == found {
        return Ok(());
    }
    Err(EventError::ContractMismatch {
        event: registration.name().to_string(),
        role: ContractRole::Parameter,
        expected: describe(registration.parameter_type()),
        found: describe(found),
    })
}

// 异步触发要求事件带结果契约，且与 R 一致
fn check_async_result<R: PayloadType + ?Sized>(
    registration: &EventRegistration,
) -> EventResult<()> {
    let found = TypeDescriptor::contract::<R>();
    match registration.result_type() {
        Some(expected) if Some(expected) == found => Ok(()),
        Some(expected) => Err(EventError::ContractMismatch {
            event: registration.name().to_string(),
            role: ContractRole::Result,
            expected: expected.to_string(),
            found: describe(found),
        }),
        None => Err(EventError::ContractMismatch {
            event: registration.name().to_string(),
            role: ContractRole::Result,
            expected: "a result contract".to_string(),
            found: describe(found),
        }),
    }
}

fn fault<R: ?Sized>(
    aggregator: &ResultAggregator<R>,
    name: &str,
    source: anyhow::Error,
) -> EventError {
    warn!(event = name, error = %source, "listener failed, faulting trigger");
    let err = EventError::listener_failure(name, source);
    aggregator.set_error(&err);
    err
}
