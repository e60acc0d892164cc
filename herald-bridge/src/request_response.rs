//! 请求/响应桥接（RequestResponseBridge）
//!
//! 把回调风格的响应函数 `Fn(Arc<P>, Responder<R>)` 转换为异步监听器：
//! 1. 事件触发时，在 `Marshal` 指定的上下文上调用响应函数；
//! 2. 响应函数通过 `Responder` 回传结果，完成监听器的 future；
//! 3. `Responder` 未应答即被丢弃时，监听器以 `BridgeError::NoResponse` 失败。
//!
use crate::asset::EventAsset;
use crate::binding::ListenerBinding;
use crate::error::{BridgeError, BridgeResult};
use crate::marshal::Marshal;
use herald_core::Listener;
use herald_core::payload::PayloadType;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::trace;

/// 一次性应答句柄
pub struct Responder<R: ?Sized> {
    tx: oneshot::Sender<Arc<R>>,
}

impl<R: ?Sized> Responder<R> {
    /// 回传结果；等待方已放弃时静默丢弃
    pub fn respond(self, value: Arc<R>) {
        let _ = self.tx.send(value);
    }
}

impl<R: ?Sized> fmt::Debug for Responder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

pub struct RequestResponseBridge<P: ?Sized, R: ?Sized> {
    binding: ListenerBinding,
    _contract: PhantomData<fn(Arc<P>) -> Arc<R>>,
}

impl<P, R> RequestResponseBridge<P, R>
where
    P: PayloadType + ?Sized,
    R: PayloadType + ?Sized,
{
    /// 创建桥接（禁用状态），需调用 `enable` 后生效
    pub fn new<F>(
        asset: &EventAsset<P, R>,
        marshal: Arc<dyn Marshal>,
        priority: i32,
        on_request: F,
    ) -> BridgeResult<Self>
    where
        F: Fn(Arc<P>, Responder<R>) + Send + Sync + 'static,
    {
        let on_request = Arc::new(on_request);
        let event = asset.name().to_string();

        let listener = Listener::request::<P, R, _, _>(move |request: Arc<P>| {
            let (tx, rx) = oneshot::channel();
            let on_request = on_request.clone();
            let posted = marshal.post(Box::new(move || on_request(request, Responder { tx })));
            let event = event.clone();

            async move {
                posted?;
                let value = rx.await.map_err(|_| BridgeError::NoResponse {
                    event: event.clone(),
                })?;
                trace!(event = %event, "response received");
                Ok::<_, anyhow::Error>(value)
            }
        });

        Ok(Self {
            binding: asset.bind(listener, priority)?,
            _contract: PhantomData,
        })
    }

    pub fn enable(&self) -> BridgeResult<()> {
        self.binding.enable()
    }

    pub fn disable(&self) {
        self.binding.disable()
    }

    pub fn is_enabled(&self) -> bool {
        self.binding.is_enabled()
    }

    pub fn binding(&self) -> &ListenerBinding {
        &self.binding
    }
}

impl<P: ?Sized, R: ?Sized> fmt::Debug for RequestResponseBridge<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestResponseBridge")
            .field("binding", &self.binding)
            .finish()
    }
}
