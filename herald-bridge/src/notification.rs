//! 通知桥接（NotificationBridge）
//!
//! 订阅无结果事件，并把回调投递到 `Marshal` 上下文执行。监听器本身只负责投递，
//! 立即返回，不等待回调执行完成。
//!
use crate::asset::EventAsset;
use crate::binding::ListenerBinding;
use crate::error::BridgeResult;
use crate::marshal::Marshal;
use herald_core::Listener;
use herald_core::payload::{NoPayload, PayloadType};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct NotificationBridge<P: ?Sized = NoPayload> {
    binding: ListenerBinding,
    _contract: PhantomData<fn(Arc<P>)>,
}

impl NotificationBridge<NoPayload> {
    /// 无参数事件
    pub fn new<F>(
        asset: &EventAsset,
        marshal: Arc<dyn Marshal>,
        priority: i32,
        on_raised: F,
    ) -> BridgeResult<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let on_raised = Arc::new(on_raised);
        let listener = Listener::action(move || {
            let on_raised = on_raised.clone();
            marshal.post(Box::new(move || on_raised()))?;
            Ok(())
        });

        Ok(Self {
            binding: asset.bind(listener, priority)?,
            _contract: PhantomData,
        })
    }
}

impl<P: PayloadType + ?Sized> NotificationBridge<P> {
    /// 带参数事件
    pub fn with_param<F>(
        asset: &EventAsset<P>,
        marshal: Arc<dyn Marshal>,
        priority: i32,
        on_raised: F,
    ) -> BridgeResult<Self>
    where
        F: Fn(Arc<P>) + Send + Sync + 'static,
    {
        let on_raised = Arc::new(on_raised);
        let listener = Listener::with_param::<P, _>(move |parameter: Arc<P>| {
            let on_raised = on_raised.clone();
            marshal.post(Box::new(move || on_raised(parameter)))?;
            Ok(())
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

impl<P: ?Sized> fmt::Debug for NotificationBridge<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBridge")
            .field("binding", &self.binding)
            .finish()
    }
}
