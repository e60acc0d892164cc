//! 资产化事件（EventAsset）
//!
//! 以“名称 + 描述 + 契约”定义一个可复用的事件，首次使用时惰性注册到调度器。
//! 定义本身可以作为数据编写（`EventAssetDef`），再绑定到具体的契约类型。
//!
use crate::binding::ListenerBinding;
use crate::error::BridgeResult;
use herald_core::payload::{NoPayload, PayloadType};
use herald_core::{Dispatcher, Listener, ResultAggregator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// 事件定义数据
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAssetDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// 绑定契约类型的事件资产
pub struct EventAsset<P: ?Sized = NoPayload, R: ?Sized = NoPayload> {
    name: String,
    description: String,
    dispatcher: Arc<Dispatcher>,
    _contract: PhantomData<fn(Arc<P>) -> Arc<R>>,
}

impl<P, R> EventAsset<P, R>
where
    P: PayloadType + ?Sized,
    R: PayloadType + ?Sized,
{
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            dispatcher,
            _contract: PhantomData,
        }
    }

    pub fn from_def(dispatcher: Arc<Dispatcher>, def: EventAssetDef) -> Self {
        Self::new(dispatcher, def.name, def.description)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn def(&self) -> EventAssetDef {
        EventAssetDef {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// 未注册时按契约注册
    pub fn ensure_registered(&self) -> BridgeResult<()> {
        if !self.dispatcher.is_event_registered(&self.name) {
            self.dispatcher.register_typed_event::<P, R>(&self.name)?;
            debug!(event = %self.name, "event asset registered");
        }
        Ok(())
    }

    /// 同步触发（无参数）
    pub fn raise(&self) -> BridgeResult<()> {
        self.ensure_registered()?;
        self.dispatcher.trigger(&self.name)?;
        Ok(())
    }

    /// 同步触发（带参数）
    pub fn raise_with(&self, parameter: Arc<P>) -> BridgeResult<()> {
        self.ensure_registered()?;
        self.dispatcher.trigger_sync(&self.name, parameter)?;
        Ok(())
    }

    /// 异步触发并返回结果聚合器
    pub async fn raise_async(
        &self,
        parameter: Option<Arc<P>>,
    ) -> BridgeResult<Arc<ResultAggregator<R>>> {
        self.ensure_registered()?;
        let aggregator = self
            .dispatcher
            .trigger_async::<P, R>(&self.name, parameter)
            .await?;
        Ok(aggregator)
    }

    pub fn subscribe(&self, listener: &Listener, priority: i32) -> BridgeResult<()> {
        self.ensure_registered()?;
        self.dispatcher.subscribe(&self.name, listener, priority)?;
        Ok(())
    }

    pub fn unsubscribe(&self, listener: &Listener) -> bool {
        self.dispatcher.unsubscribe(&self.name, listener)
    }

    /// 创建（禁用状态的）监听器绑定
    pub fn bind(&self, listener: Listener, priority: i32) -> BridgeResult<ListenerBinding> {
        self.ensure_registered()?;
        Ok(ListenerBinding::new(
            self.dispatcher.clone(),
            self.name.clone(),
            listener,
            priority,
        ))
    }
}

impl<P: ?Sized, R: ?Sized> Clone for EventAsset<P, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            dispatcher: self.dispatcher.clone(),
            _contract: PhantomData,
        }
    }
}

impl<P: ?Sized, R: ?Sized> fmt::Debug for EventAsset<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventAsset")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
