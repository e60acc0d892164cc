//! 事件调度器（Dispatcher）
//!
//! 维护“事件名 → 注册记录”与优先级表，负责注册、订阅、取消订阅与触发：
//! - 注册：先校验契约，再按“首次注册生效”写入，重复注册静默忽略；
//! - 订阅：未注册事件返回 `UnknownEvent`，形状校验委托给注册记录；
//! - 触发：取按优先级降序（同优先级保持订阅顺序）排列的快照后执行，见 `trigger` 模块。
//!
//! 调度器不是全局单例，显式构造后以 `Arc<Dispatcher>` 共享。
//!
mod config;
mod trigger;

pub use config::DispatcherConfig;
pub use trigger::{ProgressFn, TriggerOptions};

use crate::error::{EventError, EventResult};
use crate::listener::{Listener, ListenerId};
use crate::payload::{PayloadType, TypeDescriptor};
use crate::registration::{EventContract, EventRegistration};
use bon::Builder;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 进程内事件调度器
#[derive(Builder)]
pub struct Dispatcher {
    #[builder(default)]
    config: DispatcherConfig,
    #[builder(skip)]
    events: DashMap<String, Arc<EventRegistration>>,
    // 事件名 -> (监听器 -> 优先级)，数值越大越先执行
    #[builder(skip)]
    priorities: DashMap<String, HashMap<ListenerId, i32>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// 注册无参数、无结果的事件
    pub fn register_event(&self, name: &str) -> EventResult<()> {
        self.register_event_with(name, EventContract::none())
    }

    /// 以类型参数注册事件，`NoPayload` 表示缺省
    pub fn register_typed_event<P, R>(&self, name: &str) -> EventResult<()>
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
    {
        self.register_event_with(name, EventContract::of::<P, R>())
    }

    /// 以运行时契约注册事件：契约先校验，名称已存在时保持首次注册
    #[instrument(level = "debug", skip(self, contract), fields(label = %self.config.label), err)]
    pub fn register_event_with(&self, name: &str, contract: EventContract) -> EventResult<()> {
        let registration = EventRegistration::new(name, contract)?;

        match self.events.entry(name.to_string()) {
            Entry::Occupied(_) => {
                debug!(event = name, "event already registered, keeping first registration");
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(registration));
                debug!(event = name, "event registered");
            }
        }
        Ok(())
    }

    pub fn is_event_registered(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    /// 以指定优先级订阅
    #[instrument(level = "debug", skip(self, listener), fields(listener = %listener.id()), err)]
    pub fn subscribe(&self, name: &str, listener: &Listener, priority: i32) -> EventResult<()> {
        let registration = self.registration(name).ok_or_else(|| EventError::UnknownEvent {
            event: name.to_string(),
        })?;

        // 优先级先于监听器写入，快照中的监听器总能查到自己的优先级；
        // 重复订阅保留首次优先级
        let recorded = {
            let mut table = self.priorities.entry(name.to_string()).or_default();
            if table.contains_key(&listener.id()) {
                false
            } else {
                table.insert(listener.id(), priority);
                true
            }
        };

        if let Err(err) = registration.add_listener(listener.clone()) {
            if recorded {
                self.forget_priority(name, listener);
            }
            return Err(err);
        }

        debug!(
            event = name,
            priority,
            listeners = registration.listener_count(),
            "listener subscribed"
        );
        Ok(())
    }

    /// 以配置中的默认优先级订阅
    pub fn subscribe_default(&self, name: &str, listener: &Listener) -> EventResult<()> {
        self.subscribe(name, listener, self.config.default_priority)
    }

    /// 取消订阅；事件或监听器不存在时为空操作，返回是否发生移除
    pub fn unsubscribe(&self, name: &str, listener: &Listener) -> bool {
        let Some(registration) = self.registration(name) else {
            return false;
        };
        if !registration.remove_listener(listener) {
            return false;
        }

        // 同一监听器被重复订阅时，保留优先级直到最后一份被移除
        if !registration.contains(listener) {
            self.forget_priority(name, listener);
        }

        debug!(event = name, listener = %listener.id(), "listener unsubscribed");
        true
    }

    /// 清空所有注册与优先级（仅用于测试/重置）
    pub fn clear_all(&self) {
        self.events.clear();
        self.priorities.clear();
        debug!(label = %self.config.label, "dispatcher cleared");
    }

    /// 事件当前的监听器数量，未注册时为 0
    pub fn listener_count(&self, name: &str) -> usize {
        self.registration(name)
            .map(|r| r.listener_count())
            .unwrap_or_default()
    }

    /// 已注册事件名（按字典序）
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.events.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// 导出所有事件的契约与监听器概况，供文档/诊断工具使用
    pub fn describe(&self) -> Vec<EventInfo> {
        let mut registrations: Vec<Arc<EventRegistration>> =
            self.events.iter().map(|e| e.value().clone()).collect();
        registrations.sort_by(|a, b| a.name().cmp(b.name()));

        registrations
            .iter()
            .map(|registration| EventInfo {
                name: registration.name().to_string(),
                parameter: registration.parameter_type(),
                result: registration.result_type(),
                listeners: self
                    .prioritized(registration)
                    .into_iter()
                    .map(|(priority, listener)| ListenerInfo {
                        id: listener.id(),
                        priority,
                        deferred: listener.is_deferred(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn forget_priority(&self, name: &str, listener: &Listener) {
        if let Some(mut table) = self.priorities.get_mut(name) {
            table.remove(&listener.id());
        }
        self.priorities.remove_if(name, |_, table| table.is_empty());
    }

    pub(crate) fn registration(&self, name: &str) -> Option<Arc<EventRegistration>> {
        self.events.get(name).map(|r| r.value().clone())
    }

    /// 按优先级降序排列的监听器快照
    pub(crate) fn sorted_snapshot(&self, registration: &EventRegistration) -> Vec<Listener> {
        self.prioritized(registration)
            .into_iter()
            .map(|(_, listener)| listener)
            .collect()
    }

    fn prioritized(&self, registration: &EventRegistration) -> Vec<(i32, Listener)> {
        let listeners = registration.snapshot();
        let mut ordered: Vec<(i32, Listener)> = {
            let table = self.priorities.get(registration.name());
            listeners
                .into_iter()
                .map(|listener| {
                    let priority = table
                        .as_ref()
                        .and_then(|t| t.get(&listener.id()).copied())
                        .unwrap_or_default();
                    (priority, listener)
                })
                .collect()
        };

        // sort_by_key 为稳定排序，同优先级保持订阅顺序
        ordered.sort_by_key(|(priority, _)| Reverse(*priority));
        ordered
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("label", &self.config.label)
            .field("events", &self.events.len())
            .finish()
    }
}

/// 事件诊断信息
#[derive(Clone, Debug, Serialize)]
pub struct EventInfo {
    pub name: String,
    pub parameter: Option<TypeDescriptor>,
    pub result: Option<TypeDescriptor>,
    pub listeners: Vec<ListenerInfo>,
}

/// 监听器诊断信息（按执行顺序排列）
#[derive(Clone, Debug, Serialize)]
pub struct ListenerInfo {
    pub id: ListenerId,
    pub priority: i32,
    pub deferred: bool,
}
