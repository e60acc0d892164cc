//! 监听器绑定（ListenerBinding）
//!
//! 将“启用/禁用”生命周期映射到订阅/取消订阅：`enable` 订阅、`disable` 取消，
//! 两者均幂等；绑定被丢弃时自动取消订阅。
//!
use crate::error::BridgeResult;
use herald_core::{Dispatcher, Listener};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub struct ListenerBinding {
    dispatcher: Arc<Dispatcher>,
    event: String,
    listener: Listener,
    priority: i32,
    enabled: AtomicBool,
}

impl ListenerBinding {
    /// 创建处于禁用状态的绑定
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        event: impl Into<String>,
        listener: Listener,
        priority: i32,
    ) -> Self {
        Self {
            dispatcher,
            event: event.into(),
            listener,
            priority,
            enabled: AtomicBool::new(false),
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enable(&self) -> BridgeResult<()> {
        if self.enabled.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Err(e) = self
            .dispatcher
            .subscribe(&self.event, &self.listener, self.priority)
        {
            self.enabled.store(false, Ordering::Release);
            return Err(e.into());
        }
        debug!(event = %self.event, priority = self.priority, "binding enabled");
        Ok(())
    }

    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            self.dispatcher.unsubscribe(&self.event, &self.listener);
            debug!(event = %self.event, "binding disabled");
        }
    }
}

impl Drop for ListenerBinding {
    fn drop(&mut self) {
        self.disable();
    }
}

impl fmt::Debug for ListenerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBinding")
            .field("event", &self.event)
            .field("listener", &self.listener.id())
            .field("priority", &self.priority)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use herald_core::EventError;

    #[test]
    fn enable_disable_are_idempotent() {
        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.register_event("E").unwrap();
        let binding = ListenerBinding::new(dispatcher.clone(), "E", Listener::action(|| Ok(())), 0);

        assert!(!binding.is_enabled());
        binding.enable().unwrap();
        binding.enable().unwrap();
        assert_eq!(dispatcher.listener_count("E"), 1);

        binding.disable();
        binding.disable();
        assert_eq!(dispatcher.listener_count("E"), 0);
        assert!(!binding.is_enabled());
    }

    #[test]
    fn failed_enable_stays_disabled() {
        let dispatcher = Arc::new(Dispatcher::new());
        let binding = ListenerBinding::new(dispatcher, "missing", Listener::action(|| Ok(())), 0);

        let err = binding.enable().unwrap_err();
        assert!(matches!(err, BridgeError::Event(EventError::UnknownEvent { .. })));
        assert!(!binding.is_enabled());
    }

    #[test]
    fn drop_unsubscribes() {
        let dispatcher = Arc::new(Dispatcher::new());
        dispatcher.register_event("E").unwrap();
        {
            let binding =
                ListenerBinding::new(dispatcher.clone(), "E", Listener::action(|| Ok(())), 0);
            binding.enable().unwrap();
            assert_eq!(dispatcher.listener_count("E"), 1);
        }
        assert_eq!(dispatcher.listener_count("E"), 0);
    }
}
