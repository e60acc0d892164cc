//! 类型化事件键（EventKey）
//!
//! 将事件名与参数/结果契约绑定在同一个常量上，订阅与触发时由编译器检查类型：
//!
//! ```ignore
//! const LOOKUP: EventKey<dyn Query, dyn Answer> = EventKey::new("lookup");
//!
//! dispatcher.register_key(LOOKUP)?;
//! dispatcher.subscribe_key(LOOKUP, &LOOKUP.request(|q| async move { .. }), 0)?;
//! // 契约不同的键与监听器无法通过编译：
//! // dispatcher.subscribe_key(TICK, &LOOKUP.request(..), 0);
//! let aggregator = dispatcher.trigger_async_key(LOOKUP, Some(query)).await?;
//! ```
//!
use crate::aggregator::ResultAggregator;
use crate::dispatcher::Dispatcher;
use crate::error::EventResult;
use crate::listener::{Listener, RequestHandler};
use crate::payload::{NoPayload, PayloadType};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// 携带编译期契约的事件名
pub struct EventKey<P: ?Sized = NoPayload, R: ?Sized = NoPayload> {
    name: &'static str,
    _contract: PhantomData<fn(Arc<P>) -> Arc<R>>,
}

impl<P: ?Sized, R: ?Sized> EventKey<P, R> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _contract: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<P: ?Sized, R: ?Sized> Clone for EventKey<P, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: ?Sized, R: ?Sized> Copy for EventKey<P, R> {}

impl<P: ?Sized, R: ?Sized> fmt::Debug for EventKey<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventKey").field(&self.name).finish()
    }
}

impl<P: ?Sized, R: ?Sized> fmt::Display for EventKey<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 与事件键契约绑定的监听器，只能通过同契约的 [`EventKey`] 订阅
///
/// ```
/// use herald_core::payload;
/// use herald_core::{Dispatcher, EventKey};
///
/// #[payload]
/// trait Ping {}
///
/// const PINGED: EventKey<dyn Ping> = EventKey::new("pinged");
///
/// let dispatcher = Dispatcher::new();
/// dispatcher.register_key(PINGED).unwrap();
/// let listener = PINGED.with_param(|_| Ok(()));
/// dispatcher.subscribe_key(PINGED, &listener, 0).unwrap();
/// ```
///
/// 契约不同的键无法接受该监听器：
///
/// ```compile_fail
/// use herald_core::payload;
/// use herald_core::{Dispatcher, EventKey};
///
/// #[payload]
/// trait Ping {}
///
/// const TICK: EventKey = EventKey::new("tick");
/// const PINGED: EventKey<dyn Ping> = EventKey::new("pinged");
///
/// let dispatcher = Dispatcher::new();
/// let listener = PINGED.with_param(|_| Ok(()));
/// dispatcher.subscribe_key(TICK, &listener, 0).unwrap();
/// ```
pub struct TypedListener<P: ?Sized = NoPayload, R: ?Sized = NoPayload> {
    listener: Listener,
    _contract: PhantomData<fn(Arc<P>) -> Arc<R>>,
}

impl<P: ?Sized, R: ?Sized> TypedListener<P, R> {
    fn new(listener: Listener) -> Self {
        Self {
            listener,
            _contract: PhantomData,
        }
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn into_listener(self) -> Listener {
        self.listener
    }
}

impl<P: ?Sized, R: ?Sized> Clone for TypedListener<P, R> {
    fn clone(&self) -> Self {
        Self::new(self.listener.clone())
    }
}

impl<P: ?Sized, R: ?Sized> fmt::Debug for TypedListener<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedListener").field(&self.listener).finish()
    }
}

impl<P: ?Sized, R: ?Sized> From<TypedListener<P, R>> for Listener {
    fn from(typed: TypedListener<P, R>) -> Self {
        typed.listener
    }
}

impl EventKey<NoPayload, NoPayload> {
    pub fn action<F>(&self, f: F) -> TypedListener
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        TypedListener::new(Listener::action(f))
    }
}

impl<P: PayloadType + ?Sized> EventKey<P, NoPayload> {
    pub fn with_param<F>(&self, f: F) -> TypedListener<P>
    where
        F: Fn(Arc<P>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        TypedListener::new(Listener::with_param::<P, F>(f))
    }
}

impl<R: PayloadType + ?Sized> EventKey<NoPayload, R> {
    pub fn producer<F, Fut>(&self, f: F) -> TypedListener<NoPayload, R>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Arc<R>>> + Send + 'static,
    {
        TypedListener::new(Listener::producer::<R, F, Fut>(f))
    }
}

impl<P: PayloadType + ?Sized, R: PayloadType + ?Sized> EventKey<P, R> {
    pub fn responder<F>(&self, f: F) -> TypedListener<P, R>
    where
        F: Fn(Arc<P>) -> anyhow::Result<Arc<R>> + Send + Sync + 'static,
    {
        TypedListener::new(Listener::responder::<P, R, F>(f))
    }

    pub fn request<F, Fut>(&self, f: F) -> TypedListener<P, R>
    where
        F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Arc<R>>> + Send + 'static,
    {
        TypedListener::new(Listener::request::<P, R, F, Fut>(f))
    }

    pub fn handler<H>(&self, handler: Arc<H>) -> TypedListener<P, R>
    where
        H: RequestHandler<P, R> + 'static,
    {
        TypedListener::new(Listener::from_handler::<P, R, H>(handler))
    }
}

impl Dispatcher {
    pub fn register_key<P, R>(&self, key: EventKey<P, R>) -> EventResult<()>
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
    {
        self.register_typed_event::<P, R>(key.name())
    }

    /// 订阅与键契约一致的监听器；契约不一致在编译期即被拒绝
    pub fn subscribe_key<P, R>(
        &self,
        key: EventKey<P, R>,
        listener: &TypedListener<P, R>,
        priority: i32,
    ) -> EventResult<()>
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
    {
        self.subscribe(key.name(), listener.listener(), priority)
    }

    pub fn unsubscribe_key<P, R>(&self, key: EventKey<P, R>, listener: &TypedListener<P, R>) -> bool
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
    {
        self.unsubscribe(key.name(), listener.listener())
    }

    /// 同步触发无结果事件；参数为 `None` 时按无参数事件触发
    pub fn trigger_key<P>(
        &self,
        key: EventKey<P, NoPayload>,
        parameter: Option<Arc<P>>,
    ) -> EventResult<()>
    where
        P: PayloadType + ?Sized,
    {
        match parameter {
            Some(parameter) => self.trigger_sync(key.name(), parameter),
            None => self.trigger(key.name()),
        }
    }

    pub async fn trigger_async_key<P, R>(
        &self,
        key: EventKey<P, R>,
        parameter: Option<Arc<P>>,
    ) -> EventResult<Arc<ResultAggregator<R>>>
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
    {
        self.trigger_async::<P, R>(key.name(), parameter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[payload]
    trait Score {
        fn value(&self) -> u32;
    }

    #[payload]
    struct Points(u32);

    impl Score for Points {
        fn value(&self) -> u32 {
            self.0
        }
    }

    const TICK: EventKey = EventKey::new("tick");
    const SCORED: EventKey<dyn Score> = EventKey::new("scored");
    const DOUBLE: EventKey<dyn Score, dyn Score> = EventKey::new("double");
    const POLL: EventKey<NoPayload, dyn Score> = EventKey::new("poll");

    struct Fixed(u32);

    #[async_trait]
    impl RequestHandler<NoPayload, dyn Score> for Fixed {
        async fn handle(&self, _request: Arc<NoPayload>) -> anyhow::Result<Arc<dyn Score>> {
            Ok(Arc::new(Points(self.0)))
        }
    }

    #[test]
    fn keys_are_copy_and_display_their_name() {
        let copy = SCORED;
        assert_eq!(copy.name(), SCORED.name());
        assert_eq!(DOUBLE.to_string(), "double");
    }

    #[test]
    fn sync_keys_round_trip() {
        let dispatcher = Dispatcher::new();
        dispatcher.register_key(TICK).unwrap();
        dispatcher.register_key(SCORED).unwrap();

        let ticks = Arc::new(AtomicUsize::new(0));
        let total = Arc::new(AtomicUsize::new(0));
        let tick = {
            let ticks = ticks.clone();
            TICK.action(move || {
                ticks.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        let scored = {
            let total = total.clone();
            SCORED.with_param(move |s| {
                total.fetch_add(s.value() as usize, Ordering::SeqCst);
                Ok(())
            })
        };
        dispatcher.subscribe_key(TICK, &tick, 0).unwrap();
        dispatcher.subscribe_key(SCORED, &scored, 0).unwrap();

        dispatcher.trigger_key(TICK, None).unwrap();
        let points: Arc<dyn Score> = Arc::new(Points(4));
        dispatcher.trigger_key(SCORED, Some(points)).unwrap();

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_eq!(total.load(Ordering::SeqCst), 4);

        assert!(dispatcher.unsubscribe_key(SCORED, &scored));
        assert_eq!(dispatcher.listener_count("scored"), 0);
    }

    #[tokio::test]
    async fn async_key_collects_results() {
        let dispatcher = Dispatcher::new();
        dispatcher.register_key(DOUBLE).unwrap();

        let immediate = DOUBLE.responder(|s| Ok(Arc::new(Points(s.value() * 2)) as Arc<dyn Score>));
        let deferred = DOUBLE.request(|s| async move {
            let doubled: Arc<dyn Score> = Arc::new(Points(s.value() * 20));
            Ok::<_, anyhow::Error>(doubled)
        });
        dispatcher.subscribe_key(DOUBLE, &immediate, 1).unwrap();
        dispatcher.subscribe_key(DOUBLE, &deferred, 0).unwrap();

        let input: Arc<dyn Score> = Arc::new(Points(3));
        let aggregator = dispatcher
            .trigger_async_key(DOUBLE, Some(input))
            .await
            .unwrap();
        let values: Vec<u32> = aggregator
            .wait()
            .await
            .unwrap()
            .iter()
            .map(|s| s.value())
            .collect();
        assert_eq!(values, vec![6, 60]);
    }

    #[test]
    fn placeholder_parameter_runs_on_parameterless_trigger() {
        let dispatcher = Dispatcher::new();
        dispatcher.register_key(TICK).unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let listener = {
            let seen = seen.clone();
            TICK.with_param(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        dispatcher.subscribe_key(TICK, &listener, 0).unwrap();

        let untyped = {
            let seen = seen.clone();
            Listener::with_param::<NoPayload, _>(move |_| {
                seen.fetch_add(10, Ordering::SeqCst);
                Ok(())
            })
        };
        dispatcher.subscribe("tick", &untyped, 0).unwrap();

        dispatcher.trigger_key(TICK, None).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn placeholder_parameter_runs_on_parameterless_async_trigger() {
        let dispatcher = Dispatcher::new();
        dispatcher.register_key(POLL).unwrap();

        let responder = POLL.responder(|_| Ok(Arc::new(Points(1)) as Arc<dyn Score>));
        let request = POLL.request(|_| async {
            let score: Arc<dyn Score> = Arc::new(Points(2));
            Ok::<_, anyhow::Error>(score)
        });
        let handler = POLL.handler(Arc::new(Fixed(3)));
        let producer = POLL.producer(|| async {
            let score: Arc<dyn Score> = Arc::new(Points(4));
            Ok::<_, anyhow::Error>(score)
        });
        dispatcher.subscribe_key(POLL, &responder, 3).unwrap();
        dispatcher.subscribe_key(POLL, &request, 2).unwrap();
        dispatcher.subscribe_key(POLL, &handler, 1).unwrap();
        dispatcher.subscribe_key(POLL, &producer, 0).unwrap();

        let aggregator = dispatcher.trigger_async_key(POLL, None).await.unwrap();
        let values: Vec<u32> = aggregator
            .wait()
            .await
            .unwrap()
            .iter()
            .map(|s| s.value())
            .collect();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn typed_listener_unsubscribes_through_its_key() {
        let dispatcher = Dispatcher::new();
        dispatcher.register_key(TICK).unwrap();
        let listener = TICK.action(|| Ok(()));
        dispatcher.subscribe_key(TICK, &listener, 0).unwrap();

        let erased: Listener = listener.clone().into();
        assert_eq!(&erased, listener.listener());
        assert!(dispatcher.unsubscribe_key(TICK, &listener));
        assert!(!dispatcher.unsubscribe_key(TICK, &listener));
    }
}
