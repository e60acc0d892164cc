use herald_core::payload;
use herald_core::payload::NoPayload;
use herald_core::{Dispatcher, EventError, Listener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[payload]
pub trait EventData {
    fn message(&self) -> &str;
    fn value(&self) -> i32;
}

#[payload]
struct TestEventData {
    message: String,
    value: i32,
}

impl EventData for TestEventData {
    fn message(&self) -> &str {
        &self.message
    }
    fn value(&self) -> i32 {
        self.value
    }
}

fn data(message: &str, value: i32) -> Arc<dyn EventData> {
    Arc::new(TestEventData {
        message: message.to_string(),
        value,
    })
}

#[test]
fn register_then_query() {
    let dispatcher = Dispatcher::new();
    assert!(!dispatcher.is_event_registered("TestEvent"));

    dispatcher.register_event("TestEvent").unwrap();
    dispatcher
        .register_typed_event::<dyn EventData, NoPayload>("TestParameterEvent")
        .unwrap();

    assert!(dispatcher.is_event_registered("TestEvent"));
    assert!(dispatcher.is_event_registered("TestParameterEvent"));
}

#[test]
fn duplicate_registration_keeps_first_contract() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_event("DuplicateEvent").unwrap();
    dispatcher
        .register_typed_event::<dyn EventData, NoPayload>("DuplicateEvent")
        .unwrap();

    let called = Arc::new(AtomicBool::new(false));
    let handler = {
        let called = called.clone();
        Listener::action(move || {
            called.store(true, Ordering::SeqCst);
            Ok(())
        })
    };
    // 仍是无参数事件
    dispatcher.subscribe("DuplicateEvent", &handler, 0).unwrap();
    dispatcher.trigger("DuplicateEvent").unwrap();
    assert!(called.load(Ordering::SeqCst));

    let typed = Listener::with_param::<dyn EventData, _>(|_| Ok(()));
    let err = dispatcher.subscribe("DuplicateEvent", &typed, 0).unwrap_err();
    assert!(matches!(err, EventError::InvalidListenerShape { .. }));
}

#[test]
fn subscribe_to_unregistered_event_fails() {
    let dispatcher = Dispatcher::new();
    let err = dispatcher
        .subscribe("UnregisteredEvent", &Listener::action(|| Ok(())), 0)
        .unwrap_err();
    assert!(matches!(err, EventError::UnknownEvent { .. }));
    assert!(err.to_string().contains("UnregisteredEvent"));
}

#[test]
fn trigger_without_listeners_or_registration_is_ok() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_event("NoListenerEvent").unwrap();
    dispatcher.trigger("NoListenerEvent").unwrap();
    dispatcher.trigger("NeverRegistered").unwrap();
}

#[test]
fn trigger_passes_parameter() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register_typed_event::<dyn EventData, NoPayload>("ParameterEvent")
        .unwrap();

    let received: Arc<Mutex<Option<(String, i32)>>> = Arc::new(Mutex::new(None));
    let handler = {
        let received = received.clone();
        Listener::with_param::<dyn EventData, _>(move |d| {
            *received.lock().unwrap() = Some((d.message().to_string(), d.value()));
            Ok(())
        })
    };
    dispatcher.subscribe("ParameterEvent", &handler, 0).unwrap();
    dispatcher
        .trigger_sync("ParameterEvent", data("Test", 42))
        .unwrap();

    assert_eq!(
        *received.lock().unwrap(),
        Some(("Test".to_string(), 42))
    );
}

#[test]
fn sync_priority_order_is_descending_and_stable() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_event("PriorityEvent").unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for (label, priority) in [("Low", -1), ("High", 1), ("Normal", 0), ("Normal2", 0)] {
        let order = order.clone();
        let listener = Listener::action(move || {
            order.lock().unwrap().push(label);
            Ok(())
        });
        dispatcher.subscribe("PriorityEvent", &listener, priority).unwrap();
    }

    dispatcher.trigger("PriorityEvent").unwrap();
    assert_eq!(
        *order.lock().unwrap(),
        vec!["High", "Normal", "Normal2", "Low"]
    );
}

#[test]
fn throwing_listener_stops_the_rest() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_event("E").unwrap();
    let later = Arc::new(AtomicUsize::new(0));

    dispatcher
        .subscribe(
            "E",
            &Listener::action(|| Err(anyhow::anyhow!("listener exploded"))),
            0,
        )
        .unwrap();
    let after = {
        let later = later.clone();
        Listener::action(move || {
            later.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    };
    dispatcher.subscribe("E", &after, 0).unwrap();

    let err = dispatcher.trigger("E").unwrap_err();
    match err {
        EventError::ListenerFailure { event, source } => {
            assert_eq!(event, "E");
            assert_eq!(source.to_string(), "listener exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(later.load(Ordering::SeqCst), 0);
}

#[test]
fn unsubscribe_is_idempotent() {
    let dispatcher = Dispatcher::new();
    dispatcher.register_event("UnsubscribeTest").unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let handler = {
        let count = count.clone();
        Listener::action(move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    };

    assert!(!dispatcher.unsubscribe("UnsubscribeTest", &handler));
    dispatcher.subscribe("UnsubscribeTest", &handler, 0).unwrap();
    assert!(dispatcher.unsubscribe("UnsubscribeTest", &handler.clone()));
    assert!(!dispatcher.unsubscribe("UnsubscribeTest", &handler));

    dispatcher.trigger("UnsubscribeTest").unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn concrete_types_are_not_contracts() {
    let dispatcher = Dispatcher::new();
    let err = dispatcher
        .register_typed_event::<TestEventData, NoPayload>("Concrete")
        .unwrap_err();
    assert!(matches!(err, EventError::InvalidContract { .. }));
    assert!(!dispatcher.is_event_registered("Concrete"));
}

#[test]
fn concurrent_subscribe_and_trigger() {
    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.register_event("Busy").unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            let hits = hits.clone();
            std::thread::spawn(move || {
                let listener = Listener::action(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
                dispatcher.subscribe("Busy", &listener, i).unwrap();
                dispatcher.trigger("Busy").unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(dispatcher.listener_count("Busy"), 8);
    hits.store(0, Ordering::SeqCst);
    dispatcher.trigger("Busy").unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 8);
}
