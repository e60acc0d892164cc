use herald_core::payload;
use herald_core::payload::NoPayload;
use herald_core::{Dispatcher, Listener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;

#[payload]
pub trait Greeting {
    fn sender(&self) -> &str;
}

#[payload]
struct Hello(String);

impl Greeting for Hello {
    fn sender(&self) -> &str {
        &self.0
    }
}

const SIMPLE_NOTIFICATION: &str = "SimpleNotification";
const GREETING: &str = "Greeting";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dispatcher = Dispatcher::new();
    dispatcher.register_event(SIMPLE_NOTIFICATION)?;
    dispatcher.register_typed_event::<dyn Greeting, NoPayload>(GREETING)?;

    let received = Arc::new(AtomicUsize::new(0));
    let counter = {
        let received = received.clone();
        Listener::action(move || {
            let n = received.fetch_add(1, Ordering::SeqCst) + 1;
            println!("Object B: received simple notification #{n}");
            Ok(())
        })
    };
    let logger = Listener::action(|| {
        println!("Logger: notification observed");
        Ok(())
    });
    let greeter = Listener::with_param::<dyn Greeting, _>(|g| {
        println!("Object B: hello from {}", g.sender());
        Ok(())
    });

    // 日志监听器优先执行
    dispatcher.subscribe(SIMPLE_NOTIFICATION, &counter, 0)?;
    dispatcher.subscribe(SIMPLE_NOTIFICATION, &logger, 1)?;
    dispatcher.subscribe(GREETING, &greeter, 0)?;

    println!("Object A: sending simple notification");
    dispatcher.trigger(SIMPLE_NOTIFICATION)?;
    dispatcher.trigger_sync::<dyn Greeting>(GREETING, Arc::new(Hello("Object A".into())))?;

    dispatcher.unsubscribe(SIMPLE_NOTIFICATION, &counter);
    dispatcher.trigger(SIMPLE_NOTIFICATION)?;

    println!(
        "notifications counted: {}",
        received.load(Ordering::SeqCst)
    );
    Ok(())
}
