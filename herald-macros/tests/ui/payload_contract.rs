use herald_core::payload;
use herald_core::payload::{PayloadKind, PayloadType};
use std::sync::Arc;

#[payload]
pub trait Greeting {
    fn text(&self) -> String;
}

// 已有超 trait 时追加 Payload
#[payload]
pub trait Named: std::fmt::Display {
    fn name(&self) -> &str;
}

#[payload]
struct Hello;

impl Greeting for Hello {
    fn text(&self) -> String {
        "hello".to_string()
    }
}

fn main() {
    assert!(matches!(<dyn Greeting as PayloadType>::KIND, PayloadKind::Contract));
    assert!(matches!(<dyn Named as PayloadType>::KIND, PayloadKind::Contract));

    // 契约对象满足 Send + Sync + 'static
    let shared: Arc<dyn Greeting> = Arc::new(Hello);
    std::thread::spawn(move || shared.text()).join().unwrap();
}
