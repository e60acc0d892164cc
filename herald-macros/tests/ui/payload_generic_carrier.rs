use herald_core::payload;
use herald_core::payload::{PayloadKind, PayloadType};

#[payload]
struct Envelope<T> {
    body: T,
}

fn main() {
    let envelope = Envelope { body: 5u32 };
    let _ = format!("{:?}", envelope);
    let _ = envelope.body;

    assert!(matches!(
        <Envelope<String> as PayloadType>::KIND,
        PayloadKind::Concrete
    ));
}
