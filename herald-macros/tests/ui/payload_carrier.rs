use herald_core::payload;
use herald_core::payload::{Payload, PayloadKind, PayloadType};

#[payload]
struct Request {
    input: String,
}

#[payload(debug = false)]
struct Silent(u8);

#[payload]
#[derive(Clone, PartialEq)]
enum Operation {
    Add,
    Divide { by: i64 },
}

// 已有的 Debug 派生与默认派生合并为一项
#[payload]
#[derive(std::fmt::Debug, Clone)]
struct Tagged(&'static str);

fn assert_payload<T: Payload + PayloadType>() {}

fn main() {
    assert_payload::<Request>();
    assert_payload::<Silent>();
    assert_payload::<Operation>();
    assert_payload::<Tagged>();

    // Debug 默认开启
    let _ = format!("{:?}", Request { input: "1+1".into() });
    let _ = format!("{:?}", Operation::Divide { by: 2 });
    assert!(Operation::Add.clone() == Operation::Add);
    let _ = Silent(0).0;
    let _ = format!("{:?}", Tagged("t").clone());

    assert!(matches!(<Request as PayloadType>::KIND, PayloadKind::Concrete));
}
