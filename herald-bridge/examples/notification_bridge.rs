use herald_bridge::{
    ContextMarshal, EventAsset, EventAssetDef, NotificationBridge, RequestResponseBridge,
};
use herald_core::Dispatcher;
use herald_core::payload;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[payload]
pub trait CalculationRequest {
    fn values(&self) -> (i64, i64);
}

#[payload]
pub trait CalculationResult {
    fn value(&self) -> i64;
}

#[payload]
struct Multiply(i64, i64);

impl CalculationRequest for Multiply {
    fn values(&self) -> (i64, i64) {
        (self.0, self.1)
    }
}

#[payload]
struct Product(i64);

impl CalculationResult for Product {
    fn value(&self) -> i64 {
        self.0
    }
}

const ASSETS: &str = r#"[
    { "name": "SimpleNotification", "description": "fire-and-forget notification" },
    { "name": "CalculationEvent", "description": "multiplies two numbers" }
]"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dispatcher = Arc::new(Dispatcher::new());
    let mut defs: Vec<EventAssetDef> = serde_json::from_str(ASSETS)?;
    let calc_def = defs.pop().ok_or_else(|| anyhow::anyhow!("missing calculation asset"))?;
    let notify_def = defs.pop().ok_or_else(|| anyhow::anyhow!("missing notification asset"))?;

    let notification: EventAsset = EventAsset::from_def(dispatcher.clone(), notify_def);
    let calculation = EventAsset::<dyn CalculationRequest, dyn CalculationResult>::from_def(
        dispatcher.clone(),
        calc_def,
    );

    // 单消费者上下文，模拟主线程
    let (marshal, context) = ContextMarshal::channel();
    let main_context = tokio::spawn(context.run());

    let notify_bridge = NotificationBridge::new(&notification, Arc::new(marshal.clone()), 0, || {
        println!("UI: simple notification received");
    })?;
    let calc_bridge = RequestResponseBridge::new(&calculation, Arc::new(marshal), 0, |request, responder| {
        let (a, b) = request.values();
        println!("UI: processing {a} * {b}");
        responder.respond(Arc::new(Product(a * b)));
    })?;
    notify_bridge.enable()?;
    calc_bridge.enable()?;

    notification.raise()?;
    let input: Arc<dyn CalculationRequest> = Arc::new(Multiply(6, 7));
    let aggregator = calculation.raise_async(Some(input)).await?;
    for result in aggregator.wait().await? {
        println!("{}: {}", calculation.description(), result.value());
    }

    // 禁用后丢弃桥接，上下文随之结束
    notify_bridge.disable();
    drop(notify_bridge);
    drop(calc_bridge);
    main_context.await?;

    Ok(())
}
