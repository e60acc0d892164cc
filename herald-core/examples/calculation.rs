use herald_core::payload;
use herald_core::{Dispatcher, EventKey, TriggerOptions};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[payload]
pub trait CalculationRequest {
    fn value_a(&self) -> i64;
    fn value_b(&self) -> i64;
    fn operation(&self) -> &str;
}

#[payload]
pub trait CalculationResult {
    fn result(&self) -> f64;
    fn error(&self) -> Option<&str>;
}

#[payload]
struct Request {
    a: i64,
    b: i64,
    op: String,
}

impl CalculationRequest for Request {
    fn value_a(&self) -> i64 {
        self.a
    }
    fn value_b(&self) -> i64 {
        self.b
    }
    fn operation(&self) -> &str {
        &self.op
    }
}

#[payload]
struct Outcome {
    value: f64,
    error: Option<String>,
}

impl CalculationResult for Outcome {
    fn result(&self) -> f64 {
        self.value
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

const CALCULATE: EventKey<dyn CalculationRequest, dyn CalculationResult> =
    EventKey::new("CalculateRequest");

fn calculate(req: &dyn CalculationRequest) -> Outcome {
    let (a, b) = (req.value_a(), req.value_b());
    let value = match req.operation().to_lowercase().as_str() {
        "add" => Ok((a + b) as f64),
        "subtract" => Ok((a - b) as f64),
        "multiply" => Ok((a * b) as f64),
        "divide" if b == 0 => Err("Division by zero".to_string()),
        "divide" => Ok(a as f64 / b as f64),
        other => Err(format!("Unknown operation: {other}")),
    };

    match value {
        Ok(value) => Outcome { value, error: None },
        Err(error) => Outcome {
            value: 0.0,
            error: Some(error),
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dispatcher = Arc::new(Dispatcher::new());
    dispatcher.register_key(CALCULATE)?;

    // 处理器：直接计算
    let processor = CALCULATE.responder(|req| {
        let outcome: Arc<dyn CalculationResult> = Arc::new(calculate(req.as_ref()));
        Ok(outcome)
    });
    // 审计：模拟异步校验后回显
    let auditor = CALCULATE.request(|req| async move {
        tokio::task::yield_now().await;
        let echoed: Arc<dyn CalculationResult> = Arc::new(Outcome {
            value: req.value_a() as f64,
            error: None,
        });
        Ok::<_, anyhow::Error>(echoed)
    });
    dispatcher.subscribe_key(CALCULATE, &processor, 10)?;
    dispatcher.subscribe_key(CALCULATE, &auditor, 0)?;

    for (a, b, op) in [(10, 5, "add"), (7, 0, "divide"), (3, 4, "power")] {
        let request: Arc<dyn CalculationRequest> = Arc::new(Request {
            a,
            b,
            op: op.to_string(),
        });
        let options = TriggerOptions::<dyn CalculationResult>::new().on_each(
            |result, completed, total| async move {
                println!("  progress {completed}/{total}: {}", result.result());
                Ok(())
            },
        );

        let aggregator = dispatcher
            .trigger_async_with(CALCULATE.name(), Some(request), options)
            .await?;
        let results = aggregator.wait().await?;

        match results.first().map(|r| (r.result(), r.error())) {
            Some((value, None)) => println!("{a} {op} {b} = {value}"),
            Some((_, Some(error))) => println!("{a} {op} {b} failed: {error}"),
            None => println!("{a} {op} {b}: no results received"),
        }
    }

    println!("{}", serde_json::to_string_pretty(&dispatcher.describe())?);
    Ok(())
}
