//! 监听器（Listener）
//!
//! 监听器是可克隆的句柄：唯一 `ListenerId`、形状 `ListenerShape` 与类型擦除的调用器。
//! - 相等性、哈希与取消订阅均以 `ListenerId` 为准，克隆共享同一 id；
//! - 调用器为标签变体：`Immediate`（在调用线程直接执行）或 `Deferred`（返回 future）；
//! - 参数以 `Arc<P>` 形式擦除为 `Arc<dyn Any>`，结果以 `Arc<R>` 擦除为 `Box<dyn Any>`，
//!   调用时进行受检的向下转型。
//!
use crate::payload::{NoPayload, Payload, PayloadType, TypeDescriptor};
use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// 擦除后的参数：内部保存 `Arc<P>`
pub type ErasedArg = Arc<dyn Any + Send + Sync>;

/// 擦除后的结果：内部保存 `Arc<R>`
pub type ErasedValue = Box<dyn Any + Send>;

type ImmediateFn =
    Arc<dyn Fn(Option<&ErasedArg>) -> anyhow::Result<Option<ErasedValue>> + Send + Sync>;

type DeferredFn = Arc<
    dyn Fn(Option<ErasedArg>) -> BoxFuture<'static, anyhow::Result<Option<ErasedValue>>>
        + Send
        + Sync,
>;

/// 监听器唯一标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 监听器形状：参数类型、结果类型，以及结果是否以 future 形式延迟返回
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ListenerShape {
    pub parameter: Option<TypeDescriptor>,
    pub result: Option<TypeDescriptor>,
    pub deferred: bool,
}

impl ListenerShape {
    pub fn new(
        parameter: Option<TypeDescriptor>,
        result: Option<TypeDescriptor>,
        deferred: bool,
    ) -> Self {
        Self {
            parameter,
            result,
            deferred,
        }
    }
}

/// 类型擦除的调用器
#[derive(Clone)]
pub enum Invoker {
    Immediate(ImmediateFn),
    Deferred(DeferredFn),
}

impl Invoker {
    pub fn immediate<F>(f: F) -> Self
    where
        F: Fn(Option<&ErasedArg>) -> anyhow::Result<Option<ErasedValue>> + Send + Sync + 'static,
    {
        Self::Immediate(Arc::new(f))
    }

    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(Option<ErasedArg>) -> BoxFuture<'static, anyhow::Result<Option<ErasedValue>>>
            + Send
            + Sync
            + 'static,
    {
        Self::Deferred(Arc::new(f))
    }
}

/// 监听器主动放弃本次触发时返回的错误：异步触发会停止后续监听器，但不标记聚合器失败
#[derive(Debug, thiserror::Error)]
#[error("listener cancelled the trigger")]
pub struct ListenerCancelled;

/// 基于 trait 的异步请求处理器，可通过 [`Listener::from_handler`] 订阅
#[async_trait]
pub trait RequestHandler<P, R>: Send + Sync
where
    P: PayloadType + ?Sized,
    R: PayloadType + ?Sized,
{
    async fn handle(&self, request: Arc<P>) -> anyhow::Result<Arc<R>>;
}

/// 监听器句柄
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    shape: ListenerShape,
    invoker: Invoker,
}

impl Listener {
    /// 无参数、无结果
    pub fn action<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoker = Invoker::immediate(move |_arg: Option<&ErasedArg>| {
            f()?;
            Ok(None)
        });
        Self::from_parts(ListenerShape::new(None, None, false), invoker)
    }

    /// 单参数、无结果
    pub fn with_param<P, F>(f: F) -> Self
    where
        P: PayloadType + ?Sized,
        F: Fn(Arc<P>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let invoker = Invoker::immediate(move |arg: Option<&ErasedArg>| {
            f(downcast_arg::<P>(arg)?)?;
            Ok(None)
        });
        let shape = ListenerShape::new(TypeDescriptor::contract::<P>(), None, false);
        Self::from_parts(shape, invoker)
    }

    /// 单参数、直接返回结果
    pub fn responder<P, R, F>(f: F) -> Self
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
        F: Fn(Arc<P>) -> anyhow::Result<Arc<R>> + Send + Sync + 'static,
    {
        let invoker = Invoker::immediate(move |arg: Option<&ErasedArg>| {
            let value = f(downcast_arg::<P>(arg)?)?;
            Ok(Some(erase_value(value)))
        });
        let shape = ListenerShape::new(
            TypeDescriptor::contract::<P>(),
            TypeDescriptor::contract::<R>(),
            false,
        );
        Self::from_parts(shape, invoker)
    }

    /// 无参数、异步返回结果
    pub fn producer<R, F, Fut>(f: F) -> Self
    where
        R: PayloadType + ?Sized,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Arc<R>>> + Send + 'static,
    {
        let invoker = Invoker::deferred(move |_arg: Option<ErasedArg>| {
            let fut = f();
            async move {
                let value = fut.await?;
                Ok::<_, anyhow::Error>(Some(erase_value(value)))
            }
            .boxed()
        });
        let shape = ListenerShape::new(None, TypeDescriptor::contract::<R>(), true);
        Self::from_parts(shape, invoker)
    }

    /// 单参数、异步返回结果
    pub fn request<P, R, F, Fut>(f: F) -> Self
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
        F: Fn(Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Arc<R>>> + Send + 'static,
    {
        let invoker = Invoker::deferred(move |arg: Option<ErasedArg>| {
            match downcast_arg::<P>(arg.as_ref()) {
                Ok(p) => {
                    let fut = f(p);
                    async move {
                        let value = fut.await?;
                        Ok::<_, anyhow::Error>(Some(erase_value(value)))
                    }
                    .boxed()
                }
                Err(e) => async move { Err::<Option<ErasedValue>, _>(e) }.boxed(),
            }
        });
        let shape = ListenerShape::new(
            TypeDescriptor::contract::<P>(),
            TypeDescriptor::contract::<R>(),
            true,
        );
        Self::from_parts(shape, invoker)
    }

    /// 由 [`RequestHandler`] 构造异步监听器
    pub fn from_handler<P, R, H>(handler: Arc<H>) -> Self
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
        H: RequestHandler<P, R> + 'static,
    {
        Self::request::<P, R, _, _>(move |request| {
            let handler = handler.clone();
            async move { handler.handle(request).await }
        })
    }

    /// 运行时（非类型化）构造：形状仅在订阅校验通过后才被信任
    pub fn from_parts(shape: ListenerShape, invoker: Invoker) -> Self {
        Self {
            id: ListenerId::new(),
            shape,
            invoker,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn shape(&self) -> &ListenerShape {
        &self.shape
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.invoker, Invoker::Deferred(_))
    }

    /// 在调用线程上同步执行；延迟型监听器无法同步执行
    pub(crate) fn invoke_now(
        &self,
        arg: Option<&ErasedArg>,
    ) -> anyhow::Result<Option<ErasedValue>> {
        match &self.invoker {
            Invoker::Immediate(f) => f(arg),
            Invoker::Deferred(_) => Err(anyhow::anyhow!(
                "listener {} is deferred and cannot run synchronously",
                self.id
            )),
        }
    }

    pub(crate) async fn invoke(
        &self,
        arg: Option<&ErasedArg>,
    ) -> anyhow::Result<Option<ErasedValue>> {
        match &self.invoker {
            Invoker::Immediate(f) => f(arg),
            Invoker::Deferred(f) => f(arg.cloned()).await,
        }
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Listener {}

impl Hash for Listener {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("shape", &self.shape)
            .field("deferred", &self.is_deferred())
            .finish()
    }
}

/// 擦除参数：外层 `Arc<dyn Any>` 内部保存 `Arc<P>`，以支持非 Sized 的 `P`
pub fn erase_arg<P: PayloadType + ?Sized>(parameter: Arc<P>) -> ErasedArg {
    Arc::new(parameter)
}

pub fn erase_value<R: PayloadType + ?Sized>(value: Arc<R>) -> ErasedValue {
    Box::new(value)
}

/// 参数向下转型；`P` 为占位标记且触发未携带参数时，得到一个空的占位值
pub fn downcast_arg<P: PayloadType + ?Sized>(arg: Option<&ErasedArg>) -> anyhow::Result<Arc<P>> {
    let found = match arg {
        Some(a) => a.as_ref().downcast_ref::<Arc<P>>().cloned(),
        None if TypeDescriptor::of::<P>().is_marker() => absent::<P>(),
        None => None,
    };
    found.ok_or_else(|| anyhow::anyhow!("type mismatch: expected parameter {}", type_name::<P>()))
}

struct Absent;

impl Payload for Absent {}

fn absent<P: PayloadType + ?Sized>() -> Option<Arc<P>> {
    let marker: Arc<NoPayload> = Arc::new(Absent);
    (&marker as &dyn Any).downcast_ref::<Arc<P>>().cloned()
}

pub fn downcast_value<R: PayloadType + ?Sized>(
    value: Option<ErasedValue>,
) -> anyhow::Result<Arc<R>> {
    let Some(value) = value else {
        return Err(anyhow::anyhow!(
            "type mismatch: expected result {}, found none",
            type_name::<R>()
        ));
    };
    value
        .downcast::<Arc<R>>()
        .map(|v| *v)
        .map_err(|_| anyhow::anyhow!("type mismatch: expected result {}", type_name::<R>()))
}
