//! 载荷契约（Payload Contract）
//!
//! 事件的参数与结果类型都必须满足 `Payload` 能力边界，并通过 `PayloadType`
//! 声明自身的类别：
//! - `Marker`：占位标记（`NoPayload`），表示“无参数/无结果”，从不作为真实载荷；
//! - `Contract`：契约 trait 的 trait object（`dyn Trait`），可用于事件注册；
//! - `Concrete`：具体载体类型，仅用于实现契约 trait，注册时会被拒绝。
//!
//! 通常不直接手写实现，而是使用 `#[payload]` 属性宏：
//!
//! ```
//! use herald_core::payload::{PayloadKind, TypeDescriptor};
//! use herald_core::payload;
//!
//! #[payload]
//! pub trait Greeting {
//!     fn text(&self) -> &str;
//! }
//!
//! #[payload]
//! struct Hello;
//!
//! impl Greeting for Hello {
//!     fn text(&self) -> &str {
//!         "hello"
//!     }
//! }
//!
//! assert_eq!(TypeDescriptor::of::<dyn Greeting>().kind(), PayloadKind::Contract);
//! assert_eq!(TypeDescriptor::of::<Hello>().kind(), PayloadKind::Concrete);
//! ```
//!
use serde::Serialize;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// 所有事件参数/结果类型需要满足的能力边界（可作为 trait object 使用）
pub trait Payload: Any + Send + Sync {}

/// 载荷类型描述能力：声明类型类别，允许非 Sized 的 `dyn Trait`
pub trait PayloadType: Send + Sync + 'static {
    const KIND: PayloadKind;
}

/// “无参数/无结果”占位标记
pub type NoPayload = dyn Payload;

impl PayloadType for dyn Payload {
    const KIND: PayloadKind = PayloadKind::Marker;
}

/// 载荷类型类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Marker,
    Contract,
    Concrete,
}

/// 契约中的位置：参数或结果
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractRole {
    Parameter,
    Result,
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter => f.write_str("parameter"),
            Self::Result => f.write_str("result"),
        }
    }
}

/// 运行时类型描述符，相等性仅由 `TypeId` 决定
#[derive(Clone, Copy, Debug, Serialize)]
pub struct TypeDescriptor {
    #[serde(skip)]
    id: TypeId,
    name: &'static str,
    kind: PayloadKind,
}

impl TypeDescriptor {
    pub fn of<T: PayloadType + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: T::KIND,
        }
    }

    /// 占位标记映射为 `None`，其余类型映射为 `Some(descriptor)`
    pub fn contract<T: PayloadType + ?Sized>() -> Option<Self> {
        Self::of::<T>().into_contract()
    }

    pub(crate) fn into_contract(self) -> Option<Self> {
        if self.is_marker() { None } else { Some(self) }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    pub fn is_marker(&self) -> bool {
        self.kind == PayloadKind::Marker
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 用于错误信息：`None` 显示为 `()`
pub(crate) fn describe(ty: Option<TypeDescriptor>) -> String {
    ty.map(|t| t.name().to_string())
        .unwrap_or_else(|| "()".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;

    #[payload]
    trait Ping {
        fn seq(&self) -> u32;
    }

    #[payload]
    trait Pong {}

    #[payload]
    struct PingMsg(u32);

    impl Ping for PingMsg {
        fn seq(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn marker_maps_to_none() {
        assert!(TypeDescriptor::contract::<NoPayload>().is_none());
        assert!(TypeDescriptor::of::<NoPayload>().is_marker());
    }

    #[test]
    fn kinds_follow_declaration() {
        assert_eq!(TypeDescriptor::of::<dyn Ping>().kind(), PayloadKind::Contract);
        assert_eq!(TypeDescriptor::of::<PingMsg>().kind(), PayloadKind::Concrete);
        let msg: Box<dyn Ping> = Box::new(PingMsg(7));
        assert_eq!(msg.seq(), 7);
    }

    #[test]
    fn equality_uses_type_id_only() {
        assert_eq!(TypeDescriptor::of::<dyn Ping>(), TypeDescriptor::of::<dyn Ping>());
        assert_ne!(TypeDescriptor::of::<dyn Ping>(), TypeDescriptor::of::<dyn Pong>());
    }

    #[test]
    fn descriptor_serializes_without_type_id() {
        let json = serde_json::to_value(TypeDescriptor::of::<dyn Pong>()).unwrap();
        assert_eq!(json["kind"], "contract");
        assert!(json["name"].as_str().unwrap().contains("Pong"));
        assert!(json.get("id").is_none());
    }

    #[test]
    fn describe_renders_unit_for_none() {
        assert_eq!(describe(None), "()");
        assert!(describe(TypeDescriptor::contract::<dyn Ping>()).contains("Ping"));
    }
}
