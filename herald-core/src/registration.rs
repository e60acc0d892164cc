//! 事件注册（EventRegistration）
//!
//! 每个事件名对应一条注册记录：
//! - 参数/结果类型契约在创建时校验，之后不可变；
//! - 监听器在加入前按契约校验形状（订阅期校验，而非触发期）；
//! - 监听器列表受互斥锁保护，触发时通过 `snapshot` 复制后迭代。
//!
use crate::error::{EventError, EventResult};
use crate::listener::Listener;
use crate::payload::{ContractRole, PayloadKind, PayloadType, TypeDescriptor, describe};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 事件契约：可选参数类型与可选结果类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EventContract {
    pub parameter: Option<TypeDescriptor>,
    pub result: Option<TypeDescriptor>,
}

impl EventContract {
    /// 无参数、无结果
    pub fn none() -> Self {
        Self::default()
    }

    /// 由类型参数推导契约，`NoPayload` 表示缺省
    pub fn of<P, R>() -> Self
    where
        P: PayloadType + ?Sized,
        R: PayloadType + ?Sized,
    {
        Self {
            parameter: Some(TypeDescriptor::of::<P>()),
            result: Some(TypeDescriptor::of::<R>()),
        }
    }

    pub fn with_parameter(mut self, parameter: TypeDescriptor) -> Self {
        self.parameter = Some(parameter);
        self
    }

    pub fn with_result(mut self, result: TypeDescriptor) -> Self {
        self.result = Some(result);
        self
    }
}

/// 单个事件的注册记录
#[derive(Debug)]
pub struct EventRegistration {
    name: String,
    parameter_type: Option<TypeDescriptor>,
    result_type: Option<TypeDescriptor>,
    listeners: Mutex<Vec<Listener>>,
}

impl EventRegistration {
    /// 创建注册记录；契约中的具体载体类型会被拒绝，占位标记归一为 `None`
    pub fn new(name: impl Into<String>, contract: EventContract) -> EventResult<Self> {
        let parameter_type = validate_type(ContractRole::Parameter, contract.parameter)?;
        let result_type = validate_type(ContractRole::Result, contract.result)?;

        Ok(Self {
            name: name.into(),
            parameter_type,
            result_type,
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_type(&self) -> Option<TypeDescriptor> {
        self.parameter_type
    }

    pub fn result_type(&self) -> Option<TypeDescriptor> {
        self.result_type
    }

    pub fn contract(&self) -> EventContract {
        EventContract {
            parameter: self.parameter_type,
            result: self.result_type,
        }
    }

    /// 校验形状后追加监听器（保持插入顺序）
    pub fn add_listener(&self, listener: Listener) -> EventResult<()> {
        self.validate_listener(&listener)?;
        self.lock().push(listener);
        Ok(())
    }

    /// 按 id 移除第一个匹配的监听器，返回是否发生移除
    pub fn remove_listener(&self, listener: &Listener) -> bool {
        let mut listeners = self.lock();
        match listeners.iter().position(|l| l == listener) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, listener: &Listener) -> bool {
        self.lock().iter().any(|l| l == listener)
    }

    /// 当前监听器的时间点副本
    pub fn snapshot(&self) -> Vec<Listener> {
        self.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Listener>> {
        // 锁内不执行监听器，中毒后数据仍然一致
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate_listener(&self, listener: &Listener) -> EventResult<()> {
        let shape = listener.shape();

        match self.parameter_type {
            Some(expected) if shape.parameter != Some(expected) => {
                return Err(EventError::invalid_shape(
                    &self.name,
                    format!(
                        "listener must accept a single parameter of type {}, found {}",
                        expected,
                        describe(shape.parameter)
                    ),
                ));
            }
            None if shape.parameter.is_some() => {
                return Err(EventError::invalid_shape(
                    &self.name,
                    format!(
                        "listener must not have parameters for parameterless event, found {}",
                        describe(shape.parameter)
                    ),
                ));
            }
            _ => {}
        }

        match self.result_type {
            // 直接返回与 future 返回视为等价
            Some(expected) if shape.result != Some(expected) => Err(EventError::invalid_shape(
                &self.name,
                format!(
                    "listener must return {} (directly or as a future), found {}",
                    expected,
                    describe(shape.result)
                ),
            )),
            None if shape.result.is_some() || listener.is_deferred() => {
                Err(EventError::invalid_shape(
                    &self.name,
                    "listener must return nothing synchronously for events without a result type",
                ))
            }
            _ => Ok(()),
        }
    }
}

fn validate_type(
    role: ContractRole,
    ty: Option<TypeDescriptor>,
) -> EventResult<Option<TypeDescriptor>> {
    let Some(ty) = ty else {
        return Ok(None);
    };

    match ty.kind() {
        PayloadKind::Marker => Ok(None),
        PayloadKind::Contract => Ok(Some(ty)),
        PayloadKind::Concrete => Err(EventError::InvalidContract {
            role,
            type_name: ty.name(),
            reason: "must be a #[payload] contract trait used as `dyn Trait`, not a concrete type"
                .to_string(),
        }),
    }
}
