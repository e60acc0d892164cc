//! herald 过程宏
//!
//! 提供 `#[payload]` 属性宏，为事件参数/结果类型打上载荷契约（Payload Contract）标记：
//! - 作用于 trait：声明一个契约类型，以 `dyn Trait` 形式参与事件注册；
//! - 作用于 struct/enum：声明一个具体载体，用于实现契约 trait 并在触发时传递。
//!
use proc_macro::TokenStream;

mod payload;
mod utils;

/// 载荷契约宏
///
/// ```ignore
/// use herald_core::payload;
///
/// #[payload]
/// pub trait CalcRequest {
///     fn input(&self) -> &str;
/// }
///
/// #[payload]
/// struct Request {
///     input: String,
/// }
///
/// impl CalcRequest for Request {
///     fn input(&self) -> &str {
///         &self.input
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn payload(attr: TokenStream, item: TokenStream) -> TokenStream {
    payload::expand(attr, item)
}
