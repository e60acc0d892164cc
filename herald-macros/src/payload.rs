use crate::utils::{apply_derives, with_payload_bounds};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[payload] 宏实现
/// - trait：追加 `Payload` 超 trait，并为 `dyn Trait` 实现 `PayloadType`（契约类型）
/// - struct/enum：实现 `Payload` 与 `PayloadType`（具体载体类型），默认追加 `Debug` 派生
/// - 参数：`#[payload(debug = true|false)]`，仅对 struct/enum 生效，默认 true
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as PayloadAttrConfig);
    let input = parse_macro_input!(item as Item);

    match input {
        Item::Trait(tr) => {
            if cfg.derive_debug.is_some() {
                return syn::Error::new(tr.span(), "'debug' is not supported on #[payload] traits")
                    .to_compile_error()
                    .into();
            }
            expand_contract(tr)
        }
        Item::Struct(mut st) => {
            apply_derives(&mut st.attrs, required_derives(&cfg));
            let body = quote! { #st };
            expand_carrier(body, &st.ident, &st.generics)
        }
        Item::Enum(mut en) => {
            apply_derives(&mut en.attrs, required_derives(&cfg));
            let body = quote! { #en };
            expand_carrier(body, &en.ident, &en.generics)
        }
        other => syn::Error::new(
            other.span(),
            "#[payload] only supports trait, struct or enum",
        )
        .to_compile_error()
        .into(),
    }
}

fn required_derives(cfg: &PayloadAttrConfig) -> Vec<syn::Path> {
    if cfg.derive_debug.unwrap_or(true) {
        vec![syn::parse_quote!(Debug)]
    } else {
        Vec::new()
    }
}

// 契约 trait：以 `dyn Trait` 的形式作为事件的参数/结果类型
fn expand_contract(mut tr: syn::ItemTrait) -> TokenStream {
    if !tr.generics.params.is_empty() {
        return syn::Error::new(
            tr.generics.span(),
            "#[payload] contract traits cannot be generic",
        )
        .to_compile_error()
        .into();
    }

    if tr.colon_token.is_none() {
        tr.colon_token = Some(Default::default());
    }
    tr.supertraits
        .push(syn::parse_quote!(::herald_core::payload::Payload));

    let ident = &tr.ident;
    let out = quote! {
        #tr

        impl ::herald_core::payload::PayloadType for dyn #ident {
            const KIND: ::herald_core::payload::PayloadKind =
                ::herald_core::payload::PayloadKind::Contract;
        }
    };

    TokenStream::from(out)
}

// 具体载体：可实现契约 trait，但不能直接注册为事件契约
fn expand_carrier(
    body: proc_macro2::TokenStream,
    ident: &syn::Ident,
    generics: &syn::Generics,
) -> TokenStream {
    if let Some(lt) = generics.lifetimes().next() {
        return syn::Error::new(lt.span(), "#[payload] types must be 'static")
            .to_compile_error()
            .into();
    }

    let bounded = with_payload_bounds(generics);
    let (impl_generics, ty_generics, where_clause) = bounded.split_for_impl();

    let out = quote! {
        #body

        impl #impl_generics ::herald_core::payload::Payload for #ident #ty_generics #where_clause {}

        impl #impl_generics ::herald_core::payload::PayloadType for #ident #ty_generics #where_clause {
            const KIND: ::herald_core::payload::PayloadKind =
                ::herald_core::payload::PayloadKind::Concrete;
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

struct PayloadAttrConfig {
    derive_debug: Option<bool>,
}

impl Parse for PayloadAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self { derive_debug: None });
        }

        let mut derive_debug: Option<bool> = None;
        let pairs: Punctuated<PayloadAttrElem, Token![,]> = Punctuated::parse_terminated(input)?;

        for elem in pairs {
            match elem {
                PayloadAttrElem::Debug(b, span) => {
                    if derive_debug.is_some() {
                        return Err(syn::Error::new(span, "duplicate key 'debug' in attribute"));
                    }
                    derive_debug = Some(b);
                }
            }
        }
        Ok(Self { derive_debug })
    }
}

enum PayloadAttrElem {
    Debug(bool, proc_macro2::Span),
}

impl Parse for PayloadAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        if key == "debug" {
            let _eq: Token![=] = input.parse()?;
            let expr: syn::Expr = input.parse()?;
            match expr {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Bool(b),
                    ..
                }) => Ok(Self::Debug(b.value(), key.span())),
                other => Err(syn::Error::new(
                    other.span(),
                    "expected boolean literal for 'debug'",
                )),
            }
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'debug'",
            ))
        }
    }
}
