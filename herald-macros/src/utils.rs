use quote::ToTokens;
use std::collections::HashSet;
use syn::punctuated::Punctuated;
use syn::{Attribute, Generics, Token};

/// 把 `required` 并入条目上已有的 `#[derive(..)]`，合并为首个属性。
///
/// 以路径末段去重（`Debug` 与 `std::fmt::Debug` 视为同一项），`required` 排在前面；
/// 无法解析的 derive 属性原样保留，由编译器报告。
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    if required.is_empty() {
        return;
    }

    let mut derives = required;
    attrs.retain(|attr| {
        if !attr.path().is_ident("derive") {
            return true;
        }
        match attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated) {
            Ok(list) => {
                derives.extend(list);
                false
            }
            Err(_) => true,
        }
    });

    let mut seen = HashSet::new();
    derives.retain(|path| seen.insert(derive_name(path)));
    attrs.insert(0, syn::parse_quote!(#[derive(#(#derives),*)]));
}

fn derive_name(path: &syn::Path) -> String {
    path.segments
        .last()
        .map(|segment| segment.ident.to_string())
        .unwrap_or_else(|| path.to_token_stream().to_string())
}

/// 为每个类型参数追加 `Send + Sync + 'static` 约束，
/// 使泛型载体满足 `Payload` 的能力边界。
pub(crate) fn with_payload_bounds(generics: &Generics) -> Generics {
    let mut generics = generics.clone();
    let params: Vec<syn::Ident> = generics.type_params().map(|tp| tp.ident.clone()).collect();
    if params.is_empty() {
        return generics;
    }
    let where_clause = generics.make_where_clause();
    for ident in params {
        where_clause.predicates.push(syn::parse_quote! {
            #ident: ::core::marker::Send + ::core::marker::Sync + 'static
        });
    }
    generics
}
