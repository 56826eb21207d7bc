use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Error, Result};

use crate::util::{self, Attr, Named};

pub(crate) fn imp(args: TokenStream, input: TokenStream) -> Result<TokenStream> {
    let args: Attr<FnOpt> = syn::parse2(args)?;

    let crate_name = match args.find_one(|opt| match opt {
        FnOpt::HerdAs(_, ts) => Some(ts),
        _ => None,
    })? {
        Some((_, ts)) => ts.clone(),
        None => quote!(::herd),
    };

    let kind = match args.find_one(|opt| match opt {
        FnOpt::Kind(_, expr) => Some(expr),
        _ => None,
    })? {
        Some((_, expr)) => expr,
        None => {
            return Err(Error::new(
                Span::call_site(),
                "components must declare their type in the form `kind = <u16 expression>`",
            ))
        }
    };

    let blank = match args.find_one(|opt| match opt {
        FnOpt::Blank(_, expr) => Some(expr),
        _ => None,
    })? {
        Some((_, expr)) => quote!((#expr)()),
        None => quote!(::core::default::Default::default()),
    };

    let input: syn::DeriveInput = syn::parse2(input)?;
    if let syn::Data::Union(item) = &input.data {
        return Err(Error::new_spanned(item.union_token, "unions cannot be components"));
    }

    let generics = util::parse_generics(&input);

    let component = generics.impl_trait(
        quote!(#crate_name::comp::Component),
        quote! {
            fn component_type(&self) -> #crate_name::comp::ComponentType {
                <Self as #crate_name::comp::Kind>::TYPE
            }

            fn as_any(&self) -> &dyn ::core::any::Any { self }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any { self }

            fn reset(&mut self) { *self = <Self as #crate_name::comp::Kind>::blank(); }
        },
    );

    let kind_impl = generics.impl_trait(
        quote!(#crate_name::comp::Kind),
        quote! {
            const TYPE: #crate_name::comp::ComponentType =
                #crate_name::comp::ComponentType::new(#kind);

            fn blank() -> Self { #blank }
        },
    );

    Ok(quote! {
        #input
        #component
        #kind_impl
    })
}

enum FnOpt {
    HerdAs(syn::token::Paren, TokenStream),
    Kind(syn::Token![=], syn::Expr),
    Blank(syn::Token![=], syn::Expr),
}

impl Parse for Named<FnOpt> {
    fn parse(input: ParseStream) -> Result<Self> {
        let name = input.parse::<syn::Ident>()?;

        let value = match name.to_string().as_str() {
            "herd_as" => {
                let inner;
                let paren = syn::parenthesized!(inner in input);
                let args = inner.parse()?;
                FnOpt::HerdAs(paren, args)
            }
            "kind" => {
                let eq: syn::Token![=] = input.parse()?;
                let expr = input.parse::<syn::Expr>()?;
                FnOpt::Kind(eq, expr)
            }
            "blank" => {
                let eq: syn::Token![=] = input.parse()?;
                let expr = input.parse::<syn::Expr>()?;
                FnOpt::Blank(eq, expr)
            }
            _ => return Err(Error::new_spanned(&name, format!("Unknown argument `{}`", name))),
        };

        Ok(Named { name, value })
    }
}
