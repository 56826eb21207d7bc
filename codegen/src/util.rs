use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Error, Result};

/// A comma-separated list of `name = value`-style options.
pub(crate) struct Attr<T> {
    pub(crate) items: Punctuated<Named<T>, syn::Token![,]>,
}

impl<T> Parse for Attr<T>
where
    Named<T>: Parse,
{
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(Self { items: Punctuated::parse_terminated(input)? })
    }
}

impl<T> Attr<T> {
    /// Finds the only option accepted by `matcher`.
    ///
    /// Returns an error if multiple options are accepted.
    pub(crate) fn find_one<'t, U: ?Sized>(
        &'t self,
        matcher: impl Fn(&'t T) -> Option<&'t U>,
    ) -> Result<Option<(Span, &'t U)>> {
        let mut found = None;

        for item in &self.items {
            if let Some(value) = matcher(&item.value) {
                if found.is_some() {
                    return Err(Error::new_spanned(
                        &item.name,
                        format!("Argument `{}` cannot be specified multiple times", item.name),
                    ));
                }
                found = Some((item.name.span(), value));
            }
        }

        Ok(found)
    }
}

/// An option value along with the identifier that named it.
pub(crate) struct Named<T> {
    pub(crate) name:  syn::Ident,
    pub(crate) value: T,
}

pub(crate) fn parse_generics(input: &syn::DeriveInput) -> ParsedGenerics {
    let (decl, usage, where_) = input.generics.split_for_impl();

    ParsedGenerics {
        ident:  input.ident.clone(),
        decl:   decl.to_token_stream(),
        usage:  usage.to_token_stream(),
        where_: where_.to_token_stream(),
    }
}

pub(crate) struct ParsedGenerics {
    pub(crate) ident:  syn::Ident,
    pub(crate) decl:   TokenStream,
    pub(crate) usage:  TokenStream,
    pub(crate) where_: TokenStream,
}

impl ParsedGenerics {
    pub(crate) fn impl_trait(&self, trait_: TokenStream, body: TokenStream) -> TokenStream {
        let Self { ident, decl, usage, where_ } = self;
        quote! {
            impl #decl #trait_ for #ident #usage #where_ {
                #body
            }
        }
    }
}
