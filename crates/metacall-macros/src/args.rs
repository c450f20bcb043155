//! `metacall_args!` implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Expr, Token,
    parse::{Parse, ParseStream, Result},
    punctuated::Punctuated,
};

pub struct ArgsInput {
    exprs: Punctuated<Expr, Token![,]>,
}

impl Parse for ArgsInput {
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(ArgsInput {
            exprs: Punctuated::parse_terminated(input)?,
        })
    }
}

pub fn expand(input: ArgsInput) -> TokenStream {
    let values = input.exprs.iter().map(|expr| {
        quote! { ::metacall_value::Value::from(#expr) }
    });
    quote! {
        ::std::vec![ #( #values ),* ]
    }
}
