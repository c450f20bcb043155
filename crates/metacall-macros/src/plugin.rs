//! `define_loader_plugin!` implementation.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{
    Expr, Ident, LitStr, Token,
    bracketed,
    parse::{Parse, ParseStream, Result},
    punctuated::Punctuated,
};

pub struct DefineLoaderPluginInput {
    name: LitStr,
    depends_on: Vec<LitStr>,
    factory: Expr,
}

fn parse_depends_on(input: ParseStream) -> Result<Vec<LitStr>> {
    let content;
    bracketed!(content in input);
    let lits: Punctuated<LitStr, Token![,]> = Punctuated::parse_terminated(&content)?;
    Ok(lits.into_iter().collect())
}

impl Parse for DefineLoaderPluginInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut name = None;
        let mut depends_on = Vec::new();
        let mut factory = None;

        loop {
            while input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
            if input.is_empty() {
                break;
            }
            let key: Ident = input.parse()?;
            input.parse::<Token![:]>()?;
            match key.to_string().as_str() {
                "name" => name = Some(input.parse::<LitStr>()?),
                "depends_on" => depends_on = parse_depends_on(input)?,
                "factory" => factory = Some(input.parse::<Expr>()?),
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!(
                            "unknown field `{other}`; expected name, depends_on, or factory"
                        ),
                    ));
                }
            }
        }

        let name = name.ok_or_else(|| {
            syn::Error::new(Span::call_site(), "define_loader_plugin! requires a `name: \"...\"` field")
        })?;
        let factory = factory.ok_or_else(|| {
            syn::Error::new(
                Span::call_site(),
                "define_loader_plugin! requires a `factory: || ...` field",
            )
        })?;

        Ok(DefineLoaderPluginInput {
            name,
            depends_on,
            factory,
        })
    }
}

/// `"mock"` → `mock_loader_plugin_descriptor`.
fn name_to_fn_ident(name: &LitStr) -> Ident {
    let sanitized = name.value().to_lowercase().replace(['-', '.'], "_");
    Ident::new(&format!("{sanitized}_loader_plugin_descriptor"), Span::call_site())
}

pub fn expand(input: DefineLoaderPluginInput) -> TokenStream {
    let DefineLoaderPluginInput {
        name,
        depends_on,
        factory,
    } = input;

    let fn_ident = name_to_fn_ident(&name);

    quote! {
        /// Descriptor factory generated for the `#name` loader tag.
        pub fn #fn_ident() -> ::metacall_framework::plugin::PluginDescriptor<dyn ::metacall_framework::loader::LoaderImpl> {
            ::metacall_framework::plugin::PluginDescriptor::in_process(
                #name,
                &[ #( #depends_on ),* ],
                #factory,
            )
        }
    }
}
