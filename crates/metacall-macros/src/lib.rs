//! Procedural macros for the MetaCall polyglot core.
//!
//! This crate provides:
//!
//! - `metacall_args!` — a typed argument builder standing in for the C API's
//!   variadic `metacallv`/`metacallt` calls (spec §9 "Design Notes").
//! - `define_loader_plugin!` — generates a `PluginDescriptor<dyn LoaderImpl>`
//!   static from a small declarative form, in place of hand-written
//!   `PluginDescriptor::in_process(...)` call sites.

mod args;
mod plugin;

use proc_macro::TokenStream;
use syn::parse_macro_input;

/// Builds a `Vec<metacall_value::Value>` from a comma-separated list of
/// expressions, wrapping each one in `Value::from(...)`.
///
/// ```rust,ignore
/// let args = metacall_macros::metacall_args!(1_i64, "hello", true);
/// // expands to:
/// // vec![
/// //     ::metacall_value::Value::from(1_i64),
/// //     ::metacall_value::Value::from("hello"),
/// //     ::metacall_value::Value::from(true),
/// // ]
/// ```
#[proc_macro]
pub fn metacall_args(input: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(input as args::ArgsInput);
    args::expand(parsed).into()
}

/// Declares a loader back-end as an in-process plugin descriptor.
///
/// ```rust,ignore
/// metacall_macros::define_loader_plugin! {
///     name: "mock",
///     depends_on: [],
///     factory: || Ok(::std::sync::Arc::new(MockLoader::new())),
/// }
/// ```
///
/// Expands to a `pub static MOCK_LOADER_PLUGIN: metacall_framework::plugin::PluginDescriptor<dyn metacall_framework::loader::LoaderImpl>`.
#[proc_macro]
pub fn define_loader_plugin(input: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(input as plugin::DefineLoaderPluginInput);
    plugin::expand(parsed).into()
}
