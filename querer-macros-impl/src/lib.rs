#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod grammar;

mod parsed;
pub use parsed::*;

mod emit;
pub use emit::*;

use proc_macro2::TokenStream;

/// Expand `#[derive(Query)]`: the `Record` impl, or a `compile_error!`.
pub fn derive_query(input: TokenStream) -> TokenStream {
    match PRecord::parse(input) {
        Ok(record) => emit_record(&record),
        Err(err) => err.to_compile_error(),
    }
}
