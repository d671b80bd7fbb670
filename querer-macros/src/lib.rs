#![doc = include_str!("../README.md")]

/// Derive `querer::Record` for a struct.
///
/// Fields marked `#[query("key")]` are read from that key; fields marked
/// `#[query(flatten)]` are embedded records whose own fields are read from
/// the same mapping. Unmarked fields are left alone.
#[proc_macro_derive(Query, attributes(query))]
pub fn query_macros(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    querer_macros_impl::derive_query(input.into()).into()
}
