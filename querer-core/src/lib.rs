#![warn(missing_docs)]
//! Core of the querer query-string unmarshaler.
//!
//! A query string, once decoded into [`QueryValues`], is written into a
//! record through the [`Record`] trait. `Record` is normally implemented by
//! `#[derive(Query)]` from the `querer` crate: the generated code visits the
//! record's fields in declaration order, sends every `#[query("key")]` leaf
//! through [`populate_field`] and recurses into every `#[query(flatten)]`
//! field.
//!
//! Leaf values are produced by [`convert`], which dispatches on a field's
//! [`DeclaredType`] to one of a fixed set of parsers, and narrowed to the
//! field's Rust type by its [`Scalar`] implementation.

#[cfg(feature = "tracing")]
#[allow(unused_imports)]
pub(crate) use tracing::{debug, trace};

// No-op stand-ins, resolved by textual scope in the modules below

/// Forwards to `tracing::trace` when the tracing feature is enabled
#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($tt:tt)*) => {};
}

/// Forwards to `tracing::debug` when the tracing feature is enabled
#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($tt:tt)*) => {};
}

mod error;
pub use error::*;

mod values;
pub use values::*;

mod convert;
pub use convert::*;

mod scalar;
pub use scalar::*;

mod walk;
pub use walk::*;
