#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub use querer_core::*;

#[cfg(feature = "derive")]
#[doc = include_str!("derive_query.md")]
pub use querer_macros::Query;
