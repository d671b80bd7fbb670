//! Walking records: the traits generated by `#[derive(Query)]` and the
//! entry points that drive them.

use chrono::NaiveDateTime;

use crate::{QueryError, QueryErrorKind, QueryValues, Scalar};
#[cfg(feature = "tracing")]
use crate::{debug, trace};

/// A record whose fields can be populated from [`QueryValues`].
///
/// Implemented by `#[derive(Query)]`. The derived implementation visits the
/// fields in declaration order: `#[query("key")]` fields go through
/// [`populate_field`], `#[query(flatten)]` fields recurse into their own
/// `Record` implementation, and every other field is left alone.
///
/// `Box<T>` and `Option<T>` are records whenever `T` is, so an embedded
/// record can be held by value, boxed, or be optional.
pub trait Record {
    /// Write every annotated field that has a value in `query`.
    ///
    /// Stops at the first conversion error; fields written before it keep
    /// their new values.
    fn populate(&mut self, query: &QueryValues) -> Result<(), QueryError>;

    /// Whether any annotated field reachable from this record type has a
    /// value in `query`.
    fn wants(query: &QueryValues) -> bool;

    /// Append this record's annotated fields, flattened, in declaration order.
    fn describe(fields: &mut Vec<FieldInfo>);
}

/// One annotated leaf field, as listed by [`fields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Mapping key the field is read from
    pub key: &'static str,
    /// Rust name of the field (the index for tuple structs)
    pub field: &'static str,
    /// Rust name of the field's type
    pub type_name: &'static str,
}

impl FieldInfo {
    /// Describe a field of type `T`.
    pub fn new<T: ?Sized>(key: &'static str, field: &'static str) -> Self {
        FieldInfo {
            key,
            field,
            type_name: core::any::type_name::<T>(),
        }
    }
}

impl<T: Record> Record for Box<T> {
    fn populate(&mut self, query: &QueryValues) -> Result<(), QueryError> {
        (**self).populate(query)
    }

    fn wants(query: &QueryValues) -> bool {
        T::wants(query)
    }

    fn describe(fields: &mut Vec<FieldInfo>) {
        T::describe(fields)
    }
}

/// An optional embedded record.
///
/// A `None` is replaced by `T::default()` only when one of the record's
/// fields is about to be written; an existing `Some` is populated in place.
impl<T: Record + Default> Record for Option<T> {
    fn populate(&mut self, query: &QueryValues) -> Result<(), QueryError> {
        if let Some(inner) = self {
            return inner.populate(query);
        }
        if !T::wants(query) {
            return Ok(());
        }
        trace!(record = core::any::type_name::<T>(), "allocating embedded record");
        self.insert(T::default()).populate(query)
    }

    fn wants(query: &QueryValues) -> bool {
        T::wants(query)
    }

    fn describe(fields: &mut Vec<FieldInfo>) {
        T::describe(fields)
    }
}

/// Populate one `#[query("key")]` field.
///
/// A key that is missing, or whose first value is empty, leaves the field
/// untouched. Otherwise the value is converted and written; a conversion
/// error is returned with `key` attached and the field is left as it was.
pub fn populate_field<S: Scalar>(
    slot: &mut S,
    key: &'static str,
    query: &QueryValues,
) -> Result<(), QueryError> {
    let Some(raw) = query.supplied(key) else {
        trace!(key, "no value supplied");
        return Ok(());
    };

    let value = S::from_query_str(raw).map_err(|err| err.with_key(key))?;
    trace!(key, raw, "writing field");
    *slot = value;
    Ok(())
}

/// Anything [`unmarshal_query`] accepts.
///
/// Every [`Record`] is a target. Scalar types are targets too, but
/// populating one fails with [`QueryErrorKind::InvalidTarget`]: there are no
/// fields to write.
pub trait Target {
    /// Populate `self` from `query`.
    fn populate_target(&mut self, query: &QueryValues) -> Result<(), QueryError>;
}

impl<T: Record> Target for T {
    fn populate_target(&mut self, query: &QueryValues) -> Result<(), QueryError> {
        self.populate(query)
    }
}

macro_rules! impl_non_record_target {
    ($($ty:ty),*) => {
        $(
            impl Target for $ty {
                fn populate_target(&mut self, _query: &QueryValues) -> Result<(), QueryError> {
                    Err(QueryError::new(QueryErrorKind::InvalidTarget {
                        type_name: core::any::type_name::<$ty>(),
                    }))
                }
            }
        )*
    };
}

impl_non_record_target!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, NaiveDateTime
);

/// Populate `target` from the first value of each annotated key in `query`.
///
/// ```
/// use querer_core::{QueryErrorKind, QueryValues, unmarshal_query};
///
/// let query: QueryValues = [("limit", "10")].into_iter().collect();
/// let mut not_a_record = 0u32;
/// let err = unmarshal_query(&mut not_a_record, &query).unwrap_err();
/// assert!(matches!(err.kind(), QueryErrorKind::InvalidTarget { .. }));
/// ```
pub fn unmarshal_query<T: Target + ?Sized>(
    target: &mut T,
    query: &QueryValues,
) -> Result<(), QueryError> {
    debug!(
        record = core::any::type_name::<T>(),
        keys = query.len(),
        "unmarshaling query"
    );
    target.populate_target(query)
}

/// Build a `T::default()` and populate it from `query`.
pub fn from_query<T: Record + Default>(query: &QueryValues) -> Result<T, QueryError> {
    let mut record = T::default();
    unmarshal_query(&mut record, query)?;
    Ok(record)
}

/// List the annotated fields of `T`, flattened, in the order they are
/// populated.
pub fn fields<T: Record>() -> Vec<FieldInfo> {
    let mut fields = Vec::new();
    T::describe(&mut fields);
    fields
}
