use chrono::NaiveDateTime;

use crate::{
    DeclaredType, NAIVE_DATE_TIME, PrimitiveKind, QueryError, QueryErrorKind, TypedValue, convert,
};

/// A leaf field type that can be read from a single query value.
///
/// Every `#[query("key")]` field must have a `Scalar` type; anything else is
/// rejected when the record is compiled, not when a value shows up.
pub trait Scalar: Sized {
    /// The converter table entry used for this type
    const DECLARED: DeclaredType;

    /// Narrow a converted value to this type.
    fn from_typed(value: TypedValue) -> Result<Self, QueryError>;

    /// Convert a raw query value into this type.
    fn from_query_str(raw: &str) -> Result<Self, QueryError> {
        Self::from_typed(convert(raw, Self::DECLARED)?)
    }
}

fn mismatch(type_name: &'static str) -> QueryError {
    QueryError::new(QueryErrorKind::UnsupportedType { type_name })
}

macro_rules! impl_scalar_int {
    ($kind:ident, $variant:ident => $($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const DECLARED: DeclaredType = DeclaredType::Primitive(PrimitiveKind::$kind);

                fn from_typed(value: TypedValue) -> Result<Self, QueryError> {
                    match value {
                        TypedValue::$variant(n) => <$ty>::try_from(n).map_err(|err| {
                            QueryError::invalid_value(n.to_string(), stringify!($ty), err)
                        }),
                        _ => Err(mismatch(stringify!($ty))),
                    }
                }
            }
        )*
    };
}

impl_scalar_int!(Int, Int => i8, i16, i32, i64, isize);
impl_scalar_int!(Uint, Uint => u8, u16, u32, u64, usize);

impl Scalar for bool {
    const DECLARED: DeclaredType = DeclaredType::Primitive(PrimitiveKind::Bool);

    fn from_typed(value: TypedValue) -> Result<Self, QueryError> {
        match value {
            TypedValue::Bool(b) => Ok(b),
            _ => Err(mismatch("bool")),
        }
    }
}

impl Scalar for f64 {
    const DECLARED: DeclaredType = DeclaredType::Primitive(PrimitiveKind::Float);

    fn from_typed(value: TypedValue) -> Result<Self, QueryError> {
        match value {
            TypedValue::Float(f) => Ok(f),
            _ => Err(mismatch("f64")),
        }
    }
}

impl Scalar for f32 {
    const DECLARED: DeclaredType = DeclaredType::Primitive(PrimitiveKind::Float);

    fn from_typed(value: TypedValue) -> Result<Self, QueryError> {
        match value {
            TypedValue::Float(f) => {
                let narrowed = f as f32;
                if f.is_finite() && !narrowed.is_finite() {
                    return Err(QueryError::invalid_value(
                        f.to_string(),
                        "f32",
                        "value out of range",
                    ));
                }
                Ok(narrowed)
            }
            _ => Err(mismatch("f32")),
        }
    }
}

impl Scalar for String {
    const DECLARED: DeclaredType = DeclaredType::Primitive(PrimitiveKind::String);

    fn from_typed(value: TypedValue) -> Result<Self, QueryError> {
        match value {
            TypedValue::String(s) => Ok(s),
            _ => Err(mismatch("String")),
        }
    }
}

impl Scalar for NaiveDateTime {
    const DECLARED: DeclaredType = DeclaredType::Named(NAIVE_DATE_TIME);

    fn from_typed(value: TypedValue) -> Result<Self, QueryError> {
        match value {
            TypedValue::DateTime(dt) => Ok(dt),
            _ => Err(mismatch(NAIVE_DATE_TIME)),
        }
    }
}

/// An optional leaf: stays `None` unless a value is supplied.
impl<S: Scalar> Scalar for Option<S> {
    const DECLARED: DeclaredType = S::DECLARED;

    fn from_typed(value: TypedValue) -> Result<Self, QueryError> {
        S::from_typed(value).map(Some)
    }
}
