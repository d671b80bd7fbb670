use core::fmt;

/// Error returned when a query cannot be unmarshaled into a record.
///
/// The walker stops at the first failing field, so a `QueryError` always
/// describes exactly one problem. Fields visited before the failure keep the
/// values already written to them.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    /// The specific kind of error
    pub kind: QueryErrorKind,
    /// Mapping key of the field being populated, when there was one
    pub key: Option<&'static str>,
}

impl QueryError {
    /// Create an error that is not (yet) tied to a field
    pub const fn new(kind: QueryErrorKind) -> Self {
        QueryError { kind, key: None }
    }

    /// Attach the mapping key of the field that failed.
    ///
    /// A key that is already attached is kept: the innermost field wins.
    pub fn with_key(mut self, key: &'static str) -> Self {
        self.key.get_or_insert(key);
        self
    }

    /// The specific kind of error
    pub fn kind(&self) -> &QueryErrorKind {
        &self.kind
    }

    /// Mapping key of the field that failed, if any
    pub fn key(&self) -> Option<&'static str> {
        self.key
    }

    pub(crate) fn invalid_value(
        raw: impl Into<String>,
        expected: &'static str,
        reason: impl fmt::Display,
    ) -> Self {
        QueryError::new(QueryErrorKind::InvalidValue {
            raw: raw.into(),
            expected,
            reason: reason.to_string(),
        })
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("query unmarshal - ")?;
        if let Some(key) = self.key {
            write!(f, "key `{key}`: ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for QueryError {}

impl From<QueryErrorKind> for QueryError {
    fn from(kind: QueryErrorKind) -> Self {
        QueryError::new(kind)
    }
}

/// Specific error kinds for query unmarshaling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The unmarshal target is not a record.
    InvalidTarget {
        /// Rust name of the type that was passed
        type_name: &'static str,
    },

    /// A field's declared type has no registered converter.
    UnsupportedType {
        /// Name of the declared type
        type_name: &'static str,
    },

    /// The raw string does not parse as the field's primitive type.
    InvalidValue {
        /// The offending raw string
        raw: String,
        /// Name of the type the value was parsed as
        expected: &'static str,
        /// Diagnostic from the underlying parser
        reason: String,
    },

    /// A date/time value is neither 10 (`YYYY-MM-DD`) nor 19
    /// (`YYYY-MM-DDTHH:MM:SS`) characters long.
    InvalidDateLength {
        /// The offending raw string
        raw: String,
    },

    /// A date/time value has a recognized length but does not match the layout.
    InvalidDateValue {
        /// The offending raw string
        raw: String,
        /// Diagnostic from the date parser
        reason: String,
    },
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::InvalidTarget { type_name } => {
                write!(f, "cannot unmarshal into non-record type: {type_name}")
            }
            QueryErrorKind::UnsupportedType { type_name } => {
                write!(f, "invalid field type: {type_name}")
            }
            QueryErrorKind::InvalidValue {
                raw,
                expected,
                reason,
            } => write!(f, "invalid {expected} value {raw:?}: {reason}"),
            QueryErrorKind::InvalidDateLength { raw } => write!(
                f,
                "invalid date value: {raw:?} (expected 10 or 19 characters, got {})",
                raw.len()
            ),
            QueryErrorKind::InvalidDateValue { raw, reason } => {
                write!(f, "error parsing date value: {raw:?} - {reason}")
            }
        }
    }
}
