use std::{
    error::Error,
    fmt::{self, Display},
};

/// Error type for tag population and field name resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct TagsError {
    kind: TagsErrorKind,
}

impl TagsError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &TagsErrorKind {
        &self.kind
    }

    /// Per-field parse failures carried by this error, if any.
    pub fn parse_errors(&self) -> &[ParseError] {
        match &self.kind {
            TagsErrorKind::Parse(errors) => errors,
            _ => &[],
        }
    }
}

impl Display for TagsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")
    }
}

impl Error for TagsError {}

impl<K: Into<TagsErrorKind>> From<K> for TagsError {
    fn from(value: K) -> Self {
        let kind = value.into();
        TagsError { kind }
    }
}

/// Detailed classification of tag errors.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TagsErrorKind {
    /// One or more tag values could not be parsed into their field's type.
    ///
    /// Errors are kept in field declaration order.
    Parse(Vec<ParseError>),
    /// The value handed in can't be used for the requested operation.
    InvalidArgument(&'static str),
    /// The field was never seen while walking the record.
    NotFound,
}

impl Display for TagsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagsErrorKind::Parse(errors) => {
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
            TagsErrorKind::InvalidArgument(msg) => f.write_str(msg),
            TagsErrorKind::NotFound => f.write_str("could not find field value in struct"),
        }
    }
}

impl From<ParseError> for TagsErrorKind {
    fn from(value: ParseError) -> Self {
        Self::Parse(vec![value])
    }
}

impl From<Vec<ParseError>> for TagsErrorKind {
    fn from(value: Vec<ParseError>) -> Self {
        Self::Parse(value)
    }
}

/// Scalar kinds a tag value can be parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `String`, taken verbatim.
    String,
    /// `i64`, base 10.
    Int,
    /// `f64`.
    Float,
    /// `bool`.
    Bool,
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarKind::String => "string",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
        })
    }
}

/// A tag value that failed to parse into its target kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ScalarKind,
    value: String,
    key: String,
    reason: String,
}

impl ParseError {
    pub(crate) fn new(
        kind: ScalarKind,
        value: impl Into<String>,
        key: impl Into<String>,
        reason: impl Display,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// The kind the value was being parsed into.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// The raw tag value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The tag key the value was read from.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Why the underlying parser rejected the value.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to parse {} value {} in tag {}: {}",
            self.kind, self.value, self.key, self.reason
        )
    }
}

impl Error for ParseError {}
