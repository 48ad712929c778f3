//! Field-pathed conversion errors.
//!
//! Every stage of the pipeline reports problems as [`ConversionError`] values
//! instead of failing: the caller gets the list alongside whatever resources
//! were still produced and decides which errors are fatal.

use std::fmt;

/// Category of a conversion error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An expected prerequisite (route, backend service) does not exist
    NotFound,
    /// A required value is missing
    Required,
    /// A malformed annotation value or unresolvable reference
    InvalidValue,
    /// Two producers want the same key; indicates a pipeline ordering defect
    Duplicate,
    /// The source expresses something the target API cannot
    NotSupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::NotFound => "Not found",
            ErrorKind::Required => "Required value",
            ErrorKind::InvalidValue => "Invalid value",
            ErrorKind::Duplicate => "Duplicate value",
            ErrorKind::NotSupported => "Unsupported value",
        };
        f.write_str(text)
    }
}

/// Logical path of the field an error refers to, e.g. `spec.rules[0].http.paths[1]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new<S: Into<String>>(root: S) -> Self {
        Self(root.into())
    }

    /// Append a named child segment
    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}.{}", self.0, name))
    }

    /// Append a list index
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    /// Append a map key
    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{}]", self.0, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single structured conversion error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {kind}: {message}")]
pub struct ConversionError {
    pub kind: ErrorKind,
    pub field: FieldPath,
    pub message: String,
}

/// Ordered list of errors returned by every conversion stage
pub type ErrorList = Vec<ConversionError>;

impl ConversionError {
    pub fn new<M: Into<String>>(kind: ErrorKind, field: FieldPath, message: M) -> Self {
        Self {
            kind,
            field,
            message: message.into(),
        }
    }

    pub fn not_found<M: Into<String>>(field: FieldPath, message: M) -> Self {
        Self::new(ErrorKind::NotFound, field, message)
    }

    pub fn required<M: Into<String>>(field: FieldPath, message: M) -> Self {
        Self::new(ErrorKind::Required, field, message)
    }

    /// Invalid value; the offending value is quoted in the message
    pub fn invalid_value<V: fmt::Display, M: fmt::Display>(
        field: FieldPath,
        value: V,
        message: M,
    ) -> Self {
        Self::new(
            ErrorKind::InvalidValue,
            field,
            format!("{:?}: {}", value.to_string(), message),
        )
    }

    pub fn duplicate<M: Into<String>>(field: FieldPath, message: M) -> Self {
        Self::new(ErrorKind::Duplicate, field, message)
    }

    pub fn not_supported<M: Into<String>>(field: FieldPath, message: M) -> Self {
        Self::new(ErrorKind::NotSupported, field, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_path_rendering() {
        let path = FieldPath::new("spec")
            .child("rules")
            .index(2)
            .child("http")
            .child("paths")
            .index(0);
        assert_eq!(path.as_str(), "spec.rules[2].http.paths[0]");

        let annotation = FieldPath::new("metadata")
            .child("annotations")
            .key("nginx.ingress.kubernetes.io/use-regex");
        assert_eq!(
            annotation.to_string(),
            "metadata.annotations[nginx.ingress.kubernetes.io/use-regex]"
        );
    }

    #[test]
    fn error_display_includes_kind_and_path() {
        let err = ConversionError::invalid_value(
            FieldPath::new("metadata.annotations"),
            "yes",
            "expected true or false",
        );
        assert_eq!(err.kind, ErrorKind::InvalidValue);
        assert_eq!(
            err.to_string(),
            "metadata.annotations: Invalid value: \"yes\": expected true or false"
        );

        let err = ConversionError::not_found(FieldPath::new("HTTPRoute"), "default/foo");
        assert_eq!(err.to_string(), "HTTPRoute: Not found: default/foo");
    }
}
