//! Error types for sqlgen

use std::time::Duration;

use thiserror::Error;

/// Result type alias for sqlgen operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types for statement compilation and execution.
///
/// The enum is `Clone` because builders carry a captured error forward
/// through every derived value until the terminal compile call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SqlError {
    /// A filter document node is missing a field, has the wrong number of
    /// children, or uses an unknown type.
    #[error("Malformed filter at {path}: {message}")]
    MalformedFilter { path: String, message: String },

    /// Condition text failed to parse.
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A row, map or record does not match the statement's column set.
    #[error("Validation error in row {index}: {message}")]
    RowMismatch { index: usize, message: String },

    /// A record type has no field-to-column mapping for the configured tag.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Query returned more rows than expected
    #[error("Expected {expected} row(s), got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Error reported by the executing client
    #[error("Query error: {0}")]
    Query(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),
}

impl SqlError {
    /// Create a malformed filter error for the node at `path`
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedFilter {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a syntax error at a byte offset
    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            offset,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a validation error attributed to one input row
    pub fn row_mismatch(index: usize, message: impl Into<String>) -> Self {
        Self::RowMismatch {
            index,
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a query error from a client message
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Check if this is a malformed filter error
    pub fn is_malformed_filter(&self) -> bool {
        matches!(self, Self::MalformedFilter { .. })
    }

    /// Check if this is a syntax error
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    /// Check if this is a validation error (including row mismatches)
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::RowMismatch { .. })
    }

    /// Check if this is a schema error
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Row index for errors raised against a single row of a multi-row input.
    pub fn row_index(&self) -> Option<usize> {
        match self {
            Self::RowMismatch { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for SqlError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{constraint}: {message}")),
                "23503" => return Self::ForeignKeyViolation(format!("{constraint}: {message}")),
                "23514" => return Self::CheckViolation(format!("{constraint}: {message}")),
                _ => {}
            }
        }
        Self::Query(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_mismatch_carries_index() {
        let err = SqlError::row_mismatch(2, "expected 3 values, got 2");
        assert!(err.is_validation());
        assert_eq!(err.row_index(), Some(2));
        assert_eq!(
            err.to_string(),
            "Validation error in row 2: expected 3 values, got 2"
        );
    }

    #[test]
    fn syntax_error_reports_offset() {
        let err = SqlError::syntax("unexpected character ';'", 7);
        assert!(err.is_syntax());
        assert_eq!(err.to_string(), "Syntax error at offset 7: unexpected character ';'");
    }
}
