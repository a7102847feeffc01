//! Row mapping traits and utilities

use std::sync::Arc;

use crate::error::{SqlError, SqlResult};
use crate::value::{FromValue, Value};

/// A result row handed back by an [`Executor`](crate::Executor).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. Column names are shared across rows of one result set.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Convenience constructor for a single row (mostly useful in tests).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    /// Decode a column, returning [`SqlError::Decode`] on failure.
    pub fn try_get<T: FromValue>(&self, column: &str) -> SqlResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| SqlError::decode(column, "column not found in row"))?;
        T::from_value(value).map_err(|msg| SqlError::decode(column, msg))
    }
}

/// Trait for converting a result row into a Rust struct.
///
/// This trait should typically be derived using `#[derive(FromRow)]`
/// from the `sqlgen-derive` crate.
///
/// # Example
///
/// ```ignore
/// use sqlgen::FromRow;
///
/// #[derive(FromRow)]
/// struct User {
///     id: i64,
///     username: String,
///     email: Option<String>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &Row) -> SqlResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_get_decodes_by_name() {
        let row = Row::from_pairs([("id", Value::Int(1)), ("name", Value::from("ada"))]);
        assert_eq!(row.try_get::<i64>("id").unwrap(), 1);
        assert_eq!(row.try_get::<String>("name").unwrap(), "ada");
    }

    #[test]
    fn try_get_names_missing_column() {
        let row = Row::from_pairs([("id", 1)]);
        let err = row.try_get::<i64>("email").unwrap_err();
        assert_eq!(err, SqlError::decode("email", "column not found in row"));
    }

    #[test]
    fn try_get_names_mismatched_column() {
        let row = Row::from_pairs([("id", "x")]);
        let err = row.try_get::<i64>("id").unwrap_err();
        assert!(matches!(err, SqlError::Decode { ref column, .. } if column == "id"));
    }
}
