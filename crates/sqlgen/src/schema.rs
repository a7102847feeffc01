//! Field-to-column schema descriptors.
//!
//! A record type describes, per field-tag name, which columns it maps to and
//! what its current values are. The descriptor is normally generated with
//! `#[derive(Record)]`, but both traits can be implemented by hand:
//!
//! ```
//! use sqlgen::{Record, Schema, Value};
//!
//! struct User {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Schema for User {
//!     fn columns(tag: &str) -> Option<Vec<String>> {
//!         (tag == "db").then(|| vec!["name".into(), "age".into()])
//!     }
//! }
//!
//! impl Record for User {
//!     fn fields(&self, tag: &str) -> Option<Vec<(String, Value)>> {
//!         (tag == "db").then(|| {
//!             vec![
//!                 ("name".into(), self.name.clone().into()),
//!                 ("age".into(), self.age.into()),
//!             ]
//!         })
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// Keyed map input for INSERT and named parameters.
pub type ValueMap = BTreeMap<String, Value>;

/// Static column list of a record type.
pub trait Schema {
    /// Ordered column names for `tag`, or `None` if the type has no mapping
    /// for that tag.
    fn columns(tag: &str) -> Option<Vec<String>>;
}

/// Per-value field extraction.
pub trait Record: Send + Sync {
    /// Ordered `(column, value)` pairs for `tag`, or `None` if the type has no
    /// mapping for that tag.
    fn fields(&self, tag: &str) -> Option<Vec<(String, Value)>>;
}

impl<R: Record + ?Sized> Record for &R {
    fn fields(&self, tag: &str) -> Option<Vec<(String, Value)>> {
        (**self).fields(tag)
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn fields(&self, tag: &str) -> Option<Vec<(String, Value)>> {
        (**self).fields(tag)
    }
}

impl<R: Record + ?Sized> Record for std::sync::Arc<R> {
    fn fields(&self, tag: &str) -> Option<Vec<(String, Value)>> {
        (**self).fields(tag)
    }
}

/// Columns of `T` for `tag`, or a schema error.
pub fn schema_columns<T: Schema>(tag: &str) -> SqlResult<Vec<String>> {
    match T::columns(tag) {
        Some(columns) if !columns.is_empty() => Ok(columns),
        _ => Err(SqlError::schema(format!(
            "{} has no column mapping for tag '{tag}'",
            std::any::type_name::<T>()
        ))),
    }
}

/// Extract a record's fields, or a schema error naming the record index.
pub fn record_fields(
    record: &dyn Record,
    tag: &str,
    index: usize,
) -> SqlResult<Vec<(String, Value)>> {
    match record.fields(tag) {
        Some(fields) if !fields.is_empty() => Ok(fields),
        _ => Err(SqlError::schema(format!(
            "record {index} has no field mapping for tag '{tag}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tagged;

    impl Record for Tagged {
        fn fields(&self, tag: &str) -> Option<Vec<(String, Value)>> {
            (tag == "db").then(|| vec![("id".to_string(), Value::Int(1))])
        }
    }

    impl Schema for Tagged {
        fn columns(tag: &str) -> Option<Vec<String>> {
            (tag == "db").then(|| vec!["id".to_string()])
        }
    }

    #[test]
    fn unknown_tag_is_schema_error() {
        let err = record_fields(&Tagged, "json", 3).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("record 3"));
        assert!(schema_columns::<Tagged>("json").unwrap_err().is_schema());
    }

    #[test]
    fn known_tag_yields_fields() {
        assert_eq!(
            record_fields(&Tagged, "db", 0).unwrap(),
            vec![("id".to_string(), Value::Int(1))]
        );
        assert_eq!(schema_columns::<Tagged>("db").unwrap(), vec!["id"]);
    }
}
