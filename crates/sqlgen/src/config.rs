//! Builder configuration.

use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, Placeholder};

/// Default field-tag name used to look up record columns.
pub const DEFAULT_TAG: &str = "db";

/// Configuration shared by the statement builders.
///
/// Embeddable in an application's own configuration file:
///
/// ```
/// use sqlgen::BuilderConfig;
///
/// let cfg: BuilderConfig =
///     serde_json::from_str(r#"{"tag":"sql","dialect":{"quote":"\""}}"#).unwrap();
/// assert_eq!(cfg.tag, "sql");
/// assert_eq!(cfg.dialect.quote, '"');
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Field-tag name passed to [`Record::fields`](crate::Record::fields) and
    /// [`Schema::columns`](crate::Schema::columns).
    pub tag: String,
    /// Quoting and placeholder style.
    pub dialect: Dialect,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            dialect: Dialect::default(),
        }
    }
}

impl BuilderConfig {
    /// Create a new configuration with defaults (`db` tag, backtick quoting, `?`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field-tag name.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set only the identifier quote character.
    pub fn with_quote(mut self, quote: char) -> Self {
        self.dialect.quote = quote;
        self
    }

    /// Set only the placeholder renderer.
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.dialect.placeholder = placeholder;
        self
    }
}
