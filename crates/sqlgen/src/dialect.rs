//! Identifier quoting and placeholder styles.
//!
//! A dialect is one quote character for identifiers and one renderer for
//! positional placeholders.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Positional placeholder renderer, keyed by the zero-based parameter index.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    /// Unnumbered `?`.
    #[default]
    Question,
    /// `$1`, `$2`, ...
    Dollar,
    /// `@p1`, `@p2`, ...
    AtP,
    /// Caller-supplied renderer.
    #[serde(skip)]
    Custom(Arc<dyn Fn(usize) -> String + Send + Sync>),
}

impl Placeholder {
    /// Build a custom renderer.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        Placeholder::Custom(Arc::new(f))
    }

    /// Render the placeholder for the parameter at `index` (zero-based).
    pub fn render(&self, index: usize) -> String {
        match self {
            Placeholder::Question => "?".to_string(),
            Placeholder::Dollar => format!("${}", index + 1),
            Placeholder::AtP => format!("@p{}", index + 1),
            Placeholder::Custom(f) => f(index),
        }
    }
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::Question => f.write_str("Question"),
            Placeholder::Dollar => f.write_str("Dollar"),
            Placeholder::AtP => f.write_str("AtP"),
            Placeholder::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Target-dialect settings used when rendering SQL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    /// Identifier quote character.
    pub quote: char,
    /// Positional placeholder style.
    pub placeholder: Placeholder,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::mysql()
    }
}

impl Dialect {
    /// Backtick quoting, `?` placeholders.
    pub fn mysql() -> Self {
        Self {
            quote: '`',
            placeholder: Placeholder::Question,
        }
    }

    /// Double-quote quoting, `$n` placeholders.
    pub fn postgres() -> Self {
        Self {
            quote: '"',
            placeholder: Placeholder::Dollar,
        }
    }

    /// Double-quote quoting, `?` placeholders.
    pub fn sqlite() -> Self {
        Self {
            quote: '"',
            placeholder: Placeholder::Question,
        }
    }

    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_styles() {
        assert_eq!(Placeholder::Question.render(0), "?");
        assert_eq!(Placeholder::Dollar.render(0), "$1");
        assert_eq!(Placeholder::Dollar.render(9), "$10");
        assert_eq!(Placeholder::AtP.render(1), "@p2");
        assert_eq!(Placeholder::custom(|i| format!(":{i}")).render(3), ":3");
    }

    #[test]
    fn default_is_backtick_question() {
        let d = Dialect::default();
        assert_eq!(d.quote, '`');
        assert!(matches!(d.placeholder, Placeholder::Question));
    }

    #[test]
    fn dialect_deserializes_from_json() {
        let d: Dialect =
            serde_json::from_str(r#"{"quote":"\"","placeholder":"dollar"}"#).unwrap();
        assert_eq!(d.quote, '"');
        assert_eq!(d.placeholder.render(0), "$1");
    }
}
