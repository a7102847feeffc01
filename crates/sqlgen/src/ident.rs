//! SQL identifier handling.
//!
//! [`Ident`] represents a table or column name, supporting dotted notation
//! (`schema.table`, `u.name`). Every part is always rendered quoted with the
//! dialect's quote character, and an embedded quote character is doubled, so
//! a caller-supplied name can never terminate the quoting early.
//!
//! # Example
//! ```
//! use sqlgen::Ident;
//!
//! let t = Ident::new("public.users");
//! assert_eq!(t.to_sql('`'), "`public`.`users`");
//! assert_eq!(Ident::new("we`ird").to_sql('`'), "`we``ird`");
//! ```

use crate::error::{SqlError, SqlResult};

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Split a name on `.` into its parts. Never fails; see [`Ident::validate`].
    pub fn new(name: &str) -> Self {
        Self {
            parts: name.split('.').map(str::to_string).collect(),
        }
    }

    /// Identifier made of a single part, even if it contains dots.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            parts: vec![name.into()],
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The unquoted name, parts joined with `.`.
    pub fn name(&self) -> String {
        self.parts.join(".")
    }

    /// Reject empty parts and NUL characters.
    pub fn validate(&self) -> SqlResult<()> {
        let name = self.name();
        if name.is_empty() {
            return Err(SqlError::validation("Identifier cannot be empty"));
        }
        if name.contains('\0') {
            return Err(SqlError::validation(
                "Identifier cannot contain NUL character",
            ));
        }
        if self.parts.iter().any(String::is_empty) {
            return Err(SqlError::validation(format!(
                "Empty segment in identifier '{name}'"
            )));
        }
        Ok(())
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self, quote: char) -> String {
        let cap = self.parts.iter().map(|p| p.len() + 3).sum();
        let mut out = String::with_capacity(cap);
        self.write_sql(quote, &mut out);
        out
    }

    pub(crate) fn write_sql(&self, quote: char, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push(quote);
            for ch in part.chars() {
                if ch == quote {
                    out.push(quote);
                }
                out.push(ch);
            }
            out.push(quote);
        }
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::new(name)
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Ident::new(&name)
    }
}

impl From<&String> for Ident {
    fn from(name: &String) -> Self {
        Ident::new(name)
    }
}

impl From<&Ident> for Ident {
    fn from(ident: &Ident) -> Self {
        ident.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        assert_eq!(Ident::new("users").to_sql('`'), "`users`");
    }

    #[test]
    fn ident_dotted() {
        assert_eq!(Ident::new("public.users").to_sql('"'), r#""public"."users""#);
    }

    #[test]
    fn ident_single_keeps_dots() {
        assert_eq!(Ident::single("a.b").to_sql('`'), "`a.b`");
    }

    #[test]
    fn ident_doubles_embedded_quote() {
        assert_eq!(Ident::new("has`tick").to_sql('`'), "`has``tick`");
        assert_eq!(Ident::new(r#"has"quote"#).to_sql('"'), r#""has""quote""#);
    }

    #[test]
    fn ident_keeps_injection_attempt_inside_quotes() {
        let sql = Ident::new("name` = 1; DROP TABLE users; --").to_sql('`');
        assert_eq!(sql, "`name`` = 1; DROP TABLE users; --`");
    }

    #[test]
    fn ident_rejects_empty() {
        assert!(Ident::new("").validate().is_err());
    }

    #[test]
    fn ident_rejects_double_dot() {
        assert!(Ident::new("schema..table").validate().is_err());
    }

    #[test]
    fn ident_rejects_trailing_dot() {
        assert!(Ident::new("schema.").validate().is_err());
    }

    #[test]
    fn ident_rejects_nul() {
        assert!(Ident::new("us\0ers").validate().is_err());
    }

    #[test]
    fn ident_accepts_plain_names() {
        assert!(Ident::new("public.users").validate().is_ok());
    }
}
