//! Named-parameter arguments and binding.
//!
//! Named statements use `:column` markers. An executor that only speaks
//! positional placeholders resolves them with [`bind_named`].

use std::fmt;
use std::sync::Arc;

use crate::dialect::Placeholder;
use crate::error::{SqlError, SqlResult};
use crate::schema::{Record, ValueMap, record_fields};
use crate::value::Value;

/// One set of named values: a keyed map or a record.
#[derive(Clone)]
pub enum NamedItem {
    Map(ValueMap),
    Record(Arc<dyn Record>),
}

impl NamedItem {
    /// Resolve to a column -> value map.
    pub fn to_map(&self, tag: &str, index: usize) -> SqlResult<ValueMap> {
        match self {
            NamedItem::Map(map) => Ok(map.clone()),
            NamedItem::Record(record) => {
                Ok(record_fields(record.as_ref(), tag, index)?.into_iter().collect())
            }
        }
    }
}

impl fmt::Debug for NamedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedItem::Map(map) => f.debug_tuple("Map").field(map).finish(),
            NamedItem::Record(_) => f.write_str("Record(..)"),
        }
    }
}

/// Arguments for a named statement: one item, or a batch sharing one template.
#[derive(Debug, Clone)]
pub struct NamedArgs {
    tag: String,
    items: Vec<NamedItem>,
    batch: bool,
}

impl NamedArgs {
    pub fn single(tag: impl Into<String>, item: NamedItem) -> Self {
        Self {
            tag: tag.into(),
            items: vec![item],
            batch: false,
        }
    }

    pub fn batch(tag: impl Into<String>, items: Vec<NamedItem>) -> Self {
        Self {
            tag: tag.into(),
            items,
            batch: true,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn items(&self) -> &[NamedItem] {
        &self.items
    }

    pub fn is_batch(&self) -> bool {
        self.batch
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Rewrite `:name` markers into positional placeholders.
///
/// Markers inside quoted sections and `::` casts are left alone. A marker
/// without a value in `lookup` is a validation error.
pub fn bind_named(
    sql: &str,
    lookup: &ValueMap,
    placeholder: &Placeholder,
) -> SqlResult<(String, Vec<Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut params = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            out.push(ch);
            continue;
        }
        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                out.push(ch);
            }
            ':' if chars.peek().is_some_and(|&(_, c)| c == ':') => {
                chars.next();
                out.push_str("::");
            }
            ':' if chars
                .peek()
                .is_some_and(|&(_, c)| c == '_' || c.is_ascii_alphabetic()) =>
            {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, c)) = chars.peek() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        end = j + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &sql[start..end];
                let value = lookup.get(name).ok_or_else(|| {
                    SqlError::validation(format!("named parameter ':{name}' has no value"))
                })?;
                out.push_str(&placeholder.render(params.len()));
                params.push(value.clone());
            }
            _ => out.push(ch),
        }
    }
    Ok((out, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn lookup() -> ValueMap {
        [("id", Value::Int(1)), ("name", Value::from("ada"))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn binds_in_marker_order() {
        let (sql, params) = bind_named(
            "INSERT INTO t (a, b) VALUES (:name, :id)",
            &lookup(),
            &Placeholder::Dollar,
        )
        .unwrap();
        assert_eq!(sql, "INSERT INTO t (a, b) VALUES ($1, $2)");
        assert_eq!(params, args!["ada", 1]);
    }

    #[test]
    fn skips_casts_and_quoted_text() {
        let (sql, params) = bind_named(
            "SELECT ':id', x::text FROM t WHERE id = :id",
            &lookup(),
            &Placeholder::Question,
        )
        .unwrap();
        assert_eq!(sql, "SELECT ':id', x::text FROM t WHERE id = ?");
        assert_eq!(params, args![1]);
    }

    #[test]
    fn unknown_name_fails() {
        let err = bind_named("VALUES (:missing)", &lookup(), &Placeholder::Question).unwrap_err();
        assert!(err.to_string().contains(":missing"));
    }
}
