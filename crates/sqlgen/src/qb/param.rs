//! Parameter collection bound to a dialect.

use crate::dialect::Dialect;
use crate::ident::Ident;
use crate::value::Value;

/// Collects parameters while SQL is rendered and hands out placeholders.
///
/// One list is threaded through every clause of a statement, so placeholder
/// numbering is global and always matches the parameter order.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
    dialect: Dialect,
    params: Vec<Value>,
}

impl ParamList {
    /// Create a new empty parameter list for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    /// Add a parameter and return the placeholder that refers to it.
    pub fn bind(&mut self, value: Value) -> String {
        let placeholder = self.dialect.placeholder.render(self.params.len());
        self.params.push(value);
        placeholder
    }

    /// Quote an identifier with the dialect's quote character.
    pub fn quote(&self, ident: &Ident) -> String {
        ident.to_sql(self.dialect.quote)
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.params
    }

    pub fn into_values(self) -> Vec<Value> {
        self.params
    }

    /// Render a `?` template, binding `values` in order.
    ///
    /// Markers inside quoted literals and quoted identifiers are left alone.
    /// Markers beyond the supplied values are kept verbatim; callers check the
    /// count up front with [`count_markers`].
    pub fn write_template(&mut self, sql: &str, values: &[Value]) -> String {
        let mut out = String::with_capacity(sql.len() + values.len() * 2);
        let mut next = values.iter();
        scan_markers(sql, |piece| match piece {
            Piece::Text(text) => out.push_str(text),
            Piece::Marker => match next.next() {
                Some(v) => {
                    let ph = self.bind(v.clone());
                    out.push_str(&ph);
                }
                None => out.push('?'),
            },
        });
        out
    }
}

/// Count `?` markers outside quoted sections.
pub fn count_markers(sql: &str) -> usize {
    let mut n = 0;
    scan_markers(sql, |piece| {
        if matches!(piece, Piece::Marker) {
            n += 1;
        }
    });
    n
}

enum Piece<'a> {
    Text(&'a str),
    Marker,
}

fn scan_markers<'a>(sql: &'a str, mut emit: impl FnMut(Piece<'a>)) {
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in sql.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '?' => {
                    emit(Piece::Text(&sql[start..i]));
                    emit(Piece::Marker);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    emit(Piece::Text(&sql[start..]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Placeholder;

    #[test]
    fn bind_numbers_globally() {
        let mut params = ParamList::new(Dialect::postgres());
        assert_eq!(params.bind(Value::Int(1)), "$1");
        assert_eq!(params.bind(Value::Int(2)), "$2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn template_skips_quoted_markers() {
        let mut params = ParamList::new(Dialect::default().with_placeholder(Placeholder::Dollar));
        let sql = params.write_template("a = ? AND b = '?' AND c = ?", &[1.into(), 2.into()]);
        assert_eq!(sql, "a = $1 AND b = '?' AND c = $2");
        assert_eq!(params.values(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn count_ignores_quoted_markers() {
        assert_eq!(count_markers("a = ? OR b = ?"), 2);
        assert_eq!(count_markers("a = '?' OR `b?` = ?"), 1);
        assert_eq!(count_markers("plain"), 0);
    }
}
