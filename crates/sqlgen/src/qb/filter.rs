//! Declarative filter documents.
//!
//! A [`Filter`] is the serializable form of a condition:
//!
//! ```json
//! {"type": "and", "fields": [
//!     {"type": "eq", "column": "status", "value": "active"},
//!     {"type": "between", "column": "age", "from": 18, "to": 65}
//! ]}
//! ```
//!
//! [`Filter::to_expr`] validates each node's shape and translates the tree
//! into an [`Expr`]. A node with no `type` means "no filter" and translates to
//! `None`; inside `and`/`or`/`not` it is dropped rather than reported.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;

use crate::error::{SqlError, SqlResult};
use crate::qb::expr::Expr;
use crate::value::Value;

/// One node of a filter document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Json>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub from: Option<Json>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub to: Option<Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Filter>,
}

/// A key that is present is `Some`, even when its value is `null`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Json>, D::Error> {
    Json::deserialize(deserializer).map(Some)
}

/// Fields a node type may carry besides `type`.
#[derive(Clone, Copy, PartialEq)]
enum Shape {
    Group,
    Single,
    Compare,
    List,
    Range,
    Column,
}

fn shape_of(kind: &str) -> Option<Shape> {
    let shape = match kind {
        "and" | "or" => Shape::Group,
        "not" => Shape::Single,
        "eq" | "ne" | "lt" | "lte" | "gt" | "gte" | "like" | "not_like" => Shape::Compare,
        "in" | "not_in" => Shape::List,
        "between" => Shape::Range,
        "is_null" | "is_not_null" => Shape::Column,
        _ => return None,
    };
    Some(shape)
}

impl Filter {
    /// The "no filter" node.
    pub fn none() -> Self {
        Self::default()
    }

    fn node(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    fn compare(kind: &str, column: impl Into<String>, value: impl Into<Json>) -> Self {
        Self {
            column: Some(column.into()),
            value: Some(value.into()),
            ..Self::node(kind)
        }
    }

    pub fn and(fields: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            ..Self::node("and")
        }
    }

    pub fn or(fields: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            ..Self::node("or")
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(field: Filter) -> Self {
        Self {
            fields: vec![field],
            ..Self::node("not")
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::compare("eq", column, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::compare("ne", column, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::compare("lt", column, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::compare("lte", column, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::compare("gt", column, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::compare("gte", column, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<Json>) -> Self {
        Self::compare("like", column, pattern)
    }

    pub fn not_like(column: impl Into<String>, pattern: impl Into<Json>) -> Self {
        Self::compare("not_like", column, pattern)
    }

    pub fn in_list<I>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Json>,
    {
        Self {
            column: Some(column.into()),
            values: Some(values.into_iter().map(Into::into).collect()),
            ..Self::node("in")
        }
    }

    pub fn not_in<I>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Json>,
    {
        Self {
            kind: "not_in".to_string(),
            ..Self::in_list(column, values)
        }
    }

    pub fn between(
        column: impl Into<String>,
        from: impl Into<Json>,
        to: impl Into<Json>,
    ) -> Self {
        Self {
            column: Some(column.into()),
            from: Some(from.into()),
            to: Some(to.into()),
            ..Self::node("between")
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            ..Self::node("is_null")
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self {
            column: Some(column.into()),
            ..Self::node("is_not_null")
        }
    }

    /// True for the untyped "no filter" node.
    pub fn is_none(&self) -> bool {
        self.kind.is_empty()
    }

    /// Parse a filter document from JSON text.
    pub fn from_json(text: &str) -> SqlResult<Self> {
        serde_json::from_str(text).map_err(|e| SqlError::malformed("$", e.to_string()))
    }

    /// Serialize this filter to JSON text.
    pub fn to_json(&self) -> SqlResult<String> {
        serde_json::to_string(self).map_err(|e| SqlError::malformed("$", e.to_string()))
    }

    /// Translate into an expression. `Ok(None)` means "no filter".
    pub fn to_expr(&self) -> SqlResult<Option<Expr>> {
        self.translate("$")
    }

    fn translate(&self, path: &str) -> SqlResult<Option<Expr>> {
        if self.is_none() {
            return Ok(None);
        }
        let shape = shape_of(&self.kind).ok_or_else(|| {
            SqlError::malformed(path, format!("unknown filter type '{}'", self.kind))
        })?;
        self.check_shape(shape, path)?;

        let expr = match shape {
            Shape::Group => {
                let children = self.translate_children(path)?;
                if children.is_empty() {
                    return Ok(None);
                }
                if self.kind == "and" {
                    Expr::And(children)
                } else {
                    Expr::Or(children)
                }
            }
            Shape::Single => match self.translate_children(path)?.pop() {
                Some(child) => Expr::not(child),
                None => return Ok(None),
            },
            Shape::Compare => {
                let column = self.column(path)?;
                let value = Value::from(required(&self.value, "value", path)?);
                match self.kind.as_str() {
                    "eq" => Expr::eq(column, value),
                    "ne" => Expr::ne(column, value),
                    "lt" => Expr::lt(column, value),
                    "lte" => Expr::lte(column, value),
                    "gt" => Expr::gt(column, value),
                    "gte" => Expr::gte(column, value),
                    "like" => Expr::like(column, value),
                    _ => Expr::not_like(column, value),
                }
            }
            Shape::List => {
                let column = self.column(path)?;
                let values = match &self.values {
                    Some(values) if !values.is_empty() => values.iter().map(Value::from),
                    _ => {
                        return Err(SqlError::malformed(
                            path,
                            format!("'{}' requires a non-empty 'values' array", self.kind),
                        ));
                    }
                };
                if self.kind == "in" {
                    Expr::in_list(column, values)
                } else {
                    Expr::not_in(column, values)
                }
            }
            Shape::Range => {
                let column = self.column(path)?;
                let from = Value::from(required(&self.from, "from", path)?);
                let to = Value::from(required(&self.to, "to", path)?);
                Expr::between(column, from, to)
            }
            Shape::Column => {
                let column = self.column(path)?;
                if self.kind == "is_null" {
                    Expr::is_null(column)
                } else {
                    Expr::is_not_null(column)
                }
            }
        };
        Ok(Some(expr))
    }

    fn translate_children(&self, path: &str) -> SqlResult<Vec<Expr>> {
        let mut out = Vec::with_capacity(self.fields.len());
        for (i, child) in self.fields.iter().enumerate() {
            if let Some(expr) = child.translate(&format!("{path}.fields[{i}]"))? {
                out.push(expr);
            }
        }
        Ok(out)
    }

    /// Reject missing children and fields that do not belong to this type.
    fn check_shape(&self, shape: Shape, path: &str) -> SqlResult<()> {
        match shape {
            Shape::Group if self.fields.is_empty() => {
                return Err(SqlError::malformed(
                    path,
                    format!("'{}' requires at least one entry in 'fields'", self.kind),
                ));
            }
            Shape::Single if self.fields.len() != 1 => {
                return Err(SqlError::malformed(
                    path,
                    format!("'not' requires exactly one entry in 'fields', got {}", self.fields.len()),
                ));
            }
            _ => {}
        }

        let is_logical = matches!(shape, Shape::Group | Shape::Single);
        let present = [
            ("column", self.column.is_some(), !is_logical),
            ("value", self.value.is_some(), shape == Shape::Compare),
            ("values", self.values.is_some(), shape == Shape::List),
            ("from", self.from.is_some(), shape == Shape::Range),
            ("to", self.to.is_some(), shape == Shape::Range),
            ("fields", !self.fields.is_empty(), is_logical),
        ];
        for (field, is_set, allowed) in present {
            if is_set && !allowed {
                return Err(SqlError::malformed(
                    path,
                    format!("unexpected field '{field}' for type '{}'", self.kind),
                ));
            }
        }
        Ok(())
    }

    fn column(&self, path: &str) -> SqlResult<&str> {
        match self.column.as_deref() {
            Some(column) if !column.trim().is_empty() => Ok(column),
            _ => Err(SqlError::malformed(
                path,
                format!("'{}' requires a non-empty 'column'", self.kind),
            )),
        }
    }
}

fn required<'a>(field: &'a Option<Json>, name: &str, path: &str) -> SqlResult<&'a Json> {
    field
        .as_ref()
        .ok_or_else(|| SqlError::malformed(path, format!("missing required field '{name}'")))
}

/// Translate a filter document into an expression.
pub fn translate_filter(filter: &Filter) -> SqlResult<Option<Expr>> {
    filter.to_expr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::dialect::Dialect;
    use serde_json::json;

    fn render(filter: &Filter) -> (String, Vec<Value>) {
        filter
            .to_expr()
            .unwrap()
            .expect("filter should not be empty")
            .to_sql(&Dialect::default())
    }

    fn malformed_path(filter: &Filter) -> String {
        match filter.to_expr() {
            Err(SqlError::MalformedFilter { path, .. }) => path,
            other => panic!("expected malformed filter, got {other:?}"),
        }
    }

    #[test]
    fn between_document() {
        let filter = Filter::from_json(
            r#"{"type":"between","column":"created_at","from":"2024-01-01","to":"2024-12-31"}"#,
        )
        .unwrap();
        let (sql, params) = render(&filter);
        assert_eq!(sql, "(`created_at` >= ? AND `created_at` <= ?)");
        assert_eq!(params, args!["2024-01-01", "2024-12-31"]);
    }

    #[test]
    fn every_comparison_type() {
        let cases = [
            (Filter::eq("a", 1), "`a` = ?"),
            (Filter::ne("a", 1), "`a` != ?"),
            (Filter::lt("a", 1), "`a` < ?"),
            (Filter::lte("a", 1), "`a` <= ?"),
            (Filter::gt("a", 1), "`a` > ?"),
            (Filter::gte("a", 1), "`a` >= ?"),
            (Filter::like("a", "x%"), "`a` LIKE ?"),
            (Filter::not_like("a", "x%"), "NOT (`a` LIKE ?)"),
            (Filter::in_list("a", [1, 2]), "`a` IN (?, ?)"),
            (Filter::not_in("a", [1]), "`a` NOT IN (?)"),
            (Filter::is_null("a"), "`a` IS NULL"),
            (Filter::is_not_null("a"), "`a` IS NOT NULL"),
        ];
        for (filter, expected) in cases {
            assert_eq!(render(&filter).0, expected, "{filter:?}");
        }
    }

    #[test]
    fn nested_groups() {
        let filter = Filter::and([
            Filter::eq("status", "active"),
            Filter::or([Filter::gt("age", 18), Filter::not(Filter::is_null("email"))]),
        ]);
        let (sql, params) = render(&filter);
        assert_eq!(
            sql,
            "(`status` = ? AND (`age` > ? OR NOT (`email` IS NULL)))"
        );
        assert_eq!(params, args!["active", 18]);
    }

    #[test]
    fn untyped_node_is_no_filter() {
        assert_eq!(Filter::none().to_expr().unwrap(), None);
        assert_eq!(Filter::from_json("{}").unwrap().to_expr().unwrap(), None);
    }

    #[test]
    fn untyped_children_propagate_as_absent() {
        let filter = Filter::and([Filter::none(), Filter::eq("a", 1), Filter::none()]);
        assert_eq!(render(&filter).0, "`a` = ?");

        let all_empty = Filter::or([Filter::none(), Filter::and([Filter::none()])]);
        assert_eq!(all_empty.to_expr().unwrap(), None);
        assert_eq!(Filter::not(Filter::none()).to_expr().unwrap(), None);
    }

    #[test]
    fn json_values_keep_their_type() {
        let filter = Filter::from_json(
            r#"{"type":"in","column":"id","values":[1,"two",true,null,2.5]}"#,
        )
        .unwrap();
        let (_, params) = render(&filter);
        assert_eq!(
            params,
            vec![
                Value::Int(1),
                Value::Text("two".into()),
                Value::Bool(true),
                Value::Null,
                Value::Float(2.5),
            ]
        );
    }

    #[test]
    fn reports_missing_fields() {
        assert_eq!(malformed_path(&Filter { column: None, ..Filter::eq("a", 1) }), "$");
        assert_eq!(malformed_path(&Filter { value: None, ..Filter::eq("a", 1) }), "$");
        assert_eq!(malformed_path(&Filter { to: None, ..Filter::between("a", 1, 2) }), "$");
        assert_eq!(malformed_path(&Filter::in_list("a", Vec::<i64>::new())), "$");
        assert_eq!(malformed_path(&Filter::and([])), "$");
    }

    #[test]
    fn reports_child_count_for_not() {
        let filter = Filter {
            fields: vec![Filter::eq("a", 1), Filter::eq("b", 2)],
            ..Filter::node("not")
        };
        let err = filter.to_expr().unwrap_err();
        assert!(err.to_string().contains("exactly one"), "{err}");
    }

    #[test]
    fn reports_nested_path() {
        let filter = Filter::and([
            Filter::eq("a", 1),
            Filter::or([Filter::is_null("b"), Filter::node("between")]),
        ]);
        assert_eq!(malformed_path(&filter), "$.fields[1].fields[1]");
    }

    #[test]
    fn rejects_unknown_type_and_foreign_fields() {
        let err = Filter::from_json(r#"{"type":"regex","column":"a","value":"x"}"#)
            .unwrap()
            .to_expr()
            .unwrap_err();
        assert!(err.is_malformed_filter());
        assert!(err.to_string().contains("unknown filter type 'regex'"));

        let mixed = Filter {
            values: Some(vec![json!(1)]),
            ..Filter::eq("a", 1)
        };
        assert!(mixed.to_expr().is_err());
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(Filter::from_json("{not json").unwrap_err().is_malformed_filter());
    }

    #[test]
    fn serialization_round_trip_translates_identically() {
        let filters = [
            Filter::between("created_at", "2024-01-01", "2024-12-31"),
            Filter::and([
                Filter::eq("status", "active"),
                Filter::none(),
                Filter::or([Filter::in_list("role", ["a", "b"]), Filter::not_like("name", "%bot")]),
            ]),
            Filter::not(Filter::is_not_null("deleted_at")),
            Filter::lte("score", 9.5),
        ];
        for filter in filters {
            let text = filter.to_json().unwrap();
            let back = Filter::from_json(&text).unwrap();
            assert_eq!(back.to_expr().unwrap(), filter.to_expr().unwrap(), "{text}");
        }
    }

    #[test]
    fn null_values_survive_round_trip() {
        let filters = [
            Filter::eq("deleted_at", Json::Null),
            Filter::between("score", Json::Null, Json::Null),
            Filter::in_list("id", [Json::Null, json!(1)]),
        ];
        for filter in filters {
            let text = filter.to_json().unwrap();
            let back = Filter::from_json(&text).unwrap();
            assert_eq!(back, filter, "{text}");
            assert_eq!(back.to_expr().unwrap(), filter.to_expr().unwrap(), "{text}");
        }
        assert_eq!(
            Filter::eq("deleted_at", Json::Null).to_json().unwrap(),
            r#"{"type":"eq","column":"deleted_at","value":null}"#
        );
    }

    #[test]
    fn null_in_document_is_a_value() {
        let filter =
            Filter::from_json(r#"{"type":"eq","column":"deleted_at","value":null}"#).unwrap();
        let (sql, params) = render(&filter);
        assert_eq!(sql, "`deleted_at` = ?");
        assert_eq!(params, vec![Value::Null]);

        let filter =
            Filter::from_json(r#"{"type":"between","column":"n","from":null,"to":5}"#).unwrap();
        assert_eq!(render(&filter).1, vec![Value::Null, Value::Int(5)]);

        // An absent key is still reported.
        let filter = Filter::from_json(r#"{"type":"eq","column":"deleted_at"}"#).unwrap();
        let err = filter.to_expr().unwrap_err();
        assert!(err.to_string().contains("missing required field 'value'"), "{err}");
    }

    #[test]
    fn omits_unset_fields_when_serialized() {
        let text = Filter::is_null("a").to_json().unwrap();
        assert_eq!(text, r#"{"type":"is_null","column":"a"}"#);
    }
}
