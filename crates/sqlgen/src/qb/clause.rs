//! Clause composers shared by the statement builders.
//!
//! WHERE/HAVING accept any [`Condition`] and AND the inputs together in call
//! order. GROUP BY/ORDER BY take a [`ColumnClause`] that replaces the previous
//! one on every call.

use std::collections::BTreeMap;

use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::qb::expr::Expr;
use crate::qb::filter::Filter;
use crate::qb::param::{ParamList, count_markers};
use crate::qb::parse::parse_condition;
use crate::value::Value;

/// Equality shorthand: `column = value` for every entry, ANDed.
///
/// Keys are kept sorted so the rendered order never depends on insertion
/// order. One key renders bare; several render as a parenthesized group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EqMap(BTreeMap<String, Value>);

impl EqMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one entry.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expression form; `None` when the map is empty.
    pub fn to_expr(&self) -> Option<Expr> {
        let mut items: Vec<Expr> = self
            .0
            .iter()
            .map(|(column, value)| Expr::eq(column.as_str(), value.clone()))
            .collect();
        match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Expr::And(items)),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for EqMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, Value>> for EqMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

/// Input accepted by WHERE and HAVING.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Verbatim SQL with `?` markers and their values.
    Raw { sql: String, params: Vec<Value> },
    /// Expression tree.
    Expr(Expr),
    /// Equality shorthand.
    Eq(EqMap),
    /// Free text, parsed into an expression when added.
    Text(String),
    /// Filter document, translated when added.
    Filter(Filter),
}

impl Condition {
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Condition::Raw {
            sql: sql.into(),
            params,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Condition::Text(text.into())
    }

    /// Resolve to an expression. `Ok(None)` is a no-op input.
    ///
    /// Validation errors are prefixed with the clause name.
    pub fn resolve(self, clause: &str) -> SqlResult<Option<Expr>> {
        let expr = match self {
            Condition::Raw { sql, params } => {
                if sql.trim().is_empty() {
                    if !params.is_empty() {
                        return Err(SqlError::validation(format!(
                            "{clause}: empty fragment given {} value(s)",
                            params.len()
                        )));
                    }
                    return Ok(None);
                }
                Some(Expr::Raw { sql, params })
            }
            Condition::Expr(expr) => Some(expr),
            Condition::Eq(map) => map.to_expr(),
            Condition::Text(text) => Some(parse_condition(&text)?),
            Condition::Filter(filter) => filter.to_expr()?,
        };
        match expr {
            Some(expr) if !expr.is_empty() => {
                expr.validate().map_err(|e| in_clause(clause, e))?;
                Ok(Some(expr))
            }
            _ => Ok(None),
        }
    }
}

fn in_clause(clause: &str, err: SqlError) -> SqlError {
    match err {
        SqlError::Validation(msg) => SqlError::Validation(format!("{clause}: {msg}")),
        other => other,
    }
}

impl From<Expr> for Condition {
    fn from(expr: Expr) -> Self {
        Condition::Expr(expr)
    }
}

impl From<EqMap> for Condition {
    fn from(map: EqMap) -> Self {
        Condition::Eq(map)
    }
}

impl From<Filter> for Condition {
    fn from(filter: Filter) -> Self {
        Condition::Filter(filter)
    }
}

impl From<&Filter> for Condition {
    fn from(filter: &Filter) -> Self {
        Condition::Filter(filter.clone())
    }
}

/// Raw SQL without parameters.
impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::raw(sql, Vec::new())
    }
}

impl From<(&str, Vec<Value>)> for Condition {
    fn from((sql, params): (&str, Vec<Value>)) -> Self {
        Condition::raw(sql, params)
    }
}

impl From<(String, Vec<Value>)> for Condition {
    fn from((sql, params): (String, Vec<Value>)) -> Self {
        Condition::raw(sql, params)
    }
}

/// AND-accumulator for WHERE/HAVING.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionList {
    exprs: Vec<Expr>,
}

impl ConditionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn push(&mut self, expr: Expr) {
        self.exprs.push(expr);
    }

    /// Render the conjunction without the keyword. A lone condition is
    /// emitted as-is; with several, raw fragments are parenthesized.
    pub fn build(&self, params: &mut ParamList) -> String {
        if let [only] = self.exprs.as_slice() {
            return only.build(params);
        }
        let parts: Vec<String> = self
            .exprs
            .iter()
            .map(|e| {
                let sql = e.build(params);
                if matches!(e, Expr::Raw { .. }) {
                    format!("({sql})")
                } else {
                    sql
                }
            })
            .filter(|s| !s.is_empty())
            .collect();
        parts.join(" AND ")
    }
}

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One column of a GROUP BY or ORDER BY list.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub column: Ident,
    pub direction: Option<Direction>,
}

impl OrderItem {
    pub fn asc(column: impl Into<Ident>) -> Self {
        Self {
            column: column.into(),
            direction: Some(Direction::Asc),
        }
    }

    pub fn desc(column: impl Into<Ident>) -> Self {
        Self {
            column: column.into(),
            direction: Some(Direction::Desc),
        }
    }
}

macro_rules! impl_order_item_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for OrderItem {
                fn from(column: $ty) -> Self {
                    Self {
                        column: column.into(),
                        direction: None,
                    }
                }
            }
        )*
    };
}

impl_order_item_from!(&str, String, &String, Ident);

/// GROUP BY / ORDER BY content.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnClause {
    /// Quoted column list.
    Columns(Vec<OrderItem>),
    /// Verbatim SQL with `?` markers.
    Raw { sql: String, params: Vec<Value> },
    /// Expression, optionally with a direction.
    Expr(Expr, Option<Direction>),
}

impl ColumnClause {
    pub fn columns<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OrderItem>,
    {
        ColumnClause::Columns(items.into_iter().map(Into::into).collect())
    }

    /// Check identifiers and placeholder counts.
    pub fn validate(&self, clause: &str) -> SqlResult<()> {
        match self {
            ColumnClause::Columns(items) => items
                .iter()
                .try_for_each(|item| item.column.validate())
                .map_err(|e| in_clause(clause, e)),
            ColumnClause::Raw { sql, params } => {
                let markers = count_markers(sql);
                if markers != params.len() {
                    return Err(SqlError::validation(format!(
                        "{clause}: raw fragment '{sql}' has {markers} placeholder(s) but {} value(s)",
                        params.len()
                    )));
                }
                Ok(())
            }
            ColumnClause::Expr(expr, _) => expr.validate().map_err(|e| in_clause(clause, e)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ColumnClause::Columns(items) => items.is_empty(),
            ColumnClause::Raw { sql, .. } => sql.trim().is_empty(),
            ColumnClause::Expr(expr, _) => expr.is_empty(),
        }
    }

    /// Render the list without the keyword.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            ColumnClause::Columns(items) => items
                .iter()
                .map(|item| {
                    let col = params.quote(&item.column);
                    match item.direction {
                        Some(dir) => format!("{col} {}", dir.as_sql()),
                        None => col,
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
            ColumnClause::Raw { sql, params: values } => params.write_template(sql, values),
            ColumnClause::Expr(expr, direction) => {
                let sql = expr.build(params);
                match direction {
                    Some(dir) => format!("{sql} {}", dir.as_sql()),
                    None => sql,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::dialect::Dialect;

    fn build_list(list: &ConditionList) -> (String, Vec<Value>) {
        let mut params = ParamList::new(Dialect::default());
        let sql = list.build(&mut params);
        (sql, params.into_values())
    }

    #[test]
    fn eq_map_sorts_keys() {
        let map = EqMap::new().with("status", "active").with("role", "admin");
        let (sql, params) = map.to_expr().unwrap().to_sql(&Dialect::default());
        assert_eq!(sql, "(`role` = ? AND `status` = ?)");
        assert_eq!(params, args!["admin", "active"]);
    }

    #[test]
    fn eq_map_single_key_is_bare() {
        let map: EqMap = [("id", 7)].into_iter().collect();
        let (sql, _) = map.to_expr().unwrap().to_sql(&Dialect::default());
        assert_eq!(sql, "`id` = ?");
        assert_eq!(EqMap::new().to_expr(), None);
    }

    #[test]
    fn conditions_and_in_call_order() {
        let mut list = ConditionList::new();
        for cond in [
            Condition::raw("status = ?", args!["active"]),
            Condition::from(Expr::gt("age", 18)),
            Condition::raw("a = ? OR b = ?", args![1, 2]),
        ] {
            list.push(cond.resolve("WHERE").unwrap().unwrap());
        }
        let (sql, params) = build_list(&list);
        assert_eq!(sql, "(status = ?) AND `age` > ? AND (a = ? OR b = ?)");
        assert_eq!(params, args!["active", 18, 1, 2]);
    }

    #[test]
    fn single_raw_condition_is_verbatim() {
        let mut list = ConditionList::new();
        list.push(Condition::raw("status = ?", args!["active"]).resolve("WHERE").unwrap().unwrap());
        assert_eq!(build_list(&list).0, "status = ?");
    }

    #[test]
    fn resolve_reports_clause_on_marker_mismatch() {
        let err = Condition::raw("a = ? AND b = ?", args![1])
            .resolve("HAVING")
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("HAVING"), "{err}");
    }

    #[test]
    fn resolve_no_ops() {
        assert_eq!(Condition::from("").resolve("WHERE").unwrap(), None);
        assert_eq!(Condition::from(EqMap::new()).resolve("WHERE").unwrap(), None);
        assert_eq!(Condition::from(Filter::none()).resolve("WHERE").unwrap(), None);
        assert_eq!(
            Condition::from(Expr::and([None::<Expr>])).resolve("WHERE").unwrap(),
            None
        );
    }

    #[test]
    fn resolve_text_and_filter() {
        let expr = Condition::text("a = 'x'").resolve("WHERE").unwrap().unwrap();
        assert_eq!(expr, Expr::eq("a", "x"));
        assert!(Condition::text("a = 1; --").resolve("WHERE").unwrap_err().is_syntax());
        let expr = Condition::from(Filter::eq("a", "x")).resolve("WHERE").unwrap();
        assert_eq!(expr, Some(Expr::eq("a", "x")));
    }

    #[test]
    fn column_clause_renders() {
        let mut params = ParamList::new(Dialect::default());
        let clause = ColumnClause::columns([OrderItem::desc("created_at"), OrderItem::from("id")]);
        assert_eq!(clause.build(&mut params), "`created_at` DESC, `id`");

        let clause = ColumnClause::Expr(Expr::eq("status", "vip"), Some(Direction::Desc));
        assert_eq!(clause.build(&mut params), "`status` = ? DESC");
        assert_eq!(params.values(), &args!["vip"]);
    }

    #[test]
    fn column_clause_validation() {
        let raw = ColumnClause::Raw {
            sql: "FIELD(id, ?, ?)".into(),
            params: args![1],
        };
        assert!(raw.validate("ORDER BY").unwrap_err().to_string().contains("ORDER BY"));
        assert!(ColumnClause::columns([""]).validate("GROUP BY").is_err());
    }
}
