//! SELECT statement builder.

use crate::client::Executor;
use crate::config::BuilderConfig;
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::qb::clause::{ColumnClause, Condition, ConditionList, Direction, OrderItem};
use crate::qb::expr::Expr;
use crate::qb::filter::Filter;
use crate::qb::param::{ParamList, count_markers};
use crate::qb::traits::{BuiltQuery, Chain, SqlQb};
use crate::row::FromRow;
use crate::schema::{Schema, schema_columns};
use crate::value::Value;

#[derive(Clone, Debug, Default, PartialEq)]
enum Projection {
    #[default]
    All,
    Columns(Vec<Ident>),
    Raw(String),
}

/// SELECT builder.
///
/// WHERE and HAVING accumulate (AND-joined in call order); projection,
/// GROUP BY and ORDER BY are replaced on every call.
///
/// ```
/// use sqlgen::{args, qb};
/// use sqlgen::qb::SqlQb;
///
/// let q = qb::select_from("users")
///     .and_where(("status = ?", args!["active"]))
///     .limit(10)
///     .build()
///     .unwrap();
/// assert_eq!(q.sql, "SELECT * FROM `users` WHERE status = ? LIMIT ?");
/// assert_eq!(q.params, args!["active", 10]);
/// ```
#[derive(Clone, Debug)]
pub struct SelectQb {
    table: Ident,
    alias: Option<Ident>,
    config: BuilderConfig,
    distinct: bool,
    projection: Projection,
    where_list: ConditionList,
    group_by: Option<ColumnClause>,
    having_list: ConditionList,
    order_by: Option<ColumnClause>,
    limit: Option<i64>,
    offset: Option<i64>,
    build_error: Option<SqlError>,
}

impl Chain for SelectQb {
    fn error_slot(&self) -> &Option<SqlError> {
        &self.build_error
    }

    fn error_slot_mut(&mut self) -> &mut Option<SqlError> {
        &mut self.build_error
    }
}

impl SelectQb {
    /// Create a new SELECT builder for a table.
    pub fn new(table: &str) -> Self {
        let table = Ident::new(table);
        let build_error = table.validate().err().map(|e| prefixed("SELECT: table", e));
        Self {
            table,
            alias: None,
            config: BuilderConfig::default(),
            distinct: false,
            projection: Projection::All,
            where_list: ConditionList::new(),
            group_by: None,
            having_list: ConditionList::new(),
            order_by: None,
            limit: None,
            offset: None,
            build_error,
        }
    }

    // ==================== configuration ====================

    pub fn config(&self, config: BuilderConfig) -> Self {
        self.derive(|q| q.config = config)
    }

    pub fn dialect(&self, dialect: Dialect) -> Self {
        self.derive(|q| q.config.dialect = dialect)
    }

    /// Set the field-tag name used to infer the projection.
    pub fn tag(&self, tag: &str) -> Self {
        self.derive(|q| q.config.tag = tag.to_string())
    }

    // ==================== FROM / projection ====================

    /// Alias the table: `FROM t AS a`.
    pub fn alias(&self, alias: &str) -> Self {
        let alias = Ident::single(alias);
        self.try_derive(|q| {
            alias.validate().map_err(|e| prefixed("SELECT: alias", e))?;
            q.alias = Some(alias);
            Ok(())
        })
    }

    pub fn distinct(&self) -> Self {
        self.derive(|q| q.distinct = true)
    }

    /// Set the projected columns. Replaces any previous projection; an empty
    /// list means `*`.
    pub fn columns<I>(&self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        let columns: Vec<Ident> = columns.into_iter().map(Into::into).collect();
        self.try_derive(|q| {
            for column in &columns {
                column.validate().map_err(|e| prefixed("SELECT: column", e))?;
            }
            q.projection = if columns.is_empty() {
                Projection::All
            } else {
                Projection::Columns(columns)
            };
            Ok(())
        })
    }

    /// Set a verbatim projection such as `COUNT(*) AS n`.
    ///
    /// The projection takes no parameters, so `?` markers outside quotes are
    /// rejected.
    pub fn columns_raw(&self, sql: &str) -> Self {
        let sql = sql.trim().to_string();
        self.try_derive(|q| {
            if count_markers(&sql) != 0 {
                return Err(SqlError::validation(
                    "SELECT: raw projection cannot contain '?' markers",
                ));
            }
            q.projection = if sql.is_empty() {
                Projection::All
            } else {
                Projection::Raw(sql)
            };
            Ok(())
        })
    }

    // ==================== WHERE / HAVING ====================

    /// Add a WHERE condition, AND-joined with earlier ones.
    ///
    /// Accepts an [`Expr`], an [`EqMap`](crate::qb::EqMap), a raw
    /// `(sql, params)` pair, or a [`Filter`].
    pub fn and_where(&self, condition: impl Into<Condition>) -> Self {
        let condition = condition.into();
        self.try_derive(|q| {
            if let Some(expr) = condition.resolve("WHERE")? {
                q.where_list.push(expr);
            }
            Ok(())
        })
    }

    /// Parse `text` and add it as a WHERE condition.
    pub fn and_where_text(&self, text: &str) -> Self {
        self.and_where(Condition::text(text))
    }

    /// Translate a filter document and add it as a WHERE condition.
    pub fn and_where_filter(&self, filter: &Filter) -> Self {
        self.and_where(filter)
    }

    /// Add a HAVING condition, AND-joined with earlier ones.
    pub fn having(&self, condition: impl Into<Condition>) -> Self {
        let condition = condition.into();
        self.try_derive(|q| {
            if let Some(expr) = condition.resolve("HAVING")? {
                q.having_list.push(expr);
            }
            Ok(())
        })
    }

    /// Parse `text` and add it as a HAVING condition.
    pub fn having_text(&self, text: &str) -> Self {
        self.having(Condition::text(text))
    }

    // ==================== GROUP BY / ORDER BY ====================

    /// Set GROUP BY columns (replaces).
    pub fn group_by<I>(&self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OrderItem>,
    {
        self.set_group_by(ColumnClause::columns(columns))
    }

    /// Set a verbatim GROUP BY with `?` markers (replaces).
    pub fn group_by_raw(&self, sql: &str, params: Vec<Value>) -> Self {
        self.set_group_by(ColumnClause::Raw {
            sql: sql.to_string(),
            params,
        })
    }

    /// Group by an expression (replaces).
    pub fn group_by_expr(&self, expr: Expr) -> Self {
        self.set_group_by(ColumnClause::Expr(expr, None))
    }

    fn set_group_by(&self, clause: ColumnClause) -> Self {
        self.try_derive(|q| {
            clause.validate("GROUP BY")?;
            q.group_by = (!clause.is_empty()).then_some(clause);
            Ok(())
        })
    }

    /// Set ORDER BY items (replaces).
    ///
    /// Plain names sort in the database default direction; use
    /// [`OrderItem::asc`] / [`OrderItem::desc`] to be explicit.
    pub fn order_by<I>(&self, items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OrderItem>,
    {
        self.set_order_by(ColumnClause::columns(items))
    }

    /// Set a verbatim ORDER BY with `?` markers (replaces).
    pub fn order_by_raw(&self, sql: &str, params: Vec<Value>) -> Self {
        self.set_order_by(ColumnClause::Raw {
            sql: sql.to_string(),
            params,
        })
    }

    /// Order by an expression (replaces).
    pub fn order_by_expr(&self, expr: Expr, direction: Direction) -> Self {
        self.set_order_by(ColumnClause::Expr(expr, Some(direction)))
    }

    fn set_order_by(&self, clause: ColumnClause) -> Self {
        self.try_derive(|q| {
            clause.validate("ORDER BY")?;
            q.order_by = (!clause.is_empty()).then_some(clause);
            Ok(())
        })
    }

    // ==================== pagination ====================

    /// Set LIMIT (bound as a parameter).
    pub fn limit(&self, n: i64) -> Self {
        self.try_derive(|q| {
            q.limit = Some(non_negative("LIMIT", n)?);
            Ok(())
        })
    }

    /// Set OFFSET (bound as a parameter).
    pub fn offset(&self, n: i64) -> Self {
        self.try_derive(|q| {
            q.offset = Some(non_negative("OFFSET", n)?);
            Ok(())
        })
    }

    /// Set LIMIT and OFFSET for a 1-based page.
    pub fn paginate(&self, page: i64, per_page: i64) -> Self {
        self.try_derive(|q| {
            if page < 1 {
                return Err(SqlError::validation(format!(
                    "SELECT: page must be at least 1, got {page}"
                )));
            }
            if per_page < 1 {
                return Err(SqlError::validation(format!(
                    "SELECT: per_page must be at least 1, got {per_page}"
                )));
            }
            q.limit = Some(per_page);
            q.offset = Some((page - 1).saturating_mul(per_page));
            Ok(())
        })
    }

    // ==================== compilation ====================

    fn render(&self, projection: &Projection) -> SqlResult<BuiltQuery> {
        self.check_error()?;
        let quote = self.config.dialect.quote;
        let mut params = ParamList::new(self.config.dialect.clone());
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        match projection {
            Projection::All => sql.push('*'),
            Projection::Raw(raw) => sql.push_str(raw),
            Projection::Columns(columns) => {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    column.write_sql(quote, &mut sql);
                }
            }
        }
        sql.push_str(" FROM ");
        self.table.write_sql(quote, &mut sql);
        if let Some(alias) = &self.alias {
            sql.push_str(" AS ");
            alias.write_sql(quote, &mut sql);
        }

        push_clause(&mut sql, " WHERE ", self.where_list.build(&mut params));
        if let Some(group_by) = &self.group_by {
            push_clause(&mut sql, " GROUP BY ", group_by.build(&mut params));
        }
        push_clause(&mut sql, " HAVING ", self.having_list.build(&mut params));
        if let Some(order_by) = &self.order_by {
            push_clause(&mut sql, " ORDER BY ", order_by.build(&mut params));
        }
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(&params.bind(Value::Int(limit)));
        }
        if let Some(offset) = self.offset {
            sql.push_str(" OFFSET ");
            sql.push_str(&params.bind(Value::Int(offset)));
        }

        Ok(BuiltQuery {
            sql,
            params: params.into_values(),
        })
    }

    /// Compile, inferring the projection from `T`'s column mapping when no
    /// columns were set.
    pub fn build_for<T: Schema>(&self) -> SqlResult<BuiltQuery> {
        self.check_error()?;
        match self.projection {
            Projection::All => {
                let columns = schema_columns::<T>(&self.config.tag)?
                    .into_iter()
                    .map(Ident::single)
                    .collect();
                self.render(&Projection::Columns(columns))
            }
            _ => self.build(),
        }
    }

    /// Statements sent to `conn` use its placeholder style.
    fn for_executor(&self, conn: &impl Executor) -> Self {
        let placeholder = conn.placeholder();
        self.derive(|q| q.config.dialect.placeholder = placeholder)
    }

    /// Execute and decode exactly one row.
    ///
    /// Zero rows is [`SqlError::NotFound`]; more than one is
    /// [`SqlError::TooManyRows`].
    pub async fn fetch_one<T>(&self, conn: &impl Executor) -> SqlResult<T>
    where
        T: FromRow + Schema + Send,
    {
        let q = self.for_executor(conn).build_for::<T>()?;
        tracing::trace!(target: "sqlgen", sql = %q.sql, params = q.params.len(), "select one");
        conn.get(&q.sql, &q.params).await
    }

    /// Execute and decode every row, in order.
    pub async fn fetch_all<T>(&self, conn: &impl Executor) -> SqlResult<Vec<T>>
    where
        T: FromRow + Schema + Send,
    {
        let q = self.for_executor(conn).build_for::<T>()?;
        tracing::trace!(target: "sqlgen", sql = %q.sql, params = q.params.len(), "select all");
        conn.select(&q.sql, &q.params).await
    }
}

impl SqlQb for SelectQb {
    fn build(&self) -> SqlResult<BuiltQuery> {
        self.render(&self.projection)
    }

    fn build_error(&self) -> Option<&SqlError> {
        self.build_error.as_ref()
    }
}

fn push_clause(sql: &mut String, keyword: &str, body: String) {
    if !body.is_empty() {
        sql.push_str(keyword);
        sql.push_str(&body);
    }
}

fn non_negative(clause: &str, n: i64) -> SqlResult<i64> {
    if n < 0 {
        return Err(SqlError::validation(format!(
            "SELECT: {clause} must be non-negative, got {n}"
        )));
    }
    Ok(n)
}

fn prefixed(context: &str, err: SqlError) -> SqlError {
    match err {
        SqlError::Validation(msg) => SqlError::Validation(format!("{context}: {msg}")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::dialect::Placeholder;
    use crate::qb::clause::EqMap;

    struct Account;

    impl Schema for Account {
        fn columns(tag: &str) -> Option<Vec<String>> {
            (tag == "db").then(|| vec!["id".to_string(), "email".to_string()])
        }
    }

    #[test]
    fn where_raw_and_limit() {
        let q = SelectQb::new("users")
            .and_where(("status = ?", args!["active"]))
            .limit(10)
            .build()
            .unwrap();
        assert_eq!(q.sql, "SELECT * FROM `users` WHERE status = ? LIMIT ?");
        assert_eq!(q.params, args!["active", 10]);
    }

    #[test]
    fn eq_map_sorts_keys() {
        let q = SelectQb::new("users")
            .and_where(EqMap::new().with("status", "active").with("role", "admin"))
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT * FROM `users` WHERE (`role` = ? AND `status` = ?)"
        );
        assert_eq!(q.params, args!["admin", "active"]);
    }

    #[test]
    fn full_statement_numbers_placeholders_in_order() {
        let q = SelectQb::new("orders")
            .dialect(Dialect::postgres())
            .alias("o")
            .distinct()
            .columns(["o.user_id"])
            .columns_raw("user_id, SUM(total) AS spent")
            .and_where(Expr::gte("created_at", "2024-01-01"))
            .and_where_text("status = 'paid'")
            .group_by(["user_id"])
            .having(("SUM(total) > ?", args![100]))
            .order_by([OrderItem::desc("spent")])
            .limit(5)
            .offset(10)
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT DISTINCT user_id, SUM(total) AS spent FROM \"orders\" AS \"o\" \
             WHERE \"created_at\" >= $1 AND \"status\" = $2 GROUP BY \"user_id\" \
             HAVING SUM(total) > $3 ORDER BY \"spent\" DESC LIMIT $4 OFFSET $5"
        );
        assert_eq!(q.params, args!["2024-01-01", "paid", 100, 5, 10]);
    }

    #[test]
    fn raw_fragments_are_parenthesized_when_joined() {
        let q = SelectQb::new("t")
            .and_where(("a = ? OR b = ?", args![1, 2]))
            .and_where(Expr::eq("c", 3))
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT * FROM `t` WHERE (a = ? OR b = ?) AND `c` = ?"
        );
    }

    #[test]
    fn group_and_order_replace() {
        let q = SelectQb::new("t")
            .group_by(["a"])
            .group_by(["b"])
            .order_by(["a"])
            .order_by_raw("FIELD(id, ?, ?)", args![3, 1])
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT * FROM `t` GROUP BY `b` ORDER BY FIELD(id, ?, ?)"
        );
        assert_eq!(q.params, args![3, 1]);

        let q = SelectQb::new("t")
            .order_by(["a"])
            .order_by(Vec::<&str>::new())
            .build()
            .unwrap();
        assert_eq!(q.sql, "SELECT * FROM `t`");
    }

    #[test]
    fn order_by_expr_keeps_params() {
        let q = SelectQb::new("t")
            .order_by_expr(Expr::eq("id", 7), Direction::Desc)
            .build()
            .unwrap();
        assert_eq!(q.sql, "SELECT * FROM `t` ORDER BY `id` = ? DESC");
        assert_eq!(q.params, args![7]);
    }

    #[test]
    fn raw_marker_mismatch_names_clause() {
        let err = SelectQb::new("t")
            .and_where(("a = ? AND b = ?", args![1]))
            .build()
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("WHERE"), "{err}");

        let err = SelectQb::new("t")
            .order_by_raw("FIELD(id, ?)", args![])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ORDER BY"), "{err}");
    }

    #[test]
    fn raw_projection_rejects_markers() {
        let err = SelectQb::new("t")
            .columns_raw("COALESCE(a, ?) AS a")
            .build()
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("projection"), "{err}");

        let q = SelectQb::new("t")
            .columns_raw("COUNT(*) AS n, 'why?' AS q")
            .build()
            .unwrap();
        assert_eq!(q.sql, "SELECT COUNT(*) AS n, 'why?' AS q FROM `t`");
        assert!(q.params.is_empty());
    }

    #[test]
    fn text_syntax_error_is_sticky() {
        let base = SelectQb::new("t").and_where_text("id = 1; DROP TABLE t");
        assert!(base.build_error().is_some_and(SqlError::is_syntax));
        let later = base.and_where(Expr::eq("a", 1)).limit(1);
        assert!(later.build().unwrap_err().is_syntax());
    }

    #[test]
    fn untyped_filter_is_no_op() {
        let q = SelectQb::new("t")
            .and_where_filter(&Filter::none())
            .build()
            .unwrap();
        assert_eq!(q.sql, "SELECT * FROM `t`");
    }

    #[test]
    fn negative_limit_is_rejected() {
        assert!(SelectQb::new("t").limit(-1).build().unwrap_err().is_validation());
        assert!(SelectQb::new("t").paginate(0, 10).build().is_err());
    }

    #[test]
    fn paginate_sets_limit_and_offset() {
        let q = SelectQb::new("t").paginate(3, 20).build().unwrap();
        assert_eq!(q.sql, "SELECT * FROM `t` LIMIT ? OFFSET ?");
        assert_eq!(q.params, args![20, 40]);
    }

    #[test]
    fn build_for_infers_projection() {
        let q = SelectQb::new("accounts").build_for::<Account>().unwrap();
        assert_eq!(q.sql, "SELECT `id`, `email` FROM `accounts`");

        let q = SelectQb::new("accounts")
            .columns(["id"])
            .build_for::<Account>()
            .unwrap();
        assert_eq!(q.sql, "SELECT `id` FROM `accounts`");

        let err = SelectQb::new("accounts")
            .tag("json")
            .build_for::<Account>()
            .unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn template_is_not_mutated() {
        let base = SelectQb::new("t").and_where(Expr::eq("a", 1));
        let one = base.and_where(Expr::eq("b", 2));
        let two = base.limit(1);
        assert_eq!(base.to_sql().unwrap(), "SELECT * FROM `t` WHERE `a` = ?");
        assert_eq!(one.to_sql().unwrap(), "SELECT * FROM `t` WHERE `a` = ? AND `b` = ?");
        assert_eq!(two.to_sql().unwrap(), "SELECT * FROM `t` WHERE `a` = ? LIMIT ?");
    }

    #[test]
    fn custom_placeholder() {
        let q = SelectQb::new("t")
            .dialect(Dialect::default().with_placeholder(Placeholder::AtP))
            .and_where(Expr::in_list("id", [1, 2]))
            .build()
            .unwrap();
        assert_eq!(q.sql, "SELECT * FROM `t` WHERE `id` IN (@p1, @p2)");
    }
}
