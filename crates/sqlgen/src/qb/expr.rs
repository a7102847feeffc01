//! Expression layer for WHERE/HAVING conditions.
//!
//! An [`Expr`] is a predicate tree. Rendering walks the tree depth-first and
//! never inlines a value: every literal becomes one placeholder plus one
//! parameter, in the same left-to-right order.
//!
//! - comparisons render as `<quoted column> <op> <placeholder>`
//! - `IN`/`NOT IN` render one placeholder per value
//! - `BETWEEN` is `col >= from AND col <= to`
//! - `AND(a, b)` renders as `(a AND b)`, `NOT(a)` as `NOT (a)`
//! - absent or empty children of a combinator are dropped

use std::fmt;

use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::qb::param::{ParamList, count_markers};
use crate::value::Value;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Like => "LIKE",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One side of a comparison: a column reference or a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(Ident),
    Value(Value),
}

impl Operand {
    pub fn column(name: impl Into<Ident>) -> Self {
        Operand::Column(name.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Operand::Value(value.into())
    }

    fn build(&self, params: &mut ParamList) -> String {
        match self {
            Operand::Column(ident) => params.quote(ident),
            Operand::Value(v) => params.bind(v.clone()),
        }
    }
}

/// Expression node for building WHERE/HAVING clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// AND group: all conditions must be true.
    And(Vec<Expr>),

    /// OR group: at least one condition must be true.
    Or(Vec<Expr>),

    /// NOT: negate the inner expression.
    Not(Box<Expr>),

    /// Binary comparison: `left op right`.
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },

    /// NULL check: `column IS NULL` or `column IS NOT NULL`.
    NullCheck { column: Ident, negated: bool },

    /// IN list: `column IN (?, ?, ...)` or `column NOT IN (...)`.
    InList {
        column: Ident,
        values: Vec<Value>,
        negated: bool,
    },

    /// Verbatim SQL with `?` markers bound to `params` in order.
    Raw { sql: String, params: Vec<Value> },
}

impl Expr {
    /// Create an AND expression. `None` items are dropped.
    pub fn and<I>(exprs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<Expr>>,
    {
        Expr::And(exprs.into_iter().filter_map(Into::into).collect())
    }

    /// Create an OR expression. `None` items are dropped.
    pub fn or<I>(exprs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<Expr>>,
    {
        Expr::Or(exprs.into_iter().filter_map(Into::into).collect())
    }

    /// Create a NOT expression.
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// Generic comparison between two operands.
    pub fn compare(left: Operand, op: CmpOp, right: Operand) -> Self {
        Expr::Compare { left, op, right }
    }

    fn column_cmp(column: impl Into<Ident>, op: CmpOp, value: impl Into<Value>) -> Self {
        Expr::Compare {
            left: Operand::Column(column.into()),
            op,
            right: Operand::Value(value.into()),
        }
    }

    /// Create an equality condition: column = value
    pub fn eq(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::column_cmp(column, CmpOp::Eq, value)
    }

    /// Create an inequality condition: column != value
    pub fn ne(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::column_cmp(column, CmpOp::Ne, value)
    }

    /// Create a less-than condition: column < value
    pub fn lt(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::column_cmp(column, CmpOp::Lt, value)
    }

    /// Create a less-than-or-equal condition: column <= value
    pub fn lte(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::column_cmp(column, CmpOp::Lte, value)
    }

    /// Create a greater-than condition: column > value
    pub fn gt(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::column_cmp(column, CmpOp::Gt, value)
    }

    /// Create a greater-than-or-equal condition: column >= value
    pub fn gte(column: impl Into<Ident>, value: impl Into<Value>) -> Self {
        Self::column_cmp(column, CmpOp::Gte, value)
    }

    /// Create a LIKE condition: column LIKE pattern
    pub fn like(column: impl Into<Ident>, pattern: impl Into<Value>) -> Self {
        Self::column_cmp(column, CmpOp::Like, pattern)
    }

    /// Create a NOT LIKE condition, rendered as `NOT (column LIKE ?)`.
    pub fn not_like(column: impl Into<Ident>, pattern: impl Into<Value>) -> Self {
        Expr::not(Self::like(column, pattern))
    }

    /// Create an IS NULL condition: column IS NULL
    pub fn is_null(column: impl Into<Ident>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            negated: false,
        }
    }

    /// Create an IS NOT NULL condition: column IS NOT NULL
    pub fn is_not_null(column: impl Into<Ident>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            negated: true,
        }
    }

    /// Create an IN condition. An empty list never matches.
    pub fn in_list<I>(column: impl Into<Ident>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Expr::raw("1=0", Vec::new());
        }
        Expr::InList {
            column: column.into(),
            values,
            negated: false,
        }
    }

    /// Create a NOT IN condition. An empty list always matches.
    pub fn not_in<I>(column: impl Into<Ident>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Expr::raw("1=1", Vec::new());
        }
        Expr::InList {
            column: column.into(),
            values,
            negated: true,
        }
    }

    /// Create a range condition: `(column >= from AND column <= to)`.
    pub fn between(
        column: impl Into<Ident>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        let column = column.into();
        Expr::And(vec![
            Self::gte(column.clone(), from),
            Self::lte(column, to),
        ])
    }

    /// Create a raw SQL fragment with `?` markers.
    ///
    /// The text is inserted verbatim; only `params` are bound.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Expr::Raw {
            sql: sql.into(),
            params,
        }
    }

    /// Check if this expression renders to nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(Expr::is_empty),
            Expr::Not(inner) => inner.is_empty(),
            Expr::Raw { sql, .. } => sql.trim().is_empty(),
            _ => false,
        }
    }

    /// Check that every raw fragment has exactly as many `?` markers as values.
    pub fn validate(&self) -> SqlResult<()> {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().try_for_each(Expr::validate),
            Expr::Not(inner) => inner.validate(),
            Expr::Raw { sql, params } => {
                let markers = count_markers(sql);
                if markers != params.len() {
                    return Err(SqlError::validation(format!(
                        "raw fragment '{sql}' has {markers} placeholder(s) but {} value(s)",
                        params.len()
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Build the SQL fragment, collecting parameters into `params`.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Expr::And(exprs) => build_group(exprs, " AND ", params),
            Expr::Or(exprs) => build_group(exprs, " OR ", params),
            Expr::Not(inner) => {
                let sql = inner.build(params);
                if sql.is_empty() {
                    String::new()
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expr::Compare { left, op, right } => {
                let l = left.build(params);
                let r = right.build(params);
                format!("{l} {op} {r}")
            }
            Expr::NullCheck { column, negated } => {
                let col = params.quote(column);
                if *negated {
                    format!("{col} IS NOT NULL")
                } else {
                    format!("{col} IS NULL")
                }
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                let col = params.quote(column);
                let placeholders: Vec<String> =
                    values.iter().map(|v| params.bind(v.clone())).collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{col} {op} ({})", placeholders.join(", "))
            }
            Expr::Raw { sql, params: values } => params.write_template(sql, values),
        }
    }

    /// Render as a standalone `(text, params)` pair.
    pub fn to_sql(&self, dialect: &Dialect) -> (String, Vec<Value>) {
        let mut params = ParamList::new(dialect.clone());
        let sql = self.build(&mut params);
        (sql, params.into_values())
    }
}

fn build_group(exprs: &[Expr], sep: &str, params: &mut ParamList) -> String {
    let parts: Vec<String> = exprs
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| e.build(params))
        .filter(|s| !s.is_empty())
        .collect();
    match parts.len() {
        0 => String::new(),
        1 => parts.into_iter().next().unwrap_or_default(),
        _ => format!("({})", parts.join(sep)),
    }
}
