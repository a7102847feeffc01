//! Execution client contract.
//!
//! Builders never talk to a database themselves. They hand finished SQL and
//! parameters to an [`Executor`], which owns the round trip, connection and
//! transaction lifecycle.

use std::future::Future;

use crate::dialect::Placeholder;
use crate::error::{SqlError, SqlResult};
use crate::named::{NamedArgs, bind_named};
use crate::row::{FromRow, Row};
use crate::value::Value;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Generated id of the first inserted row, when the backend reports one.
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
}

/// A trait implemented by anything that can run SQL.
///
/// Only [`Executor::exec`] and [`Executor::query`] are required; the named and
/// decoding entry points have default implementations on top of them.
pub trait Executor: Send + Sync {
    /// Execute a write statement with positional parameters.
    fn exec(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send;

    /// Execute a query and return all rows.
    fn query(&self, sql: &str, params: &[Value])
    -> impl Future<Output = SqlResult<Vec<Row>>> + Send;

    /// Placeholder style this executor expects from [`bind_named`].
    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    /// Execute a statement with `:name` markers.
    ///
    /// The default implementation binds each item positionally and runs it
    /// through [`Executor::exec`], summing affected rows. `last_insert_id`
    /// is taken from the first item.
    fn named_exec(
        &self,
        sql: &str,
        args: &NamedArgs,
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send {
        async move {
            if args.is_empty() {
                return Err(SqlError::validation("named execution requires at least one item"));
            }
            let placeholder = self.placeholder();
            let mut total = ExecResult::default();
            for (index, item) in args.items().iter().enumerate() {
                let lookup = item.to_map(args.tag(), index)?;
                let (bound_sql, params) = bind_named(sql, &lookup, &placeholder)?;
                let result = self.exec(&bound_sql, &params).await?;
                if index == 0 {
                    total.last_insert_id = result.last_insert_id;
                }
                total.rows_affected += result.rows_affected;
            }
            Ok(total)
        }
    }

    /// Execute a query and decode **exactly one** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`SqlError::NotFound`]
    /// - 1 row: returns that row decoded
    /// - multiple rows: returns [`SqlError::TooManyRows`]
    fn get<T: FromRow + Send>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = SqlResult<T>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            let got = rows.len();
            match <[Row; 1]>::try_from(rows) {
                Ok([row]) => T::from_row(&row),
                Err(_) if got == 0 => Err(SqlError::not_found("Expected 1 row, got 0")),
                Err(_) => Err(SqlError::TooManyRows { expected: 1, got }),
            }
        }
    }

    /// Execute a query and decode every row, in order.
    fn select<T: FromRow + Send>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = SqlResult<Vec<T>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            rows.iter().map(T::from_row).collect()
        }
    }
}
