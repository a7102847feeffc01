use std::future::Future;
use std::time::{Duration, Instant};

use super::config::MonitorConfig;
use super::truncate_sql_bytes;
use crate::client::{ExecResult, Executor};
use crate::dialect::Placeholder;
use crate::error::{SqlError, SqlResult};
use crate::named::NamedArgs;
use crate::row::Row;
use crate::value::Value;

/// The kind of statement being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Exec,
    NamedExec,
    Query,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Exec => "exec",
            StatementKind::NamedExec => "named_exec",
            StatementKind::Query => "query",
        }
    }
}

/// An executor wrapper that logs every statement and enforces a timeout.
pub struct InstrumentedExecutor<E> {
    inner: E,
    config: MonitorConfig,
}

impl<E: Executor> InstrumentedExecutor<E> {
    /// Wrap an executor with the default configuration.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            config: MonitorConfig::default(),
        }
    }

    /// Set the monitor configuration.
    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the slow statement threshold.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.config.slow_query_threshold = Some(threshold);
        self
    }

    /// Set the statement timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = Some(timeout);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.config.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    async fn with_timeout<T, F>(&self, future: F) -> SqlResult<T>
    where
        F: Future<Output = SqlResult<T>> + Send,
    {
        match self.config.query_timeout {
            Some(timeout) => tokio::time::timeout(timeout, future)
                .await
                .unwrap_or(Err(SqlError::Timeout(timeout))),
            None => future.await,
        }
    }

    async fn observe<T, F>(
        &self,
        kind: StatementKind,
        sql: &str,
        params: usize,
        future: F,
        rows: fn(&T) -> u64,
    ) -> SqlResult<T>
    where
        F: Future<Output = SqlResult<T>> + Send,
    {
        let start = Instant::now();
        let result = self.with_timeout(future).await;
        let elapsed = start.elapsed();
        let sql = self.truncate_sql(sql);
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

        match &result {
            Ok(value) => {
                let rows = rows(value);
                tracing::debug!(
                    target: "sqlgen::sql",
                    kind = kind.as_str(),
                    sql = %sql,
                    params,
                    elapsed_ms,
                    rows,
                    "statement finished"
                );
                if self
                    .config
                    .slow_query_threshold
                    .is_some_and(|threshold| elapsed > threshold)
                {
                    tracing::warn!(
                        target: "sqlgen::sql",
                        kind = kind.as_str(),
                        sql = %sql,
                        params,
                        elapsed_ms,
                        "slow statement"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: "sqlgen::sql",
                    kind = kind.as_str(),
                    sql = %sql,
                    params,
                    elapsed_ms,
                    error = %err,
                    "statement failed"
                );
            }
        }
        result
    }
}

impl<E: Executor> Executor for InstrumentedExecutor<E> {
    fn exec(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send {
        self.observe(
            StatementKind::Exec,
            sql,
            params.len(),
            self.inner.exec(sql, params),
            |r| r.rows_affected,
        )
    }

    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = SqlResult<Vec<Row>>> + Send {
        self.observe(
            StatementKind::Query,
            sql,
            params.len(),
            self.inner.query(sql, params),
            |rows| rows.len() as u64,
        )
    }

    fn placeholder(&self) -> Placeholder {
        self.inner.placeholder()
    }

    fn named_exec(
        &self,
        sql: &str,
        args: &NamedArgs,
    ) -> impl Future<Output = SqlResult<ExecResult>> + Send {
        self.observe(
            StatementKind::NamedExec,
            sql,
            args.len(),
            self.inner.named_exec(sql, args),
            |r| r.rows_affected,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy(Duration);

    impl Executor for Sleepy {
        async fn exec(&self, _sql: &str, _params: &[Value]) -> SqlResult<ExecResult> {
            tokio::time::sleep(self.0).await;
            Ok(ExecResult {
                last_insert_id: None,
                rows_affected: 1,
            })
        }

        async fn query(&self, _sql: &str, _params: &[Value]) -> SqlResult<Vec<Row>> {
            tokio::time::sleep(self.0).await;
            Ok(vec![Row::from_pairs([("n", Value::Int(1))])])
        }
    }

    #[tokio::test]
    async fn timeout_fails_with_timeout_error() {
        let client = InstrumentedExecutor::new(Sleepy(Duration::from_millis(500)))
            .with_query_timeout(Duration::from_millis(10));
        let err = client.exec("UPDATE t SET a = 1", &[]).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err, SqlError::Timeout(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn passes_results_through() {
        let client = InstrumentedExecutor::new(Sleepy(Duration::ZERO))
            .with_config(MonitorConfig::new().with_slow_query_threshold(Duration::ZERO));
        assert_eq!(client.exec("DELETE FROM t", &[]).await.unwrap().rows_affected, 1);
        assert_eq!(client.query("SELECT 1", &[]).await.unwrap().len(), 1);
        let row: Row = client.get("SELECT 1", &[]).await.unwrap();
        assert_eq!(row.try_get::<i64>("n").unwrap(), 1);
    }

    #[test]
    fn long_sql_is_truncated() {
        let client = InstrumentedExecutor::new(Sleepy(Duration::ZERO))
            .with_config(MonitorConfig::new().with_max_sql_length(6));
        assert_eq!(client.truncate_sql("SELECT * FROM t"), "SELECT...");
        let client = client.with_config(MonitorConfig::new().no_truncate());
        assert_eq!(client.truncate_sql("SELECT * FROM t"), "SELECT * FROM t");
    }
}
