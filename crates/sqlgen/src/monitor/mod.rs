//! Statement logging and timeouts.
//!
//! [`InstrumentedExecutor`] wraps any [`Executor`](crate::Executor) and emits
//! `tracing` events under the `sqlgen::sql` target:
//!
//! - `debug` for every statement: kind, truncated SQL, parameter count,
//!   elapsed time and row count
//! - `warn` for statements slower than the configured threshold, and for
//!   failures
//!
//! ```ignore
//! use std::time::Duration;
//! use sqlgen::monitor::{InstrumentedExecutor, MonitorConfig};
//!
//! let client = InstrumentedExecutor::new(client).with_config(
//!     MonitorConfig::new()
//!         .with_query_timeout(Duration::from_secs(30))
//!         .with_slow_query_threshold(Duration::from_millis(100)),
//! );
//! ```

mod config;
mod instrumented;

pub use config::MonitorConfig;
pub use instrumented::{InstrumentedExecutor, StatementKind};

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::truncate_sql_bytes;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("SELECT 1", 6), "SELECT");
        // 'é' is two bytes; cutting inside it backs off to the boundary.
        assert_eq!(truncate_sql_bytes("café", 4), "caf");
    }
}
