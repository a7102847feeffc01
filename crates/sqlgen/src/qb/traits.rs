//! Trait definitions for statement builders.

use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// A compiled statement: SQL text plus its parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Base trait for all statement builders.
pub trait SqlQb {
    /// Compile to SQL and parameters, surfacing any captured error.
    fn build(&self) -> SqlResult<BuiltQuery>;

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> SqlResult<String> {
        self.build().map(|q| q.sql)
    }

    /// The captured error, if a previous call failed validation.
    fn build_error(&self) -> Option<&SqlError>;
}

/// Copy-on-mutate chaining with a sticky error slot.
///
/// Every chained call clones the receiver and applies one step. The first
/// failing step records its error; from then on steps are skipped and the
/// error is carried forward unchanged.
pub(crate) trait Chain: Clone {
    fn error_slot(&self) -> &Option<SqlError>;

    fn error_slot_mut(&mut self) -> &mut Option<SqlError>;

    /// Apply an infallible step.
    fn derive(&self, step: impl FnOnce(&mut Self)) -> Self {
        self.try_derive(|next| {
            step(next);
            Ok(())
        })
    }

    /// Apply a step that may fail validation.
    fn try_derive(&self, step: impl FnOnce(&mut Self) -> SqlResult<()>) -> Self {
        let mut next = self.clone();
        if self.error_slot().is_some() {
            return next;
        }
        if let Err(err) = step(&mut next) {
            next = self.clone();
            *next.error_slot_mut() = Some(err);
        }
        next
    }

    /// Fail with the captured error, if any.
    fn check_error(&self) -> SqlResult<()> {
        match self.error_slot() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
