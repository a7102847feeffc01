//! Statement builders.
//!
//! Conditions are expression trees ([`Expr`]) built directly, parsed from text
//! ([`parse_condition`]) or translated from filter documents ([`Filter`]).
//! The builders assemble them with column lists and row data into SQL text
//! plus an ordered parameter list; placeholder numbering is computed once, at
//! build time, across the whole statement.
//!
//! # Usage
//!
//! ```ignore
//! use sqlgen::{args, qb, Expr};
//!
//! // SELECT
//! let users = qb::select_from("users")
//!     .and_where(Expr::eq("status", "active"))
//!     .and_where_text("age >= 18 AND role IN ('admin', 'owner')")
//!     .order_by([OrderItem::desc("created_at")])
//!     .limit(20)
//!     .fetch_all::<User>(&client)
//!     .await?;
//!
//! // INSERT from records, executed as one named statement per record
//! qb::insert_into("users")
//!     .records(new_users)
//!     .on_duplicate_key_update_raw("email", "VALUES(`email`)")
//!     .exec(&client)
//!     .await?;
//! ```

mod clause;
mod expr;
mod filter;
mod insert;
mod param;
mod parse;
mod select;
mod traits;
mod typed;


pub use clause::{ColumnClause, Condition, ConditionList, Direction, EqMap, OrderItem};
pub use expr::{CmpOp, Expr, Operand};
pub use filter::{Filter, translate_filter};
pub use insert::{AssignValue, Assignment, InsertMode, InsertQb, NamedQuery, Priority};
pub use param::{ParamList, count_markers};
pub use parse::parse_condition;
pub use select::SelectQb;
pub use traits::{BuiltQuery, SqlQb};
pub use typed::{TypedInsert, TypedSelect};

/// Create a SELECT builder for the given table.
///
/// # Example
/// ```
/// use sqlgen::qb::{self, SqlQb};
///
/// assert_eq!(qb::select_from("users").to_sql().unwrap(), "SELECT * FROM `users`");
/// ```
pub fn select_from(table: &str) -> SelectQb {
    SelectQb::new(table)
}

/// Create an INSERT builder for the given table.
pub fn insert_into(table: &str) -> InsertQb {
    InsertQb::new(table)
}

/// Create a REPLACE builder for the given table.
pub fn replace_into(table: &str) -> InsertQb {
    InsertQb::replace_into(table)
}
