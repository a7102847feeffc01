//! # sqlgen
//!
//! A parameterized SQL statement compiler.
//!
//! ## Features
//!
//! - **Values never become SQL**: every literal is emitted as a placeholder
//!   and travels in the parameter list; every identifier is quoted
//! - **Conditions as trees**: build [`Expr`] directly, parse free text with
//!   [`parse_condition`], or translate JSON [`Filter`] documents
//! - **Immutable builders**: every call returns a new builder, so a partial
//!   statement can be shared and reused as a template
//! - **Sticky errors**: a failed validation is carried to the final
//!   `build()` / execution call instead of panicking mid-chain
//! - **Pluggable execution**: statements run through the [`Executor`] trait;
//!   `tokio-postgres` support ships behind the `postgres` feature
//!
//! ## Query Builder (qb)
//!
//! ```
//! use sqlgen::{args, qb, EqMap, Expr};
//! use sqlgen::qb::SqlQb;
//!
//! let q = qb::select_from("users")
//!     .columns(["id", "name"])
//!     .and_where(EqMap::new().with("status", "active").with("role", "admin"))
//!     .and_where_text("age >= 18 OR name LIKE 'adm%'")
//!     .limit(10)
//!     .build()
//!     .unwrap();
//! assert_eq!(
//!     q.sql,
//!     "SELECT `id`, `name` FROM `users` \
//!      WHERE (`role` = ? AND `status` = ?) AND (`age` >= ? OR `name` LIKE ?) LIMIT ?"
//! );
//! assert_eq!(q.params, args!["admin", "active", 18, "adm%", 10]);
//!
//! let q = qb::insert_into("users")
//!     .columns(["name", "age"])
//!     .values(args!["ada", 36])
//!     .build()
//!     .unwrap();
//! assert_eq!(q.sql, "INSERT INTO `users` (`name`, `age`) VALUES (?, ?)");
//! ```

extern crate self as sqlgen;

pub mod client;
pub mod config;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod monitor;
pub mod named;
pub mod qb;
pub mod row;
pub mod schema;
pub mod value;

#[cfg(feature = "postgres")]
pub mod pg;

pub use client::{ExecResult, Executor};
pub use config::{BuilderConfig, DEFAULT_TAG};
pub use dialect::{Dialect, Placeholder};
pub use error::{SqlError, SqlResult};
pub use ident::Ident;
pub use monitor::{InstrumentedExecutor, MonitorConfig};
pub use named::{NamedArgs, NamedItem, bind_named};
pub use row::{FromRow, Row};
pub use schema::{Record, Schema, ValueMap};
pub use value::{FromValue, Value};

// Re-export qb module for easy access
pub use qb::{
    BuiltQuery, CmpOp, Condition, Direction, EqMap, Expr, Filter, InsertQb, OrderItem, SelectQb,
    SqlQb, TypedInsert, TypedSelect, insert_into, parse_condition, replace_into, select_from,
    translate_filter,
};

#[cfg(feature = "derive")]
pub use sqlgen_derive::{FromRow, Record};
