//! Builders bound to a record type.
//!
//! These wrappers only forward to [`SelectQb`] and [`InsertQb`]; they exist so
//! terminal calls return `T` without a turbofish at every call site.

use std::fmt;
use std::marker::PhantomData;

use crate::client::{ExecResult, Executor};
use crate::error::SqlResult;
use crate::qb::clause::{Condition, OrderItem};
use crate::qb::filter::Filter;
use crate::qb::insert::{InsertQb, NamedQuery};
use crate::qb::select::SelectQb;
use crate::qb::traits::{BuiltQuery, SqlQb};
use crate::row::FromRow;
use crate::schema::{Record, Schema};

/// A [`SelectQb`] that decodes into `T`.
///
/// ```
/// use sqlgen::{Expr, FromRow, Row, Schema, SqlResult};
/// use sqlgen::qb::TypedSelect;
///
/// struct User {
///     id: i64,
/// }
///
/// impl Schema for User {
///     fn columns(_tag: &str) -> Option<Vec<String>> {
///         Some(vec!["id".into()])
///     }
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> SqlResult<Self> {
///         Ok(User { id: row.try_get("id")? })
///     }
/// }
///
/// let q = TypedSelect::<User>::new("users")
///     .and_where(Expr::gt("id", 10))
///     .build()
///     .unwrap();
/// assert_eq!(q.sql, "SELECT `id` FROM `users` WHERE `id` > ?");
/// ```
pub struct TypedSelect<T> {
    inner: SelectQb,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedSelect<T> {
    fn clone(&self) -> Self {
        Self::from_inner(self.inner.clone())
    }
}

impl<T> fmt::Debug for TypedSelect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedSelect").field(&self.inner).finish()
    }
}

impl<T> TypedSelect<T> {
    pub fn new(table: &str) -> Self {
        Self::from_inner(SelectQb::new(table))
    }

    pub fn from_inner(inner: SelectQb) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn inner(&self) -> &SelectQb {
        &self.inner
    }

    pub fn into_inner(self) -> SelectQb {
        self.inner
    }

    /// Derive a new builder by transforming the untyped one.
    pub fn map(&self, f: impl FnOnce(&SelectQb) -> SelectQb) -> Self {
        Self::from_inner(f(&self.inner))
    }

    pub fn and_where(&self, condition: impl Into<Condition>) -> Self {
        Self::from_inner(self.inner.and_where(condition))
    }

    pub fn and_where_text(&self, text: &str) -> Self {
        Self::from_inner(self.inner.and_where_text(text))
    }

    pub fn and_where_filter(&self, filter: &Filter) -> Self {
        Self::from_inner(self.inner.and_where_filter(filter))
    }

    pub fn having(&self, condition: impl Into<Condition>) -> Self {
        Self::from_inner(self.inner.having(condition))
    }

    pub fn group_by<I>(&self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OrderItem>,
    {
        Self::from_inner(self.inner.group_by(columns))
    }

    pub fn order_by<I>(&self, items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OrderItem>,
    {
        Self::from_inner(self.inner.order_by(items))
    }

    pub fn distinct(&self) -> Self {
        Self::from_inner(self.inner.distinct())
    }

    pub fn limit(&self, n: i64) -> Self {
        Self::from_inner(self.inner.limit(n))
    }

    pub fn offset(&self, n: i64) -> Self {
        Self::from_inner(self.inner.offset(n))
    }

    pub fn paginate(&self, page: i64, per_page: i64) -> Self {
        Self::from_inner(self.inner.paginate(page, per_page))
    }
}

impl<T: FromRow + Schema + Send> TypedSelect<T> {
    pub fn build(&self) -> SqlResult<BuiltQuery> {
        self.inner.build_for::<T>()
    }

    /// See [`SelectQb::fetch_one`].
    pub async fn get(&self, conn: &impl Executor) -> SqlResult<T> {
        self.inner.fetch_one::<T>(conn).await
    }

    /// See [`SelectQb::fetch_all`].
    pub async fn select(&self, conn: &impl Executor) -> SqlResult<Vec<T>> {
        self.inner.fetch_all::<T>(conn).await
    }
}

/// An [`InsertQb`] that only accepts records of type `T`.
pub struct TypedInsert<T> {
    inner: InsertQb,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for TypedInsert<T> {
    fn clone(&self) -> Self {
        Self::from_inner(self.inner.clone())
    }
}

impl<T> fmt::Debug for TypedInsert<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedInsert").field(&self.inner).finish()
    }
}

impl<T> TypedInsert<T> {
    pub fn new(table: &str) -> Self {
        Self::from_inner(InsertQb::new(table))
    }

    pub fn from_inner(inner: InsertQb) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn inner(&self) -> &InsertQb {
        &self.inner
    }

    pub fn into_inner(self) -> InsertQb {
        self.inner
    }

    /// Derive a new builder by transforming the untyped one.
    pub fn map(&self, f: impl FnOnce(&InsertQb) -> InsertQb) -> Self {
        Self::from_inner(f(&self.inner))
    }

    pub fn build(&self) -> SqlResult<BuiltQuery> {
        self.inner.build()
    }

    pub fn build_named(&self) -> SqlResult<NamedQuery> {
        self.inner.build_named()
    }

    pub async fn exec(&self, conn: &impl Executor) -> SqlResult<ExecResult> {
        self.inner.exec(conn).await
    }
}

impl<T: Record + 'static> TypedInsert<T> {
    pub fn record(&self, record: T) -> Self {
        Self::from_inner(self.inner.record(record))
    }

    pub fn records(&self, records: impl IntoIterator<Item = T>) -> Self {
        Self::from_inner(self.inner.records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::row::Row;
    use crate::value::Value;
    use serde_json::json;

    #[allow(dead_code)]
    struct Post {
        id: i64,
    }

    impl Schema for Post {
        fn columns(tag: &str) -> Option<Vec<String>> {
            (tag == "db").then(|| vec!["id".to_string(), "author".to_string()])
        }
    }

    impl FromRow for Post {
        fn from_row(row: &Row) -> SqlResult<Self> {
            Ok(Post {
                id: row.try_get("id")?,
            })
        }
    }

    #[test]
    fn select_forwards_clauses() {
        let q = TypedSelect::<Post>::new("posts")
            .and_where_filter(&Filter::eq("published", json!(true)))
            .and_where_text("author != 'bot'")
            .group_by(["author"])
            .having(("COUNT(*) > ?", args![1]))
            .order_by([OrderItem::desc("author")])
            .paginate(2, 10)
            .build()
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT `id`, `author` FROM `posts` WHERE `published` = ? AND `author` != ? \
             GROUP BY `author` HAVING COUNT(*) > ? ORDER BY `author` DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(q.params, args![true, "bot", 1, 10, 10]);
    }

    struct Tag {
        name: &'static str,
    }

    impl Record for Tag {
        fn fields(&self, _tag: &str) -> Option<Vec<(String, Value)>> {
            Some(vec![("name".to_string(), Value::from(self.name))])
        }
    }

    #[test]
    fn insert_forwards_to_untyped_builder() {
        let typed = TypedInsert::<Tag>::new("tags")
            .records([Tag { name: "a" }, Tag { name: "b" }])
            .map(|q| q.ignore());
        let untyped = InsertQb::new("tags")
            .records([Tag { name: "a" }, Tag { name: "b" }])
            .ignore();
        assert_eq!(typed.build().unwrap(), untyped.build().unwrap());
        assert_eq!(
            typed.build().unwrap().sql,
            "INSERT IGNORE INTO `tags` (`name`) VALUES (?), (?)"
        );
        assert_eq!(typed.build().unwrap().params, args!["a", "b"]);
    }
}
