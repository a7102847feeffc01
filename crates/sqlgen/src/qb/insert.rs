//! INSERT / REPLACE statement builder.

use std::fmt;
use std::sync::Arc;

use crate::client::{ExecResult, Executor};
use crate::config::BuilderConfig;
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::named::{NamedArgs, NamedItem};
use crate::qb::param::{ParamList, count_markers};
use crate::qb::traits::{BuiltQuery, Chain, SqlQb};
use crate::schema::{Record, ValueMap, record_fields};
use crate::value::Value;

/// Statement verb.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertMode {
    #[default]
    Insert,
    Replace,
}

/// Scheduling modifier placed after the verb.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    Low,
    High,
    Delayed,
}

impl Priority {
    pub fn as_sql(self) -> &'static str {
        match self {
            Priority::Low => "LOW_PRIORITY",
            Priority::High => "HIGH_PRIORITY",
            Priority::Delayed => "DELAYED",
        }
    }
}

/// Right-hand side of an ON DUPLICATE KEY UPDATE assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum AssignValue {
    /// Bound as a parameter.
    Value(Value),
    /// Inserted verbatim, e.g. `VALUES(`count`) + 1`.
    Raw(String),
}

/// One `column = ...` entry of ON DUPLICATE KEY UPDATE.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub column: Ident,
    pub value: AssignValue,
}

/// A compiled named statement and the arguments to execute it with.
#[derive(Debug, Clone)]
pub struct NamedQuery {
    pub sql: String,
    pub args: NamedArgs,
}

#[derive(Clone)]
struct SharedRecord(Arc<dyn Record>);

impl fmt::Debug for SharedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Record(..)")
    }
}

/// Row data; only one representation may be used per statement.
#[derive(Clone, Debug, Default)]
enum Source {
    #[default]
    Empty,
    Rows(Vec<Vec<Value>>),
    Maps(Vec<ValueMap>),
    Records(Vec<SharedRecord>),
}

impl Source {
    fn kind(&self) -> &'static str {
        match self {
            Source::Empty => "nothing",
            Source::Rows(_) => "positional rows",
            Source::Maps(_) => "keyed maps",
            Source::Records(_) => "records",
        }
    }
}

/// INSERT / REPLACE builder.
///
/// Every method takes `&self` and returns a new builder, so a partially
/// configured statement can be reused as a template.
///
/// ```
/// use sqlgen::{args, qb};
/// use sqlgen::qb::SqlQb;
///
/// let q = qb::insert_into("users")
///     .columns(["name", "age"])
///     .values(args!["ada", 36])
///     .values(args!["bob", 41])
///     .on_duplicate_key_update_raw("age", "VALUES(`age`)")
///     .build()
///     .unwrap();
/// assert_eq!(
///     q.sql,
///     "INSERT INTO `users` (`name`, `age`) VALUES (?, ?), (?, ?) \
///      ON DUPLICATE KEY UPDATE `age` = VALUES(`age`)"
/// );
/// assert_eq!(q.params.len(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct InsertQb {
    table: Ident,
    config: BuilderConfig,
    columns: Vec<Ident>,
    source: Source,
    mode: InsertMode,
    priority: Option<Priority>,
    ignore: bool,
    on_duplicate: Vec<Assignment>,
    build_error: Option<SqlError>,
}

impl Chain for InsertQb {
    fn error_slot(&self) -> &Option<SqlError> {
        &self.build_error
    }

    fn error_slot_mut(&mut self) -> &mut Option<SqlError> {
        &mut self.build_error
    }
}

impl InsertQb {
    /// Create a new INSERT builder for a table.
    pub fn new(table: &str) -> Self {
        let table = Ident::new(table);
        let build_error = table
            .validate()
            .err()
            .map(|e| prefixed("INSERT: table", e));
        Self {
            table,
            config: BuilderConfig::default(),
            columns: Vec::new(),
            source: Source::Empty,
            mode: InsertMode::Insert,
            priority: None,
            ignore: false,
            on_duplicate: Vec::new(),
            build_error,
        }
    }

    /// Create a new REPLACE builder for a table.
    pub fn replace_into(table: &str) -> Self {
        Self {
            mode: InsertMode::Replace,
            ..Self::new(table)
        }
    }

    // ==================== configuration ====================

    /// Replace the whole configuration.
    pub fn config(&self, config: BuilderConfig) -> Self {
        self.derive(|q| q.config = config)
    }

    /// Set the dialect.
    pub fn dialect(&self, dialect: Dialect) -> Self {
        self.derive(|q| q.config.dialect = dialect)
    }

    /// Set the field-tag name used to read records.
    pub fn tag(&self, tag: &str) -> Self {
        self.derive(|q| q.config.tag = tag.to_string())
    }

    // ==================== columns and rows ====================

    /// Set the column list (replaces any previous list).
    pub fn columns<I>(&self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ident>,
    {
        let columns: Vec<Ident> = columns.into_iter().map(Into::into).collect();
        self.try_derive(|q| {
            for column in &columns {
                column.validate().map_err(|e| prefixed("INSERT: column", e))?;
            }
            q.columns = columns;
            Ok(())
        })
    }

    /// Add one positional row.
    pub fn values(&self, row: Vec<Value>) -> Self {
        self.rows([row])
    }

    /// Add positional rows.
    pub fn rows<I>(&self, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        let rows: Vec<Vec<Value>> = rows.into_iter().collect();
        self.try_derive(|q| match &mut q.source {
            Source::Empty => {
                q.source = Source::Rows(rows);
                Ok(())
            }
            Source::Rows(existing) => {
                existing.extend(rows);
                Ok(())
            }
            other => Err(mixed_sources(other, "positional rows")),
        })
    }

    /// Add one keyed map.
    pub fn map<M, K, V>(&self, map: M) -> Self
    where
        M: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let map: ValueMap = map.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.maps([map])
    }

    /// Add keyed maps.
    pub fn maps<I>(&self, maps: I) -> Self
    where
        I: IntoIterator<Item = ValueMap>,
    {
        let maps: Vec<ValueMap> = maps.into_iter().collect();
        self.try_derive(|q| match &mut q.source {
            Source::Empty => {
                q.source = Source::Maps(maps);
                Ok(())
            }
            Source::Maps(existing) => {
                existing.extend(maps);
                Ok(())
            }
            other => Err(mixed_sources(other, "keyed maps")),
        })
    }

    /// Add one record. Its fields are read when the statement is compiled.
    pub fn record<R: Record + 'static>(&self, record: R) -> Self {
        self.record_arc(Arc::new(record))
    }

    /// Add one shared record.
    pub fn record_arc(&self, record: Arc<dyn Record>) -> Self {
        self.push_records(vec![SharedRecord(record)])
    }

    /// Add records.
    pub fn records<I>(&self, records: I) -> Self
    where
        I: IntoIterator,
        I::Item: Record + 'static,
    {
        let records = records
            .into_iter()
            .map(|r| SharedRecord(Arc::new(r) as Arc<dyn Record>))
            .collect();
        self.push_records(records)
    }

    fn push_records(&self, records: Vec<SharedRecord>) -> Self {
        self.try_derive(|q| match &mut q.source {
            Source::Empty => {
                q.source = Source::Records(records);
                Ok(())
            }
            Source::Records(existing) => {
                existing.extend(records);
                Ok(())
            }
            other => Err(mixed_sources(other, "records")),
        })
    }

    // ==================== modifiers ====================

    /// Add `IGNORE`.
    pub fn ignore(&self) -> Self {
        self.try_derive(|q| {
            if q.mode == InsertMode::Replace {
                return Err(SqlError::validation("INSERT: REPLACE cannot be combined with IGNORE"));
            }
            q.ignore = true;
            Ok(())
        })
    }

    /// Add `LOW_PRIORITY`.
    pub fn low_priority(&self) -> Self {
        self.set_priority(Priority::Low)
    }

    /// Add `HIGH_PRIORITY`.
    pub fn high_priority(&self) -> Self {
        self.set_priority(Priority::High)
    }

    /// Add `DELAYED`.
    pub fn delayed(&self) -> Self {
        self.set_priority(Priority::Delayed)
    }

    /// Set the priority modifier (replaces any previous one).
    pub fn priority(&self, priority: Priority) -> Self {
        self.set_priority(priority)
    }

    fn set_priority(&self, priority: Priority) -> Self {
        self.try_derive(|q| {
            if q.mode == InsertMode::Replace && priority == Priority::High {
                return Err(SqlError::validation(
                    "INSERT: REPLACE cannot be combined with HIGH_PRIORITY",
                ));
            }
            q.priority = Some(priority);
            Ok(())
        })
    }

    /// Switch to REPLACE.
    pub fn replace(&self) -> Self {
        self.try_derive(|q| {
            if !q.on_duplicate.is_empty() {
                return Err(SqlError::validation(
                    "INSERT: REPLACE cannot be combined with ON DUPLICATE KEY UPDATE",
                ));
            }
            if q.ignore {
                return Err(SqlError::validation("INSERT: REPLACE cannot be combined with IGNORE"));
            }
            if q.priority == Some(Priority::High) {
                return Err(SqlError::validation(
                    "INSERT: REPLACE cannot be combined with HIGH_PRIORITY",
                ));
            }
            q.mode = InsertMode::Replace;
            Ok(())
        })
    }

    /// Add `column = ?` to ON DUPLICATE KEY UPDATE.
    pub fn on_duplicate_key_update(&self, column: &str, value: impl Into<Value>) -> Self {
        self.push_assignment(column, AssignValue::Value(value.into()))
    }

    /// Add `column = <sql>` to ON DUPLICATE KEY UPDATE, with `sql` inserted verbatim.
    pub fn on_duplicate_key_update_raw(&self, column: &str, sql: &str) -> Self {
        self.push_assignment(column, AssignValue::Raw(sql.to_string()))
    }

    fn push_assignment(&self, column: &str, value: AssignValue) -> Self {
        let column = Ident::new(column);
        self.try_derive(|q| {
            if q.mode == InsertMode::Replace {
                return Err(SqlError::validation(
                    "INSERT: REPLACE cannot be combined with ON DUPLICATE KEY UPDATE",
                ));
            }
            column
                .validate()
                .map_err(|e| prefixed("INSERT: ON DUPLICATE KEY UPDATE column", e))?;
            if let AssignValue::Raw(sql) = &value {
                if sql.trim().is_empty() {
                    return Err(SqlError::validation(format!(
                        "INSERT: empty expression for ON DUPLICATE KEY UPDATE column '{}'",
                        column.name()
                    )));
                }
                if count_markers(sql) != 0 {
                    return Err(SqlError::validation(format!(
                        "INSERT: ON DUPLICATE KEY UPDATE expression for column '{}' cannot \
                         contain '?' markers; bind values with on_duplicate_key_update",
                        column.name()
                    )));
                }
            }
            q.on_duplicate.push(Assignment { column, value });
            Ok(())
        })
    }

    // ==================== compilation ====================

    fn prefix(&self) -> String {
        let mut sql = String::from(match self.mode {
            InsertMode::Insert => "INSERT",
            InsertMode::Replace => "REPLACE",
        });
        if let Some(priority) = self.priority {
            sql.push(' ');
            sql.push_str(priority.as_sql());
        }
        if self.ignore {
            sql.push_str(" IGNORE");
        }
        sql.push_str(" INTO ");
        sql
    }

    fn write_head(&self, sql: &mut String, columns: &[Ident]) {
        sql.push_str(&self.prefix());
        self.table.write_sql(self.config.dialect.quote, sql);
        sql.push_str(" (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            column.write_sql(self.config.dialect.quote, sql);
        }
        sql.push_str(") VALUES ");
    }

    /// Resolve the column set and every row's values in column order.
    fn resolve_rows(&self) -> SqlResult<(Vec<Ident>, Vec<Vec<Value>>)> {
        match &self.source {
            Source::Empty => Err(SqlError::validation("INSERT: no rows to insert")),
            Source::Rows(rows) => {
                if self.columns.is_empty() {
                    return Err(SqlError::validation(
                        "INSERT: positional rows require explicit columns",
                    ));
                }
                for (index, row) in rows.iter().enumerate() {
                    if row.len() != self.columns.len() {
                        return Err(SqlError::row_mismatch(
                            index,
                            format!("expected {} values, got {}", self.columns.len(), row.len()),
                        ));
                    }
                }
                Ok((self.columns.clone(), rows.clone()))
            }
            Source::Maps(maps) => self.keyed_rows(maps.clone()),
            Source::Records(records) => {
                let tag = &self.config.tag;
                let mut columns_from_first = Vec::new();
                let mut keyed = Vec::with_capacity(records.len());
                for (index, record) in records.iter().enumerate() {
                    let fields = record_fields(record.0.as_ref(), tag, index)?;
                    if index == 0 {
                        columns_from_first = fields.iter().map(|(c, _)| c.clone()).collect();
                    }
                    let count = fields.len();
                    let map: ValueMap = fields.into_iter().collect();
                    if map.len() != count {
                        return Err(SqlError::row_mismatch(index, "duplicate column in record"));
                    }
                    keyed.push(map);
                }
                let columns = if self.columns.is_empty() {
                    columns_from_first.iter().map(|c| Ident::single(c.as_str())).collect()
                } else {
                    self.columns.clone()
                };
                self.rows_for_columns(columns, keyed)
            }
        }
    }

    fn keyed_rows(&self, maps: Vec<ValueMap>) -> SqlResult<(Vec<Ident>, Vec<Vec<Value>>)> {
        let columns = if self.columns.is_empty() {
            maps.first()
                .map(|m| m.keys().map(|k| Ident::single(k.as_str())).collect())
                .unwrap_or_default()
        } else {
            self.columns.clone()
        };
        self.rows_for_columns(columns, maps)
    }

    fn rows_for_columns(
        &self,
        columns: Vec<Ident>,
        maps: Vec<ValueMap>,
    ) -> SqlResult<(Vec<Ident>, Vec<Vec<Value>>)> {
        if columns.is_empty() {
            return Err(SqlError::validation("INSERT: no columns to insert"));
        }
        let names: Vec<String> = columns.iter().map(Ident::name).collect();
        let mut rows = Vec::with_capacity(maps.len());
        for (index, mut map) in maps.into_iter().enumerate() {
            let mut row = Vec::with_capacity(names.len());
            for name in &names {
                let value = map
                    .remove(name)
                    .ok_or_else(|| SqlError::row_mismatch(index, format!("missing key '{name}'")))?;
                row.push(value);
            }
            if let Some(extra) = map.keys().next() {
                return Err(SqlError::row_mismatch(
                    index,
                    format!("unexpected key '{extra}'"),
                ));
            }
            rows.push(row);
        }
        Ok((columns, rows))
    }

    /// Columns of the named template: the explicit list, or the keys of the
    /// first map or record. Later items are not read.
    fn template_columns(&self) -> SqlResult<Vec<Ident>> {
        if !self.columns.is_empty() {
            return Ok(self.columns.clone());
        }
        let columns: Vec<Ident> = match &self.source {
            Source::Maps(maps) => maps
                .first()
                .map(|m| m.keys().map(|k| Ident::single(k.as_str())).collect())
                .unwrap_or_default(),
            Source::Records(records) => match records.first() {
                Some(first) => record_fields(first.0.as_ref(), &self.config.tag, 0)?
                    .into_iter()
                    .map(|(column, _)| Ident::single(column))
                    .collect(),
                None => Vec::new(),
            },
            Source::Empty | Source::Rows(_) => Vec::new(),
        };
        if columns.is_empty() {
            return Err(SqlError::validation("INSERT: no columns to insert"));
        }
        Ok(columns)
    }

    /// Compile with `:column` placeholders shared by every map or record.
    ///
    /// Value assignments in ON DUPLICATE KEY UPDATE have no name to bind to
    /// and are rejected; use [`InsertQb::on_duplicate_key_update_raw`].
    pub fn build_named(&self) -> SqlResult<NamedQuery> {
        self.check_error()?;
        let items: Vec<NamedItem> = match &self.source {
            Source::Maps(maps) => maps.iter().cloned().map(NamedItem::Map).collect(),
            Source::Records(records) => records
                .iter()
                .map(|r| NamedItem::Record(r.0.clone()))
                .collect(),
            Source::Empty => return Err(SqlError::validation("INSERT: no rows to insert")),
            Source::Rows(_) => {
                return Err(SqlError::validation(
                    "INSERT: named compilation requires keyed maps or records",
                ));
            }
        };
        let columns = self.template_columns()?;

        let mut sql = String::with_capacity(64);
        self.write_head(&mut sql, &columns);
        sql.push('(');
        for (i, column) in columns.iter().enumerate() {
            let name = column.name();
            if !is_bind_name(&name) {
                return Err(SqlError::validation(format!(
                    "INSERT: column '{name}' cannot be used as a named parameter"
                )));
            }
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push(':');
            sql.push_str(&name);
        }
        sql.push(')');

        if !self.on_duplicate.is_empty() {
            let mut params = ParamList::new(self.config.dialect.clone());
            sql.push_str(&self.build_on_duplicate(&mut params));
            if !params.is_empty() {
                return Err(SqlError::validation(
                    "INSERT: named compilation cannot bind ON DUPLICATE KEY UPDATE values; use a raw expression",
                ));
            }
        }

        let tag = self.config.tag.clone();
        let args = match <[NamedItem; 1]>::try_from(items) {
            Ok([item]) => NamedArgs::single(tag, item),
            Err(items) => NamedArgs::batch(tag, items),
        };
        Ok(NamedQuery { sql, args })
    }

    fn build_on_duplicate(&self, params: &mut ParamList) -> String {
        let parts: Vec<String> = self
            .on_duplicate
            .iter()
            .map(|a| {
                let col = params.quote(&a.column);
                match &a.value {
                    AssignValue::Value(v) => format!("{col} = {}", params.bind(v.clone())),
                    AssignValue::Raw(sql) => format!("{col} = {sql}"),
                }
            })
            .collect();
        format!(" ON DUPLICATE KEY UPDATE {}", parts.join(", "))
    }

    fn uses_named(&self) -> bool {
        matches!(self.source, Source::Maps(_) | Source::Records(_))
            && self
                .on_duplicate
                .iter()
                .all(|a| matches!(a.value, AssignValue::Raw(_)))
    }

    /// Execute through the client.
    ///
    /// Maps and records go through [`Executor::named_exec`]; positional rows
    /// (or statements with bound ON DUPLICATE KEY UPDATE values) go through
    /// [`Executor::exec`]. Both paths use the executor's placeholder style,
    /// not the configured one. Every row is checked against the column set
    /// before the executor is called.
    pub async fn exec(&self, conn: &impl Executor) -> SqlResult<ExecResult> {
        if self.uses_named() {
            let q = self.build_named()?;
            self.resolve_rows()?;
            tracing::trace!(target: "sqlgen", sql = %q.sql, items = q.args.len(), "named insert");
            conn.named_exec(&q.sql, &q.args).await
        } else {
            let placeholder = conn.placeholder();
            let q = self
                .derive(|q| q.config.dialect.placeholder = placeholder)
                .build()?;
            tracing::trace!(target: "sqlgen", sql = %q.sql, params = q.params.len(), "insert");
            conn.exec(&q.sql, &q.params).await
        }
    }
}

impl SqlQb for InsertQb {
    /// Compile with positional placeholders, numbered across all rows and
    /// then the ON DUPLICATE KEY UPDATE values.
    fn build(&self) -> SqlResult<BuiltQuery> {
        self.check_error()?;
        let (columns, rows) = self.resolve_rows()?;

        let mut params = ParamList::new(self.config.dialect.clone());
        let mut sql = String::with_capacity(64 + rows.len() * columns.len() * 4);
        self.write_head(&mut sql, &columns);
        for (i, row) in rows.into_iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for (j, value) in row.into_iter().enumerate() {
                if j > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&params.bind(value));
            }
            sql.push(')');
        }
        if !self.on_duplicate.is_empty() {
            let tail = self.build_on_duplicate(&mut params);
            sql.push_str(&tail);
        }

        Ok(BuiltQuery {
            sql,
            params: params.into_values(),
        })
    }

    fn build_error(&self) -> Option<&SqlError> {
        self.build_error.as_ref()
    }
}

fn mixed_sources(current: &Source, adding: &str) -> SqlError {
    SqlError::validation(format!(
        "INSERT: cannot add {adding} to a statement built from {}",
        current.kind()
    ))
}

fn prefixed(context: &str, err: SqlError) -> SqlError {
    match err {
        SqlError::Validation(msg) => SqlError::Validation(format!("{context}: {msg}")),
        other => other,
    }
}

fn is_bind_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
