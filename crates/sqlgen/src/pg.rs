//! [`Executor`] for `tokio-postgres` clients and transactions.
//!
//! Enabled with the `postgres` feature. Build statements with
//! [`Dialect::postgres`](crate::Dialect::postgres) so positional placeholders
//! come out as `$n`.

use std::error::Error;
use std::sync::Arc;

use bytes::BytesMut;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

use crate::client::{ExecResult, Executor};
use crate::dialect::Placeholder;
use crate::error::{SqlError, SqlResult};
use crate::row::Row;
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::UInt(v) => i64::try_from(*v)?.to_sql(ty, out),
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Time(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampTz(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn column<'a, T>(row: &'a tokio_postgres::Row, idx: usize, name: &str) -> SqlResult<Option<T>>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| SqlError::decode(name, e.to_string()))
}

fn decode_value(row: &tokio_postgres::Row, idx: usize) -> SqlResult<Value> {
    let col = &row.columns()[idx];
    let name = col.name();
    let value = match *col.type_() {
        Type::BOOL => column::<bool>(row, idx, name)?.map(Value::Bool),
        Type::INT2 => column::<i16>(row, idx, name)?.map(Value::from),
        Type::INT4 => column::<i32>(row, idx, name)?.map(Value::from),
        Type::INT8 => column::<i64>(row, idx, name)?.map(Value::Int),
        Type::OID => column::<u32>(row, idx, name)?.map(Value::from),
        Type::FLOAT4 => column::<f32>(row, idx, name)?.map(Value::from),
        Type::FLOAT8 => column::<f64>(row, idx, name)?.map(Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            column::<String>(row, idx, name)?.map(Value::Text)
        }
        Type::BYTEA => column::<Vec<u8>>(row, idx, name)?.map(Value::Bytes),
        Type::JSON | Type::JSONB => column::<serde_json::Value>(row, idx, name)?.map(Value::Json),
        Type::DATE => column::<chrono::NaiveDate>(row, idx, name)?.map(Value::Date),
        Type::TIME => column::<chrono::NaiveTime>(row, idx, name)?.map(Value::Time),
        Type::TIMESTAMP => column::<chrono::NaiveDateTime>(row, idx, name)?.map(Value::Timestamp),
        Type::TIMESTAMPTZ => {
            column::<chrono::DateTime<chrono::Utc>>(row, idx, name)?.map(Value::TimestampTz)
        }
        Type::UUID => column::<uuid::Uuid>(row, idx, name)?.map(Value::Uuid),
        ref other => {
            return Err(SqlError::decode(
                name,
                format!("unsupported column type {other}"),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn convert_rows(rows: Vec<tokio_postgres::Row>) -> SqlResult<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Arc<[String]> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    rows.iter()
        .map(|row| {
            let values = (0..row.len())
                .map(|idx| decode_value(row, idx))
                .collect::<SqlResult<Vec<_>>>()?;
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

macro_rules! impl_pg_executor {
    ($ty:ty) => {
        impl Executor for $ty {
            async fn exec(&self, sql: &str, params: &[Value]) -> SqlResult<ExecResult> {
                let rows_affected = <$ty>::execute(self, sql, &param_refs(params)).await?;
                Ok(ExecResult {
                    last_insert_id: None,
                    rows_affected,
                })
            }

            async fn query(&self, sql: &str, params: &[Value]) -> SqlResult<Vec<Row>> {
                let rows = <$ty>::query(self, sql, &param_refs(params)).await?;
                convert_rows(rows)
            }

            fn placeholder(&self) -> Placeholder {
                Placeholder::Dollar
            }
        }
    };
}

impl_pg_executor!(tokio_postgres::Client);
impl_pg_executor!(tokio_postgres::Transaction<'_>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_encode_as_postgres_types() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::INT4, &mut buf).unwrap(),
            IsNull::Yes
        ));

        buf.clear();
        Value::Int(7).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(&buf[..], &7i32.to_be_bytes());

        buf.clear();
        Value::Int(7).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(&buf[..], &7i64.to_be_bytes());

        buf.clear();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());
        assert!(Value::UInt(u64::MAX).to_sql(&Type::INT8, &mut buf).is_err());
    }

    #[test]
    fn empty_result_converts_to_no_rows() {
        assert!(convert_rows(Vec::new()).unwrap().is_empty());
    }
}
