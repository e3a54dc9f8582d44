use async_trait::async_trait;
use pgvector::Vector;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Decimal;
use sqlx::{Column, PgPool, Row, TypeInfo};
use uuid::Uuid;
use vecscope_core::{
    format_vector, validate_identifier, MetadataRow, Result, RowSource, ScalarValue, TableRef,
    VecscopeError,
};

use crate::config::PgConnectionConfig;

/// A [`RowSource`] reading embedding tables from PostgreSQL with pgvector.
///
/// Rows are returned with every column decoded into a [`ScalarValue`];
/// `vector` columns come back in pgvector's text form (`[1,2,3]`). Row
/// identity is a `uuid` column, matching [`find_id_column`](RowSource::find_id_column).
#[derive(Debug, Clone)]
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool from connection parameters.
    pub async fn connect(config: &PgConnectionConfig) -> Result<Self> {
        Ok(Self::new(config.connect().await?))
    }

    /// Open a pool from a `postgres://` URL.
    pub async fn connect_url(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| VecscopeError::Database(format!("failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Round-trip `SELECT 1` to check that the credentials work.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| VecscopeError::Database(format!("ping failed: {e}")))?;
        Ok(())
    }

    /// Return a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn count(&self, table: &TableRef) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", qualified(table)?);
        let (count,): (i64,) = sqlx::query_as(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| VecscopeError::Database(format!("count failed for {table}: {e}")))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn sample_approx(
        &self,
        table: &TableRef,
        vector_column: &str,
        percent: f64,
        limit: usize,
    ) -> Result<Vec<MetadataRow>> {
        validate_identifier("column", vector_column)?;
        let sql = format!(
            "SELECT * FROM {} TABLESAMPLE BERNOULLI ($1::real) LIMIT $2",
            qualified(table)?
        );
        let percent = percent.clamp(0.0, 100.0) as f32;
        tracing::debug!(%table, vector_column, percent, limit, "bernoulli sample");

        let rows = sqlx::query(&sql)
            .bind(percent)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VecscopeError::Database(format!("sampling {table} failed: {e}")))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn fetch_row(
        &self,
        table: &TableRef,
        id_column: &str,
        id: &str,
    ) -> Result<Option<MetadataRow>> {
        let Ok(id) = Uuid::parse_str(id.trim()) else {
            tracing::debug!(%table, id, "id is not a uuid");
            return Ok(None);
        };
        let sql = format!(
            "SELECT * FROM {} WHERE {} = $1 LIMIT 1",
            qualified(table)?,
            quote_ident("column", id_column)?
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VecscopeError::Database(format!("fetching row from {table} failed: {e}")))?;
        Ok(row.as_ref().map(decode_row))
    }

    async fn fetch_rows(
        &self,
        table: &TableRef,
        id_column: &str,
        ids: &[String],
    ) -> Result<Vec<MetadataRow>> {
        let mut uuids = Vec::with_capacity(ids.len());
        for id in ids {
            match Uuid::parse_str(id.trim()) {
                Ok(uuid) => uuids.push(uuid),
                Err(_) => tracing::warn!(%table, %id, "skipping candidate id that is not a uuid"),
            }
        }
        if uuids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT * FROM {} WHERE {} = ANY($1)",
            qualified(table)?,
            quote_ident("column", id_column)?
        );
        let rows = sqlx::query(&sql)
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VecscopeError::Database(format!("fetching rows from {table} failed: {e}")))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn find_id_column(&self, table: &TableRef) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"SELECT column_name::text
               FROM information_schema.columns
               WHERE table_schema = $1 AND table_name = $2 AND data_type = 'uuid'
               ORDER BY ordinal_position
               LIMIT 1"#,
        )
        .bind(&table.schema)
        .bind(&table.table)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VecscopeError::Database(format!("id column lookup for {table} failed: {e}")))?;
        Ok(row.map(|(name,)| name))
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub(crate) fn quote_ident(kind: &str, name: &str) -> Result<String> {
    validate_identifier(kind, name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// `"schema"."table"`, quoted.
pub(crate) fn qualified(table: &TableRef) -> Result<String> {
    Ok(format!(
        "{}.{}",
        quote_ident("schema", &table.schema)?,
        quote_ident("table", &table.table)?
    ))
}

fn decode_row(row: &PgRow) -> MetadataRow {
    row.columns()
        .iter()
        .map(|col| {
            let value = decode_value(row, col.ordinal(), col.name(), col.type_info().name());
            (col.name().to_string(), value)
        })
        .collect()
}

fn decode_value(row: &PgRow, i: usize, column: &str, type_name: &str) -> ScalarValue {
    let decoded: std::result::Result<Option<ScalarValue>, sqlx::Error> = match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(i)
            .map(|v| v.map(|n| f64::from(n).into())),
        "INT4" => row
            .try_get::<Option<i32>, _>(i)
            .map(|v| v.map(|n| f64::from(n).into())),
        "INT8" => row
            .try_get::<Option<i64>, _>(i)
            .map(|v| v.map(ScalarValue::from)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)
            .map(|v| v.map(|n| f64::from(n).into())),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(i)
            .map(|v| v.map(ScalarValue::from)),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(i)
            .map(|v| v.map(|d| d.to_string().into())),
        "BOOL" => row
            .try_get::<Option<bool>, _>(i)
            .map(|v| v.map(ScalarValue::from)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(i)
            .map(|v| v.map(ScalarValue::from)),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(i)
            .map(|v| v.map(|u| u.to_string().into())),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(i)
            .map(|v| v.map(|j| j.to_string().into())),
        "vector" => row
            .try_get::<Option<Vector>, _>(i)
            .map(|v| v.map(|vec| format_vector(vec.as_slice()).into())),
        other => {
            tracing::trace!(column, type_name = other, "no decoder for column type");
            Ok(None)
        }
    };

    match decoded {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(column, type_name, error = %e, "undecodable column value");
            ScalarValue::Null
        }
    }
}
