//! Schema, table and vector-column discovery.

use vecscope_core::{Result, TableRef, VecscopeError, VectorColumn};

use crate::row_source::{qualified, PgRowSource};

/// Vector-typed columns of a relation, with the access method of an index
/// covering each (alphabetically first when there are several).
const VECTOR_COLUMNS_SQL: &str = r#"
SELECT
    a.attname::text AS column_name,
    bool_or(c.oid IS NOT NULL) AS has_index,
    min(am.amname::text) AS index_type
FROM pg_attribute a
JOIN pg_type t ON a.atttypid = t.oid
LEFT JOIN pg_index i ON a.attnum = ANY(i.indkey) AND i.indrelid = a.attrelid
LEFT JOIN pg_class c ON i.indexrelid = c.oid
LEFT JOIN pg_am am ON c.relam = am.oid
WHERE a.attrelid = $1::text::regclass
  AND t.typname = 'vector'
  AND a.attnum > 0
  AND NOT a.attisdropped
GROUP BY a.attname, a.attnum
ORDER BY a.attnum
"#;

impl PgRowSource {
    /// Names of all schemas visible to the connected role.
    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT schema_name::text FROM information_schema.schemata ORDER BY schema_name",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| VecscopeError::Database(format!("listing schemas failed: {e}")))?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Names of the tables in `schema`.
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT table_name::text
               FROM information_schema.tables
               WHERE table_schema = $1
               ORDER BY table_name"#,
        )
        .bind(schema)
        .fetch_all(self.pool())
        .await
        .map_err(|e| VecscopeError::Database(format!("listing tables in {schema} failed: {e}")))?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Columns of `table` whose type is pgvector's `vector`, in column order.
    pub async fn list_vector_columns(&self, table: &TableRef) -> Result<Vec<VectorColumn>> {
        let rows: Vec<(String, Option<bool>, Option<String>)> = sqlx::query_as(VECTOR_COLUMNS_SQL)
            .bind(qualified(table)?)
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                VecscopeError::Database(format!("listing vector columns of {table} failed: {e}"))
            })?;

        let columns: Vec<VectorColumn> = rows
            .into_iter()
            .map(|(column_name, has_index, index_type)| VectorColumn {
                column_name,
                has_index: has_index.unwrap_or(false),
                index_type,
            })
            .collect();
        tracing::debug!(%table, columns = columns.len(), "vector columns listed");
        Ok(columns)
    }
}
