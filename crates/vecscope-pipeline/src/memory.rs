use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;
use vecscope_core::{MetadataRow, Result, RowSource, TableRef, VecscopeError};

struct StoredTable {
    rows: Vec<MetadataRow>,
    id_column: Option<String>,
}

/// A [`RowSource`] over tables held in memory.
///
/// Bernoulli sampling draws from a seedable RNG, so a source built with
/// [`with_seed`](Self::with_seed) yields reproducible samples.
pub struct InMemoryRowSource {
    tables: RwLock<HashMap<TableRef, StoredTable>>,
    rng: Mutex<StdRng>,
}

impl InMemoryRowSource {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    /// Add (or replace) a table. `id_column` names the identity column, if any.
    pub async fn add_table(
        &self,
        table: TableRef,
        rows: Vec<MetadataRow>,
        id_column: Option<&str>,
    ) {
        self.tables.write().await.insert(
            table,
            StoredTable {
                rows,
                id_column: id_column.map(str::to_string),
            },
        );
    }

    fn missing(table: &TableRef) -> VecscopeError {
        VecscopeError::Database(format!("relation {table} does not exist"))
    }
}

impl Default for InMemoryRowSource {
    fn default() -> Self {
        Self::new()
    }
}

fn id_matches(row: &MetadataRow, id_column: &str, id: &str) -> bool {
    row.get(id_column)
        .and_then(|v| v.to_id_string())
        .is_some_and(|v| v == id)
}

#[async_trait]
impl RowSource for InMemoryRowSource {
    async fn count(&self, table: &TableRef) -> Result<u64> {
        let tables = self.tables.read().await;
        let stored = tables.get(table).ok_or_else(|| Self::missing(table))?;
        Ok(stored.rows.len() as u64)
    }

    async fn sample_approx(
        &self,
        table: &TableRef,
        _vector_column: &str,
        percent: f64,
        limit: usize,
    ) -> Result<Vec<MetadataRow>> {
        let tables = self.tables.read().await;
        let stored = tables.get(table).ok_or_else(|| Self::missing(table))?;
        let probability = (percent / 100.0).clamp(0.0, 1.0);

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Ok(stored
            .rows
            .iter()
            .filter(|_| rng.gen::<f64>() < probability)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_row(
        &self,
        table: &TableRef,
        id_column: &str,
        id: &str,
    ) -> Result<Option<MetadataRow>> {
        let tables = self.tables.read().await;
        let stored = tables.get(table).ok_or_else(|| Self::missing(table))?;
        Ok(stored
            .rows
            .iter()
            .find(|row| id_matches(row, id_column, id))
            .cloned())
    }

    async fn fetch_rows(
        &self,
        table: &TableRef,
        id_column: &str,
        ids: &[String],
    ) -> Result<Vec<MetadataRow>> {
        let tables = self.tables.read().await;
        let stored = tables.get(table).ok_or_else(|| Self::missing(table))?;
        Ok(stored
            .rows
            .iter()
            .filter(|row| ids.iter().any(|id| id_matches(row, id_column, id)))
            .cloned()
            .collect())
    }

    async fn find_id_column(&self, table: &TableRef) -> Result<Option<String>> {
        let tables = self.tables.read().await;
        let stored = tables.get(table).ok_or_else(|| Self::missing(table))?;
        Ok(stored.id_column.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableRef {
        TableRef::new("public", "items")
    }

    async fn source(n: usize) -> InMemoryRowSource {
        let source = InMemoryRowSource::with_seed(7);
        let rows = (0..n)
            .map(|i| MetadataRow::new().with("id", format!("row-{i}")))
            .collect();
        source.add_table(table(), rows, Some("id")).await;
        source
    }

    #[tokio::test]
    async fn full_percentage_keeps_every_row() {
        let source = source(20).await;
        let rows = source.sample_approx(&table(), "v", 100.0, 50).await.unwrap();
        assert_eq!(rows.len(), 20);
        let none = source.sample_approx(&table(), "v", 0.0, 50).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn sampling_honours_limit() {
        let source = source(20).await;
        let rows = source.sample_approx(&table(), "v", 100.0, 5).await.unwrap();
        assert_eq!(rows.len(), 5);
    }

    #[tokio::test]
    async fn same_seed_same_sample() {
        let a = source(200).await;
        let b = source(200).await;
        let ra = a.sample_approx(&table(), "v", 30.0, 200).await.unwrap();
        let rb = b.sample_approx(&table(), "v", 30.0, 200).await.unwrap();
        assert_eq!(ra, rb);
    }

    #[tokio::test]
    async fn fetch_by_id() {
        let source = source(5).await;
        let row = source.fetch_row(&table(), "id", "row-3").await.unwrap();
        assert_eq!(row.unwrap().get("id").and_then(|v| v.as_text()), Some("row-3"));
        assert!(source
            .fetch_row(&table(), "id", "row-9")
            .await
            .unwrap()
            .is_none());

        let rows = source
            .fetch_rows(&table(), "id", &["row-4".into(), "row-0".into(), "nope".into()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn unknown_table_is_a_database_error() {
        let source = InMemoryRowSource::new();
        assert!(matches!(
            source.count(&table()).await,
            Err(VecscopeError::Database(_))
        ));
    }
}
