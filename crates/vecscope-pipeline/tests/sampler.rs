use vecscope_core::{MetadataRow, TableRef, VecscopeError};
use vecscope_pipeline::{InMemoryRowSource, RowSampler};

fn table() -> TableRef {
    TableRef::new("public", "items")
}

async fn source_with_rows(seed: u64, n: usize) -> InMemoryRowSource {
    let source = InMemoryRowSource::with_seed(seed);
    let rows = (0..n)
        .map(|i| {
            MetadataRow::new()
                .with("id", format!("row-{i}"))
                .with("embedding", "[1,0]")
        })
        .collect();
    source.add_table(table(), rows, Some("id")).await;
    source
}

#[tokio::test]
async fn oversampling_almost_always_reaches_target() {
    let source = source_with_rows(42, 1000).await;
    let sampler = RowSampler::default();

    let mut short = 0;
    for _ in 0..200 {
        let rows = sampler
            .sample(&source, &table(), "embedding", 100)
            .await
            .unwrap();
        assert!(rows.len() <= 100);
        if rows.len() < 100 {
            short += 1;
        }
    }
    assert!(short <= 2, "{short} of 200 samples came up short");
}

#[tokio::test]
async fn small_table_is_returned_whole() {
    let source = source_with_rows(1, 4).await;
    let rows = RowSampler::default()
        .sample(&source, &table(), "embedding", 4)
        .await
        .unwrap();
    let ids: Vec<&str> = rows
        .iter()
        .filter_map(|r| r.get("id").and_then(|v| v.as_text()))
        .collect();
    assert_eq!(ids, vec!["row-0", "row-1", "row-2", "row-3"]);
}

#[tokio::test]
async fn target_above_table_size_returns_every_row() {
    let source = source_with_rows(3, 10).await;
    let rows = RowSampler::default()
        .sample(&source, &table(), "embedding", 50)
        .await
        .unwrap();
    assert_eq!(rows.len(), 10);
}

#[tokio::test]
async fn empty_table_fails() {
    let source = source_with_rows(0, 0).await;
    for _ in 0..3 {
        let err = RowSampler::default()
            .sample(&source, &table(), "embedding", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, VecscopeError::EmptyTable { ref table } if table == "public.items"));
    }
}

#[tokio::test]
async fn missing_table_surfaces_source_error() {
    let source = InMemoryRowSource::new();
    let err = RowSampler::default()
        .sample(&source, &table(), "embedding", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, VecscopeError::Database(_)));
}
