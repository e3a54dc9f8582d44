use std::sync::Arc;
use std::time::Instant;

use vecscope_core::{
    validate_identifier, CorrelationRequest, CorrelationResult, EmbeddingVector, MetadataRow,
    ProjectedPoint, Projector, Result, RowSource, SampledPoint, SamplingRequest, TableRef,
    VecscopeError,
};
use vecscope_projection::run_projection;

use crate::config::ExplorerConfig;
use crate::ranker::CorrelationRanker;
use crate::sampler::RowSampler;

/// Answers the two questions a caller asks about an embedding table: where do
/// its rows land in 2-D, and which metadata columns track similarity to a
/// given row.
///
/// Every call is independent; the explorer holds no per-request state, so a
/// shared `Arc<Explorer>` can serve concurrent requests.
pub struct Explorer {
    source: Arc<dyn RowSource>,
    projector: Arc<dyn Projector>,
    config: ExplorerConfig,
    sampler: RowSampler,
    ranker: CorrelationRanker,
}

impl Explorer {
    /// Create an explorer with the default configuration.
    pub fn new(source: Arc<dyn RowSource>, projector: Arc<dyn Projector>) -> Self {
        Self::assemble(source, projector, ExplorerConfig::default())
    }

    /// Create an explorer with an explicit configuration.
    ///
    /// The projector in `config.projector` is ignored in favour of `projector`.
    pub fn with_config(
        source: Arc<dyn RowSource>,
        projector: Arc<dyn Projector>,
        config: ExplorerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(source, projector, config))
    }

    /// Create an explorer whose projector is built from `config.projector`.
    pub fn from_config(source: Arc<dyn RowSource>, config: ExplorerConfig) -> Result<Self> {
        config.validate()?;
        let projector = config.projector.build()?;
        Ok(Self::assemble(source, projector, config))
    }

    fn assemble(
        source: Arc<dyn RowSource>,
        projector: Arc<dyn Projector>,
        config: ExplorerConfig,
    ) -> Self {
        Self {
            sampler: RowSampler::new(config.oversample_factor),
            ranker: CorrelationRanker::new(config.top_correlations),
            source,
            projector,
            config,
        }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn source(&self) -> &Arc<dyn RowSource> {
        &self.source
    }

    pub fn projector(&self) -> &Arc<dyn Projector> {
        &self.projector
    }

    /// A request for the configured default number of rows.
    pub fn sampling_request(
        &self,
        table: TableRef,
        vector_column: impl Into<String>,
    ) -> SamplingRequest {
        SamplingRequest::new(table, vector_column, self.config.default_sample_limit)
    }

    /// The column that uniquely identifies rows of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`VecscopeError::MissingIdentityColumn`] if the table has none.
    pub async fn identity_column(&self, table: &TableRef) -> Result<String> {
        self.source
            .find_id_column(table)
            .await?
            .ok_or_else(|| VecscopeError::MissingIdentityColumn {
                table: table.to_string(),
            })
    }

    /// Sample the table and project the sampled embeddings to 2-D.
    ///
    /// Points come back in sampling order, each carrying the row's remaining
    /// columns. With `center_row_id` set, the projection is biased towards
    /// that row's embedding.
    ///
    /// # Errors
    ///
    /// - [`VecscopeError::Validation`] for an empty identifier or a zero target count
    /// - [`VecscopeError::MissingIdentityColumn`] if rows cannot be identified
    /// - [`VecscopeError::NotFound`] if the center row does not exist
    /// - [`VecscopeError::EmptyTable`] if there is nothing to sample
    /// - [`VecscopeError::LengthMismatch`] if the embeddings disagree on dimensionality
    /// - [`VecscopeError::ProjectionFailed`] if the projector fails or misbehaves
    pub async fn projected_view(&self, request: &SamplingRequest) -> Result<Vec<ProjectedPoint>> {
        let started = Instant::now();
        let table = &request.table;
        let vector_column = request.vector_column.as_str();
        table.validate()?;
        validate_identifier("column", vector_column)?;
        if request.target_count == 0 {
            return Err(VecscopeError::Validation(
                "target count must be greater than zero".to_string(),
            ));
        }

        let id_column = self.identity_column(table).await?;

        let center = match request.center_row_id.as_deref() {
            Some(id) => Some(
                self.fetch_vector(table, vector_column, &id_column, id)
                    .await?,
            ),
            None => None,
        };

        let rows = self
            .sampler
            .sample(self.source.as_ref(), table, vector_column, request.target_count)
            .await?;
        let sampled = split_rows(rows, vector_column, &id_column);
        if sampled.is_empty() {
            return Ok(Vec::new());
        }
        check_dimensions(&sampled, center.as_ref())?;

        let (vectors, rest): (Vec<EmbeddingVector>, Vec<(String, MetadataRow)>) = sampled
            .into_iter()
            .map(|p| (p.vector, (p.row_id, p.metadata)))
            .unzip();

        let coords = run_projection(
            self.projector.as_ref(),
            &vectors,
            center.as_ref(),
            self.config.projection_timeout,
        )
        .await?;

        let points: Vec<ProjectedPoint> = coords
            .into_iter()
            .zip(rest)
            .enumerate()
            .map(|(index, ([x, y], (row_id, metadata)))| ProjectedPoint {
                x,
                y,
                index,
                row_id,
                metadata,
            })
            .collect();

        tracing::info!(
            %table,
            column = vector_column,
            points = points.len(),
            centered = center.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "projected view ready"
        );
        Ok(points)
    }

    /// Rank the metadata columns of the candidate rows by how strongly they
    /// correlate with similarity to the reference row.
    ///
    /// # Errors
    ///
    /// - [`VecscopeError::MissingIdentityColumn`] if rows cannot be identified
    /// - [`VecscopeError::NotFound`] if the reference row does not exist
    /// - [`VecscopeError::LengthMismatch`] if a candidate's dimensionality differs
    pub async fn correlations_for_point(
        &self,
        request: &CorrelationRequest,
    ) -> Result<Vec<CorrelationResult>> {
        let table = &request.table;
        let vector_column = request.vector_column.as_str();
        table.validate()?;
        validate_identifier("column", vector_column)?;

        let id_column = self.identity_column(table).await?;
        let reference = self
            .fetch_vector(table, vector_column, &id_column, &request.reference_id)
            .await?;

        let rows = self
            .source
            .fetch_rows(table, &id_column, &request.candidate_ids)
            .await?;
        let candidates = split_rows(rows, vector_column, &id_column);

        let results = self.ranker.rank(&reference, &candidates)?;
        tracing::info!(
            %table,
            reference = %request.reference_id,
            candidates = candidates.len(),
            results = results.len(),
            "correlations ranked"
        );
        Ok(results)
    }

    async fn fetch_vector(
        &self,
        table: &TableRef,
        vector_column: &str,
        id_column: &str,
        id: &str,
    ) -> Result<EmbeddingVector> {
        let row = self
            .source
            .fetch_row(table, id_column, id)
            .await?
            .ok_or_else(|| VecscopeError::NotFound { id: id.to_string() })?;
        let value = row.get(vector_column).ok_or_else(|| {
            VecscopeError::Validation(format!("column {vector_column} not found in {table}"))
        })?;
        EmbeddingVector::parse(value)
    }
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Split rows into embedding and metadata, dropping rows without a usable
/// vector or identifier.
fn split_rows(rows: Vec<MetadataRow>, vector_column: &str, id_column: &str) -> Vec<SampledPoint> {
    let total = rows.len();
    let mut points = Vec::with_capacity(total);

    for mut row in rows {
        let Some(row_id) = row.get(id_column).and_then(|v| v.to_id_string()) else {
            tracing::warn!(id_column, "excluding row without an identifier");
            continue;
        };
        let raw = row.remove(vector_column).unwrap_or_default();
        match EmbeddingVector::parse(&raw) {
            Ok(vector) => points.push(SampledPoint {
                row_id,
                vector,
                metadata: row,
            }),
            Err(e) => tracing::warn!(%row_id, error = %e, "excluding row with unusable vector"),
        }
    }

    if points.len() < total {
        tracing::debug!(kept = points.len(), total, "rows excluded before projection");
    }
    points
}

fn check_dimensions(points: &[SampledPoint], center: Option<&EmbeddingVector>) -> Result<()> {
    let Some(expected) = center
        .map(EmbeddingVector::dimensions)
        .or_else(|| points.first().map(|p| p.vector.dimensions()))
    else {
        return Ok(());
    };
    match points.iter().find(|p| p.vector.dimensions() != expected) {
        Some(p) => Err(VecscopeError::LengthMismatch {
            left: expected,
            right: p.vector.dimensions(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, vector: &str) -> MetadataRow {
        MetadataRow::new()
            .with("id", id)
            .with("embedding", vector)
            .with("score", 1.0)
    }

    #[test]
    fn split_removes_vector_column() {
        let points = split_rows(vec![row("a", "[1,2]")], "embedding", "id");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].row_id, "a");
        assert_eq!(points[0].vector.as_slice(), &[1.0, 2.0]);
        assert!(!points[0].metadata.contains("embedding"));
        assert!(points[0].metadata.contains("score"));
    }

    #[test]
    fn split_drops_unusable_rows() {
        let rows = vec![
            row("a", "[1,2]"),
            row("b", "garbage"),
            MetadataRow::new().with("embedding", "[1,2]"),
            MetadataRow::new().with("id", "c"),
        ];
        let points = split_rows(rows, "embedding", "id");
        let ids: Vec<&str> = points.iter().map(|p| p.row_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn dimensions_must_agree() {
        let points = split_rows(
            vec![row("a", "[1,2]"), row("b", "[1,2,3]")],
            "embedding",
            "id",
        );
        assert!(matches!(
            check_dimensions(&points, None),
            Err(VecscopeError::LengthMismatch { left: 2, right: 3 })
        ));

        let points = split_rows(vec![row("a", "[1,2]")], "embedding", "id");
        let center = EmbeddingVector::new(vec![1.0, 2.0, 3.0]).unwrap();
        assert!(check_dimensions(&points, Some(&center)).is_err());
        assert!(check_dimensions(&[], Some(&center)).is_ok());
    }
}
