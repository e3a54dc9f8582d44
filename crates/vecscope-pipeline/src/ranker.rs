use vecscope_core::{numeric_values, CorrelationResult, EmbeddingVector, Result, SampledPoint};
use vecscope_stats::{correlation_p_value, cosine_similarity, pearson_correlation};

/// Default number of correlations returned per point.
pub const DEFAULT_TOP_CORRELATIONS: usize = 5;

/// Ranks metadata columns by how strongly they track similarity to a
/// reference embedding.
///
/// For every column whose values are numeric on all candidates, the Pearson
/// correlation between the column and the candidates' cosine similarity to
/// the reference is computed, together with its two-tailed p-value. Columns
/// with any non-numeric value are skipped entirely.
#[derive(Debug, Clone)]
pub struct CorrelationRanker {
    top_k: usize,
}

impl CorrelationRanker {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The `top_k` strongest correlations, ordered by descending `|r|`.
    ///
    /// Columns are taken from the first candidate. An empty candidate list
    /// or a row set without numeric columns yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`VecscopeError::LengthMismatch`](vecscope_core::VecscopeError::LengthMismatch)
    /// if a candidate's dimensionality differs from the reference's.
    pub fn rank(
        &self,
        reference: &EmbeddingVector,
        candidates: &[SampledPoint],
    ) -> Result<Vec<CorrelationResult>> {
        let Some(first) = candidates.first() else {
            return Ok(Vec::new());
        };

        let similarities = candidates
            .iter()
            .map(|c| cosine_similarity(reference.as_slice(), c.vector.as_slice()))
            .collect::<Result<Vec<f64>>>()?;

        let mut results = Vec::new();
        for column in first.metadata.columns() {
            let Some(values) = numeric_values(candidates.iter().map(|c| c.metadata.get(column)))
            else {
                tracing::trace!(column, "skipping non-numeric column");
                continue;
            };

            let correlation = pearson_correlation(&similarities, &values)?;
            results.push(CorrelationResult {
                column: column.to_string(),
                correlation,
                p_value: correlation_p_value(correlation, values.len()),
            });
        }

        results.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
        results.truncate(self.top_k);
        Ok(results)
    }
}

impl Default for CorrelationRanker {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_CORRELATIONS)
    }
}
