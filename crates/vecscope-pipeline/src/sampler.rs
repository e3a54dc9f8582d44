use vecscope_core::{MetadataRow, Result, RowSource, TableRef, VecscopeError};

/// Default over-draw of the Bernoulli sample relative to the target count.
pub const DEFAULT_OVERSAMPLE_FACTOR: f64 = 1.5;

/// Draws an approximately uniform random subset of a table's rows.
///
/// Rather than scanning and shuffling the whole table, the sampler asks the
/// source for a Bernoulli sample at `target * oversample_factor / total`
/// and truncates the result to the target. Over-drawing makes it very likely
/// that at least `target` rows survive; when the draw still comes up short
/// the smaller sample is returned as-is.
#[derive(Debug, Clone)]
pub struct RowSampler {
    oversample_factor: f64,
}

impl RowSampler {
    pub fn new(oversample_factor: f64) -> Self {
        Self { oversample_factor }
    }

    pub fn oversample_factor(&self) -> f64 {
        self.oversample_factor
    }

    /// Fraction of rows (0..=1) to request for `target` out of `total`.
    pub fn sample_fraction(&self, target: usize, total: u64) -> f64 {
        if total == 0 {
            return 1.0;
        }
        (target as f64 * self.oversample_factor / total as f64).min(1.0)
    }

    /// Sample up to `target` rows of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`VecscopeError::EmptyTable`] if the table has no rows; source
    /// errors are passed through.
    pub async fn sample(
        &self,
        source: &dyn RowSource,
        table: &TableRef,
        vector_column: &str,
        target: usize,
    ) -> Result<Vec<MetadataRow>> {
        let total = source.count(table).await?;
        if total == 0 {
            return Err(VecscopeError::EmptyTable {
                table: table.to_string(),
            });
        }

        let percent = self.sample_fraction(target, total) * 100.0;
        let mut rows = source
            .sample_approx(table, vector_column, percent, target)
            .await?;
        rows.truncate(target);

        if rows.len() < target {
            tracing::debug!(
                %table,
                total,
                target,
                sampled = rows.len(),
                percent,
                "bernoulli sample came up short"
            );
        }

        Ok(rows)
    }
}

impl Default for RowSampler {
    fn default() -> Self {
        Self::new(DEFAULT_OVERSAMPLE_FACTOR)
    }
}
