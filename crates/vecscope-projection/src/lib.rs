//! 2-D projection of embedding batches.
//!
//! Two interchangeable [`Projector`]s are provided:
//!
//! - [`PcaProjector`]: in-process principal component analysis
//! - [`CommandProjector`]: an external reducer process (e.g. a UMAP script)
//!   spoken to through the flat text format in [`codec`]
//!
//! [`ProjectorConfig`] selects one at runtime, and [`run_projection`] wraps
//! any projector with the checks every caller needs: a timeout, and one
//! finite point per input vector.

pub mod codec;
mod command;
mod pca;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use vecscope_core::{EmbeddingVector, Point2, Result, VecscopeError};

pub use command::{CommandProjector, CommandProjectorConfig};
pub use pca::{PcaProjector, DEFAULT_PCA_ITERATIONS};
pub use vecscope_core::{ProjectionMode, Projector};

/// Which projector to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectorConfig {
    InProcess {
        #[serde(default = "default_iterations")]
        iterations: usize,
    },
    Command(CommandProjectorConfig),
}

fn default_iterations() -> usize {
    DEFAULT_PCA_ITERATIONS
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        ProjectorConfig::InProcess {
            iterations: DEFAULT_PCA_ITERATIONS,
        }
    }
}

impl ProjectorConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            ProjectorConfig::InProcess { iterations } if *iterations == 0 => Err(
                VecscopeError::Config("iterations must be greater than zero".to_string()),
            ),
            ProjectorConfig::Command(cmd) if cmd.program.trim().is_empty() => Err(
                VecscopeError::Config("reducer program must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Build the configured projector.
    pub fn build(&self) -> Result<Arc<dyn Projector>> {
        self.validate()?;
        Ok(match self {
            ProjectorConfig::InProcess { iterations } => {
                Arc::new(PcaProjector::with_iterations(*iterations))
            }
            ProjectorConfig::Command(cmd) => Arc::new(CommandProjector::new(cmd.clone())),
        })
    }
}

/// Invoke `projector` and validate what comes back.
///
/// An empty batch returns no points without invoking the projector. Any
/// projector error, an elapsed `timeout`, an empty or mismatched result, or
/// a non-finite coordinate becomes [`VecscopeError::ProjectionFailed`].
pub async fn run_projection(
    projector: &dyn Projector,
    vectors: &[EmbeddingVector],
    center: Option<&EmbeddingVector>,
    timeout: Duration,
) -> Result<Vec<Point2>> {
    if vectors.is_empty() {
        return Ok(Vec::new());
    }

    let started = Instant::now();
    let points = match tokio::time::timeout(timeout, projector.project(vectors, center)).await {
        Err(_) => {
            return Err(VecscopeError::ProjectionFailed(format!(
                "reducer timed out after {timeout:?}"
            )))
        }
        Ok(Err(VecscopeError::ProjectionFailed(msg))) => {
            return Err(VecscopeError::ProjectionFailed(msg))
        }
        Ok(Err(e)) => return Err(VecscopeError::ProjectionFailed(e.to_string())),
        Ok(Ok(points)) => points,
    };

    if points.is_empty() {
        return Err(VecscopeError::ProjectionFailed(
            "reducer returned no points".to_string(),
        ));
    }
    if points.len() != vectors.len() {
        return Err(VecscopeError::ProjectionFailed(format!(
            "reducer returned {} points for {} vectors",
            points.len(),
            vectors.len()
        )));
    }
    if let Some(i) = points
        .iter()
        .position(|p| !p[0].is_finite() || !p[1].is_finite())
    {
        return Err(VecscopeError::ProjectionFailed(format!(
            "reducer returned a non-finite coordinate at index {i}"
        )));
    }

    tracing::debug!(
        points = points.len(),
        mode = ?ProjectionMode::for_center(center),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "projection finished"
    );
    Ok(points)
}
