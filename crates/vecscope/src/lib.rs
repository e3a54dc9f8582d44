//! Vecscope: explore the embedding columns of a pgvector database.
//!
//! This crate re-exports the Vecscope sub-crates for convenient single-import usage.
//! Enable features to control which modules are available.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `stats`, `projection`, `pipeline` |
//! | `stats` | Cosine similarity, Pearson correlation, Student-t p-values |
//! | `projection` | `PcaProjector`, `CommandProjector`, `run_projection` |
//! | `pipeline` | `Explorer`, `RowSampler`, `CorrelationRanker`, `SessionManager` |
//! | `pgvector` | `PgRowSource` and catalog introspection over PostgreSQL |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vecscope::core::{SamplingRequest, TableRef};
//! use vecscope::pgvector::{PgConnectionConfig, PgRowSource};
//! use vecscope::pipeline::{Explorer, ExplorerConfig};
//!
//! let source = PgRowSource::connect(&PgConnectionConfig::default()).await?;
//! let explorer = Explorer::from_config(Arc::new(source), ExplorerConfig::default())?;
//! let request = explorer.sampling_request(TableRef::new("public", "items"), "embedding");
//! let points = explorer.projected_view(&request).await?;
//! ```

/// Core types and traits: RowSource, Projector, MetadataRow, VecscopeError, etc.
/// Always available.
pub use vecscope_core as core;

/// Similarity and significance math.
#[cfg(feature = "stats")]
pub use vecscope_stats as stats;

/// 2-D projectors and the projection runner.
#[cfg(feature = "projection")]
pub use vecscope_projection as projection;

/// Sampling, projection and correlation orchestration.
#[cfg(feature = "pipeline")]
pub use vecscope_pipeline as pipeline;

/// PostgreSQL + pgvector row source.
#[cfg(feature = "pgvector")]
pub use vecscope_pgvector as pgvector;

