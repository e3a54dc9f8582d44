//! Sampling, projection and correlation pipeline for Vecscope.
//!
//! [`Explorer`] is the entry point. It draws an approximate random sample
//! from a [`RowSource`](vecscope_core::RowSource) through [`RowSampler`],
//! hands the embeddings to a [`Projector`](vecscope_core::Projector), and
//! ranks metadata columns against similarity with [`CorrelationRanker`].
//! [`SessionManager`] keeps one explorer per open database.

mod config;
mod explorer;
mod memory;
mod ranker;
mod sampler;
mod session;

pub use config::{
    ExplorerConfig, ExplorerConfigBuilder, DEFAULT_PROJECTION_TIMEOUT, DEFAULT_SAMPLE_LIMIT,
};
pub use explorer::Explorer;
pub use memory::InMemoryRowSource;
pub use ranker::{CorrelationRanker, DEFAULT_TOP_CORRELATIONS};
pub use sampler::{RowSampler, DEFAULT_OVERSAMPLE_FACTOR};
pub use session::SessionManager;
