//! PostgreSQL + pgvector row source for Vecscope.
//!
//! [`PgRowSource`] implements [`RowSource`](vecscope_core::RowSource) over a
//! `sqlx` pool: row counts, `TABLESAMPLE BERNOULLI` sampling, lookups by a
//! `uuid` identity column, and catalog introspection for picking a schema,
//! table and vector column.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use vecscope_core::{RowSource, TableRef};
//! use vecscope_pgvector::{PgConnectionConfig, PgRowSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PgConnectionConfig::new("localhost", 5432, "postgres", "password", "postgres");
//! let source = PgRowSource::connect(&config).await?;
//! source.ping().await?;
//!
//! let table = TableRef::new("public", "items");
//! for column in source.list_vector_columns(&table).await? {
//!     println!("{} (indexed: {})", column.column_name, column.has_index);
//! }
//! let rows = source.count(&table).await?;
//! # Ok(())
//! # }
//! ```

mod catalog;
mod config;
mod row_source;

pub use config::PgConnectionConfig;
pub use row_source::PgRowSource;
