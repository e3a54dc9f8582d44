//! Core types and traits for Vecscope.
//!
//! Everything the sampling, projection and correlation crates exchange lives
//! here: the tagged [`ScalarValue`] / [`MetadataRow`] representation of SQL
//! rows, [`EmbeddingVector`], the request and result payloads, the unified
//! [`VecscopeError`], and the two capability traits implemented by external
//! collaborators: [`RowSource`] (the database) and [`Projector`] (the
//! dimensionality-reduction procedure).

use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ScalarValue
// ---------------------------------------------------------------------------

/// A single column value of a sampled row.
///
/// SQL results are heterogeneous, so every cell is reduced to one of four
/// tagged shapes. Serializes untagged, i.e. as the plain JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ScalarValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric reading of the value, if it has one.
    ///
    /// Numbers are taken as-is; strings qualify when their trimmed form
    /// parses completely as a finite float. Booleans and nulls never do.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) if n.is_finite() => Some(*n),
            ScalarValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Render the value as a row identifier, if it can be one.
    pub fn to_id_string(&self) -> Option<String> {
        match self {
            ScalarValue::Text(s) => Some(s.clone()),
            ScalarValue::Number(n) => Some(n.to_string()),
            ScalarValue::Bool(_) | ScalarValue::Null => None,
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Number(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Number(value as f64)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ScalarValue::Null)
    }
}

/// Collect a column into numbers, or `None` if any value is not numeric.
///
/// A missing value (`None`) disqualifies the column just like a
/// non-numeric one; values are never coerced to zero.
pub fn numeric_values<'a, I>(values: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = Option<&'a ScalarValue>>,
{
    values
        .into_iter()
        .map(|v| v.and_then(ScalarValue::as_numeric))
        .collect()
}

// ---------------------------------------------------------------------------
// MetadataRow
// ---------------------------------------------------------------------------

/// An ordered, string-keyed bag of column values for one row.
///
/// Column order follows the order the data source returned them in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRow(IndexMap<String, ScalarValue>);

impl MetadataRow {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<ScalarValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.0.get(column)
    }

    /// Remove a column, keeping the relative order of the others.
    pub fn remove(&mut self, column: &str) -> Option<ScalarValue> {
        self.0.shift_remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ScalarValue>> FromIterator<(K, V)> for MetadataRow {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// EmbeddingVector
// ---------------------------------------------------------------------------

/// One row's embedding, parsed from its stored representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Wrap already-decoded components, rejecting non-finite entries.
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(VecscopeError::InvalidVector(format!(
                "component {pos} is not a finite number"
            )));
        }
        Ok(Self(values))
    }

    /// Parse a stored vector value.
    ///
    /// pgvector's text form (`[1,2,3]`) is a JSON array, which is what the
    /// data sources hand over as [`ScalarValue::Text`].
    pub fn parse(value: &ScalarValue) -> Result<Self> {
        match value {
            ScalarValue::Text(raw) => Self::parse_str(raw),
            other => Err(VecscopeError::InvalidVector(format!(
                "expected a string-encoded array, got {other:?}"
            ))),
        }
    }

    pub fn parse_str(raw: &str) -> Result<Self> {
        let values: Vec<f64> = serde_json::from_str(raw.trim())
            .map_err(|e| VecscopeError::InvalidVector(format!("unparsable vector: {e}")))?;
        Self::new(values.into_iter().map(|v| v as f32).collect())
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Render a vector the way pgvector prints it (`[1,2,3]`).
pub fn format_vector(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

// ---------------------------------------------------------------------------
// Table addressing and requests
// ---------------------------------------------------------------------------

/// A schema-qualified table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Reject names that can never be valid identifiers.
    pub fn validate(&self) -> Result<()> {
        validate_identifier("schema", &self.schema)?;
        validate_identifier("table", &self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Check that an identifier is non-empty and free of NUL bytes.
///
/// Quoting is the data source's job; this only rules out names no quoting
/// can express.
pub fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VecscopeError::Validation(format!("{kind} name must not be empty")));
    }
    if name.contains('\0') {
        return Err(VecscopeError::Validation(format!(
            "{kind} name '{}' contains a NUL byte",
            name.replace('\0', "\\0")
        )));
    }
    Ok(())
}

/// Parameters of a projected-view request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingRequest {
    pub table: TableRef,
    pub vector_column: String,
    pub target_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_row_id: Option<String>,
}

impl SamplingRequest {
    pub fn new(table: TableRef, vector_column: impl Into<String>, target_count: usize) -> Self {
        Self {
            table,
            vector_column: vector_column.into(),
            target_count,
            center_row_id: None,
        }
    }

    /// Re-center the view on the row with this identifier.
    pub fn centered_on(mut self, row_id: impl Into<String>) -> Self {
        self.center_row_id = Some(row_id.into());
        self
    }
}

/// Parameters of a correlation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationRequest {
    pub table: TableRef,
    pub vector_column: String,
    pub reference_id: String,
    pub candidate_ids: Vec<String>,
}

impl CorrelationRequest {
    pub fn new(
        table: TableRef,
        vector_column: impl Into<String>,
        reference_id: impl Into<String>,
        candidate_ids: Vec<String>,
    ) -> Self {
        Self {
            table,
            vector_column: vector_column.into(),
            reference_id: reference_id.into(),
            candidate_ids,
        }
    }
}

// ---------------------------------------------------------------------------
// Points and results
// ---------------------------------------------------------------------------

/// A 2-D coordinate produced by a [`Projector`].
pub type Point2 = [f64; 2];

/// A row split into its embedding and the rest of its columns.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledPoint {
    pub row_id: String,
    pub vector: EmbeddingVector,
    pub metadata: MetadataRow,
}

/// A projected coordinate with the metadata of the row it came from.
///
/// `index` is the position of the source row in the projected batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub index: usize,
    pub row_id: String,
    pub metadata: MetadataRow,
}

/// Correlation between one metadata column and similarity to a reference row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationResult {
    pub column: String,
    pub correlation: f64,
    pub p_value: f64,
}

/// Which reduction the projector is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    Plain,
    Centered,
}

impl ProjectionMode {
    pub fn for_center(center: Option<&EmbeddingVector>) -> Self {
        if center.is_some() {
            ProjectionMode::Centered
        } else {
            ProjectionMode::Plain
        }
    }
}

/// A vector-typed column discovered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorColumn {
    pub column_name: String,
    pub has_index: bool,
    pub index_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for the sampling, projection and correlation core.
#[derive(Debug, Error)]
pub enum VecscopeError {
    #[error("the table {table} is empty, no rows to sample")]
    EmptyTable { table: String },
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error(
        "no unique identifier column found for {table}; add a uuid column to enable centering and correlations"
    )]
    MissingIdentityColumn { table: String },
    #[error("no row found for id {id}")]
    NotFound { id: String },
    #[error("projection failed: {0}")]
    ProjectionFailed(String),
    #[error("invalid vector: {0}")]
    InvalidVector(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, VecscopeError>;

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Read-only access to the rows of embedding tables.
///
/// Rows come back as [`MetadataRow`]s that still contain the vector column,
/// encoded as text. Implementations never write.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Total number of rows in the table.
    async fn count(&self, table: &TableRef) -> Result<u64>;

    /// Bernoulli sample: each row kept independently with probability
    /// `percent / 100`, at most `limit` rows returned.
    async fn sample_approx(
        &self,
        table: &TableRef,
        vector_column: &str,
        percent: f64,
        limit: usize,
    ) -> Result<Vec<MetadataRow>>;

    /// The row whose `id_column` equals `id`, if any.
    async fn fetch_row(
        &self,
        table: &TableRef,
        id_column: &str,
        id: &str,
    ) -> Result<Option<MetadataRow>>;

    /// All rows whose `id_column` is one of `ids`.
    async fn fetch_rows(
        &self,
        table: &TableRef,
        id_column: &str,
        ids: &[String],
    ) -> Result<Vec<MetadataRow>>;

    /// Name of a column holding a unique per-row identifier, if the table has one.
    async fn find_id_column(&self, table: &TableRef) -> Result<Option<String>>;
}

/// Dimensionality reduction to 2-D.
///
/// With a `center`, proximity to it in the original space should show up
/// as proximity to the origin in the output. The output must have one point
/// per input vector, in input order.
#[async_trait]
pub trait Projector: Send + Sync {
    async fn project(
        &self,
        vectors: &[EmbeddingVector],
        center: Option<&EmbeddingVector>,
    ) -> Result<Vec<Point2>>;
}
