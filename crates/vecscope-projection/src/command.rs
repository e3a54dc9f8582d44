use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::process::Command;
use vecscope_core::{EmbeddingVector, Point2, ProjectionMode, Projector, Result, VecscopeError};

use crate::codec::{parse_points, serialize_center, serialize_vectors};

/// How to launch an external reducer.
///
/// The reducer is invoked as
/// `program <mode args...> <vectors file> [<center>]`, where the mode args
/// are `plain_args` or `centered_args` and the center is comma-separated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandProjectorConfig {
    pub program: String,
    #[serde(default)]
    pub plain_args: Vec<String>,
    #[serde(default)]
    pub centered_args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl CommandProjectorConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            plain_args: Vec::new(),
            centered_args: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
        }
    }

    /// Reducer scripts run with a Python interpreter, one script per mode.
    pub fn python(
        interpreter: impl Into<String>,
        plain_script: impl Into<String>,
        centered_script: impl Into<String>,
    ) -> Self {
        Self::new(interpreter)
            .with_plain_args(vec!["-u".to_string(), plain_script.into()])
            .with_centered_args(vec!["-u".to_string(), centered_script.into()])
    }

    pub fn with_plain_args(mut self, args: Vec<String>) -> Self {
        self.plain_args = args;
        self
    }

    pub fn with_centered_args(mut self, args: Vec<String>) -> Self {
        self.centered_args = args;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn args_for(&self, mode: ProjectionMode) -> &[String] {
        match mode {
            ProjectionMode::Plain => &self.plain_args,
            ProjectionMode::Centered => &self.centered_args,
        }
    }
}

/// A [`Projector`] that runs an external reducer process per request.
///
/// Input vectors are written to a temporary file; the points are read from
/// the process's standard output. The child is killed if the request is
/// dropped (e.g. on timeout) and the temporary file is always removed.
pub struct CommandProjector {
    config: CommandProjectorConfig,
}

impl CommandProjector {
    pub fn new(config: CommandProjectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CommandProjectorConfig {
        &self.config
    }
}

/// Write `contents` to a fresh `vectors_*.txt` file, deleted when dropped.
async fn write_input(contents: String) -> Result<NamedTempFile> {
    let input = tempfile::Builder::new()
        .prefix("vectors_")
        .suffix(".txt")
        .tempfile()
        .map_err(|e| {
            VecscopeError::ProjectionFailed(format!("failed to create reducer input: {e}"))
        })?;
    tokio::fs::write(input.path(), contents).await.map_err(|e| {
        VecscopeError::ProjectionFailed(format!(
            "failed to write reducer input {}: {e}",
            input.path().display()
        ))
    })?;
    Ok(input)
}

#[async_trait]
impl Projector for CommandProjector {
    async fn project(
        &self,
        vectors: &[EmbeddingVector],
        center: Option<&EmbeddingVector>,
    ) -> Result<Vec<Point2>> {
        let mode = ProjectionMode::for_center(center);
        let input = write_input(serialize_vectors(vectors)).await?;

        let mut command = Command::new(&self.config.program);
        command
            .args(self.config.args_for(mode))
            .arg(input.path())
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(center) = center {
            command.arg(serialize_center(center));
        }
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!(
            program = %self.config.program,
            ?mode,
            vectors = vectors.len(),
            "running external reducer"
        );

        let output = command.output().await.map_err(|e| {
            VecscopeError::ProjectionFailed(format!(
                "failed to spawn reducer '{}': {e}",
                self.config.program
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VecscopeError::ProjectionFailed(format!(
                "reducer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_points(&stdout)
    }
}
