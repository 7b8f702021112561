//! Run log - persistence of finished workflow results

use crate::error::{Error, Result};
use crate::orchestrator::WorkflowResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Sink for finished runs
#[async_trait]
pub trait RunLog: Send + Sync {
    /// Append one finished run
    async fn append(&self, result: &WorkflowResult) -> Result<()>;
}

/// JSON-lines file, one `WorkflowResult` per line
#[derive(Debug, Clone)]
pub struct JsonlRunLog {
    path: PathBuf,
}

impl JsonlRunLog {
    /// Log to `path`; the file and its parent directories are created on first append
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RunLog for JsonlRunLog {
    async fn append(&self, result: &WorkflowResult) -> Result<()> {
        let mut line = serde_json::to_string(result)
            .map_err(|e| Error::Internal(format!("failed to serialize run: {}", e)))?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Internal(format!("failed to create {}: {}", parent.display(), e)))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Internal(format!("failed to open {}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| Error::Internal(format!("failed to write run log: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| Error::Internal(format!("failed to flush run log: {}", e)))?;

        debug!(run_id = %result.workflow_id, path = %self.path.display(), "Run appended to log");
        Ok(())
    }
}
