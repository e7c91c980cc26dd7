use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use planweave_core::error::Result;
use planweave_core::types::ValueMap;

/// Audit trail sink: one JSON file per completed node in a directory,
/// and/or one JSON record per line appended to a single file.
///
/// Writing is a side effect with no bearing on control flow; the
/// scheduler logs write failures and keeps running.
#[derive(Debug, Clone)]
pub struct AuditSink {
    dir: Option<PathBuf>,
    file: Option<PathBuf>,
    run_id: String,
}

/// A single audit record for one node completion.
#[derive(Serialize)]
struct AuditRecord<'a> {
    run_id: &'a str,
    node: &'a str,
    timestamp: String,
    inputs: &'a ValueMap,
    output: &'a serde_json::Value,
}

impl AuditSink {
    /// Build a sink if either destination is configured.
    pub fn from_paths(dir: Option<PathBuf>, file: Option<PathBuf>) -> Option<Self> {
        if dir.is_none() && file.is_none() {
            return None;
        }
        Some(Self {
            dir,
            file,
            run_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Persist one node completion.
    pub async fn record(
        &self,
        node: &str,
        inputs: &ValueMap,
        output: &serde_json::Value,
    ) -> Result<()> {
        let record = AuditRecord {
            run_id: &self.run_id,
            node,
            timestamp: Utc::now().to_rfc3339(),
            inputs,
            output,
        };

        if let Some(dir) = &self.dir {
            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(format!("{}.json", node));
            let body = serde_json::to_vec_pretty(&record)?;
            tokio::fs::write(&path, body).await?;
        }

        if let Some(file) = &self.file {
            if let Some(parent) = file.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut f = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .await?;
            let line = format!("{}\n", serde_json::to_string(&record)?);
            f.write_all(line.as_bytes()).await?;
            f.flush().await?;
        }

        Ok(())
    }
}
