//! Staged file transfer implementation
//!
//! Copies dataset files from the caller's source location into a per-audit
//! staging directory, reporting progress as the copy advances. The staged
//! path is what the content validator later reads.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use shared::DatasetRecord;

use crate::error::{EngineError, EngineResult};
use crate::traits::DatasetTransfer;

const CHUNK_SIZE: usize = 64 * 1024;

/// File-system backed transfer into a staging directory
pub struct StagedTransfer {
    staging_dir: PathBuf,
}

impl StagedTransfer {
    pub fn new(staging_dir: PathBuf) -> Self {
        Self { staging_dir }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }
}

#[async_trait::async_trait]
impl DatasetTransfer for StagedTransfer {
    async fn transfer(
        &self,
        record: &DatasetRecord,
        source: &Path,
        progress: mpsc::Sender<f32>,
    ) -> EngineResult<PathBuf> {
        fs::create_dir_all(&self.staging_dir).await?;

        let file_name = source.file_name().ok_or_else(|| {
            EngineError::storage(
                "transfer",
                format!("source path has no file name: {}", source.display()),
            )
        })?;
        // Record id prefix keeps retries from clobbering a prior attempt
        let destination = self
            .staging_dir
            .join(format!("{}-{}", record.id, file_name.to_string_lossy()));

        let total = fs::metadata(source).await?.len().max(1);
        let mut reader = fs::File::open(source).await?;
        let mut writer = fs::File::create(&destination).await?;

        let mut copied = 0u64;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n]).await?;
            copied += n as u64;
            let _ = progress
                .send((copied as f32 / total as f32).min(1.0))
                .await;
        }
        writer.flush().await?;

        Ok(destination)
    }
}
