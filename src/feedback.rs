use crate::error::AppError;
use std::path::Path;
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};
use tracing::debug;

/// Append-only feedback log. The only mutable shared state in the process;
/// the mutex serializes writers so concurrent submissions cannot interleave
/// partial lines.
pub struct FeedbackLog {
    file: Mutex<File>,
}

impl FeedbackLog {
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Append one trimmed feedback line. Blank input is ignored; returns
    /// whether a line was written.
    pub async fn append(&self, text: &str) -> Result<bool, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        let line = format!("{trimmed}\n");
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!("Recorded feedback ({} bytes)", line.len());
        Ok(true)
    }
}
