use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::services::StationSource;

/// Reads a previously saved feed payload from disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StationSource for FileSource {
    async fn fetch_raw(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read station feed {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
