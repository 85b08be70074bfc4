// src/services/debug_writer.rs
use crate::errors::SnapcodeError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

fn html_block() -> &'static Regex {
    static HTML: OnceLock<Regex> = OnceLock::new();
    HTML.get_or_init(|| Regex::new(r"(?s)<html.*?>.*?</html>").expect("valid html regex"))
}

/// Returns the first `<html>...</html>` block, or the whole text if there is none.
pub fn extract_html_content(text: &str) -> String {
    match html_block().find(text) {
        Some(block) => block.as_str().to_string(),
        None => text.to_string(),
    }
}

/// Dumps generation artifacts into a fresh directory per run.
pub struct DebugFileWriter {
    dir: PathBuf,
}

impl DebugFileWriter {
    pub async fn new(base_dir: &Path) -> Result<Self, SnapcodeError> {
        let dir = base_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            SnapcodeError::Io(format!("Cannot create debug directory {:?}: {}", dir, e))
        })?;
        log::debug!("Writing debug artifacts to {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn write_to_file(&self, filename: &str, content: &str) -> Result<(), SnapcodeError> {
        let path = self.dir.join(filename);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| SnapcodeError::Io(format!("Cannot write {:?}: {}", path, e)))
    }
}
