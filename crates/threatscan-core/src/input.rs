//! Per-file scan input.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ScanError, ScanResult};

/// Metadata and (for small files) text content of one file to score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInput {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

impl ScanInput {
    pub fn new(file_name: impl Into<String>, file_size: u64) -> Self {
        let file_name = file_name.into();
        Self {
            file_type: guess_mime_type(&file_name).to_string(),
            file_path: file_name.clone(),
            file_name,
            file_size,
            content: None,
            last_modified: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = path.into();
        self
    }

    pub fn with_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_last_modified(mut self, epoch_millis: i64) -> Self {
        self.last_modified = Some(epoch_millis);
        self
    }

    /// Content if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    pub fn validate(&self) -> ScanResult<()> {
        if self.file_name.trim().is_empty() {
            return Err(ScanError::Validation("file name is required".into()));
        }
        Ok(())
    }
}

/// Map a file extension to a MIME type, defaulting to octet-stream.
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("apk") => "application/vnd.android.package-archive",
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("mp4") => "video/mp4",
        Some("txt") => "text/plain",
        Some("js") => "text/javascript",
        Some("html") | Some("htm") => "text/html",
        Some("sh") => "application/x-sh",
        Some("jar") => "application/java-archive",
        Some("exe") | Some("dll") => "application/x-msdownload",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
