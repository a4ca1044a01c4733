//! Where scan inputs come from.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ScanResult;
use crate::input::{guess_mime_type, truncate_chars, ScanInput};

pub trait FileSource {
    fn list_files(&self) -> ScanResult<Vec<ScanInput>>;
}

/// Walks files and directories on disk.
#[derive(Debug, Clone)]
pub struct FsFileSource {
    pub roots: Vec<PathBuf>,
    /// Files at or above this size are scanned on metadata only.
    pub max_content_bytes: u64,
    pub max_content_chars: usize,
}

impl FsFileSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            max_content_bytes: 50_000,
            max_content_chars: 5_000,
        }
    }

    pub fn with_limits(mut self, max_content_bytes: u64, max_content_chars: usize) -> Self {
        self.max_content_bytes = max_content_bytes;
        self.max_content_chars = max_content_chars;
        self
    }

    /// Build the input for one file. Content that cannot be read is
    /// dropped with a warning and the file is scanned on metadata alone.
    pub fn read_input(&self, path: &Path) -> ScanResult<ScanInput> {
        let meta = fs::metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut input = ScanInput {
            file_type: guess_mime_type(&file_name).to_string(),
            file_name,
            file_size: meta.len(),
            file_path: path.display().to_string(),
            content: None,
            last_modified: meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64),
        };

        if meta.len() < self.max_content_bytes {
            match fs::read(path) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    input.content = Some(truncate_chars(&text, self.max_content_chars).to_string());
                }
                Err(e) => warn!("Cannot read file content: {} ({e})", path.display()),
            }
        }

        Ok(input)
    }
}

impl FileSource for FsFileSource {
    fn list_files(&self) -> ScanResult<Vec<ScanInput>> {
        let mut inputs = Vec::new();

        for root in &self.roots {
            if root.is_file() {
                inputs.push(self.read_input(root)?);
            } else if root.is_dir() {
                for entry in WalkDir::new(root).follow_links(false).into_iter() {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(e) => {
                            warn!("Skipping unreadable entry under {}: {e}", root.display());
                            continue;
                        }
                    };
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    match self.read_input(entry.path()) {
                        Ok(input) => inputs.push(input),
                        Err(e) => warn!("Skipping {}: {e}", entry.path().display()),
                    }
                }
            } else {
                warn!("Path does not exist: {}", root.display());
            }
        }

        debug!("Collected {} files", inputs.len());
        Ok(inputs)
    }
}

/// A fixed list of inputs.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    inputs: Vec<ScanInput>,
}

impl FixtureSource {
    pub fn new(inputs: Vec<ScanInput>) -> Self {
        Self { inputs }
    }
}

impl FileSource for FixtureSource {
    fn list_files(&self) -> ScanResult<Vec<ScanInput>> {
        Ok(self.inputs.clone())
    }
}
