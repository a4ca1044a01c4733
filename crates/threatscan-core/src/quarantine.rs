//! Moving flagged files out of the way.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ScanError, ScanResult};
use crate::threat::ThreatType;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineOutcome {
    pub success: bool,
    pub message: String,
    pub quarantine_path: PathBuf,
}

pub trait Quarantine {
    fn quarantine(&self, file_path: &Path, threat_type: ThreatType) -> ScanResult<QuarantineOutcome>;
}

/// Moves files into a directory as `<epoch-millis>_<file name>`.
#[derive(Debug, Clone)]
pub struct FsQuarantine {
    dir: PathBuf,
}

impl FsQuarantine {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Quarantine for FsQuarantine {
    fn quarantine(&self, file_path: &Path, threat_type: ThreatType) -> ScanResult<QuarantineOutcome> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| ScanError::Validation(format!("{} has no file name", file_path.display())))?;
        if !file_path.is_file() {
            return Err(ScanError::NotFound(file_path.display().to_string()));
        }

        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(format!(
            "{}_{}",
            Utc::now().timestamp_millis(),
            file_name.to_string_lossy()
        ));

        // rename fails across filesystems; fall back to copy + remove.
        if fs::rename(file_path, &target).is_err() {
            copy_then_remove(file_path, &target, |p| fs::remove_file(p))?;
        }
        restrict_permissions(&target)?;

        info!(
            "File quarantined: {} -> {} ({threat_type})",
            file_path.display(),
            target.display()
        );
        Ok(QuarantineOutcome {
            success: true,
            message: "Threat successfully quarantined".to_string(),
            quarantine_path: target,
        })
    }
}

/// Copy `from` to `to`, then remove `from`. If the removal fails the copy is
/// deleted again so the file never exists in both places.
fn copy_then_remove(
    from: &Path,
    to: &Path,
    remove: impl FnOnce(&Path) -> io::Result<()>,
) -> io::Result<()> {
    fs::copy(from, to)?;
    if let Err(e) = remove(from) {
        if let Err(cleanup) = fs::remove_file(to) {
            warn!("Could not remove partial quarantine copy {}: {cleanup}", to.display());
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> ScanResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o400))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(path: &Path) -> ScanResult<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)?;
    Ok(())
}
