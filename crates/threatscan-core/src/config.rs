//! Scanner configuration: JSON file, then environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ScanError, ScanResult};

pub const CONFIG_ENV: &str = "THREATSCAN_CONFIG";

/// Point thresholds and latency for the scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points at which an unmatched file is reported suspicious.
    pub suspicious_threshold: u32,
    /// Points at which the fallback scorer reports a file infected.
    pub infected_threshold: u32,
    /// Artificial per-file delay, 0 to disable.
    pub simulated_latency_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            suspicious_threshold: 50,
            infected_threshold: 80,
            simulated_latency_ms: 0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> ScanResult<()> {
        if self.suspicious_threshold == 0 {
            return Err(ScanError::Config("suspicious_threshold must be positive".into()));
        }
        if self.infected_threshold < self.suspicious_threshold {
            return Err(ScanError::Config(format!(
                "infected_threshold ({}) is below suspicious_threshold ({})",
                self.infected_threshold, self.suspicious_threshold
            )));
        }
        Ok(())
    }

    /// Override the suspicious threshold, raising the infected threshold with
    /// it when it would otherwise fall below.
    pub fn with_suspicious_threshold(mut self, threshold: u32) -> Self {
        self.suspicious_threshold = threshold;
        self.infected_threshold = self.infected_threshold.max(threshold);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub scoring: ScoringConfig,
    /// Files at or above this size are scanned on metadata only.
    pub max_content_bytes: u64,
    /// Content is truncated to this many characters before scoring.
    pub max_content_chars: usize,
    pub parallel: bool,
    pub remote_url: Option<String>,
    pub remote_timeout_secs: u64,
    pub user_id: String,
    pub store_path: PathBuf,
    pub quarantine_dir: PathBuf,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            max_content_bytes: 50_000,
            max_content_chars: 5_000,
            parallel: true,
            remote_url: None,
            remote_timeout_secs: 10,
            user_id: "local".to_string(),
            store_path: PathBuf::from("threats.jsonl"),
            quarantine_dir: PathBuf::from("quarantine"),
        }
    }
}

impl ScannerConfig {
    /// Load from `path`, else from `$THREATSCAN_CONFIG`, else defaults;
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> ScanResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let mut cfg = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env();
        cfg.scoring.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> ScanResult<Self> {
        debug!("Loading config from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let cfg: ScannerConfig = serde_json::from_str(&raw)
            .map_err(|e| ScanError::Config(format!("cannot parse {}: {e}", path.display())))?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("THREATSCAN_REMOTE_URL") {
            self.remote_url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("THREATSCAN_USER_ID") {
            if !v.trim().is_empty() {
                self.user_id = v;
            }
        }
        if let Ok(v) = env::var("THREATSCAN_STORE") {
            self.store_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("THREATSCAN_QUARANTINE_DIR") {
            self.quarantine_dir = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_use_canonical_thresholds() {
        let cfg = ScannerConfig::default();
        assert_eq!(cfg.scoring.suspicious_threshold, 50);
        assert_eq!(cfg.scoring.infected_threshold, 80);
        assert_eq!(cfg.max_content_bytes, 50_000);
        assert!(cfg.remote_url.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, r#"{{"scoring": {{"suspicious_threshold": 70}}, "user_id": "alice"}}"#).unwrap();
        tmp.flush().unwrap();

        let cfg = ScannerConfig::from_file(tmp.path()).unwrap();
        assert_eq!(cfg.scoring.suspicious_threshold, 70);
        assert_eq!(cfg.scoring.infected_threshold, 80);
        assert_eq!(cfg.user_id, "alice");
        assert_eq!(cfg.max_content_chars, 5_000);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"{not json").unwrap();
        tmp.flush().unwrap();

        let err = ScannerConfig::from_file(tmp.path()).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = ScannerConfig::from_file(Path::new("/nonexistent/threatscan.json")).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let scoring = ScoringConfig {
            suspicious_threshold: 90,
            infected_threshold: 80,
            simulated_latency_ms: 0,
        };
        assert!(scoring.validate().is_err());
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn threshold_override_raises_infected_threshold() {
        let scoring = ScoringConfig::default().with_suspicious_threshold(90);
        assert_eq!(scoring.suspicious_threshold, 90);
        assert_eq!(scoring.infected_threshold, 90);
        assert!(scoring.validate().is_ok());

        let scoring = ScoringConfig::default().with_suspicious_threshold(30);
        assert_eq!(scoring.infected_threshold, 80);
        assert!(scoring.validate().is_ok());
    }
}
