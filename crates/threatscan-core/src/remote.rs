//! Client for a remotely deployed scorer, plus a local fallback wrapper.
//!
//! The endpoint speaks the JSON format in [`crate::wire`]. It is read from
//! `THREATSCAN_REMOTE_URL` or passed explicitly.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ScanError, ScanResult};
use crate::input::ScanInput;
use crate::scorer::Scorer;
use crate::threat::ScanVerdict;
use crate::wire::{ScanRequest, ScanResponse};

pub const REMOTE_URL_ENV: &str = "THREATSCAN_REMOTE_URL";

#[derive(Debug)]
pub struct RemoteScorer {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl RemoteScorer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> ScanResult<Self> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(ScanError::Config("remote scorer endpoint is empty".into()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { endpoint, client })
    }

    /// Create a client from the `THREATSCAN_REMOTE_URL` environment variable.
    pub fn from_env(timeout: Duration) -> ScanResult<Self> {
        let endpoint = std::env::var(REMOTE_URL_ENV)
            .map_err(|_| ScanError::Config(format!("{REMOTE_URL_ENV} environment variable not set")))?;
        Self::new(endpoint, timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Scorer for RemoteScorer {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn scan(&self, input: &ScanInput) -> ScanResult<ScanVerdict> {
        input.validate()?;
        let started = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&ScanRequest::from(input))
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ScanError::Remote(format!("HTTP {status}: {body}")));
        }

        let response: ScanResponse = resp
            .json()
            .map_err(|e| ScanError::Remote(format!("failed to decode response: {e}")))?;
        debug!("Remote verdict for {}: {}", input.file_name, response.status);
        response.into_verdict(input, started.elapsed())
    }
}

/// Try `primary`; on any recoverable error score with `fallback` instead.
///
/// Validation errors are returned as-is since no scorer accepts the input.
#[derive(Debug)]
pub struct FallbackScorer<P, F> {
    primary: P,
    fallback: F,
}

impl<P: Scorer, F: Scorer> FallbackScorer<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: Scorer, F: Scorer> Scorer for FallbackScorer<P, F> {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn scan(&self, input: &ScanInput) -> ScanResult<ScanVerdict> {
        match self.primary.scan(input) {
            Ok(verdict) => Ok(verdict),
            Err(e) if e.is_recoverable() => {
                warn!(
                    "{} scorer unavailable for {} ({e}); using {} scorer",
                    self.primary.name(),
                    input.file_name,
                    self.fallback.name()
                );
                self.fallback.scan(input)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::HeuristicScorer;
    use crate::threat::ScanStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Down {
        calls: AtomicUsize,
    }

    impl Scorer for Down {
        fn name(&self) -> &'static str {
            "down"
        }

        fn scan(&self, input: &ScanInput) -> ScanResult<ScanVerdict> {
            input.validate()?;
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(ScanError::Remote("connection refused".into()))
        }
    }

    fn down() -> Down {
        Down {
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn falls_back_on_remote_error() {
        let scorer = FallbackScorer::new(down(), HeuristicScorer::default());
        let input = ScanInput::new("sample.txt", 4096).with_content("trojan.generic");
        let verdict = scorer.scan(&input).unwrap();
        assert_eq!(verdict.status, ScanStatus::Infected);
        assert_eq!(scorer.primary.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn validation_error_is_not_masked() {
        let scorer = FallbackScorer::new(down(), HeuristicScorer::default());
        let err = scorer.scan(&ScanInput::new("", 1)).unwrap_err();
        assert!(matches!(err, ScanError::Validation(_)));
    }

    #[test]
    fn unreachable_endpoint_is_remote_error() {
        let remote = RemoteScorer::new("http://127.0.0.1:9/scan", Duration::from_millis(500)).unwrap();
        let err = remote.scan(&ScanInput::new("a.txt", 10)).unwrap_err();
        assert!(matches!(err, ScanError::Remote(_)));
    }

    #[test]
    fn unreachable_endpoint_degrades_to_heuristics() {
        let remote = RemoteScorer::new("http://127.0.0.1:9/scan", Duration::from_millis(500)).unwrap();
        let scorer = FallbackScorer::new(remote, HeuristicScorer::default());
        let verdict = scorer.scan(&ScanInput::new("tool.exe", 2048)).unwrap();
        assert_eq!(verdict.status, ScanStatus::Clean);
        assert_eq!(verdict.points, 30);
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let err = RemoteScorer::new("  ", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn from_env_fails_without_env_var() {
        let saved = std::env::var(REMOTE_URL_ENV).ok();
        std::env::remove_var(REMOTE_URL_ENV);

        let result = RemoteScorer::from_env(Duration::from_secs(1));
        assert!(result.is_err());

        if let Some(val) = saved {
            std::env::set_var(REMOTE_URL_ENV, val);
        }
    }
}
