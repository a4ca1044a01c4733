//! The threat scorer: additive points from extension, size, signatures,
//! behaviour keywords and content features, mapped onto a verdict.

use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::debug;

use crate::config::ScoringConfig;
use crate::error::ScanResult;
use crate::features::MlFeatures;
use crate::input::ScanInput;
use crate::signatures;
use crate::threat::{Assessment, ScanStatus, ScanVerdict, Severity, ThreatDescriptor, ThreatType};

pub const DANGEROUS_EXTENSIONS: [&str; 8] =
    [".exe", ".scr", ".bat", ".cmd", ".pif", ".com", ".vbs", ".js"];

pub const EXTENSION_POINTS: u32 = 30;
pub const SMALL_FILE_POINTS: u32 = 10;
pub const LARGE_FILE_POINTS: u32 = 15;
pub const SIGNATURE_POINTS: u32 = 50;
pub const BEHAVIOUR_POINTS: u32 = 40;

pub const SMALL_FILE_LIMIT: u64 = 1024;
pub const LARGE_FILE_LIMIT: u64 = 100 * 1024 * 1024;

/// Distinct behaviour patterns needed before they count.
const MIN_BEHAVIOUR_MATCHES: usize = 2;

/// Anything that turns a [`ScanInput`] into a [`ScanVerdict`].
///
/// Implementations hold no per-scan state and may be shared across threads.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn scan(&self, input: &ScanInput) -> ScanResult<ScanVerdict>;
}

impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn scan(&self, input: &ScanInput) -> ScanResult<ScanVerdict> {
        (**self).scan(input)
    }
}

pub fn has_dangerous_extension(file_name: &str) -> bool {
    let lowered = file_name.to_ascii_lowercase();
    DANGEROUS_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext))
}

/// Size heuristic: very small and very large files both add points.
pub fn size_points(file_size: u64) -> u32 {
    if file_size < SMALL_FILE_LIMIT {
        SMALL_FILE_POINTS
    } else if file_size > LARGE_FILE_LIMIT {
        LARGE_FILE_POINTS
    } else {
        0
    }
}

/// Attach file identity and timing to an assessment.
pub(crate) fn stamp(input: &ScanInput, assessment: Assessment, started: Instant) -> ScanVerdict {
    ScanVerdict {
        file_name: input.file_name.clone(),
        file_path: input.file_path.clone(),
        status: assessment.status,
        threat: assessment.threat,
        confidence: assessment.confidence,
        points: assessment.points,
        scan_duration: started.elapsed(),
        timestamp: Utc::now(),
    }
}

/// Signature + heuristic scorer.
#[derive(Debug, Clone, Default)]
pub struct ThreatScorer {
    config: ScoringConfig,
}

impl ThreatScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score `input` without touching the clock.
    pub fn assess(&self, input: &ScanInput) -> ScanResult<Assessment> {
        input.validate()?;

        let mut points = 0;
        if has_dangerous_extension(&input.file_name) {
            debug!("Dangerous extension detected: {}", input.file_name);
            points += EXTENSION_POINTS;
        }
        points += size_points(input.file_size);

        let mut flagged: Option<(ScanStatus, ThreatDescriptor)> = None;

        if let Some(text) = input.text() {
            if let Some(sig) = signatures::first_match(text) {
                debug!("Signature {} matched {}", sig.name, input.file_name);
                points += SIGNATURE_POINTS;
                let status = if sig.severity == Severity::Critical {
                    ScanStatus::Infected
                } else {
                    ScanStatus::Suspicious
                };
                flagged = Some((
                    status,
                    ThreatDescriptor {
                        threat_type: sig.threat_type,
                        severity: sig.severity,
                        confidence: 0.0,
                        signature: sig.name.to_string(),
                        description: sig.description.to_string(),
                        recommendation: sig.recommendation().to_string(),
                    },
                ));
            } else {
                let hits = signatures::behaviour_matches(text);
                if hits >= MIN_BEHAVIOUR_MATCHES {
                    debug!("{} behaviour patterns in {}", hits, input.file_name);
                    points += BEHAVIOUR_POINTS;
                    flagged = Some((
                        ScanStatus::Suspicious,
                        ThreatDescriptor {
                            threat_type: ThreatType::Malware,
                            severity: Severity::Medium,
                            confidence: 0.0,
                            signature: "Heuristic Analysis".to_string(),
                            description: format!("{hits} suspicious patterns detected"),
                            recommendation: "Further analysis recommended".to_string(),
                        },
                    ));
                }
            }
        }

        points += MlFeatures::extract(&input.file_name, input.file_size, input.text()).score();

        let assessment = match flagged {
            Some((status, threat)) => Assessment::flagged(status, threat, points),
            None if points >= self.config.suspicious_threshold => Assessment::flagged(
                ScanStatus::Suspicious,
                ThreatDescriptor {
                    threat_type: ThreatType::Malware,
                    severity: Severity::Medium,
                    confidence: 0.0,
                    signature: "ML Heuristic Detection".to_string(),
                    description: "Machine learning algorithms detected suspicious patterns"
                        .to_string(),
                    recommendation: "Quarantine recommended for safety".to_string(),
                },
                points,
            ),
            None => Assessment::clean(points),
        };
        Ok(assessment)
    }
}

impl Scorer for ThreatScorer {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn scan(&self, input: &ScanInput) -> ScanResult<ScanVerdict> {
        let started = Instant::now();
        let assessment = self.assess(input)?;
        if self.config.simulated_latency_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.simulated_latency_ms));
        }
        Ok(stamp(input, assessment, started))
    }
}
