//! Metadata-first fallback scorer used when the remote scorer is unavailable.

use std::time::Instant;

use tracing::debug;

use crate::config::ScoringConfig;
use crate::error::ScanResult;
use crate::input::ScanInput;
use crate::scorer::{
    has_dangerous_extension, stamp, Scorer, EXTENSION_POINTS, LARGE_FILE_LIMIT,
    LARGE_FILE_POINTS, SMALL_FILE_LIMIT, SMALL_FILE_POINTS,
};
use crate::signatures;
use crate::threat::{Assessment, ScanStatus, ScanVerdict, Severity, ThreatDescriptor, ThreatType};

const KNOWN_SIGNATURE_POINTS: u32 = 90;
const SUSPICIOUS_PATTERN_POINTS: u32 = 25;

#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    config: ScoringConfig,
}

impl HeuristicScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn assess(&self, input: &ScanInput) -> ScanResult<Assessment> {
        input.validate()?;

        let mut points = 0;
        let mut reasons: Vec<String> = Vec::new();

        if has_dangerous_extension(&input.file_name) {
            points += EXTENSION_POINTS;
            reasons.push("Potentially dangerous file extension".to_string());
        }

        if input.file_size > LARGE_FILE_LIMIT {
            points += LARGE_FILE_POINTS;
            reasons.push("Unusually large file size".to_string());
        } else if input.file_size < SMALL_FILE_LIMIT {
            points += SMALL_FILE_POINTS;
            reasons.push("Unusually small file size".to_string());
        }

        if let Some(text) = input.text() {
            for marker in signatures::fallback_matches(text) {
                points += KNOWN_SIGNATURE_POINTS;
                reasons.push(format!("Known virus signature: {marker}"));
            }
            for source in signatures::fallback_pattern_matches(text) {
                points += SUSPICIOUS_PATTERN_POINTS;
                reasons.push(format!("Suspicious pattern detected: {source}"));
            }
        }

        let (status, severity, recommendation) = if points >= self.config.infected_threshold {
            (ScanStatus::Infected, Severity::Critical, "Quarantine immediately")
        } else if points >= self.config.suspicious_threshold {
            (ScanStatus::Suspicious, Severity::High, "Monitor closely")
        } else {
            return Ok(Assessment::clean(points));
        };

        debug!("Heuristic scan flagged {}: {}", input.file_name, reasons.join(", "));

        let threat = ThreatDescriptor {
            threat_type: ThreatType::Virus,
            severity,
            confidence: 0.0,
            signature: reasons
                .first()
                .cloned()
                .unwrap_or_else(|| "Heuristic detection".to_string()),
            description: reasons.join(", "),
            recommendation: recommendation.to_string(),
        };
        Ok(Assessment::flagged(status, threat, points))
    }
}

impl Scorer for HeuristicScorer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn scan(&self, input: &ScanInput) -> ScanResult<ScanVerdict> {
        let started = Instant::now();
        let assessment = self.assess(input)?;
        Ok(stamp(input, assessment, started))
    }
}
