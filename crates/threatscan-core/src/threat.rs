//! Verdict vocabulary shared by every scorer.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatType {
    Virus,
    Malware,
    Trojan,
    Adware,
    Spyware,
    Ransomware,
}

impl ThreatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::Virus => "virus",
            ThreatType::Malware => "malware",
            ThreatType::Trojan => "trojan",
            ThreatType::Adware => "adware",
            ThreatType::Spyware => "spyware",
            ThreatType::Ransomware => "ransomware",
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Clean,
    Suspicious,
    Infected,
}

impl ScanStatus {
    pub fn is_threat(&self) -> bool {
        !matches!(self, ScanStatus::Clean)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScanStatus::Clean => "clean",
            ScanStatus::Suspicious => "suspicious",
            ScanStatus::Infected => "infected",
        })
    }
}

/// What was found and what to do about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatDescriptor {
    #[serde(rename = "type")]
    pub threat_type: ThreatType,
    pub severity: Severity,
    pub confidence: f64,
    pub signature: String,
    pub description: String,
    pub recommendation: String,
}

/// Clock-free outcome of scoring one input.
///
/// Two assessments of the same input always compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub status: ScanStatus,
    pub threat: Option<ThreatDescriptor>,
    /// Raw accumulated heuristic points before normalization.
    pub points: u32,
    pub confidence: f64,
}

impl Assessment {
    pub fn clean(points: u32) -> Self {
        Self {
            status: ScanStatus::Clean,
            threat: None,
            points,
            confidence: 0.0,
        }
    }

    /// Build a non-clean assessment. The descriptor's confidence is
    /// overwritten with the normalized score so both always agree.
    pub fn flagged(status: ScanStatus, mut threat: ThreatDescriptor, points: u32) -> Self {
        let confidence = normalize_points(points);
        threat.confidence = confidence;
        Self {
            status,
            threat: Some(threat),
            points,
            confidence,
        }
    }
}

/// `min(points / 100, 1.0)`
pub fn normalize_points(points: u32) -> f64 {
    (points as f64 / 100.0).min(1.0)
}

/// A scored file, stamped with when and how long.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanVerdict {
    pub file_name: String,
    pub file_path: String,
    pub status: ScanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat: Option<ThreatDescriptor>,
    pub confidence: f64,
    pub points: u32,
    #[serde(with = "duration_ms")]
    pub scan_duration: Duration,
    pub timestamp: DateTime<Utc>,
}

impl ScanVerdict {
    pub fn assessment(&self) -> Assessment {
        Assessment {
            status: self.status,
            threat: self.threat.clone(),
            points: self.points,
            confidence: self.confidence,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
