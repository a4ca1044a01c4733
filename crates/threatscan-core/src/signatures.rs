//! Content signatures.
//!
//! The primary table is ordered: the first matching signature wins, so
//! entries earlier in [`SIGNATURES`] take priority over later ones.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::threat::{Severity, ThreatType};

/// A case-insensitive content pattern tagged with what it indicates.
#[derive(Debug)]
pub struct Signature {
    pub name: &'static str,
    pub pattern: Regex,
    pub threat_type: ThreatType,
    pub severity: Severity,
    pub description: &'static str,
}

impl Signature {
    fn new(
        name: &'static str,
        pattern: &str,
        threat_type: ThreatType,
        severity: Severity,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            pattern: compile(pattern),
            threat_type,
            severity,
            description,
        }
    }

    pub fn is_match(&self, content: &str) -> bool {
        self.pattern.is_match(content)
    }

    pub fn recommendation(&self) -> &'static str {
        if self.severity == Severity::Critical {
            "Immediate quarantine required"
        } else {
            "Monitor and consider quarantine"
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("built-in signature pattern must compile")
}

/// Primary signature table, in priority order.
pub static SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(|| {
    vec![
        Signature::new(
            "EICAR Test File",
            r"X5O!P%@AP\[4\\PZX54\(P\^\)7CC\)7\}\$EICAR",
            ThreatType::Virus,
            Severity::Critical,
            "EICAR standard antivirus test file detected",
        ),
        Signature::new(
            "Generic Trojan",
            r"trojan|backdoor|keylogger",
            ThreatType::Trojan,
            Severity::High,
            "Generic trojan patterns detected",
        ),
        Signature::new(
            "Cryptocurrency Miner",
            r"crypto.*miner|bitcoin.*mine|monero.*hash",
            ThreatType::Malware,
            Severity::High,
            "Cryptocurrency mining malware detected",
        ),
        Signature::new(
            "Ransomware Patterns",
            r"encrypt.*files|pay.*bitcoin|ransom.*note",
            ThreatType::Ransomware,
            Severity::Critical,
            "Ransomware encryption patterns detected",
        ),
        Signature::new(
            "Suspicious Scripts",
            r"eval\s*\(|document\.write|iframe.*src",
            ThreatType::Malware,
            Severity::Medium,
            "Suspicious script injection patterns",
        ),
        Signature::new(
            "Adware Signatures",
            r"popup.*ads|click.*fraud|redirect.*ads",
            ThreatType::Adware,
            Severity::Low,
            "Adware and potentially unwanted programs",
        ),
    ]
});

/// Behavioural keyword pairs checked when no signature matched.
pub static BEHAVIOUR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"shell.*execute",
        r"registry.*modify",
        r"file.*delete",
        r"network.*connect",
        r"process.*inject",
    ]
    .iter()
    .map(|p| compile(p))
    .collect()
});

/// Literal markers used by the metadata-only fallback scorer.
pub const FALLBACK_SIGNATURES: [&str; 4] = [
    "EICAR-STANDARD-ANTIVIRUS-TEST-FILE",
    r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR",
    "trojan.generic",
    "malware.suspicious",
];

/// Suspicious-content patterns used by the fallback scorer, kept with their
/// source text for reporting.
pub static FALLBACK_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        r"eval\s*\(",
        r"document\.write",
        r"\.exe\s*$",
        r"\.scr\s*$",
        r"\.bat\s*$",
        r"javascript:void",
        r"onload\s*=",
        r"iframe\s+src",
        r"crypto\s*miner",
        r"bitcoin\s*wallet",
    ]
    .iter()
    .map(|p| (*p, compile(p)))
    .collect()
});

/// First signature in table order whose pattern occurs in `content`.
pub fn first_match(content: &str) -> Option<&'static Signature> {
    SIGNATURES.iter().find(|sig| sig.is_match(content))
}

/// Number of distinct behaviour patterns present in `content`.
pub fn behaviour_matches(content: &str) -> usize {
    BEHAVIOUR_PATTERNS
        .iter()
        .filter(|re| re.is_match(content))
        .count()
}

/// Literal fallback markers present in `content`.
pub fn fallback_matches(content: &str) -> Vec<&'static str> {
    FALLBACK_SIGNATURES
        .iter()
        .copied()
        .filter(|marker| content.contains(marker))
        .collect()
}

/// Sources of the suspicious-content patterns present in `content`.
pub fn fallback_pattern_matches(content: &str) -> Vec<&'static str> {
    FALLBACK_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(content))
        .map(|(source, _)| *source)
        .collect()
}
