//! threatscan-core: signature and heuristic file threat scoring.
//!
//! Provides the scorers (signature, metadata-only fallback, remote), file
//! sources, batch orchestration, threat persistence, quarantine and result
//! reporting used by the CLI.

pub mod config;
pub mod error;
pub mod features;
pub mod heuristic;
pub mod input;
pub mod notify;
pub mod quarantine;
pub mod remote;
pub mod report;
pub mod scan;
pub mod scorer;
pub mod signatures;
pub mod source;
pub mod store;
pub mod threat;
pub mod wire;

pub use config::{ScannerConfig, ScoringConfig};
pub use error::{ScanError, ScanResult};
pub use heuristic::HeuristicScorer;
pub use input::ScanInput;
pub use scorer::{Scorer, ThreatScorer};
pub use threat::{Assessment, ScanStatus, ScanVerdict, Severity, ThreatDescriptor, ThreatType};
