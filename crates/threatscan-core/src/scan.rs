//! Batch scan orchestrator with progress tracking.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::ScanResult;
use crate::input::ScanInput;
use crate::notify::Notifier;
use crate::report::{BatchReport, ScanOutcome};
use crate::scorer::Scorer;
use crate::source::FileSource;
use crate::store::{ThreatRecord, ThreatSink};

/// Atomic progress tracking, readable from another thread while a batch runs.
pub struct ScanProgress {
    pub total_files: AtomicUsize,
    pub scanned_files: AtomicUsize,
    pub threat_count: AtomicUsize,
    pub error_count: AtomicUsize,
    pub cancel: AtomicBool,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            total_files: AtomicUsize::new(0),
            scanned_files: AtomicUsize::new(0),
            threat_count: AtomicUsize::new(0),
            error_count: AtomicUsize::new(0),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whole-number percentage of files scanned so far.
    pub fn percentage(&self) -> usize {
        let total = self.total_files.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }
        self.scanned_files.load(Ordering::Relaxed) * 100 / total
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn scan_one<S: Scorer + ?Sized>(scorer: &S, input: &ScanInput, progress: &ScanProgress) -> Option<ScanOutcome> {
    if progress.cancel.load(Ordering::Relaxed) {
        return None;
    }

    let outcome = match scorer.scan(input) {
        Ok(verdict) => {
            if verdict.status.is_threat() {
                progress.threat_count.fetch_add(1, Ordering::Relaxed);
            }
            debug!("{}: {}", input.file_path, verdict.status);
            ScanOutcome::scored(input, verdict)
        }
        Err(e) => {
            progress.error_count.fetch_add(1, Ordering::Relaxed);
            warn!("Failed to scan {}: {e}", input.file_path);
            ScanOutcome::failed(input, format!("scan error: {e}"))
        }
    };

    progress.scanned_files.fetch_add(1, Ordering::Relaxed);
    Some(outcome)
}

/// Score every input. Outcomes keep input order in both modes; inputs not
/// reached before cancellation are left out.
pub fn run_batch<S: Scorer + ?Sized>(
    scorer: &S,
    inputs: &[ScanInput],
    parallel: bool,
    progress: &Arc<ScanProgress>,
) -> BatchReport {
    progress.total_files.store(inputs.len(), Ordering::Relaxed);

    let outcomes: Vec<ScanOutcome> = if parallel {
        inputs
            .par_iter()
            .filter_map(|input| scan_one(scorer, input, progress))
            .collect()
    } else {
        inputs
            .iter()
            .filter_map(|input| scan_one(scorer, input, progress))
            .collect()
    };

    BatchReport::new(outcomes)
}

/// List `source` and score it. Blocking; call from a background thread
/// when a UI needs to stay responsive.
pub fn run_scan<S: Scorer + ?Sized>(
    scorer: &S,
    source: &dyn FileSource,
    parallel: bool,
    progress: &Arc<ScanProgress>,
) -> ScanResult<BatchReport> {
    let inputs = source.list_files()?;
    info!("Scanning {} files with {} scorer", inputs.len(), scorer.name());
    Ok(run_batch(scorer, &inputs, parallel, progress))
}

/// Counts from handing flagged outcomes to the collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub recorded: usize,
    pub failed: usize,
}

/// Record and announce every flagged outcome. Sink failures are logged and
/// counted; they never abort the batch.
pub fn dispatch_threats(
    report: &BatchReport,
    user_id: &str,
    sink: &dyn ThreatSink,
    notifier: &dyn Notifier,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    for outcome in report.threats() {
        let Some(verdict) = outcome.verdict.as_ref() else {
            continue;
        };
        let Some(record) = ThreatRecord::from_verdict(verdict, user_id, outcome.content.as_deref()) else {
            continue;
        };

        match sink.record(&record) {
            Ok(()) => summary.recorded += 1,
            Err(e) => {
                summary.failed += 1;
                warn!("Error storing threat for {}: {e}", record.file_path);
            }
        }
        notifier.notify(&record);
    }

    summary
}
