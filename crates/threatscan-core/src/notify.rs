//! Threat alerts.

use tracing::warn;

use crate::store::ThreatRecord;

/// Fire-and-forget alert channel. Implementations must not fail the scan.
pub trait Notifier: Send + Sync {
    fn notify(&self, record: &ThreatRecord);
}

/// Emits alerts as `warn` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, record: &ThreatRecord) {
        warn!(
            severity = %record.severity,
            threat_type = %record.threat_type,
            path = %record.file_path,
            "{}: {}",
            record.title,
            record.description
        );
    }
}

/// Drops every alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _record: &ThreatRecord) {}
}
