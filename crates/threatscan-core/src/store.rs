//! Durable threat records.
//!
//! Every non-clean verdict becomes a [`ThreatRecord`] owned by a user. The
//! bundled [`JsonlThreatStore`] keeps them as one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ScanError, ScanResult};
use crate::threat::{ScanVerdict, Severity, ThreatType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Quarantined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub threat_type: ThreatType,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub confidence: f64,
    pub recommendation: String,
    pub status: RecordStatus,
    pub detected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarantine_path: Option<String>,
}

impl ThreatRecord {
    /// Record for a flagged verdict; `None` when the verdict is clean.
    pub fn from_verdict(verdict: &ScanVerdict, user_id: &str, content: Option<&str>) -> Option<Self> {
        let threat = verdict.threat.as_ref()?;
        Some(Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: format!("{} Detected", threat.threat_type.as_str().to_uppercase()),
            description: format!("{}: {}", verdict.file_name, threat.description),
            severity: threat.severity,
            threat_type: threat.threat_type,
            file_path: verdict.file_path.clone(),
            sha256: content.map(|c| sha256_hex(c.as_bytes())),
            confidence: threat.confidence,
            recommendation: threat.recommendation.clone(),
            status: RecordStatus::Active,
            detected_at: verdict.timestamp,
            quarantine_path: None,
        })
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Destination for threat records.
pub trait ThreatSink: Send + Sync {
    fn record(&self, record: &ThreatRecord) -> ScanResult<()>;
}

/// Append-only JSON-lines file of threat records.
#[derive(Debug)]
pub struct JsonlThreatStore {
    path: PathBuf,
    // Serializes appends and rewrites from concurrent callers.
    lock: Mutex<()>,
}

impl JsonlThreatStore {
    pub fn open(path: impl Into<PathBuf>) -> ScanResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, oldest first. A missing file is an empty store.
    pub fn list(&self) -> ScanResult<Vec<ThreatRecord>> {
        let _guard = self.guard()?;
        self.read_all()
    }

    pub fn list_for_user(&self, user_id: &str) -> ScanResult<Vec<ThreatRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    pub fn get(&self, id: Uuid) -> ScanResult<ThreatRecord> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ScanError::NotFound(format!("threat record {id}")))
    }

    /// Mark a record quarantined and remember where the file went.
    pub fn mark_quarantined(&self, id: Uuid, quarantine_path: &str) -> ScanResult<ThreatRecord> {
        let _guard = self.guard()?;
        let mut records = self.read_all()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ScanError::NotFound(format!("threat record {id}")))?;
        record.status = RecordStatus::Quarantined;
        record.quarantine_path = Some(quarantine_path.to_string());
        let updated = record.clone();

        self.write_all(&records)?;
        debug!("Threat {id} marked quarantined");
        Ok(updated)
    }

    fn guard(&self) -> ScanResult<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| ScanError::Lock(format!("{}: {e}", self.path.display())))
    }

    fn read_all(&self) -> ScanResult<Vec<ThreatRecord>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    fn write_all(&self, records: &[ThreatRecord]) -> ScanResult<()> {
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let mut out = fs::File::create(&tmp)?;
            for record in records {
                serde_json::to_writer(&mut out, record)?;
                out.write_all(b"\n")?;
            }
            out.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ThreatSink for JsonlThreatStore {
    fn record(&self, record: &ThreatRecord) -> ScanResult<()> {
        let _guard = self.guard()?;
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        out.write_all(&line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScanInput;
    use crate::scorer::{Scorer, ThreatScorer};

    fn flagged_verdict() -> ScanVerdict {
        let input = ScanInput::new("dropper.txt", 4096)
            .with_path("/downloads/dropper.txt")
            .with_content("installs a keylogger");
        ThreatScorer::default().scan(&input).unwrap()
    }

    #[test]
    fn sha256_known_content() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn record_from_flagged_verdict() {
        let verdict = flagged_verdict();
        let record = ThreatRecord::from_verdict(&verdict, "alice", Some("installs a keylogger")).unwrap();
        assert_eq!(record.title, "TROJAN Detected");
        assert_eq!(record.description, "dropper.txt: Generic trojan patterns detected");
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.user_id, "alice");
        assert_eq!(record.file_path, "/downloads/dropper.txt");
        assert_eq!(record.status, RecordStatus::Active);
        assert_eq!(record.confidence, verdict.confidence);
        assert!(record.sha256.is_some());
    }

    #[test]
    fn clean_verdict_has_no_record() {
        let input = ScanInput::new("readme.txt", 200).with_content("hello world");
        let verdict = ThreatScorer::default().scan(&input).unwrap();
        assert!(ThreatRecord::from_verdict(&verdict, "alice", None).is_none());
    }

    #[test]
    fn store_appends_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlThreatStore::open(dir.path().join("db").join("threats.jsonl")).unwrap();
        assert!(store.list().unwrap().is_empty());

        let verdict = flagged_verdict();
        let a = ThreatRecord::from_verdict(&verdict, "alice", None).unwrap();
        let b = ThreatRecord::from_verdict(&verdict, "bob", None).unwrap();
        store.record(&a).unwrap();
        store.record(&b).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all, vec![a.clone(), b]);
        assert_eq!(store.list_for_user("alice").unwrap(), vec![a.clone()]);
        assert_eq!(store.get(a.id).unwrap(), a);
    }

    #[test]
    fn mark_quarantined_updates_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlThreatStore::open(dir.path().join("threats.jsonl")).unwrap();
        let record = ThreatRecord::from_verdict(&flagged_verdict(), "alice", None).unwrap();
        store.record(&record).unwrap();

        let updated = store.mark_quarantined(record.id, "/q/1_dropper.txt").unwrap();
        assert_eq!(updated.status, RecordStatus::Quarantined);

        let reloaded = store.get(record.id).unwrap();
        assert_eq!(reloaded.status, RecordStatus::Quarantined);
        assert_eq!(reloaded.quarantine_path.as_deref(), Some("/q/1_dropper.txt"));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlThreatStore::open(dir.path().join("threats.jsonl")).unwrap();
        let err = store.mark_quarantined(Uuid::new_v4(), "/q/x").unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[test]
    fn record_serializes_type_field() {
        let record = ThreatRecord::from_verdict(&flagged_verdict(), "alice", None).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "trojan");
        assert_eq!(json["status"], "active");
        assert!(json.get("sha256").is_none());
    }

    #[test]
    fn poisoned_lock_is_reported_as_lock_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonlThreatStore::open(dir.path().join("threats.jsonl")).unwrap());

        let holder = std::sync::Arc::clone(&store);
        let joined = std::thread::spawn(move || {
            let _guard = holder.lock.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(joined.is_err());

        assert!(matches!(store.list().unwrap_err(), ScanError::Lock(_)));
        let record = ThreatRecord::from_verdict(&flagged_verdict(), "alice", None).unwrap();
        assert!(matches!(store.record(&record).unwrap_err(), ScanError::Lock(_)));
    }
}
