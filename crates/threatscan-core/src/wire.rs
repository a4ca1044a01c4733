//! JSON request/response format of the hosted scoring function.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ScanError, ScanResult};
use crate::input::{guess_mime_type, ScanInput};
use crate::scorer::Scorer;
use crate::threat::{ScanStatus, ScanVerdict, ThreatDescriptor};

pub const ENGINE_VERSION: &str = concat!("threatscan-", env!("CARGO_PKG_VERSION"));
pub const SIGNATURE_DATABASE: &str = "builtin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub status: ScanStatus,
    #[serde(default)]
    pub threat_details: Option<ThreatDescriptor>,
    /// Epoch milliseconds at which the scan completed.
    pub scan_time: i64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_engine_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_database: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

/// A missing or `null` name becomes empty so it fails validation, not parsing.
fn null_as_empty<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

impl From<&ScanInput> for ScanRequest {
    fn from(input: &ScanInput) -> Self {
        Self {
            file_name: input.file_name.clone(),
            file_size: input.file_size,
            file_type: input.file_type.clone(),
            file_path: input.file_path.clone(),
            content: input.content.clone(),
            last_modified: input.last_modified,
        }
    }
}

impl From<ScanRequest> for ScanInput {
    fn from(req: ScanRequest) -> Self {
        let file_type = if req.file_type.is_empty() {
            guess_mime_type(&req.file_name).to_string()
        } else {
            req.file_type
        };
        let file_path = if req.file_path.is_empty() {
            req.file_name.clone()
        } else {
            req.file_path
        };
        ScanInput {
            file_name: req.file_name,
            file_size: req.file_size,
            file_type,
            file_path,
            content: req.content,
            last_modified: req.last_modified,
        }
    }
}

impl From<&ScanVerdict> for ScanResponse {
    fn from(verdict: &ScanVerdict) -> Self {
        Self {
            status: verdict.status,
            threat_details: verdict.threat.clone(),
            scan_time: verdict.timestamp.timestamp_millis(),
            confidence: verdict.confidence,
            ai_engine_version: Some(ENGINE_VERSION.to_string()),
            signature_database: Some(SIGNATURE_DATABASE.to_string()),
        }
    }
}

impl ScanResponse {
    /// Rebuild a verdict for `input` from a remote response.
    pub fn into_verdict(self, input: &ScanInput, elapsed: Duration) -> ScanResult<ScanVerdict> {
        let timestamp = Utc
            .timestamp_millis_opt(self.scan_time)
            .single()
            .unwrap_or_else(Utc::now);

        let (threat, confidence) = match (self.status, self.threat_details) {
            (ScanStatus::Clean, _) => (None, 0.0),
            (_, Some(mut details)) => {
                let confidence = self.confidence.clamp(0.0, 1.0);
                details.confidence = confidence;
                (Some(details), confidence)
            }
            (status, None) => {
                return Err(ScanError::Remote(format!(
                    "{status} response for {} carries no threat details",
                    input.file_name
                )))
            }
        };

        Ok(ScanVerdict {
            file_name: input.file_name.clone(),
            file_path: input.file_path.clone(),
            status: self.status,
            threat,
            confidence,
            points: (confidence * 100.0).round() as u32,
            scan_duration: elapsed,
            timestamp,
        })
    }
}

/// Score one wire request.
pub fn handle_request<S: Scorer + ?Sized>(scorer: &S, request: ScanRequest) -> ScanResult<ScanResponse> {
    info!("Scanning {} ({} bytes)", request.file_name, request.file_size);
    let input = ScanInput::from(request);
    let verdict = scorer.scan(&input)?;
    Ok(ScanResponse::from(&verdict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::ThreatScorer;
    use crate::threat::{Severity, ThreatType};

    #[test]
    fn request_uses_camel_case() {
        let json = serde_json::json!({
            "fileName": "payload.bin",
            "fileSize": 4096,
            "fileType": "application/octet-stream",
            "filePath": "/downloads/payload.bin",
            "content": "shell execute; registry modify",
            "lastModified": 1700000000000i64
        });
        let req: ScanRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.file_name, "payload.bin");
        assert_eq!(req.last_modified, Some(1_700_000_000_000));

        let input = ScanInput::from(req);
        assert_eq!(input.file_path, "/downloads/payload.bin");
    }

    #[test]
    fn sparse_request_fills_defaults() {
        let req: ScanRequest = serde_json::from_str(r#"{"fileName": "a.js"}"#).unwrap();
        let input = ScanInput::from(req);
        assert_eq!(input.file_path, "a.js");
        assert_eq!(input.file_type, "text/javascript");
        assert_eq!(input.file_size, 0);
    }

    #[test]
    fn handle_request_reports_threat_details() {
        let req = ScanRequest {
            file_name: "test.txt".into(),
            file_size: 100,
            file_type: "text/plain".into(),
            file_path: "/sdcard/test.txt".into(),
            content: Some(r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*".into()),
            last_modified: None,
        };
        let resp = handle_request(&ThreatScorer::default(), req).unwrap();
        assert_eq!(resp.status, ScanStatus::Infected);
        assert_eq!(resp.confidence, 0.6);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "infected");
        assert_eq!(json["threatDetails"]["type"], "virus");
        assert_eq!(json["threatDetails"]["severity"], "critical");
        assert_eq!(json["threatDetails"]["confidence"], 0.6);
        assert!(json["scanTime"].as_i64().unwrap() > 0);
    }

    #[test]
    fn clean_response_has_null_details() {
        let req: ScanRequest =
            serde_json::from_str(r#"{"fileName": "readme.txt", "fileSize": 200, "content": "hello world"}"#)
                .unwrap();
        let resp = handle_request(&ThreatScorer::default(), req).unwrap();
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "clean");
        assert!(json["threatDetails"].is_null());
        assert_eq!(json["confidence"], 0.0);
    }

    #[test]
    fn missing_or_null_name_fails_validation() {
        for body in [r#"{"fileSize": 10, "content": "x"}"#, r#"{"fileName": null, "fileSize": 10}"#] {
            let req: ScanRequest = serde_json::from_str(body).unwrap();
            assert_eq!(req.file_name, "");
            let err = handle_request(&ThreatScorer::default(), req).unwrap_err();
            assert!(matches!(err, ScanError::Validation(_)));
        }
    }

    #[test]
    fn blank_name_fails_validation() {
        let req: ScanRequest = serde_json::from_str(r#"{"fileName": ""}"#).unwrap();
        let err = handle_request(&ThreatScorer::default(), req).unwrap_err();
        assert!(matches!(err, ScanError::Validation(_)));
    }

    #[test]
    fn remote_response_becomes_verdict() {
        let resp: ScanResponse = serde_json::from_value(serde_json::json!({
            "status": "suspicious",
            "threatDetails": {
                "type": "trojan",
                "severity": "high",
                "confidence": 0.6,
                "signature": "Generic Trojan",
                "description": "Generic trojan patterns detected",
                "recommendation": "Monitor and consider quarantine"
            },
            "scanTime": 1700000000000i64,
            "confidence": 0.7,
            "aiEngineVersion": "2.1.0",
            "signatureDatabase": "Latest"
        }))
        .unwrap();

        let input = ScanInput::new("x.txt", 10);
        let verdict = resp.into_verdict(&input, Duration::from_millis(5)).unwrap();
        assert_eq!(verdict.status, ScanStatus::Suspicious);
        let threat = verdict.threat.unwrap();
        assert_eq!(threat.threat_type, ThreatType::Trojan);
        assert_eq!(threat.severity, Severity::High);
        assert_eq!(threat.confidence, 0.7);
        assert_eq!(verdict.points, 70);
        assert_eq!(verdict.timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn remote_clean_response_drops_confidence() {
        let resp = ScanResponse {
            status: ScanStatus::Clean,
            threat_details: None,
            scan_time: 1,
            confidence: 0.3,
            ai_engine_version: None,
            signature_database: None,
        };
        let verdict = resp
            .into_verdict(&ScanInput::new("a", 1), Duration::ZERO)
            .unwrap();
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.threat.is_none());
    }

    #[test]
    fn flagged_response_without_details_is_rejected() {
        let resp = ScanResponse {
            status: ScanStatus::Infected,
            threat_details: None,
            scan_time: 1,
            confidence: 0.9,
            ai_engine_version: None,
            signature_database: None,
        };
        let err = resp.into_verdict(&ScanInput::new("a", 1), Duration::ZERO).unwrap_err();
        assert!(matches!(err, ScanError::Remote(_)));
    }
}
