//! Batch results and their text/JSON rendering.

use serde::Serialize;

use crate::input::ScanInput;
use crate::threat::{ScanStatus, ScanVerdict};

/// One file's result inside a batch: a verdict, or why there is none.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ScanVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub content: Option<String>,
}

impl ScanOutcome {
    pub fn scored(input: &ScanInput, verdict: ScanVerdict) -> Self {
        Self {
            file_path: input.file_path.clone(),
            content: if verdict.status.is_threat() {
                input.content.clone()
            } else {
                None
            },
            verdict: Some(verdict),
            error: None,
        }
    }

    pub fn failed(input: &ScanInput, error: String) -> Self {
        Self {
            file_path: input.file_path.clone(),
            verdict: None,
            error: Some(error),
            content: None,
        }
    }

    pub fn status(&self) -> Option<ScanStatus> {
        self.verdict.as_ref().map(|v| v.status)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub clean: usize,
    pub suspicious: usize,
    pub infected: usize,
    pub errors: usize,
}

/// Caller-owned accumulator for one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<ScanOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<ScanOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn threats(&self) -> impl Iterator<Item = &ScanOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status().is_some_and(|s| s.is_threat()))
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.outcomes.len(),
            ..BatchSummary::default()
        };
        for outcome in &self.outcomes {
            match outcome.status() {
                Some(ScanStatus::Clean) => summary.clean += 1,
                Some(ScanStatus::Suspicious) => summary.suspicious += 1,
                Some(ScanStatus::Infected) => summary.infected += 1,
                None => summary.errors += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s}. Use 'text' or 'json'.")),
        }
    }
}

pub fn render(report: &BatchReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => render_json(report),
    }
}

pub fn print_results(report: &BatchReport, format: OutputFormat) {
    println!("{}", render(report, format));
}

fn render_text(report: &BatchReport) -> String {
    let mut out = String::new();
    let summary = report.summary();
    let rule = "=".repeat(70);

    out.push_str(&format!("\n{rule}\nSCAN RESULTS\n{rule}\n"));

    let threats: Vec<_> = report.threats().collect();
    if !threats.is_empty() {
        out.push_str(&format!("\nTHREATS ({}):\n", threats.len()));
        for outcome in threats {
            let Some(verdict) = outcome.verdict.as_ref() else {
                continue;
            };
            let label = match verdict.status {
                ScanStatus::Infected => "INF ",
                _ => "SUSP",
            };
            out.push_str(&format!("  [{label}] [{:.2}] {}", verdict.confidence, outcome.file_path));
            if let Some(threat) = &verdict.threat {
                out.push_str(&format!(
                    "  {} {}/{}: {}",
                    threat.signature, threat.threat_type, threat.severity, threat.description
                ));
            }
            out.push('\n');
        }
    }

    let errors: Vec<_> = report.outcomes.iter().filter(|o| o.error.is_some()).collect();
    if !errors.is_empty() {
        out.push_str(&format!("\nERRORS ({}):\n", errors.len()));
        for outcome in errors {
            let err = outcome.error.as_deref().unwrap_or("unknown");
            out.push_str(&format!("  [ERR ] {} -- {}\n", outcome.file_path, err));
        }
    }

    out.push_str("\nSUMMARY:\n");
    out.push_str(&format!("  Total files scanned: {}\n", summary.total));
    out.push_str(&format!("  Infected:            {}\n", summary.infected));
    out.push_str(&format!("  Suspicious:          {}\n", summary.suspicious));
    out.push_str(&format!("  Clean:               {}\n", summary.clean));
    out.push_str(&format!("  Errors:              {}\n", summary.errors));
    out.push_str(&rule);
    out
}

fn render_json(report: &BatchReport) -> String {
    let output = serde_json::json!({
        "results": report.outcomes,
        "summary": report.summary(),
    });
    serde_json::to_string_pretty(&output).unwrap_or_default()
}
