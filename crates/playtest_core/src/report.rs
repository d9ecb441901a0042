use std::fmt::Debug;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::harness::TraceEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub id: String,
    pub timestamp: String,
    pub scenario: ScenarioInfo,
    pub summary: ReportSummary,
    pub checks: Vec<CheckResult>,
    pub trace: Vec<TraceEntry>,
}

impl ScenarioReport {
    pub fn new(
        id: impl Into<String>,
        scenario: ScenarioInfo,
        checks: Vec<CheckResult>,
        trace: Vec<TraceEntry>,
    ) -> Self {
        let summary = summarize_checks(&checks);
        Self {
            id: id.into(),
            timestamp: Utc::now().to_rfc3339(),
            scenario,
            summary,
            checks,
            trace,
        }
    }

    pub fn passed(&self) -> bool {
        self.summary.status == ReportStatus::Pass
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks
            .iter()
            .filter(|check| check.status == CheckStatus::Fail)
    }
}

fn summarize_checks(checks: &[CheckResult]) -> ReportSummary {
    let failed = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Fail)
        .count();
    let passed = checks.len() - failed;
    let score = if checks.is_empty() {
        1.0
    } else {
        passed as f32 / checks.len() as f32
    };
    ReportSummary {
        status: if failed > 0 {
            ReportStatus::Fail
        } else {
            ReportStatus::Pass
        },
        passed,
        failed,
        score,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub seed: u64,
    pub ticks: u64,
    #[serde(default)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub status: ReportStatus,
    pub passed: usize,
    pub failed: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub expected: String,
    pub actual: String,
}

impl CheckResult {
    /// Passes when `actual` satisfies `accept`; both sides are recorded in
    /// debug form.
    pub fn compare<E: Debug, A: Debug>(
        name: &str,
        expected: E,
        actual: A,
        accept: impl FnOnce(&E, &A) -> bool,
    ) -> Self {
        let status = if accept(&expected, &actual) {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };
        Self {
            name: name.to_string(),
            status,
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    pub fn equal<T: Debug + PartialEq>(name: &str, expected: T, actual: T) -> Self {
        Self::compare(name, expected, actual, |e, a| e == a)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}
