//! Run report: per-case outcomes and totals
//!
//! This is what `petcontract run --output json` prints and what gets saved
//! next to each run, so its JSON Schema is exported for downstream tooling.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::verdict::{Failure, FailureType};

/// Pass/fail status of one concrete case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
}

/// Outcome of one concrete (already parametrized) case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CaseOutcome {
    /// Case id, e.g. "find_by_status[sold]"
    pub id: String,
    /// Logical case family, e.g. "find_by_status"
    pub family: String,
    pub status: CaseStatus,
    #[serde(default)]
    pub failures: Vec<Failure>,
    /// Last state a workflow case reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl CaseOutcome {
    /// Outcome derived from the collected failures: passed iff there are none.
    #[must_use]
    pub fn new(id: impl Into<String>, family: impl Into<String>, failures: Vec<Failure>) -> Self {
        let status = if failures.is_empty() {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };
        Self {
            id: id.into(),
            family: family.into(),
            status,
            failures,
            workflow_state: None,
            duration_ms: 0,
        }
    }

    #[must_use]
    pub fn with_workflow_state(mut self, state: impl Into<String>) -> Self {
        self.workflow_state = Some(state.into());
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == CaseStatus::Passed
    }

    /// True when every failure of this case is an infrastructure failure.
    #[must_use]
    pub fn is_infrastructure_only(&self) -> bool {
        !self.failures.is_empty()
            && self
                .failures
                .iter()
                .all(|f| f.failure_type == FailureType::Infrastructure)
    }
}

/// Everything one suite run produced.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuiteReport {
    /// Random id distinguishing this run
    pub run_id: String,
    /// API under test
    pub base_url: String,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    #[serde(default)]
    pub duration_secs: f64,
    pub cases: Vec<CaseOutcome>,
}

impl SuiteReport {
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        base_url: impl Into<String>,
        cases: Vec<CaseOutcome>,
        duration_secs: f64,
    ) -> Self {
        let total = u64::try_from(cases.len()).unwrap_or(u64::MAX);
        let passed = u64::try_from(cases.iter().filter(|c| c.passed()).count()).unwrap_or(u64::MAX);
        Self {
            run_id: run_id.into(),
            base_url: base_url.into(),
            total,
            passed,
            failed: total - passed,
            duration_secs,
            cases,
        }
    }

    /// All failures across cases, in case order.
    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.cases.iter().flat_map(|c| c.failures.iter())
    }

    /// Failure count per category, omitting categories that never occurred.
    #[must_use]
    pub fn failure_counts(&self) -> Vec<(FailureType, usize)> {
        FailureType::ALL
            .into_iter()
            .map(|ty| (ty, self.failures().filter(|f| f.failure_type == ty).count()))
            .filter(|&(_, n)| n > 0)
            .collect()
    }
}

/// Generate JSON Schema for the report format.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(SuiteReport);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
