//! Verdict policy - turns case outcomes into a pass/fail verdict and exit code

use crate::report::CaseOutcome;

use super::FailureType;

/// Policy for judging a run
#[derive(Debug, Clone, Default)]
pub struct VerdictPolicy {
    /// Treat a run with zero cases (e.g. a filter that matched nothing) as PASS
    pub allow_empty: bool,
}

impl VerdictPolicy {
    /// Determine final exit code from case outcomes.
    ///
    /// Contract, assertion and workflow failures win (exit 1). A run whose
    /// only failures are infrastructure failures exits 3.
    #[must_use]
    pub fn exit_code(&self, outcomes: &[CaseOutcome]) -> i32 {
        let mut has_infrastructure = false;
        let mut failure_code = 0;
        for failure in outcomes.iter().flat_map(|o| o.failures.iter()) {
            if failure.failure_type == FailureType::Infrastructure {
                has_infrastructure = true;
            } else {
                failure_code = failure_code.max(failure.failure_type.exit_code());
            }
        }

        if failure_code > 0 {
            return failure_code;
        }
        if has_infrastructure {
            return FailureType::Infrastructure.exit_code();
        }
        0
    }

    /// Determine verdict from case outcomes.
    ///
    /// PASS requires **every** case to pass.
    #[must_use]
    pub fn verdict(&self, outcomes: &[CaseOutcome]) -> Verdict {
        if outcomes.is_empty() {
            return if self.allow_empty {
                Verdict {
                    status: VerdictStatus::Pass,
                    exit_code: 0,
                    reason: "No cases were run".to_string(),
                }
            } else {
                Verdict {
                    status: VerdictStatus::Fail,
                    exit_code: 3,
                    reason: "No cases were run".to_string(),
                }
            };
        }

        let exit_code = self.exit_code(outcomes);
        let failed: Vec<&CaseOutcome> = outcomes.iter().filter(|o| !o.passed()).collect();

        if failed.is_empty() {
            return Verdict {
                status: VerdictStatus::Pass,
                exit_code,
                reason: format!("All {} cases passed", outcomes.len()),
            };
        }

        let infrastructure = failed.iter().filter(|o| o.is_infrastructure_only()).count();
        let mut parts = vec![format!("{} of {} cases failed", failed.len(), outcomes.len())];
        if infrastructure > 0 {
            parts.push(format!("{infrastructure} without a response (infrastructure)"));
        }

        Verdict {
            status: VerdictStatus::Fail,
            exit_code,
            reason: parts.join("; "),
        }
    }
}

/// Final verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub exit_code: i32,
    pub reason: String,
}

/// Pass or fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}
