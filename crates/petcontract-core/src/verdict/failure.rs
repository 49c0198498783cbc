//! Failure types and structured representation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::contract::Violation;
use crate::matcher::Mismatch;

/// Category of a failure - determines exit code and how it is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// No response was obtained (connection refused, timeout, DNS)
    Infrastructure,
    /// Response body does not satisfy its contract
    ContractViolation,
    /// Expected value or status differs from the actual one
    AssertionFailure,
    /// A step of a multi-step workflow failed
    WorkflowFailure,
}

impl FailureType {
    /// Every category, in reporting order.
    pub const ALL: [Self; 4] = [
        Self::ContractViolation,
        Self::AssertionFailure,
        Self::WorkflowFailure,
        Self::Infrastructure,
    ];

    /// Exit code contributed by this failure type
    ///
    /// Infrastructure failures map to the tool-error code so they are never
    /// confused with a broken API.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Infrastructure => 3,
            Self::ContractViolation | Self::AssertionFailure | Self::WorkflowFailure => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::ContractViolation => "contract_violation",
            Self::AssertionFailure => "assertion_failure",
            Self::WorkflowFailure => "workflow_failure",
        }
    }

    /// Human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Infrastructure => "No response obtained from the API",
            Self::ContractViolation => "Response does not match its contract",
            Self::AssertionFailure => "Expected value does not match",
            Self::WorkflowFailure => "Workflow step failed",
        }
    }
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of the create → update → verify order workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Create,
    Update,
    Verify,
}

impl WorkflowStep {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Verify => "verify",
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Failure {
    pub failure_type: FailureType,
    /// Operation label, e.g. "GET /pets/1"
    pub operation: String,
    /// Workflow step the failure belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<WorkflowStep>,
    /// Self-contained description
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Failure {
    /// Transport failure before any response was obtained
    #[must_use]
    pub fn infrastructure(operation: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            failure_type: FailureType::Infrastructure,
            operation: operation.into(),
            step: None,
            message: error.to_string(),
            expected: None,
            actual: None,
        }
    }

    /// Expected-vs-actual mismatch, `label` names what was compared
    #[must_use]
    pub fn assertion(operation: impl Into<String>, label: &str, mismatch: Mismatch) -> Self {
        Self {
            failure_type: FailureType::AssertionFailure,
            operation: operation.into(),
            step: None,
            message: format!("{label}: {mismatch}"),
            expected: Some(mismatch.expected),
            actual: Some(mismatch.actual),
        }
    }

    /// Structural contract violation
    #[must_use]
    pub fn contract(operation: impl Into<String>, contract: &str, violation: &Violation) -> Self {
        Self {
            failure_type: FailureType::ContractViolation,
            operation: operation.into(),
            step: None,
            message: format!("{contract} contract: {violation}"),
            expected: Some(violation.expected.clone()),
            actual: Some(violation.actual.clone()),
        }
    }

    /// Attribute this failure to a workflow step.
    ///
    /// Infrastructure failures keep their type; everything else becomes a
    /// workflow failure with the original category prefixed to the message.
    #[must_use]
    pub fn in_step(mut self, step: WorkflowStep) -> Self {
        self.step = Some(step);
        if self.failure_type != FailureType::Infrastructure {
            self.message = format!("{}: {}", self.failure_type, self.message);
            self.failure_type = FailureType::WorkflowFailure;
        }
        self
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.step {
            Some(step) => write!(
                f,
                "[{}] {} step, {}: {}",
                self.failure_type, step, self.operation, self.message
            ),
            None => write!(f, "[{}] {}: {}", self.failure_type, self.operation, self.message),
        }
    }
}
