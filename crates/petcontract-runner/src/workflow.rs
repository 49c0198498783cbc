//! Order patch workflow: create an order, patch its status, verify the pet
//!
//! An explicit state machine. Each call to [`OrderPatchWorkflow::advance`]
//! performs exactly one step; a step with any failure halts the workflow and
//! its failures are attributed to that step.

use serde_json::{Value, json};

use petcontract_core::contract::{ORDER, PET};
use petcontract_core::{Failure, Mismatch, SchemaRegistry, WorkflowStep};

use crate::client::HttpClient;
use crate::suite::SuiteError;

/// How far one workflow instance got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Pending,
    Created { order_id: Value, pet_id: Value },
    Updated { order_id: Value, pet_id: Value },
    Verified { pet_id: Value },
}

impl WorkflowState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Verified { .. } => "verified",
        }
    }

    /// Step that moves out of this state; `None` once verified.
    #[must_use]
    pub const fn next_step(&self) -> Option<WorkflowStep> {
        match self {
            Self::Pending => Some(WorkflowStep::Create),
            Self::Created { .. } => Some(WorkflowStep::Update),
            Self::Updated { .. } => Some(WorkflowStep::Verify),
            Self::Verified { .. } => None,
        }
    }
}

/// Result of one [`OrderPatchWorkflow::advance`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The step passed and the state moved forward.
    Advanced,
    /// Already verified; nothing was sent.
    Finished,
    /// The step failed; the state did not move.
    Halted(Vec<Failure>),
}

/// Final state and failures of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    pub state: WorkflowState,
    pub failures: Vec<Failure>,
}

type StepResult = Result<WorkflowState, Vec<Failure>>;

/// One create → update → verify run. Owns the order it creates.
pub struct OrderPatchWorkflow<'a> {
    client: &'a HttpClient,
    registry: &'a SchemaRegistry,
    pet_id: i64,
    new_status: &'a str,
    success_message: &'a str,
    state: WorkflowState,
}

impl<'a> OrderPatchWorkflow<'a> {
    #[must_use]
    pub fn new(
        client: &'a HttpClient,
        registry: &'a SchemaRegistry,
        pet_id: i64,
        new_status: &'a str,
        success_message: &'a str,
    ) -> Self {
        Self {
            client,
            registry,
            pet_id,
            new_status,
            success_message,
            state: WorkflowState::Pending,
        }
    }

    #[must_use]
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Perform the next step.
    ///
    /// # Errors
    ///
    /// Returns error if a contract the workflow needs is not registered.
    pub fn advance(&mut self) -> Result<Advance, SuiteError> {
        let Some(step) = self.state.next_step() else {
            return Ok(Advance::Finished);
        };
        tracing::debug!(step = step.as_str(), pet_id = self.pet_id, "workflow step");

        let result = match &self.state {
            WorkflowState::Pending => self.create()?,
            WorkflowState::Created { order_id, pet_id } => self.update(order_id, pet_id)?,
            WorkflowState::Updated { pet_id, .. } => self.verify(pet_id)?,
            WorkflowState::Verified { .. } => return Ok(Advance::Finished),
        };

        match result {
            Ok(next) => {
                self.state = next;
                Ok(Advance::Advanced)
            }
            Err(failures) => {
                tracing::debug!(step = step.as_str(), failures = failures.len(), "workflow halted");
                Ok(Advance::Halted(
                    failures.into_iter().map(|f| f.in_step(step)).collect(),
                ))
            }
        }
    }

    /// Advance until verified or halted.
    ///
    /// # Errors
    ///
    /// See [`OrderPatchWorkflow::advance`].
    pub fn run(mut self) -> Result<WorkflowRun, SuiteError> {
        loop {
            match self.advance()? {
                Advance::Advanced => {}
                Advance::Finished => {
                    return Ok(WorkflowRun {
                        state: self.state,
                        failures: Vec::new(),
                    });
                }
                Advance::Halted(failures) => {
                    return Ok(WorkflowRun {
                        state: self.state,
                        failures,
                    });
                }
            }
        }
    }

    /// POST the order, capture its id and pet id.
    fn create(&self) -> Result<StepResult, SuiteError> {
        let resp = match self.client.post("/store/order", &json!({ "pet_id": self.pet_id })) {
            Ok(resp) => resp,
            Err(e) => return Ok(Err(vec![e.into_failure()])),
        };

        let mut checks = resp.checks();
        checks
            .status(resp.status_code(), 201)
            .conforms(&self.registry.validate(&resp.body_or_text(), ORDER)?)
            .field_equals(resp.body(), "pet_id", &json!(self.pet_id));

        let order_id = resp.field("id").cloned();
        let pet_id = resp.field("pet_id").cloned();
        let (Some(order_id), Some(pet_id)) = (order_id, pet_id) else {
            if checks.is_clean() {
                checks.fail(Failure::assertion(
                    resp.operation(),
                    "field `id`",
                    Mismatch {
                        expected: "order id".into(),
                        actual: "<missing>".into(),
                    },
                ));
            }
            return Ok(Err(checks.into_failures()));
        };

        Ok(checks
            .finish()
            .map(|()| WorkflowState::Created { order_id, pet_id }))
    }

    /// PATCH the order status, expect the exact success message.
    fn update(&self, order_id: &Value, pet_id: &Value) -> Result<StepResult, SuiteError> {
        let endpoint = format!("/store/order/{}", path_param(order_id));
        let resp = match self.client.patch(&endpoint, &json!({ "status": self.new_status })) {
            Ok(resp) => resp,
            Err(e) => return Ok(Err(vec![e.into_failure()])),
        };

        let mut checks = resp.checks();
        checks
            .status(resp.status_code(), 200)
            .field_equals(resp.body(), "message", &json!(self.success_message));

        Ok(checks.finish().map(|()| WorkflowState::Updated {
            order_id: order_id.clone(),
            pet_id: pet_id.clone(),
        }))
    }

    /// Re-fetch the pet, expect the patched status.
    fn verify(&self, pet_id: &Value) -> Result<StepResult, SuiteError> {
        let endpoint = format!("/pets/{}", path_param(pet_id));
        let resp = match self.client.get(&endpoint, None) {
            Ok(resp) => resp,
            Err(e) => return Ok(Err(vec![e.into_failure()])),
        };

        let mut checks = resp.checks();
        checks
            .status(resp.status_code(), 200)
            .conforms(&self.registry.validate(&resp.body_or_text(), PET)?)
            .field_equals(resp.body(), "status", &json!(self.new_status));

        Ok(checks.finish().map(|()| WorkflowState::Verified {
            pet_id: pet_id.clone(),
        }))
    }
}

/// Captured JSON value as a path segment; strings go in bare.
fn path_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
