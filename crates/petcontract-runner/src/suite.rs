//! Suite execution: run every case of the catalogue and collect outcomes

use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use petcontract_core::contract::{ORDER, PET};
use petcontract_core::matcher::json_equals;
use petcontract_core::{
    CaseOutcome, Failure, RegistryError, SchemaRegistry, SuiteConfig, SuiteReport,
};

use crate::cases::{CaseKind, TestCase, catalogue};
use crate::client::{HttpClient, Response};
use crate::workflow::OrderPatchWorkflow;

/// Errors that stop a whole run, as opposed to failing one case.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Contract '{0}' is not registered")]
    MissingContract(String),
}

/// The expanded case catalogue plus run options.
#[derive(Debug, Clone)]
pub struct Suite {
    cases: Vec<TestCase>,
    stop_on_failure: bool,
}

impl Suite {
    #[must_use]
    pub fn from_config(suite: &SuiteConfig) -> Self {
        Self {
            cases: catalogue(suite),
            stop_on_failure: false,
        }
    }

    /// Keep only cases whose id contains `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<&str>) -> Self {
        if let Some(filter) = filter {
            self.cases.retain(|c| c.id.contains(filter));
        }
        self
    }

    #[must_use]
    pub fn with_stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Cases in run order. Sends nothing.
    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Run every case in order.
    ///
    /// # Errors
    ///
    /// Returns error if the registry lacks a contract the cases validate against.
    pub fn run(
        &self,
        client: &HttpClient,
        registry: &SchemaRegistry,
    ) -> Result<SuiteReport, SuiteError> {
        for name in [PET, ORDER] {
            if registry.contract(name).is_none() {
                return Err(SuiteError::MissingContract(name.to_string()));
            }
        }

        let mut rng = SmallRng::from_entropy();
        let run_id = format!("{:016x}", rng.r#gen::<u64>());
        tracing::info!(
            run_id = %run_id,
            base_url = client.base_url(),
            cases = self.cases.len(),
            "starting run"
        );

        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(self.cases.len());
        for case in &self.cases {
            let outcome = run_case(case, client, registry)?;
            tracing::info!(
                case = %outcome.id,
                passed = outcome.passed(),
                failures = outcome.failures.len(),
                duration_ms = outcome.duration_ms,
                "case finished"
            );
            let failed = !outcome.passed();
            outcomes.push(outcome);
            if self.stop_on_failure && failed {
                tracing::info!(case = %case.id, "stopping on first failure");
                break;
            }
        }

        Ok(SuiteReport::new(
            run_id,
            client.base_url(),
            outcomes,
            start.elapsed().as_secs_f64(),
        ))
    }
}

/// Run one concrete case and time it.
///
/// # Errors
///
/// Returns error if the case's contract is not registered.
pub fn run_case(
    case: &TestCase,
    client: &HttpClient,
    registry: &SchemaRegistry,
) -> Result<CaseOutcome, SuiteError> {
    let start = Instant::now();
    let mut workflow_state = None;

    let failures = match &case.kind {
        CaseKind::PetSchema { pet_id } => pet_schema(client, registry, *pet_id)?,
        CaseKind::FindByStatus { status } => find_by_status(client, registry, status)?,
        CaseKind::PetNotFound { pet_id, marker } => pet_not_found(client, *pet_id, marker),
        CaseKind::PetFetchIdempotent { pet_id } => pet_fetch_idempotent(client, registry, *pet_id)?,
        CaseKind::OrderPatchWorkflow {
            pet_id,
            new_status,
            success_message,
        } => {
            let workflow =
                OrderPatchWorkflow::new(client, registry, *pet_id, new_status, success_message);
            let run = workflow.run()?;
            workflow_state = Some(run.state.name());
            run.failures
        }
    };

    let mut outcome = CaseOutcome::new(&case.id, case.family(), failures)
        .with_duration_ms(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX));
    if let Some(state) = workflow_state {
        outcome = outcome.with_workflow_state(state);
    }
    Ok(outcome)
}

fn pet_schema(
    client: &HttpClient,
    registry: &SchemaRegistry,
    pet_id: i64,
) -> Result<Vec<Failure>, SuiteError> {
    let resp = match client.get(&format!("/pets/{pet_id}"), None) {
        Ok(resp) => resp,
        Err(e) => return Ok(vec![e.into_failure()]),
    };

    let mut checks = resp.checks();
    checks
        .status(resp.status_code(), 200)
        .conforms(&registry.validate(&resp.body_or_text(), PET)?);
    Ok(checks.into_failures())
}

fn find_by_status(
    client: &HttpClient,
    registry: &SchemaRegistry,
    status: &str,
) -> Result<Vec<Failure>, SuiteError> {
    let resp = match client.get("/pets/findByStatus", Some(&[("status", status)])) {
        Ok(resp) => resp,
        Err(e) => return Ok(vec![e.into_failure()]),
    };

    let mut checks = resp.checks();
    checks.status(resp.status_code(), 200);

    let expected = json!(status);
    let elements = resp.body().and_then(|b| b.as_array()).into_iter().flatten();
    for (i, element) in elements.enumerate() {
        if let Err(m) = json_equals(element.get("status"), &expected) {
            checks.fail(Failure::assertion(
                resp.operation(),
                &format!("element {i} field `status`"),
                m,
            ));
        }
    }

    checks.conforms_each(&registry.validate_each(&resp.body_or_text(), PET)?);
    Ok(checks.into_failures())
}

fn pet_not_found(client: &HttpClient, pet_id: i64, marker: &str) -> Vec<Failure> {
    let resp = match client.get(&format!("/pets/{pet_id}"), None) {
        Ok(resp) => resp,
        Err(e) => return vec![e.into_failure()],
    };

    let mut checks = resp.checks();
    checks
        .status(resp.status_code(), 404)
        .contains("body", resp.text(), marker);
    checks.into_failures()
}

fn pet_fetch_idempotent(
    client: &HttpClient,
    registry: &SchemaRegistry,
    pet_id: i64,
) -> Result<Vec<Failure>, SuiteError> {
    let endpoint = format!("/pets/{pet_id}");
    let mut responses: Vec<Response> = Vec::with_capacity(2);
    let mut failures = Vec::new();

    for _ in 0..2 {
        let resp = match client.get(&endpoint, None) {
            Ok(resp) => resp,
            Err(e) => {
                failures.push(e.into_failure());
                return Ok(failures);
            }
        };
        let mut checks = resp.checks();
        checks
            .status(resp.status_code(), 200)
            .conforms(&registry.validate(&resp.body_or_text(), PET)?);
        failures.extend(checks.into_failures());
        responses.push(resp);
    }

    if let [first, second] = responses.as_slice() {
        if let Err(m) = json_equals(Some(&second.body_or_text()), &first.body_or_text()) {
            failures.push(Failure::assertion(second.operation(), "repeated fetch body", m));
        }
    }
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use petcontract_core::FailureType;
    use petcontract_core::contract::pet;

    fn unreachable_client() -> HttpClient {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        HttpClient::new(
            format!("http://127.0.0.1:{port}"),
            &std::collections::HashMap::new(),
            std::time::Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn filter_keeps_matching_ids() {
        let suite = Suite::from_config(&SuiteConfig::default()).with_filter(Some("find_by_status"));
        let ids: Vec<&str> = suite.cases().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "find_by_status[available]",
                "find_by_status[sold]",
                "find_by_status[pending]",
            ]
        );
    }

    #[test]
    fn no_filter_keeps_everything() {
        let suite = Suite::from_config(&SuiteConfig::default()).with_filter(None);
        assert_eq!(suite.cases().len(), 11);
    }

    #[test]
    fn missing_contract_aborts_run() {
        let registry = SchemaRegistry::with_contracts([pet()]).unwrap();
        let suite = Suite::from_config(&SuiteConfig::default());

        let err = suite.run(&unreachable_client(), &registry).unwrap_err();
        assert!(matches!(err, SuiteError::MissingContract(ref name) if name == "order"));
    }

    #[test]
    fn unreachable_api_yields_infrastructure_failures() {
        let registry = SchemaRegistry::builtin().unwrap();
        let suite =
            Suite::from_config(&SuiteConfig::default()).with_filter(Some("get_by_id_404[0]"));

        let report = suite.run(&unreachable_client(), &registry).unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.run_id.len(), 16);
        assert!(report.cases[0].is_infrastructure_only());
        assert_eq!(report.cases[0].failures[0].operation, "GET /pets/0");
    }

    #[test]
    fn stop_on_failure_runs_one_case() {
        let registry = SchemaRegistry::builtin().unwrap();
        let suite = Suite::from_config(&SuiteConfig::default()).with_stop_on_failure(true);

        let report = suite.run(&unreachable_client(), &registry).unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.cases[0].id, "pet_schema[1]");
    }

    #[test]
    fn workflow_outcome_records_state() {
        let registry = SchemaRegistry::builtin().unwrap();
        let case = catalogue(&SuiteConfig::default())
            .into_iter()
            .find(|c| c.family() == crate::cases::PATCH_ORDER_BY_ID)
            .unwrap();

        let outcome = run_case(&case, &unreachable_client(), &registry).unwrap();

        assert_eq!(outcome.workflow_state.as_deref(), Some("pending"));
        assert_eq!(outcome.failures[0].failure_type, FailureType::Infrastructure);
    }
}
