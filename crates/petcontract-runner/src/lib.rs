//! petcontract-runner: sends requests and runs the contract suite
//!
//! [`HttpClient`] wraps a blocking reqwest client; [`Suite`] expands the case
//! catalogue and runs each case, including the order patch workflow, against
//! the API under test.

pub mod cases;
pub mod client;
pub mod suite;
pub mod workflow;

pub use cases::{CaseKind, TestCase, catalogue, parametrize};
pub use client::{HttpClient, Response, TransportError};
pub use suite::{Suite, SuiteError, run_case};
pub use workflow::{Advance, OrderPatchWorkflow, WorkflowRun, WorkflowState};
