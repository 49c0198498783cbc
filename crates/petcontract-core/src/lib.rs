//! petcontract-core: Contracts, matchers and verdict logic for API contract testing
//!
//! This crate holds everything that does not talk to the network: the
//! configuration, the structural contracts of the pet store resources and the
//! registry that validates against them, the assertion layer, and the failure
//! taxonomy that turns case outcomes into a pass/fail verdict.

pub mod config;
pub mod contract;
pub mod matcher;
pub mod report;
pub mod verdict;

pub use config::{Config, ConfigError, SuiteConfig};
pub use contract::{Contract, FieldSpec, FieldType, RegistryError, SchemaRegistry};
pub use matcher::{Checks, Mismatch};
pub use report::{CaseOutcome, CaseStatus, SuiteReport};
pub use verdict::{Failure, FailureType, Verdict, VerdictPolicy, VerdictStatus, WorkflowStep};
