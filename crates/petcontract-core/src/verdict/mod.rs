//! Verdict module - failure taxonomy and policy

mod failure;
mod policy;

pub use failure::{Failure, FailureType, WorkflowStep};
pub use policy::{Verdict, VerdictPolicy, VerdictStatus};
