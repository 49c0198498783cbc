//! Case catalogue: the contract cases and their parametrized expansion
//!
//! A logical case (family) expands into one concrete [`TestCase`] per
//! parameter value. Each concrete case is self-contained: it carries every
//! input it needs, so cases can run in any order or concurrently.

use petcontract_core::SuiteConfig;

/// GET a known pet, expect 200 and a conforming body.
pub const PET_SCHEMA: &str = "pet_schema";
/// GET pets by status, every element has that status and conforms.
pub const FIND_BY_STATUS: &str = "find_by_status";
/// GET an id that cannot exist, expect 404 with a marker in the body.
pub const GET_BY_ID_404: &str = "get_by_id_404";
/// Create order → patch its status → re-fetch the pet.
pub const PATCH_ORDER_BY_ID: &str = "patch_order_by_id";
/// GET the same pet twice, both bodies identical.
pub const PET_FETCH_IDEMPOTENT: &str = "pet_fetch_idempotent";

/// Concrete inputs and expectations of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseKind {
    PetSchema {
        pet_id: i64,
    },
    FindByStatus {
        status: String,
    },
    PetNotFound {
        pet_id: i64,
        marker: String,
    },
    OrderPatchWorkflow {
        pet_id: i64,
        new_status: String,
        success_message: String,
    },
    PetFetchIdempotent {
        pet_id: i64,
    },
}

impl CaseKind {
    #[must_use]
    pub const fn family(&self) -> &'static str {
        match self {
            Self::PetSchema { .. } => PET_SCHEMA,
            Self::FindByStatus { .. } => FIND_BY_STATUS,
            Self::PetNotFound { .. } => GET_BY_ID_404,
            Self::OrderPatchWorkflow { .. } => PATCH_ORDER_BY_ID,
            Self::PetFetchIdempotent { .. } => PET_FETCH_IDEMPOTENT,
        }
    }

    /// Method of the first request the case sends.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::OrderPatchWorkflow { .. } => "POST",
            _ => "GET",
        }
    }

    /// Endpoint template of the first request the case sends.
    #[must_use]
    pub const fn endpoint_template(&self) -> &'static str {
        match self {
            Self::PetSchema { .. } | Self::PetNotFound { .. } | Self::PetFetchIdempotent { .. } => {
                "/pets/{pet_id}"
            }
            Self::FindByStatus { .. } => "/pets/findByStatus",
            Self::OrderPatchWorkflow { .. } => "/store/order",
        }
    }

    /// First endpoint with parameters filled in.
    #[must_use]
    pub fn endpoint(&self) -> String {
        match self {
            Self::PetSchema { pet_id }
            | Self::PetNotFound { pet_id, .. }
            | Self::PetFetchIdempotent { pet_id } => format!("/pets/{pet_id}"),
            Self::FindByStatus { status } => format!("/pets/findByStatus?status={status}"),
            Self::OrderPatchWorkflow { .. } => "/store/order".to_string(),
        }
    }

    /// Status the first request must return.
    #[must_use]
    pub const fn expected_status(&self) -> u16 {
        match self {
            Self::PetNotFound { .. } => 404,
            Self::OrderPatchWorkflow { .. } => 201,
            _ => 200,
        }
    }
}

/// One concrete, independently pass/fail case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Unique id, e.g. "find_by_status[sold]"
    pub id: String,
    pub kind: CaseKind,
}

impl TestCase {
    #[must_use]
    pub const fn family(&self) -> &'static str {
        self.kind.family()
    }
}

/// Expand one logical case into one concrete case per value.
///
/// Ids follow `family[label]`; `build` maps each value to its inputs.
pub fn parametrize<T>(
    family: &str,
    values: impl IntoIterator<Item = T>,
    label: impl Fn(&T) -> String,
    build: impl Fn(T) -> CaseKind,
) -> Vec<TestCase> {
    values
        .into_iter()
        .map(|value| {
            let id = format!("{family}[{}]", label(&value));
            let kind = build(value);
            debug_assert_eq!(kind.family(), family);
            TestCase { id, kind }
        })
        .collect()
}

/// Every case family expanded over the suite parameters, in run order.
#[must_use]
pub fn catalogue(suite: &SuiteConfig) -> Vec<TestCase> {
    let mut cases = Vec::new();

    cases.extend(parametrize(
        PET_SCHEMA,
        [suite.known_pet_id],
        i64::to_string,
        |pet_id| CaseKind::PetSchema { pet_id },
    ));

    cases.extend(parametrize(
        FIND_BY_STATUS,
        suite.statuses.iter().cloned(),
        String::clone,
        |status| CaseKind::FindByStatus { status },
    ));

    cases.extend(parametrize(
        GET_BY_ID_404,
        suite.missing_pet_ids.iter().copied(),
        i64::to_string,
        |pet_id| CaseKind::PetNotFound {
            pet_id,
            marker: suite.not_found_marker.clone(),
        },
    ));

    cases.extend(parametrize(
        PET_FETCH_IDEMPOTENT,
        [suite.known_pet_id],
        i64::to_string,
        |pet_id| CaseKind::PetFetchIdempotent { pet_id },
    ));

    // Mutates server state, so it runs after every read-only case
    cases.extend(parametrize(
        PATCH_ORDER_BY_ID,
        [suite.workflow_pet_id],
        |pet_id| format!("pet={pet_id}"),
        |pet_id| CaseKind::OrderPatchWorkflow {
            pet_id,
            new_status: suite.patched_order_status.clone(),
            success_message: suite.patch_success_message.clone(),
        },
    ));

    cases
}
