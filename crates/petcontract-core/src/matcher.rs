//! Assertion primitives and the per-step check accumulator
//!
//! No I/O. Primitive matchers return `Err(Mismatch)` instead of panicking so
//! they can be used standalone or collected by [`Checks`], which runs every
//! assertion of one step and keeps all failures (batched within a step).

use serde_json::Value;

use crate::contract::{ListValidation, ValidationReport};
use crate::verdict::Failure;

/// Longest excerpt of a response body quoted in a failure message.
const MAX_EXCERPT: usize = 200;

/// An expectation that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected `{expected}`, got `{actual}`")]
pub struct Mismatch {
    pub expected: String,
    pub actual: String,
}

/// Pass iff `actual == expected`.
///
/// # Errors
///
/// Returns the mismatch with both values rendered via `Display`.
pub fn equals<A, E>(actual: &A, expected: &E) -> Result<(), Mismatch>
where
    A: PartialEq<E> + std::fmt::Display + ?Sized,
    E: std::fmt::Display + ?Sized,
{
    if actual == expected {
        Ok(())
    } else {
        Err(Mismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Pass iff `haystack` contains `needle`.
///
/// # Errors
///
/// Returns the mismatch quoting (a prefix of) the haystack.
pub fn contains_substring(haystack: &str, needle: &str) -> Result<(), Mismatch> {
    if haystack.contains(needle) {
        Ok(())
    } else {
        Err(Mismatch {
            expected: format!("text containing {needle:?}"),
            actual: excerpt(haystack),
        })
    }
}

/// Pass iff the JSON `actual` equals `expected`. `None` means the field was absent.
///
/// # Errors
///
/// Returns the mismatch; an absent field renders as `<missing>`.
pub fn json_equals(actual: Option<&Value>, expected: &Value) -> Result<(), Mismatch> {
    match actual {
        Some(value) if value == expected => Ok(()),
        Some(value) => Err(Mismatch {
            expected: render(expected),
            actual: render(value),
        }),
        None => Err(Mismatch {
            expected: render(expected),
            actual: "<missing>".to_string(),
        }),
    }
}

/// Strings render bare, everything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Prefix of `text` safe to quote in a message.
fn excerpt(text: &str) -> String {
    if text.is_empty() {
        return "<empty>".to_string();
    }
    if text.len() <= MAX_EXCERPT {
        return text.to_string();
    }
    let mut end = MAX_EXCERPT;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…({} bytes total)", &text[..end], text.len())
}

/// Collects every failed assertion made against one operation.
///
/// Nothing short-circuits: a status mismatch does not hide a contract
/// violation reported on the same response.
#[derive(Debug)]
pub struct Checks {
    operation: String,
    failures: Vec<Failure>,
}

impl Checks {
    /// Start checking the response of `operation` (e.g. "GET /pets/1").
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            failures: Vec::new(),
        }
    }

    pub fn status(&mut self, actual: u16, expected: u16) -> &mut Self {
        if let Err(m) = equals(&actual, &expected) {
            self.push_assertion("status code", m);
        }
        self
    }

    pub fn equals<A, E>(&mut self, label: &str, actual: &A, expected: &E) -> &mut Self
    where
        A: PartialEq<E> + std::fmt::Display + ?Sized,
        E: std::fmt::Display + ?Sized,
    {
        if let Err(m) = equals(actual, expected) {
            self.push_assertion(label, m);
        }
        self
    }

    /// Assert `body[field] == expected`; a missing body or field fails.
    pub fn field_equals(
        &mut self,
        body: Option<&Value>,
        field: &str,
        expected: &Value,
    ) -> &mut Self {
        if let Err(m) = json_equals(body.and_then(|b| b.get(field)), expected) {
            self.push_assertion(&format!("field `{field}`"), m);
        }
        self
    }

    pub fn contains(&mut self, label: &str, haystack: &str, needle: &str) -> &mut Self {
        if let Err(m) = contains_substring(haystack, needle) {
            self.push_assertion(label, m);
        }
        self
    }

    /// One contract failure per violation.
    pub fn conforms(&mut self, report: &ValidationReport) -> &mut Self {
        for violation in &report.violations {
            self.failures
                .push(Failure::contract(&self.operation, &report.contract, violation));
        }
        self
    }

    /// One contract failure for the first violating element, with totals.
    pub fn conforms_each(&mut self, list: &ListValidation) -> &mut Self {
        let Some(first) = &list.first_failure else {
            return self;
        };
        let label = format!("{}[{}]", list.contract, first.index);
        for violation in &first.violations {
            self.failures
                .push(Failure::contract(&self.operation, &label, violation));
        }
        if let Some(last) = self.failures.last_mut() {
            last.message.push_str(&format!(
                " ({} violations in {} of {} elements)",
                list.violation_count, list.invalid_elements, list.checked
            ));
        }
        self
    }

    /// Record a failure produced elsewhere.
    pub fn fail(&mut self, failure: Failure) -> &mut Self {
        self.failures.push(failure);
        self
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    /// # Errors
    ///
    /// Returns every collected failure if any assertion failed.
    pub fn finish(self) -> Result<(), Vec<Failure>> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self.failures)
        }
    }

    fn push_assertion(&mut self, label: &str, mismatch: Mismatch) {
        self.failures
            .push(Failure::assertion(&self.operation, label, mismatch));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{PET, SchemaRegistry};
    use crate::verdict::FailureType;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn equals_message_format() {
        let err = equals(&404u16, &200u16).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"expected `200`, got `404`");
    }

    #[test]
    fn equals_str_and_string() {
        let actual = String::from("sold");
        assert!(equals(actual.as_str(), "sold").is_ok());
        assert!(equals(&actual, &String::from("pending")).is_err());
    }

    #[test]
    fn contains_substring_quotes_haystack() {
        let err = contains_substring("{\"error\": \"gone\"}", "not found").unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @r#"expected `text containing "not found"`, got `{"error": "gone"}`"#
        );
    }

    #[test]
    fn contains_substring_empty_haystack() {
        let err = contains_substring("", "not found").unwrap_err();
        assert_eq!(err.actual, "<empty>");
    }

    #[test]
    fn long_haystack_is_truncated() {
        let body = "é".repeat(300);
        let err = contains_substring(&body, "not found").unwrap_err();
        assert!(err.actual.ends_with("(600 bytes total)"));
        assert!(err.actual.len() < body.len());
    }

    #[test]
    fn json_equals_renders_strings_bare() {
        let err = json_equals(Some(&json!("available")), &json!("sold")).unwrap_err();
        assert_eq!(err.to_string(), "expected `sold`, got `available`");

        let err = json_equals(Some(&json!(3)), &json!(2)).unwrap_err();
        assert_eq!(err.to_string(), "expected `2`, got `3`");
    }

    #[test]
    fn json_equals_missing_field() {
        let err = json_equals(None, &json!("sold")).unwrap_err();
        assert_eq!(err.actual, "<missing>");
    }

    #[test]
    fn checks_accumulate_without_short_circuit() {
        let registry = SchemaRegistry::builtin().unwrap();
        let body = json!({"id": 1, "status": "available"});

        let mut checks = Checks::new("GET /pets/1");
        checks
            .status(500, 200)
            .field_equals(Some(&body), "status", &json!("sold"))
            .conforms(&registry.validate(&body, PET).unwrap());
        let failures = checks.finish().unwrap_err();

        let types: Vec<FailureType> = failures.iter().map(|f| f.failure_type).collect();
        assert_eq!(
            types,
            vec![
                FailureType::AssertionFailure,
                FailureType::AssertionFailure,
                FailureType::ContractViolation,
            ]
        );
        assert!(failures.iter().all(|f| f.operation == "GET /pets/1"));
        assert_eq!(
            failures[1].message,
            "field `status`: expected `sold`, got `available`"
        );
        assert_eq!(
            failures[2].message,
            "pet contract: /name: expected `string`, got `missing`"
        );
    }

    #[test]
    fn field_equals_without_body() {
        let mut checks = Checks::new("PATCH /store/order/1");
        checks.field_equals(None, "message", &json!("ok"));
        let failures = checks.into_failures();
        assert_eq!(failures[0].actual.as_deref(), Some("<missing>"));
    }

    #[test]
    fn conforms_each_reports_first_element_with_totals() {
        let registry = SchemaRegistry::builtin().unwrap();
        let pets = json!([
            {"id": 1, "name": "a", "status": "sold"},
            {"id": 2, "name": "b", "status": "gone"},
            {"id": 3, "status": "sold"},
        ]);
        let list = registry.validate_each(&pets, PET).unwrap();

        let mut checks = Checks::new("GET /pets/findByStatus");
        checks.conforms_each(&list);
        let failures = checks.into_failures();

        assert_eq!(failures.len(), 1);
        insta::assert_snapshot!(
            failures[0].message,
            @r#"pet[1] contract: /status: expected `string, one of [available, sold, pending]`, got `string "gone"` (2 violations in 2 of 3 elements)"#
        );
    }

    #[test]
    fn clean_checks_finish_ok() {
        let mut checks = Checks::new("GET /pets/1");
        checks.status(200, 200).contains("body", "pet not found", "not found");
        assert!(checks.is_clean());
        assert!(checks.finish().is_ok());
    }

    proptest! {
        #[test]
        fn equals_is_reflexive(s in ".*") {
            prop_assert!(equals(s.as_str(), s.as_str()).is_ok());
        }

        #[test]
        fn contains_finds_embedded_needle(prefix in ".*", needle in ".+", suffix in ".*") {
            let haystack = format!("{prefix}{needle}{suffix}");
            prop_assert!(contains_substring(&haystack, &needle).is_ok());
        }

        #[test]
        fn mismatch_always_names_both_sides(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(a != b);
            let err = equals(&a, &b).unwrap_err();
            prop_assert_eq!(err.to_string(), format!("expected `{b}`, got `{a}`"));
        }
    }
}
