//! Contract registry: compiled contracts and structural validation

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use jsonschema::error::ValidationErrorKind;
use serde::{Deserialize, Serialize};

use super::Contract;

/// Holds every known contract, each compiled to a JSON Schema validator.
///
/// Built once, read-only afterwards, safe to share across threads.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    entries: BTreeMap<String, Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    contract: Contract,
    validator: jsonschema::Validator,
}

/// One structural mismatch between a JSON value and a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer of the offending field (`""` is the document root)
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() {
            "<root>"
        } else {
            &self.path
        };
        write!(f, "{path}: expected `{}`, got `{}`", self.expected, self.actual)
    }
}

/// Result of validating one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub contract: String,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// The first element of a sequence that broke the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFailure {
    pub index: usize,
    pub violations: Vec<Violation>,
}

/// Result of validating every element of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListValidation {
    pub contract: String,
    /// Elements validated
    pub checked: usize,
    /// Elements with at least one violation
    pub invalid_elements: usize,
    /// Violations across all elements
    pub violation_count: usize,
    pub first_failure: Option<ElementFailure>,
}

impl ListValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.first_failure.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown contract '{0}'")]
    UnknownContract(String),
    #[error("Contract '{name}' does not compile: {reason}")]
    InvalidContract { name: String, reason: String },
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SchemaRegistry {
    /// Registry with the builtin `pet` and `order` contracts.
    ///
    /// # Errors
    ///
    /// Only if a builtin contract fails to compile.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::with_contracts(super::builtin())
    }

    /// Registry with exactly the given contracts. Later contracts replace
    /// earlier ones of the same name.
    ///
    /// # Errors
    ///
    /// Returns error if a contract cannot be compiled to a validator.
    pub fn with_contracts(
        contracts: impl IntoIterator<Item = Contract>,
    ) -> Result<Self, RegistryError> {
        let mut entries = BTreeMap::new();
        for contract in contracts {
            let entry = Entry::compile(contract)?;
            entries.insert(entry.contract.name.clone(), entry);
        }
        Ok(Self { entries })
    }

    /// Builtin contracts merged with the contracts listed in `path`
    /// (a JSON or YAML sequence of contracts).
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or compiled.
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Io(path.to_path_buf(), e.to_string()))?;
        let extra = parse_contracts(path, &content)?;
        tracing::debug!(path = %path.display(), count = extra.len(), "loaded contracts");
        Self::with_contracts(super::builtin().into_iter().chain(extra))
    }

    /// Registered contracts in name order.
    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.entries.values().map(|e| &e.contract)
    }

    #[must_use]
    pub fn contract(&self, name: &str) -> Option<&Contract> {
        self.entries.get(name).map(|e| &e.contract)
    }

    /// Validate one value against the named contract.
    ///
    /// # Errors
    ///
    /// Returns error if no contract with that name is registered.
    pub fn validate(
        &self,
        instance: &serde_json::Value,
        contract: &str,
    ) -> Result<ValidationReport, RegistryError> {
        let entry = self.entry(contract)?;
        let violations = entry.violations(instance);
        if !violations.is_empty() {
            tracing::debug!(contract, count = violations.len(), "contract violated");
        }
        Ok(ValidationReport {
            contract: contract.to_string(),
            violations,
        })
    }

    /// Validate every element of a JSON array against the named contract.
    ///
    /// A non-array value is reported as a single root violation at index 0.
    ///
    /// # Errors
    ///
    /// Returns error if no contract with that name is registered.
    pub fn validate_each(
        &self,
        instances: &serde_json::Value,
        contract: &str,
    ) -> Result<ListValidation, RegistryError> {
        let entry = self.entry(contract)?;

        let Some(items) = instances.as_array() else {
            return Ok(ListValidation {
                contract: contract.to_string(),
                checked: 0,
                invalid_elements: 1,
                violation_count: 1,
                first_failure: Some(ElementFailure {
                    index: 0,
                    violations: vec![Violation {
                        path: String::new(),
                        expected: format!("array of {contract}"),
                        actual: describe_value(instances),
                    }],
                }),
            });
        };

        let mut result = ListValidation {
            contract: contract.to_string(),
            checked: items.len(),
            invalid_elements: 0,
            violation_count: 0,
            first_failure: None,
        };
        for (index, item) in items.iter().enumerate() {
            let violations = entry.violations(item);
            if violations.is_empty() {
                continue;
            }
            result.invalid_elements += 1;
            result.violation_count += violations.len();
            if result.first_failure.is_none() {
                result.first_failure = Some(ElementFailure { index, violations });
            }
        }
        Ok(result)
    }

    fn entry(&self, name: &str) -> Result<&Entry, RegistryError> {
        self.entries
            .get(name)
            .ok_or_else(|| RegistryError::UnknownContract(name.to_string()))
    }
}

impl Entry {
    fn compile(contract: Contract) -> Result<Self, RegistryError> {
        let validator = jsonschema::validator_for(&contract.to_json_schema()).map_err(|e| {
            RegistryError::InvalidContract {
                name: contract.name.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { contract, validator })
    }

    /// Violations of `instance`, at most one per field path.
    fn violations(&self, instance: &serde_json::Value) -> Vec<Violation> {
        let mut out: Vec<Violation> = Vec::new();
        for error in self.validator.iter_errors(instance) {
            let violation = match error.kind() {
                ValidationErrorKind::Required { property } => {
                    let field = property.as_str().unwrap_or_default();
                    Violation {
                        path: format!("{}/{field}", error.instance_path().as_str()),
                        expected: self.expected_for(field),
                        actual: "missing".to_string(),
                    }
                }
                _ => {
                    let path = error.instance_path().as_str().to_string();
                    let expected = match path.strip_prefix('/') {
                        Some(field) => self.expected_for(field),
                        None => "object".to_string(),
                    };
                    Violation {
                        path,
                        expected,
                        actual: describe_value(error.instance()),
                    }
                }
            };
            // type + enum on the same field report twice; keep the first
            if !out.iter().any(|v| v.path == violation.path) {
                out.push(violation);
            }
        }
        out
    }

    fn expected_for(&self, field: &str) -> String {
        self.contract
            .get(field)
            .map_or_else(|| "value".to_string(), |f| f.describe())
    }
}

/// Short human description of a JSON value, e.g. `string "lost"`.
#[must_use]
pub fn describe_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => format!("boolean {b}"),
        serde_json::Value::Number(n) if n.is_f64() => format!("number {n}"),
        serde_json::Value::Number(n) => format!("integer {n}"),
        serde_json::Value::String(s) => format!("string {s:?}"),
        serde_json::Value::Array(items) => format!("array of {} items", items.len()),
        serde_json::Value::Object(_) => "object".to_string(),
    }
}

/// Parse a contract file as JSON or YAML.
///
/// Detection strategy: extension first (`.yaml`/`.yml`/`.json`), then
/// content sniffing (leading `[` or `{` → JSON, otherwise YAML).
fn parse_contracts(path: &Path, content: &str) -> Result<Vec<Contract>, RegistryError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let as_json = match ext.as_str() {
        "yaml" | "yml" => false,
        "json" => true,
        _ => content.trim_start().starts_with(['[', '{']),
    };

    if as_json {
        serde_json::from_str(content)
            .map_err(|e| RegistryError::Parse(format!("Invalid JSON: {e}")))
    } else {
        serde_yml::from_str(content)
            .map_err(|e| RegistryError::Parse(format!("Invalid YAML: {e}")))
    }
}
