//! Structural contracts for API resources
//!
//! A [`Contract`] is plain data: field names, JSON types, required-ness and
//! allowed values. It never validates anything by itself; the
//! [`SchemaRegistry`] compiles every contract to JSON Schema once and is the
//! only place validation happens.

mod registry;

pub use registry::{
    ElementFailure, ListValidation, RegistryError, SchemaRegistry, ValidationReport, Violation,
};

use serde::{Deserialize, Serialize};

/// Contract name of the pet resource.
pub const PET: &str = "pet";
/// Contract name of the store order resource.
pub const ORDER: &str = "order";

/// Every status a pet can have.
pub const PET_STATUSES: &[&str] = &["available", "sold", "pending"];
/// Pet kinds known to the store.
pub const PET_TYPES: &[&str] = &["cat", "dog", "fish"];

/// JSON type of a contract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Number,
    String,
    Boolean,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Allowed values; empty means any value of `field_type`
    #[serde(default, rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

impl FieldSpec {
    /// Short description of what this field accepts, e.g.
    /// `string, one of [available, sold, pending]`.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.allowed.is_empty() {
            self.field_type.to_string()
        } else {
            format!("{}, one of [{}]", self.field_type, self.allowed.join(", "))
        }
    }

    fn to_json_schema(&self) -> serde_json::Value {
        let mut schema = serde_json::json!({ "type": self.field_type.as_str() });
        if !self.allowed.is_empty() {
            schema["enum"] = serde_json::json!(self.allowed);
        }
        schema
    }
}

/// Named structural description of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl Contract {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn required(self, name: &str, field_type: FieldType) -> Self {
        self.field(name, field_type, true, &[])
    }

    #[must_use]
    pub fn optional(self, name: &str, field_type: FieldType) -> Self {
        self.field(name, field_type, false, &[])
    }

    #[must_use]
    pub fn required_enum(self, name: &str, allowed: &[&str]) -> Self {
        self.field(name, FieldType::String, true, allowed)
    }

    #[must_use]
    pub fn optional_enum(self, name: &str, allowed: &[&str]) -> Self {
        self.field(name, FieldType::String, false, allowed)
    }

    fn field(
        mut self,
        name: &str,
        field_type: FieldType,
        required: bool,
        allowed: &[&str],
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            field_type,
            required,
            allowed: allowed.iter().map(|s| (*s).to_string()).collect(),
        });
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render the contract as a JSON Schema object.
    ///
    /// Unknown fields are allowed: a contract pins what must be there, not
    /// everything that may be.
    #[must_use]
    pub fn to_json_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        serde_json::json!({
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// The pet resource: `{id, name, status, type?}`.
#[must_use]
pub fn pet() -> Contract {
    Contract::new(PET)
        .required("id", FieldType::Integer)
        .required("name", FieldType::String)
        .required_enum("status", PET_STATUSES)
        .optional_enum("type", PET_TYPES)
}

/// The store order resource: `{id, pet_id, status}`.
#[must_use]
pub fn order() -> Contract {
    Contract::new(ORDER)
        .required("id", FieldType::Integer)
        .required("pet_id", FieldType::Integer)
        .required("status", FieldType::String)
}

/// Contracts every registry starts with.
#[must_use]
pub fn builtin() -> Vec<Contract> {
    vec![pet(), order()]
}
