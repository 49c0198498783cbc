//! Project configuration for contract runs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable that replaces `base_url` when set.
pub const BASE_URL_ENV: &str = "PETCONTRACT_BASE_URL";

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the pet store under test
    pub base_url: String,

    /// HTTP headers sent with every request (Auth, API keys, etc.)
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Client-level request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra contract definitions (JSON or YAML), merged over the builtins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contracts: Option<PathBuf>,

    /// Parameters of the case catalogue
    #[serde(default)]
    pub suite: SuiteConfig,
}

/// Inputs the case families are parametrized over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Pet that must exist for the single-fetch cases
    pub known_pet_id: i64,
    /// Pet the order workflow buys
    pub workflow_pet_id: i64,
    /// Every valid pet status, each one becomes a findByStatus case
    pub statuses: Vec<String>,
    /// Ids no pet will ever have
    pub missing_pet_ids: Vec<i64>,
    /// Substring the 404 body must contain
    pub not_found_marker: String,
    /// Status the workflow patches the order to
    pub patched_order_status: String,
    /// Exact message of a successful order patch
    pub patch_success_message: String,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            known_pet_id: 1,
            workflow_pet_id: 2,
            statuses: vec!["available".into(), "sold".into(), "pending".into()],
            missing_pet_ids: vec![999, -1, -999, 9_999_999, 0],
            not_found_marker: "not found".into(),
            patched_order_status: "sold".into(),
            patch_success_message: "Order and pet status updated successfully".into(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            headers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            contracts: None,
            suite: SuiteConfig::default(),
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        let mut config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };

        config.validate()?;

        // Relative contract paths are relative to the config file
        if let (Some(contracts), Some(dir)) = (&config.contracts, path.parent()) {
            if contracts.is_relative() && !dir.as_os_str().is_empty() {
                config.contracts = Some(dir.join(contracts));
            }
        }

        tracing::debug!(path = %path.display(), base_url = %config.base_url, "loaded config");
        Ok(config)
    }

    /// Reject values that would make every request fail.
    ///
    /// # Errors
    ///
    /// Returns error if `timeout_secs` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from default location (.petcontract.toml)
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = [".petcontract.toml", ".petcontract.json", "petcontract.toml"];

        for name in candidates {
            let path = Path::new(name);
            if path.exists() {
                return Self::load(path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// Replace `base_url` with `PETCONTRACT_BASE_URL` when it is set and non-empty.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    /// Create example config file
    pub fn example() -> &'static str {
        r#"# petcontract configuration

# Pet store under test
base_url = "http://localhost:5000"

# Request timeout in seconds (per client, not per call)
timeout_secs = 10

# Extra or overriding contracts (JSON or YAML list)
# contracts = "contracts.yaml"

# HTTP headers sent with every request
[headers]
# Authorization = "Bearer your-token-here"

# Case catalogue parameters
[suite]
known_pet_id = 1
workflow_pet_id = 2
statuses = ["available", "sold", "pending"]
missing_pet_ids = [999, -1, -999, 9999999, 0]
not_found_marker = "not found"
patched_order_status = "sold"
patch_success_message = "Order and pet status updated successfully"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.suite.statuses, vec!["available", "sold", "pending"]);
        assert_eq!(config.suite.missing_pet_ids, vec![999, -1, -999, 9_999_999, 0]);
    }

    #[test]
    fn parse_minimal_toml_fills_suite_defaults() {
        let config: Config = toml::from_str(r#"base_url = "http://localhost:3000""#).unwrap();

        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout_secs, 10);
        assert!(config.headers.is_empty());
        assert_eq!(config.suite, SuiteConfig::default());
    }

    #[test]
    fn parse_toml_with_suite_overrides() {
        let toml = r#"
base_url = "http://localhost:3000"
timeout_secs = 3

[headers]
Authorization = "Bearer token123"

[suite]
known_pet_id = 7
statuses = ["available"]
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.timeout_secs, 3);
        assert_eq!(
            config.headers.get("Authorization"),
            Some(&"Bearer token123".to_string())
        );
        assert_eq!(config.suite.known_pet_id, 7);
        assert_eq!(config.suite.statuses, vec!["available"]);
        // untouched keys keep their defaults
        assert_eq!(config.suite.workflow_pet_id, 2);
        assert_eq!(config.suite.not_found_marker, "not found");
    }

    #[test]
    fn example_parses_to_defaults() {
        let config: Config = toml::from_str(Config::example()).unwrap();
        let default = Config::default();

        assert_eq!(config.base_url, default.base_url);
        assert_eq!(config.suite, default.suite);
        assert!(config.contracts.is_none());
    }

    #[test]
    fn load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("petcontract.json");
        std::fs::write(
            &path,
            r#"{"base_url": "http://api.test", "suite": {"workflow_pet_id": 5}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, "http://api.test");
        assert_eq!(config.suite.workflow_pet_id, 5);
    }

    #[test]
    fn load_resolves_contracts_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("petcontract.toml");
        std::fs::write(
            &path,
            "base_url = \"http://api.test\"\ncontracts = \"contracts.yaml\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.contracts, Some(dir.path().join("contracts.yaml")));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn load_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "base_url = [").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn load_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("petcontract.toml");
        std::fs::write(&path, "base_url = \"http://api.test\"\ntimeout_secs = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(err.to_string(), "Invalid config: timeout_secs must be at least 1");
    }
}
