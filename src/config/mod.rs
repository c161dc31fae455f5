//! Service configuration loading.
//!
//! Reads a serverless-style YAML service file, resolves `${env:...}` and
//! `${opt:...}` variables, and exposes the declared functions in declaration
//! order.

mod vars;

pub use vars::{VariableResolution, resolve_variables};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::deadletter::NamingStrategy;
use crate::error::{
    ConfigError, EnvInterpolationSnafu, ReadFileSnafu, UnsupportedFormatSnafu, YamlParseSnafu,
};

/// Top-level service file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name.
    pub service: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub custom: CustomConfig,
    /// Declared functions, keyed by their logical name.
    #[serde(default)]
    pub functions: IndexMap<String, FunctionConfig>,
}

/// Deployment target settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Deployment stage (default: "dev").
    #[serde(default = "default_stage")]
    pub stage: String,
    /// AWS region; the SDK default chain is used when unset.
    #[serde(default)]
    pub region: Option<String>,
    /// Stack name override (default: "<service>-<stage>").
    #[serde(default)]
    pub stack_name: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            stage: default_stage(),
            region: None,
            stack_name: None,
        }
    }
}

fn default_stage() -> String {
    "dev".to_string()
}

/// The `custom` block; only `deadLetter` is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomConfig {
    #[serde(default)]
    pub dead_letter: DeadLetterSettings,
}

/// Settings under `custom.deadLetter`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterSettings {
    /// Logical id naming strategy (default: framework).
    #[serde(default)]
    pub naming: NamingStrategy,
    /// Per-operation timeout for AWS calls, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Endpoint override for AWS calls (e.g. LocalStack).
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// One declared function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionConfig {
    /// Physical function name override.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
    /// Raw dead-letter declaration; `null` is treated as absent.
    #[serde(default)]
    pub dead_letter: Option<Value>,
}

/// Command-line overrides applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub stage: Option<String>,
    pub region: Option<String>,
}

impl Overrides {
    /// Values exposed to `${opt:...}` variables.
    fn as_options(&self) -> HashMap<String, String> {
        let mut options = HashMap::new();
        if let Some(stage) = &self.stage {
            options.insert("stage".to_string(), stage.clone());
        }
        if let Some(region) = &self.region {
            options.insert("region".to_string(), region.clone());
        }
        options
    }
}

impl ServiceConfig {
    /// Load a service file from disk.
    pub fn from_file(path: impl AsRef<Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        ensure!(
            is_yaml_file(path),
            UnsupportedFormatSnafu {
                path: path.to_path_buf()
            }
        );

        let contents = std::fs::read_to_string(path).context(ReadFileSnafu {
            path: path.to_path_buf(),
        })?;

        Self::from_yaml_str(&contents, overrides)
    }

    /// Parse a service file from YAML text.
    pub fn from_yaml_str(contents: &str, overrides: &Overrides) -> Result<Self, ConfigError> {
        let resolved = resolve_variables(contents, &overrides.as_options());
        ensure!(
            resolved.is_ok(),
            EnvInterpolationSnafu {
                message: resolved.errors.join("\n")
            }
        );

        let mut config: ServiceConfig =
            serde_yaml::from_str(&resolved.text).context(YamlParseSnafu)?;
        config.apply(overrides);
        Ok(config)
    }

    fn apply(&mut self, overrides: &Overrides) {
        if let Some(stage) = &overrides.stage {
            self.provider.stage = stage.clone();
        }
        if let Some(region) = &overrides.region {
            self.provider.region = Some(region.clone());
        }
    }

    /// Name of the deployed stack that logical ids are resolved against.
    pub fn stack_name(&self) -> String {
        self.provider
            .stack_name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.service, self.provider.stage))
    }

    /// Physical (deployed) name of a function.
    pub fn physical_name(&self, function: &str) -> String {
        self.functions
            .get(function)
            .and_then(|f| f.name.clone())
            .unwrap_or_else(|| format!("{}-{}-{}", self.service, self.provider.stage, function))
    }
}

/// Check if a path has a YAML extension.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}
