//! The compiled infrastructure template.
//!
//! A CloudFormation document whose `Resources` map the compiler writes into.
//! Other top-level sections of a loaded template are carried through
//! untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::prelude::*;
use std::path::Path;

use crate::error::{
    ParseTemplateSnafu, ReadTemplateSnafu, SerializeTemplateSnafu, TemplateError,
    WriteTemplateSnafu,
};

/// Logical id to resource definition, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "Resources", default)]
    resources: IndexMap<String, Value>,
    #[serde(flatten)]
    sections: Map<String, Value>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an existing template from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadTemplateSnafu {
            path: path.to_path_buf(),
        })?;
        serde_json::from_str(&contents).context(ParseTemplateSnafu {
            path: path.to_path_buf(),
        })
    }

    /// Insert a resource, replacing any definition already at `logical_id`.
    pub fn insert_resource(&mut self, logical_id: impl Into<String>, resource: Value) -> Option<Value> {
        self.resources.insert(logical_id.into(), resource)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    pub fn resources(&self) -> &IndexMap<String, Value> {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, TemplateError> {
        serde_json::to_string_pretty(self).context(SerializeTemplateSnafu)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), TemplateError> {
        let path = path.as_ref();
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).context(WriteTemplateSnafu {
            path: path.to_path_buf(),
        })
    }
}
