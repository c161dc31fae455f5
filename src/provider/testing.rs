//! In-memory provider for unit tests.

use async_trait::async_trait;
use snafu::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::{DescribeResourceSnafu, ProviderError, TransportError, UpdateFunctionSnafu};

use super::{InfrastructureApi, ResourceKind, StackResource};

/// A remote call observed by [`FakeProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Update {
        function_name: String,
        target_arn: String,
    },
    Describe {
        stack_name: String,
        logical_id: String,
    },
}

/// Serves stack resources from a map and records every call.
#[derive(Debug, Default)]
pub struct FakeProvider {
    resources: HashMap<String, StackResource>,
    failing_updates: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, logical_id: &str, type_name: &str, physical_id: &str) -> Self {
        self.resources.insert(
            logical_id.to_string(),
            StackResource {
                kind: ResourceKind::from_type_name(type_name),
                physical_id: physical_id.to_string(),
            },
        );
        self
    }

    /// Make updates of `function_name` fail after being recorded.
    pub fn failing_update(mut self, function_name: &str) -> Self {
        self.failing_updates.insert(function_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update {
                    function_name,
                    target_arn,
                } => Some((function_name, target_arn)),
                Call::Describe { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl InfrastructureApi for FakeProvider {
    async fn update_function_dead_letter(
        &self,
        function_name: &str,
        target_arn: &str,
    ) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(Call::Update {
            function_name: function_name.to_string(),
            target_arn: target_arn.to_string(),
        });

        if self.failing_updates.contains(function_name) {
            let source: TransportError = format!("Function not found: {function_name}").into();
            return Err(source).context(UpdateFunctionSnafu { function_name });
        }
        Ok(())
    }

    async fn describe_stack_resource(
        &self,
        stack_name: &str,
        logical_id: &str,
    ) -> Result<StackResource, ProviderError> {
        self.calls.lock().unwrap().push(Call::Describe {
            stack_name: stack_name.to_string(),
            logical_id: logical_id.to_string(),
        });

        match self.resources.get(logical_id) {
            Some(resource) => Ok(resource.clone()),
            None => {
                let source: TransportError =
                    format!("Resource {logical_id} does not exist for stack {stack_name}").into();
                Err(source).context(DescribeResourceSnafu {
                    stack_name,
                    logical_id,
                })
            }
        }
    }
}
