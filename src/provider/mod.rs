//! Remote infrastructure control API.
//!
//! The [`InfrastructureApi`] trait is the seam between resolution logic and
//! the cloud: it updates a function's failure destination and describes
//! resources of the deployed stack. [`AwsProvider`] talks to Lambda and
//! CloudFormation; [`OfflineProvider`] refuses every call and backs the
//! validation-only commands.

mod aws;
#[cfg(test)]
pub(crate) mod testing;

pub use aws::{AwsProvider, AwsProviderConfig};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::{OfflineSnafu, ProviderError};

const QUEUE_TYPE: &str = "AWS::SQS::Queue";
const TOPIC_TYPE: &str = "AWS::SNS::Topic";

/// A reference-counted infrastructure API.
pub type InfrastructureApiRef = Arc<dyn InfrastructureApi>;

/// Kind of a deployed stack resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Queue,
    Topic,
    Other(String),
}

impl ResourceKind {
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            QUEUE_TYPE => Self::Queue,
            TOPIC_TYPE => Self::Topic,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Queue => QUEUE_TYPE,
            Self::Topic => TOPIC_TYPE,
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A resource of the deployed stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackResource {
    pub kind: ResourceKind,
    /// Queue URL for queues, topic ARN for topics.
    pub physical_id: String,
}

/// Operations consumed from the remote control API.
#[async_trait]
pub trait InfrastructureApi: Send + Sync {
    /// Set (or clear, with an empty string) a function's dead-letter target.
    async fn update_function_dead_letter(
        &self,
        function_name: &str,
        target_arn: &str,
    ) -> Result<(), ProviderError>;

    /// Describe a resource of `stack_name` by logical id.
    async fn describe_stack_resource(
        &self,
        stack_name: &str,
        logical_id: &str,
    ) -> Result<StackResource, ProviderError>;
}

/// Provider for commands that must never reach the cloud.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

#[async_trait]
impl InfrastructureApi for OfflineProvider {
    async fn update_function_dead_letter(
        &self,
        _function_name: &str,
        _target_arn: &str,
    ) -> Result<(), ProviderError> {
        OfflineSnafu {
            operation: "update function dead-letter config",
        }
        .fail()
    }

    async fn describe_stack_resource(
        &self,
        _stack_name: &str,
        _logical_id: &str,
    ) -> Result<StackResource, ProviderError> {
        OfflineSnafu {
            operation: "describe stack resource",
        }
        .fail()
    }
}
