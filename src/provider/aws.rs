//! AWS implementation of the infrastructure API (Lambda + CloudFormation).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_lambda::types::DeadLetterConfig;
use aws_smithy_types::timeout::TimeoutConfig;
use snafu::prelude::*;
use std::time::Duration;
use tracing::debug;

use crate::error::{
    DescribeResourceSnafu, ProviderError, ResourceNotDescribedSnafu, TransportError,
    UpdateFunctionSnafu,
};

use super::{InfrastructureApi, ResourceKind, StackResource};

/// Client settings for [`AwsProvider`].
#[derive(Debug, Clone, Default)]
pub struct AwsProviderConfig {
    /// Region override; the SDK default chain is used when unset.
    pub region: Option<String>,
    /// Endpoint override (e.g. LocalStack).
    pub endpoint: Option<String>,
    /// Per-operation timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Lambda and CloudFormation clients sharing one SDK config.
#[derive(Clone)]
pub struct AwsProvider {
    lambda: aws_sdk_lambda::Client,
    cloudformation: aws_sdk_cloudformation::Client,
}

impl std::fmt::Debug for AwsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsProvider")
            .field("region", &self.lambda.config().region())
            .finish()
    }
}

impl AwsProvider {
    /// Load the SDK config from the environment and apply overrides.
    ///
    /// Retries are left to the SDK's standard retry policy.
    pub async fn new(config: AwsProviderConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = config.region {
            loader = loader.region(Region::new(region));
        }

        if let Some(endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            loader = loader.timeout_config(timeout_config);
        }

        Self::from_sdk_config(&loader.load().await)
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        Self {
            lambda: aws_sdk_lambda::Client::new(sdk_config),
            cloudformation: aws_sdk_cloudformation::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl InfrastructureApi for AwsProvider {
    async fn update_function_dead_letter(
        &self,
        function_name: &str,
        target_arn: &str,
    ) -> Result<(), ProviderError> {
        debug!(function_name, target_arn, "UpdateFunctionConfiguration");

        self.lambda
            .update_function_configuration()
            .function_name(function_name)
            .dead_letter_config(DeadLetterConfig::builder().target_arn(target_arn).build())
            .send()
            .await
            .map_err(|e| Box::new(e) as TransportError)
            .context(UpdateFunctionSnafu { function_name })?;

        Ok(())
    }

    async fn describe_stack_resource(
        &self,
        stack_name: &str,
        logical_id: &str,
    ) -> Result<StackResource, ProviderError> {
        debug!(stack_name, logical_id, "DescribeStackResource");

        let output = self
            .cloudformation
            .describe_stack_resource()
            .stack_name(stack_name)
            .logical_resource_id(logical_id)
            .send()
            .await
            .map_err(|e| Box::new(e) as TransportError)
            .context(DescribeResourceSnafu {
                stack_name,
                logical_id,
            })?;

        let detail = output
            .stack_resource_detail()
            .context(ResourceNotDescribedSnafu {
                stack_name,
                logical_id,
            })?;

        let physical_id = detail
            .physical_resource_id()
            .filter(|id| !id.is_empty())
            .context(ResourceNotDescribedSnafu {
                stack_name,
                logical_id,
            })?;

        Ok(StackResource {
            kind: ResourceKind::from_type_name(detail.resource_type()),
            physical_id: physical_id.to_string(),
        })
    }
}
