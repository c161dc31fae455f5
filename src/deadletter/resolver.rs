//! Target resolution: turn a `deadLetter` declaration into the address
//! assigned as the function's failure destination.
//!
//! Resolution runs in two modes. With infrastructure queries disallowed
//! (pre-flight validation, dry runs) stack references resolve to a
//! `${GetResourceArn: <id>}` placeholder and nothing remote is contacted.
//! With queries allowed, references are looked up in the deployed stack.

use serde_json::Value;
use snafu::prelude::*;
use tracing::debug;

use crate::emit;
use crate::error::{
    DeadLetterError, InvalidArnSnafu, MissingLogicalIdSnafu, ResourceNotDescribedSnafu,
    UnsupportedResourceSnafu,
};
use crate::metrics::events::DestinationResolved;
use crate::provider::{InfrastructureApiRef, ResourceKind};

use super::address::{ResolvedAddress, is_valid_target_arn, queue_url_to_arn};
use super::naming::LogicalIds;
use super::spec::{DeadLetterSpec, ExplicitTarget, ResourceReference};

/// Resolves dead-letter declarations against one deployed stack.
#[derive(Clone)]
pub struct TargetResolver {
    provider: InfrastructureApiRef,
    stack_name: String,
}

impl std::fmt::Debug for TargetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TargetResolver<{}>", self.stack_name)
    }
}

impl TargetResolver {
    pub fn new(provider: InfrastructureApiRef, stack_name: impl Into<String>) -> Self {
        Self {
            provider,
            stack_name: stack_name.into(),
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn provider(&self) -> &InfrastructureApiRef {
        &self.provider
    }

    /// Parse a raw declaration and resolve it.
    pub async fn resolve_declaration(
        &self,
        ids: &LogicalIds,
        declaration: &Value,
        allow_infrastructure_query: bool,
    ) -> Result<ResolvedAddress, DeadLetterError> {
        let spec = DeadLetterSpec::from_declaration(ids.function(), declaration)?;
        self.resolve_target_address(ids, &spec, allow_infrastructure_query)
            .await
    }

    /// Resolve a parsed declaration.
    ///
    /// Managed queues and topics resolve through their derived logical ids,
    /// exactly like an explicit stack reference.
    pub async fn resolve_target_address(
        &self,
        ids: &LogicalIds,
        spec: &DeadLetterSpec,
        allow_infrastructure_query: bool,
    ) -> Result<ResolvedAddress, DeadLetterError> {
        let function = ids.function();

        let address = match spec {
            DeadLetterSpec::ManagedQueue(_) => {
                let reference = ResourceReference::from_logical_id(ids.queue());
                self.resolve_from_reference(function, &reference, allow_infrastructure_query)
                    .await?
            }
            DeadLetterSpec::ManagedTopic(_) => {
                let reference = ResourceReference::from_logical_id(ids.topic());
                self.resolve_from_reference(function, &reference, allow_infrastructure_query)
                    .await?
            }
            DeadLetterSpec::Explicit(ExplicitTarget::Null) => ResolvedAddress::None,
            DeadLetterSpec::Explicit(ExplicitTarget::Arn(value)) => {
                resolve_from_string(function, value)?
            }
            DeadLetterSpec::Explicit(ExplicitTarget::Reference(reference)) => {
                self.resolve_from_reference(function, reference, allow_infrastructure_query)
                    .await?
            }
        };

        emit!(DestinationResolved {
            kind: address.kind()
        });
        Ok(address)
    }

    /// Resolve a stack reference, looking it up only when allowed.
    pub async fn resolve_from_reference(
        &self,
        function: &str,
        reference: &ResourceReference,
        allow_infrastructure_query: bool,
    ) -> Result<ResolvedAddress, DeadLetterError> {
        let logical_id = reference
            .logical_id
            .as_deref()
            .context(MissingLogicalIdSnafu { function })?;

        if !allow_infrastructure_query {
            return Ok(ResolvedAddress::placeholder(logical_id));
        }

        let resource = self
            .provider
            .describe_stack_resource(&self.stack_name, logical_id)
            .await?;
        debug!(
            function,
            logical_id,
            resource_type = %resource.kind,
            physical_id = %resource.physical_id,
            "Described dead-letter resource"
        );

        if resource.physical_id.trim().is_empty() {
            let source = ResourceNotDescribedSnafu {
                stack_name: self.stack_name.as_str(),
                logical_id,
            }
            .build();
            return Err(source.into());
        }

        match resource.kind {
            ResourceKind::Queue => Ok(ResolvedAddress::Arn(queue_url_to_arn(
                &resource.physical_id,
            )?)),
            ResourceKind::Topic => Ok(ResolvedAddress::Arn(resource.physical_id)),
            ResourceKind::Other(resource_type) => UnsupportedResourceSnafu {
                function,
                logical_id,
                resource_type,
            }
            .fail(),
        }
    }
}

/// Validate a literal `targetArn`. Blank strings mean no destination.
pub fn resolve_from_string(function: &str, value: &str) -> Result<ResolvedAddress, DeadLetterError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(ResolvedAddress::None);
    }

    ensure!(
        is_valid_target_arn(trimmed),
        InvalidArnSnafu { function, value }
    );
    Ok(ResolvedAddress::Arn(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadletter::NamingStrategy;
    use crate::error::ProviderError;
    use crate::provider::testing::{Call, FakeProvider};
    use serde_json::json;
    use std::sync::Arc;

    const STACK: &str = "svc-dev";
    const QUEUE_URL: &str = "https://sqs.us-west-2.amazonaws.com/123456789012/f1-dlq";
    const QUEUE_ARN: &str = "arn:aws:sqs:us-west-2:123456789012:f1-dlq";
    const TOPIC_ARN: &str = "arn:aws:sns:us-west-2:123456789012:f1-dlt";

    fn ids() -> LogicalIds {
        LogicalIds::for_function("f1", NamingStrategy::Framework)
    }

    fn fake() -> Arc<FakeProvider> {
        Arc::new(
            FakeProvider::new()
                .with_resource("F1DeadLetterQueue", "AWS::SQS::Queue", QUEUE_URL)
                .with_resource("F1DeadLetterTopic", "AWS::SNS::Topic", TOPIC_ARN)
                .with_resource("DingBat", "AWS::SNS::Topic", TOPIC_ARN)
                .with_resource("Bucket", "AWS::S3::Bucket", "my-bucket"),
        )
    }

    fn resolver(provider: &Arc<FakeProvider>) -> TargetResolver {
        TargetResolver::new(provider.clone(), STACK)
    }

    #[test]
    fn test_resolve_from_string() {
        assert_eq!(
            resolve_from_string("f1", TOPIC_ARN).unwrap(),
            ResolvedAddress::Arn(TOPIC_ARN.to_string())
        );
        assert_eq!(
            resolve_from_string("f1", &format!("  {QUEUE_ARN}\n")).unwrap(),
            ResolvedAddress::Arn(QUEUE_ARN.to_string())
        );
        assert_eq!(resolve_from_string("f1", "").unwrap(), ResolvedAddress::None);
        assert_eq!(resolve_from_string("f1", " \t ").unwrap(), ResolvedAddress::None);
    }

    #[test]
    fn test_resolve_from_string_rejects_malformed() {
        let err = resolve_from_string("f1", "arn:aws:sqs:us-west-2:123:f1-dlq").unwrap_err();
        assert!(matches!(err, DeadLetterError::InvalidArn { .. }));
        assert!(err.to_string().contains("arn:aws:sqs:us-west-2:123:f1-dlq"));
    }

    #[tokio::test]
    async fn test_placeholder_without_infrastructure_query() {
        let provider = fake();
        let address = resolver(&provider)
            .resolve_from_reference("f1", &ResourceReference::from_logical_id("DingBat"), false)
            .await
            .unwrap();

        assert_eq!(address.to_string(), "${GetResourceArn: DingBat}");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_managed_targets_use_placeholders_when_offline() {
        let provider = fake();
        let resolver = resolver(&provider);

        let queue = resolver
            .resolve_declaration(&ids(), &json!({"sqs": "f1-dlq"}), false)
            .await
            .unwrap();
        let topic = resolver
            .resolve_declaration(&ids(), &json!({"sns": "f1-dlt"}), false)
            .await
            .unwrap();

        assert_eq!(queue.to_string(), "${GetResourceArn: F1DeadLetterQueue}");
        assert_eq!(topic.to_string(), "${GetResourceArn: F1DeadLetterTopic}");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_topic_returns_physical_id() {
        let provider = fake();
        let address = resolver(&provider)
            .resolve_declaration(&ids(), &json!({"targetArn": {"GetResourceArn": "DingBat"}}), true)
            .await
            .unwrap();

        assert_eq!(address, ResolvedAddress::Arn(TOPIC_ARN.to_string()));
        assert_eq!(
            provider.calls(),
            vec![Call::Describe {
                stack_name: STACK.to_string(),
                logical_id: "DingBat".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_lookup_queue_converts_url() {
        let provider = fake();
        let address = resolver(&provider)
            .resolve_declaration(&ids(), &json!({"sqs": {"queueName": "f1-dlq"}}), true)
            .await
            .unwrap();

        assert_eq!(address, ResolvedAddress::Arn(QUEUE_ARN.to_string()));
    }

    #[tokio::test]
    async fn test_lookup_unsupported_kind() {
        let provider = fake();
        let err = resolver(&provider)
            .resolve_declaration(&ids(), &json!({"targetArn": {"GetResourceArn": "Bucket"}}), true)
            .await
            .unwrap_err();

        assert!(matches!(err, DeadLetterError::UnsupportedResource { .. }));
        assert!(err.to_string().contains("must be a queue or topic"));
        assert!(err.to_string().contains("AWS::S3::Bucket"));
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let provider = fake();
        let err = resolver(&provider)
            .resolve_declaration(&ids(), &json!({"targetArn": {"GetResourceArn": "Missing"}}), true)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeadLetterError::Provider {
                source: ProviderError::DescribeResource { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_lookup_rejects_empty_physical_id() {
        let provider = Arc::new(
            FakeProvider::new()
                .with_resource("F1DeadLetterTopic", "AWS::SNS::Topic", "")
                .with_resource("F1DeadLetterQueue", "AWS::SQS::Queue", "  "),
        );
        let resolver = resolver(&provider);

        for declaration in [json!({"sns": "f1-dlt"}), json!({"sqs": "f1-dlq"})] {
            let err = resolver
                .resolve_declaration(&ids(), &declaration, true)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                DeadLetterError::Provider {
                    source: ProviderError::ResourceNotDescribed { .. }
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_missing_logical_id() {
        let provider = fake();
        for allow in [false, true] {
            let err = resolver(&provider)
                .resolve_declaration(&ids(), &json!({"targetArn": {"Ref": "Queue"}}), allow)
                .await
                .unwrap_err();
            assert!(matches!(err, DeadLetterError::MissingLogicalId { .. }));
        }
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_null_target_never_queries() {
        let provider = fake();
        let address = resolver(&provider)
            .resolve_declaration(&ids(), &json!({"targetArn": null}), true)
            .await
            .unwrap();

        assert_eq!(address, ResolvedAddress::None);
        assert_eq!(address.to_string(), "");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_literal_arn_is_not_looked_up() {
        let provider = fake();
        let address = resolver(&provider)
            .resolve_declaration(&ids(), &json!({"targetArn": QUEUE_ARN}), true)
            .await
            .unwrap();

        assert_eq!(address.to_string(), QUEUE_ARN);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cardinality_errors() {
        let provider = fake();
        let resolver = resolver(&provider);

        let err = resolver
            .resolve_declaration(&ids(), &json!({}), true)
            .await
            .unwrap_err();
        assert!(matches!(err, DeadLetterError::MissingTarget { .. }));

        let err = resolver
            .resolve_declaration(&ids(), &json!({"sqs": "q", "sns": "t"}), true)
            .await
            .unwrap_err();
        assert!(matches!(err, DeadLetterError::AmbiguousTarget { .. }));
        assert!(provider.calls().is_empty());
    }
}
