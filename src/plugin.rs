//! Orchestration of the dead-letter passes over every declared function.
//!
//! Functions are processed one at a time, in declaration order. The first
//! error aborts the pass. Before any function is updated, every declaration
//! is checked offline, so configuration errors never leave a partial deploy;
//! a remote failure mid-pass leaves earlier updates in place.

use std::fmt;

use tracing::{debug, info};

use crate::deadletter::{
    DeadLetterSpec, ResolvedAddress, TargetResolver, compile_dead_letter_alarms,
    compile_managed_queue, compile_managed_topic,
};
use crate::emit;
use crate::error::DeadLetterError;
use crate::metrics::events::{FailureStage, FunctionFailed, FunctionSkipped, FunctionUpdated};
use crate::provider::InfrastructureApiRef;
use crate::registry::FunctionRegistry;
use crate::template::Template;

/// A pending dead-letter update for one deployed function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub function_name: String,
    pub target_arn: ResolvedAddress,
}

/// What happened to one function during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// No dead-letter declaration.
    Skipped,
    /// Resolved without touching the deployed function.
    Validated(ResolvedAddress),
    /// Template resources written, by logical id.
    Compiled(Vec<String>),
    /// Remote dead-letter config replaced.
    Updated(ResolvedAddress),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionOutcome {
    pub function: String,
    pub status: OutcomeStatus,
}

impl FunctionOutcome {
    fn new(function: &str, status: OutcomeStatus) -> Self {
        Self {
            function: function.to_string(),
            status,
        }
    }
}

/// Resolves, compiles and applies dead-letter targets for a service.
pub struct DeadLetterPlugin<R> {
    registry: R,
    resolver: TargetResolver,
}

impl<R> fmt::Debug for DeadLetterPlugin<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadLetterPlugin")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl<R: FunctionRegistry> DeadLetterPlugin<R> {
    pub fn new(registry: R, provider: InfrastructureApiRef) -> Self {
        let resolver = TargetResolver::new(provider, registry.stack_name());
        Self { registry, resolver }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Build the update for `function`, or `None` if it declares no target.
    pub async fn build_update_request(
        &self,
        function: &str,
        allow_infrastructure_query: bool,
    ) -> Result<Option<UpdateRequest>, DeadLetterError> {
        let Some(declaration) = self.registry.dead_letter(function)? else {
            return Ok(None);
        };

        let ids = self.registry.logical_ids(function);
        let target_arn = self
            .resolver
            .resolve_declaration(&ids, declaration, allow_infrastructure_query)
            .await?;

        Ok(Some(UpdateRequest {
            function_name: self.registry.physical_name(function)?,
            target_arn,
        }))
    }

    /// Write the managed resources (and alarms) for one function.
    ///
    /// Explicit targets and absent declarations write nothing.
    pub fn compile_function_dead_letter_resource(
        &self,
        template: &mut Template,
        function: &str,
    ) -> Result<Vec<String>, DeadLetterError> {
        let Some(declaration) = self.registry.dead_letter(function)? else {
            return Ok(Vec::new());
        };

        let ids = self.registry.logical_ids(function);
        let spec = DeadLetterSpec::from_declaration(function, declaration)?;

        let mut written = match &spec {
            DeadLetterSpec::ManagedQueue(config) => compile_managed_queue(template, &ids, config)?,
            DeadLetterSpec::ManagedTopic(config) => compile_managed_topic(template, &ids, config)?,
            DeadLetterSpec::Explicit(_) => Vec::new(),
        };

        let physical_name = self.registry.physical_name(function)?;
        written.extend(compile_dead_letter_alarms(
            template,
            &ids,
            &physical_name,
            &spec,
            declaration.get("alarm"),
        )?);

        Ok(written)
    }

    /// Validate then compile every function into `template`.
    pub async fn compile_all_function_dead_letter_resources(
        &self,
        template: &mut Template,
    ) -> Result<Vec<FunctionOutcome>, DeadLetterError> {
        let mut outcomes = Vec::new();

        for function in self.registry.function_names() {
            let request = self
                .build_update_request(&function, false)
                .await
                .inspect_err(|_| {
                    emit!(FunctionFailed {
                        stage: FailureStage::Validate
                    })
                })?;

            if request.is_none() {
                debug!(function = %function, "No dead-letter target declared");
                emit!(FunctionSkipped);
                outcomes.push(FunctionOutcome::new(&function, OutcomeStatus::Skipped));
                continue;
            }

            let written = self
                .compile_function_dead_letter_resource(template, &function)
                .inspect_err(|_| {
                    emit!(FunctionFailed {
                        stage: FailureStage::Compile
                    })
                })?;

            info!(
                function = %function,
                resources = ?written,
                "Compiled dead-letter resources"
            );
            outcomes.push(FunctionOutcome::new(&function, OutcomeStatus::Compiled(written)));
        }

        Ok(outcomes)
    }

    /// Check one function without any remote call: resolve with placeholders
    /// and compile into a scratch template.
    async fn check_function(
        &self,
        function: &str,
    ) -> Result<Option<UpdateRequest>, DeadLetterError> {
        let request = self.build_update_request(function, false).await?;
        if request.is_some() {
            let mut scratch = Template::new();
            self.compile_function_dead_letter_resource(&mut scratch, function)?;
        }
        Ok(request)
    }

    /// Check every function without any remote call.
    pub async fn validate_all(&self) -> Result<Vec<FunctionOutcome>, DeadLetterError> {
        let mut outcomes = Vec::new();

        for function in self.registry.function_names() {
            let request = self.check_function(&function).await.inspect_err(|_| {
                emit!(FunctionFailed {
                    stage: FailureStage::Validate
                })
            })?;

            let status = match request {
                None => {
                    emit!(FunctionSkipped);
                    OutcomeStatus::Skipped
                }
                Some(request) => {
                    info!(
                        function = %request.function_name,
                        address = %request.target_arn,
                        placeholder = request.target_arn.is_placeholder(),
                        "Validated dead-letter target"
                    );
                    OutcomeStatus::Validated(request.target_arn)
                }
            };
            outcomes.push(FunctionOutcome::new(&function, status));
        }

        Ok(outcomes)
    }

    /// Check every function, then resolve each against the deployed stack
    /// and apply the result. With `allow_update` false this is
    /// [`Self::validate_all`].
    pub async fn set_dead_letter_configs(
        &self,
        allow_update: bool,
    ) -> Result<Vec<FunctionOutcome>, DeadLetterError> {
        if !allow_update {
            return self.validate_all().await;
        }

        let functions = self.registry.function_names();
        for function in &functions {
            self.check_function(function).await.inspect_err(|_| {
                emit!(FunctionFailed {
                    stage: FailureStage::Validate
                })
            })?;
        }
        debug!(functions = functions.len(), "All dead-letter declarations checked");

        let mut outcomes = Vec::new();

        for function in functions {
            let request = self
                .build_update_request(&function, true)
                .await
                .inspect_err(|_| {
                    emit!(FunctionFailed {
                        stage: FailureStage::Resolve
                    })
                })?;

            let Some(request) = request else {
                debug!(function = %function, "No dead-letter target declared");
                emit!(FunctionSkipped);
                outcomes.push(FunctionOutcome::new(&function, OutcomeStatus::Skipped));
                continue;
            };

            self.resolver
                .provider()
                .update_function_dead_letter(
                    &request.function_name,
                    &request.target_arn.to_string(),
                )
                .await
                .inspect_err(|_| {
                    emit!(FunctionFailed {
                        stage: FailureStage::Update
                    })
                })?;
            emit!(FunctionUpdated);

            info!(
                function = %request.function_name,
                address = %request.target_arn,
                placeholder = request.target_arn.is_placeholder(),
                "Updated dead-letter target"
            );
            outcomes.push(FunctionOutcome::new(
                &function,
                OutcomeStatus::Updated(request.target_arn),
            ));
        }

        Ok(outcomes)
    }
}
