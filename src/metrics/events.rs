//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence while resolving,
//! compiling or applying dead-letter targets.

use metrics::counter;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when a declaration resolves to an address.
pub struct DestinationResolved {
    /// "none", "placeholder" or "arn".
    pub kind: &'static str,
}

impl InternalEvent for DestinationResolved {
    fn emit(self) {
        trace!(kind = self.kind, "Destination resolved");
        counter!("deadletter_destinations_resolved_total", "kind" => self.kind).increment(1);
    }
}

/// Event emitted when a function's dead-letter config is updated remotely.
pub struct FunctionUpdated;

impl InternalEvent for FunctionUpdated {
    fn emit(self) {
        trace!("Function updated");
        counter!("deadletter_functions_updated_total").increment(1);
    }
}

/// Event emitted when a function without a declaration is skipped.
pub struct FunctionSkipped;

impl InternalEvent for FunctionSkipped {
    fn emit(self) {
        trace!("Function skipped");
        counter!("deadletter_functions_skipped_total").increment(1);
    }
}

/// Event emitted when a template resource is written.
pub struct ResourceCompiled {
    pub resource_type: &'static str,
}

impl InternalEvent for ResourceCompiled {
    fn emit(self) {
        trace!(resource_type = self.resource_type, "Resource compiled");
        counter!("deadletter_resources_compiled_total", "type" => self.resource_type).increment(1);
    }
}

/// Stage at which a function failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Validate,
    Compile,
    Resolve,
    Update,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Validate => "validate",
            FailureStage::Compile => "compile",
            FailureStage::Resolve => "resolve",
            FailureStage::Update => "update",
        }
    }
}

/// Event emitted when a function fails.
pub struct FunctionFailed {
    pub stage: FailureStage,
}

impl InternalEvent for FunctionFailed {
    fn emit(self) {
        trace!(stage = self.stage.as_str(), "Function failed");
        counter!("deadletter_functions_failed_total", "stage" => self.stage.as_str()).increment(1);
    }
}
