//! Typed form of a function's `deadLetter` declaration.

use serde_json::{Map, Value};
use snafu::prelude::*;

use crate::error::{
    AmbiguousTargetSnafu, DeadLetterError, InvalidDeclarationSnafu, MissingTargetSnafu,
    UnexpectedTargetTypeSnafu,
};

const SQS_KEY: &str = "sqs";
const SNS_KEY: &str = "sns";
const TARGET_ARN_KEY: &str = "targetArn";

/// Field of a `targetArn` object naming the referenced logical id.
pub const REFERENCE_FIELD: &str = "GetResourceArn";

/// Which destination a function declared. Exactly one variant per function.
#[derive(Debug, Clone, PartialEq)]
pub enum DeadLetterSpec {
    /// `sqs`: a queue provisioned for the function. Holds the raw name or
    /// property bag; it is validated when compiled.
    ManagedQueue(Value),
    /// `sns`: a topic provisioned for the function.
    ManagedTopic(Value),
    /// `targetArn`: an externally owned destination.
    Explicit(ExplicitTarget),
}

/// The value of `targetArn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplicitTarget {
    /// `targetArn: null` opts out of a destination.
    Null,
    /// A literal address, validated on resolution.
    Arn(String),
    /// `{ GetResourceArn: <logical id> }`.
    Reference(ResourceReference),
}

/// Reference to a resource of the deployed stack by logical id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    pub logical_id: Option<String>,
}

impl ResourceReference {
    pub fn from_logical_id(logical_id: impl Into<String>) -> Self {
        Self {
            logical_id: Some(logical_id.into()),
        }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            logical_id: object
                .get(REFERENCE_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

impl DeadLetterSpec {
    /// Parse a raw `deadLetter` declaration, enforcing that exactly one of
    /// `sqs`, `sns` and `targetArn` is present.
    ///
    /// Presence is by key, so `targetArn: null` counts.
    pub fn from_declaration(function: &str, declaration: &Value) -> Result<Self, DeadLetterError> {
        let Some(object) = declaration.as_object() else {
            return InvalidDeclarationSnafu {
                function,
                kind: kind_of(declaration),
            }
            .fail();
        };

        let present = [SQS_KEY, SNS_KEY, TARGET_ARN_KEY]
            .iter()
            .filter(|key| object.contains_key(**key))
            .count();
        ensure!(present > 0, MissingTargetSnafu { function });
        ensure!(present == 1, AmbiguousTargetSnafu { function });

        if let Some(queue) = object.get(SQS_KEY) {
            Ok(Self::ManagedQueue(queue.clone()))
        } else if let Some(topic) = object.get(SNS_KEY) {
            Ok(Self::ManagedTopic(topic.clone()))
        } else {
            let target = object.get(TARGET_ARN_KEY).unwrap_or(&Value::Null);
            ExplicitTarget::from_value(function, target).map(Self::Explicit)
        }
    }
}

impl ExplicitTarget {
    /// Classify a `targetArn` value: null, then string, then object.
    pub fn from_value(function: &str, value: &Value) -> Result<Self, DeadLetterError> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::String(arn) => Ok(Self::Arn(arn.clone())),
            Value::Object(object) => Ok(Self::Reference(ResourceReference::from_object(object))),
            other => UnexpectedTargetTypeSnafu {
                function,
                kind: kind_of(other),
            }
            .fail(),
        }
    }
}

/// Human-readable JSON kind, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
