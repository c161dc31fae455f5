//! Read access to the declared functions of a service.

use serde_json::Value;
use snafu::prelude::*;

use crate::config::ServiceConfig;
use crate::deadletter::{LogicalIds, NamingStrategy};
use crate::error::{DeadLetterError, UnknownFunctionSnafu};

/// Source of function declarations.
pub trait FunctionRegistry: Send + Sync {
    /// Function names in declaration order.
    fn function_names(&self) -> Vec<String>;

    /// The function's `deadLetter` declaration, if any. `null` counts as absent.
    fn dead_letter(&self, function: &str) -> Result<Option<&Value>, DeadLetterError>;

    /// Deployed name of the function.
    fn physical_name(&self, function: &str) -> Result<String, DeadLetterError>;

    /// Stack that logical ids are resolved against.
    fn stack_name(&self) -> String;

    fn naming(&self) -> NamingStrategy;

    fn logical_ids(&self, function: &str) -> LogicalIds {
        LogicalIds::for_function(function, self.naming())
    }
}

impl FunctionRegistry for ServiceConfig {
    fn function_names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    fn dead_letter(&self, function: &str) -> Result<Option<&Value>, DeadLetterError> {
        let declared = self
            .functions
            .get(function)
            .context(UnknownFunctionSnafu { function })?;
        Ok(declared.dead_letter.as_ref().filter(|value| !value.is_null()))
    }

    fn physical_name(&self, function: &str) -> Result<String, DeadLetterError> {
        ensure!(
            self.functions.contains_key(function),
            UnknownFunctionSnafu { function }
        );
        Ok(ServiceConfig::physical_name(self, function))
    }

    fn stack_name(&self) -> String {
        ServiceConfig::stack_name(self)
    }

    fn naming(&self) -> NamingStrategy {
        self.custom.dead_letter.naming
    }
}
