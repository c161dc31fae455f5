//! Logical id derivation for generated resources.

use serde::{Deserialize, Serialize};

const QUEUE_SUFFIX: &str = "DeadLetterQueue";
const QUEUE_POLICY_SUFFIX: &str = "DeadLetterQueuePolicy";
const TOPIC_SUFFIX: &str = "DeadLetterTopic";
const QUEUE_ALARM_SUFFIX: &str = "DeadLetterQueueAlarm";
const TOPIC_ALARM_SUFFIX: &str = "DeadLetterTopicAlarm";
const LAMBDA_FUNCTION_SUFFIX: &str = "LambdaFunction";

/// Upper-case the first character of `name`.
pub fn normalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// How function names become the prefix of template logical ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// Capitalize the first letter only.
    Simple,
    /// Match the deployment framework's own normalizer so ids line up with
    /// the rest of the generated template (`my-fn` -> `MyDashfn`).
    #[default]
    Framework,
}

impl NamingStrategy {
    pub fn normalize_function_name(&self, name: &str) -> String {
        match self {
            NamingStrategy::Simple => normalize(name),
            NamingStrategy::Framework => {
                normalize(&name.replace('-', "Dash").replace('_', "Underscore"))
            }
        }
    }
}

/// Deterministic logical ids for one function's dead-letter resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalIds {
    function: String,
    normalized: String,
}

impl LogicalIds {
    pub fn new(function: &str, normalized: String) -> Self {
        Self {
            function: function.to_string(),
            normalized,
        }
    }

    /// Build ids for `function` using `strategy`.
    pub fn for_function(function: &str, strategy: NamingStrategy) -> Self {
        Self::new(function, strategy.normalize_function_name(function))
    }

    /// The function's declared (un-normalized) name.
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn queue(&self) -> String {
        format!("{}{QUEUE_SUFFIX}", self.normalized)
    }

    pub fn queue_policy(&self) -> String {
        format!("{}{QUEUE_POLICY_SUFFIX}", self.normalized)
    }

    pub fn topic(&self) -> String {
        format!("{}{TOPIC_SUFFIX}", self.normalized)
    }

    pub fn queue_alarm(&self) -> String {
        format!("{}{QUEUE_ALARM_SUFFIX}", self.normalized)
    }

    pub fn topic_alarm(&self) -> String {
        format!("{}{TOPIC_ALARM_SUFFIX}", self.normalized)
    }

    /// The function resource the framework generates for this function.
    pub fn lambda_function(&self) -> String {
        format!("{}{LAMBDA_FUNCTION_SUFFIX}", self.normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("f1"), "F1");
        assert_eq!(normalize("Already"), "Already");
        assert_eq!(normalize("ümlaut"), "Ümlaut");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_framework_strategy_escapes_separators() {
        let strategy = NamingStrategy::Framework;
        assert_eq!(strategy.normalize_function_name("f1"), "F1");
        assert_eq!(strategy.normalize_function_name("my-fn"), "MyDashfn");
        assert_eq!(strategy.normalize_function_name("my_fn"), "MyUnderscorefn");
        assert_eq!(
            NamingStrategy::Simple.normalize_function_name("my-fn"),
            "My-fn"
        );
    }

    #[test]
    fn test_derived_ids() {
        let ids = LogicalIds::for_function("f1", NamingStrategy::default());
        assert_eq!(ids.function(), "f1");
        assert_eq!(ids.queue(), "F1DeadLetterQueue");
        assert_eq!(ids.queue_policy(), "F1DeadLetterQueuePolicy");
        assert_eq!(ids.topic(), "F1DeadLetterTopic");
        assert_eq!(ids.queue_alarm(), "F1DeadLetterQueueAlarm");
        assert_eq!(ids.topic_alarm(), "F1DeadLetterTopicAlarm");
        assert_eq!(ids.lambda_function(), "F1LambdaFunction");
    }
}
