//! CloudWatch alarms on managed dead-letter resources.
//!
//! A function may add `alarm` to its `deadLetter` block:
//!
//! ```yaml
//! deadLetter:
//!   sqs: orders-dlq
//!   alarm:
//!     enabled: true
//!     alertingTopic: arn:aws:sns:us-west-2:123456789012:ops
//!     sqs:
//!       Threshold: 5
//! ```
//!
//! The alarm fires when at least one message reaches the queue or topic.
//! Only managed destinations get alarms; there is nothing to watch on an
//! externally owned target.

use serde_json::{Map, Value, json};
use snafu::prelude::*;

use crate::emit;
use crate::error::{DeadLetterError, InvalidAlarmSnafu, MissingAlertingTopicSnafu};
use crate::metrics::events::ResourceCompiled;
use crate::template::Template;

use super::naming::LogicalIds;
use super::spec::{DeadLetterSpec, kind_of};

const ALARM_TYPE: &str = "AWS::CloudWatch::Alarm";

/// Which managed resource an alarm watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Watched {
    Queue,
    Topic,
}

impl Watched {
    fn label(&self) -> &'static str {
        match self {
            Watched::Queue => "SQS",
            Watched::Topic => "SNS",
        }
    }
}

/// Parsed `deadLetter.alarm` block.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterAlarm {
    pub alerting_topics: Vec<Value>,
    pub queue_overrides: Map<String, Value>,
    pub topic_overrides: Map<String, Value>,
}

impl DeadLetterAlarm {
    /// Parse the `alarm` value. Returns `None` when alarms are disabled.
    pub fn from_value(function: &str, alarm: &Value) -> Result<Option<Self>, DeadLetterError> {
        let Some(object) = alarm.as_object() else {
            return InvalidAlarmSnafu {
                function,
                field: "alarm",
                message: format!("must be an object, found {}", kind_of(alarm)),
            }
            .fail();
        };

        let enabled = match object.get("enabled") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(enabled)) => *enabled,
            Some(other) => {
                return InvalidAlarmSnafu {
                    function,
                    field: "alarm.enabled",
                    message: format!("must be a boolean, found {}", kind_of(other)),
                }
                .fail();
            }
        };
        if !enabled {
            return Ok(None);
        }

        let alerting_topics = match object.get("alertingTopic") {
            None | Some(Value::Null) => return MissingAlertingTopicSnafu { function }.fail(),
            Some(Value::Array(topics)) => topics.clone(),
            Some(topic) => vec![topic.clone()],
        };
        ensure!(!alerting_topics.is_empty(), MissingAlertingTopicSnafu { function });

        Ok(Some(Self {
            alerting_topics,
            queue_overrides: overrides(object, "sqs"),
            topic_overrides: overrides(object, "sns"),
        }))
    }
}

fn overrides(object: &Map<String, Value>, key: &str) -> Map<String, Value> {
    object
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Compile alarms for a function's managed dead-letter resource.
///
/// Does nothing for explicit targets or when `alarm` is absent or disabled.
pub fn compile_dead_letter_alarms(
    template: &mut Template,
    ids: &LogicalIds,
    physical_name: &str,
    spec: &DeadLetterSpec,
    alarm: Option<&Value>,
) -> Result<Vec<String>, DeadLetterError> {
    let Some(alarm) = alarm else {
        return Ok(Vec::new());
    };
    let Some(alarm) = DeadLetterAlarm::from_value(ids.function(), alarm)? else {
        return Ok(Vec::new());
    };

    let (watched, resource_id, alarm_id, overrides) = match spec {
        DeadLetterSpec::ManagedQueue(_) => (
            Watched::Queue,
            ids.queue(),
            ids.queue_alarm(),
            &alarm.queue_overrides,
        ),
        DeadLetterSpec::ManagedTopic(_) => (
            Watched::Topic,
            ids.topic(),
            ids.topic_alarm(),
            &alarm.topic_overrides,
        ),
        DeadLetterSpec::Explicit(_) => return Ok(Vec::new()),
    };

    let mut resource = alarm_template(watched, physical_name, &resource_id);
    resource["Properties"]["AlarmActions"] = Value::Array(alarm.alerting_topics.clone());
    if let Some(properties) = resource["Properties"].as_object_mut() {
        for (key, value) in overrides {
            properties.insert(key.clone(), value.clone());
        }
    }

    template.insert_resource(alarm_id.clone(), resource);
    emit!(ResourceCompiled {
        resource_type: ALARM_TYPE
    });

    Ok(vec![alarm_id])
}

fn alarm_template(watched: Watched, physical_name: &str, resource_id: &str) -> Value {
    let (metric, namespace, dimension, noun) = match watched {
        Watched::Queue => ("NumberOfMessagesSent", "AWS/SQS", "QueueName", "queue"),
        Watched::Topic => ("NumberOfMessagesPublished", "AWS/SNS", "TopicName", "topic"),
    };

    json!({
        "Type": ALARM_TYPE,
        "Properties": {
            "AlarmName": format!("[Error] {physical_name}-{}-DLQ", watched.label()),
            "AlarmDescription": format!(
                "At least one message was sent to the dead-letter {noun} of the function \"{physical_name}\""
            ),
            "MetricName": metric,
            "Namespace": namespace,
            "Statistic": "Sum",
            "Period": 60,
            "EvaluationPeriods": 1,
            "Threshold": 1,
            "Dimensions": [{
                "Name": dimension,
                "Value": { "Fn::GetAtt": [resource_id, dimension] }
            }],
            "ComparisonOperator": "GreaterThanOrEqualToThreshold",
            "ActionsEnabled": true,
            "TreatMissingData": "notBreaching",
            "AlarmActions": []
        }
    })
}
