//! Resource compilation for managed dead-letter queues and topics.
//!
//! Each function that declares `sqs` gets a queue plus a queue policy that only
//! lets that function send to it; each function that declares `sns` gets a
//! topic. Resources are written into the [`Template`] under deterministic
//! logical ids, replacing any earlier definition.

use serde_json::{Map, Value, json};
use snafu::prelude::*;

use crate::emit;
use crate::error::{DeadLetterError, EmptyResourceNameSnafu, InvalidResourceConfigSnafu};
use crate::metrics::events::ResourceCompiled;
use crate::template::Template;

use super::naming::{LogicalIds, normalize};
use super::spec::kind_of;

const QUEUE_TYPE: &str = "AWS::SQS::Queue";
const QUEUE_POLICY_TYPE: &str = "AWS::SQS::QueuePolicy";
const TOPIC_TYPE: &str = "AWS::SNS::Topic";
const POLICY_VERSION: &str = "2012-10-17";
const POLICY_ID_SUFFIX: &str = "/SQSDefaultPolicy";
const QUEUE_NAME_PROPERTY: &str = "QueueName";

/// Compile a managed queue and its access policy.
///
/// `queue_config` is either the queue name or a property bag whose keys are
/// capitalized and merged into the queue's `Properties`; the merged
/// `QueueName` names the queue. Keys are not checked against the resource
/// schema.
///
/// Returns the logical ids written.
pub fn compile_managed_queue(
    template: &mut Template,
    ids: &LogicalIds,
    queue_config: &Value,
) -> Result<Vec<String>, DeadLetterError> {
    let function = ids.function();

    let mut properties = Map::new();
    match queue_config {
        Value::String(name) => {
            properties.insert(QUEUE_NAME_PROPERTY.to_string(), Value::from(name.as_str()));
        }
        Value::Object(bag) => {
            for (key, value) in bag {
                properties.insert(normalize(key), value.clone());
            }
        }
        other => {
            return InvalidResourceConfigSnafu {
                function,
                field: "sqs",
                kind: kind_of(other),
                expected: "a queue name or an object of queue properties",
            }
            .fail();
        }
    }

    // The name is read after merging, so `queueName` and `QueueName` are equivalent
    // and the later key wins.
    let queue_name = properties
        .get(QUEUE_NAME_PROPERTY)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    ensure!(
        !queue_name.is_empty(),
        EmptyResourceNameSnafu {
            function,
            field: "sqs"
        }
    );
    properties.insert(QUEUE_NAME_PROPERTY.to_string(), Value::from(queue_name));

    let queue_id = ids.queue();
    let policy_id = ids.queue_policy();

    template.insert_resource(
        queue_id.clone(),
        json!({
            "Type": QUEUE_TYPE,
            "Properties": properties,
        }),
    );
    template.insert_resource(policy_id.clone(), queue_policy(&queue_id, &ids.lambda_function()));

    emit!(ResourceCompiled {
        resource_type: QUEUE_TYPE
    });
    emit!(ResourceCompiled {
        resource_type: QUEUE_POLICY_TYPE
    });

    Ok(vec![queue_id, policy_id])
}

/// Policy allowing only `function_id` to send to `queue_id`.
fn queue_policy(queue_id: &str, function_id: &str) -> Value {
    let queue_arn = json!({ "Fn::GetAtt": [queue_id, "Arn"] });

    json!({
        "Type": QUEUE_POLICY_TYPE,
        "Properties": {
            "Queues": [{ "Ref": queue_id }],
            "PolicyDocument": {
                "Version": POLICY_VERSION,
                "Id": { "Fn::Join": ["", [queue_arn.clone(), POLICY_ID_SUFFIX]] },
                "Statement": [{
                    "Sid": "Allow-Lambda-SendMessage",
                    "Effect": "Allow",
                    "Principal": { "AWS": "*" },
                    "Action": ["SQS:SendMessage"],
                    "Resource": queue_arn,
                    "Condition": {
                        "ArnEquals": {
                            "aws:SourceArn": { "Fn::GetAtt": [function_id, "Arn"] }
                        }
                    }
                }]
            }
        }
    })
}

/// Compile a managed topic. Only the name form is supported.
pub fn compile_managed_topic(
    template: &mut Template,
    ids: &LogicalIds,
    topic_config: &Value,
) -> Result<Vec<String>, DeadLetterError> {
    let function = ids.function();

    let Value::String(topic_name) = topic_config else {
        return InvalidResourceConfigSnafu {
            function,
            field: "sns",
            kind: kind_of(topic_config),
            expected: "a topic name",
        }
        .fail();
    };

    let topic_name = topic_name.trim();
    ensure!(
        !topic_name.is_empty(),
        EmptyResourceNameSnafu {
            function,
            field: "sns"
        }
    );

    let topic_id = ids.topic();
    template.insert_resource(
        topic_id.clone(),
        json!({
            "Type": TOPIC_TYPE,
            "Properties": { "TopicName": topic_name },
        }),
    );

    emit!(ResourceCompiled {
        resource_type: TOPIC_TYPE
    });

    Ok(vec![topic_id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadletter::NamingStrategy;

    fn ids(function: &str) -> LogicalIds {
        LogicalIds::for_function(function, NamingStrategy::Framework)
    }

    #[test]
    fn test_queue_from_name() {
        let mut template = Template::new();
        let written = compile_managed_queue(&mut template, &ids("f1"), &json!("MySqs")).unwrap();

        assert_eq!(written, vec!["F1DeadLetterQueue", "F1DeadLetterQueuePolicy"]);
        assert_eq!(template.len(), 2);

        let queue = template.resource("F1DeadLetterQueue").unwrap();
        assert_eq!(queue["Type"], "AWS::SQS::Queue");
        assert_eq!(queue["Properties"]["QueueName"], "MySqs");

        let policy = template.resource("F1DeadLetterQueuePolicy").unwrap();
        assert_eq!(policy["Type"], "AWS::SQS::QueuePolicy");
        assert_eq!(policy["Properties"]["Queues"][0]["Ref"], "F1DeadLetterQueue");

        let document = &policy["Properties"]["PolicyDocument"];
        assert_eq!(document["Version"], "2012-10-17");
        assert_eq!(
            document["Id"],
            json!({"Fn::Join": ["", [{"Fn::GetAtt": ["F1DeadLetterQueue", "Arn"]}, "/SQSDefaultPolicy"]]})
        );

        let statements = document["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        let statement = &statements[0];
        assert_eq!(statement["Effect"], "Allow");
        assert_eq!(statement["Principal"]["AWS"], "*");
        assert_eq!(statement["Action"], json!(["SQS:SendMessage"]));
        assert_eq!(
            statement["Condition"]["ArnEquals"]["aws:SourceArn"],
            json!({"Fn::GetAtt": ["F1LambdaFunction", "Arn"]})
        );
    }

    #[test]
    fn test_queue_from_property_bag() {
        let mut template = Template::new();
        let config = json!({
            "queueName": "  orders-dlq ",
            "visibilityTimeout": 60,
            "messageRetentionPeriod": 1209600
        });
        compile_managed_queue(&mut template, &ids("f1"), &config).unwrap();

        let properties = &template.resource("F1DeadLetterQueue").unwrap()["Properties"];
        assert_eq!(properties["QueueName"], "orders-dlq");
        assert_eq!(properties["VisibilityTimeout"], 60);
        assert_eq!(properties["MessageRetentionPeriod"], 1209600);
        assert!(properties.get("queueName").is_none());
    }

    #[test]
    fn test_queue_name_from_capitalized_key() {
        let mut template = Template::new();
        compile_managed_queue(&mut template, &ids("f1"), &json!({"QueueName": " MySqs "})).unwrap();

        let properties = &template.resource("F1DeadLetterQueue").unwrap()["Properties"];
        assert_eq!(properties["QueueName"], "MySqs");
    }

    #[test]
    fn test_queue_property_bag_can_override_defaults() {
        let mut template = Template::new();
        let config = json!({ "queueName": "q", "QueueName": "override" });
        compile_managed_queue(&mut template, &ids("f1"), &config).unwrap();

        let properties = &template.resource("F1DeadLetterQueue").unwrap()["Properties"];
        assert_eq!(properties["QueueName"], "override");
    }

    #[test]
    fn test_queue_recompile_overwrites() {
        let mut template = Template::new();
        compile_managed_queue(&mut template, &ids("f1"), &json!({"queueName": "a", "delaySeconds": 5}))
            .unwrap();
        compile_managed_queue(&mut template, &ids("f1"), &json!("b")).unwrap();

        assert_eq!(template.len(), 2);
        let properties = &template.resource("F1DeadLetterQueue").unwrap()["Properties"];
        assert_eq!(properties["QueueName"], "b");
        assert!(properties.get("DelaySeconds").is_none());
    }

    #[test]
    fn test_queue_rejects_invalid_config() {
        let invalid = [
            json!(null),
            json!(""),
            json!("   "),
            json!(12),
            json!(true),
            json!(["q"]),
            json!({}),
            json!({"queueName": " "}),
            json!({"queueName": "q", "QueueName": "   "}),
            json!({"QueueName": 7}),
        ];
        for config in invalid {
            let mut template = Template::new();
            let err = compile_managed_queue(&mut template, &ids("f1"), &config).unwrap_err();
            assert!(err.is_configuration_error(), "{config} should be rejected");
            assert!(err.to_string().contains("f1.deadLetter.sqs"));
            assert!(template.is_empty());
        }
    }

    #[test]
    fn test_topic_from_name() {
        let mut template = Template::new();
        let written = compile_managed_topic(&mut template, &ids("f1"), &json!("MySns")).unwrap();

        assert_eq!(written, vec!["F1DeadLetterTopic"]);
        assert_eq!(template.len(), 1);
        let topic = template.resource("F1DeadLetterTopic").unwrap();
        assert_eq!(topic["Type"], "AWS::SNS::Topic");
        assert_eq!(topic["Properties"]["TopicName"], "MySns");
    }

    #[test]
    fn test_topic_rejects_invalid_config() {
        for config in [json!(null), json!(""), json!("  "), json!({"topicName": "t"}), json!(3)] {
            let mut template = Template::new();
            let err = compile_managed_topic(&mut template, &ids("f1"), &config).unwrap_err();
            assert!(
                matches!(
                    err,
                    DeadLetterError::InvalidResourceConfig { .. }
                        | DeadLetterError::EmptyResourceName { .. }
                ),
                "{config} should be rejected"
            );
            assert!(template.is_empty());
        }
    }

    #[test]
    fn test_ids_follow_naming_strategy() {
        let mut template = Template::new();
        compile_managed_topic(&mut template, &ids("send-mail"), &json!("mail-dlt")).unwrap();
        assert!(template.resource("SendDashmailDeadLetterTopic").is_some());
    }
}
