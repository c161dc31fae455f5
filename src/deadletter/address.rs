//! Destination addresses: the ARN grammar, queue URL conversion and the
//! resolved-address type.

use regex::Regex;
use snafu::prelude::*;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{MalformedQueueUrlSnafu, ProviderError};

/// Queue or topic ARN, anchored at both ends.
static TARGET_ARN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"arn:aws:sqs:[a-z]{2,}-[a-z]{2,}-[0-9]:[0-9]{12}:[a-zA-Z0-9\-_.]{1,80}",
        r"|",
        r"arn:aws:sns:[a-z]{2,}-[a-z]{2,}-[0-9]:[0-9]{12}:[a-zA-Z0-9\-_]{1,256}",
        r")$",
    ))
    .expect("Invalid regex pattern")
});

/// True if `value` is a well-formed queue or topic ARN.
pub fn is_valid_target_arn(value: &str) -> bool {
    TARGET_ARN_PATTERN.is_match(value)
}

/// Convert a queue URL (`https://sqs.<region>.amazonaws.com/<account>/<name>`)
/// into its ARN.
pub fn queue_url_to_arn(url: &str) -> Result<String, ProviderError> {
    let path = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let mut segments = path.split('/');
    let (Some(host), Some(account), Some(queue_name)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return MalformedQueueUrlSnafu { url }.fail();
    };

    let region = host.split('.').nth(1).unwrap_or_default();
    ensure!(
        !region.is_empty() && !account.is_empty() && !queue_name.is_empty(),
        MalformedQueueUrlSnafu { url }
    );

    Ok(format!("arn:aws:sqs:{region}:{account}:{queue_name}"))
}

/// The failure destination assigned to a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAddress {
    /// No destination; renders as the empty string.
    None,
    /// Stand-in for a stack resource that may not exist yet.
    Placeholder(String),
    /// A validated or looked-up queue/topic ARN.
    Arn(String),
}

impl ResolvedAddress {
    pub fn placeholder(logical_id: impl Into<String>) -> Self {
        Self::Placeholder(logical_id.into())
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Placeholder(_) => "placeholder",
            Self::Arn(_) => "arn",
        }
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Placeholder(logical_id) => write!(f, "${{GetResourceArn: {logical_id}}}"),
            Self::Arn(arn) => f.write_str(arn),
        }
    }
}
