//! Dead-letter target handling.
//!
//! - `spec`: parse a function's `deadLetter` declaration
//! - `resolver`: turn a declaration into a concrete address
//! - `address`: address grammar and queue URL conversion
//! - `compiler`: managed queue/topic template resources
//! - `alarm`: CloudWatch alarms on managed resources
//! - `naming`: logical id derivation

mod address;
mod alarm;
mod compiler;
mod naming;
mod resolver;
mod spec;

pub use address::{ResolvedAddress, is_valid_target_arn, queue_url_to_arn};
pub use alarm::{DeadLetterAlarm, compile_dead_letter_alarms};
pub use compiler::{compile_managed_queue, compile_managed_topic};
pub use naming::{LogicalIds, NamingStrategy, normalize};
pub use resolver::{TargetResolver, resolve_from_string};
pub use spec::{DeadLetterSpec, ExplicitTarget, REFERENCE_FIELD, ResourceReference};
