//! deadletter: dead-letter target configuration for serverless functions.
//!
//! Resolves each function's `deadLetter` declaration to a queue or topic
//! address, compiles managed queues, topics and alarms into a CloudFormation
//! template, and applies the resolved targets to deployed functions.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use deadletter::{DeadLetterPlugin, OfflineProvider, ServiceConfig, Template};
//! use deadletter::config::Overrides;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ServiceConfig::from_file("serverless.yml", &Overrides::default())?;
//!     let plugin = DeadLetterPlugin::new(service, Arc::new(OfflineProvider));
//!     let mut template = Template::new();
//!     plugin.compile_all_function_dead_letter_resources(&mut template).await?;
//!     println!("{}", template.to_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deadletter;
pub mod error;
pub mod metrics;
pub mod plugin;
pub mod provider;
pub mod registry;
pub mod signal;
pub mod template;

// Re-export main types
pub use config::ServiceConfig;
pub use plugin::{DeadLetterPlugin, FunctionOutcome, OutcomeStatus, UpdateRequest};
pub use provider::{
    AwsProvider, AwsProviderConfig, InfrastructureApi, InfrastructureApiRef, OfflineProvider,
    ResourceKind, StackResource,
};
pub use registry::FunctionRegistry;
pub use template::Template;
