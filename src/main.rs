//! deadletter: resolve, compile and apply dead-letter targets for the
//! functions of a serverless service.

use clap::{Parser, Subcommand};
use snafu::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deadletter::config::Overrides;
use deadletter::error::{AppError, ConfigSnafu, DeadLetterSnafu, InterruptedSnafu, TemplateSnafu};
use deadletter::signal::shutdown_signal;
use deadletter::{
    AwsProvider, AwsProviderConfig, DeadLetterPlugin, FunctionOutcome, InfrastructureApiRef,
    OfflineProvider, OutcomeStatus, ServiceConfig, Template,
};

/// Dead-letter target configuration for serverless functions.
#[derive(Parser, Debug)]
#[command(name = "deadletter")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the service file.
    #[arg(short, long, default_value = "serverless.yml", global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Stage override.
    #[arg(long, global = true)]
    stage: Option<String>,

    /// Region override.
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every declaration without contacting AWS.
    Validate,

    /// Write managed queues, topics and alarms into a template.
    Compile {
        /// Existing template to merge resources into.
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output file; the template is printed to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve targets against the deployed stack and update each function.
    Deploy {
        /// Resolve without querying the stack or updating functions.
        #[arg(long)]
        no_deploy: bool,
    },
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("deadletter starting");

    tokio::select! {
        result = run(args) => result,
        _ = shutdown_signal() => InterruptedSnafu.fail(),
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let overrides = Overrides {
        stage: args.stage.clone(),
        region: args.region.clone(),
    };
    let service = ServiceConfig::from_file(&args.config, &overrides).context(ConfigSnafu)?;

    info!(
        service = %service.service,
        stage = %service.provider.stage,
        stack = %service.stack_name(),
        functions = service.functions.len(),
        "Loaded service"
    );

    match args.command {
        Command::Validate => {
            let plugin = DeadLetterPlugin::new(service, Arc::new(OfflineProvider));
            let outcomes = plugin.validate_all().await.context(DeadLetterSnafu)?;
            log_summary(&outcomes);
            info!("Configuration is valid");
        }
        Command::Compile { template, output } => {
            let mut compiled = match template {
                Some(path) => Template::from_file(&path).context(TemplateSnafu)?,
                None => Template::new(),
            };

            let plugin = DeadLetterPlugin::new(service, Arc::new(OfflineProvider));
            let outcomes = plugin
                .compile_all_function_dead_letter_resources(&mut compiled)
                .await
                .context(DeadLetterSnafu)?;
            log_summary(&outcomes);

            match output {
                Some(path) => {
                    compiled.write_to(&path).context(TemplateSnafu)?;
                    info!(path = %path.display(), resources = compiled.len(), "Template written");
                }
                None => println!("{}", compiled.to_json_pretty().context(TemplateSnafu)?),
            }
        }
        Command::Deploy { no_deploy } => {
            let provider: InfrastructureApiRef = if no_deploy {
                info!("No-deploy mode - resolving without AWS calls");
                Arc::new(OfflineProvider)
            } else {
                let settings = &service.custom.dead_letter;
                Arc::new(
                    AwsProvider::new(AwsProviderConfig {
                        region: service.provider.region.clone(),
                        endpoint: settings.endpoint.clone(),
                        timeout_ms: settings.timeout_ms,
                    })
                    .await,
                )
            };

            let plugin = DeadLetterPlugin::new(service, provider);
            let outcomes = plugin
                .set_dead_letter_configs(!no_deploy)
                .await
                .context(DeadLetterSnafu)?;
            log_summary(&outcomes);
        }
    }

    Ok(())
}

fn log_summary(outcomes: &[FunctionOutcome]) {
    let mut skipped = 0;
    let mut validated = 0;
    let mut compiled = 0;
    let mut updated = 0;

    for outcome in outcomes {
        match outcome.status {
            OutcomeStatus::Skipped => skipped += 1,
            OutcomeStatus::Validated(_) => validated += 1,
            OutcomeStatus::Compiled(_) => compiled += 1,
            OutcomeStatus::Updated(_) => updated += 1,
        }
    }

    info!("Dead-letter pass completed");
    info!("  Functions: {}", outcomes.len());
    info!("  Skipped: {}", skipped);
    info!("  Validated: {}", validated);
    info!("  Compiled: {}", compiled);
    info!("  Updated: {}", updated);
}
