//! `tsw` command-line entry point.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tsw_common::{Error, Result};
use tsw_config::{resolve_config, validate_config, ConfigSnapshot, SinkConfig, ValidationError};
use tsw_core::classify::{classify, innermost};
use tsw_core::exit_codes::ExitCode;
use tsw_core::logging::{init_logging, LogFormat, LOG_FORMAT_ENV};
use tsw_core::replay::{run_scenario, ReplaySummary, Scenario};
use tsw_core::{Decision, ExceptionKind, FailurePolicy, WriteError};

#[derive(Parser, Debug)]
#[command(name = "tsw")]
#[command(about = "Time-series write sink: failure classification and replay")]
#[command(version)]
struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, env = LOG_FORMAT_ENV, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect the resolved sink configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Classify a write error given as JSON and show the policy decision
    Classify {
        /// Error JSON, inline or as a file path
        error: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Replay a scripted scenario against the submitter
    Replay {
        /// Scenario JSON, inline or as a file path
        scenario: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the resolved config snapshot as JSON
    Show {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Check the resolved config and report every problem found
    Validate {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file (JSON or TOML); defaults to $TSW_CONFIG, then the user config dir
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    name: &'static str,
    retryable: bool,
    kind: ExceptionKind,
    decision: Decision,
    error: &'a WriteError,
}

#[derive(Serialize)]
struct ValidateOutput<'a> {
    valid: bool,
    errors: &'a [ValidationError],
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let result = match cli.command {
        Commands::Config {
            command: ConfigCommands::Show { config },
        } => run_config_show(config.config.as_deref()),
        Commands::Config {
            command: ConfigCommands::Validate { config },
        } => run_config_validate(config.config.as_deref()),
        Commands::Classify { error, config } => run_classify(&error, config.config.as_deref()),
        Commands::Replay { scenario, config } => {
            run_replay(&scenario, config.config.as_deref()).await
        }
    };

    match result {
        Ok(code) => code.into(),
        Err(err) => {
            error!(code = err.code(), error = %err, "command failed");
            ExitCode::from(&err).into()
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<(SinkConfig, ConfigSnapshot)> {
    let (config, source) = resolve_config(path)?;
    let snapshot = ConfigSnapshot::new(config.clone(), source)?;
    info!(
        source = %snapshot.source,
        digest = snapshot.short_digest(),
        "loaded sink config"
    );
    Ok((config, snapshot))
}

/// Read an argument that is either inline JSON or a path to a JSON file.
fn read_json_arg(arg: &str) -> Result<String> {
    let trimmed = arg.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(arg.to_string());
    }
    Ok(std::fs::read_to_string(arg)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_config_show(path: Option<&Path>) -> Result<ExitCode> {
    let (_, snapshot) = load_config(path)?;
    print_json(&snapshot)?;
    Ok(ExitCode::Clean)
}

fn run_config_validate(path: Option<&Path>) -> Result<ExitCode> {
    let (config, _) = load_config(path)?;
    let errors = validate_config(&config).err().unwrap_or_default();
    print_json(&ValidateOutput {
        valid: errors.is_empty(),
        errors: &errors,
    })?;
    if errors.is_empty() {
        return Ok(ExitCode::Clean);
    }
    for problem in &errors {
        error!(%problem, "invalid config");
    }
    Ok(ExitCode::ConfigError)
}

fn run_classify(arg: &str, path: Option<&Path>) -> Result<ExitCode> {
    let (config, _) = load_config(path)?;
    let err: WriteError = serde_json::from_str(&read_json_arg(arg)?)?;

    let classification = classify(&err);
    let policy = FailurePolicy::new(config.failure_policy);
    print_json(&ClassifyOutput {
        name: innermost(&err).name(),
        retryable: classification.retryable,
        kind: classification.kind,
        decision: policy.decide(classification.kind),
        error: &err,
    })?;
    Ok(ExitCode::Clean)
}

async fn run_replay(arg: &str, path: Option<&Path>) -> Result<ExitCode> {
    let (config, _) = load_config(path)?;
    if let Err(errors) = validate_config(&config) {
        let problems: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(Error::Config(problems.join("; ")));
    }
    let scenario = Scenario::from_json(&read_json_arg(arg)?)?;
    let summary = run_scenario(scenario, &config).await?;
    print_json(&summary)?;
    Ok(replay_exit_code(&summary))
}

fn replay_exit_code(summary: &ReplaySummary) -> ExitCode {
    if summary.fatal.is_some() {
        ExitCode::Fatal
    } else if summary.pending > 0 {
        ExitCode::Unsettled
    } else if summary.dropped > 0 {
        ExitCode::Dropped
    } else {
        ExitCode::Clean
    }
}
