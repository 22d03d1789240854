//! Flathub promoter entry point.
//!
//! This binary is the composition root. It:
//!
//! 1. parses arguments and environment (`INPUT_TOKEN`, `GITHUB_EVENT_PATH`,
//!    `PROMOTER_CONFIG`, `OTEL_EXPORTER_OTLP_ENDPOINT`);
//! 2. installs the tracing subscriber and the optional OTLP exporter;
//! 3. loads the configuration and the triggering comment event;
//! 4. builds [`github::GithubClient`] and [`git::GitCli`] and hands them to a
//!    [`workflow::Promoter`].
//!
//! The process exits with status 0 when the promotion completes and 1 on any
//! failure, including a comment that is not a `/merge` command.

mod config;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use git::GitCli;
use github::GithubClient;
use promotion::AccessToken;
use workflow::{PromotionOutcome, Promoter};

use crate::telemetry::LogFormat;

#[derive(Debug, Parser)]
#[command(
    name = "flathub-promoter",
    version,
    about = "Promote an approved submission pull request to its own repository"
)]
struct Args {
    /// Access token used for API calls and the publishing push.
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path to the triggering `issue_comment` event payload.
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,

    /// Optional TOML file overriding the default configuration.
    #[arg(long, env = "PROMOTER_CONFIG")]
    config: Option<PathBuf>,

    /// Console log format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// OTLP/gRPC collector; spans are only exported when set.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let telemetry = match telemetry::init(args.log_format, args.otlp_endpoint.as_deref()) {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match run(args).await {
        Ok(outcome) => {
            tracing::info!(
                run_id = %outcome.run_id,
                app_id = %outcome.app_id,
                url = %outcome.repository.html_url,
                branch = %outcome.target_branch,
                started_at = %outcome.started_at,
                finished_at = %outcome.finished_at,
                "promotion complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "promotion aborted");
            ExitCode::FAILURE
        }
    };

    telemetry.shutdown();
    code
}

async fn run(args: Args) -> anyhow::Result<PromotionOutcome> {
    let token = args
        .token
        .and_then(AccessToken::new)
        .context("INPUT_TOKEN is not set")?;
    let config = config::load(args.config.as_deref())?;
    let event_path = args.event_path.context("GITHUB_EVENT_PATH is not set")?;
    let event = trigger::load_event(&event_path)?;

    let client = GithubClient::new(&token, &config.api_base_url, &config.graphql_url)?;
    let promoter = Promoter::new(Arc::new(client), Arc::new(GitCli::default()), config, token);
    Ok(promoter.run(&event).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_are_read_from_flags() {
        let args = Args::try_parse_from([
            "flathub-promoter",
            "--token",
            "ghs_x",
            "--event-path",
            "/tmp/event.json",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.token.as_deref(), Some("ghs_x"));
        assert_eq!(args.event_path, Some(PathBuf::from("/tmp/event.json")));
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[tokio::test]
    async fn blank_token_is_rejected_before_anything_else() {
        let args = Args {
            token: Some("   ".into()),
            event_path: None,
            config: None,
            log_format: LogFormat::Pretty,
            otlp_endpoint: None,
        };
        let err = run(args).await.unwrap_err();
        assert!(err.to_string().contains("INPUT_TOKEN"));
    }

    #[tokio::test]
    async fn missing_event_path_is_reported() {
        let args = Args {
            token: Some("ghs_x".into()),
            event_path: None,
            config: None,
            log_format: LogFormat::Pretty,
            otlp_endpoint: None,
        };
        let err = run(args).await.unwrap_err();
        assert!(err.to_string().contains("GITHUB_EVENT_PATH"));
    }
}
