use std::path::PathBuf;

use clap::{ArgAction, Parser};
use deplink_github::label_plan::{DEFAULT_BLOCKED_LABEL, DEFAULT_BLOCKING_LABEL};
use deplink_github::reference_extraction::{DEFAULT_KEY_PHRASES, DEFAULT_SERVER_URL};
use deplink_runtime::DEFAULT_BOT_LOGIN;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "deplink",
    about = "Tracks dependencies declared between GitHub issues and pull requests",
    version
)]
/// Every flag falls back to the environment GitHub Actions provides.
pub struct Cli {
    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "Token used for GitHub API requests."
    )]
    pub github_token: Option<String>,

    #[arg(
        long = "action-token",
        env = "INPUT_GITHUB_TOKEN",
        hide = true,
        hide_env_values = true
    )]
    pub action_token: Option<String>,

    #[arg(
        long = "event-name",
        env = "GITHUB_EVENT_NAME",
        help = "Triggering event. Supported: issues, pull_request, pull_request_target."
    )]
    pub event_name: String,

    #[arg(
        long = "event-path",
        env = "GITHUB_EVENT_PATH",
        help = "Path to the JSON webhook payload of the triggering event."
    )]
    pub event_path: PathBuf,

    #[arg(
        long,
        env = "GITHUB_REPOSITORY",
        help = "Repository in owner/repo format."
    )]
    pub repository: String,

    #[arg(
        long = "server-url",
        env = "GITHUB_SERVER_URL",
        default_value = DEFAULT_SERVER_URL,
        help = "Server origin used to recognise full-URL references and render links."
    )]
    pub server_url: String,

    #[arg(
        long = "api-url",
        env = "GITHUB_API_URL",
        default_value = DEFAULT_API_URL,
        help = "GitHub REST API origin."
    )]
    pub api_url: String,

    #[arg(
        long,
        env = "INPUT_PHRASES",
        default_value = DEFAULT_KEY_PHRASES,
        help = "Pipe-delimited key phrases that open a dependency declaration block."
    )]
    pub phrases: String,

    #[arg(
        long,
        env = "INPUT_LABEL",
        default_value = DEFAULT_BLOCKED_LABEL,
        help = "Label applied while dependencies are open."
    )]
    pub label: String,

    #[arg(
        long = "blocking-label",
        env = "INPUT_BLOCKING_LABEL",
        default_value = DEFAULT_BLOCKING_LABEL,
        help = "Label applied while dependents are open."
    )]
    pub blocking_label: String,

    #[arg(
        long = "check-dependents",
        env = "INPUT_CHECK_DEPENDENTS",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Track dependents recorded in status comments and update them in the same run."
    )]
    pub check_dependents: bool,

    #[arg(
        long = "bot-login",
        env = "INPUT_BOT_LOGIN",
        default_value = DEFAULT_BOT_LOGIN,
        help = "Login of the automation identity that authors status comments."
    )]
    pub bot_login: String,

    #[arg(
        long = "request-timeout-ms",
        env = "DEPLINK_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Per-request HTTP timeout in milliseconds."
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "DEPLINK_RETRY_MAX_ATTEMPTS",
        default_value_t = 4,
        value_parser = parse_positive_usize,
        help = "Attempts per GitHub request before giving up on 429, 5xx and transport errors."
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "DEPLINK_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base delay for exponential retry backoff in milliseconds."
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "output-path",
        env = "GITHUB_OUTPUT",
        help = "File receiving step outputs (has-dependencies)."
    )]
    pub output_path: Option<PathBuf>,

    #[arg(
        long = "summary-path",
        env = "GITHUB_STEP_SUMMARY",
        help = "File receiving the Markdown run summary."
    )]
    pub summary_path: Option<PathBuf>,
}

impl Cli {
    /// `GITHUB_TOKEN` wins over the action input; blank values count as missing.
    pub fn resolved_token(&self) -> Option<&str> {
        [self.github_token.as_deref(), self.action_token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|token| !token.is_empty())
    }
}
