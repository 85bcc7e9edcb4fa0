//! Process entry point for the deplink GitHub Action.

mod action_output;
mod bootstrap;
mod cli_args;
mod event_context;

use anyhow::Result;
use deplink_github::label_plan::StatusLabels;
use deplink_runtime::{
    DependencyError, DependencyRun, DependencyRunConfig, ExecutionContext, GithubApiClient,
    GithubApiClientConfig,
};
use tracing::info;

pub use action_output::{
    append_step_summary, emit_annotation, render_run_summary, workflow_command,
    write_step_output, AnnotationLevel, HAS_DEPENDENCIES_OUTPUT,
};
pub use bootstrap::init_tracing;
pub use cli_args::{Cli, DEFAULT_API_URL};
pub use event_context::{
    load_trigger_context, parse_trigger_context, RepoRef, TriggerContext, TriggerEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// No open dependencies, or the triggering action was not evaluated.
    Passed,
    /// The subject still has open dependencies; carries the failure message.
    Blocked(String),
}

/// Runs one evaluation and writes the Actions outputs. Configuration and
/// subject-level failures are returned as errors.
pub async fn run_cli(cli: &Cli) -> Result<RunStatus> {
    let event = TriggerEvent::parse(&cli.event_name)?;
    let repository = RepoRef::parse(&cli.repository)?;
    let token = cli
        .resolved_token()
        .ok_or_else(|| DependencyError::configuration("GITHUB_TOKEN is required"))?;
    let trigger = load_trigger_context(event, &cli.event_path)?;
    let output_path = cli.output_path.as_deref();

    if !trigger.is_evaluated() {
        info!(
            event = event.as_str(),
            action = trigger.action.as_deref().unwrap_or_default(),
            subject = trigger.subject_number,
            "action does not affect dependencies; skipping"
        );
        write_step_output(output_path, HAS_DEPENDENCIES_OUTPUT, "false")?;
        return Ok(RunStatus::Passed);
    }

    let client = GithubApiClient::new(GithubApiClientConfig {
        api_base: cli.api_url.clone(),
        token: token.to_string(),
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })?;
    let context = ExecutionContext::new(
        repository.owner.clone(),
        repository.name.clone(),
        trigger.subject_number,
    )
    .with_server_url(cli.server_url.clone());
    let config = DependencyRunConfig {
        phrases: cli.phrases.clone(),
        bot_login: cli.bot_login.trim().to_string(),
        labels: StatusLabels::new(&cli.label, &cli.blocking_label),
        track_dependents: cli.check_dependents,
    };

    let report = DependencyRun::new(&client, context, config)?.execute().await?;

    for warning in &report.warnings {
        emit_annotation(AnnotationLevel::Warning, warning);
    }
    for failure in &report.related_failures {
        emit_annotation(AnnotationLevel::Warning, &failure.to_string());
    }
    write_step_output(
        output_path,
        HAS_DEPENDENCIES_OUTPUT,
        if report.has_dependencies() { "true" } else { "false" },
    )?;
    append_step_summary(cli.summary_path.as_deref(), &render_run_summary(&report))?;

    Ok(match report.failure_message() {
        Some(message) => RunStatus::Blocked(message),
        None => RunStatus::Passed,
    })
}
