use std::process::ExitCode;

use clap::Parser;
use deplink_cli::{emit_annotation, init_tracing, run_cli, AnnotationLevel, Cli, RunStatus};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(error) if !error.use_stderr() => error.exit(),
        Err(error) => {
            let rendered = error.to_string();
            let message = format!(
                "configuration error: {}",
                rendered.trim().trim_start_matches("error: ")
            );
            tracing::error!(error = %message, "invalid command line");
            emit_annotation(AnnotationLevel::Error, &message);
            return ExitCode::FAILURE;
        }
    };
    match run_cli(&cli).await {
        Ok(RunStatus::Passed) => ExitCode::SUCCESS,
        Ok(RunStatus::Blocked(message)) => {
            tracing::info!(message = %message, "unresolved dependencies remain");
            emit_annotation(AnnotationLevel::Error, &message);
            ExitCode::FAILURE
        }
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "dependency run failed");
            emit_annotation(AnnotationLevel::Error, &format!("{error:#}"));
            ExitCode::FAILURE
        }
    }
}
