use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use deplink_github::status_comment::render_entity_bullet;
use deplink_runtime::RunReport;

pub const HAS_DEPENDENCIES_OUTPUT: &str = "has-dependencies";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationLevel {
    Warning,
    Error,
}

/// `::warning::message` / `::error::message` with the workflow-command escaping.
pub fn workflow_command(level: AnnotationLevel, message: &str) -> String {
    let command = match level {
        AnnotationLevel::Warning => "warning",
        AnnotationLevel::Error => "error",
    };
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::{command}::{escaped}")
}

pub fn emit_annotation(level: AnnotationLevel, message: &str) {
    println!("{}", workflow_command(level, message));
}

fn append_to(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Appends `name=value` to the step output file. No file, no output.
pub fn write_step_output(path: Option<&Path>, name: &str, value: &str) -> Result<()> {
    match path {
        Some(path) => append_to(path, &format!("{name}={value}\n")),
        None => Ok(()),
    }
}

pub fn append_step_summary(path: Option<&Path>, summary: &str) -> Result<()> {
    match path {
        Some(path) => append_to(path, summary),
        None => Ok(()),
    }
}

pub fn render_run_summary(report: &RunReport) -> String {
    let subject = &report.subject;
    let scope = subject.scope();
    let mut lines = vec![
        format!(
            "## Dependency status of {} #{}",
            subject.kind.tag(),
            subject.number()
        ),
        String::new(),
    ];

    lines.push("### Unresolved dependencies".to_string());
    lines.push(String::new());
    if report.dependencies.is_empty() {
        lines.push("None.".to_string());
    } else {
        lines.extend(
            report
                .dependencies
                .iter()
                .map(|entity| render_entity_bullet(entity, &scope)),
        );
    }
    lines.push(String::new());

    lines.push("### Blocked dependents".to_string());
    lines.push(String::new());
    if report.dependents.is_empty() {
        lines.push("None.".to_string());
    } else {
        lines.extend(
            report
                .dependents
                .iter()
                .map(|entity| render_entity_bullet(entity, &scope)),
        );
    }
    lines.push(String::new());

    let notes = report
        .warnings
        .iter()
        .cloned()
        .chain(report.related_failures.iter().map(ToString::to_string))
        .collect::<Vec<_>>();
    if !notes.is_empty() {
        lines.push("### Warnings".to_string());
        lines.push(String::new());
        lines.extend(notes.into_iter().map(|note| format!("- {note}")));
        lines.push(String::new());
    }
    lines.join("\n")
}
