use std::path::Path;

use deplink_runtime::DependencyError;
use serde::Deserialize;

/// Payload actions that change what an entity declares or whether it is open.
const EVALUATED_ACTIONS: [&str; 4] = ["opened", "edited", "reopened", "synchronize"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Issues,
    PullRequest,
}

impl TriggerEvent {
    pub fn parse(event_name: &str) -> Result<Self, DependencyError> {
        match event_name.trim() {
            "issues" => Ok(Self::Issues),
            "pull_request" | "pull_request_target" => Ok(Self::PullRequest),
            other => Err(DependencyError::configuration(format!(
                "unsupported event '{other}'; expected issues or pull_request"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::PullRequest => "pull_request",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self, DependencyError> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed.split_once('/').ok_or_else(|| {
            DependencyError::configuration(format!(
                "invalid repository '{raw}', expected owner/repo"
            ))
        })?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(DependencyError::configuration(format!(
                "invalid repository '{raw}', expected owner/repo"
            )));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    issue: Option<PayloadEntity>,
    #[serde(default)]
    pull_request: Option<PayloadEntity>,
    #[serde(default)]
    number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PayloadEntity {
    number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The parts of the webhook payload a run needs.
pub struct TriggerContext {
    pub event: TriggerEvent,
    pub action: Option<String>,
    pub subject_number: u64,
}

impl TriggerContext {
    /// Actions such as `labeled` (which the bot causes itself) or `closed`
    /// are acknowledged without evaluation. A payload without an action is
    /// evaluated.
    pub fn is_evaluated(&self) -> bool {
        self.action
            .as_deref()
            .map_or(true, |action| EVALUATED_ACTIONS.contains(&action.trim()))
    }
}

pub fn load_trigger_context(
    event: TriggerEvent,
    event_path: &Path,
) -> Result<TriggerContext, DependencyError> {
    let raw = std::fs::read_to_string(event_path).map_err(|error| {
        DependencyError::configuration(format!(
            "failed to read event payload {}: {error}",
            event_path.display()
        ))
    })?;
    parse_trigger_context(event, &raw)
}

pub fn parse_trigger_context(event: TriggerEvent, raw: &str) -> Result<TriggerContext, DependencyError> {
    let payload = serde_json::from_str::<EventPayload>(raw).map_err(|error| {
        DependencyError::configuration(format!("failed to parse event payload: {error}"))
    })?;
    let entity_number = match event {
        TriggerEvent::Issues => payload.issue.map(|issue| issue.number),
        TriggerEvent::PullRequest => payload
            .pull_request
            .map(|pull_request| pull_request.number)
            .or(payload.number),
    };
    let subject_number = entity_number.filter(|number| *number > 0).ok_or_else(|| {
        DependencyError::configuration(format!(
            "{} event payload does not identify an issue or pull request",
            event.as_str()
        ))
    })?;
    Ok(TriggerContext {
        event,
        action: payload.action,
        subject_number,
    })
}
