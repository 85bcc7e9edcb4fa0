use std::sync::LazyLock;

use regex::Regex;

use crate::entity::{Entity, EntityKind, EntityReference, GithubIssueComment, RepositoryScope};

pub const STATUS_COMMENT_SIGNATURE: &str = "<!-- deplink:status -->";
pub const DEPENDENCIES_HEADING: &str = "### Blocking Dependencies Found";
pub const DEPENDENTS_HEADING: &str = "### Blocked Dependents Found";
pub const SECTION_DELIMITER: &str = "---";

#[derive(Debug, Clone, Copy)]
/// Inputs of the status comment; the rendered body depends on nothing else.
pub struct StatusCommentView<'a> {
    pub kind: EntityKind,
    pub scope: &'a RepositoryScope,
    pub dependencies: &'a [Entity],
    pub dependents: &'a [Entity],
}

/// `- [PR #12](url) – title`, qualified as `owner/repo#12` outside `scope`.
pub fn render_entity_bullet(entity: &Entity, scope: &RepositoryScope) -> String {
    format!(
        "- [{} {}]({}) – {}",
        entity.kind.tag(),
        entity.reference.display_relative_to(scope),
        entity.html_url,
        single_line(&entity.title)
    )
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn render_status_comment(view: StatusCommentView<'_>) -> String {
    let noun = view.kind.noun();
    let mut lines = vec![STATUS_COMMENT_SIGNATURE.to_string()];

    if view.dependencies.is_empty() {
        lines.push(format!(
            ":white_check_mark: All dependencies of this {noun} are resolved."
        ));
    } else {
        lines.push(DEPENDENCIES_HEADING.to_string());
        lines.push(String::new());
        lines.push(format!(
            "This {noun} should not be {} until the following are resolved:",
            view.kind.action_verb()
        ));
        lines.push(String::new());
        lines.extend(
            view.dependencies
                .iter()
                .map(|entity| render_entity_bullet(entity, view.scope)),
        );
    }

    lines.push(String::new());
    lines.push(SECTION_DELIMITER.to_string());
    if view.dependents.is_empty() {
        lines.push(format!(
            ":white_check_mark: No open issues or pull requests are waiting on this {noun}."
        ));
    } else {
        lines.push(DEPENDENTS_HEADING.to_string());
        lines.push(String::new());
        lines.push(format!("The following are waiting on this {noun}:"));
        lines.push(String::new());
        lines.extend(
            view.dependents
                .iter()
                .map(|entity| render_entity_bullet(entity, view.scope)),
        );
    }

    lines.push(String::new());
    lines.push(SECTION_DELIMITER.to_string());
    lines.push(
        "_This status is maintained by deplink. Declare dependencies in the description with a `Depends on:` line; a new status comment is posted whenever they change._"
            .to_string(),
    );
    lines.push(STATUS_COMMENT_SIGNATURE.to_string());
    lines.join("\n")
}

/// Most recent comment authored by `bot_login` that carries the signature.
pub fn find_last_status_comment<'a>(
    comments: &'a [GithubIssueComment],
    bot_login: &str,
) -> Option<&'a GithubIssueComment> {
    comments.iter().rev().find(|comment| {
        comment.user.login.eq_ignore_ascii_case(bot_login.trim())
            && comment
                .body
                .as_deref()
                .is_some_and(|body| body.contains(STATUS_COMMENT_SIGNATURE))
    })
}

/// Compares a posted body with a freshly rendered one, ignoring line-ending
/// normalisation applied by GitHub.
pub fn status_comment_matches(posted: &str, rendered: &str) -> bool {
    posted.replace("\r\n", "\n").trim_end() == rendered.trim_end()
}

static DEPENDENT_BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[-*]\s+\[(?:pr|issue)\s+(?:([A-Za-z0-9][A-Za-z0-9-]*)/([A-Za-z0-9._-]+))?#(\d+)\]\([^)]*\)",
    )
    .expect("dependent bullet pattern is valid")
});

/// Dependents recorded in the "Blocked Dependents Found" section of a status
/// comment. Only bullet entries inside that section are recognised.
pub fn parse_status_comment_dependents(body: &str, scope: &RepositoryScope) -> Vec<EntityReference> {
    let mut references: Vec<EntityReference> = Vec::new();
    let mut inside_section = false;
    for line in body.lines() {
        let trimmed = line.trim();
        if !inside_section {
            inside_section = trimmed == DEPENDENTS_HEADING;
            continue;
        }
        if trimmed == SECTION_DELIMITER || trimmed.starts_with('#') {
            break;
        }
        let Some(captures) = DEPENDENT_BULLET_RE.captures(trimmed) else {
            continue;
        };
        let Some(number) = captures
            .get(3)
            .and_then(|value| value.as_str().parse::<u64>().ok())
        else {
            continue;
        };
        let reference = match (captures.get(1), captures.get(2)) {
            (Some(owner), Some(repo)) => EntityReference::new(owner.as_str(), repo.as_str(), number),
            _ => EntityReference::in_scope(scope, number),
        };
        if !references
            .iter()
            .any(|existing| existing.same_entity(&reference))
        {
            references.push(reference);
        }
    }
    references
}
