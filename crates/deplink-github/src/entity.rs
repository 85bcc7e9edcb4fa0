use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubUser` used across deplink components.
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubIssueLabel` used across deplink components.
pub struct GithubIssueLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Issue or pull request as returned by the REST `issues` endpoints.
pub struct GithubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GithubIssueLabel>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubIssueComment` used across deplink components.
pub struct GithubIssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    pub user: GithubUser,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `EntityKind` values.
pub enum EntityKind {
    Issue,
    PullRequest,
}

impl EntityKind {
    /// Short tag used in rendered bullet entries (`[PR #1](...)`).
    pub fn tag(self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::PullRequest => "PR",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pull request",
        }
    }

    /// Verb describing what the dependencies hold back.
    pub fn action_verb(self) -> &'static str {
        match self {
            Self::Issue => "closed",
            Self::PullRequest => "merged",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Open,
    Closed,
}

impl EntityState {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("open") {
            Self::Open
        } else {
            Self::Closed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Repository an intra-repo `#N` reference resolves against.
pub struct RepositoryScope {
    pub owner: String,
    pub repo: String,
}

impl RepositoryScope {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn contains(&self, reference: &EntityReference) -> bool {
        self.owner.eq_ignore_ascii_case(&reference.owner)
            && self.repo.eq_ignore_ascii_case(&reference.repo)
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Pointer to an issue or pull request, produced by reference extraction.
pub struct EntityReference {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl EntityReference {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }

    pub fn in_scope(scope: &RepositoryScope, number: u64) -> Self {
        Self::new(scope.owner.clone(), scope.repo.clone(), number)
    }

    /// Uniqueness key. GitHub owner and repository names are case-insensitive.
    pub fn identity_key(&self) -> String {
        format!(
            "{}/{}#{}",
            self.owner.to_ascii_lowercase(),
            self.repo.to_ascii_lowercase(),
            self.number
        )
    }

    pub fn same_entity(&self, other: &EntityReference) -> bool {
        self.number == other.number
            && self.owner.eq_ignore_ascii_case(&other.owner)
            && self.repo.eq_ignore_ascii_case(&other.repo)
    }

    pub fn scope(&self) -> RepositoryScope {
        RepositoryScope::new(self.owner.clone(), self.repo.clone())
    }

    /// `#N` inside `scope`, `owner/repo#N` outside it.
    pub fn display_relative_to(&self, scope: &RepositoryScope) -> String {
        if scope.contains(self) {
            format!("#{}", self.number)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A fetched issue or pull request. Read-only for the duration of a run.
pub struct Entity {
    pub reference: EntityReference,
    pub title: String,
    pub html_url: String,
    pub state: EntityState,
    pub kind: EntityKind,
    pub body: String,
    pub labels: Vec<String>,
}

impl Entity {
    /// Builds the entity model; the kind is decided once from the `pull_request` field.
    pub fn from_issue(reference: &EntityReference, issue: GithubIssue) -> Self {
        let kind = if issue.pull_request.is_some() {
            EntityKind::PullRequest
        } else {
            EntityKind::Issue
        };
        Self {
            reference: EntityReference::new(
                reference.owner.clone(),
                reference.repo.clone(),
                issue.number,
            ),
            title: issue.title,
            html_url: issue.html_url,
            state: EntityState::parse(&issue.state),
            kind,
            body: issue.body.unwrap_or_default(),
            labels: issue.labels.into_iter().map(|label| label.name).collect(),
        }
    }

    pub fn number(&self) -> u64 {
        self.reference.number
    }

    pub fn is_open(&self) -> bool {
        self.state == EntityState::Open
    }

    pub fn scope(&self) -> RepositoryScope {
        self.reference.scope()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels
            .iter()
            .any(|label| label.trim().eq_ignore_ascii_case(name.trim()))
    }
}

/// Appends `entity` unless an entity with the same identity is already present.
pub fn push_unique_entity(entities: &mut Vec<Entity>, entity: Entity) -> bool {
    if entities
        .iter()
        .any(|existing| existing.reference.same_entity(&entity.reference))
    {
        return false;
    }
    entities.push(entity);
    true
}
