use anyhow::Result;
use async_trait::async_trait;
use deplink_github::entity::{EntityReference, GithubIssue, GithubIssueComment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommentCreateResponse {
    pub id: u64,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRemoval {
    Removed,
    NotPresent,
}

/// Remote issue tracker operations the bot consumes. Every call targets the
/// entity identified by `reference`, which may live in any repository.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_issue(&self, reference: &EntityReference) -> Result<GithubIssue>;

    async fn list_issue_comments(
        &self,
        reference: &EntityReference,
    ) -> Result<Vec<GithubIssueComment>>;

    async fn create_issue_comment(
        &self,
        reference: &EntityReference,
        body: &str,
    ) -> Result<GithubCommentCreateResponse>;

    async fn add_labels(&self, reference: &EntityReference, labels: &[String]) -> Result<()>;

    /// A label that is not present counts as success (`NotPresent`).
    async fn remove_label(&self, reference: &EntityReference, label: &str) -> Result<LabelRemoval>;
}
