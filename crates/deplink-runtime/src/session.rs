use deplink_github::entity::{Entity, GithubIssueComment, GithubUser};
use deplink_github::label_plan::normalize_label;
use deplink_github::status_comment::find_last_status_comment;

use crate::error::DependencyError;
use crate::fetcher::EntityFetcher;

#[derive(Debug, Clone)]
/// Per-entity state for one evaluation: the fetched entity, its labels as
/// they stand after this run's writes, and the memoized last status comment.
pub struct EntitySession {
    entity: Entity,
    labels: Vec<String>,
    last_status_comment: Option<Option<GithubIssueComment>>,
}

impl EntitySession {
    pub fn new(entity: Entity) -> Self {
        let labels = entity.labels.clone();
        Self {
            entity,
            labels,
            last_status_comment: None,
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn into_entity(self) -> Entity {
        self.entity
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Lists comments on first use (or when `refresh` is set) and memoizes
    /// the most recent status comment authored by `bot_login`.
    pub async fn last_status_comment(
        &mut self,
        fetcher: EntityFetcher<'_>,
        bot_login: &str,
        refresh: bool,
    ) -> Result<Option<&GithubIssueComment>, DependencyError> {
        if refresh || self.last_status_comment.is_none() {
            let comments = fetcher.list_comments(&self.entity).await?;
            let last = find_last_status_comment(&comments, bot_login).cloned();
            tracing::debug!(
                subject = %self.entity.reference,
                comments = comments.len(),
                found = last.is_some(),
                "listed status comments"
            );
            self.last_status_comment = Some(last);
        }
        Ok(self
            .last_status_comment
            .as_ref()
            .and_then(|comment| comment.as_ref()))
    }

    pub(crate) fn record_posted_comment(&mut self, id: u64, bot_login: &str, body: &str) {
        self.last_status_comment = Some(Some(GithubIssueComment {
            id,
            body: Some(body.to_string()),
            user: GithubUser {
                login: bot_login.to_string(),
            },
            created_at: None,
        }));
    }

    pub(crate) fn record_labels_added(&mut self, added: &[String]) {
        for label in added {
            if !self.has_label(label) {
                self.labels.push(label.clone());
            }
        }
    }

    pub(crate) fn record_label_removed(&mut self, removed: &str) {
        let removed = normalize_label(removed);
        self.labels.retain(|label| normalize_label(label) != removed);
    }

    fn has_label(&self, name: &str) -> bool {
        let name = normalize_label(name);
        self.labels.iter().any(|label| normalize_label(label) == name)
    }
}
