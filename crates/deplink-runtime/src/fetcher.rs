use deplink_github::entity::{Entity, EntityReference, GithubIssueComment};

use crate::error::DependencyError;
use crate::tracker::IssueTracker;

#[derive(Clone, Copy)]
/// Reads entities and their comments, translating transport failures into
/// `DependencyError::FetchFailed` for the reference involved.
pub struct EntityFetcher<'a> {
    tracker: &'a dyn IssueTracker,
}

impl<'a> EntityFetcher<'a> {
    pub fn new(tracker: &'a dyn IssueTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &'a dyn IssueTracker {
        self.tracker
    }

    pub async fn fetch_entity(&self, reference: &EntityReference) -> Result<Entity, DependencyError> {
        let issue = self
            .tracker
            .get_issue(reference)
            .await
            .map_err(|error| DependencyError::fetch_failed(reference, error))?;
        Ok(Entity::from_issue(reference, issue))
    }

    pub async fn list_comments(
        &self,
        entity: &Entity,
    ) -> Result<Vec<GithubIssueComment>, DependencyError> {
        self.tracker
            .list_issue_comments(&entity.reference)
            .await
            .map_err(|error| DependencyError::fetch_failed(&entity.reference, error))
    }
}
