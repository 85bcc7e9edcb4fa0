//! In-memory `IssueTracker` used by runtime unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use deplink_github::entity::{
    EntityReference, GithubIssue, GithubIssueComment, GithubIssueLabel, GithubUser,
};
use serde_json::json;

use crate::tracker::{GithubCommentCreateResponse, IssueTracker, LabelRemoval};

pub(crate) const TEST_BOT_LOGIN: &str = "github-actions[bot]";

#[derive(Default)]
struct FakeTrackerState {
    issues: HashMap<String, GithubIssue>,
    comments: HashMap<String, Vec<GithubIssueComment>>,
    posted: Vec<(String, String)>,
    added_labels: Vec<(String, Vec<String>)>,
    removed_labels: Vec<(String, String)>,
    failing_label_removals: HashSet<String>,
    failing_comment_posts: HashSet<String>,
    comment_list_calls: usize,
    next_comment_id: u64,
}

#[derive(Default)]
pub(crate) struct FakeTracker {
    state: Mutex<FakeTrackerState>,
}

impl FakeTracker {
    fn with_state<T>(&self, apply: impl FnOnce(&mut FakeTrackerState) -> T) -> T {
        let mut state = self.state.lock().expect("fake tracker lock");
        apply(&mut state)
    }

    fn insert(&self, owner: &str, repo: &str, number: u64, state: &str, body: &str, pull: bool) {
        let pull_request = pull.then(|| json!({ "url": "https://api.github.com/pulls" }));
        let kind = if pull { "pull" } else { "issues" };
        let issue = GithubIssue {
            number,
            title: format!("Entity {number}"),
            body: Some(body.to_string()),
            html_url: format!("https://github.com/{owner}/{repo}/{kind}/{number}"),
            state: state.to_string(),
            labels: Vec::new(),
            pull_request,
        };
        let key = EntityReference::new(owner, repo, number).identity_key();
        self.with_state(|inner| {
            inner.issues.insert(key, issue);
        });
    }

    pub(crate) fn insert_issue(&self, owner: &str, repo: &str, number: u64, state: &str, body: &str) {
        self.insert(owner, repo, number, state, body, false);
    }

    pub(crate) fn insert_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        state: &str,
        body: &str,
    ) {
        self.insert(owner, repo, number, state, body, true);
    }

    pub(crate) fn set_state(&self, reference: &EntityReference, state: &str) {
        self.with_state(|inner| {
            if let Some(issue) = inner.issues.get_mut(&reference.identity_key()) {
                issue.state = state.to_string();
            }
        });
    }

    pub(crate) fn set_labels(&self, reference: &EntityReference, labels: &[&str]) {
        self.with_state(|inner| {
            if let Some(issue) = inner.issues.get_mut(&reference.identity_key()) {
                issue.labels = labels
                    .iter()
                    .map(|name| GithubIssueLabel {
                        name: name.to_string(),
                    })
                    .collect();
            }
        });
    }

    pub(crate) fn push_comment(&self, reference: &EntityReference, login: &str, body: &str) {
        self.with_state(|inner| {
            inner.next_comment_id += 1;
            let id = inner.next_comment_id;
            inner
                .comments
                .entry(reference.identity_key())
                .or_default()
                .push(GithubIssueComment {
                    id,
                    body: Some(body.to_string()),
                    user: GithubUser {
                        login: login.to_string(),
                    },
                    created_at: None,
                });
        });
    }

    pub(crate) fn fail_label_removal(&self, label: &str) {
        self.with_state(|inner| {
            inner.failing_label_removals.insert(label.to_string());
        });
    }

    pub(crate) fn fail_comment_posts(&self, reference: &EntityReference) {
        self.with_state(|inner| {
            inner.failing_comment_posts.insert(reference.identity_key());
        });
    }

    pub(crate) fn posted(&self) -> Vec<(String, String)> {
        self.with_state(|inner| inner.posted.clone())
    }

    pub(crate) fn posted_to(&self, reference: &EntityReference) -> Vec<String> {
        let key = reference.identity_key();
        self.posted()
            .into_iter()
            .filter(|(target, _)| *target == key)
            .map(|(_, body)| body)
            .collect()
    }

    pub(crate) fn added_labels(&self) -> Vec<(String, Vec<String>)> {
        self.with_state(|inner| inner.added_labels.clone())
    }

    pub(crate) fn removed_labels(&self) -> Vec<(String, String)> {
        self.with_state(|inner| inner.removed_labels.clone())
    }

    pub(crate) fn comment_list_calls(&self) -> usize {
        self.with_state(|inner| inner.comment_list_calls)
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn get_issue(&self, reference: &EntityReference) -> Result<GithubIssue> {
        self.with_state(|inner| {
            inner
                .issues
                .get(&reference.identity_key())
                .cloned()
                .ok_or_else(|| anyhow!("github api get issue failed with status 404"))
        })
    }

    async fn list_issue_comments(
        &self,
        reference: &EntityReference,
    ) -> Result<Vec<GithubIssueComment>> {
        self.with_state(|inner| {
            inner.comment_list_calls += 1;
            Ok(inner
                .comments
                .get(&reference.identity_key())
                .cloned()
                .unwrap_or_default())
        })
    }

    async fn create_issue_comment(
        &self,
        reference: &EntityReference,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let key = reference.identity_key();
        if self.with_state(|inner| inner.failing_comment_posts.contains(&key)) {
            return Err(anyhow!("github api create issue comment failed with status 500"));
        }
        self.push_comment(reference, TEST_BOT_LOGIN, body);
        self.with_state(|inner| {
            inner.posted.push((key, body.to_string()));
            Ok(GithubCommentCreateResponse {
                id: inner.next_comment_id,
                html_url: None,
            })
        })
    }

    async fn add_labels(&self, reference: &EntityReference, labels: &[String]) -> Result<()> {
        let key = reference.identity_key();
        self.with_state(|inner| {
            if let Some(issue) = inner.issues.get_mut(&key) {
                for label in labels {
                    issue.labels.push(GithubIssueLabel {
                        name: label.clone(),
                    });
                }
            }
            inner.added_labels.push((key, labels.to_vec()));
        });
        Ok(())
    }

    async fn remove_label(&self, reference: &EntityReference, label: &str) -> Result<LabelRemoval> {
        let key = reference.identity_key();
        self.with_state(|inner| {
            if inner.failing_label_removals.contains(label) {
                return Err(anyhow!("github api remove label failed with status 500"));
            }
            inner.removed_labels.push((key.clone(), label.to_string()));
            let Some(issue) = inner.issues.get_mut(&key) else {
                return Ok(LabelRemoval::NotPresent);
            };
            let before = issue.labels.len();
            issue
                .labels
                .retain(|existing| !existing.name.eq_ignore_ascii_case(label));
            Ok(if issue.labels.len() < before {
                LabelRemoval::Removed
            } else {
                LabelRemoval::NotPresent
            })
        })
    }
}
