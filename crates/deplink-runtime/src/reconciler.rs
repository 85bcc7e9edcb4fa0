use anyhow::anyhow;
use deplink_github::entity::Entity;
use deplink_github::label_plan::{plan_status_labels, StatusLabels};
use deplink_github::status_comment::{
    render_status_comment, status_comment_matches, StatusCommentView,
};
use tracing::{debug, info, warn};

use crate::error::{DependencyError, LabelRemovalFailure};
use crate::fetcher::EntityFetcher;
use crate::session::EntitySession;
use crate::tracker::LabelRemoval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    /// The last status comment already carries the rendered body.
    Unchanged,
    Posted,
    /// Nothing is open and no status comment was ever posted.
    Skipped,
}

#[derive(Debug)]
pub struct ReconcileOutcome {
    pub comment: CommentAction,
    pub labels_added: Vec<String>,
    pub labels_removed: Vec<String>,
    /// `LabelRemovalFailed` when any removal failed for a reason other than
    /// the label being absent. The comment decision is unaffected.
    pub label_removal_error: Option<DependencyError>,
}

/// Brings one entity's status comment and labels in line with its open
/// dependencies and dependents.
pub struct StatusReconciler<'a> {
    fetcher: EntityFetcher<'a>,
    bot_login: &'a str,
    labels: &'a StatusLabels,
}

impl<'a> StatusReconciler<'a> {
    pub fn new(fetcher: EntityFetcher<'a>, bot_login: &'a str, labels: &'a StatusLabels) -> Self {
        Self {
            fetcher,
            bot_login,
            labels,
        }
    }

    pub async fn reconcile(
        &self,
        session: &mut EntitySession,
        dependencies: &[Entity],
        dependents: &[Entity],
    ) -> Result<ReconcileOutcome, DependencyError> {
        let (number, kind) = (session.entity().number(), session.entity().kind);
        self.reconcile_inner(session, dependencies, dependents)
            .await
            .map_err(|error| match error {
                DependencyError::ReconciliationFailed { .. } => error,
                other => DependencyError::reconciliation_failed(number, kind, anyhow!(other)),
            })
    }

    async fn reconcile_inner(
        &self,
        session: &mut EntitySession,
        dependencies: &[Entity],
        dependents: &[Entity],
    ) -> Result<ReconcileOutcome, DependencyError> {
        let has_dependencies = !dependencies.is_empty();
        let has_dependents = !dependents.is_empty();
        let subject = session.entity().clone();
        let scope = subject.scope();
        let rendered = render_status_comment(StatusCommentView {
            kind: subject.kind,
            scope: &scope,
            dependencies,
            dependents,
        });

        let (has_prior_comment, comment_changed) = match session
            .last_status_comment(self.fetcher, self.bot_login, false)
            .await?
        {
            Some(comment) => (
                true,
                !status_comment_matches(comment.body.as_deref().unwrap_or_default(), &rendered),
            ),
            None => (false, true),
        };

        let comment = if !comment_changed {
            info!(
                subject = %subject.reference,
                dependencies = dependencies.len(),
                dependents = dependents.len(),
                "status comment unchanged"
            );
            CommentAction::Unchanged
        } else if has_dependencies || has_dependents || has_prior_comment {
            let response = self
                .fetcher
                .tracker()
                .create_issue_comment(&subject.reference, &rendered)
                .await
                .map_err(|error| {
                    DependencyError::reconciliation_failed(subject.number(), subject.kind, error)
                })?;
            session.record_posted_comment(response.id, self.bot_login, &rendered);
            info!(
                subject = %subject.reference,
                comment_id = response.id,
                dependencies = dependencies.len(),
                dependents = dependents.len(),
                "posted status comment"
            );
            CommentAction::Posted
        } else {
            debug!(subject = %subject.reference, "nothing to announce, skipping status comment");
            CommentAction::Skipped
        };

        let plan = plan_status_labels(
            self.labels,
            has_dependencies,
            has_dependents,
            session.labels().collect::<Vec<_>>(),
        );

        if !plan.add.is_empty() {
            self.fetcher
                .tracker()
                .add_labels(&subject.reference, &plan.add)
                .await
                .map_err(|error| {
                    DependencyError::reconciliation_failed(subject.number(), subject.kind, error)
                })?;
            session.record_labels_added(&plan.add);
            info!(subject = %subject.reference, labels = ?plan.add, "added labels");
        }

        let mut labels_removed = Vec::new();
        let mut failures = Vec::new();
        for label in &plan.remove {
            match self
                .fetcher
                .tracker()
                .remove_label(&subject.reference, label)
                .await
            {
                Ok(removal) => {
                    if removal == LabelRemoval::NotPresent {
                        debug!(subject = %subject.reference, label = %label, "label already absent");
                    }
                    session.record_label_removed(label);
                    labels_removed.push(label.clone());
                }
                Err(error) => {
                    warn!(
                        subject = %subject.reference,
                        label = %label,
                        error = %format!("{error:#}"),
                        "failed to remove label"
                    );
                    failures.push(LabelRemovalFailure {
                        label: label.clone(),
                        error,
                    });
                }
            }
        }
        if !labels_removed.is_empty() {
            info!(subject = %subject.reference, labels = ?labels_removed, "removed labels");
        }

        let label_removal_error = (!failures.is_empty()).then(|| {
            DependencyError::LabelRemovalFailed {
                reference: subject.reference.clone(),
                failures,
            }
        });

        Ok(ReconcileOutcome {
            comment,
            labels_added: plan.add,
            labels_removed,
            label_removal_error,
        })
    }
}
