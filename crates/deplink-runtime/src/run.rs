use std::collections::HashSet;

use deplink_github::entity::{push_unique_entity, Entity, EntityReference, RepositoryScope};
use deplink_github::label_plan::StatusLabels;
use deplink_github::reference_extraction::{
    ReferenceExtractor, DEFAULT_KEY_PHRASES, DEFAULT_SERVER_URL,
};
use tracing::{info, warn};

use crate::error::DependencyError;
use crate::fetcher::EntityFetcher;
use crate::reconciler::StatusReconciler;
use crate::resolver::DependencyResolver;
use crate::session::EntitySession;
use crate::tracker::IssueTracker;

pub const DEFAULT_BOT_LOGIN: &str = "github-actions[bot]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRunConfig {
    pub phrases: String,
    pub bot_login: String,
    pub labels: StatusLabels,
    /// When false the dependents set is always empty and no dependent hop runs.
    pub track_dependents: bool,
}

impl Default for DependencyRunConfig {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_KEY_PHRASES.to_string(),
            bot_login: DEFAULT_BOT_LOGIN.to_string(),
            labels: StatusLabels::default(),
            track_dependents: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where the run happens and which entity triggered it.
pub struct ExecutionContext {
    pub owner: String,
    pub repo: String,
    pub subject_number: u64,
    pub server_url: String,
}

impl ExecutionContext {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, subject_number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            subject_number,
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    pub fn scope(&self) -> RepositoryScope {
        RepositoryScope::new(self.owner.clone(), self.repo.clone())
    }

    pub fn subject_reference(&self) -> EntityReference {
        EntityReference::in_scope(&self.scope(), self.subject_number)
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub subject: Entity,
    pub dependencies: Vec<Entity>,
    pub dependents: Vec<Entity>,
    /// Warnings about the subject: self-references, unverifiable references
    /// and label removals that failed.
    pub warnings: Vec<String>,
    /// Related entities whose one-hop update failed. None of these fail the run.
    pub related_failures: Vec<DependencyError>,
}

impl RunReport {
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// `#<n> has unresolved dependencies: #a, owner/repo#b` while any
    /// dependency of the subject is still open.
    pub fn failure_message(&self) -> Option<String> {
        if !self.has_dependencies() {
            return None;
        }
        let scope = self.subject.scope();
        let unresolved = self
            .dependencies
            .iter()
            .map(|entity| entity.reference.display_relative_to(&scope))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(
            "#{} has unresolved dependencies: {unresolved}",
            self.subject.number()
        ))
    }
}

/// One evaluation for one triggering event: the subject first, then a single
/// hop over its dependencies and dependents, one entity at a time.
pub struct DependencyRun<'a> {
    tracker: &'a dyn IssueTracker,
    extractor: ReferenceExtractor,
    config: DependencyRunConfig,
    context: ExecutionContext,
}

impl<'a> DependencyRun<'a> {
    pub fn new(
        tracker: &'a dyn IssueTracker,
        context: ExecutionContext,
        config: DependencyRunConfig,
    ) -> Result<Self, DependencyError> {
        if context.owner.trim().is_empty() || context.repo.trim().is_empty() {
            return Err(DependencyError::configuration(
                "repository owner and name are required",
            ));
        }
        if context.subject_number == 0 {
            return Err(DependencyError::configuration(
                "triggering issue or pull request number is required",
            ));
        }
        if config.bot_login.trim().is_empty() {
            return Err(DependencyError::configuration("bot login cannot be empty"));
        }
        let extractor = ReferenceExtractor::new(&config.phrases, &context.server_url)
            .map_err(|error| DependencyError::configuration(format!("{error:#}")))?;
        Ok(Self {
            tracker,
            extractor,
            config,
            context,
        })
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Fails only when the subject cannot be fetched, resolved or reconciled.
    pub async fn execute(&self) -> Result<RunReport, DependencyError> {
        let fetcher = EntityFetcher::new(self.tracker);
        let resolver = DependencyResolver::new(
            fetcher,
            &self.extractor,
            &self.config.bot_login,
            self.config.track_dependents,
        );
        let reconciler =
            StatusReconciler::new(fetcher, &self.config.bot_login, &self.config.labels);

        let subject_reference = self.context.subject_reference();
        info!(subject = %subject_reference, "evaluating dependencies");
        let mut session = EntitySession::new(fetcher.fetch_entity(&subject_reference).await?);
        let resolution = resolver.resolve(&mut session).await?;
        let outcome = reconciler
            .reconcile(&mut session, &resolution.dependencies, &resolution.dependents)
            .await?;

        let mut warnings = resolution.warnings;
        if let Some(error) = outcome.label_removal_error {
            warn!(subject = %subject_reference, error = %error, "label removal incomplete");
            warnings.push(error.to_string());
        }
        let subject = session.into_entity();
        info!(
            subject = %subject.reference,
            dependencies = resolution.dependencies.len(),
            dependents = resolution.dependents.len(),
            "subject reconciled"
        );

        let mut visited = HashSet::from([subject.reference.identity_key()]);
        let mut related_failures = Vec::new();
        let back_link = (self.config.track_dependents && subject.is_open()).then_some(&subject);
        let hop = resolution
            .dependencies
            .iter()
            .map(|dependency| (dependency, back_link))
            .chain(resolution.dependents.iter().map(|dependent| (dependent, None)));
        for (related, back_link) in hop {
            if !visited.insert(related.reference.identity_key()) {
                continue;
            }
            if let Err(error) = self
                .update_related(&resolver, &reconciler, related.clone(), back_link)
                .await
            {
                warn!(
                    subject = %subject.reference,
                    reference = %related.reference,
                    error = %error,
                    "failed to update related entity"
                );
                related_failures.push(error);
            }
        }

        Ok(RunReport {
            subject,
            dependencies: resolution.dependencies,
            dependents: resolution.dependents,
            warnings,
            related_failures,
        })
    }

    /// `back_link` is merged into the related entity's dependents so a
    /// dependency starts listing the subject that declared it.
    async fn update_related(
        &self,
        resolver: &DependencyResolver<'_>,
        reconciler: &StatusReconciler<'_>,
        related: Entity,
        back_link: Option<&Entity>,
    ) -> Result<(), DependencyError> {
        let mut session = EntitySession::new(related);
        let mut resolution = resolver.resolve(&mut session).await?;
        if let Some(subject) = back_link {
            push_unique_entity(&mut resolution.dependents, subject.clone());
        }
        let outcome = reconciler
            .reconcile(&mut session, &resolution.dependencies, &resolution.dependents)
            .await?;
        match outcome.label_removal_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
