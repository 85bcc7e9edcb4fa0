use deplink_github::entity::{push_unique_entity, Entity};
use deplink_github::reference_extraction::ReferenceExtractor;
use deplink_github::status_comment::parse_status_comment_dependents;
use tracing::{debug, warn};

use crate::error::DependencyError;
use crate::fetcher::EntityFetcher;
use crate::session::EntitySession;

#[derive(Debug, Clone, Default)]
/// Open dependencies and dependents of one entity, in discovery order.
pub struct Resolution {
    pub dependencies: Vec<Entity>,
    pub dependents: Vec<Entity>,
    /// Human-actionable notes: self-references and unverifiable references.
    pub warnings: Vec<String>,
}

pub struct DependencyResolver<'a> {
    fetcher: EntityFetcher<'a>,
    extractor: &'a ReferenceExtractor,
    bot_login: &'a str,
    track_dependents: bool,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        fetcher: EntityFetcher<'a>,
        extractor: &'a ReferenceExtractor,
        bot_login: &'a str,
        track_dependents: bool,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            bot_login,
            track_dependents,
        }
    }

    /// Per-reference fetch failures become warnings; only a failure to list
    /// the entity's own comments is returned as an error.
    pub async fn resolve(&self, session: &mut EntitySession) -> Result<Resolution, DependencyError> {
        let mut resolution = Resolution::default();
        self.resolve_dependencies(session.entity(), &mut resolution).await;
        if self.track_dependents {
            self.resolve_dependents(session, &mut resolution).await?;
        }
        Ok(resolution)
    }

    async fn resolve_dependencies(&self, subject: &Entity, resolution: &mut Resolution) {
        let scope = subject.scope();
        for reference in self.extractor.extract(&subject.body, &scope) {
            if reference.same_entity(&subject.reference) {
                let message = format!(
                    "{} #{} declares itself as a dependency; ignoring it",
                    subject.kind.tag(),
                    subject.number()
                );
                warn!(subject = %subject.reference, "{message}");
                resolution.warnings.push(message);
                continue;
            }
            let dependency = match self.fetcher.fetch_entity(&reference).await {
                Ok(dependency) => dependency,
                Err(error) => {
                    let message = format!(
                        "could not verify dependency {} of {} #{}: {error}",
                        reference.display_relative_to(&scope),
                        subject.kind.tag(),
                        subject.number()
                    );
                    warn!(subject = %subject.reference, reference = %reference, "{message}");
                    resolution.warnings.push(message);
                    continue;
                }
            };
            if !dependency.is_open() {
                debug!(subject = %subject.reference, reference = %reference, "dependency is closed");
                continue;
            }
            push_unique_entity(&mut resolution.dependencies, dependency);
        }
    }

    async fn resolve_dependents(
        &self,
        session: &mut EntitySession,
        resolution: &mut Resolution,
    ) -> Result<(), DependencyError> {
        let recorded = {
            let scope = session.entity().scope();
            session
                .last_status_comment(self.fetcher, self.bot_login, false)
                .await?
                .and_then(|comment| comment.body.as_deref())
                .map(|body| parse_status_comment_dependents(body, &scope))
                .unwrap_or_default()
        };
        let subject = session.entity();
        let scope = subject.scope();

        for reference in recorded {
            if reference.same_entity(&subject.reference) {
                debug!(subject = %subject.reference, "status comment lists the entity itself");
                continue;
            }
            let dependent = match self.fetcher.fetch_entity(&reference).await {
                Ok(dependent) => dependent,
                Err(error) => {
                    let message = format!(
                        "could not verify dependent {} of {} #{}: {error}",
                        reference.display_relative_to(&scope),
                        subject.kind.tag(),
                        subject.number()
                    );
                    warn!(subject = %subject.reference, reference = %reference, "{message}");
                    resolution.warnings.push(message);
                    continue;
                }
            };
            if !dependent.is_open() {
                debug!(subject = %subject.reference, reference = %reference, "dependent is closed");
                continue;
            }
            if !self
                .extractor
                .declares(&dependent.body, &dependent.scope(), &subject.reference)
            {
                debug!(
                    subject = %subject.reference,
                    reference = %reference,
                    "dependent no longer declares the entity; dropping it"
                );
                continue;
            }
            push_unique_entity(&mut resolution.dependents, dependent);
        }
        Ok(())
    }
}
