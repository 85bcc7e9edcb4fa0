use deplink_github::entity::{EntityKind, EntityReference};
use thiserror::Error;

#[derive(Debug)]
/// One label that could not be removed, with the underlying cause.
pub struct LabelRemovalFailure {
    pub label: String,
    pub error: anyhow::Error,
}

#[derive(Debug, Error)]
/// Domain errors surfaced by the dependency runtime.
pub enum DependencyError {
    /// Unsupported trigger or missing context. Fatal before any work starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A reference could not be resolved to a live entity.
    #[error("failed to fetch {reference}: {source:#}")]
    FetchFailed {
        reference: EntityReference,
        #[source]
        source: anyhow::Error,
    },

    /// Any fault while computing or posting the status of one entity.
    #[error("failed to reconcile {kind} #{number}: {source:#}")]
    ReconciliationFailed {
        number: u64,
        kind: EntityKind,
        #[source]
        source: anyhow::Error,
    },

    /// Aggregate of label removals that failed for reasons other than not-found.
    #[error("failed to remove labels from {reference}: {}", render_label_failures(.failures))]
    LabelRemovalFailed {
        reference: EntityReference,
        failures: Vec<LabelRemovalFailure>,
    },
}

impl DependencyError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn fetch_failed(reference: &EntityReference, source: anyhow::Error) -> Self {
        Self::FetchFailed {
            reference: reference.clone(),
            source,
        }
    }

    pub fn reconciliation_failed(number: u64, kind: EntityKind, source: anyhow::Error) -> Self {
        Self::ReconciliationFailed {
            number,
            kind,
            source,
        }
    }
}

fn render_label_failures(failures: &[LabelRemovalFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("'{}' ({:#})", failure.label, failure.error))
        .collect::<Vec<_>>()
        .join(", ")
}
