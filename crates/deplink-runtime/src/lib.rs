//! Runtime for the deplink dependency bot.
//!
//! Drives one evaluation per triggering event: resolve the subject's open
//! dependencies and dependents, reconcile its status comment and labels, then
//! update every directly related entity once (one hop, no transitive closure).

mod error;
mod fetcher;
mod github_api_client;
mod reconciler;
mod resolver;
mod run;
mod session;
mod tracker;

#[cfg(test)]
mod test_support;

pub use error::{DependencyError, LabelRemovalFailure};
pub use fetcher::EntityFetcher;
pub use github_api_client::{GithubApiClient, GithubApiClientConfig};
pub use reconciler::{CommentAction, ReconcileOutcome, StatusReconciler};
pub use resolver::{DependencyResolver, Resolution};
pub use run::{
    DependencyRun, DependencyRunConfig, ExecutionContext, RunReport, DEFAULT_BOT_LOGIN,
};
pub use session::EntitySession;
pub use tracker::{GithubCommentCreateResponse, IssueTracker, LabelRemoval};
