use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use deplink_github::entity::{EntityReference, GithubIssue, GithubIssueComment, GithubIssueLabel};
use deplink_github::github_transport_helpers::{
    is_github_not_found, parse_retry_after, truncate_for_error, GithubStatusError, RetryPolicy,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::tracker::{GithubCommentCreateResponse, IssueTracker, LabelRemoval};

const COMMENTS_PAGE_SIZE: usize = 100;
const ERROR_BODY_MAX_CHARS: usize = 800;

#[derive(Debug, Clone)]
pub struct GithubApiClientConfig {
    pub api_base: String,
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Clone)]
/// REST client for the GitHub issues API with bounded retry and backoff.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: reqwest::Url,
    retry: RetryPolicy,
}

impl GithubApiClient {
    pub fn new(config: GithubApiClientConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("deplink-dependency-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", config.token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        let api_base = reqwest::Url::parse(config.api_base.trim())
            .with_context(|| format!("invalid github api url '{}'", config.api_base))?;
        if api_base.cannot_be_a_base() {
            return Err(anyhow!("github api url '{}' cannot be a base", config.api_base));
        }
        Ok(Self {
            http,
            api_base,
            retry: RetryPolicy::new(config.retry_max_attempts, config.retry_base_delay_ms),
        })
    }

    /// `{api_base}/repos/{owner}/{repo}/issues/{number}/{tail...}` with every
    /// segment percent-encoded.
    fn issue_endpoint(&self, reference: &EntityReference, tail: &[&str]) -> Result<reqwest::Url> {
        let number = reference.number.to_string();
        let mut url = self.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("github api url cannot be a base"))?;
            segments.pop_if_empty();
            segments.extend([
                "repos",
                reference.owner.as_str(),
                reference.repo.as_str(),
                "issues",
                number.as_str(),
            ]);
            segments.extend(tail.iter().copied());
        }
        Ok(url)
    }

    async fn send_with_retry<F>(
        &self,
        operation: &str,
        mut request_builder: F,
    ) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header("x-deplink-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if self
                        .retry
                        .should_retry_status(attempt, status.as_u16(), &body)
                    {
                        let delay = self.retry.delay(attempt, retry_after);
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying github api request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(anyhow::Error::new(GithubStatusError {
                        operation: operation.to_string(),
                        status: status.as_u16(),
                        body: truncate_for_error(&body, ERROR_BODY_MAX_CHARS),
                    }));
                }
                Err(error) => {
                    if self.retry.should_retry_transport(attempt, &error) {
                        tokio::time::sleep(self.retry.delay(attempt, None)).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }

    async fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response = self.send_with_retry(operation, request_builder).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode github {operation}"))
    }
}

#[async_trait]
impl IssueTracker for GithubApiClient {
    async fn get_issue(&self, reference: &EntityReference) -> Result<GithubIssue> {
        let url = self.issue_endpoint(reference, &[])?;
        self.request_json("get issue", || self.http.get(url.clone()))
            .await
    }

    async fn list_issue_comments(
        &self,
        reference: &EntityReference,
    ) -> Result<Vec<GithubIssueComment>> {
        let url = self.issue_endpoint(reference, &["comments"])?;
        let per_page = COMMENTS_PAGE_SIZE.to_string();
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssueComment> = self
                .request_json("list issue comments", || {
                    self.http.get(url.clone()).query(&[
                        ("sort", "created"),
                        ("direction", "asc"),
                        ("per_page", per_page.as_str()),
                        ("page", page_value.as_str()),
                    ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < COMMENTS_PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    async fn create_issue_comment(
        &self,
        reference: &EntityReference,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let url = self.issue_endpoint(reference, &["comments"])?;
        let payload = json!({ "body": body });
        self.request_json("create issue comment", || {
            self.http.post(url.clone()).json(&payload)
        })
        .await
    }

    async fn add_labels(&self, reference: &EntityReference, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let url = self.issue_endpoint(reference, &["labels"])?;
        let payload = json!({ "labels": labels });
        let _: Vec<GithubIssueLabel> = self
            .request_json("add labels", || self.http.post(url.clone()).json(&payload))
            .await?;
        Ok(())
    }

    async fn remove_label(&self, reference: &EntityReference, label: &str) -> Result<LabelRemoval> {
        let url = self.issue_endpoint(reference, &["labels", label])?;
        match self
            .send_with_retry("remove label", || self.http.delete(url.clone()))
            .await
        {
            Ok(_) => Ok(LabelRemoval::Removed),
            Err(error) if is_github_not_found(&error) => Ok(LabelRemoval::NotPresent),
            Err(error) => Err(error),
        }
    }
}
