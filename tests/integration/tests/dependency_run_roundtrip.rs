use deplink_runtime::{
    DependencyRun, DependencyRunConfig, ExecutionContext, GithubApiClient, GithubApiClientConfig,
};
use httpmock::prelude::*;
use serde_json::{json, Value};

const BOT_LOGIN: &str = "github-actions[bot]";

fn client(server: &MockServer) -> GithubApiClient {
    GithubApiClient::new(GithubApiClientConfig {
        api_base: server.base_url(),
        token: "integration-token".to_string(),
        request_timeout_ms: 2_000,
        retry_max_attempts: 2,
        retry_base_delay_ms: 1,
    })
    .expect("github client")
}

fn issue_json(owner: &str, repo: &str, number: u64, state: &str, body: &str) -> Value {
    json!({
        "number": number,
        "title": format!("Entity {number}"),
        "body": body,
        "html_url": format!("https://github.com/{owner}/{repo}/issues/{number}"),
        "state": state,
        "labels": []
    })
}

fn status_comment(id: u64, body: &str) -> Value {
    json!({
        "id": id,
        "body": body,
        "user": {"login": BOT_LOGIN},
        "created_at": "2026-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn integration_closed_dependency_posts_resolution_and_tolerates_missing_label() {
    let server = MockServer::start();
    let mut subject_json = issue_json("owner", "repo", 1, "open", "Depends on: #2");
    subject_json["labels"] = json!([{"name": "blocked"}]);
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/1");
        then.status(200).json_body(subject_json.clone());
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/2");
        then.status(200)
            .json_body(issue_json("owner", "repo", 2, "closed", ""));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/owner/repo/issues/1/comments")
            .query_param("per_page", "100");
        then.status(200).json_body(json!([
            {"id": 1, "body": "thanks", "user": {"login": "alice"}},
            status_comment(
                2,
                "<!-- deplink:status -->\n### Blocking Dependencies Found\n\n- [Issue #2](https://github.com/owner/repo/issues/2) – Entity 2\n<!-- deplink:status -->"
            )
        ]));
    });
    let resolution_comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/owner/repo/issues/1/comments")
            .body_includes("All dependencies of this issue are resolved");
        then.status(201).json_body(json!({"id": 3}));
    });
    let remove_blocked = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/owner/repo/issues/1/labels/blocked");
        then.status(404).json_body(json!({"message": "Label does not exist"}));
    });

    let client = client(&server);
    let run = DependencyRun::new(
        &client,
        ExecutionContext::new("owner", "repo", 1),
        DependencyRunConfig::default(),
    )
    .expect("run");
    let report = run.execute().await.expect("report");

    resolution_comment.assert_calls(1);
    remove_blocked.assert_calls(1);
    assert!(!report.has_dependencies());
    assert_eq!(report.failure_message(), None);
    assert!(report.warnings.is_empty());
    assert!(report.related_failures.is_empty());
}

#[tokio::test]
async fn integration_unfetchable_dependency_is_reported_but_does_not_block() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/1");
        then.status(200)
            .json_body(issue_json("owner", "repo", 1, "open", "Depends on: #123"));
    });
    let missing = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/123");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/1/comments");
        then.status(200).json_body(json!([]));
    });
    let any_comment = server.mock(|when, then| {
        when.method(POST).path("/repos/owner/repo/issues/1/comments");
        then.status(201).json_body(json!({"id": 1}));
    });

    let client = client(&server);
    let report = DependencyRun::new(
        &client,
        ExecutionContext::new("owner", "repo", 1),
        DependencyRunConfig::default(),
    )
    .expect("run")
    .execute()
    .await
    .expect("report");

    missing.assert_calls(1);
    any_comment.assert_calls(0);
    assert!(!report.has_dependencies());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("#123"));
    assert!(report.warnings[0].contains("404"));
}

#[tokio::test]
async fn integration_stale_dependents_are_pruned_and_cross_repo_dependents_updated() {
    let server = MockServer::start();
    let mut subject_json = issue_json("owner", "repo", 1, "open", "");
    subject_json["labels"] = json!([{"name": "blocking"}]);
    let subject = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/1");
        then.status(200).json_body(subject_json.clone());
    });
    let stale = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/5");
        then.status(200)
            .json_body(issue_json("owner", "repo", 5, "open", "No longer waiting."));
    });
    let mut port_json = issue_json("other", "lib", 7, "open", "Depends on: owner/repo#1");
    port_json["html_url"] = json!("https://github.com/other/lib/pull/7");
    port_json["pull_request"] = json!({"url": "https://api.github.com/repos/other/lib/pulls/7"});
    server.mock(|when, then| {
        when.method(GET).path("/repos/other/lib/issues/7");
        then.status(200).json_body(port_json.clone());
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/1/comments");
        then.status(200).json_body(json!([status_comment(
            40,
            "<!-- deplink:status -->\n:white_check_mark: All dependencies of this issue are resolved.\n\n---\n### Blocked Dependents Found\n\nThe following are waiting on this issue:\n\n- [PR other/lib#7](https://github.com/other/lib/pull/7) – Entity 7\n- [Issue #5](https://github.com/owner/repo/issues/5) – Entity 5\n\n---\n<!-- deplink:status -->"
        )]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/other/lib/issues/7/comments");
        then.status(200).json_body(json!([]));
    });
    let subject_comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/owner/repo/issues/1/comments")
            .body_includes("[PR other/lib#7](https://github.com/other/lib/pull/7)")
            .body_excludes("[Issue #5]");
        then.status(201).json_body(json!({"id": 41}));
    });
    let dependent_comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/other/lib/issues/7/comments")
            .body_includes("[Issue owner/repo#1](https://github.com/owner/repo/issues/1)")
            .body_includes("should not be merged");
        then.status(201).json_body(json!({"id": 70}));
    });
    let dependent_label = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/other/lib/issues/7/labels")
            .json_body(json!({"labels": ["blocked"]}));
        then.status(200).json_body(json!([{"name": "blocked"}]));
    });

    let client = client(&server);
    let report = DependencyRun::new(
        &client,
        ExecutionContext::new("owner", "repo", 1),
        DependencyRunConfig::default(),
    )
    .expect("run")
    .execute()
    .await
    .expect("report");

    subject.assert_calls(2);
    stale.assert_calls(1);
    subject_comment.assert_calls(1);
    dependent_comment.assert_calls(1);
    dependent_label.assert_calls(1);
    assert_eq!(report.dependents.len(), 1);
    assert_eq!(report.dependents[0].reference.to_string(), "other/lib#7");
    assert!(report.related_failures.is_empty());
}

#[tokio::test]
async fn integration_enterprise_server_urls_resolve_full_url_references() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/1");
        then.status(200).json_body(issue_json(
            "owner",
            "repo",
            1,
            "open",
            "Blocked by:\n- https://git.example.com/platform/api/issues/9\n- https://github.com/owner/repo/issues/4",
        ));
    });
    let enterprise_dependency = server.mock(|when, then| {
        when.method(GET).path("/repos/platform/api/issues/9");
        then.status(200)
            .json_body(issue_json("platform", "api", 9, "open", ""));
    });
    let public_url = server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/4");
        then.status(200)
            .json_body(issue_json("owner", "repo", 4, "open", ""));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/owner/repo/issues/1/comments");
        then.status(200).json_body(json!([]));
    });
    server.mock(|when, then| {
        when.method(POST).path("/repos/owner/repo/issues/1/comments");
        then.status(201).json_body(json!({"id": 1}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/repos/owner/repo/issues/1/labels");
        then.status(200).json_body(json!([{"name": "blocked"}]));
    });

    let client = client(&server);
    let report = DependencyRun::new(
        &client,
        ExecutionContext::new("owner", "repo", 1).with_server_url("https://git.example.com"),
        DependencyRunConfig {
            track_dependents: false,
            ..DependencyRunConfig::default()
        },
    )
    .expect("run")
    .execute()
    .await
    .expect("report");

    enterprise_dependency.assert_calls(1);
    public_url.assert_calls(0);
    assert_eq!(
        report.failure_message().as_deref(),
        Some("#1 has unresolved dependencies: platform/api#9")
    );
}
