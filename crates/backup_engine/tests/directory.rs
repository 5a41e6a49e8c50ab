use std::time::Duration;

use backup_engine::{
    build_tree, collect_all_pages, FailureKind, FetchSettings, NotionSearchDirectory, PageIcon,
    PageNode, ParentRef, RetryPolicy,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn title(text: &str) -> serde_json::Value {
    json!({ "type": "title", "title": [{ "plain_text": text }] })
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn follows_cursors_until_exhausted() {
    backup_logging::initialize_for_tests();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .and(body_partial_json(json!({ "start_cursor": "cursor-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [{
                "object": "page",
                "id": "child",
                "last_edited_time": "2026-01-02T00:00:00.000Z",
                "parent": { "type": "page_id", "page_id": "root" },
                "properties": { "Name": title("Child") },
                "icon": { "type": "external", "external": { "url": "https://icons.test/c.png" } }
            }],
            "next_cursor": null,
            "has_more": false
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("notion-version", "2022-06-28"))
        .and(body_partial_json(json!({ "page_size": 100 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [
                {
                    "object": "page",
                    "id": "root",
                    "last_edited_time": "2026-01-01T00:00:00.000Z",
                    "parent": { "type": "workspace", "workspace": true },
                    "properties": { "title": title("Root") },
                    "icon": { "type": "emoji", "emoji": "📁" }
                },
                { "object": "database", "id": "db", "title": [] }
            ],
            "next_cursor": "cursor-2",
            "has_more": true
        })))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let directory =
        NotionSearchDirectory::with_base_url(&server.uri(), "secret-token", &FetchSettings::default())
            .unwrap();
    let records = collect_all_pages(&directory, quick_retry()).await.expect("listing");

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["root", "child"]);
    assert_eq!(records[0].icon, Some(PageIcon::Emoji("📁".into())));
    assert_eq!(records[1].parent, ParentRef::page("root"));
    assert_eq!(records[1].last_edited, "2026-01-02T00:00:00.000Z");
    assert_eq!(
        records[1].icon,
        Some(PageIcon::External("https://icons.test/c.png".into()))
    );

    let roots = build_tree(&records);
    assert_eq!(roots.len(), 1);
    let children: Vec<&str> = roots[0].children.iter().map(PageNode::title).collect();
    assert_eq!(children, vec!["Child"]);
}

#[tokio::test]
async fn unauthorized_is_reported_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "object": "error",
            "status": 401,
            "code": "unauthorized",
            "message": "API token is invalid."
        })))
        .expect(2)
        .mount(&server)
        .await;

    let directory =
        NotionSearchDirectory::with_base_url(&server.uri(), "bad", &FetchSettings::default())
            .unwrap();
    let err = collect_all_pages(&directory, quick_retry()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(401));
    assert_eq!(err.message, "API token is invalid.");
}
