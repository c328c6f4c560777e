//! End-to-end tests of the migration against mocked Zendesk and Canny APIs.
//!
//! Topic "115-faq" holds two posts listed over two pages: post 1 has one
//! comment, post 2 has one vote from a user Zendesk does not return.

#![allow(clippy::pedantic)]

use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zendesk_canny_migrate::config::{DestinationConfig, MigrationOptions, SourceConfig};
use zendesk_canny_migrate::{MigrationConfig, MigrationLedger, Pipeline, RecordKind};

const TOPIC: &str = "115-faq";
const BOARD: &str = "board-faq";

fn post(id: i64, author_id: i64, comment_count: i64, vote_count: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Post {}", id),
        "details": format!("<p>How do I <b>{}</b>?</p>", id),
        "author_id": author_id,
        "comment_count": comment_count,
        "vote_count": vote_count,
    })
}

fn user(id: i64) -> Value {
    json!({
        "id": id,
        "created_at": "2019-05-01T12:00:00Z",
        "name": format!("User {}", id),
        "email": format!("user{}@example.com", id),
        "external_id": null,
    })
}

async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Zendesk with topic "115-faq". When `comments_fail` is set the comments
/// of post 1 answer with a server error.
async fn zendesk(comments_fail: bool) -> MockServer {
    let server = MockServer::start().await;
    let posts_route = format!("/api/v2/community/topics/{}/posts.json", TOPIC);

    Mock::given(method("GET"))
        .and(path(posts_route.as_str()))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [post(2, 11, 0, 1)],
            "next_page": null,
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(posts_route.as_str()))
        .and(query_param("sort_by", "created_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [post(1, 10, 1, 0)],
            "next_page": format!("{}{}?page=2&sort_by=created_at", server.uri(), posts_route),
        })))
        .mount(&server)
        .await;

    if comments_fail {
        Mock::given(method("GET"))
            .and(path("/api/v2/community/posts/1/comments.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
    } else {
        mount_json(
            &server,
            "/api/v2/community/posts/1/comments.json",
            json!({
                "comments": [{ "id": 5, "body": "Use <i>settings</i>", "author_id": 10 }],
                "next_page": null,
            }),
        )
        .await;
    }
    mount_json(
        &server,
        "/api/v2/community/posts/2/votes.json",
        json!({ "votes": [{ "id": 7, "user_id": 99, "value": 1 }], "next_page": null }),
    )
    .await;
    mount_json(
        &server,
        "/api/v2/users/show_many.json",
        json!({ "users": [user(10), user(11)], "next_page": null }),
    )
    .await;

    server
}

async fn canny() -> MockServer {
    let server = MockServer::start().await;
    for id in [1, 2] {
        Mock::given(method("POST"))
            .and(path("/api/v1/posts/create"))
            .and(body_partial_json(json!({ "title": format!("Post {}", id), "boardID": BOARD })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": format!("cp-{}", id) })))
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/api/v1/comments/create"))
        .and(body_partial_json(json!({ "postID": "cp-1", "value": "Use settings" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cc-5" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/users/find_or_create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cu-1" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/votes/create"))
        .respond_with(ResponseTemplate::new(200).set_body_string("success"))
        .expect(0)
        .mount(&server)
        .await;
    server
}

fn config(zendesk: &MockServer, canny: &MockServer, state_file: &Path) -> MigrationConfig {
    MigrationConfig {
        source: SourceConfig {
            url: zendesk.uri(),
            username: "admin@example.com".to_string(),
            password: "secret".to_string(),
        },
        destination: DestinationConfig {
            url: canny.uri(),
            api_key: "canny-key".to_string(),
        },
        topics: [(TOPIC.to_string(), BOARD.to_string())].into_iter().collect(),
        options: MigrationOptions {
            parallelism: 4,
            state_file: state_file.to_path_buf(),
            ..MigrationOptions::default()
        },
    }
}

async fn canny_requests(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

#[tokio::test]
async fn test_topic_migration_scenario() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state.json");
    let zendesk = zendesk(false).await;
    let canny = canny().await;

    let stats = Pipeline::new(config(&zendesk, &canny, &state))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(stats.posts_created, 2);
    assert_eq!(stats.comments_created, 1);
    assert_eq!(stats.votes_created, 0);
    assert_eq!(stats.topics_failed, 0);

    let ledger = MigrationLedger::load(&state).unwrap();
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.get(TOPIC, RecordKind::Post, 1), Some("cp-1"));
    assert_eq!(ledger.get(TOPIC, RecordKind::Post, 2), Some("cp-2"));
    assert_eq!(ledger.get(TOPIC, RecordKind::Comment, 5), Some("cc-5"));
    assert_eq!(ledger.get(TOPIC, RecordKind::Vote, 7), None);
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state.json");
    let zendesk = zendesk(false).await;

    let first_canny = canny().await;
    Pipeline::new(config(&zendesk, &first_canny, &state))
        .unwrap()
        .run()
        .await
        .unwrap();
    let after_first = MigrationLedger::load(&state).unwrap();

    let second_canny = MockServer::start().await;
    let stats = Pipeline::new(config(&zendesk, &second_canny, &state))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(stats.created(), 0);
    assert_eq!(stats.already_migrated, 3);
    assert_eq!(canny_requests(&second_canny).await, 0);
    assert_eq!(MigrationLedger::load(&state).unwrap(), after_first);
}

#[tokio::test]
async fn test_failed_comment_fetch_leaves_post_unmigrated() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state.json");
    let zendesk = zendesk(true).await;
    let canny = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/posts/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cp-2" })))
        .expect(1)
        .mount(&canny)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/users/find_or_create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cu-1" })))
        .mount(&canny)
        .await;

    let stats = Pipeline::new(config(&zendesk, &canny, &state))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(stats.enrichment_errors, 1);
    assert_eq!(stats.posts_migrated, 1);
    let ledger = MigrationLedger::load(&state).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get(TOPIC, RecordKind::Post, 1), None);
    assert_eq!(ledger.get(TOPIC, RecordKind::Post, 2), Some("cp-2"));
}

#[tokio::test]
async fn test_dry_run_sends_nothing_to_canny() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state.json");
    let zendesk = zendesk(false).await;
    let canny = MockServer::start().await;
    let mut config = config(&zendesk, &canny, &state);
    config.options.dry_run = true;

    let stats = Pipeline::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.posts_created, 2);
    assert_eq!(stats.comments_created, 1);
    assert_eq!(canny_requests(&canny).await, 0);
    assert!(!state.exists());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let zendesk = MockServer::start().await;
    let canny = MockServer::start().await;
    let mut config = config(&zendesk, &canny, Path::new("state.json"));
    config.topics.clear();

    assert!(Pipeline::new(config).is_err());
}
