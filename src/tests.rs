//! # Tests Module
//!
//! End-to-end tests for the request executor and the client, run against a
//! local mock HTTP server.
//!
//! ## Test Categories
//!
//! ### Executor
//! - Rate-limit waits that do not consume the retry budget
//! - Re-authentication on 401/403 and on the empty-user body, bounded by the budget,
//!   with concurrent rejections sharing one re-login
//! - Immediate failure on other error statuses, and timeouts
//!
//! ### Client
//! - User timeline, tweet detail and search responses flattened into records
//!
//! ## Test Environment
//!
//! Each test gets its own mock server and temporary cookie directory. Logins are
//! served by a counting fake authenticator whose n-th login yields the CSRF
//! token `csrf-n`.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{Credentials, ScraperConfig};
use crate::error::{Result, ScraperError};
use crate::session::SessionCookie;
use crate::twitter::{Operation, TwitterClient};
use crate::Authenticator;

/// Fake authenticator counting its logins.
struct CountingAuthenticator {
    logins: AtomicUsize,
}

#[async_trait]
impl Authenticator for CountingAuthenticator {
    async fn login(&self, _credentials: &Credentials) -> Result<Vec<SessionCookie>> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(vec![
            SessionCookie::new("auth_token", format!("token-{}", n)),
            SessionCookie::new("ct0", format!("csrf-{}", n)),
        ])
    }
}

/// Authenticator that always fails.
struct FailingAuthenticator;

#[async_trait]
impl Authenticator for FailingAuthenticator {
    async fn login(&self, _credentials: &Credentials) -> Result<Vec<SessionCookie>> {
        Err(ScraperError::Login("challenge required".to_string()))
    }
}

struct Harness {
    server: MockServer,
    client: TwitterClient,
    authenticator: Arc<CountingAuthenticator>,
    _cookies_dir: tempfile::TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(configure: impl FnOnce(&mut ScraperConfig)) -> Self {
        let server = MockServer::start().await;
        let cookies_dir = tempfile::tempdir().unwrap();
        let authenticator = Arc::new(CountingAuthenticator {
            logins: AtomicUsize::new(0),
        });
        let mut config = test_config(&server, &cookies_dir);
        configure(&mut config);
        let client = TwitterClient::new(config, authenticator.clone()).unwrap();
        Harness {
            server,
            client,
            authenticator,
            _cookies_dir: cookies_dir,
        }
    }

    fn logins(&self) -> usize {
        self.authenticator.logins.load(Ordering::SeqCst)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    async fn execute(&self, path: &str, retries: u32) -> Result<Value> {
        self.client
            .executor()
            .execute(Method::GET, &self.url(path), &[], retries)
            .await
    }

    async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}

fn test_config(server: &MockServer, cookies_dir: &tempfile::TempDir) -> ScraperConfig {
    ScraperConfig {
        username: Some("alice".to_string()),
        password: Some("secret-password".to_string()),
        cookies_path: cookies_dir.path().join("cookies.json"),
        base_url: server.uri(),
        request_timeout_secs: 10,
        ..ScraperConfig::default()
    }
}

fn tweet_node(rest_id: &str, author_id: &str) -> Value {
    json!({
        "__typename": "Tweet",
        "rest_id": rest_id,
        "core": { "user_results": { "result": {
            "__typename": "User",
            "rest_id": author_id,
            "legacy": { "screen_name": format!("user{}", author_id), "name": "Someone" }
        }}},
        "legacy": {
            "full_text": format!("text of {}", rest_id),
            "user_id_str": author_id,
            "created_at": "Wed Oct 10 20:19:24 +0000 2018"
        }
    })
}

fn tweet_entry(rest_id: &str, node: Value) -> Value {
    json!({
        "entryId": format!("tweet-{}", rest_id),
        "sortIndex": rest_id,
        "content": {
            "entryType": "TimelineTimelineItem",
            "itemContent": { "itemType": "TimelineTweet", "tweet_results": { "result": node } }
        }
    })
}

fn cursor_entry(value: &str) -> Value {
    json!({
        "entryId": format!("cursor-bottom-{}", value),
        "content": { "entryType": "TimelineTimelineCursor", "cursorType": "Bottom", "value": value }
    })
}

/// Tests that a nearly exhausted rate limit makes the executor wait for the
/// reset and re-fetch, without spending the retry budget or logging in again.
#[tokio::test]
async fn test_rate_limit_waits_for_reset() {
    let harness = Harness::new().await;
    let reset = chrono::Utc::now().timestamp() + 3;

    Mock::given(method("GET"))
        .and(path("/graphql/limited"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-rate-limit-remaining", "1")
                .insert_header("x-rate-limit-reset", reset.to_string().as_str())
                .set_body_json(json!({ "data": "stale" })),
        )
        .up_to_n_times(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graphql/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "fresh" })))
        .mount(&harness.server)
        .await;

    let started = Instant::now();
    // no retry budget at all: the wait must not need one
    let body = harness.execute("/graphql/limited", 0).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(body, json!({ "data": "fresh" }));
    assert_eq!(harness.request_count().await, 2);
    assert_eq!(harness.logins(), 1);
}

/// Tests that a rate-limit wait longer than the per-request timeout still ends
/// in the re-fetched body when no call timeout is configured.
#[tokio::test]
async fn test_rate_limit_wait_outlasts_request_timeout() {
    let harness = Harness::with_config(|config| config.request_timeout_secs = 1).await;
    let reset = chrono::Utc::now().timestamp() + 2;

    Mock::given(method("GET"))
        .and(path("/graphql/limited"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-rate-limit-remaining", "0")
                .insert_header("x-rate-limit-reset", reset.to_string().as_str())
                .set_body_json(json!({ "data": "stale" })),
        )
        .up_to_n_times(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/graphql/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "fresh" })))
        .mount(&harness.server)
        .await;

    let started = Instant::now();
    let body = harness.execute("/graphql/limited", 1).await.unwrap();

    assert!(started.elapsed() > Duration::from_secs(1));
    assert_eq!(body, json!({ "data": "fresh" }));
    assert_eq!(harness.request_count().await, 2);
}

/// Tests that a configured call timeout bounds the rate-limit wait.
#[tokio::test]
async fn test_call_timeout_bounds_rate_limit_wait() {
    let harness = Harness::with_config(|config| config.call_timeout_secs = Some(1)).await;
    let reset = chrono::Utc::now().timestamp() + 30;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-rate-limit-remaining", "0")
                .insert_header("x-rate-limit-reset", reset.to_string().as_str())
                .set_body_json(json!({})),
        )
        .mount(&harness.server)
        .await;

    let result = harness.execute("/graphql/limited", 1).await;
    match result {
        Err(ScraperError::Timeout(limit)) => assert_eq!(limit, Duration::from_secs(1)),
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert_eq!(harness.request_count().await, 1);
}

/// Tests that two in-flight calls rejected on the same session share a single
/// re-login.
#[tokio::test]
async fn test_concurrent_rejections_share_one_relogin() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .and(header("x-csrf-token", "csrf-1"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string("forbidden")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(header("x-csrf-token", "csrf-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "ok": true } })))
        .mount(&harness.server)
        .await;

    let (first, second) = tokio::join!(
        harness.execute("/graphql/first", 1),
        harness.execute("/graphql/second", 1)
    );

    assert_eq!(first.unwrap()["data"]["ok"], true);
    assert_eq!(second.unwrap()["data"]["ok"], true);
    // the initial login plus exactly one re-login
    assert_eq!(harness.logins(), 2);
    assert_eq!(harness.request_count().await, 4);
}

/// Tests that a 403 triggers exactly one re-login, and the retried request
/// carries the new session's CSRF token.
#[tokio::test]
async fn test_forbidden_triggers_relogin_and_retry() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .and(header("x-csrf-token", "csrf-1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(header("x-csrf-token", "csrf-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "ok": true } })))
        .mount(&harness.server)
        .await;

    let body = harness.execute("/graphql/thing", 1).await.unwrap();
    assert_eq!(body["data"]["ok"], true);
    assert_eq!(harness.logins(), 2);
    assert_eq!(harness.request_count().await, 2);
}

/// Tests that two consecutive 403s with a budget of one surface the error
/// instead of looping.
#[tokio::test]
async fn test_repeated_forbidden_exhausts_retries() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("{\"errors\":[{\"code\":353}]}"))
        .mount(&harness.server)
        .await;

    let result = harness.execute("/graphql/thing", 1).await;
    match result {
        Err(ScraperError::AuthExhausted { status, body }) => {
            assert_eq!(status, 403);
            assert!(body.contains("353"));
        }
        other => panic!("expected AuthExhausted, got {:?}", other),
    }
    assert_eq!(harness.logins(), 2);
    assert_eq!(harness.request_count().await, 2);
}

/// Tests that a 401 is handled like a 403.
#[tokio::test]
async fn test_unauthorized_without_budget_fails_immediately() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&harness.server)
        .await;

    let result = harness.execute("/graphql/thing", 0).await;
    assert_eq!(result.unwrap_err().status(), Some(401));
    assert_eq!(harness.logins(), 1);
    assert_eq!(harness.request_count().await, 1);
}

/// Tests that the empty-user body on a 200 is treated as an auth failure.
#[tokio::test]
async fn test_soft_auth_failure_triggers_relogin() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .and(header("x-csrf-token", "csrf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "user": {} } })))
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(header("x-csrf-token", "csrf-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "user": { "result": { "rest_id": "9" } } } })),
        )
        .mount(&harness.server)
        .await;

    let body = harness.execute("/graphql/thing", 1).await.unwrap();
    assert_eq!(body["data"]["user"]["result"]["rest_id"], "9");
    assert_eq!(harness.logins(), 2);
}

/// Tests that a persistent empty-user body exhausts the budget with status 200.
#[tokio::test]
async fn test_soft_auth_failure_exhausts_retries() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "user": {} } })))
        .mount(&harness.server)
        .await;

    let result = harness.execute("/graphql/thing", 1).await;
    assert!(matches!(
        result,
        Err(ScraperError::AuthExhausted { status: 200, .. })
    ));
    assert_eq!(harness.logins(), 2);
}

/// Tests that other error statuses are surfaced without retry or re-login.
#[tokio::test]
async fn test_server_error_is_not_retried() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream\nexploded"))
        .mount(&harness.server)
        .await;

    match harness.execute("/graphql/thing", 3).await {
        Err(ScraperError::Http { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected Http error, got {:?}", other),
    }
    assert_eq!(harness.logins(), 1);
    assert_eq!(harness.request_count().await, 1);
}

/// Tests that a non-JSON success body is a parse error.
#[tokio::test]
async fn test_non_json_body_is_parse_error() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&harness.server)
        .await;

    let result = harness.execute("/graphql/thing", 1).await;
    assert!(matches!(result, Err(ScraperError::Parse(_))));
}

/// Tests that the caller-supplied timeout bounds the whole call.
#[tokio::test]
async fn test_timeout_bounds_execute() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&harness.server)
        .await;

    let result = harness
        .client
        .executor()
        .execute_with_timeout(
            Method::GET,
            &harness.url("/graphql/slow"),
            &[],
            1,
            Duration::from_millis(200),
        )
        .await;
    assert!(matches!(result, Err(ScraperError::Timeout(_))));
}

/// Tests that without cookies and credentials no request is attempted.
#[tokio::test]
async fn test_missing_credentials_fail_before_request() {
    let server = MockServer::start().await;
    let cookies_dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig {
        username: None,
        password: None,
        ..test_config(&server, &cookies_dir)
    };
    let client = TwitterClient::new(config, Arc::new(FailingAuthenticator)).unwrap();

    let result = client.search("rust", 20, None).await;
    assert!(matches!(result, Err(ScraperError::Configuration(_))));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

/// Tests that a failing authenticator surfaces a login error.
#[tokio::test]
async fn test_login_error_is_propagated() {
    let server = MockServer::start().await;
    let cookies_dir = tempfile::tempdir().unwrap();
    let client = TwitterClient::new(
        test_config(&server, &cookies_dir),
        Arc::new(FailingAuthenticator),
    )
    .unwrap();

    let result = client.fetch_tweet_detail("1").await;
    assert!(matches!(result, Err(ScraperError::Login(_))));
}

/// Tests the user timeline: parameters sent, author filter, retweet dual
/// representation and the next-page cursor.
#[tokio::test]
async fn test_fetch_user_timeline_page() {
    let harness = Harness::new().await;

    let mut retweet = tweet_node("100", "9");
    retweet["legacy"]["retweeted_status_result"] = json!({ "result": tweet_node("555", "5") });
    let response = json!({ "data": { "user": { "result": { "timeline_v2": { "timeline": {
        "instructions": [
            { "type": "TimelineClearCache" },
            { "type": "TimelineAddEntries", "entries": [
                tweet_entry("123", tweet_node("123", "9")),
                tweet_entry("100", retweet),
                { "entryId": "who-to-follow-1", "content": {} },
                cursor_entry("NEXT")
            ]}
        ]
    }}}}}});

    Mock::given(method("GET"))
        .and(path(Operation::UserTweets.path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&harness.server)
        .await;

    let page = harness
        .client
        .fetch_user_timeline_page("9", 20, Some("PREV"))
        .await
        .unwrap();

    let ids: Vec<_> = page.tweets.iter().filter_map(|t| t.id()).collect();
    // the standalone retweet by author 5 is filtered out
    assert_eq!(ids, vec!["123", "100"]);
    assert_eq!(page.tweets[0].user().unwrap()["screen_name"], "user9");
    assert_eq!(page.tweets[1].retweeted_status().unwrap()["id_str"], "555");
    assert_eq!(page.next_cursor.as_deref(), Some("NEXT"));

    let requests = harness.server.received_requests().await.unwrap();
    let query: std::collections::HashMap<String, String> =
        requests[0].url.query_pairs().into_owned().collect();
    let variables: Value = serde_json::from_str(&query["variables"]).unwrap();
    assert_eq!(variables["userId"], "9");
    assert_eq!(variables["count"], 20);
    assert_eq!(variables["cursor"], "PREV");
    let features: Value = serde_json::from_str(&query["features"]).unwrap();
    assert_eq!(features, Operation::UserTweets.features());
}

/// Tests the tweet detail: conversation threads are flattened in order and
/// module additions are ignored.
#[tokio::test]
async fn test_fetch_tweet_detail_flattens_conversation() {
    let harness = Harness::new().await;

    let response = json!({ "data": { "threaded_conversation_with_injections_v2": { "instructions": [
        { "type": "TimelineAddEntries", "entries": [
            tweet_entry("1", tweet_node("1", "1")),
            { "entryId": "conversationthread-2", "content": { "items": [
                { "entryId": "conversationthread-2-tweet-2", "item": { "itemContent": {
                    "tweet_results": { "result": {
                        "__typename": "TweetWithVisibilityResults", "tweet": tweet_node("2", "2") } } } } },
                { "entryId": "conversationthread-2-tweet-3", "item": { "itemContent": {
                    "tweet_results": { "result": tweet_node("3", "1") } } } }
            ]}}
        ]},
        { "type": "TimelineAddToModule", "moduleItems": [
            tweet_entry("4", tweet_node("4", "4"))
        ]},
        { "type": "TimelineTerminateTimeline", "direction": "Top" }
    ]}}});

    Mock::given(method("GET"))
        .and(path(Operation::TweetDetail.path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(&harness.server)
        .await;

    let tweets = harness.client.fetch_tweet_detail("1").await.unwrap();
    let ids: Vec<_> = tweets.iter().filter_map(|t| t.id()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

/// Tests search results, including module additions, and that an unexpected
/// response shape yields no records rather than an error.
#[tokio::test]
async fn test_search_and_schema_drift() {
    let harness = Harness::new().await;

    let mut quoting = tweet_node("20", "2");
    quoting["quoted_status_result"] = json!({ "result": tweet_node("30", "3") });
    let response = json!({ "data": { "search_by_raw_query": { "search_timeline": { "timeline": {
        "instructions": [
            { "type": "TimelineAddEntries", "entries": [ tweet_entry("10", tweet_node("10", "1")) ] },
            { "type": "TimelineAddToModule", "moduleItems": [ tweet_entry("20", quoting) ] }
        ]
    }}}}});

    Mock::given(method("GET"))
        .and(path(Operation::SearchTimeline.path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .up_to_n_times(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path(Operation::SearchTimeline.path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "search_by_raw_query": { "renamed": [] } } })),
        )
        .mount(&harness.server)
        .await;

    let tweets = harness.client.search("rust", 20, None).await.unwrap();
    let ids: Vec<_> = tweets.iter().filter_map(|t| t.id()).collect();
    assert_eq!(ids, vec!["10", "20"]);
    assert_eq!(tweets[1].quoted_status().unwrap()["user"]["screen_name"], "user3");

    let drifted = harness.client.search_page("rust", 20, None).await.unwrap();
    assert!(drifted.tweets.is_empty());
    assert!(drifted.next_cursor.is_none());
}

/// Tests user lookup by screen name.
#[tokio::test]
async fn test_get_user_by_screen_name() {
    let harness = Harness::new().await;

    Mock::given(method("GET"))
        .and(path(Operation::UserByScreenName.path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "user": { "result": {
            "__typename": "User", "rest_id": "9", "legacy": { "screen_name": "someone" }
        }}}})))
        .mount(&harness.server)
        .await;

    let user = harness
        .client
        .get_user_by_screen_name("someone")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user["rest_id"], "9");
}

/// Tests that a session persisted by one client is reused by the next one.
#[tokio::test]
async fn test_persisted_session_is_reused() {
    let server = MockServer::start().await;
    let cookies_dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(header("x-csrf-token", "csrf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let first_auth = Arc::new(CountingAuthenticator {
        logins: AtomicUsize::new(0),
    });
    let first = TwitterClient::new(test_config(&server, &cookies_dir), first_auth.clone()).unwrap();
    first
        .executor()
        .execute(Method::GET, &format!("{}/graphql/a", server.uri()), &[], 0)
        .await
        .unwrap();

    let second_auth = Arc::new(CountingAuthenticator {
        logins: AtomicUsize::new(0),
    });
    let second =
        TwitterClient::new(test_config(&server, &cookies_dir), second_auth.clone()).unwrap();
    second
        .executor()
        .execute(Method::GET, &format!("{}/graphql/b", server.uri()), &[], 0)
        .await
        .unwrap();

    assert_eq!(first_auth.logins.load(Ordering::SeqCst), 1);
    assert_eq!(second_auth.logins.load(Ordering::SeqCst), 0);
}
