use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use haulboard_api::AppConfig;
use haulboard_api::app::services::AppServices;
use haulboard_core::SystemClock;
use haulboard_infra::tasks::{EXPORT_POSTS, JobFailure, TaskCatalog, job_fn};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = haulboard_api::app::build_app(AppConfig::default()).await;
        Self::serve(app).await
    }

    async fn spawn_with(services: AppServices) -> Self {
        Self::serve(haulboard_api::app::router(Arc::new(services))).await
    }

    async fn serve(app: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, username: &str) -> String {
        let res = self
            .client
            .post(self.url("/users"))
            .json(&json!({ "username": username }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    async fn get(&self, user: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .header("x-user-id", user)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, user: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .header("x-user-id", user)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    /// Poll until the named task is no longer active.
    async fn wait_for_task(&self, user: &str, name: &str) {
        for _ in 0..200 {
            let (status, _) = self.get(user, &format!("/tasks/{name}")).await;
            if status == StatusCode::NOT_FOUND {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task '{name}' did not finish in time");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn bodies(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["body"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn identity_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = srv.get(&haulboard_core::UserId::new().to_string(), "/whoami").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let alice = srv.register("alice").await;
    let (status, body) = srv.get(&alice, "/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn timeline_merges_followed_users_newest_first() {
    let srv = TestServer::spawn().await;
    let alice = srv.register("alice").await;
    let bob = srv.register("bob").await;
    let carol = srv.register("carol").await;

    for (user, body) in [(&bob, "from bob"), (&carol, "from carol"), (&alice, "from alice")] {
        let (status, _) = srv.post(user, "/index", json!({ "body": body })).await;
        assert_eq!(status, StatusCode::CREATED);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (status, _) = srv.post(&alice, "/follow/bob", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, page) = srv.get(&alice, "/index").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bodies(&page), vec!["from alice", "from bob"]);
    assert_eq!(page["has_next"], false);
    assert_eq!(page["items"][0]["author"], "alice");

    let (_, explore) = srv.get(&alice, "/explore").await;
    assert_eq!(bodies(&explore), vec!["from alice", "from carol", "from bob"]);

    let (status, body) = srv.post(&alice, "/follow/alice", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "cannot_follow_self");

    let (status, _) = srv.post(&alice, "/follow/nobody", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, profile) = srv.get(&alice, "/user/bob").await;
    assert_eq!(profile["is_following"], true);
    assert_eq!(profile["followers"], 1);
    assert_eq!(bodies(&profile["posts"]), vec!["from bob"]);

    let (status, body) = srv.post(&alice, "/unfollow/bob", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
    let (_, page) = srv.get(&alice, "/index").await;
    assert_eq!(bodies(&page), vec!["from alice"]);

    let (_, hits) = srv.get(&alice, "/search?q=FROM%20carol").await;
    assert_eq!(bodies(&hits), vec!["from carol"]);
}

#[tokio::test]
async fn export_runs_in_background_and_reports_through_notifications() {
    let srv = TestServer::spawn().await;
    let alice = srv.register("alice").await;
    for body in ["first", "second"] {
        srv.post(&alice, "/index", json!({ "body": body })).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (status, task) = srv.post(&alice, "/export_posts", json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(task["name"], EXPORT_POSTS);
    assert_eq!(task["complete"], false);

    srv.wait_for_task(&alice, EXPORT_POSTS).await;

    let (status, notes) = srv.get(&alice, "/notifications").await;
    assert_eq!(status, StatusCode::OK);
    let notes = notes.as_array().unwrap();
    let done = notes.iter().find(|n| n["name"] == "task_complete").unwrap();
    assert_eq!(done["payload"]["status"], "succeeded");
    assert_eq!(done["data"], done["payload"]);
    assert_eq!(done["data"]["result"]["post_count"], 2);
    assert_eq!(done["data"]["result"]["posts"][0]["body"], "first");

    let stamps: Vec<f64> = notes.iter().map(|n| n["timestamp"].as_f64().unwrap()).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));

    let last = stamps.last().unwrap();
    let (_, newer) = srv.get(&alice, &format!("/notifications?since={last}")).await;
    assert!(newer.as_array().unwrap().is_empty());

    let (_, history) = srv.get(&alice, "/tasks").await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["complete"], true);
}

#[tokio::test]
async fn second_export_while_running_is_refused() {
    let gate = Arc::new(Semaphore::new(0));
    let job_gate = gate.clone();
    let catalog = TaskCatalog::builder()
        .register(
            EXPORT_POSTS,
            "Exporting posts...",
            job_fn(move |_ctx| {
                let gate = job_gate.clone();
                async move {
                    let _permit = gate
                        .acquire()
                        .await
                        .map_err(|e| JobFailure::error(e.to_string()))?;
                    Ok::<_, JobFailure>(json!({ "post_count": 0 }))
                }
            }),
        )
        .build();
    let services = AppServices::in_memory(AppConfig::default(), SystemClock::shared()).with_catalog(catalog);
    let srv = TestServer::spawn_with(services).await;
    let alice = srv.register("alice").await;
    let bob = srv.register("bob").await;

    let (status, first) = srv.post(&alice, "/export_posts", json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = srv.post(&alice, "/export_posts", json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_running");

    // Another user is unaffected.
    let (status, _) = srv.post(&bob, "/export_posts", json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, active) = srv.get(&alice, "/tasks/export_posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["id"], first["id"]);

    gate.add_permits(2);
    srv.wait_for_task(&alice, EXPORT_POSTS).await;

    let (status, _) = srv.post(&alice, "/export_posts", json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    gate.add_permits(1);
}

#[tokio::test]
async fn unread_count_follows_sends_and_reads() {
    let srv = TestServer::spawn().await;
    let alice = srv.register("alice").await;
    let bob = srv.register("bob").await;

    for body in ["hi bob", "are you there?"] {
        let (status, _) = srv.post(&alice, "/send_message/bob", json!({ "body": body })).await;
        assert_eq!(status, StatusCode::CREATED);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let (status, body) = srv.post(&alice, "/send_message/bob", json!({ "body": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let counts = |notes: &Value| -> Vec<i64> {
        notes
            .as_array()
            .unwrap()
            .iter()
            .filter(|n| n["name"] == "unread_message_count")
            .map(|n| n["payload"].as_i64().unwrap())
            .collect()
    };

    let (_, notes) = srv.get(&bob, "/notifications").await;
    assert_eq!(counts(&notes), vec![1, 2]);

    let (status, inbox) = srv.get(&bob, "/messages").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bodies(&inbox), vec!["are you there?", "hi bob"]);
    assert_eq!(inbox["items"][0]["sender"], "alice");

    let (_, notes) = srv.get(&bob, "/notifications").await;
    assert_eq!(counts(&notes), vec![1, 2, 0]);

    let (_, alice_notes) = srv.get(&alice, "/notifications").await;
    assert!(alice_notes.as_array().unwrap().is_empty());
}
