//! HTTP control API end to end: mock endpoint, bridge server, reqwest.

mod common;

use cdp_bridge::{Client, control};
use common::{MockEndpoint, MockTarget, Reply, default_reply};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Bridge {
    base: String,
    http: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Bridge {
    async fn start(client: Client) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (tx, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            control::serve(listener, client, async {
                let _ = rx.await;
            })
            .await
            .expect("serve");
        });

        Self {
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            shutdown: Some(tx),
            task,
        }
    }

    async fn post(&self, body: Value) -> Value {
        self.post_raw(body.to_string()).await
    }

    async fn post_raw(&self, body: String) -> Value {
        let response = self
            .http
            .post(&self.base)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("post");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("json reply")
    }

    async fn get(&self, path: &str) -> Value {
        self.http
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .expect("get")
            .json()
            .await
            .expect("json reply")
    }

    async fn stop(self) {
        let Self {
            http,
            shutdown,
            task,
            ..
        } = self;
        drop(http);
        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), task).await;
    }
}

async fn setup(targets: Vec<MockTarget>) -> (MockEndpoint, Client, Bridge) {
    let mock = MockEndpoint::start_with(targets).await;
    let client = mock.client_builder().build().expect("client");
    let bridge = Bridge::start(client.clone()).await;
    (mock, client, bridge)
}

#[tokio::test]
async fn test_action_names_are_case_insensitive() {
    let (_mock, _client, bridge) =
        setup(vec![MockTarget::page("T1", "https://example.com/")]).await;

    let reply = bridge.post(json!({"action": "TITLE"})).await;
    assert_eq!(reply, json!({"success": true, "title": "Mock Title"}));

    bridge.stop().await;
}

#[tokio::test]
async fn test_bad_requests_are_reported_in_body() {
    let (_mock, _client, bridge) =
        setup(vec![MockTarget::page("T1", "https://example.com/")]).await;

    let reply = bridge.post(json!({"action": "fly"})).await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["kind"], "InvalidArgumentError");
    assert!(reply["error"].as_str().unwrap_or_default().contains("fly"));

    let reply = bridge.post_raw("{not json".to_string()).await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["kind"], "InvalidArgumentError");

    let reply = bridge.post(json!({"action": "click"})).await;
    assert_eq!(reply["kind"], "InvalidArgumentError");

    bridge.stop().await;
}

#[tokio::test]
async fn test_goto_then_url() {
    let (mock, _client, bridge) =
        setup(vec![MockTarget::page("T1", "https://example.com/")]).await;

    let reply = bridge
        .post(json!({"action": "goto", "url": "https://example.com/"}))
        .await;
    assert_eq!(reply, json!({"success": true, "url": "https://example.com/"}));

    let reply = bridge.post(json!({"action": "url"})).await;
    assert_eq!(reply["url"], "https://example.com/");
    assert_eq!(mock.requests_for("Page.navigate").len(), 1);

    bridge.stop().await;
}

#[tokio::test]
async fn test_click_not_found_reply() {
    let (mock, _client, bridge) =
        setup(vec![MockTarget::page("T1", "https://example.com/")]).await;
    mock.respond_with(|method, params| match method {
        "Runtime.evaluate" => Reply::Result(json!({"result": {"type": "object", "value": null}})),
        _ => default_reply(method, params),
    });

    let reply = bridge
        .post(json!({"action": "click", "selector": "#nope"}))
        .await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["kind"], "ElementNotFoundError");
    assert!(reply["error"].as_str().unwrap_or_default().contains("#nope"));

    bridge.stop().await;
}

#[tokio::test]
async fn test_wait_for_selector_and_evaluate_async() {
    let (mock, _client, bridge) =
        setup(vec![MockTarget::page("T1", "https://example.com/")]).await;
    mock.respond_with(|method, params| {
        let code = params["expression"].as_str().unwrap_or_default();
        match method {
            "Runtime.evaluate" if code.contains("#ready") => {
                Reply::Result(json!({"result": {"type": "boolean", "value": true}}))
            }
            "Runtime.evaluate" if code.contains("querySelector") => {
                Reply::Result(json!({"result": {"type": "boolean", "value": false}}))
            }
            "Runtime.evaluate" => Reply::Result(json!({"result": {"type": "number", "value": 2}})),
            _ => default_reply(method, params),
        }
    });

    let reply = bridge
        .post(json!({"action": "waitForSelector", "selector": "#ready"}))
        .await;
    assert_eq!(reply, json!({"success": true}));

    let reply = bridge
        .post(json!({"action": "waitForSelector", "selector": "#absent", "timeout": 200}))
        .await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["kind"], "ElementNotFoundError");

    let reply = bridge
        .post(json!({"action": "evaluateAsync", "code": "Promise.resolve(1 + 1)"}))
        .await;
    assert_eq!(reply, json!({"success": true, "result": 2}));

    bridge.stop().await;
}

#[tokio::test]
async fn test_list_returns_pages_only() {
    let (_mock, client, bridge) = setup(vec![
        MockTarget::page("P1", "https://a.test/"),
        MockTarget::page("SW", "https://a.test/sw.js").with_kind("service_worker"),
        MockTarget::page("P2", "chrome://newtab"),
    ])
    .await;

    let reply = bridge.post(json!({"action": "list"})).await;
    assert_eq!(reply["success"], true);
    let ids: Vec<&str> = reply["tabs"]
        .as_array()
        .expect("tabs")
        .iter()
        .filter_map(|tab| tab["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["P1", "P2"]);

    // Listing does not attach.
    assert!(!client.status().connected);

    bridge.stop().await;
}

#[tokio::test]
async fn test_status_and_health_routes() {
    let (_mock, _client, bridge) =
        setup(vec![MockTarget::page("T1", "https://example.com/")]).await;

    let status = bridge.get("/status").await;
    assert_eq!(status["success"], true);
    assert_eq!(status["connected"], false);
    assert_eq!(status["state"], "disconnected");
    assert_eq!(status["target"], Value::Null);

    let reply = bridge.post(json!({"action": "connect"})).await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["id"], "T1");

    let status = bridge.post(json!({"action": "status"})).await;
    assert_eq!(status["connected"], true);
    assert_eq!(status["reconnectAttempts"], 0);
    assert_eq!(status["target"]["id"], "T1");

    let health = bridge.get("/health").await;
    assert_eq!(health["status"], "ok");

    let reply = bridge.post(json!({"action": "close"})).await;
    assert_eq!(reply, json!({"success": true}));
    let status = bridge.get("/status").await;
    assert_eq!(status["connected"], false);

    bridge.stop().await;
}

#[tokio::test]
async fn test_version_action() {
    let (_mock, _client, bridge) =
        setup(vec![MockTarget::page("T1", "https://example.com/")]).await;

    let reply = bridge.post(json!({"action": "version"})).await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["Browser"], "MockChrome/1.0");
    assert_eq!(reply["Protocol-Version"], "1.3");

    bridge.stop().await;
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let (_mock, _client, bridge) =
        setup(vec![MockTarget::page("T1", "https://example.com/")]).await;

    let response = bridge
        .http
        .get(format!("{}/health", bridge.base))
        .header("origin", "https://app.test")
        .send()
        .await
        .expect("get");
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    bridge.stop().await;
}
