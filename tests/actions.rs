//! Page actions against the mock endpoint.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cdp_bridge::Error;
use common::{MockEndpoint, Reply, default_reply};
use serde_json::{Value, json};

fn evaluated(value: Value) -> Reply {
    Reply::Result(json!({"result": {"type": "object", "value": value}}))
}

fn expression(params: &Value) -> &str {
    params
        .get("expression")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

async fn connected_mock() -> (MockEndpoint, cdp_bridge::Client) {
    let mock = MockEndpoint::start().await;
    let client = mock
        .client_builder()
        .enable_domains(["Page"])
        .build()
        .expect("client");
    client.connect(None).await.expect("connect");
    (mock, client)
}

#[tokio::test]
async fn test_goto_sends_navigate() -> anyhow::Result<()> {
    let (mock, client) = connected_mock().await;

    client.page().goto("https://example.org/").await?;

    let navigations = mock.requests_for("Page.navigate");
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].params, json!({"url": "https://example.org/"}));
    Ok(())
}

#[tokio::test]
async fn test_goto_reports_navigation_error() {
    let (mock, client) = connected_mock().await;
    mock.respond_with(|method, params| match method {
        "Page.navigate" => Reply::Result(json!({
            "frameId": "F1",
            "errorText": "net::ERR_NAME_NOT_RESOLVED"
        })),
        _ => default_reply(method, params),
    });

    let err = client
        .page()
        .goto("https://nowhere.invalid/")
        .await
        .expect_err("navigation error");
    assert_eq!(err.kind(), "ProtocolError");
    assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));

    let err = client.page().goto("  ").await.expect_err("empty url");
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[tokio::test]
async fn test_reload_passes_ignore_cache() {
    let (mock, client) = connected_mock().await;

    client.page().reload(true).await.expect("reload");

    let reloads = mock.requests_for("Page.reload");
    assert_eq!(reloads.len(), 1);
    assert_eq!(reloads[0].params, json!({"ignoreCache": true}));
}

#[tokio::test]
async fn test_title_url_and_html() -> anyhow::Result<()> {
    let (mock, client) = connected_mock().await;
    mock.respond_with(|method, params| match method {
        "Runtime.evaluate" if expression(params).contains("outerHTML") => {
            evaluated(json!("<html><body>hi</body></html>"))
        }
        "Runtime.evaluate" => evaluated(json!("Example Domain")),
        _ => default_reply(method, params),
    });
    let page = client.page();

    assert_eq!(page.title().await?, "Example Domain");
    assert_eq!(page.url().await?, "https://example.com/");
    assert_eq!(page.html().await?, "<html><body>hi</body></html>");
    Ok(())
}

#[tokio::test]
async fn test_click_dispatches_press_and_release() {
    let (mock, client) = connected_mock().await;
    mock.respond_with(|method, params| match method {
        "Runtime.evaluate" => evaluated(json!({"x": 50.5, "y": 20})),
        _ => default_reply(method, params),
    });

    client.page().click("#submit").await.expect("click");

    let events = mock.requests_for("Input.dispatchMouseEvent");
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].params,
        json!({"type": "mousePressed", "x": 50.5, "y": 20.0, "button": "left", "clickCount": 1})
    );
    assert_eq!(events[1].params["type"], "mouseReleased");
    assert!(events[0].id < events[1].id);

    let script = mock.requests_for("Runtime.evaluate");
    assert!(expression(&script[0].params).contains(r##"document.querySelector("#submit")"##));
}

#[tokio::test]
async fn test_click_missing_element() {
    let (mock, client) = connected_mock().await;
    mock.respond_with(|method, params| match method {
        "Runtime.evaluate" => Reply::Result(json!({"result": {"type": "object", "subtype": "null", "value": null}})),
        _ => default_reply(method, params),
    });

    let err = client
        .page()
        .click("#missing")
        .await
        .expect_err("not found");
    assert!(
        matches!(&err, Error::ElementNotFound { selector } if selector == "#missing"),
        "got {err:?}"
    );
    assert!(mock.requests_for("Input.dispatchMouseEvent").is_empty());
}

#[tokio::test]
async fn test_type_text_escapes_values() {
    let (mock, client) = connected_mock().await;
    mock.respond_with(|method, params| match method {
        "Runtime.evaluate" if expression(params).contains("#absent") => evaluated(json!(false)),
        "Runtime.evaluate" => evaluated(json!(true)),
        _ => default_reply(method, params),
    });
    let page = client.page();

    page.type_text("input[name=\"q\"]", "it's \"quoted\"\n")
        .await
        .expect("type");

    let script = mock.requests_for("Runtime.evaluate");
    let code = expression(&script[0].params);
    assert!(code.contains(r#"document.querySelector("input[name=\"q\"]")"#));
    assert!(code.contains(r#"el.value = "it's \"quoted\"\n";"#));

    let err = page
        .type_text("#absent", "x")
        .await
        .expect_err("not found");
    assert_eq!(err.kind(), "ElementNotFoundError");

    let err = page.type_text("", "x").await.expect_err("empty selector");
    assert_eq!(err.kind(), "InvalidArgumentError");
}

#[tokio::test]
async fn test_text_reads_text_content() {
    let (mock, client) = connected_mock().await;
    mock.respond_with(|method, params| match method {
        "Runtime.evaluate" if expression(params).contains("#gone") => evaluated(Value::Null),
        "Runtime.evaluate" => evaluated(json!("Hello")),
        _ => default_reply(method, params),
    });
    let page = client.page();

    assert_eq!(page.text("h1").await.expect("text"), "Hello");
    let err = page.text("#gone").await.expect_err("not found");
    assert_eq!(err.kind(), "ElementNotFoundError");
}

#[tokio::test]
async fn test_evaluate_returns_value_or_exception() {
    let (mock, client) = connected_mock().await;
    mock.respond_with(|method, params| match method {
        "Runtime.evaluate" if expression(params).contains("throw") => Reply::Result(json!({
            "result": {"type": "object", "subtype": "error"},
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": {"description": "Error: boom"}
            }
        })),
        "Runtime.evaluate" if expression(params).contains("undefined") => {
            Reply::Result(json!({"result": {"type": "undefined"}}))
        }
        "Runtime.evaluate" => evaluated(json!({"a": [1, 2]})),
        _ => default_reply(method, params),
    });
    let page = client.page();

    assert_eq!(
        page.evaluate("({a: [1, 2]})").await.expect("value"),
        json!({"a": [1, 2]})
    );
    assert_eq!(page.evaluate("undefined").await.expect("null"), Value::Null);

    let err = page
        .evaluate("(() => { throw new Error('boom') })()")
        .await
        .expect_err("exception");
    assert_eq!(err.kind(), "ProtocolError");
    assert!(err.to_string().contains("Error: boom"));

    let sent = mock.requests_for("Runtime.evaluate");
    assert_eq!(sent[0].params["returnByValue"], true);
    assert_eq!(sent[0].params["awaitPromise"], true);
}

#[tokio::test]
async fn test_screenshot_png_decodes_payload() {
    let (mock, client) = connected_mock().await;
    let page = client.page();

    assert_eq!(page.screenshot().await.expect("base64"), "iVBORw0KGgo=");

    let bytes = page.screenshot_png().await.expect("png");
    assert_eq!(&bytes[..4], b"\x89PNG");

    let shots = mock.requests_for("Page.captureScreenshot");
    assert_eq!(shots[0].params, json!({"format": "png"}));
}

#[tokio::test]
async fn test_wait_for_selector_polls_until_present() -> anyhow::Result<()> {
    let (mock, client) = connected_mock().await;
    let checks = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&checks);
    mock.respond_with(move |method, params| match method {
        "Runtime.evaluate" => {
            let n = seen.fetch_add(1, Ordering::SeqCst);
            evaluated(json!(n >= 2))
        }
        _ => default_reply(method, params),
    });

    client
        .page()
        .wait_for_selector_timeout("#late", Duration::from_secs(5))
        .await?;

    assert_eq!(checks.load(Ordering::SeqCst), 3);
    let script = mock.requests_for("Runtime.evaluate");
    assert!(expression(&script[0].params).contains(r##"document.querySelector("#late")"##));
    Ok(())
}

#[tokio::test]
async fn test_wait_for_selector_gives_up_at_deadline() {
    let (mock, client) = connected_mock().await;
    mock.respond_with(|method, params| match method {
        "Runtime.evaluate" => evaluated(json!(false)),
        _ => default_reply(method, params),
    });
    let page = client.page();

    let started = tokio::time::Instant::now();
    let err = page
        .wait_for_selector_timeout("#never", Duration::from_millis(300))
        .await
        .expect_err("not found");
    assert!(
        matches!(&err, Error::ElementNotFound { selector } if selector == "#never"),
        "got {err:?}"
    );
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(mock.requests_for("Runtime.evaluate").len() >= 2);

    let err = page.wait_for_selector("").await.expect_err("empty selector");
    assert_eq!(err.kind(), "InvalidArgumentError");
}
