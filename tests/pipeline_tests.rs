//! End-to-end tests for the security pipeline.

use serde_json::{json, Value};

use ingress_guard::monitor::event::{EventKind, SecurityEvent, Severity};

mod common;

#[tokio::test]
async fn sql_injection_in_body_is_rejected() {
    let (addr, _monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/api/search", addr))
        .json(&json!({"query": "1' OR '1'='1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_INPUT");
    assert_eq!(body["message"], "Invalid input detected");

    shutdown.trigger();
}

#[tokio::test]
async fn excluded_prose_field_passes_through_unmodified() {
    let (addr, _monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();

    // The same payload that gets rejected at body.query is fine at
    // body.content, and reaches the downstream handler byte-identical.
    let res = client
        .post(format!("http://{}/api/posts", addr))
        .json(&json!({"content": "1' OR '1'='1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["received"]["content"], "1' OR '1'='1");

    shutdown.trigger();
}

#[tokio::test]
async fn sanitized_body_reaches_downstream() {
    let (addr, _monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/api/comments", addr))
        .json(&json!({"comment": "<b>hi</b> & more"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["received"]["comment"], "&lt;b&gt;hi&lt;/b&gt; &amp; more");

    shutdown.trigger();
}

#[tokio::test]
async fn script_tag_in_body_is_rejected() {
    let (addr, monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();
    let mut feed = monitor.subscribe();

    let res = client
        .post(format!("http://{}/api/comments", addr))
        .json(&json!({"note": "<script>alert(1)</script>"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);

    let event = feed.try_recv().unwrap();
    assert_eq!(event.kind, EventKind::SuspiciousRequest);

    shutdown.trigger();
}

#[tokio::test]
async fn traversal_in_query_is_rejected() {
    let (addr, _monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();

    let res = client
        .get(format!(
            "http://{}/api/files?file=..%2F..%2Fetc%2Fpasswd",
            addr
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_INPUT");

    shutdown.trigger();
}

#[tokio::test]
async fn repeated_rate_limit_events_mark_ip_suspicious() {
    let (addr, monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();

    let source = "10.0.0.5".parse().unwrap();
    for _ in 0..25 {
        monitor.ingest(
            SecurityEvent::new(
                EventKind::RateLimitExceeded,
                Severity::Medium,
                "Rate limit exceeded",
                source,
            )
            .with_request("GET", "/api/keywords"),
        );
    }

    let res = client
        .get(format!("http://{}/security/check-ip/10.0.0.5", addr))
        .bearer_auth(common::TEST_API_KEY)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ip"], "10.0.0.5");
    assert_eq!(body["suspicious"], true);

    shutdown.trigger();
}

#[tokio::test]
async fn injection_campaign_synthesizes_critical_classification() {
    let (addr, monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();
    let mut feed = monitor.subscribe();

    for _ in 0..3 {
        let res = client
            .post(format!("http://{}/api/search", addr))
            .json(&json!({"q": "1; DROP TABLE users --"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400);
    }

    let mut classified = false;
    while let Ok(event) = feed.try_recv() {
        if event.synthetic
            && event.severity == Severity::Critical
            && event
                .metadata
                .as_ref()
                .and_then(|m| m.get("reason"))
                .and_then(Value::as_str)
                == Some("injection_attack")
        {
            classified = true;
        }
    }
    assert!(classified, "three injection attempts should classify as a campaign");

    shutdown.trigger();
}

#[tokio::test]
async fn rate_limiting_rejects_and_records() {
    let mut config = common::test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 2;

    let (addr, monitor, shutdown) = common::spawn_guard(config).await;
    let client = common::client();

    let mut saw_429 = false;
    for _ in 0..5 {
        let res = client
            .get(format!("http://{}/api/ping", addr))
            .send()
            .await
            .unwrap();
        if res.status() == 429 {
            saw_429 = true;
        }
    }

    assert!(saw_429, "burst of 5 should trip a burst-2 limiter");
    assert!(monitor.stats().total_rate_limit_violations >= 1);

    shutdown.trigger();
}

#[tokio::test]
async fn csp_report_always_answers_204() {
    let (addr, _monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();
    let url = format!("http://{}/security/csp-report", addr);

    // Malformed body.
    let res = client
        .post(&url)
        .body("not json at all {{{")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    // Empty body.
    let res = client.post(&url).send().await.unwrap();
    assert_eq!(res.status(), 204);

    // Well-formed report, including substrings the detectors match.
    let res = client
        .post(&url)
        .json(&json!({
            "csp-report": {
                "blocked-uri": "https://evil.example/<script>.js",
                "violated-directive": "script-src"
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    shutdown.trigger();
}

#[tokio::test]
async fn csp_report_ingests_violation_event() {
    let (addr, monitor, shutdown) = common::spawn_guard(common::test_config()).await;
    let client = common::client();
    let mut feed = monitor.subscribe();

    let res = client
        .post(format!("http://{}/security/csp-report", addr))
        .json(&json!({"csp-report": {"violated-directive": "img-src"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let event = feed.try_recv().unwrap();
    assert_eq!(event.kind, EventKind::CspViolation);
    assert_eq!(event.severity, Severity::Low);

    shutdown.trigger();
}
