use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    routing::get,
    Router,
};
use monitor_lib::{
    logging_layer, with_monitoring, CheckStatus, EndpointConfig, Monitor, MonitorConfig, Registry,
    PROMETHEUS_CONTENT_TYPE,
};
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceExt;

struct TestResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

fn app(monitor: Monitor) -> Router {
    let router = Router::new()
        .route("/your-app", get(|| async { "app" }))
        .fallback(|| async { (StatusCode::IM_A_TEAPOT, "next") });
    with_monitoring(router, monitor)
}

async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    TestResponse {
        status,
        content_type,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

async fn get_path(registry: &Registry, path: &str) -> TestResponse {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    send(app(Monitor::new(registry.clone())), request).await
}

fn warn_and_fail(registry: &Registry) {
    registry.add_health_check("bob0", || async { CheckStatus::Ok });
    registry.add_health_check("bob1", || async { CheckStatus::Warning });
    registry.add_health_check("bob2", || async { CheckStatus::Critical });
    registry.add_health_check("bob3", || async { CheckStatus::Unknown });
}

#[tokio::test]
async fn test_unrelated_paths_are_forwarded() {
    let registry = Registry::new();
    registry.add_health_check("bob", || async { CheckStatus::Critical });

    let response = get_path(&registry, "/your-app").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "app");
    assert_ne!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));

    let response = get_path(&registry, "/somewhere-else").await;
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(response.body, "next");
    assert_ne!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
}

#[tokio::test]
async fn test_healthz_returns_200_by_default() {
    let response = get_path(&Registry::new(), "/healthz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_healthz_returns_200_if_all_checks_succeed() {
    let registry = Registry::new();
    registry.add_readiness_check("bob", || async { CheckStatus::Ok });
    registry.add_readiness_check("bob2", || async { CheckStatus::Ok });

    let response = get_path(&registry, "/healthz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_healthz_returns_500_if_any_check_fails() {
    for failing in [CheckStatus::Warning, CheckStatus::Critical, CheckStatus::Unknown] {
        let registry = Registry::new();
        registry.add_readiness_check("bob", || async { CheckStatus::Ok });
        registry.add_readiness_check("bob2", move || async move { failing });

        let response = get_path(&registry, "/healthz").await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
        assert!(response.body.is_empty(), "failing check must not be disclosed");
    }
}

#[tokio::test]
async fn test_healthz_ignores_health_checks() {
    let registry = Registry::new();
    registry.add_health_check("broken", || async { CheckStatus::Critical });

    let response = get_path(&registry, "/healthz").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_checkz_returns_404_by_default() {
    let response = get_path(&Registry::new(), "/checkz").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
}

#[tokio::test]
async fn test_checkz_reports_succeeding_checks() {
    let registry = Registry::new();
    registry.add_health_check("bob0", || async { CheckStatus::Ok });
    registry.add_health_check("bob1", || async { CheckStatus::Ok });

    let response = get_path(&registry, "/checkz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "bob0 0\nbob1 0\n");
}

#[tokio::test]
async fn test_checkz_reports_warnings_and_failures_with_200() {
    let registry = Registry::new();
    warn_and_fail(&registry);

    let response = get_path(&registry, "/checkz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
    assert_eq!(response.body, "bob0 0\nbob1 1\nbob2 2\nbob3 3\n");
}

#[tokio::test(start_paused = true)]
async fn test_checkz_keeps_registration_order() {
    let registry = Registry::new();
    registry.add_health_check("slow", || async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        CheckStatus::Warning
    });
    registry.add_health_check("fast", || async { CheckStatus::Ok });

    let response = get_path(&registry, "/checkz").await;
    assert_eq!(response.body, "slow 1\nfast 0\n");
}

#[tokio::test]
async fn test_livez_returns_200_by_default() {
    let response = get_path(&Registry::new(), "/livez").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_livez_returns_200_when_all_checks_succeed() {
    let registry = Registry::new();
    registry.add_health_check("bob0", || async { CheckStatus::Ok });
    registry.add_health_check("bob1", || async { CheckStatus::Ok });

    let response = get_path(&registry, "/livez").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "bob0 0\nbob1 0\n");
}

#[tokio::test]
async fn test_livez_returns_500_with_same_body_when_any_check_fails() {
    let registry = Registry::new();
    warn_and_fail(&registry);

    let checkz = get_path(&registry, "/checkz").await;
    let livez = get_path(&registry, "/livez").await;

    assert_eq!(livez.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(livez.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
    assert_eq!(livez.body, "bob0 0\nbob1 1\nbob2 2\nbob3 3\n");
    assert_eq!(livez.body, checkz.body);
}

#[tokio::test]
async fn test_livez_fails_on_warning_alone() {
    let registry = Registry::new();
    registry.add_health_check("bob0", || async { CheckStatus::Ok });
    registry.add_health_check("bob1", || async { CheckStatus::Warning });

    let response = get_path(&registry, "/livez").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, "bob0 0\nbob1 1\n");
}

#[tokio::test]
async fn test_metricz_returns_404_by_default() {
    let response = get_path(&Registry::new(), "/metricz").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
}

#[tokio::test]
async fn test_metricz_serves_sync_producer() {
    let registry = Registry::new();
    registry.set_metrics(|| "requests_total 42\n".to_string());

    let response = get_path(&registry, "/metricz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
    assert_eq!(response.body, "requests_total 42\n");
}

#[tokio::test]
async fn test_metricz_serves_async_producer() {
    let registry = Registry::new();
    registry.set_metrics_async(|| async {
        tokio::task::yield_now().await;
        "queue_depth 7".to_string()
    });

    let response = get_path(&registry, "/metricz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "queue_depth 7");
}

#[tokio::test]
async fn test_reset_restores_defaults() {
    let registry = Registry::new();
    registry.add_readiness_check("r", || async { CheckStatus::Critical });
    warn_and_fail(&registry);
    registry.set_metrics(|| "up 1\n".to_string());

    assert_eq!(get_path(&registry, "/healthz").await.status, StatusCode::INTERNAL_SERVER_ERROR);

    registry.reset();

    assert_eq!(get_path(&registry, "/healthz").await.status, StatusCode::OK);
    assert_eq!(get_path(&registry, "/checkz").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get_path(&registry, "/livez").await.status, StatusCode::OK);
    assert_eq!(get_path(&registry, "/metricz").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_independent_monitors() {
    let first = Registry::new();
    let second = Registry::new();
    first.add_health_check("only-first", || async { CheckStatus::Ok });

    assert_eq!(get_path(&first, "/checkz").await.status, StatusCode::OK);
    assert_eq!(get_path(&second, "/checkz").await.status, StatusCode::NOT_FOUND);
}

fn request_from(path: &str, peer: &str) -> Request<Body> {
    let peer: SocketAddr = peer.parse().unwrap();
    let mut request = Request::builder().uri(path).body(Body::empty()).unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn private_only_monitor(registry: &Registry) -> Monitor {
    let config = MonitorConfig {
        private_only: true,
        ..MonitorConfig::default()
    };
    Monitor::with_config(registry.clone(), config)
}

#[tokio::test]
async fn test_private_filter_forwards_public_peers() {
    let registry = Registry::new();
    let app = app(private_only_monitor(&registry));

    let response = send(app, request_from("/healthz", "4.4.4.4:40000")).await;
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(response.body, "next");
    assert_ne!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
}

#[tokio::test]
async fn test_private_filter_serves_private_peers() {
    let registry = Registry::new();
    warn_and_fail(&registry);
    let app = app(private_only_monitor(&registry));

    let response = send(app, request_from("/checkz", "10.0.0.5:40000")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "bob0 0\nbob1 1\nbob2 2\nbob3 3\n");
}

#[tokio::test]
async fn test_private_filter_forwards_unknown_peers() {
    let app = app(private_only_monitor(&Registry::new()));
    let request = Request::builder().uri("/livez").body(Body::empty()).unwrap();

    let response = send(app, request).await;
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
}

#[tokio::test]
async fn test_custom_endpoint_paths() {
    let registry = Registry::new();
    registry.add_health_check("bob", || async { CheckStatus::Ok });
    let config = MonitorConfig {
        endpoints: EndpointConfig {
            checks: "/internal/checks".to_string(),
            ..EndpointConfig::default()
        },
        ..MonitorConfig::default()
    };
    let monitor = Monitor::with_config(registry, config);

    let request = Request::builder().uri("/internal/checks").body(Body::empty()).unwrap();
    let response = send(app(monitor.clone()), request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "bob 0\n");

    let request = Request::builder().uri("/checkz").body(Body::empty()).unwrap();
    let response = send(app(monitor), request).await;
    assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
}

#[tokio::test(start_paused = true)]
async fn test_check_timeout_marks_hung_checks_unknown() {
    let registry = Registry::new();
    registry.add_health_check("fine", || async { CheckStatus::Ok });
    registry.add_health_check("hung", || std::future::pending::<CheckStatus>());
    registry.add_readiness_check("hung", || std::future::pending::<CheckStatus>());

    let config = MonitorConfig {
        check_timeout_ms: Some(100),
        ..MonitorConfig::default()
    };
    let monitor = Monitor::with_config(registry, config);

    let request = Request::builder().uri("/livez").body(Body::empty()).unwrap();
    let response = send(app(monitor.clone()), request).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, "fine 0\nhung 3\n");

    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = send(app(monitor), request).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_monitoring_behind_trace_layer() {
    let registry = Registry::new();
    registry.add_health_check("bob", || async { CheckStatus::Ok });
    let app = app(Monitor::new(registry)).layer(logging_layer());

    let request = Request::builder().uri("/livez").body(Body::empty()).unwrap();
    let response = send(app, request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "bob 0\n");
}

async fn exploding_check() -> CheckStatus {
    panic!("check exploded")
}

fn exploding_metrics() -> String {
    panic!("metrics exploded")
}

async fn exploding_async_metrics() -> String {
    panic!("async metrics exploded")
}

#[tokio::test]
async fn test_healthz_returns_500_when_readiness_check_panics() {
    let registry = Registry::new();
    registry.add_readiness_check("ok", || async { CheckStatus::Ok });
    registry.add_readiness_check("boom", exploding_check);

    let response = get_path(&registry, "/healthz").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_livez_reports_panicking_check_as_unknown() {
    let registry = Registry::new();
    registry.add_health_check("ok", || async { CheckStatus::Ok });
    registry.add_health_check("boom", exploding_check);

    let response = get_path(&registry, "/livez").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, "ok 0\nboom 3\n");

    let response = get_path(&registry, "/checkz").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok 0\nboom 3\n");
}

#[tokio::test]
async fn test_metricz_returns_500_when_producer_panics() {
    let registry = Registry::new();
    registry.set_metrics(exploding_metrics);

    let response = get_path(&registry, "/metricz").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.content_type.as_deref(), Some(PROMETHEUS_CONTENT_TYPE));
    assert!(response.body.is_empty());

    registry.set_metrics_async(exploding_async_metrics);
    let response = get_path(&registry, "/metricz").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}
