use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use uptime_core::{
    Error,
    services::Services,
    stats::{self, MonitorStats, StatusPageView},
    store::MonitorStore,
    trigger::{CycleRunner, TriggerOutcome},
};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<CycleRunner>,
    pub store: Arc<dyn MonitorStore>,
    /// When set, the cron endpoint requires `Authorization: Bearer <secret>`.
    pub cron_secret: Option<String>,
}

impl AppState {
    pub fn from_services(services: &Services) -> Self {
        Self {
            runner: services.runner.clone(),
            store: services.store.clone(),
            cron_secret: services.config.cron.secret.clone(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.0 {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            other => {
                error!("Request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message
        }));

        (status, body).into_response()
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/cron/monitor", get(run_cron).post(run_cron))
        .route("/api/status-pages/{slug}", get(get_status_page))
        .route("/api/monitors/{id}/stats", get(get_monitor_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now()
    }))
}

fn authorize_cron(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(secret) = state.cron_secret.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == secret => Ok(()),
        _ => Err(Error::auth("Unauthorized").into()),
    }
}

async fn run_cron(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, ApiError> {
    authorize_cron(&state, &headers)?;
    info!("Cron trigger received");

    let response = match state.runner.trigger().await {
        Ok(TriggerOutcome::Ran(report)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Monitor check completed",
                "considered": report.considered,
                "checked": report.checked,
                "skipped": report.skipped,
                "failed": report.failed,
                "alerts": report.alerts,
                "timestamp": Utc::now()
            })),
        ),
        Ok(TriggerOutcome::Skipped) => (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "error": "A check cycle is already running",
                "timestamp": Utc::now()
            })),
        ),
        Err(e) => {
            error!("Cron check cycle failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "timestamp": Utc::now()
                })),
            )
        }
    };

    Ok(response.into_response())
}

async fn get_status_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<StatusPageView>, ApiError> {
    let view = stats::status_page_view(state.store.as_ref(), &slug, Utc::now())
        .await?
        .ok_or_else(|| Error::not_found(format!("status page '{}'", slug)))?;
    Ok(Json(view))
}

async fn get_monitor_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MonitorStats>, ApiError> {
    if state.store.find_monitors_by_ids(&[id]).await?.is_empty() {
        return Err(Error::not_found(format!("monitor {}", id)).into());
    }

    let stats = stats::monitor_stats(state.store.as_ref(), id, Utc::now()).await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use chrono::Duration as ChronoDuration;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;
    use uptime_core::{
        engine::CheckEngine,
        models::{Branding, Monitor, MonitorCheck, MonitorStatus, StatusPage},
        notify::Dispatcher,
        probe::{ProbeOutcome, Prober},
        retention::RetentionPolicy,
        store::MemoryStore,
        trigger::{CycleLock, LocalCycleLock},
    };

    struct AlwaysUp;

    #[async_trait]
    impl Prober for AlwaysUp {
        async fn probe(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
            ProbeOutcome::from_status(200, 12)
        }
    }

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
        lock: Arc<LocalCycleLock>,
    }

    fn test_app(cron_secret: Option<&str>) -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let lock = Arc::new(LocalCycleLock::new());
        let engine = CheckEngine::new(store.clone(), Arc::new(AlwaysUp), Dispatcher::new());
        let runner = Arc::new(CycleRunner::new(
            Arc::new(engine),
            lock.clone(),
            RetentionPolicy::Unbounded,
        ));
        let state = Arc::new(AppState {
            runner,
            store: store.clone(),
            cron_secret: cron_secret.map(str::to_string),
        });

        TestApp {
            router: create_app(state),
            store,
            lock,
        }
    }

    fn active_monitor(name: &str) -> Monitor {
        let mut monitor = Monitor::new(name, "https://example.com", 60, 30).unwrap();
        monitor.status = MonitorStatus::Up;
        monitor
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn cron_request(method: &str, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/api/cron/monitor");
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app(None);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_cron_rejects_missing_or_wrong_secret() {
        let app = test_app(Some("s3cret"));

        let (status, body) = send(app.router.clone(), cron_request("GET", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = send(app.router.clone(), cron_request("POST", Some("wrong"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        assert!(app.store.checks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cron_runs_cycle_with_valid_secret() {
        let app = test_app(Some("s3cret"));
        app.store.insert_monitor(active_monitor("api")).unwrap();
        app.store.insert_monitor(active_monitor("web")).unwrap();

        let (status, body) = send(app.router.clone(), cron_request("POST", Some("s3cret"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["considered"], 2);
        assert_eq!(body["checked"], 2);
        assert!(body["timestamp"].is_string());
        assert_eq!(app.store.checks().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cron_is_open_without_configured_secret() {
        let app = test_app(None);

        let (status, body) = send(app.router, cron_request("GET", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["considered"], 0);
    }

    #[tokio::test]
    async fn test_cron_reports_conflict_while_cycle_running() {
        let app = test_app(None);
        let _held = app.lock.try_acquire().await.unwrap().unwrap();

        let (status, body) = send(app.router, cron_request("GET", None)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_cron_reports_setup_failure() {
        let app = test_app(None);
        app.store.fail_monitor_queries(true);

        let (status, body) = send(app.router, cron_request("GET", None)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_status_page_lookup() {
        let app = test_app(None);
        let monitor = active_monitor("api");
        let now = Utc::now();
        app.store.insert_monitor(monitor.clone()).unwrap();
        app.store
            .insert_status_page(StatusPage {
                id: Uuid::new_v4(),
                slug: "acme".to_string(),
                title: "Acme".to_string(),
                description: Some("Public status".to_string()),
                monitors: vec![monitor.id],
                branding: Branding::default(),
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let request = Request::builder()
            .uri("/api/status-pages/acme")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app.router.clone(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Acme");
        assert_eq!(body["monitors"][0]["name"], "api");
        assert_eq!(body["monitors"][0]["uptime24h"], 100.0);

        let request = Request::builder()
            .uri("/api/status-pages/nope")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app.router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_monitor_stats() {
        let app = test_app(None);
        let monitor = active_monitor("api");
        app.store.insert_monitor(monitor.clone()).unwrap();
        for (success, age_hours) in [(true, 1), (false, 2), (true, 30)] {
            app.store
                .insert_check(MonitorCheck {
                    id: Uuid::new_v4(),
                    monitor_id: monitor.id,
                    success,
                    response_time: 100,
                    status_code: Some(if success { 200 } else { 500 }),
                    error: None,
                    timestamp: Utc::now() - ChronoDuration::hours(age_hours),
                })
                .unwrap();
        }

        let request = Request::builder()
            .uri(format!("/api/monitors/{}/stats", monitor.id))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app.router.clone(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalChecks"], 3);
        assert_eq!(body["uptime24h"], 50.0);
        assert_eq!(body["failedChecks"], 1);

        let request = Request::builder()
            .uri(format!("/api/monitors/{}/stats", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app.router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
