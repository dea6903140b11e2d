//! API routes

use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{campaigns, health, reports};
use crate::state::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Health check routes
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .with_state(state.clone());

    // Campaign routes
    let campaign_routes = Router::new()
        .route("/", post(campaigns::create_campaign))
        .route("/:campaign_id", get(campaigns::get_campaign))
        .route("/:campaign_id/start", post(campaigns::start_campaign))
        .route("/:campaign_id/pause", post(campaigns::pause_campaign))
        .route("/:campaign_id/resume", post(campaigns::resume_campaign))
        .route("/:campaign_id/stop", post(campaigns::stop_campaign))
        .route("/:campaign_id/stats", get(campaigns::get_campaign_stats));

    // Inbound webhook routes
    let report_routes = Router::new().route("/sms-status", post(reports::sms_status));

    let cors = cors_layer(&state.config.api.cors_origins);

    let api_v1 = Router::new()
        .nest("/campaigns", campaign_routes)
        .nest("/reports", report_routes)
        .with_state(state);

    let router = Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Build the CORS layer from the configured origin list.
///
/// No origins means no CORS headers at all; `*` opens every origin.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    Some(layer.allow_origin(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use smsrust_common::config::Config;
    use smsrust_core::content::ContentSelector;
    use smsrust_core::dispatch::RateCapPolicy;
    use smsrust_core::transport::{
        DeviceStatusSnapshot, DeviceTransport, TaskReceipt, TaskSubmission,
    };
    use smsrust_core::{
        CampaignOrchestrator, DispatchRegistry, MessageStatusTracker, Stores, WorkerContext,
    };
    use smsrust_storage::Device;
    use tower::ServiceExt;

    struct NullTransport;

    #[async_trait::async_trait]
    impl DeviceTransport for NullTransport {
        async fn send_batch(
            &self,
            _device: &Device,
            tasks: &[TaskSubmission],
        ) -> smsrust_common::Result<Vec<TaskReceipt>> {
            Ok(tasks
                .iter()
                .enumerate()
                .map(|(i, _)| TaskReceipt {
                    id: format!("t-{}", i),
                    code: 0,
                    reason: None,
                })
                .collect())
        }

        async fn pause_tasks(
            &self,
            _device: &Device,
            _task_ids: &[String],
        ) -> smsrust_common::Result<()> {
            Ok(())
        }

        async fn resume_tasks(
            &self,
            _device: &Device,
            _task_ids: &[String],
        ) -> smsrust_common::Result<()> {
            Ok(())
        }

        async fn remove_tasks(
            &self,
            _device: &Device,
            _task_ids: &[String],
        ) -> smsrust_common::Result<()> {
            Ok(())
        }

        async fn get_status(
            &self,
            _device: &Device,
        ) -> smsrust_common::Result<DeviceStatusSnapshot> {
            Ok(DeviceStatusSnapshot {
                online: true,
                ports: Vec::new(),
            })
        }
    }

    fn test_state_with(config: Config) -> Arc<AppState> {
        let stores = Stores::memory();
        let registry = Arc::new(DispatchRegistry::new());
        let tracker = Arc::new(MessageStatusTracker::new(stores.clone()));
        let ctx = WorkerContext {
            stores: stores.clone(),
            policy: Arc::new(RateCapPolicy::new(stores.clone())),
            selector: Arc::new(ContentSelector::new(None)),
            transport: Arc::new(NullTransport),
            tracker: tracker.clone(),
            dispatch: config.dispatch.clone(),
        };
        let orchestrator = Arc::new(CampaignOrchestrator::new(stores.clone(), registry, ctx));

        Arc::new(AppState {
            stores,
            orchestrator,
            tracker,
            config,
            db_pool: None,
        })
    }

    fn test_state() -> Arc<AppState> {
        test_state_with(Config::default())
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = create_router(test_state());

        for path in ["/health", "/health/live", "/health/ready"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_start_unknown_campaign_is_404() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/campaigns/{}/start", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_then_start_empty_audience_is_422() {
        let app = create_router(test_state());

        let create = serde_json::json!({
            "owner_id": uuid::Uuid::new_v4(),
            "name": "spring sale",
            "message": "hello",
            "contact_list_id": uuid::Uuid::new_v4(),
            "device_id": uuid::Uuid::new_v4(),
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/campaigns")
                    .header("content-type", "application/json")
                    .body(Body::from(create.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(created["status"], "scheduled");
        let id = created["id"].as_str().unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/campaigns/{}/start", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "EMPTY_AUDIENCE");
    }

    #[tokio::test]
    async fn test_cors_headers_follow_configured_origins() {
        let mut config = Config::default();
        config.api.cors_origins = vec!["*".to_string()];
        let app = create_router(test_state_with(config));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://dashboard.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .map(|v| v.to_str().unwrap()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn test_cors_disabled_when_no_origins_configured() {
        let app = create_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://dashboard.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_create_campaign_uses_configured_defaults() {
        let mut config = Config::default();
        config.dispatch.daily_message_limit = 42;
        let app = create_router(test_state_with(config));

        let create = serde_json::json!({
            "owner_id": uuid::Uuid::new_v4(),
            "name": "defaults",
            "message": "hello",
            "contact_list_id": uuid::Uuid::new_v4(),
            "device_id": uuid::Uuid::new_v4(),
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/campaigns")
                    .header("content-type", "application/json")
                    .body(Body::from(create.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(created["daily_message_limit"], 42);
    }

    #[tokio::test]
    async fn test_webhook_accepts_unmatched_entries() {
        let app = create_router(test_state());

        let payload = serde_json::json!({
            "type": "sms-sent-status",
            "statuses": [{
                "tid": "never-issued",
                "sent": 1,
                "sdr": [{"number": "+14165550199", "ts": 1749000000, "code": 0}]
            }]
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/reports/sms-status")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["processed"], 0);
        assert_eq!(json["unmatched"], 1);
    }
}
