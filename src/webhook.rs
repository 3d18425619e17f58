//! HTTP surface: the WooCommerce order webhook.

use axum::{body::Bytes, extract::State, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::domain::events::DomainEvent;
use crate::store::DocumentStore;
use crate::sync::{handle_order_event, SyncReport, ERROR_TITLE, ORDER_CREATED};
use crate::{FusionError, Result, WcOrder};

pub const EVENT_HEADER: &str = "x-wc-webhook-event";
pub const ORDER_WEBHOOK_PATH: &str = "/api/v1/woocommerce/order";

#[derive(Clone)]
pub struct AppState { pub store: Arc<dyn DocumentStore>, pub nats: Option<async_nats::Client> }

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "woocommerce-fusion"})) }))
        .route(ORDER_WEBHOOK_PATH, post(order_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn order_webhook(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> std::result::Result<Json<Value>, (StatusCode, String)> {
    // The first delivery after registering a webhook is `webhook_id=<n>`, not JSON.
    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        info!("webhook ping acknowledged");
        return Ok(Json(json!({"status": "success"})));
    };
    let event = headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();

    match process(&s, event, payload).await {
        Ok(report) => {
            if let (Some(nats), Some(report)) = (&s.nats, &report) { publish(nats, &report.events).await; }
            Ok(Json(json!({"status": "success", "report": report})))
        }
        Err(e) => {
            error!(event, error = %e, "order webhook failed");
            let message = format!("{e}\n\n Request Data: \n{}", String::from_utf8_lossy(&body));
            if let Err(log_err) = s.store.log_error(ERROR_TITLE, &message).await {
                warn!(error = %log_err, "error log entry not written");
            }
            Err((status_for(&e), e.to_string()))
        }
    }
}

async fn process(s: &AppState, event: &str, payload: Value) -> Result<Option<SyncReport>> {
    if event != ORDER_CREATED {
        info!(event, "order event ignored");
        return Ok(None);
    }
    let order: WcOrder = serde_json::from_value(payload).map_err(|e| FusionError::InvalidPayload(e.to_string()))?;
    handle_order_event(s.store.as_ref(), event, &order).await
}

fn status_for(e: &FusionError) -> StatusCode {
    match e {
        FusionError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn publish(nats: &async_nats::Client, events: &[DomainEvent]) {
    for event in events {
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => { warn!(error = %e, "event not serializable"); continue; }
        };
        if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
            warn!(subject = event.subject(), error = %e, "event not published");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::WooCommerceSettings;
    use crate::store::MemoryStore;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app(store: Arc<MemoryStore>) -> Router {
        router(AppState { store, nats: None })
    }

    fn configured() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new()
                .with_settings(WooCommerceSettings { company: Some("Woo Co".into()), ..Default::default() })
                .with_company("Woo Co", "WC")
                .with_warehouse("Stores - WC"),
        )
    }

    fn order_body() -> String {
        json!({
            "id": 4012,
            "status": "processing",
            "date_created": "2024-02-01T08:00:00",
            "billing": {"first_name": "Sipho", "last_name": "Ndlovu", "email": "sipho@example.com"},
            "shipping": {"first_name": "Sipho", "last_name": "Ndlovu"},
            "line_items": [{"product_id": 11, "name": "Mug", "quantity": 1, "price": "95.00", "total_tax": "14.25"}],
            "_links": {"self": [{"href": "https://shop.example.com/wp-json/wc/v3/orders/4012"}]}
        })
        .to_string()
    }

    fn post_order(event: &str, body: String) -> Request<Body> {
        Request::post(ORDER_WEBHOOK_PATH).header(EVENT_HEADER, event).header("content-type", "application/json").body(Body::from(body)).unwrap()
    }

    async fn body_text(res: axum::response::Response) -> String {
        String::from_utf8(axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let res = app(configured()).oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ping_is_acknowledged() {
        let store = configured();
        let res = app(store.clone()).oneshot(post_order("created", "webhook_id=17".into())).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(store.has_no_documents());
    }

    #[tokio::test]
    async fn test_created_order() {
        let store = configured();
        let res = app(store.clone()).oneshot(post_order("created", order_body())).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(res).await).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["report"]["sales_order"]["name"], "SO-WOO-00001");
        assert_eq!(store.sales_orders()[0].woocommerce_id, 4012);
    }

    #[tokio::test]
    async fn test_updated_event_changes_nothing() {
        let store = configured();
        let res = app(store.clone()).oneshot(post_order("updated", order_body())).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(store.has_no_documents());
    }

    #[tokio::test]
    async fn test_failure_returns_500_and_logs_request() {
        let store = Arc::new(MemoryStore::new());
        let res = app(store.clone()).oneshot(post_order("created", order_body())).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(res).await, "Please set Warehouse in Woocommerce Settings");
        let logs = store.error_logs();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].message.contains("Request Data"));
        assert!(logs[0].message.contains("sipho@example.com"));
    }

    #[tokio::test]
    async fn test_malformed_order_is_bad_request() {
        let store = configured();
        let res = app(store.clone()).oneshot(post_order("created", json!({"status": "processing"}).to_string())).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(store.has_no_documents());
    }
}
