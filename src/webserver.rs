use crate::state::ScanHealth;
use axum::extract::State;
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::sync::Arc;

/// Ready once a scan has completed without a fatal error.
pub async fn readiness_probe(State(health): State<Arc<ScanHealth>>) -> impl IntoResponse {
    if health.is_ready() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub async fn liveness_probe() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub fn create_app(health: Arc<ScanHealth>) -> Router {
    Router::new()
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .with_state(health)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readiness_follows_last_scan() {
        let health = Arc::new(ScanHealth::default());
        let status = |h: &Arc<ScanHealth>| {
            let h = h.clone();
            async move { readiness_probe(State(h)).await.into_response().status() }
        };

        assert_eq!(status(&health).await, StatusCode::SERVICE_UNAVAILABLE);
        health.record(true);
        assert_eq!(status(&health).await, StatusCode::NO_CONTENT);
        health.record(false);
        assert_eq!(status(&health).await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_liveness_is_always_ok() {
        assert_eq!(
            liveness_probe().await.into_response().status(),
            StatusCode::NO_CONTENT
        );
    }
}
