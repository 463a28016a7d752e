use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use storefront_db::{migrations, DbPool};
use tracing::{info, warn};

#[derive(Clone)]
pub struct HealthState {
    pub backend: &'static str,
    /// Only the SQL backend has a connection to probe.
    pub db_pool: Option<DbPool>,
    /// Set when the server started without reaching the database.
    pub migrations_pending: Arc<AtomicBool>,
}

impl HealthState {
    pub fn new(backend: &'static str, db_pool: Option<DbPool>) -> Self {
        Self { backend, db_pool, migrations_pending: Arc::new(AtomicBool::new(false)) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub storage: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = storage_check(&state).await;
    let ready = storage.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "storefront-server runtime initialized".to_string(),
        },
        storage,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn storage_check(state: &HealthState) -> HealthCheck {
    let Some(pool) = &state.db_pool else {
        return HealthCheck {
            status: "ready",
            detail: format!("{} backend has no connection to probe", state.backend),
        };
    };

    if let Err(error) = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        return HealthCheck {
            status: "degraded",
            detail: format!("database query failed: {error}"),
        };
    }

    if state.migrations_pending.load(Ordering::Acquire) {
        if let Err(error) = migrations::run_pending(pool).await {
            warn!(
                event_name = "system.health.migrations_failed",
                correlation_id = "health",
                error = %error,
                "database is reachable again but migrations failed"
            );
            return HealthCheck {
                status: "degraded",
                detail: format!("database migrations failed: {error}"),
            };
        }
        if state.migrations_pending.swap(false, Ordering::AcqRel) {
            info!(
                event_name = "system.health.migrations_applied",
                correlation_id = "health",
                "database reachable again, pending migrations applied"
            );
        }
    }

    HealthCheck { status: "ready", detail: "database query succeeded".to_string() }
}
