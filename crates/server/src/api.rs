//! Shared HTTP state, error mapping and router assembly.
//!
//! Every error leaves the server as `{ "error": message }` with a 400, 404 or
//! 500 status. Storage details are logged under a correlation id and never
//! returned to the caller.

use std::sync::Arc;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    Json, Router,
};
use serde::Serialize;
use storefront_core::{
    ApplicationError, CartService, CatalogService, CatalogSettings, InterfaceError, Notifier,
    StorageAdapter,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{carts, products, realtime};

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub carts: CartService,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        notifier: Arc<Notifier>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            catalog: CatalogService::with_settings(storage.clone(), notifier, settings),
            carts: CartService::new(storage),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(products::routes())
        .merge(carts::routes())
        .merge(realtime::routes())
        .with_state(state)
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { error: message.into() }))
}

pub fn json_rejection(rejection: JsonRejection) -> ApiError {
    warn!(event_name = "api.request.malformed_body", error = %rejection, "rejected request body");
    bad_request(rejection.body_text())
}

pub fn query_rejection(rejection: QueryRejection) -> ApiError {
    warn!(event_name = "api.request.malformed_query", error = %rejection, "rejected query string");
    bad_request(rejection.body_text())
}

/// Maps a service failure to a response. Internal failures are logged with
/// their full detail first.
pub fn application_error(failure: ApplicationError) -> ApiError {
    let correlation_id = Uuid::new_v4().to_string();
    let interface = failure.into_interface(correlation_id);

    if let InterfaceError::Internal { message, correlation_id } = &interface {
        error!(
            event_name = "api.request.failed",
            correlation_id = %correlation_id,
            error = %message,
            "request failed with an internal error"
        );
    }

    let status = StatusCode::from_u16(interface.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorBody { error: interface.user_message().to_string() }))
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use storefront_core::{ApplicationError, StorageError};

    use super::application_error;

    #[test]
    fn storage_failures_hide_detail() {
        let (status, body) = application_error(ApplicationError::from(
            StorageError::Serialization("column `price`: invalid digit".to_string()),
        ));

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.contains("price"));
    }

    #[test]
    fn not_found_keeps_entity_message() {
        let (status, body) = application_error(ApplicationError::not_found("product", "p-1"));

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "product `p-1` not found");
    }
}
