//! Product catalog routes.
//!
//! - `GET    /api/product`        paginated listing with links
//! - `GET    /api/product/{pid}`  single product
//! - `POST   /api/product`        create (201)
//! - `PUT    /api/product/{pid}`  partial update, identifier is never changed
//! - `DELETE /api/product/{pid}`  delete

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use storefront_core::{PageQuery, Product, ProductId, ProductInput, ProductPage, ProductPatch};

use crate::api::{
    application_error, json_rejection, query_rejection, ApiError, AppState, MessageBody,
};

pub const PRODUCTS_PATH: &str = "/api/product";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(PRODUCTS_PATH, get(list_products).post(create_product))
        .route("/api/product/{pid}", get(get_product).put(update_product).delete(delete_product))
}

async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ProductPage>, ApiError> {
    let Query(query) = query.map_err(query_rejection)?;
    let page = state.catalog.list_page(&query, PRODUCTS_PATH).await.map_err(application_error)?;
    Ok(Json(page))
}

async fn get_product(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product =
        state.catalog.get_by_id(&ProductId(pid)).await.map_err(application_error)?;
    Ok(Json(product))
}

async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(input) = payload.map_err(json_rejection)?;
    let product = state.catalog.create(input).await.map_err(application_error)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Path(pid): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(patch) = payload.map_err(json_rejection)?;
    let product =
        state.catalog.update(&ProductId(pid), patch).await.map_err(application_error)?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> Result<Json<MessageBody>, ApiError> {
    let id = ProductId(pid);
    state.catalog.remove(&id).await.map_err(application_error)?;
    Ok(Json(MessageBody { message: format!("product `{id}` deleted") }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{app, send};

    const TERMO: &str = r#"{
        "title": "Termo",
        "description": "Acero 1L",
        "code": "TR-100",
        "price": 45.99,
        "stock": 12,
        "category": "accesorios"
    }"#;

    #[tokio::test]
    async fn create_then_fetch_product() {
        let app = app();

        let (status, created) = send(&app, Method::POST, "/api/product", Some(TERMO)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "active");
        assert_eq!(created["thumbnails"], json!([]));
        let id = created["id"].as_str().expect("id should be a string").to_string();

        let (status, fetched) = send(&app, Method::GET, &format!("/api/product/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn missing_fields_are_bad_request() {
        let app = app();

        let (status, body) =
            send(&app, Method::POST, "/api/product", Some(r#"{"title":"Termo"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("price"));

        let (_, listing) = send(&app, Method::GET, "/api/product", None).await;
        assert_eq!(listing["totalCount"], 0);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/api/product", Some("{\"title\":")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn update_ignores_identifier_in_body() {
        let app = app();
        let (_, created) = send(&app, Method::POST, "/api/product", Some(TERMO)).await;
        let id = created["id"].as_str().expect("id").to_string();

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/product/{id}"),
            Some(r#"{"id":"hijack","stock":0}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], id.as_str());
        assert_eq!(updated["stock"], 0);
        assert_eq!(updated["title"], "Termo");
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/api/product/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "product `nope` not found");

        let (status, _) = send(&app, Method::DELETE, "/api/product/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send(&app, Method::PUT, "/api/product/nope", Some(r#"{"stock":1}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_returns_message() {
        let app = app();
        let (_, created) = send(&app, Method::POST, "/api/product", Some(TERMO)).await;
        let id = created["id"].as_str().expect("id").to_string();

        let (status, body) = send(&app, Method::DELETE, &format!("/api/product/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap_or_default().contains(&id));
    }

    #[tokio::test]
    async fn listing_builds_links_with_all_parameters() {
        let app = app();
        for _ in 0..3 {
            send(&app, Method::POST, "/api/product", Some(TERMO)).await;
        }

        let (status, page) = send(
            &app,
            Method::GET,
            "/api/product?limit=2&page=1&sort=desc&category=accesorios&availability=true",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["products"].as_array().map(Vec::len), Some(2));
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["hasNextPage"], true);
        assert_eq!(page["prevLink"], serde_json::Value::Null);
        assert_eq!(
            page["nextLink"],
            "/api/product?limit=2&page=2&sort=desc&category=accesorios&availability=true"
        );
    }

    #[tokio::test]
    async fn invalid_paging_is_bad_request() {
        let app = app();

        for uri in ["/api/product?limit=0", "/api/product?page=0", "/api/product?limit=abc"] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
    }
}
