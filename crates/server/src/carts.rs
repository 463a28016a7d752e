use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use storefront_core::{Cart, CartId, CartItem, CartView, ProductId};

use crate::api::{application_error, bad_request, json_rejection, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", post(create_cart).get(list_carts))
        .route("/api/cart/{cid}", get(get_cart).put(set_items).delete(clear_cart))
        .route("/api/cart/{cid}/product/{pid}", post(add_item))
        .route("/api/cart/{cid}/products/{pid}", put(set_item_quantity).delete(remove_item))
}

#[derive(Debug, Deserialize)]
pub struct SetItemsRequest {
    pub products: Vec<CartItem>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

async fn create_cart(State(state): State<AppState>) -> Result<(StatusCode, Json<Cart>), ApiError> {
    let cart = state.carts.create().await.map_err(application_error)?;
    Ok((StatusCode::CREATED, Json(cart)))
}

async fn list_carts(State(state): State<AppState>) -> Result<Json<Vec<Cart>>, ApiError> {
    Ok(Json(state.carts.list().await.map_err(application_error)?))
}

async fn get_cart(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.get_detailed(&CartId(cid)).await.map_err(application_error)?))
}

async fn add_item(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
) -> Result<Json<Cart>, ApiError> {
    let cart =
        state.carts.add_item(&CartId(cid), &ProductId(pid)).await.map_err(application_error)?;
    Ok(Json(cart))
}

async fn remove_item(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
) -> Result<Json<Cart>, ApiError> {
    let cart =
        state.carts.remove_item(&CartId(cid), &ProductId(pid)).await.map_err(application_error)?;
    Ok(Json(cart))
}

async fn set_items(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    payload: Result<Json<SetItemsRequest>, JsonRejection>,
) -> Result<Json<Cart>, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    if request.products.iter().any(|item| item.quantity == 0) {
        return Err(bad_request("quantity must be at least 1"));
    }
    let cart =
        state.carts.set_items(&CartId(cid), request.products).await.map_err(application_error)?;
    Ok(Json(cart))
}

async fn set_item_quantity(
    State(state): State<AppState>,
    Path((cid, pid)): Path<(String, String)>,
    payload: Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Json<Cart>, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    if request.quantity == 0 {
        return Err(bad_request("quantity must be at least 1"));
    }
    let cart = state
        .carts
        .set_item_quantity(&CartId(cid), &ProductId(pid), request.quantity)
        .await
        .map_err(application_error)?;
    Ok(Json(cart))
}

async fn clear_cart(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    Ok(Json(state.carts.clear(&CartId(cid)).await.map_err(application_error)?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};

    use crate::api::test_support::{app, send};

    async fn product(app: &Router, code: &str) -> String {
        let body = json!({
            "title": "Mate",
            "description": "Calabaza",
            "code": code,
            "price": "12.50",
            "stock": 4,
            "category": "mates"
        })
        .to_string();
        let (status, created) = send(app, Method::POST, "/api/product", Some(&body)).await;
        assert_eq!(status, StatusCode::CREATED);
        created["id"].as_str().expect("product id").to_string()
    }

    async fn cart(app: &Router) -> String {
        let (status, created) = send(app, Method::POST, "/api/cart", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["items"], json!([]));
        created["id"].as_str().expect("cart id").to_string()
    }

    #[tokio::test]
    async fn adding_twice_merges_into_one_line() {
        let app = app();
        let pid = product(&app, "M-1").await;
        let cid = cart(&app).await;

        let uri = format!("/api/cart/{cid}/product/{pid}");
        send(&app, Method::POST, &uri, None).await;
        let (status, body) = send(&app, Method::POST, &uri, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], json!([{ "product": pid, "quantity": 2 }]));
    }

    #[tokio::test]
    async fn detailed_cart_embeds_products() {
        let app = app();
        let pid = product(&app, "M-1").await;
        let cid = cart(&app).await;
        send(&app, Method::POST, &format!("/api/cart/{cid}/product/{pid}"), None).await;

        let (status, view) = send(&app, Method::GET, &format!("/api/cart/{cid}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["items"][0]["product"]["code"], "M-1");
        assert_eq!(view["items"][0]["quantity"], 1);
    }

    #[tokio::test]
    async fn missing_cart_or_product_is_not_found() {
        let app = app();
        let pid = product(&app, "M-1").await;
        let cid = cart(&app).await;

        let (status, _) =
            send(&app, Method::POST, &format!("/api/cart/missing/product/{pid}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            send(&app, Method::POST, &format!("/api/cart/{cid}/product/missing"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "product `missing` not found");

        let (status, _) =
            send(&app, Method::DELETE, &format!("/api/cart/{cid}/products/{pid}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/api/cart/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn replacing_items_drops_unknown_products() {
        let app = app();
        let pid = product(&app, "M-1").await;
        let cid = cart(&app).await;

        let body = json!({
            "products": [
                { "product": pid, "quantity": 3 },
                { "product": "ghost", "quantity": 1 }
            ]
        })
        .to_string();
        let (status, updated) =
            send(&app, Method::PUT, &format!("/api/cart/{cid}"), Some(&body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["items"], json!([{ "product": pid, "quantity": 3 }]));
    }

    #[tokio::test]
    async fn quantity_must_be_positive() {
        let app = app();
        let pid = product(&app, "M-1").await;
        let cid = cart(&app).await;
        send(&app, Method::POST, &format!("/api/cart/{cid}/product/{pid}"), None).await;
        let uri = format!("/api/cart/{cid}/products/{pid}");

        for invalid in [r#"{"quantity":0}"#, r#"{"quantity":-2}"#, r#"{"quantity":"many"}"#] {
            let (status, _) = send(&app, Method::PUT, &uri, Some(invalid)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{invalid}");
        }

        let (status, updated) = send(&app, Method::PUT, &uri, Some(r#"{"quantity":7}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["items"][0]["quantity"], 7);
    }

    #[tokio::test]
    async fn clearing_keeps_the_cart() {
        let app = app();
        let pid = product(&app, "M-1").await;
        let cid = cart(&app).await;
        send(&app, Method::POST, &format!("/api/cart/{cid}/product/{pid}"), None).await;

        let (status, cleared) = send(&app, Method::DELETE, &format!("/api/cart/{cid}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["items"], json!([]));

        let (_, carts) = send(&app, Method::GET, "/api/cart", None).await;
        assert_eq!(carts.as_array().map(Vec::len), Some(1));
        assert_eq!(carts[0]["id"], Value::String(cid));
    }
}
