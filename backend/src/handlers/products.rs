use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use tracing::info;

use crate::{
    db,
    error::AppResult,
    extract::{AppJson, AppPath},
    models::{CreateProduct, Product, UpdateProduct},
    AppState,
};

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<Vec<Product>>)> {
    let start = Instant::now();
    let products = db::fetch_all_products(&state.db).await?;

    info!(
        count = products.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Listed products"
    );

    Ok((StatusCode::OK, Json(products)))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProduct>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let product = payload.validate()?;

    let start = Instant::now();
    let id = db::insert_product(&state.db, &product).await?;

    info!(
        id,
        name = %product.name,
        elapsed_ms = start.elapsed().as_millis(),
        "Created product"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Product created successfully",
            "productId": id,
        })),
    ))
}

// ── Get by ID ─────────────────────────────────────────────────────────────────

pub async fn get_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = db::fetch_product_by_id(&state.db, id).await?;

    info!(id, "Fetched product");

    Ok((StatusCode::OK, Json(product)))
}

// ── Update ────────────────────────────────────────────────────────────────────

/// Partial update, mounted on both PATCH and PUT.
pub async fn update_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateProduct>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let changes = payload.validate()?;

    let start = Instant::now();
    db::update_product(&state.db, id, &changes).await?;

    info!(
        id,
        name_changed = changes.name.is_some(),
        price_changed = changes.price.is_some(),
        elapsed_ms = start.elapsed().as_millis(),
        "Updated product"
    );

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Product updated successfully" })),
    ))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    db::delete_product(&state.db, id).await?;

    info!(id, "Deleted product");

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Product deleted successfully" })),
    ))
}
