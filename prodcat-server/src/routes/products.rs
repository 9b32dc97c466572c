//! Product listing endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use sqlx::Row;

use crate::error::ApiResult;
use crate::models::ProductListResponse;
use crate::state::AppState;

/// The only query this API issues: an unfiltered select of the catalog ids.
const PRODUCT_IDS_SQL: &str = "SELECT prod_id FROM product_detail";

pub fn router() -> Router<AppState> {
    Router::new().route("/fetch_products", get(fetch_products))
}

/// List every product identifier, in table order, fresh on every request.
async fn fetch_products(State(state): State<AppState>) -> ApiResult<Json<ProductListResponse>> {
    let rows = state.db().fetch_all(PRODUCT_IDS_SQL, &[]).await?;
    let prod_ids = rows
        .iter()
        .map(|row| row.try_get::<i64, _>("prod_id"))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(ProductListResponse::new(prod_ids)))
}
