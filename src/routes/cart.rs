use axum::extract::State;
use axum::Json;
use garde::Validate;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::db::cart;
use crate::error::{success, ApiResult};
use crate::models::cart::CartStatus;
use crate::models::requests::CartStatusUpdate;

/// GET /api/cart/status — latest cart snapshot, with a default for a cart
/// that has never checked in.
pub async fn get_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = cart::latest(&state.db)
        .await?
        .unwrap_or_else(CartStatus::offline);

    Ok(success(status))
}

/// POST /api/cart/status — snapshot update sent by the cart itself.
pub async fn update_status(
    State(state): State<AppState>,
    Json(request): Json<CartStatusUpdate>,
) -> ApiResult<Json<Value>> {
    request.validate()?;

    cart::update_status(
        &state.db,
        request.online.unwrap_or(true),
        request.current_station,
        request.mode.as_deref().unwrap_or("idle"),
        request.battery_level,
        request.last_activity.as_deref(),
    )
    .await?;

    let status = cart::latest(&state.db)
        .await?
        .unwrap_or_else(CartStatus::offline);

    tracing::info!(
        online = status.online,
        current_station = status.current_station,
        mode = %status.mode,
        "Cart status updated"
    );

    Ok(success(json!({
        "message": "Status updated",
        "cart_status": status,
    })))
}
