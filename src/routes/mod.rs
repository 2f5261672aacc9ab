mod games;
mod health;
mod users;

use axum::Router;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health` — lightweight liveness probe
/// - `GET /api/v1/health` — health check with database connectivity
/// - `/api/v1/games/...` — catalogue, reviews, wishlist/owned, images
/// - `/api/v1/users/...` — accounts, sessions, profile images
pub fn router() -> Router<AppState> {
    let api_v1 = Router::new()
        .merge(health::api_router())
        .nest("/games", games::router())
        .nest("/users", users::router());

    Router::new()
        .merge(health::root_router())
        .nest("/api/v1", api_v1)
}

/// Decode a JSON body into a request type, mapping decode failures to 400.
///
/// Axum's `Json<T>` rejections surface as 422 for shape errors; this API
/// reports every malformed body as 400, so handlers take `Json<Value>` and
/// decode through here.
pub(crate) fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::BadRequest(format!("Invalid body: {e}")))
}
