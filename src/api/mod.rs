pub mod search;

use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET / - liveness probe with corpus size.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "verse-search",
        "verses": state.corpus.len(),
    }))
}
