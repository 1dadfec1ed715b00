//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .is_ok();
    Json(serde_json::json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "planning-server",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "email": state.email.is_configured(),
        "push": state.notifier.push().is_configured(),
    }))
}
