//! System settings

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::{ActivityCategory, SystemSetting};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::settings::{DEADLINE_DAYS, DEFAULT_DEADLINE_DAYS};
use crate::error::internal;
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, audit};

const MAX_DEADLINE_DAYS: i64 = 60;

/// Value stored when a known key was never written
fn default_value(key: &str) -> Option<String> {
    match key {
        DEADLINE_DAYS => Some(DEFAULT_DEADLINE_DAYS.to_string()),
        _ => None,
    }
}

/// Normalizes a value for `key`, rejecting unknown keys
fn validate_setting(key: &str, value: &serde_json::Value) -> Result<String, AppError> {
    match key {
        DEADLINE_DAYS => {
            let days = match value {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            match days {
                Some(days) if (0..=MAX_DEADLINE_DAYS).contains(&days) => Ok(days.to_string()),
                _ => Err(AppError::invalid_field(
                    "value",
                    format!("Must be a whole number between 0 and {MAX_DEADLINE_DAYS}"),
                )),
            }
        }
        _ => Err(AppError::not_found(format!("Setting {key}"))),
    }
}

/// GET /api/settings/{key}
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(key): Path<String>,
) -> ApiResult<SystemSetting> {
    user.require_manager()?;
    let stored = db::settings::get(&state.pool, &key)
        .await
        .map_err(internal)?;
    if let Some(setting) = stored {
        return Ok(Json(setting));
    }
    let value = default_value(&key).ok_or_else(|| AppError::not_found(format!("Setting {key}")))?;
    Ok(Json(SystemSetting {
        key,
        value,
        updated_at: 0,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SettingValue {
    pub value: serde_json::Value,
}

/// PUT /api/settings/{key}
pub async fn put(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(key): Path<String>,
    Json(req): Json<SettingValue>,
) -> ApiResult<SystemSetting> {
    user.require_manager()?;
    let value = validate_setting(&key, &req.value)?;
    let setting = db::settings::set(&state.pool, &key, &value, now_millis())
        .await
        .map_err(internal)?;

    tracing::info!(key = %key, value = %value, "System setting updated");
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Instelling gewijzigd",
        Some(format!("{key} = {value}")),
    )
    .await;
    Ok(Json(setting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deadline_days_accepts_numbers_and_strings() {
        assert_eq!(validate_setting(DEADLINE_DAYS, &json!(14)).unwrap(), "14");
        assert_eq!(validate_setting(DEADLINE_DAYS, &json!(" 7 ")).unwrap(), "7");
        assert_eq!(validate_setting(DEADLINE_DAYS, &json!(0)).unwrap(), "0");
    }

    #[test]
    fn test_deadline_days_rejects_garbage() {
        assert!(validate_setting(DEADLINE_DAYS, &json!(-1)).is_err());
        assert!(validate_setting(DEADLINE_DAYS, &json!(2.5)).is_err());
        assert!(validate_setting(DEADLINE_DAYS, &json!("drie")).is_err());
        assert!(validate_setting(DEADLINE_DAYS, &json!(true)).is_err());
    }

    #[test]
    fn test_unknown_key() {
        assert!(validate_setting("theme", &json!("dark")).is_err());
        assert_eq!(default_value("theme"), None);
        assert_eq!(default_value(DEADLINE_DAYS).as_deref(), Some("21"));
    }
}
