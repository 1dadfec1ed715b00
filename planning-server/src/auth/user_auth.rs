//! User JWT authentication for the planning API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::Role;

use crate::db::users::SessionAccount;
use crate::state::AppState;

/// JWT claims for user authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    /// Active station for this session
    pub station_id: i64,
    pub role: Role,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated user extracted from the JWT
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: i64,
    /// Station the session is scoped to (may differ from the home station)
    pub station_id: i64,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }

    pub fn is_supervisor(&self) -> bool {
        self.role.is_supervisor()
    }

    /// Admin or supervisor
    pub fn require_manager(&self) -> Result<(), AppError> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(AppError::admin_required())
        }
    }

    pub fn require_supervisor(&self) -> Result<(), AppError> {
        if self.is_supervisor() {
            Ok(())
        } else {
            Err(AppError::supervisor_required())
        }
    }

    /// Supervisors see every station, others only their active one
    pub fn require_station(&self, station_id: i64) -> Result<(), AppError> {
        if self.is_supervisor() || self.station_id == station_id {
            Ok(())
        } else {
            Err(AppError::new(ErrorCode::StationAccessDenied))
        }
    }

    /// Self, or a manager
    pub fn require_self_or_manager(&self, user_id: i64) -> Result<(), AppError> {
        if self.user_id == user_id || self.is_manager() {
            Ok(())
        } else {
            Err(AppError::permission_denied("Not allowed for another user"))
        }
    }

    /// Station filter for list queries: supervisors may pick, others are pinned
    pub fn scoped_station(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(id) if self.is_supervisor() => id,
            _ => self.station_id,
        }
    }
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a JWT token for a user session
pub fn create_token(
    user_id: i64,
    station_id: i64,
    role: Role,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        station_id,
        role,
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::default();
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// Resolve the session against the stored account. Role and station access
/// come from the database so a demotion or revoked access applies at once.
fn session_user(claims: &Claims, account: Option<SessionAccount>) -> Result<CurrentUser, AppError> {
    let account = account
        .filter(|a| a.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::AccountDisabled))?;
    if !account.station_allowed {
        return Err(AppError::new(ErrorCode::StationAccessDenied));
    }
    Ok(CurrentUser {
        user_id: claims.sub,
        station_id: claims.station_id,
        role: account.role,
    })
}

/// Middleware that verifies the bearer token and inserts [`CurrentUser`]
///
/// Deactivated or deleted users are rejected even with a valid token.
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format").into_response())?;

    let claims = decode_token(token, &state.jwt_secret).map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired).into_response()
            }
            _ => AppError::new(ErrorCode::TokenInvalid).into_response(),
        }
    })?;

    let account = crate::db::users::session_account(&state.pool, claims.sub, claims.station_id)
        .await
        .map_err(|e| crate::error::internal(e).into_response())?;
    let current = session_user(&claims, account).map_err(IntoResponse::into_response)?;
    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let token = create_token(42, 3, Role::Admin, "secret").unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.station_id, 3);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(1, 1, Role::Ambulancier, "secret").unwrap();
        assert!(decode_token(&token, "other").is_err());
    }

    fn claims(role: Role) -> Claims {
        let token = create_token(7, 2, role, "secret").unwrap();
        decode_token(&token, "secret").unwrap()
    }

    #[test]
    fn test_session_role_comes_from_account() {
        let claims = claims(Role::Admin);
        let demoted = SessionAccount {
            is_active: true,
            role: Role::Ambulancier,
            station_allowed: true,
        };
        let user = session_user(&claims, Some(demoted)).unwrap();
        assert_eq!(user.role, Role::Ambulancier);
        assert_eq!((user.user_id, user.station_id), (7, 2));
        assert!(user.require_manager().is_err());
    }

    #[test]
    fn test_session_rejects_stale_accounts() {
        let claims = claims(Role::Ambulancier);
        let active = SessionAccount {
            is_active: true,
            role: Role::Ambulancier,
            station_allowed: true,
        };

        let err = session_user(&claims, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountDisabled);

        let disabled = SessionAccount { is_active: false, ..active };
        assert_eq!(
            session_user(&claims, Some(disabled)).unwrap_err().code,
            ErrorCode::AccountDisabled
        );

        let revoked = SessionAccount { station_allowed: false, ..active };
        assert_eq!(
            session_user(&claims, Some(revoked)).unwrap_err().code,
            ErrorCode::StationAccessDenied
        );
    }

    #[test]
    fn test_permission_helpers() {
        let worker = CurrentUser {
            user_id: 5,
            station_id: 2,
            role: Role::Ambulancier,
        };
        assert!(worker.require_manager().is_err());
        assert!(worker.require_station(2).is_ok());
        assert_eq!(
            worker.require_station(3).unwrap_err().code,
            ErrorCode::StationAccessDenied
        );
        assert!(worker.require_self_or_manager(5).is_ok());
        assert!(worker.require_self_or_manager(6).is_err());
        assert_eq!(worker.scoped_station(Some(9)), 2);

        let supervisor = CurrentUser {
            user_id: 1,
            station_id: 2,
            role: Role::Supervisor,
        };
        assert!(supervisor.require_supervisor().is_ok());
        assert!(supervisor.require_station(7).is_ok());
        assert_eq!(supervisor.scoped_station(Some(9)), 9);
        assert_eq!(supervisor.scoped_station(None), 2);
    }
}
