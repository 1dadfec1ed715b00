//! User Model

use serde::{Deserialize, Serialize};

/// Monthly hour ceiling (31 days x 24 h)
pub const MAX_MONTHLY_HOURS: i32 = 744;

/// User role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "user_role", rename_all = "lowercase"))]
pub enum Role {
    Admin,
    Supervisor,
    Ambulancier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Ambulancier => "ambulancier",
        }
    }

    /// Admins and supervisors manage a station
    pub fn is_manager(&self) -> bool {
        matches!(self, Role::Admin | Role::Supervisor)
    }

    pub fn is_supervisor(&self) -> bool {
        matches!(self, Role::Supervisor)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "supervisor" => Ok(Role::Supervisor),
            "ambulancier" => Ok(Role::Ambulancier),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// User row. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub station_id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub min_hours: i32,
    pub max_hours: i32,
    pub preferred_hours: i32,
    pub dark_mode: bool,
    /// Hours before a shift to send a reminder, 0 disables
    pub shift_reminder_hours: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Create user payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: Option<Role>,
    /// Defaults to the caller's active station
    pub station_id: Option<i64>,
    pub min_hours: Option<i32>,
    pub max_hours: Option<i32>,
    pub preferred_hours: Option<i32>,
}

/// Update user payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub station_id: Option<i64>,
    pub min_hours: Option<i32>,
    pub max_hours: Option<i32>,
    pub preferred_hours: Option<i32>,
}

/// Self-service hour preference payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourPreferencesUpdate {
    pub max_hours: i32,
    pub preferred_hours: i32,
}

/// Display settings payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplaySettingsUpdate {
    pub dark_mode: Option<bool>,
    pub shift_reminder_hours: Option<i32>,
}

/// Password change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    /// Required when changing one's own password
    pub current_password: Option<String>,
    pub new_password: String,
}

/// Check `min <= preferred <= max <= 744`
pub fn validate_hour_limits(min: i32, preferred: i32, max: i32) -> Result<(), String> {
    if min < 0 {
        return Err("min_hours must not be negative".to_string());
    }
    if max > MAX_MONTHLY_HOURS {
        return Err(format!("max_hours must not exceed {MAX_MONTHLY_HOURS}"));
    }
    if min > preferred || preferred > max {
        return Err("hours must satisfy min <= preferred <= max".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Ambulancier).unwrap(), "\"ambulancier\"");
        let r: Role = serde_json::from_str("\"supervisor\"").unwrap();
        assert_eq!(r, Role::Supervisor);
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_manager() {
        assert!(Role::Admin.is_manager());
        assert!(Role::Supervisor.is_manager());
        assert!(!Role::Ambulancier.is_manager());
    }

    #[test]
    fn test_hour_limits() {
        assert!(validate_hour_limits(0, 0, 0).is_ok());
        assert!(validate_hour_limits(24, 120, 160).is_ok());
        assert!(validate_hour_limits(0, 744, 744).is_ok());
        assert!(validate_hour_limits(0, 100, 745).is_err());
        assert!(validate_hour_limits(50, 40, 160).is_err());
        assert!(validate_hour_limits(0, 170, 160).is_err());
        assert!(validate_hour_limits(-1, 0, 10).is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            station_id: 2,
            username: "jan".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: "Jan".into(),
            last_name: "Peeters".into(),
            email: None,
            role: Role::Ambulancier,
            is_active: true,
            min_hours: 0,
            max_hours: 160,
            preferred_hours: 120,
            dark_mode: false,
            shift_reminder_hours: 12,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password_hash"));
        assert_eq!(user.full_name(), "Jan Peeters");
    }
}
