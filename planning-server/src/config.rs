//! Planning server configuration

use chrono_tz::Tz;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Planning server configuration, loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Civil timezone for shift times, deadlines and scheduler wake-ups
    pub timezone: Tz,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    /// Sender address; email is disabled when unset
    pub email_from_address: Option<String>,
    pub email_from_name: String,
    /// VAPID public key (base64url, uncompressed P-256 point)
    pub vapid_public_key: Option<String>,
    /// VAPID private key (PKCS#8 PEM)
    pub vapid_private_key_pem: Option<String>,
    /// VAPID `sub` claim
    pub vapid_contact: String,
    /// Base URL of the web client, used for links in emails
    pub public_base_url: String,
    /// Stations left out of the monthly report
    pub report_excluded_stations: Vec<i64>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn optional(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.trim().is_empty())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let timezone_name =
            std::env::var("TIMEZONE").unwrap_or_else(|_| "Europe/Brussels".into());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| format!("TIMEZONE is not a valid IANA timezone: {timezone_name}"))?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            environment: environment.clone(),
            timezone,
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            email_from_address: Self::optional("EMAIL_FROM_ADDRESS"),
            email_from_name: std::env::var("EMAIL_FROM_NAME")
                .unwrap_or_else(|_| "Planning".into()),
            vapid_public_key: Self::optional("VAPID_PUBLIC_KEY"),
            vapid_private_key_pem: Self::optional("VAPID_PRIVATE_KEY_PEM"),
            vapid_contact: std::env::var("VAPID_CONTACT")
                .unwrap_or_else(|_| "mailto:planning@example.org".into()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".into())
                .trim_end_matches('/')
                .to_string(),
            report_excluded_stations: parse_id_list(
                &std::env::var("REPORT_EXCLUDED_STATIONS").unwrap_or_default(),
            ),
        })
    }
}

/// Parse a comma-separated id list, skipping blanks and garbage
fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list(""), Vec::<i64>::new());
        assert_eq!(parse_id_list("3"), vec![3]);
        assert_eq!(parse_id_list(" 3, 7 ,x,,9"), vec![3, 7, 9]);
    }

    #[test]
    fn test_require_secret_dev_placeholder() {
        let val = Config::require_secret("PLANNING_TEST_UNSET_SECRET", "development").unwrap();
        assert_eq!(val, "dev-PLANNING_TEST_UNSET_SECRET-not-for-production");
        assert!(Config::require_secret("PLANNING_TEST_UNSET_SECRET", "production").is_err());
    }
}
