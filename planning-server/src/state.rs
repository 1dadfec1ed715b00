//! Application state for planning-server

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use aws_sdk_sesv2::Client as SesClient;
use chrono_tz::Tz;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::LoginRateLimiter;
use crate::config::Config;
use crate::email::EmailService;
use crate::notify::vapid::VapidSigner;
use crate::notify::{Notifier, PushService};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    /// Civil timezone for all local-time computations
    pub tz: Tz,
    pub public_base_url: String,
    pub report_excluded_stations: Arc<Vec<i64>>,
    /// Failed-login limiter
    pub rate_limiter: LoginRateLimiter,
    pub email: EmailService,
    pub notifier: Notifier,
    /// Set while a monthly report is being built and sent
    pub reportage_running: Arc<AtomicBool>,
}

impl AppState {
    /// Connect, migrate and wire up the outgoing channels
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };
        let email = EmailService::new(
            ses,
            config.email_from_address.clone(),
            config.email_from_name.clone(),
        );
        if !email.is_configured() {
            tracing::warn!("EMAIL_FROM_ADDRESS not set, email delivery disabled");
        }

        let signer = match (&config.vapid_private_key_pem, &config.vapid_public_key) {
            (Some(pem), Some(public_key)) => {
                match VapidSigner::new(pem, public_key, &config.vapid_contact) {
                    Ok(signer) => Some(signer),
                    Err(e) => {
                        tracing::warn!(error = %e, "Invalid VAPID key, push delivery disabled");
                        None
                    }
                }
            }
            _ => {
                tracing::warn!("VAPID keys not set, push delivery disabled");
                None
            }
        };
        let notifier = Notifier::new(pool.clone(), PushService::new(signer));

        Ok(Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            tz: config.timezone,
            public_base_url: config.public_base_url.clone(),
            report_excluded_stations: Arc::new(config.report_excluded_stations.clone()),
            rate_limiter: LoginRateLimiter::new(),
            email,
            notifier,
            reportage_running: Arc::new(AtomicBool::new(false)),
        })
    }
}
