//! Data models
//!
//! Shared between planning-server and the web client (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (Postgres BIGSERIAL), timestamps are UTC epoch millis.

pub mod activity;
pub mod notification;
pub mod overtime;
pub mod preference;
pub mod reportage;
pub mod shift;
pub mod station;
pub mod swap;
pub mod user;

// Re-exports
pub use activity::*;
pub use notification::*;
pub use overtime::*;
pub use preference::*;
pub use reportage::*;
pub use shift::*;
pub use station::*;
pub use swap::*;
pub use user::*;
