//! Authentication: JWT sessions, password hashing, login throttling

pub mod rate_limit;
pub mod user_auth;

pub use rate_limit::LoginRateLimiter;
pub use user_auth::CurrentUser;
