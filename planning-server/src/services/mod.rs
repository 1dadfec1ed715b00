//! Work shared by handlers and background tasks

pub mod reminders;
pub mod reportage;
