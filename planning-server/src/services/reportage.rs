//! Building and mailing the monthly report

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Datelike, NaiveDate};
use shared::error::{AppError, ErrorCode};
use shared::models::{MonthYear, ReportageConfig, ReportageLog};

use crate::db;
use crate::email::Attachment;
use crate::error::{ServiceError, ServiceResult};
use crate::report::{
    REPORT_CONTENT_TYPE, ReportInput, render_template, render_workbook, report_filename,
    report_sheets,
};
use crate::scheduling::calendar::today;
use crate::state::AppState;
use crate::util::now_millis;

/// Holds the running flag for the duration of a send
struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The month the scheduled run should report on, if any
pub fn due_month(config: &ReportageConfig, today: NaiveDate) -> Option<MonthYear> {
    if !config.enabled || today.day() as i32 != config.days_after_month_end {
        return None;
    }
    let previous = MonthYear {
        month: today.month() as i32,
        year: today.year(),
    }
    .previous();
    (!config.already_sent(previous.month, previous.year)).then_some(previous)
}

/// Build the report for `month` and mail it to the active recipients.
///
/// Every attempt past the precondition checks leaves a log row.
pub async fn send_report(state: &AppState, month: MonthYear) -> ServiceResult<ReportageLog> {
    let Some(_guard) = RunGuard::acquire(&state.reportage_running) else {
        return Err(AppError::conflict("A report is already being sent").into());
    };
    if !state.email.is_configured() {
        return Err(AppError::new(ErrorCode::EmailNotConfigured).into());
    }
    let pool = &state.pool;
    let recipients: Vec<String> = db::reportage::active_recipients(pool)
        .await?
        .into_iter()
        .map(|r| r.email)
        .collect();
    if recipients.is_empty() {
        return Err(AppError::new(ErrorCode::ReportNoRecipients).into());
    }
    let recipient_count = i32::try_from(recipients.len()).unwrap_or(i32::MAX);

    match deliver(state, month, &recipients).await {
        Ok(()) => {
            let now = now_millis();
            db::reportage::mark_sent(pool, month.month, month.year, now).await?;
            let log = db::reportage::insert_log(pool, month.month, month.year, recipient_count, None, now)
                .await?;
            tracing::info!(
                month = month.month,
                year = month.year,
                recipients = recipient_count,
                "Monthly report sent"
            );
            Ok(log)
        }
        Err(e) => {
            let message = e.to_string();
            tracing::error!(
                month = month.month,
                year = month.year,
                error = %message,
                "Monthly report failed"
            );
            db::reportage::insert_log(
                pool,
                month.month,
                month.year,
                recipient_count,
                Some(&message),
                now_millis(),
            )
            .await?;
            Err(ServiceError::App(AppError::with_message(
                ErrorCode::EmailSendFailed,
                message,
            )))
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn deliver(state: &AppState, month: MonthYear, recipients: &[String]) -> Result<(), BoxError> {
    let pool = &state.pool;
    let config = db::reportage::config(pool).await?;
    let stations = db::stations::list(pool).await?;
    let shifts = db::shifts::list_month_all_stations(pool, month.month, month.year).await?;
    let overtime = db::overtime::list_month_all_stations(pool, month.month, month.year).await?;
    let user_names: HashMap<i64, String> = db::users::list_all(pool)
        .await?
        .into_iter()
        .map(|u| (u.id, u.full_name()))
        .collect();

    let m = month.month as u32;
    let input = ReportInput {
        month: m,
        year: month.year,
        stations: &stations,
        shifts: &shifts,
        overtime: &overtime,
        user_names: &user_names,
        excluded_stations: &state.report_excluded_stations,
        tz: state.tz,
    };
    let attachment = Attachment {
        filename: report_filename(m, month.year),
        content_type: REPORT_CONTENT_TYPE.to_string(),
        data: render_workbook(&report_sheets(&input))?,
    };

    state
        .email
        .send_with_attachment(
            recipients,
            &render_template(&config.email_subject, m, month.year),
            &render_template(&config.email_body, m, month.year),
            &attachment,
        )
        .await
}

/// Hourly check: send last month's report on the configured day
pub async fn run_scheduled(state: &AppState) {
    if !state.email.is_configured() {
        return;
    }
    let config = match db::reportage::config(&state.pool).await {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load report config");
            return;
        }
    };
    let Some(month) = due_month(&config, today(state.tz)) else {
        return;
    };
    tracing::info!(month = month.month, year = month.year, "Sending scheduled monthly report");
    if let Err(e) = send_report(state, month).await {
        match e {
            ServiceError::App(err) => {
                tracing::warn!(code = ?err.code, message = %err.message, "Scheduled report not sent")
            }
            ServiceError::Db(err) => tracing::error!(error = %err, "Scheduled report failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn enabled(day: i32) -> ReportageConfig {
        ReportageConfig {
            enabled: true,
            days_after_month_end: day,
            ..Default::default()
        }
    }

    #[test]
    fn test_due_on_configured_day() {
        assert_eq!(
            due_month(&enabled(5), date(2025, 3, 5)),
            Some(MonthYear { month: 2, year: 2025 })
        );
        assert_eq!(due_month(&enabled(5), date(2025, 3, 6)), None);
    }

    #[test]
    fn test_january_reports_december() {
        assert_eq!(
            due_month(&enabled(1), date(2025, 1, 1)),
            Some(MonthYear { month: 12, year: 2024 })
        );
    }

    #[test]
    fn test_not_due_when_disabled_or_sent() {
        let mut config = enabled(5);
        config.last_sent_month = Some(2);
        config.last_sent_year = Some(2025);
        assert_eq!(due_month(&config, date(2025, 3, 5)), None);

        let disabled = ReportageConfig {
            days_after_month_end: 5,
            ..Default::default()
        };
        assert_eq!(due_month(&disabled, date(2025, 3, 5)), None);
    }

    #[test]
    fn test_run_guard_is_exclusive() {
        let flag = Arc::new(AtomicBool::new(false));
        let first = RunGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(RunGuard::acquire(&flag).is_none());
        drop(first);
        assert!(RunGuard::acquire(&flag).is_some());
    }
}
