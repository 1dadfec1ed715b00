//! Monthly report (reportage) models

use serde::{Deserialize, Serialize};

pub const DEFAULT_REPORT_SUBJECT: &str = "Maandelijkse Shift Rapportage - {maand} {jaar}";
pub const DEFAULT_REPORT_BODY: &str = "Beste,\n\nIn bijlage vindt u de maandelijkse shift rapportage voor alle stations.\n\nMet vriendelijke groeten,\nPlanning";

/// Singleton report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ReportageConfig {
    pub enabled: bool,
    /// Day of month on which the previous month's report is sent
    pub days_after_month_end: i32,
    pub email_subject: String,
    pub email_body: String,
    pub last_sent_month: Option<i32>,
    pub last_sent_year: Option<i32>,
    pub updated_at: i64,
}

impl Default for ReportageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            days_after_month_end: 5,
            email_subject: DEFAULT_REPORT_SUBJECT.to_string(),
            email_body: DEFAULT_REPORT_BODY.to_string(),
            last_sent_month: None,
            last_sent_year: None,
            updated_at: 0,
        }
    }
}

impl ReportageConfig {
    pub fn already_sent(&self, month: i32, year: i32) -> bool {
        self.last_sent_month == Some(month) && self.last_sent_year == Some(year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportageConfigUpdate {
    pub enabled: Option<bool>,
    pub days_after_month_end: Option<i32>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ReportageRecipient {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportageRecipientCreate {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportageRecipientUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// One send attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ReportageLog {
    pub id: i64,
    pub month: i32,
    pub year: i32,
    pub recipient_count: i32,
    /// `success` or `failed`
    pub status: String,
    pub error_message: Option<String>,
    pub sent_at: i64,
}

/// Month/year selector used by several endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthYear {
    pub month: i32,
    pub year: i32,
}

impl MonthYear {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=12).contains(&self.month) {
            return Err("month must be between 1 and 12".to_string());
        }
        if !(2000..=2100).contains(&self.year) {
            return Err("year out of range".to_string());
        }
        Ok(())
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                month: 12,
                year: self.year - 1,
            }
        } else {
            Self {
                month: self.month - 1,
                year: self.year,
            }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                month: 1,
                year: self.year + 1,
            }
        } else {
            Self {
                month: self.month + 1,
                year: self.year,
            }
        }
    }
}

/// System-wide key/value setting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_year_wraps() {
        let jan = MonthYear { month: 1, year: 2025 };
        assert_eq!(jan.previous(), MonthYear { month: 12, year: 2024 });
        let dec = MonthYear { month: 12, year: 2024 };
        assert_eq!(dec.next(), jan);
        assert!(MonthYear { month: 13, year: 2025 }.validate().is_err());
        assert!(jan.validate().is_ok());
    }

    #[test]
    fn test_already_sent() {
        let mut cfg = ReportageConfig::default();
        assert!(!cfg.already_sent(3, 2025));
        cfg.last_sent_month = Some(3);
        cfg.last_sent_year = Some(2025);
        assert!(cfg.already_sent(3, 2025));
        assert!(!cfg.already_sent(3, 2024));
    }
}
