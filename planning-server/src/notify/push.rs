//! Web Push delivery with encrypted payloads

use serde::Serialize;
use shared::models::PushSubscription;

use super::ece;
use super::messages::Notice;
use super::vapid::VapidSigner;

/// Messages are kept by the push service for one day
const PUSH_TTL_SECS: &str = "86400";

const ICON: &str = "/icon-192x192.png";
const BADGE: &str = "/badge-72x72.png";

/// JSON shown by the service worker
#[derive(Debug, Serialize)]
pub struct PushPayload<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub icon: &'static str,
    pub badge: &'static str,
    pub url: &'a str,
    pub data: PushData,
}

#[derive(Debug, Serialize)]
pub struct PushData {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Inbox row holding the same message
    pub notification_id: i64,
}

impl<'a> PushPayload<'a> {
    pub fn new(notice: &'a Notice, notification_id: i64) -> Self {
        Self {
            title: &notice.title,
            body: &notice.body,
            icon: ICON,
            badge: BADGE,
            url: notice.url.as_deref().unwrap_or("/"),
            data: PushData {
                kind: notice.kind.as_str(),
                notification_id,
            },
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// Subscription expired or was revoked (404 / 410)
    Gone,
    Failed(String),
}

/// Map a push service response status to an outcome
pub fn classify_status(status: reqwest::StatusCode) -> PushOutcome {
    match status.as_u16() {
        200..=299 => PushOutcome::Delivered,
        404 | 410 => PushOutcome::Gone,
        other => PushOutcome::Failed(format!("push service answered {other}")),
    }
}

#[derive(Clone)]
pub struct PushService {
    http: reqwest::Client,
    signer: Option<VapidSigner>,
}

impl PushService {
    pub fn new(signer: Option<VapidSigner>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { http, signer }
    }

    pub fn is_configured(&self) -> bool {
        self.signer.is_some()
    }

    pub fn public_key(&self) -> Option<&str> {
        self.signer.as_ref().map(|s| s.public_key())
    }

    /// Encrypt `payload` for the subscription and post it to its endpoint
    pub async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> PushOutcome {
        let Some(signer) = &self.signer else {
            return PushOutcome::Failed("push is not configured".to_string());
        };
        let body = match ece::encrypt(&subscription.p256dh, &subscription.auth, payload) {
            Ok(body) => body,
            Err(e) => return PushOutcome::Failed(e.to_string()),
        };
        let authorization =
            match signer.authorization(&subscription.endpoint, chrono::Utc::now().timestamp()) {
                Ok(value) => value,
                Err(e) => return PushOutcome::Failed(e),
            };

        let result = self
            .http
            .post(&subscription.endpoint)
            .header("Authorization", authorization)
            .header("TTL", PUSH_TTL_SECS)
            .header("Urgency", "normal")
            .header("Content-Encoding", "aes128gcm")
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) => classify_status(response.status()),
            Err(e) => PushOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::CREATED), PushOutcome::Delivered);
        assert_eq!(classify_status(StatusCode::OK), PushOutcome::Delivered);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), PushOutcome::Gone);
        assert_eq!(classify_status(StatusCode::GONE), PushOutcome::Gone);
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            PushOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_payload_json() {
        let notice = crate::notify::messages::shift_reminder(shared::models::ShiftType::Day, "07:00");
        let json = serde_json::to_value(PushPayload::new(&notice, 42)).unwrap();
        assert_eq!(json["title"], "Herinnering shift");
        assert_eq!(json["url"], "/schedule");
        assert_eq!(json["icon"], ICON);
        assert_eq!(json["data"]["type"], "shift_reminder");
        assert_eq!(json["data"]["notification_id"], 42);

        let manual = crate::notify::messages::manual("Info", "Vergadering om 20u");
        let json = serde_json::to_value(PushPayload::new(&manual, 1)).unwrap();
        assert_eq!(json["url"], "/");
    }

    #[tokio::test]
    async fn test_send_without_signer_fails() {
        let service = PushService::new(None);
        assert!(!service.is_configured());
        let sub = PushSubscription {
            id: 1,
            user_id: 1,
            endpoint: "https://push.example.org/abc".into(),
            p256dh: "key".into(),
            auth: "auth".into(),
            created_at: 0,
        };
        assert!(matches!(service.send(&sub, b"{}").await, PushOutcome::Failed(_)));
    }
}
