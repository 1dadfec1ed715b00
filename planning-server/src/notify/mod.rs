//! Notifications: inbox storage plus Web Push delivery
//!
//! Every notice is written to the recipient's inbox, then sent encrypted
//! to each of their push subscriptions.

mod ece;
pub mod messages;
pub mod push;
pub mod vapid;

use sqlx::PgPool;

use crate::db;
pub use messages::Notice;
pub use push::{PushOutcome, PushPayload, PushService};

#[derive(Clone)]
pub struct Notifier {
    pool: PgPool,
    push: PushService,
}

impl Notifier {
    pub fn new(pool: PgPool, push: PushService) -> Self {
        Self { pool, push }
    }

    pub fn push(&self) -> &PushService {
        &self.push
    }

    /// Deliver to one user if their preferences allow it.
    /// Returns whether the notice was stored.
    pub async fn notify_user(&self, user_id: i64, notice: &Notice) -> bool {
        let prefs = match db::notifications::preferences(&self.pool, user_id).await {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load notification preferences");
                return false;
            }
        };
        if !notice.kind.allowed_by(&prefs) {
            tracing::debug!(user_id, kind = notice.kind.as_str(), "Notification muted by preferences");
            return false;
        }

        let stored = match db::notifications::insert_inbox(
            &self.pool,
            user_id,
            notice.kind.as_str(),
            &notice.title,
            &notice.body,
            notice.url.as_deref(),
            shared::util::now_millis(),
        )
        .await
        {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to store notification");
                return false;
            }
        };

        if self.push.is_configured() {
            match serde_json::to_vec(&PushPayload::new(notice, stored.id)) {
                Ok(payload) => self.push_to_user(user_id, &payload).await,
                Err(e) => tracing::warn!(user_id, error = %e, "Failed to encode push payload"),
            }
        }
        true
    }

    /// Deliver to several users; returns how many received it
    pub async fn notify_users(&self, user_ids: &[i64], notice: &Notice) -> usize {
        let mut delivered = 0;
        for &user_id in user_ids {
            if self.notify_user(user_id, notice).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Fire-and-forget delivery from request handlers
    pub fn spawn_notify(&self, user_ids: Vec<i64>, notice: Notice) {
        let notifier = self.clone();
        tokio::spawn(async move {
            let delivered = notifier.notify_users(&user_ids, &notice).await;
            tracing::debug!(kind = notice.kind.as_str(), delivered, "Notifications sent");
        });
    }

    async fn push_to_user(&self, user_id: i64, payload: &[u8]) {
        let subscriptions = match db::push_subscriptions::list_for_user(&self.pool, user_id).await {
            Ok(subs) => subs,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load push subscriptions");
                return;
            }
        };

        for subscription in subscriptions {
            match self.push.send(&subscription, payload).await {
                PushOutcome::Delivered => {}
                PushOutcome::Gone => {
                    tracing::info!(user_id, subscription_id = subscription.id, "Removing expired push subscription");
                    if let Err(e) = db::push_subscriptions::delete_by_id(&self.pool, subscription.id).await {
                        tracing::warn!(error = %e, "Failed to remove push subscription");
                    }
                }
                PushOutcome::Failed(reason) => {
                    tracing::warn!(user_id, subscription_id = subscription.id, %reason, "Push delivery failed");
                }
            }
        }
    }
}
