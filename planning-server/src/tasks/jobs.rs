//! The server's scheduled jobs

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::scheduling::calendar::duration_until_next_local;
use crate::services::{reminders, reportage};
use crate::state::AppState;

use super::{BackgroundTasks, TaskKind};

const REMINDER_INTERVAL: Duration = Duration::from_secs(15 * 60);
const REPORTAGE_INTERVAL: Duration = Duration::from_secs(60 * 60);
const REPORTAGE_FIRST_DELAY: Duration = Duration::from_secs(30);
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const DEADLINE_CHECK_HOUR: u32 = 9;

/// Run `job` after `first_delay`, then every `period`, until cancelled
async fn every<F, Fut>(token: CancellationToken, first_delay: Duration, period: Duration, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let start = tokio::time::Instant::now() + first_delay;
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = interval.tick() => job().await,
        }
    }
}

/// Register every job on `tasks`
pub fn register_all(tasks: &mut BackgroundTasks, state: &AppState) {
    let token = tasks.shutdown_token();
    let s = state.clone();
    tasks.spawn("deadline_check", TaskKind::Daily, async move {
        reminders::check_deadlines(&s).await;
        loop {
            let wait = duration_until_next_local(
                chrono::Utc::now().with_timezone(&s.tz),
                DEADLINE_CHECK_HOUR,
                0,
            );
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(wait) => reminders::check_deadlines(&s).await,
            }
        }
    });

    let token = tasks.shutdown_token();
    let s = state.clone();
    tasks.spawn("shift_reminders", TaskKind::Periodic, async move {
        every(token, Duration::ZERO, REMINDER_INTERVAL, || {
            reminders::send_shift_reminders(&s)
        })
        .await;
    });

    let token = tasks.shutdown_token();
    let s = state.clone();
    tasks.spawn("reportage_check", TaskKind::Periodic, async move {
        every(token, REPORTAGE_FIRST_DELAY, REPORTAGE_INTERVAL, || {
            reportage::run_scheduled(&s)
        })
        .await;
    });

    let token = tasks.shutdown_token();
    let limiter = state.rate_limiter.clone();
    tasks.spawn("rate_limiter_cleanup", TaskKind::Periodic, async move {
        every(token, LIMITER_CLEANUP_INTERVAL, LIMITER_CLEANUP_INTERVAL, || {
            limiter.cleanup()
        })
        .await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_every_runs_until_cancelled() {
        let token = CancellationToken::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let handle = tokio::spawn(every(
            token.clone(),
            Duration::from_millis(50),
            Duration::from_millis(20),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        ));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(runs.load(Ordering::SeqCst) >= 2);

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
