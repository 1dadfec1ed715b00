//! Swap requests, offers and the approval transaction

use shared::models::{OfferStatus, SwapOffer, SwapRequest, SwapStatus};
use sqlx::PgPool;

const REQUEST_COLUMNS: &str = "id, station_id, requester_id, requester_shift_id, target_user_id, \
     target_shift_id, is_open, status, requester_note, admin_note, approved_by, created_at, updated_at";

const OFFER_COLUMNS: &str =
    "id, request_id, offerer_id, offerer_shift_id, note, status, created_at, updated_at";

const ACTIVE: &str = "status IN ('pending', 'offer_selected')";

pub struct NewSwapRequest<'a> {
    pub station_id: i64,
    pub requester_id: i64,
    pub requester_shift_id: i64,
    pub target_user_id: Option<i64>,
    pub target_shift_id: Option<i64>,
    pub is_open: bool,
    pub requester_note: Option<&'a str>,
}

/// Result of the approval transaction
#[derive(Debug)]
pub enum ApproveOutcome {
    Approved(SwapRequest),
    NotFound,
    /// Not in a state an admin can approve
    InvalidState,
    /// A shift no longer belongs to the expected user
    ShiftChanged,
    /// A shift has started in the meantime
    ShiftStarted,
}

/// Locked state of a shift taking part in an approval
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct LockedShift {
    pub user_id: Option<i64>,
    pub start_time: i64,
}

/// Why a shift cannot be moved to its new owner, if it cannot
fn swap_blocker(shift: Option<LockedShift>, owner_id: i64, now: i64) -> Option<ApproveOutcome> {
    match shift {
        Some(s) if s.user_id != Some(owner_id) => Some(ApproveOutcome::ShiftChanged),
        Some(s) if s.start_time <= now => Some(ApproveOutcome::ShiftStarted),
        Some(_) => None,
        None => Some(ApproveOutcome::ShiftChanged),
    }
}

async fn lock_shift(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: i64,
) -> Result<Option<LockedShift>, sqlx::Error> {
    sqlx::query_as("SELECT user_id, start_time FROM shifts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn find_request(pool: &PgPool, id: i64) -> Result<Option<SwapRequest>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {REQUEST_COLUMNS} FROM shift_swap_requests WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn has_active_request(pool: &PgPool, shift_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(&format!(
        "SELECT EXISTS (SELECT 1 FROM shift_swap_requests WHERE requester_shift_id = $1 AND {ACTIVE})"
    ))
    .bind(shift_id)
    .fetch_one(pool)
    .await
}

pub async fn create_request(
    pool: &PgPool,
    data: &NewSwapRequest<'_>,
    now: i64,
) -> Result<SwapRequest, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO shift_swap_requests (station_id, requester_id, requester_shift_id, target_user_id,
                                         target_shift_id, is_open, status, requester_note, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $8)
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(data.station_id)
    .bind(data.requester_id)
    .bind(data.requester_shift_id)
    .bind(data.target_user_id)
    .bind(data.target_shift_id)
    .bind(data.is_open)
    .bind(data.requester_note)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Requests the user made or is the target of
pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<SwapRequest>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        SELECT {REQUEST_COLUMNS} FROM shift_swap_requests
        WHERE requester_id = $1 OR target_user_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Direct requests still pending and open requests with a selected offer
pub async fn list_awaiting_approval(pool: &PgPool, station_id: i64) -> Result<Vec<SwapRequest>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        SELECT {REQUEST_COLUMNS} FROM shift_swap_requests
        WHERE station_id = $1
          AND ((status = 'pending' AND NOT is_open AND target_user_id IS NOT NULL)
               OR status = 'offer_selected')
        ORDER BY created_at
        "#
    ))
    .bind(station_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_station(pool: &PgPool, station_id: i64) -> Result<Vec<SwapRequest>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {REQUEST_COLUMNS} FROM shift_swap_requests WHERE station_id = $1 ORDER BY created_at DESC"
    ))
    .bind(station_id)
    .fetch_all(pool)
    .await
}

/// Open, pending requests of colleagues
pub async fn list_open_for_station(
    pool: &PgPool,
    station_id: i64,
    exclude_user: i64,
) -> Result<Vec<SwapRequest>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        SELECT {REQUEST_COLUMNS} FROM shift_swap_requests
        WHERE station_id = $1 AND is_open AND status = 'pending' AND requester_id <> $2
        ORDER BY created_at
        "#
    ))
    .bind(station_id)
    .bind(exclude_user)
    .fetch_all(pool)
    .await
}

pub async fn list_open_by_requester(pool: &PgPool, user_id: i64) -> Result<Vec<SwapRequest>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {REQUEST_COLUMNS} FROM shift_swap_requests WHERE requester_id = $1 AND is_open ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Move a request from one of `from` to `to`, stamping the admin decision.
/// Returns `None` when the request was not in an allowed state.
pub async fn transition(
    pool: &PgPool,
    id: i64,
    from: &[SwapStatus],
    to: SwapStatus,
    admin_note: Option<&str>,
    now: i64,
) -> Result<Option<SwapRequest>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE shift_swap_requests SET
            status = $2,
            admin_note = COALESCE($3, admin_note),
            updated_at = $4
        WHERE id = $1 AND status = ANY($5)
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(to)
    .bind(admin_note)
    .bind(now)
    .bind(from)
    .fetch_optional(pool)
    .await
}

/// Only finished requests may be removed
pub async fn delete_finished(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM shift_swap_requests WHERE id = $1 AND status IN ('cancelled', 'rejected')",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Execute an approved swap in one transaction
pub async fn approve(
    pool: &PgPool,
    id: i64,
    approved_by: i64,
    admin_note: Option<&str>,
    now: i64,
) -> Result<ApproveOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let request: Option<SwapRequest> = sqlx::query_as(&format!(
        "SELECT {REQUEST_COLUMNS} FROM shift_swap_requests WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(request) = request else {
        return Ok(ApproveOutcome::NotFound);
    };
    if !request.awaiting_approval() {
        return Ok(ApproveOutcome::InvalidState);
    }
    let Some(target_user_id) = request.target_user_id else {
        return Ok(ApproveOutcome::InvalidState);
    };

    let requester_shift = lock_shift(&mut tx, request.requester_shift_id).await?;
    if let Some(blocker) = swap_blocker(requester_shift, request.requester_id, now) {
        return Ok(blocker);
    }
    if let Some(target_shift_id) = request.target_shift_id {
        let target_shift = lock_shift(&mut tx, target_shift_id).await?;
        if let Some(blocker) = swap_blocker(target_shift, target_user_id, now) {
            return Ok(blocker);
        }
    }

    let reassign = "UPDATE shifts SET user_id = $2, status = 'planned', reminder_sent_at = NULL, updated_at = $3 WHERE id = $1";
    sqlx::query(reassign)
        .bind(request.requester_shift_id)
        .bind(target_user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    if let Some(target_shift_id) = request.target_shift_id {
        sqlx::query(reassign)
            .bind(target_shift_id)
            .bind(request.requester_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    let approved: SwapRequest = sqlx::query_as(&format!(
        r#"
        UPDATE shift_swap_requests SET
            status = 'approved', approved_by = $2, admin_note = COALESCE($3, admin_note), updated_at = $4
        WHERE id = $1
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(approved_by)
    .bind(admin_note)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    // Other requests on the moved shifts are stale now
    sqlx::query(&format!(
        r#"
        UPDATE shift_swap_requests SET status = 'cancelled', updated_at = $3
        WHERE id <> $1 AND {ACTIVE}
          AND (requester_shift_id = $2 OR requester_shift_id = $4)
        "#
    ))
    .bind(id)
    .bind(request.requester_shift_id)
    .bind(now)
    .bind(request.target_shift_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(ApproveOutcome::Approved(approved))
}

// ── Offers ──

pub async fn find_offer(pool: &PgPool, id: i64) -> Result<Option<SwapOffer>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {OFFER_COLUMNS} FROM shift_swap_offers WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_offers(pool: &PgPool, request_ids: &[i64]) -> Result<Vec<SwapOffer>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {OFFER_COLUMNS} FROM shift_swap_offers WHERE request_id = ANY($1) ORDER BY created_at"
    ))
    .bind(request_ids)
    .fetch_all(pool)
    .await
}

pub async fn create_offer(
    pool: &PgPool,
    request_id: i64,
    offerer_id: i64,
    offerer_shift_id: Option<i64>,
    note: Option<&str>,
    now: i64,
) -> Result<SwapOffer, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO shift_swap_offers (request_id, offerer_id, offerer_shift_id, note, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'pending', $5, $5)
        RETURNING {OFFER_COLUMNS}
        "#
    ))
    .bind(request_id)
    .bind(offerer_id)
    .bind(offerer_shift_id)
    .bind(note)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn set_offer_status(
    pool: &PgPool,
    id: i64,
    from: OfferStatus,
    to: OfferStatus,
    now: i64,
) -> Result<Option<SwapOffer>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE shift_swap_offers SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2 RETURNING {OFFER_COLUMNS}"
    ))
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Offers still pending next to the accepted one
fn competing_offers(offers: &[SwapOffer], accepted_id: i64) -> Vec<i64> {
    offers
        .iter()
        .filter(|o| o.id != accepted_id && o.status == OfferStatus::Pending)
        .map(|o| o.id)
        .collect()
}

/// Accept an offer: the request takes the offer's user and shift, moves
/// to `offer_selected`, and competing offers are rejected.
/// Returns `None` when the request or offer is no longer pending.
pub async fn accept_offer(
    pool: &PgPool,
    offer: &SwapOffer,
    now: i64,
) -> Result<Option<SwapRequest>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let accepted = sqlx::query(
        "UPDATE shift_swap_offers SET status = 'accepted', updated_at = $2 WHERE id = $1 AND status = 'pending'",
    )
    .bind(offer.id)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    if accepted.rows_affected() == 0 {
        return Ok(None);
    }

    let request: Option<SwapRequest> = sqlx::query_as(&format!(
        r#"
        UPDATE shift_swap_requests SET
            status = 'offer_selected', target_user_id = $2, target_shift_id = $3, updated_at = $4
        WHERE id = $1 AND status = 'pending' AND is_open
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(offer.request_id)
    .bind(offer.offerer_id)
    .bind(offer.offerer_shift_id)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(request) = request else {
        return Ok(None);
    };

    let offers: Vec<SwapOffer> = sqlx::query_as(&format!(
        "SELECT {OFFER_COLUMNS} FROM shift_swap_offers WHERE request_id = $1 FOR UPDATE"
    ))
    .bind(offer.request_id)
    .fetch_all(&mut *tx)
    .await?;
    sqlx::query("UPDATE shift_swap_offers SET status = 'rejected', updated_at = $2 WHERE id = ANY($1)")
        .bind(competing_offers(&offers, offer.id))
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SCHEMA;

    #[test]
    fn test_competing_offers() {
        let offer = |id, status| SwapOffer {
            id,
            request_id: 1,
            offerer_id: 20 + id,
            offerer_shift_id: None,
            note: None,
            status,
            created_at: 0,
            updated_at: 0,
        };
        let offers = vec![
            offer(1, OfferStatus::Accepted),
            offer(2, OfferStatus::Pending),
            offer(3, OfferStatus::Withdrawn),
            offer(4, OfferStatus::Pending),
        ];
        assert_eq!(competing_offers(&offers, 1), vec![2, 4]);
        assert_eq!(competing_offers(&offers, 2), vec![4]);
    }

    #[test]
    fn test_swap_blocker() {
        let now = 1_000;
        let shift = |user_id, start_time| Some(LockedShift { user_id, start_time });

        assert!(swap_blocker(shift(Some(5), now + 1), 5, now).is_none());
        assert!(matches!(
            swap_blocker(shift(Some(6), now + 1), 5, now),
            Some(ApproveOutcome::ShiftChanged)
        ));
        assert!(matches!(
            swap_blocker(shift(None, now + 1), 5, now),
            Some(ApproveOutcome::ShiftChanged)
        ));
        assert!(matches!(swap_blocker(None, 5, now), Some(ApproveOutcome::ShiftChanged)));
        assert!(matches!(
            swap_blocker(shift(Some(5), now), 5, now),
            Some(ApproveOutcome::ShiftStarted)
        ));
    }

    #[test]
    fn test_one_active_request_per_shift_enforced_by_index() {
        let index = format!(
            "CREATE UNIQUE INDEX idx_swap_requests_active_shift ON shift_swap_requests (requester_shift_id)\n    WHERE {ACTIVE};"
        );
        assert!(SCHEMA.contains(&index), "partial unique index must cover {ACTIVE}");
    }
}
