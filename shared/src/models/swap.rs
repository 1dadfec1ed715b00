//! Shift Swap Models

use serde::{Deserialize, Serialize};

/// Swap request lifecycle
///
/// ```text
/// pending ──> offer_selected ──> approved | rejected
///    │              │
///    └──────────────┴──> cancelled | rejected
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "swap_status", rename_all = "snake_case"))]
pub enum SwapStatus {
    Pending,
    OfferSelected,
    Approved,
    Rejected,
    Cancelled,
}

impl SwapStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: SwapStatus) -> bool {
        use SwapStatus::*;
        matches!(
            (self, next),
            (Pending, OfferSelected)
                | (Pending, Approved)
                | (OfferSelected, Approved)
                | (Pending, Rejected)
                | (OfferSelected, Rejected)
                | (Pending, Cancelled)
                | (OfferSelected, Cancelled)
        )
    }
}

/// Offer lifecycle: pending -> accepted | rejected | withdrawn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "offer_status", rename_all = "lowercase"))]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

/// Swap request
///
/// Direct requests name `target_user_id` up front. Open requests
/// (`is_open`) collect offers; accepting one fills in the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SwapRequest {
    pub id: i64,
    pub station_id: i64,
    pub requester_id: i64,
    pub requester_shift_id: i64,
    pub target_user_id: Option<i64>,
    pub target_shift_id: Option<i64>,
    pub is_open: bool,
    pub status: SwapStatus,
    pub requester_note: Option<String>,
    pub admin_note: Option<String>,
    pub approved_by: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SwapRequest {
    /// Ready for an admin decision
    pub fn awaiting_approval(&self) -> bool {
        match self.status {
            SwapStatus::Pending => !self.is_open && self.target_user_id.is_some(),
            SwapStatus::OfferSelected => true,
            _ => false,
        }
    }
}

/// Offer made on an open swap request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SwapOffer {
    pub id: i64,
    pub request_id: i64,
    pub offerer_id: i64,
    /// Shift given in return, `None` to simply take over
    pub offerer_shift_id: Option<i64>,
    pub note: Option<String>,
    pub status: OfferStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Open request together with its offers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequestWithOffers {
    #[serde(flatten)]
    pub request: SwapRequest,
    pub offers: Vec<SwapOffer>,
}

/// Direct swap request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequestCreate {
    pub requester_shift_id: i64,
    pub target_user_id: i64,
    pub target_shift_id: Option<i64>,
    pub requester_note: Option<String>,
}

/// Open swap request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSwapRequestCreate {
    pub requester_shift_id: i64,
    pub requester_note: Option<String>,
}

/// Offer payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SwapOfferCreate {
    pub offerer_shift_id: Option<i64>,
    pub note: Option<String>,
}

/// Admin decision payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SwapDecision {
    pub admin_note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_exits() {
        let all = [
            SwapStatus::Pending,
            SwapStatus::OfferSelected,
            SwapStatus::Approved,
            SwapStatus::Rejected,
            SwapStatus::Cancelled,
        ];
        for from in all.iter().filter(|s| s.is_terminal()) {
            for to in all {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(SwapStatus::Pending.can_transition_to(SwapStatus::OfferSelected));
        assert!(SwapStatus::OfferSelected.can_transition_to(SwapStatus::Approved));
        assert!(SwapStatus::OfferSelected.can_transition_to(SwapStatus::Cancelled));
        assert!(!SwapStatus::OfferSelected.can_transition_to(SwapStatus::Pending));
        assert!(!SwapStatus::Pending.can_transition_to(SwapStatus::Pending));
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&SwapStatus::OfferSelected).unwrap(),
            "\"offer_selected\""
        );
        assert_eq!(
            serde_json::to_string(&OfferStatus::Withdrawn).unwrap(),
            "\"withdrawn\""
        );
    }

    #[test]
    fn test_awaiting_approval() {
        let mut req = SwapRequest {
            id: 1,
            station_id: 1,
            requester_id: 2,
            requester_shift_id: 10,
            target_user_id: None,
            target_shift_id: None,
            is_open: true,
            status: SwapStatus::Pending,
            requester_note: None,
            admin_note: None,
            approved_by: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(!req.awaiting_approval());
        req.status = SwapStatus::OfferSelected;
        req.target_user_id = Some(3);
        assert!(req.awaiting_approval());

        req.is_open = false;
        req.status = SwapStatus::Pending;
        assert!(req.awaiting_approval());
        req.status = SwapStatus::Cancelled;
        assert!(!req.awaiting_approval());
    }
}
