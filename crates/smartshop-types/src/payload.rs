//! Event payloads emitted by the simulation.
//!
//! Every payload starts with the same header (`ts`, `session_id`). The body
//! decides the shape:
//!
//! - **Status** -- check-in / check-out: `client_id`, `status`, `shop_id`.
//! - **Basket** -- one SKU delta: `sku`, `qty`, `unit_price`.
//! - **Heartbeat** -- header only.
//!
//! The body is flattened into the header so the JSON form is a single flat
//! object, e.g. `{"ts":1700000000000,"session_id":"..","sku":"SKU_4","qty":-2,"unit_price":17.35}`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{SessionStatus, Topic};
use crate::ids::{ClientId, SessionId, ShopId, Sku};

/// A single event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Event time in milliseconds since the Unix epoch.
    pub ts: i64,
    /// Session the event belongs to. Also used as the message key.
    pub session_id: SessionId,
    /// Event-specific fields.
    #[serde(flatten)]
    pub body: PayloadBody,
}

/// Event-specific part of a [`Payload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadBody {
    /// Check-in or check-out.
    Status {
        /// Shopper the session belongs to.
        client_id: ClientId,
        /// Check-in (`1`) or check-out (`-1`).
        status: SessionStatus,
        /// Shop the session takes place in.
        shop_id: ShopId,
    },
    /// Signed quantity change for one SKU.
    Basket {
        /// The SKU whose quantity changed.
        sku: Sku,
        /// Units added (positive) or removed (negative).
        qty: i64,
        /// Price of a single unit, independent of `qty`.
        #[serde(with = "rust_decimal::serde::float")]
        unit_price: Decimal,
    },
    /// Header-only payload.
    Heartbeat {},
}

impl Payload {
    /// Status carried by this payload, if it is a status event.
    pub const fn status(&self) -> Option<SessionStatus> {
        match &self.body {
            PayloadBody::Status { status, .. } => Some(*status),
            PayloadBody::Basket { .. } | PayloadBody::Heartbeat {} => None,
        }
    }

    /// Signed basket delta, if this is a basket event.
    pub const fn qty(&self) -> Option<i64> {
        match &self.body {
            PayloadBody::Basket { qty, .. } => Some(*qty),
            PayloadBody::Status { .. } | PayloadBody::Heartbeat {} => None,
        }
    }

    /// SKU of a basket event.
    pub const fn sku(&self) -> Option<&Sku> {
        match &self.body {
            PayloadBody::Basket { sku, .. } => Some(sku),
            PayloadBody::Status { .. } | PayloadBody::Heartbeat {} => None,
        }
    }

    /// Whether this payload has the shape expected on `topic`.
    ///
    /// Basket topics accept basket bodies only; check-in and check-out
    /// topics accept status bodies with the matching status.
    pub const fn matches_topic(&self, topic: Topic) -> bool {
        match (&self.body, topic) {
            (PayloadBody::Basket { .. }, Topic::Basket) => true,
            (PayloadBody::Status { status, .. }, Topic::Checkin) => {
                matches!(status, SessionStatus::CheckIn)
            }
            (PayloadBody::Status { status, .. }, Topic::Checkout) => {
                matches!(status, SessionStatus::CheckOut)
            }
            _ => false,
        }
    }
}
