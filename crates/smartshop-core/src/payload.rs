//! Payload builder.
//!
//! Turns session attributes into the [`Payload`] objects handed to the sink.
//! The `*_at` variants take the event time explicitly; the tick loop uses
//! them so every payload of one tick carries the tick's timestamp.

use chrono::{DateTime, Utc};
use smartshop_types::{ClientId, Payload, PayloadBody, SessionId, SessionStatus, Sku};

use crate::identity::{self, IdSpace};

/// Build a status payload stamped with the current time.
///
/// See [`status_payload_at`].
pub fn status_payload(
    session_id: &SessionId,
    client_id: Option<&ClientId>,
    status: Option<SessionStatus>,
    ids: &IdSpace,
) -> Payload {
    status_payload_at(session_id, client_id, status, ids, Utc::now())
}

/// Build a status payload.
///
/// Always carries `ts` and `session_id`. With a `status`, it also carries
/// the client id (derived from the session id when `client_id` is `None`),
/// the status and the shop id derived from the session id. Without a
/// status the result is a bare heartbeat.
pub fn status_payload_at(
    session_id: &SessionId,
    client_id: Option<&ClientId>,
    status: Option<SessionStatus>,
    ids: &IdSpace,
    ts: DateTime<Utc>,
) -> Payload {
    let body = match status {
        Some(status) => PayloadBody::Status {
            client_id: client_id.cloned().unwrap_or_else(|| {
                identity::derive_client_id(session_id, ids.max_clients)
            }),
            status,
            shop_id: identity::derive_shop_id(session_id, ids.max_shops),
        },
        None => PayloadBody::Heartbeat {},
    };
    Payload {
        ts: ts.timestamp_millis(),
        session_id: session_id.clone(),
        body,
    }
}

/// Build a basket payload stamped with the current time.
///
/// See [`basket_payload_at`].
pub fn basket_payload(session_id: &SessionId, sku: &Sku, qty: i64) -> Payload {
    basket_payload_at(session_id, sku, qty, Utc::now())
}

/// Build a basket payload: the heartbeat header plus `sku`, the signed
/// `qty` delta, and the SKU's unit price.
///
/// Basket payloads carry no client or shop id.
pub fn basket_payload_at(
    session_id: &SessionId,
    sku: &Sku,
    qty: i64,
    ts: DateTime<Utc>,
) -> Payload {
    Payload {
        ts: ts.timestamp_millis(),
        session_id: session_id.clone(),
        body: PayloadBody::Basket {
            sku: sku.clone(),
            qty,
            unit_price: identity::sku_unit_price(sku),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use chrono::TimeZone as _;
    use smartshop_types::Topic;

    use super::*;

    fn ids() -> IdSpace {
        let n = NonZeroU64::new(100).unwrap_or(NonZeroU64::MIN);
        IdSpace {
            max_skus: n,
            max_shops: n,
            max_clients: n,
        }
    }

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn check_in_payload_derives_missing_client_id() {
        let session = SessionId::new("feedface");
        let payload = status_payload_at(&session, None, Some(SessionStatus::CheckIn), &ids(), ts());

        assert_eq!(payload.ts, 1_700_000_000_123);
        assert!(payload.matches_topic(Topic::Checkin));
        let expected_client = identity::derive_client_id(&session, ids().max_clients);
        let expected_shop = identity::derive_shop_id(&session, ids().max_shops);
        assert!(matches!(
            &payload.body,
            PayloadBody::Status { client_id, shop_id, .. }
                if *client_id == expected_client && *shop_id == expected_shop
        ));
    }

    #[test]
    fn supplied_client_id_is_kept() {
        let session = SessionId::new("feedface");
        let client = ClientId::new("User_custom");
        let payload = status_payload_at(
            &session,
            Some(&client),
            Some(SessionStatus::CheckOut),
            &ids(),
            ts(),
        );
        assert!(matches!(
            payload.body,
            PayloadBody::Status { ref client_id, status: SessionStatus::CheckOut, .. } if *client_id == client
        ));
    }

    #[test]
    fn no_status_yields_heartbeat() {
        let payload = status_payload(&SessionId::new("s"), None, None, &ids());
        assert_eq!(payload.body, PayloadBody::Heartbeat {});
        assert_eq!(payload.status(), None);
    }

    #[test]
    fn basket_payload_prices_by_sku_only() {
        let session = SessionId::new("s");
        let sku = Sku::new("SKU_12");
        let added = basket_payload_at(&session, &sku, 3, ts());
        let removed = basket_payload(&session, &sku, -1);

        assert_eq!(added.qty(), Some(3));
        assert_eq!(removed.qty(), Some(-1));
        let price = |p: &Payload| match &p.body {
            PayloadBody::Basket { unit_price, .. } => Some(*unit_price),
            _ => None,
        };
        assert_eq!(price(&added), price(&removed));
        assert_eq!(price(&added), Some(identity::sku_unit_price(&sku)));
    }
}
