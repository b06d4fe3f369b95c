//! Identity and pricing utilities.
//!
//! Client ids, shop ids and unit prices are derived from seed strings via a
//! stable hash, so the same session id always maps to the same shopper and
//! shop and the same SKU always carries the same price, across calls and
//! across process restarts.
//!
//! The hash is the SHA-1 digest of the UTF-8 text read as one big-endian
//! 160-bit integer. Reductions are exact (`digest mod n` over the full
//! integer), not a truncation of the digest.

use std::num::NonZeroU64;

use rand::Rng;
use rust_decimal::Decimal;
use sha1::{Digest, Sha1};
use smartshop_types::{ClientId, SessionId, ShopId, Sku};
use uuid::Uuid;

/// Number of distinct price points (one cent to one hundred units).
const PRICE_POINTS: NonZeroU64 = match NonZeroU64::new(10_000) {
    Some(n) => n,
    None => NonZeroU64::MIN,
};

/// Decimal places of a unit price.
const PRICE_SCALE: u32 = 2;

/// Stable digest of a string, usable as reproducible pseudo-randomness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StableHash([u8; 20]);

impl StableHash {
    /// Hash `text`.
    pub fn of(text: &str) -> Self {
        let digest = Sha1::digest(text.as_bytes());
        let mut bytes = [0_u8; 20];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Raw digest bytes, most significant first.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The digest, read as a big-endian integer, modulo `modulus`.
    pub fn reduce(&self, modulus: NonZeroU64) -> u64 {
        let m = u128::from(modulus.get());
        // acc < m <= u64::MAX, so acc * 256 + 255 always fits in u128.
        let acc = self.0.iter().fold(0_u128, |acc, &byte| {
            acc.saturating_mul(256)
                .saturating_add(u128::from(byte))
                .checked_rem(m)
                .unwrap_or(0)
        });
        u64::try_from(acc).unwrap_or(0)
    }
}

/// Sizes of the id spaces ids are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSpace {
    /// Number of distinct SKUs.
    pub max_skus: NonZeroU64,
    /// Number of distinct shops.
    pub max_shops: NonZeroU64,
    /// Number of distinct shoppers.
    pub max_clients: NonZeroU64,
}

/// Derive the shopper for a session: `User_<hash(session_id) mod max_clients>`.
pub fn derive_client_id(session_id: &SessionId, max_clients: NonZeroU64) -> ClientId {
    let n = StableHash::of(session_id.as_str()).reduce(max_clients);
    ClientId::new(format!("User_{n}"))
}

/// Derive the shop for a session: `SHOP_<hash(reversed session_id) mod max_shops>`.
///
/// Hashing the reversed id keeps shop assignment independent of the client
/// assignment for the same session.
pub fn derive_shop_id(session_id: &SessionId, max_shops: NonZeroU64) -> ShopId {
    let reversed: String = session_id.as_str().chars().rev().collect();
    let n = StableHash::of(&reversed).reduce(max_shops);
    ShopId::new(format!("SHOP_{n}"))
}

/// Pick a random SKU: `SKU_<hash(random uuid) mod max_skus>`.
pub fn new_sku(rng: &mut impl Rng, max_skus: NonZeroU64) -> Sku {
    let seed = random_uuid(rng).simple().to_string();
    let n = StableHash::of(&seed).reduce(max_skus);
    Sku::new(format!("SKU_{n}"))
}

/// Unit price of a SKU: `(1 + hash(sku) mod 10000) / 100`, in `[0.01, 100.00]`.
pub fn sku_unit_price(sku: &Sku) -> Decimal {
    let cents = StableHash::of(sku.as_str())
        .reduce(PRICE_POINTS)
        .saturating_add(1);
    Decimal::new(i64::try_from(cents).unwrap_or(i64::MAX), PRICE_SCALE)
}

/// A fresh session id: 128 random bits, lowercase hex without dashes.
pub fn new_session_id(rng: &mut impl Rng) -> SessionId {
    SessionId::new(random_uuid(rng).simple().to_string())
}

/// Random v4 UUID drawn from `rng`, so seeded runs stay reproducible.
fn random_uuid(rng: &mut impl Rng) -> Uuid {
    let bits: u128 = rng.random();
    uuid::Builder::from_random_bytes(bits.to_le_bytes()).into_uuid()
}
