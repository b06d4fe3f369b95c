//! In-memory session store.
//!
//! The store owns every open [`Session`] exclusively. It is only touched by
//! the tick loop, so it needs no locking. Sessions are kept in a
//! [`BTreeMap`] keyed by session id; iteration order carries no meaning,
//! every expiry and update decision is a timestamp comparison.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom as _;
use smartshop_types::{ClientId, SessionId, Sku};

/// Errors raised by the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store already holds its maximum number of sessions.
    #[error("session store is full ({capacity} sessions)")]
    Full {
        /// Configured capacity.
        capacity: usize,
    },

    /// A session with this id is already open.
    #[error("session {session_id} already exists")]
    Duplicate {
        /// The clashing session id.
        session_id: SessionId,
    },
}

/// Per-SKU quantities in one shopper's basket.
///
/// Quantities never go below zero. A SKU whose quantity drops to zero keeps
/// its entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Basket {
    items: BTreeMap<Sku, u64>,
}

impl Basket {
    /// Current quantity of `sku` (zero if absent).
    pub fn quantity(&self, sku: &Sku) -> u64 {
        self.items.get(sku).copied().unwrap_or(0)
    }

    /// Iterate over `(sku, quantity)` entries, zero quantities included.
    pub fn items(&self) -> impl Iterator<Item = (&Sku, u64)> {
        self.items.iter().map(|(sku, qty)| (sku, *qty))
    }

    /// Number of SKU entries, zero quantities included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the basket has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `delta` units of `sku` unless the new quantity would exceed `cap`.
    ///
    /// Returns the new quantity, or `None` (basket unchanged) when the cap
    /// would be exceeded.
    pub fn try_add(&mut self, sku: &Sku, delta: u64, cap: u64) -> Option<u64> {
        let total = self.quantity(sku).checked_add(delta)?;
        if total > cap {
            return None;
        }
        self.items.insert(sku.clone(), total);
        Some(total)
    }

    /// Remove up to `wanted` units of `sku`. Returns the units removed.
    pub fn remove(&mut self, sku: &Sku, wanted: u64) -> u64 {
        let Some(qty) = self.items.get_mut(sku) else {
            return 0;
        };
        let removed = wanted.min(*qty);
        *qty = qty.saturating_sub(removed);
        removed
    }

    /// Pick a SKU with a non-zero quantity.
    ///
    /// Draws uniformly among all entries (zero quantities included) up to
    /// `max_attempts` times and returns the first non-zero hit. Returns
    /// `None` for an empty basket or when every draw hit a zero entry.
    pub fn pick_removable(&self, rng: &mut impl Rng, max_attempts: u32) -> Option<Sku> {
        let skus: Vec<&Sku> = self.items.keys().collect();
        for _ in 0..max_attempts {
            let sku = *skus.choose(rng)?;
            if self.quantity(sku) > 0 {
                return Some(sku.clone());
            }
        }
        None
    }
}

/// One shopper's open visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    client_id: ClientId,
    session_end: DateTime<Utc>,
    next_update: DateTime<Utc>,
    basket: Basket,
}

impl Session {
    /// Open a session with an empty basket.
    pub fn new(client_id: ClientId, session_end: DateTime<Utc>, next_update: DateTime<Utc>) -> Self {
        Self {
            client_id,
            session_end,
            next_update,
            basket: Basket::default(),
        }
    }

    /// Shopper this session belongs to.
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Instant at which the session must be checked out. Fixed at creation.
    pub const fn session_end(&self) -> DateTime<Utc> {
        self.session_end
    }

    /// Earliest instant of the next basket mutation.
    pub const fn next_update(&self) -> DateTime<Utc> {
        self.next_update
    }

    /// Move the next basket mutation to `at`.
    pub const fn schedule_next_update(&mut self, at: DateTime<Utc>) {
        self.next_update = at;
    }

    /// Whether the session is past its end at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.session_end < now
    }

    /// Whether the basket may be mutated at `now`.
    pub fn is_due_for_update(&self, now: DateTime<Utc>) -> bool {
        self.session_end > now && self.next_update < now
    }

    /// The shopper's basket.
    pub const fn basket(&self) -> &Basket {
        &self.basket
    }

    /// Mutable access to the shopper's basket.
    pub const fn basket_mut(&mut self) -> &mut Basket {
        &mut self.basket
    }
}

/// All open sessions, bounded by a fixed capacity.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: BTreeMap<SessionId, Session>,
    capacity: NonZeroUsize,
}

impl SessionStore {
    /// Create an empty store holding at most `capacity` sessions.
    pub const fn new(capacity: NonZeroUsize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            capacity,
        }
    }

    /// Look up a session.
    pub fn get(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Iterate over all open sessions.
    pub fn sessions(&self) -> impl Iterator<Item = (&SessionId, &Session)> {
        self.sessions.iter()
    }

    /// Iterate mutably over all open sessions.
    pub fn sessions_mut(&mut self) -> impl Iterator<Item = (&SessionId, &mut Session)> {
        self.sessions.iter_mut()
    }

    /// Add a new session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id is already present, or
    /// [`StoreError::Full`] if the store is at capacity.
    pub fn insert(&mut self, session_id: SessionId, session: Session) -> Result<(), StoreError> {
        if self.sessions.contains_key(&session_id) {
            return Err(StoreError::Duplicate { session_id });
        }
        if !self.has_capacity() {
            return Err(StoreError::Full {
                capacity: self.capacity.get(),
            });
        }
        self.sessions.insert(session_id, session);
        Ok(())
    }

    /// Remove a session, returning it if it was present.
    pub fn remove(&mut self, session_id: &SessionId) -> Option<Session> {
        self.sessions.remove(session_id)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Whether another session can be admitted.
    pub fn has_capacity(&self) -> bool {
        self.sessions.len() < self.capacity.get()
    }

    /// Sessions that must be checked out at `now`.
    ///
    /// While shutting down that is every session, regardless of time left.
    pub fn due_for_checkout(&self, now: DateTime<Utc>, shutting_down: bool) -> BTreeSet<SessionId> {
        self.sessions
            .iter()
            .filter(|(_, session)| shutting_down || session.is_expired(now))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeDelta;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
    }

    fn session_ending(now: DateTime<Utc>, secs: i64) -> Session {
        Session::new(
            ClientId::new("User_1"),
            now + TimeDelta::seconds(secs),
            now + TimeDelta::seconds(1),
        )
    }

    #[test]
    fn insert_respects_capacity() {
        let now = Utc::now();
        let mut store = SessionStore::new(cap(1));
        assert!(store.insert(SessionId::new("a"), session_ending(now, 10)).is_ok());
        assert!(!store.has_capacity());
        let result = store.insert(SessionId::new("b"), session_ending(now, 10));
        assert!(matches!(result, Err(StoreError::Full { capacity: 1 })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let now = Utc::now();
        let mut store = SessionStore::new(cap(4));
        assert!(store.insert(SessionId::new("a"), session_ending(now, 10)).is_ok());
        let result = store.insert(SessionId::new("a"), session_ending(now, 10));
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[test]
    fn due_for_checkout_uses_session_end() {
        let now = Utc::now();
        let mut store = SessionStore::new(cap(4));
        let _ = store.insert(SessionId::new("old"), session_ending(now, -5));
        let _ = store.insert(SessionId::new("new"), session_ending(now, 60));

        let due = store.due_for_checkout(now, false);
        assert_eq!(due.len(), 1);
        assert!(due.contains(&SessionId::new("old")));

        let all = store.due_for_checkout(now, true);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn update_due_only_inside_lifetime() {
        let now = Utc::now();
        let live = Session::new(
            ClientId::new("User_1"),
            now + TimeDelta::seconds(30),
            now - TimeDelta::seconds(1),
        );
        assert!(live.is_due_for_update(now));

        let waiting = session_ending(now, 30);
        assert!(!waiting.is_due_for_update(now));

        let ended = Session::new(
            ClientId::new("User_1"),
            now - TimeDelta::seconds(1),
            now - TimeDelta::seconds(2),
        );
        assert!(!ended.is_due_for_update(now));
        assert!(ended.is_expired(now));
    }

    #[test]
    fn basket_add_is_capped() {
        let mut basket = Basket::default();
        let sku = Sku::new("SKU_1");
        assert_eq!(basket.try_add(&sku, 8, 10), Some(8));
        assert_eq!(basket.try_add(&sku, 5, 10), None);
        assert_eq!(basket.quantity(&sku), 8);
        assert_eq!(basket.try_add(&sku, 2, 10), Some(10));
    }

    #[test]
    fn basket_remove_never_goes_negative() {
        let mut basket = Basket::default();
        let sku = Sku::new("SKU_1");
        let _ = basket.try_add(&sku, 3, 10);
        assert_eq!(basket.remove(&sku, 5), 3);
        assert_eq!(basket.quantity(&sku), 0);
        // Entry stays with quantity zero.
        assert_eq!(basket.len(), 1);
        assert_eq!(basket.remove(&Sku::new("SKU_9"), 1), 0);
    }

    #[test]
    fn pick_removable_skips_zero_entries() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut basket = Basket::default();
        assert_eq!(basket.pick_removable(&mut rng, 100), None);

        let empty = Sku::new("SKU_0");
        let full = Sku::new("SKU_1");
        let _ = basket.try_add(&empty, 1, 10);
        basket.remove(&empty, 1);
        assert_eq!(basket.pick_removable(&mut rng, 100), None);

        let _ = basket.try_add(&full, 2, 10);
        assert_eq!(basket.pick_removable(&mut rng, 100), Some(full));
    }
}
