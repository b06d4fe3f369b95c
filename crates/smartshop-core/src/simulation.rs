//! Per-tick session simulation.
//!
//! [`Simulation::step`] runs one tick against the session store, in this
//! fixed order:
//!
//! 1. **Expiry** -- every session past its end (or every session, while
//!    shutting down) gets a check-out payload and is marked for removal.
//! 2. **Basket update** -- every other session whose next update is due
//!    reschedules its next update and then either adds a random SKU or
//!    removes units of one already in the basket.
//! 3. **Removal** -- marked sessions leave the store.
//! 4. **Shutdown** -- while shutting down, the tick ends here.
//! 5. **Admission** -- if the store has room, exactly one new session opens
//!    and a check-in payload is emitted.
//!
//! A session therefore never gets a basket update on the tick it is
//! checked out, and its check-out is always emitted before its slot is
//! reused.
//!
//! The step is synchronous and takes `now` as an argument; pacing and the
//! wall clock live in [`crate::runner`]. All randomness comes from the
//! injected generator, so a seeded generator replays a run exactly.

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use smartshop_types::{SessionId, SessionStatus, Topic};
use tracing::{debug, trace, warn};

use crate::config::SimulationParams;
use crate::identity;
use crate::payload::{basket_payload_at, status_payload_at};
use crate::sink::Sink;
use crate::store::{Session, SessionStore};

/// Random draws made when looking for a non-empty SKU to remove.
pub const MAX_REMOVE_ATTEMPTS: u32 = 100;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Tick number (1-based).
    pub tick: u64,
    /// Sessions opened.
    pub checked_in: u64,
    /// Sessions closed.
    pub checked_out: u64,
    /// Basket additions emitted.
    pub items_added: u64,
    /// Basket removals emitted.
    pub items_removed: u64,
    /// Additions dropped because the SKU would exceed the basket cap.
    pub adds_discarded: u64,
    /// Removals dropped because no non-empty SKU was found.
    pub removals_skipped: u64,
    /// Open sessions at the end of the tick.
    pub active_sessions: usize,
    /// Whether this tick ran in shutdown mode.
    pub shutdown: bool,
}

/// The session simulation: parameters, open sessions and the generator.
#[derive(Debug)]
pub struct Simulation<R> {
    params: SimulationParams,
    store: SessionStore,
    rng: R,
    tick: u64,
}

impl<R: Rng> Simulation<R> {
    /// Create a simulation with an empty store.
    pub const fn new(params: SimulationParams, rng: R) -> Self {
        let store = SessionStore::new(params.max_simultaneous_sessions);
        Self {
            params,
            store,
            rng,
            tick: 0,
        }
    }

    /// Parameters the simulation runs on.
    pub const fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Open sessions.
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Mutable access to the open sessions.
    pub const fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// Number of ticks run so far.
    pub const fn ticks(&self) -> u64 {
        self.tick
    }

    /// Run one tick at `now`, emitting every payload to `sink`.
    pub fn step(&mut self, now: DateTime<Utc>, shutting_down: bool, sink: &mut dyn Sink) -> TickSummary {
        self.tick = self.tick.saturating_add(1);
        let mut summary = TickSummary {
            tick: self.tick,
            shutdown: shutting_down,
            ..TickSummary::default()
        };

        // --- Expiry ---
        let expiring = self.store.due_for_checkout(now, shutting_down);
        for session_id in &expiring {
            let Some(session) = self.store.get(session_id) else {
                continue;
            };
            let status = SessionStatus::CheckOut;
            let payload = status_payload_at(
                session_id,
                Some(session.client_id()),
                Some(status),
                &self.params.ids,
                now,
            );
            debug!(?payload, "CHECK_OUT");
            sink.emit(status.topic(), session_id.as_str(), &payload);
            summary.checked_out = summary.checked_out.saturating_add(1);
        }

        // --- Basket update ---
        if !shutting_down {
            let Self {
                params, store, rng, ..
            } = self;
            for (session_id, session) in store.sessions_mut() {
                if expiring.contains(session_id) || !session.is_due_for_update(now) {
                    continue;
                }
                update_basket(params, rng, session_id, session, now, sink, &mut summary);
            }
        }

        // --- Removal ---
        for session_id in &expiring {
            self.store.remove(session_id);
        }

        // --- Shutdown ---
        if shutting_down {
            summary.active_sessions = self.store.len();
            return summary;
        }

        // --- Admission ---
        if self.store.has_capacity() {
            self.admit(now, sink, &mut summary);
        }

        summary.active_sessions = self.store.len();
        summary
    }

    /// Open one new session and emit its check-in.
    fn admit(&mut self, now: DateTime<Utc>, sink: &mut dyn Sink, summary: &mut TickSummary) {
        let session_id = identity::new_session_id(&mut self.rng);
        let client_id = identity::derive_client_id(&session_id, self.params.ids.max_clients);
        let session_end = seconds_after(now, self.params.checkout_range.sample(&mut self.rng));
        let next_update = seconds_after(now, self.params.update_basket_range.sample(&mut self.rng));

        let status = SessionStatus::CheckIn;
        let payload = status_payload_at(
            &session_id,
            Some(&client_id),
            Some(status),
            &self.params.ids,
            now,
        );
        let session = Session::new(client_id, session_end, next_update);

        match self.store.insert(session_id.clone(), session) {
            Ok(()) => {
                debug!(?payload, "CHECK_IN");
                sink.emit(status.topic(), session_id.as_str(), &payload);
                summary.checked_in = summary.checked_in.saturating_add(1);
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Session not admitted");
            }
        }
    }
}

/// Reschedule the session's next update, then add or remove items.
fn update_basket(
    params: &SimulationParams,
    rng: &mut impl Rng,
    session_id: &SessionId,
    session: &mut Session,
    now: DateTime<Utc>,
    sink: &mut dyn Sink,
    summary: &mut TickSummary,
) {
    let wait = params.update_basket_range.sample(rng);
    session.schedule_next_update(seconds_after(now, wait));

    let cap = params.max_basket_size.get();

    if rng.random::<f64>() < params.remove_sku_probability {
        let Some(sku) = session.basket().pick_removable(rng, MAX_REMOVE_ATTEMPTS) else {
            trace!(session_id = %session_id, "No removable SKU in basket, skipping");
            summary.removals_skipped = summary.removals_skipped.saturating_add(1);
            return;
        };
        let wanted = params.add_sku_range.sample(rng);
        let removed = session.basket_mut().remove(&sku, wanted);
        let qty = 0_i64.saturating_sub(i64::try_from(removed).unwrap_or(i64::MAX));

        let payload = basket_payload_at(session_id, &sku, qty, now);
        debug!(?payload, "BASKET");
        sink.emit(Topic::Basket, session_id.as_str(), &payload);
        summary.items_removed = summary.items_removed.saturating_add(1);
    } else {
        let sku = identity::new_sku(rng, params.ids.max_skus);
        let delta = params.add_sku_range.sample(rng).min(cap);
        if session.basket_mut().try_add(&sku, delta, cap).is_none() {
            debug!(
                session_id = %session_id,
                sku = %sku,
                held = session.basket().quantity(&sku),
                delta,
                "Basket full for SKU, addition discarded"
            );
            summary.adds_discarded = summary.adds_discarded.saturating_add(1);
            return;
        }

        let qty = i64::try_from(delta).unwrap_or(i64::MAX);
        let payload = basket_payload_at(session_id, &sku, qty, now);
        debug!(?payload, "BASKET");
        sink.emit(Topic::Basket, session_id.as_str(), &payload);
        summary.items_added = summary.items_added.saturating_add(1);
    }
}

/// `now + secs`, saturating at the latest representable instant.
fn seconds_after(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::config::SmartShopConfig;
    use crate::sink::RecordingSink;

    fn simulation(cfg: SmartShopConfig) -> Simulation<SmallRng> {
        Simulation::new(cfg.validate().unwrap(), SmallRng::seed_from_u64(17))
    }

    #[test]
    fn first_tick_admits_one_session() {
        let mut sim = simulation(SmartShopConfig::default());
        let mut sink = RecordingSink::new();
        let summary = sim.step(Utc::now(), false, &mut sink);

        assert_eq!(summary.tick, 1);
        assert_eq!(summary.checked_in, 1);
        assert_eq!(summary.active_sessions, 1);
        assert_eq!(sink.records().len(), 1);
        let record = &sink.records()[0];
        assert_eq!(record.topic, Topic::Checkin);
        assert_eq!(record.key, record.payload.session_id.as_str());
        assert_eq!(record.payload.status(), Some(SessionStatus::CheckIn));
    }

    #[test]
    fn admission_stops_at_capacity() {
        let mut sim = simulation(SmartShopConfig {
            max_simultaneous_sessions: 3,
            checkout_range_min: 3600,
            checkout_range_max: 3600,
            ..SmartShopConfig::default()
        });
        let mut sink = RecordingSink::new();
        let now = Utc::now();
        for i in 0..10 {
            let summary = sim.step(now + TimeDelta::milliseconds(i), false, &mut sink);
            assert!(summary.active_sessions <= 3);
        }
        assert_eq!(sim.store().len(), 3);
        assert_eq!(sink.on_topic(Topic::Checkin).count(), 3);
        assert_eq!(sim.ticks(), 10);
    }

    #[test]
    fn session_times_follow_configured_ranges() {
        let mut sim = simulation(SmartShopConfig {
            checkout_range_min: 40,
            checkout_range_max: 40,
            update_basket_range_min: 7,
            update_basket_range_max: 7,
            ..SmartShopConfig::default()
        });
        let mut sink = RecordingSink::new();
        let now = Utc::now();
        sim.step(now, false, &mut sink);

        let (_, session) = sim.store().sessions().next().unwrap();
        assert_eq!(session.session_end(), now + TimeDelta::seconds(40));
        assert_eq!(session.next_update(), now + TimeDelta::seconds(7));
        assert!(session.basket().is_empty());
    }

    #[test]
    fn seconds_after_saturates() {
        let now = Utc::now();
        assert_eq!(seconds_after(now, 0), now);
        assert_eq!(seconds_after(now, u64::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
