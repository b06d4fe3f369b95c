//! Paced simulation loop.
//!
//! [`run_simulation`] drives [`Simulation::step`] at the configured tick
//! rate until a shutdown is requested. The shutdown flag is read once at the
//! top of each tick; the tick that observes it checks every open session
//! out and the loop returns right after.
//!
//! Each tick sleeps for whatever is left of `1 / max_transactions_per_second`
//! after the tick's own work. A tick that overruns its budget is followed
//! immediately by the next one.

use chrono::Utc;
use rand::Rng;
use tokio::time::Instant;
use tracing::info;

use crate::shutdown::ShutdownSignal;
use crate::simulation::{Simulation, TickSummary};
use crate::sink::Sink;

/// Totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed.
    pub ticks: u64,
    /// Sessions opened.
    pub sessions_opened: u64,
    /// Sessions closed.
    pub sessions_closed: u64,
    /// Basket additions emitted.
    pub items_added: u64,
    /// Basket removals emitted.
    pub items_removed: u64,
    /// Additions dropped by the basket cap.
    pub adds_discarded: u64,
    /// Removals dropped for lack of a non-empty SKU.
    pub removals_skipped: u64,
}

impl RunSummary {
    /// Fold one tick into the totals.
    pub const fn record(&mut self, tick: &TickSummary) {
        self.ticks = self.ticks.saturating_add(1);
        self.sessions_opened = self.sessions_opened.saturating_add(tick.checked_in);
        self.sessions_closed = self.sessions_closed.saturating_add(tick.checked_out);
        self.items_added = self.items_added.saturating_add(tick.items_added);
        self.items_removed = self.items_removed.saturating_add(tick.items_removed);
        self.adds_discarded = self.adds_discarded.saturating_add(tick.adds_discarded);
        self.removals_skipped = self.removals_skipped.saturating_add(tick.removals_skipped);
    }

    /// Total payloads handed to the sink.
    pub const fn payloads_emitted(&self) -> u64 {
        self.sessions_opened
            .saturating_add(self.sessions_closed)
            .saturating_add(self.items_added)
            .saturating_add(self.items_removed)
    }
}

/// Run the simulation until `shutdown` is triggered.
///
/// Returns once the draining tick has checked out every open session.
pub async fn run_simulation<R: Rng>(
    simulation: &mut Simulation<R>,
    sink: &mut dyn Sink,
    shutdown: &ShutdownSignal,
) -> RunSummary {
    let interval = simulation.params().tick_interval();
    let mut totals = RunSummary::default();

    info!(
        max_simultaneous_sessions = simulation.params().max_simultaneous_sessions.get(),
        tick_interval_ms = interval.as_millis(),
        "Generating SmartShop events"
    );

    loop {
        let started = Instant::now();
        let shutting_down = shutdown.is_triggered();
        if shutting_down {
            info!(
                open_sessions = simulation.store().len(),
                "Shutdown requested, checking all current sessions out"
            );
        }

        let tick = simulation.step(Utc::now(), shutting_down, sink);
        totals.record(&tick);

        if tick.shutdown {
            info!(checked_out = tick.checked_out, "Checkout completed");
            break;
        }

        let remaining = interval.saturating_sub(started.elapsed());
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }

    totals
}

/// Log the totals of a finished run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        ticks = summary.ticks,
        sessions_opened = summary.sessions_opened,
        sessions_closed = summary.sessions_closed,
        items_added = summary.items_added,
        items_removed = summary.items_removed,
        adds_discarded = summary.adds_discarded,
        removals_skipped = summary.removals_skipped,
        "Simulation ended"
    );
}
