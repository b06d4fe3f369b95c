//! Session simulation engine for the SmartShop event generator.
//!
//! This crate owns the in-memory model of open shopping sessions and the
//! tick loop that advances them: expire due sessions, mutate baskets,
//! admit new sessions up to capacity, and pace itself to a target rate.
//! Every resulting event goes out through the [`Sink`] trait; the crate
//! knows nothing about the message bus behind it.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration and validated [`SimulationParams`].
//! - [`identity`] -- Stable-hash derivation of client ids, shop ids, SKUs
//!   and unit prices.
//! - [`payload`] -- Builders for status and basket payloads.
//! - [`store`] -- [`SessionStore`], [`Session`] and [`Basket`].
//! - [`sink`] -- The [`Sink`] trait plus dry-run and recording sinks.
//! - [`shutdown`] -- [`ShutdownSignal`], the cooperative stop flag.
//! - [`simulation`] -- [`Simulation::step`], one tick of the state machine.
//! - [`runner`] -- [`run_simulation`], the paced async loop.
//!
//! [`Sink`]: sink::Sink
//! [`SimulationParams`]: config::SimulationParams
//! [`SessionStore`]: store::SessionStore
//! [`Session`]: store::Session
//! [`Basket`]: store::Basket
//! [`ShutdownSignal`]: shutdown::ShutdownSignal
//! [`Simulation::step`]: simulation::Simulation::step
//! [`run_simulation`]: runner::run_simulation

pub mod config;
pub mod identity;
pub mod payload;
pub mod runner;
pub mod shutdown;
pub mod simulation;
pub mod sink;
pub mod store;
