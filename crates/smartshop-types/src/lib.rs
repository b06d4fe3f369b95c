//! Shared type definitions for the SmartShop event generator.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe string wrappers for session, client, shop and SKU ids
//! - [`enums`] -- [`SessionStatus`] and [`Topic`]
//! - [`payload`] -- The [`Payload`] emitted for every simulated event

pub mod enums;
pub mod ids;
pub mod payload;

pub use enums::{SessionStatus, Topic};
pub use ids::{ClientId, SessionId, ShopId, Sku};
pub use payload::{Payload, PayloadBody};
