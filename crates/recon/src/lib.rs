//! `courier-recon`: courier charge reconciliation engine.
//!
//! Pure engine crate: receives an already-joined shipment dataset and a rate
//! card, returns priced rows, skipped rows, a summary and aggregate tables.
//! Callers read files; this crate only parses the text it is handed.

pub mod aggregate;
pub mod charge;
pub mod classify;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod model;
pub mod money;
pub mod rates;
pub mod slab;
pub mod summary;

pub use config::ReconConfig;
pub use engine::run;
pub use error::{ReconError, RowError};
pub use model::{ChargedShipment, DiscrepancyClass, ReconInput, ReconResult, ShipmentRecord};
pub use rates::{RateCard, ZoneRate};
