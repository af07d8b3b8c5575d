//! Repeated sealed-bid first-price auctions between pluggable bidding agents.
//!
//! [`Simulation`] runs single-item rounds, [`MultiItemSimulation`] runs
//! simultaneous independent first-price auctions over several items. Both are
//! deterministic given their seeds and roster.

mod bidder;
mod clearing;
mod config;
mod error;
mod report;
mod simulation;
mod types;
mod valuation;
mod wasm;

pub mod agents;

pub use bidder::*;
pub use clearing::*;
pub use config::*;
pub use error::*;
pub use report::*;
pub use simulation::*;
pub use types::*;
pub use valuation::*;
pub use wasm::*;

#[cfg(feature = "instrument")]
pub use instrument;
