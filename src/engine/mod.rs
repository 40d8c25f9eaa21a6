//! Core engine: rate lookup, alignment, costing and the poll cycle.

pub mod aligner;
pub mod costing;
pub mod poller;
pub mod rates;
