//! Shared utilities for coverwatch
//!
//! This crate provides:
//! - ID types (CarId, OwnerId, PolicyId, SweepId)
//! - Error taxonomy shared by the validity check and the expiration sweep
//! - Calendar date parsing and range validation
//! - Wall-clock helpers (UTC, end-of-day, mock time in debug builds)
//! - Default paths for config and data directories

mod date;
mod error;
mod ids;
mod paths;
mod time;

pub use date::*;
pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
