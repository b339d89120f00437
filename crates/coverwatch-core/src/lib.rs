//! Coverage evaluation and policy expiration sweep for coverwatch
//!
//! This crate contains:
//! - Coverage evaluation (is a date inside a policy's inclusive range)
//! - On-demand validity check and coverage history for a car
//! - Expiration window scanner and deduplicating log writer
//! - Scheduler loop driving the sweep (Stopped -> Running -> StopRequested -> Stopped)

mod coverage;
mod queries;
mod scanner;
mod scheduler;
mod writer;

#[cfg(test)]
mod test_support;

pub use coverage::*;
pub use queries::*;
pub use scanner::*;
pub use scheduler::*;
pub use writer::*;
