//! Expiration window scanner
//!
//! A policy expires at the end of its last covered day. The scanner reports
//! policies whose expiration instant lies within the recency window before
//! `now` and that have no expiration log entry yet.
//!
//! Candidates are first narrowed by end date (a cheap indexed query over the
//! calendar days the window touches), then each candidate is checked against
//! the precise elapsed time. The precise check is authoritative.

use chrono::{DateTime, NaiveDate, Utc};
use coverwatch_store::{PolicyWithCar, Store};
use coverwatch_util::{date_of, end_of_day, to_chrono_duration, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Calendar days an expiration inside the window can fall on: from the date
/// of `now - window` through the date of `now`, inclusive.
pub fn candidate_range(now: DateTime<Utc>, window: Duration) -> (NaiveDate, NaiveDate) {
    let earliest = now - to_chrono_duration(window);
    (date_of(earliest), date_of(now))
}

/// Whether a policy ending on `end_date` expired no more than `window` before `now`.
///
/// A policy that has not reached the end of its last day yet is never expired.
pub fn expired_within(end_date: NaiveDate, now: DateTime<Utc>, window: Duration) -> bool {
    let elapsed = now - end_of_day(end_date);
    elapsed >= chrono::Duration::zero() && elapsed <= to_chrono_duration(window)
}

/// Finds policies that expired within the recency window and are not yet logged
pub struct ExpirationScanner {
    store: Arc<dyn Store>,
    window: Duration,
}

impl ExpirationScanner {
    pub fn new(store: Arc<dyn Store>, window: Duration) -> Self {
        Self { store, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Scan for newly expired policies as of `now`
    pub fn scan(&self, now: DateTime<Utc>) -> Result<Vec<PolicyWithCar>> {
        let (from, to) = candidate_range(now, self.window);
        let candidates = self.store.policies_ending_between(from, to)?;

        debug!(
            from = %from,
            to = %to,
            candidates = candidates.len(),
            "Expiration candidates loaded"
        );

        let mut expired = Vec::new();
        for candidate in candidates {
            let policy = &candidate.policy;

            if !expired_within(policy.end_date, now, self.window) {
                debug!(
                    policy_id = %policy.id,
                    end_date = %policy.end_date,
                    "Outside recency window"
                );
                continue;
            }

            if self.store.expiration_logged(policy.id, policy.end_date)? {
                debug!(policy_id = %policy.id, "Expiration already logged");
                continue;
            }

            expired.push(candidate);
        }

        Ok(expired)
    }
}
