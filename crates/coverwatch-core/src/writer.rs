//! Expiration log writer

use chrono::{DateTime, NaiveDate, Utc};
use coverwatch_store::{ExpirationLogEntry, NewExpirationLog, PolicyWithCar, Store};
use coverwatch_util::{format_date, PolicyId, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Placeholder used when a VIN or provider is missing
const UNKNOWN: &str = "Unknown";

/// Human-readable description of an expiration event
pub fn expiration_message(expired: &PolicyWithCar) -> String {
    let policy = &expired.policy;
    format!(
        "Insurance policy {} for car {} (Provider: {}) expired on {}",
        policy.id,
        vin_of(expired),
        policy.provider.as_deref().unwrap_or(UNKNOWN),
        format_date(policy.end_date)
    )
}

fn vin_of(expired: &PolicyWithCar) -> &str {
    expired
        .car
        .as_ref()
        .map(|car| car.vin.as_str())
        .unwrap_or(UNKNOWN)
}

/// Records expiration events, one per (policy, expired date)
pub struct ExpirationLogWriter {
    store: Arc<dyn Store>,
}

impl ExpirationLogWriter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persist one log entry per expired policy in a single batch.
    ///
    /// Pairs that are already present in the log are skipped by the store, so
    /// a repeated or concurrent sweep cannot record the same event twice.
    /// Returns the entries that were newly recorded. An empty input performs
    /// no write.
    pub fn write(
        &self,
        now: DateTime<Utc>,
        expired: &[PolicyWithCar],
    ) -> Result<Vec<ExpirationLogEntry>> {
        if expired.is_empty() {
            return Ok(Vec::new());
        }

        let batch = expired
            .iter()
            .map(|p| NewExpirationLog {
                policy_id: p.policy.id,
                expired_date: p.policy.end_date,
                logged_at: now,
                message: Some(expiration_message(p)),
            })
            .collect();

        let recorded = self.store.record_expirations(batch)?;

        let fresh: HashSet<(PolicyId, NaiveDate)> = recorded
            .iter()
            .map(|entry| (entry.policy_id, entry.expired_date))
            .collect();

        for p in expired {
            if !fresh.contains(&(p.policy.id, p.policy.end_date)) {
                continue;
            }
            warn!(
                policy_id = %p.policy.id,
                vin = %vin_of(p),
                provider = %p.policy.provider.as_deref().unwrap_or(UNKNOWN),
                expired_date = %format_date(p.policy.end_date),
                "POLICY EXPIRED: {}",
                expiration_message(p)
            );
        }

        info!(
            count = recorded.len(),
            skipped = expired.len() - recorded.len(),
            time = %now,
            "Processed {} expired policies",
            recorded.len()
        );

        Ok(recorded)
    }
}
