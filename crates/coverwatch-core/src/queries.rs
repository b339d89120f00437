//! On-demand coverage queries: validity check and per-car history

use chrono::{DateTime, NaiveDate, Utc};
use coverwatch_store::Store;
use coverwatch_util::{parse_date, CarId, CoverwatchError, PolicyId, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::policy_covers;

/// Answer to "is car X insured on date Y"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityReport {
    pub valid: bool,
    pub car_id: CarId,
    /// The date exactly as the caller supplied it
    pub date: String,
}

/// Kind of a coverage history item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    PolicyStarted,
    PolicyExpired,
}

/// One dated event in a car's coverage history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub kind: HistoryKind,
    pub date: NaiveDate,
    pub policy_id: PolicyId,
    pub provider: Option<String>,
    pub description: String,
    /// When the expiration sweep recorded this expiry, if it has
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Read-only coverage queries. Never touches the expiration log for writing.
pub struct CoverageQueries {
    store: Arc<dyn Store>,
}

impl CoverageQueries {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Check a caller-supplied date string against a car's policies.
    ///
    /// The date is validated before the car is looked up, so a malformed date
    /// is reported even for an unknown car.
    pub fn check_validity(&self, car_id: CarId, date: Option<&str>) -> Result<ValidityReport> {
        let day = parse_date(date)?;
        let valid = self.is_insurance_valid(car_id, day)?;

        Ok(ValidityReport {
            valid,
            car_id,
            date: date.unwrap_or_default().to_string(),
        })
    }

    /// Whether any of the car's policies covers `day`
    pub fn is_insurance_valid(&self, car_id: CarId, day: NaiveDate) -> Result<bool> {
        self.require_car(car_id)?;

        let policies = self.store.policies_for_car(car_id)?;
        let valid = policies.iter().any(|p| policy_covers(p, day));

        debug!(car_id = %car_id, day = %day, policies = policies.len(), valid, "Validity checked");
        Ok(valid)
    }

    /// Chronological start/expiry events for every policy on a car
    pub fn history(&self, car_id: CarId) -> Result<Vec<HistoryItem>> {
        self.require_car(car_id)?;

        let mut items = Vec::new();
        for policy in self.store.policies_for_car(car_id)? {
            let provider_label = policy.provider.as_deref().unwrap_or("Unknown");

            let recorded_at = self
                .store
                .expiration_logs_for_policy(policy.id)?
                .into_iter()
                .find(|log| log.expired_date == policy.end_date)
                .map(|log| log.logged_at);

            items.push(HistoryItem {
                kind: HistoryKind::PolicyStarted,
                date: policy.start_date,
                policy_id: policy.id,
                provider: policy.provider.clone(),
                description: format!("Insurance policy with {}", provider_label),
                recorded_at: None,
            });
            items.push(HistoryItem {
                kind: HistoryKind::PolicyExpired,
                date: policy.end_date,
                policy_id: policy.id,
                provider: policy.provider.clone(),
                description: format!("Insurance policy with {} expired", provider_label),
                recorded_at,
            });
        }

        items.sort_by_key(|item| item.date);
        Ok(items)
    }

    fn require_car(&self, car_id: CarId) -> Result<()> {
        if !self.store.car_exists(car_id)? {
            return Err(CoverwatchError::not_found(format!("Car {}", car_id)));
        }
        Ok(())
    }
}
