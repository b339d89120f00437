//! Entity records

use chrono::{DateTime, NaiveDate, Utc};
use coverwatch_util::{CarId, ExpirationLogId, OwnerId, PolicyId};
use serde::{Deserialize, Serialize};

/// A car owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub name: String,
    pub email: Option<String>,
}

/// An insured vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub vin: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year_of_manufacture: i32,
    pub owner_id: OwnerId,
}

/// An insurance policy covering one car over an inclusive date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    pub id: PolicyId,
    pub car_id: CarId,
    pub provider: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A policy joined with the car it covers.
///
/// The car is optional so that a dangling reference still surfaces the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyWithCar {
    pub policy: InsurancePolicy,
    pub car: Option<Car>,
}

/// One recorded expiration event. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationLogEntry {
    pub id: ExpirationLogId,
    pub policy_id: PolicyId,
    pub expired_date: NaiveDate,
    pub logged_at: DateTime<Utc>,
    pub message: Option<String>,
}

/// Owner fields supplied on insert
#[derive(Debug, Clone)]
pub struct NewOwner {
    pub name: String,
    pub email: Option<String>,
}

/// Car fields supplied on insert
#[derive(Debug, Clone)]
pub struct NewCar {
    pub vin: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year_of_manufacture: i32,
    pub owner_id: OwnerId,
}

/// Policy fields supplied on insert
#[derive(Debug, Clone)]
pub struct NewPolicy {
    pub car_id: CarId,
    pub provider: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewPolicy {
    /// The end date must fall strictly after the start date
    pub fn validate(&self) -> Result<(), String> {
        if self.end_date <= self.start_date {
            return Err("End date must be greater than start date.".into());
        }
        Ok(())
    }
}

/// Expiration log fields supplied on insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpirationLog {
    pub policy_id: PolicyId,
    pub expired_date: NaiveDate,
    pub logged_at: DateTime<Utc>,
    pub message: Option<String>,
}

impl NewExpirationLog {
    pub(crate) fn into_entry(self, id: ExpirationLogId) -> ExpirationLogEntry {
        ExpirationLogEntry {
            id,
            policy_id: self.policy_id,
            expired_date: self.expired_date,
            logged_at: self.logged_at,
            message: self.message,
        }
    }
}
