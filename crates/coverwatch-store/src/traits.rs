//! Store trait definitions

use chrono::NaiveDate;
use coverwatch_util::{CarId, PolicyId};

use crate::{
    Car, ExpirationLogEntry, InsurancePolicy, NewCar, NewExpirationLog, NewOwner, NewPolicy,
    Owner, PolicyWithCar, StoreResult,
};

/// Main store trait
pub trait Store: Send + Sync {
    // Seeding (owned by the outer CRUD layer)

    /// Insert an owner
    fn insert_owner(&self, owner: NewOwner) -> StoreResult<Owner>;

    /// Insert a car
    fn insert_car(&self, car: NewCar) -> StoreResult<Car>;

    /// Insert a policy. Rejects an end date that is not after the start date.
    fn insert_policy(&self, policy: NewPolicy) -> StoreResult<InsurancePolicy>;

    // Cars and policies

    /// Check whether a car exists
    fn car_exists(&self, car_id: CarId) -> StoreResult<bool>;

    /// Get a car by ID
    fn get_car(&self, car_id: CarId) -> StoreResult<Option<Car>>;

    /// All policies attached to a car
    fn policies_for_car(&self, car_id: CarId) -> StoreResult<Vec<InsurancePolicy>>;

    /// Policies whose end date lies in `from..=to`, joined with their car
    fn policies_ending_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<PolicyWithCar>>;

    // Expiration log

    /// Whether an expiration has already been recorded for this policy and date
    fn expiration_logged(&self, policy_id: PolicyId, expired_date: NaiveDate) -> StoreResult<bool>;

    /// Record a batch of expirations in one transaction.
    ///
    /// Entries whose (policy, expired date) pair already exists are skipped.
    /// Returns only the entries that were actually inserted.
    fn record_expirations(
        &self,
        entries: Vec<NewExpirationLog>,
    ) -> StoreResult<Vec<ExpirationLogEntry>>;

    /// All expiration log entries for a policy, oldest first
    fn expiration_logs_for_policy(&self, policy_id: PolicyId)
    -> StoreResult<Vec<ExpirationLogEntry>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
