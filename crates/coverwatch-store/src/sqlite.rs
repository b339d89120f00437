//! SQLite-based store implementation

use chrono::{DateTime, NaiveDate, Utc};
use coverwatch_util::{CarId, ExpirationLogId, OwnerId, PolicyId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::{
    Car, ExpirationLogEntry, InsurancePolicy, NewCar, NewExpirationLog, NewOwner, NewPolicy,
    Owner, PolicyWithCar, Store, StoreError, StoreResult,
};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Lock the connection.
    ///
    /// A panic while the lock was held leaves any open transaction rolled
    /// back by its drop, so the connection is reused rather than wedging
    /// every later sweep.
    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("Store lock poisoned, recovering connection");
            self.conn.clear_poison();
            PoisonError::into_inner(poisoned)
        }))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS owners (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT
            );

            CREATE TABLE IF NOT EXISTS cars (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vin TEXT NOT NULL UNIQUE,
                make TEXT,
                model TEXT,
                year_of_manufacture INTEGER NOT NULL,
                owner_id INTEGER NOT NULL REFERENCES owners(id)
            );

            CREATE TABLE IF NOT EXISTS policies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                car_id INTEGER NOT NULL REFERENCES cars(id),
                provider TEXT,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                CHECK (end_date > start_date)
            );

            -- Expiration log (append-only). The unique pair is the dedup key.
            CREATE TABLE IF NOT EXISTS expiration_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                policy_id INTEGER NOT NULL REFERENCES policies(id),
                expired_date TEXT NOT NULL,
                logged_at TEXT NOT NULL,
                message TEXT,
                UNIQUE (policy_id, expired_date)
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_policies_car ON policies(car_id);
            CREATE INDEX IF NOT EXISTS idx_policies_end_date ON policies(end_date);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn day_to_sql(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn day_from_sql(s: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT)
        .map_err(|e| StoreError::Serialization(format!("bad date {:?}: {}", s, e)))
}

fn instant_from_sql(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad timestamp {:?}: {}", s, e)))
}

/// Raw policy columns, converted outside the rusqlite row closure
struct PolicyRow {
    id: i64,
    car_id: i64,
    provider: Option<String>,
    start_date: String,
    end_date: String,
}

impl PolicyRow {
    fn read(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            car_id: row.get(offset + 1)?,
            provider: row.get(offset + 2)?,
            start_date: row.get(offset + 3)?,
            end_date: row.get(offset + 4)?,
        })
    }

    fn into_policy(self) -> StoreResult<InsurancePolicy> {
        Ok(InsurancePolicy {
            id: PolicyId::new(self.id),
            car_id: CarId::new(self.car_id),
            provider: self.provider,
            start_date: day_from_sql(&self.start_date)?,
            end_date: day_from_sql(&self.end_date)?,
        })
    }
}

fn read_car(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Car>> {
    let id: Option<i64> = row.get(offset)?;
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(Some(Car {
        id: CarId::new(id),
        vin: row.get(offset + 1)?,
        make: row.get(offset + 2)?,
        model: row.get(offset + 3)?,
        year_of_manufacture: row.get(offset + 4)?,
        owner_id: OwnerId::new(row.get(offset + 5)?),
    }))
}

impl Store for SqliteStore {
    fn insert_owner(&self, owner: NewOwner) -> StoreResult<Owner> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO owners (name, email) VALUES (?, ?)",
            params![owner.name, owner.email],
        )?;

        let id = OwnerId::new(conn.last_insert_rowid());
        debug!(owner_id = %id, "Owner inserted");

        Ok(Owner {
            id,
            name: owner.name,
            email: owner.email,
        })
    }

    fn insert_car(&self, car: NewCar) -> StoreResult<Car> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO cars (vin, make, model, year_of_manufacture, owner_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                car.vin,
                car.make,
                car.model,
                car.year_of_manufacture,
                car.owner_id.get()
            ],
        )?;

        let id = CarId::new(conn.last_insert_rowid());
        debug!(car_id = %id, vin = %car.vin, "Car inserted");

        Ok(Car {
            id,
            vin: car.vin,
            make: car.make,
            model: car.model,
            year_of_manufacture: car.year_of_manufacture,
            owner_id: car.owner_id,
        })
    }

    fn insert_policy(&self, policy: NewPolicy) -> StoreResult<InsurancePolicy> {
        policy.validate().map_err(StoreError::InvalidPolicy)?;

        if !self.car_exists(policy.car_id)? {
            return Err(StoreError::NotFound(format!("Car {}", policy.car_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO policies (car_id, provider, start_date, end_date)
            VALUES (?, ?, ?, ?)
            "#,
            params![
                policy.car_id.get(),
                policy.provider,
                day_to_sql(policy.start_date),
                day_to_sql(policy.end_date)
            ],
        )?;

        let id = PolicyId::new(conn.last_insert_rowid());
        debug!(policy_id = %id, car_id = %policy.car_id, "Policy inserted");

        Ok(InsurancePolicy {
            id,
            car_id: policy.car_id,
            provider: policy.provider,
            start_date: policy.start_date,
            end_date: policy.end_date,
        })
    }

    fn car_exists(&self, car_id: CarId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM cars WHERE id = ?", [car_id.get()], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn get_car(&self, car_id: CarId) -> StoreResult<Option<Car>> {
        let conn = self.conn()?;
        let car = conn
            .query_row(
                r#"
                SELECT id, vin, make, model, year_of_manufacture, owner_id
                FROM cars WHERE id = ?
                "#,
                [car_id.get()],
                |row| read_car(row, 0),
            )
            .optional()?;
        Ok(car.flatten())
    }

    fn policies_for_car(&self, car_id: CarId) -> StoreResult<Vec<InsurancePolicy>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, car_id, provider, start_date, end_date
            FROM policies WHERE car_id = ? ORDER BY start_date, id
            "#,
        )?;

        let rows = stmt.query_map([car_id.get()], |row| PolicyRow::read(row, 0))?;

        let mut policies = Vec::new();
        for row in rows {
            policies.push(row?.into_policy()?);
        }
        Ok(policies)
    }

    fn policies_ending_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<PolicyWithCar>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.id, p.car_id, p.provider, p.start_date, p.end_date,
                   c.id, c.vin, c.make, c.model, c.year_of_manufacture, c.owner_id
            FROM policies p
            LEFT JOIN cars c ON c.id = p.car_id
            WHERE p.end_date BETWEEN ? AND ?
            ORDER BY p.id
            "#,
        )?;

        let rows = stmt.query_map(params![day_to_sql(from), day_to_sql(to)], |row| {
            Ok((PolicyRow::read(row, 0)?, read_car(row, 5)?))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (policy, car) = row?;
            result.push(PolicyWithCar {
                policy: policy.into_policy()?,
                car,
            });
        }
        Ok(result)
    }

    fn expiration_logged(&self, policy_id: PolicyId, expired_date: NaiveDate) -> StoreResult<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM expiration_logs WHERE policy_id = ? AND expired_date = ?",
                params![policy_id.get(), day_to_sql(expired_date)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn record_expirations(
        &self,
        entries: Vec<NewExpirationLog>,
    ) -> StoreResult<Vec<ExpirationLogEntry>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            let changed = tx.execute(
                r#"
                INSERT INTO expiration_logs (policy_id, expired_date, logged_at, message)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(policy_id, expired_date) DO NOTHING
                "#,
                params![
                    entry.policy_id.get(),
                    day_to_sql(entry.expired_date),
                    entry.logged_at.to_rfc3339(),
                    entry.message
                ],
            )?;

            if changed == 0 {
                debug!(
                    policy_id = %entry.policy_id,
                    expired_date = %entry.expired_date,
                    "Expiration already recorded, skipping"
                );
                continue;
            }

            let id = ExpirationLogId::new(tx.last_insert_rowid());
            inserted.push(entry.into_entry(id));
        }

        tx.commit()?;
        debug!(count = inserted.len(), "Expiration batch committed");
        Ok(inserted)
    }

    fn expiration_logs_for_policy(
        &self,
        policy_id: PolicyId,
    ) -> StoreResult<Vec<ExpirationLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, expired_date, logged_at, message
            FROM expiration_logs WHERE policy_id = ? ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([policy_id.get()], |row| {
            let id: i64 = row.get(0)?;
            let expired_date: String = row.get(1)?;
            let logged_at: String = row.get(2)?;
            let message: Option<String> = row.get(3)?;
            Ok((id, expired_date, logged_at, message))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, expired_date, logged_at, message) = row?;
            entries.push(ExpirationLogEntry {
                id: ExpirationLogId::new(id),
                policy_id,
                expired_date: day_from_sql(&expired_date)?,
                logged_at: instant_from_sql(&logged_at)?,
                message,
            });
        }
        Ok(entries)
    }

    fn is_healthy(&self) -> bool {
        match self.conn() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_car(store: &SqliteStore, vin: &str) -> Car {
        let owner = store
            .insert_owner(NewOwner {
                name: "Test Owner".into(),
                email: Some("test@example.com".into()),
            })
            .unwrap();
        store
            .insert_car(NewCar {
                vin: vin.into(),
                make: Some("Test".into()),
                model: Some("Car".into()),
                year_of_manufacture: 2020,
                owner_id: owner.id,
            })
            .unwrap()
    }

    fn seed_policy(store: &SqliteStore, car: &Car, start: NaiveDate, end: NaiveDate) -> InsurancePolicy {
        store
            .insert_policy(NewPolicy {
                car_id: car.id,
                provider: Some("TestInsurance".into()),
                start_date: start,
                end_date: end,
            })
            .unwrap()
    }

    fn log_for(policy: &InsurancePolicy) -> NewExpirationLog {
        NewExpirationLog {
            policy_id: policy.id,
            expired_date: policy.end_date,
            logged_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 30, 0).unwrap(),
            message: Some("expired".into()),
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_open_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverwatch.db");

        let car_id = {
            let store = SqliteStore::open(&path).unwrap();
            seed_car(&store, "FILE123").id
        };

        let store = SqliteStore::open(&path).unwrap();
        let car = store.get_car(car_id).unwrap().unwrap();
        assert_eq!(car.vin, "FILE123");
    }

    #[test]
    fn test_car_lookup() {
        let store = SqliteStore::in_memory().unwrap();
        let car = seed_car(&store, "TEST123");

        assert!(store.car_exists(car.id).unwrap());
        assert!(!store.car_exists(CarId::new(99999)).unwrap());
        assert_eq!(store.get_car(car.id).unwrap(), Some(car));
        assert!(store.get_car(CarId::new(99999)).unwrap().is_none());
    }

    #[test]
    fn test_policy_requires_end_after_start() {
        let store = SqliteStore::in_memory().unwrap();
        let car = seed_car(&store, "TEST123");

        let result = store.insert_policy(NewPolicy {
            car_id: car.id,
            provider: None,
            start_date: ymd(2024, 6, 1),
            end_date: ymd(2024, 6, 1),
        });
        assert!(matches!(result, Err(StoreError::InvalidPolicy(_))));
    }

    #[test]
    fn test_policy_for_unknown_car_is_not_found() {
        let store = SqliteStore::in_memory().unwrap();

        let result = store.insert_policy(NewPolicy {
            car_id: CarId::new(42),
            provider: None,
            start_date: ymd(2024, 1, 1),
            end_date: ymd(2024, 12, 31),
        });
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_policies_for_car() {
        let store = SqliteStore::in_memory().unwrap();
        let car = seed_car(&store, "TEST123");
        let other = seed_car(&store, "OTHER1");

        let later = seed_policy(&store, &car, ymd(2025, 1, 1), ymd(2025, 12, 31));
        let earlier = seed_policy(&store, &car, ymd(2024, 1, 1), ymd(2024, 12, 31));
        seed_policy(&store, &other, ymd(2024, 1, 1), ymd(2024, 12, 31));

        let policies = store.policies_for_car(car.id).unwrap();
        assert_eq!(policies, vec![earlier, later]);
    }

    #[test]
    fn test_policies_ending_between_is_inclusive_and_joins_car() {
        let store = SqliteStore::in_memory().unwrap();
        let car = seed_car(&store, "TEST123");

        let on_from = seed_policy(&store, &car, ymd(2024, 1, 1), ymd(2024, 12, 31));
        let on_to = seed_policy(&store, &car, ymd(2024, 2, 1), ymd(2025, 1, 1));
        seed_policy(&store, &car, ymd(2024, 3, 1), ymd(2024, 12, 30));
        seed_policy(&store, &car, ymd(2024, 4, 1), ymd(2025, 1, 2));

        let found = store
            .policies_ending_between(ymd(2024, 12, 31), ymd(2025, 1, 1))
            .unwrap();

        let ids: Vec<_> = found.iter().map(|p| p.policy.id).collect();
        assert_eq!(ids, vec![on_from.id, on_to.id]);
        assert!(found.iter().all(|p| p.car.as_ref().map(|c| c.vin.as_str()) == Some("TEST123")));
    }

    #[test]
    fn test_record_expirations_ignores_duplicates() {
        let store = SqliteStore::in_memory().unwrap();
        let car = seed_car(&store, "TEST123");
        let policy = seed_policy(&store, &car, ymd(2024, 1, 1), ymd(2024, 12, 31));

        assert!(!store.expiration_logged(policy.id, policy.end_date).unwrap());

        let first = store.record_expirations(vec![log_for(&policy)]).unwrap();
        assert_eq!(first.len(), 1);
        assert!(store.expiration_logged(policy.id, policy.end_date).unwrap());

        // Same pair again, even twice within one batch, inserts nothing
        let second = store
            .record_expirations(vec![log_for(&policy), log_for(&policy)])
            .unwrap();
        assert!(second.is_empty());

        let logs = store.expiration_logs_for_policy(policy.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0], first[0]);
    }

    #[test]
    fn test_record_expirations_batch() {
        let store = SqliteStore::in_memory().unwrap();
        let car = seed_car(&store, "TEST123");
        let a = seed_policy(&store, &car, ymd(2024, 1, 1), ymd(2024, 12, 31));
        let b = seed_policy(&store, &car, ymd(2024, 6, 1), ymd(2024, 12, 31));

        let inserted = store
            .record_expirations(vec![log_for(&a), log_for(&b)])
            .unwrap();
        assert_eq!(inserted.len(), 2);
        assert_ne!(inserted[0].id, inserted[1].id);
        assert_eq!(inserted[1].policy_id, b.id);
    }

    #[test]
    fn test_store_error_maps_to_domain_error() {
        use coverwatch_util::CoverwatchError;

        let err: CoverwatchError = StoreError::NotFound("Car 1".into()).into();
        assert!(matches!(err, CoverwatchError::EntityNotFound(_)));

        let err: CoverwatchError = StoreError::Database("locked".into()).into();
        assert!(matches!(err, CoverwatchError::PersistenceFailure(_)));
    }

    #[test]
    fn test_panic_while_locked_does_not_wedge_the_store() {
        let store = std::sync::Arc::new(SqliteStore::in_memory().unwrap());

        let holder = store.clone();
        let result = std::thread::spawn(move || {
            let _conn = holder.conn.lock().unwrap();
            panic!("sweep panicked mid-write");
        })
        .join();
        assert!(result.is_err());
        assert!(store.conn.is_poisoned());

        assert!(store.is_healthy());
        assert!(!store.conn.is_poisoned());

        let car = seed_car(&store, "AFTER01");
        assert!(store.car_exists(car.id).unwrap());
    }
}
