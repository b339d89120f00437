//! Coverage evaluation

use chrono::NaiveDate;
use coverwatch_store::InsurancePolicy;

/// Whether `date` falls inside the closed interval `[start, end]`.
///
/// Both the first and the last day of a policy are covered.
pub fn is_covered(start: NaiveDate, end: NaiveDate, date: NaiveDate) -> bool {
    start <= date && date <= end
}

/// Whether a policy covers the given day
pub fn policy_covers(policy: &InsurancePolicy, date: NaiveDate) -> bool {
    is_covered(policy.start_date, policy.end_date, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverwatch_util::{CarId, PolicyId};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn boundaries_are_inclusive() {
        let start = ymd(2024, 1, 1);
        let end = ymd(2024, 12, 31);

        assert!(!is_covered(start, end, start.pred_opt().unwrap()));
        assert!(is_covered(start, end, start));
        assert!(is_covered(start, end, ymd(2024, 6, 15)));
        assert!(is_covered(start, end, end));
        assert!(!is_covered(start, end, end.succ_opt().unwrap()));
    }

    #[test]
    fn single_day_interval() {
        let day = ymd(2024, 2, 29);
        assert!(is_covered(day, day, day));
        assert!(!is_covered(day, day, ymd(2024, 3, 1)));
    }

    #[test]
    fn matches_interval_definition_across_a_range() {
        let start = ymd(2023, 12, 28);
        let end = ymd(2024, 1, 3);
        let mut day = ymd(2023, 12, 20);
        while day <= ymd(2024, 1, 10) {
            assert_eq!(is_covered(start, end, day), day >= start && day <= end, "{}", day);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn policy_covers_uses_policy_dates() {
        let policy = InsurancePolicy {
            id: PolicyId::new(1),
            car_id: CarId::new(1),
            provider: Some("TestInsurance".into()),
            start_date: ymd(2024, 1, 1),
            end_date: ymd(2024, 12, 31),
        };
        assert!(policy_covers(&policy, ymd(2024, 12, 31)));
        assert!(!policy_covers(&policy, ymd(2025, 1, 1)));
    }
}
