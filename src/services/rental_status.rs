//! Read-time classification of rental contracts.
//!
//! Stored status only changes through explicit contract updates. Lateness and
//! "due soon" are projected from the stored status and the current instant every
//! time a contract is read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::{rental_contract, RentalStatus};

/// Window, in whole days, in which an active rental counts as due soon.
pub const DUE_SOON_DAYS: i64 = 3;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RentalClassification {
    pub stored_status: RentalStatus,
    pub is_late: bool,
    pub is_due_soon: bool,
}

/// Whole days from `now` until `due`, rounded up.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (due - now).num_milliseconds();
    // ceil(ms / DAY_MS) without going through floats
    -((-ms).div_euclid(DAY_MS))
}

pub fn classify_parts(
    now: DateTime<Utc>,
    stored_status: RentalStatus,
    return_due: DateTime<Utc>,
) -> RentalClassification {
    let active = stored_status == RentalStatus::Active;
    let is_late = active && return_due < now;
    let days = days_until(return_due, now);
    let is_due_soon = active && !is_late && (0..=DUE_SOON_DAYS).contains(&days);

    RentalClassification {
        stored_status,
        is_late,
        is_due_soon,
    }
}

pub fn classify(now: DateTime<Utc>, contract: &rental_contract::Model) -> RentalClassification {
    classify_parts(now, contract.status, contract.return_due)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use rstest::rstest;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case(Duration::zero(), 0)]
    #[case(Duration::milliseconds(1), 1)]
    #[case(Duration::hours(24), 1)]
    #[case(Duration::hours(25), 2)]
    #[case(Duration::milliseconds(-1), 0)]
    #[case(Duration::hours(-24), -1)]
    #[case(Duration::hours(-25), -1)]
    fn days_until_rounds_up(#[case] offset: Duration, #[case] expected: i64) {
        assert_eq!(days_until(noon() + offset, noon()), expected);
    }

    #[rstest]
    #[case(RentalStatus::Active, Duration::hours(-1), true, false)]
    #[case(RentalStatus::Active, Duration::zero(), false, true)]
    #[case(RentalStatus::Active, Duration::days(3), false, true)]
    #[case(RentalStatus::Active, Duration::days(3) + Duration::minutes(1), false, false)]
    #[case(RentalStatus::Active, Duration::days(10), false, false)]
    #[case(RentalStatus::Settled, Duration::hours(-1), false, false)]
    #[case(RentalStatus::Settled, Duration::days(1), false, false)]
    #[case(RentalStatus::Late, Duration::hours(-1), false, false)]
    fn classification_table(
        #[case] status: RentalStatus,
        #[case] due_offset: Duration,
        #[case] late: bool,
        #[case] due_soon: bool,
    ) {
        let result = classify_parts(noon(), status, noon() + due_offset);
        assert_eq!(result.stored_status, status);
        assert_eq!(result.is_late, late);
        assert_eq!(result.is_due_soon, due_soon);
    }

    fn any_status() -> impl Strategy<Value = RentalStatus> {
        prop_oneof![
            Just(RentalStatus::Active),
            Just(RentalStatus::Settled),
            Just(RentalStatus::Late),
        ]
    }

    proptest! {
        #[test]
        fn classify_is_repeatable_and_exclusive(
            status in any_status(),
            offset_ms in -40i64 * DAY_MS..40i64 * DAY_MS,
        ) {
            let now = noon();
            let due = now + Duration::milliseconds(offset_ms);
            let first = classify_parts(now, status, due);
            let second = classify_parts(now, status, due);

            prop_assert_eq!(first, second);
            prop_assert!(!(first.is_late && first.is_due_soon));
            if status != RentalStatus::Active {
                prop_assert!(!first.is_late && !first.is_due_soon);
            }
        }

        #[test]
        fn late_exactly_when_active_and_past_due(offset_ms in -40i64 * DAY_MS..40i64 * DAY_MS) {
            let now = noon();
            let due = now + Duration::milliseconds(offset_ms);
            let result = classify_parts(now, RentalStatus::Active, due);
            prop_assert_eq!(result.is_late, offset_ms < 0);
        }
    }
}
