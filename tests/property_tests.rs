//! Property-based tests for the rental core: identifier checks, search
//! matching and dashboard aggregation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use rental_api::entities::{
    garment, rental_contract, GarmentCategory, GarmentStatus, PaymentMethod, RentalStatus,
};
use rental_api::services::dashboard::compute_stats;
use rental_api::services::validation::{
    is_valid_national_id, matches_search, normalize_national_id,
};

fn check_digit(digits: &[u32]) -> u32 {
    let position = digits.len() as u32;
    let weighted: u32 = digits
        .iter()
        .enumerate()
        .map(|(idx, d)| d * (position + 1 - idx as u32))
        .sum();
    (weighted * 10) % 11 % 10
}

// Full 11-digit identifiers with correct check digits
fn national_id_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..10, 9)
        .prop_filter("not all equal", |d| d.iter().any(|x| *x != d[0]))
        .prop_map(|mut digits| {
            let first = check_digit(&digits);
            digits.push(first);
            let second = check_digit(&digits);
            digits.push(second);
            digits
        })
}

fn format_id(digits: &[u32]) -> String {
    let s: String = digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect();
    format!("{}.{}.{}-{}", &s[0..3], &s[3..6], &s[6..9], &s[9..11])
}

fn base_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 15, 10, 0, 0).unwrap()
}

fn garment_status_strategy() -> impl Strategy<Value = GarmentStatus> {
    prop_oneof![
        Just(GarmentStatus::Available),
        Just(GarmentStatus::Rented),
        Just(GarmentStatus::Reserved),
        Just(GarmentStatus::Maintenance),
    ]
}

fn rental_status_strategy() -> impl Strategy<Value = RentalStatus> {
    prop_oneof![
        Just(RentalStatus::Active),
        Just(RentalStatus::Settled),
        Just(RentalStatus::Late),
    ]
}

fn garment_model(status: GarmentStatus) -> garment::Model {
    garment::Model {
        id: Uuid::new_v4(),
        name: "Gown".into(),
        code: Uuid::new_v4().to_string(),
        category: GarmentCategory::Bridesmaid,
        size: "P".into(),
        color: "rose".into(),
        description: String::new(),
        rental_price: Decimal::new(15000, 2),
        status,
        photos: "[]".into(),
        created_at: base_now(),
        updated_at: base_now(),
    }
}

// (status, pickup offset hours, due offset hours from pickup, paid cents)
fn contract_strategy() -> impl Strategy<Value = rental_contract::Model> {
    (
        rental_status_strategy(),
        -24i64 * 60..24,
        0i64..24 * 10,
        0i64..100_000,
    )
        .prop_map(|(status, pickup_h, length_h, paid)| {
            let pickup = base_now() + Duration::hours(pickup_h);
            rental_contract::Model {
                id: Uuid::new_v4(),
                garment_id: Uuid::new_v4(),
                garment_name: "Gown".into(),
                customer_name: "Cliente".into(),
                customer_national_id: "52998224725".into(),
                customer_phone: "11999990000".into(),
                customer_address: "Rua A".into(),
                pickup_date: pickup,
                return_due: pickup + Duration::hours(length_h),
                agreed_price: Decimal::new(20000, 2),
                deposit: Decimal::ZERO,
                amount_paid: Decimal::new(paid, 2),
                payment_method: PaymentMethod::Cash,
                damage_notes: String::new(),
                remarks: String::new(),
                status,
                created_at: pickup,
                updated_at: pickup,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn well_formed_identifiers_validate(digits in national_id_strategy()) {
        let formatted = format_id(&digits);
        prop_assert!(is_valid_national_id(&formatted), "rejected {}", formatted);
        let bare = normalize_national_id(&formatted);
        prop_assert!(is_valid_national_id(&bare));
        prop_assert_eq!(bare.len(), 11);
    }

    #[test]
    fn wrong_last_check_digit_is_rejected(digits in national_id_strategy(), bump in 1u32..10) {
        let mut tampered = digits.clone();
        tampered[10] = (tampered[10] + bump) % 10;
        prop_assert!(!is_valid_national_id(&format_id(&tampered)));
    }

    #[test]
    fn any_substring_finds_its_field(field in "[A-Za-z ]{1,30}", start in 0usize..30, len in 1usize..10) {
        let start = start.min(field.len() - 1);
        let end = (start + len).min(field.len());
        let needle = field[start..end].to_uppercase();
        if !needle.trim().is_empty() {
            prop_assert!(matches_search(Some(&needle), &["unrelated", &field]));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn stats_partition_inventory_and_nest_revenue(
        statuses in prop::collection::vec(garment_status_strategy(), 0..20),
        contracts in prop::collection::vec(contract_strategy(), 0..30),
    ) {
        let garments: Vec<_> = statuses.into_iter().map(garment_model).collect();
        let stats = compute_stats(base_now(), &garments, &contracts);

        prop_assert_eq!(
            stats.available_garments + stats.rented_garments
                + stats.reserved_garments + stats.maintenance_garments,
            stats.total_garments
        );
        prop_assert!(stats.late_rentals + stats.due_soon_rentals <= stats.active_rentals);
        prop_assert!(stats.revenue.day <= stats.revenue.week);
        prop_assert!(stats.revenue.week <= stats.revenue.month);

        let active = contracts.iter().filter(|c| c.status == RentalStatus::Active).count() as u64;
        prop_assert_eq!(stats.active_rentals, active);
    }
}
