mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use rental_api::{
    clock::SystemClock,
    config::AppConfig,
    db,
    entities::{
        garment, rental_contract, GarmentCategory, GarmentStatus, PaymentMethod, RentalStatus,
    },
    errors::ServiceError,
    services::{
        garments::{CreateGarment, GarmentFilter, UpdateGarment},
        rentals::{CreateRental, CustomerInput, UpdateRental},
    },
    AppState,
};

use common::{TestApp, CUSTOMER_ID};

fn new_garment(code: &str) -> CreateGarment {
    CreateGarment {
        name: format!("Dress {code}"),
        code: code.to_string(),
        category: GarmentCategory::Debutante,
        size: "38".into(),
        color: "lilac".into(),
        description: String::new(),
        rental_price: dec!(350.00),
        status: None,
        photos: vec![],
    }
}

fn new_rental(garment_id: Uuid, app: &TestApp) -> CreateRental {
    let now = app.now();
    CreateRental {
        garment_id,
        customer: CustomerInput {
            full_name: "Joana Prado".into(),
            national_id: CUSTOMER_ID.into(),
            phone: "11 98888-7777".into(),
            address: "Av. Central 12".into(),
        },
        pickup_date: now,
        return_due: now + Duration::days(3),
        agreed_price: dec!(350.00),
        deposit: dec!(100.00),
        payment_method: PaymentMethod::CreditCard,
        remarks: String::new(),
    }
}

#[tokio::test]
async fn contract_and_garment_move_together() {
    let app = TestApp::new().await;
    let services = &app.state.services;
    let item = services.garments.create(new_garment("S-1"), "clerk").await.unwrap();

    let contract = services
        .rentals
        .create(new_rental(item.id, &app), "clerk")
        .await
        .unwrap();
    assert_eq!(contract.status, RentalStatus::Active);
    assert_eq!(contract.amount_paid, dec!(0));
    assert_eq!(contract.customer_national_id, "52998224725");
    assert_eq!(
        services.garments.get(item.id).await.unwrap().status,
        GarmentStatus::Rented
    );

    let settled = services
        .rentals
        .update(
            contract.id,
            UpdateRental {
                status: Some(RentalStatus::Settled),
                ..Default::default()
            },
            "clerk",
        )
        .await
        .unwrap();
    assert_eq!(settled.status, RentalStatus::Settled);
    assert_eq!(
        services.garments.get(item.id).await.unwrap().status,
        GarmentStatus::Available
    );
}

#[tokio::test]
async fn error_variants_follow_check_order() {
    let app = TestApp::new().await;
    let services = &app.state.services;

    let mut invalid = new_rental(Uuid::new_v4(), &app);
    invalid.customer.phone = " ".into();
    assert_matches!(
        services.rentals.create(invalid, "clerk").await,
        Err(ServiceError::ValidationError(_))
    );

    assert_matches!(
        services.rentals.create(new_rental(Uuid::new_v4(), &app), "clerk").await,
        Err(ServiceError::NotFound(_))
    );

    let mut reserved = new_garment("S-2");
    reserved.status = Some(GarmentStatus::Reserved);
    let reserved = services.garments.create(reserved, "clerk").await.unwrap();
    let conflict = services
        .rentals
        .create(new_rental(reserved.id, &app), "clerk")
        .await;
    assert_matches!(conflict, Err(ServiceError::Conflict(msg)) if msg.contains("reserved"));

    assert_matches!(
        services
            .rentals
            .update(Uuid::new_v4(), UpdateRental::default(), "clerk")
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        services
            .rentals
            .update(
                Uuid::new_v4(),
                UpdateRental {
                    remarks: Some("x".into()),
                    ..Default::default()
                },
                "clerk"
            )
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        services.rentals.settle_payment(Uuid::new_v4(), "clerk").await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        services
            .garments
            .update(reserved.id, UpdateGarment::default(), "clerk")
            .await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn settling_after_garment_deletion_only_warns() {
    let app = TestApp::new().await;
    let services = &app.state.services;
    let item = services.garments.create(new_garment("S-3"), "clerk").await.unwrap();
    let contract = services
        .rentals
        .create(new_rental(item.id, &app), "clerk")
        .await
        .unwrap();

    // Bypass the service guard to simulate a garment removed out of band
    garment::Entity::delete_by_id(item.id)
        .exec(&*app.state.db)
        .await
        .unwrap();

    let settled = services
        .rentals
        .update(
            contract.id,
            UpdateRental {
                status: Some(RentalStatus::Settled),
                ..Default::default()
            },
            "clerk",
        )
        .await
        .unwrap();
    assert_eq!(settled.status, RentalStatus::Settled);

    let reopened = services
        .rentals
        .update(
            contract.id,
            UpdateRental {
                status: Some(RentalStatus::Active),
                ..Default::default()
            },
            "clerk",
        )
        .await;
    assert_matches!(reopened, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn active_and_late_switch_without_touching_the_garment() {
    let app = TestApp::new().await;
    let services = &app.state.services;
    let item = services.garments.create(new_garment("S-4"), "clerk").await.unwrap();
    let contract = services
        .rentals
        .create(new_rental(item.id, &app), "clerk")
        .await
        .unwrap();

    for status in [RentalStatus::Late, RentalStatus::Active] {
        let updated = services
            .rentals
            .update(
                contract.id,
                UpdateRental {
                    status: Some(status),
                    ..Default::default()
                },
                "clerk",
            )
            .await
            .unwrap();
        assert_eq!(updated.status, status);
        assert_eq!(
            services.garments.get(item.id).await.unwrap().status,
            GarmentStatus::Rented
        );
    }
}

#[tokio::test]
async fn every_successful_mutation_notifies_once() {
    let app = TestApp::new().await;
    let services = &app.state.services;
    let mut observer = app.state.notifier.subscribe();

    let item = services.garments.create(new_garment("S-5"), "clerk").await.unwrap();
    let contract = services
        .rentals
        .create(new_rental(item.id, &app), "clerk")
        .await
        .unwrap();
    services.rentals.settle_payment(contract.id, "clerk").await.unwrap();
    services.rentals.delete(contract.id, "clerk").await.unwrap();
    services.garments.delete(item.id, "clerk").await.unwrap();
    let _ = services.garments.get(item.id).await;

    let mut received = 0;
    while observer.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 5);
}

#[tokio::test]
async fn filters_are_conjunctive() {
    let app = TestApp::new().await;
    let services = &app.state.services;
    let mut bridal = new_garment("S-6");
    bridal.category = GarmentCategory::Bridal;
    bridal.name = "Sereia Bridal".into();
    services.garments.create(bridal, "clerk").await.unwrap();
    services.garments.create(new_garment("S-7"), "clerk").await.unwrap();

    let found = services
        .garments
        .list(&GarmentFilter {
            category: Some(GarmentCategory::Bridal),
            search: Some("SEREIA".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let none = services
        .garments
        .list(&GarmentFilter {
            category: Some(GarmentCategory::Debutante),
            search: Some("sereia".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn migrations_are_idempotent_on_a_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rental.db");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let mut cfg = AppConfig::new(url, "127.0.0.1".into(), 0, "test".into());
    cfg.db_max_connections = 1;

    let pool = db::establish_connection_from_app_config(&cfg).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let state = AppState::new(Arc::new(pool), cfg, Arc::new(SystemClock));
    let item = state
        .services
        .garments
        .create(new_garment("FILE-1"), "clerk")
        .await
        .unwrap();
    assert!(item.created_at <= Utc::now());
    assert_eq!(garment::Entity::find().count(&*state.db).await.unwrap(), 1);
    assert_eq!(
        rental_contract::Entity::find().count(&*state.db).await.unwrap(),
        0
    );
}
