use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validation::{
    matches_search, normalize_national_id, validate_national_id, validate_non_negative,
    validate_not_blank,
};
use super::WriteGate;
use crate::db::DbPool;
use crate::entities::{garment, rental_contract, GarmentStatus, PaymentMethod, RentalStatus};
use crate::errors::ServiceError;
use crate::events::{ChangeNotifier, Event};

/// Customer details copied onto each contract.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[validate(custom = "validate_not_blank")]
    pub full_name: String,
    #[validate(custom = "validate_national_id")]
    #[schema(example = "529.982.247-25")]
    pub national_id: String,
    #[validate(custom = "validate_not_blank")]
    pub phone: String,
    #[validate(custom = "validate_not_blank")]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_rental_dates"))]
pub struct CreateRental {
    pub garment_id: Uuid,
    #[validate]
    pub customer: CustomerInput,
    pub pickup_date: DateTime<Utc>,
    pub return_due: DateTime<Utc>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "200.00")]
    pub agreed_price: Decimal,
    #[validate(custom = "validate_non_negative")]
    #[serde(default)]
    #[schema(value_type = String, example = "50.00")]
    pub deposit: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub remarks: String,
}

fn validate_rental_dates(input: &CreateRental) -> Result<(), ValidationError> {
    if input.return_due < input.pickup_date {
        let mut err = ValidationError::new("return_due");
        err.message = Some("return_due must not be before pickup_date".into());
        return Err(err);
    }
    Ok(())
}

/// Sparse contract edit. A field is applied only when present.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRental {
    pub status: Option<RentalStatus>,
    pub damage_notes: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>, example = "120.00")]
    pub amount_paid: Option<Decimal>,
    pub remarks: Option<String>,
}

impl UpdateRental {
    fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.damage_notes.is_none()
            && self.amount_paid.is_none()
            && self.remarks.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RentalFilter {
    pub status: Option<RentalStatus>,
    pub garment_id: Option<Uuid>,
    /// Matches customer name, national id or garment name, case-insensitively
    pub search: Option<String>,
}

/// Rental contract reconciliation: every write keeps contracts and garment
/// availability consistent and announces itself on the change notifier.
#[derive(Clone)]
pub struct RentalService {
    db: Arc<DbPool>,
    notifier: ChangeNotifier,
    write_gate: WriteGate,
}

impl RentalService {
    pub fn new(db: Arc<DbPool>, notifier: ChangeNotifier, write_gate: WriteGate) -> Self {
        Self {
            db,
            notifier,
            write_gate,
        }
    }

    /// Books an available garment; the garment becomes rented.
    #[instrument(skip(self, input), fields(garment_id = %input.garment_id))]
    pub async fn create(
        &self,
        input: CreateRental,
        operator: &str,
    ) -> Result<rental_contract::Model, ServiceError> {
        input.validate()?;

        let _guard = self.write_gate.lock().await;
        let txn = self.db.begin().await?;

        let item = find_garment(&txn, input.garment_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Garment", input.garment_id))?;
        if item.status != GarmentStatus::Available {
            return Err(ServiceError::Conflict(format!(
                "garment {} is {} and cannot be rented",
                item.code, item.status
            )));
        }
        ensure_not_held(&txn, item.id, None).await?;

        let customer = input.customer;
        let contract = rental_contract::ActiveModel {
            id: Set(Uuid::new_v4()),
            garment_id: Set(item.id),
            garment_name: Set(item.name.clone()),
            customer_name: Set(customer.full_name.trim().to_string()),
            customer_national_id: Set(normalize_national_id(&customer.national_id)),
            customer_phone: Set(customer.phone.trim().to_string()),
            customer_address: Set(customer.address.trim().to_string()),
            pickup_date: Set(input.pickup_date),
            return_due: Set(input.return_due),
            agreed_price: Set(input.agreed_price),
            deposit: Set(input.deposit),
            amount_paid: Set(Decimal::ZERO),
            payment_method: Set(input.payment_method),
            damage_notes: Set(String::new()),
            remarks: Set(input.remarks),
            status: Set(RentalStatus::Active),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        set_garment_status(&txn, item, GarmentStatus::Rented).await?;
        txn.commit().await?;

        info!(rental_id = %contract.id, operator, "rental created");
        self.notifier.publish(Event::RentalCreated {
            rental_id: contract.id,
            garment_id: contract.garment_id,
        });
        Ok(contract)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<rental_contract::Model, ServiceError> {
        rental_contract::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Rental", id))
    }

    /// Applies a sparse edit. Settling frees the garment unless it went to
    /// maintenance meanwhile; reopening takes the garment back and fails if it
    /// is no longer available.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: UpdateRental,
        operator: &str,
    ) -> Result<rental_contract::Model, ServiceError> {
        patch.validate()?;
        if patch.is_empty() {
            return Err(ServiceError::ValidationError(
                "no fields to update".to_string(),
            ));
        }

        let _guard = self.write_gate.lock().await;
        let txn = self.db.begin().await?;

        let existing = rental_contract::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Rental", id))?;
        let previous = existing.status;
        let garment_id = existing.garment_id;

        let mut event = Event::RentalUpdated(id);
        if let Some(next) = patch.status {
            if previous.holds_garment() && !next.holds_garment() {
                release_garment(&txn, garment_id, id).await?;
                event = Event::RentalSettled {
                    rental_id: id,
                    garment_id,
                };
            } else if !previous.holds_garment() && next.holds_garment() {
                reclaim_garment(&txn, garment_id, id).await?;
                event = Event::RentalReopened {
                    rental_id: id,
                    garment_id,
                };
            }
        }

        let mut active: rental_contract::ActiveModel = existing.into();
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(notes) = patch.damage_notes {
            active.damage_notes = Set(notes);
        }
        if let Some(paid) = patch.amount_paid {
            active.amount_paid = Set(paid);
        }
        if let Some(remarks) = patch.remarks {
            active.remarks = Set(remarks);
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(
            rental_id = %id,
            operator,
            from = %previous,
            to = %updated.status,
            "rental updated"
        );
        self.notifier.publish(event);
        Ok(updated)
    }

    /// Records full payment: `amount_paid = agreed_price`. Status is unchanged.
    #[instrument(skip(self))]
    pub async fn settle_payment(
        &self,
        id: Uuid,
        operator: &str,
    ) -> Result<rental_contract::Model, ServiceError> {
        let _guard = self.write_gate.lock().await;
        let existing = self.get(id).await?;
        let agreed = existing.agreed_price;

        let mut active: rental_contract::ActiveModel = existing.into();
        active.amount_paid = Set(agreed);
        let updated = active.update(&*self.db).await?;

        info!(rental_id = %id, operator, amount_paid = %agreed, "rental paid in full");
        self.notifier.publish(Event::RentalUpdated(id));
        Ok(updated)
    }

    /// Deletes the contract. The garment is freed only when this contract was
    /// the one holding it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, operator: &str) -> Result<(), ServiceError> {
        let _guard = self.write_gate.lock().await;
        let txn = self.db.begin().await?;

        let existing = rental_contract::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Rental", id))?;

        if existing.status.holds_garment() {
            if let Some(item) = find_garment(&txn, existing.garment_id).await? {
                if item.status == GarmentStatus::Rented {
                    set_garment_status(&txn, item, GarmentStatus::Available).await?;
                }
            }
        }

        rental_contract::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(rental_id = %id, operator, "rental deleted");
        self.notifier.publish(Event::RentalDeleted(id));
        Ok(())
    }

    /// Contracts matching every given filter, newest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &RentalFilter,
    ) -> Result<Vec<rental_contract::Model>, ServiceError> {
        let mut query = rental_contract::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(rental_contract::Column::Status.eq(status));
        }
        if let Some(garment_id) = filter.garment_id {
            query = query.filter(rental_contract::Column::GarmentId.eq(garment_id));
        }

        let contracts = query
            .order_by_desc(rental_contract::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(contracts
            .into_iter()
            .filter(|c| {
                matches_search(
                    filter.search.as_deref(),
                    &[&c.customer_name, &c.customer_national_id, &c.garment_name],
                )
            })
            .collect())
    }

    /// Every contract ever written for a garment, including after its deletion.
    pub async fn history_for_garment(
        &self,
        garment_id: Uuid,
    ) -> Result<Vec<rental_contract::Model>, ServiceError> {
        self.list(&RentalFilter {
            garment_id: Some(garment_id),
            ..Default::default()
        })
        .await
    }

    pub async fn history_for_customer(
        &self,
        national_id: &str,
    ) -> Result<Vec<rental_contract::Model>, ServiceError> {
        let national_id = normalize_national_id(national_id);
        if national_id.is_empty() {
            return Err(ServiceError::ValidationError(
                "national_id must contain digits".to_string(),
            ));
        }

        Ok(rental_contract::Entity::find()
            .filter(rental_contract::Column::CustomerNationalId.eq(national_id))
            .order_by_desc(rental_contract::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}

async fn find_garment<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<garment::Model>, ServiceError> {
    Ok(garment::Entity::find_by_id(id).one(db).await?)
}

async fn set_garment_status<C: ConnectionTrait>(
    db: &C,
    item: garment::Model,
    status: GarmentStatus,
) -> Result<garment::Model, ServiceError> {
    let mut active: garment::ActiveModel = item.into();
    active.status = Set(status);
    Ok(active.update(db).await?)
}

/// At most one open contract may hold a garment.
async fn ensure_not_held<C: ConnectionTrait>(
    db: &C,
    garment_id: Uuid,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = rental_contract::Entity::find()
        .filter(rental_contract::Column::GarmentId.eq(garment_id))
        .filter(rental_contract::Column::Status.ne(RentalStatus::Settled));
    if let Some(rental_id) = except {
        query = query.filter(rental_contract::Column::Id.ne(rental_id));
    }

    if query.count(db).await? > 0 {
        return Err(ServiceError::Conflict(format!(
            "garment {} is already held by another open rental",
            garment_id
        )));
    }
    Ok(())
}

async fn release_garment<C: ConnectionTrait>(
    db: &C,
    garment_id: Uuid,
    rental_id: Uuid,
) -> Result<(), ServiceError> {
    match find_garment(db, garment_id).await? {
        Some(item) if item.status == GarmentStatus::Maintenance => {
            info!(%rental_id, %garment_id, "garment stays in maintenance after settlement");
        }
        Some(item) => {
            set_garment_status(db, item, GarmentStatus::Available).await?;
        }
        None => {
            warn!(%rental_id, %garment_id, "settled rental refers to a deleted garment");
        }
    }
    Ok(())
}

async fn reclaim_garment<C: ConnectionTrait>(
    db: &C,
    garment_id: Uuid,
    rental_id: Uuid,
) -> Result<(), ServiceError> {
    let item = find_garment(db, garment_id).await?.ok_or_else(|| {
        ServiceError::Conflict(format!(
            "garment {} no longer exists; rental cannot be reopened",
            garment_id
        ))
    })?;
    if item.status != GarmentStatus::Available {
        return Err(ServiceError::Conflict(format!(
            "garment {} is {}; rental cannot be reopened",
            item.code, item.status
        )));
    }
    ensure_not_held(db, garment_id, Some(rental_id)).await?;
    set_garment_status(db, item, GarmentStatus::Rented).await?;
    Ok(())
}
