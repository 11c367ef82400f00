use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::validation::{matches_search, validate_non_negative, validate_not_blank};
use super::WriteGate;
use crate::db::DbPool;
use crate::entities::garment::{self, encode_photos, GarmentCategory, GarmentStatus};
use crate::entities::{rental_contract, RentalStatus};
use crate::errors::ServiceError;
use crate::events::{ChangeNotifier, Event};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGarment {
    #[validate(custom = "validate_not_blank")]
    pub name: String,
    #[validate(custom = "validate_not_blank")]
    pub code: String,
    pub category: GarmentCategory,
    #[validate(custom = "validate_not_blank")]
    pub size: String,
    #[validate(custom = "validate_not_blank")]
    pub color: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = String, example = "200.00")]
    pub rental_price: Decimal,
    #[serde(default)]
    pub status: Option<GarmentStatus>,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Sparse garment edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateGarment {
    #[validate(custom = "validate_not_blank")]
    pub name: Option<String>,
    #[validate(custom = "validate_not_blank")]
    pub code: Option<String>,
    pub category: Option<GarmentCategory>,
    #[validate(custom = "validate_not_blank")]
    pub size: Option<String>,
    #[validate(custom = "validate_not_blank")]
    pub color: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_non_negative")]
    #[schema(value_type = Option<String>, example = "180.00")]
    pub rental_price: Option<Decimal>,
    pub status: Option<GarmentStatus>,
    pub photos: Option<Vec<String>>,
}

impl UpdateGarment {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.category.is_none()
            && self.size.is_none()
            && self.color.is_none()
            && self.description.is_none()
            && self.rental_price.is_none()
            && self.status.is_none()
            && self.photos.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GarmentFilter {
    pub category: Option<GarmentCategory>,
    pub status: Option<GarmentStatus>,
    pub size: Option<String>,
    /// Matches name or code, case-insensitively
    pub search: Option<String>,
}

/// Garment inventory operations.
#[derive(Clone)]
pub struct GarmentService {
    db: Arc<DbPool>,
    notifier: ChangeNotifier,
    write_gate: WriteGate,
}

impl GarmentService {
    pub fn new(db: Arc<DbPool>, notifier: ChangeNotifier, write_gate: WriteGate) -> Self {
        Self {
            db,
            notifier,
            write_gate,
        }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(
        &self,
        input: CreateGarment,
        operator: &str,
    ) -> Result<garment::Model, ServiceError> {
        input.validate()?;
        let code = input.code.trim().to_string();

        let _guard = self.write_gate.lock().await;
        let db = &*self.db;
        self.ensure_code_free(&code, None).await?;

        let created = garment::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            code: Set(code),
            category: Set(input.category),
            size: Set(input.size.trim().to_string()),
            color: Set(input.color.trim().to_string()),
            description: Set(input.description),
            rental_price: Set(input.rental_price),
            status: Set(input.status.unwrap_or(GarmentStatus::Available)),
            photos: Set(encode_photos(&input.photos)),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(garment_id = %created.id, operator, "garment created");
        self.notifier.publish(Event::GarmentCreated(created.id));
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<garment::Model, ServiceError> {
        garment::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Garment", id))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: UpdateGarment,
        operator: &str,
    ) -> Result<garment::Model, ServiceError> {
        patch.validate()?;
        if patch.is_empty() {
            return Err(ServiceError::ValidationError(
                "no fields to update".to_string(),
            ));
        }

        let _guard = self.write_gate.lock().await;
        let existing = self.get(id).await?;

        let mut active: garment::ActiveModel = existing.into();
        if let Some(code) = patch.code {
            let code = code.trim().to_string();
            self.ensure_code_free(&code, Some(id)).await?;
            active.code = Set(code);
        }
        if let Some(name) = patch.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(category) = patch.category {
            active.category = Set(category);
        }
        if let Some(size) = patch.size {
            active.size = Set(size.trim().to_string());
        }
        if let Some(color) = patch.color {
            active.color = Set(color.trim().to_string());
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(price) = patch.rental_price {
            active.rental_price = Set(price);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(photos) = patch.photos {
            active.photos = Set(encode_photos(&photos));
        }

        let updated = active.update(&*self.db).await?;

        info!(garment_id = %id, operator, status = %updated.status, "garment updated");
        self.notifier.publish(Event::GarmentUpdated(id));
        Ok(updated)
    }

    /// Removes a garment. Settled contracts keep referring to it by id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, operator: &str) -> Result<(), ServiceError> {
        let _guard = self.write_gate.lock().await;
        let txn = self.db.begin().await?;

        let existing = garment::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Garment", id))?;

        let holding = rental_contract::Entity::find()
            .filter(rental_contract::Column::GarmentId.eq(id))
            .filter(rental_contract::Column::Status.ne(RentalStatus::Settled))
            .count(&txn)
            .await?;
        if holding > 0 {
            return Err(ServiceError::Conflict(format!(
                "garment {} is held by an open rental and cannot be deleted",
                existing.code
            )));
        }

        garment::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(garment_id = %id, operator, "garment deleted");
        self.notifier.publish(Event::GarmentDeleted(id));
        Ok(())
    }

    /// Garments matching every given filter, oldest first.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &GarmentFilter) -> Result<Vec<garment::Model>, ServiceError> {
        let mut query = garment::Entity::find();
        if let Some(category) = filter.category {
            query = query.filter(garment::Column::Category.eq(category));
        }
        if let Some(status) = filter.status {
            query = query.filter(garment::Column::Status.eq(status));
        }
        if let Some(size) = filter.size.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(garment::Column::Size.eq(size));
        }

        let garments = query
            .order_by_asc(garment::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(garments
            .into_iter()
            .filter(|g| {
                matches_search(filter.search.as_deref(), &[&g.name, &g.code])
            })
            .collect())
    }

    async fn ensure_code_free(&self, code: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let clash = garment::Entity::find()
            .filter(garment::Column::Code.eq(code))
            .one(&*self.db)
            .await?;
        match clash {
            Some(other) if Some(other.id) != except => Err(ServiceError::Conflict(format!(
                "garment code {} is already in use",
                code
            ))),
            _ => Ok(()),
        }
    }
}
