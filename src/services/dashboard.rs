use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::rental_status::classify;
use crate::db::DbPool;
use crate::entities::{garment, rental_contract, GarmentStatus, RentalStatus};
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RevenueWindows {
    /// Trailing 24 hours
    #[schema(value_type = String)]
    pub day: Decimal,
    /// Trailing 7 × 24 hours
    #[schema(value_type = String)]
    pub week: Decimal,
    /// Trailing 30 × 24 hours
    #[schema(value_type = String)]
    pub month: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total_garments: u64,
    pub available_garments: u64,
    pub rented_garments: u64,
    pub reserved_garments: u64,
    pub maintenance_garments: u64,
    pub active_rentals: u64,
    /// Active rentals past their return date right now
    pub late_rentals: u64,
    /// Active rentals due within the next three days
    pub due_soon_rentals: u64,
    pub revenue: RevenueWindows,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DbPool>,
}

impl DashboardService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, ServiceError> {
        let garments = garment::Entity::find().all(&*self.db).await?;
        let contracts = rental_contract::Entity::find().all(&*self.db).await?;
        Ok(compute_stats(now, &garments, &contracts))
    }
}

pub fn compute_stats(
    now: DateTime<Utc>,
    garments: &[garment::Model],
    contracts: &[rental_contract::Model],
) -> DashboardStats {
    let count_status =
        |status: GarmentStatus| garments.iter().filter(|g| g.status == status).count() as u64;

    let mut active_rentals = 0;
    let mut late_rentals = 0;
    let mut due_soon_rentals = 0;
    for contract in contracts.iter().filter(|c| c.status == RentalStatus::Active) {
        active_rentals += 1;
        let classification = classify(now, contract);
        if classification.is_late {
            late_rentals += 1;
        }
        if classification.is_due_soon {
            due_soon_rentals += 1;
        }
    }

    let revenue_since = |window: Duration| -> Decimal {
        let start = now - window;
        contracts
            .iter()
            .filter(|c| c.pickup_date > start && c.pickup_date <= now)
            .map(|c| c.amount_paid)
            .sum()
    };

    DashboardStats {
        total_garments: garments.len() as u64,
        available_garments: count_status(GarmentStatus::Available),
        rented_garments: count_status(GarmentStatus::Rented),
        reserved_garments: count_status(GarmentStatus::Reserved),
        maintenance_garments: count_status(GarmentStatus::Maintenance),
        active_rentals,
        late_rentals,
        due_soon_rentals,
        revenue: RevenueWindows {
            day: revenue_since(Duration::hours(24)),
            week: revenue_since(Duration::days(7)),
            month: revenue_since(Duration::days(30)),
        },
    }
}
