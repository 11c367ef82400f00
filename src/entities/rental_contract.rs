use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stored contract status. Lateness by the clock is derived, see `services::rental_status`.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RentalStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "settled")]
    Settled,
    #[sea_orm(string_value = "late")]
    Late,
}

impl RentalStatus {
    /// Whether a contract in this status still holds its garment.
    pub fn holds_garment(self) -> bool {
        !matches!(self, RentalStatus::Settled)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "pix")]
    Pix,
    #[sea_orm(string_value = "debit_card")]
    DebitCard,
    #[sea_orm(string_value = "credit_card")]
    CreditCard,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rental_contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub garment_id: Uuid,
    /// Garment name at booking time, kept for history after the garment is gone
    pub garment_name: String,
    pub customer_name: String,
    pub customer_national_id: String,
    pub customer_phone: String,
    #[sea_orm(column_type = "Text")]
    pub customer_address: String,
    pub pickup_date: DateTime<Utc>,
    pub return_due: DateTime<Utc>,
    pub agreed_price: Decimal,
    pub deposit: Decimal,
    pub amount_paid: Decimal,
    pub payment_method: PaymentMethod,
    #[sea_orm(column_type = "Text")]
    pub damage_notes: String,
    #[sea_orm(column_type = "Text")]
    pub remarks: String,
    pub status: RentalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}

impl Model {
    /// Outstanding amount; negative when the customer overpaid.
    pub fn balance(&self) -> Decimal {
        self.agreed_price - self.amount_paid
    }
}
