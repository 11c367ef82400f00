use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{
    created_response, no_content_response, JsonBody, Operator, PathParam, QueryParams,
};
use crate::entities::{rental_contract, PaymentMethod, RentalStatus};
use crate::errors::ServiceError;
use crate::services::rental_status::classify;
use crate::services::rentals::{CreateRental, RentalFilter, UpdateRental};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerView {
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub address: String,
}

/// Contract as shown to clients, with read-time derived flags.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RentalView {
    pub id: Uuid,
    pub garment_id: Uuid,
    pub garment_name: String,
    pub customer: CustomerView,
    pub pickup_date: DateTime<Utc>,
    pub return_due: DateTime<Utc>,
    #[schema(value_type = String)]
    pub agreed_price: Decimal,
    #[schema(value_type = String)]
    pub deposit: Decimal,
    #[schema(value_type = String)]
    pub amount_paid: Decimal,
    /// agreed_price - amount_paid; negative on overpayment
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub payment_method: PaymentMethod,
    pub damage_notes: String,
    pub remarks: String,
    pub status: RentalStatus,
    pub is_late: bool,
    pub is_due_soon: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalView {
    pub fn at(model: rental_contract::Model, now: DateTime<Utc>) -> Self {
        let classification = classify(now, &model);
        let balance = model.balance();
        Self {
            id: model.id,
            garment_id: model.garment_id,
            garment_name: model.garment_name,
            customer: CustomerView {
                full_name: model.customer_name,
                national_id: model.customer_national_id,
                phone: model.customer_phone,
                address: model.customer_address,
            },
            pickup_date: model.pickup_date,
            return_due: model.return_due,
            agreed_price: model.agreed_price,
            deposit: model.deposit,
            amount_paid: model.amount_paid,
            balance,
            payment_method: model.payment_method,
            damage_notes: model.damage_notes,
            remarks: model.remarks,
            status: model.status,
            is_late: classification.is_late,
            is_due_soon: classification.is_due_soon,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub fn rental_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rentals).post(create_rental))
        .route(
            "/{id}",
            get(get_rental).put(update_rental).delete(delete_rental),
        )
        .route("/{id}/settle-payment", post(settle_payment))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new().route("/{national_id}/rentals", get(customer_rental_history))
}

fn views(contracts: Vec<rental_contract::Model>, now: DateTime<Utc>) -> Vec<RentalView> {
    contracts
        .into_iter()
        .map(|c| RentalView::at(c, now))
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/rentals",
    params(RentalFilter),
    responses(
        (status = 200, description = "Rentals listed, newest first", body = ApiResponse<Vec<RentalView>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "rentals"
)]
pub async fn list_rentals(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<RentalFilter>,
) -> ApiResult<Vec<RentalView>> {
    let contracts = state.services.rentals.list(&filter).await?;
    Ok(Json(ApiResponse::success(views(
        contracts,
        state.clock.now(),
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/rentals",
    request_body = CreateRental,
    responses(
        (status = 201, description = "Rental created; garment is now rented", body = ApiResponse<RentalView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Garment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Garment not available", body = crate::errors::ErrorResponse)
    ),
    tag = "rentals"
)]
pub async fn create_rental(
    State(state): State<AppState>,
    operator: Operator,
    JsonBody(payload): JsonBody<CreateRental>,
) -> Result<Response, ServiceError> {
    let created = state
        .services
        .rentals
        .create(payload, operator.as_str())
        .await?;
    Ok(created_response(RentalView::at(created, state.clock.now())))
}

#[utoipa::path(
    get,
    path = "/api/v1/rentals/{id}",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental fetched", body = ApiResponse<RentalView>),
        (status = 404, description = "Rental not found", body = crate::errors::ErrorResponse)
    ),
    tag = "rentals"
)]
pub async fn get_rental(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<RentalView> {
    let contract = state.services.rentals.get(id).await?;
    Ok(Json(ApiResponse::success(RentalView::at(
        contract,
        state.clock.now(),
    ))))
}

#[utoipa::path(
    put,
    path = "/api/v1/rentals/{id}",
    params(("id" = Uuid, Path, description = "Rental ID")),
    request_body = UpdateRental,
    responses(
        (status = 200, description = "Rental updated", body = ApiResponse<RentalView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Rental not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Garment not available for reopening", body = crate::errors::ErrorResponse)
    ),
    tag = "rentals"
)]
pub async fn update_rental(
    State(state): State<AppState>,
    operator: Operator,
    PathParam(id): PathParam<Uuid>,
    JsonBody(patch): JsonBody<UpdateRental>,
) -> ApiResult<RentalView> {
    let updated = state
        .services
        .rentals
        .update(id, patch, operator.as_str())
        .await?;
    Ok(Json(ApiResponse::success(RentalView::at(
        updated,
        state.clock.now(),
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/rentals/{id}/settle-payment",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Amount paid set to the agreed price", body = ApiResponse<RentalView>),
        (status = 404, description = "Rental not found", body = crate::errors::ErrorResponse)
    ),
    tag = "rentals"
)]
pub async fn settle_payment(
    State(state): State<AppState>,
    operator: Operator,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<RentalView> {
    let updated = state
        .services
        .rentals
        .settle_payment(id, operator.as_str())
        .await?;
    Ok(Json(ApiResponse::success(RentalView::at(
        updated,
        state.clock.now(),
    ))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/rentals/{id}",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 204, description = "Rental deleted"),
        (status = 404, description = "Rental not found", body = crate::errors::ErrorResponse)
    ),
    tag = "rentals"
)]
pub async fn delete_rental(
    State(state): State<AppState>,
    operator: Operator,
    PathParam(id): PathParam<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.rentals.delete(id, operator.as_str()).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{national_id}/rentals",
    params(("national_id" = String, Path, description = "Customer national identifier, punctuation optional")),
    responses(
        (status = 200, description = "Rentals of the customer, newest first", body = ApiResponse<Vec<RentalView>>),
        (status = 400, description = "Malformed identifier", body = crate::errors::ErrorResponse)
    ),
    tag = "rentals"
)]
pub async fn customer_rental_history(
    State(state): State<AppState>,
    PathParam(national_id): PathParam<String>,
) -> ApiResult<Vec<RentalView>> {
    let contracts = state
        .services
        .rentals
        .history_for_customer(&national_id)
        .await?;
    Ok(Json(ApiResponse::success(views(
        contracts,
        state.clock.now(),
    ))))
}
