use axum::{
    extract::State,
    response::Response,
    routing::get,
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
use super::rentals::RentalView;
use crate::entities::{garment, GarmentCategory, GarmentStatus};
use crate::errors::ServiceError;
use crate::services::garments::{CreateGarment, GarmentFilter, UpdateGarment};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GarmentView {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub category: GarmentCategory,
    pub size: String,
    pub color: String,
    pub description: String,
    #[schema(value_type = String, example = "200.00")]
    pub rental_price: Decimal,
    pub status: GarmentStatus,
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<garment::Model> for GarmentView {
    fn from(model: garment::Model) -> Self {
        let photos = model.photo_list();
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            category: model.category,
            size: model.size,
            color: model.color,
            description: model.description,
            rental_price: model.rental_price,
            status: model.status,
            photos,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub fn garment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_garments).post(create_garment))
        .route(
            "/{id}",
            get(get_garment).put(update_garment).delete(delete_garment),
        )
        .route("/{id}/rentals", get(garment_rental_history))
}

#[utoipa::path(
    get,
    path = "/api/v1/garments",
    params(GarmentFilter),
    responses(
        (status = 200, description = "Garments listed", body = ApiResponse<Vec<GarmentView>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "garments"
)]
pub async fn list_garments(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<GarmentFilter>,
) -> ApiResult<Vec<GarmentView>> {
    let garments = state.services.garments.list(&filter).await?;
    Ok(Json(ApiResponse::success(
        garments.into_iter().map(GarmentView::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/garments",
    request_body = CreateGarment,
    responses(
        (status = 201, description = "Garment created", body = ApiResponse<GarmentView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "garments"
)]
pub async fn create_garment(
    State(state): State<AppState>,
    operator: Operator,
    JsonBody(payload): JsonBody<CreateGarment>,
) -> Result<Response, ServiceError> {
    let created = state
        .services
        .garments
        .create(payload, operator.as_str())
        .await?;
    Ok(created_response(GarmentView::from(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/garments/{id}",
    params(("id" = Uuid, Path, description = "Garment ID")),
    responses(
        (status = 200, description = "Garment fetched", body = ApiResponse<GarmentView>),
        (status = 404, description = "Garment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "garments"
)]
pub async fn get_garment(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<GarmentView> {
    let garment = state.services.garments.get(id).await?;
    Ok(Json(ApiResponse::success(GarmentView::from(garment))))
}

#[utoipa::path(
    put,
    path = "/api/v1/garments/{id}",
    params(("id" = Uuid, Path, description = "Garment ID")),
    request_body = UpdateGarment,
    responses(
        (status = 200, description = "Garment updated", body = ApiResponse<GarmentView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Garment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "garments"
)]
pub async fn update_garment(
    State(state): State<AppState>,
    operator: Operator,
    PathParam(id): PathParam<Uuid>,
    JsonBody(patch): JsonBody<UpdateGarment>,
) -> ApiResult<GarmentView> {
    let updated = state
        .services
        .garments
        .update(id, patch, operator.as_str())
        .await?;
    Ok(Json(ApiResponse::success(GarmentView::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/garments/{id}",
    params(("id" = Uuid, Path, description = "Garment ID")),
    responses(
        (status = 204, description = "Garment deleted"),
        (status = 404, description = "Garment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Garment held by an open rental", body = crate::errors::ErrorResponse)
    ),
    tag = "garments"
)]
pub async fn delete_garment(
    State(state): State<AppState>,
    operator: Operator,
    PathParam(id): PathParam<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.garments.delete(id, operator.as_str()).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/garments/{id}/rentals",
    params(("id" = Uuid, Path, description = "Garment ID")),
    responses(
        (status = 200, description = "Rental history of the garment, newest first", body = ApiResponse<Vec<RentalView>>)
    ),
    tag = "garments"
)]
pub async fn garment_rental_history(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Vec<RentalView>> {
    let now = state.clock.now();
    let contracts = state.services.rentals.history_for_garment(id).await?;
    Ok(Json(ApiResponse::success(
        contracts
            .into_iter()
            .map(|c| RentalView::at(c, now))
            .collect(),
    )))
}
