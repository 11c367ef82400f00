use axum::response::Json;
use utoipa::OpenApi;

use crate::entities::{GarmentCategory, GarmentStatus, PaymentMethod, RentalStatus};
use crate::errors::ErrorResponse;
use crate::handlers::garments::GarmentView;
use crate::handlers::rentals::{CustomerView, RentalView};
use crate::services::dashboard::{DashboardStats, RevenueWindows};
use crate::services::garments::{CreateGarment, UpdateGarment};
use crate::services::rentals::{CreateRental, CustomerInput, UpdateRental};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rental API",
        version = "1.0.0",
        description = r#"
# Garment Rental API

Inventory of rentable garments and the rental contracts written against them.

- **Garments**: catalogue with category, size and availability status
- **Rentals**: contracts that hold a garment from pickup until they are settled
- **Dashboard**: inventory counts, late and due-soon rentals, revenue windows

Every successful change is announced on the `/ws` socket as `{"type":"update"}`.
Clients re-read whatever they show when it arrives.

Mutating requests may carry an `x-operator-id` header; it is recorded in the audit log only.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "garments", description = "Garment inventory"),
        (name = "rentals", description = "Rental contracts"),
        (name = "dashboard", description = "Shop overview")
    ),
    paths(
        crate::handlers::garments::list_garments,
        crate::handlers::garments::create_garment,
        crate::handlers::garments::get_garment,
        crate::handlers::garments::update_garment,
        crate::handlers::garments::delete_garment,
        crate::handlers::garments::garment_rental_history,
        crate::handlers::rentals::list_rentals,
        crate::handlers::rentals::create_rental,
        crate::handlers::rentals::get_rental,
        crate::handlers::rentals::update_rental,
        crate::handlers::rentals::settle_payment,
        crate::handlers::rentals::delete_rental,
        crate::handlers::rentals::customer_rental_history,
        crate::handlers::dashboard::dashboard_stats,
    ),
    components(
        schemas(
            GarmentView,
            CreateGarment,
            UpdateGarment,
            GarmentCategory,
            GarmentStatus,
            RentalView,
            CustomerView,
            CreateRental,
            CustomerInput,
            UpdateRental,
            RentalStatus,
            PaymentMethod,
            DashboardStats,
            RevenueWindows,
            ErrorResponse,
        )
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
