pub mod common;
pub mod dashboard;
pub mod garments;
pub mod realtime;
pub mod rentals;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::ChangeNotifier;
use crate::services::{
    dashboard::DashboardService, garments::GarmentService, new_write_gate,
    rentals::RentalService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub garments: Arc<GarmentService>,
    pub rentals: Arc<RentalService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Builds the services around one shared write gate.
    pub fn new(db_pool: Arc<DbPool>, notifier: ChangeNotifier) -> Self {
        let write_gate = new_write_gate();
        Self {
            garments: Arc::new(GarmentService::new(
                db_pool.clone(),
                notifier.clone(),
                write_gate.clone(),
            )),
            rentals: Arc::new(RentalService::new(
                db_pool.clone(),
                notifier,
                write_gate,
            )),
            dashboard: Arc::new(DashboardService::new(db_pool)),
        }
    }
}
