pub mod garment;
pub mod rental_contract;

pub use garment::{GarmentCategory, GarmentStatus};
pub use rental_contract::{PaymentMethod, RentalStatus};
