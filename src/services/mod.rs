pub mod dashboard;
pub mod garments;
pub mod rental_status;
pub mod rentals;
pub mod validation;

use std::sync::Arc;
use tokio::sync::Mutex;

/// Serializes every mutation across garments and rentals.
pub type WriteGate = Arc<Mutex<()>>;

pub fn new_write_gate() -> WriteGate {
    Arc::new(Mutex::new(()))
}
