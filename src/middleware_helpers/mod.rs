pub mod audit;
pub mod request_id;

pub use audit::{audit_middleware, operator_from_headers, OPERATOR_HEADER};
pub use request_id::request_id_middleware;
