pub mod endpoints;
pub mod metrics;

pub use endpoints::monitoring_router;
