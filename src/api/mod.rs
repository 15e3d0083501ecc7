//! API endpoint modules.

pub mod health;
pub mod jobs;
pub mod openapi;
pub mod payments;
pub mod printers;
pub mod websocket;

pub use health::configure_health_routes;
pub use jobs::configure_routes as configure_job_routes;
pub use openapi::ApiDoc;
pub use payments::configure_routes as configure_payment_routes;
pub use printers::configure_routes as configure_printer_routes;
pub use websocket::configure_routes as configure_websocket_routes;
