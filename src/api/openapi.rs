//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Print Queue Server",
        version = "0.1.0",
        description = "API server for the campus print-shop queue: job submission, fair queue ordering, batch lifecycle, and real-time updates"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Job endpoints
        api::jobs::submit_job,
        api::jobs::get_queue,
        api::jobs::get_user_jobs,
        api::jobs::get_user_stats,
        api::jobs::get_all_jobs,
        api::jobs::get_batches,
        api::jobs::update_status,
        api::jobs::pay_job,
        api::jobs::pay_batch,
        api::jobs::pay_user,
        api::jobs::confirm_presence,
        api::jobs::start_batch_printing,
        api::jobs::skip_batch,
        api::jobs::change_printer,
        api::jobs::mark_collected,
        api::jobs::delete_job,
        api::jobs::delete_batch,
        // Payment endpoints
        api::payments::webhook,
        api::payments::verify,
        // Printer endpoints
        api::printers::list_printers,
        api::printers::create_printer,
        api::printers::update_printer,
        api::printers::delete_printer,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Jobs
            models::JobStatus,
            models::PaymentMethod,
            models::PaymentState,
            models::PrintSides,
            models::ColorMode,
            models::PrintDetails,
            models::SubmitPrintDetails,
            models::SubmitJobRequest,
            models::UpdateStatusRequest,
            models::ChangePrinterRequest,
            models::JobView,
            models::QueueStats,
            models::SkipBatchResponse,
            models::JobsUpdatedResponse,
            models::BatchSummary,
            // Payments
            api::payments::PaymentWebhookRequest,
            // Printers
            models::PrinterStatus,
            models::CreatePrinterRequest,
            models::UpdatePrinterRequest,
            models::PrinterView,
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Jobs", description = "Job submission, queue, and lifecycle"),
        (name = "Payments", description = "Payment settlement"),
        (name = "Printers", description = "Printer management"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add admin key security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Admin-Key"),
                    ),
                ),
            );
        }
    }
}
