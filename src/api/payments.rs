//! Payment API handlers: the two faces of the external gateway contract.
//!
//! The webhook receives pushed "batch paid" reports; verify pulls the state
//! of a checkout session on demand. Both settle idempotently against the
//! jobs still unpaid.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::JobsUpdatedResponse;
use crate::services::{EventBroadcaster, PaymentGateway, payment};

/// Webhook body pushed by the payment gateway.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentWebhookRequest {
    pub batch_id: String,
    /// Gateway payment state; anything but "paid" is ignored.
    pub status: String,
}

/// Gateway webhook: settle a batch reported as paid.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    tag = "Payments",
    request_body = PaymentWebhookRequest,
    responses(
        (status = 200, description = "Webhook processed"),
    )
)]
pub async fn webhook(
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    body: web::Json<PaymentWebhookRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.status == "paid" {
        payment::settle_batch(&pool, &broadcaster, &req.batch_id).await?;
    } else {
        warn!(batch_id = %req.batch_id, status = %req.status, "Ignoring non-paid webhook");
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}

/// Verify a checkout session with the gateway and settle its batch if paid.
///
/// Idempotent and safely re-invokable; a gateway failure surfaces as 502
/// and the caller may simply retry.
#[utoipa::path(
    get,
    path = "/payments/verify/{session_id}",
    tag = "Payments",
    params(
        ("session_id" = String, Path, description = "Gateway checkout session id")
    ),
    responses(
        (status = 200, description = "Session verified", body = JobsUpdatedResponse),
        (status = 502, description = "Gateway unreachable", body = crate::error::ErrorResponse),
    )
)]
pub async fn verify(
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    gateway: web::Data<PaymentGateway>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let session_id = path.into_inner();

    let report = gateway.verify_session(&session_id).await?;

    if !report.paid {
        return Ok(HttpResponse::Ok().json(JobsUpdatedResponse {
            message: format!("Session {} is not paid yet", session_id),
            jobs: Vec::new(),
        }));
    }

    let jobs = payment::settle_batch(&pool, &broadcaster, &report.batch_id).await?;

    Ok(HttpResponse::Ok().json(JobsUpdatedResponse {
        message: format!("Payment verified for batch {}", report.batch_id),
        jobs,
    }))
}

/// Configure payment routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/webhook", web::post().to(webhook))
            .route("/verify/{session_id}", web::get().to(verify)),
    );
}
