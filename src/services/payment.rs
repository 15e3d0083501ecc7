//! Payment collaborator.
//!
//! The gateway is an opaque external service; its only contract with the
//! core is reporting whether a checkout session's batch is paid, either
//! pushed (webhook) or pulled (verify). Settlement marks exactly the jobs
//! still unpaid, so both paths are idempotent and safely re-invokable.

use serde::Deserialize;
use tracing::info;

use crate::config::PaymentConfig;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{JobView, WsEvent, WsEventMessage};

use super::EventBroadcaster;

/// Client for the external payment gateway.
#[derive(Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    endpoint: String,
    secret: String,
}

/// Payment state the gateway reports for a checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentReport {
    pub batch_id: String,
    pub paid: bool,
}

impl PaymentGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            secret: config.secret.clone(),
        }
    }

    /// Ask the gateway whether a checkout session is paid.
    ///
    /// No automatic retry: the caller re-invokes when it wants to; the
    /// follow-up settlement is idempotent either way.
    pub async fn verify_session(&self, session_id: &str) -> AppResult<PaymentReport> {
        let url = format!("{}/sessions/{}", self.endpoint, session_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("gateway unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "gateway returned {} for session {}",
                response.status(),
                session_id
            )));
        }

        response
            .json::<PaymentReport>()
            .await
            .map_err(|e| AppError::ExternalService(format!("unexpected gateway response: {}", e)))
    }
}

/// Settle a batch the gateway reports as paid: flip exactly the jobs still
/// unpaid and publish one batch_updated event. Re-delivery is a no-op.
pub async fn settle_batch(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    batch_id: &str,
) -> AppResult<Vec<JobView>> {
    let updated = pool.settle_batch_payment(batch_id).await?;

    let jobs: Vec<JobView> = pool
        .jobs_by_batch(batch_id)
        .await?
        .iter()
        .map(JobView::from_model)
        .collect();

    if updated > 0 {
        info!(batch_id = %batch_id, jobs = updated, "Batch payment settled");
        broadcaster.send(WsEventMessage::new(WsEvent::batch_updated(
            Some(batch_id.to_string()),
            jobs.clone(),
        )));
    }

    Ok(jobs)
}
