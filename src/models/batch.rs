//! Batch models.
//!
//! Batches are derived from the flat job list, never stored. See
//! `queue::batch` for the projection logic.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{JobStatus, JobView};

/// Aggregate view of the jobs sharing a batch id.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchSummary {
    pub batch_id: String,
    /// `printing` if any member prints, otherwise inherited from members.
    pub status: JobStatus,
    pub all_paid: bool,
    pub all_confirmed: bool,
    pub total_pages: i32,
    pub total_cost: f64,
    /// Ordering key: earliest (queue_timestamp ?? created_at) among members.
    pub sort_time: DateTime<Utc>,
    /// 1-based position of the batch's earliest pending member in the global
    /// queue, if any member is still pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_in_queue: Option<usize>,
    /// Wait of the batch's earliest pending member, in raw seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_wait_secs: Option<i64>,
    pub jobs: Vec<JobView>,
}
