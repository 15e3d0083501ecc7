//! Queue ordering engine.
//!
//! Pure functions over snapshots of stored jobs: ordering, positions, wait
//! estimates, batch aggregation, and skip planning. Nothing in this module
//! touches storage.

pub mod batch;
pub mod ordering;
pub mod skip;

pub use batch::project_batches;
pub use ordering::{
    ALERT_POSITION, SECONDS_PER_PAGE, annotate_queue, annotate_user_jobs, position_alerts,
    user_stats,
};
pub use skip::{MAX_SKIPS, SkipPlan, plan_skip};

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixture builders for queue engine tests.

    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use crate::entity::print_job;
    use crate::models::{ColorMode, JobStatus, PaymentMethod, PaymentState, PrintSides};

    /// Deterministic owner id derived from a short tag, so fixtures can
    /// assert on "same user" / "different user" relationships.
    pub fn owner_from_tag(tag: &str) -> Uuid {
        let mut bytes = [0u8; 16];
        for (i, b) in tag.bytes().enumerate().take(16) {
            bytes[i] = b;
        }
        Uuid::from_bytes(bytes)
    }

    /// A pending, unbatched, counter-payment job.
    pub fn job(owner_tag: &str, pages: i32, created_at: DateTime<Utc>) -> print_job::Model {
        print_job::Model {
            id: Uuid::now_v7(),
            owner_id: owner_from_tag(owner_tag),
            printer_id: Uuid::nil(),
            file_ref: format!("file-{}", owner_tag),
            batch_id: None,
            status: JobStatus::Pending.as_str().to_string(),
            is_paid: false,
            payment_method: PaymentMethod::Counter.as_str().to_string(),
            payment_status: PaymentState::Pending.as_str().to_string(),
            confirmed_presence: false,
            confirmation_time: None,
            sides: PrintSides::Single.as_str().to_string(),
            color: ColorMode::Bw.as_str().to_string(),
            page_count: pages,
            cost: pages as f64 * 0.10,
            skip_count: 0,
            queue_timestamp: Some(created_at),
            created_at,
            updated_at: created_at,
            completed_at: None,
            collected_at: None,
        }
    }

    /// A pending job with an explicit queue timestamp distinct from its
    /// creation time.
    pub fn job_at(
        owner_tag: &str,
        pages: i32,
        created_at: DateTime<Utc>,
        queue_timestamp: Option<DateTime<Utc>>,
    ) -> print_job::Model {
        let mut model = job(owner_tag, pages, created_at);
        model.queue_timestamp = queue_timestamp;
        model
    }

    /// A pending member of the given batch, owned by a user named after the
    /// batch.
    pub fn batch_job(batch_id: &str, pages: i32, created_at: DateTime<Utc>) -> print_job::Model {
        let mut model = job(batch_id, pages, created_at);
        model.batch_id = Some(batch_id.to_string());
        model
    }
}
