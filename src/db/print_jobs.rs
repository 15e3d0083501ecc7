//! Database queries for print jobs.
//!
//! Multi-row mutations (skip, payment cascades, presence cascades) are each
//! a single UPDATE statement so concurrent readers never observe a batch
//! with a split ordering key. The printing claim re-checks its guards inside
//! the statement itself.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::print_job::{self, ActiveModel, Entity as PrintJob};
use crate::error::{AppError, AppResult};
use crate::models::{JobStatus, PaymentMethod, PaymentState, SubmitJobRequest, derive_cost};

use super::DbPool;

impl DbPool {
    /// Insert a new job.
    ///
    /// Online payment implies the job is paid and presence-confirmed at
    /// creation; the queue timestamp is initialized to the creation time.
    pub async fn insert_job(&self, owner_id: Uuid, req: &SubmitJobRequest) -> AppResult<print_job::Model> {
        let now = Utc::now();
        let is_paid = req.payment_method == PaymentMethod::Online;
        let payment_status = if is_paid {
            PaymentState::Paid
        } else {
            PaymentState::Pending
        };
        let cost = derive_cost(
            req.print_details.page_count,
            req.print_details.color,
            req.print_details.sides,
            req.print_details.copies,
        );

        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            owner_id: Set(owner_id),
            printer_id: Set(req.printer_id),
            file_ref: Set(req.file_ref.clone()),
            batch_id: Set(req.batch_id.clone()),
            status: Set(JobStatus::Pending.as_str().to_string()),
            is_paid: Set(is_paid),
            payment_method: Set(req.payment_method.as_str().to_string()),
            payment_status: Set(payment_status.as_str().to_string()),
            confirmed_presence: Set(is_paid),
            confirmation_time: Set(None),
            sides: Set(req.print_details.sides.as_str().to_string()),
            color: Set(req.print_details.color.as_str().to_string()),
            page_count: Set(req.print_details.page_count),
            cost: Set(cost),
            skip_count: Set(0),
            queue_timestamp: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
            collected_at: Set(None),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert job: {}", e)))?;

        Ok(result)
    }

    /// Get a job by ID.
    pub async fn get_job_by_id(&self, id: Uuid) -> AppResult<Option<print_job::Model>> {
        let result = PrintJob::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get job: {}", e)))?;

        Ok(result)
    }

    /// Get a job by ID, or NotFound.
    pub async fn require_job(&self, id: Uuid) -> AppResult<print_job::Model> {
        self.get_job_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {}", id)))
    }

    /// Snapshot of all pending/printing jobs in queue order.
    pub async fn queue_snapshot(&self) -> AppResult<Vec<print_job::Model>> {
        let result = PrintJob::find()
            .filter(
                print_job::Column::Status.is_in([
                    JobStatus::Pending.as_str(),
                    JobStatus::Printing.as_str(),
                ]),
            )
            .order_by_asc(print_job::Column::QueueTimestamp)
            .order_by_asc(print_job::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to load queue snapshot: {}", e)))?;

        Ok(result)
    }

    /// All jobs of one user, queue-ordered.
    pub async fn jobs_by_user(&self, user_id: Uuid) -> AppResult<Vec<print_job::Model>> {
        let result = PrintJob::find()
            .filter(print_job::Column::OwnerId.eq(user_id))
            .order_by_asc(print_job::Column::QueueTimestamp)
            .order_by_asc(print_job::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get jobs for user: {}", e)))?;

        Ok(result)
    }

    /// All jobs sharing a batch id, in submission order.
    pub async fn jobs_by_batch(&self, batch_id: &str) -> AppResult<Vec<print_job::Model>> {
        let result = PrintJob::find()
            .filter(print_job::Column::BatchId.eq(batch_id))
            .order_by_asc(print_job::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get jobs for batch: {}", e)))?;

        Ok(result)
    }

    /// All jobs (admin listing), in submission order.
    pub async fn all_jobs(&self) -> AppResult<Vec<print_job::Model>> {
        let result = PrintJob::find()
            .order_by_asc(print_job::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list jobs: {}", e)))?;

        Ok(result)
    }

    /// Heal rows with a missing queue timestamp by copying created_at.
    ///
    /// Idempotent: already-healed rows match nothing and are never rewritten.
    /// Returns the number of rows healed.
    pub async fn heal_missing_queue_timestamps(&self) -> AppResult<u64> {
        let result = PrintJob::update_many()
            .col_expr(
                print_job::Column::QueueTimestamp,
                Expr::col(print_job::Column::CreatedAt).into(),
            )
            .filter(print_job::Column::QueueTimestamp.is_null())
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to heal queue timestamps: {}", e)))?;

        if result.rows_affected > 0 {
            tracing::warn!(
                healed = result.rows_affected,
                "Healed jobs with missing queue timestamp"
            );
        }

        Ok(result.rows_affected)
    }

    /// Atomically claim a printer for a pending job.
    ///
    /// The status flip and the exclusivity check happen in one conditional
    /// statement: the update only applies while the job is still pending and
    /// no other job is printing on the same printer. The partial unique
    /// index on (printer_id) WHERE status = 'printing' backstops the check
    /// under concurrent claims, so a lost race surfaces as a unique
    /// violation, not a second printing job. Returns false when the claim
    /// did not win.
    pub async fn claim_printing(&self, job_id: Uuid, printer_id: Uuid) -> AppResult<bool> {
        let busy_on_same_printer = Query::select()
            .expr(Expr::val(1))
            .from(PrintJob)
            .and_where(Expr::col(print_job::Column::PrinterId).eq(printer_id))
            .and_where(Expr::col(print_job::Column::Status).eq(JobStatus::Printing.as_str()))
            .to_owned();

        let result = PrintJob::update_many()
            .col_expr(
                print_job::Column::Status,
                Expr::value(JobStatus::Printing.as_str()),
            )
            .col_expr(print_job::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(print_job::Column::Id.eq(job_id))
            .filter(print_job::Column::Status.eq(JobStatus::Pending.as_str()))
            .filter(Expr::exists(busy_on_same_printer).not())
            .exec(self.connection())
            .await;

        match result {
            Ok(result) => Ok(result.rows_affected == 1),
            Err(e) if e.to_string().contains("idx_print_jobs_one_printing_per_printer") => {
                Ok(false)
            }
            Err(e) => Err(AppError::Database(format!("Failed to claim printer: {}", e))),
        }
    }

    /// Complete a job if it is still printing (fire-and-verify timer path).
    ///
    /// Returns the completed job, or None when the job had already moved on.
    pub async fn complete_if_printing(&self, job_id: Uuid) -> AppResult<Option<print_job::Model>> {
        let now = Utc::now();

        let result = PrintJob::update_many()
            .col_expr(
                print_job::Column::Status,
                Expr::value(JobStatus::Completed.as_str()),
            )
            .col_expr(print_job::Column::CompletedAt, Expr::value(now))
            .col_expr(print_job::Column::UpdatedAt, Expr::value(now))
            .filter(print_job::Column::Id.eq(job_id))
            .filter(print_job::Column::Status.eq(JobStatus::Printing.as_str()))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to complete job: {}", e)))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.get_job_by_id(job_id).await
    }

    /// Mark a completed job as collected.
    pub async fn mark_collected(&self, id: Uuid) -> AppResult<print_job::Model> {
        let job = self.require_job(id).await?;

        let mut active: ActiveModel = job.into();
        active.status = Set(JobStatus::Collected.as_str().to_string());
        active.collected_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark job collected: {}", e)))?;

        Ok(result)
    }

    /// Set a job's status directly (admin override paths).
    pub async fn set_status(&self, id: Uuid, status: JobStatus) -> AppResult<print_job::Model> {
        let job = self.require_job(id).await?;

        let mut active: ActiveModel = job.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update job status: {}", e)))?;

        Ok(result)
    }

    /// Mark a single job as paid.
    pub async fn mark_paid(&self, id: Uuid) -> AppResult<print_job::Model> {
        let job = self.require_job(id).await?;

        let mut active: ActiveModel = job.into();
        active.is_paid = Set(true);
        active.payment_status = Set(PaymentState::Paid.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark job paid: {}", e)))?;

        Ok(result)
    }

    /// Mark every pending unpaid job of a batch as paid (admin counter
    /// payment). One statement; returns the number of jobs updated.
    pub async fn mark_batch_paid(&self, batch_id: &str) -> AppResult<u64> {
        let result = PrintJob::update_many()
            .col_expr(print_job::Column::IsPaid, Expr::value(true))
            .col_expr(
                print_job::Column::PaymentStatus,
                Expr::value(PaymentState::Paid.as_str()),
            )
            .col_expr(print_job::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(print_job::Column::BatchId.eq(batch_id))
            .filter(print_job::Column::Status.eq(JobStatus::Pending.as_str()))
            .filter(print_job::Column::IsPaid.eq(false))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark batch paid: {}", e)))?;

        Ok(result.rows_affected)
    }

    /// Mark every pending unpaid job of a user as paid.
    pub async fn mark_user_paid(&self, user_id: Uuid) -> AppResult<u64> {
        let result = PrintJob::update_many()
            .col_expr(print_job::Column::IsPaid, Expr::value(true))
            .col_expr(
                print_job::Column::PaymentStatus,
                Expr::value(PaymentState::Paid.as_str()),
            )
            .col_expr(print_job::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(print_job::Column::OwnerId.eq(user_id))
            .filter(print_job::Column::Status.eq(JobStatus::Pending.as_str()))
            .filter(print_job::Column::IsPaid.eq(false))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark user jobs paid: {}", e)))?;

        Ok(result.rows_affected)
    }

    /// Settle a batch on behalf of the payment gateway: flip exactly the
    /// jobs still unpaid, regardless of queue status. Idempotent.
    pub async fn settle_batch_payment(&self, batch_id: &str) -> AppResult<u64> {
        let result = PrintJob::update_many()
            .col_expr(print_job::Column::IsPaid, Expr::value(true))
            .col_expr(
                print_job::Column::PaymentStatus,
                Expr::value(PaymentState::Paid.as_str()),
            )
            .col_expr(print_job::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(print_job::Column::BatchId.eq(batch_id))
            .filter(print_job::Column::IsPaid.eq(false))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to settle batch payment: {}", e)))?;

        Ok(result.rows_affected)
    }

    /// Confirm presence for every pending unconfirmed job of a batch.
    pub async fn confirm_presence_for_batch(&self, batch_id: &str) -> AppResult<u64> {
        let now = Utc::now();

        let result = PrintJob::update_many()
            .col_expr(print_job::Column::ConfirmedPresence, Expr::value(true))
            .col_expr(print_job::Column::ConfirmationTime, Expr::value(now))
            .col_expr(print_job::Column::UpdatedAt, Expr::value(now))
            .filter(print_job::Column::BatchId.eq(batch_id))
            .filter(print_job::Column::Status.eq(JobStatus::Pending.as_str()))
            .filter(print_job::Column::ConfirmedPresence.eq(false))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to confirm batch presence: {}", e)))?;

        Ok(result.rows_affected)
    }

    /// Confirm presence for a single job if not already confirmed.
    pub async fn confirm_presence(&self, id: Uuid) -> AppResult<print_job::Model> {
        let job = self.require_job(id).await?;

        if job.confirmed_presence {
            return Ok(job);
        }

        let now = Utc::now();
        let mut active: ActiveModel = job.into();
        active.confirmed_presence = Set(true);
        active.confirmation_time = Set(Some(now));
        active.updated_at = Set(now);

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to confirm presence: {}", e)))?;

        Ok(result)
    }

    /// Apply a skip: rewrite every member's queue timestamp and bump every
    /// member's skip count in one atomic statement, so the batch's ordering
    /// key is never split.
    pub async fn apply_skip(
        &self,
        batch_id: &str,
        new_timestamp: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = PrintJob::update_many()
            .col_expr(
                print_job::Column::QueueTimestamp,
                Expr::value(new_timestamp),
            )
            .col_expr(
                print_job::Column::SkipCount,
                Expr::col(print_job::Column::SkipCount).add(1),
            )
            .col_expr(print_job::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(print_job::Column::BatchId.eq(batch_id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to apply skip: {}", e)))?;

        Ok(result.rows_affected)
    }

    /// Move a pending job to a different printer.
    pub async fn change_printer(&self, id: Uuid, printer_id: Uuid) -> AppResult<print_job::Model> {
        let job = self.require_job(id).await?;

        let mut active: ActiveModel = job.into();
        active.printer_id = Set(printer_id);
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to change printer: {}", e)))?;

        Ok(result)
    }

    /// Delete a single job.
    pub async fn delete_job(&self, id: Uuid) -> AppResult<u64> {
        let result = PrintJob::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete job: {}", e)))?;

        Ok(result.rows_affected)
    }

    /// Delete every job of a batch in one statement (all-members-or-none).
    pub async fn delete_batch(&self, batch_id: &str) -> AppResult<u64> {
        let result = PrintJob::delete_many()
            .filter(print_job::Column::BatchId.eq(batch_id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete batch: {}", e)))?;

        Ok(result.rows_affected)
    }

    /// Count jobs currently printing on a printer.
    pub async fn count_printing_on(&self, printer_id: Uuid) -> AppResult<u64> {
        let count = PrintJob::find()
            .filter(print_job::Column::PrinterId.eq(printer_id))
            .filter(print_job::Column::Status.eq(JobStatus::Printing.as_str()))
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count printing jobs: {}", e)))?;

        Ok(count)
    }
}
