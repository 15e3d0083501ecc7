//! Job lifecycle state machine.
//!
//! Legal transitions: pending -> printing -> completed -> collected, with
//! the alternate exit pending -> skipped. Every transition re-reads current
//! state before acting; the printing claim and all multi-job cascades are
//! single atomic statements in the db layer.
//!
//! Printing progress is advanced only by explicit API calls or by the
//! deferred one-shot timer spawned when a job enters printing. The timer is
//! fire-and-verify: it re-fetches the job and leaves it alone when a
//! concurrent action already moved it elsewhere.

use std::time::Duration;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::auth::capability::{self, Right};
use crate::auth::Identity;
use crate::db::DbPool;
use crate::entity::print_job;
use crate::error::{AppError, AppResult, PolicyViolation};
use crate::models::{
    JobStatus, JobView, PaymentMethod, SkipBatchResponse, WsEvent, WsEventMessage,
};
use crate::queue;

use super::EventBroadcaster;

/// Fixed physical print duration modeled by the auto-completion timer.
pub const PRINT_SERVICE_SECS: u64 = 3;

fn parse_status(job: &print_job::Model) -> JobStatus {
    JobStatus::parse(&job.status).unwrap_or(JobStatus::Failed)
}

fn emit_job_updated(broadcaster: &EventBroadcaster, job: &print_job::Model) {
    broadcaster.send(WsEventMessage::new(WsEvent::job_updated(
        JobView::from_model(job),
    )));
}

/// Admin status dispatch: route the requested status to the matching
/// transition, rejecting anything that is not a legal edge.
pub async fn set_status(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    job_id: Uuid,
    status: JobStatus,
) -> AppResult<JobView> {
    match status {
        JobStatus::Printing => start_printing(pool, broadcaster, job_id).await,
        JobStatus::Completed => complete_printing(pool, broadcaster, job_id).await,
        JobStatus::Skipped => mark_skipped(pool, broadcaster, job_id).await,
        JobStatus::Pending | JobStatus::Collected | JobStatus::Failed => {
            Err(AppError::Policy(PolicyViolation::InvalidTransition))
        }
    }
}

/// pending -> printing for a single job, with the full guard set.
///
/// The job must be paid, presence-confirmed when counter-paid, and the
/// earliest pending job for its own printer. The final exclusivity check
/// runs inside the atomic claim.
pub async fn start_printing(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    job_id: Uuid,
) -> AppResult<JobView> {
    let job = pool.require_job(job_id).await?;

    match parse_status(&job) {
        JobStatus::Pending => {}
        s if s.is_terminal() => return Err(AppError::Policy(PolicyViolation::AlreadyTerminal)),
        _ => return Err(AppError::Policy(PolicyViolation::InvalidTransition)),
    }

    check_print_guards(&job)?;

    // Next-in-line: the job must be the earliest-ordered pending job for its
    // own printer. Evaluated against a fresh snapshot.
    let snapshot = pool.queue_snapshot().await?;
    let next_for_printer = queue::ordering::order(&snapshot)
        .into_iter()
        .find(|queued| {
            queued.printer_id == job.printer_id && queued.status == JobStatus::Pending.as_str()
        })
        .map(|queued| queued.id);
    if next_for_printer != Some(job.id) {
        return Err(AppError::Policy(PolicyViolation::OutOfOrder));
    }

    claim_and_schedule(pool, broadcaster, &job).await
}

/// Shared payment/presence guards for entering printing.
fn check_print_guards(job: &print_job::Model) -> AppResult<()> {
    if !job.is_paid {
        return Err(AppError::Policy(PolicyViolation::Unpaid));
    }
    if job.payment_method == PaymentMethod::Counter.as_str() && !job.confirmed_presence {
        return Err(AppError::Policy(PolicyViolation::PresenceRequired));
    }
    Ok(())
}

/// Atomically claim the printer, then publish and schedule auto-completion.
async fn claim_and_schedule(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    job: &print_job::Model,
) -> AppResult<JobView> {
    if !pool.claim_printing(job.id, job.printer_id).await? {
        return Err(AppError::Policy(PolicyViolation::PrinterBusy));
    }

    let updated = pool.require_job(job.id).await?;
    emit_job_updated(broadcaster, &updated);
    info!(job_id = %updated.id, printer_id = %updated.printer_id, "Job started printing");

    spawn_auto_complete(pool.clone(), broadcaster.clone(), updated.id);

    Ok(JobView::from_model(&updated))
}

/// printing -> completed by explicit admin action.
pub async fn complete_printing(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    job_id: Uuid,
) -> AppResult<JobView> {
    // Ensure the job exists so a bad id reports not-found, not a policy error.
    let job = pool.require_job(job_id).await?;

    match pool.complete_if_printing(job.id).await? {
        Some(completed) => {
            handle_completion(pool, broadcaster, &completed).await?;
            Ok(JobView::from_model(&completed))
        }
        None => Err(AppError::Policy(PolicyViolation::InvalidTransition)),
    }
}

/// pending -> skipped: admin abandon marker, independent of batch skip.
async fn mark_skipped(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    job_id: Uuid,
) -> AppResult<JobView> {
    let job = pool.require_job(job_id).await?;

    match parse_status(&job) {
        JobStatus::Pending => {}
        s if s.is_terminal() => return Err(AppError::Policy(PolicyViolation::AlreadyTerminal)),
        _ => return Err(AppError::Policy(PolicyViolation::InvalidTransition)),
    }

    let updated = pool.set_status(job.id, JobStatus::Skipped).await?;
    emit_job_updated(broadcaster, &updated);
    Ok(JobView::from_model(&updated))
}

/// Schedule the one-shot auto-completion timer for a printing job.
///
/// Errors inside the timer are logged and propagate nowhere: no caller is
/// waiting. A timer that fires after the job already left printing is a
/// no-op.
pub fn spawn_auto_complete(pool: DbPool, broadcaster: EventBroadcaster, job_id: Uuid) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(PRINT_SERVICE_SECS)).await;

        match pool.complete_if_printing(job_id).await {
            Ok(Some(completed)) => {
                info!(job_id = %job_id, "Job auto-completed");
                if let Err(e) = handle_completion(&pool, &broadcaster, &completed).await {
                    error!(job_id = %job_id, error = %e, "Post-completion handling failed");
                }
            }
            Ok(None) => {
                debug!(job_id = %job_id, "Auto-completion timer fired on a job no longer printing");
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Auto-completion failed");
            }
        }
    });
}

/// Everything that follows a completion: publish the update and the
/// ready-to-collect advisory, fire position alerts, and advance the batch
/// chain.
async fn handle_completion(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    job: &print_job::Model,
) -> AppResult<()> {
    emit_job_updated(broadcaster, job);
    broadcaster.send(WsEventMessage::new(WsEvent::ready_to_collect(
        JobView::from_model(job),
    )));

    // One-time "you are 5th" advisory for whichever user just moved up.
    let snapshot = pool.queue_snapshot().await?;
    for (user_id, job_id) in queue::position_alerts(&snapshot) {
        broadcaster.send(WsEventMessage::new(WsEvent::queue_position_alert(
            user_id,
            job_id,
            queue::ALERT_POSITION,
        )));
    }

    if let Some(ref batch_id) = job.batch_id {
        advance_batch(pool, broadcaster, batch_id).await;
    }

    Ok(())
}

/// Start the earliest eligible member of a batch (admin operation).
pub async fn start_batch_printing(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    batch_id: &str,
) -> AppResult<JobView> {
    let next = next_printable_member(pool, batch_id).await?;

    let Some(job) = next else {
        return Err(AppError::NotFound(format!(
            "No printable jobs in batch {}",
            batch_id
        )));
    };

    check_print_guards(&job)?;
    claim_and_schedule(pool, broadcaster, &job).await
}

/// Earliest pending-and-paid member of a batch, in queue order.
async fn next_printable_member(
    pool: &DbPool,
    batch_id: &str,
) -> AppResult<Option<print_job::Model>> {
    let members = pool.jobs_by_batch(batch_id).await?;
    if members.is_empty() {
        return Err(AppError::NotFound(format!("Batch {}", batch_id)));
    }

    let eligible: Vec<print_job::Model> = members
        .into_iter()
        .filter(|job| job.status == JobStatus::Pending.as_str() && job.is_paid)
        .collect();

    Ok(queue::ordering::order(&eligible).first().map(|job| (*job).clone()))
}

/// Chain step: after a member completes, start the next eligible member.
///
/// Guard failures stop the chain without surfacing an error; the admin can
/// resume the batch once the guard clears.
async fn advance_batch(pool: &DbPool, broadcaster: &EventBroadcaster, batch_id: &str) {
    let next = match next_printable_member(pool, batch_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            debug!(batch_id = %batch_id, "Batch exhausted");
            return;
        }
        Err(e) => {
            error!(batch_id = %batch_id, error = %e, "Failed to look up next batch member");
            return;
        }
    };

    if let Err(e) = check_print_guards(&next) {
        info!(batch_id = %batch_id, job_id = %next.id, reason = %e, "Batch chain paused");
        return;
    }

    match claim_and_schedule(pool, broadcaster, &next).await {
        Ok(_) => info!(batch_id = %batch_id, job_id = %next.id, "Batch chain advanced"),
        Err(e) => info!(batch_id = %batch_id, job_id = %next.id, reason = %e, "Batch chain paused"),
    }
}

/// completed -> collected, by the owner or an admin.
pub async fn collect(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    actor: &Identity,
    job_id: Uuid,
) -> AppResult<JobView> {
    let job = pool.require_job(job_id).await?;
    let status = parse_status(&job);

    capability::check(actor, job.owner_id, status, Right::Collect)?;

    match status {
        JobStatus::Completed => {}
        s if s.is_terminal() => return Err(AppError::Policy(PolicyViolation::AlreadyTerminal)),
        _ => return Err(AppError::Policy(PolicyViolation::InvalidTransition)),
    }

    let updated = pool.mark_collected(job.id).await?;
    emit_job_updated(broadcaster, &updated);
    Ok(JobView::from_model(&updated))
}

/// Mark one job paid.
pub async fn pay_job(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    job_id: Uuid,
) -> AppResult<JobView> {
    let updated = pool.mark_paid(job_id).await?;
    emit_job_updated(broadcaster, &updated);
    Ok(JobView::from_model(&updated))
}

/// Mark every pending unpaid member of a batch paid. All-or-nothing: the
/// cascade is one statement, and an empty match reports not-found instead of
/// silently succeeding. Returns the number of jobs flipped along with the
/// batch's current state.
pub async fn pay_batch(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    batch_id: &str,
) -> AppResult<(u64, Vec<JobView>)> {
    let updated = pool.mark_batch_paid(batch_id).await?;
    if updated == 0 {
        return Err(AppError::NotFound(format!(
            "No unpaid pending jobs in batch {}",
            batch_id
        )));
    }

    let jobs: Vec<JobView> = pool
        .jobs_by_batch(batch_id)
        .await?
        .iter()
        .map(JobView::from_model)
        .collect();

    broadcaster.send(WsEventMessage::new(WsEvent::batch_updated(
        Some(batch_id.to_string()),
        jobs.clone(),
    )));

    Ok((updated, jobs))
}

/// Mark every pending unpaid job of a user paid.
pub async fn pay_user(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    user_id: Uuid,
) -> AppResult<(u64, Vec<JobView>)> {
    let updated = pool.mark_user_paid(user_id).await?;
    if updated == 0 {
        return Err(AppError::NotFound(format!(
            "No unpaid pending jobs for user {}",
            user_id
        )));
    }

    let jobs: Vec<JobView> = pool
        .jobs_by_user(user_id)
        .await?
        .iter()
        .map(JobView::from_model)
        .collect();

    broadcaster.send(WsEventMessage::new(WsEvent::batch_updated(
        None,
        jobs.clone(),
    )));

    Ok((updated, jobs))
}

/// Confirm presence for a job; cascades to all pending unconfirmed jobs in
/// its batch.
pub async fn confirm_presence(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    actor: &Identity,
    job_id: Uuid,
) -> AppResult<Vec<JobView>> {
    let job = pool.require_job(job_id).await?;

    capability::check(actor, job.owner_id, parse_status(&job), Right::Confirm)?;

    match job.batch_id {
        Some(ref batch_id) => {
            pool.confirm_presence_for_batch(batch_id).await?;

            let jobs: Vec<JobView> = pool
                .jobs_by_batch(batch_id)
                .await?
                .iter()
                .map(JobView::from_model)
                .collect();

            broadcaster.send(WsEventMessage::new(WsEvent::batch_updated(
                Some(batch_id.clone()),
                jobs.clone(),
            )));

            Ok(jobs)
        }
        None => {
            let updated = pool.confirm_presence(job.id).await?;
            emit_job_updated(broadcaster, &updated);
            Ok(vec![JobView::from_model(&updated)])
        }
    }
}

/// Skip a batch to a later queue position (admin).
pub async fn skip_batch(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    batch_id: &str,
) -> AppResult<SkipBatchResponse> {
    let members = pool.jobs_by_batch(batch_id).await?;
    if members.is_empty() {
        return Err(AppError::NotFound(format!("Batch {}", batch_id)));
    }

    let skip_count = members.iter().map(|job| job.skip_count).max().unwrap_or(0);

    // Heal first so the ordering the plan sees matches what readers see.
    pool.heal_missing_queue_timestamps().await?;
    let snapshot = pool.queue_snapshot().await?;

    let plan = queue::plan_skip(&snapshot, batch_id, skip_count, chrono::Utc::now())
        .map_err(AppError::Policy)?;

    pool.apply_skip(batch_id, plan.new_timestamp).await?;

    let jobs: Vec<JobView> = pool
        .jobs_by_batch(batch_id)
        .await?
        .iter()
        .map(JobView::from_model)
        .collect();

    info!(
        batch_id = %batch_id,
        target_index = plan.target_index,
        new_timestamp = %plan.new_timestamp,
        "Batch skipped"
    );

    broadcaster.send(WsEventMessage::new(WsEvent::batch_updated(
        Some(batch_id.to_string()),
        jobs,
    )));

    Ok(SkipBatchResponse {
        message: "Batch skipped successfully".to_string(),
        new_position: plan.new_position,
    })
}

/// Delete a single job, permission-gated.
pub async fn delete_job(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    actor: &Identity,
    job_id: Uuid,
) -> AppResult<()> {
    let job = pool.require_job(job_id).await?;

    capability::check(actor, job.owner_id, parse_status(&job), Right::Delete)?;

    pool.delete_job(job.id).await?;
    broadcaster.send(WsEventMessage::new(WsEvent::job_deleted(job.id)));
    Ok(())
}

/// Delete a whole batch: every member must be deletable by the caller, or
/// nothing is deleted.
pub async fn delete_batch(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    actor: &Identity,
    batch_id: &str,
) -> AppResult<()> {
    let members = pool.jobs_by_batch(batch_id).await?;
    if members.is_empty() {
        return Err(AppError::NotFound(format!("Batch {}", batch_id)));
    }

    for job in &members {
        capability::check(actor, job.owner_id, parse_status(job), Right::Delete)?;
    }

    pool.delete_batch(batch_id).await?;
    broadcaster.send(WsEventMessage::new(WsEvent::batch_deleted(
        batch_id.to_string(),
    )));
    Ok(())
}

/// Move a pending job to another printer (admin).
pub async fn change_printer(
    pool: &DbPool,
    broadcaster: &EventBroadcaster,
    job_id: Uuid,
    printer_id: Uuid,
) -> AppResult<JobView> {
    let job = pool.require_job(job_id).await?;
    pool.require_printer(printer_id).await?;

    match parse_status(&job) {
        JobStatus::Pending => {}
        JobStatus::Printing => return Err(AppError::Policy(PolicyViolation::PrintingLocked)),
        _ => return Err(AppError::Policy(PolicyViolation::InvalidTransition)),
    }

    let updated = pool.change_printer(job.id, printer_id).await?;
    emit_job_updated(broadcaster, &updated);
    Ok(JobView::from_model(&updated))
}
