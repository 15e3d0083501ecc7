//! Job API handlers.

use actix_web::{HttpResponse, web};
use tracing::info;
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    BatchSummary, ChangePrinterRequest, JobView, JobsUpdatedResponse, QueueStats,
    SubmitJobRequest, UpdateStatusRequest, WsEvent, WsEventMessage,
};
use crate::queue;
use crate::services::{EventBroadcaster, lifecycle};

fn require_admin(identity: &Identity) -> AppResult<()> {
    if !identity.is_admin() {
        return Err(AppError::Unauthorized(
            "Admin role required for this operation".to_string(),
        ));
    }
    Ok(())
}

/// Submit a new print job.
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "Jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobView),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Printer not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn submit_job(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    body: web::Json<SubmitJobRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.print_details.page_count <= 0 {
        return Err(AppError::InvalidInput(
            "page_count must be positive".to_string(),
        ));
    }

    // Fails if the printer is unknown.
    pool.require_printer(req.printer_id).await?;

    let job = pool.insert_job(identity.user_id, &req).await?;
    let view = JobView::from_model(&job);

    broadcaster.send(WsEventMessage::new(WsEvent::job_created(view.clone())));

    info!(
        job_id = %job.id,
        owner_id = %job.owner_id,
        batch_id = ?job.batch_id,
        "Job submitted"
    );

    Ok(HttpResponse::Created().json(view))
}

/// Public queue listing: pending/printing jobs in order, with position and
/// wait attached to pending entries.
#[utoipa::path(
    get,
    path = "/jobs/queue",
    tag = "Jobs",
    responses(
        (status = 200, description = "Ordered queue", body = [JobView]),
    )
)]
pub async fn get_queue(pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    // Heal any missing ordering keys before they would distort the order.
    pool.heal_missing_queue_timestamps().await?;

    let snapshot = pool.queue_snapshot().await?;
    let views = queue::annotate_queue(&snapshot);

    Ok(HttpResponse::Ok().json(views))
}

/// One user's jobs, annotated against the global queue.
#[utoipa::path(
    get,
    path = "/jobs/user/{user_id}",
    tag = "Jobs",
    params(
        ("user_id" = Uuid, Path, description = "User UUID")
    ),
    responses(
        (status = 200, description = "User's jobs", body = [JobView]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_user_jobs(
    _identity: Identity,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();

    pool.heal_missing_queue_timestamps().await?;

    let user_jobs = pool.jobs_by_user(user_id).await?;
    let snapshot = pool.queue_snapshot().await?;
    let views = queue::annotate_user_jobs(&user_jobs, &snapshot);

    Ok(HttpResponse::Ok().json(views))
}

/// Per-user queue stats: distinct people ahead and coarse wait in minutes.
#[utoipa::path(
    get,
    path = "/jobs/user/{user_id}/stats",
    tag = "Jobs",
    params(
        ("user_id" = Uuid, Path, description = "User UUID")
    ),
    responses(
        (status = 200, description = "Queue stats", body = QueueStats),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_user_stats(
    _identity: Identity,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();

    let snapshot = pool.queue_snapshot().await?;
    let stats = queue::user_stats(&snapshot, user_id);

    Ok(HttpResponse::Ok().json(stats))
}

/// Admin listing of every job. Heals missing queue timestamps first.
#[utoipa::path(
    get,
    path = "/jobs/admin/all",
    tag = "Jobs",
    responses(
        (status = 200, description = "All jobs", body = [JobView]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn get_all_jobs(
    identity: Identity,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    pool.heal_missing_queue_timestamps().await?;

    let jobs = pool.all_jobs().await?;
    let views: Vec<JobView> = jobs.iter().map(JobView::from_model).collect();

    Ok(HttpResponse::Ok().json(views))
}

/// Admin batch dashboard: batches projected from the current job list.
#[utoipa::path(
    get,
    path = "/jobs/admin/batches",
    tag = "Jobs",
    responses(
        (status = 200, description = "Batch summaries in queue order", body = [BatchSummary]),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn get_batches(
    identity: Identity,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    pool.heal_missing_queue_timestamps().await?;

    let jobs = pool.all_jobs().await?;
    let batches = queue::project_batches(&jobs);

    Ok(HttpResponse::Ok().json(batches))
}

/// Admin status transition.
#[utoipa::path(
    put,
    path = "/jobs/{id}/status",
    tag = "Jobs",
    params(
        ("id" = Uuid, Path, description = "Job UUID")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Job updated", body = JobView),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Guard rejected the transition", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn update_status(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let job_id = path.into_inner();
    let view = match body.status {
        // Collection has its own ownership rules; admins pass them anyway.
        crate::models::JobStatus::Collected => {
            lifecycle::collect(&pool, &broadcaster, &identity, job_id).await?
        }
        status => lifecycle::set_status(&pool, &broadcaster, job_id, status).await?,
    };

    Ok(HttpResponse::Ok().json(view))
}

/// Mark one job paid (admin counter payment).
#[utoipa::path(
    put,
    path = "/jobs/{id}/pay",
    tag = "Payments",
    params(
        ("id" = Uuid, Path, description = "Job UUID")
    ),
    responses(
        (status = 200, description = "Job updated", body = JobView),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn pay_job(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let view = lifecycle::pay_job(&pool, &broadcaster, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(view))
}

/// Mark every pending unpaid job of a batch paid.
#[utoipa::path(
    put,
    path = "/jobs/batch/{batch_id}/pay",
    tag = "Payments",
    params(
        ("batch_id" = String, Path, description = "Batch id")
    ),
    responses(
        (status = 200, description = "Jobs updated", body = JobsUpdatedResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "No qualifying jobs", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn pay_batch(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let batch_id = path.into_inner();
    let (updated, jobs) = lifecycle::pay_batch(&pool, &broadcaster, batch_id.trim()).await?;

    Ok(HttpResponse::Ok().json(JobsUpdatedResponse {
        message: format!("Marked {} jobs in batch as paid", updated),
        jobs,
    }))
}

/// Mark every pending unpaid job of a user paid.
#[utoipa::path(
    put,
    path = "/jobs/user/{user_id}/pay",
    tag = "Payments",
    params(
        ("user_id" = Uuid, Path, description = "User UUID")
    ),
    responses(
        (status = 200, description = "Jobs updated", body = JobsUpdatedResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "No qualifying jobs", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn pay_user(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let (updated, jobs) = lifecycle::pay_user(&pool, &broadcaster, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(JobsUpdatedResponse {
        message: format!("Marked {} jobs as paid", updated),
        jobs,
    }))
}

/// Confirm presence at the counter; cascades across the job's batch.
#[utoipa::path(
    put,
    path = "/jobs/{id}/confirm",
    tag = "Jobs",
    params(
        ("id" = Uuid, Path, description = "Job UUID")
    ),
    responses(
        (status = 200, description = "Jobs updated", body = JobsUpdatedResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn confirm_presence(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let jobs =
        lifecycle::confirm_presence(&pool, &broadcaster, &identity, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(JobsUpdatedResponse {
        message: format!("Confirmed presence for {} jobs", jobs.len()),
        jobs,
    }))
}

/// Start printing a batch: its earliest pending-and-paid member enters
/// printing; the rest chain automatically as each completes.
#[utoipa::path(
    put,
    path = "/jobs/batch/{batch_id}/start-printing",
    tag = "Jobs",
    params(
        ("batch_id" = String, Path, description = "Batch id")
    ),
    responses(
        (status = 200, description = "First member started", body = JobView),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "No printable jobs", body = crate::error::ErrorResponse),
        (status = 409, description = "Guard rejected the start", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn start_batch_printing(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let batch_id = path.into_inner();
    let view = lifecycle::start_batch_printing(&pool, &broadcaster, batch_id.trim()).await?;

    Ok(HttpResponse::Ok().json(view))
}

/// Skip a batch to a later queue position.
#[utoipa::path(
    put,
    path = "/jobs/batch/{batch_id}/skip",
    tag = "Jobs",
    params(
        ("batch_id" = String, Path, description = "Batch id")
    ),
    responses(
        (status = 200, description = "Batch skipped", body = crate::models::SkipBatchResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Batch not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Skip limit reached", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn skip_batch(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let batch_id = path.into_inner();
    let response = lifecycle::skip_batch(&pool, &broadcaster, batch_id.trim()).await?;

    Ok(HttpResponse::Ok().json(response))
}

/// Move a pending job to another printer.
#[utoipa::path(
    put,
    path = "/jobs/{id}/change-printer",
    tag = "Jobs",
    params(
        ("id" = Uuid, Path, description = "Job UUID")
    ),
    request_body = ChangePrinterRequest,
    responses(
        (status = 200, description = "Job updated", body = JobView),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Job or printer not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Job not pending", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn change_printer(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
    body: web::Json<ChangePrinterRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let view =
        lifecycle::change_printer(&pool, &broadcaster, path.into_inner(), body.printer_id).await?;

    Ok(HttpResponse::Ok().json(view))
}

/// Mark a completed job as physically collected.
#[utoipa::path(
    put,
    path = "/jobs/{id}/collected",
    tag = "Jobs",
    params(
        ("id" = Uuid, Path, description = "Job UUID")
    ),
    responses(
        (status = 200, description = "Job collected", body = JobView),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Job not completed", body = crate::error::ErrorResponse),
    )
)]
pub async fn mark_collected(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let view = lifecycle::collect(&pool, &broadcaster, &identity, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(view))
}

/// Delete a job. Owners may delete their own non-printing jobs; admins may
/// delete anything.
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    tag = "Jobs",
    params(
        ("id" = Uuid, Path, description = "Job UUID")
    ),
    responses(
        (status = 200, description = "Job removed"),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Job not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Job is printing", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_job(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    lifecycle::delete_job(&pool, &broadcaster, &identity, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Job removed" })))
}

/// Delete a whole batch; every member must be deletable by the caller.
#[utoipa::path(
    delete,
    path = "/jobs/batch/{batch_id}",
    tag = "Jobs",
    params(
        ("batch_id" = String, Path, description = "Batch id")
    ),
    responses(
        (status = 200, description = "Batch removed"),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Batch not found", body = crate::error::ErrorResponse),
        (status = 409, description = "A member is printing", body = crate::error::ErrorResponse),
    )
)]
pub async fn delete_batch(
    identity: Identity,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let batch_id = path.into_inner();
    lifecycle::delete_batch(&pool, &broadcaster, &identity, batch_id.trim()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Batch removed" })))
}

/// Configure job routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/jobs")
            .route("", web::post().to(submit_job))
            .route("/queue", web::get().to(get_queue))
            .route("/admin/all", web::get().to(get_all_jobs))
            .route("/admin/batches", web::get().to(get_batches))
            .route("/user/{user_id}", web::get().to(get_user_jobs))
            .route("/user/{user_id}/stats", web::get().to(get_user_stats))
            .route("/user/{user_id}/pay", web::put().to(pay_user))
            .route("/batch/{batch_id}/pay", web::put().to(pay_batch))
            .route(
                "/batch/{batch_id}/start-printing",
                web::put().to(start_batch_printing),
            )
            .route("/batch/{batch_id}/skip", web::put().to(skip_batch))
            .route("/batch/{batch_id}", web::delete().to(delete_batch))
            .route("/{id}/status", web::put().to(update_status))
            .route("/{id}/pay", web::put().to(pay_job))
            .route("/{id}/confirm", web::put().to(confirm_presence))
            .route("/{id}/collected", web::put().to(mark_collected))
            .route("/{id}/change-printer", web::put().to(change_printer))
            .route("/{id}", web::delete().to(delete_job)),
    );
}
