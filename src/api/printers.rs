//! Printer API handlers. Thin CRUD; printers are admin-owned and only
//! referenced by jobs.

use actix_web::{HttpResponse, web};
use tracing::info;
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CreatePrinterRequest, PrinterView, UpdatePrinterRequest};

fn require_admin(identity: &Identity) -> AppResult<()> {
    if !identity.is_admin() {
        return Err(AppError::Unauthorized(
            "Admin role required for this operation".to_string(),
        ));
    }
    Ok(())
}

/// List all printers.
#[utoipa::path(
    get,
    path = "/printers",
    tag = "Printers",
    responses(
        (status = 200, description = "All printers", body = [PrinterView]),
    )
)]
pub async fn list_printers(pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let printers = pool.list_printers().await?;
    let views: Vec<PrinterView> = printers.iter().map(PrinterView::from_model).collect();

    Ok(HttpResponse::Ok().json(views))
}

/// Register a printer.
#[utoipa::path(
    post,
    path = "/printers",
    tag = "Printers",
    request_body = CreatePrinterRequest,
    responses(
        (status = 201, description = "Printer created", body = PrinterView),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn create_printer(
    identity: Identity,
    pool: web::Data<DbPool>,
    body: web::Json<CreatePrinterRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let printer = pool.insert_printer(&body.into_inner()).await?;
    info!(printer_id = %printer.id, name = %printer.name, "Printer registered");

    Ok(HttpResponse::Created().json(PrinterView::from_model(&printer)))
}

/// Update a printer.
#[utoipa::path(
    put,
    path = "/printers/{id}",
    tag = "Printers",
    params(
        ("id" = Uuid, Path, description = "Printer UUID")
    ),
    request_body = UpdatePrinterRequest,
    responses(
        (status = 200, description = "Printer updated", body = PrinterView),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Printer not found", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn update_printer(
    identity: Identity,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePrinterRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let printer = pool
        .update_printer(path.into_inner(), &body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(PrinterView::from_model(&printer)))
}

/// Remove a printer.
#[utoipa::path(
    delete,
    path = "/printers/{id}",
    tag = "Printers",
    params(
        ("id" = Uuid, Path, description = "Printer UUID")
    ),
    responses(
        (status = 200, description = "Printer removed"),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Printer not found", body = crate::error::ErrorResponse),
    ),
    security(("admin_key" = []))
)]
pub async fn delete_printer(
    identity: Identity,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let id = path.into_inner();
    let deleted = pool.delete_printer(id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!("Printer {}", id)));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Printer removed" })))
}

/// Configure printer routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/printers")
            .route("", web::get().to(list_printers))
            .route("", web::post().to(create_printer))
            .route("/{id}", web::put().to(update_printer))
            .route("/{id}", web::delete().to(delete_printer)),
    );
}
