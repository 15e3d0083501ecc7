//! Database queries for printers.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::entity::printer::{self, ActiveModel, Entity as Printer};
use crate::error::{AppError, AppResult};
use crate::models::{CreatePrinterRequest, PrinterStatus, UpdatePrinterRequest};

use super::DbPool;

impl DbPool {
    /// Register a new printer.
    pub async fn insert_printer(&self, req: &CreatePrinterRequest) -> AppResult<printer::Model> {
        let now = Utc::now();

        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(req.name.clone()),
            location: Set(req.location.clone()),
            status: Set(req
                .status
                .unwrap_or(PrinterStatus::Online)
                .as_str()
                .to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert printer: {}", e)))?;

        Ok(result)
    }

    /// Get a printer by ID.
    pub async fn get_printer_by_id(&self, id: Uuid) -> AppResult<Option<printer::Model>> {
        let result = Printer::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get printer: {}", e)))?;

        Ok(result)
    }

    /// Get a printer by ID, or NotFound.
    pub async fn require_printer(&self, id: Uuid) -> AppResult<printer::Model> {
        self.get_printer_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Printer {}", id)))
    }

    /// List all printers.
    pub async fn list_printers(&self) -> AppResult<Vec<printer::Model>> {
        let result = Printer::find()
            .order_by_asc(printer::Column::CreatedAt)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list printers: {}", e)))?;

        Ok(result)
    }

    /// Update a printer; absent fields keep their current value.
    pub async fn update_printer(
        &self,
        id: Uuid,
        req: &UpdatePrinterRequest,
    ) -> AppResult<printer::Model> {
        let existing = self.require_printer(id).await?;

        let mut active: ActiveModel = existing.into();
        if let Some(ref name) = req.name {
            active.name = Set(name.clone());
        }
        if let Some(ref location) = req.location {
            active.location = Set(location.clone());
        }
        if let Some(status) = req.status {
            active.status = Set(status.as_str().to_string());
        }
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update printer: {}", e)))?;

        Ok(result)
    }

    /// Delete a printer.
    pub async fn delete_printer(&self, id: Uuid) -> AppResult<u64> {
        let result = Printer::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete printer: {}", e)))?;

        Ok(result.rows_affected)
    }
}
