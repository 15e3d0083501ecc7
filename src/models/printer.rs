//! Printer domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::printer;

/// Printer availability status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrinterStatus {
    Online,
    Offline,
    Busy,
}

impl PrinterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Busy => "busy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            "busy" => Some(Self::Busy),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to register a new printer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePrinterRequest {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub status: Option<PrinterStatus>,
}

/// Request to update a printer; absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePrinterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<PrinterStatus>,
}

/// Printer as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PrinterView {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub status: PrinterStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrinterView {
    pub fn from_model(model: &printer::Model) -> Self {
        PrinterView {
            id: model.id,
            name: model.name.clone(),
            location: model.location.clone(),
            status: PrinterStatus::parse(&model.status).unwrap_or(PrinterStatus::Offline),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
