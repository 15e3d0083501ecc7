//! Job domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::print_job;

/// Per-page base cost in dollars.
const COST_PER_PAGE: f64 = 0.10;
/// Color multiplier relative to black-and-white.
const COLOR_MULTIPLIER: f64 = 3.0;
/// Double-sided discount multiplier.
const DOUBLE_SIDED_MULTIPLIER: f64 = 0.8;

/// Job status enum.
///
/// `Failed` is reserved for external errors and is not produced by any
/// current flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting in the queue.
    Pending,
    /// Currently on a printer.
    Printing,
    /// Printed, awaiting physical pickup.
    Completed,
    /// Physically handed over.
    Collected,
    /// Abandoned by an admin override.
    Skipped,
    /// External failure.
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Printing => "printing",
            Self::Completed => "completed",
            Self::Collected => "collected",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "printing" => Some(Self::Printing),
            "completed" => Some(Self::Completed),
            "collected" => Some(Self::Collected),
            "skipped" => Some(Self::Skipped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// States from which no further transition is legal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Collected | Self::Skipped | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the job is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    Counter,
    None,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Counter => "counter",
            Self::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "counter" => Some(Self::Counter),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// External payment lifecycle mirrored onto the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    PendingPayment,
    Paid,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "pending_payment" => Some(Self::PendingPayment),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Single- or double-sided printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrintSides {
    Single,
    Double,
}

impl PrintSides {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "double" => Some(Self::Double),
            _ => None,
        }
    }
}

/// Black-and-white or color printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Bw,
    Color,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bw => "bw",
            Self::Color => "color",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bw" => Some(Self::Bw),
            "color" => Some(Self::Color),
            _ => None,
        }
    }
}

/// Derive the immutable job cost at submission time.
///
/// Cost = pages x $0.10, x3 for color, x0.8 for double-sided, x copies,
/// rounded to cents.
pub fn derive_cost(page_count: i32, color: ColorMode, sides: PrintSides, copies: i32) -> f64 {
    let mut cost = page_count as f64 * COST_PER_PAGE;
    if color == ColorMode::Color {
        cost *= COLOR_MULTIPLIER;
    }
    if sides == PrintSides::Double {
        cost *= DOUBLE_SIDED_MULTIPLIER;
    }
    cost *= copies.max(1) as f64;
    (cost * 100.0).round() / 100.0
}

/// Print configuration as stored on the job.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrintDetails {
    pub sides: PrintSides,
    pub color: ColorMode,
    pub page_count: i32,
    /// Derived at submission, immutable afterwards.
    pub cost: f64,
}

/// Print configuration supplied by the client at submission.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitPrintDetails {
    pub sides: PrintSides,
    pub color: ColorMode,
    pub page_count: i32,
    /// Number of copies; folds into cost only.
    #[serde(default = "default_copies")]
    pub copies: i32,
}

fn default_copies() -> i32 {
    1
}

/// Request to submit a new print job.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitJobRequest {
    /// Target printer.
    pub printer_id: Uuid,
    /// Opaque reference to the uploaded document.
    pub file_ref: String,
    pub print_details: SubmitPrintDetails,
    pub payment_method: PaymentMethod,
    /// Groups jobs submitted together; absent for individual uploads.
    #[serde(default)]
    pub batch_id: Option<String>,
}

/// Request to change a job's status.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: JobStatus,
}

/// Request to move a job to a different printer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePrinterRequest {
    pub printer_id: Uuid,
}

/// Job as returned by the API, with queue annotations where applicable.
/// Also carried inside WebSocket event payloads.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub printer_id: Uuid,
    pub file_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub status: JobStatus,
    pub is_paid: bool,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentState,
    pub confirmed_presence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_time: Option<DateTime<Utc>>,
    pub print_details: PrintDetails,
    pub skip_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<DateTime<Utc>>,
    /// 1-based position in the global queue (pending/printing jobs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_in_queue: Option<usize>,
    /// Estimated wait in raw seconds (pending jobs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_wait_secs: Option<i64>,
}

impl JobView {
    /// Build a view from a stored record, without queue annotations.
    pub fn from_model(model: &print_job::Model) -> Self {
        JobView {
            id: model.id,
            owner_id: model.owner_id,
            printer_id: model.printer_id,
            file_ref: model.file_ref.clone(),
            batch_id: model.batch_id.clone(),
            status: JobStatus::parse(&model.status).unwrap_or(JobStatus::Failed),
            is_paid: model.is_paid,
            payment_method: PaymentMethod::parse(&model.payment_method)
                .unwrap_or(PaymentMethod::None),
            payment_status: PaymentState::parse(&model.payment_status)
                .unwrap_or(PaymentState::Pending),
            confirmed_presence: model.confirmed_presence,
            confirmation_time: model.confirmation_time,
            print_details: PrintDetails {
                sides: PrintSides::parse(&model.sides).unwrap_or(PrintSides::Single),
                color: ColorMode::parse(&model.color).unwrap_or(ColorMode::Bw),
                page_count: model.page_count,
                cost: model.cost,
            },
            skip_count: model.skip_count,
            queue_timestamp: model.queue_timestamp,
            created_at: model.created_at,
            updated_at: model.updated_at,
            completed_at: model.completed_at,
            collected_at: model.collected_at,
            position_in_queue: None,
            estimated_wait_secs: None,
        }
    }

    /// Attach queue position and wait annotations.
    pub fn with_queue_info(mut self, position: usize, wait_secs: Option<i64>) -> Self {
        self.position_in_queue = Some(position);
        self.estimated_wait_secs = wait_secs;
        self
    }
}

/// Per-user queue statistics.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueStats {
    /// Distinct users whose jobs sort before this user's first job.
    pub people_ahead: usize,
    /// Coarse wait estimate in minutes, rounded up.
    pub wait_minutes: i64,
}

/// Response after skipping a batch.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkipBatchResponse {
    pub message: String,
    /// 1-indexed position of the batch among pending batches after the skip.
    pub new_position: usize,
}

/// Response for multi-job mutations (batch pay, presence confirmation).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobsUpdatedResponse {
    pub message: String,
    pub jobs: Vec<JobView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            JobStatus::Pending,
            JobStatus::Printing,
            JobStatus::Completed,
            JobStatus::Collected,
            JobStatus::Skipped,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(JobStatus::parse("bogus"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Collected.is_terminal());
        assert!(JobStatus::Skipped.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Completed.is_terminal());
    }

    #[test]
    fn cost_bw_single() {
        assert_eq!(derive_cost(10, ColorMode::Bw, PrintSides::Single, 1), 1.0);
    }

    #[test]
    fn cost_color_triples() {
        assert_eq!(derive_cost(10, ColorMode::Color, PrintSides::Single, 1), 3.0);
    }

    #[test]
    fn cost_double_sided_discount() {
        assert_eq!(derive_cost(10, ColorMode::Bw, PrintSides::Double, 1), 0.8);
    }

    #[test]
    fn cost_multiplies_copies_and_rounds_to_cents() {
        // 3 pages color double: 3 * 0.10 * 3 * 0.8 = 0.72; x2 copies = 1.44
        assert_eq!(derive_cost(3, ColorMode::Color, PrintSides::Double, 2), 1.44);
        // zero copies treated as one
        assert_eq!(derive_cost(1, ColorMode::Bw, PrintSides::Single, 0), 0.10);
    }
}
