//! Domain models for the print-queue server.

pub mod batch;
pub mod job;
pub mod printer;
pub mod ws_event;

// Re-export commonly used types
pub use batch::BatchSummary;
pub use job::{
    ChangePrinterRequest, ColorMode, JobStatus, JobView, JobsUpdatedResponse, PaymentMethod,
    PaymentState, PrintDetails, PrintSides, QueueStats, SkipBatchResponse, SubmitJobRequest,
    SubmitPrintDetails, UpdateStatusRequest, derive_cost,
};
pub use printer::{CreatePrinterRequest, PrinterStatus, PrinterView, UpdatePrinterRequest};
pub use ws_event::{WsEvent, WsEventMessage};
