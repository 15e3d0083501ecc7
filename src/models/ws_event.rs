//! WebSocket event types for real-time queue updates.
//!
//! Delivery is best-effort/at-most-once; clients recover from a missed
//! event by re-querying current state. The stream is never the source of
//! truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::JobView;

/// WebSocket event sent to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum WsEvent {
    /// A new job was submitted.
    JobCreated(JobCreatedPayload),
    /// A single job changed (status, payment, presence, printer).
    JobUpdated(JobUpdatedPayload),
    /// Multiple jobs changed together (skip, batch pay); one event, not N.
    BatchUpdated(BatchUpdatedPayload),
    /// A job or a whole batch was deleted.
    JobDeleted(JobDeletedPayload),
    /// Advisory to one user: a completed job awaits pickup.
    ReadyToCollect(ReadyToCollectPayload),
    /// Advisory to one user: their earliest pending job reached position 5.
    QueuePositionAlert(QueuePositionAlertPayload),
}

/// Payload for job_created event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreatedPayload {
    pub job: JobView,
}

/// Payload for job_updated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobUpdatedPayload {
    pub job: JobView,
}

/// Payload for batch_updated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUpdatedPayload {
    /// Absent for multi-job updates not scoped to a batch (user-wide pay).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub jobs: Vec<JobView>,
}

/// Payload for job_deleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDeletedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    /// Set when an entire batch was deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

/// Payload for ready_to_collect event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyToCollectPayload {
    /// Owner the advisory targets; other clients ignore it.
    pub user_id: Uuid,
    pub job: JobView,
}

/// Payload for queue_position_alert event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePositionAlertPayload {
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub position: usize,
    pub message: String,
}

/// Wrapper that includes timestamp with every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEventMessage {
    #[serde(flatten)]
    pub event: WsEvent,
    pub timestamp: DateTime<Utc>,
}

impl WsEventMessage {
    /// Create a new event message with the current timestamp.
    pub fn new(event: WsEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

impl WsEvent {
    /// Create a job_created event.
    pub fn job_created(job: JobView) -> Self {
        WsEvent::JobCreated(JobCreatedPayload { job })
    }

    /// Create a job_updated event.
    pub fn job_updated(job: JobView) -> Self {
        WsEvent::JobUpdated(JobUpdatedPayload { job })
    }

    /// Create a batch_updated event carrying every affected job.
    pub fn batch_updated(batch_id: Option<String>, jobs: Vec<JobView>) -> Self {
        WsEvent::BatchUpdated(BatchUpdatedPayload { batch_id, jobs })
    }

    /// Create a job_deleted event for a single job.
    pub fn job_deleted(job_id: Uuid) -> Self {
        WsEvent::JobDeleted(JobDeletedPayload {
            job_id: Some(job_id),
            batch_id: None,
        })
    }

    /// Create a job_deleted event for a whole batch.
    pub fn batch_deleted(batch_id: String) -> Self {
        WsEvent::JobDeleted(JobDeletedPayload {
            job_id: None,
            batch_id: Some(batch_id),
        })
    }

    /// Create a ready_to_collect advisory.
    pub fn ready_to_collect(job: JobView) -> Self {
        WsEvent::ReadyToCollect(ReadyToCollectPayload {
            user_id: job.owner_id,
            job,
        })
    }

    /// Create a queue_position_alert advisory.
    pub fn queue_position_alert(user_id: Uuid, job_id: Uuid, position: usize) -> Self {
        WsEvent::QueuePositionAlert(QueuePositionAlertPayload {
            user_id,
            job_id,
            position,
            message: format!("You are {}th in line! Please head to the printer.", position),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_with_snake_case_type() {
        let event = WsEvent::job_deleted(Uuid::now_v7());
        let json = serde_json::to_value(WsEventMessage::new(event)).unwrap();
        assert_eq!(json["type"], "job_deleted");
        assert!(json["payload"]["job_id"].is_string());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn batch_deleted_carries_batch_id_only() {
        let event = WsEvent::batch_deleted("batch-7".to_string());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["payload"]["batch_id"], "batch-7");
        assert!(json["payload"].get("job_id").is_none());
    }
}
