//! Batch aggregation: a pure read-side projection over the flat job list.
//!
//! Groups jobs by batch id, derives the aggregate fields, and orders the
//! batches by the same key the queue uses. Jobs without a batch id stay
//! individual; they are never wrapped into a synthetic batch of one.

use chrono::{DateTime, Utc};

use crate::entity::print_job;
use crate::models::{BatchSummary, JobStatus, JobView};

use super::ordering;

/// Project batch summaries from a job snapshot.
///
/// Position and wait annotations are computed against the pending/printing
/// subset of the same snapshot; a batch's position is that of its earliest
/// pending member ("when does the first item of your batch print").
pub fn project_batches(jobs: &[print_job::Model]) -> Vec<BatchSummary> {
    let queue: Vec<print_job::Model> = jobs
        .iter()
        .filter(|job| {
            job.status == JobStatus::Pending.as_str()
                || job.status == JobStatus::Printing.as_str()
        })
        .cloned()
        .collect();
    let annotated = ordering::annotate_queue(&queue);

    let mut batches: Vec<BatchSummary> = Vec::new();

    for job in jobs {
        let Some(ref batch_id) = job.batch_id else {
            continue;
        };

        let status = JobStatus::parse(&job.status).unwrap_or(JobStatus::Failed);

        let idx = match batches.iter().position(|b| &b.batch_id == batch_id) {
            Some(idx) => idx,
            None => {
                batches.push(BatchSummary {
                    batch_id: batch_id.clone(),
                    status,
                    all_paid: true,
                    all_confirmed: true,
                    total_pages: 0,
                    total_cost: 0.0,
                    sort_time: sort_time(job),
                    position_in_queue: None,
                    estimated_wait_secs: None,
                    jobs: Vec::new(),
                });
                batches.len() - 1
            }
        };
        let summary = &mut batches[idx];

        summary.total_pages += job.page_count;
        summary.total_cost += job.cost;
        if !job.is_paid {
            summary.all_paid = false;
        }
        if !job.confirmed_presence {
            summary.all_confirmed = false;
        }
        // Printing dominates; otherwise the batch inherits its first
        // member's status even when members disagree.
        if status == JobStatus::Printing {
            summary.status = JobStatus::Printing;
        }
        summary.sort_time = summary.sort_time.min(sort_time(job));

        let mut view = JobView::from_model(job);
        if let Some(queued) = annotated.iter().find(|v| v.id == job.id) {
            view.position_in_queue = queued.position_in_queue;
            view.estimated_wait_secs = queued.estimated_wait_secs;
        }

        // Batch position/wait: minimum over pending members.
        if status == JobStatus::Pending {
            if let Some(pos) = view.position_in_queue {
                summary.position_in_queue = Some(match summary.position_in_queue {
                    Some(existing) => existing.min(pos),
                    None => pos,
                });
            }
            if let Some(wait) = view.estimated_wait_secs {
                summary.estimated_wait_secs = Some(match summary.estimated_wait_secs {
                    Some(existing) => existing.min(wait),
                    None => wait,
                });
            }
        }

        summary.jobs.push(view);
    }

    batches.sort_by_key(|b| b.sort_time);
    batches
}

fn sort_time(job: &print_job::Model) -> DateTime<Utc> {
    job.queue_timestamp.unwrap_or(job.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::test_support::{batch_job, job};
    use chrono::TimeDelta;

    #[test]
    fn individual_jobs_never_form_a_batch() {
        let base = Utc::now();
        let jobs = vec![job("u1", 1, base), job("u2", 2, base + TimeDelta::seconds(1))];
        assert!(project_batches(&jobs).is_empty());
    }

    #[test]
    fn aggregates_pages_cost_paid_and_confirmed() {
        let base = Utc::now();
        let mut a = batch_job("b1", 2, base);
        a.cost = 0.20;
        a.is_paid = true;
        a.confirmed_presence = true;
        let mut b = batch_job("b1", 3, base + TimeDelta::seconds(1));
        b.cost = 0.30;
        b.is_paid = false;
        b.confirmed_presence = true;

        let batches = project_batches(&[a, b]);
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.total_pages, 5);
        assert!((batch.total_cost - 0.50).abs() < 1e-9);
        assert!(!batch.all_paid);
        assert!(batch.all_confirmed);
    }

    #[test]
    fn printing_member_dominates_batch_status() {
        let base = Utc::now();
        let mut first = batch_job("b1", 1, base);
        first.status = "completed".to_string();
        let mut second = batch_job("b1", 1, base + TimeDelta::seconds(1));
        second.status = "printing".to_string();

        let batches = project_batches(&[first, second]);
        assert_eq!(batches[0].status, JobStatus::Printing);
    }

    #[test]
    fn mixed_status_batch_inherits_first_member_status() {
        let base = Utc::now();
        let mut first = batch_job("b1", 1, base);
        first.status = "completed".to_string();
        let second = batch_job("b1", 1, base + TimeDelta::seconds(1));

        let batches = project_batches(&[first, second]);
        assert_eq!(batches[0].status, JobStatus::Completed);
    }

    #[test]
    fn batch_position_is_minimum_over_pending_members() {
        let base = Utc::now();
        let other = job("u0", 4, base);
        let a = batch_job("b1", 1, base + TimeDelta::seconds(1));
        let b = batch_job("b1", 1, base + TimeDelta::seconds(2));

        let batches = project_batches(&[other, a, b]);
        let batch = &batches[0];
        assert_eq!(batch.position_in_queue, Some(2));
        // 4 pages ahead of the first member x 3s.
        assert_eq!(batch.estimated_wait_secs, Some(12));
    }

    #[test]
    fn batches_sort_by_queue_timestamp_fallback_created_at() {
        let base = Utc::now();
        let mut early_created = batch_job("b1", 1, base);
        // Skipped later: rewritten key moves it behind b2.
        early_created.queue_timestamp = Some(base + TimeDelta::seconds(100));
        let late_created = batch_job("b2", 1, base + TimeDelta::seconds(5));

        let batches = project_batches(&[early_created, late_created]);
        let ids: Vec<_> = batches.iter().map(|b| b.batch_id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b1"]);
    }
}
