//! Skip planning: demote a batch to a later queue position.
//!
//! A skip rewrites the batch's queue timestamp to a midpoint between its
//! new neighbors, so no other row is re-sequenced and concurrent
//! submissions (which append at "now") still sort after any midpoint below
//! "now". Planning is pure; the atomic multi-row write lives in the db
//! layer.

use chrono::{DateTime, TimeDelta, Utc};

use crate::entity::print_job;
use crate::error::PolicyViolation;
use crate::models::JobStatus;

use super::ordering;

/// Maximum number of skips per batch.
pub const MAX_SKIPS: i32 = 2;

/// Target insertion index (0-based, among the other batches) for the first
/// and second skip.
const FIRST_SKIP_TARGET: usize = 5;
const SECOND_SKIP_TARGET: usize = 10;

/// Gap used when inserting before the first or after the last batch.
const EDGE_GAP_SECS: i64 = 60;

/// Computed placement for a skipped batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipPlan {
    /// Queue timestamp to write onto every member job.
    pub new_timestamp: DateTime<Utc>,
    /// 0-based insertion index among the other pending batches.
    pub target_index: usize,
    /// 1-indexed position reported back to the caller.
    pub new_position: usize,
}

/// One entry per distinct pending batch, in queue order.
fn ordered_batches(pending: &[print_job::Model]) -> Vec<(String, DateTime<Utc>)> {
    let ordered = ordering::order(pending);

    let mut batches: Vec<(String, DateTime<Utc>)> = Vec::new();
    for job in ordered {
        if job.status != JobStatus::Pending.as_str() {
            continue;
        }
        let Some(ref batch_id) = job.batch_id else {
            // Unbatched jobs take no part in batch-level reordering.
            continue;
        };
        if !batches.iter().any(|(id, _)| id == batch_id) {
            batches.push((batch_id.clone(), ordering::sort_key(job).0));
        }
    }

    batches
}

/// Plan a skip for `batch_id` given a snapshot of pending jobs.
///
/// Returns a policy error once the batch has been skipped [`MAX_SKIPS`]
/// times. The target index is clamped to the number of other batches, so a
/// short queue sends the batch to the end.
pub fn plan_skip(
    pending: &[print_job::Model],
    batch_id: &str,
    current_skip_count: i32,
    now: DateTime<Utc>,
) -> Result<SkipPlan, PolicyViolation> {
    if current_skip_count >= MAX_SKIPS {
        return Err(PolicyViolation::SkipLimitReached);
    }

    let other_batches: Vec<(String, DateTime<Utc>)> = ordered_batches(pending)
        .into_iter()
        .filter(|(id, _)| id != batch_id)
        .collect();

    let target_index = if current_skip_count == 0 {
        FIRST_SKIP_TARGET
    } else {
        SECOND_SKIP_TARGET
    }
    .min(other_batches.len());

    let edge_gap = TimeDelta::seconds(EDGE_GAP_SECS);

    let new_timestamp = if other_batches.is_empty() {
        now
    } else if target_index == 0 {
        other_batches[0].1 - edge_gap
    } else if target_index >= other_batches.len() {
        other_batches[other_batches.len() - 1].1 + edge_gap
    } else {
        let prev = other_batches[target_index - 1].1;
        let next = other_batches[target_index].1;
        prev + (next - prev) / 2
    };

    Ok(SkipPlan {
        new_timestamp,
        target_index,
        new_position: target_index + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::test_support::batch_job;

    /// N single-job pending batches named b0..bN-1, one second apart.
    fn pending_batches(n: usize) -> (Vec<print_job::Model>, DateTime<Utc>) {
        let base = Utc::now();
        let jobs = (0..n)
            .map(|i| batch_job(&format!("b{}", i), 1, base + TimeDelta::seconds(i as i64)))
            .collect();
        (jobs, base)
    }

    #[test]
    fn rejects_at_skip_cap() {
        let (jobs, _) = pending_batches(12);
        let err = plan_skip(&jobs, "b0", MAX_SKIPS, Utc::now()).unwrap_err();
        assert_eq!(err, PolicyViolation::SkipLimitReached);
        // Regardless of queue size.
        let err = plan_skip(&[], "b0", 3, Utc::now()).unwrap_err();
        assert_eq!(err, PolicyViolation::SkipLimitReached);
    }

    #[test]
    fn first_skip_lands_between_fifth_and_sixth_other_batch() {
        let (jobs, base) = pending_batches(12);
        let plan = plan_skip(&jobs, "b0", 0, Utc::now()).unwrap();
        assert_eq!(plan.target_index, 5);
        assert_eq!(plan.new_position, 6);
        // Others are b1..b11; slot 5 sits between b5 (base+5s) and b6 (base+6s).
        let prev = base + TimeDelta::seconds(5);
        let next = base + TimeDelta::seconds(6);
        assert!(plan.new_timestamp > prev && plan.new_timestamp < next);
        assert_eq!(plan.new_timestamp, prev + (next - prev) / 2);
    }

    #[test]
    fn second_skip_targets_index_ten() {
        let (jobs, _) = pending_batches(15);
        let plan = plan_skip(&jobs, "b0", 1, Utc::now()).unwrap();
        assert_eq!(plan.target_index, 10);
        assert_eq!(plan.new_position, 11);
    }

    #[test]
    fn short_queue_clamps_to_end() {
        // 4 other pending batches: target min(5, 4) = 4, i.e. the end.
        let (jobs, base) = pending_batches(5);
        let plan = plan_skip(&jobs, "b0", 0, Utc::now()).unwrap();
        assert_eq!(plan.target_index, 4);
        assert_eq!(plan.new_position, 5);
        // Strictly after the last other batch (b4 at base+4s).
        assert_eq!(
            plan.new_timestamp,
            base + TimeDelta::seconds(4) + TimeDelta::seconds(EDGE_GAP_SECS)
        );
    }

    #[test]
    fn lone_batch_keeps_now_as_timestamp() {
        let (jobs, _) = pending_batches(1);
        let now = Utc::now() + TimeDelta::seconds(123);
        let plan = plan_skip(&jobs, "b0", 0, now).unwrap();
        assert_eq!(plan.target_index, 0);
        assert_eq!(plan.new_position, 1);
        assert_eq!(plan.new_timestamp, now);
    }

    #[test]
    fn unbatched_jobs_are_invisible_to_batch_reordering() {
        let base = Utc::now();
        let mut jobs = vec![
            batch_job("b0", 1, base),
            batch_job("b1", 1, base + TimeDelta::seconds(1)),
        ];
        // An individual job between the batches must not count as a batch.
        let mut individual = batch_job("ignored", 1, base + TimeDelta::milliseconds(500));
        individual.batch_id = None;
        jobs.push(individual);

        let plan = plan_skip(&jobs, "b0", 0, Utc::now()).unwrap();
        // Only b1 remains: clamped to the end after it.
        assert_eq!(plan.target_index, 1);
        assert_eq!(plan.new_position, 2);
    }

    #[test]
    fn skipped_batch_ordering_uses_queue_timestamp() {
        let base = Utc::now();
        // b0 was already skipped once: queue timestamp far in the future.
        let mut b0 = batch_job("b0", 1, base);
        b0.queue_timestamp = Some(base + TimeDelta::seconds(100));
        let jobs = vec![
            b0,
            batch_job("b1", 1, base + TimeDelta::seconds(1)),
            batch_job("b2", 1, base + TimeDelta::seconds(2)),
        ];

        // Skipping b1: the other batches in key order are b2, then b0.
        let plan = plan_skip(&jobs, "b1", 0, Utc::now()).unwrap();
        assert_eq!(plan.target_index, 2);
        // Lands after b0's rewritten key, not after b2's creation time.
        assert_eq!(
            plan.new_timestamp,
            base + TimeDelta::seconds(100) + TimeDelta::seconds(EDGE_GAP_SECS)
        );
    }
}
