//! Queue ordering: position, wait estimates, and people-ahead counts.
//!
//! Everything here is a pure function over a snapshot of pending/printing
//! jobs. Position and wait are recomputed on every read and never persisted,
//! so they cannot drift from the stored records.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use crate::entity::print_job;
use crate::models::{JobStatus, JobView, QueueStats};

/// Fixed per-page service time.
pub const SECONDS_PER_PAGE: i64 = 3;

/// Queue position that triggers the "head to the printer" advisory.
pub const ALERT_POSITION: usize = 5;

/// Ordering key for a job: queue timestamp with created_at as both the
/// fallback and the tie-break.
pub fn sort_key(job: &print_job::Model) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        job.queue_timestamp.unwrap_or(job.created_at),
        job.created_at,
    )
}

/// Sort a snapshot into the canonical queue order.
pub fn order<'a>(snapshot: &'a [print_job::Model]) -> Vec<&'a print_job::Model> {
    let mut ordered: Vec<&print_job::Model> = snapshot.iter().collect();
    ordered.sort_by_key(|job| sort_key(job));
    ordered
}

fn is_pending(job: &print_job::Model) -> bool {
    job.status == JobStatus::Pending.as_str()
}

/// Sum of pages over the jobs ordered strictly before index `idx`.
fn pages_ahead(ordered: &[&print_job::Model], idx: usize) -> i64 {
    ordered[..idx]
        .iter()
        .map(|job| job.page_count as i64)
        .sum()
}

/// Fine-grained wait in raw seconds for a given pages-ahead sum.
pub fn wait_secs(pages: i64) -> i64 {
    pages * SECONDS_PER_PAGE
}

/// Coarse wait in minutes, rounded up, from the same pages-ahead sum.
pub fn wait_minutes(pages: i64) -> i64 {
    (wait_secs(pages) + 59) / 60
}

/// Build the public queue listing: every pending/printing job in order,
/// position and wait attached to pending entries only.
pub fn annotate_queue(snapshot: &[print_job::Model]) -> Vec<JobView> {
    let ordered = order(snapshot);

    ordered
        .iter()
        .enumerate()
        .map(|(idx, job)| {
            let view = JobView::from_model(job);
            if is_pending(job) {
                view.with_queue_info(idx + 1, Some(wait_secs(pages_ahead(&ordered, idx))))
            } else {
                view
            }
        })
        .collect()
}

/// Annotate one user's jobs against the global queue.
///
/// Jobs still in the queue carry their global position; pending jobs also
/// carry the wait derived from the same pages-ahead sum as the public
/// listing. Finished jobs pass through unannotated.
pub fn annotate_user_jobs(
    user_jobs: &[print_job::Model],
    snapshot: &[print_job::Model],
) -> Vec<JobView> {
    let ordered = order(snapshot);

    user_jobs
        .iter()
        .map(|job| {
            let view = JobView::from_model(job);
            match ordered.iter().position(|queued| queued.id == job.id) {
                Some(idx) => {
                    let wait = if is_pending(job) {
                        Some(wait_secs(pages_ahead(&ordered, idx)))
                    } else {
                        None
                    };
                    view.with_queue_info(idx + 1, wait)
                }
                None => view,
            }
        })
        .collect()
}

/// Per-user stats: distinct users ahead of the user's first queued job and
/// the coarse wait in minutes. A user with nothing queued gets zeros.
pub fn user_stats(snapshot: &[print_job::Model], user_id: Uuid) -> QueueStats {
    let ordered = order(snapshot);

    let Some(first_idx) = ordered.iter().position(|job| job.owner_id == user_id) else {
        return QueueStats {
            people_ahead: 0,
            wait_minutes: 0,
        };
    };

    let people_ahead = ordered[..first_idx]
        .iter()
        .map(|job| job.owner_id)
        .collect::<HashSet<_>>()
        .len();

    QueueStats {
        people_ahead,
        wait_minutes: wait_minutes(pages_ahead(&ordered, first_idx)),
    }
}

/// Users whose earliest pending job sits at exactly [`ALERT_POSITION`] in
/// the queue. Evaluated after a completion to fire the one-time advisory.
pub fn position_alerts(snapshot: &[print_job::Model]) -> Vec<(Uuid, Uuid)> {
    let ordered = order(snapshot);

    let mut seen_users = HashSet::new();
    let mut alerts = Vec::new();

    for (idx, job) in ordered.iter().enumerate() {
        if !is_pending(job) || !seen_users.insert(job.owner_id) {
            continue;
        }
        if idx + 1 == ALERT_POSITION {
            alerts.push((job.owner_id, job.id));
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::test_support::{job, job_at};
    use chrono::TimeDelta;

    #[test]
    fn sort_key_prefers_queue_timestamp() {
        let base = Utc::now();
        let mut j = job("u1", 1, base);
        assert_eq!(sort_key(&j), (base, base));

        let moved = base + TimeDelta::seconds(100);
        j.queue_timestamp = Some(moved);
        assert_eq!(sort_key(&j), (moved, base));

        j.queue_timestamp = None;
        assert_eq!(sort_key(&j), (base, base));
    }

    #[test]
    fn order_is_a_strict_total_order() {
        let base = Utc::now();
        // Same queue timestamp, distinct created_at: tie broken by creation.
        let a = job_at("u1", 1, base, Some(base + TimeDelta::seconds(50)));
        let b = job_at("u2", 1, base + TimeDelta::seconds(1), Some(base + TimeDelta::seconds(50)));
        let c = job("u3", 1, base + TimeDelta::seconds(2));

        let snapshot = vec![b.clone(), c.clone(), a.clone()];
        let ordered = order(&snapshot);
        let ids: Vec<_> = ordered.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);
    }

    #[test]
    fn position_identity_reproduces_listing_order() {
        let base = Utc::now();
        let snapshot: Vec<_> = (0..6)
            .map(|i| job("u", 1, base + TimeDelta::seconds(i)))
            .collect();

        let views = annotate_queue(&snapshot);
        for (idx, view) in views.iter().enumerate() {
            assert_eq!(view.position_in_queue, Some(idx + 1));
        }
    }

    #[test]
    fn two_batch_scenario_positions_and_wait() {
        // 3 jobs for user A (batch B1) then 3 for user B (batch B2),
        // 1 page each. B2's first job is 4th with 9 seconds of wait.
        let base = Utc::now();
        let mut snapshot = Vec::new();
        for i in 0..3 {
            let mut j = job("aaaaaaaa", 1, base + TimeDelta::seconds(i));
            j.batch_id = Some("B1".to_string());
            snapshot.push(j);
        }
        for i in 3..6 {
            let mut j = job("bbbbbbbb", 1, base + TimeDelta::seconds(i));
            j.batch_id = Some("B2".to_string());
            snapshot.push(j);
        }

        let views = annotate_queue(&snapshot);
        assert_eq!(views[3].batch_id.as_deref(), Some("B2"));
        assert_eq!(views[3].position_in_queue, Some(4));
        assert_eq!(views[3].estimated_wait_secs, Some(9));
    }

    #[test]
    fn printing_entries_carry_no_wait() {
        let base = Utc::now();
        let mut printing = job("u1", 5, base);
        printing.status = "printing".to_string();
        let pending = job("u2", 1, base + TimeDelta::seconds(1));

        let views = annotate_queue(&[printing, pending]);
        assert_eq!(views[0].estimated_wait_secs, None);
        assert_eq!(views[0].position_in_queue, None);
        // Pages of the printing job still count toward the pending job's wait.
        assert_eq!(views[1].estimated_wait_secs, Some(15));
        assert_eq!(views[1].position_in_queue, Some(2));
    }

    #[test]
    fn user_with_no_jobs_gets_zero_stats() {
        let base = Utc::now();
        let snapshot = vec![job("u1", 10, base)];
        let stats = user_stats(&snapshot, Uuid::now_v7());
        assert_eq!(stats.people_ahead, 0);
        assert_eq!(stats.wait_minutes, 0);
    }

    #[test]
    fn people_ahead_counts_distinct_users_not_jobs() {
        let base = Utc::now();
        let mut snapshot = Vec::new();
        // Two users, two jobs each, ahead of the queried user.
        for i in 0..2 {
            snapshot.push(job("u1", 10, base + TimeDelta::seconds(i)));
        }
        for i in 2..4 {
            snapshot.push(job("u2", 10, base + TimeDelta::seconds(i)));
        }
        let me = job("u3", 1, base + TimeDelta::seconds(10));
        let my_id = me.owner_id;
        snapshot.push(me);

        let stats = user_stats(&snapshot, my_id);
        assert_eq!(stats.people_ahead, 2);
        // 40 pages ahead x 3s = 120s = 2 minutes exactly.
        assert_eq!(stats.wait_minutes, 2);
    }

    #[test]
    fn wait_minutes_round_up() {
        assert_eq!(wait_minutes(0), 0);
        assert_eq!(wait_minutes(1), 1); // 3s
        assert_eq!(wait_minutes(20), 1); // 60s
        assert_eq!(wait_minutes(21), 2); // 63s
    }

    #[test]
    fn alert_fires_for_user_whose_first_pending_job_is_fifth() {
        let base = Utc::now();
        let mut snapshot: Vec<_> = (0..4)
            .map(|i| job(&format!("u{}", i), 1, base + TimeDelta::seconds(i)))
            .collect();
        let fifth = job("u-fifth", 1, base + TimeDelta::seconds(10));
        let expected = (fifth.owner_id, fifth.id);
        snapshot.push(fifth);
        snapshot.push(job("u-sixth", 1, base + TimeDelta::seconds(11)));

        assert_eq!(position_alerts(&snapshot), vec![expected]);
    }

    #[test]
    fn alert_skips_user_seen_earlier_in_queue() {
        let base = Utc::now();
        // u0's first job is position 1; their second job at position 5 must
        // not fire the alert.
        let mut snapshot: Vec<_> = (0..4)
            .map(|i| job(&format!("u{}", i), 1, base + TimeDelta::seconds(i)))
            .collect();
        let dup_owner = snapshot[0].owner_id;
        let mut second = job("x", 1, base + TimeDelta::seconds(10));
        second.owner_id = dup_owner;
        snapshot.push(second);

        assert!(position_alerts(&snapshot).is_empty());
    }
}
