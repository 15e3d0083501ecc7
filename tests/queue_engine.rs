//! End-to-end scenarios for the queue engine: ordering, skip placement, and
//! batch aggregation over synthetic job snapshots.

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use print_queue_lib::entity::print_job;
use print_queue_lib::models::{JobStatus, PaymentMethod, PaymentState};
use print_queue_lib::queue;

fn owner(tag: &str) -> Uuid {
    let mut bytes = [0u8; 16];
    for (i, b) in tag.bytes().enumerate().take(16) {
        bytes[i] = b;
    }
    Uuid::from_bytes(bytes)
}

fn pending_job(
    owner_tag: &str,
    batch_id: Option<&str>,
    pages: i32,
    created_at: DateTime<Utc>,
) -> print_job::Model {
    print_job::Model {
        id: Uuid::now_v7(),
        owner_id: owner(owner_tag),
        printer_id: Uuid::nil(),
        file_ref: format!("doc-{}.pdf", owner_tag),
        batch_id: batch_id.map(str::to_string),
        status: JobStatus::Pending.as_str().to_string(),
        is_paid: false,
        payment_method: PaymentMethod::Counter.as_str().to_string(),
        payment_status: PaymentState::Pending.as_str().to_string(),
        confirmed_presence: false,
        confirmation_time: None,
        sides: "single".to_string(),
        color: "bw".to_string(),
        page_count: pages,
        cost: pages as f64 * 0.10,
        skip_count: 0,
        queue_timestamp: Some(created_at),
        created_at,
        updated_at: created_at,
        completed_at: None,
        collected_at: None,
    }
}

/// Apply a skip plan to a snapshot the way the storage layer would: one
/// logical write covering every member of the batch.
fn apply_skip(snapshot: &mut [print_job::Model], batch_id: &str, ts: DateTime<Utc>) {
    for job in snapshot.iter_mut() {
        if job.batch_id.as_deref() == Some(batch_id) {
            job.queue_timestamp = Some(ts);
            job.skip_count += 1;
        }
    }
}

#[test]
fn submission_order_is_queue_order() {
    let base = Utc::now();
    let mut snapshot = Vec::new();
    for i in 0..3 {
        snapshot.push(pending_job("alice", Some("B1"), 1, base + TimeDelta::seconds(i)));
    }
    for i in 3..6 {
        snapshot.push(pending_job("bob", Some("B2"), 1, base + TimeDelta::seconds(i)));
    }

    let views = queue::annotate_queue(&snapshot);

    let batches: Vec<_> = views.iter().map(|v| v.batch_id.as_deref().unwrap()).collect();
    assert_eq!(batches, vec!["B1", "B1", "B1", "B2", "B2", "B2"]);

    // B2's first job: position 4, 3 pages ahead x 3s = 9 time-units.
    assert_eq!(views[3].position_in_queue, Some(4));
    assert_eq!(views[3].estimated_wait_secs, Some(9));

    // Position identity: position = 1 + jobs sorting strictly before.
    for (idx, view) in views.iter().enumerate() {
        assert_eq!(view.position_in_queue, Some(idx + 1));
    }
}

#[test]
fn skip_moves_batch_to_sixth_slot_and_bumps_count() {
    let base = Utc::now();
    let mut snapshot = Vec::new();
    // 8 single-job batches: B0..B7.
    for i in 0..8 {
        snapshot.push(pending_job(
            &format!("user{}", i),
            Some(&format!("B{}", i)),
            1,
            base + TimeDelta::seconds(i),
        ));
    }

    let plan = queue::plan_skip(&snapshot, "B0", 0, Utc::now()).unwrap();
    assert_eq!(plan.new_position, 6);

    apply_skip(&mut snapshot, "B0", plan.new_timestamp);

    let batches = queue::project_batches(&snapshot);
    let order: Vec<_> = batches.iter().map(|b| b.batch_id.as_str()).collect();
    assert_eq!(order, vec!["B1", "B2", "B3", "B4", "B5", "B0", "B6", "B7"]);
    assert_eq!(snapshot[0].skip_count, 1);

    // The other batches kept their relative order.
    let others: Vec<_> = order.iter().filter(|b| **b != "B0").copied().collect();
    assert_eq!(others, vec!["B1", "B2", "B3", "B4", "B5", "B6", "B7"]);
}

#[test]
fn skip_with_four_other_batches_clamps_to_end() {
    let base = Utc::now();
    let mut snapshot = Vec::new();
    for i in 0..5 {
        snapshot.push(pending_job(
            &format!("user{}", i),
            Some(&format!("B{}", i)),
            1,
            base + TimeDelta::seconds(i),
        ));
    }

    // Skipping B0 among 4 other batches: target min(5, 4) = 4, the end.
    let plan = queue::plan_skip(&snapshot, "B0", 0, Utc::now()).unwrap();
    assert_eq!(plan.new_position, 5);

    apply_skip(&mut snapshot, "B0", plan.new_timestamp);

    let batches = queue::project_batches(&snapshot);
    let order: Vec<_> = batches.iter().map(|b| b.batch_id.as_str()).collect();
    assert_eq!(order, vec!["B1", "B2", "B3", "B4", "B0"]);
}

#[test]
fn two_skips_then_rejection() {
    let base = Utc::now();
    let mut snapshot = Vec::new();
    for i in 0..3 {
        snapshot.push(pending_job(
            &format!("user{}", i),
            Some(&format!("B{}", i)),
            1,
            base + TimeDelta::seconds(i),
        ));
    }

    let first = queue::plan_skip(&snapshot, "B0", 0, Utc::now()).unwrap();
    apply_skip(&mut snapshot, "B0", first.new_timestamp);

    let second = queue::plan_skip(&snapshot, "B0", 1, Utc::now()).unwrap();
    apply_skip(&mut snapshot, "B0", second.new_timestamp);

    assert_eq!(snapshot[0].skip_count, 2);
    assert!(queue::plan_skip(&snapshot, "B0", 2, Utc::now()).is_err());
}

#[test]
fn concurrent_submission_sorts_after_midpoint_insertion() {
    let base = Utc::now() - TimeDelta::minutes(10);
    let mut snapshot = Vec::new();
    for i in 0..7 {
        snapshot.push(pending_job(
            &format!("user{}", i),
            Some(&format!("B{}", i)),
            1,
            base + TimeDelta::seconds(i),
        ));
    }

    let plan = queue::plan_skip(&snapshot, "B0", 0, Utc::now()).unwrap();
    apply_skip(&mut snapshot, "B0", plan.new_timestamp);

    // A new submission appends at "now", which sorts after any midpoint
    // computed from timestamps below now.
    snapshot.push(pending_job("late", Some("B-late"), 1, Utc::now()));

    let batches = queue::project_batches(&snapshot);
    assert_eq!(batches.last().unwrap().batch_id, "B-late");
}

#[test]
fn ordering_falls_back_to_created_at_like_the_heal_does() {
    let base = Utc::now();
    let mut with_ts = Vec::new();
    let mut without_ts = Vec::new();
    for i in 0..4 {
        let job = pending_job(&format!("u{}", i), None, 1, base + TimeDelta::seconds(i));
        let mut unhealed = job.clone();
        unhealed.queue_timestamp = None;
        with_ts.push(job);
        without_ts.push(unhealed);
    }

    // The heal writes queue_timestamp = created_at; ordering treats a
    // missing key identically, so healing is invisible to the order.
    let healed: Vec<_> = queue::annotate_queue(&with_ts)
        .iter()
        .map(|v| v.id)
        .collect();
    let fallback: Vec<_> = queue::annotate_queue(&without_ts)
        .iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(healed, fallback);
}

#[test]
fn zero_job_user_has_empty_stats() {
    let base = Utc::now();
    let snapshot = vec![pending_job("someone", None, 30, base)];

    let stats = queue::user_stats(&snapshot, owner("nobody"));
    assert_eq!(stats.people_ahead, 0);
    assert_eq!(stats.wait_minutes, 0);
}

#[test]
fn batch_aggregates_track_members() {
    let base = Utc::now();
    let mut snapshot = Vec::new();

    let mut first = pending_job("alice", Some("B1"), 2, base);
    first.is_paid = true;
    first.status = JobStatus::Printing.as_str().to_string();
    snapshot.push(first);

    let mut second = pending_job("alice", Some("B1"), 3, base + TimeDelta::seconds(1));
    second.confirmed_presence = true;
    snapshot.push(second);

    let batches = queue::project_batches(&snapshot);
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];

    assert_eq!(batch.status, JobStatus::Printing);
    assert_eq!(batch.total_pages, 5);
    assert!(!batch.all_paid);
    assert!(!batch.all_confirmed);
    // The pending member is second in queue, behind 2 printing pages.
    assert_eq!(batch.position_in_queue, Some(2));
    assert_eq!(batch.estimated_wait_secs, Some(6));
}
