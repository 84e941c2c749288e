//! Integration tests for the bid/gig state machine.
//!
//! These run against SeaORM's mock connection: each test scripts the row
//! counts the conditional writes will observe and asserts the transition
//! outcome. No running server or database is needed.
//!
//! Run with: `cargo test --test hiring_test`

use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use uuid::Uuid;

use gigbid_backend::db::bids::{
    HireTransition, execute_hire, reconcile_assigned_gigs, withdraw_bid,
};
use gigbid_backend::models::gigs::{self, GigStatus};

fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

/// Helper: an assigned gig row with a selected bid, as the reconcile pass
/// would read it back.
fn assigned_gig(selected_bid_id: Option<Uuid>) -> gigs::Model {
    gigs::Model {
        id: Uuid::new_v4(),
        title: "Logo design".to_string(),
        description: "Design a logo for a small coffee roastery".to_string(),
        budget: 500.0,
        owner_id: Uuid::new_v4(),
        status: GigStatus::Assigned,
        selected_bid_id,
        bid_count: 3,
        created_at: Utc::now(),
        updated_at: Some(Utc::now()),
    }
}

#[tokio::test]
async fn hire_assigns_gig_and_rejects_competitors() {
    // Conditional assign matches, bid flip matches, two competitors swept.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(1), exec(2)])
        .into_connection();

    let outcome = execute_hire(&db, Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect("hire should not error");

    assert_eq!(outcome, HireTransition::Completed { rejected: 2 });
}

#[tokio::test]
async fn hire_with_no_competitors_rejects_zero() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(1), exec(0)])
        .into_connection();

    let outcome = execute_hire(&db, Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect("hire should not error");

    assert_eq!(outcome, HireTransition::Completed { rejected: 0 });
}

#[tokio::test]
async fn hire_losing_the_gig_race_touches_nothing_else() {
    // The conditional open→assigned write matches zero rows: some other
    // caller got there first. The bid and competitor updates never run —
    // only one exec result is scripted and the test would fail on a second.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(0)])
        .into_connection();

    let outcome = execute_hire(&db, Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect("hire should not error");

    assert_eq!(outcome, HireTransition::GigNotOpen);
}

#[tokio::test]
async fn hire_aborts_when_bid_was_processed_concurrently() {
    // Gig assign matches, but the bid is no longer pending (withdrawn or
    // already processed between precondition check and transaction).
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(0)])
        .into_connection();

    let outcome = execute_hire(&db, Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect("hire should not error");

    assert_eq!(outcome, HireTransition::BidNotPending);
}

#[tokio::test]
async fn second_hire_on_same_gig_loses() {
    // Two hire calls back to back: the first consumes the winning writes,
    // the second observes the gig already assigned.
    let gig_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(1), exec(1), exec(0)])
        .into_connection();

    let first = execute_hire(&db, gig_id, Uuid::new_v4())
        .await
        .expect("first hire should not error");
    let second = execute_hire(&db, gig_id, Uuid::new_v4())
        .await
        .expect("second hire should not error");

    assert_eq!(first, HireTransition::Completed { rejected: 1 });
    assert_eq!(second, HireTransition::GigNotOpen);
}

#[tokio::test]
async fn withdraw_deletes_and_decrements() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(1), exec(1)])
        .into_connection();

    let withdrawn = withdraw_bid(&db, Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect("withdraw should not error");

    assert!(withdrawn);
}

#[tokio::test]
async fn withdraw_of_processed_bid_never_decrements() {
    // The conditional delete matches zero rows; only one exec result is
    // scripted, so a counter decrement would fail the test.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([exec(0)])
        .into_connection();

    let withdrawn = withdraw_bid(&db, Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect("withdraw should not error");

    assert!(!withdrawn);
}

#[tokio::test]
async fn reconcile_finishes_interrupted_hire_cleanup() {
    // One assigned gig whose selected bid is still pending and which has
    // pending competitors: the repair pass flips the selected bid and
    // sweeps two leftovers.
    let gig = assigned_gig(Some(Uuid::new_v4()));
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![gig]])
        .append_exec_results([exec(1), exec(2)])
        .into_connection();

    let repaired = reconcile_assigned_gigs(&db)
        .await
        .expect("reconcile should not error");

    assert_eq!(repaired, 3);
}

#[tokio::test]
async fn reconcile_is_a_noop_on_clean_state() {
    let gig = assigned_gig(Some(Uuid::new_v4()));
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![gig]])
        .append_exec_results([exec(0), exec(0)])
        .into_connection();

    let repaired = reconcile_assigned_gigs(&db)
        .await
        .expect("reconcile should not error");

    assert_eq!(repaired, 0);
}

#[tokio::test]
async fn reconcile_with_no_assigned_gigs_reads_only() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<gigs::Model>::new()])
        .into_connection();

    let repaired = reconcile_assigned_gigs(&db)
        .await
        .expect("reconcile should not error");

    assert_eq!(repaired, 0);
}
