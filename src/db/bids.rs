use sea_orm::prelude::Expr;
use sea_orm::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::gigs as gig_db;
use crate::models::bids::{self, BidStatus, SubmitBid};
use crate::models::gigs::{self, GigStatus};

/// Outcome of the hiring transition's conditional writes.
///
/// The non-`Completed` variants mean a concurrent caller changed the state
/// between the handler's precondition checks and the transaction; nothing
/// was committed.
#[derive(Debug, PartialEq, Eq)]
pub enum HireTransition {
    Completed { rejected: u64 },
    GigNotOpen,
    BidNotPending,
}

/// Insert a new bid and bump the gig's bid counter in one transaction.
///
/// A reader never sees the new bid without the incremented count or vice
/// versa. A duplicate (gig, freelancer) pair surfaces as a unique-violation
/// `DbErr` from the insert.
pub async fn insert_bid(
    db: &DatabaseConnection,
    input: SubmitBid,
    freelancer_id: Uuid,
) -> Result<bids::Model, DbErr> {
    let txn = db.begin().await?;

    let new_bid = bids::ActiveModel {
        id: Set(Uuid::new_v4()),
        gig_id: Set(input.gig_id),
        freelancer_id: Set(freelancer_id),
        message: Set(input.message),
        bid_price: Set(input.bid_price),
        status: Set(BidStatus::Pending),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    let bid = new_bid.insert(&txn).await?;
    gig_db::bump_bid_count(&txn, bid.gig_id, 1).await?;

    txn.commit().await?;
    Ok(bid)
}

/// Fetch a single bid by ID.
pub async fn get_bid_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<bids::Model>, DbErr> {
    bids::Entity::find_by_id(id).one(db).await
}

/// Fetch all bids on a gig, newest first.
pub async fn get_bids_by_gig(
    db: &DatabaseConnection,
    gig_id: Uuid,
) -> Result<Vec<bids::Model>, DbErr> {
    bids::Entity::find()
        .filter(bids::Column::GigId.eq(gig_id))
        .order_by_desc(bids::Column::CreatedAt)
        .order_by_desc(bids::Column::Id)
        .all(db)
        .await
}

/// Fetch all bids submitted by one freelancer, newest first.
pub async fn get_bids_by_freelancer(
    db: &DatabaseConnection,
    freelancer_id: Uuid,
) -> Result<Vec<bids::Model>, DbErr> {
    bids::Entity::find()
        .filter(bids::Column::FreelancerId.eq(freelancer_id))
        .order_by_desc(bids::Column::CreatedAt)
        .order_by_desc(bids::Column::Id)
        .all(db)
        .await
}

/// Fetch many bids in one query and return an id -> bid map.
pub async fn get_bids_by_ids(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, bids::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = bids::Entity::find()
        .filter(bids::Column::Id.is_in(ids))
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|b| (b.id, b)).collect())
}

/// Whether the freelancer already has a bid on this gig.
pub async fn bid_exists_for_gig_and_freelancer(
    db: &DatabaseConnection,
    gig_id: Uuid,
    freelancer_id: Uuid,
) -> Result<bool, DbErr> {
    let count = bids::Entity::find()
        .filter(bids::Column::GigId.eq(gig_id))
        .filter(bids::Column::FreelancerId.eq(freelancer_id))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Delete a pending bid and decrement the gig's bid counter in one
/// transaction.
///
/// The delete is conditional on `status = pending`: a bid that was hired,
/// rejected, or already withdrawn matches zero rows and the counter is
/// never touched, so a repeated withdrawal cannot double-decrement.
/// Returns `false` when nothing matched.
pub async fn withdraw_bid(
    db: &DatabaseConnection,
    bid_id: Uuid,
    gig_id: Uuid,
) -> Result<bool, DbErr> {
    let txn = db.begin().await?;

    let removed = bids::Entity::delete_many()
        .filter(bids::Column::Id.eq(bid_id))
        .filter(bids::Column::Status.eq(BidStatus::Pending))
        .exec(&txn)
        .await?
        .rows_affected;

    if removed == 0 {
        txn.rollback().await?;
        return Ok(false);
    }

    gig_db::bump_bid_count(&txn, gig_id, -1).await?;

    txn.commit().await?;
    Ok(true)
}

/// The hiring transition: assign the gig, mark the chosen bid hired, and
/// reject every other pending bid, all in one transaction.
///
/// The commit point is the conditional gig write: `status` flips from open
/// to assigned only if it is still open, so of any number of concurrent
/// hire calls on the same gig exactly one can pass that filter. The loser's
/// transaction touches zero rows and rolls back.
///
/// The caller has already verified ownership and the pending status; the
/// conditional filters here re-check both against races, not policy.
pub async fn execute_hire(
    db: &DatabaseConnection,
    gig_id: Uuid,
    bid_id: Uuid,
) -> Result<HireTransition, DbErr> {
    let txn = db.begin().await?;
    let now = chrono::Utc::now();

    let assigned = gigs::Entity::update_many()
        .col_expr(gigs::Column::Status, Expr::value(GigStatus::Assigned))
        .col_expr(gigs::Column::SelectedBidId, Expr::value(Some(bid_id)))
        .col_expr(gigs::Column::UpdatedAt, Expr::value(Some(now)))
        .filter(gigs::Column::Id.eq(gig_id))
        .filter(gigs::Column::Status.eq(GigStatus::Open))
        .exec(&txn)
        .await?
        .rows_affected;

    if assigned == 0 {
        txn.rollback().await?;
        tracing::debug!("hire lost the race for gig {gig_id}: no longer open");
        return Ok(HireTransition::GigNotOpen);
    }

    let hired = bids::Entity::update_many()
        .col_expr(bids::Column::Status, Expr::value(BidStatus::Hired))
        .col_expr(bids::Column::UpdatedAt, Expr::value(Some(now)))
        .filter(bids::Column::Id.eq(bid_id))
        .filter(bids::Column::Status.eq(BidStatus::Pending))
        .exec(&txn)
        .await?
        .rows_affected;

    if hired == 0 {
        txn.rollback().await?;
        tracing::debug!("hire aborted: bid {bid_id} is no longer pending");
        return Ok(HireTransition::BidNotPending);
    }

    let rejected = bids::Entity::update_many()
        .col_expr(bids::Column::Status, Expr::value(BidStatus::Rejected))
        .col_expr(bids::Column::UpdatedAt, Expr::value(Some(now)))
        .filter(bids::Column::GigId.eq(gig_id))
        .filter(bids::Column::Id.ne(bid_id))
        .filter(bids::Column::Status.eq(BidStatus::Pending))
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;
    tracing::info!("hired bid {bid_id} on gig {gig_id}; {rejected} competing bids rejected");

    Ok(HireTransition::Completed { rejected })
}

/// Repair pass: finish the hire cleanup for any assigned gig that still has
/// pending bids.
///
/// Idempotent; run at startup and safe to re-run any time. Covers storage
/// failures that interrupt the hiring transition's cleanup as well as data
/// imported from deployments without transactional hiring.
pub async fn reconcile_assigned_gigs(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let assigned = gigs::Entity::find()
        .filter(gigs::Column::Status.eq(GigStatus::Assigned))
        .all(db)
        .await?;

    let mut repaired = 0;
    for gig in assigned {
        let Some(selected_bid_id) = gig.selected_bid_id else {
            tracing::error!("assigned gig {} has no selected bid", gig.id);
            continue;
        };
        let now = chrono::Utc::now();

        repaired += bids::Entity::update_many()
            .col_expr(bids::Column::Status, Expr::value(BidStatus::Hired))
            .col_expr(bids::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(bids::Column::Id.eq(selected_bid_id))
            .filter(bids::Column::Status.eq(BidStatus::Pending))
            .exec(db)
            .await?
            .rows_affected;

        repaired += bids::Entity::update_many()
            .col_expr(bids::Column::Status, Expr::value(BidStatus::Rejected))
            .col_expr(bids::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(bids::Column::GigId.eq(gig.id))
            .filter(bids::Column::Id.ne(selected_bid_id))
            .filter(bids::Column::Status.eq(BidStatus::Pending))
            .exec(db)
            .await?
            .rows_affected;
    }

    if repaired > 0 {
        tracing::warn!("reconciled {repaired} bids left behind by interrupted hires");
    }

    Ok(repaired)
}
