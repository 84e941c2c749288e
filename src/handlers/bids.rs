use actix_web::{HttpResponse, web};
use sea_orm::{DatabaseConnection, SqlErr};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::cache::RedisCache;
use crate::db::bids as bid_db;
use crate::db::bids::HireTransition;
use crate::db::gigs as gig_db;
use crate::db::users as user_db;
use crate::error::MarketError;
use crate::models::bids::{self, BidResponse, BidStatus, SubmitBid};
use crate::models::gigs::{self, GigStatus, GigSummary};
use crate::models::users::UserPublic;

/// Hire preconditions, checked in a fixed order: ownership, then gig
/// status, then bid status. The first failure wins; existence of the bid
/// and gig is checked by the caller before this runs.
fn check_hire_preconditions(
    bid: &bids::Model,
    gig: &gigs::Model,
    client_id: Uuid,
) -> Result<(), MarketError> {
    if gig.owner_id != client_id {
        return Err(MarketError::Forbidden(
            "You can only hire for your own gigs".to_string(),
        ));
    }
    if gig.status != GigStatus::Open {
        return Err(MarketError::Conflict(
            "This gig is no longer open".to_string(),
        ));
    }
    if bid.status != BidStatus::Pending {
        return Err(MarketError::Conflict(
            "This bid has already been processed".to_string(),
        ));
    }
    Ok(())
}

/// Submission preconditions against the target gig: no self-bids, gig must
/// still be open.
fn check_submit_preconditions(gig: &gigs::Model, freelancer_id: Uuid) -> Result<(), MarketError> {
    if gig.owner_id == freelancer_id {
        return Err(MarketError::Forbidden(
            "You cannot bid on your own gig".to_string(),
        ));
    }
    if gig.status != GigStatus::Open {
        return Err(MarketError::Conflict(
            "This gig is no longer open for bids".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/bids — submit a bid on an open gig (requires authentication).
pub async fn submit_bid(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<Arc<RedisCache>>,
    body: web::Json<SubmitBid>,
) -> Result<HttpResponse, MarketError> {
    let input = body.into_inner();
    let freelancer_id = user.0.id;
    input.validate()?;

    let gig = gig_db::get_gig_by_id(db.get_ref(), input.gig_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Gig {} not found", input.gig_id)))?;

    check_submit_preconditions(&gig, freelancer_id)?;

    if bid_db::bid_exists_for_gig_and_freelancer(db.get_ref(), gig.id, freelancer_id).await? {
        return Err(MarketError::Conflict(
            "You have already submitted a bid for this gig".to_string(),
        ));
    }

    let bid = match bid_db::insert_bid(db.get_ref(), input, freelancer_id).await {
        Ok(bid) => bid,
        // Two submissions racing past the duplicate check above: the unique
        // index decides, the loser gets the same answer as the check.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(MarketError::Conflict(
                "You have already submitted a bid for this gig".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    cache.invalidate_gig(gig.id).await;
    tracing::info!("bid {} submitted on gig {}", bid.id, gig.id);

    let response =
        BidResponse::new(bid, Some(UserPublic::from(user.0))).with_gig(Some(GigSummary::from(&gig)));

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Bid submitted successfully",
        "bid": response,
    })))
}

/// GET /api/bids/{gig_id} — all bids on a gig (gig owner only).
pub async fn bids_for_gig(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, MarketError> {
    let gig_id = path.into_inner();

    let gig = gig_db::get_gig_by_id(db.get_ref(), gig_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Gig {gig_id} not found")))?;

    if gig.owner_id != user.0.id {
        return Err(MarketError::Forbidden(
            "You can only view bids for your own gigs".to_string(),
        ));
    }

    let bids = bid_db::get_bids_by_gig(db.get_ref(), gig_id).await?;

    let freelancer_ids: Vec<Uuid> = bids.iter().map(|b| b.freelancer_id).collect();
    let freelancers = user_db::get_users_by_ids(db.get_ref(), freelancer_ids).await?;

    let bid_responses: Vec<BidResponse> = bids
        .into_iter()
        .map(|b| {
            let freelancer = freelancers
                .get(&b.freelancer_id)
                .cloned()
                .map(UserPublic::from);
            BidResponse::new(b, freelancer)
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "gig": GigSummary::from(&gig),
        "bid_count": bid_responses.len(),
        "bids": bid_responses,
    })))
}

/// GET /api/bids/user/my-bids — the caller's bids with gig context.
pub async fn my_bids(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, MarketError> {
    let bids = bid_db::get_bids_by_freelancer(db.get_ref(), user.0.id).await?;

    let gig_ids: Vec<Uuid> = bids.iter().map(|b| b.gig_id).collect();
    let gigs = gig_db::get_gigs_by_ids(db.get_ref(), gig_ids).await?;

    let me = UserPublic::from(user.0);
    let response: Vec<BidResponse> = bids
        .into_iter()
        .map(|b| {
            let gig = gigs.get(&b.gig_id).map(GigSummary::from);
            BidResponse::new(b, Some(me.clone())).with_gig(gig)
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "bids": response })))
}

/// PATCH /api/bids/{bid_id}/hire — hire the freelancer behind this bid
/// (gig owner only).
///
/// Closes bidding on the gig: the chosen bid becomes hired, every other
/// pending bid becomes rejected, the gig becomes assigned. First caller to
/// pass the preconditions wins; every later attempt gets a Conflict.
pub async fn hire(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<Arc<RedisCache>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, MarketError> {
    let bid_id = path.into_inner();
    let client_id = user.0.id;

    let bid = bid_db::get_bid_by_id(db.get_ref(), bid_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Bid {bid_id} not found")))?;

    let gig = gig_db::get_gig_by_id(db.get_ref(), bid.gig_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Gig {} not found", bid.gig_id)))?;

    check_hire_preconditions(&bid, &gig, client_id)?;

    let rejected = match bid_db::execute_hire(db.get_ref(), gig.id, bid_id).await? {
        HireTransition::Completed { rejected } => rejected,
        HireTransition::GigNotOpen => {
            return Err(MarketError::Conflict(
                "This gig is no longer open".to_string(),
            ));
        }
        HireTransition::BidNotPending => {
            return Err(MarketError::Conflict(
                "This bid has already been processed".to_string(),
            ));
        }
    };

    cache.invalidate_gig(gig.id).await;

    // Re-read the committed state for the response payload.
    let hired = bid_db::get_bid_by_id(db.get_ref(), bid_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Bid {bid_id} not found")))?;
    let gig = gig_db::get_gig_by_id(db.get_ref(), gig.id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Gig {} not found", gig.id)))?;
    let freelancer = user_db::get_user_by_id(db.get_ref(), hired.freelancer_id)
        .await?
        .map(UserPublic::from);

    let response = BidResponse::new(hired, freelancer).with_gig(Some(GigSummary::from(&gig)));

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Freelancer hired successfully! All other bids have been rejected.",
        "bid": response,
        "rejected_count": rejected,
    })))
}

/// DELETE /api/bids/{bid_id} — withdraw a pending bid (bid owner only).
pub async fn withdraw_bid(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<Arc<RedisCache>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, MarketError> {
    let bid_id = path.into_inner();

    let bid = bid_db::get_bid_by_id(db.get_ref(), bid_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Bid {bid_id} not found")))?;

    if bid.freelancer_id != user.0.id {
        return Err(MarketError::Forbidden(
            "You can only withdraw your own bids".to_string(),
        ));
    }
    if bid.status != BidStatus::Pending {
        return Err(MarketError::Conflict(
            "You can only withdraw pending bids".to_string(),
        ));
    }

    // Conditional delete: if the hiring transaction got there first, no row
    // matches and the counter is untouched.
    if !bid_db::withdraw_bid(db.get_ref(), bid_id, bid.gig_id).await? {
        return Err(MarketError::Conflict(
            "You can only withdraw pending bids".to_string(),
        ));
    }

    cache.invalidate_gig(bid.gig_id).await;
    tracing::info!("bid {bid_id} withdrawn from gig {}", bid.gig_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Bid withdrawn successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn gig(owner_id: Uuid, status: GigStatus) -> gigs::Model {
        gigs::Model {
            id: Uuid::new_v4(),
            title: "Logo design".to_string(),
            description: "Design a logo for a small coffee roastery".to_string(),
            budget: 500.0,
            owner_id,
            status,
            selected_bid_id: None,
            bid_count: 1,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn bid(gig_id: Uuid, freelancer_id: Uuid, status: BidStatus) -> bids::Model {
        bids::Model {
            id: Uuid::new_v4(),
            gig_id,
            freelancer_id,
            message: "Interested, experienced".to_string(),
            bid_price: 450.0,
            status,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn hire_happy_path_passes() {
        let owner = Uuid::new_v4();
        let g = gig(owner, GigStatus::Open);
        let b = bid(g.id, Uuid::new_v4(), BidStatus::Pending);
        assert!(check_hire_preconditions(&b, &g, owner).is_ok());
    }

    #[test]
    fn hire_by_non_owner_is_forbidden() {
        let g = gig(Uuid::new_v4(), GigStatus::Open);
        let b = bid(g.id, Uuid::new_v4(), BidStatus::Pending);
        assert!(matches!(
            check_hire_preconditions(&b, &g, Uuid::new_v4()),
            Err(MarketError::Forbidden(_))
        ));
    }

    #[test]
    fn ownership_is_checked_before_status() {
        // Non-owner on an assigned gig with a processed bid: Forbidden wins.
        let g = gig(Uuid::new_v4(), GigStatus::Assigned);
        let b = bid(g.id, Uuid::new_v4(), BidStatus::Rejected);
        assert!(matches!(
            check_hire_preconditions(&b, &g, Uuid::new_v4()),
            Err(MarketError::Forbidden(_))
        ));
    }

    #[test]
    fn assigned_gig_conflicts_before_bid_status() {
        // Owner, assigned gig, processed bid: the gig-status message wins.
        let owner = Uuid::new_v4();
        let g = gig(owner, GigStatus::Assigned);
        let b = bid(g.id, Uuid::new_v4(), BidStatus::Rejected);
        match check_hire_preconditions(&b, &g, owner) {
            Err(MarketError::Conflict(msg)) => assert_eq!(msg, "This gig is no longer open"),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn processed_bid_on_open_gig_conflicts() {
        let owner = Uuid::new_v4();
        let g = gig(owner, GigStatus::Open);
        let b = bid(g.id, Uuid::new_v4(), BidStatus::Hired);
        match check_hire_preconditions(&b, &g, owner) {
            Err(MarketError::Conflict(msg)) => {
                assert_eq!(msg, "This bid has already been processed")
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn self_bid_is_forbidden() {
        let owner = Uuid::new_v4();
        let g = gig(owner, GigStatus::Open);
        assert!(matches!(
            check_submit_preconditions(&g, owner),
            Err(MarketError::Forbidden(_))
        ));
    }

    #[test]
    fn bid_on_assigned_gig_conflicts() {
        let g = gig(Uuid::new_v4(), GigStatus::Assigned);
        assert!(matches!(
            check_submit_preconditions(&g, Uuid::new_v4()),
            Err(MarketError::Conflict(_))
        ));
    }

    #[test]
    fn bid_on_open_gig_by_other_user_passes() {
        let g = gig(Uuid::new_v4(), GigStatus::Open);
        assert!(check_submit_preconditions(&g, Uuid::new_v4()).is_ok());
    }
}
