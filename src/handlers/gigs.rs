use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::cache::{CacheConfig, RedisCache, keys};
use crate::db::bids as bid_db;
use crate::db::gigs as gig_db;
use crate::db::users as user_db;
use crate::error::MarketError;
use crate::models::bids::BidResponse;
use crate::models::gigs::{CreateGig, GigResponse, GigSearchQuery, GigStatus, UpdateGig};
use crate::models::users::UserPublic;

/// Read through the cache, treating a cache failure as a miss.
async fn cache_lookup<T: serde::de::DeserializeOwned>(cache: &RedisCache, key: &str) -> Option<T> {
    match cache.get::<T>(key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Cache error: {e}");
            None
        }
    }
}

/// GET /api/gigs — list open gigs, optional `?search=` on title/description.
/// Public.
pub async fn list_open_gigs(
    db: web::Data<DatabaseConnection>,
    cache: web::Data<Arc<RedisCache>>,
    config: web::Data<CacheConfig>,
    query: web::Query<GigSearchQuery>,
) -> Result<HttpResponse, MarketError> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let cache_key = keys::gig_list(search.unwrap_or("all"));

    if let Some(cached) = cache_lookup::<serde_json::Value>(cache.get_ref(), &cache_key).await {
        return Ok(HttpResponse::Ok().json(cached));
    }

    let gigs = gig_db::get_open_gigs(db.get_ref(), search).await?;

    let owner_ids: Vec<Uuid> = gigs.iter().map(|g| g.owner_id).collect();
    let owners = user_db::get_users_by_ids(db.get_ref(), owner_ids).await?;

    let response: Vec<GigResponse> = gigs
        .into_iter()
        .map(|g| {
            let owner = owners.get(&g.owner_id).cloned().map(UserPublic::from);
            GigResponse::new(g, owner)
        })
        .collect();

    let _ = cache
        .set(&cache_key, &response, Some(config.gig_list_ttl.as_secs()))
        .await;

    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/gigs/{gig_id} — gig detail, with the hired bid when assigned.
/// Public.
pub async fn get_gig(
    db: web::Data<DatabaseConnection>,
    cache: web::Data<Arc<RedisCache>>,
    config: web::Data<CacheConfig>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, MarketError> {
    let gig_id = path.into_inner();
    let cache_key = keys::gig(&gig_id.to_string());

    if let Some(cached) = cache_lookup::<serde_json::Value>(cache.get_ref(), &cache_key).await {
        return Ok(HttpResponse::Ok().json(cached));
    }

    let gig = gig_db::get_gig_by_id(db.get_ref(), gig_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Gig {gig_id} not found")))?;

    let owner = user_db::get_user_by_id(db.get_ref(), gig.owner_id)
        .await?
        .map(UserPublic::from);

    let selected_bid = match gig.selected_bid_id {
        Some(bid_id) => match bid_db::get_bid_by_id(db.get_ref(), bid_id).await? {
            Some(bid) => {
                let freelancer = user_db::get_user_by_id(db.get_ref(), bid.freelancer_id)
                    .await?
                    .map(UserPublic::from);
                Some(BidResponse::new(bid, freelancer))
            }
            None => None,
        },
        None => None,
    };

    let response = GigResponse::new(gig, owner).with_selected_bid(selected_bid);

    let _ = cache
        .set(&cache_key, &response, Some(config.gig_ttl.as_secs()))
        .await;

    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/gigs — create a gig (requires authentication).
pub async fn create_gig(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<Arc<RedisCache>>,
    body: web::Json<CreateGig>,
) -> Result<HttpResponse, MarketError> {
    let input = body.into_inner();
    input.validate()?;

    let gig = gig_db::insert_gig(db.get_ref(), input, user.0.id).await?;
    tracing::info!("gig {} created by {}", gig.id, gig.owner_id);

    let _ = cache.delete_pattern("gigs:list:*").await;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Gig created successfully",
        "gig": GigResponse::new(gig, Some(UserPublic::from(user.0))),
    })))
}

/// PATCH /api/gigs/{gig_id} — update title/description/budget while the gig
/// is still open (owner only).
pub async fn update_gig(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<Arc<RedisCache>>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateGig>,
) -> Result<HttpResponse, MarketError> {
    let gig_id = path.into_inner();
    let input = body.into_inner();
    input.validate()?;

    let gig = gig_db::get_gig_by_id(db.get_ref(), gig_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Gig {gig_id} not found")))?;

    if gig.owner_id != user.0.id {
        return Err(MarketError::Forbidden(
            "You can only edit your own gigs".to_string(),
        ));
    }
    if gig.status != GigStatus::Open {
        return Err(MarketError::Conflict(
            "Cannot edit a gig that has been assigned".to_string(),
        ));
    }

    // The write itself is conditional on `open` again: a hire landing after
    // the check above makes this a no-op Conflict, not a lost update.
    let updated = gig_db::update_gig_if_open(db.get_ref(), gig_id, input)
        .await?
        .ok_or_else(|| {
            MarketError::Conflict("Cannot edit a gig that has been assigned".to_string())
        })?;

    cache.invalidate_gig(gig_id).await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Gig updated successfully",
        "gig": GigResponse::new(updated, Some(UserPublic::from(user.0))),
    })))
}

/// DELETE /api/gigs/{gig_id} — delete an open gig and all bids on it
/// (owner only).
pub async fn delete_gig(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    cache: web::Data<Arc<RedisCache>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, MarketError> {
    let gig_id = path.into_inner();

    let gig = gig_db::get_gig_by_id(db.get_ref(), gig_id)
        .await?
        .ok_or_else(|| MarketError::NotFound(format!("Gig {gig_id} not found")))?;

    if gig.owner_id != user.0.id {
        return Err(MarketError::Forbidden(
            "You can only delete your own gigs".to_string(),
        ));
    }
    if gig.status != GigStatus::Open {
        return Err(MarketError::Conflict(
            "Cannot delete a gig that has been assigned".to_string(),
        ));
    }

    let bids_deleted = gig_db::delete_gig_cascade(db.get_ref(), gig_id)
        .await?
        .ok_or_else(|| {
            MarketError::Conflict("Cannot delete a gig that has been assigned".to_string())
        })?;

    cache.invalidate_gig(gig_id).await;
    tracing::info!("gig {gig_id} deleted with {bids_deleted} bids");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Gig and its bids deleted successfully",
        "bids_deleted": bids_deleted,
    })))
}

/// GET /api/gigs/user/my-gigs — the caller's gigs, with the hired bid
/// populated on assigned ones.
pub async fn my_gigs(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, MarketError> {
    let gigs = gig_db::get_gigs_by_owner(db.get_ref(), user.0.id).await?;

    let selected_ids: Vec<Uuid> = gigs.iter().filter_map(|g| g.selected_bid_id).collect();
    let selected = bid_db::get_bids_by_ids(db.get_ref(), selected_ids).await?;

    let freelancer_ids: Vec<Uuid> = selected.values().map(|b| b.freelancer_id).collect();
    let freelancers = user_db::get_users_by_ids(db.get_ref(), freelancer_ids).await?;

    let owner = UserPublic::from(user.0);
    let response: Vec<GigResponse> = gigs
        .into_iter()
        .map(|g| {
            let selected_bid = g.selected_bid_id.and_then(|id| selected.get(&id)).map(|b| {
                let freelancer = freelancers
                    .get(&b.freelancer_id)
                    .cloned()
                    .map(UserPublic::from);
                BidResponse::new(b.clone(), freelancer)
            });
            GigResponse::new(g, Some(owner.clone())).with_selected_bid(selected_bid)
        })
        .collect();

    Ok(HttpResponse::Ok().json(response))
}
