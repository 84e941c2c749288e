use sea_orm::prelude::Expr;
use sea_orm::sea_query::ExprTrait;
use sea_orm::*;
use uuid::Uuid;

use crate::models::bids;
use crate::models::gigs::{self, CreateGig, GigStatus, UpdateGig};

/// Insert a new gig. Always starts open with zero bids.
pub async fn insert_gig(
    db: &DatabaseConnection,
    input: CreateGig,
    owner_id: Uuid,
) -> Result<gigs::Model, DbErr> {
    let new_gig = gigs::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(input.title),
        description: Set(input.description),
        budget: Set(input.budget),
        owner_id: Set(owner_id),
        status: Set(GigStatus::Open),
        selected_bid_id: Set(None),
        bid_count: Set(0),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_gig.insert(db).await
}

/// Fetch all open gigs, newest first, optionally filtered by a search term
/// matched against title or description.
pub async fn get_open_gigs(
    db: &DatabaseConnection,
    search: Option<&str>,
) -> Result<Vec<gigs::Model>, DbErr> {
    let mut query = gigs::Entity::find().filter(gigs::Column::Status.eq(GigStatus::Open));

    if let Some(term) = search {
        let term = term.trim();
        if !term.is_empty() {
            query = query.filter(
                Condition::any()
                    .add(gigs::Column::Title.contains(term))
                    .add(gigs::Column::Description.contains(term)),
            );
        }
    }

    query
        .order_by_desc(gigs::Column::CreatedAt)
        .order_by_desc(gigs::Column::Id)
        .all(db)
        .await
}

/// Fetch a single gig by ID.
pub async fn get_gig_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<gigs::Model>, DbErr> {
    gigs::Entity::find_by_id(id).one(db).await
}

/// Fetch all gigs posted by one owner, newest first.
pub async fn get_gigs_by_owner(
    db: &DatabaseConnection,
    owner_id: Uuid,
) -> Result<Vec<gigs::Model>, DbErr> {
    gigs::Entity::find()
        .filter(gigs::Column::OwnerId.eq(owner_id))
        .order_by_desc(gigs::Column::CreatedAt)
        .order_by_desc(gigs::Column::Id)
        .all(db)
        .await
}

/// Fetch many gigs in one query and return an id -> gig map.
pub async fn get_gigs_by_ids(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
) -> Result<std::collections::HashMap<Uuid, gigs::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(std::collections::HashMap::new());
    }

    let rows = gigs::Entity::find()
        .filter(gigs::Column::Id.is_in(ids))
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|g| (g.id, g)).collect())
}

/// Update a gig's mutable fields, conditional on it still being open.
///
/// Returns `None` when zero rows matched: the gig is gone or was assigned
/// after the caller's precondition check. Nothing is written in that case.
pub async fn update_gig_if_open(
    db: &DatabaseConnection,
    id: Uuid,
    input: UpdateGig,
) -> Result<Option<gigs::Model>, DbErr> {
    let mut update = gigs::Entity::update_many()
        .col_expr(
            gigs::Column::UpdatedAt,
            Expr::value(Some(chrono::Utc::now())),
        )
        .filter(gigs::Column::Id.eq(id))
        .filter(gigs::Column::Status.eq(GigStatus::Open));

    if let Some(title) = input.title {
        update = update.col_expr(gigs::Column::Title, Expr::value(title));
    }
    if let Some(description) = input.description {
        update = update.col_expr(gigs::Column::Description, Expr::value(description));
    }
    if let Some(budget) = input.budget {
        update = update.col_expr(gigs::Column::Budget, Expr::value(budget));
    }

    if update.exec(db).await?.rows_affected == 0 {
        return Ok(None);
    }

    gigs::Entity::find_by_id(id).one(db).await
}

/// Delete a gig and every bid on it, conditional on the gig still being open.
///
/// Runs in one transaction: either the gig and all its bids are gone, or
/// nothing is. Returns the number of bids removed, or `None` when the gig
/// was missing or already assigned (rolled back, no orphans).
pub async fn delete_gig_cascade(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<u64>, DbErr> {
    let txn = db.begin().await?;

    let bids_removed = bids::Entity::delete_many()
        .filter(bids::Column::GigId.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;

    let gig_removed = gigs::Entity::delete_many()
        .filter(gigs::Column::Id.eq(id))
        .filter(gigs::Column::Status.eq(GigStatus::Open))
        .exec(&txn)
        .await?
        .rows_affected;

    if gig_removed == 0 {
        txn.rollback().await?;
        return Ok(None);
    }

    txn.commit().await?;
    Ok(Some(bids_removed))
}

/// Atomically add `delta` to a gig's bid counter.
///
/// A single SQL column expression, never read-modify-write; callers pair it
/// with the bid insert/delete inside one transaction.
pub(crate) async fn bump_bid_count<C>(conn: &C, gig_id: Uuid, delta: i64) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let result = gigs::Entity::update_many()
        .col_expr(
            gigs::Column::BidCount,
            Expr::col(gigs::Column::BidCount).add(delta),
        )
        .filter(gigs::Column::Id.eq(gig_id))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}
