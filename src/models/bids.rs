use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::models::gigs::GigSummary;
use crate::models::users::UserPublic;

pub const MESSAGE_MIN: usize = 10;
pub const MESSAGE_MAX: usize = 2000;

/// Bid lifecycle stored as a lowercase string in the database.
///
/// A bid leaves `Pending` exactly once: to `Hired` or `Rejected` through the
/// hiring transaction, or by deletion when the freelancer withdraws it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum BidStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "hired")]
    Hired,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// SeaORM entity for the `bids` table.
///
/// A unique index on (gig_id, freelancer_id) backs the one-bid-per-gig rule.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bids")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub gig_id: Uuid,
    pub freelancer_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    #[sea_orm(column_type = "Double")]
    pub bid_price: f64,
    pub status: BidStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gigs::Entity",
        from = "Column::GigId",
        to = "super::gigs::Column::Id"
    )]
    Gig,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FreelancerId",
        to = "super::users::Column::Id"
    )]
    Freelancer,
}

impl Related<super::gigs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gig.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Freelancer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitBid {
    pub gig_id: Uuid,
    pub message: String,
    pub bid_price: f64,
}

impl SubmitBid {
    /// Field bounds, checked before any write.
    pub fn validate(&self) -> Result<(), MarketError> {
        let len = self.message.chars().count();
        if !(MESSAGE_MIN..=MESSAGE_MAX).contains(&len) {
            return Err(MarketError::InvalidInput(format!(
                "Message must be between {MESSAGE_MIN} and {MESSAGE_MAX} characters"
            )));
        }
        if !self.bid_price.is_finite() || self.bid_price <= 0.0 {
            return Err(MarketError::InvalidInput(
                "Bid price must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bid view with the freelancer's identity and, where the endpoint calls for
/// it, the gig the bid was placed on.
#[derive(Debug, Clone, Serialize)]
pub struct BidResponse {
    pub id: Uuid,
    pub gig_id: Uuid,
    pub freelancer_id: Uuid,
    pub message: String,
    pub bid_price: f64,
    pub status: BidStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
    pub freelancer: Option<UserPublic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gig: Option<GigSummary>,
}

impl BidResponse {
    pub fn new(m: Model, freelancer: Option<UserPublic>) -> Self {
        Self {
            id: m.id,
            gig_id: m.gig_id,
            freelancer_id: m.freelancer_id,
            message: m.message,
            bid_price: m.bid_price,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
            freelancer,
            gig: None,
        }
    }

    pub fn with_gig(mut self, gig: Option<GigSummary>) -> Self {
        self.gig = gig;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_submit() -> SubmitBid {
        SubmitBid {
            gig_id: Uuid::new_v4(),
            message: "Interested, experienced".to_string(),
            bid_price: 450.0,
        }
    }

    #[test]
    fn valid_bid_passes() {
        assert!(valid_submit().validate().is_ok());
    }

    #[test]
    fn short_message_rejected() {
        let mut input = valid_submit();
        input.message = "hi there".to_string();
        assert!(matches!(
            input.validate(),
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn overlong_message_rejected() {
        let mut input = valid_submit();
        input.message = "x".repeat(MESSAGE_MAX + 1);
        assert!(matches!(
            input.validate(),
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_positive_price_rejected() {
        for price in [0.0, -1.0] {
            let mut input = valid_submit();
            input.bid_price = price;
            assert!(matches!(
                input.validate(),
                Err(MarketError::InvalidInput(_))
            ));
        }
    }
}
