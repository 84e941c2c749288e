use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::models::bids::BidResponse;
use crate::models::users::UserPublic;

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 20;
pub const DESCRIPTION_MAX: usize = 5000;

/// Gig lifecycle stored as a lowercase string in the database.
///
/// `Assigned` is terminal; the only way in is the hiring transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum GigStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "assigned")]
    Assigned,
}

/// SeaORM entity for the `gigs` table.
///
/// `selected_bid_id` is set if and only if `status` is `Assigned`, and
/// `bid_count` mirrors the number of live bids on the gig. Both fields are
/// written exclusively by the gig/bid data-access layer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gigs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Double")]
    pub budget: f64,
    pub owner_id: Uuid,
    pub status: GigStatus,
    pub selected_bid_id: Option<Uuid>,
    pub bid_count: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bids::Entity")]
    Bids,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Owner,
}

impl Related<super::bids::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bids.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGig {
    pub title: String,
    pub description: String,
    pub budget: f64,
}

impl CreateGig {
    /// Field bounds, checked before any write.
    pub fn validate(&self) -> Result<(), MarketError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        validate_budget(self.budget)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateGig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
}

impl UpdateGig {
    /// Same bounds as creation, applied only to the fields present.
    pub fn validate(&self) -> Result<(), MarketError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(budget) = self.budget {
            validate_budget(budget)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), MarketError> {
    let len = title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
        return Err(MarketError::InvalidInput(format!(
            "Title must be between {TITLE_MIN} and {TITLE_MAX} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), MarketError> {
    let len = description.chars().count();
    if !(DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&len) {
        return Err(MarketError::InvalidInput(format!(
            "Description must be between {DESCRIPTION_MIN} and {DESCRIPTION_MAX} characters"
        )));
    }
    Ok(())
}

fn validate_budget(budget: f64) -> Result<(), MarketError> {
    if !budget.is_finite() || budget <= 0.0 {
        return Err(MarketError::InvalidInput(
            "Budget must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct GigSearchQuery {
    pub search: Option<String>,
}

/// The compact gig view attached to bid responses.
#[derive(Debug, Clone, Serialize)]
pub struct GigSummary {
    pub id: Uuid,
    pub title: String,
    pub budget: f64,
    pub status: GigStatus,
}

impl From<&Model> for GigSummary {
    fn from(m: &Model) -> Self {
        Self {
            id: m.id,
            title: m.title.clone(),
            budget: m.budget,
            status: m.status.clone(),
        }
    }
}

/// Full gig view with the owner's identity attached; the detail endpoint of
/// an assigned gig also carries the hired bid.
#[derive(Debug, Clone, Serialize)]
pub struct GigResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub owner_id: Uuid,
    pub status: GigStatus,
    pub selected_bid_id: Option<Uuid>,
    pub bid_count: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
    pub owner: Option<UserPublic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_bid: Option<BidResponse>,
}

impl GigResponse {
    pub fn new(m: Model, owner: Option<UserPublic>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            budget: m.budget,
            owner_id: m.owner_id,
            status: m.status,
            selected_bid_id: m.selected_bid_id,
            bid_count: m.bid_count,
            created_at: m.created_at,
            updated_at: m.updated_at,
            owner,
            selected_bid: None,
        }
    }

    pub fn with_selected_bid(mut self, bid: Option<BidResponse>) -> Self {
        self.selected_bid = bid;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> CreateGig {
        CreateGig {
            title: "Logo design".to_string(),
            description: "Design a logo for a small coffee roastery".to_string(),
            budget: 500.0,
        }
    }

    #[test]
    fn valid_gig_passes() {
        assert!(valid_create().validate().is_ok());
    }

    #[test]
    fn short_title_rejected() {
        let mut input = valid_create();
        input.title = "Logo".to_string();
        assert!(matches!(
            input.validate(),
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn short_description_rejected() {
        let mut input = valid_create();
        input.description = "too short".to_string();
        assert!(matches!(
            input.validate(),
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_positive_budget_rejected() {
        for budget in [0.0, -10.0, f64::NAN] {
            let mut input = valid_create();
            input.budget = budget;
            assert!(matches!(
                input.validate(),
                Err(MarketError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn partial_update_checks_only_present_fields() {
        let input = UpdateGig {
            title: None,
            description: None,
            budget: Some(750.0),
        };
        assert!(input.validate().is_ok());

        let input = UpdateGig {
            title: Some("hi".to_string()),
            description: None,
            budget: None,
        };
        assert!(matches!(
            input.validate(),
            Err(MarketError::InvalidInput(_))
        ));
    }
}
