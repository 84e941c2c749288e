use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Bids {
    Table,
    GigId,
    FreelancerId,
}

/// One bid per (gig, freelancer) pair. The handlers check for duplicates
/// before inserting, but only this index makes the invariant hold under
/// concurrent submissions.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_bids_gig_freelancer_unique")
                    .table(Bids::Table)
                    .col(Bids::GigId)
                    .col(Bids::FreelancerId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_bids_gig_freelancer_unique")
                    .table(Bids::Table)
                    .to_owned(),
            )
            .await
    }
}
