use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Gigs {
    Table,
    OwnerId,
    Status,
}

#[derive(DeriveIden)]
enum Bids {
    Table,
    GigId,
    FreelancerId,
    Status,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Index on gigs.owner_id for fetching gigs by owner
        manager
            .create_index(
                Index::create()
                    .name("idx_gigs_owner_id")
                    .table(Gigs::Table)
                    .col(Gigs::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Index on gigs.status for the open-gig listing
        manager
            .create_index(
                Index::create()
                    .name("idx_gigs_status")
                    .table(Gigs::Table)
                    .col(Gigs::Status)
                    .to_owned(),
            )
            .await?;

        // Index on bids.gig_id for fetching bids by gig
        manager
            .create_index(
                Index::create()
                    .name("idx_bids_gig_id")
                    .table(Bids::Table)
                    .col(Bids::GigId)
                    .to_owned(),
            )
            .await?;

        // Index on bids.freelancer_id for fetching a freelancer's bids
        manager
            .create_index(
                Index::create()
                    .name("idx_bids_freelancer_id")
                    .table(Bids::Table)
                    .col(Bids::FreelancerId)
                    .to_owned(),
            )
            .await?;

        // Index on bids.status for the bulk-reject step of hiring
        manager
            .create_index(
                Index::create()
                    .name("idx_bids_status")
                    .table(Bids::Table)
                    .col(Bids::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_gigs_owner_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_gigs_status").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_bids_gig_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_bids_freelancer_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_bids_status").to_owned())
            .await?;

        Ok(())
    }
}
