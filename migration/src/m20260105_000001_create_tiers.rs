use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Tiers {
    Table,
    Id,
    Name,
    Kind,
    MinSpend,
    MaxSpend,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TierBenefits {
    Table,
    Id,
    TierId,
    Name,
    Description,
    Position,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("tier_kind"))
                    .values(vec![Alias::new("threshold"), Alias::new("manual_only")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tiers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tiers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tiers::Name).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Tiers::Kind)
                            .custom(Alias::new("tier_kind"))
                            .not_null()
                            .default(Expr::cust("'threshold'::tier_kind")),
                    )
                    // NULL for manual_only tiers
                    .col(ColumnDef::new(Tiers::MinSpend).decimal_len(14, 2).null())
                    .col(ColumnDef::new(Tiers::MaxSpend).decimal_len(14, 2).null())
                    .col(
                        ColumnDef::new(Tiers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Tiers::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Tiers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TierBenefits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TierBenefits::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TierBenefits::TierId).uuid().not_null())
                    .col(ColumnDef::new(TierBenefits::Name).string_len(255).not_null())
                    .col(ColumnDef::new(TierBenefits::Description).text().null())
                    .col(
                        ColumnDef::new(TierBenefits::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tier_benefits_tier")
                            .from(TierBenefits::Table, TierBenefits::TierId)
                            .to(Tiers::Table, Tiers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tier_benefits_tier")
                    .table(TierBenefits::Table)
                    .col(TierBenefits::TierId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(TierBenefits::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Tiers::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("tier_kind")).to_owned())
            .await?;
        Ok(())
    }
}
