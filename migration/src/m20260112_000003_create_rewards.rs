use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    RedeemedPoints,
}

#[derive(DeriveIden)]
enum Rewards {
    Table,
    Id,
    Name,
    Description,
    PointsCost,
    StockRemaining,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CustomerRewards {
    Table,
    Id,
    CustomerId,
    RewardId,
    RewardName,
    PointsSpent,
    RedeemedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Customers::Table)
                    .add_column_if_not_exists(
                        ColumnDef::new(Customers::RedeemedPoints)
                            .decimal_len(14, 2)
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rewards::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rewards::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Rewards::Description).text().null())
                    .col(
                        ColumnDef::new(Rewards::PointsCost)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Rewards::StockRemaining).big_integer().null())
                    .col(
                        ColumnDef::new(Rewards::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Rewards::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Rewards::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Redemptions outlive the reward they were made for; the name is kept
        // on the row.
        manager
            .create_table(
                Table::create()
                    .table(CustomerRewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerRewards::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CustomerRewards::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CustomerRewards::RewardId).big_integer().null())
                    .col(
                        ColumnDef::new(CustomerRewards::RewardName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerRewards::PointsSpent)
                            .decimal_len(14, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerRewards::RedeemedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_rewards_customer")
                            .from(CustomerRewards::Table, CustomerRewards::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_rewards_reward")
                            .from(CustomerRewards::Table, CustomerRewards::RewardId)
                            .to(Rewards::Table, Rewards::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_customer_rewards_customer")
                    .table(CustomerRewards::Table)
                    .col(CustomerRewards::CustomerId)
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
                    .table(CustomerRewards::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Rewards::Table).to_owned())
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Customers::Table)
                    .drop_column(Customers::RedeemedPoints)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
