//! 配额计数表迁移
//!
//! 创建 quota_daily / quota_monthly 两张计数表：
//! - (user_id, 窗口键) 复合主键，懒创建时兜底去重
//! - used 单调递增，由条件 UPDATE 原子检查并递增

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 quota_daily 表
        manager
            .create_table(
                Table::create()
                    .table(QuotaDaily::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(QuotaDaily::UserId).big_integer().not_null())
                    .col(ColumnDef::new(QuotaDaily::Day).string_len(10).not_null())
                    .col(
                        ColumnDef::new(QuotaDaily::Used)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(QuotaDaily::UserId)
                            .col(QuotaDaily::Day),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 quota_monthly 表
        manager
            .create_table(
                Table::create()
                    .table(QuotaMonthly::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuotaMonthly::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(QuotaMonthly::Month).string_len(7).not_null())
                    .col(
                        ColumnDef::new(QuotaMonthly::Used)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(QuotaMonthly::UserId)
                            .col(QuotaMonthly::Month),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuotaMonthly::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(QuotaDaily::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QuotaDaily {
    #[sea_orm(iden = "quota_daily")]
    Table,
    UserId,
    Day,
    Used,
}

#[derive(DeriveIden)]
enum QuotaMonthly {
    #[sea_orm(iden = "quota_monthly")]
    Table,
    UserId,
    Month,
    Used,
}
