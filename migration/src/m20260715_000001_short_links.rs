use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 short_links 表
        manager
            .create_table(
                Table::create()
                    .table(ShortLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShortLinks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShortLinks::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(ShortLinks::ShortCode)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShortLinks::TargetUrl).text().not_null())
                    .col(ColumnDef::new(ShortLinks::Label).string_len(255).null())
                    .col(
                        ColumnDef::new(ShortLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShortLinks::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ShortLinks::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(ShortLinks::QrAssetPath).string_len(255).null())
                    .to_owned(),
            )
            .await?;

        // 短码唯一索引（按码查询热路径 + 唯一性兜底）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_links_code")
                    .table(ShortLinks::Table)
                    .col(ShortLinks::ShortCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 用户维度列表查询索引（按创建时间倒序分页）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_links_user_created")
                    .table(ShortLinks::Table)
                    .col(ShortLinks::UserId)
                    .col(ShortLinks::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 过期时间索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_short_links_expires_at")
                    .table(ShortLinks::Table)
                    .col(ShortLinks::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        // 已签发短码登记表（只追加；链接删除后记录保留，短码永不复用）
        manager
            .create_table(
                Table::create()
                    .table(IssuedCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IssuedCodes::Code)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IssuedCodes::LinkId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IssuedCodes::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IssuedCodes::Table).to_owned())
            .await?;

        // 删除索引
        manager
            .drop_index(Index::drop().name("idx_short_links_expires_at").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_short_links_user_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(Index::drop().name("idx_short_links_code").to_owned())
            .await?;

        // 删除表
        manager
            .drop_table(Table::drop().table(ShortLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShortLinks {
    #[sea_orm(iden = "short_links")]
    Table,
    Id,
    UserId,
    ShortCode,
    TargetUrl,
    Label,
    CreatedAt,
    ExpiresAt,
    IsActive,
    QrAssetPath,
}

#[derive(DeriveIden)]
enum IssuedCodes {
    #[sea_orm(iden = "issued_codes")]
    Table,
    Code,
    LinkId,
    IssuedAt,
}
