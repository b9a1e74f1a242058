use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;
use super::m20240101_000003_create_services_table::Services;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ServiceHistory::ServiceId).integer().not_null())
                    .col(ColumnDef::new(ServiceHistory::UserId).integer().not_null())
                    .col(ColumnDef::new(ServiceHistory::Description).text().not_null())
                    .col(
                        ColumnDef::new(ServiceHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_history_service")
                            .from(ServiceHistory::Table, ServiceHistory::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_history_user")
                            .from(ServiceHistory::Table, ServiceHistory::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_history_service_id")
                    .table(ServiceHistory::Table)
                    .col(ServiceHistory::ServiceId)
                    .col(ServiceHistory::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServiceHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceHistory {
    Table,
    Id,
    ServiceId,
    UserId,
    Description,
    CreatedAt,
}
