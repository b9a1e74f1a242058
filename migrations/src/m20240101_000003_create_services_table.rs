use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;
use super::m20240101_000002_create_vehicles_table::Vehicles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Services::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Services::VehicleId).integer().not_null())
                    .col(ColumnDef::new(Services::ClientId).integer().not_null())
                    .col(ColumnDef::new(Services::EmployeeId).integer())
                    .col(ColumnDef::new(Services::Description).text().not_null())
                    .col(
                        ColumnDef::new(Services::Priority)
                            .string_len(32)
                            .not_null()
                            .default("normal"),
                    )
                    .col(
                        ColumnDef::new(Services::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Services::PreferredDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Services::ScheduledDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Services::Diagnosis).text())
                    .col(ColumnDef::new(Services::ServicePlan).text())
                    .col(ColumnDef::new(Services::EstimatedCost).double())
                    .col(ColumnDef::new(Services::ActualCost).double())
                    .col(ColumnDef::new(Services::PartsNeeded).text())
                    .col(ColumnDef::new(Services::Notes).text())
                    .col(ColumnDef::new(Services::AdditionalNotes).text())
                    .col(
                        ColumnDef::new(Services::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Services::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Services::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_services_vehicle")
                            .from(Services::Table, Services::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_services_client")
                            .from(Services::Table, Services::ClientId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_services_employee")
                            .from(Services::Table, Services::EmployeeId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_services_status")
                    .table(Services::Table)
                    .col(Services::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_services_client_id")
                    .table(Services::Table)
                    .col(Services::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_services_employee_id")
                    .table(Services::Table)
                    .col(Services::EmployeeId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Services::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Services {
    Table,
    Id,
    VehicleId,
    ClientId,
    EmployeeId,
    Description,
    Priority,
    Status,
    PreferredDate,
    ScheduledDate,
    Diagnosis,
    ServicePlan,
    EstimatedCost,
    ActualCost,
    PartsNeeded,
    Notes,
    AdditionalNotes,
    Version,
    CreatedAt,
    UpdatedAt,
}
