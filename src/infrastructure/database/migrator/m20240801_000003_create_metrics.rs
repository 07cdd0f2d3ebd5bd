//! Create metrics table migration

use sea_orm_migration::prelude::*;

use super::m20240801_000002_create_projects::Projects;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Metrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Metrics::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Metrics::ProjectId).string().not_null())
                    .col(ColumnDef::new(Metrics::Operation).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Metrics::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Metrics::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Metrics::Duration).double().not_null())
                    .col(
                        ColumnDef::new(Metrics::Tags)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Metrics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_metrics_project_id")
                            .from(Metrics::Table, Metrics::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_metrics_project_start")
                    .table(Metrics::Table)
                    .col(Metrics::ProjectId)
                    .col(Metrics::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_metrics_operation")
                    .table(Metrics::Table)
                    .col(Metrics::Operation)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Metrics::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Metrics {
    Table,
    Id,
    ProjectId,
    Operation,
    StartTime,
    EndTime,
    Duration,
    Tags,
    CreatedAt,
}
