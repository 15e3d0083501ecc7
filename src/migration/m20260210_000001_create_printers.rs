//! Migration: Create printers table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE printers (
                    id UUID PRIMARY KEY, -- UUIDv7 for time-ordered sorting
                    name VARCHAR(200) NOT NULL,
                    location VARCHAR(200) NOT NULL,

                    status VARCHAR(20) NOT NULL DEFAULT 'online'
                        CHECK (status IN ('online', 'offline', 'busy')),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS printers CASCADE;")
            .await?;

        Ok(())
    }
}
