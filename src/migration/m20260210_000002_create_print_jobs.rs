//! Migration: Create print jobs table.
//!
//! Jobs carry their own queue-ordering metadata: queue_timestamp is the
//! primary sort key (rewritten by skips), created_at the tie-break.

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
                CREATE TABLE print_jobs (
                    id UUID PRIMARY KEY, -- UUIDv7 for time-ordered sorting
                    owner_id UUID NOT NULL,
                    printer_id UUID NOT NULL REFERENCES printers(id) ON DELETE RESTRICT,

                    -- Opaque reference to the stored document
                    file_ref VARCHAR(500) NOT NULL,

                    -- Jobs submitted together share a batch id
                    batch_id VARCHAR(100),

                    status VARCHAR(20) NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'printing', 'completed', 'collected', 'skipped', 'failed')),

                    is_paid BOOLEAN NOT NULL DEFAULT FALSE,
                    payment_method VARCHAR(20) NOT NULL DEFAULT 'none'
                        CHECK (payment_method IN ('online', 'counter', 'none')),
                    payment_status VARCHAR(20) NOT NULL DEFAULT 'pending'
                        CHECK (payment_status IN ('pending', 'pending_payment', 'paid', 'failed')),

                    confirmed_presence BOOLEAN NOT NULL DEFAULT FALSE,
                    confirmation_time TIMESTAMPTZ,

                    -- Print configuration; cost is derived at submission
                    sides VARCHAR(10) NOT NULL DEFAULT 'single'
                        CHECK (sides IN ('single', 'double')),
                    color VARCHAR(10) NOT NULL DEFAULT 'bw'
                        CHECK (color IN ('bw', 'color')),
                    page_count INTEGER NOT NULL DEFAULT 1,
                    cost DOUBLE PRECISION NOT NULL DEFAULT 0,

                    skip_count INTEGER NOT NULL DEFAULT 0,

                    -- Queue ordering key; nullable for legacy rows, healed on read
                    queue_timestamp TIMESTAMPTZ,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    completed_at TIMESTAMPTZ,
                    collected_at TIMESTAMPTZ
                );

                -- Queue reads: pending/printing jobs in ordering-key order
                CREATE INDEX idx_print_jobs_queue ON print_jobs(queue_timestamp, created_at)
                    WHERE status IN ('pending', 'printing');

                -- Batch operations (skip, pay, delete, chain)
                CREATE INDEX idx_print_jobs_batch_id ON print_jobs(batch_id)
                    WHERE batch_id IS NOT NULL;

                -- User listings
                CREATE INDEX idx_print_jobs_owner_id ON print_jobs(owner_id);

                -- Printer exclusivity check
                CREATE INDEX idx_print_jobs_printer_status ON print_jobs(printer_id, status);

                -- At most one printing job per printer, enforced by the
                -- database itself so concurrent claims cannot both win
                CREATE UNIQUE INDEX idx_print_jobs_one_printing_per_printer ON print_jobs(printer_id)
                    WHERE status = 'printing';
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS print_jobs CASCADE;")
            .await?;

        Ok(())
    }
}
