//! Ledger schema migration.
//!
//! Creates customers, suppliers and the ledger_entries table holding every
//! entry with its running balance and approval state.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(LEDGER_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS ledger_entries CASCADE;
             DROP TABLE IF EXISTS suppliers CASCADE;
             DROP TABLE IF EXISTS customers CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const LEDGER_SQL: &str = r"
CREATE TABLE customers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE suppliers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    customer_id UUID NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
    supplier_id UUID NOT NULL REFERENCES suppliers(id),
    transaction_type VARCHAR(16) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL,
    notes TEXT,
    document VARCHAR(255),
    attachments JSONB NOT NULL DEFAULT '[]'::jsonb,
    transaction_date DATE NOT NULL,
    approval_state VARCHAR(32) NOT NULL DEFAULT 'approved',
    pending_edit JSONB,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_transaction_type CHECK (transaction_type IN ('invoice', 'payment', 'return')),
    CONSTRAINT chk_approval_state CHECK (
        approval_state IN ('approved', 'pending_create_approval', 'pending_edit_approval')
    ),
    CONSTRAINT chk_pending_edit CHECK (
        (approval_state = 'pending_edit_approval') = (pending_edit IS NOT NULL)
    )
);

-- Balance chain walks (prior entry, later entries)
CREATE INDEX idx_ledger_entries_chain ON ledger_entries(customer_id, created_at, id)
    WHERE approval_state <> 'pending_create_approval';

-- Approval queue
CREATE INDEX idx_ledger_entries_pending ON ledger_entries(customer_id, created_at)
    WHERE approval_state <> 'approved';
";
