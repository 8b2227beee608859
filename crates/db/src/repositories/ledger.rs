//! Ledger repository for database operations.
//!
//! Implements the core [`LedgerStore`] port on PostgreSQL. Chain queries walk
//! the `(customer_id, created_at, id)` index and skip pending creations.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
};

use ledgerbook_core::attachment::AttachmentRef;
use ledgerbook_core::ledger::{
    ChainCursor, LedgerEntry, LedgerError, LedgerRecord, LedgerStore, PendingCreation,
    ProposedEdit, TransactionKind,
};
use ledgerbook_core::workflow::ApprovalState;
use ledgerbook_shared::types::{CustomerId, EntryId, SupplierId, UserId};

use crate::entities::{customers, ledger_entries, suppliers};

/// Ledger repository implementation.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a customer.
    pub async fn create_customer(&self, name: &str) -> Result<CustomerId, LedgerError> {
        let id = CustomerId::new();
        customers::ActiveModel {
            id: Set(id.into_inner()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(id)
    }

    /// Registers a supplier.
    pub async fn create_supplier(&self, name: &str) -> Result<SupplierId, LedgerError> {
        let id = SupplierId::new();
        suppliers::ActiveModel {
            id: Set(id.into_inner()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(id)
    }

    fn chain_of(customer_id: CustomerId) -> Select<ledger_entries::Entity> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::CustomerId.eq(customer_id.into_inner()))
            .filter(
                ledger_entries::Column::ApprovalState
                    .ne(ApprovalState::PendingCreateApproval.as_str()),
            )
    }
}

impl LedgerStore for LedgerRepository {
    async fn get(&self, id: EntryId) -> Result<Option<LedgerRecord>, LedgerError> {
        let model = ledger_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        model.map(to_record).transpose()
    }

    async fn insert(&self, record: LedgerRecord) -> Result<(), LedgerError> {
        to_model(&record)?
            .into_active_model()
            .reset_all()
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update(&self, record: LedgerRecord) -> Result<(), LedgerError> {
        let id = record.id();
        let active = to_model(&record)?.into_active_model().reset_all();

        match ledger_entries::Entity::update(active).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(LedgerError::EntryNotFound(id)),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn update_balance(&self, id: EntryId, balance: Decimal) -> Result<(), LedgerError> {
        let result = ledger_entries::Entity::update_many()
            .col_expr(ledger_entries::Column::Balance, Expr::value(balance))
            .col_expr(
                ledger_entries::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(ledger_entries::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(LedgerError::EntryNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: EntryId) -> Result<Option<LedgerRecord>, LedgerError> {
        let Some(model) = ledger_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        ledger_entries::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        to_record(model).map(Some)
    }

    async fn find_later_entries(
        &self,
        customer_id: CustomerId,
        after: Option<ChainCursor>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut query = Self::chain_of(customer_id);
        if let Some(cursor) = after {
            let created_at = sea_orm::prelude::DateTimeWithTimeZone::from(cursor.created_at);
            query = query.filter(
                Condition::any()
                    .add(ledger_entries::Column::CreatedAt.gt(created_at))
                    .add(
                        Condition::all()
                            .add(ledger_entries::Column::CreatedAt.eq(created_at))
                            .add(ledger_entries::Column::Id.gt(cursor.entry_id.into_inner())),
                    ),
            );
        }

        let models = query
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .order_by_asc(ledger_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        models
            .into_iter()
            .map(|m| to_record(m).map(LedgerRecord::into_entry))
            .collect()
    }

    async fn find_prior_entry(
        &self,
        customer_id: CustomerId,
        before: ChainCursor,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let created_at = sea_orm::prelude::DateTimeWithTimeZone::from(before.created_at);
        let model = Self::chain_of(customer_id)
            .filter(
                Condition::any()
                    .add(ledger_entries::Column::CreatedAt.lt(created_at))
                    .add(
                        Condition::all()
                            .add(ledger_entries::Column::CreatedAt.eq(created_at))
                            .add(ledger_entries::Column::Id.lt(before.entry_id.into_inner())),
                    ),
            )
            .order_by_desc(ledger_entries::Column::CreatedAt)
            .order_by_desc(ledger_entries::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        model
            .map(|m| to_record(m).map(LedgerRecord::into_entry))
            .transpose()
    }

    async fn list_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<LedgerRecord>, LedgerError> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::CustomerId.eq(customer_id.into_inner()))
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .order_by_asc(ledger_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        models.into_iter().map(to_record).collect()
    }

    async fn list_pending(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<Vec<LedgerRecord>, LedgerError> {
        let mut query = ledger_entries::Entity::find().filter(
            ledger_entries::Column::ApprovalState.ne(ApprovalState::Approved.as_str()),
        );
        if let Some(customer_id) = customer_id {
            query = query.filter(ledger_entries::Column::CustomerId.eq(customer_id.into_inner()));
        }

        let models = query
            .order_by_asc(ledger_entries::Column::CreatedAt)
            .order_by_asc(ledger_entries::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        models.into_iter().map(to_record).collect()
    }

    async fn customer_exists(&self, customer_id: CustomerId) -> Result<bool, LedgerError> {
        let count = customers::Entity::find_by_id(customer_id.into_inner())
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn supplier_exists(&self, supplier_id: SupplierId) -> Result<bool, LedgerError> {
        let count = suppliers::Entity::find_by_id(supplier_id.into_inner())
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }
}

fn db_err(e: DbErr) -> LedgerError {
    LedgerError::store(e.to_string())
}

fn json_err(e: &serde_json::Error) -> LedgerError {
    LedgerError::store(format!("malformed ledger row: {e}"))
}

/// Convert a domain record to a database row.
fn to_model(record: &LedgerRecord) -> Result<ledger_entries::Model, LedgerError> {
    let entry = record.entry();
    let attachments = serde_json::to_value(&entry.attachments).map_err(|e| json_err(&e))?;
    let pending_edit = record
        .proposal()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| json_err(&e))?;

    Ok(ledger_entries::Model {
        id: entry.id.into_inner(),
        customer_id: entry.customer_id.into_inner(),
        supplier_id: entry.supplier_id.into_inner(),
        transaction_type: entry.kind.as_str().to_string(),
        amount: entry.amount,
        balance: entry.balance,
        notes: entry.notes.clone(),
        document: entry.document.clone(),
        attachments,
        transaction_date: entry.transaction_date,
        approval_state: record.approval_state().as_str().to_string(),
        pending_edit,
        created_by: entry.created_by.into_inner(),
        created_at: entry.created_at.into(),
        updated_at: Utc::now().into(),
    })
}

/// Convert a database row to a domain record.
fn to_record(model: ledger_entries::Model) -> Result<LedgerRecord, LedgerError> {
    let kind = TransactionKind::parse(&model.transaction_type).ok_or_else(|| {
        LedgerError::store(format!(
            "unknown transaction type '{}'",
            model.transaction_type
        ))
    })?;
    let state = ApprovalState::parse(&model.approval_state).ok_or_else(|| {
        LedgerError::store(format!("unknown approval state '{}'", model.approval_state))
    })?;
    let attachments: Vec<AttachmentRef> =
        serde_json::from_value(model.attachments).map_err(|e| json_err(&e))?;

    let entry = LedgerEntry {
        id: EntryId::from_uuid(model.id),
        customer_id: CustomerId::from_uuid(model.customer_id),
        supplier_id: SupplierId::from_uuid(model.supplier_id),
        kind,
        amount: model.amount,
        balance: model.balance,
        notes: model.notes,
        document: model.document,
        attachments,
        transaction_date: model.transaction_date,
        created_at: model.created_at.with_timezone(&Utc),
        created_by: UserId::from_uuid(model.created_by),
    };

    match state {
        ApprovalState::Approved => Ok(LedgerRecord::Approved(entry)),
        ApprovalState::PendingCreateApproval => {
            Ok(LedgerRecord::PendingCreate(PendingCreation::new(entry)))
        }
        ApprovalState::PendingEditApproval => {
            let value = model.pending_edit.ok_or_else(|| {
                LedgerError::store(format!("entry {} has no proposed edit", entry.id))
            })?;
            let proposal: ProposedEdit = serde_json::from_value(value).map_err(|e| json_err(&e))?;
            Ok(LedgerRecord::PendingEdit(entry, proposal))
        }
    }
}
