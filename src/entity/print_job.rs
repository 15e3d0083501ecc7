//! Print job entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "print_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owning user; immutable after creation.
    pub owner_id: Uuid,
    /// Target printer; mutable while pending.
    pub printer_id: Uuid,
    /// Opaque reference to the stored document.
    pub file_ref: String,
    /// Groups jobs submitted together; NULL for individual uploads.
    pub batch_id: Option<String>,
    /// pending, printing, completed, collected, skipped, failed
    pub status: String,
    pub is_paid: bool,
    /// online, counter, none
    pub payment_method: String,
    /// pending, pending_payment, paid, failed
    pub payment_status: String,
    pub confirmed_presence: bool,
    pub confirmation_time: Option<DateTimeUtc>,
    /// single, double
    pub sides: String,
    /// bw, color
    pub color: String,
    pub page_count: i32,
    /// Derived at submission, immutable afterwards.
    #[sea_orm(column_type = "Double")]
    pub cost: f64,
    pub skip_count: i32,
    /// Queue ordering key; defaults to created_at, rewritten by skip.
    /// NULL only for legacy rows, healed before ordering.
    pub queue_timestamp: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub collected_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::printer::Entity",
        from = "Column::PrinterId",
        to = "super::printer::Column::Id",
        on_delete = "Restrict"
    )]
    Printer,
}

impl Related<super::printer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Printer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
