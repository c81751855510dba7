use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub copy_id: i32,
    pub member_id: i32,
    /// `YYYY-MM-DD`
    pub checkout_date: String,
    /// `YYYY-MM-DD`
    pub due_date: String,
    pub return_date: Option<String>,
    /// Stored values: `borrowed`, `returned`.
    /// `overdue` is derived at read time from the due date, never stored.
    pub status: String,
    pub rating: Option<i32>,
    pub review: Option<String>,
    pub notes: Option<String>,
    /// Groups loans created in a single borrow action; printed on receipts.
    pub transaction_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book_copy::Entity",
        from = "Column::CopyId",
        to = "super::book_copy::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Copy,
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Member,
}

impl Related<super::book_copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Copy.def()
    }
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
