use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "book_copies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub book_id: i32,
    /// A copy may be unshelved (NULL) while in processing or repair.
    pub shelf_id: Option<i32>,
    pub barcode: String,
    pub location_code: Option<String>,
    /// Circulation status of this physical copy.
    /// Valid values:
    /// - `available`: On shelf, can be checked out
    /// - `checked_out`: Currently on loan (has exactly one open Loan)
    /// - `processing`: Being catalogued or repaired
    /// - `lost`: Reported lost
    /// - `damaged`: Returned damaged, out of circulation
    /// - `on_hold`: Reserved at the front desk
    pub status: String,
    /// Physical condition: `new`, `good`, `fair`, `poor`.
    pub condition: String,
    pub copy_number: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::shelf::Entity",
        from = "Column::ShelfId",
        to = "super::shelf::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Shelf,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::shelf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shelf.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
