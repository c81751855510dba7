use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[sea_orm(default_value = "standard")]
    pub membership_type: String,
    /// `active` or `inactive`. Only active members may borrow.
    #[sea_orm(default_value = "active")]
    pub status: String,
    pub pin: Option<String>,
    /// Quick-lookup identifier printed on the membership card.
    pub qr_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan::Entity")]
    Loans,
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API requests/responses. The pin is write-only and never serialized back.
#[derive(Debug, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: Option<i32>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub membership_type: Option<String>,
    pub status: Option<String>,
    #[serde(skip_serializing)]
    pub pin: Option<String>,
    #[serde(skip_deserializing)]
    pub qr_code: Option<String>,
}

impl From<Model> for MemberDto {
    fn from(model: Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name,
            email: model.email,
            phone: model.phone,
            membership_type: Some(model.membership_type),
            status: Some(model.status),
            pin: None,
            qr_code: model.qr_code,
        }
    }
}
