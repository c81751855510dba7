use sea_orm::entity::prelude::*;
use sea_orm::{NotSet, Set};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub cover_url: Option<String>,
    /// Spine color used by the UI shelf view.
    pub color: Option<String>,
    #[sea_orm(default_value = "active")]
    pub status: String,
    pub summary: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::book_copy::Entity")]
    Copies,
}

impl Related<super::book_copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Copies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API requests/responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<i32>,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub category: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
}

impl From<Model> for Book {
    fn from(model: Model) -> Self {
        Self {
            id: Some(model.id),
            title: model.title,
            author: model.author,
            isbn: model.isbn,
            category: model.category,
            publisher: model.publisher,
            publication_year: model.publication_year,
            cover_url: model.cover_url,
            color: model.color,
            status: Some(model.status),
            summary: model.summary,
        }
    }
}

impl From<Book> for ActiveModel {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.map_or(NotSet, Set),
            title: Set(book.title),
            author: Set(book.author),
            isbn: Set(book.isbn),
            category: Set(book.category),
            publisher: Set(book.publisher),
            publication_year: Set(book.publication_year),
            cover_url: Set(book.cover_url),
            color: Set(book.color),
            status: book.status.map_or(NotSet, Set),
            summary: Set(book.summary),
            created_at: NotSet,
            updated_at: NotSet,
        }
    }
}
