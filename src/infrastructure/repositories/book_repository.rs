//! SeaORM implementation of BookRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::{BookFilter, BookRepository, DomainError, PaginatedBooks};
use crate::models::Book;
use crate::models::book::{ActiveModel, Column, Entity as BookEntity};

/// SeaORM-based implementation of BookRepository
pub struct SeaOrmBookRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookRepository for SeaOrmBookRepository {
    async fn find_all(&self, filter: BookFilter) -> Result<PaginatedBooks, DomainError> {
        let mut query = BookEntity::find();

        // Apply filters
        if let Some(status) = &filter.status
            && !status.is_empty()
        {
            query = query.filter(Column::Status.eq(status));
        }

        if let Some(category) = &filter.category
            && !category.is_empty()
        {
            query = query.filter(Column::Category.eq(category));
        }

        if let Some(q) = &filter.query
            && !q.is_empty()
        {
            let cond = Condition::any()
                .add(Column::Title.contains(q))
                .add(Column::Author.contains(q))
                .add(Column::Isbn.contains(q));
            query = query.filter(cond);
        }

        // Apply sorting
        match filter.sort.as_deref() {
            Some("title_desc") => query = query.order_by_desc(Column::Title),
            Some("recent") => query = query.order_by_desc(Column::CreatedAt),
            _ => query = query.order_by_asc(Column::Title),
        }

        // Fetch with pagination and total count
        let (books, total) = if let Some(limit) = filter.limit {
            let page = filter.page.unwrap_or(0);
            let paginator = query.paginate(&self.db, limit);
            let total = paginator.num_items().await.unwrap_or(0);
            let items = paginator.fetch_page(page).await?;
            (items, total)
        } else {
            let items = query.all(&self.db).await?;
            let total = items.len() as u64;
            (items, total)
        };

        Ok(PaginatedBooks {
            books: books.into_iter().map(Book::from).collect(),
            total,
        })
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Book>, DomainError> {
        let book_model = BookEntity::find_by_id(id).one(&self.db).await?;
        Ok(book_model.map(Book::from))
    }

    async fn create(&self, book: Book) -> Result<Book, DomainError> {
        if book.title.trim().is_empty() {
            return Err(DomainError::Validation("Title is required".to_string()));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut active: ActiveModel = book.into();
        active.id = sea_orm::NotSet;
        active.created_at = Set(now.clone());
        active.updated_at = Set(now);

        let model = active.insert(&self.db).await?;
        Ok(Book::from(model))
    }

    async fn update(&self, id: i32, book: Book) -> Result<Book, DomainError> {
        let existing = BookEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.title = Set(book.title);
        active.author = Set(book.author);
        active.isbn = Set(book.isbn);
        active.category = Set(book.category);
        active.publisher = Set(book.publisher);
        active.publication_year = Set(book.publication_year);
        active.cover_url = Set(book.cover_url);
        active.color = Set(book.color);
        if let Some(status) = book.status {
            active.status = Set(status);
        }
        active.summary = Set(book.summary);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active.update(&self.db).await?;
        Ok(Book::from(model))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let res = BookEntity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}
