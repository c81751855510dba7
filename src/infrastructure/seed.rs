use sea_orm::*;

use crate::models::{book, book_copy, member, shelf};

/// Seed a small demo library: two shelves, three books with copies, two members.
/// Safe to run against an existing database; unique columns conflict silently.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    // 1. Shelves
    let shelves = vec![
        ("Fiction A", "Ground floor", "A"),
        ("Science", "First floor", "S"),
    ];

    let mut shelf_ids = Vec::new();
    for (name, location, section) in shelves {
        let shelf = shelf::ActiveModel {
            name: Set(name.to_owned()),
            location: Set(Some(location.to_owned())),
            section: Set(Some(section.to_owned())),
            capacity: Set(Some(120)),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        let res = shelf::Entity::insert(shelf).exec(db).await?;
        shelf_ids.push(res.last_insert_id);
    }

    // 2. Books
    let books = vec![
        ("The Hobbit", "J.R.R. Tolkien", "9780261103344", "Fantasy"),
        ("Foundation", "Isaac Asimov", "9780553293357", "Science Fiction"),
        ("Dune", "Frank Herbert", "9780441013593", "Science Fiction"),
    ];

    for (i, (title, author, isbn, category)) in books.into_iter().enumerate() {
        let new_book = book::ActiveModel {
            title: Set(title.to_owned()),
            author: Set(author.to_owned()),
            isbn: Set(Some(isbn.to_owned())),
            category: Set(Some(category.to_owned())),
            status: Set("active".to_owned()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };

        let res = book::Entity::insert(new_book)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(book::Column::Isbn)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await;

        let book_id = match res {
            Ok(r) => r.last_insert_id,
            Err(_) => continue, // already seeded
        };

        // Two copies per book, first one shelved
        for copy_number in 1..=2 {
            let shelf_id = if copy_number == 1 {
                shelf_ids.get(i % shelf_ids.len()).copied()
            } else {
                None
            };
            let copy = book_copy::ActiveModel {
                book_id: Set(book_id),
                shelf_id: Set(shelf_id),
                barcode: Set(format!("LIB-{:05}-{:03}", book_id, copy_number)),
                location_code: Set(shelf_id.map(|s| format!("S{}-{:03}", s, copy_number))),
                status: Set("available".to_owned()),
                condition: Set("good".to_owned()),
                copy_number: Set(copy_number),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            };
            let _ = book_copy::Entity::insert(copy)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::column(book_copy::Column::Barcode)
                        .do_nothing()
                        .to_owned(),
                )
                .exec(db)
                .await;
        }
    }

    // 3. Members
    let members = vec![
        ("Alice Martin", "alice@example.org"),
        ("Bruno Keller", "bruno@example.org"),
    ];

    for (name, email) in members {
        let new_member = member::ActiveModel {
            name: Set(name.to_owned()),
            email: Set(Some(email.to_owned())),
            membership_type: Set("standard".to_owned()),
            status: Set("active".to_owned()),
            qr_code: Set(Some(uuid::Uuid::new_v4().to_string())),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        let _ = member::Entity::insert(new_member)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(member::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await;
    }

    Ok(())
}
