use librarium::db;
use librarium::services::ServiceError;
use librarium::services::loan_service::{
    self, BatchReturnItem, BorrowRequest, ReturnOptions,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    // In-memory SQLite for testing
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

// Helper to create a test book
async fn create_test_book(db: &DatabaseConnection, title: &str, author: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let book = librarium::models::book::ActiveModel {
        title: Set(title.to_string()),
        author: Set(author.to_string()),
        status: Set("active".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    book.insert(db).await.expect("Failed to create book").id
}

// Helper to create a test copy
async fn create_test_copy(
    db: &DatabaseConnection,
    book_id: i32,
    copy_number: i32,
    status: &str,
) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let copy = librarium::models::book_copy::ActiveModel {
        book_id: Set(book_id),
        barcode: Set(format!("LIB-{:05}-{:03}", book_id, copy_number)),
        status: Set(status.to_string()),
        condition: Set("good".to_string()),
        copy_number: Set(copy_number),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    copy.insert(db).await.expect("Failed to create copy").id
}

// Helper to create a test member
async fn create_test_member(db: &DatabaseConnection, name: &str, status: &str) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let member = librarium::models::member::ActiveModel {
        name: Set(name.to_string()),
        email: Set(Some(format!(
            "{}@example.org",
            name.to_lowercase().replace(' ', ".")
        ))),
        membership_type: Set("standard".to_string()),
        status: Set(status.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    member.insert(db).await.expect("Failed to create member").id
}

async fn copy_status(db: &DatabaseConnection, copy_id: i32) -> String {
    librarium::models::book_copy::Entity::find_by_id(copy_id)
        .one(db)
        .await
        .expect("query failed")
        .expect("copy missing")
        .status
}

async fn open_loans_for_copy(db: &DatabaseConnection, copy_id: i32) -> u64 {
    librarium::models::loan::Entity::find()
        .filter(librarium::models::loan::Column::CopyId.eq(copy_id))
        .filter(librarium::models::loan::Column::ReturnDate.is_null())
        .count(db)
        .await
        .expect("count failed")
}

#[tokio::test]
async fn test_borrow_two_copies_shares_transaction_id() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let copy_a = create_test_copy(&db, book_id, 1, "available").await;
    let copy_b = create_test_copy(&db, book_id, 2, "available").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    let outcome = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_a, copy_b],
            checkout_date: Some("2024-01-01".to_string()),
            due_date: None,
        },
    )
    .await
    .expect("borrow failed");

    assert_eq!(outcome.borrowed, 2);
    assert_eq!(outcome.failed, 0);
    // Default loan period is 14 days
    assert_eq!(outcome.due_date, "2024-01-15");

    // Both copies checked out, both loans share the transaction id
    assert_eq!(copy_status(&db, copy_a).await, "checked_out");
    assert_eq!(copy_status(&db, copy_b).await, "checked_out");

    let loans = librarium::models::loan::Entity::find()
        .all(&db)
        .await
        .expect("query failed");
    assert_eq!(loans.len(), 2);
    for loan in &loans {
        assert_eq!(loan.status, "borrowed");
        assert_eq!(loan.transaction_id.as_deref(), Some(outcome.transaction_id.as_str()));
        assert_eq!(loan.checkout_date, "2024-01-01");
        assert_eq!(loan.due_date, "2024-01-15");
    }
}

#[tokio::test]
async fn test_checked_out_copy_has_exactly_one_open_loan() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Foundation", "Isaac Asimov").await;
    let copy_id = create_test_copy(&db, book_id, 1, "available").await;
    let member_id = create_test_member(&db, "Bruno Keller", "active").await;

    let outcome = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_id],
            checkout_date: None,
            due_date: None,
        },
    )
    .await
    .expect("borrow failed");
    assert_eq!(outcome.borrowed, 1);

    assert_eq!(copy_status(&db, copy_id).await, "checked_out");
    assert_eq!(open_loans_for_copy(&db, copy_id).await, 1);

    // A second borrow of the same copy must not open another loan
    let second = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_id],
            checkout_date: None,
            due_date: None,
        },
    )
    .await
    .expect("borrow call failed");
    assert_eq!(second.borrowed, 0);
    assert_eq!(second.failed, 1);
    assert_eq!(open_loans_for_copy(&db, copy_id).await, 1);

    // After return the loan is closed
    let loan_id = outcome.items[0].loan_id.expect("loan id");
    loan_service::return_loan(&db, loan_id, ReturnOptions::default())
        .await
        .expect("return failed");
    assert_eq!(copy_status(&db, copy_id).await, "available");
    assert_eq!(open_loans_for_copy(&db, copy_id).await, 0);
}

#[tokio::test]
async fn test_borrow_lost_copy_fails_without_loan_row() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "The Hobbit", "J.R.R. Tolkien").await;
    let copy_id = create_test_copy(&db, book_id, 1, "lost").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    let outcome = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_id],
            checkout_date: None,
            due_date: None,
        },
    )
    .await
    .expect("borrow call failed");

    assert_eq!(outcome.borrowed, 0);
    assert_eq!(outcome.failed, 1);
    assert!(!outcome.items[0].success);
    assert!(outcome.items[0].message.contains("lost"));

    // Copy untouched, no loan row created
    assert_eq!(copy_status(&db, copy_id).await, "lost");
    let loan_count = librarium::models::loan::Entity::find()
        .count(&db)
        .await
        .expect("count failed");
    assert_eq!(loan_count, 0);
}

#[tokio::test]
async fn test_partial_failure_keeps_earlier_successes() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let good_copy = create_test_copy(&db, book_id, 1, "available").await;
    let bad_copy = create_test_copy(&db, book_id, 2, "damaged").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    let outcome = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![good_copy, bad_copy],
            checkout_date: None,
            due_date: None,
        },
    )
    .await
    .expect("borrow call failed");

    // Per-item results; the failed copy does not roll back the first
    assert_eq!(outcome.borrowed, 1);
    assert_eq!(outcome.failed, 1);
    assert_eq!(copy_status(&db, good_copy).await, "checked_out");
    assert_eq!(copy_status(&db, bad_copy).await, "damaged");
}

#[tokio::test]
async fn test_inactive_member_cannot_borrow() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let copy_id = create_test_copy(&db, book_id, 1, "available").await;
    let member_id = create_test_member(&db, "Former Member", "inactive").await;

    let result = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_id],
            checkout_date: None,
            due_date: None,
        },
    )
    .await;

    assert!(matches!(result, Err(ServiceError::Validation(_))));
    assert_eq!(copy_status(&db, copy_id).await, "available");
}

#[tokio::test]
async fn test_borrow_requires_copy_selection() {
    let db = setup_test_db().await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    let result = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![],
            checkout_date: None,
            due_date: None,
        },
    )
    .await;

    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_return_condition_drives_copy_status() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    for (condition, expected_status) in [
        ("good", "available"),
        ("damaged", "damaged"),
        ("lost", "lost"),
    ] {
        let copy_id =
            create_test_copy(&db, book_id, 10 + expected_status.len() as i32, "available").await;
        let outcome = loan_service::borrow_copies(
            &db,
            BorrowRequest {
                member_id,
                copy_ids: vec![copy_id],
                checkout_date: None,
                due_date: None,
            },
        )
        .await
        .expect("borrow failed");
        let loan_id = outcome.items[0].loan_id.expect("loan id");

        let returned = loan_service::return_loan(
            &db,
            loan_id,
            ReturnOptions {
                condition: Some(condition.to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("return failed");

        assert!(returned.returned);
        assert_eq!(copy_status(&db, copy_id).await, expected_status);

        let loan = librarium::models::loan::Entity::find_by_id(loan_id)
            .one(&db)
            .await
            .expect("query failed")
            .expect("loan missing");
        assert_eq!(loan.status, "returned");
        assert!(loan.return_date.is_some());
    }
}

#[tokio::test]
async fn test_invalid_condition_rejected_before_any_write() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let copy_id = create_test_copy(&db, book_id, 1, "available").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    let outcome = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_id],
            checkout_date: None,
            due_date: None,
        },
    )
    .await
    .expect("borrow failed");
    let loan_id = outcome.items[0].loan_id.expect("loan id");

    let result = loan_service::return_loan(
        &db,
        loan_id,
        ReturnOptions {
            condition: Some("pristine".to_string()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));

    // Nothing was written
    assert_eq!(copy_status(&db, copy_id).await, "checked_out");
    let loan = librarium::models::loan::Entity::find_by_id(loan_id)
        .one(&db)
        .await
        .expect("query failed")
        .expect("loan missing");
    assert_eq!(loan.status, "borrowed");
}

#[tokio::test]
async fn test_double_return_is_reported_noop() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let copy_id = create_test_copy(&db, book_id, 1, "available").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    let outcome = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_id],
            checkout_date: None,
            due_date: None,
        },
    )
    .await
    .expect("borrow failed");
    let loan_id = outcome.items[0].loan_id.expect("loan id");

    // First return with damaged takes the copy out of circulation
    let first = loan_service::return_loan(
        &db,
        loan_id,
        ReturnOptions {
            condition: Some("damaged".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("return failed");
    assert!(first.returned);
    assert_eq!(copy_status(&db, copy_id).await, "damaged");

    // Second return is a no-op and must not flip the copy back
    let second = loan_service::return_loan(&db, loan_id, ReturnOptions::default())
        .await
        .expect("second return failed");
    assert!(!second.returned);
    assert!(second.message.contains("already returned"));
    assert_eq!(copy_status(&db, copy_id).await, "damaged");
}

#[tokio::test]
async fn test_return_unknown_loan_is_not_found() {
    let db = setup_test_db().await;
    let result = loan_service::return_loan(&db, 999, ReturnOptions::default()).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_return_batch_reports_per_item_results() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let copy_a = create_test_copy(&db, book_id, 1, "available").await;
    let copy_b = create_test_copy(&db, book_id, 2, "available").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    let outcome = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_a, copy_b],
            checkout_date: None,
            due_date: None,
        },
    )
    .await
    .expect("borrow failed");
    let loan_a = outcome.items[0].loan_id.expect("loan id");
    let loan_b = outcome.items[1].loan_id.expect("loan id");

    // Return the first twice (second is a skip) plus one unknown id
    loan_service::return_loan(&db, loan_a, ReturnOptions::default())
        .await
        .expect("return failed");

    let batch = loan_service::return_batch(
        &db,
        vec![
            BatchReturnItem {
                loan_id: loan_a,
                condition: None,
                note: None,
            },
            BatchReturnItem {
                loan_id: loan_b,
                condition: Some("good".to_string()),
                note: Some("returned at front desk".to_string()),
            },
            BatchReturnItem {
                loan_id: 9999,
                condition: None,
                note: None,
            },
        ],
    )
    .await
    .expect("batch failed");

    assert_eq!(batch.returned, 1);
    assert_eq!(batch.skipped, 2);
    assert_eq!(copy_status(&db, copy_b).await, "available");
}

#[tokio::test]
async fn test_clear_all_loans_resets_checked_out_copies() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    let mut copy_ids = Vec::new();
    for n in 1..=5 {
        copy_ids.push(create_test_copy(&db, book_id, n, "available").await);
    }
    let lost_copy = create_test_copy(&db, book_id, 6, "lost").await;

    let outcome = loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: copy_ids.clone(),
            checkout_date: None,
            due_date: None,
        },
    )
    .await
    .expect("borrow failed");
    assert_eq!(outcome.borrowed, 5);

    let cleared = loan_service::clear_all_loans(&db).await.expect("clear failed");
    assert_eq!(cleared.loans_deleted, 5);
    assert_eq!(cleared.copies_reset, 5);

    let remaining = librarium::models::loan::Entity::find()
        .count(&db)
        .await
        .expect("count failed");
    assert_eq!(remaining, 0);

    for copy_id in copy_ids {
        assert_eq!(copy_status(&db, copy_id).await, "available");
    }
    // Lost copies are untouched by the reset
    assert_eq!(copy_status(&db, lost_copy).await, "lost");
}

#[tokio::test]
async fn test_list_loans_derives_overdue_status() {
    let db = setup_test_db().await;
    let book_id = create_test_book(&db, "Dune", "Frank Herbert").await;
    let copy_id = create_test_copy(&db, book_id, 1, "available").await;
    let member_id = create_test_member(&db, "Alice Martin", "active").await;

    loan_service::borrow_copies(
        &db,
        BorrowRequest {
            member_id,
            copy_ids: vec![copy_id],
            checkout_date: Some("2024-01-01".to_string()),
            due_date: Some("2024-01-15".to_string()),
        },
    )
    .await
    .expect("borrow failed");

    let loans = loan_service::list_loans(&db, Default::default())
        .await
        .expect("list failed");
    assert_eq!(loans.len(), 1);
    // Stored status stays `borrowed`; the display status is derived
    assert_eq!(loans[0].status, "borrowed");
    assert_eq!(loans[0].display_status, "overdue");
    assert_eq!(loans[0].member_name, "Alice Martin");
    assert_eq!(loans[0].book_title, "Dune");

    let overdue = loan_service::list_loans(
        &db,
        librarium::services::loan_service::LoanFilter {
            status: Some("overdue".to_string()),
            member_id: None,
        },
    )
    .await
    .expect("list failed");
    assert_eq!(overdue.len(), 1);
}
