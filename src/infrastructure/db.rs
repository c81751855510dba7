use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

use crate::auth::hash_password;

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // SQLite ships with foreign keys off
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = ON".to_owned(),
    ))
    .await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Create books table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            isbn TEXT UNIQUE,
            category TEXT,
            publisher TEXT,
            publication_year INTEGER,
            cover_url TEXT,
            color TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            summary TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create shelves table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS shelves (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            location TEXT,
            section TEXT,
            capacity INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create book_copies table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS book_copies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            shelf_id INTEGER,
            barcode TEXT NOT NULL UNIQUE,
            location_code TEXT,
            status TEXT NOT NULL DEFAULT 'available',
            condition TEXT NOT NULL DEFAULT 'good',
            copy_number INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE,
            FOREIGN KEY (shelf_id) REFERENCES shelves(id) ON DELETE SET NULL
        );
        CREATE INDEX IF NOT EXISTS idx_book_copies_book_id ON book_copies(book_id);
        CREATE INDEX IF NOT EXISTS idx_book_copies_status ON book_copies(status);
        CREATE INDEX IF NOT EXISTS idx_book_copies_barcode ON book_copies(barcode);
        "#
        .to_owned(),
    ))
    .await?;

    // Create members table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE,
            phone TEXT,
            membership_type TEXT NOT NULL DEFAULT 'standard',
            status TEXT NOT NULL DEFAULT 'active',
            pin TEXT,
            qr_code TEXT UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_members_email ON members(email);
        CREATE INDEX IF NOT EXISTS idx_members_qr_code ON members(qr_code);
        "#
        .to_owned(),
    ))
    .await?;

    // Create loans table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            copy_id INTEGER NOT NULL,
            member_id INTEGER NOT NULL,
            checkout_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            return_date TEXT,
            status TEXT NOT NULL DEFAULT 'borrowed',
            rating INTEGER,
            review TEXT,
            notes TEXT,
            transaction_id TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (copy_id) REFERENCES book_copies(id) ON DELETE CASCADE,
            FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_loans_copy_id ON loans(copy_id);
        CREATE INDEX IF NOT EXISTS idx_loans_member_id ON loans(member_id);
        CREATE INDEX IF NOT EXISTS idx_loans_status ON loans(status);
        CREATE INDEX IF NOT EXISTS idx_loans_transaction_id ON loans(transaction_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Create users table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'staff',
            status TEXT NOT NULL DEFAULT 'active',
            pin TEXT,
            qr_auth_key TEXT UNIQUE,
            member_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE SET NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Migration 002: rating/review captured at return time
    // SQLite doesn't support IF NOT EXISTS in ALTER TABLE, so we ignore errors
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "ALTER TABLE loans ADD COLUMN rating INTEGER".to_owned(),
        ))
        .await;
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "ALTER TABLE loans ADD COLUMN review TEXT".to_owned(),
        ))
        .await;

    // Migration 003: batch receipts group loans under a transaction id
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "ALTER TABLE loans ADD COLUMN transaction_id TEXT".to_owned(),
        ))
        .await;

    // Migration 004: quick-lookup codes on membership cards
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "ALTER TABLE members ADD COLUMN qr_code TEXT".to_owned(),
        ))
        .await;

    // Seed the default operator account on first run only.
    // The UI forces a password change on first login.
    let admin_hash = hash_password("admin").map_err(DbErr::Custom)?;
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        r#"
        INSERT OR IGNORE INTO users (id, username, password_hash, role, status, created_at, updated_at)
        SELECT 1, 'admin', ?, 'admin', 'active', datetime('now'), datetime('now')
        WHERE NOT EXISTS (SELECT 1 FROM users WHERE username = 'admin')
        "#,
        [admin_hash.into()],
    ))
    .await?;

    Ok(())
}
