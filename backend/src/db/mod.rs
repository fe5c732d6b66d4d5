use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::{AppError, AppResult};
use crate::models::*;

// ── Connection & schema ───────────────────────────────────────────────────────

/// Open a pool against `database_url`, creating the database file if needed.
/// In-memory URLs get a single connection that is never recycled, so every
/// query sees the same database.
pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?
    };

    Ok(pool)
}

/// A private in-memory database.
pub async fn connect_in_memory() -> AppResult<SqlitePool> {
    connect("sqlite::memory:", 1).await
}

/// Whether `database_url` names an in-memory SQLite database, in any of the
/// spellings sqlx accepts (`:memory:`, `sqlite::memory:`, `sqlite://:memory:`,
/// with or without query parameters, or `mode=memory`).
fn is_in_memory(database_url: &str) -> bool {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let (path, params) = rest.split_once('?').unwrap_or((rest, ""));

    path == ":memory:" || params.split('&').any(|param| param == "mode=memory")
}

pub async fn create_schema(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT NOT NULL,
            price TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Counterpart of `create_schema` in the storage lifecycle; the server never
/// drops its own table, test fixtures do.
#[allow(dead_code)]
pub async fn drop_schema(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query("DROP TABLE IF EXISTS products")
        .execute(pool)
        .await?;
    Ok(())
}

// ── Products ──────────────────────────────────────────────────────────────────

pub async fn fetch_all_products(pool: &SqlitePool) -> AppResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, name, price FROM products ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(products)
}

pub async fn fetch_product_by_id(pool: &SqlitePool, id: i64) -> AppResult<Product> {
    sqlx::query_as::<_, Product>("SELECT id, name, price FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Insert a validated product and return its assigned id.
pub async fn insert_product(pool: &SqlitePool, product: &NewProduct) -> AppResult<i64> {
    let result = sqlx::query("INSERT INTO products (name, price) VALUES (?1, ?2)")
        .bind(&product.name)
        .bind(product.price.to_string())
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Apply the supplied fields; absent ones keep their stored value.
pub async fn update_product(pool: &SqlitePool, id: i64, changes: &UpdateProduct) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET name  = COALESCE(?1, name),
            price = COALESCE(?2, price)
        WHERE id = ?3
        "#,
    )
    .bind(changes.name.as_deref())
    .bind(changes.price.as_ref().map(Price::to_string))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

pub async fn delete_product(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Product {} not found", id))
}
