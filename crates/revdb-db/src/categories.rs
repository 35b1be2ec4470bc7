//! Database operations for the `categories` table.

use sqlx::PgPool;

use revdb_core::{Category, NewCategory};

use crate::DbError;

/// A row from the `categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

/// Insert a category and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a duplicate name.
pub async fn insert_category(pool: &PgPool, category: &NewCategory) -> Result<CategoryRow, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "INSERT INTO categories (name, description) \
         VALUES ($1, $2) \
         RETURNING id, name, description",
    )
    .bind(&category.name)
    .bind(&category.description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// List all categories ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, description FROM categories ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Return a category by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_category(pool: &PgPool, id: i64) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, description FROM categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
