//! Database operations for the `access_log` table.

use sqlx::PgPool;

use crate::DbError;

/// Append one access-log entry.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_access_log(pool: &PgPool, text: &str) -> Result<(), DbError> {
    sqlx::query("INSERT INTO access_log (text) VALUES ($1)")
        .bind(text)
        .execute(pool)
        .await?;
    Ok(())
}
