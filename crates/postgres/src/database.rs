use parking_services::StorageError;
use sqlx::{PgPool, Row};

const SCHEMA: &str = include_str!("../sql/schema.sql");

/// Fallback connection string when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/parking_system";

/// Creates a connection pool to the PostgreSQL database.
pub async fn create_connection_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(database_url).await
}

/// Tests the database connection by executing a simple query.
pub async fn test_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    let row = sqlx::query("SELECT 1 as test").fetch_one(pool).await?;

    let test_value: i32 = row.get("test");
    log::debug!("Database connection successful, test value: {}", test_value);

    Ok(())
}

/// Creates the parking tables if missing and seeds the default spot layout.
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    log::info!("Parking schema is up to date");
    Ok(())
}

pub(crate) fn backend_error(err: sqlx::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}
