use parking_services::{ParkingSpot, SpotDirectory, StorageError, VehicleClass};
use sqlx::{PgPool, Row};

use crate::database::backend_error;

/// Spot directory backed by the `parking_spot` table
#[derive(Debug, Clone)]
pub struct PgSpotDirectory {
    pool: PgPool,
}

impl PgSpotDirectory {
    /// Creates a new directory with the provided database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Matches only when the value actually changes, so two entries racing for
// the same spot cannot both succeed.
const SET_AVAILABILITY_SQL: &str = r#"
    UPDATE parking_spot
    SET available = $1
    WHERE vehicle_class = $2 AND spot_number = $3 AND available <> $1
"#;

pub(crate) fn spot_number_from_db(value: i32) -> Result<u32, StorageError> {
    u32::try_from(value)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| StorageError::Corrupt(format!("invalid spot number {}", value)))
}

pub(crate) fn spot_number_to_db(value: u32) -> Result<i32, StorageError> {
    i32::try_from(value)
        .map_err(|_| StorageError::Corrupt(format!("spot number {} out of range", value)))
}

#[async_trait::async_trait]
impl SpotDirectory for PgSpotDirectory {
    async fn find_next_available(
        &self,
        vehicle_class: VehicleClass,
    ) -> Result<Option<u32>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT MIN(spot_number) AS spot_number
            FROM parking_spot
            WHERE vehicle_class = $1 AND available = true
            "#,
        )
        .bind(vehicle_class.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend_error)?;

        let spot_number: Option<i32> = row.try_get("spot_number").map_err(backend_error)?;
        spot_number.map(spot_number_from_db).transpose()
    }

    async fn set_availability(
        &self,
        spot: &ParkingSpot,
        available: bool,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(SET_AVAILABILITY_SQL)
            .bind(available)
            .bind(spot.vehicle_class.as_str())
            .bind(spot_number_to_db(spot.id)?)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_number_conversion() {
        assert_eq!(spot_number_from_db(3).unwrap(), 3);
        assert!(spot_number_from_db(0).is_err());
        assert!(spot_number_from_db(-1).is_err());

        assert_eq!(spot_number_to_db(5).unwrap(), 5);
        assert!(spot_number_to_db(u32::MAX).is_err());
    }

    #[test]
    fn test_availability_update_requires_a_change() {
        let normalized = SET_AVAILABILITY_SQL
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        assert!(
            normalized.ends_with("AND available <> $1"),
            "{}",
            normalized
        );
    }
}
