use chrono::{DateTime, Utc};
use parking_services::{ParkingSpot, StorageError, Ticket, TicketStore, VehicleClass};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::database::backend_error;
use crate::spot_directory::{spot_number_from_db, spot_number_to_db};

/// Ticket store backed by the `ticket` table
#[derive(Debug, Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    /// Creates a new store with the provided database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A ticket row joined with its spot's availability
#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i32,
    spot_number: i32,
    vehicle_class: String,
    available: bool,
    vehicle_reg_number: String,
    price: Decimal,
    in_time: DateTime<Utc>,
    out_time: Option<DateTime<Utc>>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StorageError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let vehicle_class: VehicleClass = row.vehicle_class.parse()?;
        let spot_number = spot_number_from_db(row.spot_number)?;

        Ok(Ticket {
            id: Some(row.id),
            parking_spot: ParkingSpot::new(spot_number, vehicle_class, row.available),
            vehicle_reg_number: row.vehicle_reg_number,
            price: row.price,
            in_time: row.in_time,
            out_time: row.out_time,
        })
    }
}

#[async_trait::async_trait]
impl TicketStore for PgTicketStore {
    async fn create_ticket(&self, ticket: &Ticket) -> Result<Option<Ticket>, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO ticket (
                spot_number, vehicle_class, vehicle_reg_number, price, in_time, out_time
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(spot_number_to_db(ticket.parking_spot.id)?)
        .bind(ticket.parking_spot.vehicle_class.as_str())
        .bind(&ticket.vehicle_reg_number)
        .bind(ticket.price)
        .bind(ticket.in_time)
        .bind(ticket.out_time)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        match row {
            Some(row) => {
                let mut saved = ticket.clone();
                saved.id = Some(row.try_get("id").map_err(backend_error)?);
                Ok(Some(saved))
            }
            None => Ok(None),
        }
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<bool, StorageError> {
        let Some(id) = ticket.id else {
            log::warn!(
                "Refusing to update unsaved ticket for {}",
                ticket.vehicle_reg_number
            );
            return Ok(false);
        };

        let result = sqlx::query("UPDATE ticket SET price = $1, out_time = $2 WHERE id = $3")
            .bind(ticket.price)
            .bind(ticket.out_time)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_open_ticket(
        &self,
        vehicle_reg_number: &str,
    ) -> Result<Option<Ticket>, StorageError> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT
                t.id, t.spot_number, t.vehicle_class, p.available,
                t.vehicle_reg_number, t.price, t.in_time, t.out_time
            FROM ticket t
            JOIN parking_spot p
              ON p.vehicle_class = t.vehicle_class AND p.spot_number = t.spot_number
            WHERE t.vehicle_reg_number = $1 AND t.out_time IS NULL
            ORDER BY t.in_time DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_reg_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        row.map(Ticket::try_from).transpose()
    }

    async fn count_completed_tickets(&self, vehicle_reg_number: &str) -> Result<u32, StorageError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS completed FROM ticket WHERE vehicle_reg_number = $1 AND out_time IS NOT NULL",
        )
        .bind(vehicle_reg_number)
        .fetch_one(&self.pool)
        .await
        .map_err(backend_error)?;

        let completed: i64 = row.try_get("completed").map_err(backend_error)?;
        u32::try_from(completed)
            .map_err(|_| StorageError::Corrupt(format!("invalid ticket count {}", completed)))
    }
}
