//! Main entry point for the parking system.
//! Runs the operator shell over PostgreSQL or in-memory storage.

mod config;
mod input_reader;
mod shell;

use std::sync::Arc;

use parking_services::memory::{InMemorySpotDirectory, InMemoryTicketStore};
use parking_services::{FareCalculator, ParkingService, SpotDirectory, TicketStore};
use postgres::database::{apply_schema, create_connection_pool, test_connection};
use postgres::{PgSpotDirectory, PgTicketStore};

use crate::config::{AppConfig, StorageMode};
use crate::input_reader::ConsoleInputReader;
use crate::shell::InteractiveShell;

type Stores = (Arc<dyn SpotDirectory>, Arc<dyn TicketStore>);

async fn open_postgres_stores(
    database_url: &str,
) -> Result<Stores, Box<dyn std::error::Error + Send + Sync>> {
    let pool = create_connection_pool(database_url).await?;
    log::info!("🗃️ Database pool created successfully");

    test_connection(&pool).await?;
    apply_schema(&pool).await?;

    let spot_directory: Arc<dyn SpotDirectory> = Arc::new(PgSpotDirectory::new(pool.clone()));
    let ticket_store: Arc<dyn TicketStore> = Arc::new(PgTicketStore::new(pool));
    Ok((spot_directory, ticket_store))
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("🚗 Starting parking system...");

    let mut config = AppConfig::from_env();
    if std::env::args().skip(1).any(|arg| arg == "--in-memory") {
        config.storage = StorageMode::Memory;
    }

    let (spot_directory, ticket_store): Stores = match config.storage {
        StorageMode::Memory => {
            log::warn!("Using in-memory storage, tickets are lost on shutdown");
            let spot_directory: Arc<dyn SpotDirectory> =
                Arc::new(InMemorySpotDirectory::with_default_layout());
            let ticket_store: Arc<dyn TicketStore> = Arc::new(InMemoryTicketStore::new());
            (spot_directory, ticket_store)
        }
        StorageMode::Postgres => match open_postgres_stores(&config.database_url).await {
            Ok(stores) => stores,
            Err(e) => {
                log::error!("❌ Failed to open parking database: {}", e);
                log::error!("💡 Check DATABASE_URL or run with --in-memory");
                std::process::exit(1);
            }
        },
    };

    log::info!(
        "💶 Fares: car {}/h, bike {}/h, {} min free, {}% recurring discount",
        config.fare.car_rate_per_hour,
        config.fare.bike_rate_per_hour,
        config.fare.grace_period.num_minutes(),
        config.fare.recurring_discount * rust_decimal::Decimal::ONE_HUNDRED
    );

    let input_reader = Arc::new(ConsoleInputReader::stdin());
    let service = ParkingService::new(
        input_reader.clone(),
        spot_directory,
        ticket_store,
        FareCalculator::new(config.fare),
    );

    if let Err(e) = InteractiveShell::new(input_reader, service).run().await {
        log::error!("❌ Shell stopped: {}", e);
        std::process::exit(1);
    }
}
