//! # Postgres
//!
//! This crate provides PostgreSQL storage for the parking system: connection
//! handling, schema bootstrap, and the spot directory and ticket store.

/// Database connection and schema utilities.
pub mod database;
/// Spot directory backed by PostgreSQL.
pub mod spot_directory;
/// Ticket store backed by PostgreSQL.
pub mod ticket_store;

pub use spot_directory::PgSpotDirectory;
pub use ticket_store::PgTicketStore;
