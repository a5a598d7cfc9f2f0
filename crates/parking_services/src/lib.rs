//! # Parking Services
//!
//! This crate provides the parking session logic for the application.
//! It allocates and releases spots, opens and closes tickets, and computes fares.

/// Fare computation and pricing policy.
pub mod fare;
/// In-memory spot directory and ticket store.
pub mod memory;
/// Entry/exit orchestration and the collaborator traits it depends on.
pub mod service;
/// Data model and error types for parking operations.
pub mod types;

pub use fare::{FareCalculator, FareConfig};
pub use service::{InputReader, ParkingService, SpotDirectory, TicketStore};
pub use types::*;
