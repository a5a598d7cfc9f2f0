use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Class of vehicle a parking spot is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VehicleClass {
    /// Passenger car
    Car,
    /// Motorbike or bicycle
    Bike,
}

impl VehicleClass {
    /// Maps the operator's menu selection (`1` car, `2` bike) to a vehicle class.
    pub fn from_selection(selection: i32) -> Option<Self> {
        match selection {
            1 => Some(VehicleClass::Car),
            2 => Some(VehicleClass::Bike),
            _ => None,
        }
    }

    /// Storage representation of the class
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Car => "CAR",
            VehicleClass::Bike => "BIKE",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleClass {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAR" => Ok(VehicleClass::Car),
            "BIKE" => Ok(VehicleClass::Bike),
            other => Err(StorageError::Corrupt(format!(
                "unknown vehicle class '{}'",
                other
            ))),
        }
    }
}

/// A physical parking location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSpot {
    /// Spot number, unique within its vehicle class
    pub id: u32,
    /// Vehicle class the spot accepts
    pub vehicle_class: VehicleClass,
    /// Whether the spot is free
    pub available: bool,
}

impl ParkingSpot {
    /// Creates a new parking spot
    pub fn new(id: u32, vehicle_class: VehicleClass, available: bool) -> Self {
        Self {
            id,
            vehicle_class,
            available,
        }
    }
}

/// A parking session binding a registration number to a spot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Identifier assigned by the ticket store, `None` until persisted
    pub id: Option<i32>,
    /// Spot occupied during the session
    pub parking_spot: ParkingSpot,
    /// Vehicle registration number
    pub vehicle_reg_number: String,
    /// Fare owed, zero while the ticket is open
    pub price: Decimal,
    /// When the vehicle entered
    pub in_time: DateTime<Utc>,
    /// When the vehicle left, `None` while the session is open
    pub out_time: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Opens a new ticket for a vehicle parked on `parking_spot`.
    pub fn open(
        parking_spot: ParkingSpot,
        vehicle_reg_number: impl Into<String>,
        in_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            parking_spot,
            vehicle_reg_number: vehicle_reg_number.into(),
            price: Decimal::ZERO,
            in_time,
            out_time: None,
        }
    }

    /// Whether the session is still running
    pub fn is_open(&self) -> bool {
        self.out_time.is_none()
    }
}

/// Outcome of a completed exit flow
#[derive(Debug, Clone, Serialize)]
pub struct ExitReceipt {
    /// The closed ticket, with exit time and price set
    pub ticket: Ticket,
    /// Whether the recurring-user discount was applied
    pub recurring_user: bool,
}

/// Errors raised by the spot directory and ticket store
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The storage backend rejected or failed the call
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored record could not be interpreted
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Errors raised while reading operator input
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Reading from the terminal failed
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The operator entered a blank registration number
    #[error("Invalid input provided: registration number must not be empty")]
    EmptyRegistration,

    /// The input stream was closed
    #[error("Input stream closed")]
    EndOfInput,
}

/// Errors raised by the fare calculator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FareError {
    /// Entry/exit timestamps are missing or out of order
    #[error("Invalid parking duration: {0}")]
    InvalidDuration(String),

    /// Pricing policy has negative rates or an out-of-range discount
    #[error("Invalid fare policy: {0}")]
    InvalidConfig(String),
}

/// Errors surfaced by the parking entry and exit flows
#[derive(Debug, thiserror::Error)]
pub enum ParkingError {
    /// The vehicle type selection is not a known class
    #[error("Incorrect vehicle type selection: {0}")]
    InvalidSelection(i32),

    /// The facility has no free spot for the class
    #[error("No parking spot available for {0}")]
    NoAvailableSpot(VehicleClass),

    /// No open session exists for the registration
    #[error("No open ticket found for vehicle {0}")]
    TicketNotFound(String),

    /// The registration already has an open session
    #[error("Vehicle {0} is already parked")]
    VehicleAlreadyParked(String),

    /// Entry/exit timestamps violate the fare invariants
    #[error("Invalid parking duration: {0}")]
    InvalidDuration(String),

    /// The pricing policy cannot be applied
    #[error("Invalid fare policy: {0}")]
    InvalidFarePolicy(String),

    /// A store call failed or reported that nothing was written
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Operator input could not be read
    #[error(transparent)]
    Input(#[from] InputError),
}

impl From<FareError> for ParkingError {
    fn from(err: FareError) -> Self {
        match err {
            FareError::InvalidDuration(msg) => ParkingError::InvalidDuration(msg),
            FareError::InvalidConfig(msg) => ParkingError::InvalidFarePolicy(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_class_from_selection() {
        assert_eq!(VehicleClass::from_selection(1), Some(VehicleClass::Car));
        assert_eq!(VehicleClass::from_selection(2), Some(VehicleClass::Bike));
        assert_eq!(VehicleClass::from_selection(3), None);
        assert_eq!(VehicleClass::from_selection(0), None);
        assert_eq!(VehicleClass::from_selection(-1), None);
    }

    #[test]
    fn test_vehicle_class_storage_names() {
        assert_eq!("CAR".parse::<VehicleClass>().unwrap(), VehicleClass::Car);
        assert_eq!("bike".parse::<VehicleClass>().unwrap(), VehicleClass::Bike);
        assert!("TRUCK".parse::<VehicleClass>().is_err());
        assert_eq!(VehicleClass::Bike.to_string(), "BIKE");
    }

    #[test]
    fn test_new_ticket_is_open_and_free() {
        let spot = ParkingSpot::new(1, VehicleClass::Car, false);
        let ticket = Ticket::open(spot, "ABCDEF", Utc::now());

        assert!(ticket.is_open());
        assert!(ticket.id.is_none());
        assert_eq!(ticket.price, Decimal::ZERO);
    }

    #[test]
    fn test_ticket_serializes_vehicle_class_uppercase() {
        let spot = ParkingSpot::new(4, VehicleClass::Bike, true);
        let json = serde_json::to_value(&spot).unwrap();

        assert_eq!(json["vehicle_class"], "BIKE");
        assert_eq!(json["id"], 4);
    }
}
