use std::sync::Arc;

use chrono::Utc;

use crate::fare::FareCalculator;
use crate::types::{
    ExitReceipt, InputError, ParkingError, ParkingSpot, StorageError, Ticket, VehicleClass,
};

/// Source of operator input for the entry and exit flows
#[async_trait::async_trait]
pub trait InputReader: Send + Sync {
    /// Reads the vehicle type menu selection; unreadable input yields `-1`.
    async fn read_selection(&self) -> Result<i32, InputError>;

    /// Reads a trimmed, non-empty vehicle registration number.
    async fn read_vehicle_registration_number(&self) -> Result<String, InputError>;
}

/// Persistent directory of parking spots
#[async_trait::async_trait]
pub trait SpotDirectory: Send + Sync {
    /// Lowest-numbered free spot of the given class, if any.
    async fn find_next_available(
        &self,
        vehicle_class: VehicleClass,
    ) -> Result<Option<u32>, StorageError>;

    /// Marks `spot` available or unavailable. Returns `false` when no spot
    /// was updated.
    async fn set_availability(
        &self,
        spot: &ParkingSpot,
        available: bool,
    ) -> Result<bool, StorageError>;
}

/// Persistent store of parking tickets
#[async_trait::async_trait]
pub trait TicketStore: Send + Sync {
    /// Persists a new ticket and returns it with its assigned id, or `None`
    /// when nothing was written.
    async fn create_ticket(&self, ticket: &Ticket) -> Result<Option<Ticket>, StorageError>;

    /// Persists exit time and price of an existing ticket. Returns `false`
    /// when no ticket was updated.
    async fn update_ticket(&self, ticket: &Ticket) -> Result<bool, StorageError>;

    /// The open ticket for a registration number, if any.
    async fn find_open_ticket(
        &self,
        vehicle_reg_number: &str,
    ) -> Result<Option<Ticket>, StorageError>;

    /// Number of closed tickets recorded for a registration number.
    async fn count_completed_tickets(&self, vehicle_reg_number: &str) -> Result<u32, StorageError>;
}

/// Coordinates vehicle entry and exit across the spot directory, the ticket
/// store and the fare calculator.
pub struct ParkingService {
    input_reader: Arc<dyn InputReader>,
    spot_directory: Arc<dyn SpotDirectory>,
    ticket_store: Arc<dyn TicketStore>,
    fare_calculator: FareCalculator,
}

impl ParkingService {
    /// Creates a new parking service over the given collaborators.
    pub fn new(
        input_reader: Arc<dyn InputReader>,
        spot_directory: Arc<dyn SpotDirectory>,
        ticket_store: Arc<dyn TicketStore>,
        fare_calculator: FareCalculator,
    ) -> Self {
        Self {
            input_reader,
            spot_directory,
            ticket_store,
            fare_calculator,
        }
    }

    /// Asks the operator for a vehicle type and finds the lowest-numbered
    /// free spot for it. Nothing is written.
    pub async fn get_next_parking_spot_if_available(&self) -> Result<ParkingSpot, ParkingError> {
        let vehicle_class = self.read_vehicle_class().await?;

        let spot_number = self
            .spot_directory
            .find_next_available(vehicle_class)
            .await
            .map_err(|e| {
                ParkingError::Persistence(format!("Failed to look up free spots: {}", e))
            })?;

        match spot_number {
            Some(id) if id > 0 => Ok(ParkingSpot::new(id, vehicle_class, true)),
            _ => {
                log::warn!("No parking spot available for {}", vehicle_class);
                Err(ParkingError::NoAvailableSpot(vehicle_class))
            }
        }
    }

    /// Runs the entry flow: allocates a spot, then opens a ticket on it.
    ///
    /// The spot is marked unavailable before the ticket is written. If the
    /// registration cannot be read, already has an open ticket, or the ticket
    /// cannot be created, the spot is handed back.
    pub async fn process_incoming_vehicle(&self) -> Result<Ticket, ParkingError> {
        log::info!("Processing incoming vehicle");

        let mut parking_spot = self.get_next_parking_spot_if_available().await?;

        match self.spot_directory.set_availability(&parking_spot, false).await {
            Ok(true) => parking_spot.available = false,
            Ok(false) => {
                return Err(ParkingError::Persistence(format!(
                    "Spot {} ({}) could not be marked unavailable",
                    parking_spot.id, parking_spot.vehicle_class
                )));
            }
            Err(e) => {
                return Err(ParkingError::Persistence(format!(
                    "Failed to allocate spot {} ({}): {}",
                    parking_spot.id, parking_spot.vehicle_class, e
                )));
            }
        }

        let vehicle_reg_number = match self.read_registration().await {
            Ok(reg) => reg,
            Err(e) => {
                self.release_allocated_spot(&parking_spot).await;
                return Err(e);
            }
        };

        let already_parked = match self.ticket_store.find_open_ticket(&vehicle_reg_number).await {
            Ok(open) => open.is_some(),
            Err(e) => {
                self.release_allocated_spot(&parking_spot).await;
                return Err(ParkingError::Persistence(format!(
                    "Failed to fetch ticket for {}: {}",
                    vehicle_reg_number, e
                )));
            }
        };
        if already_parked {
            log::warn!("Vehicle {} already has an open ticket", vehicle_reg_number);
            self.release_allocated_spot(&parking_spot).await;
            return Err(ParkingError::VehicleAlreadyParked(vehicle_reg_number));
        }

        let ticket = Ticket::open(parking_spot.clone(), vehicle_reg_number, Utc::now());

        let failure = match self.ticket_store.create_ticket(&ticket).await {
            Ok(Some(saved)) => {
                log::info!(
                    "Generated ticket for {}: spot {} ({}), in-time {}",
                    saved.vehicle_reg_number,
                    saved.parking_spot.id,
                    saved.parking_spot.vehicle_class,
                    saved.in_time
                );
                return Ok(saved);
            }
            Ok(None) => format!("Ticket for {} was not saved", ticket.vehicle_reg_number),
            Err(e) => format!(
                "Failed to save ticket for {}: {}",
                ticket.vehicle_reg_number, e
            ),
        };

        log::error!("{}", failure);
        self.release_allocated_spot(&parking_spot).await;
        Err(ParkingError::Persistence(failure))
    }

    /// Runs the exit flow: closes the open ticket with its fare and frees
    /// the spot.
    ///
    /// The spot is released even when the ticket update fails; that failure
    /// is still returned.
    pub async fn process_exiting_vehicle(&self) -> Result<ExitReceipt, ParkingError> {
        log::info!("Processing exiting vehicle");

        let vehicle_reg_number = self.read_registration().await?;

        let mut ticket = self
            .ticket_store
            .find_open_ticket(&vehicle_reg_number)
            .await
            .map_err(|e| {
                ParkingError::Persistence(format!(
                    "Failed to fetch ticket for {}: {}",
                    vehicle_reg_number, e
                ))
            })?
            .ok_or_else(|| ParkingError::TicketNotFound(vehicle_reg_number.clone()))?;

        ticket.out_time = Some(Utc::now());

        let completed = self
            .ticket_store
            .count_completed_tickets(&vehicle_reg_number)
            .await
            .map_err(|e| {
                ParkingError::Persistence(format!(
                    "Failed to count tickets for {}: {}",
                    vehicle_reg_number, e
                ))
            })?;
        let recurring_user = completed > 0;

        ticket.price = self
            .fare_calculator
            .calculate_fare(&ticket, recurring_user)?;

        let update_failure = match self.ticket_store.update_ticket(&ticket).await {
            Ok(true) => None,
            Ok(false) => Some(format!(
                "Unable to update ticket information for {}",
                vehicle_reg_number
            )),
            Err(e) => Some(format!(
                "Failed to update ticket for {}: {}",
                vehicle_reg_number, e
            )),
        };
        if let Some(failure) = &update_failure {
            log::error!("{}", failure);
        }

        let release_failure = match self
            .spot_directory
            .set_availability(&ticket.parking_spot, true)
            .await
        {
            Ok(true) => None,
            Ok(false) => Some(format!(
                "Spot {} ({}) could not be marked available",
                ticket.parking_spot.id, ticket.parking_spot.vehicle_class
            )),
            Err(e) => Some(format!(
                "Failed to release spot {} ({}): {}",
                ticket.parking_spot.id, ticket.parking_spot.vehicle_class, e
            )),
        };
        if let Some(failure) = &release_failure {
            log::error!("{}", failure);
        }

        if let Some(failure) = update_failure.or(release_failure) {
            return Err(ParkingError::Persistence(failure));
        }

        ticket.parking_spot.available = true;
        log::info!(
            "Vehicle {} left spot {} ({}), fare {}{}",
            ticket.vehicle_reg_number,
            ticket.parking_spot.id,
            ticket.parking_spot.vehicle_class,
            ticket.price,
            if recurring_user {
                " after recurring-user discount"
            } else {
                ""
            }
        );

        Ok(ExitReceipt {
            ticket,
            recurring_user,
        })
    }

    async fn read_vehicle_class(&self) -> Result<VehicleClass, ParkingError> {
        let selection = self.input_reader.read_selection().await?;

        VehicleClass::from_selection(selection).ok_or_else(|| {
            log::warn!("Incorrect vehicle type selection: {}", selection);
            ParkingError::InvalidSelection(selection)
        })
    }

    async fn read_registration(&self) -> Result<String, ParkingError> {
        let vehicle_reg_number = self
            .input_reader
            .read_vehicle_registration_number()
            .await?
            .trim()
            .to_string();

        if vehicle_reg_number.is_empty() {
            return Err(InputError::EmptyRegistration.into());
        }

        Ok(vehicle_reg_number)
    }

    /// Hands a spot back after a failed entry. A failure here is logged only,
    /// the caller already reports the original error.
    async fn release_allocated_spot(&self, spot: &ParkingSpot) {
        match self.spot_directory.set_availability(spot, true).await {
            Ok(true) => log::warn!(
                "Released spot {} ({}) after failed entry",
                spot.id,
                spot.vehicle_class
            ),
            Ok(false) => log::error!(
                "Spot {} ({}) could not be released after failed entry",
                spot.id,
                spot.vehicle_class
            ),
            Err(e) => log::error!(
                "Failed to release spot {} ({}) after failed entry: {}",
                spot.id,
                spot.vehicle_class,
                e
            ),
        }
    }
}
