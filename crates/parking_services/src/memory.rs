use std::sync::{Arc, Mutex, MutexGuard};

use crate::service::{SpotDirectory, TicketStore};
use crate::types::{ParkingSpot, StorageError, Ticket, VehicleClass};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|_| StorageError::Backend("in-memory store lock poisoned".to_string()))
}

/// Spot directory kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySpotDirectory {
    spots: Arc<Mutex<Vec<ParkingSpot>>>,
}

impl InMemorySpotDirectory {
    /// Creates a directory holding the given spots
    pub fn new(spots: Vec<ParkingSpot>) -> Self {
        Self {
            spots: Arc::new(Mutex::new(spots)),
        }
    }

    /// Three car spots (1-3) and two bike spots (4-5), all free
    pub fn with_default_layout() -> Self {
        Self::new(vec![
            ParkingSpot::new(1, VehicleClass::Car, true),
            ParkingSpot::new(2, VehicleClass::Car, true),
            ParkingSpot::new(3, VehicleClass::Car, true),
            ParkingSpot::new(4, VehicleClass::Bike, true),
            ParkingSpot::new(5, VehicleClass::Bike, true),
        ])
    }

    /// Snapshot of every spot
    pub fn spots(&self) -> Result<Vec<ParkingSpot>, StorageError> {
        Ok(lock(&self.spots)?.clone())
    }
}

#[async_trait::async_trait]
impl SpotDirectory for InMemorySpotDirectory {
    async fn find_next_available(
        &self,
        vehicle_class: VehicleClass,
    ) -> Result<Option<u32>, StorageError> {
        Ok(lock(&self.spots)?
            .iter()
            .filter(|s| s.vehicle_class == vehicle_class && s.available)
            .map(|s| s.id)
            .min())
    }

    async fn set_availability(
        &self,
        spot: &ParkingSpot,
        available: bool,
    ) -> Result<bool, StorageError> {
        let mut spots = lock(&self.spots)?;
        // Only a real change counts, so two flows cannot both claim one spot.
        match spots.iter_mut().find(|s| {
            s.id == spot.id && s.vehicle_class == spot.vehicle_class && s.available != available
        }) {
            Some(stored) => {
                stored.available = available;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Ticket store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    tickets: Arc<Mutex<Vec<Ticket>>>,
}

impl InMemoryTicketStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every ticket, in creation order
    pub fn tickets(&self) -> Result<Vec<Ticket>, StorageError> {
        Ok(lock(&self.tickets)?.clone())
    }
}

#[async_trait::async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn create_ticket(&self, ticket: &Ticket) -> Result<Option<Ticket>, StorageError> {
        let mut tickets = lock(&self.tickets)?;
        let mut saved = ticket.clone();
        saved.id = Some(tickets.len() as i32 + 1);
        tickets.push(saved.clone());
        Ok(Some(saved))
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<bool, StorageError> {
        let Some(id) = ticket.id else {
            return Ok(false);
        };

        let mut tickets = lock(&self.tickets)?;
        match tickets.iter_mut().find(|t| t.id == Some(id)) {
            Some(stored) => {
                stored.price = ticket.price;
                stored.out_time = ticket.out_time;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_open_ticket(
        &self,
        vehicle_reg_number: &str,
    ) -> Result<Option<Ticket>, StorageError> {
        Ok(lock(&self.tickets)?
            .iter()
            .rev()
            .find(|t| t.vehicle_reg_number == vehicle_reg_number && t.is_open())
            .cloned())
    }

    async fn count_completed_tickets(&self, vehicle_reg_number: &str) -> Result<u32, StorageError> {
        Ok(lock(&self.tickets)?
            .iter()
            .filter(|t| t.vehicle_reg_number == vehicle_reg_number && !t.is_open())
            .count() as u32)
    }
}
