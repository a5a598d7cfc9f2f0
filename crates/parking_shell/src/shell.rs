use std::sync::Arc;

use parking_services::{InputError, InputReader, ParkingError, ParkingService};

/// Actions offered by the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    /// Allocate a spot for an entering vehicle
    IncomingVehicle,
    /// Close the ticket of an exiting vehicle
    ExitingVehicle,
    /// Stop the shell
    Shutdown,
}

impl MenuOption {
    /// Maps a menu number to its action
    pub fn from_selection(selection: i32) -> Option<Self> {
        match selection {
            1 => Some(MenuOption::IncomingVehicle),
            2 => Some(MenuOption::ExitingVehicle),
            3 => Some(MenuOption::Shutdown),
            _ => None,
        }
    }
}

/// Operator menu loop driving the parking service
pub struct InteractiveShell {
    input_reader: Arc<dyn InputReader>,
    service: ParkingService,
}

impl InteractiveShell {
    /// Creates a shell reading menu choices from `input_reader`
    pub fn new(input_reader: Arc<dyn InputReader>, service: ParkingService) -> Self {
        Self {
            input_reader,
            service,
        }
    }

    /// Runs the menu until the operator shuts down or input ends.
    ///
    /// Flow errors are shown to the operator and the loop carries on; only a
    /// failure to read the menu choice itself ends the shell with an error.
    pub async fn run(&self) -> Result<(), InputError> {
        println!("Welcome to Parking System!");

        loop {
            print_menu();

            let selection = match self.input_reader.read_selection().await {
                Ok(selection) => selection,
                Err(InputError::EndOfInput) => {
                    log::info!("Input closed, shutting down");
                    break;
                }
                Err(e) => return Err(e),
            };

            match MenuOption::from_selection(selection) {
                Some(MenuOption::IncomingVehicle) => self.incoming_vehicle().await,
                Some(MenuOption::ExitingVehicle) => self.exiting_vehicle().await,
                Some(MenuOption::Shutdown) => {
                    println!("Exiting from the system!");
                    break;
                }
                None => println!(
                    "Unsupported option. Please enter a number corresponding to the provided menu"
                ),
            }
        }

        Ok(())
    }

    async fn incoming_vehicle(&self) {
        println!("Please select vehicle type from menu");
        println!("1 CAR");
        println!("2 BIKE");

        match self.service.process_incoming_vehicle().await {
            Ok(ticket) => {
                println!("Generated Ticket and saved in DB");
                println!(
                    "Please park your vehicle in spot number: {}",
                    ticket.parking_spot.id
                );
                println!(
                    "Recorded in-time for vehicle number: {} is: {}",
                    ticket.vehicle_reg_number,
                    ticket.in_time.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Err(e) => report(&e),
        }
    }

    async fn exiting_vehicle(&self) {
        match self.service.process_exiting_vehicle().await {
            Ok(receipt) => {
                if let Ok(json) = serde_json::to_string(&receipt) {
                    log::debug!("Exit receipt: {}", json);
                }

                if receipt.recurring_user {
                    println!("Welcome back! As a recurring user of our parking lot, you benefit from a discount");
                }
                println!("Please pay the parking fare: {}", receipt.ticket.price);
                if let Some(out_time) = receipt.ticket.out_time {
                    println!(
                        "Recorded out-time for vehicle number: {} is: {}",
                        receipt.ticket.vehicle_reg_number,
                        out_time.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
            Err(e) => report(&e),
        }
    }
}

fn print_menu() {
    println!("Please select an option. Simply enter the number to choose an action");
    println!("1 New Vehicle Entering - Allocate Parking Space");
    println!("2 Vehicle Exiting - Generate Ticket Price");
    println!("3 Shutdown System");
}

fn report(err: &ParkingError) {
    match err {
        ParkingError::InvalidSelection(_) | ParkingError::Input(_) => {
            log::warn!("Operator input rejected: {}", err)
        }
        ParkingError::NoAvailableSpot(_)
        | ParkingError::TicketNotFound(_)
        | ParkingError::VehicleAlreadyParked(_) => log::info!("{}", err),
        ParkingError::InvalidDuration(_)
        | ParkingError::InvalidFarePolicy(_)
        | ParkingError::Persistence(_) => log::error!("{}", err),
    }
    println!("Error: {}", err);
}
