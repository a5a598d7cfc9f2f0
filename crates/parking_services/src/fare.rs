use chrono::TimeDelta;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{FareError, Ticket, VehicleClass};

/// Hourly rate charged for cars
pub const CAR_RATE_PER_HOUR: Decimal = Decimal::from_parts(150, 0, 0, false, 2);

/// Hourly rate charged for bikes
pub const BIKE_RATE_PER_HOUR: Decimal = Decimal::from_parts(100, 0, 0, false, 2);

/// Stays shorter than this are free
pub const GRACE_PERIOD_MINUTES: i64 = 30;

/// Discount granted to vehicles with at least one completed session (5%)
pub const RECURRING_USER_DISCOUNT: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Pricing policy applied by the [`FareCalculator`]
#[derive(Debug, Clone, PartialEq)]
pub struct FareConfig {
    /// Hourly rate for cars
    pub car_rate_per_hour: Decimal,

    /// Hourly rate for bikes
    pub bike_rate_per_hour: Decimal,

    /// Free short-stay period (default: 30 minutes)
    pub grace_period: TimeDelta,

    /// Fraction taken off the fare for recurring users (default: 0.05)
    pub recurring_discount: Decimal,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            car_rate_per_hour: CAR_RATE_PER_HOUR,
            bike_rate_per_hour: BIKE_RATE_PER_HOUR,
            grace_period: TimeDelta::minutes(GRACE_PERIOD_MINUTES),
            recurring_discount: RECURRING_USER_DISCOUNT,
        }
    }
}

impl FareConfig {
    /// Checks that rates are not negative, the grace period is not negative
    /// and the discount is a fraction between 0 and 1.
    pub fn validate(&self) -> Result<(), FareError> {
        for (name, rate) in [
            ("car", self.car_rate_per_hour),
            ("bike", self.bike_rate_per_hour),
        ] {
            if rate < Decimal::ZERO {
                return Err(FareError::InvalidConfig(format!(
                    "{} rate {} is negative",
                    name, rate
                )));
            }
        }

        if self.grace_period < TimeDelta::zero() {
            return Err(FareError::InvalidConfig(format!(
                "grace period {} is negative",
                self.grace_period
            )));
        }

        if self.recurring_discount < Decimal::ZERO || self.recurring_discount > Decimal::ONE {
            return Err(FareError::InvalidConfig(format!(
                "recurring discount {} is outside 0..=1",
                self.recurring_discount
            )));
        }

        Ok(())
    }

    /// Hourly rate for the given vehicle class
    pub fn rate_for(&self, vehicle_class: VehicleClass) -> Decimal {
        match vehicle_class {
            VehicleClass::Car => self.car_rate_per_hour,
            VehicleClass::Bike => self.bike_rate_per_hour,
        }
    }
}

/// Computes the fare owed for a closed ticket.
#[derive(Debug, Clone, Default)]
pub struct FareCalculator {
    config: FareConfig,
}

impl FareCalculator {
    /// Creates a calculator applying the given pricing policy. A policy that
    /// fails [`FareConfig::validate`] is replaced by the default one.
    pub fn new(config: FareConfig) -> Self {
        if let Err(e) = config.validate() {
            log::warn!("⚠️ Rejecting fare policy ({}), using defaults", e);
            return Self::default();
        }

        Self { config }
    }

    /// Pricing policy in use
    pub fn config(&self) -> &FareConfig {
        &self.config
    }

    /// Computes the fare for `ticket`, which must carry an exit time not
    /// earlier than its entry time.
    ///
    /// Stays shorter than the grace period cost nothing. Longer stays are
    /// billed pro rata at the class's hourly rate, minus the recurring-user
    /// discount when `recurring_user` is set, rounded half-up to cents.
    pub fn calculate_fare(
        &self,
        ticket: &Ticket,
        recurring_user: bool,
    ) -> Result<Decimal, FareError> {
        let out_time = ticket.out_time.ok_or_else(|| {
            FareError::InvalidDuration(format!(
                "ticket for {} has no exit time",
                ticket.vehicle_reg_number
            ))
        })?;

        let elapsed = out_time - ticket.in_time;
        if elapsed < TimeDelta::zero() {
            return Err(FareError::InvalidDuration(format!(
                "exit time {} is before entry time {}",
                out_time, ticket.in_time
            )));
        }

        if elapsed < self.config.grace_period {
            return Ok(Decimal::ZERO);
        }

        let hours =
            Decimal::from(elapsed.num_milliseconds()) / Decimal::from(MILLIS_PER_HOUR);
        let mut price = hours * self.config.rate_for(ticket.parking_spot.vehicle_class);

        if recurring_user {
            price *= Decimal::ONE - self.config.recurring_discount;
        }

        Ok(price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParkingSpot;
    use chrono::{DateTime, Utc};

    fn closed_ticket(vehicle_class: VehicleClass, stay: TimeDelta) -> Ticket {
        let in_time: DateTime<Utc> = "2024-05-01T10:00:00Z".parse().unwrap();
        let spot = ParkingSpot::new(1, vehicle_class, false);
        let mut ticket = Ticket::open(spot, "ABCDEF", in_time);
        ticket.out_time = Some(in_time + stay);
        ticket
    }

    fn round2(value: Decimal) -> Decimal {
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    #[test]
    fn test_short_stays_are_free() {
        let calculator = FareCalculator::default();

        for class in [VehicleClass::Car, VehicleClass::Bike] {
            for recurring in [false, true] {
                for minutes in [0, 1, 15, 29] {
                    let ticket = closed_ticket(class, TimeDelta::minutes(minutes));
                    assert_eq!(
                        calculator.calculate_fare(&ticket, recurring).unwrap(),
                        Decimal::ZERO,
                        "{} minutes for {} should be free",
                        minutes,
                        class
                    );
                }
            }
        }

        let ticket = closed_ticket(VehicleClass::Car, TimeDelta::seconds(29 * 60 + 59));
        assert_eq!(
            calculator.calculate_fare(&ticket, false).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_grace_period_boundary_is_charged() {
        let calculator = FareCalculator::default();
        let ticket = closed_ticket(VehicleClass::Car, TimeDelta::minutes(30));

        assert_eq!(
            calculator.calculate_fare(&ticket, false).unwrap(),
            Decimal::new(75, 2)
        );
    }

    #[test]
    fn test_one_hour_fares() {
        let calculator = FareCalculator::default();

        let car = closed_ticket(VehicleClass::Car, TimeDelta::hours(1));
        assert_eq!(
            calculator.calculate_fare(&car, false).unwrap(),
            CAR_RATE_PER_HOUR
        );

        let bike = closed_ticket(VehicleClass::Bike, TimeDelta::hours(1));
        assert_eq!(
            calculator.calculate_fare(&bike, false).unwrap(),
            BIKE_RATE_PER_HOUR
        );
    }

    #[test]
    fn test_partial_hours_are_prorated_and_rounded_half_up() {
        let calculator = FareCalculator::default();

        // 0.75h * 1.50 = 1.125
        let car = closed_ticket(VehicleClass::Car, TimeDelta::minutes(45));
        assert_eq!(
            calculator.calculate_fare(&car, false).unwrap(),
            Decimal::new(113, 2)
        );

        let bike = closed_ticket(VehicleClass::Bike, TimeDelta::minutes(45));
        assert_eq!(
            calculator.calculate_fare(&bike, false).unwrap(),
            Decimal::new(75, 2)
        );

        let day = closed_ticket(VehicleClass::Car, TimeDelta::hours(24));
        assert_eq!(
            calculator.calculate_fare(&day, false).unwrap(),
            Decimal::new(3600, 2)
        );
    }

    #[test]
    fn test_recurring_user_discount() {
        let calculator = FareCalculator::default();
        let discount = Decimal::ONE - RECURRING_USER_DISCOUNT;

        let car = closed_ticket(VehicleClass::Car, TimeDelta::hours(1));
        // 1.425 rounds up
        assert_eq!(
            calculator.calculate_fare(&car, true).unwrap(),
            Decimal::new(143, 2)
        );
        assert_eq!(
            calculator.calculate_fare(&car, true).unwrap(),
            round2(CAR_RATE_PER_HOUR * discount)
        );

        let bike = closed_ticket(VehicleClass::Bike, TimeDelta::hours(1));
        assert_eq!(
            calculator.calculate_fare(&bike, true).unwrap(),
            Decimal::new(95, 2)
        );

        let long = closed_ticket(VehicleClass::Bike, TimeDelta::minutes(90));
        assert_eq!(
            calculator.calculate_fare(&long, true).unwrap(),
            round2(Decimal::new(15, 1) * BIKE_RATE_PER_HOUR * discount)
        );
    }

    #[test]
    fn test_price_increases_with_duration() {
        let calculator = FareCalculator::default();

        for class in [VehicleClass::Car, VehicleClass::Bike] {
            for recurring in [false, true] {
                let prices: Vec<Decimal> = [30, 45, 60, 120, 600]
                    .iter()
                    .map(|minutes| {
                        let ticket = closed_ticket(class, TimeDelta::minutes(*minutes));
                        calculator.calculate_fare(&ticket, recurring).unwrap()
                    })
                    .collect();

                assert!(
                    prices.windows(2).all(|pair| pair[0] < pair[1]),
                    "{:?}",
                    prices
                );
            }
        }
    }

    #[test]
    fn test_exit_before_entry_is_rejected() {
        let calculator = FareCalculator::default();
        let ticket = closed_ticket(VehicleClass::Car, TimeDelta::minutes(-90));

        assert!(matches!(
            calculator.calculate_fare(&ticket, false),
            Err(FareError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_missing_exit_time_is_rejected() {
        let calculator = FareCalculator::default();
        let ticket = Ticket::open(
            ParkingSpot::new(1, VehicleClass::Bike, false),
            "ABCDEF",
            Utc::now(),
        );

        assert!(matches!(
            calculator.calculate_fare(&ticket, true),
            Err(FareError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_fare_is_deterministic() {
        let calculator = FareCalculator::default();
        let ticket = closed_ticket(VehicleClass::Car, TimeDelta::minutes(137));

        let first = calculator.calculate_fare(&ticket, true).unwrap();
        let second = calculator.calculate_fare(&ticket, true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_policy() {
        let calculator = FareCalculator::new(FareConfig {
            car_rate_per_hour: Decimal::new(400, 2),
            bike_rate_per_hour: Decimal::new(200, 2),
            grace_period: TimeDelta::minutes(10),
            recurring_discount: Decimal::new(25, 2),
        });

        let ticket = closed_ticket(VehicleClass::Car, TimeDelta::minutes(15));
        assert_eq!(
            calculator.calculate_fare(&ticket, false).unwrap(),
            Decimal::new(100, 2)
        );
        assert_eq!(
            calculator.calculate_fare(&ticket, true).unwrap(),
            Decimal::new(75, 2)
        );
    }

    #[test]
    fn test_invalid_policies_are_rejected() {
        let defaults = FareConfig::default();
        assert!(defaults.validate().is_ok());

        let invalid = [
            FareConfig {
                car_rate_per_hour: Decimal::new(-150, 2),
                ..defaults.clone()
            },
            FareConfig {
                bike_rate_per_hour: Decimal::new(-1, 2),
                ..defaults.clone()
            },
            FareConfig {
                grace_period: TimeDelta::minutes(-1),
                ..defaults.clone()
            },
            FareConfig {
                recurring_discount: Decimal::new(150, 2),
                ..defaults.clone()
            },
            FareConfig {
                recurring_discount: Decimal::new(-5, 2),
                ..defaults.clone()
            },
        ];

        for config in invalid {
            assert!(
                matches!(config.validate(), Err(FareError::InvalidConfig(_))),
                "{:?}",
                config
            );
            assert_eq!(FareCalculator::new(config).config(), &defaults);
        }
    }

    #[test]
    fn test_invalid_policy_never_yields_negative_fares() {
        let calculator = FareCalculator::new(FareConfig {
            recurring_discount: Decimal::new(150, 2),
            ..FareConfig::default()
        });
        let ticket = closed_ticket(VehicleClass::Car, TimeDelta::hours(1));

        assert_eq!(
            calculator.calculate_fare(&ticket, true).unwrap(),
            Decimal::new(143, 2)
        );
    }

    #[test]
    fn test_free_and_full_discount_policies_are_valid() {
        let calculator = FareCalculator::new(FareConfig {
            car_rate_per_hour: Decimal::ZERO,
            bike_rate_per_hour: Decimal::ZERO,
            grace_period: TimeDelta::zero(),
            recurring_discount: Decimal::ONE,
        });
        let ticket = closed_ticket(VehicleClass::Car, TimeDelta::hours(2));

        assert_eq!(calculator.config().recurring_discount, Decimal::ONE);
        assert_eq!(
            calculator.calculate_fare(&ticket, false).unwrap(),
            Decimal::ZERO
        );
    }
}
