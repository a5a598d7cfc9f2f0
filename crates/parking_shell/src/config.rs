use std::str::FromStr;

use chrono::TimeDelta;
use parking_services::FareConfig;
use postgres::database::DEFAULT_DATABASE_URL;
use rust_decimal::Decimal;

const MAX_GRACE_PERIOD_MINUTES: i64 = 7 * 24 * 60;

/// Where spots and tickets are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// PostgreSQL database at `DATABASE_URL`
    Postgres,
    /// Process memory, lost on shutdown
    Memory,
}

/// Runtime configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Storage backend (default: postgres)
    pub storage: StorageMode,

    /// Pricing policy
    pub fare: FareConfig,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let storage = match lookup("PARKING_STORAGE").as_deref().map(str::trim) {
            None | Some("") | Some("postgres") => StorageMode::Postgres,
            Some("memory") => StorageMode::Memory,
            Some(other) => {
                log::warn!("Unknown PARKING_STORAGE '{}', using postgres", other);
                StorageMode::Postgres
            }
        };

        let defaults = FareConfig::default();
        let fare = FareConfig {
            car_rate_per_hour: parse_within(
                &lookup,
                "PARKING_CAR_RATE_PER_HOUR",
                defaults.car_rate_per_hour,
                |rate| *rate >= Decimal::ZERO,
            ),
            bike_rate_per_hour: parse_within(
                &lookup,
                "PARKING_BIKE_RATE_PER_HOUR",
                defaults.bike_rate_per_hour,
                |rate| *rate >= Decimal::ZERO,
            ),
            grace_period: TimeDelta::minutes(
                parse_or(
                    &lookup,
                    "PARKING_GRACE_PERIOD_MINUTES",
                    defaults.grace_period.num_minutes(),
                )
                .clamp(0, MAX_GRACE_PERIOD_MINUTES),
            ),
            recurring_discount: parse_within(
                &lookup,
                "PARKING_RECURRING_DISCOUNT_PERCENT",
                defaults.recurring_discount * Decimal::ONE_HUNDRED,
                |percent| (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(percent),
            ) / Decimal::ONE_HUNDRED,
        };

        Self {
            database_url,
            storage,
            fare,
        }
    }
}

fn parse_within<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    accept: impl Fn(&T) -> bool,
) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let value = parse_or(lookup, key, default);
    if accept(&value) {
        value
    } else {
        log::warn!("Ignoring out-of-range {}={}, using default", key, value);
        default
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring unparseable {}='{}', using default", key, raw);
                default
            }
        },
    }
}
