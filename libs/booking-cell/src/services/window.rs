// libs/booking-cell/src/services/window.rs
use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use tracing::warn;

use crate::models::{BookingError, ClinicSettings};

/// Time source for the booking horizon. Swapped for a fixed instant in tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parses a `YYYY-MM-DD` date, rejecting inputs that are not zero-padded
/// (round-tripping the parsed date must reproduce the input byte for byte).
pub fn parse_date_iso(value: &str) -> Result<NaiveDate, BookingError> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidDate(value.to_string()))?;

    if date.format("%Y-%m-%d").to_string() != value {
        return Err(BookingError::InvalidDate(value.to_string()));
    }

    Ok(date)
}

/// Civil date at the clinic right now.
pub fn clinic_today(clock: &dyn Clock, settings: &ClinicSettings) -> NaiveDate {
    let offset = FixedOffset::east_opt(settings.utc_offset_minutes * 60).unwrap_or_else(|| {
        warn!(
            "Configured UTC offset {} minutes is out of range, falling back to UTC",
            settings.utc_offset_minutes
        );
        FixedOffset::east_opt(0).unwrap()
    });

    clock.now_utc().with_timezone(&offset).date_naive()
}

/// Validates a candidate date against the booking horizon
/// `[today, today + max_days_ahead]` in clinic-local civil time. Calendar
/// arithmetic only: month and year boundaries cross correctly and daylight
/// saving shifts never move the window.
pub fn validate_booking_date(
    candidate: &str,
    settings: &ClinicSettings,
    clock: &dyn Clock,
) -> Result<NaiveDate, BookingError> {
    let date = parse_date_iso(candidate)?;
    let today = clinic_today(clock, settings);
    let last_allowed = today
        .checked_add_days(Days::new(settings.max_days_ahead))
        .ok_or_else(|| BookingError::DateOutOfRange {
            date: candidate.to_string(),
        })?;

    if date < today || date > last_allowed {
        return Err(BookingError::DateOutOfRange {
            date: candidate.to_string(),
        });
    }

    Ok(date)
}
