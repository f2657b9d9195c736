// libs/booking-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CLINIC CONFIGURATION
// ==============================================================================

/// A `[start, end)` window of clinic-local wall time, both bounds `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: String,
    pub end: String,
}

/// Singleton clinic configuration record. Loaded fresh per request and
/// treated as immutable for the duration of an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub slot_minutes: i64,
    pub timezone: String,
    pub utc_offset_minutes: i32,
    pub work_hours: TimeWindow,
    #[serde(default)]
    pub breaks: Vec<TimeWindow>,
    pub max_days_ahead: u64,
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// A bookable unit on one date. Ephemeral: recomputed per request, never
/// persisted. `key` is the canonical `"<date>_<HH:MM>"` identity shared with
/// the reservation marker and the appointment it guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub key: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub key: String,
    pub start_time: String,
    pub end_time: String,
    pub available: bool,
}

// ==============================================================================
// RESERVATION MARKERS
// ==============================================================================

/// Exclusivity token for one slot: presence means claimed. Created exactly
/// once, never updated, never released on cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationMarker {
    pub slot_key: String,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: AppointmentStatus,
    pub patient_name: String,
    pub phone: String,
    pub reason: Option<String>,
    pub source: AppointmentSource,
    pub slot_key: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that keep a slot occupied for the availability invariant.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Booked | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentSource {
    Patient,
    Staff,
}

impl fmt::Display for AppointmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentSource::Patient => write!(f, "patient"),
            AppointmentSource::Staff => write!(f, "staff"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub date: String,
    pub start_time: String,
    pub patient_name: String,
    pub phone: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentResponse {
    pub appointment_id: Uuid,
    pub slot_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub slot_minutes: i64,
    pub slots: Vec<SlotAvailability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid patient name")]
    InvalidName,

    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Invalid reason")]
    InvalidReason,

    #[error("Date {date} is outside the booking window")]
    DateOutOfRange { date: String },

    #[error("Requested time does not match an offered slot")]
    InvalidSlot,

    #[error("Slot is already taken")]
    SlotTaken,

    #[error("Appointment not found")]
    NotFound,

    #[error("Clinic settings are not configured")]
    ConfigMissing,

    #[error("Store error: {0}")]
    Store(String),
}
