// libs/booking-cell/src/services/lifecycle.rs
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{Query, RecordStore, StoreError};

use crate::models::{Appointment, AppointmentStatus, BookingError};
use crate::services::window::{parse_date_iso, Clock};
use crate::services::APPOINTMENTS;

/// Staff-side appointment workflow: lookups, the daily schedule view, and
/// status updates. Status changes never touch the reservation marker, so a
/// cancelled slot stays claimed.
pub struct AppointmentLifecycleService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl AppointmentLifecycleService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let record = self
            .store
            .get(APPOINTMENTS, &appointment_id.to_string())
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?
            .ok_or(BookingError::NotFound)?;

        parse_appointment(record)
    }

    /// Appointments for one date, ordered by start time.
    pub async fn list_for_date(&self, date: &str) -> Result<Vec<Appointment>, BookingError> {
        parse_date_iso(date)?;
        debug!("Listing appointments for {}", date);

        let query = Query::new().filter_eq("date", date).order_asc("start_time");
        let rows = self
            .store
            .query(APPOINTMENTS, &query)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        rows.into_iter().map(parse_appointment).collect()
    }

    /// Sets the appointment status. Any status may move to any other; no
    /// transition graph is enforced here.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        debug!("Updating appointment {} to {}", appointment_id, new_status);

        let mut update_data = serde_json::Map::new();
        update_data.insert("status".to_string(), json!(new_status));
        update_data.insert("last_updated_at".to_string(), json!(self.clock.now_utc()));

        let updated = self
            .store
            .update(
                APPOINTMENTS,
                &appointment_id.to_string(),
                Value::Object(update_data),
            )
            .await
            .map_err(|e| match e {
                StoreError::NotFound => BookingError::NotFound,
                _ => BookingError::Store(e.to_string()),
            })?;

        info!("Appointment {} updated to {}", appointment_id, new_status);
        parse_appointment(updated)
    }
}

fn parse_appointment(record: Value) -> Result<Appointment, BookingError> {
    serde_json::from_value(record)
        .map_err(|e| BookingError::Store(format!("Failed to parse appointment: {}", e)))
}
