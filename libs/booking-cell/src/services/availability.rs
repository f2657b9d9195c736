// libs/booking-cell/src/services/availability.rs
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use shared_database::{in_batches, Query, RecordStore};

use crate::models::{AppointmentStatus, BookingError, Slot, SlotAvailability};
use crate::services::{APPOINTMENTS, RESERVATION_MARKERS};

pub struct AvailabilityService {
    store: Arc<dyn RecordStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Annotates generated slots with their current availability: a slot is
    /// free iff its key has no reservation marker and no active appointment.
    /// Read-only best-effort snapshot; the reservation path re-validates
    /// against the store at claim time. Input order is preserved.
    pub async fn resolve(&self, slots: Vec<Slot>) -> Result<Vec<SlotAvailability>, BookingError> {
        let keys: Vec<String> = slots.iter().map(|slot| slot.key.clone()).collect();
        let limit = self.store.max_keys_per_batch();

        let marker_rows = in_batches(&keys, limit, |chunk| {
            self.store.get_many(RESERVATION_MARKERS, chunk)
        })
        .await
        .map_err(|e| BookingError::Store(e.to_string()))?;

        let mut taken: HashSet<String> = marker_rows
            .iter()
            .filter_map(|row| row.get("slot_key").and_then(|v| v.as_str()))
            .map(String::from)
            .collect();

        let appointment_rows = in_batches(&keys, limit, |chunk| async move {
            let query = Query::new()
                .filter_in("slot_key", chunk.to_vec())
                .filter_in(
                    "status",
                    vec![
                        AppointmentStatus::Booked.to_string(),
                        AppointmentStatus::Completed.to_string(),
                    ],
                );
            self.store.query(APPOINTMENTS, &query).await
        })
        .await
        .map_err(|e| BookingError::Store(e.to_string()))?;

        taken.extend(
            appointment_rows
                .iter()
                .filter_map(|row| row.get("slot_key").and_then(|v| v.as_str()))
                .map(String::from),
        );

        debug!("{} of {} slots taken", taken.len(), slots.len());

        Ok(slots
            .into_iter()
            .map(|slot| {
                let available = !taken.contains(&slot.key);
                SlotAvailability {
                    key: slot.key,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    available,
                }
            })
            .collect())
    }
}
