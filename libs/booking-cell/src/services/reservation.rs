// libs/booking-cell/src/services/reservation.rs
//
// Exclusive slot reservation. The reservation marker is the single-writer
// primitive: its create-if-absent write is atomic in the store, so under
// concurrent attempts on one slot key at most one claim can ever commit.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_database::{RecordStore, StoreError};

use crate::models::{
    Appointment, AppointmentSource, AppointmentStatus, BookingError, ClinicSettings,
    CreateAppointmentRequest, CreateAppointmentResponse, ReservationMarker, Slot,
};
use crate::services::slots::generate_slots;
use crate::services::window::{validate_booking_date, Clock};
use crate::services::{APPOINTMENTS, RESERVATION_MARKERS};

pub struct ReservationService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    max_claim_attempts: u32,
}

impl ReservationService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            max_claim_attempts: 3,
        }
    }

    /// Books one slot exclusively. Validates the date against the booking
    /// window, re-derives the slot grid to resolve the requested start time
    /// (caller-supplied bounds are never trusted), then runs the claim
    /// protocol: read marker, create-if-absent marker, write appointment.
    /// A concurrent loser either observes the marker on its read or has its
    /// create rejected, re-checks, and fails with `SlotTaken`.
    pub async fn reserve(
        &self,
        settings: &ClinicSettings,
        request: &CreateAppointmentRequest,
    ) -> Result<CreateAppointmentResponse, BookingError> {
        let date = validate_booking_date(&request.date, settings, self.clock.as_ref())?;

        let slot = generate_slots(
            &request.date,
            &settings.work_hours,
            &settings.breaks,
            settings.slot_minutes,
        )
        .into_iter()
        .find(|slot| slot.start_time == request.start_time)
        .ok_or(BookingError::InvalidSlot)?;

        for attempt in 1..=self.max_claim_attempts {
            debug!("Claim attempt {} for slot {}", attempt, slot.key);

            let existing = self
                .store
                .get(RESERVATION_MARKERS, &slot.key)
                .await
                .map_err(|e| BookingError::Store(e.to_string()))?;
            if existing.is_some() {
                info!("Slot {} already claimed", slot.key);
                return Err(BookingError::SlotTaken);
            }

            let marker = ReservationMarker {
                slot_key: slot.key.clone(),
                created_at: self.clock.now_utc(),
            };
            let marker_doc = serde_json::to_value(&marker)
                .map_err(|e| BookingError::Store(e.to_string()))?;

            match self
                .store
                .create(RESERVATION_MARKERS, &slot.key, marker_doc)
                .await
            {
                Ok(()) => return self.write_appointment(&slot, date, request).await,
                Err(StoreError::AlreadyExists) => {
                    // A concurrent claimant won the create; the re-read on
                    // the next attempt observes their marker.
                    warn!("Concurrent claim on slot {}, re-checking", slot.key);
                }
                Err(e) => return Err(BookingError::Store(e.to_string())),
            }
        }

        Err(BookingError::SlotTaken)
    }

    async fn write_appointment(
        &self,
        slot: &Slot,
        date: chrono::NaiveDate,
        request: &CreateAppointmentRequest,
    ) -> Result<CreateAppointmentResponse, BookingError> {
        let id = Uuid::new_v4();
        let now = self.clock.now_utc();

        let appointment = Appointment {
            id,
            date,
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            status: AppointmentStatus::Booked,
            patient_name: request.patient_name.trim().to_string(),
            phone: request.phone.trim().to_string(),
            reason: request.reason.clone(),
            source: AppointmentSource::Patient,
            slot_key: slot.key.clone(),
            created_at: now,
            last_updated_at: now,
        };

        let document =
            serde_json::to_value(&appointment).map_err(|e| BookingError::Store(e.to_string()))?;

        if let Err(e) = self.store.create(APPOINTMENTS, &id.to_string(), document).await {
            // The claim must not outlive a failed appointment write: roll the
            // marker back so no partial marker/appointment pair survives.
            if let Err(cleanup) = self.store.delete(RESERVATION_MARKERS, &slot.key).await {
                error!(
                    "Failed to roll back marker for slot {}: {}",
                    slot.key, cleanup
                );
            }
            return Err(BookingError::Store(e.to_string()));
        }

        info!("Appointment {} booked for slot {}", id, slot.key);

        Ok(CreateAppointmentResponse {
            appointment_id: id,
            slot_key: slot.key.clone(),
        })
    }
}
