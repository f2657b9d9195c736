// libs/booking-cell/tests/reservation_test.rs
//
// Reservation protocol tests against the in-memory store, whose
// create-if-absent has the same single-winner semantics as the real store's
// unique-key constraint.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use serde_json::json;

use booking_cell::models::{
    AppointmentStatus, BookingError, ClinicSettings, CreateAppointmentRequest, TimeWindow,
};
use booking_cell::services::reservation::ReservationService;
use booking_cell::services::window::{Clock, FixedClock};
use booking_cell::services::{APPOINTMENTS, RESERVATION_MARKERS};
use shared_database::{MemoryStore, Query, RecordStore};

// ==============================================================================
// TEST FIXTURES
// ==============================================================================

fn test_settings() -> ClinicSettings {
    ClinicSettings {
        slot_minutes: 15,
        timezone: "UTC".to_string(),
        utc_offset_minutes: 0,
        work_hours: TimeWindow {
            start: "09:00".to_string(),
            end: "10:00".to_string(),
        },
        breaks: Vec::new(),
        max_days_ahead: 30,
    }
}

fn test_clock() -> Arc<dyn Clock> {
    let instant = DateTime::parse_from_rfc3339("2024-01-10T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    Arc::new(FixedClock(instant))
}

fn booking_request(start_time: &str, patient_name: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        date: "2024-01-10".to_string(),
        start_time: start_time.to_string(),
        patient_name: patient_name.to_string(),
        phone: "+1 555 0100".to_string(),
        reason: Some("Checkup".to_string()),
    }
}

fn service_for(store: &Arc<MemoryStore>) -> ReservationService {
    let dyn_store: Arc<dyn RecordStore> = store.clone();
    ReservationService::new(dyn_store, test_clock())
}

async fn active_appointments_for(store: &MemoryStore, slot_key: &str) -> usize {
    let query = Query::new().filter_eq("slot_key", slot_key).filter_in(
        "status",
        vec![
            AppointmentStatus::Booked.to_string(),
            AppointmentStatus::Completed.to_string(),
        ],
    );
    store.query(APPOINTMENTS, &query).await.unwrap().len()
}

// ==============================================================================
// TESTS
// ==============================================================================

#[tokio::test]
async fn books_a_free_slot() {
    let store = Arc::new(MemoryStore::new());
    let service = service_for(&store);

    let response = service
        .reserve(&test_settings(), &booking_request("09:15", "Jane Doe"))
        .await
        .unwrap();

    assert_eq!(response.slot_key, "2024-01-10_09:15");

    let marker = store
        .get(RESERVATION_MARKERS, "2024-01-10_09:15")
        .await
        .unwrap();
    assert!(marker.is_some());

    let appointment = store
        .get(APPOINTMENTS, &response.appointment_id.to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(appointment["status"], "booked");
    assert_eq!(appointment["source"], "patient");
    assert_eq!(appointment["start_time"], "09:15");
    assert_eq!(appointment["end_time"], "09:30");
    assert_eq!(appointment["slot_key"], "2024-01-10_09:15");
}

#[tokio::test]
async fn concurrent_claims_on_one_slot_admit_exactly_one() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(service_for(&store));

    let mut handles = Vec::new();
    for i in 0..12 {
        let service = Arc::clone(&service);
        let settings = test_settings();
        handles.push(tokio::spawn(async move {
            let request = booking_request("09:15", &format!("Patient {}", i));
            service.reserve(&settings, &request).await
        }));
    }

    let mut successes = Vec::new();
    let mut taken = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(response) => successes.push(response),
            Err(BookingError::SlotTaken) => taken += 1,
            Err(other) => panic!("unexpected reservation error: {}", other),
        }
    }

    assert_eq!(successes.len(), 1);
    assert_eq!(taken, 11);
    assert_eq!(active_appointments_for(&store, "2024-01-10_09:15").await, 1);
}

#[tokio::test]
async fn second_booking_of_same_slot_fails_with_slot_taken() {
    let store = Arc::new(MemoryStore::new());
    let service = service_for(&store);
    let settings = test_settings();

    service
        .reserve(&settings, &booking_request("09:00", "Jane Doe"))
        .await
        .unwrap();

    let result = service
        .reserve(&settings, &booking_request("09:00", "John Roe"))
        .await;

    assert_matches!(result, Err(BookingError::SlotTaken));
    assert_eq!(active_appointments_for(&store, "2024-01-10_09:00").await, 1);
}

#[tokio::test]
async fn off_grid_start_time_is_rejected_regardless_of_availability() {
    let store = Arc::new(MemoryStore::new());
    let service = service_for(&store);

    let result = service
        .reserve(&test_settings(), &booking_request("09:05", "Jane Doe"))
        .await;

    assert_matches!(result, Err(BookingError::InvalidSlot));
    assert_eq!(store.record_count(RESERVATION_MARKERS), 0);
}

#[tokio::test]
async fn work_end_boundary_is_not_a_slot() {
    let store = Arc::new(MemoryStore::new());
    let service = service_for(&store);

    let result = service
        .reserve(&test_settings(), &booking_request("10:00", "Jane Doe"))
        .await;

    assert_matches!(result, Err(BookingError::InvalidSlot));
}

#[tokio::test]
async fn dates_outside_the_window_are_rejected() {
    let store = Arc::new(MemoryStore::new());
    let service = service_for(&store);
    let settings = test_settings();

    let mut past = booking_request("09:00", "Jane Doe");
    past.date = "2024-01-09".to_string();
    assert_matches!(
        service.reserve(&settings, &past).await,
        Err(BookingError::DateOutOfRange { .. })
    );

    let mut beyond = booking_request("09:00", "Jane Doe");
    beyond.date = "2024-02-10".to_string();
    assert_matches!(
        service.reserve(&settings, &beyond).await,
        Err(BookingError::DateOutOfRange { .. })
    );

    assert_eq!(store.record_count(RESERVATION_MARKERS), 0);
}

#[tokio::test]
async fn pre_existing_marker_wins_even_without_an_appointment() {
    let store = Arc::new(MemoryStore::new());
    store
        .create(
            RESERVATION_MARKERS,
            "2024-01-10_09:30",
            json!({ "slot_key": "2024-01-10_09:30", "created_at": "2024-01-09T12:00:00Z" }),
        )
        .await
        .unwrap();

    let service = service_for(&store);
    let result = service
        .reserve(&test_settings(), &booking_request("09:30", "Jane Doe"))
        .await;

    assert_matches!(result, Err(BookingError::SlotTaken));
    assert_eq!(store.record_count(APPOINTMENTS), 0);
}

#[tokio::test]
async fn failed_appointment_write_rolls_the_marker_back() {
    let store = Arc::new(MemoryStore::new());
    store.fail_creates_in(APPOINTMENTS);

    let service = service_for(&store);
    let result = service
        .reserve(&test_settings(), &booking_request("09:45", "Jane Doe"))
        .await;

    assert_matches!(result, Err(BookingError::Store(_)));

    // No partial marker/appointment pair survives.
    let marker = store
        .get(RESERVATION_MARKERS, "2024-01-10_09:45")
        .await
        .unwrap();
    assert!(marker.is_none());
    assert_eq!(store.record_count(APPOINTMENTS), 0);
}
