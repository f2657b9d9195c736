// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{BookingError, CreateAppointmentRequest, UpdateStatusRequest};
use crate::services::availability::AvailabilityService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::reservation::ReservationService;
use crate::services::settings::SettingsService;
use crate::services::slots::generate_slots;
use crate::services::window::{parse_date_iso, validate_booking_date};
use crate::state::AppState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct DateQueryParams {
    pub date: String,
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateQueryParams>,
) -> Result<Json<Value>, AppError> {
    // Reject malformed input before touching the store.
    parse_date_iso(&params.date).map_err(map_booking_error)?;

    let settings = SettingsService::new(Arc::clone(&state.store))
        .load()
        .await
        .map_err(map_booking_error)?;

    validate_booking_date(&params.date, &settings, state.clock.as_ref())
        .map_err(map_booking_error)?;

    let slots = generate_slots(
        &params.date,
        &settings.work_hours,
        &settings.breaks,
        settings.slot_minutes,
    );

    let slots = AvailabilityService::new(Arc::clone(&state.store))
        .resolve(slots)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "date": params.date,
        "slot_minutes": settings.slot_minutes,
        "slots": slots
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    validate_create_request(&request).map_err(map_booking_error)?;

    let settings = SettingsService::new(Arc::clone(&state.store))
        .load()
        .await
        .map_err(map_booking_error)?;

    let reservation =
        ReservationService::new(Arc::clone(&state.store), Arc::clone(&state.clock));

    let response = reservation
        .reserve(&settings, &request)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": response.appointment_id,
        "slot_key": response.slot_key,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let lifecycle =
        AppointmentLifecycleService::new(Arc::clone(&state.store), Arc::clone(&state.clock));

    let appointment = lifecycle
        .get_appointment(appointment_id)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(appointment)))
}

/// Daily schedule view for clinic staff.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateQueryParams>,
) -> Result<Json<Value>, AppError> {
    let lifecycle =
        AppointmentLifecycleService::new(Arc::clone(&state.store), Arc::clone(&state.clock));

    let appointments = lifecycle
        .list_for_date(&params.date)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "date": params.date,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle =
        AppointmentLifecycleService::new(Arc::clone(&state.store), Arc::clone(&state.clock));

    let appointment = lifecycle
        .update_status(appointment_id, request.status)
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

// ==============================================================================
// BOUNDARY VALIDATION
// ==============================================================================

fn validate_create_request(request: &CreateAppointmentRequest) -> Result<(), BookingError> {
    parse_date_iso(&request.date)?;

    let time_regex = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();
    if !time_regex.is_match(&request.start_time) {
        return Err(BookingError::InvalidTime(request.start_time.clone()));
    }

    if request.patient_name.trim().chars().count() < 2 {
        return Err(BookingError::InvalidName);
    }

    let phone = request.phone.trim();
    let phone_regex = Regex::new(r"^\+?[\d\s\-]+$").unwrap();
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !phone_regex.is_match(phone) || !(7..=15).contains(&digits) {
        return Err(BookingError::InvalidPhone);
    }

    if let Some(reason) = &request.reason {
        if reason.chars().count() > 500 {
            return Err(BookingError::InvalidReason);
        }
    }

    Ok(())
}

fn map_booking_error(error: BookingError) -> AppError {
    match error {
        BookingError::SlotTaken => AppError::Conflict(error.to_string()),
        BookingError::NotFound => AppError::NotFound(error.to_string()),
        BookingError::ConfigMissing => AppError::Internal(error.to_string()),
        BookingError::Store(msg) => AppError::Database(msg),
        BookingError::InvalidDate(_)
        | BookingError::InvalidTime(_)
        | BookingError::InvalidName
        | BookingError::InvalidPhone
        | BookingError::InvalidReason
        | BookingError::DateOutOfRange { .. }
        | BookingError::InvalidSlot => AppError::BadRequest(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(date: &str, start_time: &str, name: &str, phone: &str) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            date: date.to_string(),
            start_time: start_time.to_string(),
            patient_name: name.to_string(),
            phone: phone.to_string(),
            reason: None,
        }
    }

    #[test]
    fn accepts_well_formed_input() {
        assert!(validate_create_request(&request("2024-01-10", "09:00", "Jane Doe", "+49 170 1234567")).is_ok());
        assert!(validate_create_request(&request("2024-01-10", "23:45", "Li", "1234567")).is_ok());
    }

    #[test]
    fn rejects_bad_times() {
        for time in ["9:00", "24:00", "09:60", "0900", "09:00:00"] {
            assert!(matches!(
                validate_create_request(&request("2024-01-10", time, "Jane", "1234567")),
                Err(BookingError::InvalidTime(_))
            ));
        }
    }

    #[test]
    fn rejects_short_names() {
        assert!(matches!(
            validate_create_request(&request("2024-01-10", "09:00", " J ", "1234567")),
            Err(BookingError::InvalidName)
        ));
    }

    #[test]
    fn rejects_bad_phones() {
        for phone in ["123456", "1234567890123456", "call me", "+49-abc-123"] {
            assert!(matches!(
                validate_create_request(&request("2024-01-10", "09:00", "Jane", phone)),
                Err(BookingError::InvalidPhone)
            ));
        }
    }

    #[test]
    fn rejects_oversized_reason() {
        let mut req = request("2024-01-10", "09:00", "Jane", "1234567");
        req.reason = Some("x".repeat(501));
        assert!(matches!(
            validate_create_request(&req),
            Err(BookingError::InvalidReason)
        ));
    }
}
