// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn booking_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/availability", get(handlers::get_availability))
        .route("/appointments", post(handlers::create_appointment))
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route(
            "/appointments/{appointment_id}/status",
            patch(handlers::update_appointment_status),
        )
        .with_state(state)
}
