pub mod availability;
pub mod lifecycle;
pub mod reservation;
pub mod settings;
pub mod slots;
pub mod window;

pub use availability::AvailabilityService;
pub use lifecycle::AppointmentLifecycleService;
pub use reservation::ReservationService;
pub use settings::SettingsService;

/// Persisted collections the cell depends on.
pub const RESERVATION_MARKERS: &str = "reservation_markers";
pub const APPOINTMENTS: &str = "appointments";
pub const CLINIC_SETTINGS: &str = "clinic_settings";
