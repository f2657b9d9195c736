// libs/booking-cell/src/services/settings.rs
use std::sync::Arc;

use tracing::debug;

use shared_database::RecordStore;

use crate::models::{BookingError, ClinicSettings};
use crate::services::CLINIC_SETTINGS;

/// Key of the singleton configuration record.
pub const SETTINGS_KEY: &str = "default";

pub struct SettingsService {
    store: Arc<dyn RecordStore>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Loads the clinic configuration. A missing record is an operator
    /// misconfiguration and fatal for the request.
    pub async fn load(&self) -> Result<ClinicSettings, BookingError> {
        debug!("Loading clinic settings");

        let record = self
            .store
            .get(CLINIC_SETTINGS, SETTINGS_KEY)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?
            .ok_or(BookingError::ConfigMissing)?;

        serde_json::from_value(record)
            .map_err(|e| BookingError::Store(format!("Failed to parse clinic settings: {}", e)))
    }
}
