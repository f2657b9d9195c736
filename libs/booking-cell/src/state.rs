use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::RecordStore;

use crate::services::window::Clock;

/// Request-scoped collaborators shared across handlers. The cell itself
/// holds no mutable state; every operation loads what it needs per request.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn RecordStore>,
    pub clock: Arc<dyn Clock>,
}
