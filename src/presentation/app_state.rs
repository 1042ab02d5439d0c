// Application state for HTTP handlers
use crate::application::metadata_repository::LatestValueSource;
use crate::application::resolution_service::ResolutionService;
use std::sync::Arc;

pub struct AppState {
    pub resolution_service: ResolutionService,
    pub latest_values: Arc<dyn LatestValueSource>,
}
