use std::sync::Arc;

use herald_core::Settings;
use herald_notify::Dispatcher;
use herald_routing::Coordinator;

pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub dispatcher: Arc<Dispatcher>,
    pub settings: Settings,
}
