//! Shared state passed to all API handlers

use std::sync::{Arc, RwLock};

use crate::monitor::MonitorService;
use crate::settings::Settings;
use crate::storage::MonitorStore;

/// Shared state passed to all API handlers
///
/// Everything here is a cheap handle; cloning the state clones `Arc`s.
#[derive(Clone)]
pub struct ApiState {
    /// The durable store, shared with the scheduler
    pub store: Arc<dyn MonitorStore>,

    /// The single process-wide scheduler instance
    pub monitor: Arc<MonitorService>,

    /// Current settings; PUT /settings swaps this in place
    pub settings: Arc<RwLock<Settings>>,
}

impl ApiState {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        monitor: Arc<MonitorService>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            monitor,
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// A point-in-time copy of the current settings
    pub fn settings_snapshot(&self) -> Settings {
        self.settings
            .read()
            .expect("settings lock poisoned")
            .clone()
    }
}
