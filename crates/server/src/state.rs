use std::sync::Arc;

use sweeparr_core::{
    ActivityStore, ClientFactory, Config, CycleScheduler, SanitizedConfig, SettingsProvider,
    SharedSettings,
};

/// Shared application state
pub struct AppState {
    config: Config,
    settings: Arc<SharedSettings>,
    scheduler: Arc<CycleScheduler>,
    activity_store: Arc<dyn ActivityStore>,
    client_factory: Arc<dyn ClientFactory>,
}

impl AppState {
    pub fn new(
        config: Config,
        settings: Arc<SharedSettings>,
        scheduler: Arc<CycleScheduler>,
        activity_store: Arc<dyn ActivityStore>,
        client_factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            config,
            settings,
            scheduler,
            activity_store,
            client_factory,
        }
    }

    /// Startup config with the live automation settings and server list
    /// folded in, secrets redacted.
    pub fn sanitized_config(&self) -> SanitizedConfig {
        let mut config = self.config.clone();
        config.automation = self.settings.automation();
        config.servers = self.settings.servers();
        SanitizedConfig::from(&config)
    }

    pub fn settings(&self) -> &Arc<SharedSettings> {
        &self.settings
    }

    pub fn scheduler(&self) -> &Arc<CycleScheduler> {
        &self.scheduler
    }

    pub fn activity_store(&self) -> &dyn ActivityStore {
        self.activity_store.as_ref()
    }

    pub fn client_factory(&self) -> &dyn ClientFactory {
        self.client_factory.as_ref()
    }
}
