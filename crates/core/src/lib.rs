pub mod activity;
pub mod arr;
pub mod config;
pub mod context;
pub mod detection;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
pub mod search;
pub mod testing;

pub use activity::{
    create_activity_system, ActivityError, ActivityEvent, ActivityFilter, ActivityHandle,
    ActivityLog, ActivityRecord, ActivityStore, ActivityWriter, NoopActivityLog,
    SqliteActivityStore,
};
pub use arr::{
    ArrClient, ArrError, ClientFactory, HttpClientFactory, MediaItem, MediaKind, ServerKind,
    SystemStatus,
};
pub use config::{
    load_config, load_config_from_str, validate_automation, validate_config, Config, ConfigError,
    LibraryServer, SanitizedConfig, SettingsProvider, SharedSettings,
};
pub use context::{CycleContext, EngineError};
pub use detection::{ArrDetector, DetectionResult, DetectionResults, Detector};
pub use orchestrator::{
    AutomationConfig, AutomationOrchestrator, CycleFailure, CycleResult, CycleRunner, CycleSummary,
};
pub use scheduler::{CycleScheduler, SchedulerError, SchedulerState, SchedulerStatus};
pub use search::{
    ArrSearchTrigger, SearchCategory, SearchLimits, SearchTrigger, TriggerResult, TriggerResults,
};
