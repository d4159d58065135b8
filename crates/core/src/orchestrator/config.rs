//! Automation configuration.

use serde::{Deserialize, Serialize};

use crate::search::SearchLimits;

/// Settings for automated cycles. Re-read at the start of every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Start the scheduler at boot.
    /// When disabled, cycles only run when triggered via API.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between the end of one scheduled cycle and the next.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Detect and allocate, but never send search commands.
    #[serde(default)]
    pub dry_run: bool,

    /// Ids per search command (0 = one command per server and category).
    #[serde(default = "default_batch_size")]
    pub trigger_batch_size: usize,

    /// Pause between successive search commands (milliseconds).
    #[serde(default = "default_trigger_delay")]
    pub trigger_delay_ms: u64,

    /// Per-cycle search limits.
    #[serde(default)]
    pub limits: SearchLimits,
}

fn default_interval() -> u64 {
    900 // 15 minutes
}

fn default_batch_size() -> usize {
    0
}

fn default_trigger_delay() -> u64 {
    100
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            dry_run: false,
            trigger_batch_size: default_batch_size(),
            trigger_delay_ms: default_trigger_delay(),
            limits: SearchLimits::default(),
        }
    }
}
