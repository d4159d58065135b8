//! Search allocation and triggering.
//!
//! Per-cycle limits are split across servers in proportion to how many items
//! each reported, then submitted as batched search commands.

mod allocation;
mod trigger;
mod types;

pub use allocation::{largest_remainder, plan_allocations, ServerAllocation};
pub use trigger::{
    ArrSearchTrigger, SearchTrigger, DEFAULT_BATCH_SIZE, DEFAULT_CALL_DELAY,
    MAX_CONSECUTIVE_RATE_LIMITS,
};
pub use types::{SearchCategory, SearchLimits, TriggerResult, TriggerResults};
