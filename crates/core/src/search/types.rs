//! Types for search allocation and triggering.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arr::{MediaKind, ServerKind};

/// Search category: items with no file, or files below the quality cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Missing,
    Cutoff,
}

impl SearchCategory {
    pub const ALL: [SearchCategory; 2] = [SearchCategory::Missing, SearchCategory::Cutoff];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchCategory::Missing => "missing",
            SearchCategory::Cutoff => "cutoff",
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum searches per cycle, per category and item type. Zero disables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    #[serde(default = "default_missing_limit")]
    pub missing_movies: u32,
    #[serde(default = "default_missing_limit")]
    pub missing_episodes: u32,
    #[serde(default = "default_cutoff_limit")]
    pub cutoff_movies: u32,
    #[serde(default = "default_cutoff_limit")]
    pub cutoff_episodes: u32,
}

fn default_missing_limit() -> u32 {
    10
}

fn default_cutoff_limit() -> u32 {
    5
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            missing_movies: default_missing_limit(),
            missing_episodes: default_missing_limit(),
            cutoff_movies: default_cutoff_limit(),
            cutoff_episodes: default_cutoff_limit(),
        }
    }
}

impl SearchLimits {
    /// All limits set to zero.
    pub fn none() -> Self {
        Self {
            missing_movies: 0,
            missing_episodes: 0,
            cutoff_movies: 0,
            cutoff_episodes: 0,
        }
    }

    /// Limit for one category and item type.
    pub fn sub_limit(&self, category: SearchCategory, kind: MediaKind) -> u32 {
        match (category, kind) {
            (SearchCategory::Missing, MediaKind::Movie) => self.missing_movies,
            (SearchCategory::Missing, MediaKind::Episode) => self.missing_episodes,
            (SearchCategory::Cutoff, MediaKind::Movie) => self.cutoff_movies,
            (SearchCategory::Cutoff, MediaKind::Episode) => self.cutoff_episodes,
        }
    }

    /// Pooled limit for a category: movies plus episodes.
    pub fn for_category(&self, category: SearchCategory) -> u32 {
        self.sub_limit(category, MediaKind::Movie)
            .saturating_add(self.sub_limit(category, MediaKind::Episode))
    }
}

/// Outcome of one trigger call (one batch of one category on one server).
#[derive(Debug, Clone, Serialize)]
pub struct TriggerResult {
    pub server: String,
    pub server_kind: ServerKind,
    pub category: SearchCategory,
    /// Item ids submitted in this batch.
    pub item_ids: Vec<i64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The failure was the server signalling rate limiting.
    #[serde(default)]
    pub rate_limited: bool,
    /// Reported without any network call.
    #[serde(default)]
    pub dry_run: bool,
}

impl TriggerResult {
    pub fn succeeded(
        server: &str,
        server_kind: ServerKind,
        category: SearchCategory,
        item_ids: Vec<i64>,
        dry_run: bool,
    ) -> Self {
        Self {
            server: server.to_string(),
            server_kind,
            category,
            item_ids,
            success: true,
            error: None,
            rate_limited: false,
            dry_run,
        }
    }

    pub fn failed(
        server: &str,
        server_kind: ServerKind,
        category: SearchCategory,
        item_ids: Vec<i64>,
        error: String,
        rate_limited: bool,
    ) -> Self {
        Self {
            server: server.to_string(),
            server_kind,
            category,
            item_ids,
            success: false,
            error: Some(error),
            rate_limited,
            dry_run: false,
        }
    }
}

/// All trigger outcomes for a cycle with running totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TriggerResults {
    pub results: Vec<TriggerResult>,
    pub total_missing_triggered: usize,
    pub total_cutoff_triggered: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Servers skipped for the rest of the cycle after repeated rate limiting.
    pub rate_limited_servers: Vec<String>,
}

impl TriggerResults {
    pub fn record(&mut self, result: TriggerResult) {
        if result.success {
            self.success_count += 1;
            match result.category {
                SearchCategory::Missing => self.total_missing_triggered += result.item_ids.len(),
                SearchCategory::Cutoff => self.total_cutoff_triggered += result.item_ids.len(),
            }
        } else {
            self.failure_count += 1;
        }
        self.results.push(result);
    }

    pub fn total_triggered(&self) -> usize {
        self.total_missing_triggered + self.total_cutoff_triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_limits() {
        let limits = SearchLimits {
            missing_movies: 9,
            missing_episodes: 3,
            cutoff_movies: 0,
            cutoff_episodes: 2,
        };
        assert_eq!(limits.for_category(SearchCategory::Missing), 12);
        assert_eq!(limits.for_category(SearchCategory::Cutoff), 2);
        assert_eq!(limits.sub_limit(SearchCategory::Cutoff, MediaKind::Movie), 0);
        assert_eq!(SearchLimits::none().for_category(SearchCategory::Missing), 0);
    }

    #[test]
    fn test_limits_partial_deserialize_uses_defaults() {
        let limits: SearchLimits = toml::from_str("missing_movies = 1").unwrap();
        assert_eq!(limits.missing_movies, 1);
        assert_eq!(limits.missing_episodes, 10);
        assert_eq!(limits.cutoff_movies, 5);
    }

    #[test]
    fn test_trigger_results_totals() {
        let mut results = TriggerResults::default();
        results.record(TriggerResult::succeeded(
            "a",
            ServerKind::Radarr,
            SearchCategory::Missing,
            vec![1, 2, 3],
            false,
        ));
        results.record(TriggerResult::succeeded(
            "a",
            ServerKind::Radarr,
            SearchCategory::Cutoff,
            vec![4],
            false,
        ));
        results.record(TriggerResult::failed(
            "b",
            ServerKind::Sonarr,
            SearchCategory::Missing,
            vec![5, 6],
            "boom".to_string(),
            false,
        ));

        assert_eq!(results.total_missing_triggered, 3);
        assert_eq!(results.total_cutoff_triggered, 1);
        assert_eq!(results.total_triggered(), 4);
        assert_eq!(results.success_count, 2);
        assert_eq!(results.failure_count, 1);
        assert_eq!(results.results.len(), 3);
    }
}
