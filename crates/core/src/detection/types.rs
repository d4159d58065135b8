//! Detection result types.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::arr::MediaItem;
use crate::config::{LibraryServer, SanitizedServer};
use crate::search::SearchCategory;

fn serialize_server<S: Serializer>(server: &LibraryServer, s: S) -> Result<S::Ok, S::Error> {
    SanitizedServer::from(server).serialize(s)
}

/// What one server reported in a cycle.
///
/// A failed server has empty id lists and contributes nothing to totals.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    #[serde(serialize_with = "serialize_server")]
    pub server: LibraryServer,
    /// Missing item ids in remote page order.
    pub missing_ids: Vec<i64>,
    /// Cutoff-unmet item ids in remote page order.
    pub cutoff_ids: Vec<i64>,
    #[serde(skip)]
    pub missing_items: HashMap<i64, MediaItem>,
    #[serde(skip)]
    pub cutoff_items: HashMap<i64, MediaItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResult {
    /// Build a successful result. Duplicate ids keep their first position.
    pub fn success(server: LibraryServer, missing: Vec<MediaItem>, cutoff: Vec<MediaItem>) -> Self {
        let (missing_ids, missing_items) = index_items(missing);
        let (cutoff_ids, cutoff_items) = index_items(cutoff);
        Self {
            server,
            missing_ids,
            cutoff_ids,
            missing_items,
            cutoff_items,
            error: None,
        }
    }

    pub fn failure(server: LibraryServer, error: impl Into<String>) -> Self {
        Self {
            server,
            missing_ids: Vec::new(),
            cutoff_ids: Vec::new(),
            missing_items: HashMap::new(),
            cutoff_items: HashMap::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn server_name(&self) -> &str {
        &self.server.name
    }

    pub fn ids(&self, category: SearchCategory) -> &[i64] {
        match category {
            SearchCategory::Missing => &self.missing_ids,
            SearchCategory::Cutoff => &self.cutoff_ids,
        }
    }

    pub fn item(&self, category: SearchCategory, id: i64) -> Option<&MediaItem> {
        match category {
            SearchCategory::Missing => self.missing_items.get(&id),
            SearchCategory::Cutoff => self.cutoff_items.get(&id),
        }
    }
}

fn index_items(items: Vec<MediaItem>) -> (Vec<i64>, HashMap<i64, MediaItem>) {
    let mut ids = Vec::with_capacity(items.len());
    let mut lookup = HashMap::with_capacity(items.len());
    for item in items {
        let id = item.id();
        if lookup.contains_key(&id) {
            continue;
        }
        ids.push(id);
        lookup.insert(id, item);
    }
    (ids, lookup)
}

/// Aggregate detection output for a cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionResults {
    pub results: Vec<DetectionResult>,
    pub total_missing: usize,
    pub total_cutoff: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

impl DetectionResults {
    pub fn from_results(results: Vec<DetectionResult>) -> Self {
        let mut aggregate = Self::default();
        for result in results {
            aggregate.push(result);
        }
        aggregate
    }

    pub fn push(&mut self, result: DetectionResult) {
        if result.is_success() {
            self.success_count += 1;
            self.total_missing += result.missing_ids.len();
            self.total_cutoff += result.cutoff_ids.len();
        } else {
            self.failure_count += 1;
        }
        self.results.push(result);
    }

    pub fn total(&self, category: SearchCategory) -> usize {
        match category {
            SearchCategory::Missing => self.total_missing,
            SearchCategory::Cutoff => self.total_cutoff,
        }
    }
}
