//! Catalog filtering and the per-request exercise name lookup.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use rally_db::models::{ExerciseRecord, Level};

/// Below this many goal matches the filter falls back to the full catalog.
pub const DEFAULT_MIN_CANDIDATES: usize = 10;

/// The projection of an exercise shown to the generative backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub title: String,
    pub goal: Option<Value>,
    pub level: Level,
    pub description: String,
}

impl From<&ExerciseRecord> for CatalogEntry {
    fn from(r: &ExerciseRecord) -> Self {
        Self {
            title: r.title.clone(),
            goal: r.goal.clone(),
            level: r.level,
            description: r.description.clone(),
        }
    }
}

/// Select the catalog records relevant to `goal`.
///
/// A record matches when its goal equals `goal` or, for list goals,
/// contains it. When fewer than `min_candidates` records match, the whole
/// catalog is returned instead: three tiers of seven days need a wide pool
/// more than they need goal precision. Records with a blank title are never
/// returned since nothing could reference them.
pub fn filter_catalog(
    goal: &str,
    catalog: &[ExerciseRecord],
    min_candidates: usize,
) -> Vec<ExerciseRecord> {
    let usable = catalog.iter().filter(|r| !r.title.trim().is_empty());

    let matching: Vec<ExerciseRecord> = usable
        .clone()
        .filter(|r| r.goal_value().matches(goal))
        .cloned()
        .collect();

    if matching.len() < min_candidates {
        tracing::debug!(
            goal,
            matched = matching.len(),
            min_candidates,
            "too few goal matches, using full catalog"
        );
        usable.cloned().collect()
    } else {
        matching
    }
}

/// Exercise title -> catalog id, built from exactly the records shown to the
/// backend for one request.
#[derive(Debug, Clone, Default)]
pub struct NameToIdMap {
    ids: HashMap<String, Uuid>,
    levels: HashMap<String, Level>,
}

impl NameToIdMap {
    pub fn from_records(records: &[ExerciseRecord]) -> Self {
        let mut map = Self::default();
        for r in records {
            map.ids.insert(r.title.clone(), r.id);
            map.levels.insert(r.title.clone(), r.level);
        }
        map
    }

    /// Resolve an exercise title. Matching is exact.
    pub fn resolve(&self, name: &str) -> Option<Uuid> {
        self.ids.get(name).copied()
    }

    /// Catalog tier of a title, if known.
    pub fn level_of(&self, name: &str) -> Option<Level> {
        self.levels.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
