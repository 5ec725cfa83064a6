use std::path::PathBuf;

use dashmap::DashMap;

use super::result::GroupComparisonResult;
use crate::error::{KontrastError, Result};

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Persistent store for comparison verdicts, one JSON file per verdict.
///
/// Verdicts are historical snapshots: re-running a comparison appends a new
/// row, there is no deduplication per group pair.
pub struct ComparisonStore {
    results: DashMap<String, GroupComparisonResult>,
    dir: PathBuf,
}

impl ComparisonStore {
    pub fn new(data_dir: &std::path::Path) -> Result<Self> {
        let dir = data_dir.join(".comparisons");
        std::fs::create_dir_all(&dir)?;
        let store = Self {
            results: DashMap::new(),
            dir,
        };
        store.load_all()?;
        Ok(store)
    }

    fn load_all(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            // In-flight `{id}.json.tmp` files have extension `tmp` and are
            // excluded here along with everything else non-json.
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let data = std::fs::read_to_string(&path)?;
                let result: GroupComparisonResult = serde_json::from_str(&data)?;
                result.validate()?;
                self.results.insert(result.id.clone(), result);
            }
        }
        Ok(())
    }

    fn atomic_write(&self, result: &GroupComparisonResult) -> Result<()> {
        let tmp_path = self.dir.join(format!("{}.json.tmp", result.id));
        let final_path = self.dir.join(format!("{}.json", result.id));
        let data = serde_json::to_string_pretty(result)?;
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn save(&self, result: GroupComparisonResult) -> Result<GroupComparisonResult> {
        result.validate()?;
        if self.results.contains_key(&result.id) {
            return Err(KontrastError::AlreadyExists(result.id));
        }
        self.atomic_write(&result)?;
        self.results.insert(result.id.clone(), result.clone());
        Ok(result)
    }

    pub fn get(&self, id: &str) -> Result<GroupComparisonResult> {
        self.results
            .get(id)
            .map(|r| r.clone())
            .ok_or_else(|| KontrastError::ResultNotFound(id.to_string()))
    }

    /// All verdicts owned by `author_id`, newest first.
    pub fn find_by_author(&self, author_id: &str) -> Vec<GroupComparisonResult> {
        let mut results: Vec<GroupComparisonResult> = self
            .results
            .iter()
            .filter(|entry| entry.value().author_id == author_id)
            .map(|entry| entry.value().clone())
            .collect();
        // Newest first; id tie-break keeps the order deterministic for
        // verdicts minted in the same millisecond.
        results.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        results
    }

    /// Delete one verdict, but only for its author.
    pub fn delete_by_id(&self, id: &str, requesting_author_id: &str) -> Result<()> {
        let result = self.get(id)?;
        if result.author_id != requesting_author_id {
            return Err(KontrastError::Forbidden(format!(
                "comparison result {} belongs to another author",
                id
            )));
        }
        let path = self.dir.join(format!("{}.json", id));
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        self.results.remove(id);
        Ok(())
    }

    /// Delete every verdict owned by `author_id`; returns the deleted count.
    pub fn delete_all_by_author(&self, author_id: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .results
            .iter()
            .filter(|entry| entry.value().author_id == author_id)
            .map(|entry| entry.key().clone())
            .collect();
        for id in &ids {
            let path = self.dir.join(format!("{}.json", id));
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            self.results.remove(id);
        }
        Ok(ids.len())
    }
}
