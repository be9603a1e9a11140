use std::collections::HashMap;

/// Which cached query families a mutation invalidates.
///
/// Keys are IPC method names; values are query-key prefixes. The contract is
/// deliberately static and visible in one place instead of being implied by
/// whoever happens to refetch after a mutation. A mutation not listed here
/// clears the whole cache.
const INVALIDATIONS: &[(&str, &[&str])] = &[
    ("classGroups.create", &["classGroups"]),
    (
        "classGroups.delete",
        &[
            "classGroups",
            "courses",
            "schedule.slots",
            "schedule.grid",
            "schedule.conflicts",
        ],
    ),
    ("subjects.create", &["subjects"]),
    ("subjects.delete", &["subjects", "courses"]),
    ("staff.create", &["staff"]),
    ("staff.delete", &["staff", "courses"]),
    (
        "courses.create",
        &["courses", "schedule.slots", "schedule.grid", "schedule.conflicts"],
    ),
    (
        "courses.update",
        &["courses", "schedule.slots", "schedule.grid", "schedule.conflicts"],
    ),
    (
        "courses.delete",
        &["courses", "schedule.slots", "schedule.grid", "schedule.conflicts"],
    ),
    (
        "schedule.slots.create",
        &["schedule.slots", "schedule.grid", "schedule.conflicts"],
    ),
    (
        "schedule.slots.update",
        &["schedule.slots", "schedule.grid", "schedule.conflicts"],
    ),
    (
        "schedule.slots.delete",
        &["schedule.slots", "schedule.grid", "schedule.conflicts"],
    ),
    (
        "schedule.grid.drop",
        &["schedule.slots", "schedule.grid", "schedule.conflicts"],
    ),
    // Re-running the check replaces the highlight set, so rendered grids
    // computed against the old set are stale too.
    (
        "schedule.conflicts.check",
        &["schedule.grid", "schedule.conflicts"],
    ),
];

pub fn dependents(mutation: &str) -> Option<&'static [&'static str]> {
    INVALIDATIONS
        .iter()
        .find(|(m, _)| *m == mutation)
        .map(|(_, deps)| *deps)
}

/// Process-level cache of query results, keyed by strings like
/// `schedule.grid/<classGroupId>/<geometry>`. Entirely best-effort: a miss
/// just recomputes from the database.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<String, serde_json::Value>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn invalidate_prefix(&mut self, prefix: &str) {
        self.entries.retain(|k, _| !k.starts_with(prefix));
    }

    /// Apply the invalidation table for a mutation that just succeeded.
    pub fn invalidate_for(&mut self, mutation: &str) {
        match dependents(mutation) {
            Some(prefixes) => {
                for p in prefixes {
                    self.invalidate_prefix(p);
                }
            }
            None => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slot_mutations_invalidate_grid_and_conflicts() {
        for m in [
            "schedule.slots.create",
            "schedule.slots.update",
            "schedule.slots.delete",
            "schedule.grid.drop",
        ] {
            let deps = dependents(m).expect("listed mutation");
            assert!(deps.contains(&"schedule.slots"), "{m}");
            assert!(deps.contains(&"schedule.grid"), "{m}");
            assert!(deps.contains(&"schedule.conflicts"), "{m}");
        }
    }

    #[test]
    fn invalidate_for_removes_only_dependent_keys() {
        let mut cache = QueryCache::new();
        cache.put("schedule.grid/cg-1/480/60", json!({ "days": [] }));
        cache.put("schedule.slots/cg-1", json!([]));
        cache.put("classGroups", json!([]));

        cache.invalidate_for("schedule.slots.create");

        assert!(cache.get("schedule.grid/cg-1/480/60").is_none());
        assert!(cache.get("schedule.slots/cg-1").is_none());
        assert!(cache.get("classGroups").is_some());
    }

    #[test]
    fn unknown_mutation_clears_everything() {
        let mut cache = QueryCache::new();
        cache.put("schedule.grid/cg-1/480/60", json!({}));
        cache.put("classGroups", json!([]));
        cache.invalidate_for("backup.import");
        assert_eq!(cache.len(), 0);
    }
}
