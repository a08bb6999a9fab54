//! Grouping of containers into eviction units.
//!
//! An eviction unit is every candidate container sharing a (pod UID,
//! container name) key, i.e. the successive instances of one logical
//! container. Units are rebuilt from scratch on every pass.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::runtime::Container;

/// Identifies one logical container across restarts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey {
    pub pod_uid: String,
    pub name: String,
}

/// Instances of one logical container, newest first.
#[derive(Debug, Default)]
pub struct EvictionUnit<'a> {
    kept: Vec<&'a Container>,
}

impl<'a> EvictionUnit<'a> {
    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    /// Entries still kept, newest first
    pub fn kept(&self) -> &[&'a Container] {
        &self.kept
    }

    /// Keep at most `limit` newest entries and return the trimmed (older) ones.
    /// A unit already at or below `limit` is left untouched.
    pub fn trim_to(&mut self, limit: usize) -> Vec<&'a Container> {
        if self.kept.len() <= limit {
            return Vec::new();
        }
        self.kept.split_off(limit)
    }
}

/// All eviction units of one pass, in deterministic key order.
#[derive(Debug, Default)]
pub struct EvictionUnits<'a> {
    units: BTreeMap<UnitKey, EvictionUnit<'a>>,
}

impl<'a> EvictionUnits<'a> {
    /// Group `candidates` by (pod UID, container name) and order each group
    /// newest first.
    pub fn build(candidates: impl IntoIterator<Item = &'a Container>) -> Self {
        let mut units: BTreeMap<UnitKey, EvictionUnit<'a>> = BTreeMap::new();
        for container in candidates {
            let key = UnitKey {
                pod_uid: container.pod_uid.clone(),
                name: container.name.clone(),
            };
            units.entry(key).or_default().kept.push(container);
        }
        for unit in units.values_mut() {
            unit.kept.sort_by(|a, b| newest_first(a, b));
        }
        Self { units }
    }

    /// Number of units with at least one kept entry
    pub fn unit_count(&self) -> usize {
        self.units.values().filter(|u| !u.is_empty()).count()
    }

    /// Total kept entries across all units
    pub fn kept_count(&self) -> usize {
        self.units.values().map(EvictionUnit::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnitKey, &EvictionUnit<'a>)> {
        self.units.iter()
    }

    /// Trim every unit to `limit` entries, returning everything trimmed.
    pub fn trim_each_to(&mut self, limit: usize) -> Vec<&'a Container> {
        self.units
            .values_mut()
            .flat_map(|unit| unit.trim_to(limit))
            .collect()
    }

    /// Drop the `count` oldest kept entries across all units and return them.
    pub fn evict_oldest(&mut self, count: usize) -> Vec<&'a Container> {
        if count == 0 {
            return Vec::new();
        }

        let mut all: Vec<&'a Container> = self
            .units
            .values()
            .flat_map(|unit| unit.kept.iter().copied())
            .collect();
        all.sort_by(|a, b| newest_first(b, a));
        all.truncate(count);

        for unit in self.units.values_mut() {
            unit.kept
                .retain(|kept| !all.iter().any(|evicted| evicted.id == kept.id));
        }
        all
    }
}

/// Recency order: later creation first, then higher attempt, then id.
/// The id makes ties between identical timestamps deterministic.
pub fn newest_first(a: &Container, b: &Container) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.attempt.cmp(&a.attempt))
        .then_with(|| b.id.cmp(&a.id))
}
