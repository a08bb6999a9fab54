//! Container eviction policy.
//!
//! Given a snapshot of containers, decide which ones to delete. The decision
//! is computed entirely before any deletion is issued.

use std::time::SystemTime;

use tracing::{debug, trace};

use super::GcPolicy;
use super::units::EvictionUnits;
use crate::runtime::{Container, age};

/// Containers eligible for eviction: not running and at least `min_age` old.
///
/// Containers of deleted pods are filtered exactly like any other.
pub fn evictable<'a>(
    containers: &'a [Container],
    policy: &GcPolicy,
    now: SystemTime,
) -> Vec<&'a Container> {
    containers
        .iter()
        .filter(|c| !c.is_running())
        .filter(|c| age(now, c.created_at) >= policy.min_age)
        .collect()
}

/// Select the containers to delete under `policy`.
///
/// The returned list holds per-unit trims first, then fairness trims, then
/// the globally oldest entries, each at most once.
pub fn select_containers<'a>(
    containers: &'a [Container],
    policy: &GcPolicy,
    now: SystemTime,
) -> Vec<&'a Container> {
    let candidates = evictable(containers, policy, now);
    let mut units = EvictionUnits::build(candidates);
    let mut evicted = Vec::new();

    if let Some(per_unit) = policy.per_pod_limit() {
        evicted.extend(units.trim_each_to(per_unit));
    }

    if let Some(max) = policy.global_limit() {
        let remaining = units.kept_count();
        if remaining > max {
            let unit_count = units.unit_count().max(1);
            let fair_share = (max / unit_count).max(1);
            debug!(remaining, max, unit_count, fair_share, "gc:applying fairness cap");
            evicted.extend(units.trim_each_to(fair_share));

            let remaining = units.kept_count();
            if remaining > max {
                evicted.extend(units.evict_oldest(remaining - max));
            }
        }
    }

    for (key, unit) in units.iter() {
        trace!(
            pod_uid = %key.pod_uid,
            name = %key.name,
            kept = ?unit.kept().iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            "gc:unit retained"
        );
    }
    debug!(
        total = containers.len(),
        kept = units.kept_count(),
        evicted = evicted.len(),
        "gc:container selection done"
    );
    evicted
}
