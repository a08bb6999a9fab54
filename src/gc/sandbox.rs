//! Selection of pod sandboxes that are safe to remove.

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use crate::runtime::{Container, Sandbox, age};

/// Select sandboxes that are safe to remove: not ready, holding no container
/// records of any state, and at least `min_age` old. Each sandbox is judged
/// on its own, so several attempts of one pod are evaluated independently.
pub fn select_sandboxes<'a>(
    sandboxes: &'a [Sandbox],
    containers: &[Container],
    min_age: Duration,
    now: SystemTime,
) -> Vec<&'a Sandbox> {
    let occupied: HashSet<&str> = containers.iter().map(|c| c.sandbox_id.as_str()).collect();

    sandboxes
        .iter()
        .filter(|s| !s.is_ready())
        .filter(|s| !occupied.contains(s.id.as_str()))
        .filter(|s| age(now, s.created_at) >= min_age)
        .collect()
}
