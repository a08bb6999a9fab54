use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Lifecycle state of a pod sandbox as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Ready,
    NotReady,
}

/// Lifecycle state of a container as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Exited,
    Unknown,
}

impl SandboxState {
    /// Parse the CRI enum name (`SANDBOX_READY`, `SANDBOX_NOTREADY`).
    /// Anything other than ready is treated as not ready.
    pub fn from_cri(value: &str) -> Self {
        match value {
            "SANDBOX_READY" => SandboxState::Ready,
            _ => SandboxState::NotReady,
        }
    }
}

impl ContainerState {
    /// Parse the CRI enum name (`CONTAINER_RUNNING`, ...).
    pub fn from_cri(value: &str) -> Self {
        match value {
            "CONTAINER_CREATED" => ContainerState::Created,
            "CONTAINER_RUNNING" => ContainerState::Running,
            "CONTAINER_EXITED" => ContainerState::Exited,
            _ => ContainerState::Unknown,
        }
    }
}

impl fmt::Display for SandboxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxState::Ready => write!(f, "ready"),
            SandboxState::NotReady => write!(f, "notready"),
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Created => write!(f, "created"),
            ContainerState::Running => write!(f, "running"),
            ContainerState::Exited => write!(f, "exited"),
            ContainerState::Unknown => write!(f, "unknown"),
        }
    }
}

/// The pod a sandbox was created for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

/// Snapshot of a pod sandbox. Read-only to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    pub id: String,
    pub pod: PodRef,
    pub attempt: u32,
    pub state: SandboxState,
    pub created_at: SystemTime,
}

/// Snapshot of a container. Read-only to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    /// Runtime id of the sandbox the container was started in
    pub sandbox_id: String,
    pub pod_uid: String,
    /// Name from the pod spec, stable across restarts
    pub name: String,
    pub attempt: u32,
    pub state: ContainerState,
    pub created_at: SystemTime,
}

impl Sandbox {
    pub fn is_ready(&self) -> bool {
        self.state == SandboxState::Ready
    }
}

impl Container {
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Convert CRI nanosecond timestamps. Negative values clamp to the epoch.
pub fn time_from_unix_nanos(nanos: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(u64::try_from(nanos).unwrap_or(0))
}

/// Time elapsed since `created_at`. Timestamps in the future count as zero age.
pub fn age(now: SystemTime, created_at: SystemTime) -> Duration {
    now.duration_since(created_at).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_nanos_clamp_to_epoch() {
        assert_eq!(time_from_unix_nanos(-5), UNIX_EPOCH);
        assert_eq!(
            time_from_unix_nanos(1_500),
            UNIX_EPOCH + Duration::from_nanos(1_500)
        );
    }

    #[test]
    fn future_timestamps_have_zero_age() {
        let now = UNIX_EPOCH + Duration::from_secs(100);
        let later = now + Duration::from_secs(10);
        assert_eq!(age(now, later), Duration::ZERO);
        assert_eq!(age(later, now), Duration::from_secs(10));
    }

    #[test]
    fn unrecognised_states() {
        assert_eq!(ContainerState::from_cri("CONTAINER_PAUSED"), ContainerState::Unknown);
        assert_eq!(ContainerState::from_cri("CONTAINER_EXITED"), ContainerState::Exited);
        // Only an explicit ready state protects a sandbox
        assert_eq!(SandboxState::from_cri("SANDBOX_UNKNOWN"), SandboxState::NotReady);
        assert_eq!(SandboxState::from_cri("SANDBOX_READY"), SandboxState::Ready);
    }
}
