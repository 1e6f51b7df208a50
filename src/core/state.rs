//! Per-mount lifecycle of the map widget.
//!
//! ```text
//! Unloaded -> ProviderLoading -> ProviderReady -> SurfaceInitialized -> Synchronizing <-> Idle
//!                    |   ^
//!                    v   |
//!                 LoadFailed
//! ```
//!
//! Every state may move to `Unmounted`, which is terminal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Unloaded,
    ProviderLoading,
    ProviderReady,
    SurfaceInitialized,
    Synchronizing,
    Idle,
    LoadFailed,
    Unmounted,
}

impl LifecycleState {
    /// Whether `self -> next` is an edge of the lifecycle graph
    pub fn can_transition(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        if next == Unmounted {
            return self != Unmounted;
        }

        matches!(
            (self, next),
            (Unloaded, ProviderLoading)
                | (ProviderLoading, ProviderReady)
                | (ProviderLoading, LoadFailed)
                | (LoadFailed, ProviderLoading)
                | (ProviderReady, SurfaceInitialized)
                | (SurfaceInitialized, Synchronizing)
                | (SurfaceInitialized, Idle)
                | (Synchronizing, Idle)
                | (Idle, Synchronizing)
        )
    }

    /// The map area shows a loading indicator in these states
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Unloaded | Self::ProviderLoading)
    }

    /// A surface exists and accepts marker work
    pub fn has_surface(self) -> bool {
        matches!(
            self,
            Self::SurfaceInitialized | Self::Synchronizing | Self::Idle
        )
    }

    pub fn retry_available(self) -> bool {
        self == Self::LoadFailed
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unloaded => "unloaded",
            Self::ProviderLoading => "provider-loading",
            Self::ProviderReady => "provider-ready",
            Self::SurfaceInitialized => "surface-initialized",
            Self::Synchronizing => "synchronizing",
            Self::Idle => "idle",
            Self::LoadFailed => "load-failed",
            Self::Unmounted => "unmounted",
        };
        write!(f, "{}", name)
    }
}
