//! # healthmap
//!
//! Map engine for nearby health places (pharmacies, hospitals, clinics).
//!
//! The crate loads a third-party map provider once per page, keeps one map
//! surface per mounted widget, rebuilds the marker set whenever the place list
//! changes, keeps at most one info panel open and fits the viewport to the
//! markers. The provider is reached only through the traits in [`traits`], so
//! the same widget drives the browser backend (`wasm` feature) and the
//! in-memory [`provider::headless`] backend.

pub mod core;
pub mod data;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod traits;
pub mod ui;
pub use crate::core::constants;

use std::time::Duration;

// Re-export public API
pub use crate::core::{
    config::{LoaderConfig, MapConfig, ProviderConfig, SurfaceOptions},
    geo::{LatLng, LatLngBounds},
    map::MapInstanceManager,
    state::LifecycleState,
    viewport::ViewportFitter,
};

pub use crate::data::place::{MapProps, Place, PlaceCategory};

pub use crate::input::{
    events::{NavigationIntent, SurfaceEvent},
    handler::{EventBus, Subscription},
};

pub use crate::layers::{
    marker::{MarkerHandle, MarkerSet},
    sync::MarkerSynchronizer,
};

pub use crate::provider::loader::ProviderLoader;

pub use crate::traits::{
    ContainerId, EventSender, MapProvider, MarkerId, PanelId, ScriptSource, SurfaceBackend,
};

pub use crate::ui::{
    popup::{InfoPanelContent, InfoPanelCoordinator},
    widget::{HealthMap, WeakHealthMap},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Why the map provider could not be made available.
///
/// Cloneable so that every waiter on a shared load receives the same outcome.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadFailure {
    #[error("provider script {url} failed to load: {reason}")]
    Script { url: String, reason: String },

    #[error("provider did not become ready within {0:?}")]
    TimedOut(Duration),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider load error: {0}")]
    ProviderLoad(#[from] LoadFailure),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Container not found: {0}")]
    ContainerMissing(String),

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidState {
        from: LifecycleState,
        to: LifecycleState,
    },
}

/// Error type alias for convenience
pub type Error = MapError;

/// Install `env_logger` with `RUST_LOG` filtering, defaulting to `info`.
/// Later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("logger already installed");
    }
}
