//! Prelude module for common healthmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use healthmap::prelude::*;`

pub use crate::core::{
    config::{LoaderConfig, MapConfig, ProviderConfig, SurfaceOptions},
    geo::{LatLng, LatLngBounds, Point},
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
    marker::{MarkerHandle, MarkerKind, MarkerSet, MarkerSpec},
    sync::MarkerSynchronizer,
};

pub use crate::provider::{
    headless::{HeadlessProvider, HeadlessScriptSource, LoadBehavior, SurfaceProbe},
    loader::ProviderLoader,
};

pub use crate::traits::{
    ContainerId, EventSender, MapProvider, MarkerId, PanelId, ProviderHandle, ScriptSource,
    SurfaceBackend,
};

pub use crate::ui::{
    popup::{InfoPanelContent, InfoPanelCoordinator},
    widget::{HealthMap, WeakHealthMap},
};

pub use crate::{Error as MapError, LoadFailure, Result};

pub use std::time::Duration;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
