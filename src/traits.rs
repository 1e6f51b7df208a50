//! Provider seam.
//!
//! The engine never talks to a mapping SDK directly. A [`ScriptSource`] makes
//! a [`MapProvider`] available, the provider creates one [`SurfaceBackend`]
//! per container, and the surface reports user interaction back as
//! [`SurfaceEvent`]s on a channel instead of calling into the widget.

use crate::{
    core::{
        config::SurfaceOptions,
        geo::{LatLng, LatLngBounds},
    },
    input::events::SurfaceEvent,
    layers::marker::MarkerSpec,
    ui::popup::InfoPanelContent,
    LoadFailure, Result,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

/// Identifies a marker on one surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Identifies an info panel on one surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub u64);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

impl std::fmt::Display for PanelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "panel#{}", self.0)
    }
}

/// The element a surface renders into (a DOM element id in the browser)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Sending half handed to every surface for user-interaction events.
///
/// Every delivered event also runs the owner's wake hook, so events raised
/// by the provider's own event loop get processed without polling.
#[derive(Clone)]
pub struct EventSender {
    tx: crossbeam_channel::Sender<SurfaceEvent>,
    wake: Option<Rc<dyn Fn()>>,
}

impl EventSender {
    pub fn new(tx: crossbeam_channel::Sender<SurfaceEvent>) -> Self {
        Self { tx, wake: None }
    }

    pub fn with_wake(mut self, wake: Rc<dyn Fn()>) -> Self {
        self.wake = Some(wake);
        self
    }

    /// Queue `event`. Returns false once the receiving side is gone.
    pub fn send(&self, event: SurfaceEvent) -> bool {
        if self.tx.send(event).is_err() {
            return false;
        }
        if let Some(wake) = &self.wake {
            wake();
        }
        true
    }
}

impl std::fmt::Debug for EventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("queued", &self.tx.len())
            .field("wake", &self.wake.is_some())
            .finish()
    }
}

/// A loaded provider shared by every widget on the page
pub type ProviderHandle = Rc<dyn MapProvider>;

/// Future returned by [`ScriptSource::load`]
pub type LoadFuture = LocalBoxFuture<'static, std::result::Result<ProviderHandle, LoadFailure>>;

/// Makes a provider SDK available, e.g. by injecting its script into the page.
pub trait ScriptSource {
    /// Resource URL; identical URLs share one load
    fn url(&self) -> &str;

    /// Start loading. Called at most once per URL while a load is live.
    fn load(&self) -> LoadFuture;
}

/// A loaded mapping SDK.
pub trait MapProvider {
    fn name(&self) -> &str;

    /// Create a surface inside `container`. Fails when the container does
    /// not exist.
    fn create_surface(
        &self,
        container: &ContainerId,
        initial_center: LatLng,
        options: &SurfaceOptions,
        events: EventSender,
    ) -> Result<Box<dyn SurfaceBackend>>;
}

impl std::fmt::Debug for dyn MapProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapProvider").field("name", &self.name()).finish()
    }
}

/// One live map surface.
pub trait SurfaceBackend {
    fn container(&self) -> &ContainerId;

    fn center(&self) -> LatLng;

    fn zoom(&self) -> f64;

    fn set_center(&mut self, center: LatLng);

    /// Pan and zoom so that `bounds` is visible with `padding` pixels to spare
    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64) -> Result<()>;

    /// Attach a marker. Clicking it must emit [`SurfaceEvent::MarkerClicked`].
    fn add_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerId>;

    /// Detach a marker and drop its listeners. Unknown ids are ignored.
    fn remove_marker(&mut self, marker: MarkerId);

    /// Open a panel anchored to `marker`. Its directions button, when the
    /// content offers one, must emit [`SurfaceEvent::DirectionsRequested`].
    fn open_info_panel(&mut self, marker: MarkerId, content: &InfoPanelContent) -> Result<PanelId>;

    /// Close a panel. Unknown ids are ignored.
    fn close_info_panel(&mut self, panel: PanelId);

    /// Release every marker, panel and listener
    fn destroy(&mut self);
}
