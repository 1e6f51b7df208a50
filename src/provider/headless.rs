//! In-memory map provider.
//!
//! Keeps surfaces, markers and panels as plain data and computes viewport
//! fits with the same Web Mercator math a browser map uses. A
//! [`SurfaceProbe`] lets callers look at a surface and simulate user
//! interaction (marker clicks, panel close buttons, directions buttons).

use crate::{
    core::{
        config::{FeatureStyle, SurfaceOptions},
        constants,
        geo::{LatLng, LatLngBounds, Point},
        viewport::fit_zoom,
    },
    input::events::SurfaceEvent,
    layers::marker::MarkerSpec,
    prelude::{HashMap, HashSet},
    runtime,
    traits::{
        ContainerId, EventSender, LoadFuture, MapProvider, MarkerId, PanelId, ProviderHandle,
        ScriptSource, SurfaceBackend,
    },
    ui::popup::InfoPanelContent,
    LoadFailure, MapError, Result,
};
use futures::FutureExt;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

pub const PROVIDER_NAME: &str = "headless";

#[derive(Debug)]
struct SurfaceState {
    size: Point,
    center: LatLng,
    zoom: f64,
    styles: Vec<FeatureStyle>,
    markers: Vec<(MarkerId, MarkerSpec)>,
    panels: HashMap<PanelId, (MarkerId, InfoPanelContent)>,
    fit_calls: Vec<LatLngBounds>,
    set_center_calls: usize,
    rejected_titles: HashSet<String>,
    events: Option<EventSender>,
    next_id: u64,
    destroyed: bool,
}

impl SurfaceState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn send(&self, event: SurfaceEvent) -> bool {
        match &self.events {
            Some(events) => events.send(event),
            None => false,
        }
    }
}

#[derive(Debug, Default)]
struct ProviderState {
    containers: HashSet<ContainerId>,
    surfaces: HashMap<ContainerId, Rc<RefCell<SurfaceState>>>,
    created: usize,
}

/// Provider whose surfaces live in memory. Clones share state.
#[derive(Debug, Clone)]
pub struct HeadlessProvider {
    size: Point,
    state: Rc<RefCell<ProviderState>>,
}

impl HeadlessProvider {
    /// Surfaces get a `size` pixel viewport
    pub fn new(size: Point) -> Self {
        Self {
            size,
            state: Rc::new(RefCell::new(ProviderState::default())),
        }
    }

    /// Make a container available for surfaces
    pub fn add_container(&self, id: impl Into<String>) {
        self.state
            .borrow_mut()
            .containers
            .insert(ContainerId::new(id));
    }

    /// Number of surfaces created so far
    pub fn created_count(&self) -> usize {
        self.state.borrow().created
    }

    /// The most recent surface created in `container`
    pub fn probe(&self, container: &ContainerId) -> Option<SurfaceProbe> {
        self.state
            .borrow()
            .surfaces
            .get(container)
            .map(|state| SurfaceProbe {
                state: state.clone(),
            })
    }
}

impl MapProvider for HeadlessProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn create_surface(
        &self,
        container: &ContainerId,
        initial_center: LatLng,
        options: &SurfaceOptions,
        events: EventSender,
    ) -> Result<Box<dyn SurfaceBackend>> {
        let mut provider = self.state.borrow_mut();
        if !provider.containers.contains(container) {
            return Err(MapError::ContainerMissing(container.to_string()));
        }
        if !initial_center.is_valid() {
            return Err(MapError::InvalidCoordinates(initial_center.to_string()));
        }

        let state = Rc::new(RefCell::new(SurfaceState {
            size: self.size,
            center: initial_center,
            zoom: options.zoom.clamp(constants::MIN_ZOOM, constants::MAX_ZOOM),
            styles: options.styles.clone(),
            markers: Vec::new(),
            panels: HashMap::default(),
            fit_calls: Vec::new(),
            set_center_calls: 0,
            rejected_titles: HashSet::default(),
            events: Some(events),
            next_id: 0,
            destroyed: false,
        }));
        provider.surfaces.insert(container.clone(), state.clone());
        provider.created += 1;
        log::debug!("headless surface #{} created in {}", provider.created, container);

        Ok(Box::new(HeadlessSurface {
            container: container.clone(),
            state,
        }))
    }
}

/// One in-memory surface
#[derive(Debug)]
pub struct HeadlessSurface {
    container: ContainerId,
    state: Rc<RefCell<SurfaceState>>,
}

impl HeadlessSurface {
    fn live(&self) -> Result<std::cell::RefMut<'_, SurfaceState>> {
        let state = self.state.borrow_mut();
        if state.destroyed {
            return Err(MapError::Provider(format!(
                "surface in {} was destroyed",
                self.container
            )));
        }
        Ok(state)
    }
}

impl SurfaceBackend for HeadlessSurface {
    fn container(&self) -> &ContainerId {
        &self.container
    }

    fn center(&self) -> LatLng {
        self.state.borrow().center
    }

    fn zoom(&self) -> f64 {
        self.state.borrow().zoom
    }

    fn set_center(&mut self, center: LatLng) {
        let mut state = self.state.borrow_mut();
        state.center = center;
        state.set_center_calls += 1;
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64) -> Result<()> {
        if !bounds.south_west.is_valid() || !bounds.north_east.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "{} .. {}",
                bounds.south_west, bounds.north_east
            )));
        }

        let mut state = self.live()?;
        state.zoom = fit_zoom(
            bounds,
            state.size,
            padding,
            constants::MIN_ZOOM,
            constants::MAX_ZOOM,
        );
        state.center = bounds.center();
        state.fit_calls.push(*bounds);
        Ok(())
    }

    fn add_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerId> {
        let mut state = self.live()?;
        if state.rejected_titles.contains(&spec.title) {
            return Err(MapError::Provider(format!("marker {:?} rejected", spec.title)));
        }

        let id = MarkerId(state.next_id());
        state.markers.push((id, spec.clone()));
        Ok(id)
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        let mut state = self.state.borrow_mut();
        state.markers.retain(|(id, _)| *id != marker);
        state.panels.retain(|_, (anchor, _)| *anchor != marker);
    }

    fn open_info_panel(&mut self, marker: MarkerId, content: &InfoPanelContent) -> Result<PanelId> {
        let mut state = self.live()?;
        if !state.markers.iter().any(|(id, _)| *id == marker) {
            return Err(MapError::Provider(format!("no {} on this surface", marker)));
        }

        let panel = PanelId(state.next_id());
        state.panels.insert(panel, (marker, content.clone()));
        Ok(panel)
    }

    fn close_info_panel(&mut self, panel: PanelId) {
        self.state.borrow_mut().panels.remove(&panel);
    }

    fn destroy(&mut self) {
        let mut state = self.state.borrow_mut();
        state.markers.clear();
        state.panels.clear();
        state.events = None;
        state.destroyed = true;
        log::debug!("headless surface in {} destroyed", self.container);
    }
}

/// Read access to a headless surface plus simulated user input.
#[derive(Debug, Clone)]
pub struct SurfaceProbe {
    state: Rc<RefCell<SurfaceState>>,
}

impl SurfaceProbe {
    pub fn center(&self) -> LatLng {
        self.state.borrow().center
    }

    pub fn zoom(&self) -> f64 {
        self.state.borrow().zoom
    }

    pub fn styles(&self) -> Vec<FeatureStyle> {
        self.state.borrow().styles.clone()
    }

    pub fn marker_count(&self) -> usize {
        self.state.borrow().markers.len()
    }

    /// Attached markers in insertion order
    pub fn markers(&self) -> Vec<(MarkerId, MarkerSpec)> {
        self.state.borrow().markers.clone()
    }

    pub fn marker_titled(&self, title: &str) -> Option<MarkerId> {
        self.state
            .borrow()
            .markers
            .iter()
            .find(|(_, spec)| spec.title == title)
            .map(|(id, _)| *id)
    }

    /// Open panels with the marker each is anchored to
    pub fn open_panels(&self) -> Vec<(PanelId, MarkerId)> {
        let mut panels: Vec<_> = self
            .state
            .borrow()
            .panels
            .iter()
            .map(|(panel, (marker, _))| (*panel, *marker))
            .collect();
        panels.sort();
        panels
    }

    pub fn panel_content(&self, panel: PanelId) -> Option<InfoPanelContent> {
        self.state
            .borrow()
            .panels
            .get(&panel)
            .map(|(_, content)| content.clone())
    }

    pub fn fit_calls(&self) -> Vec<LatLngBounds> {
        self.state.borrow().fit_calls.clone()
    }

    pub fn set_center_calls(&self) -> usize {
        self.state.borrow().set_center_calls
    }

    pub fn destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Make `add_marker` fail for markers with this title
    pub fn reject_markers_titled(&self, title: impl Into<String>) {
        self.state.borrow_mut().rejected_titles.insert(title.into());
    }

    /// Click a marker. Returns false when the marker is not attached.
    pub fn click(&self, marker: MarkerId) -> bool {
        let state = self.state.borrow();
        state.markers.iter().any(|(id, _)| *id == marker)
            && state.send(SurfaceEvent::MarkerClicked { marker })
    }

    /// Press a panel's own close control
    pub fn close_panel(&self, panel: PanelId) -> bool {
        let mut state = self.state.borrow_mut();
        state.panels.remove(&panel).is_some() && state.send(SurfaceEvent::InfoPanelClosed { panel })
    }

    /// Press the directions button of the open panel anchored to `marker`
    pub fn click_directions(&self, marker: MarkerId) -> bool {
        let state = self.state.borrow();
        let has_button = state
            .panels
            .values()
            .any(|(anchor, content)| *anchor == marker && content.has_directions());
        has_button && state.send(SurfaceEvent::DirectionsRequested { marker })
    }
}

/// How a [`HeadlessScriptSource`] behaves when loaded
#[derive(Debug, Clone, PartialEq)]
pub enum LoadBehavior {
    Immediate,
    After(Duration),
    Fail(String),
    /// Never completes
    Hang,
}

/// Script source handing out a [`HeadlessProvider`].
#[derive(Debug)]
pub struct HeadlessScriptSource {
    url: String,
    provider: HeadlessProvider,
    behavior: LoadBehavior,
    loads: Cell<usize>,
}

impl HeadlessScriptSource {
    pub fn new(url: impl Into<String>, provider: HeadlessProvider) -> Self {
        Self {
            url: url.into(),
            provider,
            behavior: LoadBehavior::Immediate,
            loads: Cell::new(0),
        }
    }

    pub fn with_behavior(mut self, behavior: LoadBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn provider(&self) -> &HeadlessProvider {
        &self.provider
    }

    /// How many times `load()` was called
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl ScriptSource for HeadlessScriptSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn load(&self) -> LoadFuture {
        self.loads.set(self.loads.get() + 1);
        let provider: ProviderHandle = Rc::new(self.provider.clone());

        match &self.behavior {
            LoadBehavior::Immediate => futures::future::ready(Ok(provider)).boxed_local(),
            LoadBehavior::After(delay) => {
                let delay = *delay;
                async move {
                    runtime::delay(delay).await;
                    Ok(provider)
                }
                .boxed_local()
            }
            LoadBehavior::Fail(reason) => futures::future::ready(Err(LoadFailure::Script {
                url: self.url.clone(),
                reason: reason.clone(),
            }))
            .boxed_local(),
            LoadBehavior::Hang => futures::future::pending().boxed_local(),
        }
    }
}
