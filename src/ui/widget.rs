use crate::{
    core::{
        config::MapConfig,
        map::{MapInstanceManager, SurfaceBinding},
        state::LifecycleState,
        viewport::ViewportFitter,
    },
    data::place::{MapProps, Place},
    input::{
        events::{NavigationIntent, SurfaceEvent},
        handler::{EventBus, Subscription},
    },
    layers::{marker::MarkerSet, sync::MarkerSynchronizer},
    provider::loader::ProviderLoader,
    runtime,
    traits::{ContainerId, ProviderHandle, ScriptSource},
    ui::popup::{ActivePanel, InfoPanelCoordinator},
    MapError, Result,
};
use instant::Instant;
use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

/// Health-places map component, one per mount.
///
/// Drives the lifecycle from provider loading to an idle, synchronized
/// surface, and publishes [`NavigationIntent`]s to subscribers.
///
/// ```ignore
/// let map = HealthMap::new(MapConfig::from_env());
/// let _sub = map.on_navigation(|intent| open_in_new_tab(intent.url()));
/// map.attach_container("map")?;
/// map.set_props(props)?;
/// map.mount(&source).await?;
///
/// // native hosts poll; in the browser queued events are processed on the
/// // next turn of the event loop
/// map.process_events();
/// ```
///
/// Clones are handles to the same component. The last handle to go away
/// unmounts it. Callbacks registered on the map should hold a
/// [`WeakHealthMap`] instead of a clone, or the map keeps itself alive.
#[derive(Clone)]
pub struct HealthMap {
    inner: Rc<RefCell<Inner>>,
    loader: ProviderLoader,
}

/// Non-owning [`HealthMap`] handle
#[derive(Clone)]
pub struct WeakHealthMap {
    inner: Weak<RefCell<Inner>>,
    loader: ProviderLoader,
}

impl WeakHealthMap {
    pub fn upgrade(&self) -> Option<HealthMap> {
        self.inner.upgrade().map(|inner| HealthMap {
            inner,
            loader: self.loader,
        })
    }
}

struct Inner {
    config: MapConfig,
    state: LifecycleState,
    provider: Option<ProviderHandle>,
    container: Option<ContainerId>,
    map: MapInstanceManager,
    synchronizer: MarkerSynchronizer,
    fitter: ViewportFitter,
    panels: InfoPanelCoordinator,
    markers: MarkerSet,
    intents: EventBus<NavigationIntent>,
    /// Latest snapshot from the application
    desired: Option<MapProps>,
    /// Snapshot the surface currently reflects
    applied: Option<MapProps>,
    dirty: bool,
    last_error: Option<String>,
}

impl HealthMap {
    pub fn new(config: MapConfig) -> Self {
        let loader = ProviderLoader::new(&config.loader);
        let inner = Inner {
            synchronizer: MarkerSynchronizer::new(config.place_icon_size, config.user_icon_size),
            fitter: ViewportFitter::new(config.fit_padding),
            config,
            state: LifecycleState::Unloaded,
            provider: None,
            container: None,
            map: MapInstanceManager::new(),
            panels: InfoPanelCoordinator::new(),
            markers: MarkerSet::new(),
            intents: EventBus::new(),
            desired: None,
            applied: None,
            dirty: false,
            last_error: None,
        };

        let inner = Rc::new(RefCell::new(inner));
        let weak = Rc::downgrade(&inner);
        inner
            .borrow_mut()
            .map
            .set_wake(Rc::new(move || schedule_dispatch(weak.clone())));

        Self { inner, loader }
    }

    pub fn downgrade(&self) -> WeakHealthMap {
        WeakHealthMap {
            inner: Rc::downgrade(&self.inner),
            loader: self.loader,
        }
    }

    /// Load the provider and, once a container is attached, create the
    /// surface and apply the latest props.
    ///
    /// If the widget is unmounted while the provider loads, the loaded
    /// provider is discarded and nothing is attached.
    pub async fn mount(&self, source: &dyn ScriptSource) -> Result<()> {
        self.expect_state(LifecycleState::Unloaded, LifecycleState::ProviderLoading)?;
        self.load(source).await
    }

    /// Try loading again after a failure
    pub async fn retry(&self, source: &dyn ScriptSource) -> Result<()> {
        self.expect_state(LifecycleState::LoadFailed, LifecycleState::ProviderLoading)?;
        log::info!("retrying map provider load");
        self.load(source).await
    }

    async fn load(&self, source: &dyn ScriptSource) -> Result<()> {
        self.inner
            .borrow_mut()
            .transition(LifecycleState::ProviderLoading)?;

        let outcome = self.loader.ensure_loaded(source).await;

        {
            let mut inner = self.inner.borrow_mut();
            if inner.state == LifecycleState::Unmounted {
                log::info!("map unmounted while the provider was loading; discarding it");
                return Ok(());
            }

            match outcome {
                Ok(provider) => {
                    log::info!("map provider {} ready", provider.name());
                    inner.provider = Some(provider);
                    inner.last_error = None;
                    inner.transition(LifecycleState::ProviderReady)?;
                }
                Err(e) => {
                    inner.last_error = Some(e.to_string());
                    inner.transition(LifecycleState::LoadFailed)?;
                    return Err(e);
                }
            }

            inner.bind_surface()?;
        }

        self.reconcile()
    }

    /// Bind the widget to the element it renders into. Without a container
    /// the surface is not created; attaching a different one moves the
    /// surface there.
    pub fn attach_container(&self, container: impl Into<String>) -> Result<()> {
        let container = ContainerId::new(container);
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state == LifecycleState::Unmounted {
                return Err(MapError::InvalidState {
                    from: LifecycleState::Unmounted,
                    to: LifecycleState::SurfaceInitialized,
                });
            }
            // Same container and its surface exists (or cannot exist yet)
            if inner.container.as_ref() == Some(&container)
                && (inner.map.container() == Some(&container) || inner.provider.is_none())
            {
                return Ok(());
            }

            inner.container = Some(container);
            if let Err(e) = inner.bind_surface() {
                // A failed move leaves the map where it was
                if let Some(current) = inner.map.container().cloned() {
                    inner.container = Some(current);
                }
                return Err(e);
            }
        }

        self.reconcile()
    }

    /// Record a new snapshot and bring the surface up to date.
    ///
    /// Before the surface exists the snapshot is only stored. A pass runs to
    /// completion inside this call, so passes never interleave; a later
    /// snapshot simply replaces the pending one.
    pub fn set_props(&self, props: MapProps) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state == LifecycleState::Unmounted {
                log::debug!("ignoring props for an unmounted map");
                return Ok(());
            }
            inner.desired = Some(props);
            inner.dirty = true;
        }

        self.reconcile()
    }

    /// Bring the surface up to the latest snapshot. Without a surface the
    /// work stays pending.
    fn reconcile(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.dirty || !inner.state.has_surface() || !inner.map.has_surface() {
            return Ok(());
        }
        inner.dirty = false;

        if let Err(e) = inner.run_pass() {
            inner.last_error = Some(e.to_string());
            if inner.state == LifecycleState::Synchronizing {
                inner.transition(LifecycleState::Idle)?;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Handle queued surface events and publish the resulting intents.
    /// Returns how many intents were published.
    pub fn process_events(&self) -> usize {
        dispatch_events(&self.inner)
    }

    /// Publish an "open external search" intent for `place`
    pub fn request_external_search(&self, place: &Place) -> Result<()> {
        let intents = {
            let inner = self.inner.borrow();
            if inner.state == LifecycleState::Unmounted {
                return Ok(());
            }
            inner.intents.clone()
        };
        let intent = NavigationIntent::external_search(place)?;
        intents.emit(&intent);
        Ok(())
    }

    /// Subscribe to navigation intents. Dropping the handle unsubscribes.
    ///
    /// A callback that needs the map should capture [`HealthMap::downgrade`].
    pub fn on_navigation<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NavigationIntent) + 'static,
    {
        let intents = self.inner.borrow().intents.clone();
        intents.subscribe(callback)
    }

    /// Release the surface, every marker, panel and subscriber. Safe to call
    /// in any state, any number of times.
    pub fn unmount(&self) {
        let intents = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == LifecycleState::Unmounted {
                return;
            }

            inner.panels.forget();
            inner.markers = MarkerSet::new();
            inner.map.teardown();
            inner.provider = None;
            inner.desired = None;
            inner.applied = None;
            inner.dirty = false;
            let from = inner.state;
            inner.state = LifecycleState::Unmounted;
            log::info!("map unmounted (was {})", from);
            inner.intents.clone()
        };

        // Dropped listeners may own map handles
        intents.clear();
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.borrow().state
    }

    /// Show the persistent loading indicator
    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Offer the retry affordance
    pub fn retry_available(&self) -> bool {
        self.state().retry_available()
    }

    pub fn markers(&self) -> MarkerSet {
        self.inner.borrow().markers.clone()
    }

    pub fn marker_count(&self) -> usize {
        self.inner.borrow().markers.len()
    }

    pub fn active_panel(&self) -> Option<ActivePanel> {
        self.inner.borrow().panels.active().copied()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.borrow().last_error.clone()
    }

    pub fn container(&self) -> Option<ContainerId> {
        self.inner.borrow().container.clone()
    }

    pub fn config(&self) -> MapConfig {
        self.inner.borrow().config.clone()
    }

    fn expect_state(&self, expected: LifecycleState, next: LifecycleState) -> Result<()> {
        let state = self.state();
        if state != expected {
            return Err(MapError::InvalidState {
                from: state,
                to: next,
            });
        }
        Ok(())
    }
}

impl Drop for HealthMap {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.unmount();
        }
    }
}

impl std::fmt::Debug for HealthMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("HealthMap")
            .field("state", &inner.state)
            .field("container", &inner.container)
            .field("markers", &inner.markers.len())
            .finish()
    }
}

impl Inner {
    fn transition(&mut self, next: LifecycleState) -> Result<()> {
        if self.state == next {
            return Ok(());
        }
        if !self.state.can_transition(next) {
            return Err(MapError::InvalidState {
                from: self.state,
                to: next,
            });
        }
        log::debug!("map state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Create or move the surface when both provider and container exist
    fn bind_surface(&mut self) -> Result<()> {
        if !matches!(self.state, LifecycleState::ProviderReady) && !self.state.has_surface() {
            return Ok(());
        }
        let (Some(provider), Some(container)) = (self.provider.clone(), self.container.clone())
        else {
            log::debug!("surface deferred until a container is attached");
            return Ok(());
        };

        let center = self
            .desired
            .as_ref()
            .map(|p| p.center)
            .unwrap_or(self.config.default_center);

        let binding = match self.map.create_or_get_surface(
            &*provider,
            &container,
            center,
            &self.config.surface,
        ) {
            Ok(binding) => binding,
            Err(e) => {
                log::warn!("could not create map surface: {}", e);
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        if binding == SurfaceBinding::Created {
            // Markers and panels belonged to the previous surface, if any
            self.panels.forget();
            self.markers = MarkerSet::new();
            self.applied = None;
            self.dirty = self.desired.is_some();
            if self.state == LifecycleState::ProviderReady {
                self.transition(LifecycleState::SurfaceInitialized)?;
            }
        }
        Ok(())
    }

    /// Compare `props` with what the surface shows and enter `Synchronizing`
    /// when anything differs. Returns (center changed, markers changed).
    fn begin_pass(&mut self, props: &MapProps) -> Result<(bool, bool)> {
        let center_changed = self.applied.as_ref().map_or(true, |a| a.center != props.center);
        let markers_changed = self.applied.as_ref().map_or(true, |a| a.markers_differ(props));

        if center_changed || markers_changed {
            self.transition(LifecycleState::Synchronizing)?;
        }
        Ok((center_changed, markers_changed))
    }

    fn run_pass(&mut self) -> Result<()> {
        let Some(props) = self.desired.clone() else {
            return Ok(());
        };
        let started = Instant::now();
        let (center_changed, markers_changed) = self.begin_pass(&props)?;

        if center_changed {
            self.map.recenter(props.center)?;
        }

        if markers_changed {
            let surface = self
                .map
                .surface_mut()
                .ok_or_else(|| MapError::Provider("surface missing during sync".to_string()))?;

            self.panels.close(surface);
            let previous = std::mem::take(&mut self.markers);
            self.markers = self.synchronizer.synchronize(
                surface,
                previous,
                &props.places,
                props.user_location,
            );
            if let Err(e) = self.fitter.fit_to_markers(surface, &self.markers) {
                log::warn!("viewport fit failed: {}", e);
            }
        }

        self.applied = Some(props);
        self.transition(LifecycleState::Idle)?;
        log::debug!(
            "map pass done in {:?} (recentered: {}, resynced: {})",
            started.elapsed(),
            center_changed,
            markers_changed
        );
        Ok(())
    }

    fn handle_events(&mut self) -> Vec<NavigationIntent> {
        let mut intents = Vec::new();

        for event in self.map.drain_events() {
            match event {
                SurfaceEvent::MarkerClicked { marker } => {
                    let Some(surface) = self.map.surface_mut() else {
                        continue;
                    };
                    if let Err(e) = self.panels.open_for(surface, &self.markers, marker) {
                        log::warn!("could not open info panel for {}: {}", marker, e);
                    }
                }
                SurfaceEvent::InfoPanelClosed { panel } => {
                    self.panels.panel_closed(panel);
                }
                SurfaceEvent::DirectionsRequested { marker } => {
                    match InfoPanelCoordinator::directions_for(&self.markers, marker) {
                        Some(intent) => intents.push(intent),
                        None => log::debug!("{} has no directions action", marker),
                    }
                }
            }
        }

        intents
    }
}

/// Drain surface events and publish the intents they produce
fn dispatch_events(inner: &RefCell<Inner>) -> usize {
    let (intents, bus) = {
        let mut inner = inner.borrow_mut();
        (inner.handle_events(), inner.intents.clone())
    };

    // Borrow released: subscribers may call back into the widget
    for intent in &intents {
        log::debug!("navigation intent: {}", intent.url());
        bus.emit(intent);
    }
    intents.len()
}

/// Wake hook for surface events: handle them on a later turn, once the
/// provider callback that queued them has returned
fn schedule_dispatch(inner: Weak<RefCell<Inner>>) {
    runtime::spawn_local(async move {
        if let Some(inner) = inner.upgrade() {
            dispatch_events(&inner);
        }
    });
}
