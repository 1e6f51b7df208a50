use crate::{
    core::{config::SurfaceOptions, geo::LatLng},
    input::events::SurfaceEvent,
    traits::{ContainerId, EventSender, MapProvider, SurfaceBackend},
    MapError, Result,
};
use crossbeam_channel::{Receiver, TryRecvError};
use std::rc::Rc;

/// Outcome of [`MapInstanceManager::create_or_get_surface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceBinding {
    Created,
    Reused,
}

/// Owns the single map surface of one widget.
///
/// The surface is created once per container and survives every prop change;
/// only `teardown` (or moving to another container) destroys it.
#[derive(Default)]
pub struct MapInstanceManager {
    surface: Option<Box<dyn SurfaceBackend>>,
    center: Option<LatLng>,
    events: Option<Receiver<SurfaceEvent>>,
    wake: Option<Rc<dyn Fn()>>,
}

impl MapInstanceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn container(&self) -> Option<&ContainerId> {
        self.surface.as_ref().map(|s| s.container())
    }

    /// Center last applied to the surface
    pub fn center(&self) -> Option<LatLng> {
        self.center
    }

    /// Run `wake` after every event a surface created from now on queues
    pub fn set_wake(&mut self, wake: Rc<dyn Fn()>) {
        self.wake = Some(wake);
    }

    /// Create the surface in `container`, or keep the existing one.
    ///
    /// Zoom and styles from `options` are applied only on creation. Asking
    /// for a different container replaces the old surface once the new one
    /// exists; if creation fails the old surface stays as it was.
    pub fn create_or_get_surface(
        &mut self,
        provider: &dyn MapProvider,
        container: &ContainerId,
        initial_center: LatLng,
        options: &SurfaceOptions,
    ) -> Result<SurfaceBinding> {
        if self.container() == Some(container) {
            return Ok(SurfaceBinding::Reused);
        }
        if !initial_center.is_valid() {
            return Err(MapError::InvalidCoordinates(initial_center.to_string()));
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut sender = EventSender::new(tx);
        if let Some(wake) = &self.wake {
            sender = sender.with_wake(wake.clone());
        }
        let surface = provider.create_surface(container, initial_center, options, sender)?;
        if self.has_surface() {
            log::info!("map surface moving to container {}", container);
            self.teardown();
        }
        log::info!(
            "{} map surface created in {} at {} (zoom {})",
            provider.name(),
            container,
            initial_center,
            options.zoom
        );

        self.surface = Some(surface);
        self.center = Some(initial_center);
        self.events = Some(rx);
        Ok(SurfaceBinding::Created)
    }

    /// Move the surface to `center`. Returns whether the backend was called:
    /// an unchanged center or a missing surface is a no-op.
    pub fn recenter(&mut self, center: LatLng) -> Result<bool> {
        if !center.is_valid() {
            return Err(MapError::InvalidCoordinates(center.to_string()));
        }
        let Some(surface) = self.surface.as_mut() else {
            return Ok(false);
        };
        if self.center == Some(center) {
            return Ok(false);
        }

        surface.set_center(center);
        self.center = Some(center);
        log::debug!("recentered map on {}", center);
        Ok(true)
    }

    pub fn surface_mut(&mut self) -> Option<&mut (dyn SurfaceBackend + 'static)> {
        self.surface.as_deref_mut()
    }

    /// Surface events queued since the last drain, in arrival order
    pub fn drain_events(&self) -> Vec<SurfaceEvent> {
        let Some(events) = &self.events else {
            return Vec::new();
        };

        let mut drained = Vec::new();
        loop {
            match events.try_recv() {
                Ok(event) => drained.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("surface event channel disconnected");
                    break;
                }
            }
        }
        drained
    }

    /// Destroy the surface and drop its event channel
    pub fn teardown(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.destroy();
            log::info!("map surface in {} torn down", surface.container());
        }
        self.center = None;
        self.events = None;
    }
}

impl std::fmt::Debug for MapInstanceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapInstanceManager")
            .field("container", &self.container())
            .field("center", &self.center)
            .field("wake", &self.wake.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::geo::Point, provider::headless::HeadlessProvider};

    fn provider() -> HeadlessProvider {
        let provider = HeadlessProvider::new(Point::new(800.0, 600.0));
        provider.add_container("map");
        provider.add_container("other");
        provider
    }

    #[test]
    fn test_surface_created_once_per_container() {
        let provider = provider();
        let mut manager = MapInstanceManager::new();
        let map = ContainerId::new("map");
        let options = SurfaceOptions::default();

        let first = manager
            .create_or_get_surface(&provider, &map, LatLng::new(-33.45, -70.66), &options)
            .unwrap();
        let second = manager
            .create_or_get_surface(&provider, &map, LatLng::new(0.0, 0.0), &options)
            .unwrap();

        assert_eq!(first, SurfaceBinding::Created);
        assert_eq!(second, SurfaceBinding::Reused);
        assert_eq!(provider.created_count(), 1);
        // The reused surface keeps its original center
        assert_eq!(manager.center(), Some(LatLng::new(-33.45, -70.66)));
    }

    #[test]
    fn test_new_container_replaces_surface() {
        let provider = provider();
        let mut manager = MapInstanceManager::new();
        let options = SurfaceOptions::default();
        let center = LatLng::new(-33.45, -70.66);

        manager
            .create_or_get_surface(&provider, &ContainerId::new("map"), center, &options)
            .unwrap();
        manager
            .create_or_get_surface(&provider, &ContainerId::new("other"), center, &options)
            .unwrap();

        assert_eq!(provider.created_count(), 2);
        assert!(provider.probe(&ContainerId::new("map")).unwrap().destroyed());
        assert_eq!(manager.container(), Some(&ContainerId::new("other")));
    }

    #[test]
    fn test_failed_move_keeps_old_surface() {
        let provider = provider();
        let mut manager = MapInstanceManager::new();
        let options = SurfaceOptions::default();
        let center = LatLng::new(-33.45, -70.66);
        let map = ContainerId::new("map");

        manager
            .create_or_get_surface(&provider, &map, center, &options)
            .unwrap();
        let moved = manager.create_or_get_surface(&provider, &ContainerId::new("gone"), center, &options);

        assert!(matches!(moved, Err(MapError::ContainerMissing(_))));
        assert_eq!(manager.container(), Some(&map));
        assert!(!provider.probe(&map).unwrap().destroyed());
    }

    #[test]
    fn test_wake_runs_after_each_event() {
        let provider = provider();
        let mut manager = MapInstanceManager::new();
        let wakes = Rc::new(std::cell::Cell::new(0));
        let counter = wakes.clone();
        manager.set_wake(Rc::new(move || counter.set(counter.get() + 1)));

        let map = ContainerId::new("map");
        manager
            .create_or_get_surface(&provider, &map, LatLng::new(-33.45, -70.66), &SurfaceOptions::default())
            .unwrap();
        let spec = crate::layers::marker::MarkerSpec::user_location(LatLng::new(-33.45, -70.66), (32, 32));
        let marker = manager.surface_mut().unwrap().add_marker(&spec).unwrap();
        let probe = provider.probe(&map).unwrap();

        probe.click(marker);
        probe.click(marker);
        assert_eq!(wakes.get(), 2);
        assert_eq!(manager.drain_events().len(), 2);

        // No receiver, no wake
        manager.teardown();
        assert!(!probe.click(marker));
        assert_eq!(wakes.get(), 2);
    }

    #[test]
    fn test_recenter_is_idempotent() {
        let provider = provider();
        let mut manager = MapInstanceManager::new();
        let map = ContainerId::new("map");
        let start = LatLng::new(-33.45, -70.66);

        assert!(!manager.recenter(start).unwrap());

        manager
            .create_or_get_surface(&provider, &map, start, &SurfaceOptions::default())
            .unwrap();
        let probe = provider.probe(&map).unwrap();

        assert!(!manager.recenter(start).unwrap());
        assert!(manager.recenter(LatLng::new(-33.0, -70.0)).unwrap());
        assert!(!manager.recenter(LatLng::new(-33.0, -70.0)).unwrap());
        assert_eq!(probe.set_center_calls(), 1);
        assert_eq!(provider.created_count(), 1);

        assert!(manager.recenter(LatLng::new(f64::NAN, 0.0)).is_err());
    }

    #[test]
    fn test_events_drained_in_order_and_dropped_on_teardown() {
        let provider = provider();
        let mut manager = MapInstanceManager::new();
        let map = ContainerId::new("map");
        manager
            .create_or_get_surface(&provider, &map, LatLng::new(-33.45, -70.66), &SurfaceOptions::default())
            .unwrap();

        let spec = crate::layers::marker::MarkerSpec::user_location(LatLng::new(-33.45, -70.66), (32, 32));
        let a = manager.surface_mut().unwrap().add_marker(&spec).unwrap();
        let b = manager.surface_mut().unwrap().add_marker(&spec).unwrap();
        let probe = provider.probe(&map).unwrap();
        probe.click(b);
        probe.click(a);

        assert_eq!(
            manager.drain_events(),
            vec![
                SurfaceEvent::MarkerClicked { marker: b },
                SurfaceEvent::MarkerClicked { marker: a },
            ]
        );
        assert!(manager.drain_events().is_empty());

        manager.teardown();
        assert!(probe.destroyed());
        assert!(!manager.has_surface());
        assert!(manager.drain_events().is_empty());
    }
}
