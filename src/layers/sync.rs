//! Marker reconciliation.
//!
//! Every pass detaches the previous markers and builds a fresh set from the
//! place list. There is no per-marker diffing; a keyed reconciliation on
//! `Place::id` would be the natural next step if marker churn ever shows up.

use crate::{
    core::{constants, geo::LatLng},
    data::place::Place,
    layers::marker::{MarkerHandle, MarkerSet, MarkerSpec},
    traits::SurfaceBackend,
    ui::popup::InfoPanelContent,
};

/// Rebuilds the marker set for a place list and an optional user location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSynchronizer {
    place_icon_size: (u32, u32),
    user_icon_size: (u32, u32),
}

impl MarkerSynchronizer {
    pub fn new(place_icon_size: (u32, u32), user_icon_size: (u32, u32)) -> Self {
        Self {
            place_icon_size,
            user_icon_size,
        }
    }

    /// Detach `previous` and attach one marker per plottable place, with the
    /// user-location marker first. A marker the backend refuses is logged and
    /// skipped; the rest of the batch still goes through.
    pub fn synchronize(
        &self,
        surface: &mut dyn SurfaceBackend,
        previous: MarkerSet,
        places: &[Place],
        user_location: Option<LatLng>,
    ) -> MarkerSet {
        for marker in &previous {
            surface.remove_marker(marker.id);
        }

        let mut markers = MarkerSet::new();

        if let Some(location) = user_location {
            let spec = MarkerSpec::user_location(location, self.user_icon_size);
            match surface.add_marker(&spec) {
                Ok(id) => markers.push(MarkerHandle {
                    id,
                    position: location,
                    kind: spec.kind,
                    title: spec.title,
                    info: None,
                }),
                Err(e) => log::warn!("skipping user location marker: {}", e),
            }
        }

        let mut skipped = 0;
        for place in places {
            let Some(spec) = MarkerSpec::for_place(place, self.place_icon_size) else {
                skipped += 1;
                continue;
            };

            match surface.add_marker(&spec) {
                Ok(id) => markers.push(MarkerHandle {
                    id,
                    position: spec.position,
                    kind: spec.kind,
                    title: spec.title,
                    info: Some(InfoPanelContent::from_place(place)),
                }),
                Err(e) => log::warn!("skipping marker for {:?}: {}", place.display_name(), e),
            }
        }

        log::debug!(
            "synchronized {} markers ({} removed, {} places without coordinates)",
            markers.len(),
            previous.len(),
            skipped
        );
        markers
    }
}

impl Default for MarkerSynchronizer {
    fn default() -> Self {
        Self::new(constants::PLACE_ICON_SIZE, constants::USER_ICON_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{config::SurfaceOptions, geo::Point},
        layers::marker::MarkerKind,
        provider::headless::HeadlessProvider,
        traits::{ContainerId, EventSender, MapProvider},
    };

    fn surface() -> (Box<dyn SurfaceBackend>, crate::provider::headless::SurfaceProbe) {
        let provider = HeadlessProvider::new(Point::new(800.0, 600.0));
        provider.add_container("map");
        let (tx, _rx) = crossbeam_channel::unbounded();
        let surface = provider
            .create_surface(
                &ContainerId::new("map"),
                LatLng::new(-33.45, -70.66),
                &SurfaceOptions::default(),
                EventSender::new(tx),
            )
            .unwrap();
        let probe = provider.probe(&ContainerId::new("map")).unwrap();
        (surface, probe)
    }

    fn places() -> Vec<Place> {
        vec![
            Place::new("Farmacia X", "A").with_tags(["pharmacy"]).with_coordinates(-33.45, -70.66),
            Place::new("Hospital Y", "B").with_tags(["hospital"]).with_coordinates(-33.44, -70.65),
            Place::new("Nowhere", "C").with_tags(["dentist"]),
        ]
    }

    #[test]
    fn test_user_marker_first_and_missing_coordinates_skipped() {
        let (mut surface, probe) = surface();
        let sync = MarkerSynchronizer::default();

        let markers = sync.synchronize(
            surface.as_mut(),
            MarkerSet::new(),
            &places(),
            Some(LatLng::new(-33.46, -70.67)),
        );

        assert_eq!(markers.len(), 3);
        let first = markers.iter().next().unwrap();
        assert_eq!(first.kind, MarkerKind::UserLocation);
        assert!(first.info.is_none());
        let titles: Vec<_> = markers.place_markers().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["Farmacia X", "Hospital Y"]);
        assert_eq!(probe.marker_count(), 3);
    }

    #[test]
    fn test_resync_leaves_no_stale_markers() {
        let (mut surface, probe) = surface();
        let sync = MarkerSynchronizer::default();

        let first = sync.synchronize(surface.as_mut(), MarkerSet::new(), &places(), None);
        let old_ids = first.ids();
        let second = sync.synchronize(surface.as_mut(), first, &places()[..1], None);

        assert_eq!(second.len(), 1);
        assert_eq!(probe.marker_count(), 1);
        assert!(old_ids.iter().all(|id| !second.ids().contains(id)));
    }

    #[test]
    fn test_empty_input_clears_everything() {
        let (mut surface, probe) = surface();
        let sync = MarkerSynchronizer::default();

        let first = sync.synchronize(surface.as_mut(), MarkerSet::new(), &places(), None);
        let cleared = sync.synchronize(surface.as_mut(), first, &[], None);

        assert!(cleared.is_empty());
        assert_eq!(probe.marker_count(), 0);
    }

    #[test]
    fn test_rejected_marker_does_not_abort_batch() {
        let (mut surface, probe) = surface();
        probe.reject_markers_titled("Farmacia X");
        let sync = MarkerSynchronizer::default();

        let markers = sync.synchronize(surface.as_mut(), MarkerSet::new(), &places(), None);

        assert_eq!(markers.len(), 1);
        assert_eq!(markers.iter().next().unwrap().title, "Hospital Y");
        assert_eq!(probe.marker_count(), 1);
    }
}
