use healthmap::prelude::*;
use std::{cell::RefCell, rc::Rc};

/// End-to-end tests that drive the widget the way the surrounding
/// application does: attach, push props, mount, click.
#[cfg(test)]
mod integration_tests {
    use super::*;
    use healthmap::layers::marker::{category_icon_url, MarkerKind};

    const CONTAINER: &str = "map";

    /// Headless provider with the default container, plus a widget bound to it
    fn setup(url: &str) -> (HeadlessProvider, HeadlessScriptSource, HealthMap) {
        let provider = HeadlessProvider::new(Point::new(800.0, 600.0));
        provider.add_container(CONTAINER);
        let source = HeadlessScriptSource::new(url, provider.clone());
        let map = HealthMap::new(MapConfig::default());
        map.attach_container(CONTAINER).unwrap();
        (provider, source, map)
    }

    fn probe(provider: &HeadlessProvider) -> SurfaceProbe {
        provider.probe(&ContainerId::new(CONTAINER)).unwrap()
    }

    fn farmacia_props() -> MapProps {
        MapProps::new(LatLng::new(-33.45, -70.66))
            .with_places(vec![Place::new("Farmacia X", "Av. Libertador 100")
                .with_tags(["pharmacy"])
                .with_coordinates(-33.45, -70.66)])
            .with_user_location(Some(LatLng::new(-33.44, -70.65)))
    }

    fn three_places() -> Vec<Place> {
        vec![
            Place::new("Farmacia X", "A")
                .with_tags(["pharmacy"])
                .with_coordinates(-33.45, -70.66),
            Place::new("Hospital Y", "B")
                .with_tags(["hospital"])
                .with_coordinates(-33.47, -70.64),
            Place::new("Clínica Z", "C")
                .with_tags(["clinic"])
                .with_coordinates(-33.43, -70.61),
        ]
    }

    /// The pharmacy scenario: two markers, a fit covering both, one panel
    #[tokio::test]
    async fn test_pharmacy_and_user_location_scenario() {
        println!("🧪 [TEST] pharmacy + user location scenario");
        let (provider, source, map) = setup("scenario://pharmacy");

        map.set_props(farmacia_props()).unwrap();
        map.mount(&source).await.unwrap();
        assert_eq!(map.state(), LifecycleState::Idle);

        let markers = map.markers();
        assert_eq!(markers.len(), 2);
        let positions: Vec<LatLng> = markers.iter().map(|m| m.position).collect();
        assert!(positions.contains(&LatLng::new(-33.45, -70.66)));
        assert!(positions.contains(&LatLng::new(-33.44, -70.65)));

        let probe = probe(&provider);
        let fits = probe.fit_calls();
        assert_eq!(fits.len(), 1);
        assert!(fits[0].contains(&LatLng::new(-33.45, -70.66)));
        assert!(fits[0].contains(&LatLng::new(-33.44, -70.65)));

        let pharmacy = markers.place_markers().next().unwrap().id;
        assert!(probe.click(pharmacy));
        map.process_events();

        let panels = probe.open_panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].1, pharmacy);
        assert_eq!(probe.panel_content(panels[0].0).unwrap().title, "Farmacia X");
        println!("✅ [TEST] scenario passed");
    }

    /// Marker count is plottable places plus the user marker
    #[tokio::test]
    async fn test_marker_count_matches_plottable_places() {
        let (provider, source, map) = setup("scenario://count");
        let mut places = three_places();
        places.push(Place::new("No coordinates", "D").with_tags(["dentist"]));

        map.set_props(
            MapProps::new(LatLng::new(-33.45, -70.66))
                .with_places(places.clone())
                .with_user_location(Some(LatLng::new(-33.44, -70.65))),
        )
        .unwrap();
        map.mount(&source).await.unwrap();

        assert_eq!(map.marker_count(), 3 + 1);
        assert_eq!(probe(&provider).marker_count(), 4);

        map.set_props(MapProps::new(LatLng::new(-33.45, -70.66)).with_places(places))
            .unwrap();
        assert_eq!(map.marker_count(), 3);
        assert_eq!(probe(&provider).marker_count(), 3);
    }

    /// Same input twice: same size and glyphs, fresh marker instances allowed
    #[test]
    fn test_synchronize_is_idempotent() {
        let provider = HeadlessProvider::new(Point::new(800.0, 600.0));
        provider.add_container(CONTAINER);
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut surface = provider
            .create_surface(
                &ContainerId::new(CONTAINER),
                LatLng::new(-33.45, -70.66),
                &SurfaceOptions::default(),
                EventSender::new(tx),
            )
            .unwrap();
        let sync = MarkerSynchronizer::default();
        let user = Some(LatLng::new(-33.44, -70.65));

        let first = sync.synchronize(surface.as_mut(), MarkerSet::new(), &three_places(), user);
        let first_kinds: Vec<MarkerKind> = first.iter().map(|m| m.kind).collect();
        let second = sync.synchronize(surface.as_mut(), first, &three_places(), user);
        let second_kinds: Vec<MarkerKind> = second.iter().map(|m| m.kind).collect();

        assert_eq!(second.len(), 4);
        assert_eq!(first_kinds, second_kinds);
        assert_eq!(probe(&provider).marker_count(), 4);
    }

    /// Clicking A then B leaves only B's panel open
    #[tokio::test]
    async fn test_only_one_panel_open() {
        let (provider, source, map) = setup("scenario://panels");
        map.set_props(MapProps::new(LatLng::new(-33.45, -70.66)).with_places(three_places()))
            .unwrap();
        map.mount(&source).await.unwrap();
        let probe = probe(&provider);

        let a = probe.marker_titled("Farmacia X").unwrap();
        let b = probe.marker_titled("Hospital Y").unwrap();

        probe.click(a);
        map.process_events();
        assert_eq!(map.active_panel().unwrap().marker, a);

        probe.click(b);
        map.process_events();
        let panels = probe.open_panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].1, b);
        assert_eq!(map.active_panel().unwrap().marker, b);
    }

    /// Clicks queued in one batch still end with a single panel
    #[tokio::test]
    async fn test_batched_clicks_keep_one_panel() {
        let (provider, source, map) = setup("scenario://batched");
        map.set_props(MapProps::new(LatLng::new(-33.45, -70.66)).with_places(three_places()))
            .unwrap();
        map.mount(&source).await.unwrap();
        let probe = probe(&provider);

        for title in ["Farmacia X", "Hospital Y", "Clínica Z"] {
            probe.click(probe.marker_titled(title).unwrap());
        }
        map.process_events();

        let panels = probe.open_panels();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].1, probe.marker_titled("Clínica Z").unwrap());
    }

    /// The user-location marker has no panel and leaves the open one alone
    #[tokio::test]
    async fn test_user_marker_click_opens_nothing() {
        let (provider, source, map) = setup("scenario://user-click");
        map.set_props(farmacia_props()).unwrap();
        map.mount(&source).await.unwrap();
        let probe = probe(&provider);

        let user = map.markers().user_marker().unwrap().id;
        probe.click(user);
        map.process_events();
        assert!(probe.open_panels().is_empty());
        assert!(map.active_panel().is_none());
    }

    /// The documented priority: pharmacy, hospital, doctor/clinic, dentist, other
    #[test]
    fn test_category_glyph_priority() {
        let glyph = |tags: &[&str]| {
            let place = Place::new("P", "A").with_tags(tags.iter().copied());
            category_icon_url(place.category())
        };

        assert_eq!(
            PlaceCategory::PRIORITY.map(|(category, _)| category),
            [
                PlaceCategory::Pharmacy,
                PlaceCategory::Hospital,
                PlaceCategory::Clinic,
                PlaceCategory::Dentist,
            ]
        );
        assert_eq!(glyph(&["hospital", "pharmacy"]), category_icon_url(PlaceCategory::Pharmacy));
        assert_eq!(glyph(&["dentist", "hospital"]), category_icon_url(PlaceCategory::Hospital));
        assert_eq!(glyph(&["dentist", "doctor"]), category_icon_url(PlaceCategory::Clinic));
        assert_eq!(glyph(&["dentist"]), category_icon_url(PlaceCategory::Dentist));
        assert_eq!(glyph(&["spa"]), category_icon_url(PlaceCategory::Other));
    }

    /// No places and no user location: the viewport is left untouched
    #[tokio::test]
    async fn test_empty_result_set_does_not_move_viewport() {
        let (provider, source, map) = setup("scenario://empty");
        let center = LatLng::new(-33.45, -70.66);
        map.set_props(MapProps::new(center)).unwrap();
        map.mount(&source).await.unwrap();
        let probe = probe(&provider);

        assert_eq!(map.marker_count(), 0);
        assert!(probe.fit_calls().is_empty());
        assert_eq!(probe.center(), center);
        assert_eq!(probe.zoom(), 13.0);

        let fitted = ViewportFitter::default();
        assert!(ViewportFitter::bounds_for(&MarkerSet::new()).is_none());
        assert_eq!(fitted.padding(), 20.0);
    }

    /// Directions button publishes an OpenDirections intent to subscribers
    #[tokio::test]
    async fn test_directions_intent_published() {
        let (provider, source, map) = setup("scenario://directions");
        let received = Rc::new(RefCell::new(Vec::new()));
        let _subscription = {
            let received = received.clone();
            map.on_navigation(move |intent| received.borrow_mut().push(intent.clone()))
        };

        map.set_props(farmacia_props()).unwrap();
        map.mount(&source).await.unwrap();
        let probe = probe(&provider);

        let pharmacy = probe.marker_titled("Farmacia X").unwrap();
        probe.click(pharmacy);
        map.process_events();
        assert!(probe.click_directions(pharmacy));
        assert_eq!(map.process_events(), 1);

        let received = received.borrow();
        assert_eq!(
            received.as_slice(),
            [NavigationIntent::OpenDirections {
                destination: LatLng::new(-33.45, -70.66),
                url: "https://www.google.com/maps/dir/?api=1&destination=-33.45%2C-70.66"
                    .to_string(),
            }]
        );
    }

    /// External search for a list entry goes through the same channel
    #[tokio::test]
    async fn test_external_search_intent() {
        let (_provider, source, map) = setup("scenario://search");
        let urls = Rc::new(RefCell::new(Vec::new()));
        let _subscription = {
            let urls = urls.clone();
            map.on_navigation(move |intent| urls.borrow_mut().push(intent.url().to_string()))
        };
        map.mount(&source).await.unwrap();

        map.request_external_search(&Place::new("Farmacia X", "Av. Libertador 100"))
            .unwrap();

        assert_eq!(
            urls.borrow().as_slice(),
            ["https://www.google.com/search?q=Farmacia+X+Av.+Libertador+100"]
        );
    }

    /// A new place list closes the open panel before rebuilding
    #[tokio::test]
    async fn test_resync_closes_open_panel() {
        let (provider, source, map) = setup("scenario://resync");
        map.set_props(MapProps::new(LatLng::new(-33.45, -70.66)).with_places(three_places()))
            .unwrap();
        map.mount(&source).await.unwrap();
        let probe = probe(&provider);

        probe.click(probe.marker_titled("Hospital Y").unwrap());
        map.process_events();
        assert!(map.active_panel().is_some());

        map.set_props(
            MapProps::new(LatLng::new(-33.45, -70.66)).with_places(three_places()[..1].to_vec()),
        )
        .unwrap();

        assert!(map.active_panel().is_none());
        assert!(probe.open_panels().is_empty());
        assert_eq!(probe.marker_count(), 1);
    }
}
