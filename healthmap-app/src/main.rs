use anyhow::Context;
use healthmap::{
    prelude::*,
    provider::headless::PROVIDER_NAME,
};
use std::{cell::RefCell, rc::Rc};

const CONTAINER: &str = "map";
const VIEWPORT: (f64, f64) = (1200.0, 800.0);

/// Snapshot used when no props file is given: a search around Santiago centro
const SANTIAGO_PROPS: &str = r#"{
    "center": { "lat": -33.4489, "lng": -70.6693 },
    "userLocation": { "lat": -33.4493, "lng": -70.6681 },
    "places": [
        {
            "place_id": "demo-1",
            "name": "Farmacia Cruz Verde",
            "vicinity": "Ahumada 200, Santiago",
            "types": ["pharmacy", "health", "store"],
            "rating": 4.1,
            "user_ratings_total": 312,
            "open_now": true,
            "price_level": 2,
            "geometry": { "location": { "lat": -33.4412, "lng": -70.6505 } }
        },
        {
            "place_id": "demo-2",
            "name": "Hospital San Borja Arriarán",
            "vicinity": "Santa Rosa 1234, Santiago",
            "types": ["hospital", "health"],
            "rating": 3.6,
            "user_ratings_total": 1480,
            "geometry": { "location": { "lat": -33.4627, "lng": -70.6456 } }
        },
        {
            "place_id": "demo-3",
            "name": "Centro Médico Alameda",
            "vicinity": "Av. Libertador Bernardo O'Higgins 949",
            "types": ["doctor", "health"],
            "open_now": false,
            "geometry": { "location": { "lat": -33.4440, "lng": -70.6540 } }
        },
        {
            "place_id": "demo-4",
            "name": "Clínica Dental Sonrisa",
            "vicinity": "Huérfanos 1160",
            "types": ["dentist"],
            "rating": 4.8,
            "user_ratings_total": 54,
            "price_level": 3,
            "geometry": { "location": { "lat": -33.4385, "lng": -70.6530 } }
        },
        {
            "place_id": "demo-5",
            "name": "Consulta sin ubicación",
            "types": ["physiotherapist"]
        }
    ]
}"#;

/// Headless walk-through of the map engine: load, sync, click, navigate.
///
/// Usage: `healthmap-app [props.json]`. Configuration comes from the
/// `HEALTHMAP_*` environment variables.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    healthmap::init_logging();

    let config = MapConfig::from_env();
    config.validate().context("invalid HEALTHMAP_* configuration")?;

    let props = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading props from {}", path))?;
            MapProps::from_json(&json).with_context(|| format!("parsing props in {}", path))?
        }
        None => MapProps::from_json(SANTIAGO_PROPS)?,
    };
    log::info!(
        "{} places ({} plottable)",
        props.places.len(),
        props.plottable_count()
    );

    let provider = HeadlessProvider::new(Point::new(VIEWPORT.0, VIEWPORT.1));
    provider.add_container(CONTAINER);
    let script_url = config.provider.script_url()?;
    let source = HeadlessScriptSource::new(script_url, provider.clone());

    let map = HealthMap::new(config);
    let intents = Rc::new(RefCell::new(Vec::new()));
    let _subscription = {
        let intents = intents.clone();
        map.on_navigation(move |intent| intents.borrow_mut().push(intent.clone()))
    };

    map.attach_container(CONTAINER)?;
    map.set_props(props.clone())?;
    map.mount(&source).await?;
    log::info!("map is {} on the {} provider", map.state(), PROVIDER_NAME);

    let probe = provider
        .probe(&ContainerId::new(CONTAINER))
        .context("surface was not created")?;
    println!(
        "viewport: center {} zoom {} ({} markers)",
        probe.center(),
        probe.zoom(),
        probe.marker_count()
    );
    for marker in map.markers().iter() {
        println!("  {:>10} {:?} {}", marker.id.to_string(), marker.kind, marker.title);
    }

    // Click the first place marker and press its directions button
    if let Some(marker) = map.markers().place_markers().next().cloned() {
        probe.click(marker.id);
        map.process_events();

        if let Some(content) = marker.info.as_ref() {
            println!("\n{}\n", content.to_html());
        }
        probe.click_directions(marker.id);
        map.process_events();
    }

    if let Some(place) = props.places.first() {
        map.request_external_search(place)?;
    }

    for intent in intents.borrow().iter() {
        println!("intent: {}", serde_json::to_string(intent)?);
    }

    map.unmount();
    println!("surface destroyed: {}", probe.destroyed());
    Ok(())
}
