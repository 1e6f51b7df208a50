//! Google Maps JavaScript API backend (browser only).
//!
//! The SDK is reached through `js_sys::Reflect` instead of generated
//! bindings. Every listener this module registers is kept next to the object
//! it belongs to and removed with it.

use crate::{
    core::{
        config::{ProviderConfig, SurfaceOptions},
        geo::{LatLng, LatLngBounds},
    },
    input::{
        events::{NavigationIntent, SurfaceEvent},
        handler::Subscription,
    },
    layers::marker::MarkerSpec,
    prelude::HashMap,
    traits::{
        ContainerId, EventSender, LoadFuture, MapProvider, MarkerId, PanelId, ProviderHandle,
        ScriptSource, SurfaceBackend,
    },
    ui::{
        popup::{InfoPanelContent, DIRECTIONS_BUTTON_CLASS},
        widget::HealthMap,
    },
    LoadFailure, MapError, Result,
};
use futures::{channel::oneshot, FutureExt};
use js_sys::{Array, Function, Object, Reflect};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

pub const PROVIDER_NAME: &str = "google-maps";

fn js_error(context: &str, err: JsValue) -> MapError {
    MapError::Provider(format!("{}: {:?}", context, err))
}

fn get(target: &JsValue, key: &str) -> Result<JsValue> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(|e| js_error(key, e))
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<()> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| js_error(key, e))
}

fn call(target: &JsValue, method: &str, args: &Array) -> Result<JsValue> {
    let function: Function = get(target, method)?
        .dyn_into()
        .map_err(|e| js_error(method, e))?;
    function.apply(target, args).map_err(|e| js_error(method, e))
}

fn construct(namespace: &JsValue, class: &str, args: &Array) -> Result<JsValue> {
    let constructor: Function = get(namespace, class)?
        .dyn_into()
        .map_err(|e| js_error(class, e))?;
    Reflect::construct(&constructor, args).map_err(|e| js_error(class, e))
}

fn lat_lng_literal(position: LatLng) -> Result<JsValue> {
    let literal = Object::new();
    set(&literal, "lat", &JsValue::from_f64(position.lat))?;
    set(&literal, "lng", &JsValue::from_f64(position.lng))?;
    Ok(literal.into())
}

/// `google.maps`, if the SDK is on the page
fn maps_namespace() -> Option<JsValue> {
    let window = web_sys::window()?;
    let google = Reflect::get(&window, &JsValue::from_str("google")).ok()?;
    if google.is_undefined() || google.is_null() {
        return None;
    }
    let maps = Reflect::get(&google, &JsValue::from_str("maps")).ok()?;
    (!maps.is_undefined() && !maps.is_null()).then_some(maps)
}

/// Injects the Maps JavaScript API `<script>` into the document head.
#[derive(Debug, Clone)]
pub struct DomScriptSource {
    url: String,
}

impl DomScriptSource {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            url: config.script_url()?,
        })
    }
}

impl ScriptSource for DomScriptSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn load(&self) -> LoadFuture {
        let url = self.url.clone();

        async move {
            if let Some(maps) = maps_namespace() {
                log::debug!("google.maps already present; skipping script injection");
                let provider: ProviderHandle = Rc::new(GoogleMapsProvider { maps });
                return Ok(provider);
            }

            let (tx, rx) = oneshot::channel::<std::result::Result<(), String>>();
            inject_script(&url, tx).map_err(|reason| LoadFailure::Script {
                url: url.clone(),
                reason,
            })?;

            match rx.await {
                Ok(Ok(())) => {}
                Ok(Err(reason)) => return Err(LoadFailure::Script { url, reason }),
                Err(_) => {
                    return Err(LoadFailure::Unavailable(
                        "script listener dropped before firing".to_string(),
                    ))
                }
            }

            let maps = maps_namespace().ok_or_else(|| {
                LoadFailure::Unavailable("script loaded but google.maps is missing".to_string())
            })?;
            let provider: ProviderHandle = Rc::new(GoogleMapsProvider { maps });
            Ok(provider)
        }
        .boxed_local()
    }
}

fn inject_script(
    url: &str,
    done: oneshot::Sender<std::result::Result<(), String>>,
) -> std::result::Result<(), String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| "no document".to_string())?;
    let head = document.head().ok_or_else(|| "document has no <head>".to_string())?;

    let script: web_sys::HtmlScriptElement = document
        .create_element("script")
        .map_err(|e| format!("{:?}", e))?
        .dyn_into()
        .map_err(|_| "created element is not a <script>".to_string())?;
    script.set_src(url);
    script.set_async(true);
    script.set_defer(true);

    // Whichever handler fires first resolves the load
    let done = Rc::new(RefCell::new(Some(done)));
    let on_load = {
        let done = done.clone();
        Closure::once_into_js(move || {
            if let Some(tx) = done.borrow_mut().take() {
                let _ = tx.send(Ok(()));
            }
        })
    };
    let on_error = Closure::once_into_js(move || {
        if let Some(tx) = done.borrow_mut().take() {
            let _ = tx.send(Err("network or script error".to_string()));
        }
    });
    script.set_onload(Some(on_load.unchecked_ref()));
    script.set_onerror(Some(on_error.unchecked_ref()));

    head.append_child(&script).map_err(|e| format!("{:?}", e))?;
    log::info!("injected map provider script");
    Ok(())
}

/// The loaded `google.maps` namespace
pub struct GoogleMapsProvider {
    maps: JsValue,
}

impl MapProvider for GoogleMapsProvider {
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
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| MapError::Provider("no document".to_string()))?;
        let element = document
            .get_element_by_id(container.as_str())
            .ok_or_else(|| MapError::ContainerMissing(container.to_string()))?;

        let styles = Array::new();
        for style in &options.styles {
            let stylers = Array::new();
            let visibility = Object::new();
            set(&visibility, "visibility", &JsValue::from_str(style.visibility.as_str()))?;
            stylers.push(&visibility);

            let rule = Object::new();
            set(&rule, "featureType", &JsValue::from_str(&style.feature_type))?;
            set(&rule, "stylers", &stylers)?;
            styles.push(&rule);
        }

        let map_options = Object::new();
        set(&map_options, "center", &lat_lng_literal(initial_center)?)?;
        set(&map_options, "zoom", &JsValue::from_f64(options.zoom))?;
        set(&map_options, "styles", &styles)?;

        let map = construct(&self.maps, "Map", &Array::of2(&element, &map_options))?;

        Ok(Box::new(GoogleSurface {
            container: container.clone(),
            maps: self.maps.clone(),
            map,
            center: initial_center,
            zoom: options.zoom,
            markers: HashMap::default(),
            panels: HashMap::default(),
            events,
            next_id: 0,
        }))
    }
}

struct MarkerEntry {
    marker: JsValue,
    listener: JsValue,
    _on_click: Closure<dyn FnMut()>,
}

struct PanelEntry {
    window: JsValue,
    close_listener: JsValue,
    _on_close: Closure<dyn FnMut()>,
    directions: Option<(web_sys::Element, Closure<dyn FnMut()>)>,
}

/// One `google.maps.Map` instance
pub struct GoogleSurface {
    container: ContainerId,
    maps: JsValue,
    map: JsValue,
    center: LatLng,
    zoom: f64,
    markers: HashMap<MarkerId, MarkerEntry>,
    panels: HashMap<PanelId, PanelEntry>,
    events: EventSender,
    next_id: u64,
}

impl GoogleSurface {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_listener(&self, listener: &JsValue) {
        let removed = get(&self.maps, "event")
            .and_then(|event| call(&event, "removeListener", &Array::of1(listener)));
        if let Err(e) = removed {
            log::warn!("could not remove map listener: {}", e);
        }
    }

    fn notifier(&self, event: SurfaceEvent) -> Closure<dyn FnMut()> {
        let events = self.events.clone();
        Closure::wrap(Box::new(move || {
            if !events.send(event) {
                log::debug!("surface event {:?} dropped: widget gone", event);
            }
        }) as Box<dyn FnMut()>)
    }
}

impl SurfaceBackend for GoogleSurface {
    fn container(&self) -> &ContainerId {
        &self.container
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn zoom(&self) -> f64 {
        call(&self.map, "getZoom", &Array::new())
            .ok()
            .and_then(|z| z.as_f64())
            .unwrap_or(self.zoom)
    }

    fn set_center(&mut self, center: LatLng) {
        let applied = lat_lng_literal(center)
            .and_then(|literal| call(&self.map, "setCenter", &Array::of1(&literal)));
        match applied {
            Ok(_) => self.center = center,
            Err(e) => log::warn!("setCenter failed: {}", e),
        }
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds, padding: f64) -> Result<()> {
        let js_bounds = construct(
            &self.maps,
            "LatLngBounds",
            &Array::of2(
                &lat_lng_literal(bounds.south_west)?,
                &lat_lng_literal(bounds.north_east)?,
            ),
        )?;
        call(
            &self.map,
            "fitBounds",
            &Array::of2(&js_bounds, &JsValue::from_f64(padding)),
        )?;
        self.center = bounds.center();
        Ok(())
    }

    fn add_marker(&mut self, spec: &MarkerSpec) -> Result<MarkerId> {
        let size = construct(
            &self.maps,
            "Size",
            &Array::of2(
                &JsValue::from_f64(spec.icon.width as f64),
                &JsValue::from_f64(spec.icon.height as f64),
            ),
        )?;
        let icon = Object::new();
        set(&icon, "url", &JsValue::from_str(&spec.icon.url))?;
        set(&icon, "scaledSize", &size)?;

        let options = Object::new();
        set(&options, "position", &lat_lng_literal(spec.position)?)?;
        set(&options, "map", &self.map)?;
        set(&options, "title", &JsValue::from_str(&spec.title))?;
        set(&options, "icon", &icon)?;

        let marker = construct(&self.maps, "Marker", &Array::of1(&options))?;
        let id = MarkerId(self.next_id());
        let on_click = self.notifier(SurfaceEvent::MarkerClicked { marker: id });
        let listener = call(
            &marker,
            "addListener",
            &Array::of2(&JsValue::from_str("click"), on_click.as_ref()),
        )?;

        self.markers.insert(
            id,
            MarkerEntry {
                marker,
                listener,
                _on_click: on_click,
            },
        );
        Ok(id)
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        let Some(entry) = self.markers.remove(&marker) else {
            return;
        };
        self.remove_listener(&entry.listener);
        if let Err(e) = call(&entry.marker, "setMap", &Array::of1(&JsValue::NULL)) {
            log::warn!("could not detach {}: {}", marker, e);
        }
    }

    fn open_info_panel(&mut self, marker: MarkerId, content: &InfoPanelContent) -> Result<PanelId> {
        let anchor = self
            .markers
            .get(&marker)
            .map(|entry| entry.marker.clone())
            .ok_or_else(|| MapError::Provider(format!("no {} on this surface", marker)))?;

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| MapError::Provider("no document".to_string()))?;
        let body = document
            .create_element("div")
            .map_err(|e| js_error("create panel", e))?;
        body.set_inner_html(&content.to_html());

        let directions = match body
            .query_selector(&format!(".{}", DIRECTIONS_BUTTON_CLASS))
            .map_err(|e| js_error("querySelector", e))?
        {
            Some(button) => {
                let on_directions = self.notifier(SurfaceEvent::DirectionsRequested { marker });
                button
                    .add_event_listener_with_callback("click", on_directions.as_ref().unchecked_ref())
                    .map_err(|e| js_error("directions listener", e))?;
                Some((button, on_directions))
            }
            None => None,
        };

        let options = Object::new();
        set(&options, "content", &body)?;
        let window = construct(&self.maps, "InfoWindow", &Array::of1(&options))?;

        let panel = PanelId(self.next_id());
        let on_close = self.notifier(SurfaceEvent::InfoPanelClosed { panel });
        let close_listener = call(
            &window,
            "addListener",
            &Array::of2(&JsValue::from_str("closeclick"), on_close.as_ref()),
        )?;
        call(&window, "open", &Array::of2(&self.map, &anchor))?;

        self.panels.insert(
            panel,
            PanelEntry {
                window,
                close_listener,
                _on_close: on_close,
                directions,
            },
        );
        Ok(panel)
    }

    fn close_info_panel(&mut self, panel: PanelId) {
        let Some(entry) = self.panels.remove(&panel) else {
            return;
        };
        self.remove_listener(&entry.close_listener);
        if let Some((button, on_directions)) = &entry.directions {
            let _ = button
                .remove_event_listener_with_callback("click", on_directions.as_ref().unchecked_ref());
        }
        if let Err(e) = call(&entry.window, "close", &Array::new()) {
            log::warn!("could not close {}: {}", panel, e);
        }
    }

    fn destroy(&mut self) {
        let panels: Vec<PanelId> = self.panels.keys().copied().collect();
        for panel in panels {
            self.close_info_panel(panel);
        }
        let markers: Vec<MarkerId> = self.markers.keys().copied().collect();
        for marker in markers {
            self.remove_marker(marker);
        }

        let cleared = get(&self.maps, "event")
            .and_then(|event| call(&event, "clearInstanceListeners", &Array::of1(&self.map)));
        if let Err(e) = cleared {
            log::warn!("could not clear map listeners: {}", e);
        }
        log::debug!("google map in {} destroyed", self.container);
    }
}

/// Opens navigation intents in a new browsing context.
pub struct BrowserNavigator;

impl BrowserNavigator {
    /// Route every intent `map` publishes to a new tab
    pub fn attach(map: &HealthMap) -> Subscription {
        map.on_navigation(|intent| {
            if let Err(e) = open_in_new_context(intent) {
                log::warn!("could not open {}: {}", intent.url(), e);
            }
        })
    }
}

pub fn open_in_new_context(intent: &NavigationIntent) -> Result<()> {
    let window = web_sys::window().ok_or_else(|| MapError::Provider("no window".to_string()))?;
    window
        .open_with_url_and_target(intent.url(), "_blank")
        .map_err(|e| js_error("window.open", e))?;
    Ok(())
}

/// Route Rust panics to the browser console
pub fn install_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}
