//! Core constants shared by the engine: provider URLs, marker glyphs and
//! view defaults. Keeping them in one place makes provider swaps easier.

use crate::core::geo::LatLng;

/// Initial zoom applied when a surface is created.
pub const DEFAULT_ZOOM: f64 = 13.0;

/// Zoom range the headless surface clamps to (Google Maps uses 0..=22).
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;

/// Padding in pixels kept around markers when fitting the viewport.
pub const DEFAULT_FIT_PADDING: f64 = 20.0;

/// Center used before the application supplies one (Araucanía, Chile).
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: -39.278719,
    lng: -72.223317,
};

/// Provider load wait before giving up and offering a retry.
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 10_000;

/// Google Maps JavaScript API loader endpoint.
pub const MAPS_SCRIPT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/js";

/// Directions endpoint opened by the "get directions" action.
pub const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/";

/// External search opened for "more info" on a place.
pub const SEARCH_BASE_URL: &str = "https://www.google.com/search";

/// Place marker icon size in pixels.
pub const PLACE_ICON_SIZE: (u32, u32) = (40, 40);

/// User-location marker icon size in pixels.
pub const USER_ICON_SIZE: (u32, u32) = (32, 32);

pub const PHARMACY_ICON_URL: &str = "https://maps.google.com/mapfiles/ms/icons/green-dot.png";
pub const HOSPITAL_ICON_URL: &str = "https://maps.google.com/mapfiles/ms/icons/red-dot.png";
pub const CLINIC_ICON_URL: &str = "https://maps.google.com/mapfiles/ms/icons/blue-dot.png";
pub const DENTIST_ICON_URL: &str = "https://maps.google.com/mapfiles/ms/icons/yellow-dot.png";
pub const OTHER_HEALTH_ICON_URL: &str = "https://maps.google.com/mapfiles/ms/icons/purple-dot.png";

/// Filled blue circle with a white ring, percent-encoded as an SVG data URI.
pub const USER_LOCATION_ICON_URL: &str = concat!(
    "data:image/svg+xml;charset=UTF-8,",
    "%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%20width%3D%2232%22%20",
    "height%3D%2232%22%20viewBox%3D%220%200%2032%2032%22%3E",
    "%3Ccircle%20cx%3D%2216%22%20cy%3D%2216%22%20r%3D%228%22%20fill%3D%22%234285f4%22%20",
    "stroke%3D%22white%22%20stroke-width%3D%222%22%2F%3E%3C%2Fsvg%3E"
);

/// Title of the user-location marker.
pub const USER_LOCATION_TITLE: &str = "Your location";

/// Provider style rule that simplifies the provider's own medical POIs.
pub const MEDICAL_POI_FEATURE: &str = "poi.medical";
