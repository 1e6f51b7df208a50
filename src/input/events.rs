use crate::{
    core::{constants, geo::LatLng},
    data::place::Place,
    traits::{MarkerId, PanelId},
    MapError, Result,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// User interaction reported by a surface backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    /// A marker was clicked
    MarkerClicked { marker: MarkerId },
    /// The user closed a panel with its own close control
    InfoPanelClosed { panel: PanelId },
    /// The directions button inside a marker's panel was pressed
    DirectionsRequested { marker: MarkerId },
}

impl SurfaceEvent {
    pub fn marker(&self) -> Option<MarkerId> {
        match self {
            SurfaceEvent::MarkerClicked { marker } | SurfaceEvent::DirectionsRequested { marker } => {
                Some(*marker)
            }
            SurfaceEvent::InfoPanelClosed { .. } => None,
        }
    }
}

/// Fire-and-forget navigation requested by the user. The host opens `url`
/// in a new browsing context; completion is not tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationIntent {
    OpenDirections { destination: LatLng, url: String },
    ExternalSearch { query: String, url: String },
}

impl NavigationIntent {
    pub fn directions_to(destination: LatLng) -> Result<Self> {
        Ok(NavigationIntent::OpenDirections {
            url: directions_url(destination)?,
            destination,
        })
    }

    /// "More info" search for a place's name and address
    pub fn external_search(place: &Place) -> Result<Self> {
        let query = format!("{} {}", place.display_name(), place.display_address());
        let url = Url::parse_with_params(constants::SEARCH_BASE_URL, &[("q", query.as_str())])
            .map_err(|e| MapError::Config(format!("search url: {}", e)))?;

        Ok(NavigationIntent::ExternalSearch {
            query,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        match self {
            NavigationIntent::OpenDirections { url, .. } | NavigationIntent::ExternalSearch { url, .. } => url,
        }
    }
}

/// Provider directions URL for a destination
pub fn directions_url(destination: LatLng) -> Result<String> {
    if !destination.is_valid() {
        return Err(MapError::InvalidCoordinates(destination.to_string()));
    }

    let destination = destination.to_string();
    Url::parse_with_params(
        constants::DIRECTIONS_BASE_URL,
        &[("api", "1"), ("destination", destination.as_str())],
    )
    .map(String::from)
    .map_err(|e| MapError::Config(format!("directions url: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directions_url() {
        let url = directions_url(LatLng::new(-33.45, -70.66)).unwrap();
        assert_eq!(
            url,
            "https://www.google.com/maps/dir/?api=1&destination=-33.45%2C-70.66"
        );
    }

    #[test]
    fn test_directions_rejects_invalid_coordinates() {
        assert!(matches!(
            NavigationIntent::directions_to(LatLng::new(f64::NAN, 0.0)),
            Err(MapError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_external_search_encodes_query() {
        let place = Place::new("Farmacia X", "Av. Libertador & 5");
        let intent = NavigationIntent::external_search(&place).unwrap();

        match &intent {
            NavigationIntent::ExternalSearch { query, url } => {
                assert_eq!(query, "Farmacia X Av. Libertador & 5");
                assert_eq!(
                    url,
                    "https://www.google.com/search?q=Farmacia+X+Av.+Libertador+%26+5"
                );
            }
            other => panic!("unexpected intent {:?}", other),
        }
        assert!(intent.url().starts_with("https://www.google.com/search"));
    }

    #[test]
    fn test_event_marker_accessor() {
        let click = SurfaceEvent::MarkerClicked { marker: MarkerId(3) };
        assert_eq!(click.marker(), Some(MarkerId(3)));
        let closed = SurfaceEvent::InfoPanelClosed { panel: PanelId(1) };
        assert_eq!(closed.marker(), None);
    }
}
