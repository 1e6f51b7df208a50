use crate::{
    core::{constants, geo::LatLng},
    data::place::{Place, PlaceCategory},
    traits::MarkerId,
    ui::popup::InfoPanelContent,
};
use serde::{Deserialize, Serialize};

/// What a marker stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkerKind {
    UserLocation,
    Place { category: PlaceCategory },
}

/// Glyph drawn for a marker, scaled to `width` x `height` pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerIcon {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl MarkerIcon {
    pub fn for_category(category: PlaceCategory, size: (u32, u32)) -> Self {
        Self {
            url: category_icon_url(category).to_string(),
            width: size.0,
            height: size.1,
        }
    }

    pub fn user_location(size: (u32, u32)) -> Self {
        Self {
            url: constants::USER_LOCATION_ICON_URL.to_string(),
            width: size.0,
            height: size.1,
        }
    }
}

/// Marker glyph for a place category
pub fn category_icon_url(category: PlaceCategory) -> &'static str {
    match category {
        PlaceCategory::Pharmacy => constants::PHARMACY_ICON_URL,
        PlaceCategory::Hospital => constants::HOSPITAL_ICON_URL,
        PlaceCategory::Clinic => constants::CLINIC_ICON_URL,
        PlaceCategory::Dentist => constants::DENTIST_ICON_URL,
        PlaceCategory::Other => constants::OTHER_HEALTH_ICON_URL,
    }
}

/// Everything a backend needs to draw a marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub title: String,
    pub icon: MarkerIcon,
    pub kind: MarkerKind,
}

impl MarkerSpec {
    pub fn user_location(position: LatLng, icon_size: (u32, u32)) -> Self {
        Self {
            position,
            title: constants::USER_LOCATION_TITLE.to_string(),
            icon: MarkerIcon::user_location(icon_size),
            kind: MarkerKind::UserLocation,
        }
    }

    /// `None` when the place cannot be plotted
    pub fn for_place(place: &Place, icon_size: (u32, u32)) -> Option<Self> {
        let position = place.coordinates?;
        let category = place.category();

        Some(Self {
            position,
            title: place.display_name().to_string(),
            icon: MarkerIcon::for_category(category, icon_size),
            kind: MarkerKind::Place { category },
        })
    }
}

/// A marker currently attached to a surface
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHandle {
    pub id: MarkerId,
    pub position: LatLng,
    pub kind: MarkerKind,
    pub title: String,
    /// Panel content, precomputed at sync time; `None` for the user marker
    pub info: Option<InfoPanelContent>,
}

impl MarkerHandle {
    pub fn is_user_location(&self) -> bool {
        self.kind == MarkerKind::UserLocation
    }
}

/// Ordered set of attached markers, replaced as a whole on every sync
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    markers: Vec<MarkerHandle>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: MarkerHandle) {
        self.markers.push(handle);
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MarkerHandle> {
        self.markers.iter()
    }

    pub fn get(&self, id: MarkerId) -> Option<&MarkerHandle> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn ids(&self) -> Vec<MarkerId> {
        self.markers.iter().map(|m| m.id).collect()
    }

    pub fn user_marker(&self) -> Option<&MarkerHandle> {
        self.markers.iter().find(|m| m.is_user_location())
    }

    pub fn place_markers(&self) -> impl Iterator<Item = &MarkerHandle> {
        self.markers.iter().filter(|m| !m.is_user_location())
    }
}

impl<'a> IntoIterator for &'a MarkerSet {
    type Item = &'a MarkerHandle;
    type IntoIter = std::slice::Iter<'a, MarkerHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.markers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_glyphs() {
        assert!(category_icon_url(PlaceCategory::Pharmacy).ends_with("green-dot.png"));
        assert!(category_icon_url(PlaceCategory::Hospital).ends_with("red-dot.png"));
        assert!(category_icon_url(PlaceCategory::Clinic).ends_with("blue-dot.png"));
        assert!(category_icon_url(PlaceCategory::Dentist).ends_with("yellow-dot.png"));
        assert!(category_icon_url(PlaceCategory::Other).ends_with("purple-dot.png"));
    }

    #[test]
    fn test_spec_for_place() {
        let place = Place::new("", "Calle 2")
            .with_tags(["doctor"])
            .with_coordinates(-33.4, -70.6);
        let spec = MarkerSpec::for_place(&place, (40, 40)).unwrap();

        assert_eq!(spec.title, "Unnamed place");
        assert_eq!(spec.kind, MarkerKind::Place { category: PlaceCategory::Clinic });
        assert_eq!((spec.icon.width, spec.icon.height), (40, 40));

        assert!(MarkerSpec::for_place(&Place::new("No coords", ""), (40, 40)).is_none());
    }

    #[test]
    fn test_user_location_spec() {
        let spec = MarkerSpec::user_location(LatLng::new(-33.4, -70.6), (32, 32));
        assert_eq!(spec.title, "Your location");
        assert!(spec.icon.url.starts_with("data:image/svg+xml"));
        assert_eq!(spec.kind, MarkerKind::UserLocation);
    }
}
