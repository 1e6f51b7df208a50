//! Place records and the inbound map snapshot.
//!
//! Places arrive either in the engine's own shape or in the search API's wire
//! shape (`place_id`, `types`, `user_ratings_total`, `geometry.location`).
//! Both decode into [`Place`]. Bad coordinates decode as "not plottable"
//! rather than failing the whole batch.

use crate::{core::geo::LatLng, Result};
use serde::{Deserialize, Serialize};

pub const UNNAMED_PLACE: &str = "Unnamed place";
pub const UNKNOWN_ADDRESS: &str = "Address unavailable";
pub const MAX_PRICE_LEVEL: u8 = 4;

/// A health-related location with display metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PlaceRecord")]
pub struct Place {
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub category_tags: Vec<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    pub open_now: Option<bool>,
    /// 0..=4
    pub price_level: Option<u8>,
    /// `None` means the place cannot be plotted
    pub coordinates: Option<LatLng>,
}

impl Place {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = LatLng::checked(lat, lng);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// A rating of 0 (or not a number) means the place is unrated
    pub fn with_rating(mut self, rating: f64, count: u32) -> Self {
        self.rating = known_rating(rating);
        self.rating_count = Some(count);
        self
    }

    pub fn with_open_now(mut self, open_now: bool) -> Self {
        self.open_now = Some(open_now);
        self
    }

    pub fn with_price_level(mut self, level: u8) -> Self {
        self.price_level = Some(level.min(MAX_PRICE_LEVEL));
        self
    }

    pub fn is_plottable(&self) -> bool {
        self.coordinates.is_some()
    }

    /// Name for display, with a placeholder for blank names
    pub fn display_name(&self) -> &str {
        non_blank(&self.name).unwrap_or(UNNAMED_PLACE)
    }

    /// Address for display, with a placeholder for blank addresses
    pub fn display_address(&self) -> &str {
        non_blank(&self.address).unwrap_or(UNKNOWN_ADDRESS)
    }

    pub fn category(&self) -> PlaceCategory {
        PlaceCategory::from_tags(self.category_tags.as_slice())
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Marker category of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Pharmacy,
    Hospital,
    /// `doctor` or `clinic`
    Clinic,
    Dentist,
    Other,
}

impl PlaceCategory {
    /// Checked in this order; the first category with a matching tag wins.
    pub const PRIORITY: [(PlaceCategory, &'static [&'static str]); 4] = [
        (PlaceCategory::Pharmacy, &["pharmacy"]),
        (PlaceCategory::Hospital, &["hospital"]),
        (PlaceCategory::Clinic, &["doctor", "clinic"]),
        (PlaceCategory::Dentist, &["dentist"]),
    ];

    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        Self::PRIORITY
            .iter()
            .find(|(_, names)| {
                tags.iter()
                    .any(|tag| names.iter().any(|name| tag.as_ref().eq_ignore_ascii_case(name)))
            })
            .map(|(category, _)| *category)
            .unwrap_or(PlaceCategory::Other)
    }
}

impl std::fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceCategory::Pharmacy => write!(f, "pharmacy"),
            PlaceCategory::Hospital => write!(f, "hospital"),
            PlaceCategory::Clinic => write!(f, "clinic"),
            PlaceCategory::Dentist => write!(f, "dentist"),
            PlaceCategory::Other => write!(f, "other"),
        }
    }
}

/// Inbound snapshot supplied by the surrounding application on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapProps {
    pub center: LatLng,
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default, alias = "userLocation")]
    pub user_location: Option<LatLng>,
}

impl MapProps {
    pub fn new(center: LatLng) -> Self {
        Self {
            center,
            places: Vec::new(),
            user_location: None,
        }
    }

    pub fn with_places(mut self, places: Vec<Place>) -> Self {
        self.places = places;
        self
    }

    pub fn with_user_location(mut self, location: Option<LatLng>) -> Self {
        self.user_location = location;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn plottable_count(&self) -> usize {
        self.places.iter().filter(|p| p.is_plottable()).count()
    }

    /// Whether `other` would produce a different marker set
    pub fn markers_differ(&self, other: &MapProps) -> bool {
        self.places != other.places || self.user_location != other.user_location
    }
}

// The search API reports "no rating" as 0
fn known_rating(rating: f64) -> Option<f64> {
    (rating.is_finite() && rating > 0.0).then_some(rating)
}

// Wire shape accepted on input
#[derive(Deserialize)]
struct PlaceRecord {
    #[serde(default, alias = "place_id")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "vicinity", alias = "formatted_address")]
    address: Option<String>,
    #[serde(default, alias = "types")]
    category_tags: Option<Vec<String>>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default, alias = "user_ratings_total")]
    rating_count: Option<u32>,
    #[serde(default)]
    open_now: Option<bool>,
    #[serde(default)]
    price_level: Option<u8>,
    #[serde(default)]
    coordinates: Option<RawLatLng>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    location: Option<RawLatLng>,
}

#[derive(Deserialize)]
struct RawLatLng {
    lat: Option<f64>,
    lng: Option<f64>,
}

impl RawLatLng {
    fn into_lat_lng(self) -> Option<LatLng> {
        LatLng::checked(self.lat?, self.lng?)
    }
}

impl From<PlaceRecord> for Place {
    fn from(record: PlaceRecord) -> Self {
        let coordinates = record
            .coordinates
            .or_else(|| record.geometry.and_then(|g| g.location))
            .and_then(RawLatLng::into_lat_lng);

        Self {
            id: record.id.filter(|id| !id.is_empty()),
            name: record.name.unwrap_or_default(),
            address: record.address.unwrap_or_default(),
            category_tags: record.category_tags.unwrap_or_default(),
            rating: record.rating.and_then(known_rating),
            rating_count: record.rating_count,
            open_now: record.open_now,
            price_level: record.price_level.map(|p| p.min(MAX_PRICE_LEVEL)),
            coordinates,
        }
    }
}
