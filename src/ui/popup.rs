use crate::{
    core::geo::LatLng,
    data::place::Place,
    input::events::{directions_url, NavigationIntent},
    layers::marker::MarkerSet,
    traits::{MarkerId, PanelId, SurfaceBackend},
    Result,
};
use instant::Instant;
use serde::{Deserialize, Serialize};

pub const NO_RATINGS: &str = "No ratings yet";
pub const OPEN_NOW: &str = "Open now";
pub const CLOSED: &str = "Closed";
pub const SCHEDULE_UNAVAILABLE: &str = "Schedule unavailable";
pub const DIRECTIONS_LABEL: &str = "Get directions";

/// CSS class of the directions button inside a rendered panel
pub const DIRECTIONS_BUTTON_CLASS: &str = "healthmap-directions";

/// Text shown in a place marker's info panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoPanelContent {
    pub title: String,
    pub address: String,
    pub rating: String,
    pub status: String,
    /// `None` when the price level is 0 or unknown
    pub price: Option<String>,
    pub destination: Option<LatLng>,
    /// `None` when the place has no coordinates
    pub directions_url: Option<String>,
}

impl InfoPanelContent {
    pub fn from_place(place: &Place) -> Self {
        let rating = match (place.rating, place.rating_count) {
            (Some(rating), Some(1)) => format!("⭐ {} (1 review)", rating),
            (Some(rating), Some(count)) => format!("⭐ {} ({} reviews)", rating, count),
            (Some(rating), None) => format!("⭐ {}", rating),
            (None, _) => NO_RATINGS.to_string(),
        };

        let status = match place.open_now {
            Some(true) => OPEN_NOW,
            Some(false) => CLOSED,
            None => SCHEDULE_UNAVAILABLE,
        }
        .to_string();

        let price = place
            .price_level
            .filter(|level| *level > 0)
            .map(|level| format!("Price level: {}", "$".repeat(level as usize)));

        let destination = place.coordinates;
        let directions_url = destination.and_then(|d| directions_url(d).ok());

        Self {
            title: place.display_name().to_string(),
            address: place.display_address().to_string(),
            rating,
            status,
            price,
            destination,
            directions_url,
        }
    }

    pub fn has_directions(&self) -> bool {
        self.directions_url.is_some()
    }

    /// Panel markup. Every place-supplied string is escaped.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"healthmap-panel\">");
        html.push_str(&format!("<h3>{}</h3>", escape_html(&self.title)));
        html.push_str(&format!("<p>{}</p>", escape_html(&self.address)));
        html.push_str(&format!("<div>{}</div>", escape_html(&self.rating)));
        html.push_str(&format!("<div>{}</div>", escape_html(&self.status)));
        if let Some(price) = &self.price {
            html.push_str(&format!("<div>{}</div>", escape_html(price)));
        }
        if self.has_directions() {
            html.push_str(&format!(
                "<button type=\"button\" class=\"{}\">{}</button>",
                DIRECTIONS_BUTTON_CLASS, DIRECTIONS_LABEL
            ));
        }
        html.push_str("</div>");
        html
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// The single open info panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivePanel {
    pub marker: MarkerId,
    pub panel: PanelId,
    pub opened_at: Instant,
}

/// Keeps at most one info panel open per surface.
#[derive(Debug, Default)]
pub struct InfoPanelCoordinator {
    active: Option<ActivePanel>,
}

impl InfoPanelCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ActivePanel> {
        self.active.as_ref()
    }

    /// Open the panel of `marker`, closing whatever panel was open first.
    ///
    /// Markers without panel content (the user-location marker) and markers
    /// not in `markers` are ignored and leave the open panel alone.
    pub fn open_for(
        &mut self,
        surface: &mut dyn SurfaceBackend,
        markers: &MarkerSet,
        marker: MarkerId,
    ) -> Result<Option<PanelId>> {
        let Some(handle) = markers.get(marker) else {
            log::debug!("ignoring click on stale {}", marker);
            return Ok(None);
        };
        let Some(info) = &handle.info else {
            return Ok(None);
        };

        if let Some(active) = &self.active {
            if active.marker == marker {
                return Ok(Some(active.panel));
            }
        }

        self.close(surface);
        let panel = surface.open_info_panel(marker, info)?;
        self.active = Some(ActivePanel {
            marker,
            panel,
            opened_at: Instant::now(),
        });
        log::debug!("opened {} for {}", panel, marker);
        Ok(Some(panel))
    }

    /// The user closed `panel` with its own control
    pub fn panel_closed(&mut self, panel: PanelId) -> bool {
        match self.active {
            Some(active) if active.panel == panel => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Close the open panel, if any
    pub fn close(&mut self, surface: &mut dyn SurfaceBackend) -> Option<ActivePanel> {
        let active = self.active.take()?;
        surface.close_info_panel(active.panel);
        Some(active)
    }

    /// Drop the open panel without touching a surface that is already gone
    pub fn forget(&mut self) {
        self.active = None;
    }

    /// Directions intent for the marker's place, `None` when it has none
    pub fn directions_for(markers: &MarkerSet, marker: MarkerId) -> Option<NavigationIntent> {
        let destination = markers.get(marker)?.info.as_ref()?.destination?;
        NavigationIntent::directions_to(destination).ok()
    }
}
