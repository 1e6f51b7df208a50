use crate::{
    core::{
        constants,
        geo::{LatLngBounds, Point},
    },
    layers::marker::MarkerSet,
    traits::SurfaceBackend,
    Result,
};

/// Fits the surface's viewport to the current marker set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportFitter {
    padding: f64,
}

impl ViewportFitter {
    pub fn new(padding: f64) -> Self {
        Self {
            padding: padding.max(0.0),
        }
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Bounding box over every marker, user marker included
    pub fn bounds_for(markers: &MarkerSet) -> Option<LatLngBounds> {
        LatLngBounds::from_points(markers.iter().map(|m| &m.position))
    }

    /// Ask the surface to show every marker. An empty set leaves the viewport
    /// alone and returns `None`.
    pub fn fit_to_markers(
        &self,
        surface: &mut dyn SurfaceBackend,
        markers: &MarkerSet,
    ) -> Result<Option<LatLngBounds>> {
        let Some(bounds) = Self::bounds_for(markers) else {
            log::debug!("no markers to fit");
            return Ok(None);
        };

        surface.fit_bounds(&bounds, self.padding)?;
        log::debug!(
            "fitted {} markers into {:?}..{:?}",
            markers.len(),
            bounds.south_west,
            bounds.north_east
        );
        Ok(Some(bounds))
    }
}

impl Default for ViewportFitter {
    fn default() -> Self {
        Self::new(constants::DEFAULT_FIT_PADDING)
    }
}

/// Largest integer zoom in `min_zoom..=max_zoom` at which `bounds`, projected
/// with Web Mercator, fits inside `size` minus `padding` on every side.
pub fn fit_zoom(
    bounds: &LatLngBounds,
    size: Point,
    padding: f64,
    min_zoom: f64,
    max_zoom: f64,
) -> f64 {
    let available = Point::new(size.x - 2.0 * padding, size.y - 2.0 * padding);
    let north_west = bounds.north_west();
    let south_east = bounds.south_east();

    let mut best_zoom = min_zoom;
    for test_zoom in (min_zoom.ceil() as i32)..=(max_zoom.floor() as i32) {
        let zoom = test_zoom as f64;
        let extent = south_east.project(zoom).subtract(&north_west.project(zoom));

        if extent.x.abs() <= available.x && extent.y.abs() <= available.y {
            best_zoom = zoom;
        } else {
            break;
        }
    }

    best_zoom
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;

    #[test]
    fn test_fit_zoom_city_extent() {
        // ~0.1 degrees across Santiago fits at zoom 12 in 800x600
        let bounds = LatLngBounds::from_coords(-33.50, -70.70, -33.40, -70.60);
        let zoom = fit_zoom(&bounds, Point::new(800.0, 600.0), 20.0, 0.0, 22.0);
        assert_eq!(zoom, 12.0);
    }

    #[test]
    fn test_fit_zoom_single_point_hits_max() {
        let bounds = LatLngBounds::from_point(LatLng::new(-33.45, -70.66));
        let zoom = fit_zoom(&bounds, Point::new(800.0, 600.0), 20.0, 0.0, 22.0);
        assert_eq!(zoom, 22.0);
    }

    #[test]
    fn test_fit_zoom_padding_larger_than_viewport() {
        let bounds = LatLngBounds::from_coords(-34.0, -71.0, -33.0, -70.0);
        let zoom = fit_zoom(&bounds, Point::new(30.0, 30.0), 20.0, 0.0, 22.0);
        assert_eq!(zoom, 0.0);
    }

    #[test]
    fn test_more_padding_never_zooms_in() {
        let bounds = LatLngBounds::from_coords(-33.50, -70.70, -33.40, -70.60);
        let size = Point::new(800.0, 600.0);
        let tight = fit_zoom(&bounds, size, 0.0, 0.0, 22.0);
        let loose = fit_zoom(&bounds, size, 250.0, 0.0, 22.0);
        assert!(loose <= tight);
    }
}
