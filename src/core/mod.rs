pub mod config;
pub mod constants;
pub mod geo;
pub mod map;
pub mod state;
pub mod viewport;

pub use config::{LoaderConfig, MapConfig, ProviderConfig, SurfaceOptions};
pub use geo::{LatLng, LatLngBounds, Point};
pub use map::{MapInstanceManager, SurfaceBinding};
pub use state::LifecycleState;
pub use viewport::ViewportFitter;
