pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{directions_url, NavigationIntent, SurfaceEvent};
pub use handler::{EventBus, Subscription};
