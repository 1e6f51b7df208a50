//! Map providers and the once-per-page loader that makes them available.

pub mod headless;
pub mod loader;

#[cfg(feature = "wasm")]
pub mod google;

pub use headless::{HeadlessProvider, HeadlessScriptSource, LoadBehavior, SurfaceProbe};
pub use loader::ProviderLoader;

#[cfg(feature = "wasm")]
pub use google::{BrowserNavigator, DomScriptSource, GoogleMapsProvider};
