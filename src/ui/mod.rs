pub mod popup;
pub mod widget;

pub use popup::{ActivePanel, InfoPanelContent, InfoPanelCoordinator};
pub use widget::{HealthMap, WeakHealthMap};
