pub mod marker;
pub mod sync;

pub use marker::{MarkerHandle, MarkerIcon, MarkerKind, MarkerSet, MarkerSpec};
pub use sync::MarkerSynchronizer;
