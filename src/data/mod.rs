pub mod place;

pub use place::{MapProps, Place, PlaceCategory};
