//! Array storage: shared coordinates and flat id arrays.

pub mod coordinates;
pub mod indexed_array;

pub use coordinates::Coordinates;
pub use indexed_array::{IdType, SENTINEL};
