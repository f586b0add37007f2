//! Reference cell shapes: codes, sons and orientation.

pub mod cell_type;
pub mod orientation;
pub(crate) mod sons;

pub use cell_type::CellType;
pub use orientation::invert_orientation;
