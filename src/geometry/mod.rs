//! Geometry of single cells.
//!
//! Measures, centers, bounding boxes and point location used by the mesh
//! level geometric fields.

pub mod metrics;
