//! Mesh containers.
//!
//! [`StaticMesh`] and [`DynamicMesh`] hold cells of one geometric type and
//! share the [`SingleTypeMesh`] contract. [`UnstructuredMesh`] is the
//! generic mixed-type form both of them widen into.

pub mod dynamic_mesh;
pub mod info;
pub mod single_type;
pub mod static_mesh;
pub mod unstructured;

pub use dynamic_mesh::DynamicMesh;
pub use info::MeshInfo;
pub use single_type::{ProfileSplit, SingleTypeMesh, aggregate_on_same_coords_to_unstructured};
pub use static_mesh::StaticMesh;
pub use unstructured::{Descending, UnstructuredMesh};
