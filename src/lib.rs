#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-coupling
//!
//! mesh-coupling represents unstructured meshes whose cells all share one
//! geometric type, the building block of mesh-to-mesh coupling codes. Two
//! storage kinds are provided:
//!
//! - [`StaticMesh`]: shapes with a fixed node count (triangles, quadrangles,
//!   tetrahedra, hexahedra, ...) stored as a flat fixed-stride connectivity.
//! - [`DynamicMesh`]: polygons and polyhedra stored as a connectivity plus an
//!   offset index, polyhedron faces separated by `-1`.
//!
//! Both implement [`SingleTypeMesh`], widen into the generic mixed-type
//! [`UnstructuredMesh`] and can be rebuilt from one.
//!
//! ## Features
//! - Cell queries, reverse nodal connectivity, profiles and partial meshes
//! - Cell and node renumbering, orientation inversion, node merging
//! - Simplexization of quadrangles and hexahedra, consistent hexahedron
//!   numbering, dual meshes of triangle and tetrahedron meshes
//! - Merging of meshes with or without shared coordinates
//! - Sizes-first tiny serialization and a versioned little-endian wire form
//!
//! ## Sharing
//! Coordinates and connectivity arrays are held behind [`std::sync::Arc`].
//! Several meshes may point to one coordinate array; a mesh that mutates a
//! shared array first takes its own copy through `Arc::make_mut`.
//!
//! ## Invariant checking
//! Every mutation re-validates the mesh in debug builds, or with the
//! `check-invariants` / `strict-invariants` features, see [`DebugInvariants`].
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mesh-coupling = "0.1"
//! ```

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod geometry;
pub mod io;
pub mod mesh;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use mesh::{DynamicMesh, SingleTypeMesh, StaticMesh, UnstructuredMesh};
pub use mesh_error::{ErrorKind, MeshError};

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::simplexize::SimplexizePolicy;
    pub use crate::algs::{
        merge_dynamic_meshes, merge_dynamic_meshes_on_same_coords, merge_static_meshes,
        merge_static_meshes_on_same_coords,
    };
    pub use crate::data::coordinates::Coordinates;
    pub use crate::data::indexed_array::{IdType, SENTINEL};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::io::tiny::{TinyPayload, TinySerializable, TinySerializationInfo};
    pub use crate::mesh::{
        DynamicMesh, MeshInfo, SingleTypeMesh, StaticMesh, UnstructuredMesh,
        aggregate_on_same_coords_to_unstructured,
    };
    pub use crate::mesh_error::{ErrorKind, MeshError};
    pub use crate::topology::cell_type::CellType;
}
