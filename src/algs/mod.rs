//! Connectivity algorithms over single-type meshes.

pub mod dual_mesh;
pub mod hexa8_sort;
pub mod merge;
pub mod renumber;
pub mod simplexize;

pub use merge::{
    aggregate_indexes, aggregate_nodal_conn_and_shift_node_ids, merge_dynamic_meshes,
    merge_dynamic_meshes_on_same_coords, merge_static_meshes, merge_static_meshes_on_same_coords,
};
pub use simplexize::SimplexizePolicy;
