//! Merging of single-type meshes of one shape.
//!
//! The general merges put the coordinates of all parts one after the other
//! and shift every part's node ids by the number of nodes before it. The
//! "on same coords" variants require one shared coordinate array and only
//! concatenate connectivities. Every result is named `"merge"`.

use std::sync::Arc;

use crate::data::coordinates::Coordinates;
use crate::data::indexed_array::{IdType, aggregate_and_shift};
use crate::debug_invariants::validated;
use crate::mesh::dynamic_mesh::DynamicMesh;
use crate::mesh::single_type::{SingleTypeMesh, no_connectivity, same_coords};
use crate::mesh::static_mesh::StaticMesh;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;

pub use crate::data::indexed_array::aggregate_indexes;

const MERGED_NAME: &str = "merge";

/// Concatenate connectivities, shifting the node ids of part `k` by
/// `offsets[k]`; polyhedron separators are preserved.
pub fn aggregate_nodal_conn_and_shift_node_ids(
    conns: &[&[IdType]],
    offsets: &[IdType],
) -> Result<Vec<IdType>, MeshError> {
    aggregate_and_shift(conns, offsets)
}

fn common_type<M: SingleTypeMesh + ?Sized>(parts: &[&M]) -> Result<CellType, MeshError> {
    let first = parts
        .first()
        .ok_or_else(|| MeshError::InvalidArgument("cannot merge an empty list of meshes".into()))?;
    let ty = first.cell_type();
    if let Some((k, bad)) = parts.iter().enumerate().find(|(_, p)| p.cell_type() != ty) {
        return Err(MeshError::InvalidArgument(format!(
            "geometric types mismatch: mesh #{k} is {} whereas mesh #0 is {}",
            bad.cell_type().repr(),
            ty.repr()
        )));
    }
    Ok(ty)
}

/// Disjoint union of the coordinates of `parts` with the node offset of each
/// part. Parts without coordinates contribute no node; at least one part must
/// carry coordinates so that the space dimension is known.
fn union_coords<M: SingleTypeMesh + ?Sized>(
    parts: &[&M],
) -> Result<(Coordinates, Vec<IdType>), MeshError> {
    let dim = parts
        .iter()
        .find_map(|p| p.coords().map(|c| c.dimension()))
        .ok_or_else(|| {
            MeshError::InvalidArgument(
                "no mesh carries coordinates; the space dimension is unknown".into(),
            )
        })?;
    let empty = Coordinates::try_new(dim, Vec::new())?;
    let all: Vec<&Coordinates> = parts
        .iter()
        .map(|p| p.coords().map_or(&empty, |c| c.as_ref()))
        .collect();
    let mut offsets = Vec::with_capacity(all.len());
    let mut acc: IdType = 0;
    for c in &all {
        offsets.push(acc);
        acc += c.number_of_nodes() as IdType;
    }
    Ok((Coordinates::aggregate(&all)?, offsets))
}

fn shared_coords<M: SingleTypeMesh + ?Sized>(
    parts: &[&M],
) -> Result<Option<Arc<Coordinates>>, MeshError> {
    let first = parts
        .first()
        .ok_or_else(|| MeshError::InvalidArgument("cannot merge an empty list of meshes".into()))?;
    for (k, part) in parts.iter().enumerate().skip(1) {
        if !same_coords(part.coords(), first.coords()) {
            return Err(MeshError::InvalidArgument(format!(
                "mesh #{k} does not lie on the coordinates of mesh #0"
            )));
        }
    }
    Ok(first.coords().cloned())
}

fn used_conn<M: SingleTypeMesh + ?Sized>(mesh: &M) -> Result<&[IdType], MeshError> {
    let span = mesh.used_span()?;
    let conn = mesh.nodal_connectivity().ok_or_else(no_connectivity)?;
    Ok(&conn[span])
}

/// General merge of static meshes of one shape.
pub fn merge_static_meshes(parts: &[&StaticMesh]) -> Result<StaticMesh, MeshError> {
    let ty = common_type(parts)?;
    let conns = parts.iter().map(|p| used_conn(*p)).collect::<Result<Vec<_>, _>>()?;
    let (coords, offsets) = union_coords(parts)?;
    let conn = aggregate_and_shift(&conns, &offsets)?;
    log::debug!(
        "merged {} {} meshes into {} cells on {} nodes",
        parts.len(),
        ty.repr(),
        conn.len() / ty.number_of_nodes().unwrap_or(1).max(1),
        coords.number_of_nodes()
    );
    let mut out = StaticMesh::new(MERGED_NAME, ty)?;
    out.set_coords(Arc::new(coords));
    out.set_nodal_connectivity(conn);
    validated(out)
}

/// Merge of static meshes sharing one coordinate array.
pub fn merge_static_meshes_on_same_coords(parts: &[&StaticMesh]) -> Result<StaticMesh, MeshError> {
    let ty = common_type(parts)?;
    let coords = shared_coords(parts)?;
    let mut conn = Vec::new();
    for part in parts {
        conn.extend_from_slice(used_conn(*part)?);
    }
    let mut out = StaticMesh::new(MERGED_NAME, ty)?;
    if let Some(c) = coords {
        out.set_coords(c);
    }
    out.set_nodal_connectivity(conn);
    validated(out)
}

fn packed_parts(
    parts: &[&DynamicMesh],
) -> Result<Vec<(Arc<Vec<IdType>>, Arc<Vec<IdType>>)>, MeshError> {
    parts
        .iter()
        .map(|p| {
            let (_, conn, index) = p.retrieve_packed_nodal_connectivity()?;
            Ok((conn, index))
        })
        .collect()
}

fn build_dynamic(
    ty: CellType,
    coords: Option<Arc<Coordinates>>,
    packed: &[(Arc<Vec<IdType>>, Arc<Vec<IdType>>)],
    offsets: &[IdType],
) -> Result<DynamicMesh, MeshError> {
    let conns: Vec<&[IdType]> = packed.iter().map(|(c, _)| c.as_slice()).collect();
    let indexes: Vec<&[IdType]> = packed.iter().map(|(_, i)| i.as_slice()).collect();
    let conn = aggregate_nodal_conn_and_shift_node_ids(&conns, offsets)?;
    let index = aggregate_indexes(&indexes)?;
    let mut out = DynamicMesh::new(MERGED_NAME, ty)?;
    if let Some(c) = coords {
        out.set_coords(c);
    }
    out.set_nodal_connectivity(conn, index);
    validated(out)
}

/// General merge of dynamic meshes of one shape; every part is packed
/// first.
pub fn merge_dynamic_meshes(parts: &[&DynamicMesh]) -> Result<DynamicMesh, MeshError> {
    let ty = common_type(parts)?;
    let packed = packed_parts(parts)?;
    let (coords, offsets) = union_coords(parts)?;
    log::debug!(
        "merged {} {} meshes on {} nodes",
        parts.len(),
        ty.repr(),
        coords.number_of_nodes()
    );
    build_dynamic(ty, Some(Arc::new(coords)), &packed, &offsets)
}

/// Merge of dynamic meshes sharing one coordinate array.
pub fn merge_dynamic_meshes_on_same_coords(parts: &[&DynamicMesh]) -> Result<DynamicMesh, MeshError> {
    let ty = common_type(parts)?;
    let coords = shared_coords(parts)?;
    let packed = packed_parts(parts)?;
    build_dynamic(ty, coords, &packed, &vec![0; packed.len()])
}
