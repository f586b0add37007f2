//! Topological dual of simplex meshes.
//!
//! The dual has one cell per node of the primal mesh. Its coordinates are
//! the primal nodes followed by face barycenters (3D only), edge barycenters
//! and cell barycenters, so a dual node id is a primal id plus the offset of
//! its block.
//!
//! The tables below are written against the tetrahedron face and edge order
//! of [`crate::topology::sons`]. Edge slots are stored biased by 4 (by 8 in
//! the boundary table) and face slots by 4 in the boundary table, which keeps
//! the two kinds apart in a single row.

use std::sync::Arc;

use crate::data::coordinates::Coordinates;
use crate::data::indexed_array::{IdType, SENTINEL};
use crate::debug_invariants::validated;
use crate::mesh::dynamic_mesh::DynamicMesh;
use crate::mesh::single_type::{SingleTypeMesh, no_connectivity, require_coords};
use crate::mesh::static_mesh::StaticMesh;
use crate::mesh::unstructured::UnstructuredMesh;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;

/// Per local node of a tetrahedron: three quads `[edge, face, face]` around
/// the node, the cell barycenter sitting between the two faces.
const DUAL_TETRA_0: [usize; 36] = [
    4, 1, 0, 6, 0, 3, 7, 3, 1, //
    4, 0, 1, 5, 2, 0, 8, 1, 2, //
    6, 3, 0, 5, 0, 2, 9, 2, 3, //
    7, 1, 3, 9, 3, 2, 8, 2, 1, //
];

/// Per local node of a tetrahedron: for each of the three faces touching the
/// node, the `[edge, face, edge]` triangle closing the dual cell when that
/// face lies on the boundary.
const DUAL_TETRA_1: [usize; 36] = [
    8, 4, 10, 11, 5, 8, 10, 7, 11, //
    9, 4, 8, 8, 5, 12, 12, 6, 9, //
    10, 4, 9, 9, 6, 13, 13, 7, 10, //
    12, 5, 11, 13, 6, 12, 11, 7, 13, //
];

/// Local face of the tetrahedron not containing each local node.
const TETRA_FACE_NOT_ON_NODE: [usize; 4] = [2, 3, 1, 0];

/// Per local node of a triangle: edges before and after the cell barycenter.
const DUAL_TRI_0: [usize; 6] = [0, 2, 1, 0, 2, 1];

/// Per local node of a triangle: boundary edge segments, biased by 3. A
/// positive entry runs from the edge barycenter to the node, a negative one
/// from the node to the edge barycenter.
const DUAL_TRI_1: [i64; 6] = [-3, 5, 3, -4, 4, -5];

/// Local edge of the triangle not containing each local node.
const TRI_EDGE_NOT_ON_NODE: [usize; 3] = [1, 2, 0];

/// Build the dual of a TRI3 (mesh dimension 2) or TETRA4 (mesh dimension 3)
/// mesh. The result is named `"DualOf_"` followed by the primal name.
pub fn compute_dual_mesh(mesh: &StaticMesh) -> Result<DynamicMesh, MeshError> {
    let ty = mesh.cell_type();
    if !ty.is_simplex() {
        return Err(MeshError::UnsupportedOperation(format!(
            "mesh \"{}\" of {} cells is not a simplex mesh; simplexize it first",
            mesh.name(),
            ty.repr()
        )));
    }
    match mesh.mesh_dimension() {
        3 => dual_3d(mesh),
        2 => dual_2d(mesh),
        d => Err(MeshError::InvalidArgument(format!(
            "dual mesh requires mesh dimension 2 or 3, got {d}"
        ))),
    }
}

struct Primal<'a> {
    conn: &'a [IdType],
    nb_nodes: usize,
    generic: UnstructuredMesh,
    rev: Vec<IdType>,
    rev_index: Vec<IdType>,
}

impl<'a> Primal<'a> {
    fn new(mesh: &'a StaticMesh, expected: CellType) -> Result<Self, MeshError> {
        if mesh.cell_type() != expected {
            return Err(MeshError::InvalidArgument(format!(
                "dual mesh in dimension {} is only available for {} cells, not {}",
                expected.dimension(),
                expected.repr(),
                mesh.cell_type().repr()
            )));
        }
        mesh.check_fully_defined()?;
        let conn = mesh.nodal_connectivity().ok_or_else(no_connectivity)?;
        let generic = mesh.build_unstructured()?;
        let (rev, rev_index) = generic.reverse_nodal_connectivity()?;
        Ok(Self {
            conn: conn.as_slice(),
            nb_nodes: mesh.number_of_nodes()?,
            generic,
            rev,
            rev_index,
        })
    }

    /// Cells around `node`, ascending.
    fn cells_around(&self, node: usize) -> Result<&[IdType], MeshError> {
        let (start, stop) = (self.rev_index[node] as usize, self.rev_index[node + 1] as usize);
        if start == stop {
            return Err(MeshError::InvalidMeshState(format!(
                "node #{node} is orphan; every node must belong to a cell to build the dual"
            )));
        }
        Ok(&self.rev[start..stop])
    }

    fn local_position(&self, cell: usize, stride: usize, node: usize) -> Result<usize, MeshError> {
        self.conn[stride * cell..stride * (cell + 1)]
            .iter()
            .position(|&v| v == node as IdType)
            .ok_or_else(|| {
                MeshError::InconsistentState(format!("node {node} is not a node of cell {cell}"))
            })
    }
}

fn block(dim: usize, values: Vec<f64>) -> Result<Coordinates, MeshError> {
    Coordinates::try_new(dim, values)
}

fn dual_name(mesh: &StaticMesh) -> String {
    format!("DualOf_{}", mesh.name())
}

fn dual_3d(mesh: &StaticMesh) -> Result<DynamicMesh, MeshError> {
    let primal = Primal::new(mesh, CellType::Tetra4)?;
    let edges = primal.generic.explode_to_edges()?;
    let faces = primal.generic.descending_connectivity()?;
    let (d1, d2) = (&edges.desc, &faces.desc);
    let coords = require_coords(mesh)?;
    let dim = coords.dimension();

    let nn = primal.nb_nodes as IdType;
    let nb_faces = faces.sons.number_of_cells() as IdType;
    let nb_edges = edges.sons.number_of_cells() as IdType;
    let offset0 = nn + nb_faces;
    let offset1 = offset0 + nb_edges;
    let all = Coordinates::aggregate(&[
        coords,
        &block(dim, faces.sons.cell_centers_of_mass()?)?,
        &block(dim, edges.sons.cell_centers_of_mass()?)?,
        &block(dim, primal.generic.cell_centers_of_mass()?)?,
    ])?;

    let mut conn = Vec::new();
    let mut index = Vec::with_capacity(primal.nb_nodes + 1);
    index.push(0);
    for node in 0..primal.nb_nodes {
        for (j, &cell) in primal.cells_around(node)?.iter().enumerate() {
            let c = cell as usize;
            let p = primal.local_position(c, 4, node)?;
            if j != 0 {
                conn.push(SENTINEL);
            }
            let row = &DUAL_TETRA_0[9 * p..9 * p + 9];
            for (q, quad) in row.chunks_exact(3).enumerate() {
                if q != 0 {
                    conn.push(SENTINEL);
                }
                conn.extend_from_slice(&[
                    d1[6 * c + quad[0] - 4] + offset0,
                    d2[4 * c + quad[1]] + nn,
                    cell + offset1,
                    d2[4 * c + quad[2]] + nn,
                ]);
            }
            let boundary = &DUAL_TETRA_1[9 * p..9 * p + 9];
            let touching = (0..4).filter(|&k| k != TETRA_FACE_NOT_ON_NODE[p]);
            for (tri, k) in boundary.chunks_exact(3).zip(touching) {
                if faces.number_of_cells_sharing(d2[4 * c + k] as usize) == 1 {
                    conn.extend_from_slice(&[
                        SENTINEL,
                        node as IdType,
                        d1[6 * c + tri[0] - 8] + offset0,
                        d2[4 * c + tri[1] - 4] + nn,
                        d1[6 * c + tri[2] - 8] + offset0,
                    ]);
                }
            }
        }
        index.push(conn.len() as IdType);
    }
    log::debug!(
        "dual of \"{}\": {} polyhedra on {} nodes",
        mesh.name(),
        primal.nb_nodes,
        all.number_of_nodes()
    );
    finish(mesh, CellType::Polyhed, all, conn, index)
}

fn dual_2d(mesh: &StaticMesh) -> Result<DynamicMesh, MeshError> {
    let primal = Primal::new(mesh, CellType::Tri3)?;
    let edges = primal.generic.descending_connectivity()?;
    let d2 = &edges.desc;
    let coords = require_coords(mesh)?;
    let dim = coords.dimension();

    let nn = primal.nb_nodes as IdType;
    let offset0 = nn + edges.sons.number_of_cells() as IdType;
    let all = Coordinates::aggregate(&[
        coords,
        &block(dim, edges.sons.cell_centers_of_mass()?)?,
        &block(dim, primal.generic.cell_centers_of_mass()?)?,
    ])?;

    let mut conn = Vec::new();
    let mut index = Vec::with_capacity(primal.nb_nodes + 1);
    index.push(0);
    for node in 0..primal.nb_nodes {
        let mut parts = Vec::new();
        for &cell in primal.cells_around(node)? {
            let c = cell as usize;
            let p = primal.local_position(c, 3, node)?;
            parts.push(vec![
                d2[3 * c + DUAL_TRI_0[2 * p]] + nn,
                cell + offset0,
                d2[3 * c + DUAL_TRI_0[2 * p + 1]] + nn,
            ]);
            let touching = (0..3).filter(|&k| k != TRI_EDGE_NOT_ON_NODE[p]);
            for (&rel, k) in DUAL_TRI_1[2 * p..2 * p + 2].iter().zip(touching) {
                if edges.number_of_cells_sharing(d2[3 * c + k] as usize) != 1 {
                    continue;
                }
                let edge = |r: i64| d2[3 * c + (r - 3) as usize] + nn;
                parts.push(if rel > 0 {
                    vec![edge(rel), node as IdType]
                } else {
                    vec![node as IdType, edge(-rel)]
                });
            }
        }
        conn.extend(build_polygon_from_parts(&parts)?);
        index.push(conn.len() as IdType);
    }
    log::debug!(
        "dual of \"{}\": {} polygons on {} nodes",
        mesh.name(),
        primal.nb_nodes,
        all.number_of_nodes()
    );
    finish(mesh, CellType::Polygon, all, conn, index)
}

fn finish(
    mesh: &StaticMesh,
    ty: CellType,
    coords: Coordinates,
    conn: Vec<IdType>,
    index: Vec<IdType>,
) -> Result<DynamicMesh, MeshError> {
    let mut out = DynamicMesh::new(dual_name(mesh), ty)?;
    out.set_coords(Arc::new(coords));
    out.set_nodal_connectivity(conn, index);
    validated(out)
}

/// Chain open polylines into one closed polygon.
///
/// Starting from `parts[0]`, the unused part whose first node is the current
/// last node is appended (without its first node) until every part is used.
/// A closing node equal to the first one is dropped.
pub fn build_polygon_from_parts(parts: &[Vec<IdType>]) -> Result<Vec<IdType>, MeshError> {
    let Some(first) = parts.first() else {
        return Ok(Vec::new());
    };
    let mut out = first.clone();
    let mut used = vec![false; parts.len()];
    used[0] = true;
    for _ in 1..parts.len() {
        let tail = out.last().copied();
        let next = (0..parts.len())
            .find(|&i| !used[i] && parts[i].first().copied() == tail)
            .ok_or_else(|| {
                MeshError::InconsistentState(
                    "the parts do not chain into a single polygon".into(),
                )
            })?;
        used[next] = true;
        out.extend_from_slice(&parts[next][1..]);
    }
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    Ok(out)
}
