//! Single static geometric type mesh.
//!
//! Every cell has the fixed node count of the mesh's shape, so the nodal
//! connectivity is one flat array addressed with a constant stride and no
//! index. Connectivity and coordinates are reference counted: clones share
//! them, and mutations install freshly built arrays.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algs::{dual_mesh, hexa8_sort, merge, renumber, simplexize};
use crate::algs::simplexize::SimplexizePolicy;
use crate::data::coordinates::Coordinates;
use crate::data::indexed_array::{IdType, count_distinct, slice_ids, with_cell_capacity};
use crate::debug_invariants::{DebugInvariants, validated};
use crate::geometry::metrics;
use crate::mesh::dynamic_mesh::DynamicMesh;
use crate::mesh::info::MeshInfo;
use crate::mesh::single_type::{SingleTypeMesh, no_connectivity, require_coords};
use crate::mesh::unstructured::UnstructuredMesh;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticMesh {
    info: MeshInfo,
    cell_type: CellType,
    coords: Option<Arc<Coordinates>>,
    conn: Option<Arc<Vec<IdType>>>,
}

impl StaticMesh {
    /// Empty mesh of shape `ty`; dynamic shapes are rejected.
    pub fn new(name: impl Into<String>, ty: CellType) -> Result<Self, MeshError> {
        if ty.is_dynamic() {
            return Err(MeshError::InvalidArgument(format!(
                "{} is a dynamic geometric type; only static types are allowed here",
                ty.repr()
            )));
        }
        Ok(Self {
            info: MeshInfo::named(name),
            cell_type: ty,
            coords: None,
            conn: None,
        })
    }

    /// Mesh assembled from coordinates and a flat connectivity, checked with
    /// [`check_consistency`](SingleTypeMesh::check_consistency).
    pub fn from_arrays(
        name: impl Into<String>,
        ty: CellType,
        coords: Arc<Coordinates>,
        conn: Vec<IdType>,
    ) -> Result<Self, MeshError> {
        let mut mesh = Self::new(name, ty)?;
        mesh.coords = Some(coords);
        mesh.conn = Some(Arc::new(conn));
        mesh.check_consistency()?;
        validated(mesh)
    }

    /// Fixed node count of the shape.
    #[inline]
    pub fn number_of_nodes_per_cell(&self) -> usize {
        self.cell_type.number_of_nodes().unwrap_or(0)
    }

    /// Install `conn` as the nodal connectivity without checking it.
    pub fn set_nodal_connectivity(&mut self, conn: Vec<IdType>) {
        self.conn = Some(Arc::new(conn));
    }

    /// Share an existing connectivity array.
    pub fn set_shared_nodal_connectivity(&mut self, conn: Arc<Vec<IdType>>) {
        self.conn = Some(conn);
    }

    pub fn nodal_connectivity_length(&self) -> Result<usize, MeshError> {
        Ok(self.conn.as_ref().ok_or_else(no_connectivity)?.len())
    }

    /// Reset the connectivity to an empty array with room for `nb_cells`.
    pub fn allocate_cells(&mut self, nb_cells: IdType) -> Result<(), MeshError> {
        if nb_cells < 0 {
            return Err(MeshError::InvalidArgument(format!(
                "number of cells to allocate must be >= 0, got {nb_cells}"
            )));
        }
        let conn = with_cell_capacity(nb_cells, self.number_of_nodes_per_cell())?;
        self.conn = Some(Arc::new(conn));
        Ok(())
    }

    /// Append one cell; its node list must have the shape's node count.
    pub fn insert_next_cell(&mut self, nodes: &[IdType]) -> Result<(), MeshError> {
        let nnpc = self.number_of_nodes_per_cell();
        if nodes.len() != nnpc {
            return Err(MeshError::InvalidArgument(format!(
                "input nodal size ({}) does not match the number of nodes per cell ({nnpc}) of {}",
                nodes.len(),
                self.cell_type.repr()
            )));
        }
        let conn = self.conn.as_mut().ok_or_else(|| {
            MeshError::InvalidArgument(
                "nodal connectivity is not allocated; call allocate_cells first".into(),
            )
        })?;
        Arc::make_mut(conn).extend_from_slice(nodes);
        Ok(())
    }

    /// The connectivity array is set.
    pub fn check_consistency_of_connectivity(&self) -> Result<(), MeshError> {
        self.conn.as_ref().map(|_| ()).ok_or_else(no_connectivity)
    }

    /// Node count of one cell, that is the shape's node count.
    pub fn number_of_nodes_in_cell(&self, cell: usize) -> Result<usize, MeshError> {
        self.cell_span(cell).map(|s| s.len())
    }

    /// Raw node count of every cell.
    pub fn compute_nb_of_nodes_per_cell(&self) -> Result<Vec<IdType>, MeshError> {
        self.check_consistency_light()?;
        Ok(vec![self.number_of_nodes_per_cell() as IdType; self.number_of_cells()?])
    }

    /// Son count of every cell (faces in 3D, edges in 2D).
    pub fn compute_nb_of_faces_per_cell(&self) -> Result<Vec<IdType>, MeshError> {
        self.check_consistency_light()?;
        (0..self.number_of_cells()?)
            .map(|c| Ok(self.cell_type.number_of_sons(self.cell_nodes(c)?) as IdType))
            .collect()
    }

    /// Distinct node count of every cell.
    pub fn compute_effective_nb_of_nodes_per_cell(&self) -> Result<Vec<IdType>, MeshError> {
        self.check_consistency_light()?;
        (0..self.number_of_cells()?)
            .map(|c| Ok(count_distinct(self.cell_nodes(c)?, true) as IdType))
            .collect()
    }

    /// Move cell `c` to position `old_to_new[c]`.
    ///
    /// With `check` set, `old_to_new` may hold any distinct values and is
    /// replaced by their ranks first; either way the final map must be a
    /// permutation of the cells.
    pub fn renumber_cells(&mut self, old_to_new: &[IdType], check: bool) -> Result<(), MeshError> {
        let n = self.number_of_cells()?;
        let o2n = renumber::prepare(old_to_new, n, check)?;
        let conn = self.conn.as_ref().ok_or_else(no_connectivity)?;
        let fresh = renumber::permute_fixed_stride(conn, self.number_of_nodes_per_cell(), &o2n);
        self.conn = Some(Arc::new(fresh));
        self.debug_assert_invariants();
        Ok(())
    }

    /// Sub-mesh made of the listed cells, in that order, on the same
    /// coordinates.
    pub fn build_part_of_my_self_keep_coords(&self, cell_ids: &[IdType]) -> Result<Self, MeshError> {
        let n = self.number_of_cells()?;
        let conn = self.conn.as_ref().ok_or_else(no_connectivity)?;
        let nnpc = self.number_of_nodes_per_cell();
        let mut part = Vec::with_capacity(cell_ids.len() * nnpc);
        for (pos, &c) in cell_ids.iter().enumerate() {
            if c < 0 || c as usize >= n {
                return Err(MeshError::OutOfRange(format!(
                    "position #{pos}: cell id {c} should be in [0, {n})"
                )));
            }
            let c = c as usize;
            part.extend_from_slice(&conn[c * nnpc..(c + 1) * nnpc]);
        }
        Ok(Self {
            info: self.info.clone(),
            cell_type: self.cell_type,
            coords: self.coords.clone(),
            conn: Some(Arc::new(part)),
        })
    }

    /// Like [`build_part_of_my_self_keep_coords`](Self::build_part_of_my_self_keep_coords)
    /// for the cells `start, start + step, ...` before `stop`.
    pub fn build_part_of_my_self_keep_coords_slice(
        &self,
        start: IdType,
        stop: IdType,
        step: IdType,
    ) -> Result<Self, MeshError> {
        let ids = slice_ids(start, stop, step)?;
        self.build_part_of_my_self_keep_coords(&ids)
    }

    /// Copy that shares nothing with `self`.
    pub fn deep_copy(&self) -> Self {
        Self {
            info: self.info.clone(),
            cell_type: self.cell_type,
            coords: self.coords.as_deref().cloned().map(Arc::new),
            conn: self.conn.as_deref().cloned().map(Arc::new),
        }
    }

    /// Copy with its own connectivity, still sharing the coordinates.
    pub fn deep_copy_connectivity_only(&self) -> Result<Self, MeshError> {
        self.check_consistency_light()?;
        Ok(Self {
            info: self.info.clone(),
            cell_type: self.cell_type,
            coords: self.coords.clone(),
            conn: self.conn.as_deref().cloned().map(Arc::new),
        })
    }

    /// Share the connectivity of `other`, which must have the same shape.
    pub fn shallow_copy_connectivity_from(&mut self, other: &StaticMesh) -> Result<(), MeshError> {
        if other.cell_type != self.cell_type {
            return Err(MeshError::InvalidArgument(format!(
                "cannot share the connectivity of a {} mesh with a {} mesh",
                other.cell_type.repr(),
                self.cell_type.repr()
            )));
        }
        self.conn = other.conn.clone();
        Ok(())
    }

    /// Narrow a generic mesh holding a single static geometric type.
    pub fn from_unstructured(mesh: &UnstructuredMesh) -> Result<Self, MeshError> {
        let types = mesh.all_geo_types()?;
        let [ty] = types.as_slice() else {
            return Err(MeshError::InvalidArgument(format!(
                "mesh \"{}\" holds {} geometric types; exactly one is required",
                mesh.name(),
                types.len()
            )));
        };
        let mut out = Self::new(mesh.name(), *ty)?;
        out.info = mesh.info().clone();
        out.coords = mesh.coords().cloned();
        let nnpc = out.number_of_nodes_per_cell();
        let mut conn = Vec::with_capacity(mesh.number_of_cells() * nnpc);
        for c in 0..mesh.number_of_cells() {
            let nodes = mesh.cell_node_ids(c)?;
            if nodes.len() != nnpc {
                return Err(MeshError::InvalidArgument(format!(
                    "cell {c} has {} nodes whereas {} expects {nnpc}",
                    nodes.len(),
                    ty.repr()
                )));
            }
            conn.extend_from_slice(nodes);
        }
        out.conn = Some(Arc::new(conn));
        validated(out)
    }

    /// Six QUAD4 cells per HEXA8 cell, on the same coordinates.
    pub fn explode_each_hexa8_to_6_quad4(&self) -> Result<StaticMesh, MeshError> {
        if self.cell_type != CellType::Hexa8 {
            return Err(MeshError::UnsupportedOperation(format!(
                "only HEXA8 meshes can be exploded into quads, this one is {}",
                self.cell_type.repr()
            )));
        }
        self.check_consistency_light()?;
        let conn = self.conn.as_ref().ok_or_else(no_connectivity)?;
        let mut out = StaticMesh::new(self.name(), CellType::Quad4)?;
        out.coords = self.coords.clone();
        out.conn = Some(Arc::new(hexa8_sort::explode_hexa8_quads(&conn[self.used_span()?])));
        Ok(out)
    }

    /// Three heights per TRI3 cell, one per edge in edge order.
    pub fn compute_triangle_height(&self) -> Result<Vec<f64>, MeshError> {
        self.check_consistency_light()?;
        if self.cell_type != CellType::Tri3 {
            return Err(MeshError::UnsupportedOperation(format!(
                "triangle heights need a TRI3 mesh, this one is {}",
                self.cell_type.repr()
            )));
        }
        let coords = require_coords(self)?;
        if !(2..=3).contains(&coords.dimension()) {
            return Err(MeshError::InvalidMeshState(format!(
                "triangle heights need space dimension 2 or 3, got {}",
                coords.dimension()
            )));
        }
        let mut out = Vec::with_capacity(3 * self.number_of_cells()?);
        for c in 0..self.number_of_cells()? {
            let p = metrics::gather_points(self.cell_nodes(c)?, coords)?;
            out.extend(metrics::triangle_heights(p[0], p[1], p[2]));
        }
        Ok(out)
    }

    /// Cut every cell into simplices; returns the new-to-old cell map.
    pub fn simplexize(&mut self, policy: SimplexizePolicy) -> Result<Vec<IdType>, MeshError> {
        let n = self.number_of_cells()?;
        let conn = self.conn.as_ref().ok_or_else(no_connectivity)?;
        match simplexize::simplexize_connectivity(self.cell_type, conn, n, policy)? {
            None => Ok((0..n as IdType).collect()),
            Some(split) => {
                log::debug!(
                    "simplexized {n} {} cells of \"{}\" into {} {} cells",
                    self.cell_type.repr(),
                    self.info.name,
                    split.new_to_old.len(),
                    split.cell_type.repr()
                );
                self.cell_type = split.cell_type;
                self.conn = Some(Arc::new(split.connectivity));
                self.debug_assert_invariants();
                Ok(split.new_to_old)
            }
        }
    }

    /// [`simplexize`](Self::simplexize) with a numeric policy code.
    pub fn simplexize_code(&mut self, policy: i64) -> Result<Vec<IdType>, MeshError> {
        self.simplexize(SimplexizePolicy::from_code(policy)?)
    }

    /// Give face-adjacent HEXA8 cells a matching local numbering; returns
    /// the ids of the renumbered cells.
    pub fn sort_hexa8_each_other(&mut self) -> Result<Vec<IdType>, MeshError> {
        if self.cell_type != CellType::Hexa8 {
            return Err(MeshError::UnsupportedOperation(format!(
                "only HEXA8 meshes can be sorted, this one is {}",
                self.cell_type.repr()
            )));
        }
        let conn = self.conn.as_ref().ok_or_else(no_connectivity)?;
        let (fresh, changed) = hexa8_sort::sort_hexa8_connectivity(conn)?;
        if !changed.is_empty() {
            log::debug!(
                "renumbered {} of {} hexahedra in \"{}\"",
                changed.len(),
                fresh.len() / 8,
                self.info.name
            );
            self.conn = Some(Arc::new(fresh));
        }
        Ok(changed)
    }

    /// Dual of a TRI3 or TETRA4 mesh, one polygon or polyhedron per node.
    pub fn compute_dual_mesh(&self) -> Result<DynamicMesh, MeshError> {
        dual_mesh::compute_dual_mesh(self)
    }

    /// General merge of `self` and `other`.
    pub fn merge_my_self_with(&self, other: &StaticMesh) -> Result<StaticMesh, MeshError> {
        merge::merge_static_meshes(&[self, other])
    }

    /// Concatenation of `self` and `other`, which must share coordinates.
    pub fn merge_my_self_with_on_same_coords(&self, other: &StaticMesh) -> Result<StaticMesh, MeshError> {
        merge::merge_static_meshes_on_same_coords(&[self, other])
    }
}

impl SingleTypeMesh for StaticMesh {
    fn info(&self) -> &MeshInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut MeshInfo {
        &mut self.info
    }

    fn cell_type(&self) -> CellType {
        self.cell_type
    }

    fn coords(&self) -> Option<&Arc<Coordinates>> {
        self.coords.as_ref()
    }

    fn set_coords(&mut self, coords: Arc<Coordinates>) {
        self.coords = Some(coords);
    }

    fn nodal_connectivity(&self) -> Option<&Arc<Vec<IdType>>> {
        self.conn.as_ref()
    }

    fn nodal_connectivity_mut(&mut self) -> Option<&mut Arc<Vec<IdType>>> {
        self.conn.as_mut()
    }

    fn number_of_cells(&self) -> Result<usize, MeshError> {
        let len = self.conn.as_ref().ok_or_else(no_connectivity)?.len();
        let nnpc = self.number_of_nodes_per_cell();
        if len % nnpc != 0 {
            return Err(MeshError::InconsistentState(format!(
                "connectivity holds {len} values, not a multiple of {nnpc} nodes per {} cell",
                self.cell_type.repr()
            )));
        }
        Ok(len / nnpc)
    }

    fn cell_span(&self, cell: usize) -> Result<Range<usize>, MeshError> {
        let n = self.number_of_cells()?;
        if cell >= n {
            return Err(MeshError::OutOfRange(format!("cell {cell} not in [0, {n})")));
        }
        let nnpc = self.number_of_nodes_per_cell();
        Ok(cell * nnpc..(cell + 1) * nnpc)
    }

    fn used_span(&self) -> Result<Range<usize>, MeshError> {
        Ok(0..self.number_of_cells()? * self.number_of_nodes_per_cell())
    }

    fn check_consistency_light(&self) -> Result<(), MeshError> {
        self.check_consistency_of_connectivity()?;
        self.number_of_cells().map(|_| ())
    }

    fn compute_diameter_field(&self) -> Result<Vec<f64>, MeshError> {
        self.check_consistency_light()?;
        let coords = require_coords(self)?;
        (0..self.number_of_cells()?)
            .map(|c| metrics::diameter(self.cell_nodes(c)?, coords))
            .collect()
    }

    fn storage_kind(&self) -> &'static str {
        "static"
    }
}

impl DebugInvariants for StaticMesh {
    fn validate_invariants(&self) -> Result<(), MeshError> {
        if self.cell_type.is_dynamic() {
            return Err(MeshError::InconsistentState(format!(
                "static mesh carries dynamic type {}",
                self.cell_type.repr()
            )));
        }
        if let Some(c) = &self.coords {
            c.validate_invariants()?;
        }
        if self.conn.is_some() {
            self.number_of_cells()?;
        }
        Ok(())
    }
}
