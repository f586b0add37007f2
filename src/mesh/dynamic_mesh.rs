//! Single dynamic geometric type mesh (polygons, quadratic polygons,
//! polyhedra).
//!
//! Cells have varying lengths, so the connectivity comes with an offset
//! index: cell `c` is `conn[index[c]..index[c + 1]]`. The index may cover
//! only part of the connectivity; such a pair is "unpacked" and
//! [`DynamicMesh::retrieve_packed_nodal_connectivity`] compacts it.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algs::simplexize::SimplexizePolicy;
use crate::algs::{merge, renumber};
use crate::data::coordinates::Coordinates;
use crate::data::indexed_array::{
    IdType, count_distinct, count_non_sentinels, count_sentinels, offsets_from_lengths, slice_ids,
    with_cell_capacity,
};
use crate::debug_invariants::{DebugInvariants, validated};
use crate::mesh::info::MeshInfo;
use crate::mesh::single_type::{SingleTypeMesh, no_connectivity};
use crate::mesh::unstructured::UnstructuredMesh;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicMesh {
    info: MeshInfo,
    cell_type: CellType,
    coords: Option<Arc<Coordinates>>,
    conn: Option<Arc<Vec<IdType>>>,
    index: Option<Arc<Vec<IdType>>>,
}

fn no_index() -> MeshError {
    MeshError::InvalidMeshState("nodal connectivity index is not set".into())
}

impl DynamicMesh {
    /// Empty mesh of shape `ty`; static shapes are rejected.
    pub fn new(name: impl Into<String>, ty: CellType) -> Result<Self, MeshError> {
        if !ty.is_dynamic() {
            return Err(MeshError::InvalidArgument(format!(
                "{} is a static geometric type; only dynamic types are allowed here",
                ty.repr()
            )));
        }
        Ok(Self {
            info: MeshInfo::named(name),
            cell_type: ty,
            coords: None,
            conn: None,
            index: None,
        })
    }

    /// Mesh assembled from coordinates, connectivity and index, checked with
    /// [`check_consistency`](SingleTypeMesh::check_consistency).
    pub fn from_arrays(
        name: impl Into<String>,
        ty: CellType,
        coords: Arc<Coordinates>,
        conn: Vec<IdType>,
        index: Vec<IdType>,
    ) -> Result<Self, MeshError> {
        let mut mesh = Self::new(name, ty)?;
        mesh.coords = Some(coords);
        mesh.conn = Some(Arc::new(conn));
        mesh.index = Some(Arc::new(index));
        mesh.check_consistency()?;
        validated(mesh)
    }

    /// Install both arrays without checking them.
    pub fn set_nodal_connectivity(&mut self, conn: Vec<IdType>, index: Vec<IdType>) {
        self.conn = Some(Arc::new(conn));
        self.index = Some(Arc::new(index));
    }

    /// Share existing arrays.
    pub fn set_shared_nodal_connectivity(&mut self, conn: Arc<Vec<IdType>>, index: Arc<Vec<IdType>>) {
        self.conn = Some(conn);
        self.index = Some(index);
    }

    pub fn nodal_connectivity_index(&self) -> Option<&Arc<Vec<IdType>>> {
        self.index.as_ref()
    }

    fn arrays(&self) -> Result<(&Arc<Vec<IdType>>, &Arc<Vec<IdType>>), MeshError> {
        let conn = self.conn.as_ref().ok_or_else(no_connectivity)?;
        let index = self.index.as_ref().ok_or_else(no_index)?;
        Ok((conn, index))
    }

    /// Reset to no cells, with room for about `nb_cells`.
    pub fn allocate_cells(&mut self, nb_cells: IdType) -> Result<(), MeshError> {
        if nb_cells < 0 {
            return Err(MeshError::InvalidArgument(format!(
                "number of cells to allocate must be >= 0, got {nb_cells}"
            )));
        }
        let conn = with_cell_capacity(nb_cells, 3)?;
        let mut index = with_cell_capacity(nb_cells, 1)?;
        index.push(0);
        self.conn = Some(Arc::new(conn));
        self.index = Some(Arc::new(index));
        Ok(())
    }

    /// Append one cell. The index must end exactly at the end of the
    /// connectivity.
    pub fn insert_next_cell(&mut self, nodes: &[IdType]) -> Result<(), MeshError> {
        let (Some(conn), Some(index)) = (self.conn.as_mut(), self.index.as_mut()) else {
            return Err(MeshError::InvalidArgument(
                "nodal connectivity is not allocated; call allocate_cells first".into(),
            ));
        };
        let pos = index.last().copied().unwrap_or(0);
        if pos != conn.len() as IdType {
            return Err(MeshError::InconsistentState(format!(
                "nodal index ends at {pos} whereas the connectivity holds {} values",
                conn.len()
            )));
        }
        Arc::make_mut(conn).extend_from_slice(nodes);
        Arc::make_mut(index).push(pos + nodes.len() as IdType);
        Ok(())
    }

    /// Both arrays are set and the first and last offsets lie within the
    /// connectivity.
    pub fn check_consistency_of_connectivity(&self) -> Result<(), MeshError> {
        let (conn, index) = self.arrays()?;
        let len = conn.len() as IdType;
        let (Some(&front), Some(&back)) = (index.first(), index.last()) else {
            return Err(MeshError::InconsistentState(
                "nodal connectivity index must hold at least one value".into(),
            ));
        };
        if front < 0 || (len > 0 && front >= len) {
            return Err(MeshError::InconsistentState(format!(
                "first index value ({front}) must lie in [0, {len})"
            )));
        }
        if back < 0 || back > len {
            return Err(MeshError::InconsistentState(format!(
                "last index value ({back}) must lie in [0, {len}]"
            )));
        }
        if front > back {
            return Err(MeshError::InconsistentState(format!(
                "index is not increasing: front ({front}) is greater than back ({back})"
            )));
        }
        Ok(())
    }

    /// Node count of one cell, separators excluded.
    pub fn get_number_of_nodes_in_cell(&self, cell: usize) -> Result<usize, MeshError> {
        Ok(count_non_sentinels(self.cell_nodes(cell)?))
    }

    /// Raw slice length of every cell, separators included.
    pub fn compute_nb_of_nodes_per_cell(&self) -> Result<Vec<IdType>, MeshError> {
        self.per_cell(|nodes| nodes.len() as IdType)
    }

    /// Face count of every polyhedron, edge count of every polygon.
    pub fn compute_nb_of_faces_per_cell(&self) -> Result<Vec<IdType>, MeshError> {
        let ty = self.cell_type;
        self.per_cell(|nodes| match ty {
            CellType::Polyhed => count_sentinels(nodes) as IdType + 1,
            _ => ty.number_of_sons(nodes) as IdType,
        })
    }

    /// Distinct node count of every cell; polyhedron separators are not
    /// nodes.
    pub fn compute_effective_nb_of_nodes_per_cell(&self) -> Result<Vec<IdType>, MeshError> {
        let polyhed = self.cell_type == CellType::Polyhed;
        self.per_cell(|nodes| count_distinct(nodes, polyhed) as IdType)
    }

    fn per_cell(&self, f: impl Fn(&[IdType]) -> IdType) -> Result<Vec<IdType>, MeshError> {
        self.check_consistency_light()?;
        (0..self.number_of_cells()?)
            .map(|c| Ok(f(self.cell_nodes(c)?)))
            .collect()
    }

    /// Move cell `c` to position `old_to_new[c]`; the result is packed.
    ///
    /// With `check` set, `old_to_new` may hold any distinct values and is
    /// replaced by their ranks first.
    pub fn renumber_cells(&mut self, old_to_new: &[IdType], check: bool) -> Result<(), MeshError> {
        let n = self.number_of_cells()?;
        let o2n = renumber::prepare(old_to_new, n, check)?;
        let (conn, index) = self.arrays()?;
        let (new_conn, new_index) = renumber::permute_indexed(conn, index, &o2n)?;
        self.conn = Some(Arc::new(new_conn));
        self.index = Some(Arc::new(new_index));
        self.debug_assert_invariants();
        Ok(())
    }

    /// Sub-mesh made of the listed cells, in that order, on the same
    /// coordinates.
    pub fn build_part_of_my_self_keep_coords(&self, cell_ids: &[IdType]) -> Result<Self, MeshError> {
        let n = self.number_of_cells()?;
        let mut conn = Vec::new();
        let mut lengths = Vec::with_capacity(cell_ids.len());
        for (pos, &c) in cell_ids.iter().enumerate() {
            if c < 0 || c as usize >= n {
                return Err(MeshError::OutOfRange(format!(
                    "position #{pos}: cell id {c} should be in [0, {n})"
                )));
            }
            let nodes = self.cell_nodes(c as usize)?;
            conn.extend_from_slice(nodes);
            lengths.push(nodes.len());
        }
        Ok(Self {
            info: self.info.clone(),
            cell_type: self.cell_type,
            coords: self.coords.clone(),
            conn: Some(Arc::new(conn)),
            index: Some(Arc::new(offsets_from_lengths(lengths))),
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
        self.build_part_of_my_self_keep_coords(&slice_ids(start, stop, step)?)
    }

    /// The index starts at 0 and ends at the connectivity length.
    pub fn is_packed(&self) -> Result<bool, MeshError> {
        self.check_consistency_light()?;
        let (conn, index) = self.arrays()?;
        Ok(index.first() == Some(&0) && index.last().copied() == Some(conn.len() as IdType))
    }

    /// Packed `(conn, index)` pair describing the same cells.
    ///
    /// When already packed the stored arrays are returned with `true`;
    /// otherwise the covered range is copied, the index rebased to 0, and
    /// `false` is returned.
    pub fn retrieve_packed_nodal_connectivity(
        &self,
    ) -> Result<(bool, Arc<Vec<IdType>>, Arc<Vec<IdType>>), MeshError> {
        let packed = self.is_packed()?;
        let (conn, index) = self.arrays()?;
        if packed {
            return Ok((true, Arc::clone(conn), Arc::clone(index)));
        }
        let (front, back) = (index[0], index[index.len() - 1]);
        let new_conn = conn[front as usize..back as usize].to_vec();
        let new_index = index.iter().map(|&v| v - front).collect();
        log::debug!(
            "packed connectivity of \"{}\": kept {} of {} values",
            self.info.name,
            new_conn.len(),
            conn.len()
        );
        Ok((false, Arc::new(new_conn), Arc::new(new_index)))
    }

    /// Copy on the same coordinates with a packed connectivity; the flag
    /// tells whether the connectivity arrays are shared with `self`.
    pub fn copy_with_nodal_connectivity_packed(&self) -> Result<(Self, bool), MeshError> {
        let (shared, conn, index) = self.retrieve_packed_nodal_connectivity()?;
        let copy = Self {
            info: MeshInfo::named(self.info.name.clone()),
            cell_type: self.cell_type,
            coords: self.coords.clone(),
            conn: Some(conn),
            index: Some(index),
        };
        Ok((copy, shared))
    }

    /// Copy that shares nothing with `self`.
    pub fn deep_copy(&self) -> Self {
        Self {
            info: self.info.clone(),
            cell_type: self.cell_type,
            coords: self.coords.as_deref().cloned().map(Arc::new),
            conn: self.conn.as_deref().cloned().map(Arc::new),
            index: self.index.as_deref().cloned().map(Arc::new),
        }
    }

    /// Copy with its own connectivity arrays, still sharing the coordinates.
    pub fn deep_copy_connectivity_only(&self) -> Result<Self, MeshError> {
        self.check_consistency_light()?;
        Ok(Self {
            info: self.info.clone(),
            cell_type: self.cell_type,
            coords: self.coords.clone(),
            conn: self.conn.as_deref().cloned().map(Arc::new),
            index: self.index.as_deref().cloned().map(Arc::new),
        })
    }

    /// Share both connectivity arrays of `other`, which must have the same
    /// shape.
    pub fn shallow_copy_connectivity_from(&mut self, other: &DynamicMesh) -> Result<(), MeshError> {
        if other.cell_type != self.cell_type {
            return Err(MeshError::InvalidArgument(format!(
                "cannot share the connectivity of a {} mesh with a {} mesh",
                other.cell_type.repr(),
                self.cell_type.repr()
            )));
        }
        self.conn = other.conn.clone();
        self.index = other.index.clone();
        Ok(())
    }

    /// Narrow a generic mesh holding a single dynamic geometric type.
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
        let mut conn = Vec::with_capacity(mesh.connectivity().len());
        let mut lengths = Vec::with_capacity(mesh.number_of_cells());
        for c in 0..mesh.number_of_cells() {
            let nodes = mesh.cell_node_ids(c)?;
            conn.extend_from_slice(nodes);
            lengths.push(nodes.len());
        }
        out.conn = Some(Arc::new(conn));
        out.index = Some(Arc::new(offsets_from_lengths(lengths)));
        validated(out)
    }

    /// Dynamic shapes are never split; the map is the identity.
    pub fn simplexize(&mut self, _policy: SimplexizePolicy) -> Result<Vec<IdType>, MeshError> {
        Ok((0..self.number_of_cells()? as IdType).collect())
    }

    /// [`simplexize`](Self::simplexize) with a numeric policy code.
    pub fn simplexize_code(&mut self, policy: i64) -> Result<Vec<IdType>, MeshError> {
        self.simplexize(SimplexizePolicy::from_code(policy)?)
    }

    pub fn compute_dual_mesh(&self) -> Result<DynamicMesh, MeshError> {
        Err(MeshError::UnsupportedOperation(format!(
            "dual mesh of a {} mesh is not available",
            self.cell_type.repr()
        )))
    }

    /// General merge of `self` and `other`.
    pub fn merge_my_self_with(&self, other: &DynamicMesh) -> Result<DynamicMesh, MeshError> {
        merge::merge_dynamic_meshes(&[self, other])
    }

    /// Concatenation of `self` and `other`, which must share coordinates.
    pub fn merge_my_self_with_on_same_coords(&self, other: &DynamicMesh) -> Result<DynamicMesh, MeshError> {
        merge::merge_dynamic_meshes_on_same_coords(&[self, other])
    }
}

impl SingleTypeMesh for DynamicMesh {
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
        self.check_consistency_of_connectivity()?;
        Ok(self.index.as_ref().map_or(0, |i| i.len() - 1))
    }

    fn cell_span(&self, cell: usize) -> Result<Range<usize>, MeshError> {
        let n = self.number_of_cells()?;
        if cell >= n {
            return Err(MeshError::OutOfRange(format!("cell {cell} not in [0, {n})")));
        }
        let (conn, index) = self.arrays()?;
        let (start, stop) = (index[cell], index[cell + 1]);
        if start < 0 || stop < start || stop as usize > conn.len() {
            return Err(MeshError::InconsistentState(format!(
                "index of cell {cell} is invalid: [{start}, {stop}) over {} values",
                conn.len()
            )));
        }
        Ok(start as usize..stop as usize)
    }

    fn used_span(&self) -> Result<Range<usize>, MeshError> {
        self.check_consistency_of_connectivity()?;
        let (_, index) = self.arrays()?;
        Ok(index[0] as usize..index[index.len() - 1] as usize)
    }

    fn check_consistency_light(&self) -> Result<(), MeshError> {
        self.check_consistency_of_connectivity()
    }

    fn compute_diameter_field(&self) -> Result<Vec<f64>, MeshError> {
        Err(MeshError::UnsupportedOperation(
            "diameter field is not available for dynamic geometric types".into(),
        ))
    }

    fn storage_kind(&self) -> &'static str {
        "dynamic"
    }
}

impl DebugInvariants for DynamicMesh {
    fn validate_invariants(&self) -> Result<(), MeshError> {
        if !self.cell_type.is_dynamic() {
            return Err(MeshError::InconsistentState(format!(
                "dynamic mesh carries static type {}",
                self.cell_type.repr()
            )));
        }
        if let Some(c) = &self.coords {
            c.validate_invariants()?;
        }
        if self.conn.is_some() && self.index.is_some() {
            self.check_consistency_of_connectivity()?;
        }
        Ok(())
    }
}
