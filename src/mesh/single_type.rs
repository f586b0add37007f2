//! Contract shared by the static and dynamic single-type meshes.
//!
//! A single-type mesh holds exactly one [`CellType`], shared coordinates and
//! a flat nodal connectivity. Implementors provide storage access; every
//! operation that only needs "the node list of cell `i`" is a default method
//! here, so both mesh kinds answer them identically.

use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::data::coordinates::Coordinates;
use crate::data::indexed_array::{
    IdType, SENTINEL, checked_index, is_iota, renumber_ids, renumber_ids_with_map, reverse_nodal,
    shift_ids,
};
use crate::debug_invariants::DebugInvariants;
use crate::geometry::metrics;
use crate::mesh::info::MeshInfo;
use crate::mesh::unstructured::UnstructuredMesh;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::orientation::invert_orientation;

/// Per-type split of a cell profile, see
/// [`SingleTypeMesh::split_profile_per_type`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileSplit {
    /// `[type code, profile length, -1 | 0]`.
    pub code: Vec<IdType>,
    /// Positions in the profile of the cells of each type.
    pub ids_in_profile_per_type: Vec<Vec<IdType>>,
    /// Explicit cell lists referenced by `code[2] >= 0`; empty on the fast path.
    pub ids_per_type: Vec<Vec<IdType>>,
}

/// Whether two optional coordinate handles point to the same array.
pub fn same_coords(a: Option<&Arc<Coordinates>>, b: Option<&Arc<Coordinates>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

pub trait SingleTypeMesh: DebugInvariants {
    fn info(&self) -> &MeshInfo;
    fn info_mut(&mut self) -> &mut MeshInfo;
    fn cell_type(&self) -> CellType;
    fn coords(&self) -> Option<&Arc<Coordinates>>;
    fn set_coords(&mut self, coords: Arc<Coordinates>);

    /// Raw connectivity array, `None` until set or allocated.
    fn nodal_connectivity(&self) -> Option<&Arc<Vec<IdType>>>;
    fn nodal_connectivity_mut(&mut self) -> Option<&mut Arc<Vec<IdType>>>;

    fn number_of_cells(&self) -> Result<usize, MeshError>;

    /// Position of cell `cell` in the raw connectivity.
    fn cell_span(&self, cell: usize) -> Result<Range<usize>, MeshError>;

    /// Part of the raw connectivity covered by the cells.
    fn used_span(&self) -> Result<Range<usize>, MeshError>;

    /// Connectivity arrays are present and coherent with each other.
    fn check_consistency_light(&self) -> Result<(), MeshError>;

    /// Largest distance between two nodes of each cell.
    fn compute_diameter_field(&self) -> Result<Vec<f64>, MeshError>;

    /// Human-readable kind of connectivity, used by the textual dumps.
    fn storage_kind(&self) -> &'static str;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn mesh_dimension(&self) -> usize {
        self.cell_type().dimension()
    }

    fn space_dimension(&self) -> Result<usize, MeshError> {
        Ok(require_coords(self)?.dimension())
    }

    fn number_of_nodes(&self) -> Result<usize, MeshError> {
        Ok(require_coords(self)?.number_of_nodes())
    }

    /// Node ids of one cell as stored, separators included.
    fn cell_nodes(&self, cell: usize) -> Result<&[IdType], MeshError> {
        let span = self.cell_span(cell)?;
        let conn = self.nodal_connectivity().ok_or_else(no_connectivity)?;
        Ok(&conn[span])
    }

    /// All cell ids if `ty` is this mesh's shape, none otherwise.
    fn cells_of_type(&self, ty: CellType) -> Result<Vec<IdType>, MeshError> {
        if ty != self.cell_type() {
            return Ok(Vec::new());
        }
        Ok((0..self.number_of_cells()? as IdType).collect())
    }

    fn number_of_cells_with_type(&self, ty: CellType) -> Result<usize, MeshError> {
        if ty == self.cell_type() {
            self.number_of_cells()
        } else {
            Ok(0)
        }
    }

    fn type_of_cell(&self, cell: usize) -> Result<CellType, MeshError> {
        let n = self.number_of_cells()?;
        if cell < n {
            Ok(self.cell_type())
        } else {
            Err(MeshError::OutOfRange(format!("cell {cell} not in [0, {n})")))
        }
    }

    fn all_geo_types(&self) -> Vec<CellType> {
        vec![self.cell_type()]
    }

    /// `[type code, number of cells, -1]`.
    fn distribution_of_types(&self) -> Result<Vec<IdType>, MeshError> {
        Ok(vec![
            self.cell_type().code(),
            self.number_of_cells()? as IdType,
            -1,
        ])
    }

    /// Fails with `InvalidMeshState` unless both coordinates and
    /// connectivity are set.
    fn check_fully_defined(&self) -> Result<(), MeshError> {
        require_coords(self)?;
        if self.nodal_connectivity().is_none() {
            return Err(MeshError::InvalidMeshState(format!(
                "mesh \"{}\" has no nodal connectivity",
                self.name()
            )));
        }
        Ok(())
    }

    /// Light check plus every node id in `[0, number_of_nodes)`.
    fn check_consistency(&self) -> Result<(), MeshError> {
        self.check_consistency_light()?;
        let n = self.number_of_nodes()?;
        let polyhed = self.cell_type() == CellType::Polyhed;
        for cell in 0..self.number_of_cells()? {
            for (k, &v) in self.cell_nodes(cell)?.iter().enumerate() {
                if polyhed && v == SENTINEL {
                    continue;
                }
                if v < 0 || v as usize >= n {
                    return Err(MeshError::InconsistentState(format!(
                        "node #{k} of cell {cell} is {v}, expected in [0, {n})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Describe a selection of cells without per-cell type tags.
    ///
    /// A profile equal to `0..n` (when `smart_profile_killer` is set) takes
    /// the fast path: `code[2] == -1` and no id list. Otherwise the profile is
    /// range-checked and becomes the single id list.
    fn split_profile_per_type(
        &self,
        profile: &[IdType],
        smart_profile_killer: bool,
    ) -> Result<ProfileSplit, MeshError> {
        let n = self.number_of_cells()?;
        let mut code = vec![self.cell_type().code(), profile.len() as IdType, -1];
        if smart_profile_killer && is_iota(profile, n) {
            return Ok(ProfileSplit {
                code,
                ids_in_profile_per_type: vec![profile.to_vec()],
                ids_per_type: Vec::new(),
            });
        }
        for &c in profile {
            checked_index(c, n, "profile cell id").map_err(|e| MeshError::InvalidArgument(e.detail().into()))?;
        }
        code[2] = 0;
        Ok(ProfileSplit {
            code,
            ids_in_profile_per_type: vec![(0..profile.len() as IdType).collect()],
            ids_per_type: vec![profile.to_vec()],
        })
    }

    /// Inverse of [`split_profile_per_type`](Self::split_profile_per_type):
    /// `None` for the full mesh, else the validated id list.
    fn check_type_consistency_and_contig(
        &self,
        code: &[IdType],
        ids_per_type: &[&[IdType]],
    ) -> Result<Option<Vec<IdType>>, MeshError> {
        let n = self.number_of_cells()?;
        let [ty, count, pos] = <[IdType; 3]>::try_from(code).map_err(|_| {
            MeshError::InvalidArgument(format!("code must hold exactly 3 values, got {}", code.len()))
        })?;
        if ty != self.cell_type().code() {
            return Err(MeshError::InvalidArgument(format!(
                "geometric type mismatch: asking for {ty} whereas the mesh holds {} ({})",
                self.cell_type().code(),
                self.cell_type().repr()
            )));
        }
        match pos {
            -1 if count == n as IdType => Ok(None),
            -1 => Err(MeshError::InvalidArgument(format!(
                "mesh has {n} cells but code declares {count} without profile"
            ))),
            0 => {
                let [pfl] = ids_per_type else {
                    return Err(MeshError::InvalidArgument(format!(
                        "code points to id list #0 but {} lists were given",
                        ids_per_type.len()
                    )));
                };
                for &c in pfl.iter() {
                    checked_index(c, n, "profile cell id")
                        .map_err(|e| MeshError::InvalidArgument(e.detail().into()))?;
                }
                Ok(Some(pfl.to_vec()))
            }
            other => Err(MeshError::InvalidArgument(format!(
                "single geometric type mesh expects 0 or -1 at code position 2, got {other}"
            ))),
        }
    }

    /// Node to cells map, as CSR `(cells, offsets)`.
    fn reverse_nodal_connectivity(&self) -> Result<(Vec<IdType>, Vec<IdType>), MeshError> {
        self.check_fully_defined()?;
        let n = self.number_of_nodes()?;
        let cells = (0..self.number_of_cells()?)
            .map(|c| self.cell_nodes(c))
            .collect::<Result<Vec<_>, _>>()?;
        reverse_nodal(cells, n)
    }

    /// Old-to-new node map compacting the used nodes (`-1` for unused ones)
    /// and the number of used nodes.
    fn node_ids_in_use(&self) -> Result<(Vec<IdType>, usize), MeshError> {
        let n = self.number_of_nodes()?;
        let mut map = vec![-1 as IdType; n];
        for cell in 0..self.number_of_cells()? {
            for &v in self.cell_nodes(cell)?.iter().filter(|&&v| v != SENTINEL) {
                map[checked_index(v, n, "node id")?] = 0;
            }
        }
        let mut next: IdType = 0;
        for slot in map.iter_mut().filter(|s| **s == 0) {
            *slot = next;
            next += 1;
        }
        Ok((map, next as usize))
    }

    /// Sorted ids of the nodes referenced by at least one cell.
    fn fetched_node_ids(&self) -> Result<Vec<IdType>, MeshError> {
        self.check_consistency()?;
        let (map, _) = self.node_ids_in_use()?;
        Ok(map
            .iter()
            .enumerate()
            .filter(|&(_, &m)| m >= 0)
            .map(|(i, _)| i as IdType)
            .collect())
    }

    /// Cells whose nodes are all (`fully_in`) or partly in `node_ids`.
    fn fill_cell_ids_to_keep_from_node_ids(
        &self,
        node_ids: &[IdType],
        fully_in: bool,
    ) -> Result<Vec<IdType>, MeshError> {
        let nb_cells = self.number_of_cells()?;
        let conn = self.nodal_connectivity().ok_or_else(no_connectivity)?;
        let max = conn[self.used_span()?].iter().copied().max().unwrap_or(0).max(0) as usize;
        let mut finder = vec![false; max + 1];
        for &v in node_ids {
            if v >= 0 && (v as usize) <= max {
                finder[v as usize] = true;
            }
        }
        let mut kept = Vec::new();
        for cell in 0..nb_cells {
            let nodes = self.cell_nodes(cell)?;
            let valid = nodes.iter().filter(|&&v| v >= 0);
            let total = valid.clone().count();
            let hits = valid.filter(|&&v| finder[v as usize]).count();
            if (fully_in && hits == total) || (!fully_in && hits != 0) {
                kept.push(cell as IdType);
            }
        }
        Ok(kept)
    }

    /// Mean of the node coordinates of each cell, `spaceDim` values per cell.
    fn iso_barycenter_of_nodes_per_cell(&self) -> Result<Vec<f64>, MeshError> {
        let coords = require_coords(self)?;
        let mut out = Vec::new();
        for cell in 0..self.number_of_cells()? {
            out.extend(metrics::iso_barycenter(self.cell_nodes(cell)?, coords)?);
        }
        Ok(out)
    }

    /// Bounding box of each cell, `[min0, max0, min1, max1, ...]`.
    fn bounding_box_for_bb_tree(&self) -> Result<Vec<f64>, MeshError> {
        let coords = require_coords(self)?;
        let mut out = Vec::new();
        for cell in 0..self.number_of_cells()? {
            let bbox = metrics::cell_bounding_box(self.cell_nodes(cell)?, coords)
                .map_err(|e| MeshError::InvalidMeshState(format!("cell {cell}: {}", e.detail())))?;
            out.extend(bbox);
        }
        Ok(out)
    }

    /// Widen into the generic mixed-type representation.
    fn build_unstructured(&self) -> Result<UnstructuredMesh, MeshError> {
        self.check_consistency_light()?;
        let code = self.cell_type().code();
        let n = self.number_of_cells()?;
        let mut conn = Vec::new();
        let mut index = Vec::with_capacity(n + 1);
        index.push(0);
        for cell in 0..n {
            conn.push(code);
            conn.extend_from_slice(self.cell_nodes(cell)?);
            index.push(conn.len() as IdType);
        }
        UnstructuredMesh::from_parts(
            self.info().clone(),
            self.mesh_dimension(),
            self.coords().cloned(),
            conn,
            index,
        )
    }

    fn measure_field(&self) -> Result<Vec<f64>, MeshError> {
        self.build_unstructured()?.measure_field()
    }

    fn cell_centers_of_mass(&self) -> Result<Vec<f64>, MeshError> {
        self.build_unstructured()?.cell_centers_of_mass()
    }

    fn cells_containing_point(&self, point: &[f64], eps: f64) -> Result<Vec<IdType>, MeshError> {
        self.build_unstructured()?.cells_containing_point(point, eps)
    }

    /// Replace every node id `v` by `old_to_new[v]`; separators untouched.
    fn renumber_nodes_in_conn(&mut self, old_to_new: &[IdType]) -> Result<(), MeshError> {
        let span = self.used_span()?;
        let conn = self.nodal_connectivity_mut().ok_or_else(no_connectivity)?;
        let mut fresh = conn[span.clone()].to_vec();
        renumber_ids(&mut fresh, old_to_new)?;
        Arc::make_mut(conn)[span].copy_from_slice(&fresh);
        self.debug_assert_invariants();
        Ok(())
    }

    /// Like [`renumber_nodes_in_conn`](Self::renumber_nodes_in_conn) with a
    /// sparse map; every used node must have an entry.
    fn renumber_nodes_in_conn_with_map(
        &mut self,
        old_to_new: &HashMap<IdType, IdType>,
    ) -> Result<(), MeshError> {
        let span = self.used_span()?;
        let conn = self.nodal_connectivity_mut().ok_or_else(no_connectivity)?;
        let mut fresh = conn[span.clone()].to_vec();
        renumber_ids_with_map(&mut fresh, old_to_new)?;
        Arc::make_mut(conn)[span].copy_from_slice(&fresh);
        self.debug_assert_invariants();
        Ok(())
    }

    /// Add `offset` to every node id; range is not checked.
    fn renumber_nodes_with_offset_in_conn(&mut self, offset: IdType) -> Result<(), MeshError> {
        let span = self.used_span()?;
        let conn = self.nodal_connectivity_mut().ok_or_else(no_connectivity)?;
        shift_ids(&mut Arc::make_mut(conn)[span], offset);
        Ok(())
    }

    /// Collapse nodes closer than `precision`, renumber the connectivity and
    /// return the old-to-new node map. Each merged node keeps the
    /// coordinates of its lowest old id.
    fn merge_nodes(&mut self, precision: f64) -> Result<Vec<IdType>, MeshError> {
        let Some(coords) = self.coords().cloned() else {
            return Err(MeshError::InvalidMeshState(format!(
                "mesh \"{}\" has no coordinates to merge",
                self.name()
            )));
        };
        let (map, count) = coords.find_common_nodes(precision)?;
        let mut representative = vec![usize::MAX; count];
        for (old, &new) in map.iter().enumerate() {
            if representative[new] == usize::MAX {
                representative[new] = old;
            }
        }
        let merged = coords.select_nodes(&representative)?;
        let old_to_new: Vec<IdType> = map.iter().map(|&v| v as IdType).collect();
        self.renumber_nodes_in_conn(&old_to_new)?;
        self.set_coords(Arc::new(merged));
        log::debug!(
            "merged {} nodes into {count} in mesh \"{}\"",
            map.len(),
            self.name()
        );
        Ok(old_to_new)
    }

    /// Flip the orientation of every cell; measures change sign, not size.
    fn invert_orientation_of_all_cells(&mut self) -> Result<(), MeshError> {
        self.check_consistency_light()?;
        let ty = self.cell_type();
        let spans = (0..self.number_of_cells()?)
            .map(|c| self.cell_span(c))
            .collect::<Result<Vec<_>, _>>()?;
        let conn = self.nodal_connectivity_mut().ok_or_else(no_connectivity)?;
        let mut fresh = conn.as_ref().clone();
        for span in spans {
            invert_orientation(ty, &mut fresh[span])?;
        }
        *conn = Arc::new(fresh);
        self.debug_assert_invariants();
        Ok(())
    }

    /// Compare with `other`; `Err` carries the first difference.
    fn is_equal_if_not_why(&self, other: &dyn SingleTypeMesh, precision: f64) -> Result<(), String> {
        self.info().is_equal_if_not_why(other.info(), precision)?;
        compare_coords(self.coords(), other.coords(), precision, true)?;
        compare_cells(self, other)
    }

    fn is_equal(&self, other: &dyn SingleTypeMesh, precision: f64) -> bool {
        self.is_equal_if_not_why(other, precision).is_ok()
    }

    /// Equality ignoring names, descriptions and component infos.
    fn is_equal_without_considering_str(&self, other: &dyn SingleTypeMesh, precision: f64) -> bool {
        compare_coords(self.coords(), other.coords(), precision, false).is_ok()
            && compare_cells(self, other).is_ok()
    }

    /// Short textual summary of the mesh.
    fn simple_repr(&self) -> String {
        const NO_COORDS: &str = "No coordinates specified !";
        let info = self.info();
        let mut s = String::new();
        let _ = writeln!(
            s,
            "Single {} geometric type ({}) unstructured mesh with name : \"{}\"",
            self.storage_kind(),
            self.cell_type().repr(),
            info.name
        );
        let _ = writeln!(s, "Description of mesh : \"{}\"", info.description);
        let _ = writeln!(s, "Time attached to the mesh [unit] : {} [{}]", info.time, info.time_unit);
        let _ = writeln!(s, "Iteration : {} Order : {}", info.iteration, info.order);
        let _ = writeln!(s, "Mesh dimension : {}", self.mesh_dimension());
        match self.coords() {
            Some(c) => {
                let _ = writeln!(s, "Space dimension : {}", c.dimension());
                let infos: Vec<String> = c.infos().iter().map(|i| format!("\"{i}\"")).collect();
                let _ = writeln!(s, "Info attached on space dimension : {}", infos.join(" "));
                let _ = writeln!(s, "Number of nodes : {}", c.number_of_nodes());
            }
            None => {
                let _ = writeln!(s, "Space dimension : {NO_COORDS}");
                let _ = writeln!(s, "Number of nodes : {NO_COORDS}");
            }
        }
        match self.number_of_cells() {
            Ok(n) => {
                let _ = writeln!(s, "Number of cells : {n}");
            }
            Err(e) => {
                let _ = writeln!(s, "Number of cells : {}", e.detail());
            }
        }
        let _ = writeln!(s, "Cell type : {}", self.cell_type().repr());
        s
    }

    /// Summary followed by the coordinates and the cell node lists.
    fn advanced_repr(&self) -> String {
        let mut s = self.simple_repr();
        s.push_str("\nCoordinates array :\n\n");
        match self.coords() {
            Some(c) => {
                for node in 0..c.number_of_nodes() {
                    if let Ok(p) = c.node(node) {
                        let _ = writeln!(s, "Node #{node} : {p:?}");
                    }
                }
            }
            None => s.push_str("No array set !\n"),
        }
        s.push_str("\nConnectivity array :\n\n");
        match self.number_of_cells() {
            Ok(n) => {
                for cell in 0..n {
                    if let Ok(nodes) = self.cell_nodes(cell) {
                        let ids: Vec<String> = nodes.iter().map(IdType::to_string).collect();
                        let _ = writeln!(s, "Cell #{cell} : {}", ids.join(" "));
                    }
                }
            }
            Err(_) => s.push_str("No connectivity specified !\n"),
        }
        s
    }
}

pub(crate) fn require_coords<M: SingleTypeMesh + ?Sized>(mesh: &M) -> Result<&Coordinates, MeshError> {
    mesh.coords().map(|c| c.as_ref()).ok_or_else(|| {
        MeshError::InvalidMeshState(format!("mesh \"{}\" has no coordinates", mesh.name()))
    })
}

pub(crate) fn no_connectivity() -> MeshError {
    MeshError::InvalidMeshState("nodal connectivity is not set".into())
}

fn compare_coords(
    a: Option<&Arc<Coordinates>>,
    b: Option<&Arc<Coordinates>>,
    precision: f64,
    with_strings: bool,
) -> Result<(), String> {
    match (a, b) {
        (None, None) => Ok(()),
        (Some(a), Some(b)) if Arc::ptr_eq(a, b) => Ok(()),
        (Some(a), Some(b)) if with_strings => a.is_equal_if_not_why(b, precision),
        (Some(a), Some(b)) => a.is_equal_without_considering_str(b, precision),
        _ => Err("exactly one of the two meshes has coordinates".into()),
    }
}

fn compare_cells<A: SingleTypeMesh + ?Sized>(a: &A, b: &dyn SingleTypeMesh) -> Result<(), String> {
    if a.cell_type() != b.cell_type() {
        return Err(format!(
            "geometric types differ: {} != {}",
            a.cell_type().repr(),
            b.cell_type().repr()
        ));
    }
    if a.storage_kind() != b.storage_kind() {
        return Err("connectivity kinds differ".into());
    }
    match (a.nodal_connectivity(), b.nodal_connectivity()) {
        (None, None) => return Ok(()),
        (Some(x), Some(y)) if Arc::ptr_eq(x, y) && a.used_span().ok() == b.used_span().ok() => {
            return Ok(());
        }
        (Some(_), Some(_)) => {}
        _ => return Err("exactly one of the two meshes has a nodal connectivity".into()),
    }
    let na = a.number_of_cells().map_err(|e| e.to_string())?;
    let nb = b.number_of_cells().map_err(|e| e.to_string())?;
    if na != nb {
        return Err(format!("numbers of cells differ: {na} != {nb}"));
    }
    for cell in 0..na {
        let x = a.cell_nodes(cell).map_err(|e| e.to_string())?;
        let y = b.cell_nodes(cell).map_err(|e| e.to_string())?;
        if x != y {
            return Err(format!("nodal connectivity differs at cell {cell}: {x:?} != {y:?}"));
        }
    }
    Ok(())
}

/// Concatenate single-type meshes sharing one coordinate array into a
/// generic mesh; cell order follows `parts`.
pub fn aggregate_on_same_coords_to_unstructured(
    parts: &[&dyn SingleTypeMesh],
) -> Result<UnstructuredMesh, MeshError> {
    let first = parts.first().ok_or_else(|| {
        MeshError::InvalidArgument("cannot aggregate an empty list of meshes".into())
    })?;
    let dim = first.mesh_dimension();
    for (k, part) in parts.iter().enumerate() {
        if part.mesh_dimension() != dim {
            return Err(MeshError::InvalidArgument(format!(
                "mesh #{k} has dimension {} whereas the first one has {dim}",
                part.mesh_dimension()
            )));
        }
        if !same_coords(part.coords(), first.coords()) {
            return Err(MeshError::InvalidArgument(format!(
                "mesh #{k} does not share the coordinates of the first mesh"
            )));
        }
    }
    let mut out = UnstructuredMesh::new(first.name(), dim);
    out.info_mut().description = first.info().description.clone();
    if let Some(c) = first.coords() {
        out.set_coords(Arc::clone(c));
    }
    for part in parts {
        let ty = part.cell_type();
        for cell in 0..part.number_of_cells()? {
            out.insert_next_cell(ty, part.cell_nodes(cell)?)?;
        }
    }
    Ok(out)
}
