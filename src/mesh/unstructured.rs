//! Generic mixed-type unstructured mesh.
//!
//! Every cell stores its shape code followed by its node ids in one flat
//! connectivity array; an offset index delimits the cells. Single-type meshes
//! widen into this representation to reach the algorithms that only exist for
//! mixed meshes (descending connectivity, skins, geometric fields).

use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::data::coordinates::Coordinates;
use crate::data::indexed_array::{IdType, SENTINEL, check_index, offsets_from_lengths, reverse_nodal};
use crate::debug_invariants::{DebugInvariants, validated};
use crate::geometry::metrics;
use crate::mesh::info::MeshInfo;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;

/// Mixed-type mesh with type-prefixed nodal connectivity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnstructuredMesh {
    info: MeshInfo,
    mesh_dimension: usize,
    coords: Option<Arc<Coordinates>>,
    conn: Vec<IdType>,
    index: Vec<IdType>,
}

/// Result of exploding a mesh into its sub-entities.
///
/// `desc[desc_index[c]..desc_index[c + 1]]` lists the sub-entity ids of cell
/// `c` in the shape's local order; `rev_desc[rev_desc_index[s]..rev_desc_index[s + 1]]`
/// lists the cells bounded by sub-entity `s`.
#[derive(Clone, Debug)]
pub struct Descending {
    pub sons: UnstructuredMesh,
    pub desc: Vec<IdType>,
    pub desc_index: Vec<IdType>,
    pub rev_desc: Vec<IdType>,
    pub rev_desc_index: Vec<IdType>,
}

impl Descending {
    /// Number of cells bounded by sub-entity `son`.
    pub fn number_of_cells_sharing(&self, son: usize) -> usize {
        (self.rev_desc_index[son + 1] - self.rev_desc_index[son]) as usize
    }
}

#[derive(Clone, Copy)]
enum Explode {
    Sons,
    Edges,
}

impl UnstructuredMesh {
    /// Empty mesh of the given dimension, without coordinates.
    pub fn new(name: impl Into<String>, mesh_dimension: usize) -> Self {
        Self {
            info: MeshInfo::named(name),
            mesh_dimension,
            coords: None,
            conn: Vec::new(),
            index: vec![0],
        }
    }

    /// Assemble a mesh from already-built arrays.
    pub fn from_parts(
        info: MeshInfo,
        mesh_dimension: usize,
        coords: Option<Arc<Coordinates>>,
        conn: Vec<IdType>,
        index: Vec<IdType>,
    ) -> Result<Self, MeshError> {
        validated(Self {
            info,
            mesh_dimension,
            coords,
            conn,
            index,
        })
    }

    #[inline]
    pub fn info(&self) -> &MeshInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut MeshInfo {
        &mut self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[inline]
    pub fn mesh_dimension(&self) -> usize {
        self.mesh_dimension
    }

    pub fn coords(&self) -> Option<&Arc<Coordinates>> {
        self.coords.as_ref()
    }

    pub fn set_coords(&mut self, coords: Arc<Coordinates>) {
        self.coords = Some(coords);
    }

    /// Type-prefixed connectivity.
    pub fn connectivity(&self) -> &[IdType] {
        &self.conn
    }

    pub fn connectivity_index(&self) -> &[IdType] {
        &self.index
    }

    #[inline]
    pub fn number_of_cells(&self) -> usize {
        self.index.len() - 1
    }

    pub fn number_of_nodes(&self) -> Result<usize, MeshError> {
        Ok(self.require_coords()?.number_of_nodes())
    }

    /// Append one cell of shape `ty`.
    pub fn insert_next_cell(&mut self, ty: CellType, nodes: &[IdType]) -> Result<(), MeshError> {
        if ty.dimension() != self.mesh_dimension {
            return Err(MeshError::InvalidArgument(format!(
                "{} cell of dimension {} in a mesh of dimension {}",
                ty.repr(),
                ty.dimension(),
                self.mesh_dimension
            )));
        }
        if let Some(n) = ty.number_of_nodes() {
            if n != nodes.len() {
                return Err(MeshError::InvalidArgument(format!(
                    "{} cell expects {n} nodes, got {}",
                    ty.repr(),
                    nodes.len()
                )));
            }
        }
        self.conn.push(ty.code());
        self.conn.extend_from_slice(nodes);
        self.index.push(self.conn.len() as IdType);
        Ok(())
    }

    fn span(&self, cell: usize) -> Result<(usize, usize), MeshError> {
        if cell >= self.number_of_cells() {
            return Err(MeshError::OutOfRange(format!(
                "cell {cell} not in [0, {})",
                self.number_of_cells()
            )));
        }
        Ok((self.index[cell] as usize, self.index[cell + 1] as usize))
    }

    /// Shape and node ids of one cell.
    pub fn cell(&self, cell: usize) -> Result<(CellType, &[IdType]), MeshError> {
        let (start, stop) = self.span(cell)?;
        let ty = CellType::from_code(self.conn[start])?;
        Ok((ty, &self.conn[start + 1..stop]))
    }

    pub fn type_of_cell(&self, cell: usize) -> Result<CellType, MeshError> {
        self.cell(cell).map(|(ty, _)| ty)
    }

    /// Node ids of one cell, type tag stripped.
    pub fn cell_node_ids(&self, cell: usize) -> Result<&[IdType], MeshError> {
        self.cell(cell).map(|(_, nodes)| nodes)
    }

    /// Distinct shapes present, sorted by code.
    pub fn all_geo_types(&self) -> Result<Vec<CellType>, MeshError> {
        let mut set = BTreeSet::new();
        for c in 0..self.number_of_cells() {
            set.insert(self.type_of_cell(c)?);
        }
        Ok(set.into_iter().collect())
    }

    /// Fails with `InvalidMeshState` when the coordinates are missing.
    pub fn check_fully_defined(&self) -> Result<(), MeshError> {
        self.require_coords().map(|_| ())
    }

    fn require_coords(&self) -> Result<&Coordinates, MeshError> {
        self.coords.as_deref().ok_or_else(|| {
            MeshError::InvalidMeshState(format!("mesh \"{}\" has no coordinates", self.info.name))
        })
    }

    /// Structure check plus node id ranges.
    pub fn check_consistency(&self) -> Result<(), MeshError> {
        self.validate_invariants()?;
        let n = self.number_of_nodes()?;
        for c in 0..self.number_of_cells() {
            let (ty, nodes) = self.cell(c)?;
            for &v in nodes {
                if v == SENTINEL && ty == CellType::Polyhed {
                    continue;
                }
                if v < 0 || v as usize >= n {
                    return Err(MeshError::InconsistentState(format!(
                        "cell {c} references node {v} outside [0, {n})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Node to cells map, as CSR `(cells, offsets)`.
    pub fn reverse_nodal_connectivity(&self) -> Result<(Vec<IdType>, Vec<IdType>), MeshError> {
        let n = self.number_of_nodes()?;
        let cells = (0..self.number_of_cells())
            .map(|c| self.cell_node_ids(c))
            .collect::<Result<Vec<_>, _>>()?;
        reverse_nodal(cells, n)
    }

    /// Sons of every cell (faces in 3D, edges in 2D), each shared son once.
    pub fn descending_connectivity(&self) -> Result<Descending, MeshError> {
        self.explode(Explode::Sons)
    }

    /// Edges of every cell, each shared edge once.
    pub fn explode_to_edges(&self) -> Result<Descending, MeshError> {
        self.explode(Explode::Edges)
    }

    fn explode(&self, mode: Explode) -> Result<Descending, MeshError> {
        self.check_fully_defined()?;
        let son_dim = match mode {
            Explode::Sons => self.mesh_dimension.saturating_sub(1),
            Explode::Edges => 1,
        };
        let mut sons = UnstructuredMesh::new(self.info.name.clone(), son_dim);
        sons.coords = self.coords.clone();
        let mut seen: HashMap<Vec<IdType>, IdType> = HashMap::new();
        let mut desc = Vec::new();
        let mut desc_index = vec![0];
        let mut rev: Vec<Vec<IdType>> = Vec::new();
        let mut buf = Vec::new();
        for c in 0..self.number_of_cells() {
            let (ty, nodes) = self.cell(c)?;
            let count = match mode {
                Explode::Sons => ty.number_of_sons(nodes),
                Explode::Edges => ty.number_of_edges(nodes),
            };
            for s in 0..count {
                buf.clear();
                let son_ty = match mode {
                    Explode::Sons => {
                        ty.fill_son_connectivity(s, nodes, &mut buf)?;
                        ty.son_type(s, nodes)?
                    }
                    Explode::Edges => {
                        ty.fill_edge_connectivity(s, nodes, &mut buf)?;
                        if buf.len() == 3 { CellType::Seg3 } else { CellType::Seg2 }
                    }
                };
                let mut key: Vec<IdType> = buf.iter().copied().filter(|&v| v != SENTINEL).collect();
                key.sort_unstable();
                key.dedup();
                let id = match seen.get(&key) {
                    Some(&id) => id,
                    None => {
                        let id = rev.len() as IdType;
                        sons.conn.push(son_ty.code());
                        sons.conn.extend_from_slice(&buf);
                        sons.index.push(sons.conn.len() as IdType);
                        rev.push(Vec::new());
                        seen.insert(key, id);
                        id
                    }
                };
                rev[id as usize].push(c as IdType);
                desc.push(id);
            }
            desc_index.push(desc.len() as IdType);
        }
        let rev_desc_index = offsets_from_lengths(rev.iter().map(Vec::len));
        let rev_desc = rev.into_iter().flatten().collect();
        Ok(Descending {
            sons,
            desc,
            desc_index,
            rev_desc,
            rev_desc_index,
        })
    }

    /// Sons bounding exactly one cell, as a mesh of dimension one less.
    pub fn skin(&self) -> Result<UnstructuredMesh, MeshError> {
        let d = self.descending_connectivity()?;
        let mut skin = UnstructuredMesh::new(self.info.name.clone(), d.sons.mesh_dimension);
        skin.coords = self.coords.clone();
        for s in 0..d.sons.number_of_cells() {
            if d.number_of_cells_sharing(s) == 1 {
                let (ty, nodes) = d.sons.cell(s)?;
                skin.conn.push(ty.code());
                skin.conn.extend_from_slice(nodes);
                skin.index.push(skin.conn.len() as IdType);
            }
        }
        Ok(skin)
    }

    /// Length, area or volume of every cell.
    pub fn measure_field(&self) -> Result<Vec<f64>, MeshError> {
        let coords = self.require_coords()?;
        (0..self.number_of_cells())
            .map(|c| {
                let (ty, nodes) = self.cell(c)?;
                metrics::cell_measure(ty, nodes, coords)
            })
            .collect()
    }

    /// Center of mass of every cell, `spaceDim` components per cell.
    pub fn cell_centers_of_mass(&self) -> Result<Vec<f64>, MeshError> {
        let coords = self.require_coords()?;
        let mut out = Vec::with_capacity(self.number_of_cells() * coords.dimension());
        for c in 0..self.number_of_cells() {
            let (ty, nodes) = self.cell(c)?;
            out.extend(metrics::center_of_mass(ty, nodes, coords)?);
        }
        Ok(out)
    }

    /// Ids of the cells containing `point`, up to `eps`.
    pub fn cells_containing_point(&self, point: &[f64], eps: f64) -> Result<Vec<IdType>, MeshError> {
        let coords = self.require_coords()?;
        if point.len() != coords.dimension() {
            return Err(MeshError::InvalidArgument(format!(
                "point has {} components, mesh space dimension is {}",
                point.len(),
                coords.dimension()
            )));
        }
        let mut hits = Vec::new();
        for c in 0..self.number_of_cells() {
            let (ty, nodes) = self.cell(c)?;
            let bbox = metrics::cell_bounding_box(nodes, coords)?;
            let outside = point
                .iter()
                .enumerate()
                .any(|(k, &x)| x < bbox[2 * k] - eps || x > bbox[2 * k + 1] + eps);
            if !outside && metrics::cell_contains_point(ty, nodes, coords, point, eps)? {
                hits.push(c as IdType);
            }
        }
        Ok(hits)
    }
}

impl DebugInvariants for UnstructuredMesh {
    fn validate_invariants(&self) -> Result<(), MeshError> {
        check_index(&self.index, self.conn.len())?;
        if self.index[0] != 0 {
            return Err(MeshError::InconsistentState(format!(
                "generic connectivity index starts at {}",
                self.index[0]
            )));
        }
        for c in 0..self.number_of_cells() {
            let (start, stop) = self.span(c)?;
            if start == stop {
                return Err(MeshError::InconsistentState(format!("cell {c} has no type tag")));
            }
            let ty = CellType::from_code(self.conn[start])
                .map_err(|e| MeshError::InconsistentState(format!("cell {c}: {}", e.detail())))?;
            if let Some(n) = ty.number_of_nodes() {
                if stop - start != n + 1 {
                    return Err(MeshError::InconsistentState(format!(
                        "cell {c} of type {} has {} nodes instead of {n}",
                        ty.repr(),
                        stop - start - 1
                    )));
                }
            }
        }
        if let Some(coords) = &self.coords {
            coords.validate_invariants()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_quads() -> UnstructuredMesh {
        let coords = Coordinates::from_tuples(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [2.0, 0.0],
            [2.0, 1.0],
        ])
        .unwrap();
        let mut m = UnstructuredMesh::new("m", 2);
        m.set_coords(Arc::new(coords));
        m.insert_next_cell(CellType::Quad4, &[0, 1, 2, 3]).unwrap();
        m.insert_next_cell(CellType::Quad4, &[1, 4, 5, 2]).unwrap();
        m
    }

    #[test]
    fn descending_shares_inner_edge() {
        let m = two_quads();
        let d = m.descending_connectivity().unwrap();
        assert_eq!(d.sons.number_of_cells(), 7);
        assert_eq!(d.desc, vec![0, 1, 2, 3, 4, 5, 6, 1]);
        assert_eq!(d.number_of_cells_sharing(1), 2);
        assert_eq!(d.sons.cell_node_ids(1).unwrap(), &[1, 2]);
    }

    #[test]
    fn skin_drops_inner_edge() {
        let skin = two_quads().skin().unwrap();
        assert_eq!(skin.number_of_cells(), 6);
        assert_eq!(skin.mesh_dimension(), 1);
        assert_eq!(skin.all_geo_types().unwrap(), vec![CellType::Seg2]);
    }

    #[test]
    fn measures_and_location() {
        let m = two_quads();
        assert_eq!(m.measure_field().unwrap(), vec![1.0, 1.0]);
        let com = m.cell_centers_of_mass().unwrap();
        for (got, want) in com.iter().zip([0.5, 0.5, 1.5, 0.5]) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(m.cells_containing_point(&[1.5, 0.2], 1e-12).unwrap(), vec![1]);
        assert_eq!(m.cells_containing_point(&[1.0, 0.5], 1e-12).unwrap(), vec![0, 1]);
        assert!(m.cells_containing_point(&[1.0], 1e-12).is_err());
    }

    #[test]
    fn insert_checks_shape() {
        let mut m = two_quads();
        assert!(m.insert_next_cell(CellType::Tetra4, &[0, 1, 2, 3]).is_err());
        assert!(m.insert_next_cell(CellType::Tri3, &[0, 1]).is_err());
    }

    #[test]
    fn invariants_reject_bad_tag() {
        let r = UnstructuredMesh::from_parts(MeshInfo::named("x"), 2, None, vec![99, 0, 1, 2], vec![0, 4]);
        assert!(matches!(r, Err(MeshError::InconsistentState(_))));
    }
}
