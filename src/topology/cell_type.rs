//! Cell shape metadata for single-geometric-type meshes.
//!
//! Each [`CellType`] carries its normalized numeric code (the value stored as
//! the type tag in generic mixed-type connectivity) and knows its dimension,
//! node count, simplex status and how to enumerate its sons (faces of 3D cells,
//! edges of 2D cells, points of 1D cells).
//!
//! Static shapes have a fixed node count and their sons come from constant
//! tables in [`crate::topology::sons`]. Dynamic shapes (`Polygon`, `QPolyg`,
//! `Polyhed`) derive their sons from the cell's node list; a polyhedron lists
//! its faces one after the other separated by [`SENTINEL`].

use crate::data::indexed_array::{IdType, SENTINEL};
use crate::mesh_error::MeshError;
use crate::topology::sons::{self, SonTable};
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Reference cell shapes, with their normalized codes as discriminants.
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CellType {
    /// 0D point.
    Point1 = 0,
    /// Linear segment.
    Seg2 = 1,
    /// Quadratic segment, middle node last.
    Seg3 = 2,
    /// Linear triangle.
    Tri3 = 3,
    /// Linear quadrangle.
    Quad4 = 4,
    /// Linear polygon with any number of nodes.
    Polygon = 5,
    /// Quadratic triangle.
    Tri6 = 6,
    /// Quadratic (serendipity) quadrangle.
    Quad8 = 8,
    /// Linear tetrahedron.
    Tetra4 = 14,
    /// Linear pyramid, apex last.
    Pyra5 = 15,
    /// Linear prism.
    Penta6 = 16,
    /// Linear hexahedron.
    Hexa8 = 18,
    /// Quadratic tetrahedron.
    Tetra10 = 20,
    /// Polyhedron described face by face, faces separated by `-1`.
    Polyhed = 31,
    /// Quadratic polygon: corner nodes then middle nodes.
    QPolyg = 32,
}

/// Every registered shape, in code order.
pub const ALL_CELL_TYPES: [CellType; 15] = [
    CellType::Point1,
    CellType::Seg2,
    CellType::Seg3,
    CellType::Tri3,
    CellType::Quad4,
    CellType::Polygon,
    CellType::Tri6,
    CellType::Quad8,
    CellType::Tetra4,
    CellType::Pyra5,
    CellType::Penta6,
    CellType::Hexa8,
    CellType::Tetra10,
    CellType::Polyhed,
    CellType::QPolyg,
];

static BY_CODE: Lazy<HashMap<IdType, CellType>> =
    Lazy::new(|| ALL_CELL_TYPES.iter().map(|&t| (t.code(), t)).collect());

impl Default for CellType {
    fn default() -> Self {
        CellType::Point1
    }
}

impl CellType {
    /// Normalized numeric code of the shape.
    #[inline]
    pub fn code(self) -> IdType {
        self as IdType
    }

    /// Look a shape up by its normalized code.
    pub fn from_code(code: IdType) -> Result<Self, MeshError> {
        BY_CODE.get(&code).copied().ok_or_else(|| {
            MeshError::InvalidArgument(format!("unknown geometric type code {code}"))
        })
    }

    /// True for shapes whose node count varies from cell to cell.
    #[inline]
    pub fn is_dynamic(self) -> bool {
        matches!(self, CellType::Polygon | CellType::Polyhed | CellType::QPolyg)
    }

    /// Fixed node count of a static shape, `None` for dynamic shapes.
    pub fn number_of_nodes(self) -> Option<usize> {
        match self {
            CellType::Point1 => Some(1),
            CellType::Seg2 => Some(2),
            CellType::Seg3 | CellType::Tri3 => Some(3),
            CellType::Quad4 | CellType::Tetra4 => Some(4),
            CellType::Pyra5 => Some(5),
            CellType::Tri6 | CellType::Penta6 => Some(6),
            CellType::Quad8 | CellType::Hexa8 => Some(8),
            CellType::Tetra10 => Some(10),
            CellType::Polygon | CellType::Polyhed | CellType::QPolyg => None,
        }
    }

    /// Topological dimension of the shape.
    pub fn dimension(self) -> usize {
        match self {
            CellType::Point1 => 0,
            CellType::Seg2 | CellType::Seg3 => 1,
            CellType::Tri3
            | CellType::Quad4
            | CellType::Polygon
            | CellType::Tri6
            | CellType::Quad8
            | CellType::QPolyg => 2,
            CellType::Tetra4
            | CellType::Pyra5
            | CellType::Penta6
            | CellType::Hexa8
            | CellType::Tetra10
            | CellType::Polyhed => 3,
        }
    }

    #[inline]
    pub fn is_simplex(self) -> bool {
        matches!(
            self,
            CellType::Point1
                | CellType::Seg2
                | CellType::Seg3
                | CellType::Tri3
                | CellType::Tri6
                | CellType::Tetra4
                | CellType::Tetra10
        )
    }

    #[inline]
    pub fn is_quadratic(self) -> bool {
        matches!(
            self,
            CellType::Seg3 | CellType::Tri6 | CellType::Quad8 | CellType::Tetra10 | CellType::QPolyg
        )
    }

    /// Conventional upper-case name, e.g. `NORM_HEXA8`.
    pub fn repr(self) -> &'static str {
        match self {
            CellType::Point1 => "NORM_POINT1",
            CellType::Seg2 => "NORM_SEG2",
            CellType::Seg3 => "NORM_SEG3",
            CellType::Tri3 => "NORM_TRI3",
            CellType::Quad4 => "NORM_QUAD4",
            CellType::Polygon => "NORM_POLYGON",
            CellType::Tri6 => "NORM_TRI6",
            CellType::Quad8 => "NORM_QUAD8",
            CellType::Tetra4 => "NORM_TETRA4",
            CellType::Pyra5 => "NORM_PYRA5",
            CellType::Penta6 => "NORM_PENTA6",
            CellType::Hexa8 => "NORM_HEXA8",
            CellType::Tetra10 => "NORM_TETRA10",
            CellType::Polyhed => "NORM_POLYHED",
            CellType::QPolyg => "NORM_QPOLYG",
        }
    }

    /// Shape produced when cells of this shape are split into simplices.
    pub fn simplex_target(self) -> Option<CellType> {
        match self {
            CellType::Quad4 => Some(CellType::Tri3),
            CellType::Hexa8 => Some(CellType::Tetra4),
            _ => None,
        }
    }

    fn son_table(self) -> Option<&'static SonTable> {
        sons::table(self)
    }

    /// Number of sons (sub-entities of dimension `dimension() - 1`) of a cell
    /// whose node list is `cell`. Static shapes ignore `cell`.
    pub fn number_of_sons(self, cell: &[IdType]) -> usize {
        match self {
            CellType::Polygon => cell.len(),
            CellType::QPolyg => cell.len() / 2,
            CellType::Polyhed => count_faces(cell),
            _ => self.son_table().map_or(0, |t| t.faces.len()),
        }
    }

    /// Shape of son `son` of a cell with node list `cell`.
    pub fn son_type(self, son: usize, cell: &[IdType]) -> Result<CellType, MeshError> {
        match self {
            CellType::Polygon => Ok(CellType::Seg2),
            CellType::QPolyg => Ok(CellType::Seg3),
            CellType::Polyhed => {
                let face = polyhedron_face(cell, son).ok_or_else(|| son_out_of_range(self, son))?;
                Ok(if face.len() == 3 { CellType::Tri3 } else if face.len() == 4 { CellType::Quad4 } else { CellType::Polygon })
            }
            _ => self
                .son_table()
                .and_then(|t| t.faces.get(son))
                .map(|(ty, _)| *ty)
                .ok_or_else(|| son_out_of_range(self, son)),
        }
    }

    /// Append the node ids of son `son` of `cell` to `out`.
    pub fn fill_son_connectivity(
        self,
        son: usize,
        cell: &[IdType],
        out: &mut Vec<IdType>,
    ) -> Result<(), MeshError> {
        match self {
            CellType::Polygon => {
                let n = cell.len();
                if son >= n {
                    return Err(son_out_of_range(self, son));
                }
                out.push(cell[son]);
                out.push(cell[(son + 1) % n]);
            }
            CellType::QPolyg => {
                let h = cell.len() / 2;
                if son >= h {
                    return Err(son_out_of_range(self, son));
                }
                out.push(cell[son]);
                out.push(cell[(son + 1) % h]);
                out.push(cell[son + h]);
            }
            CellType::Polyhed => {
                let face = polyhedron_face(cell, son).ok_or_else(|| son_out_of_range(self, son))?;
                out.extend_from_slice(face);
            }
            _ => {
                let (_, local) = self
                    .son_table()
                    .and_then(|t| t.faces.get(son))
                    .ok_or_else(|| son_out_of_range(self, son))?;
                gather(cell, local, out)?;
            }
        }
        Ok(())
    }

    /// Number of edges of a cell. For 2D shapes edges are the sons; for
    /// polyhedra every face contributes its own edges, so shared edges repeat.
    pub fn number_of_edges(self, cell: &[IdType]) -> usize {
        match self.dimension() {
            0 => 0,
            1 => 1,
            2 => self.number_of_sons(cell),
            _ => match self {
                CellType::Polyhed => cell.iter().filter(|&&v| v != SENTINEL).count(),
                _ => self.son_table().map_or(0, |t| t.edges.len()),
            },
        }
    }

    /// Append the node ids of edge `edge` of `cell` to `out`.
    pub fn fill_edge_connectivity(
        self,
        edge: usize,
        cell: &[IdType],
        out: &mut Vec<IdType>,
    ) -> Result<(), MeshError> {
        match self.dimension() {
            0 => Err(son_out_of_range(self, edge)),
            1 => {
                if edge != 0 {
                    return Err(son_out_of_range(self, edge));
                }
                out.extend_from_slice(cell);
                Ok(())
            }
            2 => self.fill_son_connectivity(edge, cell, out),
            _ => match self {
                CellType::Polyhed => {
                    let mut k = edge;
                    for face in polyhedron_faces(cell) {
                        if k < face.len() {
                            out.push(face[k]);
                            out.push(face[(k + 1) % face.len()]);
                            return Ok(());
                        }
                        k -= face.len();
                    }
                    Err(son_out_of_range(self, edge))
                }
                _ => {
                    let local = self
                        .son_table()
                        .and_then(|t| t.edges.get(edge))
                        .ok_or_else(|| son_out_of_range(self, edge))?;
                    gather(cell, local, out)
                }
            },
        }
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.repr())
    }
}

/// Number of faces of a polyhedron node list.
pub(crate) fn count_faces(cell: &[IdType]) -> usize {
    if cell.is_empty() {
        0
    } else {
        cell.iter().filter(|&&v| v == SENTINEL).count() + 1
    }
}

/// Faces of a polyhedron node list, split on the separator.
pub(crate) fn polyhedron_faces(cell: &[IdType]) -> impl Iterator<Item = &[IdType]> {
    let empty = cell.is_empty();
    cell.split(|&v| v == SENTINEL).filter(move |_| !empty)
}

fn polyhedron_face(cell: &[IdType], face: usize) -> Option<&[IdType]> {
    polyhedron_faces(cell).nth(face)
}

fn gather(cell: &[IdType], local: &[usize], out: &mut Vec<IdType>) -> Result<(), MeshError> {
    for &l in local {
        let v = cell.get(l).ok_or_else(|| {
            MeshError::InvalidArgument(format!(
                "cell node list of length {} too short for local node {l}",
                cell.len()
            ))
        })?;
        out.push(*v);
    }
    Ok(())
}

fn son_out_of_range(ty: CellType, son: usize) -> MeshError {
    MeshError::OutOfRange(format!("sub-entity {son} does not exist for {}", ty.repr()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_registry() {
        for t in ALL_CELL_TYPES {
            assert_eq!(CellType::from_code(t.code()).unwrap(), t);
        }
        assert!(matches!(
            CellType::from_code(7),
            Err(MeshError::InvalidArgument(_))
        ));
    }

    #[test]
    fn static_and_dynamic_shapes() {
        assert_eq!(CellType::Hexa8.number_of_nodes(), Some(8));
        assert_eq!(CellType::Hexa8.dimension(), 3);
        assert!(!CellType::Hexa8.is_dynamic());
        assert!(CellType::Polyhed.is_dynamic());
        assert_eq!(CellType::Polygon.number_of_nodes(), None);
        assert!(CellType::Tetra4.is_simplex());
        assert!(!CellType::Quad4.is_simplex());
    }

    #[test]
    fn tetra_faces_and_edges() {
        let cell = [10, 11, 12, 13];
        assert_eq!(CellType::Tetra4.number_of_sons(&cell), 4);
        let mut out = Vec::new();
        CellType::Tetra4.fill_son_connectivity(1, &cell, &mut out).unwrap();
        assert_eq!(out, vec![10, 13, 11]);
        out.clear();
        CellType::Tetra4.fill_edge_connectivity(5, &cell, &mut out).unwrap();
        assert_eq!(out, vec![12, 13]);
    }

    #[test]
    fn polygon_and_polyhedron_sons() {
        let poly = [4, 5, 6, 7, 8];
        let mut out = Vec::new();
        CellType::Polygon.fill_son_connectivity(4, &poly, &mut out).unwrap();
        assert_eq!(out, vec![8, 4]);

        let polyh = [0, 1, 2, -1, 0, 3, 1, -1, 1, 3, 2, -1, 2, 3, 0];
        assert_eq!(CellType::Polyhed.number_of_sons(&polyh), 4);
        out.clear();
        CellType::Polyhed.fill_son_connectivity(2, &polyh, &mut out).unwrap();
        assert_eq!(out, vec![1, 3, 2]);
        assert_eq!(CellType::Polyhed.son_type(2, &polyh).unwrap(), CellType::Tri3);
        assert!(CellType::Polyhed.son_type(4, &polyh).is_err());
    }

    #[test]
    fn qpolyg_sons_pick_middle_nodes() {
        let q = [0, 1, 2, 10, 11, 12];
        let mut out = Vec::new();
        CellType::QPolyg.fill_son_connectivity(2, &q, &mut out).unwrap();
        assert_eq!(out, vec![2, 0, 12]);
    }
}
