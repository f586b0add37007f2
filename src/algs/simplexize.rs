//! Splitting of quadrangles and hexahedra into simplices.
//!
//! Each policy targets one shape. Cells of another shape are left alone and
//! the returned new-to-old map is the identity.

use crate::data::indexed_array::IdType;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use static_assertions::const_assert_eq;

/// How cells are cut into simplices.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SimplexizePolicy {
    /// Quadrangle cut along the diagonal 0-2.
    Planar0,
    /// Quadrangle cut along the diagonal 1-3.
    Planar1,
    /// Hexahedron with planar faces cut into 5 tetrahedra.
    PlanarFace5,
    /// Hexahedron with planar faces cut into 6 tetrahedra.
    PlanarFace6,
}

impl SimplexizePolicy {
    /// Numeric policy codes: 0, 1, 5 and 6.
    pub fn from_code(code: i64) -> Result<Self, MeshError> {
        match code {
            0 => Ok(Self::Planar0),
            1 => Ok(Self::Planar1),
            5 => Ok(Self::PlanarFace5),
            6 => Ok(Self::PlanarFace6),
            other => Err(MeshError::InvalidArgument(format!(
                "unrecognized simplexize policy {other}; expected 0 or 1 (mesh dimension 2) \
                 or 5, 6 (mesh dimension 3)"
            ))),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Planar0 => 0,
            Self::Planar1 => 1,
            Self::PlanarFace5 => 5,
            Self::PlanarFace6 => 6,
        }
    }

    /// Shape the policy applies to.
    pub fn source(self) -> CellType {
        match self {
            Self::Planar0 | Self::Planar1 => CellType::Quad4,
            Self::PlanarFace5 | Self::PlanarFace6 => CellType::Hexa8,
        }
    }

    /// Local node ids of the produced simplices, concatenated.
    fn pattern(self) -> &'static [usize] {
        match self {
            Self::Planar0 => &QUAD4_POL0,
            Self::Planar1 => &QUAD4_POL1,
            Self::PlanarFace5 => &HEXA8_SPLIT_5,
            Self::PlanarFace6 => &HEXA8_SPLIT_6,
        }
    }
}

const QUAD4_POL0: [usize; 6] = [0, 1, 2, 0, 2, 3];
const QUAD4_POL1: [usize; 6] = [0, 1, 3, 1, 2, 3];
const HEXA8_SPLIT_5: [usize; 20] = [0, 5, 1, 2, 0, 4, 5, 7, 0, 2, 3, 7, 5, 7, 6, 2, 0, 7, 5, 2];
const HEXA8_SPLIT_6: [usize; 24] = [
    0, 5, 1, 6, 0, 1, 2, 6, 0, 4, 5, 6, 0, 7, 4, 6, 0, 2, 3, 6, 0, 3, 7, 6,
];

const_assert_eq!(QUAD4_POL0.len() % 3, 0);
const_assert_eq!(HEXA8_SPLIT_5.len(), 5 * 4);
const_assert_eq!(HEXA8_SPLIT_6.len(), 6 * 4);

/// Outcome of a split: new shape, new connectivity, new-to-old cell map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Simplexized {
    pub cell_type: CellType,
    pub connectivity: Vec<IdType>,
    pub new_to_old: Vec<IdType>,
}

/// Split the stride-addressed connectivity `conn` of `nb_cells` cells of
/// shape `ty`. `None` when `ty` is not the policy's source shape.
pub fn simplexize_connectivity(
    ty: CellType,
    conn: &[IdType],
    nb_cells: usize,
    policy: SimplexizePolicy,
) -> Result<Option<Simplexized>, MeshError> {
    if ty != policy.source() {
        return Ok(None);
    }
    let target = ty.simplex_target().ok_or_else(|| {
        MeshError::UnsupportedOperation(format!("{} has no simplex decomposition", ty.repr()))
    })?;
    let nnpc = ty.number_of_nodes().unwrap_or(0);
    if conn.len() != nb_cells * nnpc {
        return Err(MeshError::InconsistentState(format!(
            "connectivity of {} values does not describe {nb_cells} cells of {nnpc} nodes",
            conn.len()
        )));
    }
    let pattern = policy.pattern();
    let per_cell = pattern.len() / target.number_of_nodes().unwrap_or(1);
    let mut connectivity = Vec::with_capacity(nb_cells * pattern.len());
    let mut new_to_old = Vec::with_capacity(nb_cells * per_cell);
    for (i, cell) in conn.chunks_exact(nnpc).enumerate() {
        connectivity.extend(pattern.iter().map(|&k| cell[k]));
        new_to_old.extend(std::iter::repeat(i as IdType).take(per_cell));
    }
    Ok(Some(Simplexized {
        cell_type: target,
        connectivity,
        new_to_old,
    }))
}
