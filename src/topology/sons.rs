//! Local connectivity tables of the static reference shapes.
//!
//! Local node numbering follows the usual finite-element conventions: the
//! bottom face of a hexahedron is `0,1,2,3`, its top face `4,5,6,7` with `4`
//! above `0`; the pyramid apex is node `4`; quadratic middle nodes follow the
//! corner nodes in edge order.
//!
//! The hexahedron face order is relied upon by the face-pairing tables of
//! [`crate::algs::hexa8_sort`] and the tetrahedron face/edge order by
//! [`crate::algs::dual_mesh`]; the three must change together.

use crate::topology::cell_type::CellType;
use static_assertions::const_assert_eq;

/// Sons (with their shape) and edges of one static shape.
pub(crate) struct SonTable {
    pub faces: &'static [(CellType, &'static [usize])],
    pub edges: &'static [&'static [usize]],
}

const SEG: SonTable = SonTable {
    faces: &[(CellType::Point1, &[0]), (CellType::Point1, &[1])],
    edges: &[&[0, 1]],
};

const SEG3: SonTable = SonTable {
    faces: &[(CellType::Point1, &[0]), (CellType::Point1, &[1])],
    edges: &[&[0, 1, 2]],
};

const TRI3: SonTable = SonTable {
    faces: &[
        (CellType::Seg2, &[0, 1]),
        (CellType::Seg2, &[1, 2]),
        (CellType::Seg2, &[2, 0]),
    ],
    edges: &[&[0, 1], &[1, 2], &[2, 0]],
};

const TRI6: SonTable = SonTable {
    faces: &[
        (CellType::Seg3, &[0, 1, 3]),
        (CellType::Seg3, &[1, 2, 4]),
        (CellType::Seg3, &[2, 0, 5]),
    ],
    edges: &[&[0, 1, 3], &[1, 2, 4], &[2, 0, 5]],
};

const QUAD4: SonTable = SonTable {
    faces: &[
        (CellType::Seg2, &[0, 1]),
        (CellType::Seg2, &[1, 2]),
        (CellType::Seg2, &[2, 3]),
        (CellType::Seg2, &[3, 0]),
    ],
    edges: &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]],
};

const QUAD8: SonTable = SonTable {
    faces: &[
        (CellType::Seg3, &[0, 1, 4]),
        (CellType::Seg3, &[1, 2, 5]),
        (CellType::Seg3, &[2, 3, 6]),
        (CellType::Seg3, &[3, 0, 7]),
    ],
    edges: &[&[0, 1, 4], &[1, 2, 5], &[2, 3, 6], &[3, 0, 7]],
};

pub(crate) const TETRA4_FACES: [[usize; 3]; 4] = [[0, 1, 2], [0, 3, 1], [1, 3, 2], [2, 3, 0]];
pub(crate) const TETRA4_EDGES: [[usize; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];

const TETRA4: SonTable = SonTable {
    faces: &[
        (CellType::Tri3, &[0, 1, 2]),
        (CellType::Tri3, &[0, 3, 1]),
        (CellType::Tri3, &[1, 3, 2]),
        (CellType::Tri3, &[2, 3, 0]),
    ],
    edges: &[
        &[0, 1],
        &[1, 2],
        &[2, 0],
        &[0, 3],
        &[1, 3],
        &[2, 3],
    ],
};

const TETRA10: SonTable = SonTable {
    faces: &[
        (CellType::Tri6, &[0, 1, 2, 4, 5, 6]),
        (CellType::Tri6, &[0, 3, 1, 7, 8, 4]),
        (CellType::Tri6, &[1, 3, 2, 8, 9, 5]),
        (CellType::Tri6, &[2, 3, 0, 9, 7, 6]),
    ],
    edges: &[
        &[0, 1, 4],
        &[1, 2, 5],
        &[2, 0, 6],
        &[0, 3, 7],
        &[1, 3, 8],
        &[2, 3, 9],
    ],
};

const PYRA5: SonTable = SonTable {
    faces: &[
        (CellType::Quad4, &[0, 1, 2, 3]),
        (CellType::Tri3, &[0, 4, 1]),
        (CellType::Tri3, &[1, 4, 2]),
        (CellType::Tri3, &[2, 4, 3]),
        (CellType::Tri3, &[3, 4, 0]),
    ],
    edges: &[
        &[0, 1],
        &[1, 2],
        &[2, 3],
        &[3, 0],
        &[0, 4],
        &[1, 4],
        &[2, 4],
        &[3, 4],
    ],
};

const PENTA6: SonTable = SonTable {
    faces: &[
        (CellType::Tri3, &[0, 1, 2]),
        (CellType::Tri3, &[3, 5, 4]),
        (CellType::Quad4, &[0, 3, 4, 1]),
        (CellType::Quad4, &[1, 4, 5, 2]),
        (CellType::Quad4, &[2, 5, 3, 0]),
    ],
    edges: &[
        &[0, 1],
        &[1, 2],
        &[2, 0],
        &[3, 4],
        &[4, 5],
        &[5, 3],
        &[0, 3],
        &[1, 4],
        &[2, 5],
    ],
};

pub(crate) const HEXA8_FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 7, 6, 5],
    [0, 4, 5, 1],
    [1, 5, 6, 2],
    [2, 6, 7, 3],
    [3, 7, 4, 0],
];
pub(crate) const HEXA8_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

const HEXA8: SonTable = SonTable {
    faces: &[
        (CellType::Quad4, &[0, 1, 2, 3]),
        (CellType::Quad4, &[4, 7, 6, 5]),
        (CellType::Quad4, &[0, 4, 5, 1]),
        (CellType::Quad4, &[1, 5, 6, 2]),
        (CellType::Quad4, &[2, 6, 7, 3]),
        (CellType::Quad4, &[3, 7, 4, 0]),
    ],
    edges: &[
        &[0, 1],
        &[1, 2],
        &[2, 3],
        &[3, 0],
        &[4, 5],
        &[5, 6],
        &[6, 7],
        &[7, 4],
        &[0, 4],
        &[1, 5],
        &[2, 6],
        &[3, 7],
    ],
};

const_assert_eq!(HEXA8_FACES.len(), 6);
const_assert_eq!(HEXA8_EDGES.len(), 12);
const_assert_eq!(TETRA4_FACES.len(), 4);
const_assert_eq!(TETRA4_EDGES.len(), 6);

static SEG2_TABLE: SonTable = SEG;
static SEG3_TABLE: SonTable = SEG3;
static TRI3_TABLE: SonTable = TRI3;
static TRI6_TABLE: SonTable = TRI6;
static QUAD4_TABLE: SonTable = QUAD4;
static QUAD8_TABLE: SonTable = QUAD8;
static TETRA4_TABLE: SonTable = TETRA4;
static TETRA10_TABLE: SonTable = TETRA10;
static PYRA5_TABLE: SonTable = PYRA5;
static PENTA6_TABLE: SonTable = PENTA6;
static HEXA8_TABLE: SonTable = HEXA8;

/// Table of a static shape; `None` for points and dynamic shapes.
pub(crate) fn table(ty: CellType) -> Option<&'static SonTable> {
    match ty {
        CellType::Seg2 => Some(&SEG2_TABLE),
        CellType::Seg3 => Some(&SEG3_TABLE),
        CellType::Tri3 => Some(&TRI3_TABLE),
        CellType::Tri6 => Some(&TRI6_TABLE),
        CellType::Quad4 => Some(&QUAD4_TABLE),
        CellType::Quad8 => Some(&QUAD8_TABLE),
        CellType::Tetra4 => Some(&TETRA4_TABLE),
        CellType::Tetra10 => Some(&TETRA10_TABLE),
        CellType::Pyra5 => Some(&PYRA5_TABLE),
        CellType::Penta6 => Some(&PENTA6_TABLE),
        CellType::Hexa8 => Some(&HEXA8_TABLE),
        CellType::Point1 | CellType::Polygon | CellType::Polyhed | CellType::QPolyg => None,
    }
}
