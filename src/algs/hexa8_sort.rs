//! Consistent local numbering of face-adjacent hexahedra.
//!
//! Every connected group of HEXA8 cells is walked breadth-first from its
//! lowest cell id. When a cell reaches a neighbour through a shared quad, the
//! neighbour is relabelled so that the shared quad sits on the face slot
//! opposite to the one it occupies in the current cell, starting from the
//! matching vertex. Afterwards splitting every cell with the same
//! tetrahedral pattern yields a conformal mesh.
//!
//! [`HEXA8_FACE_PAIRS`], the relabel table and the face list of
//! [`crate::topology::sons`] describe one reference hexahedron and only make
//! sense together.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use static_assertions::const_assert_eq;

use crate::data::indexed_array::IdType;
use crate::mesh_error::MeshError;
use crate::topology::sons::{HEXA8_EDGES, HEXA8_FACES};

/// Faces of the reference hexahedron grouped by opposite pairs.
pub const HEXA8_FACE_PAIRS: [usize; 6] = [0, 1, 2, 4, 3, 5];

/// Row `a` relabels a hexahedron built around face slot `a`.
const RELABEL: [usize; 48] = [
    0, 1, 2, 3, 4, 5, 6, 7, //
    4, 7, 6, 5, 0, 3, 2, 1, //
    0, 3, 7, 4, 1, 2, 6, 5, //
    4, 0, 3, 7, 5, 1, 2, 6, //
    5, 1, 0, 4, 6, 2, 3, 7, //
    3, 7, 4, 0, 2, 6, 5, 1, //
];

/// Vertex of the shared quad that starts each face slot.
const QUAD_START: [usize; 6] = [0, 0, 3, 3, 3, 3];

const_assert_eq!(RELABEL.len(), 8 * HEXA8_FACES.len());
const_assert_eq!(QUAD_START.len(), HEXA8_FACES.len());

const NO_NEIGHBOUR: IdType = -1;

/// Face slot facing `face`; `face` must be in `0..6`.
fn opposite_face(face: usize) -> usize {
    const OPPOSITE: [usize; 6] = {
        let mut out = [0; 6];
        let mut k = 0;
        while k < 6 {
            out[HEXA8_FACE_PAIRS[k]] = HEXA8_FACE_PAIRS[k ^ 1];
            k += 1;
        }
        out
    };
    OPPOSITE[face]
}

fn sorted_quad(q: &[IdType]) -> [IdType; 4] {
    let mut k = [q[0], q[1], q[2], q[3]];
    k.sort_unstable();
    k
}

/// Quads of every hexahedron, 6 per cell, in face-slot order.
pub fn explode_hexa8_quads(conn: &[IdType]) -> Vec<IdType> {
    let mut quads = Vec::with_capacity(conn.len() * 3);
    for cell in conn.chunks_exact(8) {
        for face in &HEXA8_FACES {
            quads.extend(face.iter().map(|&l| cell[l]));
        }
    }
    quads
}

/// For each face slot of each cell, the cell across that face or `-1`.
fn face_neighbours(quads: &[IdType]) -> Vec<IdType> {
    let mut groups: HashMap<[IdType; 4], Vec<usize>> = HashMap::new();
    for (q, quad) in quads.chunks_exact(4).enumerate() {
        groups.entry(sorted_quad(quad)).or_default().push(q);
    }
    let mut neigh = vec![NO_NEIGHBOUR; quads.len() / 4];
    for (key, group) in &groups {
        match group.as_slice() {
            [a, b] => {
                neigh[*a] = (*b / 6) as IdType;
                neigh[*b] = (*a / 6) as IdType;
            }
            [_] => {}
            _ => log::warn!(
                "quad {key:?} is shared by {} hexahedra; left out of the neighbourhood",
                group.len()
            ),
        }
    }
    neigh
}

/// Relabel one neighbour so that its face `valid_axis` is `shared` seen from
/// the other side. `faces` (24 values) and `neighbours` (6 values) belong to
/// the neighbour and are rewritten. Returns `true` if it was already in place.
fn update_cell(
    valid_axis: usize,
    from_cell: IdType,
    shared: &[IdType; 4],
    faces: &mut [IdType],
    neighbours: &mut [IdType],
) -> Result<bool, MeshError> {
    if neighbours[valid_axis] == from_cell && faces[4 * valid_axis] == shared[QUAD_START[valid_axis]] {
        return Ok(true);
    }
    let old_axis = neighbours
        .iter()
        .position(|&n| n == from_cell)
        .ok_or_else(|| {
            MeshError::InconsistentState(format!("cell {from_cell} is not a face neighbour"))
        })?;
    let opp = opposite_face(old_axis);
    let old_conn = [
        faces[0], faces[1], faces[2], faces[3], faces[4], faces[7], faces[6], faces[5],
    ];
    let opp_quad = [
        faces[4 * opp],
        faces[4 * opp + 1],
        faces[4 * opp + 2],
        faces[4 * opp + 3],
    ];
    let mut conn2 = [NO_NEIGHBOUR; 8];
    for i in 0..4 {
        conn2[i] = shared[(4 - i + QUAD_START[valid_axis]) % 4];
    }
    for i in 0..4 {
        let node = conn2[i];
        let across = HEXA8_EDGES.iter().find_map(|&[a, b]| {
            let other = match (old_conn[a], old_conn[b]) {
                (x, y) if x == node => y,
                (x, y) if y == node => x,
                _ => return None,
            };
            opp_quad.contains(&other).then_some(other)
        });
        conn2[i + 4] = across.ok_or_else(|| {
            MeshError::InconsistentState(format!(
                "no edge leaves node {node} towards the opposite face"
            ))
        })?;
    }
    let row = &RELABEL[8 * valid_axis..8 * valid_axis + 8];
    let relabelled: [IdType; 8] = std::array::from_fn(|i| conn2[row[i]]);
    let mut new_faces = [0 as IdType; 24];
    let mut new_neigh = [NO_NEIGHBOUR; 6];
    for (i, face) in HEXA8_FACES.iter().enumerate() {
        for (k, &l) in face.iter().enumerate() {
            new_faces[4 * i + k] = relabelled[l];
        }
        let key = sorted_quad(&new_faces[4 * i..4 * i + 4]);
        let j = (0..6)
            .find(|&j| sorted_quad(&faces[4 * j..4 * j + 4]) == key)
            .ok_or_else(|| {
                MeshError::InconsistentState(format!("relabelled face {i} matches no old face"))
            })?;
        new_neigh[i] = neighbours[j];
    }
    faces.copy_from_slice(&new_faces);
    neighbours.copy_from_slice(&new_neigh);
    Ok(false)
}

/// Renumber the nodes of HEXA8 cells so that face-adjacent cells agree.
///
/// Returns the new connectivity and the ids of the cells whose numbering
/// changed, in visiting order.
pub fn sort_hexa8_connectivity(conn: &[IdType]) -> Result<(Vec<IdType>, Vec<IdType>), MeshError> {
    if conn.len() % 8 != 0 {
        return Err(MeshError::InconsistentState(format!(
            "{} values do not describe whole HEXA8 cells",
            conn.len()
        )));
    }
    let nb_cells = conn.len() / 8;
    let mut quads = explode_hexa8_quads(conn);
    let mut neigh = face_neighbours(&quads);
    let mut fetched = vec![false; nb_cells];
    let mut changed = Vec::new();
    while let Some(seed) = fetched.iter().position(|f| !f) {
        let mut front = BTreeSet::from([seed]);
        while !front.is_empty() {
            let mut next = BTreeSet::new();
            for &cur in &front {
                fetched[cur] = true;
                for i in 0..6 {
                    let nb = neigh[6 * cur + i];
                    if nb == NO_NEIGHBOUR || fetched[nb as usize] {
                        continue;
                    }
                    let nb = nb as usize;
                    let shared = [
                        quads[24 * cur + 4 * i],
                        quads[24 * cur + 4 * i + 1],
                        quads[24 * cur + 4 * i + 2],
                        quads[24 * cur + 4 * i + 3],
                    ];
                    let in_place = update_cell(
                        opposite_face(i),
                        cur as IdType,
                        &shared,
                        &mut quads[24 * nb..24 * nb + 24],
                        &mut neigh[6 * nb..6 * nb + 6],
                    )?;
                    if !in_place {
                        changed.push(nb as IdType);
                    }
                    fetched[nb] = true;
                    next.insert(nb);
                }
            }
            front = next;
        }
    }
    let mut out = conn.to_vec();
    for &c in &changed {
        let c = c as usize;
        let q = &quads[24 * c..24 * c + 8];
        out[8 * c..8 * c + 8].copy_from_slice(&[q[0], q[1], q[2], q[3], q[4], q[7], q[6], q[5]]);
    }
    Ok((out, changed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ALIGNED: [IdType; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 1, 8, 9, 2, 5, 10, 11, 6];

    #[test]
    fn opposite_faces() {
        assert_eq!(opposite_face(0), 1);
        assert_eq!(opposite_face(1), 0);
        assert_eq!(opposite_face(2), 4);
        assert_eq!(opposite_face(3), 5);
        assert_eq!(opposite_face(5), 3);
    }

    #[test]
    fn relabel_rows_map_faces_onto_faces() {
        let face_sets: Vec<[usize; 4]> = HEXA8_FACES
            .iter()
            .map(|f| {
                let mut s = *f;
                s.sort_unstable();
                s
            })
            .collect();
        for row in RELABEL.chunks(8) {
            let mut seen = row.to_vec();
            seen.sort_unstable();
            assert_eq!(seen, (0..8).collect::<Vec<_>>());
            for f in HEXA8_FACES {
                let mut image = f.map(|v| row[v]);
                image.sort_unstable();
                assert!(face_sets.contains(&image), "{row:?} breaks face {f:?}");
            }
        }
    }

    #[test]
    #[should_panic]
    fn opposite_of_an_invalid_slot_panics() {
        opposite_face(6);
    }

    #[test]
    fn relabel_rows_are_rotations() {
        use crate::data::coordinates::Coordinates;
        use crate::geometry::metrics::cell_measure;
        use crate::topology::cell_type::CellType;

        let cube = Coordinates::from_tuples(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ])
        .unwrap();
        for row in RELABEL.chunks(8) {
            let cell: Vec<IdType> = row.iter().map(|&v| v as IdType).collect();
            let v = cell_measure(CellType::Hexa8, &cell, &cube).unwrap();
            assert!((v - 1.0).abs() < 1e-12, "{row:?} gives volume {v}");
        }
    }

    #[test]
    fn aligned_pair_is_untouched() {
        let (out, changed) = sort_hexa8_connectivity(&TWO_ALIGNED).unwrap();
        assert!(changed.is_empty());
        assert_eq!(out, TWO_ALIGNED.to_vec());
    }

    #[test]
    fn flipped_neighbour_is_restored() {
        let flipped = [0, 1, 2, 3, 4, 5, 6, 7, 5, 6, 11, 10, 1, 2, 9, 8];
        let (out, changed) = sort_hexa8_connectivity(&flipped).unwrap();
        assert_eq!(changed, vec![1]);
        assert_eq!(out, TWO_ALIGNED.to_vec());
        let (_, again) = sort_hexa8_connectivity(&out).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn ragged_input_rejected() {
        assert!(matches!(
            sort_hexa8_connectivity(&[0; 9]),
            Err(MeshError::InconsistentState(_))
        ));
    }
}
