//! Orientation inversion of a single cell's node list.
//!
//! Inverting keeps the set of nodes and the absolute measure of the cell but
//! flips its normal (2D) or its sign of volume (3D).

use crate::data::indexed_array::{IdType, SENTINEL};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;

/// Node permutation `new[i] = old[perm[i]]` of static shapes.
fn permutation(ty: CellType) -> Option<&'static [usize]> {
    match ty {
        CellType::Point1 => Some(&[0]),
        CellType::Seg2 => Some(&[1, 0]),
        CellType::Seg3 => Some(&[1, 0, 2]),
        CellType::Tri3 => Some(&[0, 2, 1]),
        CellType::Tri6 => Some(&[0, 2, 1, 5, 4, 3]),
        CellType::Quad4 => Some(&[0, 3, 2, 1]),
        CellType::Quad8 => Some(&[0, 3, 2, 1, 7, 6, 5, 4]),
        CellType::Tetra4 => Some(&[0, 2, 1, 3]),
        CellType::Tetra10 => Some(&[0, 2, 1, 3, 6, 5, 4, 7, 9, 8]),
        CellType::Pyra5 => Some(&[0, 3, 2, 1, 4]),
        CellType::Penta6 => Some(&[0, 2, 1, 3, 5, 4]),
        CellType::Hexa8 => Some(&[0, 3, 2, 1, 4, 7, 6, 5]),
        CellType::Polygon | CellType::Polyhed | CellType::QPolyg => None,
    }
}

/// Invert in place the orientation of one cell of shape `ty`.
pub fn invert_orientation(ty: CellType, cell: &mut [IdType]) -> Result<(), MeshError> {
    match ty {
        CellType::Polygon => {
            if cell.len() > 1 {
                cell[1..].reverse();
            }
        }
        CellType::QPolyg => {
            let h = cell.len() / 2;
            if h > 1 {
                cell[1..h].reverse();
            }
            cell[h..].reverse();
        }
        CellType::Polyhed => {
            for face in cell.split_mut(|&v| v == SENTINEL) {
                if face.len() > 1 {
                    face[1..].reverse();
                }
            }
        }
        _ => {
            let perm = permutation(ty).unwrap_or(&[]);
            if cell.len() != perm.len() {
                return Err(MeshError::InvalidArgument(format!(
                    "{} cell expects {} nodes, got {}",
                    ty.repr(),
                    perm.len(),
                    cell.len()
                )));
            }
            let old: Vec<IdType> = cell.to_vec();
            for (dst, &src) in cell.iter_mut().zip(perm) {
                *dst = old[src];
            }
        }
    }
    Ok(())
}
