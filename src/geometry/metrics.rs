//! Geometry metrics of single cells.
//!
//! All functions take a cell as its shape plus its node list (as stored in
//! the connectivity) and the mesh coordinates. Coordinates of dimension 1 or 2
//! are padded with zeros to three components.
//!
//! Quadratic shapes are measured through their corner nodes, except
//! segments whose length goes through the middle node.
//!
//! Faces of 3D reference shapes are listed with normals pointing into the
//! cell, so a well-oriented cell has a positive volume.

use crate::data::coordinates::Coordinates;
use crate::data::indexed_array::{IdType, SENTINEL, checked_index};
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;

const EPS: f64 = 1e-12;

/// Linear shape and corner nodes of a cell.
pub fn linear_part(ty: CellType, cell: &[IdType]) -> (CellType, &[IdType]) {
    let corners = match ty {
        CellType::Seg3 => 2,
        CellType::Tri6 => 3,
        CellType::Quad8 | CellType::Tetra10 => 4,
        CellType::QPolyg => cell.len() / 2,
        _ => return (ty, cell),
    };
    let lin = match ty {
        CellType::Seg3 => CellType::Seg2,
        CellType::Tri6 => CellType::Tri3,
        CellType::Quad8 => CellType::Quad4,
        CellType::Tetra10 => CellType::Tetra4,
        _ => CellType::Polygon,
    };
    (lin, &cell[..corners.min(cell.len())])
}

/// Coordinates of the nodes of `cell`, separators skipped.
pub fn gather_points(cell: &[IdType], coords: &Coordinates) -> Result<Vec<[f64; 3]>, MeshError> {
    let n = coords.number_of_nodes();
    cell.iter()
        .filter(|&&v| v != SENTINEL)
        .map(|&v| coords.point3(checked_index(v, n, "node id")?))
        .collect()
}

/// Length, area or volume of a cell.
///
/// Areas are signed (counter-clockwise positive) in a 2D space and unsigned
/// in 3D; volumes are signed.
pub fn cell_measure(ty: CellType, cell: &[IdType], coords: &Coordinates) -> Result<f64, MeshError> {
    if ty == CellType::Seg3 && cell.len() == 3 {
        let p = gather_points(cell, coords)?;
        return Ok(norm(sub(p[2], p[0])) + norm(sub(p[1], p[2])));
    }
    let (lin, nodes) = linear_part(ty, cell);
    match lin.dimension() {
        0 => Ok(0.0),
        1 => {
            let p = gather_points(nodes, coords)?;
            match p.as_slice() {
                [a, b] => Ok(norm(sub(*b, *a))),
                _ => Err(node_count_error(ty, 2, p.len())),
            }
        }
        2 => {
            let p = gather_points(nodes, coords)?;
            if coords.dimension() == 2 {
                Ok(shoelace(&p))
            } else {
                Ok(0.5 * norm(newell(&p)))
            }
        }
        _ => polyhedron_volume(lin, nodes, coords),
    }
}

/// Center of mass of a cell, in the mesh's space dimension.
pub fn center_of_mass(ty: CellType, cell: &[IdType], coords: &Coordinates) -> Result<Vec<f64>, MeshError> {
    let (lin, nodes) = linear_part(ty, cell);
    let corners = gather_points(nodes, coords)?;
    if corners.is_empty() {
        return Err(MeshError::InvalidMeshState(format!(
            "{} cell without nodes has no center",
            ty.repr()
        )));
    }
    let c0 = average(&corners);
    let c = if lin.is_simplex() {
        c0
    } else if lin.dimension() == 2 {
        weighted_centroid(
            c0,
            fan(&corners).map(|(a, b)| {
                let w = 0.5 * norm(cross(sub(a, c0), sub(b, c0)));
                (w, scale(add(add(c0, a), b), 1.0 / 3.0))
            }),
        )
    } else if lin.dimension() == 3 {
        let mut pieces = Vec::new();
        for face in sons_points(lin, nodes, coords)? {
            for (a, b) in face_triangles(&face) {
                let f0 = face[0];
                let w = signed_volume(c0, f0, a, b).abs();
                pieces.push((w, scale(add(add(c0, f0), add(a, b)), 0.25)));
            }
        }
        weighted_centroid(c0, pieces.into_iter())
    } else {
        c0
    };
    Ok(c[..coords.dimension().min(3)].to_vec())
}

/// Arithmetic mean of the node occurrences of a cell, separators skipped.
///
/// A node listed twice (shared polyhedron faces) weighs twice.
pub fn iso_barycenter(cell: &[IdType], coords: &Coordinates) -> Result<Vec<f64>, MeshError> {
    let dim = coords.dimension();
    let mut out = vec![0.0; dim];
    let mut count = 0usize;
    for &v in cell.iter().filter(|&&v| v != SENTINEL) {
        let p = coords.node(checked_index(v, coords.number_of_nodes(), "node id")?)?;
        for (o, x) in out.iter_mut().zip(p) {
            *o += x;
        }
        count += 1;
    }
    if count == 0 {
        return Err(MeshError::InvalidMeshState(
            "cell without nodes has no iso-barycenter".into(),
        ));
    }
    let inv = 1.0 / count as f64;
    out.iter_mut().for_each(|o| *o *= inv);
    Ok(out)
}

/// Axis-aligned box `[x_min, x_max, y_min, y_max, ...]` of the valid nodes
/// of a cell. Ids outside the coordinate range are ignored.
pub fn cell_bounding_box(cell: &[IdType], coords: &Coordinates) -> Result<Vec<f64>, MeshError> {
    let dim = coords.dimension();
    let n = coords.number_of_nodes();
    let mut bbox: Vec<f64> = (0..dim).flat_map(|_| [f64::MAX, f64::MIN]).collect();
    let mut any = false;
    for &v in cell {
        if v < 0 || v as usize >= n {
            continue;
        }
        any = true;
        for (k, x) in coords.node(v as usize)?.iter().enumerate() {
            bbox[2 * k] = bbox[2 * k].min(*x);
            bbox[2 * k + 1] = bbox[2 * k + 1].max(*x);
        }
    }
    if !any {
        return Err(MeshError::InvalidMeshState(
            "cell has no valid node id to build a bounding box".into(),
        ));
    }
    Ok(bbox)
}

/// Largest distance between two nodes of a cell.
pub fn diameter(cell: &[IdType], coords: &Coordinates) -> Result<f64, MeshError> {
    let p = gather_points(cell, coords)?;
    let mut best: f64 = 0.0;
    for (i, a) in p.iter().enumerate() {
        for b in &p[i + 1..] {
            best = best.max(norm(sub(*a, *b)));
        }
    }
    Ok(best)
}

/// Heights of a triangle relative to its edges `(p0 p1)`, `(p1 p2)`, `(p2 p0)`.
pub fn triangle_heights(p0: [f64; 3], p1: [f64; 3], p2: [f64; 3]) -> [f64; 3] {
    let ab = norm(sub(p1, p0));
    let bc = norm(sub(p2, p1));
    let ca = norm(sub(p0, p2));
    let s = 0.5 * (ab + bc + ca);
    let twice_area = 2.0 * (s * (s - ab) * (s - bc) * (s - ca)).max(0.0).sqrt();
    [twice_area / ab, twice_area / bc, twice_area / ca]
}

/// Whether `point` lies in the cell, up to `eps`.
///
/// Cells are decomposed into simplices around their vertex average, which is
/// exact for convex cells.
pub fn cell_contains_point(
    ty: CellType,
    cell: &[IdType],
    coords: &Coordinates,
    point: &[f64],
    eps: f64,
) -> Result<bool, MeshError> {
    let mut p = [0.0; 3];
    for (o, x) in p.iter_mut().zip(point) {
        *o = *x;
    }
    let (lin, nodes) = linear_part(ty, cell);
    let corners = gather_points(nodes, coords)?;
    if corners.is_empty() {
        return Ok(false);
    }
    match lin.dimension() {
        0 => Ok(norm(sub(p, corners[0])) <= eps),
        1 => Ok(corners.len() == 2 && segment_distance(p, corners[0], corners[1]) <= eps),
        2 => {
            let c0 = average(&corners);
            Ok(fan(&corners).any(|(a, b)| point_in_triangle(p, c0, a, b, eps)))
        }
        _ => {
            let c0 = average(&corners);
            for face in sons_points(lin, nodes, coords)? {
                for (a, b) in face_triangles(&face) {
                    if point_in_tetra(p, c0, face[0], a, b, eps) {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        }
    }
}

fn sons_points(ty: CellType, nodes: &[IdType], coords: &Coordinates) -> Result<Vec<Vec<[f64; 3]>>, MeshError> {
    let mut buf = Vec::new();
    let mut out = Vec::with_capacity(ty.number_of_sons(nodes));
    for s in 0..ty.number_of_sons(nodes) {
        buf.clear();
        ty.fill_son_connectivity(s, nodes, &mut buf)?;
        let (_, face) = linear_part(ty.son_type(s, nodes)?, &buf);
        out.push(gather_points(face, coords)?);
    }
    Ok(out)
}

fn polyhedron_volume(ty: CellType, nodes: &[IdType], coords: &Coordinates) -> Result<f64, MeshError> {
    let mut flux = 0.0;
    for face in sons_points(ty, nodes, coords)? {
        if face.len() < 3 {
            return Err(MeshError::InvalidMeshState(format!(
                "{} cell has a face with {} nodes",
                ty.repr(),
                face.len()
            )));
        }
        flux += dot(average(&face), scale(newell(&face), 0.5));
    }
    Ok(-flux / 3.0)
}

/// Consecutive pairs of a closed ring.
fn fan(ring: &[[f64; 3]]) -> impl Iterator<Item = ([f64; 3], [f64; 3])> + '_ {
    let n = ring.len();
    (0..n).filter(move |_| n >= 2).map(move |i| (ring[i], ring[(i + 1) % n]))
}

/// Triangles `(face[0], a, b)` covering a planar face.
fn face_triangles(face: &[[f64; 3]]) -> impl Iterator<Item = ([f64; 3], [f64; 3])> + '_ {
    face.get(1..).unwrap_or(&[]).windows(2).map(|w| (w[0], w[1]))
}

fn weighted_centroid(fallback: [f64; 3], pieces: impl Iterator<Item = (f64, [f64; 3])>) -> [f64; 3] {
    let mut total = 0.0;
    let mut acc = [0.0; 3];
    for (w, c) in pieces {
        total += w;
        acc = add(acc, scale(c, w));
    }
    if total <= EPS {
        fallback
    } else {
        scale(acc, 1.0 / total)
    }
}

fn shoelace(p: &[[f64; 3]]) -> f64 {
    0.5 * fan(p).map(|(a, b)| a[0] * b[1] - b[0] * a[1]).sum::<f64>()
}

/// Twice the area vector of a planar polygon.
fn newell(p: &[[f64; 3]]) -> [f64; 3] {
    fan(p).fold([0.0; 3], |acc, (a, b)| add(acc, cross(a, b)))
}

fn segment_distance(p: [f64; 3], a: [f64; 3], b: [f64; 3]) -> f64 {
    let ab = sub(b, a);
    let len2 = dot(ab, ab);
    let t = if len2 <= EPS { 0.0 } else { (dot(sub(p, a), ab) / len2).clamp(0.0, 1.0) };
    norm(sub(p, add(a, scale(ab, t))))
}

fn point_in_triangle(p: [f64; 3], a: [f64; 3], b: [f64; 3], c: [f64; 3], eps: f64) -> bool {
    let n = cross(sub(b, a), sub(c, a));
    let n2 = dot(n, n);
    if n2 <= EPS * EPS {
        return false;
    }
    if dot(sub(p, a), n).abs() / n2.sqrt() > eps {
        return false;
    }
    let la = dot(cross(sub(b, p), sub(c, p)), n) / n2;
    let lb = dot(cross(sub(c, p), sub(a, p)), n) / n2;
    let lc = 1.0 - la - lb;
    la >= -eps && lb >= -eps && lc >= -eps
}

fn point_in_tetra(p: [f64; 3], a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3], eps: f64) -> bool {
    let v = signed_volume(a, b, c, d);
    if v.abs() <= EPS {
        return false;
    }
    let l = [
        signed_volume(p, b, c, d) / v,
        signed_volume(a, p, c, d) / v,
        signed_volume(a, b, p, d) / v,
        signed_volume(a, b, c, p) / v,
    ];
    l.iter().all(|&x| x >= -eps)
}

fn node_count_error(ty: CellType, expected: usize, found: usize) -> MeshError {
    MeshError::InvalidMeshState(format!(
        "{} cell expects {expected} nodes, got {found}",
        ty.repr()
    ))
}

fn average(p: &[[f64; 3]]) -> [f64; 3] {
    let s = p.iter().fold([0.0; 3], |acc, x| add(acc, *x));
    scale(s, 1.0 / p.len().max(1) as f64)
}

pub(crate) fn signed_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    let ab = sub(b, a);
    let ac = sub(c, a);
    let ad = sub(d, a);
    dot(ab, cross(ac, ad)) / 6.0
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> Coordinates {
        Coordinates::from_tuples(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn hexa_and_tetra_volumes_are_positive() {
        let c = unit_cube();
        let hexa = [0, 1, 2, 3, 4, 5, 6, 7];
        assert!((cell_measure(CellType::Hexa8, &hexa, &c).unwrap() - 1.0).abs() < 1e-12);
        let tet = [0, 1, 3, 4];
        assert!((cell_measure(CellType::Tetra4, &tet, &c).unwrap() - 1.0 / 6.0).abs() < 1e-12);
        let inverted = [0, 3, 1, 4];
        assert!(cell_measure(CellType::Tetra4, &inverted, &c).unwrap() < 0.0);
    }

    #[test]
    fn polyhedron_matches_hexa() {
        let c = unit_cube();
        let polyh = [
            0, 1, 2, 3, -1, 4, 7, 6, 5, -1, 0, 4, 5, 1, -1, 1, 5, 6, 2, -1, 2, 6, 7, 3, -1, 3, 7,
            4, 0,
        ];
        assert!((cell_measure(CellType::Polyhed, &polyh, &c).unwrap() - 1.0).abs() < 1e-12);
        let com = center_of_mass(CellType::Polyhed, &polyh, &c).unwrap();
        for x in com {
            assert!((x - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn signed_area_in_plane() {
        let c = Coordinates::from_tuples(&[[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0]]).unwrap();
        assert!((cell_measure(CellType::Quad4, &[0, 1, 2, 3], &c).unwrap() - 2.0).abs() < 1e-12);
        assert!((cell_measure(CellType::Quad4, &[0, 3, 2, 1], &c).unwrap() + 2.0).abs() < 1e-12);
    }

    #[test]
    fn point_location() {
        let c = unit_cube();
        let hexa = [0, 1, 2, 3, 4, 5, 6, 7];
        assert!(cell_contains_point(CellType::Hexa8, &hexa, &c, &[0.2, 0.7, 0.9], 1e-12).unwrap());
        assert!(!cell_contains_point(CellType::Hexa8, &hexa, &c, &[1.2, 0.7, 0.9], 1e-12).unwrap());
    }

    #[test]
    fn bounding_box_skips_invalid_ids() {
        let c = unit_cube();
        assert_eq!(
            cell_bounding_box(&[1, -1, 6], &c).unwrap(),
            vec![1.0, 1.0, 0.0, 1.0, 0.0, 1.0]
        );
        assert!(matches!(
            cell_bounding_box(&[-1, 99], &c),
            Err(MeshError::InvalidMeshState(_))
        ));
    }

    #[test]
    fn right_triangle_heights() {
        let h = triangle_heights([0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 4.0, 0.0]);
        assert!((h[0] - 4.0).abs() < 1e-12);
        assert!((h[1] - 2.4).abs() < 1e-12);
        assert!((h[2] - 3.0).abs() < 1e-12);
    }
}
