#![allow(dead_code)]
use std::sync::Arc;

use mesh_coupling::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub fn coords2(points: &[[f64; 2]]) -> Arc<Coordinates> {
    Arc::new(Coordinates::from_tuples(points).unwrap())
}

pub fn coords3(points: &[[f64; 3]]) -> Arc<Coordinates> {
    Arc::new(Coordinates::from_tuples(points).unwrap())
}

/// `nx` by `ny` QUAD4 grid on the unit spacing, nodes numbered row by row.
pub fn quad_grid(nx: usize, ny: usize) -> StaticMesh {
    let mut pts = Vec::new();
    for j in 0..=ny {
        for i in 0..=nx {
            pts.push([i as f64, j as f64]);
        }
    }
    let row = (nx + 1) as IdType;
    let mut conn = Vec::new();
    for j in 0..ny as IdType {
        for i in 0..nx as IdType {
            let n0 = j * row + i;
            conn.extend_from_slice(&[n0, n0 + 1, n0 + 1 + row, n0 + row]);
        }
    }
    StaticMesh::from_arrays("grid", CellType::Quad4, coords2(&pts), conn).unwrap()
}

/// Unit square split along 0-2 into two TRI3 cells.
pub fn two_triangles() -> StaticMesh {
    let c = coords2(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    StaticMesh::from_arrays("square", CellType::Tri3, c, vec![0, 1, 2, 0, 2, 3]).unwrap()
}

pub fn unit_tetra() -> StaticMesh {
    let c = coords3(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ]);
    StaticMesh::from_arrays("tet", CellType::Tetra4, c, vec![0, 1, 2, 3]).unwrap()
}

/// Two unit cubes side by side along x, both numbered the reference way.
pub fn hexa_pair() -> StaticMesh {
    let c = coords3(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
        [2.0, 0.0, 0.0],
        [2.0, 1.0, 0.0],
        [2.0, 0.0, 1.0],
        [2.0, 1.0, 1.0],
    ]);
    let conn = vec![0, 1, 2, 3, 4, 5, 6, 7, 1, 8, 9, 2, 5, 10, 11, 6];
    StaticMesh::from_arrays("hexas", CellType::Hexa8, c, conn).unwrap()
}

/// A pentagon and a triangle sharing the edge 2-3.
pub fn polygons() -> DynamicMesh {
    let c = coords2(&[
        [0.0, 0.0],
        [1.0, 0.0],
        [1.5, 1.0],
        [0.5, 1.5],
        [-0.5, 1.0],
        [1.5, 2.0],
    ]);
    DynamicMesh::from_arrays(
        "polys",
        CellType::Polygon,
        c,
        vec![0, 1, 2, 3, 4, 2, 5, 3],
        vec![0, 5, 8],
    )
    .unwrap()
}

/// Unit tetrahedron written as a polyhedron.
pub fn polyhedron() -> DynamicMesh {
    let c = coords3(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ]);
    DynamicMesh::from_arrays(
        "polyhed",
        CellType::Polyhed,
        c,
        vec![0, 1, 2, -1, 0, 3, 1, -1, 1, 3, 2, -1, 2, 3, 0],
        vec![0, 15],
    )
    .unwrap()
}

/// Seeded random permutation of `0..n` in old-to-new form.
pub fn random_permutation(n: usize, seed: u64) -> Vec<IdType> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut p: Vec<IdType> = (0..n as IdType).collect();
    p.shuffle(&mut rng);
    p
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}

pub fn assert_close(got: &[f64], want: &[f64], eps: f64) {
    assert_eq!(got.len(), want.len(), "length mismatch: {got:?} vs {want:?}");
    for (k, (a, b)) in got.iter().zip(want).enumerate() {
        assert!((a - b).abs() <= eps, "entry {k}: {a} vs {b}");
    }
}
