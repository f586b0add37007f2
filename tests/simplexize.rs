mod util;

use mesh_coupling::prelude::*;
use util::*;

/// Each sub-simplex has the sign of its parent and the pieces of a parent
/// add up to the parent's signed measure.
fn assert_split_keeps_orientation(parents: &[f64], children: &[f64], new_to_old: &[IdType]) {
    let mut sums = vec![0.0; parents.len()];
    for (&child, &old) in children.iter().zip(new_to_old) {
        let parent = parents[old as usize];
        assert!(child * parent > 0.0, "piece {child} of a cell of measure {parent}");
        sums[old as usize] += child;
    }
    assert_close(&sums, parents, 1e-12);
}

#[test]
fn quad_policies_keep_area_and_map_cells() {
    for policy in [SimplexizePolicy::Planar0, SimplexizePolicy::Planar1] {
        let mut m = quad_grid(3, 2);
        let parents = m.measure_field().unwrap();
        let map = m.simplexize(policy).unwrap();
        assert_eq!(m.cell_type(), CellType::Tri3);
        assert_eq!(m.number_of_cells().unwrap(), 12);
        assert_eq!(map, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
        let areas = m.measure_field().unwrap();
        assert!(areas.iter().all(|&a| (a - 0.5).abs() < 1e-12), "{areas:?}");
        assert_split_keeps_orientation(&parents, &areas, &map);
        m.check_consistency().unwrap();
    }
}

#[test]
fn planar1_uses_the_other_diagonal() {
    let mut m = quad_grid(1, 1);
    m.simplexize_code(1).unwrap();
    assert_eq!(m.nodal_connectivity().unwrap().as_ref(), &vec![0, 1, 2, 1, 3, 2]);
}

#[test]
fn hexa_policies_keep_volume() {
    for (policy, per_cell) in [(SimplexizePolicy::PlanarFace5, 5), (SimplexizePolicy::PlanarFace6, 6)] {
        let mut m = hexa_pair();
        let parents = m.measure_field().unwrap();
        assert_close(&parents, &[1.0, 1.0], 1e-12);
        let map = m.simplexize(policy).unwrap();
        assert_eq!(m.cell_type(), CellType::Tetra4);
        assert_eq!(map.len(), 2 * per_cell);
        assert!(map[..per_cell].iter().all(|&c| c == 0));
        assert!(map[per_cell..].iter().all(|&c| c == 1));
        assert_split_keeps_orientation(&parents, &m.measure_field().unwrap(), &map);
    }
}

#[test]
fn policy_for_another_shape_is_identity() {
    let mut m = two_triangles();
    let before = m.clone();
    assert_eq!(m.simplexize(SimplexizePolicy::PlanarFace5).unwrap(), vec![0, 1]);
    assert_eq!(m, before);
    let mut q = quad_grid(2, 1);
    assert_eq!(q.simplexize(SimplexizePolicy::PlanarFace6).unwrap(), vec![0, 1]);
    assert_eq!(q.cell_type(), CellType::Quad4);
}

#[test]
fn unknown_policy_code() {
    let mut m = quad_grid(1, 1);
    let err = m.simplexize_code(4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(m.cell_type(), CellType::Quad4);
}

#[test]
fn sorted_hexas_split_conformally() {
    let flipped = vec![0, 1, 2, 3, 4, 5, 6, 7, 5, 6, 11, 10, 1, 2, 9, 8];
    let coords = hexa_pair().coords().cloned().unwrap();

    let mut raw = StaticMesh::from_arrays("raw", CellType::Hexa8, coords.clone(), flipped.clone()).unwrap();
    raw.simplexize(SimplexizePolicy::PlanarFace6).unwrap();
    assert_eq!(raw.build_unstructured().unwrap().skin().unwrap().number_of_cells(), 24);

    let mut sorted = StaticMesh::from_arrays("sorted", CellType::Hexa8, coords, flipped).unwrap();
    assert_eq!(sorted.sort_hexa8_each_other().unwrap(), vec![1]);
    assert!(sorted.is_equal_without_considering_str(&hexa_pair(), 0.0));
    let parents = sorted.measure_field().unwrap();
    for policy in [SimplexizePolicy::PlanarFace5, SimplexizePolicy::PlanarFace6] {
        let mut split = sorted.clone();
        let map = split.simplexize(policy).unwrap();
        assert_split_keeps_orientation(&parents, &split.measure_field().unwrap(), &map);
    }
    sorted.simplexize(SimplexizePolicy::PlanarFace6).unwrap();
    assert_eq!(sorted.build_unstructured().unwrap().skin().unwrap().number_of_cells(), 20);
}

#[test]
fn sorting_is_idempotent_and_shape_checked() {
    let mut m = hexa_pair();
    assert!(m.sort_hexa8_each_other().unwrap().is_empty());
    assert!(m.is_equal(&hexa_pair(), 0.0));
    let mut t = unit_tetra();
    assert_eq!(
        t.sort_hexa8_each_other().unwrap_err().kind(),
        ErrorKind::UnsupportedOperation
    );
}

#[test]
fn triangle_heights_after_split() {
    let mut m = quad_grid(1, 1);
    m.simplexize(SimplexizePolicy::Planar0).unwrap();
    let h = m.compute_triangle_height().unwrap();
    let s = 1.0 / 2f64.sqrt();
    assert_close(&h, &[1.0, 1.0, s, s, 1.0, 1.0], 1e-12);
}

#[test]
fn two_quads_split_on_their_first_diagonal() {
    let coords = coords2(&[
        [0.0, 0.0],
        [1.0, 0.0],
        [1.0, 1.0],
        [0.0, 1.0],
        [2.0, 0.0],
        [2.0, 1.0],
    ]);
    let mut m =
        StaticMesh::from_arrays("pair", CellType::Quad4, coords, vec![0, 1, 2, 3, 1, 4, 5, 2]).unwrap();
    let map = m.simplexize(SimplexizePolicy::Planar0).unwrap();
    assert_eq!(map, vec![0, 0, 1, 1]);
    assert_eq!(m.cell_type(), CellType::Tri3);
    assert_eq!(
        m.nodal_connectivity().unwrap().as_ref(),
        &vec![0, 1, 2, 0, 2, 3, 1, 4, 5, 1, 5, 2]
    );
}
