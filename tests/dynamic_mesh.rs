mod util;

use std::sync::Arc;

use mesh_coupling::prelude::*;
use util::*;

#[test]
fn incremental_polygons_and_node_counts() {
    let mut m = DynamicMesh::new("poly", CellType::Polygon).unwrap();
    m.set_coords(coords2(&[[0.0, 0.0], [1.0, 0.0], [1.5, 1.0], [0.5, 1.5], [-0.5, 1.0]]));
    m.allocate_cells(2).unwrap();
    m.insert_next_cell(&[0, 1, 2, 3, 4]).unwrap();
    assert_eq!(m.compute_nb_of_nodes_per_cell().unwrap(), vec![5]);
    assert_eq!(m.compute_effective_nb_of_nodes_per_cell().unwrap(), vec![5]);

    m.insert_next_cell(&[0, 1, 1, 2]).unwrap();
    assert_eq!(m.compute_nb_of_nodes_per_cell().unwrap(), vec![5, 4]);
    assert_eq!(m.compute_effective_nb_of_nodes_per_cell().unwrap(), vec![5, 3]);
    assert_eq!(m.nodal_connectivity_index().unwrap().as_ref(), &vec![0, 5, 9]);
    m.check_consistency().unwrap();
}

#[test]
fn polyhedron_counts_exclude_separators() {
    let m = polyhedron();
    assert_eq!(m.number_of_cells().unwrap(), 1);
    assert_eq!(m.compute_nb_of_nodes_per_cell().unwrap(), vec![15]);
    assert_eq!(m.compute_nb_of_faces_per_cell().unwrap(), vec![4]);
    assert_eq!(m.compute_effective_nb_of_nodes_per_cell().unwrap(), vec![4]);
    assert_eq!(m.get_number_of_nodes_in_cell(0).unwrap(), 12);
    let v = m.measure_field().unwrap();
    assert!((v[0].abs() - 1.0 / 6.0).abs() < 1e-12, "{v:?}");
}

#[test]
fn polygon_geometry() {
    let m = polygons();
    let areas = m.measure_field().unwrap();
    assert_close(&areas, &[2.0, 0.5], 1e-12);
    assert_eq!(m.compute_nb_of_faces_per_cell().unwrap(), vec![5, 3]);
    let (cells, offsets) = m.reverse_nodal_connectivity().unwrap();
    assert_eq!(offsets, vec![0, 1, 2, 4, 6, 7, 8]);
    assert_eq!(cells, vec![0, 0, 0, 1, 0, 1, 0, 1]);
}

#[test]
fn unpacked_index_is_accepted_and_packed_on_demand() {
    let mut m = DynamicMesh::new("sub", CellType::Polygon).unwrap();
    m.set_coords(Arc::clone(polygons().coords().unwrap()));
    m.set_nodal_connectivity(vec![9, 9, 0, 1, 2, 3, 4, 2, 5, 3, 9], vec![2, 7, 10]);
    assert_eq!(m.number_of_cells().unwrap(), 2);
    assert_eq!(m.cell_nodes(1).unwrap(), &[2, 5, 3]);
    assert!(!m.is_packed().unwrap());

    let (already, conn, index) = m.retrieve_packed_nodal_connectivity().unwrap();
    assert!(!already);
    assert_eq!(conn.as_ref(), &vec![0, 1, 2, 3, 4, 2, 5, 3]);
    assert_eq!(index.as_ref(), &vec![0, 5, 8]);

    let (packed, shared) = m.copy_with_nodal_connectivity_packed().unwrap();
    assert!(!shared);
    assert!(packed.is_packed().unwrap());
    assert!(packed.is_equal_without_considering_str(&polygons(), 1e-12));

    let (_, shared) = packed.copy_with_nodal_connectivity_packed().unwrap();
    assert!(shared);
}

#[test]
fn index_bounds_are_checked() {
    let mut m = polygons();
    m.set_nodal_connectivity(vec![0, 1, 2], vec![0, 4]);
    assert_eq!(
        m.check_consistency_of_connectivity().unwrap_err().kind(),
        ErrorKind::InconsistentState
    );
    m.set_nodal_connectivity(vec![0, 1, 2], vec![]);
    assert!(m.check_consistency_of_connectivity().is_err());
    let empty = DynamicMesh::new("e", CellType::Polyhed).unwrap();
    assert_eq!(
        empty.check_consistency_of_connectivity().unwrap_err().kind(),
        ErrorKind::InvalidMeshState
    );
}

#[test]
fn insert_after_unpacked_index_fails() {
    let mut m = DynamicMesh::new("p", CellType::Polygon).unwrap();
    assert_eq!(
        m.insert_next_cell(&[0, 1, 2]).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    m.set_nodal_connectivity(vec![0, 1, 2, 3], vec![0, 3]);
    assert_eq!(
        m.insert_next_cell(&[0, 1, 2]).unwrap_err().kind(),
        ErrorKind::InconsistentState
    );
}

#[test]
fn parts_and_renumbering() {
    let m = polygons();
    let p = m.build_part_of_my_self_keep_coords(&[1, 0]).unwrap();
    assert_eq!(p.nodal_connectivity().unwrap().as_ref(), &vec![2, 5, 3, 0, 1, 2, 3, 4]);
    assert_eq!(p.nodal_connectivity_index().unwrap().as_ref(), &vec![0, 3, 8]);
    assert!(Arc::ptr_eq(p.coords().unwrap(), m.coords().unwrap()));
    assert!(matches!(
        m.build_part_of_my_self_keep_coords(&[2]),
        Err(MeshError::OutOfRange(_))
    ));
    let s = m.build_part_of_my_self_keep_coords_slice(1, 2, 1).unwrap();
    assert_eq!(s.number_of_cells().unwrap(), 1);

    let mut r = m.clone();
    r.renumber_cells(&[1, 0], false).unwrap();
    assert!(r.is_equal(&p, 1e-12));
    r.renumber_cells(&[1, 0], false).unwrap();
    assert!(r.is_equal(&m, 1e-12));
}

#[test]
fn polyhedron_orientation_round_trip() {
    let mut m = polyhedron();
    let before = m.measure_field().unwrap()[0];
    m.invert_orientation_of_all_cells().unwrap();
    let after = m.measure_field().unwrap()[0];
    assert!((before + after).abs() < 1e-12, "{before} vs {after}");
    m.invert_orientation_of_all_cells().unwrap();
    assert!(m.is_equal(&polyhedron(), 1e-12));
}

#[test]
fn generic_conversion_rules() {
    let m = polygons();
    let u = m.build_unstructured().unwrap();
    assert_eq!(u.connectivity_index(), &[0, 6, 10]);
    assert_eq!(DynamicMesh::from_unstructured(&u).unwrap(), m);
    assert!(matches!(
        StaticMesh::from_unstructured(&u),
        Err(MeshError::InvalidArgument(_))
    ));

    let mut mixed = UnstructuredMesh::new("mixed", 2);
    mixed.set_coords(coords2(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]));
    mixed.insert_next_cell(CellType::Tri3, &[0, 1, 2]).unwrap();
    mixed.insert_next_cell(CellType::Polygon, &[0, 2, 3]).unwrap();
    assert!(matches!(
        DynamicMesh::from_unstructured(&mixed),
        Err(MeshError::InvalidArgument(_))
    ));
}

#[test]
fn static_only_operations_are_identity_or_unsupported() {
    let mut m = polygons();
    assert_eq!(m.simplexize(SimplexizePolicy::Planar0).unwrap(), vec![0, 1]);
    assert_eq!(m.simplexize_code(6).unwrap(), vec![0, 1]);
    assert!(m.simplexize_code(2).is_err());
    assert_eq!(m.compute_dual_mesh().unwrap_err().kind(), ErrorKind::UnsupportedOperation);
    assert_eq!(
        m.compute_diameter_field().unwrap_err().kind(),
        ErrorKind::UnsupportedOperation
    );
    assert!(m.simple_repr().contains("Single dynamic geometric type (NORM_POLYGON)"));
}

#[test]
fn copies_share_what_they_promise() {
    let m = polygons();
    let conn_only = m.deep_copy_connectivity_only().unwrap();
    assert!(Arc::ptr_eq(conn_only.coords().unwrap(), m.coords().unwrap()));
    assert!(!Arc::ptr_eq(
        conn_only.nodal_connectivity_index().unwrap(),
        m.nodal_connectivity_index().unwrap()
    ));
    let mut other = DynamicMesh::new("o", CellType::Polygon).unwrap();
    other.shallow_copy_connectivity_from(&m).unwrap();
    assert!(Arc::ptr_eq(
        other.nodal_connectivity().unwrap(),
        m.nodal_connectivity().unwrap()
    ));
    let mut polyhed = DynamicMesh::new("h", CellType::Polyhed).unwrap();
    assert!(polyhed.shallow_copy_connectivity_from(&m).is_err());
    let deep = m.deep_copy();
    assert_eq!(deep, m);
    assert!(!Arc::ptr_eq(deep.coords().unwrap(), m.coords().unwrap()));
}

#[test]
fn oversized_allocation_hint_is_rejected() {
    let mut m = DynamicMesh::new("huge", CellType::Polygon).unwrap();
    assert_eq!(
        m.allocate_cells(IdType::MAX).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert!(m.nodal_connectivity().is_none());
}
