mod util;

use std::sync::Arc;

use hashbrown::HashMap;
use mesh_coupling::prelude::*;
use util::*;

#[test]
fn queries_on_a_quad_grid() {
    let m = quad_grid(3, 2);
    assert_eq!(m.number_of_cells().unwrap(), 6);
    assert_eq!(m.number_of_nodes().unwrap(), 12);
    assert_eq!(m.mesh_dimension(), 2);
    assert_eq!(m.space_dimension().unwrap(), 2);
    assert_eq!(m.cell_nodes(4).unwrap(), &[5, 6, 10, 9]);
    assert_eq!(m.cells_of_type(CellType::Quad4).unwrap(), vec![0, 1, 2, 3, 4, 5]);
    assert!(m.cells_of_type(CellType::Tri3).unwrap().is_empty());
    assert_eq!(m.number_of_cells_with_type(CellType::Tri3).unwrap(), 0);
    assert_eq!(m.distribution_of_types().unwrap(), vec![CellType::Quad4.code(), 6, -1]);
    assert_eq!(m.all_geo_types(), vec![CellType::Quad4]);
    assert!(matches!(m.type_of_cell(6), Err(MeshError::OutOfRange(_))));
}

#[test]
fn missing_arrays_are_reported_as_mesh_state() {
    let mut m = StaticMesh::new("empty", CellType::Tri3).unwrap();
    let err = m.check_fully_defined().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMeshState);
    m.set_coords(coords2(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]));
    assert_eq!(m.check_fully_defined().unwrap_err().kind(), ErrorKind::InvalidMeshState);
    m.set_nodal_connectivity(vec![0, 1, 2]);
    m.check_fully_defined().unwrap();
}

#[test]
fn out_of_range_node_is_inconsistent() {
    let mut m = two_triangles();
    m.set_nodal_connectivity(vec![0, 1, 2, 0, 2, 4]);
    assert!(matches!(m.check_consistency(), Err(MeshError::InconsistentState(_))));
    assert!(StaticMesh::from_arrays(
        "bad",
        CellType::Tri3,
        coords2(&[[0.0, 0.0], [1.0, 0.0]]),
        vec![0, 1, 2]
    )
    .is_err());
}

#[test]
fn reverse_nodal_of_two_triangles() {
    let (cells, offsets) = two_triangles().reverse_nodal_connectivity().unwrap();
    assert_eq!(offsets, vec![0, 2, 3, 5, 6]);
    assert_eq!(cells, vec![0, 1, 0, 0, 1, 1]);
}

#[test]
fn profile_split_fast_path_and_explicit() {
    let m = quad_grid(2, 1);
    let full = m.split_profile_per_type(&[0, 1], true).unwrap();
    assert_eq!(full.code, vec![CellType::Quad4.code(), 2, -1]);
    assert!(full.ids_per_type.is_empty());
    let back = m.check_type_consistency_and_contig(&full.code, &[]).unwrap();
    assert_eq!(back, None);

    let part = m.split_profile_per_type(&[1], true).unwrap();
    assert_eq!(part.code, vec![CellType::Quad4.code(), 1, 0]);
    assert_eq!(part.ids_in_profile_per_type, vec![vec![0]]);
    assert_eq!(part.ids_per_type, vec![vec![1]]);
    let ids: Vec<&[IdType]> = part.ids_per_type.iter().map(Vec::as_slice).collect();
    assert_eq!(
        m.check_type_consistency_and_contig(&part.code, &ids).unwrap(),
        Some(vec![1])
    );

    assert!(matches!(
        m.split_profile_per_type(&[2], false),
        Err(MeshError::InvalidArgument(_))
    ));
    assert!(matches!(
        m.check_type_consistency_and_contig(&[CellType::Tri3.code(), 2, -1], &[]),
        Err(MeshError::InvalidArgument(_))
    ));
    assert!(m.check_type_consistency_and_contig(&[CellType::Quad4.code(), 3, -1], &[]).is_err());
}

#[test]
fn node_ids_in_use_and_fetched() {
    let c = coords2(&[[0.0, 0.0], [1.0, 0.0], [9.0, 9.0], [1.0, 1.0]]);
    let m = StaticMesh::from_arrays("t", CellType::Tri3, c, vec![0, 1, 3]).unwrap();
    let (map, used) = m.node_ids_in_use().unwrap();
    assert_eq!(map, vec![0, 1, -1, 2]);
    assert_eq!(used, 3);
    assert_eq!(m.fetched_node_ids().unwrap(), vec![0, 1, 3]);
}

#[test]
fn cells_kept_from_nodes() {
    let m = quad_grid(2, 1);
    assert_eq!(m.fill_cell_ids_to_keep_from_node_ids(&[1, 4], true).unwrap(), Vec::<IdType>::new());
    assert_eq!(m.fill_cell_ids_to_keep_from_node_ids(&[1, 4], false).unwrap(), vec![0, 1]);
    assert_eq!(
        m.fill_cell_ids_to_keep_from_node_ids(&[1, 2, 4, 5], true).unwrap(),
        vec![1]
    );
}

#[test]
fn geometry_of_a_grid() {
    let m = quad_grid(2, 1);
    assert_close(&m.measure_field().unwrap(), &[1.0, 1.0], 1e-12);
    assert_close(&m.cell_centers_of_mass().unwrap(), &[0.5, 0.5, 1.5, 0.5], 1e-12);
    assert_close(&m.iso_barycenter_of_nodes_per_cell().unwrap(), &[0.5, 0.5, 1.5, 0.5], 1e-12);
    assert_close(
        &m.bounding_box_for_bb_tree().unwrap(),
        &[0.0, 1.0, 0.0, 1.0, 1.0, 2.0, 0.0, 1.0],
        1e-12,
    );
    assert_eq!(m.cells_containing_point(&[1.5, 0.25], 1e-9).unwrap(), vec![1]);
    let d = m.compute_diameter_field().unwrap();
    assert_close(&d, &[2f64.sqrt(), 2f64.sqrt()], 1e-12);
}

#[test]
fn invert_orientation_flips_measure_sign() {
    let mut m = quad_grid(2, 2);
    let before = m.measure_field().unwrap();
    m.invert_orientation_of_all_cells().unwrap();
    let after = m.measure_field().unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert!((a + b).abs() < 1e-12, "{a} vs {b}");
    }
    m.invert_orientation_of_all_cells().unwrap();
    assert!(m.is_equal(&quad_grid(2, 2), 1e-12));
}

#[test]
fn node_renumbering_variants() {
    let mut m = two_triangles();
    m.renumber_nodes_in_conn(&[3, 2, 1, 0]).unwrap();
    assert_eq!(m.nodal_connectivity().unwrap().as_ref(), &vec![3, 2, 1, 3, 1, 0]);
    assert!(m.renumber_nodes_in_conn(&[0, 1]).is_err());

    let mut m = two_triangles();
    let map: HashMap<IdType, IdType> = [(0, 10), (1, 11), (2, 12), (3, 13)].into_iter().collect();
    m.renumber_nodes_in_conn_with_map(&map).unwrap();
    assert_eq!(m.cell_nodes(1).unwrap(), &[10, 12, 13]);

    let mut m = two_triangles();
    m.renumber_nodes_with_offset_in_conn(4).unwrap();
    assert_eq!(m.cell_nodes(0).unwrap(), &[4, 5, 6]);
}

#[test]
fn merge_nodes_collapses_duplicates() {
    let c = coords2(&[
        [0.0, 0.0],
        [1.0, 0.0],
        [1.0, 1.0],
        [0.0, 0.0],
        [1.0, 1.0 + 1e-10],
        [0.0, 1.0],
    ]);
    let mut m = StaticMesh::from_arrays("dup", CellType::Tri3, c, vec![0, 1, 2, 3, 4, 5]).unwrap();
    let map = m.merge_nodes(1e-6).unwrap();
    assert_eq!(map, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(m.number_of_nodes().unwrap(), 4);
    assert_eq!(m.nodal_connectivity().unwrap().as_ref(), &vec![0, 1, 2, 0, 2, 3]);
    assert!(m.is_equal_without_considering_str(&two_triangles(), 1e-6));
}

#[test]
fn shared_coordinates_are_not_mutated_by_others() {
    let a = two_triangles();
    let mut b = a.clone();
    b.renumber_nodes_with_offset_in_conn(1).unwrap();
    assert_eq!(a.cell_nodes(0).unwrap(), &[0, 1, 2]);
    assert!(Arc::ptr_eq(a.coords().unwrap(), b.coords().unwrap()));
    assert!(!a.is_equal(&b, 1e-12));
}

#[test]
fn equality_reports_first_difference() {
    let a = two_triangles();
    let mut b = a.deep_copy();
    a.is_equal_if_not_why(&b, 1e-12).unwrap();
    b.info_mut().name = "other".into();
    let why = a.is_equal_if_not_why(&b, 1e-12).unwrap_err();
    assert!(why.contains("names"), "{why}");
    assert!(a.is_equal_without_considering_str(&b, 1e-12));
}

#[test]
fn textual_dumps() {
    let m = two_triangles();
    let s = m.simple_repr();
    assert!(s.contains("Single static geometric type (NORM_TRI3)"), "{s}");
    assert!(s.contains("Number of cells : 2"), "{s}");
    let a = m.advanced_repr();
    assert!(a.contains("Cell #1 : 0 2 3"), "{a}");
    let empty = StaticMesh::new("e", CellType::Tri3).unwrap().simple_repr();
    assert!(empty.contains("No coordinates specified !"), "{empty}");
}

#[test]
fn explode_hexa_into_quads() {
    let m = hexa_pair();
    let quads = m.explode_each_hexa8_to_6_quad4().unwrap();
    assert_eq!(quads.cell_type(), CellType::Quad4);
    assert_eq!(quads.number_of_cells().unwrap(), 12);
    assert!(Arc::ptr_eq(quads.coords().unwrap(), m.coords().unwrap()));
    assert_eq!(
        two_triangles().explode_each_hexa8_to_6_quad4().unwrap_err().kind(),
        ErrorKind::UnsupportedOperation
    );
}

#[test]
fn renumber_with_ranked_labels() {
    let mut m = quad_grid(3, 1);
    m.renumber_cells(&[30, 10, 20], true).unwrap();
    assert_eq!(m.cell_nodes(0).unwrap(), &[1, 2, 6, 5]);
    assert_eq!(m.cell_nodes(1).unwrap(), &[2, 3, 7, 6]);
    assert_eq!(m.cell_nodes(2).unwrap(), &[0, 1, 5, 4]);
    assert!(matches!(
        m.renumber_cells(&[5, 5, 1], true),
        Err(MeshError::InvalidArgument(_))
    ));
    assert!(m.renumber_cells(&[0, 1], false).is_err());
}

#[test]
fn oversized_allocation_hint_is_rejected() {
    let mut m = StaticMesh::new("huge", CellType::Hexa8).unwrap();
    assert_eq!(
        m.allocate_cells(IdType::MAX).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    m.allocate_cells(2).unwrap();
    m.insert_next_cell(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
    assert_eq!(m.number_of_cells().unwrap(), 1);
}
