mod util;

use mesh_coupling::prelude::*;
use util::*;

#[test]
fn static_mesh_through_json() {
    let m = hexa_pair();
    let json = serde_json::to_string(&m).unwrap();
    let back: StaticMesh = serde_json::from_str(&json).unwrap();
    assert_eq!(back, m);
    back.check_consistency().unwrap();
}

#[test]
fn dynamic_meshes_through_bincode() {
    for m in [polygons(), polyhedron()] {
        let bytes = bincode::serialize(&m).unwrap();
        let back: DynamicMesh = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, m);
        assert_eq!(
            back.compute_nb_of_faces_per_cell().unwrap(),
            m.compute_nb_of_faces_per_cell().unwrap()
        );
    }
}

#[test]
fn unset_arrays_stay_unset() {
    let m = StaticMesh::new("bare", CellType::Tetra4).unwrap();
    let back: StaticMesh = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
    assert!(back.coords().is_none());
    assert!(back.nodal_connectivity().is_none());
    assert_eq!(back.cell_type(), CellType::Tetra4);
}

#[test]
fn tiny_info_through_json() {
    let tiny = polygons().tiny_serialization_info();
    let json = serde_json::to_string(&tiny).unwrap();
    let back: TinySerializationInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tiny);
    let payload = polygons().serialize();
    let bytes = bincode::serialize(&payload).unwrap();
    assert_eq!(bincode::deserialize::<TinyPayload>(&bytes).unwrap(), payload);
}

#[test]
fn generic_mesh_through_bincode() {
    let u = quad_grid(2, 2).build_unstructured().unwrap();
    let bytes = bincode::serialize(&u).unwrap();
    let back: UnstructuredMesh = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, u);
    assert_eq!(StaticMesh::from_unstructured(&back).unwrap(), quad_grid(2, 2));
}
