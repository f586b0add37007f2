//! Sizes-first serialization handshake.
//!
//! A mesh is described by three small arrays (doubles, integers, strings)
//! and two payload arrays: `ids` (connectivity, followed by the index for
//! dynamic meshes) and `values` (flat coordinates). The receiver reads the
//! small arrays first, sizes the payload with
//! [`TinySerializable::resize_for_unserialization`], fills it, and then calls
//! [`TinySerializable::unserialize`].
//!
//! Integer layout, static mesh:
//! `[code, iteration, order, #coord strings, #conn strings, #coord ints,
//! #conn ints] ++ coord ints ++ conn ints`.
//!
//! Integer layout, dynamic mesh:
//! `[code, iteration, order, #coord strings, #conn strings, #index strings,
//! #coord ints, #conn ints, #index ints] ++ coord ints ++ conn ints ++ index ints`.
//!
//! Strings are `[name, description, time unit]` followed by the array
//! strings in the same order. An array contributes `[name, one info per
//! component]` as strings and `[nTuples, nComponents]` as integers; a missing
//! array contributes nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::coordinates::Coordinates;
use crate::data::indexed_array::IdType;
use crate::debug_invariants::validated;
use crate::mesh::dynamic_mesh::DynamicMesh;
use crate::mesh::info::MeshInfo;
use crate::mesh::single_type::SingleTypeMesh;
use crate::mesh::static_mesh::StaticMesh;
use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;

const STATIC_HEADER: usize = 7;
const DYNAMIC_HEADER: usize = 9;
const INFO_STRINGS: usize = 3;

/// The three small arrays exchanged before the payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TinySerializationInfo {
    pub doubles: Vec<f64>,
    pub ints: Vec<IdType>,
    pub strings: Vec<String>,
}

/// The two bulk arrays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TinyPayload {
    pub ids: Vec<IdType>,
    pub values: Vec<f64>,
}

pub trait TinySerializable: Sized {
    fn tiny_serialization_info(&self) -> TinySerializationInfo;

    /// Zeroed payload buffers of the sizes announced by `info`.
    fn resize_for_unserialization(info: &TinySerializationInfo) -> Result<TinyPayload, MeshError>;

    fn serialize(&self) -> TinyPayload;

    /// Rebuild a mesh from `info` and a payload sized by
    /// [`resize_for_unserialization`](Self::resize_for_unserialization).
    fn unserialize(info: &TinySerializationInfo, payload: TinyPayload) -> Result<Self, MeshError>;
}

/// Strings and integers of a one-component id array.
fn id_array_tiny(array: Option<&Arc<Vec<IdType>>>) -> (Vec<String>, Vec<IdType>) {
    match array {
        Some(a) => (vec![String::new(), String::new()], vec![a.len() as IdType, 1]),
        None => (Vec::new(), Vec::new()),
    }
}

fn coords_tiny(coords: Option<&Arc<Coordinates>>) -> (Vec<String>, Vec<IdType>) {
    match coords {
        Some(c) => (c.tiny_strings(), c.tiny_ints().to_vec()),
        None => (Vec::new(), Vec::new()),
    }
}

/// Number of values of an array described by `[nTuples, nComponents]`;
/// `None` for a missing or unallocated array.
fn array_len(ints: &[IdType]) -> Result<Option<usize>, MeshError> {
    match ints {
        [] | [-1, -1] => Ok(None),
        &[n, c] if n >= 0 && c > 0 => Ok(Some(n as usize * c as usize)),
        other => Err(MeshError::InvalidArgument(format!(
            "array tiny info {other:?} is not [nTuples, nComponents]"
        ))),
    }
}

/// Split `src` in consecutive chunks of the given lengths.
fn split_counts<'a, T>(src: &'a [T], counts: &[IdType], what: &str) -> Result<Vec<&'a [T]>, MeshError> {
    let mut out = Vec::with_capacity(counts.len());
    let mut pos = 0usize;
    for &n in counts {
        if n < 0 {
            return Err(MeshError::InvalidArgument(format!("negative {what} count {n}")));
        }
        let end = pos + n as usize;
        let chunk = src.get(pos..end).ok_or_else(|| {
            MeshError::InvalidArgument(format!(
                "{what} section [{pos}, {end}) exceeds the {} available values",
                src.len()
            ))
        })?;
        out.push(chunk);
        pos = end;
    }
    Ok(out)
}

/// Header fields shared by both layouts.
struct Decoded<'a> {
    info: MeshInfo,
    cell_type: CellType,
    coord_strings: &'a [String],
    coord_ints: &'a [IdType],
    array_strings: Vec<&'a [String]>,
    array_ints: Vec<&'a [IdType]>,
}

fn decode(tiny: &TinySerializationInfo, nb_arrays: usize) -> Result<Decoded<'_>, MeshError> {
    let header = 5 + 2 * nb_arrays;
    let ints = &tiny.ints;
    if ints.len() < header {
        return Err(MeshError::InvalidArgument(format!(
            "tiny integer info holds {} values, at least {header} expected",
            ints.len()
        )));
    }
    if tiny.strings.len() < INFO_STRINGS {
        return Err(MeshError::InvalidArgument(format!(
            "tiny string info holds {} values, at least {INFO_STRINGS} expected",
            tiny.strings.len()
        )));
    }
    let time = tiny.doubles.first().copied().ok_or_else(|| {
        MeshError::InvalidArgument("tiny double info must hold the time".into())
    })?;
    let cell_type = CellType::from_code(ints[0])?;
    let to_i32 = |v: IdType| {
        i32::try_from(v).map_err(|_| MeshError::InvalidArgument(format!("{v} does not fit a time index")))
    };
    let info = MeshInfo {
        name: tiny.strings[0].clone(),
        description: tiny.strings[1].clone(),
        time_unit: tiny.strings[2].clone(),
        time,
        iteration: to_i32(ints[1])?,
        order: to_i32(ints[2])?,
    };
    let n = 1 + nb_arrays;
    let str_counts = &ints[3..3 + n];
    let int_counts = &ints[3 + n..3 + 2 * n];
    let strings = split_counts(&tiny.strings[INFO_STRINGS..], str_counts, "string")?;
    let arrays = split_counts(&ints[header..], int_counts, "integer")?;
    Ok(Decoded {
        info,
        cell_type,
        coord_strings: strings[0],
        coord_ints: arrays[0],
        array_strings: strings[1..].to_vec(),
        array_ints: arrays[1..].to_vec(),
    })
}

fn rebuild_coords(d: &Decoded<'_>, values: Vec<f64>) -> Result<Option<Arc<Coordinates>>, MeshError> {
    match array_len(d.coord_ints)? {
        None => Ok(None),
        Some(_) => Ok(Some(Arc::new(Coordinates::from_tiny(d.coord_strings, d.coord_ints, values)?))),
    }
}

fn check_payload(what: &str, expected: usize, got: usize) -> Result<(), MeshError> {
    if expected == got {
        Ok(())
    } else {
        Err(MeshError::InvalidArgument(format!(
            "{what} payload holds {got} values, {expected} announced"
        )))
    }
}

fn header_ints(
    mesh: &dyn SingleTypeMesh,
    str_counts: &[usize],
    int_arrays: &[Vec<IdType>],
) -> Vec<IdType> {
    let info = mesh.info();
    let mut ints = vec![
        mesh.cell_type().code(),
        IdType::from(info.iteration),
        IdType::from(info.order),
    ];
    ints.extend(str_counts.iter().map(|&n| n as IdType));
    ints.extend(int_arrays.iter().map(|a| a.len() as IdType));
    for a in int_arrays {
        ints.extend_from_slice(a);
    }
    ints
}

fn info_strings(info: &MeshInfo) -> Vec<String> {
    vec![info.name.clone(), info.description.clone(), info.time_unit.clone()]
}

impl TinySerializable for StaticMesh {
    fn tiny_serialization_info(&self) -> TinySerializationInfo {
        let (cs, ci) = coords_tiny(self.coords());
        let (ns, ni) = id_array_tiny(self.nodal_connectivity());
        let ints = header_ints(self, &[cs.len(), ns.len()], &[ci, ni]);
        debug_assert!(ints.len() >= STATIC_HEADER);
        let mut strings = info_strings(self.info());
        strings.extend(cs);
        strings.extend(ns);
        TinySerializationInfo {
            doubles: vec![self.info().time],
            ints,
            strings,
        }
    }

    fn resize_for_unserialization(info: &TinySerializationInfo) -> Result<TinyPayload, MeshError> {
        let d = decode(info, 1)?;
        Ok(TinyPayload {
            ids: vec![0; array_len(d.array_ints[0])?.unwrap_or(0)],
            values: vec![0.0; array_len(d.coord_ints)?.unwrap_or(0)],
        })
    }

    fn serialize(&self) -> TinyPayload {
        TinyPayload {
            ids: self.nodal_connectivity().map(|c| c.to_vec()).unwrap_or_default(),
            values: self.coords().map(|c| c.values().to_vec()).unwrap_or_default(),
        }
    }

    fn unserialize(info: &TinySerializationInfo, payload: TinyPayload) -> Result<Self, MeshError> {
        let d = decode(info, 1)?;
        let conn_len = array_len(d.array_ints[0])?;
        check_payload("connectivity", conn_len.unwrap_or(0), payload.ids.len())?;
        let mut mesh = StaticMesh::new(d.info.name.clone(), d.cell_type)?;
        if let Some(c) = rebuild_coords(&d, payload.values)? {
            mesh.set_coords(c);
        }
        if conn_len.is_some() {
            mesh.set_nodal_connectivity(payload.ids);
        }
        *mesh.info_mut() = d.info;
        validated(mesh)
    }
}

impl TinySerializable for DynamicMesh {
    fn tiny_serialization_info(&self) -> TinySerializationInfo {
        let (cs, ci) = coords_tiny(self.coords());
        let (ns, ni) = id_array_tiny(self.nodal_connectivity());
        let (xs, xi) = id_array_tiny(self.nodal_connectivity_index());
        let ints = header_ints(self, &[cs.len(), ns.len(), xs.len()], &[ci, ni, xi]);
        debug_assert!(ints.len() >= DYNAMIC_HEADER);
        let mut strings = info_strings(self.info());
        strings.extend(cs);
        strings.extend(ns);
        strings.extend(xs);
        TinySerializationInfo {
            doubles: vec![self.info().time],
            ints,
            strings,
        }
    }

    fn resize_for_unserialization(info: &TinySerializationInfo) -> Result<TinyPayload, MeshError> {
        let d = decode(info, 2)?;
        let conn = array_len(d.array_ints[0])?.unwrap_or(0);
        let index = array_len(d.array_ints[1])?.unwrap_or(0);
        Ok(TinyPayload {
            ids: vec![0; conn + index],
            values: vec![0.0; array_len(d.coord_ints)?.unwrap_or(0)],
        })
    }

    fn serialize(&self) -> TinyPayload {
        let mut ids = self.nodal_connectivity().map(|c| c.to_vec()).unwrap_or_default();
        if let Some(index) = self.nodal_connectivity_index() {
            ids.extend_from_slice(index);
        }
        TinyPayload {
            ids,
            values: self.coords().map(|c| c.values().to_vec()).unwrap_or_default(),
        }
    }

    fn unserialize(info: &TinySerializationInfo, payload: TinyPayload) -> Result<Self, MeshError> {
        let d = decode(info, 2)?;
        let conn_len = array_len(d.array_ints[0])?;
        let index_len = array_len(d.array_ints[1])?;
        let split = conn_len.unwrap_or(0);
        check_payload("connectivity and index", split + index_len.unwrap_or(0), payload.ids.len())?;
        let mut mesh = DynamicMesh::new(d.info.name.clone(), d.cell_type)?;
        if let Some(c) = rebuild_coords(&d, payload.values)? {
            mesh.set_coords(c);
        }
        let mut conn = payload.ids;
        let index = conn.split_off(split);
        match (conn_len, index_len) {
            (Some(_), Some(_)) => mesh.set_nodal_connectivity(conn, index),
            (None, None) => {}
            _ => {
                return Err(MeshError::InvalidArgument(
                    "connectivity and index must be both present or both absent".into(),
                ));
            }
        }
        if d.array_strings.iter().any(|s| s.is_empty()) && conn_len.is_some() {
            log::warn!("tiny strings of \"{}\" connectivity arrays are missing", d.info.name);
        }
        *mesh.info_mut() = d.info;
        validated(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_mesh() -> StaticMesh {
        let coords = Coordinates::from_tuples(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap();
        let mut m = StaticMesh::from_arrays("q", CellType::Quad4, Arc::new(coords), vec![0, 1, 2, 3]).unwrap();
        m.info_mut().time = 2.5;
        m.info_mut().iteration = 3;
        m
    }

    #[test]
    fn static_header_layout() {
        let tiny = quad_mesh().tiny_serialization_info();
        assert_eq!(tiny.doubles, vec![2.5]);
        assert_eq!(&tiny.ints[..STATIC_HEADER], &[4, 3, 0, 3, 2, 2, 2]);
        assert_eq!(&tiny.ints[STATIC_HEADER..], &[4, 2, 4, 1]);
        assert_eq!(tiny.strings.len(), 3 + 3 + 2);
        assert_eq!(tiny.strings[0], "q");
    }

    #[test]
    fn missing_arrays_contribute_nothing() {
        let m = StaticMesh::new("empty", CellType::Tri3).unwrap();
        let tiny = m.tiny_serialization_info();
        assert_eq!(tiny.ints, vec![3, 0, 0, 0, 0, 0, 0]);
        let payload = StaticMesh::resize_for_unserialization(&tiny).unwrap();
        assert!(payload.ids.is_empty() && payload.values.is_empty());
        let back = StaticMesh::unserialize(&tiny, payload).unwrap();
        assert!(back.coords().is_none());
        assert!(back.nodal_connectivity().is_none());
    }

    #[test]
    fn truncated_header_rejected() {
        let mut tiny = quad_mesh().tiny_serialization_info();
        tiny.ints.truncate(4);
        assert!(matches!(
            StaticMesh::resize_for_unserialization(&tiny),
            Err(MeshError::InvalidArgument(_))
        ));
    }

    #[test]
    fn array_len_forms() {
        assert_eq!(array_len(&[]).unwrap(), None);
        assert_eq!(array_len(&[-1, -1]).unwrap(), None);
        assert_eq!(array_len(&[4, 2]).unwrap(), Some(8));
        assert!(array_len(&[4]).is_err());
    }
}
