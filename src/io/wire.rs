//! Fixed, versioned, little-endian byte layout for tiny-serialized meshes.
//!
//! A buffer is one [`WireTinyHdr`] followed by the doubles, the integers,
//! the strings (each a `u64` byte length then UTF-8 bytes), the payload ids
//! and the payload values, in that order.

use bytemuck::{Pod, Zeroable};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use static_assertions::const_assert_eq;
use std::mem::size_of;

use crate::io::tiny::{TinyPayload, TinySerializable, TinySerializationInfo};
use crate::mesh::dynamic_mesh::DynamicMesh;
use crate::mesh::static_mesh::StaticMesh;
use crate::mesh_error::MeshError;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

pub const KIND_STATIC: u16 = 1;
pub const KIND_DYNAMIC: u16 = 2;

/// All multi-byte integers are stored pre-LE with `.to_le()` and decoded
/// with `from_le`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireTinyHdr {
    pub version_le: u16,
    pub kind_le: u16,
    pub reserved_le: u32,
    pub n_doubles_le: u64,
    pub n_ints_le: u64,
    pub n_strings_le: u64,
    pub n_ids_le: u64,
    pub n_values_le: u64,
}

const_assert_eq!(size_of::<WireTinyHdr>(), 48);

impl WireTinyHdr {
    pub fn new(kind: u16, info: &TinySerializationInfo, payload: &TinyPayload) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            reserved_le: 0,
            n_doubles_le: (info.doubles.len() as u64).to_le(),
            n_ints_le: (info.ints.len() as u64).to_le(),
            n_strings_le: (info.strings.len() as u64).to_le(),
            n_ids_le: (payload.ids.len() as u64).to_le(),
            n_values_le: (payload.values.len() as u64).to_le(),
        }
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
}

/// Meshes that know their wire kind tag.
pub trait WireMesh: TinySerializable {
    const KIND: u16;
}

impl WireMesh for StaticMesh {
    const KIND: u16 = KIND_STATIC;
}

impl WireMesh for DynamicMesh {
    const KIND: u16 = KIND_DYNAMIC;
}

pub fn encode_tiny(kind: u16, info: &TinySerializationInfo, payload: &TinyPayload) -> Bytes {
    let strings: usize = info.strings.iter().map(|s| 8 + s.len()).sum();
    let cap = size_of::<WireTinyHdr>()
        + 8 * (info.doubles.len() + info.ints.len() + payload.ids.len() + payload.values.len())
        + strings;
    let mut buf = BytesMut::with_capacity(cap);
    buf.put_slice(bytemuck::bytes_of(&WireTinyHdr::new(kind, info, payload)));
    for &d in &info.doubles {
        buf.put_f64_le(d);
    }
    for &i in &info.ints {
        buf.put_i64_le(i);
    }
    for s in &info.strings {
        buf.put_u64_le(s.len() as u64);
        buf.put_slice(s.as_bytes());
    }
    for &i in &payload.ids {
        buf.put_i64_le(i);
    }
    for &v in &payload.values {
        buf.put_f64_le(v);
    }
    buf.freeze()
}

fn need(buf: &impl Buf, bytes: usize, what: &str) -> Result<(), MeshError> {
    if buf.remaining() < bytes {
        return Err(MeshError::InvalidArgument(format!(
            "truncated buffer: {what} needs {bytes} bytes, {} left",
            buf.remaining()
        )));
    }
    Ok(())
}

fn count(v: u64, what: &str) -> Result<usize, MeshError> {
    usize::try_from(v).map_err(|_| MeshError::InvalidArgument(format!("{what} count {v} too large")))
}

/// Decode a buffer built by [`encode_tiny`]; returns the kind tag.
pub fn decode_tiny(mut buf: Bytes) -> Result<(u16, TinySerializationInfo, TinyPayload), MeshError> {
    let hdr_len = size_of::<WireTinyHdr>();
    need(&buf, hdr_len, "header")?;
    let hdr: WireTinyHdr = bytemuck::pod_read_unaligned(&buf[..hdr_len]);
    buf.advance(hdr_len);
    if hdr.version() != WIRE_VERSION {
        return Err(MeshError::InvalidArgument(format!(
            "wire version {} is not supported (expected {WIRE_VERSION})",
            hdr.version()
        )));
    }
    let n_doubles = count(u64::from_le(hdr.n_doubles_le), "double")?;
    let n_ints = count(u64::from_le(hdr.n_ints_le), "integer")?;
    let n_strings = count(u64::from_le(hdr.n_strings_le), "string")?;
    let n_ids = count(u64::from_le(hdr.n_ids_le), "id")?;
    let n_values = count(u64::from_le(hdr.n_values_le), "value")?;

    need(&buf, 8 * (n_doubles + n_ints), "tiny numbers")?;
    let doubles = (0..n_doubles).map(|_| buf.get_f64_le()).collect();
    let ints = (0..n_ints).map(|_| buf.get_i64_le()).collect();
    let mut strings = Vec::with_capacity(n_strings);
    for k in 0..n_strings {
        need(&buf, 8, "string length")?;
        let len = count(buf.get_u64_le(), "string byte")?;
        need(&buf, len, "string bytes")?;
        let raw = buf.split_to(len);
        let s = std::str::from_utf8(&raw).map_err(|e| {
            MeshError::InvalidArgument(format!("string #{k} is not valid UTF-8: {e}"))
        })?;
        strings.push(s.to_owned());
    }
    need(&buf, 8 * (n_ids + n_values), "payload")?;
    let ids = (0..n_ids).map(|_| buf.get_i64_le()).collect();
    let values = (0..n_values).map(|_| buf.get_f64_le()).collect();
    if buf.has_remaining() {
        return Err(MeshError::InvalidArgument(format!(
            "{} trailing bytes after the payload",
            buf.remaining()
        )));
    }
    Ok((
        hdr.kind(),
        TinySerializationInfo {
            doubles,
            ints,
            strings,
        },
        TinyPayload { ids, values },
    ))
}

pub fn encode_mesh<M: WireMesh>(mesh: &M) -> Bytes {
    encode_tiny(M::KIND, &mesh.tiny_serialization_info(), &mesh.serialize())
}

/// Rebuild a mesh, going through the sizing step like any receiver would.
pub fn decode_mesh<M: WireMesh>(buf: Bytes) -> Result<M, MeshError> {
    let (kind, info, payload) = decode_tiny(buf)?;
    if kind != M::KIND {
        return Err(MeshError::InvalidArgument(format!(
            "buffer holds mesh kind {kind}, expected {}",
            M::KIND
        )));
    }
    let mut sized = M::resize_for_unserialization(&info)?;
    if sized.ids.len() != payload.ids.len() || sized.values.len() != payload.values.len() {
        return Err(MeshError::InvalidArgument(format!(
            "payload of {} ids and {} values does not match the announced {} and {}",
            payload.ids.len(),
            payload.values.len(),
            sized.ids.len(),
            sized.values.len()
        )));
    }
    sized.ids.copy_from_slice(&payload.ids);
    sized.values.copy_from_slice(&payload.values);
    M::unserialize(&info, sized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_little_endian() {
        let info = TinySerializationInfo {
            doubles: vec![1.0],
            ints: vec![3],
            strings: vec!["ab".into()],
        };
        let payload = TinyPayload::default();
        let bytes = encode_tiny(KIND_STATIC, &info, &payload);
        assert_eq!(&bytes[..4], &[1, 0, 1, 0]);
        assert_eq!(bytes.len(), 48 + 8 + 8 + 8 + 2);
        let (kind, back, _) = decode_tiny(bytes).unwrap();
        assert_eq!(kind, KIND_STATIC);
        assert_eq!(back, info);
    }

    #[test]
    fn truncated_and_trailing_rejected() {
        let info = TinySerializationInfo {
            doubles: vec![0.0],
            ints: vec![1, 2],
            strings: vec![],
        };
        let bytes = encode_tiny(KIND_DYNAMIC, &info, &TinyPayload::default());
        assert!(decode_tiny(bytes.slice(..bytes.len() - 1)).is_err());
        let mut longer = BytesMut::from(&bytes[..]);
        longer.put_u8(0);
        assert!(decode_tiny(longer.freeze()).is_err());
        assert!(decode_tiny(Bytes::from_static(&[0; 10])).is_err());
    }

    #[test]
    fn version_mismatch_rejected() {
        let bytes = encode_tiny(KIND_STATIC, &TinySerializationInfo::default(), &TinyPayload::default());
        let mut raw = bytes.to_vec();
        raw[0] = 9;
        assert!(matches!(
            decode_tiny(Bytes::from(raw)),
            Err(MeshError::InvalidArgument(_))
        ));
    }
}
