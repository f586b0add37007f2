//! Serialization of single-type meshes.
//!
//! [`tiny`] implements the sizes-first handshake (small arrays, then
//! payload); [`wire`] packs its output into one little-endian byte buffer.

pub mod tiny;
pub mod wire;

pub use tiny::{TinyPayload, TinySerializable, TinySerializationInfo};
pub use wire::{decode_mesh, encode_mesh};
