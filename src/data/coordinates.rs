//! Node coordinates shared between meshes.
//!
//! Coordinates are stored as one flat `Vec<f64>` of `dimension` components
//! per node. Meshes hold them behind an `Arc` so that several meshes can
//! agree on one geometry; a mesh that needs to change them goes through
//! `Arc::make_mut`, which clones only when the array is shared.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Coordinate storage with an attached space dimension.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    name: String,
    /// One informative label per component (e.g. `"X [m]"`).
    infos: Vec<String>,
    dimension: usize,
    values: Vec<f64>,
}

impl Coordinates {
    /// Construct coordinates of `dimension` components per node from a flat
    /// buffer.
    pub fn try_new(dimension: usize, values: Vec<f64>) -> Result<Self, MeshError> {
        validate_dimension(dimension, values.len())?;
        Ok(Self {
            name: String::new(),
            infos: vec![String::new(); dimension],
            dimension,
            values,
        })
    }

    /// Construct coordinates from fixed-size tuples.
    pub fn from_tuples<const D: usize>(tuples: &[[f64; D]]) -> Result<Self, MeshError> {
        Self::try_new(D, tuples.iter().flatten().copied().collect())
    }

    /// Returns the spatial dimension per node.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn number_of_nodes(&self) -> usize {
        self.values.len() / self.dimension
    }

    /// Flat component buffer, node after node.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn infos(&self) -> &[String] {
        &self.infos
    }

    pub fn set_info_on_component(&mut self, comp: usize, info: impl Into<String>) -> Result<(), MeshError> {
        let slot = self.infos.get_mut(comp).ok_or_else(|| {
            MeshError::OutOfRange(format!("component {comp} not in [0, {})", self.dimension))
        })?;
        *slot = info.into();
        Ok(())
    }

    /// Read-only view of the components of node `node`.
    #[inline]
    pub fn node(&self, node: usize) -> Result<&[f64], MeshError> {
        if node >= self.number_of_nodes() {
            return Err(MeshError::OutOfRange(format!(
                "node {node} not in [0, {})",
                self.number_of_nodes()
            )));
        }
        let d = self.dimension;
        Ok(&self.values[node * d..(node + 1) * d])
    }

    /// Node `node` padded (or truncated) to three components.
    pub fn point3(&self, node: usize) -> Result<[f64; 3], MeshError> {
        let c = self.node(node)?;
        let mut out = [0.0; 3];
        for (o, v) in out.iter_mut().zip(c) {
            *o = *v;
        }
        Ok(out)
    }

    /// Concatenate coordinates of one dimension; name and infos come from the first part.
    pub fn aggregate(parts: &[&Coordinates]) -> Result<Coordinates, MeshError> {
        let first = parts.first().ok_or_else(|| {
            MeshError::InvalidArgument("cannot aggregate an empty list of coordinates".into())
        })?;
        if let Some(bad) = parts.iter().find(|c| c.dimension != first.dimension) {
            return Err(MeshError::InvalidArgument(format!(
                "coordinates of dimension {} and {} cannot be aggregated",
                first.dimension, bad.dimension
            )));
        }
        let values = parts.iter().flat_map(|c| c.values.iter().copied()).collect();
        Ok(Coordinates {
            name: first.name.clone(),
            infos: first.infos.clone(),
            dimension: first.dimension,
            values,
        })
    }

    /// Keep the listed nodes, in the given order.
    pub fn select_nodes(&self, nodes: &[usize]) -> Result<Coordinates, MeshError> {
        let mut values = Vec::with_capacity(nodes.len() * self.dimension);
        for &n in nodes {
            values.extend_from_slice(self.node(n)?);
        }
        Ok(Coordinates {
            name: self.name.clone(),
            infos: self.infos.clone(),
            dimension: self.dimension,
            values,
        })
    }

    /// Group nodes closer than `precision` (Euclidean distance).
    ///
    /// Returns an old-to-new map and the number of distinct nodes. New ids
    /// follow the order of first appearance of each group's lowest node id.
    pub fn find_common_nodes(&self, precision: f64) -> Result<(Vec<usize>, usize), MeshError> {
        if precision.is_nan() || precision < 0.0 {
            return Err(MeshError::InvalidArgument(format!(
                "node merge precision must be non-negative, got {precision}"
            )));
        }
        let n = self.number_of_nodes();
        let d = self.dimension;
        let x = |i: usize| self.values[i * d];
        let order: Vec<usize> = (0..n).sorted_by(|&a, &b| x(a).total_cmp(&x(b))).collect();
        let mut representative: Vec<usize> = (0..n).collect();
        let prec2 = precision * precision;
        for (k, &i) in order.iter().enumerate() {
            for &j in &order[k + 1..] {
                if x(j) - x(i) > precision {
                    break;
                }
                let a = &self.values[i * d..(i + 1) * d];
                let b = &self.values[j * d..(j + 1) * d];
                let dist2: f64 = a.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum();
                if dist2 <= prec2 {
                    let ri = find_root(&mut representative, i);
                    let rj = find_root(&mut representative, j);
                    let (lo, hi) = if ri < rj { (ri, rj) } else { (rj, ri) };
                    representative[hi] = lo;
                }
            }
        }
        let mut old_to_new = vec![usize::MAX; n];
        let mut count = 0;
        for i in 0..n {
            let r = find_root(&mut representative, i);
            if old_to_new[r] == usize::MAX {
                old_to_new[r] = count;
                count += 1;
            }
            old_to_new[i] = old_to_new[r];
        }
        Ok((old_to_new, count))
    }

    /// Component-wise comparison within `precision`; `Err` carries the reason.
    pub fn is_equal_if_not_why(&self, other: &Coordinates, precision: f64) -> Result<(), String> {
        if self.name != other.name {
            return Err(format!("coordinate names differ: \"{}\" != \"{}\"", self.name, other.name));
        }
        if self.infos != other.infos {
            return Err("coordinate component infos differ".into());
        }
        self.is_equal_without_considering_str(other, precision)
    }

    /// Like [`is_equal_if_not_why`](Self::is_equal_if_not_why) ignoring names and infos.
    pub fn is_equal_without_considering_str(
        &self,
        other: &Coordinates,
        precision: f64,
    ) -> Result<(), String> {
        if self.dimension != other.dimension {
            return Err(format!(
                "space dimensions differ: {} != {}",
                self.dimension, other.dimension
            ));
        }
        if self.values.len() != other.values.len() {
            return Err(format!(
                "numbers of nodes differ: {} != {}",
                self.number_of_nodes(),
                other.number_of_nodes()
            ));
        }
        if let Some(pos) = self
            .values
            .iter()
            .zip(&other.values)
            .position(|(a, b)| (a - b).abs() > precision)
        {
            return Err(format!(
                "coordinates differ at node {} component {}",
                pos / self.dimension,
                pos % self.dimension
            ));
        }
        Ok(())
    }

    /// String part of the tiny serialization: name then one info per component.
    pub fn tiny_strings(&self) -> Vec<String> {
        std::iter::once(self.name.clone())
            .chain(self.infos.iter().cloned())
            .collect()
    }

    /// Integer part of the tiny serialization: `[nTuples, nComponents]`.
    pub fn tiny_ints(&self) -> [i64; 2] {
        [self.number_of_nodes() as i64, self.dimension as i64]
    }

    /// Rebuild coordinates from their tiny description and payload.
    pub fn from_tiny(strings: &[String], ints: &[i64], values: Vec<f64>) -> Result<Self, MeshError> {
        let [n, d] = <[i64; 2]>::try_from(ints).map_err(|_| {
            MeshError::InvalidArgument(format!(
                "coordinate tiny info must hold 2 integers, got {}",
                ints.len()
            ))
        })?;
        if n < 0 || d <= 0 || (n as usize) * (d as usize) != values.len() {
            return Err(MeshError::InvalidArgument(format!(
                "coordinate payload of {} values does not match {n} x {d}",
                values.len()
            )));
        }
        let mut c = Coordinates::try_new(d as usize, values)?;
        if let Some((name, infos)) = strings.split_first() {
            c.name = name.clone();
            for (slot, info) in c.infos.iter_mut().zip(infos) {
                *slot = info.clone();
            }
        } else {
            log::warn!("coordinate tiny strings missing; name and infos left empty");
        }
        Ok(c)
    }
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn validate_dimension(dimension: usize, len: usize) -> Result<(), MeshError> {
    if dimension == 0 {
        return Err(MeshError::InvalidArgument(
            "coordinates must have at least one component".into(),
        ));
    }
    if len % dimension != 0 {
        return Err(MeshError::InvalidArgument(format!(
            "{len} coordinate values are not a multiple of dimension {dimension}"
        )));
    }
    Ok(())
}

impl DebugInvariants for Coordinates {
    fn validate_invariants(&self) -> Result<(), MeshError> {
        validate_dimension(self.dimension, self.values.len())?;
        if self.infos.len() != self.dimension {
            return Err(MeshError::InconsistentState(format!(
                "{} component infos for dimension {}",
                self.infos.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}
