//! Flat id arrays, offset indexes and the sentinel-aware helpers over them.
//!
//! Connectivity is stored as flat `IdType` arrays. Variable-length entities
//! are addressed through an offset index: entity `i` owns
//! `values[index[i]..index[i + 1]]`. Polyhedron node lists embed
//! [`SENTINEL`] between faces; every loop that must skip or preserve the
//! sentinel lives in this module so callers never re-derive that logic.

use crate::mesh_error::MeshError;
use hashbrown::HashMap;
use itertools::Itertools;
use static_assertions::assert_eq_size;

/// Integer type of node ids, cell ids and offsets.
pub type IdType = i64;

/// Face separator inside polyhedron node lists.
pub const SENTINEL: IdType = -1;

assert_eq_size!(IdType, u64);

/// Convert `v` to an index in `[0, bound)`.
#[inline]
pub fn checked_index(v: IdType, bound: usize, what: &str) -> Result<usize, MeshError> {
    if v >= 0 && (v as u64) < bound as u64 {
        Ok(v as usize)
    } else {
        Err(MeshError::OutOfRange(format!("{what} {v} not in [0, {bound})")))
    }
}

/// Number of separators in `slice`.
#[inline]
pub fn count_sentinels(slice: &[IdType]) -> usize {
    slice.iter().filter(|&&v| v == SENTINEL).count()
}

/// Number of entries of `slice` that are not separators.
#[inline]
pub fn count_non_sentinels(slice: &[IdType]) -> usize {
    slice.len() - count_sentinels(slice)
}

/// Number of distinct ids in `slice`, separators excluded when
/// `skip_sentinel` is set.
pub fn count_distinct(slice: &[IdType], skip_sentinel: bool) -> usize {
    slice
        .iter()
        .copied()
        .filter(|&v| !(skip_sentinel && v == SENTINEL))
        .sorted_unstable()
        .dedup()
        .count()
}

/// Add `offset` to every id of `slice`, leaving separators untouched.
pub fn shift_ids(slice: &mut [IdType], offset: IdType) {
    for v in slice.iter_mut().filter(|v| **v != SENTINEL) {
        *v += offset;
    }
}

/// Replace every id `v` of `slice` by `old_to_new[v]`, leaving separators
/// untouched. Fails on ids outside `old_to_new` without modifying `slice`.
pub fn renumber_ids(slice: &mut [IdType], old_to_new: &[IdType]) -> Result<(), MeshError> {
    for &v in slice.iter().filter(|v| **v != SENTINEL) {
        checked_index(v, old_to_new.len(), "node id")?;
    }
    for v in slice.iter_mut().filter(|v| **v != SENTINEL) {
        *v = old_to_new[*v as usize];
    }
    Ok(())
}

/// Like [`renumber_ids`] with a sparse map; ids absent from the map are an
/// error.
pub fn renumber_ids_with_map(
    slice: &mut [IdType],
    old_to_new: &HashMap<IdType, IdType>,
) -> Result<(), MeshError> {
    if let Some(&missing) = slice
        .iter()
        .find(|v| **v != SENTINEL && !old_to_new.contains_key(*v))
    {
        return Err(MeshError::InvalidArgument(format!(
            "node id {missing} has no entry in the renumbering map"
        )));
    }
    for v in slice.iter_mut().filter(|v| **v != SENTINEL) {
        *v = old_to_new[v];
    }
    Ok(())
}

/// Offset index `[0, l0, l0+l1, ...]` of a sequence of lengths.
pub fn offsets_from_lengths(lengths: impl IntoIterator<Item = usize>) -> Vec<IdType> {
    let mut out = vec![0];
    let mut acc: IdType = 0;
    for l in lengths {
        acc += l as IdType;
        out.push(acc);
    }
    out
}

/// Concatenate offset indexes so that the result addresses the
/// concatenation of the underlying value arrays.
///
/// The first index is copied as is; each following one drops its leading
/// entry and is shifted so that it continues from the current tail.
pub fn aggregate_indexes(indexes: &[&[IdType]]) -> Result<Vec<IdType>, MeshError> {
    if indexes.is_empty() {
        return Err(MeshError::InvalidArgument(
            "cannot aggregate an empty list of indexes".into(),
        ));
    }
    let total: usize = indexes.iter().map(|i| i.len()).sum();
    let mut out = Vec::with_capacity(total);
    for (k, idx) in indexes.iter().enumerate() {
        let Some((&first, rest)) = idx.split_first() else {
            return Err(MeshError::InvalidArgument(format!(
                "index #{k} is empty and cannot be aggregated"
            )));
        };
        match out.last().copied() {
            None => {
                out.push(first);
                out.extend_from_slice(rest);
            }
            Some(tail) => {
                let delta = tail - first;
                out.extend(rest.iter().map(|v| v + delta));
            }
        }
    }
    Ok(out)
}

/// Concatenate connectivity arrays, adding `offsets[k]` to every id of
/// array `k`; separators are copied unchanged.
pub fn aggregate_and_shift(
    conns: &[&[IdType]],
    offsets: &[IdType],
) -> Result<Vec<IdType>, MeshError> {
    if conns.is_empty() {
        return Err(MeshError::InvalidArgument(
            "cannot aggregate an empty list of connectivities".into(),
        ));
    }
    if conns.len() != offsets.len() {
        return Err(MeshError::InvalidArgument(format!(
            "{} connectivities but {} offsets",
            conns.len(),
            offsets.len()
        )));
    }
    let total: usize = conns.iter().map(|c| c.len()).sum();
    let mut out = Vec::with_capacity(total);
    for (conn, &offset) in conns.iter().zip(offsets) {
        let start = out.len();
        out.extend_from_slice(conn);
        shift_ids(&mut out[start..], offset);
    }
    Ok(out)
}

/// Check that `index` is a usable offset index over `len` values: non-empty,
/// non-decreasing, and within `[0, len]`.
pub fn check_index(index: &[IdType], len: usize) -> Result<(), MeshError> {
    let (Some(&front), Some(&back)) = (index.first(), index.last()) else {
        return Err(MeshError::InconsistentState(
            "connectivity index is empty; it must hold at least one offset".into(),
        ));
    };
    if front < 0 || front > back {
        return Err(MeshError::InconsistentState(format!(
            "first offset {front} must lie in [0, {back}]"
        )));
    }
    if back < 0 || back as usize > len {
        return Err(MeshError::InconsistentState(format!(
            "last offset {back} outside [0, {len}]"
        )));
    }
    if let Some((i, w)) = index.windows(2).enumerate().find(|(_, w)| w[1] < w[0]) {
        return Err(MeshError::InconsistentState(format!(
            "offset index decreases at position {}: {} > {}",
            i + 1,
            w[0],
            w[1]
        )));
    }
    Ok(())
}

/// Reverse map from node to cells, as CSR `(cells, offsets)`.
///
/// Cells appear once per node even when the node is repeated in the cell
/// (polyhedron faces share nodes); separators are skipped.
pub fn reverse_nodal<'a>(
    cells: impl IntoIterator<Item = &'a [IdType]>,
    n_nodes: usize,
) -> Result<(Vec<IdType>, Vec<IdType>), MeshError> {
    let per_cell: Vec<Vec<usize>> = cells
        .into_iter()
        .map(|cell| {
            cell.iter()
                .filter(|&&v| v != SENTINEL)
                .map(|&v| checked_index(v, n_nodes, "node id"))
                .collect::<Result<Vec<_>, _>>()
                .map(|mut ids| {
                    ids.sort_unstable();
                    ids.dedup();
                    ids
                })
        })
        .collect::<Result<_, _>>()?;

    let mut degree = vec![0usize; n_nodes];
    for ids in &per_cell {
        for &n in ids {
            degree[n] += 1;
        }
    }
    let offsets = offsets_from_lengths(degree.iter().copied());
    let mut cursor: Vec<usize> = offsets[..n_nodes].iter().map(|&o| o as usize).collect();
    let mut rev = vec![0 as IdType; offsets[n_nodes] as usize];
    for (cell, ids) in per_cell.iter().enumerate() {
        for &n in ids {
            rev[cursor[n]] = cell as IdType;
            cursor[n] += 1;
        }
    }
    Ok((rev, offsets))
}

/// Ids `start, start + step, ...` strictly before `stop`.
pub fn slice_ids(start: IdType, stop: IdType, step: IdType) -> Result<Vec<IdType>, MeshError> {
    let bad = |why: &str| {
        MeshError::InvalidArgument(format!("slice ({start}, {stop}, {step}): {why}"))
    };
    let count = match step {
        0 => return Err(bad("step must not be zero")),
        s if s > 0 => {
            if stop < start {
                return Err(bad("stop is before start with a positive step"));
            }
            (stop - start + s - 1) / s
        }
        s => {
            if start < stop {
                return Err(bad("start is before stop with a negative step"));
            }
            (start - stop - s - 1) / -s
        }
    };
    Ok((0..count).map(|i| start + i * step).collect())
}

/// Whether `ids` is exactly `0, 1, ..., n - 1`.
pub fn is_iota(ids: &[IdType], n: usize) -> bool {
    ids.len() == n && ids.iter().enumerate().all(|(i, &v)| v == i as IdType)
}

/// Empty id array with room for `nb_cells * per_cell` values.
pub fn with_cell_capacity(nb_cells: IdType, per_cell: usize) -> Result<Vec<IdType>, MeshError> {
    let too_many = || {
        MeshError::InvalidArgument(format!(
            "cannot reserve room for {nb_cells} cells of {per_cell} values"
        ))
    };
    let n = usize::try_from(nb_cells).map_err(|_| too_many())?;
    let cap = n.checked_mul(per_cell).ok_or_else(too_many)?;
    let mut out = Vec::new();
    out.try_reserve_exact(cap).map_err(|_| too_many())?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_preserves_sentinel() {
        let mut c = vec![0, 1, -1, 2, 3];
        shift_ids(&mut c, 10);
        assert_eq!(c, vec![10, 11, -1, 12, 13]);
    }

    #[test]
    fn aggregate_two_polyhedron_blocks() {
        let a = [0, 1, -1, 2, 3];
        let out = aggregate_and_shift(&[&a, &a], &[0, 10]).unwrap();
        assert_eq!(out, vec![0, 1, -1, 2, 3, 10, 11, -1, 12, 13]);
    }

    #[test]
    fn aggregate_indexes_continues_from_tail() {
        let out = aggregate_indexes(&[&[0, 3, 5], &[2, 4, 8]]).unwrap();
        assert_eq!(out, vec![0, 3, 5, 7, 11]);
        assert!(aggregate_indexes(&[]).is_err());
        assert!(aggregate_indexes(&[&[0, 1], &[]]).is_err());
    }

    #[test]
    fn distinct_counts() {
        assert_eq!(count_distinct(&[0, 1, 1, 2], false), 3);
        assert_eq!(count_distinct(&[0, 1, -1, 1, 2], true), 3);
        assert_eq!(count_non_sentinels(&[0, 1, -1, 1, 2]), 4);
    }

    #[test]
    fn renumber_rejects_out_of_range_without_touching() {
        let mut c = vec![0, 5, -1, 1];
        let err = renumber_ids(&mut c, &[3, 2]).unwrap_err();
        assert!(matches!(err, MeshError::OutOfRange(_)));
        assert_eq!(c, vec![0, 5, -1, 1]);
        let mut c = vec![0, -1, 1];
        renumber_ids(&mut c, &[3, 2]).unwrap();
        assert_eq!(c, vec![3, -1, 2]);
    }

    #[test]
    fn index_checks() {
        assert!(check_index(&[0, 2, 4], 4).is_ok());
        assert!(check_index(&[0], 0).is_ok());
        assert!(check_index(&[], 0).is_err());
        assert!(check_index(&[0, 3, 2], 4).is_err());
        assert!(check_index(&[0, 5], 4).is_err());
    }

    #[test]
    fn reverse_nodal_dedups_within_cell() {
        let cells: Vec<&[IdType]> = vec![&[0, 1, -1, 1, 2], &[2, 3]];
        let (rev, off) = reverse_nodal(cells, 4).unwrap();
        assert_eq!(off, vec![0, 1, 2, 4, 5]);
        assert_eq!(rev, vec![0, 0, 0, 1, 1]);
    }
}
