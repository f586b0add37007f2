//! Cell renumbering of stride-addressed and index-addressed connectivities.
//!
//! Permutations are given in "old to new" form: `old_to_new[c]` is the
//! position cell `c` moves to.

use itertools::Itertools;

use crate::data::indexed_array::{IdType, offsets_from_lengths};
use crate::mesh_error::MeshError;

/// Replace arbitrary distinct values by their rank, so that any injective
/// labelling becomes a permutation of `0..len`.
pub fn check_and_prepare_permutation(ids: &[IdType]) -> Result<Vec<IdType>, MeshError> {
    let order: Vec<usize> = (0..ids.len()).sorted_by_key(|&i| ids[i]).collect();
    let mut ranks = vec![0 as IdType; ids.len()];
    for (rank, w) in order.iter().enumerate() {
        ranks[*w] = rank as IdType;
    }
    if let Some((a, _)) = order.iter().tuple_windows().find(|&(a, b)| ids[*a] == ids[*b]) {
        return Err(MeshError::InvalidArgument(format!(
            "value {} appears more than once; not a permutation",
            ids[*a]
        )));
    }
    Ok(ranks)
}

/// Fails with `InvalidArgument` unless `old_to_new` is a bijection of `0..n`.
pub fn check_is_permutation(old_to_new: &[IdType], n: usize) -> Result<(), MeshError> {
    if old_to_new.len() != n {
        return Err(MeshError::InvalidArgument(format!(
            "permutation holds {} values for {n} cells",
            old_to_new.len()
        )));
    }
    let mut hit = vec![false; n];
    for (old, &new) in old_to_new.iter().enumerate() {
        if new < 0 || new as usize >= n || hit[new as usize] {
            return Err(MeshError::InvalidArgument(format!(
                "cell {old} is sent to {new}; not a permutation of [0, {n})"
            )));
        }
        hit[new as usize] = true;
    }
    Ok(())
}

/// "New to old" form of a permutation already checked by
/// [`check_is_permutation`].
pub fn invert_old_to_new(old_to_new: &[IdType]) -> Vec<IdType> {
    let mut new_to_old = vec![0 as IdType; old_to_new.len()];
    for (old, &new) in old_to_new.iter().enumerate() {
        new_to_old[new as usize] = old as IdType;
    }
    new_to_old
}

/// Validate `old_to_new` for `n` cells, ranking it first when `rank` is set.
pub(crate) fn prepare(old_to_new: &[IdType], n: usize, rank: bool) -> Result<Vec<IdType>, MeshError> {
    let o2n = if rank {
        check_and_prepare_permutation(old_to_new)?
    } else {
        old_to_new.to_vec()
    };
    check_is_permutation(&o2n, n)?;
    Ok(o2n)
}

/// Move every `stride`-long cell slice of `conn` to its new position.
pub fn permute_fixed_stride(conn: &[IdType], stride: usize, old_to_new: &[IdType]) -> Vec<IdType> {
    let new_to_old = invert_old_to_new(old_to_new);
    let mut out = Vec::with_capacity(conn.len());
    for &old in &new_to_old {
        let old = old as usize;
        out.extend_from_slice(&conn[old * stride..(old + 1) * stride]);
    }
    out
}

/// Move every indexed cell slice to its new position; the returned index
/// starts at 0 and spans the returned connectivity exactly.
pub fn permute_indexed(
    conn: &[IdType],
    index: &[IdType],
    old_to_new: &[IdType],
) -> Result<(Vec<IdType>, Vec<IdType>), MeshError> {
    let mut spans = Vec::with_capacity(old_to_new.len());
    for (c, w) in index.windows(2).enumerate() {
        if w[1] < w[0] {
            return Err(MeshError::InconsistentState(format!(
                "index is decreasing at cell {c} ({} > {})",
                w[0], w[1]
            )));
        }
        spans.push(w[0] as usize..w[1] as usize);
    }
    let new_to_old = invert_old_to_new(old_to_new);
    let new_index = offsets_from_lengths(new_to_old.iter().map(|&o| spans[o as usize].len()));
    let mut new_conn = Vec::with_capacity(new_index.last().copied().unwrap_or(0) as usize);
    for &old in &new_to_old {
        new_conn.extend_from_slice(&conn[spans[old as usize].clone()]);
    }
    Ok((new_conn, new_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_of_distinct_values() {
        assert_eq!(check_and_prepare_permutation(&[10, 3, 7]).unwrap(), vec![2, 0, 1]);
        assert!(check_and_prepare_permutation(&[1, 1]).is_err());
    }

    #[test]
    fn permutation_checks() {
        assert!(check_is_permutation(&[1, 0, 2], 3).is_ok());
        assert!(check_is_permutation(&[1, 1, 2], 3).is_err());
        assert!(check_is_permutation(&[0, 1], 3).is_err());
        assert!(check_is_permutation(&[0, 3, 1], 3).is_err());
    }

    #[test]
    fn fixed_stride_scatter() {
        let conn = [0, 1, 10, 11, 20, 21];
        assert_eq!(permute_fixed_stride(&conn, 2, &[2, 0, 1]), vec![10, 11, 20, 21, 0, 1]);
    }

    #[test]
    fn indexed_scatter_recomputes_index() {
        let conn = [0, 1, 2, 5, 6, 7, 8];
        let index = [0, 3, 7];
        let (c, i) = permute_indexed(&conn, &index, &[1, 0]).unwrap();
        assert_eq!(c, vec![5, 6, 7, 8, 0, 1, 2]);
        assert_eq!(i, vec![0, 4, 7]);
    }
}
