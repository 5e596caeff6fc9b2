//! FTRAN (`B x = b`) and BTRAN (`Bᵀ x = b`) triangular solves against an
//! assembled [`LuFactors`].
//!
//! Pivot order already gives L and U a topological order for free, so the
//! only thing worth discovering dynamically is *which* pivot-order
//! positions a sparse right-hand side can possibly touch. `reach` answers
//! that with an iterative depth-first search over the factor's dependency
//! graph (Gilbert-Peierls), the same idea as a hyper-sparse solver's
//! symbolic pass — the arithmetic loops below still walk the full pivot
//! range, but skip any position `reach` ruled out.

use crate::engine::lu::LuFactors;
use crate::hvector::HVector;

/// Below this density, skip positions outside the DFS-computed reachable
/// set instead of touching every pivot-order position.
const HYPER_SPARSE_DENSITY: f64 = 0.2;

/// Depth-first search over `neighbors(k) -> [m, ...]`, starting from
/// `seeds`, returning a boolean mask of everything reachable.
fn dfs_reach(n: usize, seeds: &[usize], neighbors: impl Fn(usize) -> Vec<usize>) -> Vec<bool> {
    let mut reached = vec![false; n];
    let mut stack = Vec::new();
    for &s in seeds {
        if !reached[s] {
            reached[s] = true;
            stack.push(s);
        }
    }
    while let Some(top) = stack.pop() {
        for m in neighbors(top) {
            if !reached[m] {
                reached[m] = true;
                stack.push(m);
            }
        }
    }
    reached
}

fn gather_pivot_order(lu: &LuFactors, perm: &[usize], dense: &[f64]) -> Vec<f64> {
    (0..lu.n).map(|k| dense[perm[k]]).collect()
}

pub(crate) fn ftran(lu: &LuFactors, rhs: &mut HVector, expected_density: f64) {
    let n = lu.n;
    let mut z = gather_pivot_order(lu, &lu.pivot_row, &rhs.array);

    let hyper_sparse = expected_density < HYPER_SPARSE_DENSITY;
    let seeds: Vec<usize> = z.iter().enumerate().filter(|&(_, &v)| v != 0.0).map(|(k, _)| k).collect();

    let l_reach = if hyper_sparse {
        dfs_reach(n, &seeds, |k| lu.l_column(k).0.to_vec())
    } else {
        vec![true; n]
    };

    for k in 0..n {
        if !l_reach[k] || z[k] == 0.0 {
            continue;
        }
        let (rows, values) = lu.l_column(k);
        let zk = z[k];
        for (&m, &l_val) in rows.iter().zip(values.iter()) {
            z[m] -= l_val * zk;
        }
    }

    let u_reach = if hyper_sparse {
        let nz: Vec<usize> = z.iter().enumerate().filter(|&(_, &v)| v != 0.0).map(|(k, _)| k).collect();
        dfs_reach(n, &nz, |k| lu.u_column(k).0.to_vec())
    } else {
        vec![true; n]
    };

    let mut y = vec![0.0f64; n];
    for k in (0..n).rev() {
        if !u_reach[k] && z[k] == 0.0 {
            continue;
        }
        y[k] = z[k] / lu.u_diag[k];
        let (rows, values) = lu.u_column(k);
        for (&m, &u_val) in rows.iter().zip(values.iter()) {
            z[m] -= u_val * y[k];
        }
    }

    rhs.array.fill(0.0);
    for k in 0..n {
        rhs.array[lu.pivot_col[k]] = y[k];
    }
    rhs.pack();
}

pub(crate) fn btran(lu: &LuFactors, rhs: &mut HVector, expected_density: f64) {
    let n = lu.n;
    let mut z = gather_pivot_order(lu, &lu.pivot_col, &rhs.array);

    let hyper_sparse = expected_density < HYPER_SPARSE_DENSITY;
    let seeds: Vec<usize> = z.iter().enumerate().filter(|&(_, &v)| v != 0.0).map(|(k, _)| k).collect();

    // U^T is lower triangular in pivot order: row k depends on columns m<k
    // recorded in u_column(k). Forward substitution, increasing k.
    let ut_reach = if hyper_sparse {
        dfs_reach(n, &seeds, |k| lu.u_column(k).0.to_vec())
    } else {
        vec![true; n]
    };

    let mut y = vec![0.0f64; n];
    for k in 0..n {
        if !ut_reach[k] {
            continue;
        }
        let mut val = z[k];
        let (rows, values) = lu.u_column(k);
        for (&m, &u_val) in rows.iter().zip(values.iter()) {
            val -= u_val * y[m];
        }
        y[k] = val / lu.u_diag[k];
    }

    // L^T is upper triangular in pivot order: row k depends on columns m>k
    // recorded in l_column(k). Backward substitution, decreasing k.
    let lt_reach = if hyper_sparse {
        let nz: Vec<usize> = y.iter().enumerate().filter(|&(_, &v)| v != 0.0).map(|(k, _)| k).collect();
        dfs_reach(n, &nz, |k| lu.l_column(k).0.to_vec())
    } else {
        vec![true; n]
    };

    let mut w = y;
    for k in (0..n).rev() {
        if !lt_reach[k] {
            continue;
        }
        let (rows, values) = lu.l_column(k);
        let mut val = w[k];
        for (&m, &l_val) in rows.iter().zip(values.iter()) {
            val -= l_val * w[m];
        }
        w[k] = val;
    }

    rhs.array.fill(0.0);
    for k in 0..n {
        rhs.array[lu.pivot_row[k]] = w[k];
    }
    rhs.pack();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hvector::HVector;

    fn identity_lu(n: usize) -> LuFactors {
        LuFactors {
            n,
            l_start: vec![0; n + 1],
            l_index: Vec::new(),
            l_value: Vec::new(),
            u_start: vec![0; n + 1],
            u_index: Vec::new(),
            u_value: Vec::new(),
            u_diag: vec![1.0; n],
            pivot_row: (0..n).collect(),
            pivot_col: (0..n).collect(),
            row_to_pivot: (0..n).collect(),
            col_to_pivot: (0..n).collect(),
            rank_deficiency: 0,
        }
    }

    #[test]
    fn ftran_on_identity_is_a_no_op() {
        let lu = identity_lu(3);
        let mut rhs = HVector::from_dense(vec![1.0, 2.0, 3.0]);
        ftran(&lu, &mut rhs, 1.0);
        assert_eq!(rhs.array, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn ftran_solves_a_simple_lower_triangular_system() {
        // B = [[2,0],[1,3]] -> pivot order == original order, L has (1,0)=0.5.
        let lu = LuFactors {
            n: 2,
            l_start: vec![0, 1, 1],
            l_index: vec![1],
            l_value: vec![0.5],
            u_start: vec![0, 0, 0],
            u_index: Vec::new(),
            u_value: Vec::new(),
            u_diag: vec![2.0, 3.0],
            pivot_row: vec![0, 1],
            pivot_col: vec![0, 1],
            row_to_pivot: vec![0, 1],
            col_to_pivot: vec![0, 1],
            rank_deficiency: 0,
        };
        let mut rhs = HVector::from_dense(vec![2.0, 4.0]);
        ftran(&lu, &mut rhs, 1.0);
        // B x = b => 2x0=2 => x0=1; x0 + 3x1=4 => x1=1
        assert!((rhs.array[0] - 1.0).abs() < 1e-9);
        assert!((rhs.array[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn btran_matches_ftran_transpose_relationship_on_identity() {
        let lu = identity_lu(2);
        let mut rhs = HVector::from_dense(vec![5.0, -1.0]);
        btran(&lu, &mut rhs, 1.0);
        assert_eq!(rhs.array, vec![5.0, -1.0]);
    }

    #[test]
    fn hyper_sparse_path_agrees_with_dense_path() {
        let lu = LuFactors {
            n: 2,
            l_start: vec![0, 1, 1],
            l_index: vec![1],
            l_value: vec![0.5],
            u_start: vec![0, 0, 0],
            u_index: Vec::new(),
            u_value: Vec::new(),
            u_diag: vec![2.0, 3.0],
            pivot_row: vec![0, 1],
            pivot_col: vec![0, 1],
            row_to_pivot: vec![0, 1],
            col_to_pivot: vec![0, 1],
            rank_deficiency: 0,
        };
        let mut dense_rhs = HVector::from_dense(vec![2.0, 4.0]);
        ftran(&lu, &mut dense_rhs, 1.0);

        let mut sparse_rhs = HVector::from_dense(vec![2.0, 4.0]);
        ftran(&lu, &mut sparse_rhs, 0.01);

        assert!((dense_rhs.array[0] - sparse_rhs.array[0]).abs() < 1e-9);
        assert!((dense_rhs.array[1] - sparse_rhs.array[1]).abs() < 1e-9);
    }
}
