//! LU factorization of the simplex basis with product-form updates.
//!
//! The basis matrix B collects the columns of (A | −I) selected by
//! `basic_index`. `invert` builds an eta-file LU by right-looking elimination
//! with Markowitz-biased pivoting; `ftran`/`btran` solve B·x = b and Bᵀ·y = c
//! against the LU plus any product-form update etas appended since the last
//! build.
//!
//! Space conventions: FTRAN maps a right-hand side indexed by row into a
//! solution indexed by basis position; BTRAN maps a right-hand side indexed by
//! basis position into a solution indexed by row.

use thiserror::Error;

use super::vector::WorkVector;

/// Factorization and update errors.
#[derive(Error, Debug)]
pub enum FactorError {
    /// A product-form update pivot fell below the acceptance tolerance.
    #[error("numerical trouble: update pivot {0:e} below tolerance")]
    NumericalTrouble(f64),

    /// The factor has not been built.
    #[error("factor not built")]
    NotBuilt,
}

/// Outcome of `invert`.
#[derive(Debug, Clone, Default)]
pub struct InvertResult {
    /// Number of basis positions without an acceptable pivot.
    pub rank_deficiency: usize,

    /// `(basis_position, row)` pairs patched with a logical: the caller must
    /// swap the logical of `row` into `basis_position`.
    pub patches: Vec<(usize, usize)>,
}

/// Bookkeeping that survives across builds for refactorization policy.
#[derive(Debug, Clone, Default)]
pub struct RefactorInfo {
    /// Number of `invert` calls.
    pub build_count: usize,
    /// Product-form updates applied since the last build.
    pub update_count: usize,
    /// Set when an update reported trouble; forces a refactor next rebuild.
    pub force_refactor: bool,
}

/// Eta-file LU factorization with product-form updates.
#[derive(Debug, Clone, Default)]
pub struct LuFactor {
    num_row: usize,
    built: bool,

    // Pivot k: row `pivot_row[k]`, basis position `pivot_pos[k]`.
    pivot_row: Vec<usize>,
    pivot_pos: Vec<usize>,
    pivot_value: Vec<f64>,

    // L eta k: multipliers by row, applied after reading the pivot row.
    l_start: Vec<usize>,
    l_index: Vec<usize>,
    l_value: Vec<f64>,

    // U column for pivot k: entries in earlier pivots (by pivot order).
    u_start: Vec<usize>,
    u_pivot: Vec<usize>,
    u_value: Vec<f64>,

    // Product-form update etas, in basis-position space.
    pf_pivot_pos: Vec<usize>,
    pf_pivot_value: Vec<f64>,
    pf_start: Vec<usize>,
    pf_index: Vec<usize>,
    pf_value: Vec<f64>,

    /// Refactorization bookkeeping.
    pub refactor_info: RefactorInfo,

    /// Minimum update pivot magnitude before `NumericalTrouble`.
    pub update_pivot_tolerance: f64,

    /// Relative pivot threshold for the Markowitz search.
    pub pivot_threshold: f64,
}

const ABS_PIVOT_TOLERANCE: f64 = 1e-11;
const DROP_TOLERANCE: f64 = 1e-14;

impl LuFactor {
    pub fn new(num_row: usize) -> Self {
        Self {
            num_row,
            update_pivot_tolerance: 1e-8,
            pivot_threshold: 0.1,
            ..Default::default()
        }
    }

    pub fn num_row(&self) -> usize {
        self.num_row
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Updates applied since the last build.
    pub fn update_count(&self) -> usize {
        self.pf_pivot_pos.len()
    }

    /// Build the LU from the basis columns. `columns[p]` holds the packed
    /// column of (A | −I) for the variable in basis position `p`.
    ///
    /// Rank deficiency does not fail the build: deficient positions are
    /// patched with logicals and reported so the caller can repair the basis.
    pub fn invert(&mut self, columns: &[Vec<(usize, f64)>]) -> InvertResult {
        let m = self.num_row;
        debug_assert_eq!(columns.len(), m);

        self.clear_factor();
        self.refactor_info.build_count += 1;
        self.refactor_info.update_count = 0;
        self.refactor_info.force_refactor = false;

        // Active submatrix, column-major. Entries in pivotal rows migrate to
        // per-column U lists as elimination proceeds.
        let mut active: Vec<Vec<(usize, f64)>> = columns.to_vec();
        let mut u_lists: Vec<Vec<(usize, f64)>> = vec![Vec::new(); m];
        let mut col_alive = vec![true; m];
        let mut row_alive = vec![true; m];
        let mut row_count = vec![0usize; m];
        for col in &active {
            for &(r, _) in col {
                row_count[r] += 1;
            }
        }

        for _ in 0..m {
            let Some((pr, pc, pv)) = self.choose_pivot(&active, &col_alive, &row_count) else {
                break;
            };
            self.eliminate(pr, pc, pv, &mut active, &mut u_lists, &mut col_alive, &mut row_alive, &mut row_count);
        }

        // Patch deficient positions with logicals on unpivoted rows.
        let mut patches = Vec::new();
        let mut free_rows: Vec<usize> = (0..m).filter(|&r| row_alive[r]).collect();
        for c in 0..m {
            if col_alive[c] {
                let r = free_rows.pop().expect("unpivoted row for deficient column");
                patches.push((c, r));
                self.pivot_row.push(r);
                self.pivot_pos.push(c);
                self.pivot_value.push(-1.0);
                self.l_start.push(self.l_index.len());
                self.u_start.push(self.u_pivot.len());
                col_alive[c] = false;
                row_alive[r] = false;
            }
        }
        debug_assert!(free_rows.is_empty());
        self.l_start.push(self.l_index.len());
        self.u_start.push(self.u_pivot.len());

        self.built = true;
        InvertResult {
            rank_deficiency: patches.len(),
            patches,
        }
    }

    fn clear_factor(&mut self) {
        self.pivot_row.clear();
        self.pivot_pos.clear();
        self.pivot_value.clear();
        self.l_start.clear();
        self.l_index.clear();
        self.l_value.clear();
        self.u_start.clear();
        self.u_pivot.clear();
        self.u_value.clear();
        self.pf_pivot_pos.clear();
        self.pf_pivot_value.clear();
        self.pf_start.clear();
        self.pf_index.clear();
        self.pf_value.clear();
        self.built = false;
    }

    /// Markowitz-biased pivot search: scan columns in ascending fill count,
    /// gate candidates on the relative threshold against the column maximum,
    /// and take the cheapest (row_count−1)·(col_count−1) among a bounded
    /// number of candidate columns.
    fn choose_pivot(
        &self,
        active: &[Vec<(usize, f64)>],
        col_alive: &[bool],
        row_count: &[usize],
    ) -> Option<(usize, usize, f64)> {
        let m = self.num_row;
        let mut best: Option<(usize, usize, f64, usize)> = None; // (row, col, val, cost)
        for target_count in 1..=m {
            let mut candidates_seen = 0usize;
            for c in 0..m {
                if !col_alive[c] || active[c].len() != target_count {
                    continue;
                }
                let col_max = active[c]
                    .iter()
                    .map(|&(_, v)| v.abs())
                    .fold(0.0_f64, f64::max);
                if col_max < ABS_PIVOT_TOLERANCE {
                    continue;
                }
                for &(r, v) in &active[c] {
                    let a = v.abs();
                    if a < ABS_PIVOT_TOLERANCE || a < self.pivot_threshold * col_max {
                        continue;
                    }
                    let cost = (row_count[r] - 1) * (target_count - 1);
                    let better = match best {
                        None => true,
                        Some((_, _, bv, bc)) => {
                            cost < bc || (cost == bc && a > bv.abs())
                        }
                    };
                    if better {
                        best = Some((r, c, v, cost));
                    }
                }
                candidates_seen += 1;
                if candidates_seen >= 4 && best.is_some() {
                    break;
                }
            }
            if let Some((r, c, v, cost)) = best {
                // A singleton row or column cannot be beaten by later counts.
                if cost == 0 || target_count >= 2 {
                    return Some((r, c, v));
                }
            }
        }
        best.map(|(r, c, v, _)| (r, c, v))
    }

    #[allow(clippy::too_many_arguments)]
    fn eliminate(
        &mut self,
        pr: usize,
        pc: usize,
        pv: f64,
        active: &mut [Vec<(usize, f64)>],
        u_lists: &mut [Vec<(usize, f64)>],
        col_alive: &mut [bool],
        row_alive: &mut [bool],
        row_count: &mut [usize],
    ) {
        let k = self.pivot_row.len();
        self.pivot_row.push(pr);
        self.pivot_pos.push(pc);
        self.pivot_value.push(pv);

        // L eta: the sub-pivot part of the pivot column, scaled.
        self.l_start.push(self.l_index.len());
        let mut eta: Vec<(usize, f64)> = Vec::new();
        for &(r, v) in &active[pc] {
            if r != pr {
                let mult = v / pv;
                eta.push((r, mult));
                self.l_index.push(r);
                self.l_value.push(mult);
                row_count[r] -= 1;
            }
        }
        row_count[pr] -= 1;

        // U column: entries accumulated in earlier pivot rows.
        self.u_start.push(self.u_pivot.len());
        for &(j, u) in &u_lists[pc] {
            self.u_pivot.push(j);
            self.u_value.push(u);
        }

        active[pc].clear();
        col_alive[pc] = false;
        row_alive[pr] = false;

        if row_count[pr] == 0 && eta.is_empty() {
            return; // nothing to update
        }

        // Right-looking update of every remaining column with an entry in the
        // pivot row.
        let m = self.num_row;
        for c2 in 0..m {
            if !col_alive[c2] {
                continue;
            }
            let Some(pos) = active[c2].iter().position(|&(r, _)| r == pr) else {
                continue;
            };
            let u = active[c2].swap_remove(pos).1;
            row_count[pr] = row_count[pr].saturating_sub(1);
            u_lists[c2].push((k, u));
            for &(r, mult) in &eta {
                let delta = -mult * u;
                if let Some(pos) = active[c2].iter().position(|e| e.0 == r) {
                    active[c2][pos].1 += delta;
                    if active[c2][pos].1.abs() < DROP_TOLERANCE {
                        active[c2].swap_remove(pos);
                        row_count[r] -= 1;
                    }
                } else if delta.abs() >= DROP_TOLERANCE {
                    active[c2].push((r, delta));
                    row_count[r] += 1;
                }
            }
        }
    }

    /// Solve B·x = rhs in place. On entry `rhs.array` is indexed by row; on
    /// exit it is indexed by basis position. The density hint selects the
    /// sparse or dense traversal; results are identical.
    pub fn ftran(&self, rhs: &mut WorkVector, density_hint: f64) {
        debug_assert!(self.built);
        let m = self.num_row;
        let sparse_path = density_hint < 0.5;

        // Forward pass through the L etas.
        for k in 0..m {
            let t = rhs.array[self.pivot_row[k]];
            if sparse_path && t == 0.0 {
                continue;
            }
            for el in self.l_start[k]..self.l_start[k + 1] {
                rhs.array[self.l_index[el]] -= self.l_value[el] * t;
            }
        }

        // Backward pass through U, landing values on basis positions.
        let mut out = vec![0.0; m];
        for k in (0..m).rev() {
            let y = rhs.array[self.pivot_row[k]];
            if sparse_path && y == 0.0 {
                continue;
            }
            let x = y / self.pivot_value[k];
            out[self.pivot_pos[k]] = x;
            for el in self.u_start[k]..self.u_start[k + 1] {
                let j = self.u_pivot[el];
                rhs.array[self.pivot_row[j]] -= self.u_value[el] * x;
            }
        }
        rhs.array.copy_from_slice(&out);

        // Product-form update etas, in application order.
        for t in 0..self.pf_pivot_pos.len() {
            let p = self.pf_pivot_pos[t];
            let xp = rhs.array[p];
            if sparse_path && xp == 0.0 {
                continue;
            }
            let xp_new = xp / self.pf_pivot_value[t];
            for el in self.pf_start[t]..self.pf_start[t + 1] {
                let i = self.pf_index[el];
                rhs.array[i] -= self.pf_value[el] * xp_new;
            }
            rhs.array[p] = xp_new;
        }

        rhs.repack(DROP_TOLERANCE);
    }

    /// Solve Bᵀ·y = rhs in place. On entry `rhs.array` is indexed by basis
    /// position; on exit it is indexed by row.
    pub fn btran(&self, rhs: &mut WorkVector, density_hint: f64) {
        debug_assert!(self.built);
        let m = self.num_row;
        let sparse_path = density_hint < 0.5;

        // Update etas first, in reverse order: each solves for its pivot
        // position from a dot product over the eta column.
        for t in (0..self.pf_pivot_pos.len()).rev() {
            let p = self.pf_pivot_pos[t];
            let mut cp = rhs.array[p];
            for el in self.pf_start[t]..self.pf_start[t + 1] {
                cp -= self.pf_value[el] * rhs.array[self.pf_index[el]];
            }
            rhs.array[p] = cp / self.pf_pivot_value[t];
        }

        // Uᵀ forward: z_k gathers its column's earlier-pivot entries.
        let mut z = vec![0.0; m];
        for k in 0..m {
            let mut c = rhs.array[self.pivot_pos[k]];
            for el in self.u_start[k]..self.u_start[k + 1] {
                c -= self.u_value[el] * z[self.u_pivot[el]];
            }
            z[k] = c / self.pivot_value[k];
        }

        // Lᵀ backward: scatter z to pivot rows, then unwind the etas.
        for v in rhs.array.iter_mut() {
            *v = 0.0;
        }
        for k in 0..m {
            rhs.array[self.pivot_row[k]] = z[k];
        }
        for k in (0..m).rev() {
            if sparse_path && self.l_start[k] == self.l_start[k + 1] {
                continue;
            }
            let mut t = rhs.array[self.pivot_row[k]];
            for el in self.l_start[k]..self.l_start[k + 1] {
                t -= self.l_value[el] * rhs.array[self.l_index[el]];
            }
            rhs.array[self.pivot_row[k]] = t;
        }

        rhs.repack(DROP_TOLERANCE);
    }

    /// Append a product-form eta after the basis change that brought
    /// `column` (= B⁻¹·a_in, indexed by basis position) into position
    /// `pivot_position`.
    pub fn update(
        &mut self,
        column: &WorkVector,
        pivot_position: usize,
    ) -> Result<(), FactorError> {
        if !self.built {
            return Err(FactorError::NotBuilt);
        }
        let pivot = column.array[pivot_position];
        if pivot.abs() < self.update_pivot_tolerance {
            self.refactor_info.force_refactor = true;
            return Err(FactorError::NumericalTrouble(pivot));
        }
        self.pf_pivot_pos.push(pivot_position);
        self.pf_pivot_value.push(pivot);
        if self.pf_start.is_empty() {
            self.pf_start.push(0);
        }
        for &i in &column.index {
            if i == pivot_position {
                continue;
            }
            let v = column.array[i];
            if v != 0.0 {
                self.pf_index.push(i);
                self.pf_value.push(v);
            }
        }
        self.pf_start.push(self.pf_index.len());
        self.refactor_info.update_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_ftran(factor: &LuFactor, rhs: Vec<f64>) -> Vec<f64> {
        let mut v = WorkVector::new(rhs.len());
        v.array = rhs;
        v.invalidate_pack();
        v.repack(0.0);
        factor.ftran(&mut v, 1.0);
        v.array.clone()
    }

    fn solve_btran(factor: &LuFactor, rhs: Vec<f64>) -> Vec<f64> {
        let mut v = WorkVector::new(rhs.len());
        v.array = rhs;
        v.invalidate_pack();
        v.repack(0.0);
        factor.btran(&mut v, 1.0);
        v.array.clone()
    }

    #[test]
    fn test_identity_basis() {
        // B = -I (all logicals).
        let cols = vec![vec![(0, -1.0)], vec![(1, -1.0)], vec![(2, -1.0)]];
        let mut f = LuFactor::new(3);
        let res = f.invert(&cols);
        assert_eq!(res.rank_deficiency, 0);
        let x = solve_ftran(&f, vec![3.0, -1.0, 2.0]);
        assert_eq!(x, vec![-3.0, 1.0, -2.0]);
        let y = solve_btran(&f, vec![1.0, 2.0, 3.0]);
        assert_eq!(y, vec![-1.0, -2.0, -3.0]);
    }

    #[test]
    fn test_dense_basis_solves() {
        // B = [[2, 1], [1, 3]].
        let cols = vec![vec![(0, 2.0), (1, 1.0)], vec![(0, 1.0), (1, 3.0)]];
        let mut f = LuFactor::new(2);
        let res = f.invert(&cols);
        assert_eq!(res.rank_deficiency, 0);

        // B x = [5, 10] -> x = [1, 3].
        let x = solve_ftran(&f, vec![5.0, 10.0]);
        assert!((x[0] - 1.0).abs() < 1e-12, "x = {:?}", x);
        assert!((x[1] - 3.0).abs() < 1e-12);

        // B^T y = [4, 7] -> y = [1, 2].
        let y = solve_btran(&f, vec![4.0, 7.0]);
        assert!((y[0] - 1.0).abs() < 1e-12, "y = {:?}", y);
        assert!((y[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sparse_and_dense_paths_agree() {
        let cols = vec![
            vec![(0, 4.0), (2, 1.0)],
            vec![(1, -2.0)],
            vec![(0, 1.0), (2, 3.0)],
        ];
        let mut f = LuFactor::new(3);
        f.invert(&cols);
        let rhs = vec![1.0, 0.0, -2.0];
        let a = solve_ftran(&f, rhs.clone());
        let mut v = WorkVector::new(3);
        v.array = rhs;
        v.invalidate_pack();
        v.repack(0.0);
        f.ftran(&mut v, 0.0); // sparse hint
        for i in 0..3 {
            assert!((a[i] - v.array[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rank_deficiency_patched() {
        // Second column is (numerically) zero.
        let cols = vec![vec![(0, 1.0)], vec![], vec![(2, 5.0)]];
        let mut f = LuFactor::new(3);
        let res = f.invert(&cols);
        assert_eq!(res.rank_deficiency, 1);
        assert_eq!(res.patches.len(), 1);
        let (pos, row) = res.patches[0];
        assert_eq!(pos, 1);
        assert_eq!(row, 1);
        // Factor solves as if position 1 held the logical of row 1.
        let x = solve_ftran(&f, vec![2.0, 3.0, 10.0]);
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] + 3.0).abs() < 1e-12);
        assert!((x[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_product_form_update() {
        // Start from B = I (unit logical signs kept positive for clarity).
        let cols = vec![vec![(0, 1.0)], vec![(1, 1.0)]];
        let mut f = LuFactor::new(2);
        f.invert(&cols);

        // Bring column a = [3, 1] into position 0: B_new = [[3, 0], [1, 1]].
        let mut col = WorkVector::new(2);
        col.array = vec![3.0, 1.0];
        col.invalidate_pack();
        col.repack(0.0);
        f.update(&col, 0).unwrap();

        // B_new x = [6, 4] -> x = [2, 2].
        let x = solve_ftran(&f, vec![6.0, 4.0]);
        assert!((x[0] - 2.0).abs() < 1e-12, "x = {:?}", x);
        assert!((x[1] - 2.0).abs() < 1e-12);

        // B_new^T y = [5, 1]: y solves [[3,1],[0,1]] y = [5,1] -> y = [4/3, 1].
        let y = solve_btran(&f, vec![5.0, 1.0]);
        assert!((y[0] - 4.0 / 3.0).abs() < 1e-12, "y = {:?}", y);
        assert!((y[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_pivot_too_small() {
        let cols = vec![vec![(0, 1.0)]];
        let mut f = LuFactor::new(1);
        f.invert(&cols);
        let mut col = WorkVector::new(1);
        col.array = vec![1e-12];
        col.invalidate_pack();
        col.repack(0.0);
        let err = f.update(&col, 0);
        assert!(matches!(err, Err(FactorError::NumericalTrouble(_))));
        assert!(f.refactor_info.force_refactor);
    }

    #[test]
    fn test_ftran_btran_consistency() {
        // Random-ish nonsingular 4x4 with logicals mixed in.
        let cols = vec![
            vec![(0, 2.0), (1, 1.0), (3, -1.0)],
            vec![(1, -1.0)],
            vec![(0, 1.0), (2, 4.0)],
            vec![(2, -2.0), (3, 3.0)],
        ];
        let mut f = LuFactor::new(4);
        let res = f.invert(&cols);
        assert_eq!(res.rank_deficiency, 0);

        // Check B * ftran(b) == b by explicit multiply.
        let b = vec![1.0, -2.0, 0.5, 3.0];
        let x = solve_ftran(&f, b.clone());
        let mut back = vec![0.0; 4];
        for (p, col) in cols.iter().enumerate() {
            for &(r, v) in col {
                back[r] += v * x[p];
            }
        }
        for i in 0..4 {
            assert!((back[i] - b[i]).abs() < 1e-10, "back = {:?}", back);
        }

        // Check B^T * btran(c) == c.
        let c = vec![0.5, 1.5, -1.0, 2.0];
        let y = solve_btran(&f, c.clone());
        for (p, col) in cols.iter().enumerate() {
            let mut dot = 0.0;
            for &(r, v) in col {
                dot += v * y[r];
            }
            assert!((dot - c[p]).abs() < 1e-10);
        }
    }
}
