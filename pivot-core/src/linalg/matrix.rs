//! Dual-format sparse constraint matrix.
//!
//! The matrix is stored compressed in one orientation at a time: column-wise
//! (CSC) or row-wise (CSR). Conversions are explicit and the two formats are
//! never maintained simultaneously in steady state. Extraction, addition,
//! deletion, and scaling all work in whichever format is current, converting
//! only when an operation requires it.

use sprs::{CsMat, TriMat};

use crate::model::index_set::{deletion_mapping, IndexCollection};
use crate::status::{CoreError, CoreResult};

/// Storage orientation of the compressed arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixFormat {
    /// `start` has one slice per column; `index` holds row indices.
    #[default]
    ColWise,
    /// `start` has one slice per row; `index` holds column indices.
    RowWise,
}

/// Sparse matrix in compressed column- or row-wise form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseMatrix {
    pub format: MatrixFormat,
    pub num_col: usize,
    pub num_row: usize,
    /// Slice starts; `start[k+1] >= start[k]` and `start.len()` is the major
    /// dimension plus one.
    pub start: Vec<usize>,
    pub index: Vec<usize>,
    pub value: Vec<f64>,
}

impl SparseMatrix {
    /// Empty column-wise matrix of the given shape.
    pub fn new_colwise(num_row: usize, num_col: usize) -> Self {
        Self {
            format: MatrixFormat::ColWise,
            num_col,
            num_row,
            start: vec![0; num_col + 1],
            index: Vec::new(),
            value: Vec::new(),
        }
    }

    /// Column-wise matrix from packed slices.
    pub fn from_colwise(
        num_row: usize,
        num_col: usize,
        start: Vec<usize>,
        index: Vec<usize>,
        value: Vec<f64>,
    ) -> CoreResult<Self> {
        if start.len() != num_col + 1 {
            return Err(CoreError::InvalidInput(format!(
                "start has length {}, expected {}",
                start.len(),
                num_col + 1
            )));
        }
        let mat = Self {
            format: MatrixFormat::ColWise,
            num_col,
            num_row,
            start,
            index,
            value,
        };
        mat.check_consistent()?;
        Ok(mat)
    }

    pub fn is_colwise(&self) -> bool {
        self.format == MatrixFormat::ColWise
    }

    pub fn is_rowwise(&self) -> bool {
        self.format == MatrixFormat::RowWise
    }

    /// Number of stored entries: the last start entry.
    pub fn num_nz(&self) -> usize {
        *self.start.last().unwrap_or(&0)
    }

    fn major_dim(&self) -> usize {
        match self.format {
            MatrixFormat::ColWise => self.num_col,
            MatrixFormat::RowWise => self.num_row,
        }
    }

    fn minor_dim(&self) -> usize {
        match self.format {
            MatrixFormat::ColWise => self.num_row,
            MatrixFormat::RowWise => self.num_col,
        }
    }

    /// Structural sanity: monotone starts, in-range and slice-unique indices.
    pub fn check_consistent(&self) -> CoreResult<()> {
        if self.start.len() != self.major_dim() + 1 {
            return Err(CoreError::InvalidInput(
                "start length does not match major dimension".to_string(),
            ));
        }
        if self.start[0] != 0 {
            return Err(CoreError::InvalidInput("start[0] must be 0".to_string()));
        }
        for k in 0..self.major_dim() {
            if self.start[k + 1] < self.start[k] {
                return Err(CoreError::InvalidInput(format!(
                    "start[{}] decreases",
                    k + 1
                )));
            }
        }
        let nz = self.num_nz();
        if self.index.len() != nz || self.value.len() != nz {
            return Err(CoreError::InvalidInput(
                "index/value length does not match start".to_string(),
            ));
        }
        let minor = self.minor_dim();
        let mut seen = vec![usize::MAX; minor];
        for k in 0..self.major_dim() {
            for el in self.start[k]..self.start[k + 1] {
                let ix = self.index[el];
                if ix >= minor {
                    return Err(CoreError::InvalidInput(format!(
                        "index {} out of range (minor dimension {})",
                        ix, minor
                    )));
                }
                if seen[ix] == k {
                    return Err(CoreError::InvalidInput(format!(
                        "duplicate index {} in slice {}",
                        ix, k
                    )));
                }
                seen[ix] = k;
            }
        }
        Ok(())
    }

    /// Reject entries outside `[small_tol, large_tol]` in magnitude.
    pub fn assess(&self, small_tol: f64, large_tol: f64) -> CoreResult<()> {
        for (el, &v) in self.value.iter().enumerate() {
            let a = v.abs();
            if a < small_tol {
                return Err(CoreError::InvalidMatrixValue(format!(
                    "entry {} has magnitude {:e} below {:e}",
                    el, a, small_tol
                )));
            }
            if a > large_tol {
                return Err(CoreError::InvalidMatrixValue(format!(
                    "entry {} has magnitude {:e} above {:e}",
                    el, a, large_tol
                )));
            }
        }
        Ok(())
    }

    /// Transpose the compressed representation in place via counting sort.
    fn transpose_storage(&mut self) {
        let major = self.major_dim();
        let minor = self.minor_dim();
        let nz = self.num_nz();

        let mut new_start = vec![0usize; minor + 1];
        for &ix in &self.index[..nz] {
            new_start[ix + 1] += 1;
        }
        for k in 0..minor {
            new_start[k + 1] += new_start[k];
        }

        let mut fill = new_start.clone();
        let mut new_index = vec![0usize; nz];
        let mut new_value = vec![0.0f64; nz];
        for k in 0..major {
            for el in self.start[k]..self.start[k + 1] {
                let ix = self.index[el];
                let pos = fill[ix];
                fill[ix] += 1;
                new_index[pos] = k;
                new_value[pos] = self.value[el];
            }
        }

        self.start = new_start;
        self.index = new_index;
        self.value = new_value;
        self.format = match self.format {
            MatrixFormat::ColWise => MatrixFormat::RowWise,
            MatrixFormat::RowWise => MatrixFormat::ColWise,
        };
    }

    /// Convert to column-wise form. Idempotent.
    pub fn ensure_colwise(&mut self) {
        if self.is_rowwise() {
            self.transpose_storage();
        }
    }

    /// Convert to row-wise form. Idempotent.
    pub fn ensure_rowwise(&mut self) {
        if self.is_colwise() {
            self.transpose_storage();
        }
    }

    /// Extract row `i` as (column indices, values), regardless of orientation.
    pub fn get_row(&self, row: usize) -> (Vec<usize>, Vec<f64>) {
        debug_assert!(row < self.num_row);
        match self.format {
            MatrixFormat::RowWise => {
                let range = self.start[row]..self.start[row + 1];
                (self.index[range.clone()].to_vec(), self.value[range].to_vec())
            }
            MatrixFormat::ColWise => {
                let mut cols = Vec::new();
                let mut vals = Vec::new();
                for j in 0..self.num_col {
                    for el in self.start[j]..self.start[j + 1] {
                        if self.index[el] == row {
                            cols.push(j);
                            vals.push(self.value[el]);
                            break;
                        }
                    }
                }
                (cols, vals)
            }
        }
    }

    /// Extract column `j` as (row indices, values), regardless of orientation.
    pub fn get_col(&self, col: usize) -> (Vec<usize>, Vec<f64>) {
        debug_assert!(col < self.num_col);
        match self.format {
            MatrixFormat::ColWise => {
                let range = self.start[col]..self.start[col + 1];
                (self.index[range.clone()].to_vec(), self.value[range].to_vec())
            }
            MatrixFormat::RowWise => {
                let mut rows = Vec::new();
                let mut vals = Vec::new();
                for i in 0..self.num_row {
                    for el in self.start[i]..self.start[i + 1] {
                        if self.index[el] == col {
                            rows.push(i);
                            vals.push(self.value[el]);
                            break;
                        }
                    }
                }
                (rows, vals)
            }
        }
    }

    /// Stored coefficient at (row, col), zero when absent.
    pub fn get_coefficient(&self, row: usize, col: usize) -> f64 {
        let (major, minor) = match self.format {
            MatrixFormat::ColWise => (col, row),
            MatrixFormat::RowWise => (row, col),
        };
        for el in self.start[major]..self.start[major + 1] {
            if self.index[el] == minor {
                return self.value[el];
            }
        }
        0.0
    }

    /// Set coefficient (row, col). Values of magnitude at most `zero_tol` are
    /// removed rather than stored.
    pub fn change_coefficient(&mut self, row: usize, col: usize, value: f64, zero_tol: f64) {
        debug_assert!(row < self.num_row && col < self.num_col);
        let (major, minor) = match self.format {
            MatrixFormat::ColWise => (col, row),
            MatrixFormat::RowWise => (row, col),
        };
        let drop = value.abs() <= zero_tol;
        let mut found: Option<usize> = None;
        for el in self.start[major]..self.start[major + 1] {
            if self.index[el] == minor {
                found = Some(el);
                break;
            }
        }
        match (found, drop) {
            (Some(el), false) => self.value[el] = value,
            (Some(el), true) => {
                self.index.remove(el);
                self.value.remove(el);
                for s in self.start[major + 1..].iter_mut() {
                    *s -= 1;
                }
            }
            (None, false) => {
                let el = self.start[major + 1];
                self.index.insert(el, minor);
                self.value.insert(el, value);
                for s in self.start[major + 1..].iter_mut() {
                    *s += 1;
                }
            }
            (None, true) => {}
        }
    }

    /// Append `num_new_col` columns given in packed column-wise form.
    /// The matrix must be (or is made) column-wise.
    pub fn add_cols(
        &mut self,
        num_new_col: usize,
        start: &[usize],
        index: &[usize],
        value: &[f64],
    ) -> CoreResult<()> {
        if start.len() != num_new_col + 1 && !(num_new_col == 0 && start.is_empty()) {
            return Err(CoreError::InvalidInput(
                "column block start length mismatch".to_string(),
            ));
        }
        let new_nz = start.last().copied().unwrap_or(0);
        if index.len() != new_nz || value.len() != new_nz {
            return Err(CoreError::InvalidInput(
                "column block index/value length mismatch".to_string(),
            ));
        }
        for &i in index {
            if i >= self.num_row {
                return Err(CoreError::InvalidInput(format!(
                    "column block row index {} out of range ({} rows)",
                    i, self.num_row
                )));
            }
        }
        self.ensure_colwise();
        let base = self.num_nz();
        for k in 0..num_new_col {
            for el in start[k]..start[k + 1] {
                self.index.push(index[el]);
                self.value.push(value[el]);
            }
            self.start.push(base + start[k + 1]);
        }
        self.num_col += num_new_col;
        Ok(())
    }

    /// Append `num_new_row` rows given in packed row-wise form. The current
    /// orientation is preserved: a column-wise matrix is rebuilt by merging
    /// the new block into each column.
    pub fn add_rows(
        &mut self,
        num_new_row: usize,
        start: &[usize],
        index: &[usize],
        value: &[f64],
    ) -> CoreResult<()> {
        if start.len() != num_new_row + 1 && !(num_new_row == 0 && start.is_empty()) {
            return Err(CoreError::InvalidInput(
                "row block start length mismatch".to_string(),
            ));
        }
        let new_nz = start.last().copied().unwrap_or(0);
        if index.len() != new_nz || value.len() != new_nz {
            return Err(CoreError::InvalidInput(
                "row block index/value length mismatch".to_string(),
            ));
        }
        for &j in index {
            if j >= self.num_col {
                return Err(CoreError::InvalidInput(format!(
                    "row block column index {} out of range ({} cols)",
                    j, self.num_col
                )));
            }
        }
        match self.format {
            MatrixFormat::RowWise => {
                let base = self.num_nz();
                for k in 0..num_new_row {
                    for el in start[k]..start[k + 1] {
                        self.index.push(index[el]);
                        self.value.push(value[el]);
                    }
                    self.start.push(base + start[k + 1]);
                }
                self.num_row += num_new_row;
            }
            MatrixFormat::ColWise => {
                // Count new entries per column, then merge column by column.
                let mut extra = vec![0usize; self.num_col];
                for &j in index.iter().take(new_nz) {
                    extra[j] += 1;
                }
                let old_nz = self.num_nz();
                let mut new_start = vec![0usize; self.num_col + 1];
                for j in 0..self.num_col {
                    new_start[j + 1] = new_start[j]
                        + (self.start[j + 1] - self.start[j])
                        + extra[j];
                }
                let mut new_index = vec![0usize; old_nz + new_nz];
                let mut new_value = vec![0.0f64; old_nz + new_nz];
                let mut fill = new_start.clone();
                for j in 0..self.num_col {
                    for el in self.start[j]..self.start[j + 1] {
                        new_index[fill[j]] = self.index[el];
                        new_value[fill[j]] = self.value[el];
                        fill[j] += 1;
                    }
                }
                for k in 0..num_new_row {
                    for el in start[k]..start[k + 1] {
                        let j = index[el];
                        new_index[fill[j]] = self.num_row + k;
                        new_value[fill[j]] = value[el];
                        fill[j] += 1;
                    }
                }
                self.start = new_start;
                self.index = new_index;
                self.value = new_value;
                self.num_row += num_new_row;
            }
        }
        Ok(())
    }

    /// Delete columns selected by the collection; returns the old→new column
    /// mapping (−1 for deleted).
    pub fn delete_cols(&mut self, collection: &IndexCollection) -> CoreResult<Vec<i32>> {
        collection.validate(self.num_col)?;
        let flags = collection.delete_flags(self.num_col);
        let mapping = deletion_mapping(&flags);
        let kept = mapping.iter().filter(|&&m| m >= 0).count();
        match self.format {
            MatrixFormat::ColWise => {
                let mut new_start = Vec::with_capacity(kept + 1);
                new_start.push(0usize);
                let mut new_index = Vec::new();
                let mut new_value = Vec::new();
                for j in 0..self.num_col {
                    if flags[j] {
                        continue;
                    }
                    for el in self.start[j]..self.start[j + 1] {
                        new_index.push(self.index[el]);
                        new_value.push(self.value[el]);
                    }
                    new_start.push(new_index.len());
                }
                self.start = new_start;
                self.index = new_index;
                self.value = new_value;
            }
            MatrixFormat::RowWise => {
                self.filter_minor(&mapping);
            }
        }
        self.num_col = kept;
        Ok(mapping)
    }

    /// Delete rows selected by the collection; returns the old→new row
    /// mapping (−1 for deleted).
    pub fn delete_rows(&mut self, collection: &IndexCollection) -> CoreResult<Vec<i32>> {
        collection.validate(self.num_row)?;
        let flags = collection.delete_flags(self.num_row);
        let mapping = deletion_mapping(&flags);
        let kept = mapping.iter().filter(|&&m| m >= 0).count();
        match self.format {
            MatrixFormat::RowWise => {
                let mut new_start = Vec::with_capacity(kept + 1);
                new_start.push(0usize);
                let mut new_index = Vec::new();
                let mut new_value = Vec::new();
                for i in 0..self.num_row {
                    if flags[i] {
                        continue;
                    }
                    for el in self.start[i]..self.start[i + 1] {
                        new_index.push(self.index[el]);
                        new_value.push(self.value[el]);
                    }
                    new_start.push(new_index.len());
                }
                self.start = new_start;
                self.index = new_index;
                self.value = new_value;
            }
            MatrixFormat::ColWise => {
                self.filter_minor(&mapping);
            }
        }
        self.num_row = kept;
        Ok(mapping)
    }

    /// Drop entries whose minor index is deleted and remap the survivors.
    fn filter_minor(&mut self, mapping: &[i32]) {
        let major = self.major_dim();
        let mut write = 0usize;
        let mut new_start = vec![0usize; major + 1];
        for k in 0..major {
            for el in self.start[k]..self.start[k + 1] {
                let m = mapping[self.index[el]];
                if m >= 0 {
                    self.index[write] = m as usize;
                    self.value[write] = self.value[el];
                    write += 1;
                }
            }
            new_start[k + 1] = write;
        }
        self.index.truncate(write);
        self.value.truncate(write);
        self.start = new_start;
    }

    /// Multiply every entry of row `i` by `scale`.
    pub fn scale_row(&mut self, row: usize, scale: f64) {
        match self.format {
            MatrixFormat::RowWise => {
                for el in self.start[row]..self.start[row + 1] {
                    self.value[el] *= scale;
                }
            }
            MatrixFormat::ColWise => {
                let nz = self.num_nz();
                for el in 0..nz {
                    if self.index[el] == row {
                        self.value[el] *= scale;
                    }
                }
            }
        }
    }

    /// Multiply every entry of column `j` by `scale`.
    pub fn scale_col(&mut self, col: usize, scale: f64) {
        match self.format {
            MatrixFormat::ColWise => {
                for el in self.start[col]..self.start[col + 1] {
                    self.value[el] *= scale;
                }
            }
            MatrixFormat::RowWise => {
                let nz = self.num_nz();
                for el in 0..nz {
                    if self.index[el] == col {
                        self.value[el] *= scale;
                    }
                }
            }
        }
    }

    /// Apply per-row scale factors to all entries.
    pub fn apply_row_scale(&mut self, row_scale: &[f64]) {
        debug_assert_eq!(row_scale.len(), self.num_row);
        match self.format {
            MatrixFormat::ColWise => {
                let nz = self.num_nz();
                for el in 0..nz {
                    self.value[el] *= row_scale[self.index[el]];
                }
            }
            MatrixFormat::RowWise => {
                for i in 0..self.num_row {
                    for el in self.start[i]..self.start[i + 1] {
                        self.value[el] *= row_scale[i];
                    }
                }
            }
        }
    }

    /// Apply per-column scale factors to all entries.
    pub fn apply_col_scale(&mut self, col_scale: &[f64]) {
        debug_assert_eq!(col_scale.len(), self.num_col);
        match self.format {
            MatrixFormat::ColWise => {
                for j in 0..self.num_col {
                    for el in self.start[j]..self.start[j + 1] {
                        self.value[el] *= col_scale[j];
                    }
                }
            }
            MatrixFormat::RowWise => {
                let nz = self.num_nz();
                for el in 0..nz {
                    self.value[el] *= col_scale[self.index[el]];
                }
            }
        }
    }

    /// y = A x.
    pub fn product(&self, y: &mut [f64], x: &[f64]) {
        debug_assert_eq!(x.len(), self.num_col);
        debug_assert_eq!(y.len(), self.num_row);
        y.fill(0.0);
        match self.format {
            MatrixFormat::ColWise => {
                for j in 0..self.num_col {
                    let xj = x[j];
                    if xj == 0.0 {
                        continue;
                    }
                    for el in self.start[j]..self.start[j + 1] {
                        y[self.index[el]] += self.value[el] * xj;
                    }
                }
            }
            MatrixFormat::RowWise => {
                for i in 0..self.num_row {
                    let mut sum = 0.0;
                    for el in self.start[i]..self.start[i + 1] {
                        sum += self.value[el] * x[self.index[el]];
                    }
                    y[i] = sum;
                }
            }
        }
    }

    /// x = Aᵀ y.
    pub fn product_transpose(&self, x: &mut [f64], y: &[f64]) {
        debug_assert_eq!(y.len(), self.num_row);
        debug_assert_eq!(x.len(), self.num_col);
        x.fill(0.0);
        match self.format {
            MatrixFormat::ColWise => {
                for j in 0..self.num_col {
                    let mut sum = 0.0;
                    for el in self.start[j]..self.start[j + 1] {
                        sum += self.value[el] * y[self.index[el]];
                    }
                    x[j] = sum;
                }
            }
            MatrixFormat::RowWise => {
                for i in 0..self.num_row {
                    let yi = y[i];
                    if yi == 0.0 {
                        continue;
                    }
                    for el in self.start[i]..self.start[i + 1] {
                        x[self.index[el]] += self.value[el] * yi;
                    }
                }
            }
        }
    }

    /// Export as a CSC matrix for interop with sparse consumers.
    pub fn to_csc(&self) -> CsMat<f64> {
        let mut tri = TriMat::new((self.num_row, self.num_col));
        match self.format {
            MatrixFormat::ColWise => {
                for j in 0..self.num_col {
                    for el in self.start[j]..self.start[j + 1] {
                        tri.add_triplet(self.index[el], j, self.value[el]);
                    }
                }
            }
            MatrixFormat::RowWise => {
                for i in 0..self.num_row {
                    for el in self.start[i]..self.start[i + 1] {
                        tri.add_triplet(i, self.index[el], self.value[el]);
                    }
                }
            }
        }
        tri.to_csc()
    }

    /// Import from a CSC matrix.
    pub fn from_csc(mat: &CsMat<f64>) -> Self {
        let mut out = SparseMatrix::new_colwise(mat.rows(), mat.cols());
        let mut nz = 0usize;
        for (j, col) in mat.outer_iterator().enumerate() {
            for (i, &v) in col.iter() {
                out.index.push(i);
                out.value.push(v);
                nz += 1;
            }
            out.start[j + 1] = nz;
        }
        out
    }

    /// Entries as (row, col, value) triplets in unspecified order.
    pub fn triplets(&self) -> Vec<(usize, usize, f64)> {
        let mut out = Vec::with_capacity(self.num_nz());
        for k in 0..self.major_dim() {
            for el in self.start[k]..self.start[k + 1] {
                let (i, j) = match self.format {
                    MatrixFormat::ColWise => (self.index[el], k),
                    MatrixFormat::RowWise => (k, self.index[el]),
                };
                out.push((i, j, self.value[el]));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SparseMatrix {
        // [[1, 0, 2],
        //  [0, 3, 4]]
        SparseMatrix::from_colwise(
            2,
            3,
            vec![0, 1, 2, 4],
            vec![0, 1, 0, 1],
            vec![1.0, 3.0, 2.0, 4.0],
        )
        .unwrap()
    }

    fn sorted_triplets(m: &SparseMatrix) -> Vec<(usize, usize, f64)> {
        let mut t = m.triplets();
        t.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        t
    }

    #[test]
    fn test_roundtrip_formats() {
        let mut m = small();
        let before = sorted_triplets(&m);
        m.ensure_rowwise();
        assert!(m.is_rowwise());
        m.ensure_colwise();
        assert!(m.is_colwise());
        assert_eq!(sorted_triplets(&m), before);
    }

    #[test]
    fn test_ensure_idempotent() {
        let mut m = small();
        m.ensure_colwise();
        let snapshot = m.clone();
        m.ensure_colwise();
        assert_eq!(m, snapshot);
    }

    #[test]
    fn test_get_row_both_formats() {
        let mut m = small();
        assert_eq!(m.get_row(1), (vec![1, 2], vec![3.0, 4.0]));
        m.ensure_rowwise();
        assert_eq!(m.get_row(1), (vec![1, 2], vec![3.0, 4.0]));
    }

    #[test]
    fn test_get_coefficient() {
        let m = small();
        assert_eq!(m.get_coefficient(0, 2), 2.0);
        assert_eq!(m.get_coefficient(1, 0), 0.0);
    }

    #[test]
    fn test_change_coefficient_insert_and_remove() {
        let mut m = small();
        m.change_coefficient(1, 0, 5.0, 1e-12);
        assert_eq!(m.get_coefficient(1, 0), 5.0);
        assert_eq!(m.num_nz(), 5);
        m.change_coefficient(1, 0, 0.0, 1e-12);
        assert_eq!(m.get_coefficient(1, 0), 0.0);
        assert_eq!(m.num_nz(), 4);
        m.check_consistent().unwrap();
    }

    #[test]
    fn test_add_cols() {
        let mut m = small();
        m.add_cols(1, &[0, 2], &[0, 1], &[7.0, 8.0]).unwrap();
        assert_eq!(m.num_col, 4);
        assert_eq!(m.get_col(3), (vec![0, 1], vec![7.0, 8.0]));
        m.check_consistent().unwrap();
    }

    #[test]
    fn test_add_rows_colwise_merges() {
        let mut m = small();
        m.add_rows(1, &[0, 2], &[0, 2], &[5.0, 6.0]).unwrap();
        assert!(m.is_colwise());
        assert_eq!(m.num_row, 3);
        assert_eq!(m.get_row(2), (vec![0, 2], vec![5.0, 6.0]));
        m.check_consistent().unwrap();
    }

    #[test]
    fn test_add_then_delete_rows_restores() {
        let mut m = small();
        let before = sorted_triplets(&m);
        m.add_rows(2, &[0, 1, 2], &[1, 0], &[9.0, 10.0]).unwrap();
        m.delete_rows(&IndexCollection::interval(2, 3)).unwrap();
        assert_eq!(sorted_triplets(&m), before);
        assert_eq!(m.num_row, 2);
    }

    #[test]
    fn test_delete_cols_mapping() {
        let mut m = small();
        let mapping = m
            .delete_cols(&IndexCollection::Mask(vec![false, true, false]))
            .unwrap();
        assert_eq!(mapping, vec![0, -1, 1]);
        assert_eq!(m.num_col, 2);
        assert_eq!(m.get_coefficient(0, 1), 2.0);
        m.check_consistent().unwrap();
    }

    #[test]
    fn test_delete_rows_rowwise() {
        let mut m = small();
        m.ensure_rowwise();
        m.delete_rows(&IndexCollection::Set(vec![0])).unwrap();
        assert_eq!(m.num_row, 1);
        assert_eq!(m.get_row(0), (vec![1, 2], vec![3.0, 4.0]));
    }

    #[test]
    fn test_products() {
        let m = small();
        let mut y = vec![0.0; 2];
        m.product(&mut y, &[1.0, 1.0, 1.0]);
        assert_eq!(y, vec![3.0, 7.0]);
        let mut x = vec![0.0; 3];
        m.product_transpose(&mut x, &[1.0, 1.0]);
        assert_eq!(x, vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_scaling() {
        let mut m = small();
        m.scale_row(0, 2.0);
        assert_eq!(m.get_coefficient(0, 0), 2.0);
        assert_eq!(m.get_coefficient(0, 2), 4.0);
        m.scale_col(2, 0.5);
        assert_eq!(m.get_coefficient(0, 2), 2.0);
        assert_eq!(m.get_coefficient(1, 2), 2.0);
        m.apply_row_scale(&[1.0, 10.0]);
        assert_eq!(m.get_coefficient(1, 1), 30.0);
    }

    #[test]
    fn test_assess() {
        let m = small();
        assert!(m.assess(1e-9, 1e15).is_ok());
        assert!(m.assess(2.0, 1e15).is_err());
        assert!(m.assess(1e-9, 3.0).is_err());
    }

    #[test]
    fn test_sprs_roundtrip() {
        let m = small();
        let csc = m.to_csc();
        let back = SparseMatrix::from_csc(&csc);
        assert_eq!(sorted_triplets(&back), sorted_triplets(&m));
    }

    #[test]
    fn test_empty_dimensions() {
        let mut m = SparseMatrix::new_colwise(0, 0);
        m.ensure_rowwise();
        m.ensure_colwise();
        assert_eq!(m.num_nz(), 0);
        m.add_cols(0, &[], &[], &[]).unwrap();
        m.check_consistent().unwrap();
    }
}
