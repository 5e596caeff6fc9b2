//! A concrete implementation of the dense right-hand-side container FTRAN
//! and BTRAN operate on.
//!
//! A surrounding simplex driver is free to adapt its own RHS type to the
//! same shape (a dense array, a parallel nonzero-index list, and a flag
//! saying whether that index list is currently trustworthy), but this crate
//! ships a working implementation so it is usable and testable on its own.

#[derive(Debug, Clone)]
pub struct HVector {
    /// Dense values, length == dimension.
    pub array: Vec<f64>,
    /// Indices of (believed) nonzero entries of `array`.
    pub index: Vec<usize>,
    /// `index[..count]` is the live prefix.
    pub count: usize,
    /// Whether `index[..count]` is known to list exactly the nonzeros of
    /// `array`. Cleared by raw dense writes that bypass `mark`; restored by
    /// `pack`.
    pub packed: bool,
}

impl HVector {
    pub fn new(dim: usize) -> Self {
        Self { array: vec![0.0; dim], index: Vec::with_capacity(dim), count: 0, packed: true }
    }

    pub fn dim(&self) -> usize {
        self.array.len()
    }

    pub fn clear(&mut self) {
        for &i in &self.index[..self.count] {
            self.array[i] = 0.0;
        }
        self.count = 0;
        self.index.clear();
        self.packed = true;
    }

    /// Set `array[i] = value` and, if not already flagged via `index`, append
    /// `i` to the index list. Idempotent w.r.t. the index list (does not
    /// duplicate an already-marked index).
    pub fn mark(&mut self, i: usize, value: f64) {
        if self.array[i] == 0.0 && value != 0.0 {
            self.index.push(i);
            self.count += 1;
        }
        self.array[i] = value;
    }

    /// Rebuild `index[..count]` from a full scan of `array`. Needed after a
    /// dense computation wrote directly into `array` without going through
    /// `mark`.
    pub fn pack(&mut self) {
        self.index.clear();
        for (i, &v) in self.array.iter().enumerate() {
            if v != 0.0 {
                self.index.push(i);
            }
        }
        self.count = self.index.len();
        self.packed = true;
    }

    /// `self.array += alpha * other.array`, dense.
    pub fn saxpy(&mut self, alpha: f64, other: &HVector) {
        debug_assert_eq!(self.dim(), other.dim());
        for i in 0..self.dim() {
            self.array[i] += alpha * other.array[i];
        }
        self.packed = false;
    }

    pub fn density(&self) -> f64 {
        if self.dim() == 0 {
            0.0
        } else {
            self.count as f64 / self.dim() as f64
        }
    }

    pub fn from_dense(values: Vec<f64>) -> Self {
        let mut v = Self { array: values, index: Vec::new(), count: 0, packed: false };
        v.pack();
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_keeps_index_in_sync() {
        let mut v = HVector::new(4);
        v.mark(1, 5.0);
        v.mark(3, -2.0);
        assert_eq!(v.count, 2);
        assert_eq!(v.array, vec![0.0, 5.0, 0.0, -2.0]);
        let mut sorted = v.index[..v.count].to_vec();
        sorted.sort();
        assert_eq!(sorted, vec![1, 3]);
    }

    #[test]
    fn clear_zeroes_only_marked_entries() {
        let mut v = HVector::new(3);
        v.mark(0, 1.0);
        v.mark(2, 2.0);
        v.clear();
        assert_eq!(v.array, vec![0.0, 0.0, 0.0]);
        assert_eq!(v.count, 0);
    }

    #[test]
    fn pack_rebuilds_index_from_dense_writes() {
        let mut v = HVector::new(3);
        v.array[0] = 1.0;
        v.array[2] = 3.0;
        v.pack();
        assert_eq!(v.count, 2);
        assert_eq!(v.index, vec![0, 2]);
    }

    #[test]
    fn saxpy_is_dense_accumulation() {
        let mut a = HVector::from_dense(vec![1.0, 2.0, 3.0]);
        let b = HVector::from_dense(vec![1.0, 1.0, 1.0]);
        a.saxpy(2.0, &b);
        assert_eq!(a.array, vec![3.0, 4.0, 5.0]);
    }
}
