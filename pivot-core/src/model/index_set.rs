//! Index collections for bulk get/change/delete operations.
//!
//! An operation over rows or columns addresses its targets in one of three
//! equivalent forms: a closed interval, a strictly ascending set, or a boolean
//! mask over the full dimension. Data passed alongside a collection is
//! positional for intervals and sets, and indexed by the original entry for
//! masks.

use crate::status::{CoreError, CoreResult};

/// Target selection for bulk operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCollection {
    /// Closed interval `[from, to]`. Empty when `from > to`.
    Interval { from: usize, to: usize },

    /// Strictly ascending indices.
    Set(Vec<usize>),

    /// `mask[i]` selects entry `i`; length must equal the dimension.
    Mask(Vec<bool>),
}

impl IndexCollection {
    /// Interval helper.
    pub fn interval(from: usize, to: usize) -> Self {
        IndexCollection::Interval { from, to }
    }

    /// Check the collection against the dimension it addresses.
    pub fn validate(&self, dim: usize) -> CoreResult<()> {
        match self {
            IndexCollection::Interval { from, to } => {
                if *from > *to {
                    return Ok(()); // empty interval is legal
                }
                if *to >= dim {
                    return Err(CoreError::InvalidInput(format!(
                        "interval [{}, {}] out of range (dimension {})",
                        from, to, dim
                    )));
                }
                Ok(())
            }
            IndexCollection::Set(set) => {
                let mut prev: Option<usize> = None;
                for &ix in set {
                    if ix >= dim {
                        return Err(CoreError::InvalidInput(format!(
                            "set entry {} out of range (dimension {})",
                            ix, dim
                        )));
                    }
                    if let Some(p) = prev {
                        if ix <= p {
                            return Err(CoreError::InvalidInput(format!(
                                "set entries not strictly ascending at {}",
                                ix
                            )));
                        }
                    }
                    prev = Some(ix);
                }
                Ok(())
            }
            IndexCollection::Mask(mask) => {
                if mask.len() != dim {
                    return Err(CoreError::InvalidInput(format!(
                        "mask length {} does not match dimension {}",
                        mask.len(),
                        dim
                    )));
                }
                Ok(())
            }
        }
    }

    /// Number of selected entries.
    pub fn entry_count(&self, dim: usize) -> usize {
        match self {
            IndexCollection::Interval { from, to } => {
                if from > to || *from >= dim {
                    0
                } else {
                    to.min(&(dim - 1)) - from + 1
                }
            }
            IndexCollection::Set(set) => set.len(),
            IndexCollection::Mask(mask) => mask.iter().filter(|&&m| m).count(),
        }
    }

    /// True when nothing is selected.
    pub fn is_empty(&self, dim: usize) -> bool {
        self.entry_count(dim) == 0
    }

    /// Visit each selected entry as `(data_position, model_index)` in
    /// ascending model order. For masks, the data position is the model index.
    pub fn for_each<F: FnMut(usize, usize)>(&self, dim: usize, mut f: F) {
        match self {
            IndexCollection::Interval { from, to } => {
                if *from > *to {
                    return;
                }
                for (k, ix) in (*from..=(*to).min(dim.saturating_sub(1))).enumerate() {
                    f(k, ix);
                }
            }
            IndexCollection::Set(set) => {
                for (k, &ix) in set.iter().enumerate() {
                    f(k, ix);
                }
            }
            IndexCollection::Mask(mask) => {
                for (ix, &m) in mask.iter().enumerate() {
                    if m {
                        f(ix, ix);
                    }
                }
            }
        }
    }

    /// Deletion flags over the full dimension: `true` means delete.
    pub fn delete_flags(&self, dim: usize) -> Vec<bool> {
        let mut flags = vec![false; dim];
        self.for_each(dim, |_, ix| flags[ix] = true);
        flags
    }
}

/// Old-index → new-index mapping after a deletion; `-1` marks deleted entries.
///
/// This is the value the mask form of a delete call reports back, and what
/// basis compaction and scale compaction consume.
pub fn deletion_mapping(flags: &[bool]) -> Vec<i32> {
    let mut mapping = Vec::with_capacity(flags.len());
    let mut next = 0i32;
    for &deleted in flags {
        if deleted {
            mapping.push(-1);
        } else {
            mapping.push(next);
            next += 1;
        }
    }
    mapping
}
