//! In-memory free-list
//!
//! Rebuilt from block headers at open and kept in sync with every
//! allocate/free. Extents are indexed twice: by offset for coalescing and by
//! `(size, offset)` for best-fit lookup.

use crate::format::MIN_BLOCK_SIZE;
use std::collections::{BTreeMap, BTreeSet};

/// Free extents of the data file
#[derive(Debug, Default, Clone)]
pub struct FreeList {
    by_offset: BTreeMap<u64, u64>,
    by_size: BTreeSet<(u64, u64)>,
}

impl FreeList {
    /// Create an empty free-list
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a block of at least `size` bytes
    ///
    /// Picks the smallest adequate extent (lowest offset on ties). The
    /// remainder is returned to the list unless it is smaller than
    /// [`MIN_BLOCK_SIZE`], in which case the caller receives the whole
    /// extent. Returns `(offset, granted_size, remainder)` where `remainder`
    /// is the split-off extent, if any.
    pub fn take(&mut self, size: u64) -> Option<(u64, u64, Option<(u64, u64)>)> {
        let &(extent, offset) = self.by_size.range((size, 0)..).next()?;
        self.remove(offset, extent);

        let rest = extent - size;
        if rest < MIN_BLOCK_SIZE {
            return Some((offset, extent, None));
        }
        let remainder = (offset + size, rest);
        self.insert(remainder.0, remainder.1);
        Some((offset, size, Some(remainder)))
    }

    /// Return an extent, merging it with free neighbours
    ///
    /// Returns the merged extent `(offset, size)` whose header the caller
    /// must write.
    pub fn release(&mut self, offset: u64, size: u64) -> (u64, u64) {
        let mut start = offset;
        let mut len = size;

        if let Some((&prev, &prev_len)) = self.by_offset.range(..offset).next_back() {
            if prev + prev_len == offset {
                self.remove(prev, prev_len);
                start = prev;
                len += prev_len;
            }
        }
        if let Some(&next_len) = self.by_offset.get(&(offset + size)) {
            self.remove(offset + size, next_len);
            len += next_len;
        }

        self.insert(start, len);
        (start, len)
    }

    /// Add an extent without merging (used while scanning)
    pub fn insert(&mut self, offset: u64, size: u64) {
        self.by_offset.insert(offset, size);
        self.by_size.insert((size, offset));
    }

    fn remove(&mut self, offset: u64, size: u64) {
        self.by_offset.remove(&offset);
        self.by_size.remove(&(size, offset));
    }

    /// Drop every extent
    pub fn clear(&mut self) {
        self.by_offset.clear();
        self.by_size.clear();
    }

    /// Number of free extents
    pub fn len(&self) -> usize {
        self.by_offset.len()
    }

    /// True if there is no free space
    pub fn is_empty(&self) -> bool {
        self.by_offset.is_empty()
    }

    /// Total free bytes
    pub fn total(&self) -> u64 {
        self.by_offset.values().sum()
    }

    /// Largest free extent
    pub fn largest(&self) -> u64 {
        self.by_size.iter().next_back().map_or(0, |&(size, _)| size)
    }

    /// Iterate extents in offset order
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.by_offset.iter().map(|(&o, &s)| (o, s))
    }
}
