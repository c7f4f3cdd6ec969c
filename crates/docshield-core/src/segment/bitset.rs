//! Fixed-size bitset over document ids.

use roaring::RoaringBitmap;

use super::DocId;

/// A bitset of exactly `len` bits, backed by a [`RoaringBitmap`].
///
/// Only ids below `len` are ever stored, so equality and
/// [`cardinality`](Self::cardinality) only ever see addressable bits.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedBitSet {
    bits: RoaringBitmap,
    len: usize,
}

impl FixedBitSet {
    /// Create a bitset with every bit cleared.
    pub fn new(len: usize) -> Self {
        Self {
            bits: RoaringBitmap::new(),
            len,
        }
    }

    /// Create a bitset with every bit set.
    pub fn full(len: usize) -> Self {
        let mut bits = RoaringBitmap::new();
        bits.insert_range(0..len as u32);
        Self { bits, len }
    }

    /// Number of addressable bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the bitset has no addressable bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the bit for `doc`. Out-of-range ids read as cleared.
    #[inline]
    pub fn get(&self, doc: DocId) -> bool {
        self.bits.contains(doc)
    }

    /// Set the bit for `doc`.
    ///
    /// # Panics
    ///
    /// Panics if `doc` is out of range.
    #[inline]
    pub fn set(&mut self, doc: DocId) {
        assert!((doc as usize) < self.len, "doc {} out of range {}", doc, self.len);
        self.bits.insert(doc);
    }

    /// Clear the bit for `doc`. Out-of-range ids are ignored.
    #[inline]
    pub fn clear(&mut self, doc: DocId) {
        self.bits.remove(doc);
    }

    /// Set every bit yielded by `docs`.
    pub fn or_iter(&mut self, docs: impl IntoIterator<Item = DocId>) {
        for doc in docs {
            self.set(doc);
        }
    }

    /// Intersect in place with `other`.
    ///
    /// Bits beyond `other.len()` are cleared.
    pub fn and(&mut self, other: &FixedBitSet) {
        self.bits &= &other.bits;
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> usize {
        self.bits.len() as usize
    }

    /// Check that every set bit here is also set in `other`.
    pub fn is_subset_of(&self, other: &FixedBitSet) -> bool {
        self.bits.is_subset(&other.bits)
    }

    /// Iterate set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = DocId> + '_ {
        self.bits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let bits = FixedBitSet::new(130);
        assert_eq!(bits.len(), 130);
        assert_eq!(bits.cardinality(), 0);
        assert!(!bits.get(0));
        assert!(!bits.get(129));
    }

    #[test]
    fn test_full_masks_tail() {
        let bits = FixedBitSet::full(70);
        assert_eq!(bits.cardinality(), 70);
        assert!(bits.get(69));
        assert!(!bits.get(70));
        assert_eq!(FixedBitSet::full(64).cardinality(), 64);
        assert_eq!(FixedBitSet::full(0).cardinality(), 0);
    }

    #[test]
    fn test_set_clear() {
        let mut bits = FixedBitSet::new(10);
        bits.set(3);
        bits.set(9);
        assert!(bits.get(3));
        assert_eq!(bits.cardinality(), 2);
        bits.clear(3);
        assert!(!bits.get(3));
        bits.clear(100);
        assert_eq!(bits.cardinality(), 1);
    }

    #[test]
    #[should_panic]
    fn test_set_out_of_range_panics() {
        FixedBitSet::new(4).set(4);
    }

    #[test]
    fn test_or_iter_and_intersection() {
        let mut matches = FixedBitSet::new(100);
        matches.or_iter([1, 5, 64, 99]);

        let mut live = FixedBitSet::full(100);
        live.clear(5);
        live.clear(99);

        matches.and(&live);
        assert_eq!(matches.iter_ones().collect::<Vec<_>>(), vec![1, 64]);
        assert_eq!(matches.cardinality(), 2);
        assert!(matches.is_subset_of(&live));
        assert!(!live.is_subset_of(&matches));
    }

    #[test]
    fn test_iter_ones_ordered() {
        let mut bits = FixedBitSet::new(200);
        bits.or_iter([199, 0, 128, 63, 64]);
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![0, 63, 64, 128, 199]);
    }
}
