//! Growable bitset keyed by entity index.
//!
//! One bitset per component type records which slots hold a value; the
//! world keeps one more for live entities. Queries AND them a word at a
//! time.

/// A simple bitset wrapped around a `Vec<u64>`.
#[derive(Debug, Default, Clone)]
pub struct EntityBitset {
    words: Vec<u64>,
    ones: usize,
}

impl EntityBitset {
    /// Creates a new, empty bitset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bitset with room for `bits` indices.
    #[must_use]
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(64)),
            ones: 0,
        }
    }

    /// Sets the bit at `index`. Returns `true` if it was previously clear.
    pub fn insert(&mut self, index: u32) -> bool {
        let (word, mask) = Self::locate(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_clear = self.words[word] & mask == 0;
        self.words[word] |= mask;
        if was_clear {
            self.ones += 1;
        }
        was_clear
    }

    /// Clears the bit at `index`. Returns `true` if it was previously set.
    pub fn remove(&mut self, index: u32) -> bool {
        let (word, mask) = Self::locate(index);
        match self.words.get_mut(word) {
            Some(w) if *w & mask != 0 => {
                *w &= !mask;
                self.ones -= 1;
                true
            }
            _ => false,
        }
    }

    /// Returns true if the bit at `index` is set.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        let (word, mask) = Self::locate(index);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Returns the 64-bit block at `word`, or 0 past the end.
    #[inline]
    #[must_use]
    pub fn block(&self, word: usize) -> u64 {
        self.words.get(word).copied().unwrap_or(0)
    }

    /// Number of allocated words.
    #[inline]
    #[must_use]
    pub fn word_len(&self) -> usize {
        self.words.len()
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ones
    }

    /// Whether no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ones == 0
    }

    /// Clears every bit, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
        self.ones = 0;
    }

    /// Iterates over set indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(word, &bits)| BitIter {
            base: (word as u32) * 64,
            bits,
        })
    }

    #[inline]
    const fn locate(index: u32) -> (usize, u64) {
        ((index / 64) as usize, 1 << (index % 64))
    }
}

/// Iterates the set bits of one word.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BitIter {
    pub(crate) base: u32,
    pub(crate) bits: u64,
}

impl Iterator for BitIter {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.bits == 0 {
            return None;
        }
        let offset = self.bits.trailing_zeros();
        self.bits &= self.bits - 1;
        Some(self.base + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut set = EntityBitset::new();
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(130));
        assert!(set.contains(3));
        assert!(set.contains(130));
        assert!(!set.contains(4));
        assert!(!set.contains(10_000));
        assert_eq!(set.len(), 2);

        assert!(set.remove(3));
        assert!(!set.remove(3));
        assert!(!set.remove(9_999));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_iter_ascending() {
        let mut set = EntityBitset::new();
        for i in [200, 0, 63, 64, 5] {
            set.insert(i);
        }
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 5, 63, 64, 200]);
    }

    #[test]
    fn test_block_past_end_is_zero() {
        let mut set = EntityBitset::new();
        set.insert(1);
        assert_eq!(set.block(0), 0b10);
        assert_eq!(set.block(5), 0);
    }

    #[test]
    fn test_clear() {
        let mut set = EntityBitset::with_capacity(128);
        set.insert(70);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(70));
    }
}
