//! # Component Flags
//!
//! Bitsets over component ids, one bit per id, 64 ids per word.
//!
//! [`ComponentFlagsBuilder`] is the mutable form. It grows on demand because
//! ids are assigned lazily, so a builder may predate some of the types it
//! ends up referencing. [`ComponentFlags`] is the immutable snapshot; trailing
//! zero words are trimmed on build so equal sets compare and hash equal
//! whatever capacity they were built with.

use std::fmt;

use super::component::ComponentId;

const WORD_BITS: usize = 64;

#[inline]
const fn split(id: ComponentId) -> (usize, u64) {
    (id.index() / WORD_BITS, 1u64 << (id.index() % WORD_BITS))
}

fn trimmed(words: &[u64]) -> &[u64] {
    let len = words.iter().rposition(|&w| w != 0).map_or(0, |i| i + 1);
    &words[..len]
}

/// Returns `true` if every bit of `need` is set in `have`.
#[inline]
pub(crate) fn words_superset(have: &[u64], need: &[u64]) -> bool {
    need.iter()
        .enumerate()
        .all(|(i, &w)| have.get(i).copied().unwrap_or(0) & w == w)
}

/// Returns `true` if `a` and `b` share at least one bit.
#[inline]
pub(crate) fn words_intersect(a: &[u64], b: &[u64]) -> bool {
    a.iter().zip(b).any(|(x, y)| x & y != 0)
}

/// Immutable set of component ids.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentFlags {
    words: Box<[u64]>,
}

impl ComponentFlags {
    /// The empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_words(words: &[u64]) -> Self {
        Self {
            words: trimmed(words).into(),
        }
    }

    /// Backing words, lowest ids first. Never ends with a zero word.
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Checks if `id` is in the set.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        let (word, mask) = split(id);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Number of ids in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if no id is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns `true` if every id in `other` is also in `self`.
    #[inline]
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        words_superset(&self.words, &other.words)
    }

    /// Returns `true` if the sets share at least one id.
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        words_intersect(&self.words, &other.words)
    }

    /// Iterates set ids in ascending order.
    pub fn iter(&self) -> FlagIter<'_> {
        FlagIter::new(&self.words)
    }
}

impl fmt::Debug for ComponentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(ComponentId::index)).finish()
    }
}

impl<'a> IntoIterator for &'a ComponentFlags {
    type Item = ComponentId;
    type IntoIter = FlagIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the ids of a bitset, skipping clear words.
pub struct FlagIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    current_word: u64,
}

impl<'a> FlagIter<'a> {
    fn new(words: &'a [u64]) -> Self {
        Self {
            words,
            word_idx: 0,
            current_word: words.first().copied().unwrap_or(0),
        }
    }
}

impl Iterator for FlagIter<'_> {
    type Item = ComponentId;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1;
                #[allow(clippy::cast_possible_truncation)]
                return Some(ComponentId::from_raw((self.word_idx * WORD_BITS + bit) as u32));
            }

            self.word_idx += 1;
            if self.word_idx >= self.words.len() {
                return None;
            }
            self.current_word = self.words[self.word_idx];
        }
    }
}

/// Mutable, auto-growing builder for [`ComponentFlags`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentFlagsBuilder {
    words: Vec<u64>,
}

impl ComponentFlagsBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with room for `bits` ids before reallocating.
    #[must_use]
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(WORD_BITS)],
        }
    }

    /// Starts from an existing set.
    #[must_use]
    pub fn from_flags(flags: &ComponentFlags) -> Self {
        Self {
            words: flags.words().to_vec(),
        }
    }

    /// Sets `id`, growing the backing array if needed.
    #[inline]
    pub fn enable(&mut self, id: ComponentId) -> &mut Self {
        let (word, mask) = split(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= mask;
        self
    }

    /// Clears `id`. Ids past the current capacity are already clear.
    #[inline]
    pub fn disable(&mut self, id: ComponentId) -> &mut Self {
        let (word, mask) = split(id);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !mask;
        }
        self
    }

    /// Checks if `id` is set.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        let (word, mask) = split(id);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Clears every id, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Backing words as currently sized (may end with zero words).
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Iterates set ids in ascending order.
    pub fn iter(&self) -> FlagIter<'_> {
        FlagIter::new(&self.words)
    }

    /// Snapshots the current contents into an immutable set.
    #[must_use]
    pub fn build(&self) -> ComponentFlags {
        ComponentFlags::from_words(&self.words)
    }
}
