//! Immutable set of small non-negative integers, used for column sets.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Immutable bit set of column ordinals.
///
/// Backed by 64-bit words with trailing zero words trimmed, so two sets with
/// the same members are always structurally equal. Mutating operations return
/// a new set.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set containing exactly `bits`.
    pub fn of(bits: impl IntoIterator<Item = usize>) -> Self {
        let mut words = Vec::new();
        for bit in bits {
            let word = bit / WORD_BITS;
            if words.len() <= word {
                words.resize(word + 1, 0);
            }
            words[word] |= 1u64 << (bit % WORD_BITS);
        }
        Self::trimmed(words)
    }

    /// Set `{0, 1, ..., n - 1}`.
    pub fn range(n: usize) -> Self {
        Self::of(0..n)
    }

    fn trimmed(mut words: Vec<u64>) -> Self {
        while words.last() == Some(&0) {
            words.pop();
        }
        Self { words }
    }

    /// Whether `bit` is a member.
    pub fn contains(&self, bit: usize) -> bool {
        self.words
            .get(bit / WORD_BITS)
            .is_some_and(|w| w & (1u64 << (bit % WORD_BITS)) != 0)
    }

    /// Whether every member of `other` is a member of `self`.
    pub fn contains_all(&self, other: &Self) -> bool {
        other.words.iter().enumerate().all(|(i, w)| {
            let mine = self.words.get(i).copied().unwrap_or(0);
            w & !mine == 0
        })
    }

    /// Number of members.
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Copy with `bit` added.
    pub fn with(&self, bit: usize) -> Self {
        let mut words = self.words.clone();
        let word = bit / WORD_BITS;
        if words.len() <= word {
            words.resize(word + 1, 0);
        }
        words[word] |= 1u64 << (bit % WORD_BITS);
        Self { words }
    }

    /// Copy with `bit` removed.
    pub fn without(&self, bit: usize) -> Self {
        let mut words = self.words.clone();
        if let Some(w) = words.get_mut(bit / WORD_BITS) {
            *w &= !(1u64 << (bit % WORD_BITS));
        }
        Self::trimmed(words)
    }

    /// Set union.
    pub fn union(&self, other: &Self) -> Self {
        let len = self.words.len().max(other.words.len());
        let words = (0..len)
            .map(|i| self.word(i) | other.word(i))
            .collect();
        Self::trimmed(words)
    }

    /// Set intersection.
    pub fn intersect(&self, other: &Self) -> Self {
        let len = self.words.len().min(other.words.len());
        let words = (0..len).map(|i| self.word(i) & other.word(i)).collect();
        Self::trimmed(words)
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let words = (0..self.words.len())
            .map(|i| self.word(i) & !other.word(i))
            .collect();
        Self::trimmed(words)
    }

    fn word(&self, i: usize) -> u64 {
        self.words.get(i).copied().unwrap_or(0)
    }

    /// Smallest member, if any.
    pub fn first(&self) -> Option<usize> {
        self.next_set_bit(0)
    }

    /// Largest member, if any.
    pub fn last(&self) -> Option<usize> {
        let (i, w) = self.words.iter().enumerate().rev().find(|(_, w)| **w != 0)?;
        Some(i * WORD_BITS + (WORD_BITS - 1 - w.leading_zeros() as usize))
    }

    /// Smallest member that is `>= from`.
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        let mut word_index = from / WORD_BITS;
        let mut word = self.words.get(word_index)? & (u64::MAX << (from % WORD_BITS));
        loop {
            if word != 0 {
                return Some(word_index * WORD_BITS + word.trailing_zeros() as usize);
            }
            word_index += 1;
            word = *self.words.get(word_index)?;
        }
    }

    /// Members in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
            next: 0,
        }
    }

    /// Members in ascending order, collected.
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// Position of `bit` among the members (its rank), if it is a member.
    pub fn index_of(&self, bit: usize) -> Option<usize> {
        if !self.contains(bit) {
            return None;
        }
        Some(self.iter().take_while(|&b| b < bit).count())
    }

    /// Lexicographic comparison of the ascending member sequences, where an
    /// exhausted sequence sorts first: `{} < {0} < {0, 1} < {0, 1, 3} < {1} < {2}`.
    pub fn lexicographic_cmp(&self, other: &Self) -> Ordering {
        let mut from = 0;
        loop {
            let a = self.next_set_bit(from);
            let b = other.next_set_bit(from);
            match (a, b) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(x), Some(y)) if x != y => return x.cmp(&y),
                (Some(x), Some(_)) => from = x + 1,
            }
        }
    }

    /// Ordering used for grouping sets: enclosing sets come first, and sets
    /// that do not contain one another fall back to
    /// [`lexicographic_cmp`](Self::lexicographic_cmp).
    ///
    /// For `{0, 1}` this orders the four subsets as
    /// `{0, 1}, {0}, {1}, {}`.
    pub fn grouping_cmp(&self, other: &Self) -> Ordering {
        if self == other {
            Ordering::Equal
        } else if self.contains_all(other) {
            Ordering::Less
        } else if other.contains_all(self) {
            Ordering::Greater
        } else {
            self.lexicographic_cmp(other)
        }
    }

    /// All subsets of this set, in grouping order.
    pub fn power_set(&self) -> Vec<Self> {
        let members = self.to_vec();
        let mut subsets: Vec<Self> = (0u64..(1u64 << members.len()))
            .map(|mask| {
                Self::of(
                    members
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1u64 << i) != 0)
                        .map(|(_, &b)| b),
                )
            })
            .collect();
        subsets.sort_by(Self::grouping_cmp);
        subsets
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self::of(iter)
    }
}

/// Iterator over the members of a [`BitSet`].
pub struct BitSetIter<'a> {
    set: &'a BitSet,
    next: usize,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let bit = self.set.next_set_bit(self.next)?;
        self.next = bit + 1;
        Some(bit)
    }
}

impl fmt::Display for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, b) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{b}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let set = BitSet::of([0, 3, 70]);
        assert!(set.contains(0));
        assert!(set.contains(70));
        assert!(!set.contains(1));
        assert_eq!(set.cardinality(), 3);
        assert_eq!(set.to_vec(), vec![0, 3, 70]);
        assert_eq!(set.first(), Some(0));
        assert_eq!(set.last(), Some(70));
    }

    #[test]
    fn test_structural_equality_after_removal() {
        let a = BitSet::of([1, 100]).without(100);
        assert_eq!(a, BitSet::of([1]));
        assert!(BitSet::of([5]).without(5).is_empty());
    }

    #[test]
    fn test_set_algebra() {
        let a = BitSet::of([0, 1, 2]);
        let b = BitSet::of([1, 2, 3]);
        assert_eq!(a.union(&b), BitSet::range(4));
        assert_eq!(a.intersect(&b), BitSet::of([1, 2]));
        assert_eq!(a.difference(&b), BitSet::of([0]));
        assert!(a.contains_all(&BitSet::of([0, 2])));
        assert!(!a.contains_all(&b));
        assert!(a.contains_all(&BitSet::empty()));
    }

    #[test]
    fn test_index_of() {
        let set = BitSet::of([2, 5, 9]);
        assert_eq!(set.index_of(5), Some(1));
        assert_eq!(set.index_of(4), None);
    }

    #[test]
    fn test_lexicographic_order() {
        let mut sets = vec![
            BitSet::of([2]),
            BitSet::of([1]),
            BitSet::of([0, 1, 3]),
            BitSet::empty(),
            BitSet::of([0, 1]),
            BitSet::of([0]),
        ];
        sets.sort_by(BitSet::lexicographic_cmp);
        let rendered: Vec<String> = sets.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["{}", "{0}", "{0, 1}", "{0, 1, 3}", "{1}", "{2}"]
        );
    }

    #[test]
    fn test_grouping_order() {
        let subsets = BitSet::of([0, 1]).power_set();
        assert_eq!(
            subsets,
            vec![
                BitSet::of([0, 1]),
                BitSet::of([0]),
                BitSet::of([1]),
                BitSet::empty()
            ]
        );
    }
}
