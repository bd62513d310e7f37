//! Physical properties carried by every algebra node.
//!
//! A [`TraitSet`] bundles the node's [`Convention`] (which engine executes
//! it), its output [`Collation`] and its [`Distribution`].

use std::fmt;

use federa_core::BackendKind;
use serde::{Deserialize, Serialize};

/// Tag identifying which engine executes a subtree.
///
/// Within one subtree the convention only changes at a
/// [`Converter`](crate::NodeKind::Converter) node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Convention {
    /// Backend-neutral, not executable.
    Logical,
    /// In-process row-at-a-time execution; the universal fallback.
    Enumerable,
    /// Executed natively by one store.
    Adapter { kind: BackendKind, store: String },
}

impl Convention {
    /// Convention for the store named `store` of kind `kind`.
    pub fn adapter(kind: BackendKind, store: impl Into<String>) -> Self {
        Self::Adapter {
            kind,
            store: store.into(),
        }
    }

    /// Whether nodes of this convention can be executed.
    pub fn is_physical(&self) -> bool {
        !matches!(self, Self::Logical)
    }

    /// Backend kind, for adapter conventions.
    pub fn backend(&self) -> Option<BackendKind> {
        match self {
            Self::Adapter { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Store name, for adapter conventions.
    pub fn store(&self) -> Option<&str> {
        match self {
            Self::Adapter { store, .. } => Some(store),
            _ => None,
        }
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logical => write!(f, "LOGICAL"),
            Self::Enumerable => write!(f, "ENUMERABLE"),
            Self::Adapter { kind, store } => write!(f, "{kind}:{store}"),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Placement of NULLs in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullOrder {
    First,
    Last,
}

/// Ordering on one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldCollation {
    pub field: usize,
    pub direction: Direction,
    pub nulls: NullOrder,
}

impl FieldCollation {
    /// Ascending, NULLs last.
    pub fn asc(field: usize) -> Self {
        Self {
            field,
            direction: Direction::Ascending,
            nulls: NullOrder::Last,
        }
    }

    /// Descending, NULLs first.
    pub fn desc(field: usize) -> Self {
        Self {
            field,
            direction: Direction::Descending,
            nulls: NullOrder::First,
        }
    }
}

impl fmt::Display for FieldCollation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.field)?;
        if self.direction == Direction::Descending {
            write!(f, " DESC")?;
        }
        if self.nulls == NullOrder::First {
            write!(f, " NULLS FIRST")?;
        }
        Ok(())
    }
}

/// Ordering of a node's output rows, most significant field first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Collation(pub Vec<FieldCollation>);

impl Collation {
    /// No particular order.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields ordered on.
    pub fn fields(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().map(|c| c.field)
    }

    /// Whether rows in this order are also in `required` order.
    pub fn satisfies(&self, required: &Self) -> bool {
        required.0.len() <= self.0.len() && self.0.iter().zip(&required.0).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "]")
    }
}

/// How rows are spread over execution sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Distribution {
    /// No requirement.
    #[default]
    Any,
    /// All rows at one site.
    Single,
    /// Rows partitioned by a hash of the given fields.
    Hash(Vec<usize>),
    /// Every site holds every row.
    Broadcast,
}

impl Distribution {
    /// Whether this distribution meets `required`.
    pub fn satisfies(&self, required: &Self) -> bool {
        matches!(required, Self::Any) || self == required
    }
}

/// Convention, ordering and distribution of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitSet {
    pub convention: Convention,
    pub collation: Collation,
    pub distribution: Distribution,
}

impl TraitSet {
    /// Trait set with the given convention and no ordering requirement.
    pub fn of(convention: Convention) -> Self {
        Self {
            convention,
            collation: Collation::empty(),
            distribution: Distribution::Any,
        }
    }

    /// Logical convention, no ordering.
    pub fn logical() -> Self {
        Self::of(Convention::Logical)
    }

    /// Enumerable convention, no ordering.
    pub fn enumerable() -> Self {
        Self::of(Convention::Enumerable)
    }

    /// Copy with the convention replaced.
    #[must_use]
    pub fn with_convention(&self, convention: Convention) -> Self {
        Self {
            convention,
            ..self.clone()
        }
    }

    /// Copy with the collation replaced.
    #[must_use]
    pub fn with_collation(&self, collation: Collation) -> Self {
        Self {
            collation,
            ..self.clone()
        }
    }

    /// Whether a node with these traits can stand in where `required` is
    /// requested.
    pub fn satisfies(&self, required: &Self) -> bool {
        self.convention == required.convention
            && self.collation.satisfies(&required.collation)
            && self.distribution.satisfies(&required.distribution)
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.convention)?;
        if !self.collation.is_empty() {
            write!(f, ".{}", self.collation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convention_names() {
        assert_eq!(Convention::Logical.to_string(), "LOGICAL");
        let c = Convention::adapter(BackendKind::WideColumn, "cass1");
        assert_eq!(c.to_string(), "WIDE_COLUMN:cass1");
        assert_eq!(c.store(), Some("cass1"));
        assert!(c.is_physical());
        assert!(!Convention::Logical.is_physical());
    }

    #[test]
    fn test_collation_prefix_satisfies() {
        let ab = Collation(vec![FieldCollation::asc(0), FieldCollation::desc(1)]);
        let a = Collation(vec![FieldCollation::asc(0)]);
        assert!(ab.satisfies(&a));
        assert!(!a.satisfies(&ab));
        assert!(a.satisfies(&Collation::empty()));
        assert_eq!(ab.to_string(), "[$0, $1 DESC NULLS FIRST]");
    }

    #[test]
    fn test_trait_set_satisfies() {
        let sorted = TraitSet::enumerable().with_collation(Collation(vec![FieldCollation::asc(2)]));
        assert!(sorted.satisfies(&TraitSet::enumerable()));
        assert!(!TraitSet::enumerable().satisfies(&sorted));
        assert!(!sorted.satisfies(&TraitSet::logical()));
    }
}
