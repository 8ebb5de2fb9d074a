//! Field descriptors, PDE classification, and the [`FieldSet`] bitset.

use crate::id::FieldId;
use std::fmt;
use std::str::FromStr;

/// Tensor rank of a field's finite-element space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldRank {
    /// One degree of freedom per mesh node.
    Scalar,
    /// One degree of freedom per node per spatial dimension.
    Vector,
}

impl FieldRank {
    /// Number of degrees of freedom per node for a mesh of dimension `dim`.
    pub fn components(self, dim: usize) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vector => dim,
        }
    }
}

impl fmt::Display for FieldRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Vector => f.write_str("vector"),
        }
    }
}

impl FromStr for FieldRank {
    type Err = String;

    /// Parses `SCALAR` or `VECTOR`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCALAR" => Ok(Self::Scalar),
            "VECTOR" => Ok(Self::Vector),
            other => Err(format!("unknown field rank '{other}'")),
        }
    }
}

/// How a field's governing equation is advanced in time.
///
/// The stepper selects one update routine per variant, once per field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PdeType {
    /// Forward update `u += dt * M⁻¹ r(u)` against the pre-step snapshot.
    ExplicitTimeDependent,
    /// Nonlinear solve for the new value every step.
    ImplicitTimeDependent,
    /// Nonlinear solve with no time derivative; re-solved every step and
    /// once during initialization.
    TimeIndependent,
}

impl PdeType {
    /// Returns `true` for the variants solved by Newton iteration.
    pub fn is_solved(self) -> bool {
        !matches!(self, Self::ExplicitTimeDependent)
    }
}

impl fmt::Display for PdeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitTimeDependent => f.write_str("EXPLICIT_TIME_DEPENDENT"),
            Self::ImplicitTimeDependent => f.write_str("IMPLICIT_TIME_DEPENDENT"),
            Self::TimeIndependent => f.write_str("TIME_INDEPENDENT"),
        }
    }
}

impl FromStr for PdeType {
    type Err = String;

    /// Parses the upper-case names printed by `Display`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EXPLICIT_TIME_DEPENDENT" => Ok(Self::ExplicitTimeDependent),
            "IMPLICIT_TIME_DEPENDENT" => Ok(Self::ImplicitTimeDependent),
            "TIME_INDEPENDENT" => Ok(Self::TimeIndependent),
            other => Err(format!("unknown PDE type '{other}'")),
        }
    }
}

/// Declaration of a field, fixed for the lifetime of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    /// Unique name, used in parameter files, logs, and checkpoints.
    pub name: String,
    /// Scalar or vector finite-element space.
    pub rank: FieldRank,
    /// Time-integration classification.
    pub pde_type: PdeType,
}

impl FieldDef {
    /// Create a field declaration.
    pub fn new(name: impl Into<String>, rank: FieldRank, pde_type: PdeType) -> Self {
        Self {
            name: name.into(),
            rank,
            pde_type,
        }
    }
}

/// A set of field IDs implemented as a dynamically-sized bitset.
///
/// Equations declare the fields they read through a `FieldSet`, which lets
/// the engine validate the dependency graph before stepping and restrict
/// per-quadrature-point evaluation to the fields actually needed.
#[derive(Clone, Debug, Default)]
pub struct FieldSet {
    words: Vec<u64>,
}

impl FieldSet {
    const WORD_BITS: usize = 64;

    /// Create an empty field set.
    pub fn empty() -> Self {
        Self { words: Vec::new() }
    }

    fn locate(field: FieldId) -> (usize, u64) {
        let i = field.index();
        (i / Self::WORD_BITS, 1u64 << (i % Self::WORD_BITS))
    }

    fn word(&self, i: usize) -> u64 {
        self.words.get(i).copied().unwrap_or(0)
    }

    fn trimmed(mut words: Vec<u64>) -> Self {
        while words.last() == Some(&0) {
            words.pop();
        }
        Self { words }
    }

    /// Insert a field ID into the set.
    pub fn insert(&mut self, field: FieldId) {
        let (w, mask) = Self::locate(field);
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= mask;
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, field: FieldId) -> Self {
        self.insert(field);
        self
    }

    /// Check whether the set contains a field ID.
    pub fn contains(&self, field: FieldId) -> bool {
        let (w, mask) = Self::locate(field);
        self.word(w) & mask != 0
    }

    /// Return the union of two sets (`self | other`).
    pub fn union(&self, other: &Self) -> Self {
        let len = self.words.len().max(other.words.len());
        Self::trimmed((0..len).map(|i| self.word(i) | other.word(i)).collect())
    }

    /// Return the intersection of two sets (`self & other`).
    pub fn intersection(&self, other: &Self) -> Self {
        Self::trimmed(
            self.words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| a & b)
                .collect(),
        )
    }

    /// Return the fields in `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        Self::trimmed(
            self.words
                .iter()
                .enumerate()
                .map(|(i, a)| a & !other.word(i))
                .collect(),
        )
    }

    /// Check whether every field of `self` is also in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.words
            .iter()
            .enumerate()
            .all(|(i, a)| a & !other.word(i) == 0)
    }

    /// Returns `true` if the set contains no fields.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns the number of fields in the set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate over the field IDs in the set, in ascending order.
    pub fn iter(&self) -> FieldSetIter<'_> {
        FieldSetIter {
            words: &self.words,
            index: 0,
            pending: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        let len = self.words.len().max(other.words.len());
        (0..len).all(|i| self.word(i) == other.word(i))
    }
}

impl Eq for FieldSet {}

impl FromIterator<FieldId> for FieldSet {
    fn from_iter<I: IntoIterator<Item = FieldId>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = FieldId;
    type IntoIter = FieldSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over field IDs in a [`FieldSet`], yielding IDs in ascending order.
pub struct FieldSetIter<'a> {
    words: &'a [u64],
    index: usize,
    pending: u64,
}

impl Iterator for FieldSetIter<'_> {
    type Item = FieldId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pending != 0 {
                let bit = self.pending.trailing_zeros() as usize;
                self.pending &= self.pending - 1;
                return Some(FieldId((self.index * FieldSet::WORD_BITS + bit) as u32));
            }
            self.index += 1;
            self.pending = *self.words.get(self.index)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pde_type_names_round_trip() {
        for t in [
            PdeType::ExplicitTimeDependent,
            PdeType::ImplicitTimeDependent,
            PdeType::TimeIndependent,
        ] {
            assert_eq!(t.to_string().parse::<PdeType>(), Ok(t));
        }
        assert_eq!("time_independent".parse(), Ok(PdeType::TimeIndependent));
        assert!("PARABOLIC".parse::<PdeType>().is_err());
        assert_eq!(" Vector ".parse(), Ok(FieldRank::Vector));
    }

    fn arb_field_set() -> impl Strategy<Value = FieldSet> {
        prop::collection::vec(0u32..160, 0..32)
            .prop_map(|ids| ids.into_iter().map(FieldId).collect::<FieldSet>())
    }

    #[test]
    fn vector_rank_follows_mesh_dimension() {
        assert_eq!(FieldRank::Scalar.components(3), 1);
        assert_eq!(FieldRank::Vector.components(2), 2);
        assert_eq!(FieldRank::Vector.components(3), 3);
    }

    #[test]
    fn only_explicit_fields_skip_the_solver() {
        assert!(!PdeType::ExplicitTimeDependent.is_solved());
        assert!(PdeType::ImplicitTimeDependent.is_solved());
        assert!(PdeType::TimeIndependent.is_solved());
    }

    #[test]
    fn iter_crosses_word_boundaries() {
        let set: FieldSet = [0, 63, 64, 130].into_iter().map(FieldId).collect();
        let ids: Vec<u32> = set.iter().map(|f| f.0).collect();
        assert_eq!(ids, vec![0, 63, 64, 130]);
    }

    #[test]
    fn trailing_empty_words_compare_equal() {
        let wide = FieldSet::empty().with(FieldId(100)).with(FieldId(1));
        let narrow = FieldSet::empty().with(FieldId(1));
        assert_eq!(wide.difference(&FieldSet::empty().with(FieldId(100))), narrow);
    }

    proptest! {
        #[test]
        fn union_commutative(a in arb_field_set(), b in arb_field_set()) {
            prop_assert_eq!(a.union(&b), b.union(&a));
        }

        #[test]
        fn intersection_commutative(a in arb_field_set(), b in arb_field_set()) {
            prop_assert_eq!(a.intersection(&b), b.intersection(&a));
        }

        #[test]
        fn union_identity(a in arb_field_set()) {
            prop_assert_eq!(a.union(&FieldSet::empty()), a.clone());
        }

        #[test]
        fn intersection_idempotent(a in arb_field_set()) {
            prop_assert_eq!(a.intersection(&a), a.clone());
        }

        #[test]
        fn difference_removes_common(a in arb_field_set(), b in arb_field_set()) {
            let diff = a.difference(&b);
            for field in diff.iter() {
                prop_assert!(a.contains(field), "diff element {field:?} not in a");
                prop_assert!(!b.contains(field), "diff element {field:?} in b");
            }
        }

        #[test]
        fn distributive_intersection_over_union(
            a in arb_field_set(),
            b in arb_field_set(),
            c in arb_field_set(),
        ) {
            prop_assert_eq!(
                a.intersection(&b.union(&c)),
                a.intersection(&b).union(&a.intersection(&c))
            );
        }

        #[test]
        fn union_is_superset(a in arb_field_set(), b in arb_field_set()) {
            let u = a.union(&b);
            prop_assert!(a.is_subset(&u));
            prop_assert!(b.is_subset(&u));
        }

        #[test]
        fn len_matches_iter_count(a in arb_field_set()) {
            prop_assert_eq!(a.len(), a.iter().count());
        }
    }
}
