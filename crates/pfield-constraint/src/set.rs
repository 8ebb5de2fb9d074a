//! The affine constraint set of one field.

use crate::error::ConstraintError;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// `u[slave] = inhomogeneity + Σ weight · u[master]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineConstraint {
    /// `(master, weight)` pairs; empty for a pure Dirichlet value.
    pub entries: SmallVec<[(usize, f64); 2]>,
    /// Constant term.
    pub inhomogeneity: f64,
}

impl AffineConstraint {
    /// A fixed value.
    pub fn fixed(value: f64) -> Self {
        Self {
            entries: SmallVec::new(),
            inhomogeneity: value,
        }
    }

    /// Returns `true` if the relation has no masters.
    pub fn is_fixed(&self) -> bool {
        self.entries.is_empty()
    }

    fn add_entry(&mut self, master: usize, weight: f64) {
        match self.entries.iter_mut().find(|(m, _)| *m == master) {
            Some((_, w)) => *w += weight,
            None => self.entries.push((master, weight)),
        }
    }
}

/// Constrained DOFs of one field and their affine relations.
///
/// Relations are added with [`add_dirichlet`](Self::add_dirichlet) and
/// [`add_affine`](Self::add_affine), then [`close`](Self::close)d, which
/// substitutes chains so every master is unconstrained. Only a closed set
/// may be applied; applying it is then idempotent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintSet {
    n_dofs: usize,
    lines: BTreeMap<usize, AffineConstraint>,
    closed: bool,
}

impl ConstraintSet {
    /// An empty, closed set over a vector of `n_dofs` entries.
    pub fn new(n_dofs: usize) -> Self {
        Self {
            n_dofs,
            lines: BTreeMap::new(),
            closed: true,
        }
    }

    /// Length of the vectors this set applies to.
    pub fn n_dofs(&self) -> usize {
        self.n_dofs
    }

    /// Number of constrained DOFs.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if no DOF is constrained.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns `true` once chains have been resolved.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns `true` if `dof` is constrained.
    pub fn is_constrained(&self, dof: usize) -> bool {
        self.lines.contains_key(&dof)
    }

    /// The relation constraining `dof`, if any.
    pub fn get(&self, dof: usize) -> Option<&AffineConstraint> {
        self.lines.get(&dof)
    }

    /// Constrained DOFs and their relations in ascending DOF order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &AffineConstraint)> {
        self.lines.iter().map(|(d, c)| (*d, c))
    }

    fn check_dof(&self, dof: usize) -> Result<(), ConstraintError> {
        if dof < self.n_dofs {
            Ok(())
        } else {
            Err(ConstraintError::DofOutOfRange {
                dof,
                n_dofs: self.n_dofs,
            })
        }
    }

    /// Fix `dof` to `value`.
    ///
    /// A second fixed value on the same DOF must agree with the first. A
    /// fixed value replaces a relation to masters, which is how Dirichlet
    /// data wins over a periodic identification at a shared edge.
    pub fn add_dirichlet(&mut self, dof: usize, value: f64) -> Result<(), ConstraintError> {
        self.check_dof(dof)?;
        match self.lines.get(&dof) {
            Some(existing) if existing.is_fixed() => {
                let first = existing.inhomogeneity;
                let scale = 1.0 + first.abs().max(value.abs());
                if (first - value).abs() > 1e-12 * scale {
                    return Err(ConstraintError::ConflictingDirichlet {
                        dof,
                        first,
                        second: value,
                    });
                }
            }
            _ => {
                self.lines.insert(dof, AffineConstraint::fixed(value));
                self.closed = false;
            }
        }
        Ok(())
    }

    /// Constrain `dof` to a linear combination of other DOFs plus a
    /// constant. Fails if `dof` is already constrained.
    pub fn add_affine(
        &mut self,
        dof: usize,
        entries: &[(usize, f64)],
        inhomogeneity: f64,
    ) -> Result<(), ConstraintError> {
        self.check_dof(dof)?;
        for &(master, _) in entries {
            self.check_dof(master)?;
        }
        if self.lines.contains_key(&dof) {
            return Err(ConstraintError::DuplicateConstraint { dof });
        }
        let mut line = AffineConstraint::fixed(inhomogeneity);
        for &(master, weight) in entries {
            line.add_entry(master, weight);
        }
        self.lines.insert(dof, line);
        self.closed = false;
        Ok(())
    }

    /// Resolve chains so that every master is unconstrained.
    ///
    /// Fails with [`ConstraintError::Cycle`] if a chain returns to a DOF
    /// already on it.
    pub fn close(&mut self) -> Result<(), ConstraintError> {
        if self.closed {
            return Ok(());
        }
        let mut resolved = BTreeMap::new();
        for &dof in self.lines.keys() {
            let mut path = Vec::new();
            self.resolve(dof, &mut path, &mut resolved)?;
        }
        self.lines = resolved;
        self.closed = true;
        Ok(())
    }

    fn resolve(
        &self,
        dof: usize,
        path: &mut Vec<usize>,
        resolved: &mut BTreeMap<usize, AffineConstraint>,
    ) -> Result<AffineConstraint, ConstraintError> {
        if let Some(done) = resolved.get(&dof) {
            return Ok(done.clone());
        }
        if path.contains(&dof) {
            return Err(ConstraintError::Cycle { dof });
        }
        let Some(line) = self.lines.get(&dof) else {
            return Ok(AffineConstraint::fixed(0.0));
        };
        path.push(dof);
        let mut flat = AffineConstraint::fixed(line.inhomogeneity);
        for &(master, weight) in &line.entries {
            if self.lines.contains_key(&master) {
                let sub = self.resolve(master, path, resolved)?;
                flat.inhomogeneity += weight * sub.inhomogeneity;
                for &(m, w) in &sub.entries {
                    flat.add_entry(m, weight * w);
                }
            } else {
                flat.add_entry(master, weight);
            }
        }
        path.pop();
        resolved.insert(dof, flat.clone());
        Ok(flat)
    }

    /// Project `values` onto the constrained affine subspace.
    ///
    /// Every constrained entry is overwritten from its masters, which are
    /// never themselves written, so a second application changes nothing.
    pub fn apply(&self, values: &mut [f64]) {
        debug_assert!(self.closed, "constraint set applied before close()");
        debug_assert_eq!(values.len(), self.n_dofs);
        for (&dof, line) in &self.lines {
            values[dof] = line.inhomogeneity
                + line
                    .entries
                    .iter()
                    .map(|&(m, w)| w * values[m])
                    .sum::<f64>();
        }
    }

    /// Like [`apply`](Self::apply) with every inhomogeneity taken as zero.
    ///
    /// Used on corrections and search directions, which must satisfy the
    /// homogeneous constraints only.
    pub fn apply_homogeneous(&self, values: &mut [f64]) {
        debug_assert!(self.closed, "constraint set applied before close()");
        for (&dof, line) in &self.lines {
            values[dof] = line.entries.iter().map(|&(m, w)| w * values[m]).sum();
        }
    }

    /// Fold constrained entries of an assembled vector into their masters
    /// and zero the constrained rows (the transpose of
    /// [`apply_homogeneous`](Self::apply_homogeneous)).
    pub fn condense(&self, rhs: &mut [f64]) {
        debug_assert!(self.closed, "constraint set applied before close()");
        for (&dof, line) in &self.lines {
            let r = rhs[dof];
            rhs[dof] = 0.0;
            for &(m, w) in &line.entries {
                rhs[m] += w * r;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn chains_resolve_to_free_masters() {
        let mut set = ConstraintSet::new(4);
        set.add_affine(3, &[(2, 0.5)], 1.0).unwrap();
        set.add_affine(2, &[(0, 1.0), (1, 1.0)], 0.0).unwrap();
        set.close().unwrap();
        let line = set.get(3).unwrap();
        assert_eq!(line.inhomogeneity, 1.0);
        assert_eq!(line.entries.as_slice(), &[(0, 0.5), (1, 0.5)]);
        let mut v = vec![2.0, 4.0, 0.0, 0.0];
        set.apply(&mut v);
        assert_eq!(v, vec![2.0, 4.0, 6.0, 4.0]);
    }

    #[test]
    fn chain_through_fixed_value_becomes_fixed() {
        let mut set = ConstraintSet::new(3);
        set.add_dirichlet(0, 2.0).unwrap();
        set.add_affine(2, &[(0, 1.0)], 0.0).unwrap();
        set.close().unwrap();
        assert!(set.get(2).unwrap().is_fixed());
        assert_eq!(set.get(2).unwrap().inhomogeneity, 2.0);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut set = ConstraintSet::new(3);
        set.add_affine(0, &[(1, 1.0)], 0.0).unwrap();
        set.add_affine(1, &[(2, 1.0)], 0.0).unwrap();
        set.add_affine(2, &[(0, 1.0)], 0.0).unwrap();
        assert!(matches!(set.close(), Err(ConstraintError::Cycle { .. })));
    }

    #[test]
    fn dirichlet_conflicts_and_duplicates() {
        let mut set = ConstraintSet::new(2);
        set.add_dirichlet(0, 1.0).unwrap();
        set.add_dirichlet(0, 1.0).unwrap();
        assert!(matches!(
            set.add_dirichlet(0, 2.0),
            Err(ConstraintError::ConflictingDirichlet { dof: 0, .. })
        ));
        assert!(matches!(
            set.add_affine(0, &[(1, 1.0)], 0.0),
            Err(ConstraintError::DuplicateConstraint { dof: 0 })
        ));
        assert!(matches!(
            set.add_dirichlet(5, 0.0),
            Err(ConstraintError::DofOutOfRange { dof: 5, n_dofs: 2 })
        ));
    }

    #[test]
    fn condense_is_transpose_of_homogeneous_apply() {
        let mut set = ConstraintSet::new(4);
        set.add_affine(3, &[(0, 0.25), (1, 0.75)], 5.0).unwrap();
        set.add_dirichlet(2, 1.0).unwrap();
        set.close().unwrap();
        let x = [1.0, -2.0, 0.0, 0.0];
        let y = [0.5, 1.5, 3.0, 2.0];
        let mut cx = x;
        set.apply_homogeneous(&mut cx);
        let mut cty = y;
        set.condense(&mut cty);
        let lhs: f64 = cx.iter().zip(&y).map(|(a, b)| a * b).sum();
        let rhs: f64 = x.iter().zip(&cty).map(|(a, b)| a * b).sum();
        assert!((lhs - rhs).abs() < 1e-14);
        assert_eq!(cty[2], 0.0);
        assert_eq!(cty[3], 0.0);
    }

    fn arb_set() -> impl Strategy<Value = ConstraintSet> {
        let n = 12usize;
        prop::collection::vec((0..n, 0..n, -2.0f64..2.0, -1.0f64..1.0, any::<bool>()), 0..8)
            .prop_map(move |lines| {
                let mut set = ConstraintSet::new(n);
                for (slave, master, w, b, fixed) in lines {
                    // Masters always below slaves so no cycle can form.
                    if master >= slave {
                        continue;
                    }
                    let _ = if fixed {
                        set.add_dirichlet(slave, b)
                    } else {
                        set.add_affine(slave, &[(master, w)], b)
                    };
                }
                set.close().unwrap();
                set
            })
    }

    proptest! {
        #[test]
        fn apply_is_idempotent(
            set in arb_set(),
            v in prop::collection::vec(-10.0f64..10.0, 12),
        ) {
            let mut once = v.clone();
            set.apply(&mut once);
            let mut twice = once.clone();
            set.apply(&mut twice);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn applied_vectors_satisfy_every_relation(
            set in arb_set(),
            v in prop::collection::vec(-10.0f64..10.0, 12),
        ) {
            let mut u = v;
            set.apply(&mut u);
            for (dof, line) in set.iter() {
                let expect = line.inhomogeneity
                    + line.entries.iter().map(|&(m, w)| w * u[m]).sum::<f64>();
                prop_assert!((u[dof] - expect).abs() < 1e-12);
                for &(m, _) in &line.entries {
                    prop_assert!(!set.is_constrained(m));
                }
            }
        }
    }
}
