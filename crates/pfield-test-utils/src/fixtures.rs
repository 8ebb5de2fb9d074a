//! Reusable equation fixtures.
//!
//! - [`ZeroUpdate`]: explicit, update identically zero.
//! - [`ConstantRate`]: explicit, `du/dt = rate`.
//! - [`NanEquation`]: non-finite after a number of successful calls.
//! - [`DtSensitive`]: non-finite whenever `dt` exceeds a threshold.

use pfield_assembly::{Equation, QuadPoint, Terms};
use pfield_core::{FieldId, FieldSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Explicit equation whose update is identically zero.
pub struct ZeroUpdate {
    pub field: FieldId,
}

impl ZeroUpdate {
    pub fn new(field: FieldId) -> Self {
        Self { field }
    }
}

impl Equation for ZeroUpdate {
    fn name(&self) -> &str {
        "zero_update"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn rhs(&self, _point: &QuadPoint<'_>) -> Terms {
        Terms::zero()
    }
}

/// `du/dt = rate`, optionally plus `coupling · v` for another field `v`.
pub struct ConstantRate {
    pub field: FieldId,
    pub rate: f64,
    pub coupled: Option<(FieldId, f64)>,
}

impl ConstantRate {
    pub fn new(field: FieldId, rate: f64) -> Self {
        Self {
            field,
            rate,
            coupled: None,
        }
    }

    /// Add `coupling · other` to the rate.
    pub fn reading(mut self, other: FieldId, coupling: f64) -> Self {
        self.coupled = Some((other, coupling));
        self
    }
}

impl Equation for ConstantRate {
    fn name(&self) -> &str {
        "constant_rate"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        match self.coupled {
            Some((other, _)) => FieldSet::empty().with(other),
            None => FieldSet::empty(),
        }
    }

    fn rhs(&self, point: &QuadPoint<'_>) -> Terms {
        let extra = self
            .coupled
            .map(|(other, k)| k * point.scalar(other))
            .unwrap_or(0.0);
        Terms::scalar(self.rate + extra, [0.0; 3])
    }
}

/// Produces NaN after `succeed_calls` quadrature-point evaluations.
///
/// Uses `AtomicUsize` for the counter so it satisfies `Sync`.
pub struct NanEquation {
    pub field: FieldId,
    pub succeed_calls: usize,
    calls: AtomicUsize,
}

impl NanEquation {
    /// Always NaN.
    pub fn always(field: FieldId) -> Self {
        Self::after(field, 0)
    }

    /// NaN once `succeed_calls` evaluations have returned finite terms.
    pub fn after(field: FieldId, succeed_calls: usize) -> Self {
        Self {
            field,
            succeed_calls,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `rhs()` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Equation for NanEquation {
    fn name(&self) -> &str {
        "nan"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn rhs(&self, _point: &QuadPoint<'_>) -> Terms {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_calls {
            Terms::scalar(f64::NAN, [0.0; 3])
        } else {
            Terms::zero()
        }
    }
}

/// `du/dt = rate` while `dt ≤ threshold`, NaN otherwise.
///
/// Exercises step-size reduction: a run started above the threshold must
/// retry with a smaller step. With [`from_time`](DtSensitive::from_time)
/// the threshold only applies to steps starting after that time.
pub struct DtSensitive {
    pub field: FieldId,
    pub rate: f64,
    pub threshold: f64,
    pub after: f64,
}

impl DtSensitive {
    pub fn new(field: FieldId, rate: f64, threshold: f64) -> Self {
        Self {
            field,
            rate,
            threshold,
            after: f64::NEG_INFINITY,
        }
    }

    /// Only fail for steps starting after `time`.
    pub fn from_time(mut self, time: f64) -> Self {
        self.after = time;
        self
    }
}

impl Equation for DtSensitive {
    fn name(&self) -> &str {
        "dt_sensitive"
    }

    fn field(&self) -> FieldId {
        self.field
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn rhs(&self, point: &QuadPoint<'_>) -> Terms {
        if point.time() > self.after && point.dt() > self.threshold {
            Terms::scalar(f64::NAN, [0.0; 3])
        } else {
            Terms::scalar(self.rate, [0.0; 3])
        }
    }
}
