//! Equation-set validation and stepping plan.
//!
//! [`validate_equations`] runs once after fields are declared to check the
//! equation list for structural errors and build the [`EquationPlan`]: which
//! equation governs each field, and the order explicit and solved fields
//! are advanced in.

use crate::equation::Equation;
use indexmap::IndexMap;
use pfield_core::{ErrorKind, FieldDef, FieldId, PdeType};
use thiserror::Error;

// ── Plan ───────────────────────────────────────────────────────────

/// Which equation governs each field, and in what order fields advance.
///
/// Both orders follow field declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct EquationPlan {
    /// `governing[field]` indexes the equation list.
    governing: Vec<usize>,
    explicit: Vec<FieldId>,
    solved: Vec<FieldId>,
}

impl EquationPlan {
    /// Index into the equation list of the equation governing `field`.
    pub fn equation_for(&self, field: FieldId) -> Option<usize> {
        self.governing.get(field.index()).copied()
    }

    /// Explicit fields in declaration order.
    pub fn explicit(&self) -> &[FieldId] {
        &self.explicit
    }

    /// Implicit and time-independent fields in declaration order.
    pub fn solved(&self) -> &[FieldId] {
        &self.solved
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from equation-set validation (build time, not per step).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// No fields declared.
    #[error("no fields declared")]
    EmptyPipeline,

    /// Two equations govern the same field.
    #[error("field {field} governed by both '{first}' and '{second}'")]
    DuplicateEquation {
        /// The contested field.
        field: FieldId,
        /// Earlier equation.
        first: String,
        /// Later equation.
        second: String,
    },

    /// A declared field has no governing equation.
    #[error("field '{name}' has no governing equation")]
    MissingEquation {
        /// Name of the field.
        name: String,
    },

    /// An equation references a field that was never declared.
    #[error("equation '{equation}' references undefined field {field}")]
    UndefinedField {
        /// Which equation.
        equation: String,
        /// The missing field.
        field: FieldId,
    },

    /// The configured dt exceeds an equation's `max_dt`.
    #[error("dt {configured_dt} exceeds max_dt {max_supported} (constrained by '{constraining_equation}')")]
    DtTooLarge {
        /// The requested dt.
        configured_dt: f64,
        /// The tightest `max_dt`.
        max_supported: f64,
        /// Which equation imposes it.
        constraining_equation: String,
    },

    /// The configured dt is NaN, infinite, zero, or negative.
    #[error("dt must be finite and positive, got {value}")]
    InvalidDt {
        /// The invalid value.
        value: f64,
    },

    /// An equation's `max_dt()` is non-finite or non-positive.
    #[error("equation '{equation}' returned invalid max_dt: {value} (must be finite and positive)")]
    InvalidMaxDt {
        /// Which equation.
        equation: String,
        /// The invalid value.
        value: f64,
    },
}

impl PipelineError {
    /// Classification for the driver.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

// ── Validation ─────────────────────────────────────────────────────

/// Validate the equation set against the declared fields and build the
/// [`EquationPlan`].
///
/// Checks, in order:
///
/// 1. `dt` is finite and positive.
/// 2. At least one field is declared.
/// 3. Every equation governs a declared field, and no field has two.
/// 4. Every declared field has an equation.
/// 5. Every read references a declared field.
/// 6. `dt <= min(max_dt)`.
///
/// Takes owned or borrowed equations, so a caller can validate before
/// giving them up.
pub fn validate_equations<E: AsRef<dyn Equation>>(
    equations: &[E],
    fields: &[FieldDef],
    dt: f64,
) -> Result<EquationPlan, PipelineError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(PipelineError::InvalidDt { value: dt });
    }
    if fields.is_empty() {
        return Err(PipelineError::EmptyPipeline);
    }
    let defined = |f: FieldId| f.index() < fields.len();

    let mut governing: IndexMap<FieldId, usize> = IndexMap::new();
    for (i, eq) in equations.iter().enumerate() {
        let eq = eq.as_ref();
        let field = eq.field();
        if !defined(field) {
            return Err(PipelineError::UndefinedField {
                equation: eq.name().to_string(),
                field,
            });
        }
        if let Some(&j) = governing.get(&field) {
            return Err(PipelineError::DuplicateEquation {
                field,
                first: equations[j].as_ref().name().to_string(),
                second: eq.name().to_string(),
            });
        }
        governing.insert(field, i);
    }

    let mut by_field = Vec::with_capacity(fields.len());
    let mut explicit = Vec::new();
    let mut solved = Vec::new();
    for (index, def) in fields.iter().enumerate() {
        let id = FieldId(index as u32);
        let Some(&eq_index) = governing.get(&id) else {
            return Err(PipelineError::MissingEquation {
                name: def.name.clone(),
            });
        };
        by_field.push(eq_index);
        match def.pde_type {
            PdeType::ExplicitTimeDependent => explicit.push(id),
            PdeType::ImplicitTimeDependent | PdeType::TimeIndependent => solved.push(id),
        }
    }

    for eq in equations.iter().map(AsRef::as_ref) {
        for field in eq.reads().iter().chain(eq.reads_previous().iter()) {
            if !defined(field) {
                return Err(PipelineError::UndefinedField {
                    equation: eq.name().to_string(),
                    field,
                });
            }
        }
    }

    let mut min_max_dt = f64::INFINITY;
    let mut constraining = String::new();
    for eq in equations.iter().map(AsRef::as_ref) {
        if let Some(max) = eq.max_dt() {
            if !max.is_finite() || max <= 0.0 {
                return Err(PipelineError::InvalidMaxDt {
                    equation: eq.name().to_string(),
                    value: max,
                });
            }
            if max < min_max_dt {
                min_max_dt = max;
                constraining = eq.name().to_string();
            }
        }
    }
    if dt > min_max_dt {
        return Err(PipelineError::DtTooLarge {
            configured_dt: dt,
            max_supported: min_max_dt,
            constraining_equation: constraining,
        });
    }

    Ok(EquationPlan {
        governing: by_field,
        explicit,
        solved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{QuadPoint, Terms};
    use pfield_core::{FieldRank, FieldSet};

    struct Stub {
        name: &'static str,
        field: u32,
        reads: &'static [u32],
        max_dt: Option<f64>,
    }

    impl Equation for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn field(&self) -> FieldId {
            FieldId(self.field)
        }
        fn reads(&self) -> FieldSet {
            self.reads.iter().map(|&f| FieldId(f)).collect()
        }
        fn rhs(&self, _q: &QuadPoint<'_>) -> Terms {
            Terms::zero()
        }
        fn max_dt(&self) -> Option<f64> {
            self.max_dt
        }
    }

    fn eq(name: &'static str, field: u32, reads: &'static [u32]) -> Box<dyn Equation> {
        Box::new(Stub {
            name,
            field,
            reads,
            max_dt: None,
        })
    }

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("c", FieldRank::Scalar, PdeType::ExplicitTimeDependent),
            FieldDef::new("mu", FieldRank::Scalar, PdeType::TimeIndependent),
            FieldDef::new("eta", FieldRank::Scalar, PdeType::ExplicitTimeDependent),
        ]
    }

    #[test]
    fn plan_orders_fields_by_declaration() {
        let eqs = vec![eq("mu", 1, &[0]), eq("eta", 2, &[]), eq("c", 0, &[1])];
        let plan = validate_equations(&eqs, &fields(), 0.1).unwrap();
        assert_eq!(plan.explicit(), &[FieldId(0), FieldId(2)]);
        assert_eq!(plan.solved(), &[FieldId(1)]);
        assert_eq!(plan.equation_for(FieldId(0)), Some(2));
        assert_eq!(plan.equation_for(FieldId(1)), Some(0));
    }

    #[test]
    fn duplicate_and_missing_equations() {
        let eqs = vec![eq("a", 0, &[]), eq("b", 0, &[]), eq("c", 1, &[])];
        assert!(matches!(
            validate_equations(&eqs, &fields(), 0.1),
            Err(PipelineError::DuplicateEquation { field: FieldId(0), .. })
        ));
        let eqs = vec![eq("a", 0, &[]), eq("b", 1, &[])];
        assert_eq!(
            validate_equations(&eqs, &fields(), 0.1),
            Err(PipelineError::MissingEquation { name: "eta".into() })
        );
    }

    #[test]
    fn undefined_reads_are_rejected() {
        let eqs = vec![eq("a", 0, &[]), eq("b", 1, &[7]), eq("c", 2, &[])];
        assert!(matches!(
            validate_equations(&eqs, &fields(), 0.1),
            Err(PipelineError::UndefinedField { field: FieldId(7), .. })
        ));
    }

    #[test]
    fn borrowed_equations_validate_like_owned_ones() {
        let eqs = vec![eq("mu", 1, &[0]), eq("eta", 2, &[]), eq("c", 0, &[1])];
        let borrowed: Vec<&Box<dyn Equation>> = eqs.iter().collect();
        assert_eq!(
            validate_equations(&borrowed, &fields(), 0.1),
            validate_equations(&eqs, &fields(), 0.1)
        );
    }

    #[test]
    fn dt_limits() {
        let mut eqs = vec![eq("a", 0, &[]), eq("b", 1, &[])];
        eqs.push(Box::new(Stub {
            name: "stiff",
            field: 2,
            reads: &[],
            max_dt: Some(0.01),
        }));
        assert!(matches!(
            validate_equations(&eqs, &fields(), 0.1),
            Err(PipelineError::DtTooLarge { ref constraining_equation, .. })
                if constraining_equation == "stiff"
        ));
        assert!(validate_equations(&eqs, &fields(), 0.01).is_ok());
        assert!(matches!(
            validate_equations(&eqs, &fields(), f64::NAN),
            Err(PipelineError::InvalidDt { .. })
        ));
        assert_eq!(
            validate_equations::<Box<dyn Equation>>(&[], &[], 0.1),
            Err(PipelineError::EmptyPipeline)
        );
    }
}
