//! Parameter-file description of a field's governing equation.

use crate::allen_cahn::AllenCahn;
use crate::cahn_hilliard::{CahnHilliard, ChemicalPotential};
use crate::diffusion::{Diffusion, ImplicitDiffusion};
use crate::error::EquationError;
use crate::frozen::Frozen;
use crate::poisson::Poisson;
use pfield_assembly::Equation;
use pfield_core::{FieldId, PdeType};
use serde::{Deserialize, Serialize};

fn one() -> f64 {
    1.0
}

/// Governing equation of one field, tagged by `model`.
///
/// ```
/// use pfield_equations::EquationSpec;
///
/// let spec: EquationSpec =
///     serde_json::from_str(r#"{ "model": "diffusion", "coefficient": 0.1 }"#).unwrap();
/// assert_eq!(spec.model(), "diffusion");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum EquationSpec {
    /// Zero update.
    Frozen,
    /// Linear diffusion; explicit or backward Euler by PDE type.
    Diffusion {
        /// Diffusion coefficient.
        coefficient: f64,
    },
    /// Steady `-∇·(k∇u) = s`.
    Poisson {
        /// Conductivity `k`.
        #[serde(default = "one")]
        conductivity: f64,
        /// Source `s`.
        #[serde(default)]
        source: f64,
    },
    /// Non-conserved order parameter.
    AllenCahn {
        /// Mobility `M`.
        mobility: f64,
        /// Gradient energy coefficient `κ`.
        kappa: f64,
        /// Double-well height `W`.
        #[serde(default = "one")]
        barrier: f64,
    },
    /// Conserved concentration driven by a chemical potential field.
    CahnHilliard {
        /// Mobility `M`.
        mobility: f64,
        /// Name of the chemical potential field.
        chemical_potential: String,
    },
    /// Chemical potential of a concentration field.
    ChemicalPotential {
        /// Name of the concentration field.
        concentration: String,
        /// Gradient energy coefficient `κ`.
        kappa: f64,
        /// Double-well height `W`.
        #[serde(default = "one")]
        barrier: f64,
    },
}

/// What a model needs to know about the field it is built for.
pub struct BuildContext<'a> {
    /// The governed field.
    pub field: FieldId,
    /// Its name, for error messages.
    pub name: &'a str,
    /// Its PDE classification.
    pub pde_type: PdeType,
    /// DOFs per node.
    pub components: usize,
    /// Mesh dimension.
    pub dim: usize,
    /// Smallest cell edge, for stability limits.
    pub min_spacing: f64,
    /// Resolves other fields by name.
    pub lookup: &'a dyn Fn(&str) -> Option<FieldId>,
}

impl BuildContext<'_> {
    fn resolve(&self, model: &'static str, name: &str) -> Result<FieldId, EquationError> {
        (self.lookup)(name).ok_or_else(|| EquationError::UnknownField {
            model,
            name: name.to_string(),
        })
    }

    fn require(&self, model: &'static str, allowed: &[PdeType]) -> Result<(), EquationError> {
        if allowed.contains(&self.pde_type) {
            Ok(())
        } else {
            Err(EquationError::UnsupportedPdeType {
                model,
                field: self.name.to_string(),
                pde_type: self.pde_type,
            })
        }
    }

    fn scalar_only(&self, model: &'static str) -> Result<(), EquationError> {
        if self.components == 1 {
            Ok(())
        } else {
            Err(EquationError::RankMismatch {
                model,
                field: self.name.to_string(),
                components: self.components,
            })
        }
    }
}

impl EquationSpec {
    /// The `model` tag.
    pub fn model(&self) -> &'static str {
        match self {
            Self::Frozen => "frozen",
            Self::Diffusion { .. } => "diffusion",
            Self::Poisson { .. } => "poisson",
            Self::AllenCahn { .. } => "allen_cahn",
            Self::CahnHilliard { .. } => "cahn_hilliard",
            Self::ChemicalPotential { .. } => "chemical_potential",
        }
    }

    /// Build the equation for `ctx.field`.
    ///
    /// Fails if the model cannot drive a field of that PDE type or rank, a
    /// coupled field name is unknown, or a coefficient is invalid.
    pub fn build(&self, ctx: &BuildContext<'_>) -> Result<Box<dyn Equation>, EquationError> {
        use PdeType::*;
        let model = self.model();
        match self {
            Self::Frozen => {
                ctx.require(model, &[ExplicitTimeDependent])?;
                Ok(Box::new(Frozen::new(ctx.field)))
            }
            Self::Diffusion { coefficient } => match ctx.pde_type {
                ExplicitTimeDependent => Ok(Box::new(
                    Diffusion::new(ctx.field, *coefficient)?
                        .with_components(ctx.components)
                        .with_stability_limit(ctx.min_spacing, ctx.dim),
                )),
                ImplicitTimeDependent => Ok(Box::new(
                    ImplicitDiffusion::new(ctx.field, *coefficient)?
                        .with_components(ctx.components),
                )),
                TimeIndependent => Err(EquationError::UnsupportedPdeType {
                    model,
                    field: ctx.name.to_string(),
                    pde_type: TimeIndependent,
                }),
            },
            Self::Poisson {
                conductivity,
                source,
            } => {
                ctx.require(model, &[TimeIndependent])?;
                ctx.scalar_only(model)?;
                Ok(Box::new(Poisson::new(ctx.field, *conductivity, *source)?))
            }
            Self::AllenCahn {
                mobility,
                kappa,
                barrier,
            } => {
                ctx.require(model, &[ExplicitTimeDependent])?;
                ctx.scalar_only(model)?;
                Ok(Box::new(
                    AllenCahn::new(ctx.field, *mobility, *kappa, *barrier)?
                        .with_stability_limit(ctx.min_spacing, ctx.dim),
                ))
            }
            Self::CahnHilliard {
                mobility,
                chemical_potential,
            } => {
                ctx.require(model, &[ExplicitTimeDependent])?;
                ctx.scalar_only(model)?;
                let mu = ctx.resolve(model, chemical_potential)?;
                Ok(Box::new(CahnHilliard::new(ctx.field, mu, *mobility)?))
            }
            Self::ChemicalPotential {
                concentration,
                kappa,
                barrier,
            } => {
                ctx.require(model, &[TimeIndependent])?;
                ctx.scalar_only(model)?;
                let c = ctx.resolve(model, concentration)?;
                Ok(Box::new(ChemicalPotential::new(
                    ctx.field, c, *kappa, *barrier,
                )?))
            }
        }
    }
}
