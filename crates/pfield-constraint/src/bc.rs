//! Declarative boundary-condition specifications.

use crate::error::ConstraintError;
use pfield_mesh::BoundaryId;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Condition imposed on one component of a field at one boundary.
///
/// Parsed from `ZERO_DERIVATIVE` (alias `NATURAL`), `DIRICHLET: <value>`,
/// `NEUMANN: <value>` or `PERIODIC`, case-insensitively.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum BoundaryCondition {
    /// Zero normal flux; contributes nothing.
    ZeroDerivative,
    /// Fixed value.
    Dirichlet(f64),
    /// Prescribed normal flux, integrated into the right-hand side.
    Neumann(f64),
    /// Identified with the opposite face.
    Periodic,
}

impl BoundaryCondition {
    /// Returns `true` for [`Periodic`](Self::Periodic).
    pub fn is_periodic(self) -> bool {
        matches!(self, Self::Periodic)
    }
}

impl FromStr for BoundaryCondition {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = |reason: &str| ConstraintError::Parse {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let (keyword, arg) = match s.split_once(':') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (s.trim(), None),
        };
        let value = || -> Result<f64, ConstraintError> {
            let text = arg.ok_or_else(|| parse_error("missing value after ':'"))?;
            let v: f64 = text
                .parse()
                .map_err(|_| parse_error("value is not a number"))?;
            if v.is_finite() {
                Ok(v)
            } else {
                Err(parse_error("value must be finite"))
            }
        };
        let bc = match keyword.to_ascii_uppercase().as_str() {
            "ZERO_DERIVATIVE" | "NATURAL" => Self::ZeroDerivative,
            "DIRICHLET" => Self::Dirichlet(value()?),
            "NEUMANN" => Self::Neumann(value()?),
            "PERIODIC" => Self::Periodic,
            _ => return Err(parse_error("unknown condition type")),
        };
        if arg.is_some() && matches!(bc, Self::ZeroDerivative | Self::Periodic) {
            return Err(parse_error("this condition takes no value"));
        }
        Ok(bc)
    }
}

impl TryFrom<String> for BoundaryCondition {
    type Error = ConstraintError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDerivative => f.write_str("ZERO_DERIVATIVE"),
            Self::Dirichlet(v) => write!(f, "DIRICHLET: {v}"),
            Self::Neumann(v) => write!(f, "NEUMANN: {v}"),
            Self::Periodic => f.write_str("PERIODIC"),
        }
    }
}

/// BC specification as written in a parameter file.
///
/// A single condition applies to every boundary and component; a list
/// gives one condition per boundary id (or a single-entry list); a list of
/// lists gives per-component lists for vector fields.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BcSpec {
    /// Same condition everywhere.
    Uniform(BoundaryCondition),
    /// One condition per boundary id, shared by all components.
    PerBoundary(Vec<BoundaryCondition>),
    /// Per component, one condition per boundary id.
    PerComponent(Vec<Vec<BoundaryCondition>>),
}

impl BcSpec {
    /// Expand to a full per-component, per-boundary table.
    pub fn resolve(&self, components: usize, boundaries: usize) -> Result<FieldBc, ConstraintError> {
        let table = match self {
            Self::Uniform(bc) => vec![vec![*bc; boundaries]; components],
            Self::PerBoundary(list) => {
                vec![expand("boundary conditions", list, boundaries)?; components]
            }
            Self::PerComponent(lists) => {
                if lists.len() != components {
                    return Err(ConstraintError::EntryCount {
                        what: "per-component boundary conditions",
                        expected: components,
                        got: lists.len(),
                    });
                }
                lists
                    .iter()
                    .map(|list| expand("component boundary conditions", list, boundaries))
                    .collect::<Result<_, _>>()?
            }
        };
        Ok(FieldBc { table })
    }
}

fn expand(
    what: &'static str,
    list: &[BoundaryCondition],
    boundaries: usize,
) -> Result<Vec<BoundaryCondition>, ConstraintError> {
    match list.len() {
        1 => Ok(vec![list[0]; boundaries]),
        n if n == boundaries => Ok(list.to_vec()),
        got => Err(ConstraintError::EntryCount {
            what,
            expected: boundaries,
            got,
        }),
    }
}

/// A neumann flux term: `value` integrated against the test functions of
/// `component` over `boundary`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeumannFlux {
    /// Field component.
    pub component: usize,
    /// Face the flux acts on.
    pub boundary: BoundaryId,
    /// Flux density.
    pub value: f64,
}

/// Resolved boundary conditions of one field, indexed by component and
/// boundary id.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldBc {
    table: Vec<Vec<BoundaryCondition>>,
}

impl FieldBc {
    /// The same condition on every boundary and component.
    pub fn uniform(bc: BoundaryCondition, components: usize, boundaries: usize) -> Self {
        Self {
            table: vec![vec![bc; boundaries]; components],
        }
    }

    /// Number of field components.
    pub fn components(&self) -> usize {
        self.table.len()
    }

    /// Number of boundaries covered.
    pub fn boundaries(&self) -> usize {
        self.table.first().map_or(0, Vec::len)
    }

    /// Condition for `component` on `boundary`.
    ///
    /// Boundaries outside the table read as [`BoundaryCondition::ZeroDerivative`].
    pub fn get(&self, component: usize, boundary: BoundaryId) -> BoundaryCondition {
        self.table
            .get(component)
            .and_then(|row| row.get(usize::from(boundary.0)))
            .copied()
            .unwrap_or(BoundaryCondition::ZeroDerivative)
    }

    /// Replace one entry.
    pub fn set(&mut self, component: usize, boundary: BoundaryId, bc: BoundaryCondition) {
        if let Some(slot) = self
            .table
            .get_mut(component)
            .and_then(|row| row.get_mut(usize::from(boundary.0)))
        {
            *slot = bc;
        }
    }

    /// Non-zero Neumann terms, ordered by component then boundary.
    pub fn neumann_fluxes(&self) -> Vec<NeumannFlux> {
        let mut out = Vec::new();
        for (component, row) in self.table.iter().enumerate() {
            for (b, bc) in row.iter().enumerate() {
                if let BoundaryCondition::Neumann(value) = *bc {
                    if value != 0.0 {
                        out.push(NeumannFlux {
                            component,
                            boundary: BoundaryId(b as u8),
                            value,
                        });
                    }
                }
            }
        }
        out
    }
}
