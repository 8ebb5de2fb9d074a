//! Built-in initial conditions.
//!
//! An initial condition maps node coordinates to values and is applied
//! once per DOF during `init`. Vector fields receive the same value in
//! every component unless the condition says otherwise.

use pfield_mesh::{StructuredMesh, MAX_DIM};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Initial value of a field, tagged by `type`.
///
/// ```
/// use pfield_engine::InitialCondition;
///
/// let ic: InitialCondition = serde_json::from_str(
///     r#"{ "type": "precipitate", "center": [0.5, 0.5], "radius": 0.2, "width": 0.02 }"#,
/// ).unwrap();
/// assert!(ic.value_at([0.5, 0.5, 0.0]).unwrap() > 0.99);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InitialCondition {
    /// The same value everywhere.
    Constant {
        /// The value.
        value: f64,
    },
    /// Uniform noise in `[mean - amplitude, mean + amplitude]`, seeded so
    /// every run starts from the same state.
    Noise {
        /// Centre of the distribution.
        mean: f64,
        /// Half-width of the distribution.
        amplitude: f64,
        /// RNG seed.
        #[serde(default)]
        seed: u64,
    },
    /// A smooth spherical precipitate: `inside` within `radius` of
    /// `center`, `outside` beyond, joined by a tanh profile of `width`.
    Precipitate {
        /// Centre coordinates, one per mesh axis.
        center: Vec<f64>,
        /// Sphere radius.
        radius: f64,
        /// Interface half-width.
        width: f64,
        /// Value at the centre.
        #[serde(default = "one")]
        inside: f64,
        /// Value far away.
        #[serde(default)]
        outside: f64,
    },
    /// Linear ramp along one axis, `from` at the low face to `to` at the
    /// high face.
    Ramp {
        /// Axis index.
        axis: usize,
        /// Value at the low face.
        from: f64,
        /// Value at the high face.
        to: f64,
    },
}

fn one() -> f64 {
    1.0
}

impl Default for InitialCondition {
    fn default() -> Self {
        Self::Constant { value: 0.0 }
    }
}

impl InitialCondition {
    /// Check parameters against the mesh dimension.
    pub fn validate(&self, key: &str, dim: usize) -> Result<(), ConfigError> {
        let bad = |reason: String| Err(ConfigError::invalid(key, reason));
        match self {
            Self::Constant { value } if !value.is_finite() => bad(format!("value {value}")),
            Self::Noise {
                mean, amplitude, ..
            } if !(mean.is_finite() && amplitude.is_finite() && *amplitude >= 0.0) => {
                bad(format!("noise mean {mean}, amplitude {amplitude}"))
            }
            Self::Precipitate { center, .. } if center.len() != dim => bad(format!(
                "precipitate center has {} coordinates, mesh is {dim}D",
                center.len()
            )),
            Self::Precipitate { radius, width, .. } if !(*radius >= 0.0 && *width > 0.0) => {
                bad(format!("precipitate radius {radius}, width {width}"))
            }
            Self::Ramp { axis, .. } if *axis >= dim => {
                bad(format!("ramp axis {axis} out of range for {dim}D mesh"))
            }
            _ => Ok(()),
        }
    }

    /// Value at a point, for the variants that depend on position alone.
    ///
    /// Returns `None` for [`Noise`](Self::Noise), which depends on DOF
    /// order, and [`Ramp`](Self::Ramp), which depends on the mesh extent.
    pub fn value_at(&self, x: [f64; MAX_DIM]) -> Option<f64> {
        match self {
            Self::Constant { value } => Some(*value),
            Self::Noise { .. } => None,
            Self::Precipitate {
                center,
                radius,
                width,
                inside,
                outside,
            } => {
                let r = center
                    .iter()
                    .zip(x)
                    .map(|(c, xi)| (xi - c) * (xi - c))
                    .sum::<f64>()
                    .sqrt();
                let s = 0.5 * (1.0 - ((r - radius) / width).tanh());
                Some(outside + (inside - outside) * s)
            }
            Self::Ramp { .. } => None,
        }
    }

    /// Fill a field's DOF vector.
    pub fn fill(&self, mesh: &StructuredMesh, components: usize, values: &mut [f64]) {
        match self {
            Self::Noise {
                mean,
                amplitude,
                seed,
            } => {
                let mut rng = ChaCha8Rng::seed_from_u64(*seed);
                for v in values.iter_mut() {
                    let unit: f64 = rng.random();
                    *v = mean + amplitude * (2.0 * unit - 1.0);
                }
            }
            Self::Ramp { axis, from, to } => {
                let length = mesh.lengths()[*axis];
                for node in 0..mesh.n_nodes() {
                    let t = mesh.node_position(node)[*axis] / length;
                    let v = from + (to - from) * t;
                    values[node * components..(node + 1) * components].fill(v);
                }
            }
            other => {
                for node in 0..mesh.n_nodes() {
                    let v = other.value_at(mesh.node_position(node)).unwrap_or(0.0);
                    values[node * components..(node + 1) * components].fill(v);
                }
            }
        }
    }
}
