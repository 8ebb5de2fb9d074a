//! Gauss–Legendre tensor-product quadrature on the unit hypercube.

use crate::error::MeshError;

/// One-dimensional Gauss–Legendre rule on `[0, 1]` as `(points, weights)`.
fn gauss_legendre_1d(points: usize) -> Result<(Vec<f64>, Vec<f64>), MeshError> {
    // Tabulated on [-1, 1]; mapped below.
    let (xs, ws): (&[f64], &[f64]) = match points {
        1 => (&[0.0], &[2.0]),
        2 => {
            const A: f64 = 0.577_350_269_189_625_8;
            (&[-A, A], &[1.0, 1.0])
        }
        3 => {
            const A: f64 = 0.774_596_669_241_483_4;
            (&[-A, 0.0, A], &[5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0])
        }
        4 => {
            const A: f64 = 0.861_136_311_594_052_6;
            const B: f64 = 0.339_981_043_584_856_3;
            const WA: f64 = 0.347_854_845_137_453_9;
            const WB: f64 = 0.652_145_154_862_546_1;
            (&[-A, -B, B, A], &[WA, WB, WB, WA])
        }
        _ => return Err(MeshError::UnsupportedQuadrature { points }),
    };
    Ok((
        xs.iter().map(|x| 0.5 * (x + 1.0)).collect(),
        ws.iter().map(|w| 0.5 * w).collect(),
    ))
}

/// A tensor-product rule on `[0, 1]^dim`.
///
/// Points are stored as `[f64; 3]` with unused axes set to zero, ordered
/// with the x index varying fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorQuadrature {
    points: Vec<[f64; 3]>,
    weights: Vec<f64>,
}

impl TensorQuadrature {
    /// Gauss–Legendre rule with `per_axis` points along each of `dim` axes.
    ///
    /// A zero-dimensional rule is the single point at the origin with unit
    /// weight, which is what a face of a 1D mesh integrates over.
    pub fn gauss(dim: usize, per_axis: usize) -> Result<Self, MeshError> {
        let (xs, ws) = gauss_legendre_1d(per_axis)?;
        let mut points = vec![[0.0; 3]];
        let mut weights = vec![1.0];
        for axis in 0..dim {
            let mut next_points = Vec::with_capacity(points.len() * xs.len());
            let mut next_weights = Vec::with_capacity(points.len() * xs.len());
            for (x, w) in xs.iter().zip(&ws) {
                for (p, pw) in points.iter().zip(&weights) {
                    let mut q = *p;
                    q[axis] = *x;
                    next_points.push(q);
                    next_weights.push(pw * w);
                }
            }
            points = next_points;
            weights = next_weights;
        }
        Ok(Self { points, weights })
    }

    /// Number of quadrature points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; every rule has at least one point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reference-cell points.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Weights, summing to one.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_unit_volume() {
        for dim in 0..=3 {
            for n in 1..=4 {
                let q = TensorQuadrature::gauss(dim, n).unwrap();
                assert_eq!(q.len(), n.pow(dim as u32));
                let total: f64 = q.weights().iter().sum();
                assert!((total - 1.0).abs() < 1e-14, "dim {dim} n {n}: {total}");
            }
        }
    }

    #[test]
    fn two_points_integrate_cubics_exactly() {
        let q = TensorQuadrature::gauss(1, 2).unwrap();
        let integral: f64 = q
            .points()
            .iter()
            .zip(q.weights())
            .map(|(p, w)| w * p[0].powi(3))
            .sum();
        assert!((integral - 0.25).abs() < 1e-15);
    }

    #[test]
    fn x_varies_fastest() {
        let q = TensorQuadrature::gauss(2, 2).unwrap();
        assert!(q.points()[0][0] < q.points()[1][0]);
        assert_eq!(q.points()[0][1], q.points()[1][1]);
    }

    #[test]
    fn rejects_untabulated_orders() {
        assert!(matches!(
            TensorQuadrature::gauss(2, 5),
            Err(MeshError::UnsupportedQuadrature { points: 5 })
        ));
    }
}
