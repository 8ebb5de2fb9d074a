//! Precomputed Q1 shape values and gradients.
//!
//! All cells of a [`StructuredMesh`] are congruent axis-aligned boxes, so
//! shape values, physical gradients and `JxW` factors are identical in
//! every cell and are tabulated once per mesh.

use crate::boundary::BoundaryId;
use crate::error::MeshError;
use crate::mesh::{StructuredMesh, MAX_DIM};
use crate::quadrature::TensorQuadrature;

/// Value of local Q1 shape function `l` at reference point `xi`.
fn shape(dim: usize, l: usize, xi: &[f64; MAX_DIM]) -> f64 {
    (0..dim)
        .map(|d| if (l >> d) & 1 == 1 { xi[d] } else { 1.0 - xi[d] })
        .product()
}

/// Physical gradient of local Q1 shape function `l` at `xi`.
fn shape_gradient(dim: usize, l: usize, xi: &[f64; MAX_DIM], h: &[f64; MAX_DIM]) -> [f64; MAX_DIM] {
    let mut g = [0.0; MAX_DIM];
    for (d, gd) in g.iter_mut().enumerate().take(dim) {
        let slope = if (l >> d) & 1 == 1 { 1.0 } else { -1.0 };
        let rest: f64 = (0..dim)
            .filter(|&e| e != d)
            .map(|e| if (l >> e) & 1 == 1 { xi[e] } else { 1.0 - xi[e] })
            .product();
        *gd = slope * rest / h[d];
    }
    g
}

fn spacings(mesh: &StructuredMesh) -> [f64; MAX_DIM] {
    let mut h = [1.0; MAX_DIM];
    for (axis, ha) in h.iter_mut().enumerate().take(mesh.dim()) {
        *ha = mesh.spacing(axis);
    }
    h
}

/// Shape data for cell integrals.
#[derive(Clone, Debug)]
pub struct CellValues {
    dim: usize,
    n_shape: usize,
    points: Vec<[f64; MAX_DIM]>,
    jxw: Vec<f64>,
    values: Vec<f64>,
    gradients: Vec<[f64; MAX_DIM]>,
}

impl CellValues {
    /// Tabulate for `mesh` with `per_axis` Gauss points along each axis.
    pub fn new(mesh: &StructuredMesh, per_axis: usize) -> Result<Self, MeshError> {
        let dim = mesh.dim();
        let n_shape = mesh.nodes_per_cell();
        let rule = TensorQuadrature::gauss(dim, per_axis)?;
        let h = spacings(mesh);
        let cell_volume: f64 = h[..dim].iter().product();

        let mut values = Vec::with_capacity(rule.len() * n_shape);
        let mut gradients = Vec::with_capacity(rule.len() * n_shape);
        for xi in rule.points() {
            for l in 0..n_shape {
                values.push(shape(dim, l, xi));
                gradients.push(shape_gradient(dim, l, xi, &h));
            }
        }
        Ok(Self {
            dim,
            n_shape,
            points: rule.points().to_vec(),
            jxw: rule.weights().iter().map(|w| w * cell_volume).collect(),
            values,
            gradients,
        })
    }

    /// Spatial dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Shape functions per cell.
    pub fn n_shape(&self) -> usize {
        self.n_shape
    }

    /// Quadrature points per cell.
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// Reference coordinates of quadrature point `q`.
    pub fn reference_point(&self, q: usize) -> &[f64; MAX_DIM] {
        &self.points[q]
    }

    /// Quadrature weight times cell volume at `q`.
    pub fn jxw(&self, q: usize) -> f64 {
        self.jxw[q]
    }

    /// Shape function `l` at point `q`.
    pub fn value(&self, l: usize, q: usize) -> f64 {
        self.values[q * self.n_shape + l]
    }

    /// Physical gradient of shape function `l` at point `q`.
    pub fn gradient(&self, l: usize, q: usize) -> &[f64; MAX_DIM] {
        &self.gradients[q * self.n_shape + l]
    }
}

/// Shape data for integrals over one boundary face.
///
/// Values are tabulated for every local node of the adjacent cell; nodes
/// off the face evaluate to zero there.
#[derive(Clone, Debug)]
pub struct FaceValues {
    boundary: BoundaryId,
    n_shape: usize,
    jxw: Vec<f64>,
    values: Vec<f64>,
}

impl FaceValues {
    /// Tabulate the face of `boundary` with `per_axis` Gauss points along
    /// each tangential axis.
    pub fn new(
        mesh: &StructuredMesh,
        boundary: BoundaryId,
        per_axis: usize,
    ) -> Result<Self, MeshError> {
        if usize::from(boundary.0) >= mesh.n_boundaries() {
            return Err(MeshError::UnknownBoundary {
                id: boundary.0,
                count: mesh.n_boundaries(),
            });
        }
        let dim = mesh.dim();
        let normal = boundary.axis();
        let n_shape = mesh.nodes_per_cell();
        let h = spacings(mesh);
        let tangential: Vec<usize> = (0..dim).filter(|&a| a != normal).collect();
        let face_area: f64 = tangential.iter().map(|&a| h[a]).product();
        let rule = TensorQuadrature::gauss(tangential.len(), per_axis)?;

        let mut values = Vec::with_capacity(rule.len() * n_shape);
        for p in rule.points() {
            let mut xi = [0.0; MAX_DIM];
            for (k, &axis) in tangential.iter().enumerate() {
                xi[axis] = p[k];
            }
            xi[normal] = if boundary.is_upper() { 1.0 } else { 0.0 };
            for l in 0..n_shape {
                values.push(shape(dim, l, &xi));
            }
        }
        Ok(Self {
            boundary,
            n_shape,
            jxw: rule.weights().iter().map(|w| w * face_area).collect(),
            values,
        })
    }

    /// The face these values belong to.
    pub fn boundary(&self) -> BoundaryId {
        self.boundary
    }

    /// Quadrature points on the face.
    pub fn n_points(&self) -> usize {
        self.jxw.len()
    }

    /// Quadrature weight times face measure at `q`.
    pub fn jxw(&self, q: usize) -> f64 {
        self.jxw[q]
    }

    /// Shape function `l` of the adjacent cell at face point `q`.
    pub fn value(&self, l: usize, q: usize) -> f64 {
        self.values[q * self.n_shape + l]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_of_unity_and_zero_gradient_sum() {
        let mesh = StructuredMesh::new(&[1.0, 2.0, 0.5], &[3, 4, 2], 1).unwrap();
        let fe = CellValues::new(&mesh, 2).unwrap();
        for q in 0..fe.n_points() {
            let sum: f64 = (0..fe.n_shape()).map(|l| fe.value(l, q)).sum();
            assert!((sum - 1.0).abs() < 1e-14);
            for d in 0..3 {
                let g: f64 = (0..fe.n_shape()).map(|l| fe.gradient(l, q)[d]).sum();
                assert!(g.abs() < 1e-12);
            }
        }
    }

    #[test]
    fn jxw_sums_to_cell_volume() {
        let mesh = StructuredMesh::new(&[1.0, 2.0], &[4, 4], 1).unwrap();
        let fe = CellValues::new(&mesh, 3).unwrap();
        let total: f64 = (0..fe.n_points()).map(|q| fe.jxw(q)).sum();
        assert!((total - 0.125).abs() < 1e-14);
    }

    #[test]
    fn gradients_reproduce_linear_functions() {
        // u = x on a 2D cell of width 0.5: nodal values 0, h, 0, h.
        let mesh = StructuredMesh::new(&[1.0, 1.0], &[2, 2], 1).unwrap();
        let fe = CellValues::new(&mesh, 2).unwrap();
        let nodal = [0.0, 0.5, 0.0, 0.5];
        for q in 0..fe.n_points() {
            let du: f64 = (0..4).map(|l| nodal[l] * fe.gradient(l, q)[0]).sum();
            assert!((du - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn face_values_vanish_off_the_face() {
        let mesh = StructuredMesh::new(&[1.0, 1.0], &[2, 2], 1).unwrap();
        let face = FaceValues::new(&mesh, BoundaryId(1), 2).unwrap();
        let area: f64 = (0..face.n_points()).map(|q| face.jxw(q)).sum();
        assert!((area - 0.5).abs() < 1e-14);
        for q in 0..face.n_points() {
            // Local nodes 0 and 2 sit on the low-x side.
            assert_eq!(face.value(0, q), 0.0);
            assert_eq!(face.value(2, q), 0.0);
            assert!((face.value(1, q) + face.value(3, q) - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn one_dimensional_face_is_a_point() {
        let mesh = StructuredMesh::new(&[1.0], &[4], 1).unwrap();
        let face = FaceValues::new(&mesh, BoundaryId(0), 2).unwrap();
        assert_eq!(face.n_points(), 1);
        assert_eq!(face.jxw(0), 1.0);
        assert_eq!(face.value(0, 0), 1.0);
        assert_eq!(face.value(1, 0), 0.0);
    }
}
