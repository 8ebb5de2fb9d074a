//! Derivation of a field's constraint set from its boundary conditions.

use crate::bc::{BoundaryCondition, FieldBc};
use crate::error::ConstraintError;
use crate::set::ConstraintSet;
use pfield_mesh::{BoundaryId, StructuredMesh, MAX_DIM};

/// Build the closed constraint set for a field with `bc.components()`
/// components per node.
///
/// Periodic axes identify every node on the high face with its image on
/// the low face. Dirichlet faces then fix their nodes, in boundary-id
/// order; a node shared by two Dirichlet faces must receive the same value
/// from both.
///
/// # Errors
///
/// - [`ConstraintError::PeriodicMismatch`] when only one face of an axis
///   is periodic.
/// - [`ConstraintError::DirichletOnPeriodic`] when a Dirichlet face is
///   paired with a periodic one.
/// - [`ConstraintError::ConflictingDirichlet`] on contradictory values at
///   a shared node.
/// - [`ConstraintError::EntryCount`] when `bc` does not cover every
///   boundary of the mesh.
pub fn build_constraints(
    mesh: &StructuredMesh,
    bc: &FieldBc,
) -> Result<ConstraintSet, ConstraintError> {
    if bc.boundaries() != mesh.n_boundaries() {
        return Err(ConstraintError::EntryCount {
            what: "boundary conditions",
            expected: mesh.n_boundaries(),
            got: bc.boundaries(),
        });
    }
    let ncomp = bc.components();
    let mut set = ConstraintSet::new(mesh.n_dofs(ncomp));

    for c in 0..ncomp {
        let periodic = periodic_axes(mesh.dim(), bc, c)?;
        if periodic.iter().any(|&p| p) {
            for node in 0..mesh.n_nodes() {
                let image = mesh.periodic_image(node, periodic);
                if image != node {
                    set.add_affine(node * ncomp + c, &[(image * ncomp + c, 1.0)], 0.0)?;
                }
            }
        }
        for boundary in BoundaryId::all(mesh.dim()) {
            if let BoundaryCondition::Dirichlet(value) = bc.get(c, boundary) {
                for node in mesh.boundary_nodes(boundary)? {
                    set.add_dirichlet(node * ncomp + c, value)?;
                }
            }
        }
    }

    set.close()?;
    Ok(set)
}

fn periodic_axes(
    dim: usize,
    bc: &FieldBc,
    component: usize,
) -> Result<[bool; MAX_DIM], ConstraintError> {
    let mut periodic = [false; MAX_DIM];
    for (axis, flag) in periodic.iter_mut().enumerate().take(dim) {
        let low = bc.get(component, BoundaryId::new(axis, false));
        let high = bc.get(component, BoundaryId::new(axis, true));
        match (low, high) {
            (BoundaryCondition::Periodic, BoundaryCondition::Periodic) => *flag = true,
            (BoundaryCondition::Periodic, BoundaryCondition::Dirichlet(_)) => {
                return Err(ConstraintError::DirichletOnPeriodic {
                    component,
                    boundary: BoundaryId::new(axis, true),
                })
            }
            (BoundaryCondition::Dirichlet(_), BoundaryCondition::Periodic) => {
                return Err(ConstraintError::DirichletOnPeriodic {
                    component,
                    boundary: BoundaryId::new(axis, false),
                })
            }
            (a, b) if a.is_periodic() || b.is_periodic() => {
                return Err(ConstraintError::PeriodicMismatch { component, axis })
            }
            _ => {}
        }
    }
    Ok(periodic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::BcSpec;
    use crate::bc::BoundaryCondition::*;

    fn mesh2d(n: usize) -> StructuredMesh {
        StructuredMesh::new(&[1.0, 1.0], &[n, n], 1).unwrap()
    }

    fn spec(list: &[BoundaryCondition], ncomp: usize) -> FieldBc {
        BcSpec::PerBoundary(list.to_vec()).resolve(ncomp, list.len()).unwrap()
    }

    #[test]
    fn dirichlet_faces_fix_their_nodes() {
        let mesh = mesh2d(4);
        let bc = spec(&[Dirichlet(0.0), Dirichlet(1.0), ZeroDerivative, ZeroDerivative], 1);
        let set = build_constraints(&mesh, &bc).unwrap();
        assert_eq!(set.len(), 10);
        let mut u = vec![0.5; mesh.n_dofs(1)];
        set.apply(&mut u);
        for node in mesh.boundary_nodes(BoundaryId(1)).unwrap() {
            assert_eq!(u[node], 1.0);
        }
        assert_eq!(u[6], 0.5);
    }

    #[test]
    fn fully_periodic_square_maps_corners_to_origin() {
        let mesh = mesh2d(3);
        let set = build_constraints(&mesh, &FieldBc::uniform(Periodic, 1, 4)).unwrap();
        // 4x4 nodes, 7 on the high faces.
        assert_eq!(set.len(), 7);
        let corner = mesh.n_nodes() - 1;
        assert_eq!(set.get(corner).unwrap().entries.as_slice(), &[(0, 1.0)]);
        let mut u: Vec<f64> = (0..mesh.n_nodes()).map(|i| i as f64).collect();
        set.apply(&mut u);
        assert_eq!(u[corner], 0.0);
        assert_eq!(u[3], 0.0);
        assert_eq!(u[7], 4.0);
    }

    #[test]
    fn vector_components_are_constrained_independently() {
        let mesh = mesh2d(2);
        let mut bc = FieldBc::uniform(ZeroDerivative, 2, 4);
        bc.set(1, BoundaryId(2), Dirichlet(-1.0));
        let set = build_constraints(&mesh, &bc).unwrap();
        assert_eq!(set.len(), 3);
        for node in mesh.boundary_nodes(BoundaryId(2)).unwrap() {
            assert!(!set.is_constrained(2 * node));
            assert_eq!(set.get(2 * node + 1).unwrap().inhomogeneity, -1.0);
        }
    }

    #[test]
    fn dirichlet_wins_over_periodic_edge() {
        let mesh = mesh2d(2);
        let bc = spec(&[Periodic, Periodic, Dirichlet(2.0), ZeroDerivative], 1);
        let set = build_constraints(&mesh, &bc).unwrap();
        // Node 2 is on x-max and y-min: fixed, not slaved.
        assert!(set.get(2).unwrap().is_fixed());
        assert_eq!(set.get(5).unwrap().entries.as_slice(), &[(3, 1.0)]);
    }

    #[test]
    fn contradictory_corner_values_fail() {
        let mesh = mesh2d(2);
        let bc = spec(&[Dirichlet(0.0), ZeroDerivative, Dirichlet(1.0), ZeroDerivative], 1);
        assert!(matches!(
            build_constraints(&mesh, &bc),
            Err(ConstraintError::ConflictingDirichlet { dof: 0, .. })
        ));
    }

    #[test]
    fn unpaired_periodic_faces_fail() {
        let mesh = mesh2d(2);
        let bc = spec(&[Periodic, ZeroDerivative, ZeroDerivative, ZeroDerivative], 1);
        assert!(matches!(
            build_constraints(&mesh, &bc),
            Err(ConstraintError::PeriodicMismatch { component: 0, axis: 0 })
        ));
        let bc = spec(&[ZeroDerivative, ZeroDerivative, Dirichlet(1.0), Periodic], 1);
        assert!(matches!(
            build_constraints(&mesh, &bc),
            Err(ConstraintError::DirichletOnPeriodic { boundary: BoundaryId(2), .. })
        ));
    }

    #[test]
    fn incomplete_tables_fail() {
        let mesh = mesh2d(2);
        let bc = FieldBc::uniform(ZeroDerivative, 1, 2);
        assert!(matches!(
            build_constraints(&mesh, &bc),
            Err(ConstraintError::EntryCount { expected: 4, got: 2, .. })
        ));
    }
}
