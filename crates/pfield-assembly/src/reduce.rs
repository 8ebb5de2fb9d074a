//! Global reductions over partitioned DOF vectors.
//!
//! Each partition reduces the DOFs it owns; partials are combined in
//! partition order so every run with the same partitioning produces the
//! same bits.

use pfield_mesh::StructuredMesh;
use rayon::prelude::*;

/// Sum per-partition partials in partition order.
pub fn ordered_sum(partials: &[f64]) -> f64 {
    partials.iter().fold(0.0, |acc, p| acc + p)
}

/// Inner product of two DOF vectors of a field with `components` per node.
pub fn dot(mesh: &StructuredMesh, components: usize, a: &[f64], b: &[f64]) -> f64 {
    let partials: Vec<f64> = mesh
        .partitions()
        .par_iter()
        .map(|p| {
            let owned = p.owned_dofs(components);
            a[owned.clone()]
                .iter()
                .zip(&b[owned])
                .map(|(x, y)| x * y)
                .sum()
        })
        .collect();
    ordered_sum(&partials)
}

/// Euclidean norm of a DOF vector.
pub fn norm(mesh: &StructuredMesh, components: usize, a: &[f64]) -> f64 {
    dot(mesh, components, a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_dof_is_counted_once() {
        let mesh = StructuredMesh::new(&[1.0, 1.0], &[3, 6], 4).unwrap();
        let ones = vec![1.0; mesh.n_dofs(2)];
        assert_eq!(dot(&mesh, 2, &ones, &ones), mesh.n_dofs(2) as f64);
        assert_eq!(norm(&mesh, 2, &vec![0.0; mesh.n_dofs(2)]), 0.0);
    }

    #[test]
    fn result_is_independent_of_thread_count() {
        let mesh = StructuredMesh::new(&[1.0], &[64], 8).unwrap();
        let v: Vec<f64> = (0..mesh.n_nodes()).map(|i| 1.0 / (i as f64 + 1.0)).collect();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let serial = pool.install(|| dot(&mesh, 1, &v, &v));
        let parallel = dot(&mesh, 1, &v, &v);
        assert_eq!(serial.to_bits(), parallel.to_bits());
    }
}
