//! The uniform hypercube mesh.

use crate::boundary::BoundaryId;
use crate::error::MeshError;
use crate::partition::{slabs, Partition};
use smallvec::SmallVec;

/// Highest supported spatial dimension.
pub const MAX_DIM: usize = 3;

/// Node indices of one cell, in tensor bit order.
pub type CellNodes = SmallVec<[usize; 8]>;

/// A uniform hypercube mesh of Q1 cells.
///
/// The domain is `[0, L_x] × [0, L_y] × [0, L_z]` (restricted to the first
/// `dim` axes) subdivided into equal cells. Local node `l` of a cell sits at
/// offset `(l & 1, (l >> 1) & 1, (l >> 2) & 1)` from the cell's lowest node.
///
/// The mesh is immutable after construction and shared read-only by every
/// field and partition.
///
/// # Examples
///
/// ```
/// use pfield_mesh::StructuredMesh;
///
/// let mesh = StructuredMesh::new(&[1.0, 2.0], &[4, 8], 2).unwrap();
/// assert_eq!(mesh.n_cells(), 32);
/// assert_eq!(mesh.n_nodes(), 45);
/// assert_eq!(mesh.partitions().len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct StructuredMesh {
    dim: usize,
    lengths: [f64; MAX_DIM],
    cells: [usize; MAX_DIM],
    nodes: [usize; MAX_DIM],
    partitions: Vec<Partition>,
}

impl StructuredMesh {
    /// Build a mesh from per-axis lengths and subdivisions, split into
    /// `n_partitions` slabs along the last axis.
    ///
    /// The dimension is taken from `lengths`; `subdivisions` must match it.
    pub fn new(
        lengths: &[f64],
        subdivisions: &[usize],
        n_partitions: usize,
    ) -> Result<Self, MeshError> {
        let dim = lengths.len();
        if dim == 0 || dim > MAX_DIM {
            return Err(MeshError::InvalidDimension { dim });
        }
        if subdivisions.len() != dim {
            return Err(MeshError::AxisCountMismatch {
                what: "subdivisions",
                expected: dim,
                got: subdivisions.len(),
            });
        }
        let mut l = [0.0; MAX_DIM];
        let mut cells = [1; MAX_DIM];
        let mut nodes = [1; MAX_DIM];
        for axis in 0..dim {
            let value = lengths[axis];
            if !(value.is_finite() && value > 0.0) {
                return Err(MeshError::InvalidLength { axis, value });
            }
            if subdivisions[axis] == 0 {
                return Err(MeshError::EmptyAxis { axis });
            }
            l[axis] = value;
            cells[axis] = subdivisions[axis];
            nodes[axis] = subdivisions[axis] + 1;
        }

        let slab_axis = dim - 1;
        let layers = cells[slab_axis];
        if n_partitions == 0 || n_partitions > layers {
            return Err(MeshError::InvalidPartitionCount {
                requested: n_partitions,
                layers,
            });
        }
        let cells_per_layer: usize = cells[..slab_axis].iter().product();
        let nodes_per_layer: usize = nodes[..slab_axis].iter().product();
        let partitions = slabs(layers, n_partitions, cells_per_layer, nodes_per_layer);

        Ok(Self {
            dim,
            lengths: l,
            cells,
            nodes,
            partitions,
        })
    }

    /// Spatial dimension (1, 2 or 3).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Domain extent along each axis.
    pub fn lengths(&self) -> &[f64] {
        &self.lengths[..self.dim]
    }

    /// Cells along each axis.
    pub fn cells_per_axis(&self) -> &[usize] {
        &self.cells[..self.dim]
    }

    /// Nodes along each axis.
    pub fn nodes_per_axis(&self) -> &[usize] {
        &self.nodes[..self.dim]
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        self.cells.iter().product()
    }

    /// Total number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.nodes.iter().product()
    }

    /// DOF count of a field with `components` values per node.
    pub fn n_dofs(&self, components: usize) -> usize {
        self.n_nodes() * components
    }

    /// Number of Q1 shape functions per cell, `2^dim`.
    pub fn nodes_per_cell(&self) -> usize {
        1 << self.dim
    }

    /// Cell width along `axis`.
    pub fn spacing(&self, axis: usize) -> f64 {
        self.lengths[axis] / self.cells[axis] as f64
    }

    /// Smallest cell width over all axes.
    pub fn min_spacing(&self) -> f64 {
        (0..self.dim)
            .map(|a| self.spacing(a))
            .fold(f64::INFINITY, f64::min)
    }

    /// Domain volume (length in 1D, area in 2D).
    pub fn volume(&self) -> f64 {
        self.lengths().iter().product()
    }

    /// Linear node index from a per-axis index triple.
    pub fn node_index(&self, ijk: [usize; MAX_DIM]) -> usize {
        ijk[0] + self.nodes[0] * (ijk[1] + self.nodes[1] * ijk[2])
    }

    /// Per-axis index triple of a node.
    pub fn node_ijk(&self, node: usize) -> [usize; MAX_DIM] {
        let [nx, ny, _] = self.nodes;
        [node % nx, (node / nx) % ny, node / (nx * ny)]
    }

    /// Physical coordinates of a node; unused axes are zero.
    pub fn node_position(&self, node: usize) -> [f64; MAX_DIM] {
        let ijk = self.node_ijk(node);
        let mut x = [0.0; MAX_DIM];
        for (axis, xa) in x.iter_mut().enumerate().take(self.dim) {
            *xa = ijk[axis] as f64 * self.spacing(axis);
        }
        x
    }

    /// Per-axis index triple of a cell's lowest corner.
    pub fn cell_ijk(&self, cell: usize) -> [usize; MAX_DIM] {
        let [cx, cy, _] = self.cells;
        [cell % cx, (cell / cx) % cy, cell / (cx * cy)]
    }

    /// Node indices of a cell in tensor bit order.
    pub fn cell_nodes(&self, cell: usize) -> CellNodes {
        let base = self.cell_ijk(cell);
        (0..self.nodes_per_cell())
            .map(|l| {
                let mut ijk = base;
                for (axis, i) in ijk.iter_mut().enumerate().take(self.dim) {
                    *i += (l >> axis) & 1;
                }
                self.node_index(ijk)
            })
            .collect()
    }

    /// Physical position of reference point `xi` inside `cell`.
    pub fn map_to_cell(&self, cell: usize, xi: &[f64; MAX_DIM]) -> [f64; MAX_DIM] {
        let base = self.cell_ijk(cell);
        let mut x = [0.0; MAX_DIM];
        for axis in 0..self.dim {
            x[axis] = (base[axis] as f64 + xi[axis]) * self.spacing(axis);
        }
        x
    }

    /// Number of boundary ids, `2 * dim`.
    pub fn n_boundaries(&self) -> usize {
        2 * self.dim
    }

    fn check_boundary(&self, id: BoundaryId) -> Result<(), MeshError> {
        if usize::from(id.0) < self.n_boundaries() {
            Ok(())
        } else {
            Err(MeshError::UnknownBoundary {
                id: id.0,
                count: self.n_boundaries(),
            })
        }
    }

    /// Nodes lying on a boundary face, in ascending order.
    pub fn boundary_nodes(&self, id: BoundaryId) -> Result<Vec<usize>, MeshError> {
        self.check_boundary(id)?;
        let axis = id.axis();
        let layer = if id.is_upper() { self.nodes[axis] - 1 } else { 0 };
        Ok((0..self.n_nodes())
            .filter(|&n| self.node_ijk(n)[axis] == layer)
            .collect())
    }

    /// Cells with a face on a boundary, in ascending order.
    pub fn boundary_cells(&self, id: BoundaryId) -> Result<Vec<usize>, MeshError> {
        self.check_boundary(id)?;
        let axis = id.axis();
        let layer = if id.is_upper() { self.cells[axis] - 1 } else { 0 };
        Ok((0..self.n_cells())
            .filter(|&c| self.cell_ijk(c)[axis] == layer)
            .collect())
    }

    /// The node a periodic identification maps `node` onto.
    ///
    /// For every axis flagged in `periodic`, an index on the high face is
    /// replaced by zero. Nodes off every high face map to themselves.
    pub fn periodic_image(&self, node: usize, periodic: [bool; MAX_DIM]) -> usize {
        let mut ijk = self.node_ijk(node);
        for axis in 0..self.dim {
            if periodic[axis] && ijk[axis] == self.nodes[axis] - 1 {
                ijk[axis] = 0;
            }
        }
        self.node_index(ijk)
    }

    /// Partitions in partition order.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(n: usize) -> StructuredMesh {
        StructuredMesh::new(&[1.0, 1.0], &[n, n], 1).unwrap()
    }

    #[test]
    fn counts_match_subdivisions() {
        let mesh = StructuredMesh::new(&[2.0, 1.0, 1.0], &[4, 2, 3], 3).unwrap();
        assert_eq!(mesh.n_cells(), 24);
        assert_eq!(mesh.n_nodes(), 5 * 3 * 4);
        assert_eq!(mesh.n_dofs(3), 180);
        assert_eq!(mesh.nodes_per_cell(), 8);
        assert_eq!(mesh.spacing(0), 0.5);
        assert_eq!(mesh.partitions().len(), 3);
    }

    #[test]
    fn node_index_round_trips() {
        let mesh = StructuredMesh::new(&[1.0, 1.0, 1.0], &[2, 3, 4], 1).unwrap();
        for n in 0..mesh.n_nodes() {
            assert_eq!(mesh.node_index(mesh.node_ijk(n)), n);
        }
    }

    #[test]
    fn cell_nodes_in_tensor_order() {
        let mesh = square(2);
        // Cell 3 is the upper-right cell of a 2x2 grid, nodes 3 wide.
        assert_eq!(mesh.cell_nodes(3).as_slice(), &[4, 5, 7, 8]);
        assert_eq!(mesh.node_position(8), [1.0, 1.0, 0.0]);
        assert_eq!(mesh.map_to_cell(3, &[0.5, 0.5, 0.0]), [0.75, 0.75, 0.0]);
    }

    #[test]
    fn boundary_queries() {
        let mesh = square(2);
        assert_eq!(mesh.boundary_nodes(BoundaryId(0)).unwrap(), vec![0, 3, 6]);
        assert_eq!(mesh.boundary_nodes(BoundaryId(3)).unwrap(), vec![6, 7, 8]);
        assert_eq!(mesh.boundary_cells(BoundaryId(1)).unwrap(), vec![1, 3]);
        assert!(matches!(
            mesh.boundary_nodes(BoundaryId(4)),
            Err(MeshError::UnknownBoundary { id: 4, count: 4 })
        ));
    }

    #[test]
    fn periodic_image_folds_high_faces() {
        let mesh = square(2);
        assert_eq!(mesh.periodic_image(8, [true, true, false]), 0);
        assert_eq!(mesh.periodic_image(8, [true, false, false]), 6);
        assert_eq!(mesh.periodic_image(4, [true, true, false]), 4);
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(matches!(
            StructuredMesh::new(&[], &[], 1),
            Err(MeshError::InvalidDimension { dim: 0 })
        ));
        assert!(matches!(
            StructuredMesh::new(&[1.0, -1.0], &[2, 2], 1),
            Err(MeshError::InvalidLength { axis: 1, .. })
        ));
        assert!(matches!(
            StructuredMesh::new(&[1.0], &[0], 1),
            Err(MeshError::EmptyAxis { axis: 0 })
        ));
        assert!(matches!(
            StructuredMesh::new(&[1.0, 1.0], &[4, 2], 3),
            Err(MeshError::InvalidPartitionCount { requested: 3, layers: 2 })
        ));
        assert!(matches!(
            StructuredMesh::new(&[1.0, 1.0], &[4], 1),
            Err(MeshError::AxisCountMismatch { .. })
        ));
    }
}
