//! Slab partitioning of a structured mesh.

use std::ops::Range;

/// A contiguous slab of cells along the mesh's slowest axis.
///
/// Every partition owns a disjoint node range; together the owned ranges
/// cover the mesh exactly once. The nodes a partition's cells touch extend
/// one node layer past the owned range into the next partition: that layer
/// is the partition's ghost layer. Both ranges are contiguous because
/// node numbering runs slowest along the partitioned axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    /// Position in partition order; reductions combine in this order.
    pub index: usize,
    /// Cells assembled by this partition.
    pub cells: Range<usize>,
    /// Nodes whose values this partition owns.
    pub owned_nodes: Range<usize>,
    /// Every node touched by this partition's cells, owned plus ghosts.
    pub nodes: Range<usize>,
}

impl Partition {
    /// Ghost nodes: touched but owned by the following partition.
    pub fn ghost_nodes(&self) -> Range<usize> {
        self.owned_nodes.end..self.nodes.end
    }

    /// DOFs touched by this partition for a field with `components` per node.
    pub fn dofs(&self, components: usize) -> Range<usize> {
        self.nodes.start * components..self.nodes.end * components
    }

    /// DOFs owned by this partition for a field with `components` per node.
    pub fn owned_dofs(&self, components: usize) -> Range<usize> {
        self.owned_nodes.start * components..self.owned_nodes.end * components
    }
}

/// Split `layers` cell layers into `count` balanced slabs.
///
/// `cells_per_layer` and `nodes_per_layer` are the products over the
/// remaining axes. Callers guarantee `1 <= count <= layers`.
pub(crate) fn slabs(
    layers: usize,
    count: usize,
    cells_per_layer: usize,
    nodes_per_layer: usize,
) -> Vec<Partition> {
    (0..count)
        .map(|index| {
            let first = index * layers / count;
            let last = (index + 1) * layers / count;
            let owned_end = if index + 1 == count { last + 1 } else { last };
            Partition {
                index,
                cells: first * cells_per_layer..last * cells_per_layer,
                owned_nodes: first * nodes_per_layer..owned_end * nodes_per_layer,
                nodes: first * nodes_per_layer..(last + 1) * nodes_per_layer,
            }
        })
        .collect()
}
