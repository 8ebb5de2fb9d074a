//! Boundary identifiers of a hypercube mesh.

use std::fmt;

/// One face of the domain hypercube.
///
/// Id `2 * axis` is the low face of `axis`, `2 * axis + 1` the high face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoundaryId(pub u8);

impl BoundaryId {
    /// The low or high face of `axis`.
    pub fn new(axis: usize, upper: bool) -> Self {
        Self((2 * axis + usize::from(upper)) as u8)
    }

    /// Axis normal to this face.
    pub fn axis(self) -> usize {
        usize::from(self.0 / 2)
    }

    /// Returns `true` for the high (max-coordinate) face.
    pub fn is_upper(self) -> bool {
        self.0 % 2 == 1
    }

    /// The face on the opposite side of the same axis.
    pub fn opposite(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// All boundaries of a `dim`-dimensional mesh in id order.
    pub fn all(dim: usize) -> impl Iterator<Item = Self> {
        (0..2 * dim).map(|i| Self(i as u8))
    }
}

impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const AXES: [char; 3] = ['x', 'y', 'z'];
        let side = if self.is_upper() { "max" } else { "min" };
        match AXES.get(self.axis()) {
            Some(a) => write!(f, "{a}-{side}"),
            None => write!(f, "boundary {}", self.0),
        }
    }
}
