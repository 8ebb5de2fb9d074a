//! Read-only field access used during assembly.

use crate::id::FieldId;

/// Read-only access to field DOF vectors.
///
/// The assembler reads every field an equation depends on through this
/// trait and never writes through it; the registry's snapshot views and the
/// test mocks implement it. Returns `None` for IDs that are not present.
pub trait FieldReader {
    /// The DOF vector of a field, node-major with components interleaved.
    fn read(&self, field: FieldId) -> Option<&[f64]>;
}

impl<T: AsRef<[f64]>> FieldReader for [T] {
    fn read(&self, field: FieldId) -> Option<&[f64]> {
        self.get(field.index()).map(AsRef::as_ref)
    }
}

impl<T: AsRef<[f64]>> FieldReader for Vec<T> {
    fn read(&self, field: FieldId) -> Option<&[f64]> {
        self.as_slice().read(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_of_vectors_read_by_index() {
        let fields = vec![vec![1.0, 2.0], vec![3.0]];
        assert_eq!(fields.read(FieldId(1)), Some(&[3.0][..]));
        assert_eq!(fields.read(FieldId(2)), None);
        let borrowed: Vec<&[f64]> = fields.iter().map(Vec::as_slice).collect();
        assert_eq!(borrowed.read(FieldId(0)), Some(&[1.0, 2.0][..]));
    }
}
