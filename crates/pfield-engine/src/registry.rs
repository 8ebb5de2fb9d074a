//! Field declarations and the vectors they own.
//!
//! The registry has two phases. While *declaring*, fields are added by
//! name; declaration order assigns [`FieldId`]s and fixes the order fields
//! are stepped and checkpointed in. [`build_fields`](FieldRegistry::build_fields)
//! attaches the mesh and allocates three vectors per field: current values,
//! start-of-step values, and residual scratch. After that no field may be
//! added and every vector keeps its length for the rest of the run.

use std::sync::Arc;

use indexmap::IndexMap;
use pfield_core::{FieldDef, FieldId, FieldRank, FieldReader, PdeType};
use pfield_mesh::StructuredMesh;
use tracing::debug;

use crate::error::RegistryError;

/// One declared field and its vectors.
#[derive(Debug)]
pub struct Field {
    def: FieldDef,
    components: usize,
    values: Vec<f64>,
    previous: Vec<f64>,
    residual: Vec<f64>,
}

impl Field {
    /// Name, rank and PDE type.
    pub fn def(&self) -> &FieldDef {
        &self.def
    }

    /// DOFs per node (1 until built).
    pub fn components(&self) -> usize {
        self.components
    }

    /// Current values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Current values, for in-place updates. The length is fixed.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Values at the start of the current step.
    pub fn previous(&self) -> &[f64] {
        &self.previous
    }

    /// Last assembled residual or update.
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    /// Current values and the residual, borrowed together.
    pub(crate) fn values_and_residual(&mut self) -> (&mut [f64], &[f64]) {
        (&mut self.values, &self.residual)
    }
}

/// Owner of every field vector.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: IndexMap<String, Field>,
    mesh: Option<Arc<StructuredMesh>>,
}

impl FieldRegistry {
    /// An empty registry in the declaring phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field. Fails after `build_fields` or on a duplicate name.
    pub fn declare_field(
        &mut self,
        name: &str,
        rank: FieldRank,
        pde_type: PdeType,
    ) -> Result<FieldId, RegistryError> {
        if self.is_built() {
            return Err(RegistryError::AlreadyBuilt { name: name.into() });
        }
        if self.fields.contains_key(name) {
            return Err(RegistryError::DuplicateField { name: name.into() });
        }
        let id = FieldId(self.fields.len() as u32);
        self.fields.insert(
            name.to_string(),
            Field {
                def: FieldDef::new(name, rank, pde_type),
                components: 1,
                values: Vec::new(),
                previous: Vec::new(),
                residual: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Attach the mesh and allocate every field's vectors, zero-filled.
    ///
    /// Storage is reserved fallibly: an allocation failure is reported as
    /// [`RegistryError::Allocation`] and leaves the registry unbuilt.
    pub fn build_fields(&mut self, mesh: Arc<StructuredMesh>) -> Result<(), RegistryError> {
        if self.is_built() {
            return Err(RegistryError::AlreadyBuilt {
                name: String::from("<build>"),
            });
        }
        let mut built = Vec::with_capacity(self.fields.len());
        for field in self.fields.values() {
            let components = field.def.rank.components(mesh.dim());
            let n = mesh.n_dofs(components);
            let name = &field.def.name;
            let vectors = [alloc(name, n)?, alloc(name, n)?, alloc(name, n)?];
            built.push((components, vectors));
        }
        for (field, (components, [values, previous, residual])) in
            self.fields.values_mut().zip(built)
        {
            debug!(field = %field.def.name, components, dofs = values.len(), "field allocated");
            field.components = components;
            field.values = values;
            field.previous = previous;
            field.residual = residual;
        }
        self.mesh = Some(mesh);
        Ok(())
    }

    /// Whether `build_fields` has run.
    pub fn is_built(&self) -> bool {
        self.mesh.is_some()
    }

    /// The attached mesh.
    pub fn mesh(&self) -> Option<&Arc<StructuredMesh>> {
        self.mesh.as_ref()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Id of the field called `name`.
    pub fn field_id(&self, name: &str) -> Result<FieldId, RegistryError> {
        self.fields
            .get_index_of(name)
            .map(|i| FieldId(i as u32))
            .ok_or_else(|| RegistryError::UnknownField { name: name.into() })
    }

    /// Mutable handle to the field called `name`.
    pub fn get_field(&mut self, name: &str) -> Result<&mut Field, RegistryError> {
        self.fields
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownField { name: name.into() })
    }

    /// Field by id.
    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.get_index(id.index()).map(|(_, f)| f)
    }

    /// Mutable field by id.
    pub fn get_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.fields.get_index_mut(id.index()).map(|(_, f)| f)
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &Field)> {
        self.fields
            .values()
            .enumerate()
            .map(|(i, f)| (FieldId(i as u32), f))
    }

    /// Definitions in declaration order.
    pub fn defs(&self) -> Vec<FieldDef> {
        self.fields.values().map(|f| f.def.clone()).collect()
    }

    /// DOFs per node, indexed by `FieldId`.
    pub fn components(&self) -> Vec<usize> {
        self.fields.values().map(|f| f.components).collect()
    }

    /// Copy current values into the start-of-step vectors.
    pub fn save_previous(&mut self) {
        for f in self.fields.values_mut() {
            f.previous.copy_from_slice(&f.values);
        }
    }

    /// Roll current values back to the start of the step.
    pub fn restore_previous(&mut self) {
        for f in self.fields.values_mut() {
            f.values.copy_from_slice(&f.previous);
        }
    }

    /// Read-only view of the start-of-step values.
    pub fn previous_view(&self) -> PreviousValues<'_> {
        PreviousValues(self)
    }

    /// Borrow a field's residual vector out of the registry, zeroed.
    ///
    /// The assembler writes into it while reading the registry; hand it
    /// back with [`put_residual`](Self::put_residual).
    pub(crate) fn take_residual(&mut self, id: FieldId) -> Vec<f64> {
        match self.get_mut(id) {
            Some(f) => {
                let mut r = std::mem::take(&mut f.residual);
                r.fill(0.0);
                r
            }
            None => Vec::new(),
        }
    }

    pub(crate) fn put_residual(&mut self, id: FieldId, residual: Vec<f64>) {
        if let Some(f) = self.get_mut(id) {
            f.residual = residual;
        }
    }
}

fn alloc(field: &str, n: usize) -> Result<Vec<f64>, RegistryError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n)
        .map_err(|_| RegistryError::Allocation {
            field: field.to_string(),
            bytes: n.saturating_mul(std::mem::size_of::<f64>()),
        })?;
    v.resize(n, 0.0);
    Ok(v)
}

impl FieldReader for FieldRegistry {
    fn read(&self, field: FieldId) -> Option<&[f64]> {
        self.get(field).map(|f| f.values.as_slice())
    }
}

/// [`FieldReader`] over start-of-step values.
#[derive(Clone, Copy)]
pub struct PreviousValues<'a>(&'a FieldRegistry);

impl FieldReader for PreviousValues<'_> {
    fn read(&self, field: FieldId) -> Option<&[f64]> {
        self.0.get(field).map(|f| f.previous.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfield_test_utils::unit_square;

    fn registry() -> FieldRegistry {
        let mut r = FieldRegistry::new();
        r.declare_field("c", FieldRank::Scalar, PdeType::ExplicitTimeDependent)
            .unwrap();
        r.declare_field("u", FieldRank::Vector, PdeType::ImplicitTimeDependent)
            .unwrap();
        r
    }

    #[test]
    fn ids_follow_declaration_order() {
        let r = registry();
        assert_eq!(r.field_id("c"), Ok(FieldId(0)));
        assert_eq!(r.field_id("u"), Ok(FieldId(1)));
        assert_eq!(
            r.field_id("mu"),
            Err(RegistryError::UnknownField { name: "mu".into() })
        );
    }

    #[test]
    fn vectors_are_sized_by_rank() {
        let mut r = registry();
        let mesh = unit_square(4, 2);
        r.build_fields(mesh.clone()).unwrap();
        let c = r.get(FieldId(0)).unwrap();
        assert_eq!(c.values().len(), mesh.n_nodes());
        let u = r.get(FieldId(1)).unwrap();
        assert_eq!(u.components(), 2);
        assert_eq!(u.values().len(), 2 * mesh.n_nodes());
        assert_eq!(u.previous().len(), u.values().len());
        assert_eq!(u.residual().len(), u.values().len());
        assert_eq!(r.components(), vec![1, 2]);
    }

    #[test]
    fn declaring_after_build_fails() {
        let mut r = registry();
        r.build_fields(unit_square(2, 1)).unwrap();
        assert!(matches!(
            r.declare_field("eta", FieldRank::Scalar, PdeType::ExplicitTimeDependent),
            Err(RegistryError::AlreadyBuilt { .. })
        ));
        assert!(r.build_fields(unit_square(2, 1)).is_err());
    }

    #[test]
    fn duplicate_names_fail() {
        let mut r = registry();
        assert_eq!(
            r.declare_field("c", FieldRank::Scalar, PdeType::TimeIndependent),
            Err(RegistryError::DuplicateField { name: "c".into() })
        );
    }

    #[test]
    fn previous_round_trip() {
        let mut r = registry();
        r.build_fields(unit_square(2, 1)).unwrap();
        r.get_field("c").unwrap().values_mut().fill(1.0);
        r.save_previous();
        r.get_field("c").unwrap().values_mut().fill(5.0);
        assert_eq!(r.previous_view().read(FieldId(0)).unwrap()[0], 1.0);
        assert_eq!(r.read(FieldId(0)).unwrap()[0], 5.0);
        r.restore_previous();
        assert!(r.get(FieldId(0)).unwrap().values().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn residual_is_lent_and_returned() {
        let mut r = registry();
        r.build_fields(unit_square(2, 1)).unwrap();
        let mut res = r.take_residual(FieldId(0));
        assert_eq!(res.len(), 9);
        res[0] = 3.0;
        r.put_residual(FieldId(0), res);
        assert_eq!(r.get(FieldId(0)).unwrap().residual()[0], 3.0);
    }
}
