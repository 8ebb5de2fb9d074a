//! Reference equations assembled over a real mesh.

use pfield_assembly::{AssemblyContext, AssemblyError, ResidualAssembler};
use pfield_core::FieldId;
use pfield_equations::{CahnHilliard, Diffusion};
use pfield_test_utils::{unit_interval, MockFieldReader};

#[test]
fn diffusion_of_a_linear_profile_only_fluxes_at_the_ends() {
    let mesh = unit_interval(8, 2);
    let asm = ResidualAssembler::new(mesh.clone(), 2).unwrap();
    let mut reader = MockFieldReader::new();
    let ramp: Vec<f64> = (0..mesh.n_nodes()).map(|n| n as f64 / 8.0).collect();
    reader.set_field(FieldId(0), ramp);
    let components = [1];
    let ctx = AssemblyContext::new(&reader, &reader, &components, 0.0, 0.01);

    let eq = Diffusion::new(FieldId(0), 0.5).unwrap();
    let mut out = vec![0.0; mesh.n_nodes()];
    asm.assemble_rhs(&eq, &ctx, &[], &mut out).unwrap();

    assert!((out[0] - 0.5).abs() < 1e-12, "{}", out[0]);
    assert!((out[8] + 0.5).abs() < 1e-12, "{}", out[8]);
    for r in &out[1..8] {
        assert!(r.abs() < 1e-12, "{r}");
    }
}

#[test]
fn coupled_field_missing_from_the_reader_is_reported() {
    let mesh = unit_interval(4, 1);
    let asm = ResidualAssembler::new(mesh.clone(), 2).unwrap();
    let mut reader = MockFieldReader::new();
    reader.set_field(FieldId(0), vec![0.5; mesh.n_nodes()]);
    let components = [1, 1];
    let ctx = AssemblyContext::new(&reader, &reader, &components, 0.0, 0.01);

    let eq = CahnHilliard::new(FieldId(0), FieldId(1), 1.0).unwrap();
    let mut out = vec![0.0; mesh.n_nodes()];
    let err = asm.assemble_rhs(&eq, &ctx, &[], &mut out).unwrap_err();
    assert!(matches!(
        err,
        AssemblyError::MissingField { field: FieldId(1), .. }
    ));
}
