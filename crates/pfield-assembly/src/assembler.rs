//! Matrix-free, partition-parallel integration of equations.

use crate::context::AssemblyContext;
use crate::equation::Equation;
use crate::error::AssemblyError;
use crate::point::{PointValue, QuadPoint, Terms};
use pfield_constraint::NeumannFlux;
use pfield_core::{FieldId, FieldReader, FieldSet};
use pfield_mesh::{BoundaryId, CellValues, FaceValues, MeshError, StructuredMesh};
use rayon::prelude::*;
use std::sync::Arc;

// ── Field sources ──────────────────────────────────────────────────

#[derive(Clone, Copy)]
struct Source<'a> {
    data: &'a [f64],
    components: usize,
}

impl Source<'_> {
    fn evaluate(&self, nodes: &[usize], fe: &CellValues, q: usize) -> PointValue {
        let dim = fe.dim();
        let k = self.components;
        let mut pv = PointValue::ZERO;
        for (l, &node) in nodes.iter().enumerate() {
            let phi = fe.value(l, q);
            let grad = fe.gradient(l, q);
            for c in 0..k {
                let u = self.data[node * k + c];
                pv.value[c] += phi * u;
                for d in 0..dim {
                    pv.gradient[c][d] += grad[d] * u;
                }
            }
        }
        pv
    }
}

/// Per-field sources indexed by `FieldId`; `None` for unread fields.
struct Sources<'a> {
    current: Vec<Option<Source<'a>>>,
    previous: Vec<Option<Source<'a>>>,
}

impl<'a> Sources<'a> {
    fn none() -> Self {
        Self {
            current: Vec::new(),
            previous: Vec::new(),
        }
    }

    fn gather(
        mesh: &StructuredMesh,
        eq: &dyn Equation,
        ctx: &AssemblyContext<'a>,
    ) -> Result<Self, AssemblyError> {
        let n = ctx.n_fields();
        let mut current = vec![None; n];
        let mut previous = vec![None; n];
        let read_now = eq.reads().union(&FieldSet::empty().with(eq.field()));
        for field in read_now.iter() {
            let src = source(mesh, eq, field, ctx.current(), ctx)?;
            current[field.index()] = Some(src);
        }
        for field in eq.reads_previous().iter() {
            let src = source(mesh, eq, field, ctx.previous(), ctx)?;
            previous[field.index()] = Some(src);
        }
        Ok(Self { current, previous })
    }
}

fn source<'a>(
    mesh: &StructuredMesh,
    eq: &dyn Equation,
    field: FieldId,
    reader: &'a (dyn FieldReader + Sync),
    ctx: &AssemblyContext<'a>,
) -> Result<Source<'a>, AssemblyError> {
    let missing = || AssemblyError::MissingField {
        equation: eq.name().to_string(),
        field,
    };
    let components = ctx.components(field).ok_or_else(missing)?;
    let data = reader.read(field).ok_or_else(missing)?;
    check_len(mesh, field, components, data.len())?;
    Ok(Source { data, components })
}

fn check_len(
    mesh: &StructuredMesh,
    field: FieldId,
    components: usize,
    got: usize,
) -> Result<(), AssemblyError> {
    let expected = mesh.n_dofs(components);
    if got == expected {
        Ok(())
    } else {
        Err(AssemblyError::LengthMismatch {
            field,
            expected,
            got,
        })
    }
}

// ── Integration pass ───────────────────────────────────────────────

/// One sweep over all cells producing a vector for `field`.
struct Pass<'s, 'a> {
    name: &'s str,
    field: FieldId,
    components: usize,
    sources: &'s Sources<'a>,
    change: Option<Source<'s>>,
    time: f64,
    dt: f64,
}

/// Integrates equations over a shared mesh.
///
/// Cell loops run one task per mesh partition on the current rayon pool.
/// Each partition accumulates into a private buffer covering its owned
/// and ghost DOFs; buffers are then added into the output in partition
/// order, so results do not depend on thread scheduling.
#[derive(Debug, Clone)]
pub struct ResidualAssembler {
    mesh: Arc<StructuredMesh>,
    cell: CellValues,
    faces: Vec<FaceValues>,
    face_cells: Vec<Vec<usize>>,
}

impl ResidualAssembler {
    /// Tabulate shape data for `mesh` with `quadrature_points` Gauss points
    /// per axis.
    pub fn new(mesh: Arc<StructuredMesh>, quadrature_points: usize) -> Result<Self, MeshError> {
        let cell = CellValues::new(&mesh, quadrature_points)?;
        let mut faces = Vec::with_capacity(mesh.n_boundaries());
        let mut face_cells = Vec::with_capacity(mesh.n_boundaries());
        for b in BoundaryId::all(mesh.dim()) {
            faces.push(FaceValues::new(&mesh, b, quadrature_points)?);
            face_cells.push(mesh.boundary_cells(b)?);
        }
        Ok(Self {
            mesh,
            cell,
            faces,
            face_cells,
        })
    }

    /// The mesh this assembler integrates over.
    pub fn mesh(&self) -> &Arc<StructuredMesh> {
        &self.mesh
    }

    /// Assemble the right-hand side of `eq` into `out`, overwriting it.
    ///
    /// Neumann fluxes of the governed field are added as boundary
    /// integrals. Fails with [`AssemblyError::NonFinite`] on the first cell
    /// (in partition order) whose integrand is not finite.
    pub fn assemble_rhs(
        &self,
        eq: &dyn Equation,
        ctx: &AssemblyContext<'_>,
        neumann: &[NeumannFlux],
        out: &mut [f64],
    ) -> Result<(), AssemblyError> {
        let field = eq.field();
        let sources = Sources::gather(&self.mesh, eq, ctx)?;
        let components = own_components(eq, ctx)?;
        let pass = Pass {
            name: eq.name(),
            field,
            components,
            sources: &sources,
            change: None,
            time: ctx.time(),
            dt: ctx.dt(),
        };
        self.integrate(&pass, |q, _| eq.rhs(q), out)?;
        for flux in neumann {
            self.add_neumann(flux, components, out);
        }
        Ok(())
    }

    /// Apply the linearized operator of `eq` to `change`, writing into
    /// `out`.
    pub fn apply_lhs(
        &self,
        eq: &dyn Equation,
        ctx: &AssemblyContext<'_>,
        change: &[f64],
        out: &mut [f64],
    ) -> Result<(), AssemblyError> {
        let field = eq.field();
        let sources = Sources::gather(&self.mesh, eq, ctx)?;
        let components = own_components(eq, ctx)?;
        check_len(&self.mesh, field, components, change.len())?;
        let pass = Pass {
            name: eq.name(),
            field,
            components,
            sources: &sources,
            change: Some(Source {
                data: change,
                components,
            }),
            time: ctx.time(),
            dt: ctx.dt(),
        };
        self.integrate(&pass, |q, delta| eq.lhs(q, delta), out)
    }

    /// Row sums of the mass matrix, `∫φ_i`, for a field with `components`
    /// DOFs per node.
    pub fn lumped_mass(&self, components: usize) -> Result<Vec<f64>, AssemblyError> {
        let mut mass = vec![0.0; self.mesh.n_dofs(components)];
        let sources = Sources::none();
        let pass = Pass {
            name: "lumped_mass",
            field: FieldId(0),
            components,
            sources: &sources,
            change: None,
            time: 0.0,
            dt: 0.0,
        };
        let mut unit = Terms::zero();
        unit.value = [1.0; 3];
        self.integrate(&pass, |_, _| unit, &mut mass)?;
        Ok(mass)
    }

    fn integrate<F>(
        &self,
        pass: &Pass<'_, '_>,
        pointwise: F,
        out: &mut [f64],
    ) -> Result<(), AssemblyError>
    where
        F: Fn(&QuadPoint<'_>, &PointValue) -> Terms + Sync,
    {
        let mesh = &*self.mesh;
        let k = pass.components;
        check_len(mesh, pass.field, k, out.len())?;
        let fe = &self.cell;
        let dim = mesh.dim();
        let n_fields = pass.sources.current.len();

        let partials: Vec<Result<Vec<f64>, AssemblyError>> = mesh
            .partitions()
            .par_iter()
            .map(|part| {
                let base = part.nodes.start;
                let mut local = vec![0.0; part.dofs(k).len()];
                let mut current = vec![PointValue::ZERO; n_fields];
                let mut previous = vec![PointValue::ZERO; n_fields];
                for cell in part.cells.clone() {
                    let nodes = mesh.cell_nodes(cell);
                    for q in 0..fe.n_points() {
                        fill(&pass.sources.current, &nodes, fe, q, &mut current);
                        fill(&pass.sources.previous, &nodes, fe, q, &mut previous);
                        let delta = pass
                            .change
                            .map_or(PointValue::ZERO, |c| c.evaluate(&nodes, fe, q));
                        let point = QuadPoint {
                            position: mesh.map_to_cell(cell, fe.reference_point(q)),
                            dim,
                            time: pass.time,
                            dt: pass.dt,
                            current: &current,
                            previous: &previous,
                        };
                        let terms = pointwise(&point, &delta);
                        if !terms.is_finite() {
                            return Err(AssemblyError::NonFinite {
                                equation: pass.name.to_string(),
                                field: pass.field,
                                cell,
                            });
                        }
                        let jxw = fe.jxw(q);
                        for (l, &node) in nodes.iter().enumerate() {
                            let phi = fe.value(l, q);
                            let grad = fe.gradient(l, q);
                            let row = (node - base) * k;
                            for c in 0..k {
                                let flux: f64 =
                                    (0..dim).map(|d| terms.gradient[c][d] * grad[d]).sum();
                                local[row + c] += jxw * (terms.value[c] * phi + flux);
                            }
                        }
                    }
                }
                Ok(local)
            })
            .collect();

        // Reverse ghost exchange: fold partition buffers in partition order.
        out.fill(0.0);
        for (part, local) in mesh.partitions().iter().zip(partials) {
            let local = local?;
            for (o, v) in out[part.dofs(k)].iter_mut().zip(local) {
                *o += v;
            }
        }
        Ok(())
    }

    fn add_neumann(&self, flux: &NeumannFlux, components: usize, out: &mut [f64]) {
        debug_assert!(flux.component < components);
        let b = usize::from(flux.boundary.0);
        let (Some(face), Some(cells)) = (self.faces.get(b), self.face_cells.get(b)) else {
            return;
        };
        for &cell in cells {
            let nodes = self.mesh.cell_nodes(cell);
            for q in 0..face.n_points() {
                let w = flux.value * face.jxw(q);
                for (l, &node) in nodes.iter().enumerate() {
                    out[node * components + flux.component] += w * face.value(l, q);
                }
            }
        }
    }
}

fn own_components(eq: &dyn Equation, ctx: &AssemblyContext<'_>) -> Result<usize, AssemblyError> {
    ctx.components(eq.field())
        .ok_or_else(|| AssemblyError::MissingField {
            equation: eq.name().to_string(),
            field: eq.field(),
        })
}

fn fill(
    sources: &[Option<Source<'_>>],
    nodes: &[usize],
    fe: &CellValues,
    q: usize,
    into: &mut [PointValue],
) {
    for (slot, src) in into.iter_mut().zip(sources) {
        if let Some(src) = src {
            *slot = src.evaluate(nodes, fe, q);
        }
    }
}
