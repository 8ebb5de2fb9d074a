//! Post-processing hooks run on a step cadence.
//!
//! Post-processors get read-only access to the fields and the time state.
//! They may keep their own state between calls but never modify fields.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pfield_core::{FieldRank, TimeState};

use crate::registry::FieldRegistry;

/// Name of the file [`IntegratedFields`] writes.
pub const INTEGRATED_FIELDS_FILE: &str = "integratedFields.txt";

/// Computes derived quantities from field values.
pub trait PostProcessor: Send {
    /// Name for logs and errors.
    fn name(&self) -> &str;

    /// Process the state reached at `time`.
    fn process(&mut self, time: &TimeState, fields: &FieldRegistry) -> io::Result<()>;

    /// Continue a run restored at `time` instead of starting a new one.
    fn resume(&mut self, _time: &TimeState) -> io::Result<()> {
        Ok(())
    }
}

/// Domain integral of every scalar field, one line per call.
///
/// Lines look like `time 0.5\tc 0.2499\tmu -0.01`, so the last value of
/// a quantity can be picked out by name. A fresh run truncates the file; a
/// resumed run keeps the lines up to the restart time and appends.
pub struct IntegratedFields {
    path: PathBuf,
    mass: Vec<f64>,
    started: bool,
    last: Vec<(String, f64)>,
}

impl IntegratedFields {
    /// Write to `integratedFields.txt` in `dir`. `mass` is the lumped mass
    /// vector of a scalar field, `∫φ_i`.
    pub fn new(dir: &Path, mass: Vec<f64>) -> Self {
        Self {
            path: dir.join(INTEGRATED_FIELDS_FILE),
            mass,
            started: false,
            last: Vec::new(),
        }
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Integrals from the most recent call.
    pub fn last(&self) -> &[(String, f64)] {
        &self.last
    }

    fn open(&mut self) -> io::Result<File> {
        if self.started {
            OpenOptions::new().append(true).open(&self.path)
        } else {
            if let Some(dir) = self.path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            self.started = true;
            File::create(&self.path)
        }
    }
}

/// Time at the start of an output line.
fn line_time(line: &str) -> Option<f64> {
    line.strip_prefix("time ")?.split('\t').next()?.parse().ok()
}

/// `Σ mass_i u_i`, the exact integral of a Q1 interpolant under the
/// lumped (trapezoidal) rule.
pub fn integrate(mass: &[f64], values: &[f64]) -> f64 {
    mass.iter().zip(values).map(|(m, u)| m * u).sum()
}

impl PostProcessor for IntegratedFields {
    fn name(&self) -> &str {
        "integrated_fields"
    }

    fn process(&mut self, time: &TimeState, fields: &FieldRegistry) -> io::Result<()> {
        self.last = fields
            .iter()
            .filter(|(_, f)| f.def().rank == FieldRank::Scalar || f.components() == 1)
            .map(|(_, f)| (f.def().name.clone(), integrate(&self.mass, f.values())))
            .collect();
        let mut line = format!("time {}", time.time);
        for (name, value) in &self.last {
            line.push_str(&format!("\t{name} {value}"));
        }
        let mut file = self.open()?;
        writeln!(file, "{line}")
    }

    fn resume(&mut self, time: &TimeState) -> io::Result<()> {
        let history = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        let kept: String = history
            .lines()
            .filter(|line| line_time(line).is_some_and(|t| t <= time.time))
            .map(|line| format!("{line}\n"))
            .collect();
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, kept)?;
        self.started = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfield_core::PdeType;
    use pfield_test_utils::unit_square;
    use tempfile::TempDir;

    #[test]
    fn integral_of_constant_is_value_times_volume() {
        let mass = vec![0.25; 4];
        assert_eq!(integrate(&mass, &[2.0; 4]), 2.0);
    }

    #[test]
    fn writes_one_line_per_call() {
        let dir = TempDir::new().unwrap();
        let mesh = unit_square(2, 1);
        let mut registry = FieldRegistry::new();
        registry
            .declare_field("c", FieldRank::Scalar, PdeType::ExplicitTimeDependent)
            .unwrap();
        registry.build_fields(mesh.clone()).unwrap();
        registry.get_field("c").unwrap().values_mut().fill(0.5);

        let h = 0.5;
        let mass: Vec<f64> = (0..mesh.n_nodes())
            .map(|n| {
                let [i, j, _] = mesh.node_ijk(n);
                let edge = |k: usize| if k == 0 || k == 2 { 0.5 } else { 1.0 };
                h * h * edge(i) * edge(j)
            })
            .collect();
        let mut pp = IntegratedFields::new(dir.path(), mass);
        let mut t = TimeState::initial(0.1);
        pp.process(&t, &registry).unwrap();
        t = t.advanced(0.1);
        pp.process(&t, &registry).unwrap();

        assert_eq!(pp.last(), &[("c".to_string(), 0.5)]);
        let text = std::fs::read_to_string(pp.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "time 0\tc 0.5");
        assert!(lines[1].starts_with("time 0.1"));
    }

    #[test]
    fn resume_keeps_history_up_to_the_restart_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(INTEGRATED_FIELDS_FILE);
        std::fs::write(&path, "time 0\tc 1\ntime 0.1\tc 1\ntime 0.2\tc 1\n").unwrap();
        let mesh = unit_square(1, 1);
        let mut registry = FieldRegistry::new();
        registry
            .declare_field("c", FieldRank::Scalar, PdeType::ExplicitTimeDependent)
            .unwrap();
        registry.build_fields(mesh).unwrap();

        let mut pp = IntegratedFields::new(dir.path(), vec![0.25; 4]);
        let restart = TimeState::initial(0.1).advanced(0.1);
        pp.resume(&restart).unwrap();
        pp.process(&restart.advanced(0.1), &registry).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let times: Vec<f64> = text.lines().filter_map(line_time).collect();
        assert_eq!(times, vec![0.0, 0.1, 0.2]);
        assert_eq!(text.lines().last(), Some("time 0.2\tc 0"));
    }
}
