//! Test utilities for pfield development.
//!
//! Provides a mock [`FieldReader`], fixture equations (see [`fixtures`]),
//! small meshes, and [`ParamsBuilder`] for writing parameter files in
//! tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashMap;
use std::sync::Arc;

use pfield_core::{FieldId, FieldReader};
use pfield_mesh::StructuredMesh;
use serde_json::{json, Value};

pub mod fixtures;

pub use fixtures::{ConstantRate, DtSensitive, NanEquation, ZeroUpdate};

/// Mock implementation of [`FieldReader`].
///
/// Backed by a `HashMap<FieldId, Vec<f64>>`. Pre-populate fields with
/// [`set_field`](MockFieldReader::set_field) before passing to code under
/// test.
#[derive(Default)]
pub struct MockFieldReader {
    fields: HashMap<FieldId, Vec<f64>>,
}

impl MockFieldReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a field with data for testing.
    pub fn set_field(&mut self, field: FieldId, data: Vec<f64>) {
        self.fields.insert(field, data);
    }
}

impl FieldReader for MockFieldReader {
    fn read(&self, field: FieldId) -> Option<&[f64]> {
        self.fields.get(&field).map(|v| v.as_slice())
    }
}

/// `[0, 1]` split into `n` cells.
pub fn unit_interval(n: usize, partitions: usize) -> Arc<StructuredMesh> {
    Arc::new(StructuredMesh::new(&[1.0], &[n], partitions).expect("valid test mesh"))
}

/// `[0, 1]²` split into `n × n` cells.
pub fn unit_square(n: usize, partitions: usize) -> Arc<StructuredMesh> {
    Arc::new(StructuredMesh::new(&[1.0, 1.0], &[n, n], partitions).expect("valid test mesh"))
}

/// Builder for JSON parameter files.
///
/// Starts from a 1D mesh of 8 cells, `dt = 0.01`, 10 steps, no fields and
/// no output cadence.
///
/// ```
/// use pfield_test_utils::ParamsBuilder;
///
/// let params = ParamsBuilder::new()
///     .scalar("u", "EXPLICIT_TIME_DEPENDENT", serde_json::json!({ "model": "frozen" }))
///     .build();
/// assert_eq!(params["fields"][0]["name"], "u");
/// ```
#[derive(Clone, Debug)]
pub struct ParamsBuilder {
    root: Value,
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self {
            root: json!({
                "mesh": { "lengths": [1.0], "subdivisions": [8] },
                "time": { "dt": 0.01, "max_steps": 10 },
                "fields": [],
            }),
        }
    }

    /// Replace the mesh section.
    pub fn mesh(mut self, lengths: &[f64], subdivisions: &[usize], partitions: usize) -> Self {
        self.root["mesh"] = json!({
            "lengths": lengths,
            "subdivisions": subdivisions,
            "partitions": partitions,
        });
        self
    }

    /// Step size and step count.
    pub fn steps(mut self, dt: f64, max_steps: u64) -> Self {
        self.root["time"] = json!({ "dt": dt, "max_steps": max_steps });
        self
    }

    /// Step size and end time.
    pub fn until(mut self, dt: f64, end_time: f64) -> Self {
        self.root["time"] = json!({ "dt": dt, "end_time": end_time });
        self
    }

    /// Append a scalar field with a constant initial condition of zero and
    /// zero-derivative boundaries.
    pub fn scalar(self, name: &str, pde_type: &str, equation: Value) -> Self {
        self.field(json!({
            "name": name,
            "rank": "SCALAR",
            "pde_type": pde_type,
            "equation": equation,
            "initial_condition": { "type": "constant", "value": 0.0 },
            "boundary_conditions": "ZERO_DERIVATIVE",
        }))
    }

    /// Append a raw field entry.
    pub fn field(mut self, field: Value) -> Self {
        if let Some(fields) = self.root["fields"].as_array_mut() {
            fields.push(field);
        }
        self
    }

    /// Set `key` on the most recently added field.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        if let Some(last) = self.root["fields"].as_array_mut().and_then(|f| f.last_mut()) {
            last[key] = value;
        }
        self
    }

    /// Set a top-level section or key.
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.root[key] = value;
        self
    }

    /// Remove a top-level section or key.
    pub fn without(mut self, key: &str) -> Self {
        if let Some(obj) = self.root.as_object_mut() {
            obj.remove(key);
        }
        self
    }

    pub fn build(self) -> Value {
        self.root
    }

    /// Serialized parameter file.
    pub fn to_json(&self) -> String {
        self.root.to_string()
    }
}
