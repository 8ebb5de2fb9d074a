//! In-memory form of a checkpoint.

use crate::error::CheckpointError;
use pfield_core::TimeState;

/// One field's value vector.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldBlock {
    /// Field name as declared.
    pub name: String,
    /// DOF values.
    pub values: Vec<f64>,
}

/// Time state plus every field's values, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointRecord {
    /// Step, time and step size at the moment of the save.
    pub time: TimeState,
    /// One block per field.
    pub fields: Vec<FieldBlock>,
}

impl CheckpointRecord {
    /// Check that the record holds exactly the given `(name, length)`
    /// fields, in order.
    pub fn check_layout<'a, I>(&self, expected: I) -> Result<(), CheckpointError>
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        let mut count = 0;
        for (i, (name, len)) in expected.into_iter().enumerate() {
            count += 1;
            let Some(block) = self.fields.get(i) else {
                return Err(CheckpointError::FieldMismatch {
                    detail: format!("field '{name}' missing from checkpoint"),
                });
            };
            if block.name != name {
                return Err(CheckpointError::FieldMismatch {
                    detail: format!("field {i} is '{}', expected '{name}'", block.name),
                });
            }
            if block.values.len() != len {
                return Err(CheckpointError::FieldMismatch {
                    detail: format!(
                        "field '{name}' has {} values, expected {len}",
                        block.values.len()
                    ),
                });
            }
        }
        if self.fields.len() != count {
            return Err(CheckpointError::FieldMismatch {
                detail: format!(
                    "checkpoint has {} fields, simulation has {count}",
                    self.fields.len()
                ),
            });
        }
        Ok(())
    }

    /// The block for `name`, if present.
    pub fn field(&self, name: &str) -> Option<&FieldBlock> {
        self.fields.iter().find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CheckpointRecord {
        CheckpointRecord {
            time: TimeState::initial(0.1),
            fields: vec![
                FieldBlock {
                    name: "c".into(),
                    values: vec![0.0; 4],
                },
                FieldBlock {
                    name: "mu".into(),
                    values: vec![0.0; 4],
                },
            ],
        }
    }

    #[test]
    fn matching_layout_passes() {
        record().check_layout([("c", 4), ("mu", 4)]).unwrap();
    }

    #[test]
    fn mismatches_are_reported() {
        let r = record();
        assert!(matches!(
            r.check_layout([("mu", 4), ("c", 4)]),
            Err(CheckpointError::FieldMismatch { .. })
        ));
        assert!(r.check_layout([("c", 4), ("mu", 5)]).is_err());
        assert!(r.check_layout([("c", 4)]).is_err());
        assert!(r.check_layout([("c", 4), ("mu", 4), ("eta", 4)]).is_err());
    }

    #[test]
    fn field_lookup_by_name() {
        assert_eq!(record().field("mu").map(|b| b.values.len()), Some(4));
        assert!(record().field("eta").is_none());
    }
}
