//! Binary encode/decode for checkpoint records.
//!
//! All integers are little-endian. Names are length-prefixed with a `u32`,
//! value vectors with a `u64` element count.

use std::io::{Read, Write};

use pfield_core::{StepIndex, TimeState};

use crate::error::CheckpointError;
use crate::hash::{HashingReader, HashingWriter};
use crate::record::{CheckpointRecord, FieldBlock};
use crate::{FORMAT_VERSION, MAGIC};

/// Longest field name accepted on decode.
const MAX_NAME_LEN: usize = 4096;

/// Values reserved up front while decoding a block; larger blocks grow as
/// they are read so a corrupt count cannot force a huge allocation.
const RESERVE_CHUNK: usize = 1 << 16;

// ── Primitive writers ───────────────────────────────────────────

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CheckpointError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), CheckpointError> {
    let len = u32::try_from(s.len()).map_err(|_| CheckpointError::Malformed {
        detail: format!("field name of {} bytes is too long", s.len()),
    })?;
    write_u32_le(w, len)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

fn read_u8(r: &mut dyn Read) -> Result<u8, CheckpointError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32_le(r: &mut dyn Read) -> Result<u32, CheckpointError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut dyn Read) -> Result<u64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64_le(r: &mut dyn Read) -> Result<f64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, CheckpointError> {
    let len = read_u32_le(r)? as usize;
    if len > MAX_NAME_LEN {
        return Err(CheckpointError::Malformed {
            detail: format!("field name length {len} exceeds {MAX_NAME_LEN}"),
        });
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| CheckpointError::Malformed {
        detail: format!("invalid UTF-8 field name: {e}"),
    })
}

/// Map an unexpected EOF to [`CheckpointError::Malformed`].
fn truncated(e: CheckpointError, what: &str) -> CheckpointError {
    match e {
        CheckpointError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            CheckpointError::Malformed {
                detail: format!("truncated {what}"),
            }
        }
        other => other,
    }
}

// ── Record encode/decode ────────────────────────────────────────

/// Encode a full record, including the trailing hash.
pub fn encode_record<W: Write>(w: W, record: &CheckpointRecord) -> Result<W, CheckpointError> {
    let mut hw = HashingWriter::new(w);
    hw.write_all(&MAGIC)?;
    write_u8(&mut hw, FORMAT_VERSION)?;

    write_u64_le(&mut hw, record.time.step.0)?;
    write_f64_le(&mut hw, record.time.time)?;
    write_f64_le(&mut hw, record.time.dt)?;
    let count = u32::try_from(record.fields.len()).map_err(|_| CheckpointError::Malformed {
        detail: format!("{} fields exceed the format limit", record.fields.len()),
    })?;
    write_u32_le(&mut hw, count)?;

    for block in &record.fields {
        write_length_prefixed_str(&mut hw, &block.name)?;
        write_u64_le(&mut hw, block.values.len() as u64)?;
        for &v in &block.values {
            write_f64_le(&mut hw, v)?;
        }
    }

    let (mut w, hash) = hw.into_parts();
    write_u64_le(&mut w, hash)?;
    Ok(w)
}

/// Decode and verify a full record.
///
/// Fails on bad magic or version, truncation, trailing bytes, or a hash
/// mismatch.
pub fn decode_record<R: Read>(r: R) -> Result<CheckpointRecord, CheckpointError> {
    let mut hr = HashingReader::new(r);

    let mut magic = [0u8; 4];
    hr.read_exact(&mut magic)
        .map_err(|e| truncated(e.into(), "header"))?;
    if magic != MAGIC {
        return Err(CheckpointError::InvalidMagic);
    }
    let version = read_u8(&mut hr).map_err(|e| truncated(e, "header"))?;
    if version != FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion { found: version });
    }

    let header = (|| -> Result<_, CheckpointError> {
        let step = read_u64_le(&mut hr)?;
        let time = read_f64_le(&mut hr)?;
        let dt = read_f64_le(&mut hr)?;
        let count = read_u32_le(&mut hr)?;
        Ok((step, time, dt, count))
    })();
    let (step, time, dt, count) = header.map_err(|e| truncated(e, "header"))?;

    let mut fields = Vec::with_capacity((count as usize).min(RESERVE_CHUNK));
    for i in 0..count {
        let block = decode_block(&mut hr).map_err(|e| truncated(e, &format!("field block {i}")))?;
        fields.push(block);
    }

    let (mut r, computed) = hr.into_parts();
    let stored = read_u64_le(&mut r).map_err(|e| truncated(e, "hash trailer"))?;
    if stored != computed {
        return Err(CheckpointError::HashMismatch { stored, computed });
    }
    let mut extra = [0u8; 1];
    if r.read(&mut extra)? != 0 {
        return Err(CheckpointError::Malformed {
            detail: "trailing bytes after hash".into(),
        });
    }

    Ok(CheckpointRecord {
        time: TimeState {
            step: StepIndex(step),
            time,
            dt,
        },
        fields,
    })
}

fn decode_block(r: &mut dyn Read) -> Result<FieldBlock, CheckpointError> {
    let name = read_length_prefixed_str(r)?;
    let len = read_u64_le(r)?;
    let len = usize::try_from(len).map_err(|_| CheckpointError::Malformed {
        detail: format!("field '{name}' length {len} does not fit in memory"),
    })?;
    let mut values = Vec::with_capacity(len.min(RESERVE_CHUNK));
    for _ in 0..len {
        values.push(read_f64_le(r)?);
    }
    Ok(FieldBlock { name, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record() -> CheckpointRecord {
        CheckpointRecord {
            time: TimeState {
                step: StepIndex(12),
                time: 1.2,
                dt: 0.1,
            },
            fields: vec![
                FieldBlock {
                    name: "c".into(),
                    values: vec![0.5, -0.25, f64::MIN_POSITIVE],
                },
                FieldBlock {
                    name: "mu".into(),
                    values: vec![],
                },
            ],
        }
    }

    fn encoded() -> Vec<u8> {
        encode_record(Vec::new(), &record()).unwrap()
    }

    #[test]
    fn header_layout() {
        let bytes = encoded();
        assert_eq!(&bytes[..4], b"PFCK");
        assert_eq!(bytes[4], FORMAT_VERSION);
        assert_eq!(u64::from_le_bytes(bytes[5..13].try_into().unwrap()), 12);
    }

    #[test]
    fn decode_restores_every_bit() {
        assert_eq!(decode_record(encoded().as_slice()).unwrap(), record());
    }

    #[test]
    fn bad_magic_and_version() {
        let mut bytes = encoded();
        bytes[0] = b'X';
        assert!(matches!(
            decode_record(bytes.as_slice()),
            Err(CheckpointError::InvalidMagic)
        ));
        let mut bytes = encoded();
        bytes[4] = 9;
        assert!(matches!(
            decode_record(bytes.as_slice()),
            Err(CheckpointError::UnsupportedVersion { found: 9 })
        ));
    }

    #[test]
    fn flipped_value_bit_fails_hash() {
        let mut bytes = encoded();
        let last_value = bytes.len() - 8 - 4 - 2 - 8 - 1;
        bytes[last_value] ^= 0x01;
        assert!(matches!(
            decode_record(bytes.as_slice()),
            Err(CheckpointError::HashMismatch { .. })
        ));
    }

    #[test]
    fn truncation_is_malformed_not_io() {
        let bytes = encoded();
        for cut in [3, 10, 30, bytes.len() - 1] {
            let err = decode_record(&bytes[..cut]).unwrap_err();
            assert!(
                matches!(err, CheckpointError::Malformed { .. } | CheckpointError::InvalidMagic),
                "cut at {cut}: {err}"
            );
        }
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encoded();
        bytes.push(0);
        assert!(matches!(
            decode_record(bytes.as_slice()),
            Err(CheckpointError::Malformed { .. })
        ));
    }

    proptest! {
        #[test]
        fn arbitrary_vectors_survive(
            values in prop::collection::vec(any::<f64>(), 0..64),
            step in any::<u64>(),
        ) {
            let rec = CheckpointRecord {
                time: TimeState { step: StepIndex(step), time: 0.0, dt: 1.0 },
                fields: vec![FieldBlock { name: "u".into(), values: values.clone() }],
            };
            let bytes = encode_record(Vec::new(), &rec).unwrap();
            let back = decode_record(bytes.as_slice()).unwrap();
            let bits: Vec<u64> = back.fields[0].values.iter().map(|v| v.to_bits()).collect();
            let expected: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(bits, expected);
            prop_assert_eq!(back.time.step, StepIndex(step));
        }
    }
}
