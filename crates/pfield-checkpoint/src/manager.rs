//! Checkpoint files on disk: atomic save, retention, restore.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::codec::{decode_record, encode_record};
use crate::error::CheckpointError;
use crate::record::CheckpointRecord;

const PREFIX: &str = "checkpoint-";
const EXTENSION: &str = "pfck";

/// Writes and finds checkpoints in one directory.
///
/// Files are named `checkpoint-<step>.pfck` with the step zero-padded to
/// eight digits. A save writes a temporary file and renames it into place,
/// so a crash mid-write never leaves a truncated checkpoint under a final
/// name.
#[derive(Clone, Debug)]
pub struct CheckpointManager {
    dir: PathBuf,
    keep: usize,
}

impl CheckpointManager {
    /// Manage checkpoints in `dir`, retaining the `keep` most recent
    /// (`0` keeps all).
    pub fn new(dir: impl Into<PathBuf>, keep: usize) -> Self {
        Self {
            dir: dir.into(),
            keep,
        }
    }

    /// The checkpoint directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a checkpoint for `step` is saved under.
    pub fn path_for(&self, step: u64) -> PathBuf {
        self.dir.join(format!("{PREFIX}{step:08}.{EXTENSION}"))
    }

    /// Serialize `record` to disk and prune old checkpoints.
    ///
    /// Pruning failures are logged; the new checkpoint is in place either
    /// way.
    pub fn save(&self, record: &CheckpointRecord) -> Result<PathBuf, CheckpointError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(record.time.step.0);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));

        let file = File::create(&tmp)?;
        let mut w = encode_record(BufWriter::new(file), record)?;
        w.flush()?;
        let file = w.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;

        info!(step = record.time.step.0, path = %path.display(), "checkpoint saved");
        if let Err(e) = self.prune() {
            warn!(dir = %self.dir.display(), error = %e, "old checkpoints not pruned");
        }
        Ok(path)
    }

    /// Read and verify the checkpoint at `path`.
    pub fn restore(&self, path: &Path) -> Result<CheckpointRecord, CheckpointError> {
        let file = File::open(path)?;
        let record = decode_record(BufReader::new(file))?;
        info!(step = record.time.step.0, path = %path.display(), "checkpoint restored");
        Ok(record)
    }

    /// Restore the most recent checkpoint in the directory.
    pub fn restore_latest(&self) -> Result<CheckpointRecord, CheckpointError> {
        match self.latest()? {
            Some(path) => self.restore(&path),
            None => Err(CheckpointError::NotFound {
                dir: self.dir.display().to_string(),
            }),
        }
    }

    /// Path of the checkpoint with the highest step, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>, CheckpointError> {
        Ok(self.list()?.pop().map(|(_, path)| path))
    }

    /// All checkpoints in the directory, ordered by step.
    pub fn list(&self) -> Result<Vec<(u64, PathBuf)>, CheckpointError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut found = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if let Some(step) = parse_step(&path) {
                found.push((step, path));
            }
        }
        found.sort_by_key(|(step, _)| *step);
        Ok(found)
    }

    fn prune(&self) -> Result<(), CheckpointError> {
        if self.keep == 0 {
            return Ok(());
        }
        let all = self.list()?;
        let excess = all.len().saturating_sub(self.keep);
        for (step, path) in &all[..excess] {
            fs::remove_file(path)?;
            debug!(step, "old checkpoint removed");
        }
        Ok(())
    }
}

fn parse_step(path: &Path) -> Option<u64> {
    if path.extension()? != EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(PREFIX)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldBlock;
    use pfield_core::{StepIndex, TimeState};
    use tempfile::TempDir;

    fn record(step: u64) -> CheckpointRecord {
        CheckpointRecord {
            time: TimeState {
                step: StepIndex(step),
                time: step as f64 * 0.1,
                dt: 0.1,
            },
            fields: vec![FieldBlock {
                name: "c".into(),
                values: vec![0.5; 4],
            }],
        }
    }

    #[test]
    fn failed_prune_still_reports_the_saved_checkpoint() {
        let dir = TempDir::new().unwrap();
        let m = CheckpointManager::new(dir.path(), 1);
        // A directory under a checkpoint name cannot be removed as a file.
        fs::create_dir(m.path_for(1)).unwrap();

        let path = m.save(&record(2)).unwrap();
        assert_eq!(path, m.path_for(2));
        assert_eq!(m.restore(&path).unwrap(), record(2));
        assert_eq!(m.list().unwrap().len(), 2);
    }

    #[test]
    fn file_names_parse_back() {
        let m = CheckpointManager::new("/tmp/run", 0);
        let p = m.path_for(42);
        assert!(p.ends_with("checkpoint-00000042.pfck"));
        assert_eq!(parse_step(&p), Some(42));
        assert_eq!(parse_step(Path::new("checkpoint-00000042.pfck.tmp")), None);
        assert_eq!(parse_step(Path::new("notes.pfck")), None);
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let m = CheckpointManager::new("/nonexistent/pfield/checkpoints", 3);
        assert!(m.list().unwrap().is_empty());
        assert!(matches!(
            m.restore_latest(),
            Err(CheckpointError::NotFound { .. })
        ));
    }
}
