//! Artifact persistence.
//!
//! Every write lands in a `.tmp` sibling first and is renamed into place, so a
//! concurrently running reader sees either the previous artifact or the new
//! one, never a partial file.
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PipelineError, Result, Stage};

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

fn ensure_parent(path: &Path, stage: Stage) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            PipelineError::artifact_with(
                stage,
                format!("cannot create artifact directory {}", parent.display()),
                e,
            )
        })?;
    }
    Ok(())
}

/// Write `bytes` to `path` through a temporary file and an atomic rename.
pub fn write_atomic(path: &Path, bytes: &[u8], stage: Stage) -> Result<()> {
    ensure_parent(path, stage)?;
    let tmp = temp_path(path);
    fs::write(&tmp, bytes).map_err(|e| {
        PipelineError::artifact_with(stage, format!("cannot write {}", tmp.display()), e)
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        PipelineError::artifact_with(stage, format!("cannot move artifact into {}", path.display()), e)
    })
}

/// A group of files that should appear together or not at all.
///
/// Files are written to temporaries by [`StagedWrites::stage`]; nothing is
/// visible at the final locations until [`StagedWrites::commit`]. Dropping an
/// uncommitted group removes its temporaries.
#[derive(Debug)]
pub struct StagedWrites {
    stage: Stage,
    pending: Vec<(PathBuf, PathBuf)>,
}

impl StagedWrites {
    pub fn new(stage: Stage) -> Self {
        StagedWrites {
            stage,
            pending: Vec::new(),
        }
    }

    pub fn stage(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        ensure_parent(path, self.stage)?;
        let tmp = temp_path(path);
        fs::write(&tmp, bytes).map_err(|e| {
            PipelineError::artifact_with(self.stage, format!("cannot write {}", tmp.display()), e)
        })?;
        self.pending.push((tmp, path.to_path_buf()));
        Ok(())
    }

    pub fn commit(mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        let mut iter = pending.into_iter();
        while let Some((tmp, target)) = iter.next() {
            if let Err(e) = fs::rename(&tmp, &target) {
                let _ = fs::remove_file(&tmp);
                for (rest, _) in iter {
                    let _ = fs::remove_file(rest);
                }
                return Err(PipelineError::artifact_with(
                    self.stage,
                    format!("cannot move artifact into {}", target.display()),
                    e,
                ));
            }
        }
        Ok(())
    }
}

impl Drop for StagedWrites {
    fn drop(&mut self) {
        for (tmp, _) in self.pending.drain(..) {
            let _ = fs::remove_file(tmp);
        }
    }
}

/// Serialize `value` with bincode and persist it atomically.
pub fn save_artifact<T: Serialize>(path: &Path, value: &T, stage: Stage) -> Result<()> {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(|e| {
        PipelineError::artifact_with(stage, format!("cannot serialize {}", path.display()), e)
    })?;
    write_atomic(path, &bytes, stage)?;
    log::debug!("Saved artifact {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Load a bincode artifact written by [`save_artifact`].
pub fn load_artifact<T: DeserializeOwned>(path: &Path, stage: Stage) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| {
        PipelineError::artifact_with(stage, format!("cannot read artifact {}", path.display()), e)
    })?;
    let (value, consumed) =
        bincode::serde::decode_from_slice::<T, _>(&bytes, bincode::config::standard()).map_err(
            |e| PipelineError::artifact_with(stage, format!("cannot deserialize {}", path.display()), e),
        )?;
    if consumed != bytes.len() {
        return Err(PipelineError::artifact(
            stage,
            format!(
                "trailing bytes in {}: decoded {} of {}",
                path.display(),
                consumed,
                bytes.len()
            ),
        ));
    }
    Ok(value)
}
