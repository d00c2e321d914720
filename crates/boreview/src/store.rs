//! Reading predictions and writing approved ground truth.
//!
//! A save writes three artifacts under the ground-truth directory:
//!
//! - `<stem>_ground_truth.json`, the record in the input schema
//! - `images/<page image>`, a copy of the reviewed page
//! - `documents/<document>`, a copy of the source document
//!
//! Artifacts are staged as temp files next to their targets and only then
//! moved into place. If any move fails, the ones already moved are undone and
//! previous outputs are restored.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info, warn};

use crate::error::{Result, ReviewError};
use crate::model::{Predictions, Record};
use crate::naming::ground_truth_file_name;

pub const PREDICTIONS_FILE: &str = "predictions.json";
pub const FILTERED_PREDICTIONS_FILE: &str = "predictions_filtered.json";

/// Load a predictions (or ground-truth) document
pub fn load(path: &Path) -> Result<Predictions> {
  let content = fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;
  let predictions: Predictions =
    serde_json::from_str(&content).map_err(|e| ReviewError::parse(path, e.to_string()))?;
  debug!(path = %path.display(), documents = predictions.len(), "loaded predictions");
  Ok(predictions)
}

/// A predictions document whose unreadable entries are set aside instead of failing the file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedPredictions {
  pub records: Predictions,
  /// Document key -> why its entry could not be read
  pub unreadable: BTreeMap<String, String>,
}

/// Load a predictions document entry by entry
///
/// The file itself must be a JSON object; an entry with an unknown shape is
/// recorded in `unreadable` so the rest of the dataset stays reviewable.
pub fn load_predictions(path: &Path) -> Result<LoadedPredictions> {
  let content = fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;
  let entries: Map<String, Value> =
    serde_json::from_str(&content).map_err(|e| ReviewError::parse(path, e.to_string()))?;

  let mut loaded = LoadedPredictions::default();
  for (key, entry) in entries {
    match serde_json::from_value::<Record>(entry) {
      Ok(record) => {
        loaded.records.insert(key, record);
      }
      Err(e) => {
        warn!(path = %path.display(), key = %key, error = %e, "unreadable prediction entry");
        loaded.unreadable.insert(key, e.to_string());
      }
    }
  }
  debug!(
    path = %path.display(),
    documents = loaded.records.len(),
    unreadable = loaded.unreadable.len(),
    "loaded predictions"
  );
  Ok(loaded)
}

/// `predictions.json` in `output_dir`, falling back to `predictions_filtered.json`
pub fn load_default(output_dir: &Path) -> Result<(PathBuf, LoadedPredictions)> {
  for name in [PREDICTIONS_FILE, FILTERED_PREDICTIONS_FILE] {
    let path = output_dir.join(name);
    if path.is_file() {
      let predictions = load_predictions(&path)?;
      return Ok((path, predictions));
    }
  }
  Err(ReviewError::not_found(output_dir.join(PREDICTIONS_FILE)))
}

/// Keys become file names under the output directory, so they must be a single plain name
pub fn check_key(key: &str) -> Result<()> {
  let mut components = Path::new(key).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(name)), None) if name == key => Ok(()),
    _ => Err(ReviewError::validation(format!("`{key}` is not a plain file name"))),
  }
}

/// Path of the ground-truth JSON for a document
pub fn ground_truth_path(ground_truth_dir: &Path, key: &str) -> PathBuf {
  ground_truth_dir.join(ground_truth_file_name(key))
}

/// Read a single ground-truth file; it must hold exactly one entry
pub fn load_record(path: &Path) -> Result<(String, Record)> {
  let saved = load(path)?;
  if saved.len() != 1 {
    return Err(ReviewError::parse(path, format!("expected one record, found {}", saved.len())));
  }
  saved
    .into_iter()
    .next()
    .ok_or_else(|| ReviewError::parse(path, "expected one record, found 0"))
}

/// Previously approved record for `key`, if one was saved
pub fn load_ground_truth(ground_truth_dir: &Path, key: &str) -> Result<Option<Record>> {
  check_key(key)?;
  let path = ground_truth_path(ground_truth_dir, key);
  if !path.is_file() {
    return Ok(None);
  }
  let (saved_key, record) = load_record(&path)?;
  if saved_key != key {
    return Err(ReviewError::parse(&path, format!("holds `{saved_key}`, not `{key}`")));
  }
  Ok(Some(record))
}

/// Source files copied alongside an approved record
#[derive(Debug, Clone, Copy)]
pub struct Artifacts<'a> {
  pub image: &'a Path,
  pub document: &'a Path,
}

/// Where a save put each artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifacts {
  pub record: PathBuf,
  pub image: PathBuf,
  pub document: PathBuf,
}

/// Write the approved record and copies of its sources; all or nothing
pub fn save(
  ground_truth_dir: &Path,
  key: &str,
  record: &Record,
  artifacts: Artifacts<'_>,
) -> Result<SavedArtifacts> {
  check_key(key)?;
  for source in [artifacts.image, artifacts.document] {
    if !source.is_file() {
      return Err(ReviewError::not_found(source));
    }
  }

  let targets = SavedArtifacts {
    record: ground_truth_path(ground_truth_dir, key),
    image: ground_truth_dir.join("images").join(file_name(artifacts.image)?),
    document: ground_truth_dir.join("documents").join(file_name(artifacts.document)?),
  };

  let mut document = BTreeMap::new();
  document.insert(key.to_string(), record);
  let json = to_pretty_json(&targets.record, &document)?;

  let staged = vec![
    stage_bytes(&targets.record, json.as_bytes())?,
    stage_copy(&targets.image, artifacts.image)?,
    stage_copy(&targets.document, artifacts.document)?,
  ];

  commit(staged)?;
  info!(key, path = %targets.record.display(), "saved ground truth");
  Ok(targets)
}

/// Replace `path` with `document` as pretty JSON, leaving the old file intact on failure
pub fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<()> {
  let json = to_pretty_json(path, document)?;
  commit(vec![stage_bytes(path, json.as_bytes())?])?;
  info!(path = %path.display(), "wrote document");
  Ok(())
}

fn to_pretty_json<T: Serialize>(path: &Path, document: &T) -> Result<String> {
  let mut json =
    serde_json::to_string_pretty(document).map_err(|e| ReviewError::parse(path, e.to_string()))?;
  json.push('\n');
  Ok(json)
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
  path.file_name().ok_or_else(|| ReviewError::not_found(path))
}

/// A fully written temp file waiting to replace `target`
struct Staged {
  temp: TempPath,
  target: PathBuf,
}

fn staging_file(target: &Path) -> Result<NamedTempFile> {
  let parent = target.parent().unwrap_or_else(|| Path::new("."));
  fs::create_dir_all(parent).map_err(|e| ReviewError::io(parent, e))?;
  tempfile::Builder::new()
    .prefix(".staged-")
    .tempfile_in(parent)
    .map_err(|e| ReviewError::io(parent, e))
}

fn stage_bytes(target: &Path, bytes: &[u8]) -> Result<Staged> {
  let mut file = staging_file(target)?;
  file.write_all(bytes).map_err(|e| ReviewError::io(file.path(), e))?;
  file.as_file().sync_all().map_err(|e| ReviewError::io(file.path(), e))?;
  Ok(Staged { temp: file.into_temp_path(), target: target.to_path_buf() })
}

fn stage_copy(target: &Path, source: &Path) -> Result<Staged> {
  let mut file = staging_file(target)?;
  let mut reader = fs::File::open(source).map_err(|e| ReviewError::io(source, e))?;
  std::io::copy(&mut reader, &mut file).map_err(|e| ReviewError::io(source, e))?;
  file.as_file().sync_all().map_err(|e| ReviewError::io(file.path(), e))?;
  Ok(Staged { temp: file.into_temp_path(), target: target.to_path_buf() })
}

fn backup_path(target: &Path) -> PathBuf {
  let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".bak");
  target.with_file_name(name)
}

/// Target moved into place, with the backup of what it replaced
struct Committed {
  target: PathBuf,
  backup: Option<PathBuf>,
}

fn commit(staged: Vec<Staged>) -> Result<()> {
  let mut committed: Vec<Committed> = Vec::new();

  for Staged { temp, target } in staged {
    let backup = if target.exists() {
      let backup = backup_path(&target);
      if let Err(e) = fs::rename(&target, &backup) {
        rollback(committed);
        return Err(ReviewError::io(&target, e));
      }
      Some(backup)
    } else {
      None
    };

    if let Err(e) = temp.persist(&target) {
      if let Some(backup) = &backup {
        let _ = fs::rename(backup, &target);
      }
      rollback(committed);
      return Err(ReviewError::io(&target, e.error));
    }

    committed.push(Committed { target, backup });
  }

  for Committed { backup, .. } in committed {
    if let Some(backup) = backup {
      if let Err(e) = fs::remove_file(&backup) {
        warn!(path = %backup.display(), error = %e, "could not remove backup");
      }
    }
  }
  Ok(())
}

fn rollback(committed: Vec<Committed>) {
  for Committed { target, backup } in committed.into_iter().rev() {
    let restored = match &backup {
      Some(backup) => fs::rename(backup, &target),
      None => fs::remove_file(&target),
    };
    if let Err(e) = restored {
      warn!(path = %target.display(), error = %e, "rollback failed");
    }
  }
}
