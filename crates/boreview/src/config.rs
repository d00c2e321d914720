//! Configuration management for boreview
//!
//! Locates the predictions file, the page image and source document
//! directories, and the ground-truth output directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, ReviewError};

/// Files searched in the working directory, in order
pub const LOCAL_CONFIG_PATHS: [&str; 3] =
  ["boreview.json", ".boreview.json", ".boreview/config.json"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
  /// Predictions file; `None` means `predictions.json` (or the filtered copy) in `output_dir`
  #[serde(default)]
  pub predictions: Option<PathBuf>,
  /// Rendered page images (`<document>_page<N>.png`)
  #[serde(default = "default_images_dir")]
  pub images_dir: PathBuf,
  /// Original source documents
  #[serde(default = "default_documents_dir")]
  pub documents_dir: PathBuf,
  /// Pipeline output directory; ground truth goes to `<output_dir>/ground_truth`
  #[serde(default = "default_output_dir")]
  pub output_dir: PathBuf,
}

fn default_images_dir() -> PathBuf {
  PathBuf::from("data/output/draw")
}
fn default_documents_dir() -> PathBuf {
  PathBuf::from("data/input")
}
fn default_output_dir() -> PathBuf {
  PathBuf::from("data/output")
}

impl Default for ReviewConfig {
  fn default() -> Self {
    Self {
      predictions: None,
      images_dir: default_images_dir(),
      documents_dir: default_documents_dir(),
      output_dir: default_output_dir(),
    }
  }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub predictions: Option<PathBuf>,
  pub images_dir: Option<PathBuf>,
  pub documents_dir: Option<PathBuf>,
  pub output_dir: Option<PathBuf>,
}

impl ReviewConfig {
  /// Load configuration from a file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| ReviewError::config(path, e.to_string()))
  }

  /// Explicit file, else the first config found in `dir`, else the user config dir, else defaults
  pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
    if let Some(path) = explicit {
      return Self::load_from_file(path);
    }

    let user_config = dirs::config_dir().map(|d| d.join("boreview").join("config.json"));
    let candidates = LOCAL_CONFIG_PATHS.iter().map(|p| dir.join(p)).chain(user_config);

    for candidate in candidates {
      if candidate.is_file() {
        debug!(path = %candidate.display(), "using config file");
        return Self::load_from_file(candidate);
      }
    }

    Ok(Self::default())
  }

  pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
    if let Some(predictions) = overrides.predictions {
      self.predictions = Some(predictions);
    }
    if let Some(images_dir) = overrides.images_dir {
      self.images_dir = images_dir;
    }
    if let Some(documents_dir) = overrides.documents_dir {
      self.documents_dir = documents_dir;
    }
    if let Some(output_dir) = overrides.output_dir {
      self.output_dir = output_dir;
    }
    self
  }

  pub fn ground_truth_dir(&self) -> PathBuf {
    self.output_dir.join("ground_truth")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn test_defaults() {
    let config = ReviewConfig::default();
    assert_eq!(config.images_dir, PathBuf::from("data/output/draw"));
    assert_eq!(config.ground_truth_dir(), PathBuf::from("data/output/ground_truth"));
    assert!(config.predictions.is_none());
  }

  #[test]
  fn test_partial_file_fills_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("boreview.json");
    fs::write(&path, r#"{"output_dir": "/tmp/gt"}"#).unwrap();

    let config = ReviewConfig::discover(None, temp.path()).unwrap();
    assert_eq!(config.output_dir, PathBuf::from("/tmp/gt"));
    assert_eq!(config.documents_dir, PathBuf::from("data/input"));
  }

  #[test]
  fn test_unknown_keys_are_config_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cfg.json");
    fs::write(&path, r#"{"output": "x"}"#).unwrap();

    let err = ReviewConfig::discover(Some(&path), temp.path()).unwrap_err();
    assert!(matches!(err, ReviewError::Config { .. }));
  }

  #[test]
  fn test_missing_explicit_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope.json");
    let err = ReviewConfig::discover(Some(&missing), temp.path()).unwrap_err();
    assert!(matches!(err, ReviewError::NotFound { .. }));
  }

  #[test]
  fn test_overrides_win() {
    let config = ReviewConfig::default().with_overrides(ConfigOverrides {
      images_dir: Some(PathBuf::from("pages")),
      ..Default::default()
    });
    assert_eq!(config.images_dir, PathBuf::from("pages"));
    assert_eq!(config.output_dir, PathBuf::from("data/output"));
  }
}
