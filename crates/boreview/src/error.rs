use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
  #[error("File not found: {}", path.display())]
  NotFound { path: PathBuf },

  #[error("Failed to parse {}: {message}", path.display())]
  Parse { path: PathBuf, message: String },

  #[error("{message}")]
  Validation { message: String },

  #[error("No {kind} at index {index} (have {len})")]
  Selection { kind: &'static str, index: usize, len: usize },

  #[error("Failed to read image {}: {message}", path.display())]
  Image { path: PathBuf, message: String },

  #[error("Invalid configuration in {}: {message}", path.display())]
  Config { path: PathBuf, message: String },

  #[error("I/O error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl ReviewError {
  pub fn not_found(path: impl AsRef<Path>) -> Self {
    Self::NotFound { path: path.as_ref().to_path_buf() }
  }

  pub fn parse(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
    Self::Parse { path: path.as_ref().to_path_buf(), message: message.into() }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation { message: message.into() }
  }

  pub fn selection(kind: &'static str, index: usize, len: usize) -> Self {
    Self::Selection { kind, index, len }
  }

  pub fn image(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
    Self::Image { path: path.as_ref().to_path_buf(), message: message.into() }
  }

  pub fn config(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
    Self::Config { path: path.as_ref().to_path_buf(), message: message.into() }
  }

  /// Wrap an I/O error, mapping `NotFound` to the dedicated variant
  pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
    if source.kind() == std::io::ErrorKind::NotFound {
      return Self::not_found(path);
    }
    Self::Io { path: path.as_ref().to_path_buf(), source }
  }
}

pub type Result<T> = std::result::Result<T, ReviewError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_io_not_found_maps_to_not_found() {
    let err = ReviewError::io("missing.json", std::io::Error::from(std::io::ErrorKind::NotFound));
    assert!(matches!(err, ReviewError::NotFound { .. }));
    assert_eq!(err.to_string(), "File not found: missing.json");
  }

  #[test]
  fn test_io_other_kinds_stay_io() {
    let err =
      ReviewError::io("out", std::io::Error::from(std::io::ErrorKind::PermissionDenied));
    assert!(matches!(err, ReviewError::Io { .. }));
  }

  #[test]
  fn test_selection_message() {
    let err = ReviewError::selection("layer", 4, 2);
    assert_eq!(err.to_string(), "No layer at index 4 (have 2)");
  }
}
