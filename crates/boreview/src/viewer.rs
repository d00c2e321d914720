//! The page image shown next to the record.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::warn;

use crate::error::{Result, ReviewError};

/// Pane size assumed when the real one is unknown
pub const FALLBACK_PANE: (u32, u32) = (800, 600);
/// Pixels of one terminal cell, used to size a pane given in columns and rows
pub const CELL_PIXELS: (u32, u32) = (8, 16);

/// Pixel size of a pane of `columns` x `rows` terminal cells
pub fn pane_pixels(columns: usize, rows: usize) -> (u32, u32) {
  let cells = |n: usize, px: u32| u32::try_from(n).unwrap_or(u32::MAX).saturating_mul(px);
  (cells(columns, CELL_PIXELS.0), cells(rows, CELL_PIXELS.1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
  pub path: PathBuf,
  pub width: u32,
  pub height: u32,
}

impl PageView {
  /// Read the image header; missing or unreadable files are errors
  pub fn open(path: &Path) -> Result<Self> {
    if !path.is_file() {
      return Err(ReviewError::not_found(path));
    }
    let (width, height) =
      image::image_dimensions(path).map_err(|e| ReviewError::image(path, e.to_string()))?;
    Ok(Self { path: path.to_path_buf(), width, height })
  }

  /// Scale used to show the page inside a pane of `pane` pixels
  pub fn fit_scale(&self, pane: (u32, u32)) -> f64 {
    fit_scale((self.width, self.height), pane)
  }
}

/// Shrink to fit; only enlarge small images (under half the pane width) by more than 2x
pub fn fit_scale(image: (u32, u32), pane: (u32, u32)) -> f64 {
  let (iw, ih) = image;
  let (pw, ph) = if pane.0 <= 1 || pane.1 <= 1 { FALLBACK_PANE } else { pane };
  if iw == 0 || ih == 0 {
    return 1.0;
  }

  let scale = (pw as f64 / iw as f64).min(ph as f64 / ih as f64);
  if scale < 1.0 || (scale > 2.0 && iw < pw / 2) {
    scale
  } else {
    1.0
  }
}

fn viewer_command(path: &Path) -> Command {
  if cfg!(target_os = "macos") {
    let mut cmd = Command::new("open");
    cmd.arg(path);
    cmd
  } else if cfg!(target_os = "windows") {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]).arg(path);
    cmd
  } else {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(path);
    cmd
  }
}

/// Hand the image to the platform viewer without waiting for it
///
/// The launcher is reaped on a background thread so it does not linger as a zombie.
pub fn open_external(path: &Path) -> Result<()> {
  if !path.is_file() {
    return Err(ReviewError::not_found(path));
  }
  launch(viewer_command(path), path)
}

fn launch(mut command: Command, path: &Path) -> Result<()> {
  let mut child = command
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .map_err(|e| ReviewError::image(path, format!("could not start the image viewer: {e}")))?;

  let shown = path.to_path_buf();
  thread::spawn(move || match child.wait() {
    Ok(status) if !status.success() => {
      warn!(path = %shown.display(), %status, "image viewer exited with an error")
    }
    Ok(_) => {}
    Err(e) => warn!(path = %shown.display(), error = %e, "could not wait for image viewer"),
  });
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_large_image_shrinks() {
    let scale = fit_scale((1600, 1200), (800, 600));
    assert!((scale - 0.5).abs() < 1e-9);
  }

  #[test]
  fn test_slightly_small_image_keeps_size() {
    assert_eq!(fit_scale((500, 400), (800, 600)), 1.0);
  }

  #[test]
  fn test_tiny_image_enlarges() {
    let scale = fit_scale((100, 100), (800, 600));
    assert!((scale - 6.0).abs() < 1e-9);
  }

  #[test]
  fn test_pane_pixels_from_cells() {
    assert_eq!(pane_pixels(36, 30), (288, 480));
    assert_eq!(pane_pixels(0, 30), (0, 480));
    assert_eq!(fit_scale((576, 480), pane_pixels(36, 30)), 0.5);
  }

  #[test]
  fn test_unknown_pane_uses_fallback() {
    assert_eq!(fit_scale((1600, 1200), (0, 0)), fit_scale((1600, 1200), FALLBACK_PANE));
  }

  #[cfg(unix)]
  #[test]
  fn test_launch_returns_without_waiting_and_reaps() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("page.png");

    let mut slow = Command::new("sh");
    slow.args(["-c", "sleep 1"]);
    let started = std::time::Instant::now();
    launch(slow, &page).unwrap();
    assert!(started.elapsed() < std::time::Duration::from_millis(900));

    let err = launch(Command::new("/nonexistent/viewer"), &page).unwrap_err();
    assert!(err.to_string().contains("could not start the image viewer"));
  }

  #[test]
  fn test_open_reads_png_header() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("page.png");
    image::RgbImage::new(3, 2).save(&path).unwrap();

    let view = PageView::open(&path).unwrap();
    assert_eq!((view.width, view.height), (3, 2));
  }

  #[test]
  fn test_open_rejects_missing_and_garbage() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.png");
    assert!(matches!(PageView::open(&missing).unwrap_err(), ReviewError::NotFound { .. }));

    let garbage = temp.path().join("garbage.png");
    std::fs::write(&garbage, b"not a png").unwrap();
    assert!(matches!(PageView::open(&garbage).unwrap_err(), ReviewError::Image { .. }));
    assert!(open_external(&missing).is_err());
  }
}
