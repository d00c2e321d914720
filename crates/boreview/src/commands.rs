use anyhow::{anyhow, Context, Result};
use colored::*;
use std::io;
use std::path::Path;

use crate::cli::Driver;
use crate::config::ReviewConfig;
use crate::display;
use crate::naming::{file_name, list_files};
use crate::quality;
use crate::session::{update, Action, ReviewState, Tab, Workspace};
use crate::store::{FILTERED_PREDICTIONS_FILE, PREDICTIONS_FILE};

/// Terminal width, or 80 when stdout is not a terminal
pub fn terminal_width() -> usize {
  let term = console::Term::stdout();
  if term.is_term() {
    term.size().1 as usize
  } else {
    80
  }
}

fn open_workspace(config: ReviewConfig) -> Result<Workspace> {
  Workspace::open(config).context("Could not load predictions")
}

/// Interactive review session
pub fn review(config: ReviewConfig, start: Option<String>) -> Result<()> {
  let workspace = open_workspace(config)?;
  if let Some(path) = &workspace.predictions_path {
    tally::info(&format!("Loaded: {}", path.display()));
  }
  if !workspace.unreadable().is_empty() {
    tally::warn(&format!(
      "{} prediction entries could not be read; they are listed but can only be skipped",
      workspace.unreadable().len()
    ));
  }

  let state = ReviewState::new(&workspace, start.as_deref())?;
  let stdin = io::stdin();
  let driver = Driver::new(&workspace, stdin.lock(), io::stdout(), terminal_width());
  driver.run(state)?;
  Ok(())
}

/// Print one record with every tab, without prompting
pub fn show(config: ReviewConfig, key: String) -> Result<()> {
  let workspace = open_workspace(config)?;
  let state = ReviewState::new(&workspace, Some(&key))?;
  let width = terminal_width();

  let mut state = state;
  for tab in Tab::ALL {
    state = update(state, Action::ShowTab(tab), &workspace).state;
    print!("{}", display::render_screen(&state, &workspace, width));
  }
  Ok(())
}

/// A layer whose interval runs backwards
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalViolation {
  pub key: String,
  pub borehole_index: u32,
  pub layer: usize,
  pub start: f64,
  pub end: f64,
}

pub fn find_violations(workspace: &Workspace) -> Vec<IntervalViolation> {
  let mut violations = Vec::new();
  for (key, record) in workspace.predictions() {
    for borehole in &record.boreholes {
      for (i, layer) in borehole.layers.iter().enumerate() {
        if let (Some(start), Some(end)) = (layer.depth_interval.start, layer.depth_interval.end) {
          if start > end {
            violations.push(IntervalViolation {
              key: key.clone(),
              borehole_index: borehole.borehole_index,
              layer: i,
              start,
              end,
            });
          }
        }
      }
    }
  }
  violations
}

/// Report layers with start > end; fails when any are found
pub fn check(config: ReviewConfig) -> Result<()> {
  let workspace = open_workspace(config)?;
  let violations = find_violations(&workspace);

  for v in &violations {
    println!(
      "{} BH{} layer {}: start {} > end {}",
      v.key.yellow(),
      v.borehole_index,
      v.layer,
      v.start,
      v.end
    );
  }

  for (key, reason) in workspace.unreadable() {
    println!("{}: unreadable ({})", key.yellow(), reason);
  }

  let documents = workspace.predictions().len();
  let unreadable = workspace.unreadable().len();
  match (violations.len(), unreadable) {
    (0, 0) => {
      println!("{} {} documents, all depth intervals ordered", "✓".green(), documents);
      Ok(())
    }
    (0, n) => Err(anyhow!("{n} prediction entries could not be read")),
    (v, 0) => Err(anyhow!("{v} layer(s) with start depth greater than end depth")),
    (v, n) => {
      Err(anyhow!("{v} layer(s) with start depth greater than end depth, {n} unreadable entries"))
    }
  }
}

/// Write `predictions_filtered.json` with the documents rated 5/5 in `classifications`
pub fn filter(config: ReviewConfig, classifications: &Path) -> Result<()> {
  let predictions =
    config.predictions.clone().unwrap_or_else(|| config.output_dir.join(PREDICTIONS_FILE));
  let output = config.output_dir.join(FILTERED_PREDICTIONS_FILE);
  if predictions == output {
    return Err(anyhow!("Refusing to overwrite the input {}", predictions.display()));
  }

  let summary = quality::filter_predictions(&predictions, classifications, &output)
    .with_context(|| format!("Could not filter {}", predictions.display()))?;

  tally::info(&format!("{} documents rated 5/5 in {}", summary.perfect, classifications.display()));
  for key in &summary.kept {
    tally::info(&format!("  - {key}"));
  }
  tally::success(&format!(
    "Kept {} of {} predictions in {}",
    summary.kept.len(),
    summary.total,
    output.display()
  ));
  Ok(())
}

/// Export the page image file names, naturally sorted, as a one-column CSV
pub fn list(config: ReviewConfig, csv_path: &Path) -> Result<()> {
  let files = list_files(&config.images_dir)
    .with_context(|| format!("Could not read {}", config.images_dir.display()))?;

  let mut writer = csv::Writer::from_path(csv_path)
    .with_context(|| format!("Could not create {}", csv_path.display()))?;
  writer.write_record(["filename"])?;
  for file in &files {
    writer.write_record([file_name(file)])?;
  }
  writer.flush()?;

  tally::success(&format!("Exported {} file names to {}", files.len(), csv_path.display()));
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Borehole, Layer, Predictions, Record};

  #[test]
  fn test_find_violations_only_flags_backwards_intervals() {
    let mut first = Borehole::new(0);
    first.layers.push(Layer::new("Terre végétale", Some(0.0), Some(0.4)));
    first.layers.push(Layer::new("Limon", Some(0.9), Some(0.6)));
    let mut second = Borehole::new(1);
    second.layers.push(Layer::new("Rocher", None, Some(2.0)));
    second.layers.push(Layer::new("Graviers", Some(3.0), Some(1.0)));

    let mut predictions = Predictions::new();
    predictions.insert("11235.pdf".to_string(), Record::new(vec![first, second]));
    let workspace = Workspace::from_parts(ReviewConfig::default(), predictions, Vec::new());

    let violations = find_violations(&workspace);
    assert_eq!(violations.len(), 2);
    assert_eq!((violations[0].borehole_index, violations[0].layer), (0, 1));
    let last = &violations[1];
    assert_eq!((last.borehole_index, last.layer, last.start), (1, 1, 3.0));
  }
}
