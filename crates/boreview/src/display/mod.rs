use colored::*;
use console::{measure_text_width, pad_str, truncate_str, Alignment};

use crate::model::{Borehole, Record};
use crate::session::{Current, Mode, Origin, ReviewState, Tab, Workspace};
use crate::viewer::{pane_pixels, PageView};

/// Columns given to the image pane when the screen is wide enough for two panes
pub const IMAGE_PANE_WIDTH: usize = 36;
/// Below this width the panes are stacked
pub const SIDE_BY_SIDE_MIN: usize = 100;
/// Terminal rows the page would occupy in the image pane
pub const IMAGE_PANE_ROWS: usize = 30;

fn format_depth(value: Option<f64>) -> String {
  value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn fit(text: &str, width: usize) -> String {
  let cut = truncate_str(text, width, "…");
  pad_str(&cut, width, Alignment::Left, None).into_owned()
}

/// Status line for the current record
pub fn status_line(current: &Current) -> String {
  if current.editor.is_modified() {
    return "Ground truth modified - unsaved changes".to_string();
  }
  match current.origin {
    Origin::Prediction => "Auto-extracted data loaded - review and correct as needed".to_string(),
    Origin::GroundTruth => "Previously approved ground truth loaded".to_string(),
    Origin::Manual => "No auto-extracted data - manual entry required".to_string(),
    Origin::Unreadable => format!(
      "Could not load record: {} - `next` skips it, `quit` ends the session",
      current.load_error.as_deref().unwrap_or("unknown error")
    ),
  }
}

/// Left pane: which page is shown and how it fits
pub fn image_pane(state: &ReviewState, workspace: &Workspace, width: usize) -> Vec<String> {
  let mut lines = vec![format!("{}", "Image".bold())];

  let Some(path) = state.image_path(workspace) else {
    lines.push("No page image for this record".yellow().to_string());
    lines.push("Use `image <path>` to choose one".to_string());
    return lines;
  };

  lines.push(truncate_str(&path.display().to_string(), width, "…").into_owned());
  match PageView::open(path) {
    Ok(view) => {
      lines.push(format!("{} x {} px", view.width, view.height));
      let scale = view.fit_scale(pane_pixels(width, IMAGE_PANE_ROWS));
      lines.push(format!("fit {:.0}%", scale * 100.0));
    }
    Err(e) => {
      for line in textwrap_simple(&e.to_string(), width) {
        lines.push(line.red().to_string());
      }
    }
  }
  if state.current().is_some_and(|c| c.image_override.is_some()) {
    lines.push("(path overridden)".dimmed().to_string());
  }
  lines.push("`view` opens it in the image viewer".dimmed().to_string());
  lines
}

fn textwrap_simple(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();
  let mut current = String::new();
  for word in text.split_whitespace() {
    if !current.is_empty() && measure_text_width(&current) + 1 + measure_text_width(word) > width {
      lines.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
      current.push(' ');
    }
    current.push_str(word);
  }
  if !current.is_empty() {
    lines.push(current);
  }
  lines
}

fn tab_bar(active: Tab) -> String {
  Tab::ALL
    .iter()
    .map(|tab| {
      if *tab == active {
        format!("[{}]", tab.title()).cyan().bold().to_string()
      } else {
        format!(" {} ", tab.title())
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

/// Layers of the active borehole as a table
pub fn layers_table(current: &Current, width: usize) -> Vec<String> {
  let editor = &current.editor;
  let record = editor.record();
  let mut lines = Vec::new();

  if let Some(borehole) = record.boreholes.get(editor.active_borehole()) {
    lines.push(format!(
      "Borehole {} ({} of {})",
      borehole.borehole_index,
      editor.active_borehole() + 1,
      record.boreholes.len()
    ));
  }

  let material_width = width.saturating_sub(4 + 1 + 10 + 1 + 10 + 1).max(10);
  let header =
    format!("{} {} {} Material Description", fit("#", 4), fit("Start", 10), fit("End", 10));
  lines.push(header.bold().to_string());

  if editor.layers().is_empty() {
    lines.push("(no layers - `add` creates one)".dimmed().to_string());
  }

  for (i, layer) in editor.layers().iter().enumerate() {
    let marker = if editor.selected() == Some(i) { ">" } else { " " };
    let row = format!(
      "{} {} {} {}",
      fit(&format!("{marker}{i}"), 4),
      fit(&format_depth(layer.depth_interval.start), 10),
      fit(&format_depth(layer.depth_interval.end), 10),
      fit(&layer.material_description, material_width).trim_end(),
    );
    let row = if !layer.depth_interval.is_ordered() { row.red().to_string() } else { row };
    lines.push(if marker == ">" { row.reversed().to_string() } else { row });
  }
  lines
}

pub fn groundwater_table(current: &Current) -> Vec<String> {
  let header = format!("{} {} {} Elevation", fit("#", 4), fit("Date", 12), fit("Depth", 10));
  let mut lines = vec![header.bold().to_string()];
  let readings = current.editor.groundwater();
  if readings.is_empty() {
    lines.push("(no groundwater entries - `gw add` creates one)".dimmed().to_string());
  }
  for (i, reading) in readings.iter().enumerate() {
    lines.push(format!(
      "{} {} {} {}",
      fit(&i.to_string(), 4),
      fit(reading.date.as_deref().unwrap_or("N/A"), 12),
      fit(&format_depth(reading.depth), 10),
      format_depth(reading.elevation),
    ));
  }
  lines
}

fn borehole_summary(borehole: &Borehole) -> Vec<String> {
  let metadata = &borehole.metadata;
  let mut lines = vec![format!("=== Borehole {} ===", borehole.borehole_index)];

  match &metadata.elevation {
    Some(elevation) => {
      let mut line = format!("Elevation: {}", elevation.elevation);
      if let Some(page) = elevation.page {
        line.push_str(&format!(" (page {page})"));
      }
      lines.push(line);
    }
    None => lines.push("Elevation: N/A".to_string()),
  }

  if let Some(coordinates) = &metadata.coordinates {
    lines.push(format!(
      "Coordinates: E={}, N={}",
      format_depth(coordinates.east),
      format_depth(coordinates.north)
    ));
  }
  for (key, value) in &metadata.extra {
    lines.push(format!("{key}: {value}"));
  }

  lines.push(format!("Layers found: {}", borehole.layers.len()));
  lines.push(format!("Groundwater entries: {}", borehole.groundwater.len()));
  lines
}

pub fn metadata_view(record: &Record) -> Vec<String> {
  if record.is_empty() {
    return vec![
      "No auto-extracted data found for this image.".to_string(),
      "You can add layers and groundwater entries manually.".to_string(),
    ];
  }
  let mut lines = Vec::new();
  for borehole in &record.boreholes {
    lines.extend(borehole_summary(borehole));
    lines.push(String::new());
  }
  lines.pop();
  lines
}

/// Right pane: tab bar and the active tab
pub fn record_pane(state: &ReviewState, width: usize) -> Vec<String> {
  let Some(current) = state.current() else {
    return vec!["No record loaded".to_string()];
  };

  let mut lines = vec![tab_bar(state.tab()), String::new()];
  lines.extend(match state.tab() {
    Tab::Layers => layers_table(current, width),
    Tab::Groundwater => groundwater_table(current),
    Tab::Metadata => metadata_view(current.editor.record()),
  });
  lines
}

/// Put two column blocks next to each other
pub fn side_by_side(left: &[String], right: &[String], left_width: usize) -> Vec<String> {
  let rows = left.len().max(right.len());
  (0..rows)
    .map(|i| {
      let l = left.get(i).map(String::as_str).unwrap_or("");
      let r = right.get(i).map(String::as_str).unwrap_or("");
      format!("{} │ {}", fit(l, left_width), r).trim_end().to_string()
    })
    .collect()
}

/// Whole screen for the current state
pub fn render_screen(state: &ReviewState, workspace: &Workspace, width: usize) -> String {
  if state.mode() == Mode::Finished {
    return format!("{}\n", "All records reviewed - end of dataset".green().bold());
  }

  let mut out = Vec::new();
  if let Some(current) = state.current() {
    let header = format!("File {}/{}: {}", state.position() + 1, state.total(), current.key);
    out.push(tally::banner_line(width.min(80), '='));
    out.push(header.bold().to_string());
    out.push(status_line(current));
    out.push(tally::banner_line(width.min(80), '='));
  }

  if width >= SIDE_BY_SIDE_MIN {
    let left = image_pane(state, workspace, IMAGE_PANE_WIDTH);
    let right = record_pane(state, width - IMAGE_PANE_WIDTH - 3);
    out.extend(side_by_side(&left, &right, IMAGE_PANE_WIDTH));
  } else {
    out.extend(image_pane(state, workspace, width));
    out.push(tally::banner_line(width.min(80), '-'));
    out.extend(record_pane(state, width));
  }

  if let Mode::Editing(target) = state.mode() {
    out.push(String::new());
    out.push(format!("Editing {target:?} - `!` cancels").yellow().to_string());
  }

  let mut screen = out.join("\n");
  screen.push('\n');
  screen
}
