//! In-memory editing of one record.
//!
//! All layer and groundwater operations act on the active borehole. Every
//! borehole is its own depth-ordered sequence; nothing here merges depths
//! across boreholes or pages.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{Result, ReviewError};
use crate::model::{Borehole, GroundwaterReading, Layer, Record};

/// Raw text of the layer dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerFields {
  pub start: String,
  pub end: String,
  pub material: String,
}

impl LayerFields {
  pub fn new(
    start: impl Into<String>,
    end: impl Into<String>,
    material: impl Into<String>,
  ) -> Self {
    Self { start: start.into(), end: end.into(), material: material.into() }
  }

  /// Pre-fill the dialog from an existing layer
  pub fn from_layer(layer: &Layer) -> Self {
    Self {
      start: format_optional(layer.depth_interval.start),
      end: format_optional(layer.depth_interval.end),
      material: layer.material_description.clone(),
    }
  }

  /// Parse and validate into a layer
  pub fn parse(&self) -> Result<Layer> {
    let start = parse_number(&self.start, "Depth values must be numeric")?;
    let end = parse_number(&self.end, "Depth values must be numeric")?;

    let material = self.material.trim();
    if material.is_empty() {
      return Err(ReviewError::validation("Material description is required"));
    }

    let layer = Layer::new(material, start, end);
    if !layer.depth_interval.is_ordered() {
      return Err(ReviewError::validation(format!(
        "Start depth ({}) must not be greater than end depth ({})",
        self.start.trim(),
        self.end.trim()
      )));
    }

    Ok(layer)
  }
}

/// Raw text of the groundwater dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundwaterFields {
  pub date: String,
  pub depth: String,
  pub elevation: String,
}

impl GroundwaterFields {
  pub fn new(
    date: impl Into<String>,
    depth: impl Into<String>,
    elevation: impl Into<String>,
  ) -> Self {
    Self { date: date.into(), depth: depth.into(), elevation: elevation.into() }
  }

  pub fn from_reading(reading: &GroundwaterReading) -> Self {
    Self {
      date: reading.date.clone().unwrap_or_default(),
      depth: format_optional(reading.depth),
      elevation: format_optional(reading.elevation),
    }
  }

  pub fn parse(&self) -> Result<GroundwaterReading> {
    self.parse_keeping(None)
  }

  /// Like `parse`, but `stored` passes through unchecked when the date was left as it was
  pub fn parse_keeping(&self, stored: Option<&str>) -> Result<GroundwaterReading> {
    let date = self.date.trim();
    let date = if date.is_empty() {
      None
    } else if stored.is_some_and(|s| s.trim() == date) {
      Some(date.to_string())
    } else {
      NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ReviewError::validation(format!("Date `{date}` must use YYYY-MM-DD")))?;
      Some(date.to_string())
    };

    Ok(GroundwaterReading {
      date,
      depth: parse_number(&self.depth, "Depth and elevation must be numeric")?,
      elevation: parse_number(&self.elevation, "Depth and elevation must be numeric")?,
    })
  }
}

fn parse_number(text: &str, message: &str) -> Result<Option<f64>> {
  let text = text.trim();
  if text.is_empty() {
    return Ok(None);
  }
  match text.parse::<f64>() {
    Ok(value) if value.is_finite() => Ok(Some(value)),
    _ => Err(ReviewError::validation(message)),
  }
}

fn format_optional(value: Option<f64>) -> String {
  value.map(|v| v.to_string()).unwrap_or_default()
}

/// Editable copy of a record
#[derive(Debug, Clone, Default)]
pub struct RecordEditor {
  record: Record,
  active: usize,
  selected: Option<usize>,
  modified: bool,
}

impl RecordEditor {
  pub fn new(record: Record) -> Self {
    Self { record, active: 0, selected: None, modified: false }
  }

  pub fn record(&self) -> &Record {
    &self.record
  }

  pub fn is_modified(&self) -> bool {
    self.modified
  }

  /// Clear the modified flag once the record has been saved
  pub fn mark_saved(&mut self) {
    self.modified = false;
  }

  pub fn active_borehole(&self) -> usize {
    self.active
  }

  pub fn selected(&self) -> Option<usize> {
    self.selected
  }

  pub fn set_active_borehole(&mut self, index: usize) -> Result<()> {
    let len = self.record.boreholes.len();
    if index >= len {
      return Err(ReviewError::selection("borehole", index, len));
    }
    self.active = index;
    self.selected = None;
    Ok(())
  }

  /// Layers of the active borehole
  pub fn layers(&self) -> &[Layer] {
    self.record.boreholes.get(self.active).map(|b| b.layers.as_slice()).unwrap_or(&[])
  }

  pub fn groundwater(&self) -> &[GroundwaterReading] {
    self.record.boreholes.get(self.active).map(|b| b.groundwater.as_slice()).unwrap_or(&[])
  }

  pub fn layer(&self, index: usize) -> Result<&Layer> {
    let layers = self.layers();
    layers.get(index).ok_or_else(|| ReviewError::selection("layer", index, layers.len()))
  }

  pub fn reading(&self, index: usize) -> Result<&GroundwaterReading> {
    let readings = self.groundwater();
    readings
      .get(index)
      .ok_or_else(|| ReviewError::selection("groundwater entry", index, readings.len()))
  }

  pub fn select(&mut self, index: usize) -> Result<&Layer> {
    self.layer(index)?;
    self.selected = Some(index);
    self.layer(index)
  }

  /// Replace a layer; the record is untouched when validation fails
  pub fn edit(&mut self, index: usize, fields: &LayerFields) -> Result<()> {
    self.layer(index)?;
    let layer = fields.parse()?;
    self.layers_mut()?[index] = layer;
    self.touch("edit layer", index);
    Ok(())
  }

  /// Swap with the previous layer; returns the moved layer's new index
  pub fn move_up(&mut self, index: usize) -> Result<usize> {
    self.layer(index)?;
    if index == 0 {
      return Ok(0);
    }
    self.layers_mut()?.swap(index, index - 1);
    self.selected = Some(index - 1);
    self.touch("move layer up", index);
    Ok(index - 1)
  }

  /// Swap with the next layer; returns the moved layer's new index
  pub fn move_down(&mut self, index: usize) -> Result<usize> {
    let len = self.layers().len();
    self.layer(index)?;
    if index + 1 >= len {
      return Ok(index);
    }
    self.layers_mut()?.swap(index, index + 1);
    self.selected = Some(index + 1);
    self.touch("move layer down", index);
    Ok(index + 1)
  }

  /// Append a layer; creates borehole 0 when the record has none
  pub fn add_layer(&mut self, fields: &LayerFields) -> Result<usize> {
    let layer = fields.parse()?;
    let borehole = self.active_borehole_mut();
    borehole.layers.push(layer);
    let index = borehole.layers.len() - 1;
    self.selected = Some(index);
    self.touch("add layer", index);
    Ok(index)
  }

  pub fn remove_layer(&mut self, index: usize) -> Result<Layer> {
    self.layer(index)?;
    let removed = self.layers_mut()?.remove(index);
    self.selected = match self.selected {
      Some(s) if s == index => None,
      Some(s) if s > index => Some(s - 1),
      other => other,
    };
    self.touch("remove layer", index);
    Ok(removed)
  }

  pub fn add_groundwater(&mut self, fields: &GroundwaterFields) -> Result<usize> {
    let reading = fields.parse()?;
    let borehole = self.active_borehole_mut();
    borehole.groundwater.push(reading);
    let index = borehole.groundwater.len() - 1;
    self.touch("add groundwater", index);
    Ok(index)
  }

  pub fn edit_groundwater(&mut self, index: usize, fields: &GroundwaterFields) -> Result<()> {
    let stored = self.reading(index)?.date.clone();
    let reading = fields.parse_keeping(stored.as_deref())?;
    self.readings_mut()?[index] = reading;
    self.touch("edit groundwater", index);
    Ok(())
  }

  pub fn remove_groundwater(&mut self, index: usize) -> Result<GroundwaterReading> {
    self.reading(index)?;
    let removed = self.readings_mut()?.remove(index);
    self.touch("remove groundwater", index);
    Ok(removed)
  }

  fn touch(&mut self, operation: &str, index: usize) {
    self.modified = true;
    debug!(operation, index, borehole = self.active, "record modified");
  }

  fn active_borehole_mut(&mut self) -> &mut Borehole {
    if self.record.boreholes.is_empty() {
      self.record.boreholes.push(Borehole::new(0));
      self.active = 0;
    }
    let active = self.active.min(self.record.boreholes.len() - 1);
    &mut self.record.boreholes[active]
  }

  fn layers_mut(&mut self) -> Result<&mut Vec<Layer>> {
    let len = self.record.boreholes.len();
    self
      .record
      .boreholes
      .get_mut(self.active)
      .map(|b| &mut b.layers)
      .ok_or_else(|| ReviewError::selection("borehole", self.active, len))
  }

  fn readings_mut(&mut self) -> Result<&mut Vec<GroundwaterReading>> {
    let len = self.record.boreholes.len();
    self
      .record
      .boreholes
      .get_mut(self.active)
      .map(|b| &mut b.groundwater)
      .ok_or_else(|| ReviewError::selection("borehole", self.active, len))
  }
}
