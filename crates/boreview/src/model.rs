//! Typed view of `predictions.json` and of the ground-truth files.
//!
//! Two input shapes are accepted per document entry: the simplified shape
//! that is also written back out (a bare list of boreholes), and the raw
//! pipeline shape (`{"boreholes": [...]}` with `{"text": ..}` descriptions and
//! `{"value": ..}` depths). Both load into the same types.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Document file name -> extracted record
pub type Predictions = BTreeMap<String, Record>;

/// One document's extraction result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(into = "Vec<Borehole>")]
pub struct Record {
  pub boreholes: Vec<Borehole>,
}

impl Record {
  pub fn new(boreholes: Vec<Borehole>) -> Self {
    Self { boreholes }
  }

  pub fn is_empty(&self) -> bool {
    self.boreholes.is_empty()
  }

  pub fn layer_count(&self) -> usize {
    self.boreholes.iter().map(|b| b.layers.len()).sum()
  }

  pub fn groundwater_count(&self) -> usize {
    self.boreholes.iter().map(|b| b.groundwater.len()).sum()
  }
}

impl From<Record> for Vec<Borehole> {
  fn from(record: Record) -> Self {
    record.boreholes
  }
}

impl<'de> Deserialize<'de> for Record {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let boreholes = match value {
      Value::Array(list) => Value::Array(list),
      Value::Object(mut map) => match map.remove("boreholes") {
        Some(list) => list,
        None => {
          return Err(D::Error::custom(
            "expected a list of boreholes or an object with a `boreholes` list",
          ))
        }
      },
      other => {
        return Err(D::Error::custom(format!(
          "expected a list of boreholes, found {}",
          json_kind(&other)
        )))
      }
    };

    let boreholes: Vec<Borehole> = serde_json::from_value(boreholes).map_err(D::Error::custom)?;
    Ok(Self { boreholes })
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "an object",
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borehole {
  pub borehole_index: u32,
  #[serde(default)]
  pub layers: Vec<Layer>,
  #[serde(default)]
  pub groundwater: Vec<GroundwaterReading>,
  #[serde(default)]
  pub metadata: Metadata,
}

impl Borehole {
  pub fn new(borehole_index: u32) -> Self {
    Self {
      borehole_index,
      layers: Vec::new(),
      groundwater: Vec::new(),
      metadata: Metadata::default(),
    }
  }
}

/// A depth-bounded material stratum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayerRepr")]
pub struct Layer {
  pub material_description: String,
  pub depth_interval: DepthInterval,
}

impl Layer {
  pub fn new(
    material_description: impl Into<String>,
    start: Option<f64>,
    end: Option<f64>,
  ) -> Self {
    Self {
      material_description: material_description.into(),
      depth_interval: DepthInterval { start, end },
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DepthInterval {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end: Option<f64>,
}

impl DepthInterval {
  /// `start <= end` whenever both bounds are known
  pub fn is_ordered(&self) -> bool {
    match (self.start, self.end) {
      (Some(start), Some(end)) => start <= end,
      _ => true,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterReading {
  #[serde(default)]
  pub date: Option<String>,
  #[serde(default)]
  pub depth: Option<f64>,
  #[serde(default)]
  pub elevation: Option<f64>,
}

/// Free-form borehole metadata; the two known keys are typed, the rest kept verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub elevation: Option<Elevation>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub coordinates: Option<Coordinates>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elevation {
  pub elevation: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rect: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
  pub east: Option<f64>,
  #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
  pub north: Option<f64>,
}

// Input-only shapes for layers
// ============================

#[derive(Deserialize)]
struct LayerRepr {
  material_description: MaterialText,
  #[serde(default)]
  depth_interval: Option<DepthInterval>,
  #[serde(default)]
  depths: Option<PipelineDepths>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaterialText {
  Plain(String),
  Block { text: String },
}

#[derive(Deserialize)]
struct PipelineDepths {
  #[serde(default)]
  start: Option<DepthValue>,
  #[serde(default)]
  end: Option<DepthValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DepthValue {
  Number(f64),
  Text(String),
  Block { value: Option<Box<DepthValue>> },
}

impl DepthValue {
  fn resolve(self) -> Result<Option<f64>, String> {
    match self {
      DepthValue::Number(n) => Ok(Some(n)),
      DepthValue::Text(text) if text.trim().is_empty() => Ok(None),
      DepthValue::Text(text) => {
        text.trim().parse::<f64>().map(Some).map_err(|_| format!("depth `{text}` is not numeric"))
      }
      DepthValue::Block { value: None } => Ok(None),
      DepthValue::Block { value: Some(inner) } => inner.resolve(),
    }
  }
}

impl TryFrom<LayerRepr> for Layer {
  type Error = String;

  fn try_from(repr: LayerRepr) -> Result<Self, Self::Error> {
    let material_description = match repr.material_description {
      MaterialText::Plain(text) | MaterialText::Block { text } => text,
    };

    let depth_interval = match (repr.depth_interval, repr.depths) {
      (Some(interval), _) => interval,
      (None, Some(depths)) => DepthInterval {
        start: depths.start.map(DepthValue::resolve).transpose()?.flatten(),
        end: depths.end.map(DepthValue::resolve).transpose()?.flatten(),
      },
      (None, None) => DepthInterval::default(),
    };

    Ok(Self { material_description, depth_interval })
  }
}
