//! Narrowing predictions to documents whose page images were rated perfect.
//!
//! The classifications CSV has one row per page image with
//! `description_quality` and `heights_quality` scores from 1 to 5. A document
//! is kept when any of its pages scored 5 on both.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, ReviewError};
use crate::naming::{document_for_image, is_png};

/// Classifications file the image classifier writes
pub const CLASSIFICATIONS_FILE: &str = "image_classifications.csv";
pub const PERFECT_SCORE: u8 = 5;

#[derive(Debug, Deserialize)]
struct ClassificationRow {
  filename: String,
  #[serde(default, deserialize_with = "csv::invalid_option")]
  description_quality: Option<u8>,
  #[serde(default, deserialize_with = "csv::invalid_option")]
  heights_quality: Option<u8>,
}

impl ClassificationRow {
  fn is_perfect(&self) -> bool {
    self.description_quality == Some(PERFECT_SCORE) && self.heights_quality == Some(PERFECT_SCORE)
  }
}

/// Documents with at least one perfectly rated page
pub fn perfect_documents(csv_path: &Path) -> Result<BTreeSet<String>> {
  let mut reader = csv::Reader::from_path(csv_path).map_err(|e| match e.kind() {
    csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
      ReviewError::not_found(csv_path)
    }
    _ => ReviewError::parse(csv_path, e.to_string()),
  })?;

  let mut documents = BTreeSet::new();
  for row in reader.deserialize::<ClassificationRow>() {
    let row = row.map_err(|e| ReviewError::parse(csv_path, e.to_string()))?;
    let image = Path::new(&row.filename);
    if !row.is_perfect() || !is_png(image) {
      continue;
    }
    if let Some(page) = document_for_image(image) {
      documents.insert(page.document);
    }
  }
  debug!(path = %csv_path.display(), documents = documents.len(), "read classifications");
  Ok(documents)
}

/// What a filter run kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSummary {
  pub total: usize,
  pub perfect: usize,
  pub kept: Vec<String>,
}

/// Keep the entries of `predictions` whose document is in `keep`; entries stay verbatim
pub fn retain_documents(
  predictions: Map<String, Value>,
  keep: &BTreeSet<String>,
) -> Map<String, Value> {
  predictions.into_iter().filter(|(key, _)| keep.contains(key)).collect()
}

/// Write `output` holding only the perfectly rated entries of `predictions`
pub fn filter_predictions(
  predictions: &Path,
  classifications: &Path,
  output: &Path,
) -> Result<FilterSummary> {
  let keep = perfect_documents(classifications)?;

  let content = fs::read_to_string(predictions).map_err(|e| ReviewError::io(predictions, e))?;
  let entries: Map<String, Value> =
    serde_json::from_str(&content).map_err(|e| ReviewError::parse(predictions, e.to_string()))?;
  let total = entries.len();

  let filtered = retain_documents(entries, &keep);
  for missing in keep.iter().filter(|doc| !filtered.contains_key(*doc)) {
    warn!(document = %missing, "rated perfect but has no prediction");
  }

  crate::store::write_document(output, &filtered)?;
  Ok(FilterSummary { total, perfect: keep.len(), kept: filtered.keys().cloned().collect() })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tempfile::TempDir;

  const CLASSIFICATIONS: &str = "\
filename,only_images,description_quality,heights_quality,rotate
9156.pdf_page1.png,False,5,5,0
9156.pdf_page2.png,False,3,5,0
11235.pdf_page1.png,False,5,4,0
11709_part2_page3.png,False,5,5,90
13076.png,True,,,0
notes.txt,False,5,5,0
";

  fn write(temp: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = temp.path().join(name);
    fs::write(&path, content).unwrap();
    path
  }

  #[test]
  fn test_perfect_documents_needs_both_scores() {
    let temp = TempDir::new().unwrap();
    let csv_path = write(&temp, CLASSIFICATIONS_FILE, CLASSIFICATIONS);

    let documents = perfect_documents(&csv_path).unwrap();
    assert_eq!(documents.into_iter().collect::<Vec<_>>(), vec!["11709_part2.pdf", "9156.pdf"]);
  }

  #[test]
  fn test_filter_keeps_entries_verbatim() {
    let temp = TempDir::new().unwrap();
    let csv_path = write(&temp, CLASSIFICATIONS_FILE, CLASSIFICATIONS);
    let predictions = json!({
      "9156.pdf": [
        {"borehole_index": 0, "layers": [], "groundwater": [], "metadata": {"note": "kept"}}
      ],
      "11235.pdf": [],
      "20001.pdf": "not even a record"
    });
    let predictions_path = write(&temp, "predictions.json", &predictions.to_string());
    let output = temp.path().join("predictions_filtered.json");

    let summary = filter_predictions(&predictions_path, &csv_path, &output).unwrap();
    assert_eq!(summary, FilterSummary { total: 3, perfect: 2, kept: vec!["9156.pdf".to_string()] });

    let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, json!({"9156.pdf": predictions["9156.pdf"].clone()}));
  }

  #[test]
  fn test_missing_classifications_is_not_found() {
    let temp = TempDir::new().unwrap();
    let err = perfect_documents(&temp.path().join(CLASSIFICATIONS_FILE)).unwrap_err();
    assert!(matches!(err, ReviewError::NotFound { .. }));
  }
}
