//! Review session state and the transitions driven by user actions.
//!
//! `ReviewState` is plain data owned by the caller. Each action moves the
//! state into [`update`] and gets it back inside a [`Step`] together with the
//! messages to show. The modes are:
//!
//! ```text
//! Viewing -> Editing(target) -> Viewing
//! Viewing -> accept -> Viewing(next record) | Finished
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ReviewConfig;
use crate::editor::{GroundwaterFields, LayerFields, RecordEditor};
use crate::error::{Result, ReviewError};
use crate::model::{Predictions, Record};
use crate::naming::{natural_cmp, scan_page_images, PageImage};
use crate::store::{self, Artifacts};

/// Everything a session reads but never mutates
#[derive(Debug, Clone)]
pub struct Workspace {
  pub config: ReviewConfig,
  pub predictions_path: Option<PathBuf>,
  predictions: Predictions,
  unreadable: BTreeMap<String, String>,
  pages: Vec<PageImage>,
}

impl Workspace {
  /// Load predictions and index page images as configured
  pub fn open(config: ReviewConfig) -> Result<Self> {
    let (predictions_path, loaded) = match &config.predictions {
      Some(path) => (path.clone(), store::load_predictions(path)?),
      None => store::load_default(&config.output_dir)?,
    };

    let pages = match scan_page_images(&config.images_dir) {
      Ok(pages) => pages,
      Err(e) => {
        warn!(dir = %config.images_dir.display(), error = %e, "no page images available");
        Vec::new()
      }
    };

    info!(documents = loaded.records.len(), pages = pages.len(), "workspace ready");
    Ok(Self {
      config,
      predictions_path: Some(predictions_path),
      predictions: loaded.records,
      unreadable: loaded.unreadable,
      pages,
    })
  }

  pub fn from_parts(config: ReviewConfig, predictions: Predictions, pages: Vec<PageImage>) -> Self {
    Self { config, predictions_path: None, predictions, unreadable: BTreeMap::new(), pages }
  }

  /// Prediction entries that could not be read, by key
  pub fn with_unreadable(mut self, unreadable: BTreeMap<String, String>) -> Self {
    self.unreadable = unreadable;
    self
  }

  /// Documents to review: predicted ones plus those that only have page images
  pub fn keys(&self) -> Vec<String> {
    let mut keys: BTreeSet<String> = self.predictions.keys().cloned().collect();
    keys.extend(self.unreadable.keys().cloned());
    keys.extend(self.pages.iter().map(|p| p.document.clone()));
    let mut keys: Vec<String> = keys.into_iter().collect();
    keys.sort_by(|a, b| natural_cmp(a, b));
    keys
  }

  pub fn prediction(&self, key: &str) -> Option<&Record> {
    self.predictions.get(key)
  }

  pub fn predictions(&self) -> &Predictions {
    &self.predictions
  }

  pub fn unreadable(&self) -> &BTreeMap<String, String> {
    &self.unreadable
  }

  /// First page image of a document
  pub fn image_for(&self, key: &str) -> Option<&Path> {
    self.pages.iter().find(|p| p.document == key).map(|p| p.path.as_path())
  }

  pub fn document_for(&self, key: &str) -> PathBuf {
    self.config.documents_dir.join(key)
  }

  pub fn ground_truth_dir(&self) -> PathBuf {
    self.config.ground_truth_dir()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
  Layers,
  Groundwater,
  Metadata,
}

impl Tab {
  pub const ALL: [Tab; 3] = [Tab::Layers, Tab::Groundwater, Tab::Metadata];

  pub fn title(self) -> &'static str {
    match self {
      Tab::Layers => "Layers",
      Tab::Groundwater => "Groundwater",
      Tab::Metadata => "Metadata",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
  Layer(usize),
  NewLayer,
  Groundwater(usize),
  NewGroundwater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Viewing,
  Editing(EditTarget),
  Finished,
}

/// Where the record on screen came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  Prediction,
  GroundTruth,
  Manual,
  /// The prediction or saved ground truth could not be read; the record can only be skipped
  Unreadable,
}

/// Submitted dialog contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fields {
  Layer(LayerFields),
  Groundwater(GroundwaterFields),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  ShowTab(Tab),
  SelectBorehole(usize),
  Select(usize),
  BeginEditLayer(Option<usize>),
  BeginAddLayer,
  BeginEditGroundwater(usize),
  BeginAddGroundwater,
  Commit(Fields),
  Cancel,
  MoveUp(Option<usize>),
  MoveDown(Option<usize>),
  RemoveLayer(Option<usize>),
  RemoveGroundwater(usize),
  OverrideImage(PathBuf),
  Accept,
  Next,
  Previous,
  Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  Info(String),
  Success(String),
  Warning(String),
  Error(String),
}

/// The record currently on screen
#[derive(Debug, Clone)]
pub struct Current {
  pub key: String,
  pub editor: RecordEditor,
  pub origin: Origin,
  pub image_override: Option<PathBuf>,
  /// Why the record could not be loaded
  pub load_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewState {
  keys: Vec<String>,
  position: usize,
  current: Option<Current>,
  mode: Mode,
  tab: Tab,
}

/// Result of one transition
#[derive(Debug)]
pub struct Step {
  pub state: ReviewState,
  pub notices: Vec<Notice>,
  pub quit: bool,
}

impl ReviewState {
  /// Open the first record, or `start` when given
  pub fn new(workspace: &Workspace, start: Option<&str>) -> Result<Self> {
    let keys = workspace.keys();
    let position = match start {
      Some(key) => keys
        .iter()
        .position(|k| k == key)
        .ok_or_else(|| ReviewError::validation(format!("`{key}` is not in the dataset")))?,
      None => 0,
    };

    let mut state = Self { keys, position, current: None, mode: Mode::Viewing, tab: Tab::Layers };
    state.load_position(workspace);
    Ok(state)
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn tab(&self) -> Tab {
    self.tab
  }

  pub fn current(&self) -> Option<&Current> {
    self.current.as_ref()
  }

  pub fn position(&self) -> usize {
    self.position
  }

  pub fn total(&self) -> usize {
    self.keys.len()
  }

  /// Image shown for the current record: the override, else the resolved page
  pub fn image_path<'a>(&'a self, workspace: &'a Workspace) -> Option<&'a Path> {
    let current = self.current.as_ref()?;
    current.image_override.as_deref().or_else(|| workspace.image_for(&current.key))
  }

  /// Prefilled dialog contents for the open edit
  pub fn dialog_defaults(&self) -> Option<Fields> {
    let Mode::Editing(target) = self.mode else { return None };
    let editor = &self.current.as_ref()?.editor;
    let fields = match target {
      EditTarget::Layer(i) => Fields::Layer(LayerFields::from_layer(editor.layer(i).ok()?)),
      EditTarget::NewLayer => Fields::Layer(LayerFields::default()),
      EditTarget::Groundwater(i) => {
        Fields::Groundwater(GroundwaterFields::from_reading(editor.reading(i).ok()?))
      }
      EditTarget::NewGroundwater => Fields::Groundwater(GroundwaterFields::default()),
    };
    Some(fields)
  }

  /// Open the record at `position`; a record that fails to load is opened as unreadable
  fn load_position(&mut self, workspace: &Workspace) {
    self.mode = Mode::Viewing;
    let Some(key) = self.keys.get(self.position).cloned() else {
      self.current = None;
      self.mode = Mode::Finished;
      return;
    };

    let loaded = match store::load_ground_truth(&workspace.ground_truth_dir(), &key) {
      Ok(Some(record)) => Ok((record, Origin::GroundTruth)),
      Ok(None) => match (workspace.prediction(&key), workspace.unreadable.get(&key)) {
        (Some(record), _) => Ok((record.clone(), Origin::Prediction)),
        (None, Some(reason)) => Err(format!("Failed to parse prediction for {key}: {reason}")),
        (None, None) => Ok((Record::default(), Origin::Manual)),
      },
      Err(e) => Err(e.to_string()),
    };

    let (record, origin, load_error) = match loaded {
      Ok((record, origin)) => (record, origin, None),
      Err(reason) => {
        warn!(key = %key, reason = %reason, "record could not be loaded");
        (Record::default(), Origin::Unreadable, Some(reason))
      }
    };

    debug!(key = %key, ?origin, "opened record");
    let editor = RecordEditor::new(record);
    self.current = Some(Current { key, editor, origin, image_override: None, load_error });
  }

  /// Move to the next record and report when the dataset runs out
  fn advance(&mut self, workspace: &Workspace, notices: &mut Vec<Notice>) {
    self.position += 1;
    self.load_position(workspace);
    if self.mode == Mode::Finished {
      notices.push(Notice::Success("End of dataset reached".to_string()));
    }
  }
}

/// Apply one action
pub fn update(mut state: ReviewState, action: Action, workspace: &Workspace) -> Step {
  let mut notices = Vec::new();
  let mut quit = false;

  if let Mode::Editing(_) = state.mode {
    if !matches!(action, Action::Commit(_) | Action::Cancel | Action::Quit) {
      notices.push(Notice::Warning("Finish or cancel the open dialog first".to_string()));
      return Step { state, notices, quit };
    }
  }

  match action {
    Action::Quit => {
      if state.current.as_ref().is_some_and(|c| c.editor.is_modified()) {
        notices.push(Notice::Warning("Unsaved changes were discarded".to_string()));
      }
      quit = true;
    }
    Action::Next => navigate(&mut state, workspace, 1, &mut notices),
    Action::Previous => navigate(&mut state, workspace, -1, &mut notices),
    Action::Accept => accept(&mut state, workspace, &mut notices),
    Action::ShowTab(tab) => state.tab = tab,
    action => match state.current.as_mut() {
      Some(current) if current.load_error.is_some() => notices.push(Notice::Error(format!(
        "{} could not be loaded - `next` skips it, `quit` ends the session",
        current.key
      ))),
      Some(current) => {
        let outcome = edit_current(current, &mut state.mode, &mut state.tab, action);
        match outcome {
          Ok(Some(notice)) => notices.push(notice),
          Ok(None) => {}
          Err(e) => notices.push(Notice::Error(e.to_string())),
        }
      }
      None => notices.push(Notice::Warning("No record loaded".to_string())),
    },
  }

  Step { state, notices, quit }
}

fn selected_or(current: &Current, index: Option<usize>, verb: &str) -> Result<usize> {
  index
    .or(current.editor.selected())
    .ok_or_else(|| ReviewError::validation(format!("Please select a layer to {verb}")))
}

fn edit_current(
  current: &mut Current,
  mode: &mut Mode,
  tab: &mut Tab,
  action: Action,
) -> Result<Option<Notice>> {
  match action {
    Action::SelectBorehole(index) => {
      current.editor.set_active_borehole(index)?;
      Ok(Some(Notice::Info(format!("Borehole {index} active"))))
    }
    Action::Select(index) => {
      current.editor.select(index)?;
      *tab = Tab::Layers;
      Ok(None)
    }
    Action::BeginEditLayer(index) => {
      let index = selected_or(current, index, "edit")?;
      current.editor.select(index)?;
      *mode = Mode::Editing(EditTarget::Layer(index));
      *tab = Tab::Layers;
      Ok(None)
    }
    Action::BeginAddLayer => {
      *mode = Mode::Editing(EditTarget::NewLayer);
      *tab = Tab::Layers;
      Ok(None)
    }
    Action::BeginEditGroundwater(index) => {
      current.editor.reading(index)?;
      *mode = Mode::Editing(EditTarget::Groundwater(index));
      *tab = Tab::Groundwater;
      Ok(None)
    }
    Action::BeginAddGroundwater => {
      *mode = Mode::Editing(EditTarget::NewGroundwater);
      *tab = Tab::Groundwater;
      Ok(None)
    }
    Action::Commit(fields) => commit(current, mode, fields),
    Action::Cancel => {
      if matches!(mode, Mode::Editing(_)) {
        *mode = Mode::Viewing;
        return Ok(Some(Notice::Info("Edit cancelled".to_string())));
      }
      Ok(None)
    }
    Action::MoveUp(index) => {
      let index = selected_or(current, index, "move")?;
      current.editor.move_up(index)?;
      Ok(None)
    }
    Action::MoveDown(index) => {
      let index = selected_or(current, index, "move")?;
      current.editor.move_down(index)?;
      Ok(None)
    }
    Action::RemoveLayer(index) => {
      let index = selected_or(current, index, "delete")?;
      let removed = current.editor.remove_layer(index)?;
      Ok(Some(Notice::Info(format!("Deleted layer `{}`", removed.material_description))))
    }
    Action::RemoveGroundwater(index) => {
      current.editor.remove_groundwater(index)?;
      Ok(Some(Notice::Info(format!("Deleted groundwater entry {index}"))))
    }
    Action::OverrideImage(path) => {
      let notice = Notice::Info(format!("Showing {}", path.display()));
      current.image_override = Some(path);
      Ok(Some(notice))
    }
    Action::ShowTab(_) | Action::Accept | Action::Next | Action::Previous | Action::Quit => {
      Ok(None)
    }
  }
}

fn commit(current: &mut Current, mode: &mut Mode, fields: Fields) -> Result<Option<Notice>> {
  let Mode::Editing(target) = *mode else {
    return Err(ReviewError::validation("No dialog is open"));
  };

  let editor = &mut current.editor;
  match (target, fields) {
    (EditTarget::Layer(index), Fields::Layer(fields)) => editor.edit(index, &fields)?,
    (EditTarget::NewLayer, Fields::Layer(fields)) => {
      editor.add_layer(&fields)?;
    }
    (EditTarget::Groundwater(index), Fields::Groundwater(fields)) => {
      editor.edit_groundwater(index, &fields)?
    }
    (EditTarget::NewGroundwater, Fields::Groundwater(fields)) => {
      editor.add_groundwater(&fields)?;
    }
    _ => return Err(ReviewError::validation("Dialog fields do not match the open edit")),
  }

  *mode = Mode::Viewing;
  Ok(Some(Notice::Info("Ground truth modified - unsaved changes".to_string())))
}

fn navigate(
  state: &mut ReviewState,
  workspace: &Workspace,
  delta: isize,
  notices: &mut Vec<Notice>,
) {
  let target = state.position as isize + delta;
  if target < 0 || target as usize >= state.keys.len() {
    return;
  }

  if state.current.as_ref().is_some_and(|c| c.editor.is_modified()) {
    notices.push(Notice::Warning("Unsaved changes were discarded".to_string()));
  }

  state.position = target as usize;
  state.load_position(workspace);
  if let Some(reason) = state.current.as_ref().and_then(|c| c.load_error.as_ref()) {
    notices.push(Notice::Error(reason.clone()));
  }
}

fn accept(state: &mut ReviewState, workspace: &Workspace, notices: &mut Vec<Notice>) {
  let Some(current) = state.current.as_mut() else {
    notices.push(Notice::Warning("No record loaded".to_string()));
    return;
  };

  if current.load_error.is_some() {
    notices.push(Notice::Warning(format!("Skipped unreadable record {}", current.key)));
    state.advance(workspace, notices);
    return;
  }
  if current.origin == Origin::Manual && current.editor.record().is_empty() {
    let key = &current.key;
    notices.push(Notice::Info(format!("No data entered for {key} - skipped without saving")));
    state.advance(workspace, notices);
    return;
  }

  let image = current
    .image_override
    .clone()
    .or_else(|| workspace.image_for(&current.key).map(Path::to_path_buf));
  let image = match image {
    Some(image) => image,
    None => {
      notices.push(Notice::Error(format!("No page image found for {}", current.key)));
      return;
    }
  };
  let document = workspace.document_for(&current.key);

  let saved = store::save(
    &workspace.ground_truth_dir(),
    &current.key,
    current.editor.record(),
    Artifacts { image: &image, document: &document },
  );

  match saved {
    Ok(saved) => {
      current.editor.mark_saved();
      let name =
        saved.record.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
      notices.push(Notice::Success(format!("Saved: {name}")));
      state.advance(workspace, notices);
    }
    Err(e) => notices.push(Notice::Error(format!("Failed to save ground truth: {e}"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Borehole, Layer};
  use std::fs;
  use tempfile::TempDir;

  struct Fixture {
    _temp: TempDir,
    workspace: Workspace,
  }

  fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let images = temp.path().join("draw");
    let documents = temp.path().join("input");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&documents).unwrap();

    let mut predictions = Predictions::new();
    for key in ["9156.pdf", "11235.pdf"] {
      let mut borehole = Borehole::new(0);
      borehole.layers.push(Layer::new("Terre végétale", Some(0.0), Some(0.4)));
      borehole.layers.push(Layer::new("Limon", Some(0.4), Some(2.0)));
      predictions.insert(key.to_string(), Record::new(vec![borehole]));
      fs::write(images.join(format!("{key}_page1.png")), b"png").unwrap();
      fs::write(documents.join(key), b"%PDF").unwrap();
    }
    fs::write(images.join("20001.pdf_page1.png"), b"png").unwrap();

    let config = ReviewConfig {
      predictions: None,
      images_dir: images.clone(),
      documents_dir: documents,
      output_dir: temp.path().join("output"),
    };
    let pages = scan_page_images(&images).unwrap();
    Fixture { workspace: Workspace::from_parts(config, predictions, pages), _temp: temp }
  }

  fn run(
    state: ReviewState,
    workspace: &Workspace,
    actions: Vec<Action>,
  ) -> (ReviewState, Vec<Notice>) {
    let mut state = state;
    let mut all = Vec::new();
    for action in actions {
      let step = update(state, action, workspace);
      state = step.state;
      all.extend(step.notices);
    }
    (state, all)
  }

  #[test]
  fn test_dataset_is_naturally_ordered_union() {
    let fx = fixture();
    assert_eq!(fx.workspace.keys(), vec!["9156.pdf", "11235.pdf", "20001.pdf"]);

    let state = ReviewState::new(&fx.workspace, Some("20001.pdf")).unwrap();
    assert_eq!(state.current().unwrap().origin, Origin::Manual);
    assert!(ReviewState::new(&fx.workspace, Some("nope.pdf")).is_err());
  }

  #[test]
  fn test_edit_dialog_stays_open_on_invalid_interval() {
    let fx = fixture();
    let state = ReviewState::new(&fx.workspace, None).unwrap();

    let (state, notices) = run(
      state,
      &fx.workspace,
      vec![
        Action::BeginEditLayer(Some(0)),
        Action::Commit(Fields::Layer(LayerFields::new("0.4", "0.2", "Terre"))),
      ],
    );
    assert_eq!(state.mode(), Mode::Editing(EditTarget::Layer(0)));
    assert!(matches!(notices.last(), Some(Notice::Error(_))));

    let (state, _) = run(
      state,
      &fx.workspace,
      vec![Action::Commit(Fields::Layer(LayerFields::new("0.4", "0.65", "Terre")))],
    );
    assert_eq!(state.mode(), Mode::Viewing);
    let first = &state.current().unwrap().editor.layers()[0];
    assert_eq!(*first, Layer::new("Terre", Some(0.4), Some(0.65)));
  }

  #[test]
  fn test_other_actions_blocked_while_editing() {
    let fx = fixture();
    let state = ReviewState::new(&fx.workspace, None).unwrap();
    let (state, notices) = run(state, &fx.workspace, vec![Action::BeginAddLayer, Action::Next]);
    assert_eq!(state.position(), 0);
    assert!(matches!(notices[0], Notice::Warning(_)));

    let (state, _) = run(state, &fx.workspace, vec![Action::Cancel]);
    assert_eq!(state.mode(), Mode::Viewing);
    assert_eq!(state.current().unwrap().editor.layers().len(), 2);
  }

  #[test]
  fn test_dialog_defaults_prefill() {
    let fx = fixture();
    let state = ReviewState::new(&fx.workspace, None).unwrap();
    let (state, _) =
      run(state, &fx.workspace, vec![Action::Select(1), Action::BeginEditLayer(None)]);
    assert_eq!(
      state.dialog_defaults(),
      Some(Fields::Layer(LayerFields::new("0.4", "2", "Limon")))
    );
  }

  #[test]
  fn test_accept_saves_and_advances_to_end() {
    let fx = fixture();
    let state = ReviewState::new(&fx.workspace, None).unwrap();

    let (state, notices) =
      run(state, &fx.workspace, vec![Action::MoveDown(Some(0)), Action::Accept]);
    assert!(notices
      .iter()
      .any(|n| matches!(n, Notice::Success(m) if m.contains("9156_ground_truth.json"))));
    assert_eq!(state.current().unwrap().key, "11235.pdf");

    let saved =
      store::load_ground_truth(&fx.workspace.ground_truth_dir(), "9156.pdf").unwrap().unwrap();
    assert_eq!(saved.boreholes[0].layers[0].material_description, "Limon");

    let (state, _) = run(state, &fx.workspace, vec![Action::Previous]);
    assert_eq!(state.current().unwrap().origin, Origin::GroundTruth);

    // 20001.pdf has no source document, so the save fails and nothing moves
    let (state, notices) =
      run(state, &fx.workspace, vec![Action::Next, Action::Accept, Action::Next]);
    assert_eq!(state.current().unwrap().key, "20001.pdf");
    let new_layer = Fields::Layer(LayerFields::new("0", "1.2", "Remblai"));
    let (state, notices2) = run(
      state,
      &fx.workspace,
      vec![Action::BeginAddLayer, Action::Commit(new_layer), Action::Accept],
    );
    assert!(matches!(notices2.last(), Some(Notice::Error(_))));
    assert_eq!(state.current().unwrap().key, "20001.pdf");
    assert!(notices.iter().any(|n| matches!(n, Notice::Success(_))));

    fs::write(fx.workspace.document_for("20001.pdf"), b"%PDF").unwrap();
    let (state, notices) = run(state, &fx.workspace, vec![Action::Accept]);
    assert_eq!(state.mode(), Mode::Finished);
    assert!(notices
      .iter()
      .any(|n| matches!(n, Notice::Success(m) if m.contains("End of dataset"))));
  }

  #[test]
  fn test_empty_manual_record_is_skipped_without_saving() {
    let fx = fixture();
    let state = ReviewState::new(&fx.workspace, Some("20001.pdf")).unwrap();
    let (state, notices) = run(state, &fx.workspace, vec![Action::Accept]);

    assert_eq!(state.mode(), Mode::Finished);
    assert!(matches!(&notices[0], Notice::Info(m) if m.contains("skipped without saving")));
    assert!(!fx.workspace.ground_truth_dir().exists());
  }

  #[test]
  fn test_unreadable_record_can_be_skipped() {
    let fx = fixture();
    let mut unreadable = BTreeMap::new();
    let reason = "expected a list of boreholes, found a string";
    unreadable.insert("10000.pdf".to_string(), reason.to_string());
    let workspace = fx.workspace.clone().with_unreadable(unreadable);
    assert_eq!(workspace.keys(), vec!["9156.pdf", "10000.pdf", "11235.pdf", "20001.pdf"]);

    // a broken saved file for 11235.pdf is reported the same way
    let ground_truth = workspace.ground_truth_dir();
    fs::create_dir_all(&ground_truth).unwrap();
    fs::write(ground_truth.join("11235_ground_truth.json"), "{ broken").unwrap();

    let state = ReviewState::new(&workspace, Some("10000.pdf")).unwrap();
    let current = state.current().unwrap();
    assert_eq!(current.origin, Origin::Unreadable);
    assert!(current.load_error.as_deref().unwrap().contains("found a string"));

    let (state, notices) = run(state, &workspace, vec![Action::BeginAddLayer]);
    assert_eq!(state.mode(), Mode::Viewing);
    assert!(matches!(&notices[0], Notice::Error(m) if m.contains("`next` skips it")));

    let (state, notices) = run(state, &workspace, vec![Action::Next]);
    assert_eq!((state.position(), state.current().unwrap().key.as_str()), (2, "11235.pdf"));
    assert!(matches!(&notices[0], Notice::Error(m) if m.contains("11235_ground_truth.json")));

    let (state, _) = run(state, &workspace, vec![Action::Next]);
    assert_eq!((state.position(), state.current().unwrap().key.as_str()), (3, "20001.pdf"));

    let (state, _) =
      run(state, &workspace, vec![Action::Previous, Action::Previous, Action::Previous]);
    assert_eq!((state.position(), state.current().unwrap().key.as_str()), (0, "9156.pdf"));

    // accepting keeps the position and the record on screen in step
    let (state, notices) = run(state, &workspace, vec![Action::Accept]);
    assert!(matches!(&notices[0], Notice::Success(m) if m.contains("9156_ground_truth.json")));
    assert_eq!((state.position(), state.current().unwrap().key.as_str()), (1, "10000.pdf"));

    let (state, notices) = run(state, &workspace, vec![Action::Accept]);
    assert!(matches!(&notices[0], Notice::Warning(m) if m.contains("Skipped unreadable record")));
    assert_eq!((state.position(), state.current().unwrap().key.as_str()), (2, "11235.pdf"));
    assert!(!ground_truth.join("10000_ground_truth.json").exists());
  }

  #[test]
  fn test_failed_save_keeps_edits() {
    let fx = fixture();
    let state = ReviewState::new(&fx.workspace, None).unwrap();
    let (state, notices) = run(
      state,
      &fx.workspace,
      vec![
        Action::RemoveLayer(Some(1)),
        Action::OverrideImage(PathBuf::from("/nonexistent/page.png")),
        Action::Accept,
      ],
    );
    assert!(matches!(notices.last(), Some(Notice::Error(_))));
    let current = state.current().unwrap();
    assert_eq!(current.key, "9156.pdf");
    assert!(current.editor.is_modified());
    assert_eq!(current.editor.layers().len(), 1);
  }

  #[test]
  fn test_quit_reports_unsaved_changes() {
    let fx = fixture();
    let state = ReviewState::new(&fx.workspace, None).unwrap();
    let step = update(state, Action::RemoveLayer(Some(0)), &fx.workspace);
    let step = update(step.state, Action::Quit, &fx.workspace);
    assert!(step.quit);
    assert!(matches!(step.notices[0], Notice::Warning(_)));
  }

  #[test]
  fn test_move_without_selection_is_reported() {
    let fx = fixture();
    let state = ReviewState::new(&fx.workspace, None).unwrap();
    let (_, notices) = run(state, &fx.workspace, vec![Action::MoveUp(None)]);
    assert_eq!(notices, vec![Notice::Error("Please select a layer to move".to_string())]);
  }
}
