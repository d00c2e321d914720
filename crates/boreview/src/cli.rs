//! Line-oriented driver for an interactive review session.
//!
//! Reads commands from any `BufRead`, turns them into session actions and
//! writes the rendered screen to any `Write`, so the same loop runs against
//! a terminal or a scripted test.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::display;
use crate::editor::{GroundwaterFields, LayerFields};
use crate::session::{update, Action, Fields, Mode, Notice, ReviewState, Tab, Workspace};
use crate::viewer;

pub const HELP: &str = "\
Commands:
  <enter> | accept     save ground truth and go to the next record
  next | prev          move without saving
  layers | gw | meta   switch tab
  bh N                 make borehole N active
  sel N                select layer N
  edit [N]             edit layer N (or the selected layer)
  add                  add a layer
  rm [N]               delete layer N (or the selected layer)
  up [N] | down [N]    move layer N up or down
  gw add | gw edit N | gw rm N
  image PATH           show another page image for this record
  view                 open the page image in the image viewer
  help                 show this help
  quit                 leave without saving";

/// A parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  Act(Action),
  View,
  Help,
}

fn index_arg(args: &[&str], required: bool) -> std::result::Result<Option<usize>, String> {
  match args.first() {
    Some(raw) => raw.parse::<usize>().map(Some).map_err(|_| format!("`{raw}` is not a row number")),
    None if required => Err("a row number is required".to_string()),
    None => Ok(None),
  }
}

/// Parse one command line
pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
  let line = line.trim();
  let words: Vec<&str> = line.split_whitespace().collect();
  let (head, args) = match words.split_first() {
    Some((head, args)) => (head.to_lowercase(), args),
    None => return Ok(Command::Act(Action::Accept)),
  };

  let action = match head.as_str() {
    "accept" | "a" => Action::Accept,
    "next" | "n" => Action::Next,
    "prev" | "previous" | "p" => Action::Previous,
    "layers" | "l" => Action::ShowTab(Tab::Layers),
    "meta" | "metadata" | "m" => Action::ShowTab(Tab::Metadata),
    "gw" | "groundwater" => match args.split_first() {
      None => Action::ShowTab(Tab::Groundwater),
      Some((&"add", _)) => Action::BeginAddGroundwater,
      Some((&"edit", rest)) => {
        Action::BeginEditGroundwater(index_arg(rest, true)?.unwrap_or_default())
      }
      Some((&"rm", rest)) => Action::RemoveGroundwater(index_arg(rest, true)?.unwrap_or_default()),
      Some((other, _)) => return Err(format!("unknown groundwater command `{other}`")),
    },
    "bh" | "borehole" => Action::SelectBorehole(index_arg(args, true)?.unwrap_or_default()),
    "sel" | "select" | "s" => Action::Select(index_arg(args, true)?.unwrap_or_default()),
    "edit" | "e" => Action::BeginEditLayer(index_arg(args, false)?),
    "add" => Action::BeginAddLayer,
    "rm" | "del" | "delete" => Action::RemoveLayer(index_arg(args, false)?),
    "up" | "u" => Action::MoveUp(index_arg(args, false)?),
    "down" | "d" => Action::MoveDown(index_arg(args, false)?),
    "image" | "img" => {
      let path = line[head.len()..].trim();
      if path.is_empty() {
        return Err("image needs a path".to_string());
      }
      Action::OverrideImage(PathBuf::from(path))
    }
    "view" | "v" => return Ok(Command::View),
    "help" | "?" | "h" => return Ok(Command::Help),
    "quit" | "q" | "exit" => Action::Quit,
    other => return Err(format!("unknown command `{other}` (try `help`)")),
  };
  Ok(Command::Act(action))
}

/// Print notices the way the other tools print status
pub fn report(notices: &[Notice]) {
  for notice in notices {
    match notice {
      Notice::Info(m) => tally::info(m),
      Notice::Success(m) => tally::success(m),
      Notice::Warning(m) => tally::warn(m),
      Notice::Error(m) => tally::error(m),
    }
  }
}

/// Interactive loop over a reader/writer pair
pub struct Driver<'w, R, W> {
  workspace: &'w Workspace,
  input: R,
  output: W,
  width: usize,
}

impl<'w, R: BufRead, W: Write> Driver<'w, R, W> {
  pub fn new(workspace: &'w Workspace, input: R, output: W, width: usize) -> Self {
    Self { workspace, input, output, width }
  }

  fn read_line(&mut self) -> Result<Option<String>> {
    let mut line = String::new();
    if self.input.read_line(&mut line)? == 0 {
      return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
  }

  /// Prompt for one dialog field; blank keeps the default, `-` clears it, `!` cancels
  fn ask(&mut self, label: &str, default: &str) -> Result<Option<String>> {
    write!(self.output, "{label} [{default}]: ")?;
    self.output.flush()?;
    let Some(line) = self.read_line()? else { return Ok(None) };
    Ok(match line.trim() {
      "!" => None,
      "" => Some(default.to_string()),
      "-" => Some(String::new()),
      other => Some(other.to_string()),
    })
  }

  fn confirm(&mut self, question: &str) -> Result<bool> {
    write!(self.output, "{question} [y/N]: ")?;
    self.output.flush()?;
    let answer = self.read_line()?.unwrap_or_default();
    Ok(answer.trim().to_lowercase().starts_with('y'))
  }

  fn dialog(&mut self, defaults: Fields) -> Result<Option<Fields>> {
    let fields = match defaults {
      Fields::Layer(d) => {
        let Some(start) = self.ask("Start Depth", &d.start)? else { return Ok(None) };
        let Some(end) = self.ask("End Depth", &d.end)? else { return Ok(None) };
        let Some(material) = self.ask("Material Description", &d.material)? else {
          return Ok(None);
        };
        Fields::Layer(LayerFields { start, end, material })
      }
      Fields::Groundwater(d) => {
        let Some(date) = self.ask("Date (YYYY-MM-DD)", &d.date)? else { return Ok(None) };
        let Some(depth) = self.ask("Depth", &d.depth)? else { return Ok(None) };
        let Some(elevation) = self.ask("Elevation", &d.elevation)? else { return Ok(None) };
        Fields::Groundwater(GroundwaterFields { date, depth, elevation })
      }
    };
    Ok(Some(fields))
  }

  fn render(&mut self, state: &ReviewState) -> Result<()> {
    write!(self.output, "{}", display::render_screen(state, self.workspace, self.width))?;
    self.output.flush()?;
    Ok(())
  }

  /// Run until the dataset ends, the user quits, or input runs out
  pub fn run(mut self, mut state: ReviewState) -> Result<ReviewState> {
    self.render(&state)?;

    loop {
      if state.mode() == Mode::Finished {
        tally::flourish("Review finished");
        return Ok(state);
      }

      let action = if let Some(defaults) = state.dialog_defaults() {
        match self.dialog(defaults)? {
          Some(fields) => Action::Commit(fields),
          None => Action::Cancel,
        }
      } else {
        write!(self.output, "> ")?;
        self.output.flush()?;
        let Some(line) = self.read_line()? else {
          let step = update(state, Action::Quit, self.workspace);
          report(&step.notices);
          return Ok(step.state);
        };

        match parse_command(&line) {
          Ok(Command::Act(Action::RemoveLayer(index))) => {
            if !self.confirm("Delete layer?")? {
              continue;
            }
            Action::RemoveLayer(index)
          }
          Ok(Command::Act(action)) => action,
          Ok(Command::View) => {
            match state.image_path(self.workspace) {
              Some(path) => {
                if let Err(e) = viewer::open_external(path) {
                  tally::warn(&format!("Could not open image viewer: {e}"));
                }
              }
              None => tally::warn("No page image for this record"),
            }
            continue;
          }
          Ok(Command::Help) => {
            writeln!(self.output, "{HELP}")?;
            continue;
          }
          Err(message) => {
            tally::warn(&message);
            continue;
          }
        }
      };

      debug!(?action, "dispatch");
      let step = update(state, action, self.workspace);
      report(&step.notices);
      state = step.state;
      if step.quit {
        return Ok(state);
      }
      if state.dialog_defaults().is_none() {
        self.render(&state)?;
      }
    }
  }
}
