use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use boreview::{commands, quality};
use boreview::config::{ConfigOverrides, ReviewConfig};

#[derive(Parser)]
#[command(name = "boreview")]
#[command(about = concat!(
  "Boreview - Borehole Ground Truth Review\n",
  "Check extracted layers against the page image and save approved records"
))]
#[command(version)]
struct Cli {
  /// Config file (default: boreview.json in the current directory, then the user config dir)
  #[arg(long, global = true, env = "BOREVIEW_CONFIG", value_name = "FILE")]
  config: Option<PathBuf>,

  /// More log output (-v info, -vv debug, -vvv trace)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

/// Where inputs are read from and ground truth is written to
#[derive(Args)]
struct PathArgs {
  /// Predictions JSON file
  #[arg(long, env = "BOREVIEW_PREDICTIONS", value_name = "FILE")]
  predictions: Option<PathBuf>,
  /// Directory of rendered page images
  #[arg(long, env = "BOREVIEW_IMAGES", value_name = "DIR")]
  images: Option<PathBuf>,
  /// Directory of source documents
  #[arg(long, env = "BOREVIEW_DOCUMENTS", value_name = "DIR")]
  documents: Option<PathBuf>,
  /// Output directory; ground truth is saved under `<DIR>/ground_truth`
  #[arg(long, env = "BOREVIEW_OUTPUT", value_name = "DIR")]
  output: Option<PathBuf>,
}

impl From<PathArgs> for ConfigOverrides {
  fn from(args: PathArgs) -> Self {
    Self {
      predictions: args.predictions,
      images_dir: args.images,
      documents_dir: args.documents,
      output_dir: args.output,
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Review records one by one and save approved ground truth
  Review {
    #[command(flatten)]
    paths: PathArgs,
    /// Document to start at
    #[arg(long, value_name = "KEY")]
    start: Option<String>,
  },
  /// Print one record without prompting
  Show {
    #[command(flatten)]
    paths: PathArgs,
    /// Document key, e.g. 11235.pdf
    key: String,
  },
  /// Report layers whose start depth is greater than their end depth
  Check {
    #[command(flatten)]
    paths: PathArgs,
  },
  /// Write predictions_filtered.json with the documents whose pages were rated 5/5
  Filter {
    #[command(flatten)]
    paths: PathArgs,
    /// Classifications CSV from the image classifier
    #[arg(long, value_name = "CSV", default_value = quality::CLASSIFICATIONS_FILE)]
    classifications: PathBuf,
  },
  /// Export the page image file names, naturally sorted, to a CSV file
  List {
    #[command(flatten)]
    paths: PathArgs,
    /// CSV file to write
    #[arg(long, value_name = "CSV", default_value = "filenames.csv")]
    csv: PathBuf,
  },
}

fn load_config(explicit: Option<&PathBuf>, overrides: PathArgs) -> Result<ReviewConfig> {
  let cwd = std::env::current_dir()?;
  let config = ReviewConfig::discover(explicit.map(PathBuf::as_path), &cwd)?;
  Ok(config.with_overrides(overrides.into()))
}

fn run(cli: Cli) -> Result<()> {
  let explicit = cli.config.as_ref();
  match cli.command {
    Commands::Review { paths, start } => commands::review(load_config(explicit, paths)?, start),
    Commands::Show { paths, key } => commands::show(load_config(explicit, paths)?, key),
    Commands::Check { paths } => commands::check(load_config(explicit, paths)?),
    Commands::Filter { paths, classifications } => {
      commands::filter(load_config(explicit, paths)?, &classifications)
    }
    Commands::List { paths, csv } => commands::list(load_config(explicit, paths)?, &csv),
  }
}

fn main() {
  let cli = Cli::parse();
  tally::init(cli.verbose);

  if let Err(e) = run(cli) {
    tally::error(&format!("{e:#}"));
    process::exit(1);
  }
}
