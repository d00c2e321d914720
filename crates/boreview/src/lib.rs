//! Review borehole log extractions and commit approved records as ground truth.

pub mod cli;
pub mod commands;
pub mod config;
pub mod display;
pub mod editor;
pub mod error;
pub mod model;
pub mod naming;
pub mod quality;
pub mod session;
pub mod store;
pub mod viewer;

pub use config::ReviewConfig;
pub use editor::{GroundwaterFields, LayerFields, RecordEditor};
pub use error::{Result, ReviewError};
pub use model::{Borehole, GroundwaterReading, Layer, Predictions, Record};
pub use session::{update, Action, ReviewState, Workspace};
