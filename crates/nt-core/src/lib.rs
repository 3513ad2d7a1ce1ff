//! # nt-core
//!
//! Core types for the nostalgia/turnout county panel analysis:
//! the error taxonomy, the input record and panel types, and the
//! diagnostics trait that decouples reporting from model fitting.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::ModelDiagnostics;
pub use types::{
    AdRecord, CountyMarket, DemographicRecord, Panel, PanelRow, TurnoutRecord, PANEL_COLUMNS,
};
