//! Two-alternative forced-choice experiment core.
//!
//! Everything here is headless: a front-end supplies a [`surface::Surface`]
//! and drives [`runner::Session`] from its frame loop.

#[path = "core/config.rs"]
pub mod config;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/feedback.rs"]
pub mod feedback;

#[path = "core/journal.rs"]
pub mod journal;

#[path = "core/participant.rs"]
pub mod participant;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/response.rs"]
pub mod response;

#[path = "core/results.rs"]
pub mod results;

#[path = "core/runner.rs"]
pub mod runner;

#[path = "core/stimuli.rs"]
pub mod stimuli;

#[path = "core/surface.rs"]
pub mod surface;

#[path = "core/workbook.rs"]
pub mod workbook;

#[cfg(test)]
#[path = "core/scripted.rs"]
mod scripted;

pub use config::ExperimentConfig;
pub use error::{ExperimentError, Result};
pub use runner::Session;
