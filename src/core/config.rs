//! Build-time experiment configuration.
//!
//! There are no command-line flags: an operator runs the binary from the
//! directory holding the stimulus workbooks and collects the result workbooks
//! from the same place.

use std::path::PathBuf;
use std::time::Duration;

/// Exit code for an operator abort (ESCAPE or window close).
pub const ABORT_EXIT_CODE: i32 = 2;
/// Exit code for a load, persistence or display failure.
pub const FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Directory the three stimulus workbooks are read from.
    pub input_dir: PathBuf,
    /// Directory every output file is written to.
    pub output_dir: PathBuf,

    pub practice_file: String,
    pub first_phase_file: String,
    pub second_phase_file: String,

    /// Column holding the per-row optimal image in the stimulus workbooks.
    pub optimal_column: String,

    pub practice_trial_limit: Option<usize>,
    pub response_timeout: Duration,
    pub feedback_hold: Duration,
    pub summary_hold: Duration,

    /// Gain/loss per trial, in minor currency units (1/100).
    pub reward_units: i64,
    pub currency: String,

    pub journal: bool,
    /// Fixed seed for side assignment. `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            practice_file: "trial_images.xlsx".to_owned(),
            first_phase_file: "stimuli_data.xlsx".to_owned(),
            second_phase_file: "ext_stimulus_data.xlsx".to_owned(),
            optimal_column: "optml".to_owned(),
            practice_trial_limit: Some(12),
            response_timeout: Duration::from_secs(2),
            feedback_hold: Duration::from_secs(2),
            summary_hold: Duration::from_secs(5),
            reward_units: 20,
            currency: "TL".to_owned(),
            journal: true,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    pub fn stimulus_path(&self, phase: PhaseKind) -> PathBuf {
        let file = match phase {
            PhaseKind::Practice => &self.practice_file,
            PhaseKind::First => &self.first_phase_file,
            PhaseKind::Second => &self.second_phase_file,
        };
        self.input_dir.join(file)
    }
}

/// The three blocks of a session. Each carries its own timing/feedback rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Practice,
    First,
    Second,
}

impl PhaseKind {
    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::Practice => "practice",
            PhaseKind::First => "phase1",
            PhaseKind::Second => "phase2",
        }
    }

    /// Phase number written to result rows. Practice is never persisted.
    pub fn number(self) -> Option<u8> {
        match self {
            PhaseKind::Practice => None,
            PhaseKind::First => Some(1),
            PhaseKind::Second => Some(2),
        }
    }

    /// Phase 2 measures unconstrained deliberation time.
    pub fn timeout(self, cfg: &ExperimentConfig) -> Option<Duration> {
        match self {
            PhaseKind::Practice | PhaseKind::First => Some(cfg.response_timeout),
            PhaseKind::Second => None,
        }
    }

    pub fn gives_feedback(self) -> bool {
        !matches!(self, PhaseKind::Second)
    }

    pub fn shows_balance(self) -> bool {
        self.gives_feedback()
    }

    pub fn persists(self) -> bool {
        self.number().is_some()
    }

    pub fn trial_limit(self, cfg: &ExperimentConfig) -> Option<usize> {
        match self {
            PhaseKind::Practice => cfg.practice_trial_limit,
            _ => None,
        }
    }

    pub fn output_file(self, participant_id: &str) -> Option<String> {
        match self {
            PhaseKind::Practice => None,
            PhaseKind::First => Some(format!("{participant_id}_first_phase.xlsx")),
            PhaseKind::Second => Some(format!("{participant_id}_second_phase.xlsx")),
        }
    }
}
