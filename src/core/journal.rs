//! Append-only JSON-lines record of every trial as it completes.
//!
//! The phase workbooks are the canonical output; the journal exists so raw
//! outcomes survive a crash or a failed workbook save. Journal I/O failures
//! are logged and disable the journal, they never stop a session.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::config::PhaseKind;
use crate::feedback::Balance;
use crate::response::{Selection, TrialOutcome};
use crate::stimuli::{ImageId, Side, TrialSpec};

#[derive(Debug, Serialize)]
pub struct JournalEntry<'a> {
    pub subject: &'a str,
    pub phase: &'static str,
    /// 1-based position in the phase.
    pub trial: usize,
    /// 0-based source row.
    pub row: usize,
    pub displayed_left: &'a str,
    pub displayed_right: &'a str,
    pub correct_side: &'a ImageId,
    pub selected: Option<&'a ImageId>,
    pub side: Option<Side>,
    pub reaction_time_ms: Option<f64>,
    pub correct: bool,
    pub balance: Option<Balance>,
}

impl<'a> JournalEntry<'a> {
    pub fn new(
        subject: &'a str,
        phase: PhaseKind,
        trial: usize,
        spec: &'a TrialSpec,
        outcome: &'a TrialOutcome,
        balance: Option<Balance>,
    ) -> Self {
        let side = match &outcome.selection {
            Selection::Chosen { side, .. } => Some(*side),
            Selection::Timeout => None,
        };
        Self {
            subject,
            phase: phase.label(),
            trial,
            row: spec.row(),
            displayed_left: spec.displayed_left(),
            displayed_right: spec.displayed_right(),
            correct_side: spec.correct_side(),
            selected: outcome.selected_image(),
            side,
            reaction_time_ms: outcome.reaction_time().map(|rt| rt.as_secs_f64() * 1000.0),
            correct: outcome.is_correct,
            balance,
        }
    }
}

pub struct TrialJournal {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TrialJournal {
    pub fn journal_file(participant_id: &str) -> String {
        format!("{participant_id}_trials.jsonl")
    }

    /// Appends to an existing journal so a rerun with the same id keeps history.
    pub fn open(path: &Path) -> Self {
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(BufWriter::new)
            .map_err(|e| warn!("trial journal disabled, cannot open {}: {e}", path.display()))
            .ok();
        Self {
            path: path.to_path_buf(),
            writer,
        }
    }

    pub fn disabled() -> Self {
        Self {
            path: PathBuf::new(),
            writer: None,
        }
    }

    pub fn record(&mut self, entry: &JournalEntry<'_>) {
        let Some(w) = self.writer.as_mut() else {
            return;
        };

        let written = serde_json::to_writer(&mut *w, entry)
            .map_err(std::io::Error::from)
            .and_then(|()| w.write_all(b"\n"))
            .and_then(|()| w.flush());
        if let Err(e) = written {
            warn!("trial journal disabled, write to {} failed: {e}", self.path.display());
            self.writer = None;
        }
    }
}
