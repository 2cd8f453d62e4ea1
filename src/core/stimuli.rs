//! Stimulus sets: source rows, per-trial side assignment, and the optimal
//! reference column.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::config::{ExperimentConfig, PhaseKind};
use crate::error::{ExperimentError, Result};
use crate::prng::Prng;
use crate::workbook::Table;

pub const LEFT_COLUMN: &str = "left_img";
pub const RIGHT_COLUMN: &str = "right_img";
pub const CORRECT_COLUMN: &str = "correct_side";

/// Identity of an image, independent of where it is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    /// Identifier as written in a workbook cell (`correct_side`, `optml`).
    pub fn from_label(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Identifier of an image file: the path with its last extension removed.
    pub fn from_path(path: &str) -> Self {
        match path.rfind('.') {
            Some(dot) => Self(path[..dot].to_owned()),
            None => Self(path.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One row of a stimulus workbook, exactly as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusRow {
    /// 0-based position among the data rows of the source sheet.
    pub row: usize,
    pub left_img: String,
    pub right_img: String,
    pub correct_side: ImageId,
}

/// A trial ready to present: the source row plus its on-screen layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSpec {
    pub source: StimulusRow,
    pub swapped: bool,
}

impl TrialSpec {
    pub fn row(&self) -> usize {
        self.source.row
    }

    pub fn correct_side(&self) -> &ImageId {
        &self.source.correct_side
    }

    /// Image path drawn on the given side.
    pub fn image_on(&self, side: Side) -> &str {
        match (side, self.swapped) {
            (Side::Left, false) | (Side::Right, true) => &self.source.left_img,
            (Side::Right, false) | (Side::Left, true) => &self.source.right_img,
        }
    }

    pub fn displayed_left(&self) -> &str {
        self.image_on(Side::Left)
    }

    pub fn displayed_right(&self) -> &str {
        self.image_on(Side::Right)
    }
}

pub fn rows_from_table(table: &Table) -> Result<Vec<StimulusRow>> {
    let left = table.column_index(LEFT_COLUMN)?;
    let right = table.column_index(RIGHT_COLUMN)?;
    let correct = table.column_index(CORRECT_COLUMN)?;

    if table.is_empty() {
        return Err(ExperimentError::MalformedStimuli {
            path: table.path().to_path_buf(),
            message: "no trial rows".to_owned(),
        });
    }

    (0..table.len())
        .map(|row| {
            Ok(StimulusRow {
                row,
                left_img: table.required(row, left, LEFT_COLUMN)?.to_owned(),
                right_img: table.required(row, right, RIGHT_COLUMN)?.to_owned(),
                correct_side: ImageId::from_label(table.required(row, correct, CORRECT_COLUMN)?),
            })
        })
        .collect()
}

/// One independent fair coin per row decides whether the pair is swapped.
/// Row order and `correct_side` are untouched.
pub fn assign_sides(rows: &[StimulusRow], rng: &mut Prng) -> Vec<TrialSpec> {
    rows.iter()
        .map(|source| TrialSpec {
            source: source.clone(),
            swapped: rng.next_bool(),
        })
        .collect()
}

/// Per-row optimal image, positionally paired with a stimulus set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimalReference {
    source: PathBuf,
    images: Vec<ImageId>,
}

impl OptimalReference {
    pub fn new(source: impl Into<PathBuf>, images: Vec<ImageId>) -> Self {
        Self {
            source: source.into(),
            images,
        }
    }

    pub fn from_table(table: &Table, column: &str) -> Result<Self> {
        let images = table
            .column(column)?
            .into_iter()
            .map(ImageId::from_label)
            .collect();
        Ok(Self::new(table.path(), images))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&ImageId> {
        self.images.get(row)
    }

    /// The pairing is only by position, so the lengths must agree exactly.
    pub fn check_aligned(&self, stimulus_rows: usize) -> Result<()> {
        if self.images.len() != stimulus_rows {
            return Err(ExperimentError::Misaligned {
                what: format!("optimal reference {}", self.source.display()),
                expected: stimulus_rows,
                found: self.images.len(),
            });
        }
        Ok(())
    }
}

/// Source rows of one phase plus, for persisted phases, its optimal reference.
#[derive(Debug, Clone)]
pub struct PhaseStimuli {
    pub phase: PhaseKind,
    pub rows: Vec<StimulusRow>,
    pub reference: Option<OptimalReference>,
}

/// Everything a session reads from disk, loaded and cross-checked up front so
/// a broken workbook is caught before the participant starts.
#[derive(Debug, Clone)]
pub struct StimulusPlan {
    pub practice: PhaseStimuli,
    pub first: PhaseStimuli,
    pub second: PhaseStimuli,
}

impl StimulusPlan {
    pub fn load(cfg: &ExperimentConfig) -> Result<Self> {
        let practice_table = Table::read(&cfg.stimulus_path(PhaseKind::Practice))?;
        let first_table = Table::read(&cfg.stimulus_path(PhaseKind::First))?;
        let second_table = Table::read(&cfg.stimulus_path(PhaseKind::Second))?;
        Self::from_tables(cfg, &practice_table, &first_table, &second_table)
    }

    pub fn from_tables(
        cfg: &ExperimentConfig,
        practice: &Table,
        first: &Table,
        second: &Table,
    ) -> Result<Self> {
        let mut practice_rows = rows_from_table(practice)?;
        if let Some(limit) = PhaseKind::Practice.trial_limit(cfg) {
            practice_rows.truncate(limit);
        }

        let first_rows = rows_from_table(first)?;
        let first_reference = OptimalReference::from_table(first, &cfg.optimal_column)?;
        first_reference.check_aligned(first_rows.len())?;

        // Phase 2 prefers its own reference column; without one it is paired
        // with the phase-1 column, which then has to line up row for row.
        let second_rows = rows_from_table(second)?;
        let second_reference = if second.has_column(&cfg.optimal_column) {
            OptimalReference::from_table(second, &cfg.optimal_column)?
        } else {
            first_reference.clone()
        };
        second_reference.check_aligned(second_rows.len())?;

        let plan = Self {
            practice: PhaseStimuli {
                phase: PhaseKind::Practice,
                rows: practice_rows,
                reference: None,
            },
            first: PhaseStimuli {
                phase: PhaseKind::First,
                rows: first_rows,
                reference: Some(first_reference),
            },
            second: PhaseStimuli {
                phase: PhaseKind::Second,
                rows: second_rows,
                reference: Some(second_reference),
            },
        };
        info!(
            "stimuli ready: practice={} phase1={} phase2={}",
            plan.practice.rows.len(),
            plan.first.rows.len(),
            plan.second.rows.len()
        );
        Ok(plan)
    }
}
