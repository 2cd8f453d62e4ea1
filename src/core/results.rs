//! Per-trial result rows and the phase result workbook.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::config::PhaseKind;
use crate::error::{ExperimentError, Result};
use crate::participant::Participant;
use crate::response::TrialOutcome;
use crate::stimuli::{OptimalReference, TrialSpec};
use crate::workbook::{persist_error, save_atomically};

/// Written in `selected_side` when the response window closed with no choice.
pub const TIMEOUT_MARKER: &str = "timeout";

pub const RESULT_HEADERS: [&str; 11] = [
    "phase",
    "left_img",
    "right_img",
    "correct_side",
    "selected_side",
    "reaction_time_ms",
    "acc",
    "trial",
    "group",
    "subjID",
    "check",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optimality {
    Optimal,
    Suboptimal,
}

impl Optimality {
    pub fn as_str(self) -> &'static str {
        match self {
            Optimality::Optimal => "optimal",
            Optimality::Suboptimal => "suboptimal",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub phase: u8,
    /// Pair as drawn on screen for this trial. The row itself sits at the
    /// source position, so sorting the pair recovers the authored row.
    pub left_img: String,
    pub right_img: String,
    pub correct_side: String,
    /// `None` for a timeout; written as [`TIMEOUT_MARKER`].
    pub selected_side: Option<String>,
    /// `None` for a timeout; written as a blank cell.
    pub reaction_time_ms: Option<f64>,
    pub accuracy: u8,
    /// 1-based.
    pub trial: usize,
    pub group: u8,
    pub subject_id: String,
    pub check: Optimality,
}

impl ResultRow {
    fn write_to(&self, sheet: &mut Worksheet, row: u32) -> std::result::Result<(), XlsxError> {
        sheet.write_number(row, 0, self.phase as f64)?;
        sheet.write_string(row, 1, &self.left_img)?;
        sheet.write_string(row, 2, &self.right_img)?;
        sheet.write_string(row, 3, &self.correct_side)?;
        sheet.write_string(row, 4, self.selected_side.as_deref().unwrap_or(TIMEOUT_MARKER))?;
        if let Some(rt) = self.reaction_time_ms {
            sheet.write_number(row, 5, rt)?;
        }
        sheet.write_number(row, 6, self.accuracy as f64)?;
        sheet.write_number(row, 7, self.trial as f64)?;
        sheet.write_number(row, 8, self.group as f64)?;
        sheet.write_string(row, 9, &self.subject_id)?;
        sheet.write_string(row, 10, self.check.as_str())?;
        Ok(())
    }
}

/// Build one row per trial in source order, each carrying the image pair in
/// the layout the participant saw.
///
/// `specs`, `outcomes` and `reference` are paired by position (outcome *i*
/// belongs to spec *i*), and `reference` additionally by source row; every
/// length must match or nothing is produced.
pub fn assemble_rows(
    participant: &Participant,
    phase: u8,
    specs: &[TrialSpec],
    outcomes: &[TrialOutcome],
    reference: &OptimalReference,
) -> Result<Vec<ResultRow>> {
    if outcomes.len() != specs.len() {
        return Err(ExperimentError::Misaligned {
            what: format!("phase {phase} outcomes"),
            expected: specs.len(),
            found: outcomes.len(),
        });
    }
    reference.check_aligned(specs.len())?;

    let mut paired: Vec<(&TrialSpec, &TrialOutcome)> = specs.iter().zip(outcomes).collect();
    paired.sort_by_key(|(spec, _)| spec.row());

    paired
        .into_iter()
        .enumerate()
        .map(|(i, (spec, outcome))| {
            let optimal = reference.get(spec.row()).ok_or_else(|| ExperimentError::Misaligned {
                what: format!("optimal reference for source row {}", spec.row() + 1),
                expected: spec.row() + 1,
                found: reference.len(),
            })?;
            let check = if outcome.is_optimal(optimal) {
                Optimality::Optimal
            } else {
                Optimality::Suboptimal
            };
            Ok(ResultRow {
                phase,
                left_img: spec.displayed_left().to_owned(),
                right_img: spec.displayed_right().to_owned(),
                correct_side: spec.correct_side().to_string(),
                selected_side: outcome.selected_image().map(ToString::to_string),
                reaction_time_ms: outcome.reaction_time().map(|rt| rt.as_secs_f64() * 1000.0),
                accuracy: u8::from(outcome.is_correct),
                trial: i + 1,
                group: participant.condition_code(),
                subject_id: participant.id.clone(),
                check,
            })
        })
        .collect()
}

pub fn write_results(path: &Path, rows: &[ResultRow]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let fail = |e| persist_error(path, e);

    for (col, header) in RESULT_HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).map_err(fail)?;
    }
    for (i, row) in rows.iter().enumerate() {
        row.write_to(sheet, i as u32 + 1).map_err(fail)?;
    }

    save_atomically(&mut workbook, path)
}

/// Assemble and persist one phase. Practice has no result file.
pub fn write_phase_results(
    dir: &Path,
    participant: &Participant,
    phase: PhaseKind,
    specs: &[TrialSpec],
    outcomes: &[TrialOutcome],
    reference: &OptimalReference,
) -> Result<Option<PathBuf>> {
    let (Some(number), Some(file)) = (phase.number(), phase.output_file(&participant.id)) else {
        return Ok(None);
    };
    let rows = assemble_rows(participant, number, specs, outcomes, reference)?;
    let path = dir.join(file);
    write_results(&path, &rows)?;
    info!("{} rows written to {}", rows.len(), path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ResponseEvent, Selection};
    use crate::stimuli::{ImageId, Side, StimulusRow};
    use crate::workbook::Table;
    use std::time::Duration;

    fn participant() -> Participant {
        Participant::parse("S01", "1", "22", "2").unwrap()
    }

    fn spec(row: usize, left: &str, right: &str, correct: &str, swapped: bool) -> TrialSpec {
        TrialSpec {
            source: StimulusRow {
                row,
                left_img: left.to_owned(),
                right_img: right.to_owned(),
                correct_side: ImageId::from_label(correct),
            },
            swapped,
        }
    }

    fn reference(ids: &[&str]) -> OptimalReference {
        OptimalReference::new("mem.xlsx", ids.iter().map(|s| ImageId::from_label(*s)).collect())
    }

    #[test]
    fn right_choice_on_ab_trial_is_inaccurate() {
        let specs = vec![spec(0, "A", "B", "A", false)];
        let outcome =
            TrialOutcome::resolve(&specs[0], ResponseEvent::Right(Duration::from_millis(512))).unwrap();
        let rows = assemble_rows(&participant(), 1, &specs, &[outcome], &reference(&["B"])).unwrap();

        let row = &rows[0];
        assert_eq!(row.selected_side.as_deref(), Some("B"));
        assert_eq!(row.accuracy, 0);
        assert!(row.reaction_time_ms.unwrap() > 0.0);
        assert_eq!(row.check, Optimality::Optimal);
        assert_eq!(row.group, 2);
        assert_eq!(row.subject_id, "S01");
    }

    #[test]
    fn timeout_row_carries_explicit_absence() {
        let specs = vec![spec(0, "A", "B", "A", false)];
        let rows =
            assemble_rows(&participant(), 1, &specs, &[TrialOutcome::timeout()], &reference(&["A"]))
                .unwrap();
        let row = &rows[0];
        assert_eq!(row.selected_side, None);
        assert_eq!(row.reaction_time_ms, None);
        assert_eq!(row.accuracy, 0);
        assert_eq!(row.check, Optimality::Suboptimal);
    }

    #[test]
    fn accuracy_tracks_correct_side_and_rows_keep_source_order() {
        let specs = vec![
            spec(0, "A.png", "B.png", "A", true),
            spec(1, "C.png", "D.png", "D", false),
            spec(2, "E.png", "F.png", "E", true),
        ];
        let events = [
            ResponseEvent::Right(Duration::from_millis(300)), // A, drawn on the right
            ResponseEvent::Left(Duration::from_millis(300)),  // C
            ResponseEvent::Timeout,
        ];
        let outcomes: Vec<_> = specs
            .iter()
            .zip(events)
            .map(|(s, e)| TrialOutcome::resolve(s, e).unwrap())
            .collect();

        let rows =
            assemble_rows(&participant(), 2, &specs, &outcomes, &reference(&["B", "C", "F"])).unwrap();

        let acc: Vec<u8> = rows.iter().map(|r| r.accuracy).collect();
        assert_eq!(acc, vec![1, 0, 0]);
        for row in &rows {
            let accurate = row.selected_side.as_deref() == Some(row.correct_side.as_str());
            assert_eq!(row.accuracy == 1, accurate);
        }

        let shown: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|r| (r.left_img.as_str(), r.right_img.as_str(), r.correct_side.as_str()))
            .collect();
        assert_eq!(
            shown,
            vec![("B.png", "A.png", "A"), ("C.png", "D.png", "D"), ("F.png", "E.png", "E")]
        );

        // Ignoring the display side, rows follow the source file.
        let authored: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| {
                let (a, b) = (r.left_img.as_str(), r.right_img.as_str());
                if a <= b { (a, b) } else { (b, a) }
            })
            .collect();
        assert_eq!(authored, vec![("A.png", "B.png"), ("C.png", "D.png"), ("E.png", "F.png")]);
        let trials: Vec<usize> = rows.iter().map(|r| r.trial).collect();
        assert_eq!(trials, vec![1, 2, 3]);

        let checks: Vec<Optimality> = rows.iter().map(|r| r.check).collect();
        assert_eq!(
            checks,
            vec![Optimality::Suboptimal, Optimality::Optimal, Optimality::Suboptimal]
        );
    }

    #[test]
    fn swapped_layout_is_recorded_in_the_row() {
        let plain = vec![spec(0, "A.png", "B.png", "A", false)];
        let swapped = vec![spec(0, "A.png", "B.png", "A", true)];
        let rt = Duration::from_millis(400);
        // A is picked both times, from opposite sides.
        let left = TrialOutcome::resolve(&plain[0], ResponseEvent::Left(rt)).unwrap();
        let right = TrialOutcome::resolve(&swapped[0], ResponseEvent::Right(rt)).unwrap();

        let a = assemble_rows(&participant(), 1, &plain, &[left], &reference(&["A"])).unwrap();
        let b = assemble_rows(&participant(), 1, &swapped, &[right], &reference(&["A"])).unwrap();

        assert_eq!(a[0].selected_side, b[0].selected_side);
        assert_ne!(a[0], b[0]);
        assert_eq!((a[0].left_img.as_str(), a[0].right_img.as_str()), ("A.png", "B.png"));
        assert_eq!((b[0].left_img.as_str(), b[0].right_img.as_str()), ("B.png", "A.png"));
    }

    #[test]
    fn rows_are_emitted_in_source_order() {
        let specs = vec![spec(1, "C", "D", "C", false), spec(0, "A", "B", "A", false)];
        let outcomes = vec![
            TrialOutcome::resolve(&specs[0], ResponseEvent::Left(Duration::from_millis(1))).unwrap(),
            TrialOutcome::timeout(),
        ];
        let rows = assemble_rows(&participant(), 1, &specs, &outcomes, &reference(&["A", "C"])).unwrap();
        assert_eq!(rows[0].left_img, "A");
        assert_eq!(rows[0].selected_side, None);
        assert_eq!(rows[1].left_img, "C");
        assert_eq!(rows[1].check, Optimality::Optimal);
    }

    #[test]
    fn misaligned_reference_is_rejected() {
        let specs = vec![spec(0, "A", "B", "A", false), spec(1, "C", "D", "C", false)];
        let outcomes = vec![TrialOutcome::timeout(), TrialOutcome::timeout()];
        assert!(matches!(
            assemble_rows(&participant(), 1, &specs, &outcomes, &reference(&["A"])),
            Err(ExperimentError::Misaligned { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            assemble_rows(&participant(), 1, &specs, &outcomes[..1], &reference(&["A", "C"])),
            Err(ExperimentError::Misaligned { .. })
        ));
    }

    #[test]
    fn phase_workbook_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let specs = vec![spec(0, "A.png", "B.png", "A", false), spec(1, "C.png", "D.png", "C", true)];
        let outcomes = vec![
            TrialOutcome {
                selection: Selection::Chosen {
                    image: ImageId::from_label("A"),
                    side: Side::Left,
                    reaction_time: Duration::from_millis(250),
                },
                is_correct: true,
            },
            TrialOutcome::timeout(),
        ];

        let path = write_phase_results(
            dir.path(),
            &participant(),
            PhaseKind::First,
            &specs,
            &outcomes,
            &reference(&["A", "D"]),
        )
        .unwrap()
        .unwrap();
        assert!(path.ends_with("S01_first_phase.xlsx"));

        let t = Table::read(&path).unwrap();
        assert_eq!(t.len(), 2);
        for header in RESULT_HEADERS {
            assert!(t.has_column(header), "missing {header}");
        }
        assert_eq!(t.column("selected_side").unwrap(), vec!["A", TIMEOUT_MARKER]);
        assert_eq!(t.column("acc").unwrap(), vec!["1", "0"]);
        assert_eq!(t.column("check").unwrap(), vec!["optimal", "suboptimal"]);
        // Blank reaction time on the timeout row.
        let rt_err = t.column("reaction_time_ms").unwrap_err();
        assert!(rt_err.to_string().contains("row 3"), "{rt_err}");
    }

    #[test]
    fn practice_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = write_phase_results(
            dir.path(),
            &participant(),
            PhaseKind::Practice,
            &[],
            &[],
            &reference(&[]),
        )
        .unwrap();
        assert!(out.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_save_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the temp name makes the save fail.
        let target = dir.path().join("S01_first_phase.xlsx");
        std::fs::create_dir(target.with_extension("xlsx.tmp")).unwrap();

        let specs = vec![spec(0, "A", "B", "A", false)];
        let err = write_phase_results(
            dir.path(),
            &participant(),
            PhaseKind::First,
            &specs,
            &[TrialOutcome::timeout()],
            &reference(&["A"]),
        )
        .unwrap_err();
        assert!(matches!(err, ExperimentError::Persist { .. }));
        assert!(!target.exists());
    }
}
