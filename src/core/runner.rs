//! The session: practice, phase 1 and phase 2, strictly in sequence.
//!
//! Each phase is `assign sides → instructions → trials → persist`. A trial is
//! `present → capture → feedback (if the phase has it)`. The balance is a
//! plain value: phase 1 returns it, phase 2 only reads it for the summary.

use tracing::{debug, info};

use crate::config::{ExperimentConfig, PhaseKind};
use crate::error::{ExperimentError, Result};
use crate::feedback::{self, Balance, RewardSchedule};
use crate::journal::{JournalEntry, TrialJournal};
use crate::participant::{write_participant_info, Participant};
use crate::prng::Prng;
use crate::response::{capture, hold, wait_for_key, TrialOutcome};
use crate::results::write_phase_results;
use crate::stimuli::{assign_sides, PhaseStimuli, StimulusPlan, StimulusRow, TrialSpec};
use crate::surface::{Key, Screen, Surface};

pub const PRACTICE_INTRO: &str = "Welcome to the practice phase.\nPress SPACE to begin.";
pub const PRACTICE_DONE: &str =
    "The practice phase is complete.\nPress SPACE to continue to the experiment.";
pub const FIRST_INTRO: &str = "Press SPACE to start the experiment when you are ready.";
pub const FIRST_DONE: &str = "Phase one is complete.\nPress SPACE to continue to phase two.";
pub const SECOND_INTRO: &str = "Phase two is starting.\nPress SPACE when you are ready.";
pub const THANK_YOU: &str = "Thank you for taking part in the experiment.";

/// Everything one phase produced, in presentation order.
#[derive(Debug, Clone)]
pub struct PhaseRun {
    pub phase: PhaseKind,
    pub specs: Vec<TrialSpec>,
    pub outcomes: Vec<TrialOutcome>,
    pub balance: Balance,
}

pub struct Session<S: Surface> {
    surface: S,
    config: ExperimentConfig,
    participant: Participant,
    schedule: RewardSchedule,
    rng: Prng,
    journal: TrialJournal,
}

impl<S: Surface> Session<S> {
    pub fn new(surface: S, config: ExperimentConfig, participant: Participant) -> Self {
        let rng = match config.seed {
            Some(seed) => Prng::new(seed),
            None => Prng::from_clock(),
        };
        let journal = if config.journal {
            TrialJournal::open(
                &config
                    .output_dir
                    .join(TrialJournal::journal_file(&participant.id)),
            )
        } else {
            TrialJournal::disabled()
        };
        let schedule = RewardSchedule::new(config.reward_units, config.currency.clone());
        Self {
            surface,
            config,
            participant,
            schedule,
            rng,
            journal,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Participant info, practice, phase 1, phase 2. Returns the phase-1
    /// balance shown on the final summary.
    pub async fn run(&mut self, plan: &StimulusPlan) -> Result<Balance> {
        info!("session start: {}", self.participant);
        write_participant_info(&self.config.output_dir, &self.participant)?;

        self.practice(&plan.practice).await?;
        let balance = self.first_phase(&plan.first).await?;
        self.second_phase(&plan.second, balance).await?;

        info!("session complete, balance {} {}", balance, self.config.currency);
        Ok(balance)
    }

    /// Feedback and a balance from zero, nothing persisted.
    pub async fn practice(&mut self, stimuli: &PhaseStimuli) -> Result<()> {
        self.instructions(PRACTICE_INTRO).await?;
        let run = self.run_phase(PhaseKind::Practice, &stimuli.rows, Balance::ZERO).await?;
        debug!("practice finished at balance {}", run.balance);
        self.instructions(PRACTICE_DONE).await
    }

    pub async fn first_phase(&mut self, stimuli: &PhaseStimuli) -> Result<Balance> {
        self.instructions(FIRST_INTRO).await?;
        let run = self.run_phase(PhaseKind::First, &stimuli.rows, Balance::ZERO).await?;
        self.persist(stimuli, &run)?;
        self.instructions(FIRST_DONE).await?;
        Ok(run.balance)
    }

    /// No timeout, no feedback, no balance change. Ends on the summary hold.
    pub async fn second_phase(&mut self, stimuli: &PhaseStimuli, carried: Balance) -> Result<()> {
        self.instructions(SECOND_INTRO).await?;
        let run = self.run_phase(PhaseKind::Second, &stimuli.rows, carried).await?;
        self.persist(stimuli, &run)?;

        self.surface
            .present(Screen::Summary {
                lines: vec![
                    THANK_YOU.to_owned(),
                    format!("Your total balance: {} {}", carried, self.config.currency),
                ],
            })
            .await?;
        hold(&mut self.surface, self.config.summary_hold).await
    }

    pub async fn run_phase(
        &mut self,
        phase: PhaseKind,
        rows: &[StimulusRow],
        start: Balance,
    ) -> Result<PhaseRun> {
        let specs = assign_sides(rows, &mut self.rng);
        self.run_trials(phase, specs, start).await
    }

    /// Present `specs` in order. Aborts propagate immediately as
    /// [`ExperimentError::Aborted`].
    pub async fn run_trials(
        &mut self,
        phase: PhaseKind,
        specs: Vec<TrialSpec>,
        start: Balance,
    ) -> Result<PhaseRun> {
        info!("{} start: {} trials", phase.label(), specs.len());
        let timeout = phase.timeout(&self.config);
        let mut balance = start;
        let mut outcomes = Vec::with_capacity(specs.len());

        for (i, spec) in specs.iter().enumerate() {
            let banner = phase
                .shows_balance()
                .then(|| format!("Current balance: {} {}", balance, self.config.currency));
            self.surface
                .present(Screen::Trial {
                    left: self.config.input_dir.join(spec.displayed_left()),
                    right: self.config.input_dir.join(spec.displayed_right()),
                    banner,
                })
                .await?;

            let event = capture(&mut self.surface, timeout).await;
            let outcome = TrialOutcome::resolve(spec, event).inspect_err(|_| {
                info!("{} aborted at trial {}", phase.label(), i + 1);
            })?;

            let fb = phase
                .gives_feedback()
                .then(|| feedback::apply(&outcome, balance, &self.schedule));
            if let Some(fb) = &fb {
                balance = fb.balance;
            }

            self.journal.record(&JournalEntry::new(
                &self.participant.id,
                phase,
                i + 1,
                spec,
                &outcome,
                phase.shows_balance().then_some(balance),
            ));
            debug!(
                "{} trial {} row={} selected={:?} rt={:?} correct={}",
                phase.label(),
                i + 1,
                spec.row(),
                outcome.selected_image().map(|id| id.as_str()),
                outcome.reaction_time(),
                outcome.is_correct
            );

            if let Some(fb) = fb {
                self.surface
                    .present(Screen::Feedback {
                        message: fb.message,
                        color: fb.color,
                    })
                    .await?;
                hold(&mut self.surface, self.config.feedback_hold).await?;
            }

            outcomes.push(outcome);
        }

        let correct = outcomes.iter().filter(|o| o.is_correct).count();
        let timeouts = outcomes.iter().filter(|o| o.is_timeout()).count();
        info!(
            "{} done: {}/{} correct, {} timeouts, balance {}",
            phase.label(),
            correct,
            outcomes.len(),
            timeouts,
            balance
        );

        Ok(PhaseRun {
            phase,
            specs,
            outcomes,
            balance,
        })
    }

    /// Write the phase workbook. A failure here stops the session before the
    /// next phase starts.
    fn persist(&self, stimuli: &PhaseStimuli, run: &PhaseRun) -> Result<()> {
        let Some(reference) = stimuli.reference.as_ref() else {
            return Err(ExperimentError::MalformedStimuli {
                path: self.config.stimulus_path(run.phase),
                message: "no optimal reference for a persisted phase".to_owned(),
            });
        };
        write_phase_results(
            &self.config.output_dir,
            &self.participant,
            run.phase,
            &run.specs,
            &run.outcomes,
            reference,
        )?;
        Ok(())
    }

    async fn instructions(&mut self, text: &str) -> Result<()> {
        self.surface.present(Screen::instructions(text)).await?;
        wait_for_key(&mut self.surface, Key::Space).await
    }
}
