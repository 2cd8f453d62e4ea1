//! Response capture and the resulting trial outcome.

use std::time::Duration;

use tracing::warn;

use crate::error::{ExperimentError, Result};
use crate::stimuli::{ImageId, Side, TrialSpec};
use crate::surface::{Key, Surface};

/// Result of one capture window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseEvent {
    Left(Duration),
    Right(Duration),
    Timeout,
    Abort,
}

/// Poll until LEFT/RIGHT, ESCAPE or the timeout.
///
/// Every iteration drains the whole pending batch. ESCAPE anywhere in the
/// batch wins over a choice in the same batch and over the timeout. A batch
/// holding both arrows carries no press order, so it counts as no response.
/// Other keys are discarded. With `timeout == None` this waits indefinitely.
pub async fn capture<S: Surface>(surface: &mut S, timeout: Option<Duration>) -> ResponseEvent {
    let started = surface.now();
    loop {
        let keys = surface.drain_keys();
        if keys.contains(&Key::Escape) {
            return ResponseEvent::Abort;
        }

        let elapsed = surface.now().duration_since(started);
        match (keys.contains(&Key::Left), keys.contains(&Key::Right)) {
            (true, false) => return ResponseEvent::Left(elapsed),
            (false, true) => return ResponseEvent::Right(elapsed),
            (true, true) => warn!("both arrows in one frame, ignored"),
            (false, false) => {}
        }

        if let Some(limit) = timeout {
            if elapsed > limit {
                return ResponseEvent::Timeout;
            }
        }

        surface.next_frame().await;
    }
}

/// Block on an instruction screen until `key` is pressed.
pub async fn wait_for_key<S: Surface>(surface: &mut S, key: Key) -> Result<()> {
    loop {
        let keys = surface.drain_keys();
        if keys.contains(&Key::Escape) {
            return Err(ExperimentError::Aborted);
        }
        if keys.contains(&key) {
            return Ok(());
        }
        surface.next_frame().await;
    }
}

/// Keep the current screen up for exactly `duration`, discarding input but
/// still honoring ESCAPE.
pub async fn hold<S: Surface>(surface: &mut S, duration: Duration) -> Result<()> {
    let started = surface.now();
    loop {
        if surface.drain_keys().contains(&Key::Escape) {
            return Err(ExperimentError::Aborted);
        }
        if surface.now().duration_since(started) >= duration {
            return Ok(());
        }
        surface.next_frame().await;
    }
}

/// What the participant picked. A timeout has no image and no latency, so
/// neither can be read without matching on the variant first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Chosen {
        image: ImageId,
        side: Side,
        reaction_time: Duration,
    },
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOutcome {
    pub selection: Selection,
    pub is_correct: bool,
}

impl TrialOutcome {
    /// Resolve a spatial response against the trial's on-screen layout.
    /// `Abort` becomes [`ExperimentError::Aborted`].
    pub fn resolve(spec: &TrialSpec, event: ResponseEvent) -> Result<Self> {
        let (side, reaction_time) = match event {
            ResponseEvent::Left(rt) => (Side::Left, rt),
            ResponseEvent::Right(rt) => (Side::Right, rt),
            ResponseEvent::Timeout => return Ok(Self::timeout()),
            ResponseEvent::Abort => return Err(ExperimentError::Aborted),
        };
        let image = ImageId::from_path(spec.image_on(side));
        let is_correct = &image == spec.correct_side();
        Ok(Self {
            selection: Selection::Chosen {
                image,
                side,
                reaction_time,
            },
            is_correct,
        })
    }

    pub fn timeout() -> Self {
        Self {
            selection: Selection::Timeout,
            is_correct: false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.selection, Selection::Timeout)
    }

    pub fn selected_image(&self) -> Option<&ImageId> {
        match &self.selection {
            Selection::Chosen { image, .. } => Some(image),
            Selection::Timeout => None,
        }
    }

    pub fn reaction_time(&self) -> Option<Duration> {
        match self.selection {
            Selection::Chosen { reaction_time, .. } => Some(reaction_time),
            Selection::Timeout => None,
        }
    }

    /// A timeout is never optimal.
    pub fn is_optimal(&self, reference: &ImageId) -> bool {
        self.selected_image() == Some(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedSurface;
    use crate::stimuli::StimulusRow;
    use pollster::block_on;

    const FRAME: Duration = Duration::from_millis(10);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn spec_ab(swapped: bool) -> TrialSpec {
        TrialSpec {
            source: StimulusRow {
                row: 0,
                left_img: "A.png".to_owned(),
                right_img: "B.png".to_owned(),
                correct_side: ImageId::from_label("A"),
            },
            swapped,
        }
    }

    #[test]
    fn left_press_returns_elapsed_time() {
        let mut s = ScriptedSurface::new(FRAME).press_at(ms(350), Key::Left);
        let event = block_on(capture(&mut s, Some(Duration::from_secs(2))));
        match event {
            ResponseEvent::Left(rt) => {
                assert!(rt >= ms(350) && rt < ms(350) + FRAME * 2, "rt {rt:?}")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn no_input_times_out_after_limit() {
        let mut s = ScriptedSurface::new(FRAME);
        let event = block_on(capture(&mut s, Some(Duration::from_secs(2))));
        assert_eq!(event, ResponseEvent::Timeout);
        assert!(s.elapsed() > Duration::from_secs(2));
        assert!(s.elapsed() <= Duration::from_secs(2) + FRAME * 2);
    }

    #[test]
    fn unbounded_capture_waits_past_any_timeout() {
        let mut s = ScriptedSurface::new(FRAME).press_at(Duration::from_secs(30), Key::Right);
        let event = block_on(capture(&mut s, None));
        assert!(matches!(event, ResponseEvent::Right(rt) if rt >= Duration::from_secs(30)));
    }

    #[test]
    fn escape_beats_a_choice_in_the_same_batch() {
        let mut s = ScriptedSurface::new(FRAME)
            .press_at(ms(100), Key::Left)
            .press_at(ms(100), Key::Escape);
        assert_eq!(block_on(capture(&mut s, Some(ms(2000)))), ResponseEvent::Abort);
    }

    #[test]
    fn both_arrows_in_one_batch_are_ignored() {
        let mut s = ScriptedSurface::new(FRAME)
            .press_at(ms(100), Key::Right)
            .press_at(ms(100), Key::Left)
            .press_at(ms(300), Key::Right);
        match block_on(capture(&mut s, Some(ms(2000)))) {
            ResponseEvent::Right(rt) => assert!(rt >= ms(300), "rt {rt:?}"),
            other => panic!("unexpected: {other:?}"),
        }

        let mut s = ScriptedSurface::new(FRAME)
            .press_at(ms(100), Key::Left)
            .press_at(ms(100), Key::Right);
        assert_eq!(block_on(capture(&mut s, Some(ms(500)))), ResponseEvent::Timeout);
    }

    #[test]
    fn other_keys_are_discarded_while_polling() {
        let mut s = ScriptedSurface::new(FRAME)
            .press_at(ms(50), Key::Space)
            .press_at(ms(120), Key::Right);
        assert!(matches!(
            block_on(capture(&mut s, Some(ms(2000)))),
            ResponseEvent::Right(_)
        ));
        assert!(s.pending_keys() == 0);
    }

    #[test]
    fn wait_for_space_aborts_on_escape() {
        let mut s = ScriptedSurface::new(FRAME).press_at(ms(40), Key::Escape);
        assert!(block_on(wait_for_key(&mut s, Key::Space)).unwrap_err().is_abort());
    }

    #[test]
    fn hold_lasts_the_full_duration() {
        let mut s = ScriptedSurface::new(FRAME).press_at(ms(500), Key::Left);
        block_on(hold(&mut s, Duration::from_secs(2))).unwrap();
        assert!(s.elapsed() >= Duration::from_secs(2));
        assert!(s.elapsed() < Duration::from_secs(2) + FRAME);
    }

    #[test]
    fn hold_aborts_on_escape() {
        let mut s = ScriptedSurface::new(FRAME).press_at(ms(700), Key::Escape);
        let err = block_on(hold(&mut s, Duration::from_secs(2))).unwrap_err();
        assert!(err.is_abort());
        assert!(s.elapsed() >= ms(700) && s.elapsed() < ms(700) + FRAME);
    }

    #[test]
    fn right_choice_resolves_to_image_on_that_side() {
        let outcome = TrialOutcome::resolve(&spec_ab(false), ResponseEvent::Right(ms(400))).unwrap();
        assert_eq!(outcome.selected_image(), Some(&ImageId::from_label("B")));
        assert!(!outcome.is_correct);
        assert_eq!(outcome.reaction_time(), Some(ms(400)));

        // Same key, swapped layout: the correct image was on the right.
        let outcome = TrialOutcome::resolve(&spec_ab(true), ResponseEvent::Right(ms(400))).unwrap();
        assert_eq!(outcome.selected_image(), Some(&ImageId::from_label("A")));
        assert!(outcome.is_correct);
    }

    #[test]
    fn timeout_has_no_selection_and_is_never_correct() {
        let outcome = TrialOutcome::resolve(&spec_ab(false), ResponseEvent::Timeout).unwrap();
        assert!(outcome.is_timeout());
        assert!(!outcome.is_correct);
        assert_eq!(outcome.selected_image(), None);
        assert_eq!(outcome.reaction_time(), None);
        assert!(!outcome.is_optimal(&ImageId::from_label("A")));
    }

    #[test]
    fn abort_resolves_to_error() {
        let err = TrialOutcome::resolve(&spec_ab(false), ResponseEvent::Abort).unwrap_err();
        assert!(err.is_abort());
    }
}
