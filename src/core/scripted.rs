//! Headless [`Surface`] on a virtual clock, for driving the runner in tests.

use std::time::{Duration, Instant};

use crate::error::{ExperimentError, Result};
use crate::surface::{Key, Screen, Surface};

type Responder = Box<dyn FnMut(&Screen) -> Vec<(Duration, Key)>>;

pub struct ScriptedSurface {
    base: Instant,
    elapsed: Duration,
    frame: Duration,
    /// (virtual time, key), delivered on the first drain at or after that time.
    scheduled: Vec<(Duration, Key)>,
    responder: Option<Responder>,
    missing_image: Option<String>,
    pub shown: Vec<(Duration, Screen)>,
}

impl ScriptedSurface {
    pub fn new(frame: Duration) -> Self {
        Self {
            base: Instant::now(),
            elapsed: Duration::ZERO,
            frame,
            scheduled: Vec::new(),
            responder: None,
            missing_image: None,
            shown: Vec::new(),
        }
    }

    pub fn press_at(mut self, at: Duration, key: Key) -> Self {
        self.scheduled.push((at, key));
        self
    }

    /// Called on every `present`; returned keys are scheduled relative to it.
    pub fn on_present(mut self, f: impl FnMut(&Screen) -> Vec<(Duration, Key)> + 'static) -> Self {
        self.responder = Some(Box::new(f));
        self
    }

    /// Fail `present` for any trial screen drawing a path ending in `path`.
    pub fn with_missing_image(mut self, path: &str) -> Self {
        self.missing_image = Some(path.to_owned());
        self
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn pending_keys(&self) -> usize {
        self.scheduled.len()
    }

    pub fn screens(&self) -> impl Iterator<Item = &Screen> {
        self.shown.iter().map(|(_, s)| s)
    }
}

impl Surface for ScriptedSurface {
    fn now(&self) -> Instant {
        self.base + self.elapsed
    }

    fn drain_keys(&mut self) -> Vec<Key> {
        let now = self.elapsed;
        let mut due = Vec::new();
        self.scheduled.retain(|&(at, key)| {
            if at <= now {
                due.push(key);
                false
            } else {
                true
            }
        });
        due
    }

    async fn present(&mut self, screen: Screen) -> Result<()> {
        if let (Some(missing), Screen::Trial { left, right, .. }) = (&self.missing_image, &screen) {
            if left.ends_with(missing) || right.ends_with(missing) {
                return Err(ExperimentError::Display(format!("cannot load image {missing}")));
            }
        }
        if let Some(responder) = self.responder.as_mut() {
            for (delay, key) in responder(&screen) {
                self.scheduled.push((self.elapsed + delay, key));
            }
        }
        self.shown.push((self.elapsed, screen));
        Ok(())
    }

    async fn next_frame(&mut self) {
        self.elapsed += self.frame;
    }
}
