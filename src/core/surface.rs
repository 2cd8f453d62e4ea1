//! The display/input seam between the trial runner and a front-end.
//!
//! The runner only ever describes *what* is on screen ([`Screen`]) and asks
//! for the keys pressed since the last frame. The front-end owns drawing,
//! image decoding and frame pacing.

use std::path::PathBuf;
use std::time::Instant;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Space,
    /// ESCAPE, or a request to close the window.
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Blank,
    /// Centered text block, one entry per line.
    Instructions { lines: Vec<String> },
    Trial {
        left: PathBuf,
        right: PathBuf,
        /// Balance banner drawn above the images, if the phase shows one.
        banner: Option<String>,
    },
    Feedback { message: String, color: Rgb },
    Summary { lines: Vec<String> },
}

impl Screen {
    pub fn instructions(text: &str) -> Self {
        Screen::Instructions {
            lines: text.lines().map(str::to_owned).collect(),
        }
    }

    pub fn is_feedback(&self) -> bool {
        matches!(self, Screen::Feedback { .. })
    }
}

/// A single exclusive display plus its keyboard.
///
/// `present` and `next_frame` are async so a frame-driven renderer can yield
/// to its event loop; a headless implementation may resolve them immediately.
#[allow(async_fn_in_trait)]
pub trait Surface {
    /// Monotonic clock used for every latency and timeout measurement.
    fn now(&self) -> Instant;

    /// Keys pressed since the previous call, in no guaranteed order. Anything
    /// not returned here is lost.
    fn drain_keys(&mut self) -> Vec<Key>;

    /// Replace what is drawn from the next frame on. Fails if an image
    /// referenced by the screen cannot be loaded.
    async fn present(&mut self, screen: Screen) -> Result<()>;

    /// Draw the current screen and wait for the next frame.
    async fn next_frame(&mut self);
}
