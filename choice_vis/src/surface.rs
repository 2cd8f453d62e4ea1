//! [`Surface`] on a fullscreen macroquad window.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use forced_choice::error::{ExperimentError, Result};
use forced_choice::surface::{Key, Rgb, Screen, Surface};
use macroquad::prelude::*;
use tracing::debug;

use crate::draw::{color, draw_centered, draw_text_block, FONT_SIZE, LINE_H};

const KEYS: [(KeyCode, Key); 4] = [
    (KeyCode::Escape, Key::Escape),
    (KeyCode::Left, Key::Left),
    (KeyCode::Right, Key::Right),
    (KeyCode::Space, Key::Space),
];

// Largest share of the screen one stimulus image may cover.
const IMAGE_MAX_W: f32 = 0.38;
const IMAGE_MAX_H: f32 = 0.7;

pub struct MacroquadSurface {
    screen: Screen,
    textures: HashMap<PathBuf, Texture2D>,
    // macroquad reports a key as pressed for the whole frame.
    drained: bool,
}

impl MacroquadSurface {
    pub fn new() -> Self {
        Self {
            screen: Screen::Blank,
            textures: HashMap::new(),
            drained: false,
        }
    }

    async fn texture(&mut self, path: &Path) -> Result<Texture2D> {
        if let Some(tex) = self.textures.get(path) {
            return Ok(tex.clone());
        }
        let tex = load_texture(&path.to_string_lossy())
            .await
            .map_err(|e| ExperimentError::Display(format!("cannot load image {}: {e}", path.display())))?;
        tex.set_filter(FilterMode::Linear);
        debug!("loaded {} ({}x{})", path.display(), tex.width(), tex.height());
        self.textures.insert(path.to_path_buf(), tex.clone());
        Ok(tex)
    }

    fn draw(&self) {
        clear_background(WHITE);
        let (w, h) = (screen_width(), screen_height());

        match &self.screen {
            Screen::Blank => {}
            Screen::Instructions { lines } => {
                draw_text_block(lines, h * 0.5, LINE_H, color(Rgb::BLACK));
            }
            Screen::Trial { left, right, banner } => {
                for (path, cx) in [(left, w * 0.3), (right, w * 0.7)] {
                    if let Some(tex) = self.textures.get(path) {
                        draw_image(tex, cx, h * 0.5);
                    }
                }
                if let Some(banner) = banner {
                    draw_centered(banner, w * 0.5, 10.0 + FONT_SIZE as f32 * 0.5, FONT_SIZE, BLACK);
                }
            }
            Screen::Feedback { message, color: rgb } => {
                draw_centered(message, w * 0.5, h * 0.5, FONT_SIZE, color(*rgb));
            }
            Screen::Summary { lines } => {
                let spacing = 60.0;
                let top = h * 0.5 - (lines.len().saturating_sub(1)) as f32 * spacing * 0.5;
                draw_text_block(lines, top, spacing, color(Rgb::BLACK));
            }
        }
    }
}

/// Centered on (`cx`, `cy`), scaled down to fit, never up.
fn draw_image(tex: &Texture2D, cx: f32, cy: f32) {
    let (tw, th) = (tex.width(), tex.height());
    let fit = (screen_width() * IMAGE_MAX_W / tw)
        .min(screen_height() * IMAGE_MAX_H / th)
        .min(1.0);
    let size = vec2(tw * fit, th * fit);
    draw_texture_ex(
        tex,
        cx - size.x * 0.5,
        cy - size.y * 0.5,
        WHITE,
        DrawTextureParams {
            dest_size: Some(size),
            ..Default::default()
        },
    );
}

impl Surface for MacroquadSurface {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn drain_keys(&mut self) -> Vec<Key> {
        if self.drained {
            return Vec::new();
        }
        self.drained = true;

        // Table order, not press order: macroquad keeps no order within a frame.
        let mut keys: Vec<Key> = KEYS
            .iter()
            .filter(|(code, _)| is_key_pressed(*code))
            .map(|&(_, key)| key)
            .collect();
        if is_quit_requested() && !keys.contains(&Key::Escape) {
            keys.push(Key::Escape);
        }
        keys
    }

    /// Textures are loaded before the screen swaps, then the new screen is
    /// flipped so response timing starts from what the participant sees.
    async fn present(&mut self, screen: Screen) -> Result<()> {
        if let Screen::Trial { left, right, .. } = &screen {
            self.texture(left).await?;
            self.texture(right).await?;
        }
        self.screen = screen;
        self.next_frame().await;
        Ok(())
    }

    async fn next_frame(&mut self) {
        self.draw();
        next_frame().await;
        self.drained = false;
    }
}
