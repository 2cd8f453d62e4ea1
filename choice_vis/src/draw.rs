use forced_choice::surface::Rgb;
use macroquad::prelude::*;

pub const FONT_SIZE: u16 = 36;
pub const LINE_H: f32 = 40.0;
pub const SMALL_FONT_SIZE: u16 = 22;

pub fn color(rgb: Rgb) -> Color {
    Color::from_rgba(rgb.0, rgb.1, rgb.2, 255)
}

/// Draw `text` with its center at (`cx`, `cy`).
pub fn draw_centered(text: &str, cx: f32, cy: f32, font_size: u16, color: Color) {
    let dims = measure_text(text, None, font_size, 1.0);
    draw_text(
        text,
        cx - dims.width * 0.5,
        cy + dims.offset_y * 0.5,
        font_size as f32,
        color,
    );
}

/// Lines wrapped to the screen and stacked downwards from `top`.
pub fn draw_text_block(lines: &[String], top: f32, line_h: f32, color: Color) {
    let max_w = screen_width() * 0.8;
    let wrapped: Vec<String> = lines
        .iter()
        .flat_map(|l| wrap_text_to_width(l, max_w, FONT_SIZE))
        .collect();
    let cx = screen_width() * 0.5;
    for (i, line) in wrapped.iter().enumerate() {
        draw_centered(line, cx, top + i as f32 * line_h, FONT_SIZE, color);
    }
}

pub fn draw_panel(rect: Rect, focused: bool) {
    draw_rectangle(rect.x, rect.y, rect.w, rect.h, Color::new(0.96, 0.96, 0.96, 1.0));
    let (thickness, edge) = if focused {
        (3.0, Color::new(0.15, 0.35, 0.85, 1.0))
    } else {
        (1.0, Color::new(0.55, 0.55, 0.58, 1.0))
    };
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, thickness, edge);
}

pub fn wrap_text_to_width(text: &str, max_w: f32, font_size: u16) -> Vec<String> {
    let fits = |s: &str| measure_text(s, None, font_size, 1.0).width <= max_w;
    let mut out = Vec::new();
    let mut cur = String::new();

    for word in text.split_whitespace() {
        let cand = if cur.is_empty() {
            word.to_owned()
        } else {
            format!("{cur} {word}")
        };
        if fits(&cand) {
            cur = cand;
            continue;
        }
        if !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
        if fits(word) {
            cur.push_str(word);
            continue;
        }

        // Long tokens (file names, mostly) split by chars.
        for ch in word.chars() {
            cur.push(ch);
            if !fits(&cur) && cur.chars().count() > 1 {
                cur.pop();
                out.push(std::mem::take(&mut cur));
                cur.push(ch);
            }
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    // Keep blank source lines as vertical space.
    if out.is_empty() {
        out.push(String::new());
    }
    out
}
