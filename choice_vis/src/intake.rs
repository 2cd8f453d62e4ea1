use forced_choice::participant::{Field, IntakeForm, Participant};
use macroquad::prelude::*;

use crate::draw::{draw_centered, draw_panel, FONT_SIZE, SMALL_FONT_SIZE};

const ROW_H: f32 = 64.0;
const BOX_H: f32 = 44.0;

/// Run the intake form until it validates. `None` means the operator quit.
pub async fn collect_participant() -> Option<Participant> {
    let mut form = IntakeForm::new();

    loop {
        if is_key_pressed(KeyCode::Escape) || is_quit_requested() {
            return None;
        }

        while let Some(c) = get_char_pressed() {
            form.type_char(c);
        }
        if is_key_pressed(KeyCode::Backspace) {
            form.backspace();
        }
        let shift = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);
        if is_key_pressed(KeyCode::Up) || (shift && is_key_pressed(KeyCode::Tab)) {
            form.focus_prev();
        } else if is_key_pressed(KeyCode::Down) || is_key_pressed(KeyCode::Tab) {
            form.focus_next();
        }
        if is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::KpEnter) {
            if let Some(participant) = form.submit() {
                return Some(participant);
            }
        }

        draw_form(&form);
        next_frame().await;
    }
}

fn draw_form(form: &IntakeForm) {
    clear_background(WHITE);
    let (w, h) = (screen_width(), screen_height());
    let top = h * 0.5 - ROW_H * 2.5;

    draw_centered("Participant information", w * 0.5, top - ROW_H, FONT_SIZE, BLACK);

    let label_x = w * 0.15;
    let box_x = w * 0.55;
    let box_w = w * 0.3;
    for (i, field) in Field::ALL.into_iter().enumerate() {
        let y = top + i as f32 * ROW_H;
        let focused = form.focused() == field;

        draw_text(field.label(), label_x, y + BOX_H * 0.7, SMALL_FONT_SIZE as f32, BLACK);
        draw_panel(Rect::new(box_x, y, box_w, BOX_H), focused);

        let mut value = form.value(field).to_owned();
        // Blinking caret.
        if focused && (get_time() * 2.0) as i64 % 2 == 0 {
            value.push('|');
        }
        draw_text(&value, box_x + 10.0, y + BOX_H * 0.7, FONT_SIZE as f32 * 0.8, BLACK);
    }

    let footer = top + Field::ALL.len() as f32 * ROW_H + 20.0;
    if let Some(err) = form.error() {
        draw_centered(&err.to_string(), w * 0.5, footer, SMALL_FONT_SIZE, RED);
    }
    draw_centered(
        "Tab / arrows: change field    Enter: start    Esc: quit",
        w * 0.5,
        footer + 40.0,
        SMALL_FONT_SIZE,
        GRAY,
    );
}
