//! Rendering of the simulated button grid and the status line.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use shackdeck_deck::{ButtonFace, Rgb};

use crate::keymap::key_hint;

const DIM: Color = Color::Rgb(80, 80, 80);
const LED_ON: Color = Color::Rgb(255, 64, 64);

/// What the status line shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub page: String,
    pub rotators: usize,
    pub switches: usize,
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

pub fn render(frame: &mut Frame, faces: &[Option<ButtonFace>], columns: usize, status: &Status) {
    let [grid, footer] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(frame.area());

    render_grid(frame, grid, faces, columns.max(1));
    render_status(frame, footer, status);
}

fn render_grid(frame: &mut Frame, area: Rect, faces: &[Option<ButtonFace>], columns: usize) {
    let rows = faces.len().div_ceil(columns);
    let row_areas = Layout::vertical(vec![Constraint::Fill(1); rows]).split(area);

    for (row, row_area) in row_areas.iter().enumerate() {
        let cells = Layout::horizontal(vec![Constraint::Fill(1); columns]).split(*row_area);
        for (col, cell) in cells.iter().enumerate() {
            let position = row * columns + col;
            if let Some(face) = faces.get(position) {
                render_button(frame, *cell, position, face.as_ref());
            }
        }
    }
}

fn render_button(frame: &mut Frame, area: Rect, position: usize, face: Option<&ButtonFace>) {
    let hint = key_hint(position)
        .map(|c| format!(" {c} "))
        .unwrap_or_default();
    let mut block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(DIM))
        .title(Span::styled(hint, Style::default().fg(DIM)));

    let Some(face) = face else {
        frame.render_widget(block, area);
        return;
    };

    if let Some(on) = face.led {
        let (marker, fg) = if on { ("●", LED_ON) } else { ("○", DIM) };
        block = block
            .title_bottom(Line::from(Span::styled(marker, Style::default().fg(fg))).right_aligned());
    }

    let inner = block.inner(area);
    let text_row = Rect {
        y: inner.y + inner.height.saturating_sub(1) / 2,
        height: inner.height.min(1),
        ..inner
    };

    frame.render_widget(
        block.style(Style::default().bg(color(face.background))),
        area,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            face.text.as_str(),
            Style::default()
                .fg(color(face.text_color))
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        text_row,
    );
}

fn render_status(frame: &mut Frame, area: Rect, status: &Status) {
    let key = Style::default().fg(Color::Rgb(92, 184, 92));
    let line = Line::from(vec![
        Span::styled(format!(" {} ", status.page), key.add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            " rotators {}  switches {} ",
            status.rotators, status.switches
        )),
        Span::styled(" key tap · SHIFT hold · Esc quit ", Style::default().fg(DIM)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
