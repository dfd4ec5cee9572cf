//! Reusable widgets and colors for the wizard screens

use ratatui::{prelude::*, widgets::*};

use crate::app::wizard::Step;
use crate::messages::render::{NoticeKind, PreviewStatus};

const STEPS: [Step; 4] = [
    Step::CredentialEntry,
    Step::Ideation,
    Step::StoryboardReview,
    Step::Generation,
];

/// Border style for a field: editing, focused or idle
pub fn field_style(is_focused: bool, is_editing: bool) -> Style {
    if is_focused && is_editing {
        Style::default().fg(Color::Yellow)
    } else if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Renders a text input field
pub fn render_input<'a>(
    content: &'a str,
    title: &'a str,
    is_focused: bool,
    is_editing: bool,
) -> Paragraph<'a> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(field_style(is_focused, is_editing))
        .title(format!(" {} ", title));

    Paragraph::new(content).block(block).wrap(Wrap { trim: false })
}

/// Terminal position of a byte cursor inside a wrapped input block
pub fn cursor_in(area: Rect, content: &str, cursor: usize) -> Position {
    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let before = content.get(..cursor).unwrap_or(content);

    let mut row = 0usize;
    let mut col = 0usize;
    for c in before.chars() {
        if c == '\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
            if col >= inner_width {
                row += 1;
                col = 0;
            }
        }
    }

    let max_y = area.y + area.height.saturating_sub(2);
    Position::new(
        area.x + 1 + col as u16,
        (area.y + 1 + row as u16).min(max_y),
    )
}

/// Step indicator along the top of the screen
pub fn render_steps(current: Step) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, step) in STEPS.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
        }
        let label = format!(" {}:{} ", step.number(), step.title());
        let style = if *step == current {
            Style::default().fg(Color::Black).bg(Color::Cyan).bold()
        } else if step.number() < current.number() {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
    }
    Line::from(spans)
}

/// Short marker and color for a preview
pub fn preview_marker(status: &PreviewStatus) -> (&'static str, Color) {
    match status {
        PreviewStatus::Empty => ("  ", Color::DarkGray),
        PreviewStatus::Loading => ("..", Color::Yellow),
        PreviewStatus::Ready { .. } => ("ok", Color::Green),
        PreviewStatus::Failed(_) => ("!!", Color::Red),
    }
}

pub fn notice_color(kind: NoticeKind) -> Color {
    match kind {
        NoticeKind::Info => Color::Green,
        NoticeKind::Error => Color::Red,
    }
}

/// Human readable size of a base64 payload
pub fn payload_size(base64_len: usize) -> String {
    let bytes = base64_len / 4 * 3;
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{} KB", bytes / 1024)
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_wraps_with_block_width() {
        let area = Rect::new(0, 0, 7, 10);
        assert_eq!(cursor_in(area, "abc", 3), Position::new(4, 1));
        assert_eq!(cursor_in(area, "abcdefg", 7), Position::new(3, 2));
        assert_eq!(cursor_in(area, "ab\ncd", 5), Position::new(3, 2));
    }

    #[test]
    fn test_payload_size() {
        assert_eq!(payload_size(4096), "3 KB");
        assert_eq!(payload_size(4 * 1024 * 1024), "3.0 MB");
    }
}
