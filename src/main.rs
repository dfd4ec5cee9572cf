//! Comic Crafter TUI - terminal wizard for AI-generated comics
//!
//! Architecture:
//! - UI Layer (Ratatui) - synchronous terminal rendering
//! - App Layer - wizard state machine processing events
//! - Network Layer (Tokio) - generation requests and the image queue

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc;

use comic_crafter::app::{AppActor, AppState, Step};
use comic_crafter::config::Config;
use comic_crafter::constants::{APP_NAME, APP_VERSION, SLOT_COUNT};
use comic_crafter::messages::render::{GenerationView, IdeationView, PreviewStatus, ReviewView};
use comic_crafter::messages::ui_events::{key_to_ui_event, Field, InputMode};
use comic_crafter::messages::{NetworkCommand, NetworkResponse, Notice, RenderState, UiEvent};
use comic_crafter::models::{ArtStyle, SuggestionKind};
use comic_crafter::network::{GeminiClient, NetworkActor};
use comic_crafter::ui::{
    centered_rect, cursor_in, field_style, notice_color, payload_size, preview_marker,
    render_input, render_steps,
};

/// Terminal cleanup guard
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Initialize logging to file
    let log_dir = config
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| ".".into());
    let log_name = config
        .log_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "comic-crafter.log".into());
    let file_appender = tracing_appender::rolling::never(log_dir, log_name);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    tracing::info!(version = APP_VERSION, api = %config.api_base_url, "Starting");

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _terminal_guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create channels
    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (net_cmd_tx, net_cmd_rx) = mpsc::unbounded_channel::<NetworkCommand>();
    let (net_resp_tx, net_resp_rx) = mpsc::unbounded_channel::<NetworkResponse>();
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderState>();

    // Spawn network actor
    let client = Arc::new(GeminiClient::new(&config));
    let network_actor = NetworkActor::new(client, net_resp_tx);
    tokio::spawn(network_actor.run(net_cmd_rx));

    // Spawn app actor
    let app_actor = AppActor::new(AppState::new(config), net_cmd_tx, render_tx);
    tokio::spawn(app_actor.run(ui_rx, net_resp_rx));

    // Run UI loop (synchronous with async polling)
    run_ui_loop(&mut terminal, ui_tx, &mut render_rx).await?;

    tracing::info!("Exiting");
    Ok(())
}

/// Run the synchronous UI rendering loop
async fn run_ui_loop(
    terminal: &mut Terminal<impl Backend>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    render_rx: &mut mpsc::UnboundedReceiver<RenderState>,
) -> anyhow::Result<()> {
    let mut current_state = RenderState::default();

    loop {
        // Draw with current state
        terminal.draw(|f| draw_ui(f, &current_state))?;

        // Poll for events with timeout
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Some(event) = key_to_ui_event(
                    key,
                    current_state.step,
                    current_state.input_mode,
                    current_state.show_help,
                    current_state.notice.is_some(),
                ) {
                    let quit = event == UiEvent::Quit;
                    let _ = ui_tx.send(event);
                    if quit {
                        break;
                    }
                }
            }
        }

        // Check for state updates (non-blocking)
        while let Ok(state) = render_rx.try_recv() {
            current_state = state;
        }
    }

    Ok(())
}

// ============================================================================
// UI Drawing Functions
// ============================================================================

fn draw_ui(f: &mut Frame, state: &RenderState) {
    let area = f.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Step bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let header = Line::from(vec![
        Span::styled(format!(" {} ", APP_NAME), Style::default().fg(Color::Magenta).bold()),
        Span::raw(" "),
    ]);
    let mut spans = header.spans;
    spans.extend(render_steps(state.step).spans);
    f.render_widget(Paragraph::new(Line::from(spans)), main_chunks[0]);

    match state.step {
        Step::CredentialEntry => draw_credential_step(f, state, main_chunks[1]),
        Step::Ideation => draw_ideation_step(f, state, &state.ideation, main_chunks[1]),
        Step::StoryboardReview => {
            if let Some(review) = &state.review {
                draw_review_step(f, state, review, main_chunks[1]);
            }
        }
        Step::Generation => {
            if let Some(generation) = &state.generation {
                draw_generation_step(f, generation, main_chunks[1]);
            }
        }
    }

    draw_status_bar(f, state, main_chunks[2]);

    // Popups
    if let Some(notice) = &state.notice {
        draw_notice(f, notice, area);
    }
    if state.show_help {
        draw_help_popup(f, area);
    }
}

fn draw_credential_step(f: &mut Frame, state: &RenderState, area: Rect) {
    let popup = centered_rect(60, 40, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(popup);

    let intro = Paragraph::new(vec![
        Line::from(Span::styled("Welcome to Comic Crafter", Style::default().bold())),
        Line::from(""),
        Line::from("Enter your Gemini API key to get started."),
        Line::from("It is stored locally in ~/.comic-crafter/credentials.yaml."),
        Line::from(""),
        Line::from(Span::styled("Enter: continue | Esc: quit", Style::default().fg(Color::DarkGray))),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(intro, chunks[0]);

    let masked = "*".repeat(state.credential_input_len);
    let input = render_input(&masked, Field::Credential.as_str(), true, true);
    f.render_widget(input, chunks[1]);

    let masked_cursor = state.cursor_position.min(masked.len());
    f.set_cursor_position(cursor_in(chunks[1], &masked, masked_cursor));
}

fn draw_ideation_step(f: &mut Frame, state: &RenderState, view: &IdeationView, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // Story idea
            Constraint::Length(3), // Brainstorm
            Constraint::Length(3), // Art style
            Constraint::Length(3), // Custom style
            Constraint::Length(5), // Characters
        ])
        .split(area);

    let editing = state.input_mode == InputMode::Editing;
    let busy = if view.is_generating {
        " [writing storyboard...]"
    } else if view.is_suggesting {
        " [brainstorming...]"
    } else {
        ""
    };

    let fields = [
        (Field::StoryIdea, view.story_idea.as_str(), chunks[0]),
        (Field::CustomStyle, view.custom_style.as_str(), chunks[3]),
        (Field::Characters, view.characters.as_str(), chunks[4]),
    ];
    for (field, content, rect) in fields {
        let focused = state.active_field == field;
        let title = if field == Field::StoryIdea {
            format!("{}{}", field.as_str(), busy)
        } else {
            field.as_str().to_string()
        };
        let mut input = render_input(content, &title, focused, editing);
        if field == Field::CustomStyle && view.art_style != ArtStyle::Custom {
            input = input.style(Style::default().fg(Color::DarkGray));
        }
        f.render_widget(input, rect);
        if focused && editing {
            f.set_cursor_position(cursor_in(rect, content, state.cursor_position));
        }
    }

    let kinds: Vec<Span> = SuggestionKind::ALL
        .iter()
        .map(|kind| {
            let style = if *kind == view.suggestion_kind {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Gray)
            };
            Span::styled(format!(" {} ", kind.as_str()), style)
        })
        .collect();
    let brainstorm = Paragraph::new(Line::from(kinds)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Brainstorm (←/→ choose, i: suggest) "),
    );
    f.render_widget(brainstorm, chunks[1]);

    let mut style_spans = Vec::new();
    let mut style = ArtStyle::ClassicComic;
    loop {
        let s = if style == view.art_style {
            Style::default().fg(Color::Black).bg(Color::Magenta)
        } else {
            Style::default().fg(Color::Gray)
        };
        style_spans.push(Span::styled(format!(" {} ", style.as_str()), s));
        style = style.next();
        if style == ArtStyle::ClassicComic {
            break;
        }
    }
    let styles = Paragraph::new(Line::from(style_spans))
        .block(Block::default().borders(Borders::ALL).title(" Art Style (a: cycle) "));
    f.render_widget(styles, chunks[2]);
}

fn draw_review_step(f: &mut Frame, state: &RenderState, review: &ReviewView, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(0)])
        .split(area);

    let items: Vec<ListItem> = review
        .slots
        .iter()
        .map(|slot| {
            let (marker, color) = preview_marker(&slot.preview);
            let selected = slot.id == review.selected;
            let label_style = if selected {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", marker), Style::default().fg(color)),
                Span::styled(slot.label.clone(), label_style),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", review.title)),
    );
    f.render_widget(list, columns[0]);

    let Some(slot) = review.slots.iter().find(|s| s.id == review.selected) else {
        return;
    };
    let detail = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Prompt
            Constraint::Length(5), // Caption
            Constraint::Length(3), // Preview
        ])
        .split(columns[1]);

    let editing = state.input_mode == InputMode::Editing;
    let caption = slot.description.as_deref().unwrap_or("(covers have no caption)");
    let fields = [
        (Field::Title, review.title.as_str(), detail[0]),
        (Field::Prompt, slot.prompt.as_str(), detail[1]),
        (Field::Description, caption, detail[2]),
    ];
    for (field, content, rect) in fields {
        let focused = state.active_field == field;
        f.render_widget(render_input(content, field.as_str(), focused, editing), rect);
        if focused && editing {
            f.set_cursor_position(cursor_in(rect, content, state.cursor_position));
        }
    }

    let preview = match &slot.preview {
        PreviewStatus::Empty => Line::from("No sketch yet. Press r to request one."),
        PreviewStatus::Loading => Line::from(Span::styled("Sketching...", Style::default().fg(Color::Yellow))),
        PreviewStatus::Ready { bytes } => Line::from(Span::styled(
            format!("Sketch ready ({})", payload_size(*bytes)),
            Style::default().fg(Color::Green),
        )),
        PreviewStatus::Failed(error) => Line::from(Span::styled(
            format!("Sketch failed: {}", error),
            Style::default().fg(Color::Red),
        )),
    };
    let preview = Paragraph::new(preview)
        .block(Block::default().borders(Borders::ALL).title(" Preview "));
    f.render_widget(preview, detail[3]);
}

fn draw_generation_step(f: &mut Frame, view: &GenerationView, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status
            Constraint::Min(10),   // Slots
            Constraint::Length(5), // Caption
            Constraint::Length(3), // Export
        ])
        .split(area);

    let done = view.images.len();
    let ratio = done as f64 / view.total_slots.max(1) as f64;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", view.title)))
        .gauge_style(Style::default().fg(if view.is_generating { Color::Yellow } else { Color::Green }))
        .ratio(ratio.min(1.0))
        .label(view.status.clone());
    f.render_widget(gauge, chunks[0]);

    let rows: Vec<Row> = view
        .images
        .iter()
        .map(|img| {
            let selected = img.id == view.selected;
            let (state, color) = if view.regenerating == Some(img.id) {
                (String::from("regenerating..."), Color::Yellow)
            } else if img.ready {
                (payload_size(img.bytes), Color::Green)
            } else {
                (
                    img.error.clone().unwrap_or_else(|| String::from("failed")),
                    Color::Red,
                )
            };
            let style = if selected {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(if selected { ">" } else { " " }),
                Cell::from(img.label.clone()).style(style),
                Cell::from(state).style(Style::default().fg(color)),
                Cell::from(img.prompt.clone()).style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();
    let pending = view.total_slots.saturating_sub(done);
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Length(20),
            Constraint::Length(24),
            Constraint::Min(10),
        ],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(field_style(true, false))
            .title(format!(" Images ({} pending) ", pending)),
    );
    f.render_widget(table, chunks[1]);

    let selected = view.images.iter().find(|img| img.id == view.selected);
    let caption = match selected {
        Some(img) => match img.description.as_deref() {
            Some(text) if !text.trim().is_empty() => Line::from(text.to_string()),
            Some(_) => Line::from(Span::styled("(no caption)", Style::default().fg(Color::DarkGray))),
            None => Line::from(Span::styled("(covers have no caption)", Style::default().fg(Color::DarkGray))),
        },
        None => Line::from(""),
    };
    let caption_title = selected
        .map(|img| format!(" Caption: {} ", img.label))
        .unwrap_or_else(|| String::from(" Caption "));
    let caption = Paragraph::new(caption)
        .block(Block::default().borders(Borders::ALL).title(caption_title))
        .wrap(Wrap { trim: false });
    f.render_widget(caption, chunks[2]);

    let export_line = if view.is_exporting {
        Line::from(Span::styled("Exporting...", Style::default().fg(Color::Yellow)))
    } else if view.can_export {
        Line::from(format!(
            "Quality: {} (t) | p: PDF | i: PNG | s: save image | r: regenerate | n: start over",
            view.quality.as_str()
        ))
    } else {
        Line::from(Span::styled(
            format!("Export is available once all {} images are ready", SLOT_COUNT),
            Style::default().fg(Color::DarkGray),
        ))
    };
    let export = Paragraph::new(export_line)
        .block(Block::default().borders(Borders::ALL).title(" Download "));
    f.render_widget(export, chunks[3]);
}

fn draw_status_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let status = if state.input_mode == InputMode::Editing {
        " ESC/Enter:stop editing | arrows:move | Tab:next field "
    } else {
        match state.step {
            Step::CredentialEntry => " Enter:continue | Esc:quit | F1:help ",
            Step::Ideation => " Tab:field | e:edit | a:style | i:suggest | g:storyboard | ?:help | q:quit ",
            Step::StoryboardReview => " ↑/↓:slot | Tab:field | e:edit | r:sketch | c:confirm | b:back | ?:help ",
            Step::Generation => " ↑/↓:slot | r:regenerate | t:quality | p/i:export | n:new | ?:help ",
        }
    };

    let bar = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    f.render_widget(bar, area);
}

fn draw_notice(f: &mut Frame, notice: &Notice, area: Rect) {
    let popup_area = centered_rect(60, 20, area);
    let color = notice_color(notice.kind);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" {} (Esc to dismiss) ", notice.at.format("%H:%M:%S")))
        .style(Style::default().bg(Color::Black));

    let text = Paragraph::new(notice.message.as_str())
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(text, popup_area);
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 80, area);

    let help_text = r#"
 COMIC CRAFTER - Keyboard Shortcuts

 IDEATION
   Tab                Next field
   e / Enter          Edit field
   a                  Cycle art style
   ← / →              Choose brainstorm kind
   i                  Brainstorm an addition
   g                  Generate storyboard

 STORYBOARD
   ↑ / ↓              Select cover or panel
   Tab                Prompt / caption / title
   e / Enter          Edit field
   r                  Refresh sketch preview
   c                  Confirm and generate
   b / Esc            Back to ideation

 GENERATION
   ↑ / ↓              Select image
   r                  Regenerate selected image
   t                  Toggle export quality
   p / i              Export PDF / PNG
   s                  Save selected image
   n                  Start over

 GENERAL
   Ctrl+K             Change API key
   ? / F1             Toggle this help
   q / Ctrl+C         Quit

 Press any key to close...
"#;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let help = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}
