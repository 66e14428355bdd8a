//! Terminal UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use spanlight_core::{highlight_name, Chip, LabelOption};

use crate::app::{App, Focus, Mode};

// Catppuccin Mocha colors
const BASE: Color = Color::Rgb(30, 30, 46);
const SURFACE0: Color = Color::Rgb(49, 50, 68);
const SURFACE1: Color = Color::Rgb(69, 71, 90);
const TEXT: Color = Color::Rgb(205, 214, 244);
const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
const RED: Color = Color::Rgb(243, 139, 168);
const PEACH: Color = Color::Rgb(250, 179, 135);
const YELLOW: Color = Color::Rgb(249, 226, 175);
const GREEN: Color = Color::Rgb(166, 227, 161);
const BLUE: Color = Color::Rgb(137, 180, 250);
const MAUVE: Color = Color::Rgb(203, 166, 247);
const TEAL: Color = Color::Rgb(148, 226, 213);

const LABEL_PALETTE: [Color; 7] = [BLUE, GREEN, PEACH, MAUVE, TEAL, RED, YELLOW];

const SIDEBAR_WIDTH: u16 = 32;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);
    draw_main_area(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    match app.mode {
        Mode::Search => draw_search_dialog(frame, app),
        Mode::Help => draw_help(frame),
        _ => {}
    }
}

fn draw_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let span_count = app.spans().len();
    let current = if span_count > 0 { app.chip_selected + 1 } else { 0 };
    let label = app.active_label().map(|l| l.text.as_str()).unwrap_or("-");

    let title_text = format!(
        " Spanlight - {} [{}/{}] label: {}",
        app.title(),
        current,
        span_count,
        label
    );

    let title_bar = Paragraph::new(title_text).style(Style::default().fg(TEXT).bg(SURFACE0));

    frame.render_widget(title_bar, area);
}

fn draw_main_area(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),                // Editor
            Constraint::Length(SIDEBAR_WIDTH), // Sidebar
        ])
        .split(area);

    draw_editor(frame, app, chunks[0]);
    draw_sidebar(frame, app, chunks[1]);
}

/// Color of a label: its configured color, else a palette slot
fn label_color(labels: &[LabelOption], index: usize) -> Color {
    labels
        .get(index)
        .and_then(|l| l.color.as_deref())
        .and_then(|c| c.parse::<Color>().ok())
        .unwrap_or(LABEL_PALETTE[index % LABEL_PALETTE.len()])
}

fn entity_color(app: &App, entity_id: &str) -> Color {
    app.label_index(entity_id)
        .map(|i| label_color(&app.labels, i))
        .unwrap_or(SUBTEXT0)
}

/// Style for text covered by the highlight `name`, if it belongs to a label
fn highlight_style(app: &App, name: &str) -> Option<Style> {
    app.labels.iter().enumerate().find_map(|(i, label)| {
        let color = label_color(&app.labels, i);
        if name == highlight_name(&label.id, false) {
            Some(Style::default().fg(color).add_modifier(Modifier::UNDERLINED))
        } else if name == highlight_name(&label.id, true) {
            Some(Style::default().fg(BASE).bg(color).add_modifier(Modifier::BOLD))
        } else {
            None
        }
    })
}

fn draw_editor(frame: &mut Frame, app: &mut App, area: Rect) {
    let editor_style = if app.focus == Focus::Editor {
        Style::default().fg(BLUE)
    } else {
        Style::default().fg(SUBTEXT0)
    };

    let mode_indicator = match app.mode {
        Mode::Visual => " [VISUAL]",
        _ => "",
    };
    let annotatable = if app.annotatable { "" } else { " (read only)" };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(editor_style)
        .title(format!("Editor{}{}", mode_indicator, annotatable));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Layout follows the visible area before anything is drawn
    app.resize(inner.width, inner.height);

    let surface = app.surface();
    let line_height = surface.line_height();
    let scroll = surface.scroll();
    let selection = surface.current_selection().map(|s| s.range());
    let search = surface.search_ranges();
    let cursor = app.cursor.offset();

    for (index, line) in surface.visual_lines().iter().enumerate() {
        let row = index * line_height;
        if row < scroll {
            continue;
        }
        let row = row - scroll;
        if row >= usize::from(inner.height) {
            break;
        }

        let spans: Vec<Span> = line
            .iter()
            .map(|&offset| {
                let mut style = Style::default().fg(TEXT);

                for name in surface.highlights_at(offset) {
                    if let Some(highlight) = highlight_style(app, name) {
                        style = style.patch(highlight);
                    }
                }
                if search.iter().any(|r| r.contains(offset)) {
                    style = style.bg(YELLOW).fg(BASE);
                }
                if selection.as_ref().is_some_and(|r| r.contains(offset)) {
                    style = style.bg(SURFACE1).add_modifier(Modifier::BOLD);
                }
                if offset == cursor && app.focus == Focus::Editor {
                    style = style.add_modifier(Modifier::REVERSED);
                }

                Span::styled(surface.char_at(offset).unwrap_or(' ').to_string(), style)
            })
            .collect();

        let line_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        frame.render_widget(Paragraph::new(Line::from(spans)), line_area);
    }

    for chip in surface.chips() {
        draw_chip(frame, app, inner, chip);
    }
}

/// Chips are drawn at their engine bounds, in cells from the editor origin
fn draw_chip(frame: &mut Frame, app: &App, inner: Rect, chip: &Chip) {
    let (left, top, width) = (chip.bounds.left, chip.bounds.top, chip.bounds.width);
    if left < 0.0 || top < 0.0 || width < 1.0 {
        return;
    }
    let (left, top) = (left as u16, top as u16);
    if left >= inner.width || top >= inner.height {
        return;
    }
    let width = (width as u16).min(inner.width - left);

    let color = entity_color(app, &chip.entity.id);
    let style = if chip.hovered {
        Style::default().fg(BASE).bg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color).bg(SURFACE0)
    };
    let text = format!("{:─<width$}", chip.entity.text, width = usize::from(width));

    frame
        .buffer_mut()
        .set_stringn(inner.x + left, inner.y + top, text, usize::from(width), style);
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(app.labels.len() as u16 + 2), // Labels
            Constraint::Min(0),                              // Spans
        ])
        .split(area);

    draw_labels(frame, app, chunks[0]);
    draw_span_list(frame, app, chunks[1]);
}

fn draw_labels(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(SUBTEXT0))
        .title("Labels (1-9)");

    let items: Vec<ListItem> = app
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let active = i == app.active_label;
            let marker = if active { ">" } else { " " };
            let style = Style::default().fg(label_color(&app.labels, i));
            let style = if active { style.bg(SURFACE1) } else { style };
            ListItem::new(format!("{} {} {}", marker, i + 1, label.text)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_span_list(frame: &mut Frame, app: &App, area: Rect) {
    let sidebar_style = if app.focus == Focus::Chips {
        Style::default().fg(BLUE)
    } else {
        Style::default().fg(SUBTEXT0)
    };

    let spans = app.spans();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(sidebar_style)
        .title(format!("Spans ({})", spans.len()));

    let items: Vec<ListItem> = spans
        .iter()
        .enumerate()
        .map(|(i, stored)| {
            let selected = i == app.chip_selected && app.focus == Focus::Chips;
            let marker = if selected { ">" } else { " " };
            let preview: String = stored.span.text.chars().take(18).collect::<String>().replace('\n', " ");

            let line1 = format!("{} {} L{}", marker, stored.span.entity.text, stored.overlap.level);
            let line2 = format!("   \"{}\" {}-{}", preview, stored.span.from, stored.span.to);

            let color = entity_color(app, &stored.span.entity.id);
            let style = if selected {
                Style::default().fg(color).bg(SURFACE1)
            } else {
                Style::default().fg(color)
            };

            ListItem::new(vec![
                Line::from(Span::styled(line1, style)),
                Line::from(Span::styled(line2, style.fg(SUBTEXT0))),
            ])
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode_str = match app.mode {
        Mode::Normal => "NORMAL",
        Mode::Visual => "VISUAL",
        Mode::Search => "SEARCH",
        Mode::Help => "HELP",
    };

    let status = app.status_message.as_deref().unwrap_or("");

    let help_hint = "v select | 1-9 label | Tab spans | / search | e export | ? help";

    let status_text = format!(" {} | {}", mode_str, if status.is_empty() { help_hint } else { status },);

    let status_bar = Paragraph::new(status_text).style(Style::default().fg(SUBTEXT0).bg(SURFACE0));

    frame.render_widget(status_bar, area);
}

fn draw_search_dialog(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 3, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GREEN))
        .title("Search words (separate with space , ; |)");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = Paragraph::new(format!("{}_", app.input_buffer)).style(Style::default().fg(TEXT));
    frame.render_widget(input, inner);
}

fn draw_help(frame: &mut Frame) {
    let area = centered_rect(60, 22, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title("Help (press any key to close)");

    let heading = Style::default().fg(MAUVE).add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(Span::styled("Navigation", heading)),
        Line::from("  h/j/k/l  Move cursor"),
        Line::from("  w/b      Next/prev word"),
        Line::from("  g/G      Go to top/bottom"),
        Line::from("  Tab      Toggle editor/span list"),
        Line::from(""),
        Line::from(Span::styled("Spans", heading)),
        Line::from("  v        Start selection"),
        Line::from("  a/Enter  Add span with the active label"),
        Line::from("  1-9      Choose active label"),
        Line::from("  d        Delete span"),
        Line::from("  r        Relabel span with the active label"),
        Line::from("  D        Duplicate span with the active label"),
        Line::from(""),
        Line::from(Span::styled("Search & File", heading)),
        Line::from("  /        Highlight words"),
        Line::from("  Esc      Clear search"),
        Line::from("  e        Export answers as JSON"),
        Line::from(""),
        Line::from(Span::styled("Press any key to close", Style::default().fg(SUBTEXT0))),
    ];

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
