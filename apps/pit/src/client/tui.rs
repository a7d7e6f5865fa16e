//! Ratatui rendering of the grid, master controls, and log panel.
//!
//! Pure consumers of [`GridClient`] state; nothing in here mutates
//! anything or talks to the floor.

use pit_proto::fields;
use pit_proto::Toggle;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::view::{self, DisplayValue};

use super::GridClient;

const CELL_WIDTH: usize = 12;
const SYMBOL_WIDTH: usize = 8;

pub fn render(frame: &mut Frame<'_>, app: &GridClient) {
    let grid_height = app.state.prefs.symbols().len() as u16 + 1;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(grid_height),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(frame.area());

    frame.render_widget(header(app), chunks[0]);
    frame.render_widget(grid(app), chunks[1]);
    frame.render_widget(peer_line(app), chunks[2]);
    frame.render_widget(help_line(), chunks[3]);
    frame.render_widget(log_panel(app, chunks[4]), chunks[4]);
}

fn header(app: &GridClient) -> Paragraph<'static> {
    let status = if app.state.connected {
        Span::styled("connected", Style::default().fg(Color::Green))
    } else {
        Span::styled(
            "disconnected",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    };
    let title = Line::from(vec![
        Span::styled("pit", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" · {} · ", app.state.me)),
        status,
    ]);
    let masters = Line::from(vec![
        Span::raw("master maker "),
        master_span(app.state.master.maker),
        Span::raw("  master taker "),
        master_span(app.state.master.taker),
    ]);
    Paragraph::new(vec![title, masters])
}

fn master_span(flag: Toggle) -> Span<'static> {
    let style = if flag.is_on() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    };
    Span::styled(format!("[{flag}]"), style)
}

fn grid(app: &GridClient) -> Paragraph<'static> {
    let columns = app.state.prefs.columns().to_vec();
    let mut lines = Vec::with_capacity(app.state.prefs.symbols().len() + 1);

    let mut heading = vec![Span::raw(pad("", SYMBOL_WIDTH))];
    for id in &columns {
        let label: &str = match fields::column(id) {
            Some(col) => col.label,
            None => id,
        };
        let style = if *id == app.state.selection.column {
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        heading.push(Span::styled(pad(label, CELL_WIDTH), style));
    }
    lines.push(Line::from(heading));

    for symbol in app.state.prefs.symbols() {
        let mut spans = vec![Span::styled(
            pad(symbol, SYMBOL_WIDTH),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for id in &columns {
            spans.push(cell_span(app, symbol, id));
        }
        lines.push(Line::from(spans));
    }
    Paragraph::new(lines)
}

fn cell_span(app: &GridClient, symbol: &str, column_id: &str) -> Span<'static> {
    let Some(column) = fields::column(column_id) else {
        return Span::raw(pad("", CELL_WIDTH));
    };
    let rendered = view::render_cell(&app.state, symbol, column);
    let selected =
        *symbol == app.state.selection.symbol && column.id == app.state.selection.column;

    let mut text = if selected && app.state.selection.focused {
        format!("{}_", app.edit_buffer)
    } else {
        match &rendered.value {
            DisplayValue::Empty => String::new(),
            DisplayValue::Value(value) => value.to_string(),
        }
    };
    // Flag cells carrying other users' overrides; the side list for the
    // selected cell is spelled out underneath the grid.
    if !rendered.peer_overrides.is_empty() {
        text.push('*');
    }

    let mut style = if rendered.interactive {
        Style::default()
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    if selected {
        style = Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
    }
    Span::styled(pad(&text, CELL_WIDTH), style)
}

/// Other users' overrides on the selected cell, spelled out read-only.
fn peer_line(app: &GridClient) -> Paragraph<'static> {
    let text = fields::column(&app.state.selection.column)
        .map(|column| {
            let rendered = view::render_cell(&app.state, &app.state.selection.symbol, column);
            if rendered.peer_overrides.is_empty() {
                String::new()
            } else {
                let listed: Vec<String> = rendered
                    .peer_overrides
                    .iter()
                    .map(|peer| format!("{}={}", peer.user_id, peer.value))
                    .collect();
                format!("overrides: {}", listed.join("  "))
            }
        })
        .unwrap_or_default();
    Paragraph::new(text).style(Style::default().fg(Color::Yellow))
}

fn help_line() -> Paragraph<'static> {
    Paragraph::new(
        "arrows/tab move · enter/space edit or toggle · m/t masters · \
         ctrl+arrows reorder · s/f/o log filters · q quit",
    )
    .style(Style::default().add_modifier(Modifier::DIM))
}

fn log_panel(app: &GridClient, area: Rect) -> Paragraph<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    if let Some(error) = app.logs.error() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    } else {
        let mut filters = Vec::new();
        if let Some(symbol) = app.logs.symbol_filter() {
            filters.push(format!("symbol={symbol}"));
        }
        if let Some(field) = app.logs.field_filter() {
            filters.push(format!("field={field}"));
        }
        if app.logs.hides_overrides() {
            filters.push("overrides hidden".to_string());
        }
        let banner = if filters.is_empty() {
            "value log".to_string()
        } else {
            format!("value log · {}", filters.join(" · "))
        };
        lines.push(Line::from(Span::styled(
            banner,
            Style::default().add_modifier(Modifier::UNDERLINED),
        )));

        let mut last_timestamp: Option<&str> = None;
        for entry in app.logs.entries() {
            if last_timestamp != Some(entry.timestamp.as_str()) {
                lines.push(Line::from(Span::styled(
                    entry.timestamp.clone(),
                    Style::default().add_modifier(Modifier::DIM),
                )));
                last_timestamp = Some(entry.timestamp.as_str());
            }
            let mut text = format!("  {} {} {}", entry.symbol, entry.field, entry.value);
            if entry.is_override {
                let who = entry.user_id.as_deref().unwrap_or("?");
                text.push_str(&format!(" ({who})"));
            }
            let style = if entry.is_override {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(text, style)));
        }
    }

    // Keep the newest rows in view when the panel is shorter than the log.
    let height = area.height.max(1) as usize;
    if lines.len() > height {
        lines.drain(..lines.len() - height);
    }
    Paragraph::new(lines)
}

fn pad(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    while out.len() < width {
        out.push(' ');
    }
    out
}
