use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::sync::WriteState;

use super::app::{App, Column};

pub(super) fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_table(f, app, chunks[0]);

    let status = app.status_line.as_deref().unwrap_or("");
    f.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Yellow)),
        chunks[1],
    );

    let help = if app.editing.is_some() {
        "Enter save field   Esc cancel"
    } else {
        "arrows/Tab move   Enter edit   Space cycle status   q quit"
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn draw_table(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(Column::ALL.iter().map(|c| Cell::from(c.title())))
            .chain([Cell::from("Last Updated")]),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = app.rows.iter().enumerate().map(|(i, case)| {
        let marker = match app.engine.write_state(&case.id) {
            Some(WriteState::Scheduled) => Span::styled("·", Style::default().fg(Color::Yellow)),
            Some(WriteState::Saving) => Span::styled("…", Style::default().fg(Color::Cyan)),
            Some(WriteState::Failed) => {
                Span::styled("!", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            }
            None => Span::raw(" "),
        };

        let mut cells = vec![Cell::from(marker)];
        for col in Column::ALL {
            cells.push(cell_for(app, i, case, col));
        }
        cells.push(Cell::from(Span::styled(
            case.last_updated.clone(),
            Style::default().fg(Color::DarkGray),
        )));
        Row::new(cells)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(20),
            Constraint::Min(20),
            Constraint::Length(13),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(20),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" Test Cases "));

    f.render_widget(table, area);
}

fn cell_for(app: &App, row: usize, case: &crate::model::TestCase, col: Column) -> Cell<'static> {
    let selected = row == app.selected_row && col == app.selected_col;

    if selected && let Some(input) = &app.editing {
        return Cell::from(editing_line(input));
    }

    let text = App::cell_text(case, col);
    if selected {
        Cell::from(text).style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Cell::from(text)
    }
}

/// Render the edit buffer with a block cursor.
fn editing_line(input: &super::input::Input) -> Line<'static> {
    let (before, after) = input.buf.split_at(input.cursor);
    let mut chars = after.chars();
    let at_cursor = chars.next();
    let rest: String = chars.collect();

    let cursor_span = match at_cursor {
        Some(c) => Span::styled(
            c.to_string(),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        None => Span::styled(" ", Style::default().bg(Color::Cyan)),
    };

    Line::from(vec![
        Span::styled(before.to_string(), Style::default().fg(Color::Cyan)),
        cursor_span,
        Span::styled(rest, Style::default().fg(Color::Cyan)),
    ])
}
