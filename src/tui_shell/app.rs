use std::io::{self, IsTerminal};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::model::{FieldEdit, TestCase};
use crate::sync::SyncEngine;

use super::input::Input;
use super::render;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Column {
    Name,
    Description,
    Estimate,
    Module,
    Priority,
    Status,
}

impl Column {
    pub(super) const ALL: [Column; 6] = [
        Column::Name,
        Column::Description,
        Column::Estimate,
        Column::Module,
        Column::Priority,
        Column::Status,
    ];

    pub(super) fn title(self) -> &'static str {
        match self {
            Column::Name => "Test Case Name",
            Column::Description => "Description",
            Column::Estimate => "Estimate Time",
            Column::Module => "Module",
            Column::Priority => "Priority",
            Column::Status => "Status",
        }
    }

    fn next(self) -> Column {
        let i = Column::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Column::ALL[(i + 1) % Column::ALL.len()]
    }

    fn prev(self) -> Column {
        let i = Column::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Column::ALL[(i + Column::ALL.len() - 1) % Column::ALL.len()]
    }
}

pub(super) struct App {
    pub(super) engine: SyncEngine,
    pub(super) rows: Vec<TestCase>,
    pub(super) selected_row: usize,
    pub(super) selected_col: Column,
    pub(super) editing: Option<Input>,
    pub(super) status_line: Option<String>,
    quit_pending: bool,
    pub(super) quit: bool,
}

impl App {
    fn new(engine: SyncEngine, fetch_err: Option<String>) -> Self {
        let rows = engine.cases();
        let status_line = match &fetch_err {
            Some(err) => Some(format!("fetch failed: {}", err)),
            None if rows.is_empty() => Some("no test cases on the store".to_string()),
            None => None,
        };
        Self {
            engine,
            rows,
            selected_row: 0,
            selected_col: Column::Name,
            editing: None,
            status_line,
            quit_pending: false,
            quit: false,
        }
    }

    fn selected_case(&self) -> Option<&TestCase> {
        self.rows.get(self.selected_row)
    }

    pub(super) fn cell_text(case: &TestCase, col: Column) -> String {
        match col {
            Column::Name => case.test_case_name.clone(),
            Column::Description => case.description.clone(),
            Column::Estimate => fmt_estimate(case.estimate_time),
            Column::Module => case.module.clone(),
            Column::Priority => case.priority.clone(),
            Column::Status => case.status.label().to_string(),
        }
    }

    fn refresh_rows(&mut self) {
        self.rows = self.engine.cases();
        if self.selected_row >= self.rows.len() && !self.rows.is_empty() {
            self.selected_row = self.rows.len() - 1;
        }
    }

    fn apply(&mut self, edit: FieldEdit) {
        let Some(case) = self.selected_case() else {
            return;
        };
        let id = case.id.clone();
        match self.engine.apply_edit(&id, edit) {
            Ok(_) => {
                self.status_line = None;
            }
            Err(err) => {
                // Defensive: ids come from the buffer itself.
                tracing::warn!(id = %id, error = %format!("{:#}", err), "edit dropped");
                self.status_line = Some(format!("edit dropped: {:#}", err));
            }
        }
    }

    fn begin_edit(&mut self) {
        let Some(case) = self.selected_case() else {
            return;
        };
        if self.selected_col == Column::Status {
            let next = case.status.cycled();
            self.apply(FieldEdit::Status(next));
            return;
        }
        let mut input = Input::default();
        input.set(Self::cell_text(case, self.selected_col));
        self.editing = Some(input);
    }

    fn commit_edit(&mut self) {
        let Some(input) = self.editing.take() else {
            return;
        };
        let value = input.buf;
        let edit = match self.selected_col {
            Column::Name => FieldEdit::TestCaseName(value),
            Column::Description => FieldEdit::Description(value),
            Column::Module => FieldEdit::Module(value),
            Column::Priority => FieldEdit::Priority(value),
            Column::Estimate => match value.trim().parse::<f64>() {
                Ok(n) => FieldEdit::EstimateTime(n),
                Err(_) => {
                    self.status_line = Some(format!("not a number: {:?}", value.trim()));
                    let mut input = Input::default();
                    input.set(value);
                    self.editing = Some(input);
                    return;
                }
            },
            // Status never enters text-edit mode.
            Column::Status => return,
        };
        self.apply(edit);
    }
}

pub(super) fn run(engine: SyncEngine, fetch_err: Option<String>) -> Result<()> {
    if !io::stdout().is_terminal() {
        anyhow::bail!("caseboard requires a terminal (stdout is not a tty)");
    }

    let mut stdout = io::stdout();
    enable_raw_mode().context("enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut app = App::new(engine, fetch_err);
    let res = run_loop(&mut terminal, &mut app);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Pick up write-state transitions from the background flush loop.
        app.refresh_rows();

        terminal.draw(|f| render::draw(f, app)).context("draw")?;
        if app.quit {
            return Ok(());
        }

        if event::poll(Duration::from_millis(50)).context("poll")? {
            match event::read().context("read event")? {
                Event::Key(k) if k.kind == KeyEventKind::Press => handle_key(app, k),
                _ => {}
            }
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if app.editing.is_some() {
        handle_edit_key(app, key);
        return;
    }
    app.quit_pending &= matches!(key.code, KeyCode::Char('q') | KeyCode::Esc);

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            if app.engine.has_unsaved() && !app.quit_pending {
                app.quit_pending = true;
                app.status_line = Some(format!(
                    "{} row(s) not yet saved; press q again to quit anyway",
                    app.engine.pending_ids().len()
                ));
            } else {
                app.quit = true;
            }
        }

        KeyCode::Up => {
            app.selected_row = app.selected_row.saturating_sub(1);
        }
        KeyCode::Down => {
            if app.selected_row + 1 < app.rows.len() {
                app.selected_row += 1;
            }
        }
        KeyCode::Left | KeyCode::BackTab => {
            app.selected_col = app.selected_col.prev();
        }
        KeyCode::Right | KeyCode::Tab => {
            app.selected_col = app.selected_col.next();
        }

        KeyCode::Enter => app.begin_edit(),
        KeyCode::Char(' ') if app.selected_col == Column::Status => app.begin_edit(),

        _ => {}
    }
}

fn handle_edit_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.editing = None;
        }
        KeyCode::Enter => app.commit_edit(),
        _ => {
            let Some(input) = app.editing.as_mut() else {
                return;
            };
            match key.code {
                KeyCode::Char(c) => input.insert_char(c),
                KeyCode::Backspace => input.backspace(),
                KeyCode::Delete => input.delete(),
                KeyCode::Left => input.move_left(),
                KeyCode::Right => input.move_right(),
                KeyCode::Home => input.move_home(),
                KeyCode::End => input.move_end(),
                _ => {}
            }
        }
    }
}

pub(super) fn fmt_estimate(minutes: f64) -> String {
    if minutes.fract() == 0.0 {
        format!("{}", minutes as i64)
    } else {
        format!("{}", minutes)
    }
}
