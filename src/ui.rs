//! TUI module using ratatui.
//!
//! The pipeline runs on a background task and reports progress over a
//! channel; the UI thread owns all state and redraws on every event or
//! 100 ms tick.

use crate::pipeline::{Delivery, Outcome, Pipeline, ProgressEvent};
use crate::report::format_elapsed;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

const TICK: Duration = Duration::from_millis(100);

/// Messages from the analysis task to the UI
#[derive(Debug)]
pub enum WorkerEvent {
    Progress(ProgressEvent),
    Finished(Result<Completed, String>),
}

#[derive(Debug)]
pub struct Completed {
    pub outcome: Outcome,
    pub path: PathBuf,
}

/// What the event loop should do after a key press
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Run(String),
    EditInput,
    OpenReport(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Busy,
    Success,
    Warning,
    Error,
}

/// TUI application state
#[derive(Debug)]
pub struct App {
    input: String,
    status: String,
    status_kind: StatusKind,
    progress: f64,
    started: Option<Instant>,
    total_time: Option<Duration>,
    report: Option<(String, PathBuf)>,
    report_scroll: u16,
    running: bool,
}

impl Default for App {
    fn default() -> Self {
        Self {
            input: String::new(),
            status: "Ready to analyze".to_string(),
            status_kind: StatusKind::Info,
            progress: 0.0,
            started: None,
            total_time: None,
            report: None,
            report_scroll: 0,
            running: false,
        }
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> (&str, StatusKind) {
        (&self.status, self.status_kind)
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.status_kind = kind;
        self.status = message.into();
    }

    /// Elapsed-time label: live while running, final once done
    pub fn elapsed_label(&self) -> String {
        match (self.total_time, self.started) {
            (Some(total), _) => format!("Total time: {}", format_elapsed(total)),
            (None, Some(started)) => format!("Elapsed: {}", format_elapsed(started.elapsed())),
            (None, None) => format!("Elapsed: {}", format_elapsed(Duration::ZERO)),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => Action::Quit,
            KeyCode::Char('r') if ctrl => self.start(),
            KeyCode::Char('e') if ctrl && !self.running => Action::EditInput,
            KeyCode::Char('o') if ctrl => match &self.report {
                Some((_, path)) => Action::OpenReport(path.clone()),
                None => Action::None,
            },
            KeyCode::Char('l') if ctrl && !self.running => {
                self.input.clear();
                Action::None
            }
            KeyCode::Up => {
                self.report_scroll = self.report_scroll.saturating_sub(1);
                Action::None
            }
            KeyCode::Down => {
                self.report_scroll = self.report_scroll.saturating_add(1);
                Action::None
            }
            KeyCode::PageUp => {
                self.report_scroll = self.report_scroll.saturating_sub(10);
                Action::None
            }
            KeyCode::PageDown => {
                self.report_scroll = self.report_scroll.saturating_add(10);
                Action::None
            }
            _ if self.running => Action::None,
            KeyCode::Enter => {
                self.input.push('\n');
                Action::None
            }
            KeyCode::Backspace => {
                self.input.pop();
                Action::None
            }
            KeyCode::Char(c) if !ctrl => {
                self.input.push(c);
                Action::None
            }
            _ => Action::None,
        }
    }

    pub fn handle_paste(&mut self, text: &str) {
        if !self.running {
            self.input.push_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
        }
    }

    pub fn replace_input(&mut self, text: String) {
        self.input = text;
    }

    /// Validate input and switch to the running state
    fn start(&mut self) -> Action {
        if self.running {
            return Action::None;
        }
        let article = self.input.trim();
        if article.is_empty() {
            self.set_status(StatusKind::Warning, "Please paste an article first.");
            return Action::None;
        }

        let article = article.to_string();
        self.running = true;
        self.progress = 0.0;
        self.started = Some(Instant::now());
        self.total_time = None;
        self.report = None;
        self.report_scroll = 0;
        self.set_status(StatusKind::Busy, "Starting analysis...");
        Action::Run(article)
    }

    pub fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress(progress) => {
                self.progress = progress.ratio();
                self.set_status(StatusKind::Busy, progress.message);
            }
            WorkerEvent::Finished(Ok(done)) => {
                self.running = false;
                self.progress = 1.0;
                self.total_time = self.started.map(|s| s.elapsed());
                let path = done.path.display().to_string();
                match &done.outcome.delivery {
                    Delivery::Sent => self.set_status(
                        StatusKind::Success,
                        format!("Report sent by email and saved to {path} (Ctrl+O to open)"),
                    ),
                    Delivery::Skipped => self.set_status(
                        StatusKind::Success,
                        format!("Report saved to {path} (Ctrl+O to open)"),
                    ),
                    Delivery::Failed(e) => self.set_status(
                        StatusKind::Warning,
                        format!("Report saved to {path} (Ctrl+O to open), but email failed: {e}"),
                    ),
                }
                if let Some(e) = &done.outcome.save_error {
                    self.set_status(
                        StatusKind::Warning,
                        format!("Report saved to {path} (Ctrl+O to open), but {e}"),
                    );
                }
                self.report = Some((done.outcome.report.into_string(), done.path));
            }
            WorkerEvent::Finished(Err(message)) => {
                self.running = false;
                self.progress = 0.0;
                self.started = None;
                self.set_status(
                    StatusKind::Error,
                    format!("Error during analysis or email: {message}"),
                );
            }
        }
    }
}

/// Run the pipeline for `article` on a background task
pub fn spawn_analysis(pipeline: Pipeline, article: String) -> UnboundedReceiver<WorkerEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(analyse(pipeline, article, tx));
    rx
}

async fn analyse(pipeline: Pipeline, article: String, tx: UnboundedSender<WorkerEvent>) {
    let progress_tx = tx.clone();
    let result = pipeline
        .run(&article, move |event| {
            let _ = progress_tx.send(WorkerEvent::Progress(event));
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|outcome| {
            let path = outcome
                .report
                .save_temp()
                .map_err(|e| format!("failed to save report: {e}"))?;
            Ok(Completed { outcome, path })
        });

    if let Err(e) = &result {
        tracing::error!(error = %e, "analysis failed");
    }
    let _ = tx.send(WorkerEvent::Finished(result));
}

/// Launch the TUI and block until the user quits
pub async fn run(pipeline: Pipeline) -> io::Result<()> {
    tokio::task::block_in_place(move || {
        let mut terminal = ratatui::try_init()?;
        execute!(io::stdout(), EnableBracketedPaste)?;
        let result = event_loop(&mut terminal, pipeline);
        let _ = execute!(io::stdout(), DisableBracketedPaste);
        ratatui::restore();
        result
    })
}

fn event_loop(terminal: &mut DefaultTerminal, pipeline: Pipeline) -> io::Result<()> {
    let mut app = App::new();
    let mut worker: Option<UnboundedReceiver<WorkerEvent>> = None;

    loop {
        // Drain pending worker messages
        if let Some(rx) = worker.as_mut() {
            while let Ok(event) = rx.try_recv() {
                app.apply(event);
            }
            if !app.is_running() {
                worker = None;
            }
        }

        terminal.draw(|frame| components::render(frame, &app))?;

        if !event::poll(TICK)? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
            Event::Paste(text) => {
                app.handle_paste(&text);
                Action::None
            }
            _ => Action::None,
        };

        match action {
            Action::None => {}
            Action::Quit => break,
            Action::Run(article) => {
                worker = Some(spawn_analysis(pipeline.clone(), article));
            }
            Action::EditInput => {
                let current = app.input().to_string();
                let edited = suspend(terminal, || edit::edit(&current))?;
                match edited {
                    Ok(text) => app.replace_input(text),
                    Err(e) => app.set_status(StatusKind::Error, format!("Editor failed: {e}")),
                }
            }
            Action::OpenReport(path) => {
                if let Err(e) = suspend(terminal, || edit::edit_file(&path))? {
                    app.set_status(
                        StatusKind::Warning,
                        format!("Couldn't open viewer: {e} (file: {})", path.display()),
                    );
                }
            }
        }
    }

    Ok(())
}

/// Leave the alternate screen while `f` runs (e.g. an external editor)
fn suspend<T>(terminal: &mut DefaultTerminal, f: impl FnOnce() -> T) -> io::Result<T> {
    let _ = execute!(io::stdout(), DisableBracketedPaste);
    ratatui::restore();
    let result = f();
    *terminal = ratatui::try_init()?;
    execute!(io::stdout(), EnableBracketedPaste)?;
    terminal.clear()?;
    Ok(result)
}

pub mod components {
    //! UI components for the TUI

    use super::{App, StatusKind};
    use ratatui::layout::{Alignment, Constraint, Layout, Rect};
    use ratatui::style::{Color, Modifier, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Block, Gauge, Paragraph, Wrap};
    use ratatui::Frame;

    pub fn render(frame: &mut Frame, app: &App) {
        let [header, body, gauge, elapsed, status, help] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(
            Paragraph::new("Article Analyzer")
                .alignment(Alignment::Center)
                .style(Style::default().add_modifier(Modifier::BOLD)),
            header,
        );

        match &app.report {
            Some((report, _)) => {
                let [input_area, report_area] =
                    Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
                        .areas(body);
                render_input(frame, app, input_area);
                frame.render_widget(
                    Paragraph::new(report.as_str())
                        .wrap(Wrap { trim: false })
                        .scroll((app.report_scroll, 0))
                        .block(Block::bordered().title(" Report (↑/↓ to scroll) ")),
                    report_area,
                );
            }
            None => render_input(frame, app, body),
        }

        frame.render_widget(
            Gauge::default()
                .block(Block::bordered().title(" Progress "))
                .gauge_style(Style::default().fg(Color::Blue))
                .ratio(app.progress.clamp(0.0, 1.0)),
            gauge,
        );

        frame.render_widget(
            Paragraph::new(app.elapsed_label())
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray)),
            elapsed,
        );

        let (text, kind) = app.status();
        frame.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .style(status_style(kind)),
            status,
        );

        frame.render_widget(Paragraph::new(help_line(app)), help);
    }

    fn render_input(frame: &mut Frame, app: &App, area: Rect) {
        // Keep the end of the text in view
        let inner_height = area.height.saturating_sub(2) as usize;
        let lines = app.input().lines().count() + usize::from(app.input().ends_with('\n'));
        let scroll = lines.saturating_sub(inner_height) as u16;

        let title = if app.is_running() {
            " Article (processing...) "
        } else {
            " Paste your article text below "
        };
        frame.render_widget(
            Paragraph::new(app.input())
                .wrap(Wrap { trim: false })
                .scroll((scroll, 0))
                .block(Block::bordered().title(title)),
            area,
        );
    }

    fn status_style(kind: StatusKind) -> Style {
        let color = match kind {
            StatusKind::Info | StatusKind::Busy => Color::Cyan,
            StatusKind::Success => Color::Green,
            StatusKind::Warning => Color::Yellow,
            StatusKind::Error => Color::Red,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    fn help_line(app: &App) -> Line<'static> {
        let key = Style::default().add_modifier(Modifier::BOLD);
        let mut spans = vec![
            Span::styled(" Ctrl+R", key),
            Span::raw(" analyze & email  "),
            Span::styled("Ctrl+E", key),
            Span::raw(" editor  "),
            Span::styled("Ctrl+L", key),
            Span::raw(" clear  "),
        ];
        if app.report.is_some() {
            spans.push(Span::styled("Ctrl+O", key));
            spans.push(Span::raw(" open report  "));
        }
        spans.push(Span::styled("Esc", key));
        spans.push(Span::raw(" quit"));
        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Stage, TOTAL_STEPS};
    use crate::report::{assemble, Sections};
    use chrono::NaiveDate;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn completed(delivery: Delivery) -> Completed {
        let at = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Completed {
            outcome: Outcome {
                report: assemble(&Sections::default(), at, Duration::ZERO),
                delivery,
                saved_to: None,
                save_error: None,
            },
            path: PathBuf::from("/tmp/digesta-report-test.md"),
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let mut app = App::new();
        type_text(&mut app, "   ");
        assert_eq!(app.handle_key(ctrl('r')), Action::None);
        assert!(!app.is_running());
        assert_eq!(app.status().1, StatusKind::Warning);
    }

    #[test]
    fn run_trims_and_locks_input() {
        let mut app = App::new();
        type_text(&mut app, " fox ");
        assert_eq!(app.handle_key(ctrl('r')), Action::Run("fox".into()));
        assert!(app.is_running());

        // Typing and a second run are ignored while processing
        type_text(&mut app, "x");
        assert_eq!(app.input(), " fox ");
        assert_eq!(app.handle_key(ctrl('r')), Action::None);
    }

    #[test]
    fn paste_normalises_line_endings() {
        let mut app = App::new();
        app.handle_paste("one\r\ntwo\rthree");
        assert_eq!(app.input(), "one\ntwo\nthree");
    }

    #[test]
    fn enter_and_backspace_edit_input() {
        let mut app = App::new();
        type_text(&mut app, "ab");
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('c')));
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.input(), "ab\n");
    }

    #[test]
    fn progress_events_move_the_gauge() {
        let mut app = App::new();
        type_text(&mut app, "article");
        app.handle_key(ctrl('r'));

        app.apply(WorkerEvent::Progress(ProgressEvent {
            stage: Stage::Keywords,
            step: 3,
            total: TOTAL_STEPS,
            message: "Step 3/4: Extracting keywords...".into(),
        }));
        assert_eq!(app.progress(), 0.75);
        assert_eq!(app.status().0, "Step 3/4: Extracting keywords...");
    }

    #[test]
    fn completion_shows_report_and_enables_open() {
        let mut app = App::new();
        type_text(&mut app, "article");
        app.handle_key(ctrl('r'));
        app.apply(WorkerEvent::Finished(Ok(completed(Delivery::Sent))));

        assert!(!app.is_running());
        assert_eq!(app.progress(), 1.0);
        let (text, kind) = app.status();
        assert_eq!(kind, StatusKind::Success);
        assert!(text.contains("/tmp/digesta-report-test.md"));
        assert!(text.contains("Ctrl+O to open"), "{text}");
        assert!(app.elapsed_label().starts_with("Total time:"));
        assert_eq!(
            app.handle_key(ctrl('o')),
            Action::OpenReport(PathBuf::from("/tmp/digesta-report-test.md"))
        );
    }

    #[test]
    fn email_failure_is_a_warning_not_an_error() {
        let mut app = App::new();
        type_text(&mut app, "article");
        app.handle_key(ctrl('r'));
        app.apply(WorkerEvent::Finished(Ok(completed(Delivery::Failed(
            "connection refused".into(),
        )))));
        let (text, kind) = app.status();
        assert_eq!(kind, StatusKind::Warning);
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn configured_output_failure_is_a_warning() {
        let mut app = App::new();
        type_text(&mut app, "article");
        app.handle_key(ctrl('r'));
        let mut done = completed(Delivery::Skipped);
        done.outcome.save_error = Some("failed to save report to /nope/report.md".into());
        app.apply(WorkerEvent::Finished(Ok(done)));

        let (text, kind) = app.status();
        assert_eq!(kind, StatusKind::Warning);
        assert!(text.contains("/nope/report.md"));
        assert!(text.contains("Ctrl+O to open"));
    }

    #[test]
    fn failure_resets_to_ready() {
        let mut app = App::new();
        type_text(&mut app, "article");
        app.handle_key(ctrl('r'));
        app.apply(WorkerEvent::Finished(Err("summary generation failed".into())));

        assert!(!app.is_running());
        assert_eq!(app.progress(), 0.0);
        assert_eq!(app.status().1, StatusKind::Error);
        assert_eq!(app.elapsed_label(), "Elapsed: 0.0s");
        assert_eq!(app.handle_key(ctrl('o')), Action::None);
    }

    #[test]
    fn escape_quits() {
        assert_eq!(App::new().handle_key(key(KeyCode::Esc)), Action::Quit);
    }
}
