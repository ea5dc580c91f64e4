//! Main TUI application state and logic

use crate::executor::{Engine, ExecutionOutcome};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Outcome,
}

impl FocusedPane {
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Outcome,
            FocusedPane::Outcome => FocusedPane::Source,
        }
    }
}

/// The viewer state: one snippet and the outcome of its latest run
pub struct App {
    pub engine: Engine,
    pub source: String,
    pub outcome: ExecutionOutcome,
    /// Wall-clock time of the latest run
    pub elapsed: Duration,
    pub runs: usize,

    pub focused_pane: FocusedPane,
    pub source_scroll: usize,
    pub outcome_scroll: usize,

    pub should_quit: bool,
    pub status_message: String,
}

impl App {
    /// Create the app and run the snippet once
    pub fn new(engine: Engine, source: String) -> Self {
        let mut app = App {
            engine,
            source,
            outcome: ExecutionOutcome::Output(String::new()),
            elapsed: Duration::ZERO,
            runs: 0,
            focused_pane: FocusedPane::Outcome,
            source_scroll: 0,
            outcome_scroll: 0,
            should_quit: false,
            status_message: String::new(),
        };
        app.rerun();
        app
    }

    /// Run the snippet again and replace the displayed outcome
    pub fn rerun(&mut self) {
        let started = Instant::now();
        self.outcome = self.engine.run(&self.source);
        self.elapsed = started.elapsed();
        self.runs += 1;
        self.outcome_scroll = 0;

        // Bring the failing line into view
        if let Some(line) = self.error_line() {
            self.source_scroll = line.saturating_sub(3);
        }

        self.status_message = if self.runs == 1 {
            "Ready".to_string()
        } else {
            format!("Run #{}", self.runs)
        };
    }

    /// Line the current diagnostic points at
    pub fn error_line(&self) -> Option<usize> {
        self.outcome.diagnostic().and_then(|diagnostic| diagnostic.line)
    }

    /// Run the TUI event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        super::panes::render_source_pane(
            frame,
            columns[0],
            &self.source,
            self.error_line(),
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        super::panes::render_outcome_pane(
            frame,
            columns[1],
            &self.outcome,
            self.focused_pane == FocusedPane::Outcome,
            &mut self.outcome_scroll,
        );

        super::panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            self.outcome.kind(),
            self.elapsed,
            self.engine.config().timeout,
        );
    }

    fn focused_scroll(&mut self) -> &mut usize {
        match self.focused_pane {
            FocusedPane::Source => &mut self.source_scroll,
            FocusedPane::Outcome => &mut self.outcome_scroll,
        }
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.rerun();
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Up => {
                let scroll = self.focused_scroll();
                *scroll = scroll.saturating_sub(1);
            }
            KeyCode::Down => {
                let scroll = self.focused_scroll();
                *scroll = scroll.saturating_add(1);
            }
            KeyCode::PageUp => {
                let scroll = self.focused_scroll();
                *scroll = scroll.saturating_sub(10);
            }
            KeyCode::PageDown => {
                let scroll = self.focused_scroll();
                *scroll = scroll.saturating_add(10);
            }
            KeyCode::Home => {
                *self.focused_scroll() = 0;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::EngineConfig;
    use crossterm::event::KeyModifiers;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_app_runs_snippet_on_start() {
        let app = App::new(Engine::default(), "x = 5\nx * 2".to_string());
        assert_eq!(app.outcome.text(), "10");
        assert_eq!(app.runs, 1);
        assert_eq!(app.error_line(), None);
    }

    #[test]
    fn test_rerun_and_quit_keys() {
        let engine = Engine::new(EngineConfig::builder().timeout_secs(2.0).build());
        let mut app = App::new(engine, "print('a')\n1/0".to_string());
        assert_eq!(app.error_line(), Some(2));

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.runs, 2);
        assert_eq!(app.status_message, "Run #2");

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_focus_and_scroll() {
        let mut app = App::new(Engine::default(), "1".to_string());
        assert_eq!(app.focused_pane, FocusedPane::Outcome);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focused_pane, FocusedPane::Source);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.source_scroll, 2);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.source_scroll, 1);
        assert_eq!(app.outcome_scroll, 0);
    }
}
