use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::bootstrap::{InstallProcess, PackageManager};
use crate::model::stage::Stage;
use crate::model::wrap::wrap_names;
use crate::msg::Msg;

const SPINNER: [char; 4] = ['\\', '|', '/', '-'];
const PROMPT: &str = "Install packages? (y/n)";

/// The confirm/progress screen shown by the installer process.
pub struct App<'a> {
    pub stage: Stage,
    packages: Vec<String>,
    manager: &'a dyn PackageManager,
    install: Option<Box<dyn InstallProcess>>,
    spinner: usize,
    wrap_margin: u16,
    log_path: Option<PathBuf>,
}

impl<'a> App<'a> {
    pub fn new(
        packages: Vec<String>,
        manager: &'a dyn PackageManager,
        wrap_margin: u16,
        log_path: Option<PathBuf>,
    ) -> Self {
        Self {
            stage: Stage::default(),
            packages,
            manager,
            install: None,
            spinner: 0,
            wrap_margin,
            log_path,
        }
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn exit_status(&self) -> Option<i32> {
        match self.stage {
            Stage::Done(status) => Some(status),
            _ => None,
        }
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => self.handle_key(key)?,
            Msg::Tick => self.handle_tick()?,
            Msg::Resize(_, _) => {} // next draw re-wraps
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // Only the prompt listens; there is no cancel once installing.
        if !matches!(self.stage, Stage::AwaitConfirm { .. }) {
            return Ok(());
        }

        match key.code {
            KeyCode::Char('y') => self.start_install()?,
            KeyCode::Char('n') => {
                tracing::info!("installation declined");
                self.stage = Stage::Done(1);
            }
            _ => self.stage = Stage::AwaitConfirm { retry: true },
        }
        Ok(())
    }

    fn start_install(&mut self) -> Result<()> {
        let process = self
            .manager
            .install(&self.packages, self.log_path.as_deref())?;
        self.install = Some(process);
        self.stage = Stage::Installing;
        Ok(())
    }

    fn handle_tick(&mut self) -> Result<()> {
        if self.stage != Stage::Installing {
            return Ok(());
        }
        let Some(process) = self.install.as_mut() else {
            return Ok(());
        };

        match process.poll()? {
            Some(status) => {
                tracing::info!(status, "install command finished");
                self.install = None;
                self.stage = Stage::Done(status);
            }
            None => self.spinner = (self.spinner + 1) % SPINNER.len(),
        }
        Ok(())
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&self, frame: &mut Frame) {
        let area = centered_rect(50, 50, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Package installer ")
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1))
            .style(Style::default().fg(Color::White).bg(Color::Blue));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(1),    // package list
                Constraint::Length(2), // prompt
                Constraint::Length(1), // progress
            ])
            .split(inner);

        frame.render_widget(
            Paragraph::new("This program needs these packages:")
                .style(Style::default().add_modifier(Modifier::BOLD)),
            chunks[0],
        );

        let lines: Vec<Line> = wrap_names(&self.packages, inner.width, self.wrap_margin)
            .into_iter()
            .map(Line::from)
            .collect();
        frame.render_widget(Paragraph::new(lines), chunks[1]);

        self.render_prompt(frame, chunks[2]);
        self.render_progress(frame, chunks[3]);
    }

    fn render_prompt(&self, frame: &mut Frame, area: Rect) {
        let lines = match self.stage {
            Stage::AwaitConfirm { retry: false } => vec![Line::from(PROMPT)],
            Stage::AwaitConfirm { retry: true } => vec![
                Line::styled("Wrong input", Style::default().fg(Color::Yellow)),
                Line::from(PROMPT),
            ],
            Stage::Installing | Stage::Done(_) => Vec::new(),
        };
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_progress(&self, frame: &mut Frame, area: Rect) {
        let text = match self.stage {
            Stage::Installing => format!("Installing {}", SPINNER[self.spinner]),
            Stage::Done(_) => self.stage.label().to_string(),
            Stage::AwaitConfirm { .. } => return,
        };
        frame.render_widget(Paragraph::new(text), area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
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
