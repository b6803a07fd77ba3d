use std::{
    io::{self, IsTerminal},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::engine::Simulator;
use crate::pacer::FramePacer;
use anyhow::bail;
use crossterm::{
    cursor::Show,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::layout::{Margin, Position};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use rtos_vis_abstract::{TaskKind, TaskParameters};
use tracing::{info, warn};

const LOG_CAPACITY: usize = 1000;
const TICK_SPACING: f64 = 2.0;
const SPEED_STEP: f64 = 0.25;
const MAX_SPEED: f64 = 10.0;

/// A tracing writer that keeps recent lines for the log panel
#[derive(Clone)]
pub struct MemoryLogBuffer {
    logs: Arc<Mutex<Vec<String>>>,
}

impl Default for MemoryLogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLogBuffer {
    pub fn new() -> Self {
        Self {
            logs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, msg: String) {
        let mut logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        logs.push(msg);
        if logs.len() > LOG_CAPACITY {
            logs.remove(0);
        }
    }

    /// The last `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        let skip = logs.len().saturating_sub(count);
        logs[skip..].to_vec()
    }
}

impl io::Write for MemoryLogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let line = s.trim();
        if !line.is_empty() {
            self.push(line.to_string());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn lane(task: TaskKind) -> f64 {
    match task {
        TaskKind::Receive => 3.0,
        TaskKind::Parsing => 2.0,
        TaskKind::Idle => 1.0,
    }
}

fn task_color(task: TaskKind) -> Color {
    match task {
        TaskKind::Receive => Color::Blue,
        TaskKind::Parsing => Color::Green,
        TaskKind::Idle => Color::Rgb(255, 165, 0),
    }
}

/// Raw mode and the alternate screen, undone on drop so early returns
/// leave a usable shell behind.
struct TerminalGuard<W: io::Write> {
    out: W,
}

impl<W: io::Write> TerminalGuard<W> {
    fn enter(out: W) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut guard = Self { out };
        execute!(guard.out, EnterAlternateScreen, EnableMouseCapture)?;
        Ok(guard)
    }
}

impl<W: io::Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.out, LeaveAlternateScreen, DisableMouseCapture, Show);
    }
}

pub struct TuiApp {
    simulator: Simulator,
    paused: bool,
    scenario_name: Option<String>,
    pacer: FramePacer,
    /// Parameters being edited; only applied on request.
    staged: TaskParameters,
    logs: Option<MemoryLogBuffer>,
    /// Where the timeline was last drawn, for mapping mouse positions.
    timeline_area: Rect,
    /// Mouse position over the timeline plot, if any.
    hover: Option<(u16, u16)>,
}

impl TuiApp {
    pub fn new(
        simulator: Simulator,
        scenario_name: Option<String>,
        logs: Option<MemoryLogBuffer>,
    ) -> Self {
        let config = simulator.config();
        let pacer = FramePacer::new(config.time_slice, config.max_frame_time);
        let staged = simulator.parameters();
        Self {
            simulator,
            paused: false,
            scenario_name,
            pacer,
            staged,
            logs,
            timeline_area: Rect::default(),
            hover: None,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        if !io::stdout().is_terminal() {
            bail!("the timeline view needs an interactive terminal on stdout");
        }

        let _guard = TerminalGuard::enter(io::stdout())?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

        let frame_rate = Duration::from_millis(16);
        let mut last_frame = Instant::now();

        loop {
            terminal.draw(|f| self.ui(f))?;

            let timeout = frame_rate
                .checked_sub(last_frame.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            if crossterm::event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) => {
                        if !self.handle_key(key.code) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }

            let elapsed = last_frame.elapsed();
            if elapsed >= frame_rate {
                if !self.paused {
                    for _ in 0..self.pacer.slices(elapsed) {
                        self.simulator.step(self.pacer.time_slice());
                    }
                }
                last_frame = Instant::now();
            }
        }

        terminal.show_cursor()?;
        Ok(())
    }

    pub fn into_simulator(self) -> Simulator {
        self.simulator
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Char(' ') => {
                self.paused = !self.paused;
                self.pacer.reset();
            }
            KeyCode::Char('r') => {
                self.simulator.reset();
                self.pacer.reset();
                self.paused = false;
            }
            KeyCode::Char('s') => {
                self.simulator.step(self.pacer.time_slice());
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let speed = (self.simulator.speed() + SPEED_STEP).min(MAX_SPEED);
                self.simulator.set_speed(speed);
            }
            KeyCode::Char('-') => {
                let speed = (self.simulator.speed() - SPEED_STEP).max(SPEED_STEP);
                self.simulator.set_speed(speed);
            }
            KeyCode::Char('i') => nudge(&mut self.staged.mean_interval, -0.5, 0.5),
            KeyCode::Char('I') => nudge(&mut self.staged.mean_interval, 0.5, 0.5),
            KeyCode::Char('d') => nudge(&mut self.staged.receive_duration, -0.1, 0.1),
            KeyCode::Char('D') => nudge(&mut self.staged.receive_duration, 0.1, 0.1),
            KeyCode::Char('p') => nudge(&mut self.staged.parsing_duration, -0.1, 0.1),
            KeyCode::Char('P') => nudge(&mut self.staged.parsing_duration, 0.1, 0.1),
            KeyCode::Char('a') => match self.simulator.set_parameters(self.staged) {
                Ok(()) => info!("Staged parameters applied"),
                Err(e) => warn!("Rejected parameters: {e}"),
            },
            _ => {}
        }
        true
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Down(_) => {
                let plot = self.timeline_area.inner(Margin::new(1, 1));
                let inside = plot.contains(Position::new(mouse.column, mouse.row));
                self.hover = inside.then_some((mouse.column, mouse.row));
            }
            _ => {}
        }
    }

    /// Simulated time under a terminal column of the timeline plot.
    fn time_at_column(&self, column: u16) -> Option<f64> {
        let plot = self.timeline_area.inner(Margin::new(1, 1));
        if plot.width == 0 || column < plot.x || column >= plot.x + plot.width {
            return None;
        }
        let start = self.simulator.window().start;
        let span = self.simulator.config().window_size;
        let fraction = (f64::from(column - plot.x) + 0.5) / f64::from(plot.width);
        Some(start + fraction * span)
    }

    /// "<task> (<start>s - <end>s)" for the bar under the mouse.
    fn hover_label(&self) -> Option<String> {
        let (column, _) = self.hover?;
        let time = self.time_at_column(column)?;
        self.simulator
            .visible_timeline()
            .into_iter()
            .find(|span| span.start <= time && time <= span.end())
            .map(|span| {
                format!(
                    "{} ({:.1}s - {:.1}s)",
                    span.task.label(),
                    span.start,
                    span.end()
                )
            })
    }

    fn ui(&mut self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // Control bar
                Constraint::Length(14), // Timeline
                Constraint::Min(0),     // Parameters + log
            ])
            .split(f.area());

        self.timeline_area = rows[1];
        self.render_control(f, rows[0]);
        self.render_timeline(f, rows[1]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[2]);
        self.render_parameters(f, bottom[0]);
        self.render_log(f, bottom[1]);
    }

    fn render_control(&self, f: &mut Frame, area: Rect) {
        let scenario = self.scenario_name.as_deref().unwrap_or("Free run");
        let status_text = format!(
            "{} | t={:.1}s | {} | {:.2}x | (q)uit (space)pause (r)estart (s)tep (+/-)speed",
            scenario,
            self.simulator.current_time(),
            if self.paused { "PAUSED" } else { "RUNNING" },
            self.simulator.speed(),
        );
        let status_block = Paragraph::new(status_text)
            .block(Block::default().borders(Borders::ALL).title("Control"));
        f.render_widget(status_block, area);
    }

    fn render_timeline(&self, f: &mut Frame, area: Rect) {
        let window = self.simulator.window();
        let x_min = window.start;
        // Fixed scale: the window fills the plot only once it reached full size.
        let x_max = window.start + self.simulator.config().window_size;

        let mut bars: Vec<CanvasLine> = Vec::new();
        for span in self.simulator.visible_timeline() {
            if span.duration <= 0.0 {
                continue;
            }
            let y = lane(span.task);
            let color = task_color(span.task);
            for offset in [-0.25, -0.125, 0.0, 0.125, 0.25] {
                bars.push(CanvasLine {
                    x1: span.start,
                    y1: y + offset,
                    x2: span.end(),
                    y2: y + offset,
                    color,
                });
            }
        }

        let irq_points: Vec<(f64, f64)> = self
            .simulator
            .interrupts()
            .iter()
            .filter(|t| window.contains(**t))
            .map(|t| (*t, 3.7))
            .collect();

        let first_tick = (x_min / TICK_SPACING).ceil() * TICK_SPACING;
        let ticks: Vec<f64> = (0..)
            .map(|i| first_tick + i as f64 * TICK_SPACING)
            .take_while(|t| *t <= x_max)
            .collect();

        let canvas = Canvas::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Task Timeline"),
            )
            .x_bounds([x_min, x_max])
            .y_bounds([0.0, 4.2])
            .paint(move |ctx| {
                ctx.draw(&CanvasLine {
                    x1: x_min,
                    y1: 0.4,
                    x2: x_max,
                    y2: 0.4,
                    color: Color::Gray,
                });
                for t in &ticks {
                    ctx.draw(&CanvasLine {
                        x1: *t,
                        y1: 0.3,
                        x2: *t,
                        y2: 0.5,
                        color: Color::Gray,
                    });
                    ctx.print(*t, 0.0, Span::raw(format!("{t:.0}")));
                }

                for line in &bars {
                    ctx.draw(line);
                }

                if !irq_points.is_empty() {
                    ctx.draw(&Points {
                        coords: &irq_points,
                        color: Color::Red,
                    });
                    for (x, y) in &irq_points {
                        ctx.print(
                            *x,
                            *y + 0.3,
                            Span::styled("CAN IRQ", Style::default().fg(Color::Red)),
                        );
                    }
                }

                ctx.layer();
                for task in TaskKind::ALL {
                    ctx.print(
                        x_min,
                        lane(task) + 0.4,
                        Span::styled(task.label(), Style::default().fg(task_color(task))),
                    );
                }
            });

        f.render_widget(canvas, area);
    }

    fn render_parameters(&self, f: &mut Frame, area: Rect) {
        let applied = self.simulator.parameters();
        let staged = self.staged;
        let mut text = vec![
            Line::from(format!(
                "Current task:     {}",
                self.simulator.current_task().label()
            )),
            Line::from(format!(
                "Pending IRQs:     {}",
                self.simulator.pending_interrupts()
            )),
            Line::from(format!(
                "Pending messages: {}",
                self.simulator.pending_parsing_messages()
            )),
            Line::from(format!(
                "Hover:            {}",
                self.hover_label().unwrap_or_default()
            )),
            Line::from(""),
            Line::from("Parameters (applied / staged):"),
            Line::from(format!(
                "  (i/I) interval:  {:.1}s / {:.1}s",
                applied.mean_interval, staged.mean_interval
            )),
            Line::from(format!(
                "  (d/D) rx:        {:.1}s / {:.1}s",
                applied.receive_duration, staged.receive_duration
            )),
            Line::from(format!(
                "  (p/P) parsing:   {:.1}s / {:.1}s",
                applied.parsing_duration, staged.parsing_duration
            )),
            Line::from("  (a)   apply"),
            Line::from(""),
            Line::from("Utilization:"),
        ];
        for u in self.simulator.utilization() {
            text.push(Line::from(Span::styled(
                format!("  {:<12} {:>5.1}%", u.task.label(), u.share * 100.0),
                Style::default().fg(task_color(u.task)),
            )));
        }

        let block = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Dashboard"));
        f.render_widget(block, area);
    }

    fn render_log(&self, f: &mut Frame, area: Rect) {
        let visible = (area.height as usize).saturating_sub(2);
        let lines = self
            .logs
            .as_ref()
            .map(|logs| logs.tail(visible))
            .unwrap_or_default();
        if lines.is_empty() {
            let block = Paragraph::new("No log output yet")
                .block(Block::default().borders(Borders::ALL).title("Log"));
            f.render_widget(block, area);
            return;
        }

        let items: Vec<ListItem> = lines
            .into_iter()
            .map(|line| {
                let style = if line.contains("WARN") {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::White)
                };
                ListItem::new(Line::from(Span::styled(line, style)))
            })
            .collect();
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Log"));
        f.render_widget(list, area);
    }
}

fn nudge(value: &mut f64, delta: f64, floor: f64) {
    // Round to one decimal so repeated nudges do not drift.
    *value = ((*value + delta).max(floor) * 10.0).round() / 10.0;
}
