pub mod widgets;

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use image::RgbImage;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use ratatui::DefaultTerminal;
use tracing::{debug, warn};

use crate::backend::{BackendError, ColorBackend, ExtractRequest, ExtractionResult};
use crate::export::write_palette_png;
use crate::picker;
use crate::region::Region;
use crate::session::{ApplyOutcome, Debounce, RequestToken, ResizeEffect, Session};
use widgets::{PaletteWidget, PickedWidget, TrimWidget};

const TICK: Duration = Duration::from_millis(100);
const CURSOR_STEP: f32 = 0.05;
const TRIM_STEP: f64 = 0.5;

/// A finished extraction, tagged with the request it answers.
struct Reply {
    token: RequestToken,
    result: Result<ExtractionResult, BackendError>,
}

/// State for the interactive terminal view.
pub struct TuiApp {
    session: Session,
    backend: Option<Arc<dyn ColorBackend>>,
    image: Option<RgbImage>,
    cursor: Region,
    selected: Option<usize>,
    export_path: PathBuf,
    status: String,
    debounce: Debounce,
    in_flight: Option<RequestToken>,
    replies_tx: Sender<Reply>,
    replies_rx: Receiver<Reply>,
    should_quit: bool,
}

impl TuiApp {
    pub fn new(
        session: Session,
        backend: Option<Arc<dyn ColorBackend>>,
        image: Option<RgbImage>,
        export_path: PathBuf,
        debounce: Duration,
    ) -> Self {
        let (replies_tx, replies_rx) = channel();
        let selected = (!session.selection().active().is_empty()).then_some(0);
        Self {
            session,
            backend,
            image,
            cursor: Region::CENTER,
            selected,
            export_path,
            status: String::new(),
            debounce: Debounce::new(debounce),
            in_flight: None,
            replies_tx,
            replies_rx,
            should_quit: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn cursor(&self) -> Region {
        self.cursor
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn handle_key(&mut self, code: KeyCode, now: Instant) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('s') => {
                self.session.selection_mut().shuffle();
                self.clamp_selected();
                self.status = "Shuffled".to_string();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let target = self.session.selection().target() + 1;
                self.resize(target, now);
            }
            KeyCode::Char('-') => {
                let target = self.session.selection().target().saturating_sub(1);
                self.resize(target, now);
            }
            KeyCode::Left => self.step_selected(false),
            KeyCode::Right => self.step_selected(true),
            KeyCode::Char('h') => self.move_cursor(-CURSOR_STEP, 0.0),
            KeyCode::Char('l') => self.move_cursor(CURSOR_STEP, 0.0),
            KeyCode::Char('k') => self.move_cursor(0.0, -CURSOR_STEP),
            KeyCode::Char('j') => self.move_cursor(0.0, CURSOR_STEP),
            KeyCode::Char('p') => self.pick(),
            KeyCode::Char('[') => self.slide_trim(-TRIM_STEP),
            KeyCode::Char(']') => self.slide_trim(TRIM_STEP),
            KeyCode::Char(',') => self.move_trim_end(-TRIM_STEP),
            KeyCode::Char('.') => self.move_trim_end(TRIM_STEP),
            KeyCode::Char('r') => {
                self.debounce.cancel();
                self.request_extraction();
            }
            KeyCode::Char('e') => self.export(),
            _ => {}
        }
    }

    /// Fire a due refetch and apply any replies that arrived.
    pub fn tick(&mut self, now: Instant) {
        if self.debounce.poll(now) {
            self.request_extraction();
        }
        while let Ok(reply) = self.replies_rx.try_recv() {
            self.receive(reply);
        }
    }

    fn resize(&mut self, count: usize, now: Instant) {
        let effect = self.session.resize(count);
        self.clamp_selected();
        self.status = format!("{} colors", self.session.selection().target());
        if effect == ResizeEffect::RefetchNeeded {
            self.debounce.trigger(now);
        }
    }

    fn step_selected(&mut self, forward: bool) {
        let len = self.session.selection().active().len();
        if len == 0 {
            self.selected = None;
            return;
        }
        let current = self.selected.unwrap_or(0);
        self.selected = Some(if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        });
    }

    fn clamp_selected(&mut self) {
        let len = self.session.selection().active().len();
        self.selected = match (self.selected, len) {
            (_, 0) => None,
            (Some(i), _) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
    }

    fn move_cursor(&mut self, dx: f32, dy: f32) {
        self.cursor = Region::new(self.cursor.x + dx, self.cursor.y + dy);
    }

    fn pick(&mut self) {
        let Some(image) = &self.image else {
            self.status = "No image to pick from".to_string();
            return;
        };
        if let Some(color) = picker::sample(image, self.cursor) {
            self.session.selection_mut().pick_color(color);
            self.status = format!("Picked {color}");
        }
    }

    fn is_video(&self) -> bool {
        self.session.asset().is_some_and(|a| a.is_video())
    }

    fn slide_trim(&mut self, delta: f64) {
        if !self.is_video() {
            return;
        }
        let start = self.session.trim().start() + delta;
        if self.session.trim_mut().slide_to(start).is_ok() {
            self.status = self.trim_status();
        }
    }

    fn move_trim_end(&mut self, delta: f64) {
        if !self.is_video() {
            return;
        }
        let end = self.session.trim().end() + delta;
        if self.session.trim_mut().set_end(end).is_ok() {
            self.status = self.trim_status();
        }
    }

    fn trim_status(&self) -> String {
        let t = self.session.trim();
        format!("Trim {:.1}s - {:.1}s", t.start(), t.end())
    }

    fn request_extraction(&mut self) {
        let (Some(backend), Some(asset)) = (self.backend.clone(), self.session.asset().cloned())
        else {
            self.status = "Nothing to extract from".to_string();
            return;
        };
        let (token, request) = self.begin_request();
        debug!(colors = request.num_colors, "spawning extraction");

        let tx = self.replies_tx.clone();
        thread::spawn(move || {
            let result = backend.extract(&asset, &request);
            let _ = tx.send(Reply { token, result });
        });
    }

    /// Issue a request; only its reply can clear the busy flag.
    fn begin_request(&mut self) -> (RequestToken, ExtractRequest) {
        let (token, request) = self.session.extract_request();
        self.in_flight = Some(token);
        self.status = "Extracting...".to_string();
        (token, request)
    }

    fn receive(&mut self, reply: Reply) {
        if self.in_flight == Some(reply.token) {
            self.in_flight = None;
        }
        match reply.result {
            Ok(result) => match self.session.apply_extraction(reply.token, &result) {
                Ok(ApplyOutcome::Applied(n)) => {
                    self.clamp_selected();
                    self.status = format!("Extracted {n} colors");
                }
                Ok(ApplyOutcome::Stale) => {}
                Err(e) => {
                    warn!(error = %e, "ignoring malformed extraction result");
                    self.status = "Failed to upload file. Please try again.".to_string();
                }
            },
            Err(e) if self.session.is_latest(reply.token) => {
                warn!(error = %e, "extraction failed");
                self.status = e.user_message("upload file");
            }
            Err(_) => {}
        }
    }

    fn export(&mut self) {
        let colors = self.session.selection().active_colors();
        self.status = match write_palette_png(&colors, &self.export_path) {
            Ok(()) => format!("Saved {}", self.export_path.display()),
            Err(e) => format!("Export failed: {e:#}"),
        };
    }

    fn draw(&self, frame: &mut Frame) {
        let selection = self.session.selection();
        let trim_height = if self.is_video() { 4 } else { 0 };
        let [palette_area, picked_area, trim_area, status_area, help_area] = Layout::vertical([
            Constraint::Length(PaletteWidget::height(selection.active().len())),
            Constraint::Length(4),
            Constraint::Length(trim_height),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        frame.render_widget(
            PaletteWidget::new(
                selection.active(),
                selection.reserve().len(),
                selection.target(),
                self.selected,
            ),
            palette_area,
        );
        frame.render_widget(
            PickedWidget::new(selection.picked(), self.image.as_ref().map(|_| self.cursor)),
            picked_area,
        );
        if self.is_video() {
            frame.render_widget(TrimWidget::new(self.session.trim()), trim_area);
        }
        let status = if self.is_busy() && self.status.is_empty() {
            "Extracting..."
        } else {
            self.status.as_str()
        };
        frame.render_widget(Paragraph::new(format!(" {status}")), status_area);
        frame.render_widget(
            Paragraph::new(
                " [s] shuffle  [+/-] colors  [<-/->] select  [r] extract  [e] export  [[ ]] trim start  [, .] trim end  [q] quit",
            )
            .style(Style::default().fg(Color::DarkGray)),
            help_area,
        );
    }
}

/// Run the terminal view until the user quits, then hand the app back.
pub fn run(mut app: TuiApp) -> Result<TuiApp> {
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut app);
    ratatui::restore();
    result.map(|()| app)
}

fn event_loop(terminal: &mut DefaultTerminal, app: &mut TuiApp) -> Result<()> {
    while !app.should_quit() {
        terminal.draw(|frame| app.draw(frame))?;
        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, Instant::now());
                }
            }
        }
        app.tick(Instant::now());
    }
    Ok(())
}
