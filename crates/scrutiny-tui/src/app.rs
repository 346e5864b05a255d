//! Application state and event loop.
//!
//! One `App` owns all view state and mutates it only through the defined
//! transitions: key handling, background-task messages, and job-monitor
//! events. The dashboard's monitor is torn down whenever the user
//! navigates away and re-attached on return, so a dead view can never be
//! updated by a stale timer or channel.

use crate::ui;
use anyhow::Result;
use base64::Engine;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use scrutiny_client::error::ClientError;
use scrutiny_client::types::{StartAnalysisResponse, UploadResponse};
use scrutiny_core::backend::AnalysisBackend;
use scrutiny_core::chat::{self, ChatSession, Role, Transcript};
use scrutiny_core::markdown;
use scrutiny_core::monitor::{JobMonitor, JobSnapshot, MonitorEvent, refresh_report};
use scrutiny_core::report::AnalysisReport;
use scrutiny_core::upload::{UploadState, UploadedItem};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Upload,
    Dashboard,
    Chat,
}

impl View {
    fn next(self) -> Self {
        match self {
            Self::Upload => Self::Dashboard,
            Self::Dashboard => Self::Chat,
            Self::Chat => Self::Upload,
        }
    }
}

/// Results of background tasks, delivered to the event loop.
enum AppMsg {
    UploadFinished(Result<UploadResponse, ClientError>),
    AnalysisStarted {
        job_id: String,
        result: Result<StartAnalysisResponse, ClientError>,
    },
    ReportRefreshed(Result<Box<AnalysisReport>, ClientError>),
    ChatReply {
        session: Option<ChatSession>,
        reply: String,
    },
}

enum Step {
    Tick,
    Key(KeyEvent),
    Monitor(Option<MonitorEvent>),
    Message(AppMsg),
    Quit,
}

pub struct App {
    backend: Arc<dyn AnalysisBackend>,
    poll_interval: Duration,
    pub(crate) server_label: String,

    pub(crate) view: View,
    pub(crate) notice: Option<String>,

    // Upload view
    pub(crate) items: Vec<UploadedItem>,
    local_paths: Vec<PathBuf>,
    pub(crate) repo: Option<String>,
    pub(crate) selected: usize,
    pub(crate) upload_dir: Option<String>,
    pub(crate) uploading: bool,

    // Dashboard view
    pub(crate) job_id: Option<String>,
    pub(crate) job: Option<JobSnapshot>,
    pub(crate) job_failed: Option<String>,
    pub(crate) report: Option<AnalysisReport>,
    pub(crate) results_error: Option<String>,
    pub(crate) channel_lost: bool,
    refreshing: bool,
    monitor: Option<JobMonitor>,
    monitor_rx: Option<mpsc::UnboundedReceiver<MonitorEvent>>,

    // Chat view
    session: Option<ChatSession>,
    pub(crate) transcript: Transcript,
    pub(crate) input: String,
    pub(crate) waiting_reply: bool,
    pub(crate) reveal: usize,

    msg_tx: mpsc::UnboundedSender<AppMsg>,
    msg_rx: Option<mpsc::UnboundedReceiver<AppMsg>>,
    should_quit: bool,
}

impl App {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        poll_interval: Duration,
        server_label: String,
        paths: Vec<PathBuf>,
        repo: Option<String>,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let items = paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                UploadedItem::queued(i as u64, path, size)
            })
            .collect();

        Self {
            backend,
            poll_interval,
            server_label,
            view: View::Upload,
            notice: None,
            items,
            local_paths: paths,
            repo,
            selected: 0,
            upload_dir: None,
            uploading: false,
            job_id: None,
            job: None,
            job_failed: None,
            report: None,
            results_error: None,
            channel_lost: false,
            refreshing: false,
            monitor: None,
            monitor_rx: None,
            session: None,
            transcript: Transcript::new(),
            input: String::new(),
            waiting_reply: false,
            reveal: 0,
            msg_tx,
            msg_rx: Some(msg_rx),
            should_quit: false,
        }
    }

    /// Runs the terminal event loop until the user quits.
    pub async fn run(mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let mut msg_rx = self.msg_rx.take().expect("message receiver taken once");
        let mut input = EventStream::new();
        let mut tick = interval(Duration::from_millis(80));

        loop {
            terminal.draw(|frame| ui::render(frame, &self))?;

            let step = tokio::select! {
                _ = tick.tick() => Step::Tick,
                event = input.next() => match event {
                    Some(Ok(Event::Key(key))) => Step::Key(key),
                    Some(_) => Step::Tick,
                    None => Step::Quit,
                },
                event = next_monitor(&mut self.monitor_rx) => Step::Monitor(event),
                message = msg_rx.recv() => match message {
                    Some(message) => Step::Message(message),
                    None => Step::Tick,
                },
            };

            match step {
                Step::Tick => self.on_tick(),
                Step::Key(key) => self.on_key(key),
                Step::Monitor(Some(event)) => self.on_monitor_event(event),
                Step::Monitor(None) => {
                    // Driver finished (terminal state); release the handle.
                    self.monitor = None;
                    self.monitor_rx = None;
                }
                Step::Message(message) => self.on_msg(message),
                Step::Quit => break,
            }

            if self.should_quit {
                break;
            }
        }

        self.teardown_monitor();
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        Ok(())
    }

    fn on_tick(&mut self) {
        // Typing reveal of the newest assistant message. Local animation
        // only; the transcript itself never changes.
        if let Some(last) = self.transcript.last()
            && last.role == Role::Assistant
        {
            let total = last.content.chars().count();
            if self.reveal < total {
                self.reveal = (self.reveal + 3).min(total);
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.notice = None;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if key.code == KeyCode::Tab {
            self.set_view(self.view.next());
            return;
        }

        match self.view {
            View::Upload => self.on_upload_key(key),
            View::Dashboard => self.on_dashboard_key(key),
            View::Chat => self.on_chat_key(key),
        }
    }

    fn on_upload_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('x') => self.remove_selected(),
            KeyCode::Enter => self.start_upload(),
            _ => {}
        }
    }

    fn on_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.refresh_results(),
            _ => {}
        }
    }

    fn on_chat_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('y') {
            self.copy_last_code_block();
            return;
        }
        match key.code {
            KeyCode::Esc => self.set_view(View::Dashboard),
            KeyCode::Enter => self.send_chat(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    /// Switch views. Leaving the dashboard tears the monitor down;
    /// entering it re-attaches to the known job.
    pub(crate) fn set_view(&mut self, view: View) {
        if self.view == view {
            return;
        }
        if self.view == View::Dashboard {
            self.teardown_monitor();
        }
        self.view = view;
        if view == View::Dashboard {
            self.attach_monitor();
        }
    }

    /// Spawn a monitor for the current job unless it already reached an
    /// outcome we hold (report in hand, or failed).
    fn attach_monitor(&mut self) {
        if self.monitor.is_some() {
            return;
        }
        let Some(job_id) = self.job_id.clone() else {
            return;
        };
        if self.report.is_some() || self.job_failed.is_some() {
            return;
        }
        let (monitor, rx) = JobMonitor::spawn(Arc::clone(&self.backend), job_id, self.poll_interval);
        self.monitor = Some(monitor);
        self.monitor_rx = Some(rx);
    }

    fn teardown_monitor(&mut self) {
        // Dropping the handle aborts the driver task; no event can reach
        // this view afterwards.
        self.monitor = None;
        self.monitor_rx = None;
    }

    fn remove_selected(&mut self) {
        if self.uploading || self.items.is_empty() {
            return;
        }
        self.items.remove(self.selected);
        self.local_paths.remove(self.selected);
        if self.selected >= self.items.len() {
            self.selected = self.items.len().saturating_sub(1);
        }
    }

    fn start_upload(&mut self) {
        if self.uploading {
            return;
        }
        if let Some(repo) = self.repo.clone() {
            self.uploading = true;
            self.begin_analysis(vec![repo]);
            return;
        }
        if self.local_paths.is_empty() {
            self.notice = Some("queue files on the command line: scrutiny app.py lib.py".to_string());
            return;
        }

        self.uploading = true;
        let backend = Arc::clone(&self.backend);
        let tx = self.msg_tx.clone();
        let paths = self.local_paths.clone();
        tokio::spawn(async move {
            let _ = tx.send(AppMsg::UploadFinished(backend.upload_files(&paths).await));
        });
    }

    fn begin_analysis(&mut self, file_paths: Vec<String>) {
        // Job ids are generated client-side; a fresh UUID per job keeps
        // progress channels and polls from crossing between jobs.
        let job_id = uuid::Uuid::new_v4().to_string();
        let backend = Arc::clone(&self.backend);
        let tx = self.msg_tx.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            let result = backend.start_analysis(&id, file_paths).await;
            let _ = tx.send(AppMsg::AnalysisStarted { job_id: id, result });
        });
    }

    fn refresh_results(&mut self) {
        if self.refreshing {
            return;
        }
        let Some(job_id) = self.job_id.clone() else {
            return;
        };
        if self.report.is_none() && self.results_error.is_none() {
            return;
        }
        self.refreshing = true;
        let backend = Arc::clone(&self.backend);
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = refresh_report(&*backend, &job_id).await.map(Box::new);
            let _ = tx.send(AppMsg::ReportRefreshed(result));
        });
    }

    fn send_chat(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.waiting_reply {
            return;
        }
        self.input.clear();
        self.transcript.push_user(text.clone());
        self.waiting_reply = true;

        let backend = Arc::clone(&self.backend);
        let tx = self.msg_tx.clone();
        let session = self.session.clone();
        let upload_dir = self.upload_dir.clone();
        tokio::spawn(async move {
            let (session, reply) = match session {
                Some(session) => {
                    let reply = chat::request_reply(&*backend, &session.session_id, &text).await;
                    (None, reply)
                }
                None => match chat::start_session(&*backend, upload_dir).await {
                    Ok(session) => {
                        let reply = chat::request_reply(&*backend, &session.session_id, &text).await;
                        (Some(session), reply)
                    }
                    Err(err) => {
                        tracing::warn!("Chat session failed, using fallback reply: {err}");
                        (None, chat::fallback_reply())
                    }
                },
            };
            let _ = tx.send(AppMsg::ChatReply { session, reply });
        });
    }

    fn last_code_block(&self) -> Option<String> {
        for message in self.transcript.messages().iter().rev() {
            if message.role != Role::Assistant {
                continue;
            }
            let code = markdown::parse(&message.content)
                .into_iter()
                .rev()
                .find_map(|block| match block {
                    markdown::Block::Code { content, .. } => Some(content),
                    _ => None,
                });
            if code.is_some() {
                return code;
            }
        }
        None
    }

    fn copy_last_code_block(&mut self) {
        match self.last_code_block() {
            Some(code) => {
                // OSC 52 hands the text to the hosting terminal's clipboard.
                let encoded = base64::engine::general_purpose::STANDARD.encode(code);
                let mut out = io::stdout();
                let _ = write!(out, "\x1b]52;c;{encoded}\x07");
                let _ = out.flush();
                self.notice = Some("code block copied".to_string());
            }
            None => self.notice = Some("no code block to copy".to_string()),
        }
    }

    fn on_monitor_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::Status(snapshot) => self.job = Some(snapshot),
            MonitorEvent::Report(report) => {
                self.report = Some(*report);
                self.results_error = None;
            }
            MonitorEvent::JobFailed { message } => self.job_failed = Some(message),
            MonitorEvent::ResultsError { message } => self.results_error = Some(message),
            MonitorEvent::ChannelLost => self.channel_lost = true,
        }
    }

    fn on_msg(&mut self, msg: AppMsg) {
        match msg {
            AppMsg::UploadFinished(Ok(response)) => {
                self.upload_dir = Some(response.upload_dir.clone());
                for item in &mut self.items {
                    if let Some(file) = response.files.iter().find(|f| f.name == item.name) {
                        item.complete(file.path.clone());
                    } else if item.state == UploadState::Uploading {
                        item.fail("missing from upload response".to_string());
                    }
                }
                let paths = response.files.into_iter().map(|f| f.path).collect();
                self.begin_analysis(paths);
            }
            AppMsg::UploadFinished(Err(err)) => {
                let message = err.to_string();
                for item in &mut self.items {
                    if item.state == UploadState::Uploading {
                        item.fail(message.clone());
                    }
                }
                self.uploading = false;
                self.notice = Some(message);
            }
            AppMsg::AnalysisStarted { job_id, result } => {
                self.uploading = false;
                match result {
                    Ok(_) => {
                        self.teardown_monitor();
                        self.job_id = Some(job_id);
                        self.job = None;
                        self.job_failed = None;
                        self.report = None;
                        self.results_error = None;
                        self.channel_lost = false;
                        self.set_view(View::Dashboard);
                        self.attach_monitor();
                    }
                    Err(err) => self.notice = Some(err.to_string()),
                }
            }
            AppMsg::ReportRefreshed(result) => {
                self.refreshing = false;
                match result {
                    // Refresh replaces the report wholesale; nothing merges.
                    Ok(report) => {
                        self.report = Some(*report);
                        self.results_error = None;
                    }
                    Err(err) => self.results_error = Some(err.to_string()),
                }
            }
            AppMsg::ChatReply { session, reply } => {
                if self.session.is_none() {
                    self.session = session;
                }
                self.transcript.push_assistant(reply);
                self.reveal = 0;
                self.waiting_reply = false;
            }
        }
    }
}

async fn next_monitor(
    rx: &mut Option<mpsc::UnboundedReceiver<MonitorEvent>>,
) -> Option<MonitorEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
