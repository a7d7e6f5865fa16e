//! The client event loop.
//!
//! One task owns every piece of session state. Channel events, keystrokes,
//! and log-poll results are funneled into a single [`ClientEvent`] stream
//! and folded in strictly the order they arrive, so a racing master update
//! and cell update can never interleave mid-render.

pub mod tui;

use std::io::{self, Stdout};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use pit_proto::fields::{self, ColumnSpec, FieldKind};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::intent::IntentDispatcher;
use crate::logs::{LogView, PollResult};
use crate::state::prefs;
use crate::state::{ClientState, MasterKind};
use crate::transport::{ChannelEvent, ChannelHandle};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// Everything the loop can wake up for.
#[derive(Debug)]
pub enum ClientEvent {
    Channel(ChannelEvent),
    Key(KeyEvent),
    Logs(PollResult),
}

/// Receivers feeding the loop. Closing all of them ends the client.
pub struct EventSources {
    pub channel: mpsc::UnboundedReceiver<ChannelEvent>,
    pub keys: mpsc::UnboundedReceiver<KeyEvent>,
    pub polls: mpsc::UnboundedReceiver<PollResult>,
}

pub struct GridClient {
    pub(crate) state: ClientState,
    pub(crate) logs: LogView,
    dispatcher: IntentDispatcher,
    /// Numeric input being typed; present only while the cursor is focused.
    pub(crate) edit_buffer: String,
    headless: bool,
    should_quit: bool,
    dirty: bool,
}

impl GridClient {
    pub fn new(state: ClientState, channel: ChannelHandle, headless: bool) -> Self {
        let dispatcher = IntentDispatcher::new(state.me.clone(), channel);
        GridClient {
            state,
            logs: LogView::default(),
            dispatcher,
            edit_buffer: String::new(),
            headless,
            should_quit: false,
            dirty: true,
        }
    }

    /// Drive the loop until quit is requested or every source is gone.
    pub async fn run(mut self, mut sources: EventSources) -> Result<(), ClientError> {
        let mut terminal = if self.headless {
            None
        } else {
            Some(setup_terminal()?)
        };

        loop {
            let event = tokio::select! {
                Some(event) = sources.channel.recv() => ClientEvent::Channel(event),
                Some(key) = sources.keys.recv() => ClientEvent::Key(key),
                Some(outcome) = sources.polls.recv() => ClientEvent::Logs(outcome),
                else => break,
            };
            self.handle_event(event);
            if self.should_quit {
                break;
            }
            if self.dirty {
                if let Some(terminal) = terminal.as_mut() {
                    terminal.draw(|frame| tui::render(frame, &self))?;
                }
                self.dirty = false;
            }
        }

        if let Some(terminal) = terminal.take() {
            teardown_terminal(terminal)?;
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Channel(event) => self.handle_channel_event(event),
            ClientEvent::Key(key) => self.handle_key(key),
            ClientEvent::Logs(outcome) => {
                self.logs.apply(outcome);
                self.dirty = true;
            }
        }
    }

    fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                self.state.connected = true;
                debug!("floor connection established");
            }
            ChannelEvent::Disconnected => {
                self.state.connected = false;
                warn!("floor connection lost; showing last known state");
            }
            ChannelEvent::Message(msg) => self.state.apply(msg),
        }
        self.dirty = true;
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.state.selection.focused {
            self.handle_edit_key(key);
        } else {
            self.handle_nav_key(key);
        }
        self.dirty = true;
    }

    /// Keys while the numeric edit buffer owns the keyboard.
    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.stop_editing(),
            KeyCode::Enter => {
                let symbol = self.state.selection.symbol.clone();
                if let Some(column) = self.selected_column() {
                    // An unparsable buffer is refused by the dispatcher and
                    // stays on screen for correction.
                    if self.dispatcher.commit_edit(&symbol, column, &self.edit_buffer) {
                        self.stop_editing();
                    }
                }
            }
            KeyCode::Backspace => {
                self.edit_buffer.pop();
            }
            // Input-time validation: only numeric characters enter the buffer.
            KeyCode::Char(ch) if ch.is_ascii_digit() || ch == '.' || ch == '-' => {
                self.edit_buffer.push(ch);
            }
            _ => {}
        }
    }

    fn handle_nav_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Left if ctrl => self.move_column(-1),
            KeyCode::Right if ctrl => self.move_column(1),
            KeyCode::Up if ctrl => self.move_symbol(-1),
            KeyCode::Down if ctrl => self.move_symbol(1),
            KeyCode::Left | KeyCode::BackTab => self.state.select_left(),
            KeyCode::Right | KeyCode::Tab => self.state.select_right(),
            KeyCode::Up => self.state.select_up(),
            KeyCode::Down => self.state.select_down(),
            KeyCode::Char('m') => self
                .dispatcher
                .toggle_master(&mut self.state.master, MasterKind::Maker),
            KeyCode::Char('t') => self
                .dispatcher
                .toggle_master(&mut self.state.master, MasterKind::Taker),
            KeyCode::Char('o') => self.logs.toggle_override_filter(),
            KeyCode::Char('s') => self.logs.cycle_symbol(),
            KeyCode::Char('f') => self.logs.cycle_field(),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_cell(),
            KeyCode::Char(ch) if ch.is_ascii_digit() || ch == '.' || ch == '-' => {
                self.start_editing(Some(ch));
            }
            _ => {}
        }
    }

    /// Enter or toggle the selected cell, depending on its kind.
    fn activate_cell(&mut self) {
        let symbol = self.state.selection.symbol.clone();
        let Some(column) = self.selected_column() else {
            return;
        };
        match column.kind {
            FieldKind::Toggle => {
                self.dispatcher.toggle_cell(&self.state, &symbol, column);
            }
            FieldKind::Numeric => self.start_editing(None),
        }
    }

    /// Open the edit buffer on the selected cell, seeded either with the
    /// first typed character or this user's current override.
    fn start_editing(&mut self, first: Option<char>) {
        let Some(column) = self.selected_column() else {
            return;
        };
        if column.kind != FieldKind::Numeric || !column.editable {
            return;
        }
        self.edit_buffer = match first {
            Some(ch) => ch.to_string(),
            None => {
                let cell = self
                    .state
                    .grid
                    .cell(&self.state.selection.symbol, column.base_field());
                cell.overrides
                    .get(&self.state.me)
                    .map(|entry| entry.value.to_string())
                    .unwrap_or_default()
            }
        };
        self.state.selection.focused = true;
    }

    fn stop_editing(&mut self) {
        self.edit_buffer.clear();
        self.state.selection.focused = false;
    }

    /// Ask the floor to shift the selected column by `delta` slots. The
    /// active order changes only when the floor echoes the new permutation.
    fn move_column(&mut self, delta: isize) {
        let order = self.state.prefs.columns();
        let Some(from) = order
            .iter()
            .position(|id| *id == self.state.selection.column)
        else {
            return;
        };
        let Some(to) = shift(from, delta, order.len()) else {
            return;
        };
        self.dispatcher
            .send_column_order(prefs::moved(order, from, to));
    }

    fn move_symbol(&mut self, delta: isize) {
        let order = self.state.prefs.symbols();
        let Some(from) = order.iter().position(|s| *s == self.state.selection.symbol) else {
            return;
        };
        let Some(to) = shift(from, delta, order.len()) else {
            return;
        };
        self.dispatcher
            .send_symbol_order(prefs::moved(order, from, to));
    }

    fn selected_column(&self) -> Option<&'static ColumnSpec> {
        fields::column(&self.state.selection.column)
    }
}

/// Target index for a move, or None when it would fall off either end.
fn shift(from: usize, delta: isize, len: usize) -> Option<usize> {
    let to = from.checked_add_signed(delta)?;
    (to < len).then_some(to)
}

/// Read terminal input on a dedicated thread and forward key presses into
/// the loop. The thread ends once the receiver is gone.
pub fn spawn_input_thread() -> mpsc::UnboundedReceiver<KeyEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || loop {
        match crossterm::event::read() {
            Ok(Event::Key(key)) => {
                if tx.send(key).is_err() {
                    return;
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "input thread stopping");
                return;
            }
        }
    });
    rx
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, io::Error> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn teardown_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<(), io::Error> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
