use color_eyre::eyre::{self, Context};
use color_eyre::Result;
use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event, KeyEvent, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{
    prelude::*,
    symbols::border,
    widgets::{
        block::{Position, Title},
        Block, Borders,
    },
};
use rc_control::config::InputConfig;
use rc_control::{ControlError, Controller, Indicator, Transition, Transport};
use std::{
    collections::VecDeque,
    io::{self, stdout, Stdout},
    panic,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

use crate::input::{map_key, HoldTimer, Input};

use self::widgets::{ArrowWidget, StatusWidget};

mod widgets;

const IDLE_TICK: Duration = Duration::from_millis(250);
const RECENT_LINES: usize = 6;

/// Set while the kitty keyboard protocol flags are pushed, so `restore` knows
/// to pop them.
static KEYBOARD_ENHANCED: AtomicBool = AtomicBool::new(false);

pub fn run<T: Transport>(
    controller: Controller<Indicator, T>,
    port: String,
    input: &InputConfig,
) -> Result<()> {
    let mut terminal = init()?;
    // Windows consoles report releases without the keyboard protocol.
    let hold = if cfg!(windows) || KEYBOARD_ENHANCED.load(Ordering::SeqCst) {
        None
    } else {
        info!("terminal does not report key releases, inferring them from auto-repeat");
        Some(HoldTimer::new(
            Duration::from_millis(input.first_repeat_timeout_ms),
            Duration::from_millis(input.release_timeout_ms),
        ))
    };
    let result = App::new(controller, port, hold).run(&mut terminal);
    restore()?;
    result
}

pub struct App<T> {
    controller: Controller<Indicator, T>,
    port: String,
    hold: Option<HoldTimer>,
    recent: VecDeque<String>,
    exit: bool,
}

impl<T: Transport> App<T> {
    pub fn new(controller: Controller<Indicator, T>, port: String, hold: Option<HoldTimer>) -> Self {
        Self {
            controller,
            port,
            hold,
            recent: VecDeque::with_capacity(RECENT_LINES),
            exit: false,
        }
    }

    /// runs the application's main loop until the user quits, then stops the car
    pub fn run(&mut self, terminal: &mut Tui) -> Result<()> {
        let result = self.drive(terminal);
        self.finish(result)
    }

    fn drive(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.exit {
            terminal.draw(|frame| self.render_frame(frame))?;
            self.handle_events().wrap_err("handle events failed")?;
            self.release_quiet_keys().wrap_err("releasing keys failed")?;
        }
        Ok(())
    }

    /// Stops the car however the loop ended. A failed write means the link is
    /// gone, so nothing more is sent.
    fn finish(&mut self, result: Result<()>) -> Result<()> {
        if let Err(err) = result {
            if !matches!(err.downcast_ref::<ControlError>(), Some(ControlError::Write(_))) {
                match self.controller.stop() {
                    Ok(transition) => self.record(&transition),
                    Err(stop) => warn!(error = %stop, "could not stop the car"),
                }
            }
            return Err(err);
        }
        let transition = self.controller.stop().wrap_err("stopping the car failed")?;
        self.record(&transition);
        info!(writes = self.controller.writes(), "controller stopped");
        Ok(())
    }

    fn render_frame(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.size())
    }

    fn handle_events(&mut self) -> Result<()> {
        if !event::poll(self.poll_timeout())? {
            return Ok(());
        }
        match event::read()? {
            Event::Key(key_event) => self
                .handle_key_event(key_event)
                .wrap_err_with(|| format!("handling key event failed:\n{key_event:#?}")),
            Event::FocusLost => {
                debug!("focus lost, releasing all keys");
                if let Some(hold) = &mut self.hold {
                    hold.clear();
                }
                let transition = self.controller.release_all()?;
                self.record(&transition);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_key_event(&mut self, key_event: KeyEvent) -> Result<()> {
        match map_key(&key_event) {
            Input::Quit => self.exit(),
            Input::Control(event) => {
                if let Some(hold) = &mut self.hold {
                    if event.pressed {
                        hold.refresh(event.key, event.source, Instant::now());
                    } else {
                        hold.forget(event.key, event.source);
                    }
                }
                let transition = self.controller.handle(event)?;
                self.record(&transition);
            }
            Input::Ignored => {}
        }
        Ok(())
    }

    fn release_quiet_keys(&mut self) -> Result<()> {
        let Some(hold) = &mut self.hold else {
            return Ok(());
        };
        for event in hold.expired(Instant::now()) {
            let transition = self.controller.handle(event)?;
            self.record(&transition);
        }
        Ok(())
    }

    /// Wake up in time for the next inferred release.
    fn poll_timeout(&self) -> Duration {
        self.hold
            .as_ref()
            .and_then(HoldTimer::next_deadline)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()).min(IDLE_TICK))
            .unwrap_or(IDLE_TICK)
    }

    fn record(&mut self, transition: &Transition) {
        for command in &transition.sent {
            if self.recent.len() == RECENT_LINES {
                self.recent.pop_front();
            }
            self.recent.push_back(command.to_string());
        }
    }

    fn exit(&mut self) {
        self.exit = true;
    }
}

impl<T: Transport> Widget for &App<T> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = Title::from(" RC Car Controller ".bold());
        let instructions = Title::from(Line::from(vec![
            " Drive ".into(),
            "<Arrows/WASD>".blue().bold(),
            " Quit ".into(),
            "<Q> ".blue().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL)
            .border_set(border::THICK);

        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);

        ArrowWidget::new(self.controller.direction()).render(layout[0], buf);
        StatusWidget {
            port: &self.port,
            keys: self.controller.keys(),
            command: self.controller.command(),
            writes: self.controller.writes(),
            recent: &self.recent,
            inferred_releases: self.hold.is_some(),
        }
        .render(layout[1], buf);
    }
}

/// A type alias for the terminal type used in this application
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal, asking for key release events where supported
pub fn init() -> Result<Tui> {
    install_hooks()?;
    execute!(stdout(), EnterAlternateScreen, EnableFocusChange)?;
    enable_raw_mode()?;
    if supports_keyboard_enhancement().unwrap_or(false) {
        execute!(
            stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
        KEYBOARD_ENHANCED.store(true, Ordering::SeqCst);
    }
    Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

/// Restore the terminal to its original state
pub fn restore() -> io::Result<()> {
    if KEYBOARD_ENHANCED.swap(false, Ordering::SeqCst) {
        execute!(stdout(), PopKeyboardEnhancementFlags)?;
    }
    execute!(stdout(), DisableFocusChange, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// This replaces the standard color_eyre panic and error hooks with hooks that
/// restore the terminal before printing the panic or error.
pub fn install_hooks() -> color_eyre::Result<()> {
    let hook_builder = color_eyre::config::HookBuilder::default();
    let (panic_hook, eyre_hook) = hook_builder.into_hooks();

    // convert from a color_eyre PanicHook to a standard panic hook
    let panic_hook = panic_hook.into_panic_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        panic_hook(panic_info);
    }));

    // convert from a color_eyre EyreHook to a eyre ErrorHook
    let eyre_hook = eyre_hook.into_eyre_hook();
    eyre::set_hook(Box::new(move |error| {
        let _ = restore();
        eyre_hook(error)
    }))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use color_eyre::eyre::eyre;
    use crossterm::event::{KeyCode, KeyEventKind, KeyEventState, KeyModifiers};

    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn app<T: Transport>(transport: T) -> App<T> {
        App::new(Controller::new(Indicator::default(), transport), "test".into(), None)
    }

    fn sent(app: &App<Vec<u8>>) -> String {
        String::from_utf8(app.controller.transport().clone()).unwrap()
    }

    #[test]
    fn quitting_stops_the_car() {
        let mut app = app(Vec::new());
        app.handle_key_event(press(KeyCode::Up)).unwrap();
        app.handle_key_event(press(KeyCode::Char('q'))).unwrap();
        assert!(app.exit);

        app.finish(Ok(())).unwrap();
        assert_eq!(sent(&app), "1 255 set-motor-speed\n1 0 set-motor-speed\n");
    }

    #[test]
    fn terminal_failure_still_stops_the_car() {
        let mut app = app(Vec::new());
        app.handle_key_event(press(KeyCode::Right)).unwrap();

        let err = app.finish(Err(eyre!("terminal went away"))).unwrap_err();
        assert_eq!(err.to_string(), "terminal went away");
        assert_eq!(sent(&app), "3 255 set-motor-speed\n3 0 set-motor-speed\n");
        assert_eq!(app.recent.back().map(String::as_str), Some("3 0 set-motor-speed"));
    }

    struct CountingWire {
        attempts: usize,
        fail: bool,
    }

    impl Write for CountingWire {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out"));
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_is_not_followed_by_a_stop() {
        let mut app = app(CountingWire { attempts: 0, fail: false });
        app.handle_key_event(press(KeyCode::Up)).unwrap();
        app.controller.transport_mut().fail = true;

        let result = app.handle_key_event(press(KeyCode::Left));
        let attempts = app.controller.transport().attempts;
        assert!(app.finish(result).is_err());
        assert_eq!(app.controller.transport().attempts, attempts);
    }
}
