use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers};
use rc_control::{ControlKey, KeyEvent, KeySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Control(KeyEvent),
    Quit,
    Ignored,
}

/// Translate a terminal key event. Arrows and WASD steer, `q`, `Esc` and
/// `Ctrl-C` quit, everything else is ignored.
pub fn map_key(event: &TermKeyEvent) -> Input {
    let pressed = match event.kind {
        KeyEventKind::Press | KeyEventKind::Repeat => true,
        KeyEventKind::Release => false,
    };
    let control = |key, source| Input::Control(KeyEvent { key, source, pressed });

    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => quit(pressed),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => quit(pressed),
        KeyCode::Up => control(ControlKey::Up, KeySource::Arrow),
        KeyCode::Down => control(ControlKey::Down, KeySource::Arrow),
        KeyCode::Left => control(ControlKey::Left, KeySource::Arrow),
        KeyCode::Right => control(ControlKey::Right, KeySource::Arrow),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' => control(ControlKey::Up, KeySource::Letter),
            's' => control(ControlKey::Down, KeySource::Letter),
            'a' => control(ControlKey::Left, KeySource::Letter),
            'd' => control(ControlKey::Right, KeySource::Letter),
            _ => Input::Ignored,
        },
        _ => Input::Ignored,
    }
}

fn quit(pressed: bool) -> Input {
    if pressed {
        Input::Quit
    } else {
        Input::Ignored
    }
}

/// Infers key releases on terminals that only report presses.
///
/// Holding a key makes the terminal auto-repeat it; a key that has not been
/// reported for `timeout` is treated as released. The first repeat comes
/// after the keyboard's repeat delay, so until then `first_repeat` applies.
#[derive(Debug)]
pub struct HoldTimer {
    first_repeat: Duration,
    timeout: Duration,
    held: HashMap<(ControlKey, KeySource), Held>,
}

#[derive(Debug, Clone, Copy)]
struct Held {
    last_seen: Instant,
    repeated: bool,
}

impl HoldTimer {
    pub fn new(first_repeat: Duration, timeout: Duration) -> Self {
        Self {
            first_repeat,
            timeout,
            held: HashMap::new(),
        }
    }

    pub fn refresh(&mut self, key: ControlKey, source: KeySource, now: Instant) {
        self.held
            .entry((key, source))
            .and_modify(|held| {
                held.last_seen = now;
                held.repeated = true;
            })
            .or_insert(Held {
                last_seen: now,
                repeated: false,
            });
    }

    pub fn forget(&mut self, key: ControlKey, source: KeySource) {
        self.held.remove(&(key, source));
    }

    fn deadline(&self, held: &Held) -> Instant {
        let wait = if held.repeated {
            self.timeout
        } else {
            self.first_repeat
        };
        held.last_seen + wait
    }

    /// Release events for every key that went quiet, oldest first.
    pub fn expired(&mut self, now: Instant) -> Vec<KeyEvent> {
        let mut expired: Vec<_> = self
            .held
            .iter()
            .filter(|(_, held)| self.deadline(held) <= now)
            .map(|(&slot, held)| (held.last_seen, slot))
            .collect();
        expired.sort();

        expired
            .into_iter()
            .map(|(_, (key, source))| {
                self.held.remove(&(key, source));
                KeyEvent::release(key, source)
            })
            .collect()
    }

    /// When the next key would expire, if any is held.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.held.values().map(|held| self.deadline(held)).min()
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;

    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> TermKeyEvent {
        TermKeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn arrows_and_wasd_map_to_the_same_keys() {
        assert_eq!(
            map_key(&key(KeyCode::Up, KeyEventKind::Press)),
            Input::Control(KeyEvent::press(ControlKey::Up, KeySource::Arrow))
        );
        assert_eq!(
            map_key(&key(KeyCode::Char('W'), KeyEventKind::Press)),
            Input::Control(KeyEvent::press(ControlKey::Up, KeySource::Letter))
        );
        assert_eq!(
            map_key(&key(KeyCode::Char('d'), KeyEventKind::Release)),
            Input::Control(KeyEvent::release(ControlKey::Right, KeySource::Letter))
        );
        assert_eq!(
            map_key(&key(KeyCode::Left, KeyEventKind::Repeat)),
            Input::Control(KeyEvent::press(ControlKey::Left, KeySource::Arrow))
        );
    }

    #[test]
    fn quit_keys_fire_on_press_only() {
        assert_eq!(map_key(&key(KeyCode::Char('q'), KeyEventKind::Press)), Input::Quit);
        assert_eq!(map_key(&key(KeyCode::Esc, KeyEventKind::Press)), Input::Quit);
        assert_eq!(map_key(&key(KeyCode::Esc, KeyEventKind::Release)), Input::Ignored);

        let mut ctrl_c = key(KeyCode::Char('c'), KeyEventKind::Press);
        ctrl_c.modifiers = KeyModifiers::CONTROL;
        assert_eq!(map_key(&ctrl_c), Input::Quit);
    }

    #[test]
    fn other_keys_are_ignored() {
        assert_eq!(map_key(&key(KeyCode::Char('c'), KeyEventKind::Press)), Input::Ignored);
        assert_eq!(map_key(&key(KeyCode::Enter, KeyEventKind::Press)), Input::Ignored);
        assert_eq!(map_key(&key(KeyCode::F(1), KeyEventKind::Press)), Input::Ignored);
    }

    #[test]
    fn quiet_keys_expire_in_order() {
        let start = Instant::now();
        let mut hold = HoldTimer::new(Duration::from_millis(100), Duration::from_millis(100));
        hold.refresh(ControlKey::Up, KeySource::Arrow, start);
        hold.refresh(ControlKey::Left, KeySource::Letter, start + Duration::from_millis(30));

        assert_eq!(hold.next_deadline(), Some(start + Duration::from_millis(100)));
        assert!(hold.expired(start + Duration::from_millis(50)).is_empty());

        // Auto-repeat keeps Up alive.
        hold.refresh(ControlKey::Up, KeySource::Arrow, start + Duration::from_millis(90));
        assert_eq!(
            hold.expired(start + Duration::from_millis(140)),
            vec![KeyEvent::release(ControlKey::Left, KeySource::Letter)]
        );
        assert_eq!(
            hold.expired(start + Duration::from_millis(200)),
            vec![KeyEvent::release(ControlKey::Up, KeySource::Arrow)]
        );
        assert_eq!(hold.next_deadline(), None);
    }

    #[test]
    fn clear_forgets_everything() {
        let now = Instant::now();
        let mut hold = HoldTimer::new(Duration::from_millis(10), Duration::from_millis(10));
        hold.refresh(ControlKey::Down, KeySource::Arrow, now);
        hold.clear();
        assert!(hold.expired(now + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn reported_release_cancels_the_timer() {
        let now = Instant::now();
        let mut hold = HoldTimer::new(Duration::from_millis(10), Duration::from_millis(10));
        hold.refresh(ControlKey::Right, KeySource::Letter, now);
        hold.refresh(ControlKey::Right, KeySource::Arrow, now);
        hold.forget(ControlKey::Right, KeySource::Letter);
        assert_eq!(
            hold.expired(now + Duration::from_millis(20)),
            vec![KeyEvent::release(ControlKey::Right, KeySource::Arrow)]
        );
    }

    #[test]
    fn first_repeat_gets_the_longer_timeout() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let mut hold = HoldTimer::new(ms(1000), ms(600));
        hold.refresh(ControlKey::Up, KeySource::Arrow, start);

        // A stock X server starts repeating after 660 ms.
        assert_eq!(hold.next_deadline(), Some(start + ms(1000)));
        assert!(hold.expired(start + ms(600)).is_empty());
        hold.refresh(ControlKey::Up, KeySource::Arrow, start + ms(660));

        // Repeats every 40 ms from here on; the short timeout now applies.
        assert_eq!(hold.next_deadline(), Some(start + ms(1260)));
        assert!(hold.expired(start + ms(1000)).is_empty());
        assert_eq!(
            hold.expired(start + ms(1260)),
            vec![KeyEvent::release(ControlKey::Up, KeySource::Arrow)]
        );
    }

    #[test]
    fn tap_without_repeat_releases_after_first_timeout() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let mut hold = HoldTimer::new(ms(1000), ms(600));
        hold.refresh(ControlKey::Left, KeySource::Letter, start);
        assert!(hold.expired(start + ms(999)).is_empty());
        assert_eq!(
            hold.expired(start + ms(1000)),
            vec![KeyEvent::release(ControlKey::Left, KeySource::Letter)]
        );
    }
}
