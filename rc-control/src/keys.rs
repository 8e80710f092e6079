use std::collections::BTreeSet;

/// The four logical control keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlKey {
    Up,
    Down,
    Left,
    Right,
}

/// Physical key group that produced a control key.
///
/// Arrow keys and WASD drive the same logical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeySource {
    Arrow,
    Letter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: ControlKey,
    pub source: KeySource,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(key: ControlKey, source: KeySource) -> Self {
        Self {
            key,
            source,
            pressed: true,
        }
    }

    pub fn release(key: ControlKey, source: KeySource) -> Self {
        Self {
            key,
            source,
            pressed: false,
        }
    }
}

/// Which logical keys are currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl KeyState {
    pub const fn new(up: bool, down: bool, left: bool, right: bool) -> Self {
        Self {
            up,
            down,
            left,
            right,
        }
    }

    pub fn is_held(&self, key: ControlKey) -> bool {
        match key {
            ControlKey::Up => self.up,
            ControlKey::Down => self.down,
            ControlKey::Left => self.left,
            ControlKey::Right => self.right,
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// Set of physical keys currently held down.
///
/// A logical key stays held while any of its sources is held, so releasing
/// `W` while the up arrow is still down keeps `up` set.
#[derive(Debug, Clone, Default)]
pub(crate) struct HeldKeys {
    held: BTreeSet<(ControlKey, KeySource)>,
}

impl HeldKeys {
    /// Record a press or release. Returns false when the event changes nothing,
    /// e.g. a repeated press or a release of a key that was never pressed.
    pub fn apply(&mut self, event: KeyEvent) -> bool {
        let slot = (event.key, event.source);
        if event.pressed {
            self.held.insert(slot)
        } else {
            self.held.remove(&slot)
        }
    }

    pub fn clear(&mut self) -> bool {
        let had_keys = !self.held.is_empty();
        self.held.clear();
        had_keys
    }

    pub fn state(&self) -> KeyState {
        let held = |key| {
            self.held
                .iter()
                .any(|&(held_key, _)| held_key == key)
        };
        KeyState {
            up: held(ControlKey::Up),
            down: held(ControlKey::Down),
            left: held(ControlKey::Left),
            right: held(ControlKey::Right),
        }
    }
}
