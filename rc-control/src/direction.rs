use crate::keys::KeyState;

/// Heading shown on the indicator. Compass points step clockwise from
/// forward in 45° increments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Stopped,
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

const COMPASS: [Direction; 8] = [
    Direction::N,
    Direction::NE,
    Direction::E,
    Direction::SE,
    Direction::S,
    Direction::SW,
    Direction::W,
    Direction::NW,
];

impl Direction {
    /// Integer code: -1 for stopped, 0 (forward) through 7 clockwise.
    pub fn code(self) -> i8 {
        match self {
            Direction::Stopped => -1,
            Direction::N => 0,
            Direction::NE => 1,
            Direction::E => 2,
            Direction::SE => 3,
            Direction::S => 4,
            Direction::SW => 5,
            Direction::W => 6,
            Direction::NW => 7,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Direction::Stopped),
            0..=7 => Some(COMPASS[code as usize]),
            _ => None,
        }
    }

    /// Clockwise angle from forward, `None` when stopped.
    pub fn heading_degrees(self) -> Option<u16> {
        match self.code() {
            -1 => None,
            code => Some(code as u16 * 45),
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Direction::Stopped => '■',
            Direction::N => '↑',
            Direction::NE => '↗',
            Direction::E => '→',
            Direction::SE => '↘',
            Direction::S => '↓',
            Direction::SW => '↙',
            Direction::W => '←',
            Direction::NW => '↖',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Stopped => "stopped",
            Direction::N => "forward",
            Direction::NE => "forward right",
            Direction::E => "right",
            Direction::SE => "backward right",
            Direction::S => "backward",
            Direction::SW => "backward left",
            Direction::W => "left",
            Direction::NW => "forward left",
        }
    }
}

impl From<KeyState> for Direction {
    fn from(keys: KeyState) -> Self {
        resolve(keys.up, keys.down, keys.left, keys.right)
    }
}

/// Pick the outcome for one axis: `a` alone, `b` alone, or the neutral value
/// when neither or both are held.
fn pick<T>(a: bool, b: bool, a_value: T, neutral: T, b_value: T) -> T {
    match (a, b) {
        (true, false) => a_value,
        (false, true) => b_value,
        _ => neutral,
    }
}

/// Combine the four key states into a heading.
///
/// Opposing keys cancel: up+down behaves like neither, and so does left+right.
pub fn resolve(up: bool, down: bool, left: bool, right: bool) -> Direction {
    use Direction::*;

    match (up, down) {
        (true, false) => pick(left, right, NW, N, NE),
        (false, true) => pick(left, right, SW, S, SE),
        _ => pick(left, right, W, Stopped, E),
    }
}

#[cfg(test)]
mod tests {
    use super::Direction::*;
    use super::*;

    #[test]
    fn resolves_every_key_combination() {
        // (up, down, left, right) -> direction
        let table = [
            ((false, false, false, false), Stopped),
            ((false, false, false, true), E),
            ((false, false, true, false), W),
            ((false, false, true, true), Stopped),
            ((false, true, false, false), S),
            ((false, true, false, true), SE),
            ((false, true, true, false), SW),
            ((false, true, true, true), S),
            ((true, false, false, false), N),
            ((true, false, false, true), NE),
            ((true, false, true, false), NW),
            ((true, false, true, true), N),
            ((true, true, false, false), Stopped),
            ((true, true, false, true), E),
            ((true, true, true, false), W),
            ((true, true, true, true), Stopped),
        ];
        for ((up, down, left, right), expected) in table {
            assert_eq!(
                resolve(up, down, left, right),
                expected,
                "up={up} down={down} left={left} right={right}"
            );
        }
    }

    #[test]
    fn resolve_is_pure() {
        for bits in 0u8..16 {
            let keys = KeyState::new(bits & 8 != 0, bits & 4 != 0, bits & 2 != 0, bits & 1 != 0);
            assert_eq!(Direction::from(keys), Direction::from(keys));
            assert_eq!(
                Direction::from(keys),
                resolve(keys.up, keys.down, keys.left, keys.right)
            );
        }
    }

    #[test]
    fn codes_step_clockwise_from_forward() {
        assert_eq!(Stopped.code(), -1);
        assert_eq!(N.code(), 0);
        assert_eq!(E.code(), 2);
        assert_eq!(NW.code(), 7);

        for code in -1..=7 {
            assert_eq!(Direction::from_code(code).map(Direction::code), Some(code));
        }
        assert_eq!(Direction::from_code(8), None);
        assert_eq!(Direction::from_code(-2), None);
    }

    #[test]
    fn headings_are_multiples_of_45() {
        assert_eq!(Stopped.heading_degrees(), None);
        assert_eq!(N.heading_degrees(), Some(0));
        assert_eq!(SE.heading_degrees(), Some(135));
        assert_eq!(NW.heading_degrees(), Some(315));
    }
}
