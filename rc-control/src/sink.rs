use crate::direction::Direction;

/// Receives the heading whenever it changes.
pub trait DisplaySink {
    fn show(&mut self, direction: Direction);
}

/// Holds the heading for a UI to draw on its next frame.
#[derive(Debug, Default, Clone)]
pub struct Indicator {
    direction: Direction,
    changes: u64,
}

impl Indicator {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of headings shown so far.
    pub fn changes(&self) -> u64 {
        self.changes
    }
}

impl DisplaySink for Indicator {
    fn show(&mut self, direction: Direction) {
        self.direction = direction;
        self.changes += 1;
    }
}
