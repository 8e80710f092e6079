use std::collections::VecDeque;
use std::f64::consts::FRAC_PI_4;

use ratatui::prelude::*;
use ratatui::symbols::{border, Marker};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use rc_control::{Direction as Heading, KeyState, MotorCommand};

/// Arrow outline in screen units (y grows downwards), pointing forward.
const ARROW: [(f64, f64); 8] = [
    (0.0, -2.0),
    (2.0, 0.0),
    (1.0, 0.0),
    (1.0, 2.0),
    (-1.0, 2.0),
    (-1.0, 0.0),
    (-2.0, 0.0),
    (0.0, -2.0),
];

/// Half-extent of the smaller canvas axis; the arrow spans 4 units.
const CANVAS_HALF: f64 = 3.0;

/// Half-side of the filled square shown while stopped.
const STOPPED_HALF: f64 = 1.0;

/// Heights of the scan lines that fill the stopped square. Spaced at half a
/// braille dot row of a canvas spanning `[-y_half, y_half]` over `height`
/// cells, so no dot row is skipped.
fn stopped_fill_rows(y_half: f64, height: u16) -> Vec<f64> {
    let step = y_half / (4.0 * f64::from(height.max(1)));
    let rows = (2.0 * STOPPED_HALF / step).ceil() as usize;
    (0..=rows)
        .map(|i| (-STOPPED_HALF + i as f64 * step).min(STOPPED_HALF))
        .collect()
}

/// Arrow outline rotated to `heading`, in canvas coordinates (y grows
/// upwards). `None` when stopped.
pub(crate) fn arrow_outline(heading: Heading) -> Option<Vec<(f64, f64)>> {
    if heading == Heading::Stopped {
        return None;
    }
    let (sin, cos) = (f64::from(heading.code()) * FRAC_PI_4).sin_cos();
    Some(
        ARROW
            .iter()
            .map(|&(x, y)| {
                let rx = x * cos - y * sin;
                let ry = x * sin + y * cos;
                (rx, -ry)
            })
            .collect(),
    )
}

pub struct ArrowWidget {
    heading: Heading,
}

impl ArrowWidget {
    pub fn new(heading: Heading) -> Self {
        Self { heading }
    }
}

impl Widget for ArrowWidget {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let title = format!(" {} {} ", self.heading.glyph(), self.heading.label());
        let block = Block::default()
            .title(title.bold())
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_set(border::PLAIN);

        // Terminal cells are about twice as tall as wide; widen the x range to
        // keep the arrow square.
        let aspect = f64::from(area.width) / 2.0 / f64::from(area.height.max(1));
        let (x_half, y_half) = if aspect >= 1.0 {
            (CANVAS_HALF * aspect, CANVAS_HALF)
        } else {
            (CANVAS_HALF, CANVAS_HALF / aspect.max(0.01))
        };

        let outline = arrow_outline(self.heading);
        Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .background_color(Color::Black)
            .x_bounds([-x_half, x_half])
            .y_bounds([-y_half, y_half])
            .paint(|ctx| match &outline {
                Some(points) => {
                    for pair in points.windows(2) {
                        ctx.draw(&CanvasLine {
                            x1: pair[0].0,
                            y1: pair[0].1,
                            x2: pair[1].0,
                            y2: pair[1].1,
                            color: Color::White,
                        });
                    }
                }
                None => {
                    for y in stopped_fill_rows(y_half, area.height) {
                        ctx.draw(&CanvasLine {
                            x1: -STOPPED_HALF,
                            y1: y,
                            x2: STOPPED_HALF,
                            y2: y,
                            color: Color::Gray,
                        });
                    }
                }
            })
            .render(area, buf);
    }
}

pub struct StatusWidget<'a> {
    pub port: &'a str,
    pub keys: KeyState,
    pub command: MotorCommand,
    pub writes: u64,
    pub recent: &'a VecDeque<String>,
    pub inferred_releases: bool,
}

fn key_span(label: &'static str, held: bool) -> Span<'static> {
    if held {
        label.black().on_yellow().bold()
    } else {
        label.dark_gray()
    }
}

fn axis_span(value: i16) -> Span<'static> {
    let text = format!("{value:>5}");
    match value.signum() {
        1 => text.green(),
        -1 => text.red(),
        _ => text.into(),
    }
}

impl Widget for StatusWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let block = Block::default()
            .title(" Link ".bold())
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_set(border::PLAIN);

        let releases = if self.inferred_releases {
            "inferred"
        } else {
            "reported"
        };

        let mut lines = vec![
            Line::from(vec!["Port: ".into(), self.port.to_string().yellow()]),
            Line::from(vec!["Key releases: ".into(), releases.into()]),
            Line::from(""),
            Line::from(vec![
                "Keys: ".into(),
                key_span(" ↑ ", self.keys.up),
                " ".into(),
                key_span(" ↓ ", self.keys.down),
                " ".into(),
                key_span(" ← ", self.keys.left),
                " ".into(),
                key_span(" → ", self.keys.right),
            ]),
            Line::from(vec!["Speed:".into(), axis_span(self.command.speed)]),
            Line::from(vec!["Turn: ".into(), axis_span(self.command.turn)]),
            Line::from(""),
            Line::from(vec![
                "Sent ".into(),
                self.writes.to_string().yellow(),
                " writes, latest:".into(),
            ]),
        ];
        lines.extend(
            self.recent
                .iter()
                .rev()
                .map(|line| Line::from(format!("  {line}").dark_gray())),
        );

        Paragraph::new(Text::from(lines))
            .block(block)
            .render(area, buf);
    }
}
