use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::color::Color as AppColor;
use crate::region::{Pair, Region};
use crate::trim::{TrimWindow, MAX_SPAN};

const PER_ROW: usize = 8;
const SWATCH_WIDTH: usize = 9;

fn to_color(c: &AppColor) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

fn text_on(c: &AppColor) -> Color {
    to_color(&c.readable_text())
}

/// The active swatches, eight per row, each labelled with its hex code.
/// Highlights the currently selected swatch.
pub struct PaletteWidget<'a> {
    pairs: &'a [Pair],
    reserve: usize,
    target: usize,
    selected: Option<usize>,
}

impl<'a> PaletteWidget<'a> {
    pub fn new(pairs: &'a [Pair], reserve: usize, target: usize, selected: Option<usize>) -> Self {
        Self {
            pairs,
            reserve,
            target,
            selected,
        }
    }

    /// Rows needed to draw `count` swatches, borders included.
    pub fn height(count: usize) -> u16 {
        let rows = count.div_ceil(PER_ROW).max(1);
        (rows * 3 + 3) as u16
    }
}

fn build_swatch_row(pairs: &[Pair], start: usize, selected: Option<usize>) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for (offset, pair) in pairs.iter().enumerate() {
        let i = start + offset;
        let c = &pair.color;
        let mut style = Style::default().bg(to_color(c)).fg(text_on(c));
        if selected == Some(i) {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        spans.push(Span::styled(
            format!("{:^width$}", c.to_hex(), width = SWATCH_WIDTH),
            style,
        ));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn build_index_row(count: usize, start: usize, selected: Option<usize>) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for i in start..start + count {
        let style = if selected == Some(i) {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(
            format!("{:^width$}", i + 1, width = SWATCH_WIDTH),
            style,
        ));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn describe_region(region: &Region) -> String {
    if *region == Region::CENTER {
        "center".to_string()
    } else {
        format!("({:.2}, {:.2})", region.x, region.y)
    }
}

impl Widget for PaletteWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(
            "Palette  {} shown / {} wanted / {} in reserve",
            self.pairs.len(),
            self.target,
            self.reserve
        );
        let block = Block::bordered().title(title);
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines = Vec::new();
        if self.pairs.is_empty() {
            lines.push(Line::from("  No colors yet. Press r to extract."));
        }
        for (row, chunk) in self.pairs.chunks(PER_ROW).enumerate() {
            let start = row * PER_ROW;
            lines.push(build_swatch_row(chunk, start, self.selected));
            lines.push(build_index_row(chunk.len(), start, self.selected));
            lines.push(Line::from(""));
        }

        if let Some(pair) = self.selected.and_then(|i| self.pairs.get(i)) {
            let c = pair.color;
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled("      ", Style::default().bg(to_color(&c))),
                Span::raw(format!(
                    "  {}  rgb({}, {}, {})  at {}",
                    c.to_hex(),
                    c.r,
                    c.g,
                    c.b,
                    describe_region(&pair.region)
                )),
            ]));
        }

        Paragraph::new(lines).render(inner, buf);
    }
}

/// Manually picked colors plus the picker crosshair position.
pub struct PickedWidget<'a> {
    picked: &'a [AppColor],
    cursor: Option<Region>,
}

impl<'a> PickedWidget<'a> {
    pub fn new(picked: &'a [AppColor], cursor: Option<Region>) -> Self {
        Self { picked, cursor }
    }
}

impl Widget for PickedWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered().title("Picked");
        let inner = block.inner(area);
        block.render(area, buf);

        let mut swatches = vec![Span::raw("  ")];
        if self.picked.is_empty() {
            swatches.push(Span::styled(
                "none",
                Style::default().fg(Color::DarkGray),
            ));
        }
        for c in self.picked {
            swatches.push(Span::styled(
                format!(" {} ", c.to_hex()),
                Style::default().bg(to_color(c)).fg(text_on(c)),
            ));
            swatches.push(Span::raw(" "));
        }

        let cursor = match self.cursor {
            Some(at) => format!("  crosshair at ({:.2}, {:.2})  [h j k l] move  [p] pick", at.x, at.y),
            None => "  no image loaded for picking".to_string(),
        };

        Paragraph::new(vec![Line::from(swatches), Line::from(cursor)]).render(inner, buf);
    }
}

/// The video trim window as a bar over the clip's duration.
pub struct TrimWidget<'a> {
    trim: &'a TrimWindow,
}

impl<'a> TrimWidget<'a> {
    pub fn new(trim: &'a TrimWindow) -> Self {
        Self { trim }
    }
}

fn trim_bar(trim: &TrimWindow, width: usize) -> String {
    if !trim.has_duration() || width == 0 {
        return "-".repeat(width);
    }
    let cell = |t: f64| ((t / trim.duration()) * width as f64).round() as usize;
    let (from, to) = (cell(trim.start()), cell(trim.end()).max(cell(trim.start()) + 1));
    (0..width)
        .map(|i| if i >= from && i < to { '=' } else { '-' })
        .collect()
}

impl Widget for TrimWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered().title(format!("Trim (max {MAX_SPAN:.0}s)"));
        let inner = block.inner(area);
        block.render(area, buf);

        let t = self.trim;
        let summary = if t.has_duration() {
            format!(
                "  start {:.1}s  end {:.1}s  segment {:.1}s / {:.0}s  of {:.1}s",
                t.start(),
                t.end(),
                t.end() - t.start(),
                MAX_SPAN,
                t.duration()
            )
        } else {
            "  duration unknown".to_string()
        };
        let bar_width = (inner.width as usize).saturating_sub(4);
        let lines = vec![
            Line::from(summary),
            Line::from(Span::styled(
                format!("  {}", trim_bar(t, bar_width)),
                Style::default().fg(Color::Magenta),
            )),
        ];
        Paragraph::new(lines).render(inner, buf);
    }
}
