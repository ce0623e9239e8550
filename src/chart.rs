use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::{Line as TextLine, Span},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Paragraph, Wrap,
        canvas::{Canvas, Line},
    },
};
use serde::Deserialize;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

use crate::selection::Selection;

/// How the top-N selection is drawn. Only the renderer looks at this.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Pie,
}

impl ChartKind {
    pub fn toggle(self) -> Self {
        match self {
            ChartKind::Bar => ChartKind::Pie,
            ChartKind::Pie => ChartKind::Bar,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Pie => "Pie Chart",
        })
    }
}

/// Plotly's default qualitative palette.
const PALETTE: [Color; 10] = [
    Color::Rgb(0x63, 0x6E, 0xFA),
    Color::Rgb(0xEF, 0x55, 0x3B),
    Color::Rgb(0x00, 0xCC, 0x96),
    Color::Rgb(0xAB, 0x63, 0xFA),
    Color::Rgb(0xFF, 0xA1, 0x5A),
    Color::Rgb(0x19, 0xD3, 0xF3),
    Color::Rgb(0xFF, 0x66, 0x92),
    Color::Rgb(0xB6, 0xE8, 0x80),
    Color::Rgb(0xFF, 0x97, 0xFF),
    Color::Rgb(0xFE, 0xCB, 0x52),
];

const PIE_HOLE: f64 = 0.3;

/// Short population figure for bar values and tables.
pub fn format_population(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("{:.2}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.0}", value)
    }
}

/// One pie slice; angles in radians, measured clockwise from twelve o'clock.
#[derive(Clone, Debug, PartialEq)]
pub struct Slice {
    pub label: String,
    pub share: f64,
    pub start: f64,
    pub end: f64,
    pub color: Color,
}

pub fn pie_slices(selection: &Selection) -> Vec<Slice> {
    let total = selection.total();
    if total <= 0.0 {
        return Vec::new();
    }
    let mut start = 0.0;
    selection
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let share = row.value / total;
            let end = start + share * TAU;
            let slice = Slice {
                label: row.record.name.clone(),
                share,
                start,
                end,
                color: PALETTE[i % PALETTE.len()],
            };
            start = end;
            slice
        })
        .collect()
}

pub fn render(kind: ChartKind, f: &mut Frame, area: Rect, selection: &Selection) {
    if selection.is_empty() {
        let txt = Paragraph::new(format!("No data available for {}", selection.column))
            .block(Block::default().borders(Borders::ALL).title(selection.title()))
            .wrap(Wrap { trim: true });
        f.render_widget(txt, area);
        return;
    }
    match kind {
        ChartKind::Bar => render_bar(f, area, selection),
        ChartKind::Pie => render_pie(f, area, selection),
    }
}

/// Bar width and gap for `count` bars in `inner` columns. Narrow charts drop
/// the gap so every bar still fits.
fn bar_layout(inner: u16, count: usize) -> (u16, u16) {
    let per_bar = inner / (count.max(1) as u16);
    if per_bar < 2 {
        (1, 0)
    } else {
        ((per_bar - 1).min(12), 1)
    }
}

fn render_bar(f: &mut Frame, area: Rect, selection: &Selection) {
    let rows = selection.sorted_desc();
    let bars: Vec<Bar> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Bar::default()
                .value(row.value.round() as u64)
                .text_value(format_population(row.value))
                .label(TextLine::from(row.record.name.clone()))
                .style(Style::default().fg(PALETTE[i % PALETTE.len()]))
                .value_style(Style::default().fg(Color::Black).bg(PALETTE[i % PALETTE.len()]))
        })
        .collect();

    let (bar_width, bar_gap) = bar_layout(area.width.saturating_sub(2), bars.len());

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(selection.title()))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(bar_gap);
    f.render_widget(chart, area);
}

/// Slices of at least 10% get an inline label; the legend beside the pie
/// carries percent and name for every slice.
fn render_pie(f: &mut Frame, area: Rect, selection: &Selection) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let slices = pie_slices(selection);

    // Terminal cells are about twice as tall as wide; widen x so the pie stays round.
    let cols = chunks[0].width.saturating_sub(2).max(1) as f64;
    let rows = chunks[0].height.saturating_sub(2).max(1) as f64;
    let x_half = 1.1 * cols / (2.0 * rows);

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title(selection.title()))
        .marker(Marker::Braille)
        .x_bounds([-x_half, x_half])
        .y_bounds([-1.1, 1.1])
        .paint(|ctx| {
            for slice in &slices {
                let mut angle = slice.start;
                while angle < slice.end {
                    let (x, y) = polar(angle, 1.0);
                    let (hx, hy) = polar(angle, PIE_HOLE);
                    ctx.draw(&Line { x1: hx, y1: hy, x2: x, y2: y, color: slice.color });
                    angle += 0.004;
                }
            }
            ctx.layer();
            for slice in slices.iter().filter(|s| s.share >= 0.10) {
                let (x, y) = polar((slice.start + slice.end) / 2.0, 0.65);
                ctx.print(x, y, format!("{:.1}% {}", slice.share * 100.0, slice.label));
            }
        });
    f.render_widget(canvas, chunks[0]);

    let legend: Vec<TextLine> = slices
        .iter()
        .map(|s| {
            TextLine::from(vec![
                Span::styled("■ ", Style::default().fg(s.color)),
                Span::raw(format!("{:>5.1}% {}", s.share * 100.0, s.label)),
            ])
        })
        .collect();
    let legend = Paragraph::new(legend)
        .block(Block::default().borders(Borders::ALL).title("Share"))
        .wrap(Wrap { trim: true });
    f.render_widget(legend, chunks[1]);
}

fn polar(angle: f64, radius: f64) -> (f64, f64) {
    let theta = FRAC_PI_2 - angle;
    (radius * theta.cos(), radius * theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures;
    use crate::selection::select_top_n;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn toggle_flips_between_kinds() {
        assert_eq!(ChartKind::Bar.toggle(), ChartKind::Pie);
        assert_eq!(ChartKind::Pie.toggle().to_string(), "Bar Chart");
    }

    #[test]
    fn population_figures_are_compact() {
        assert_eq!(format_population(1_425_887_337.0), "1.43B");
        assert_eq!(format_population(338_289_857.0), "338.3M");
        assert_eq!(format_population(36_469.0), "36.5K");
        assert_eq!(format_population(510.0), "510");
    }

    #[test]
    fn slices_cover_the_full_circle() {
        let ds = fixtures::sample();
        let sel = select_top_n(&ds, 2022, 5).unwrap();
        let slices = pie_slices(&sel);
        assert_eq!(slices.len(), 5);
        assert_eq!(slices[0].label, "China");
        assert_eq!(slices[0].start, 0.0);
        assert!((slices.iter().map(|s| s.share).sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((slices[4].end - TAU).abs() < 1e-9);
        assert!(slices.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn fifty_bars_fit_narrow_charts() {
        assert_eq!(bar_layout(78, 50), (1, 0));
        assert!(bar_layout(78, 50).0 as usize * 50 <= 78);
        assert_eq!(bar_layout(98, 5), (12, 1));
        assert_eq!(bar_layout(10, 5), (1, 1));
        assert_eq!(bar_layout(0, 0), (1, 0));
    }

    #[test]
    fn bar_chart_shows_title() {
        let ds = fixtures::sample();
        let sel = select_top_n(&ds, 2022, 5).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal
            .draw(|f| render(ChartKind::Bar, f, f.area(), &sel))
            .unwrap();
        assert!(screen(&terminal).contains("Top 5 Countries by Population in 2022"));
    }

    #[test]
    fn pie_chart_lists_shares() {
        let ds = fixtures::sample();
        let sel = select_top_n(&ds, 2022, 5).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal
            .draw(|f| render(ChartKind::Pie, f, f.area(), &sel))
            .unwrap();
        let text = screen(&terminal);
        assert!(text.contains("Share"));
        assert!(text.contains("China"));
        // below the inline-label cutoff, so only the legend names it
        assert!(pie_slices(&sel)[4].share < 0.10);
        assert!(text.contains("6.4% Pakistan"));
    }

    #[test]
    fn empty_selection_renders_notice() {
        let sel = Selection::empty(1969, 10);
        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        terminal
            .draw(|f| render(ChartKind::Pie, f, f.area(), &sel))
            .unwrap();
        assert!(screen(&terminal).contains("No data available for 1969 Population"));
    }
}
