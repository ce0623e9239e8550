use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Tabs, Wrap},
};

use crate::chart::{self, format_population};
use crate::data::{CountryRecord, Dataset, Metric, Year};
use crate::map_draw::Choropleth;
use crate::range::MetricRange;
use crate::state::{AppState, Tab};

const PREVIEW_ROWS: usize = 5;

pub fn draw(f: &mut Frame, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)])
        .split(f.area());

    draw_sidebar(f, chunks[0], state);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(chunks[1]);

    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()).collect::<Vec<_>>())
        .block(Block::default().borders(Borders::ALL).title("World Population Insights"))
        .select(state.tab.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, main[0]);

    match state.tab {
        Tab::WorldMap => draw_world_map(f, main[1], state),
        Tab::TopN => draw_top_n(f, main[1], state),
        Tab::MetricRankings => draw_metric_rankings(f, main[1], state),
    }
}

fn draw_sidebar(f: &mut Frame, area: Rect, state: &AppState) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(9), Constraint::Length(7)])
        .split(area);

    let help = Paragraph::new(AppState::HELP_TEXT)
        .block(Block::default().borders(Borders::ALL).title("Navigation"))
        .wrap(Wrap { trim: true });
    f.render_widget(help, parts[0]);

    let mut lines = vec![Line::from(state.status.clone())];
    let warning = match state.tab {
        Tab::WorldMap => None,
        Tab::TopN => state.selection_warning.as_ref(),
        Tab::MetricRankings => state.metric_warning.as_ref(),
    };
    if let Some(w) = warning {
        lines.push(Line::from(Span::styled(format!("⚠ {}", w), Style::default().fg(Color::Yellow))));
    }
    let status = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true });
    f.render_widget(status, parts[1]);
}

fn fmt_cell(record: &CountryRecord, dataset: &Dataset, column: &str) -> String {
    dataset
        .column_index(column)
        .ok()
        .and_then(|i| record.number(i))
        .map(|v| format!("{}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn draw_preview(f: &mut Frame, area: Rect, dataset: &Dataset) {
    let columns = ["2022 Population", Metric::Area.column_name(), Metric::Density.column_name()];
    let header = Row::new(
        ["Country", "CCA3", "Capital"]
            .into_iter()
            .chain(columns)
            .map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))),
    );
    let rows = dataset.head(PREVIEW_ROWS).iter().map(|r| {
        let mut cells = vec![r.name.clone(), r.code.clone(), r.capital.clone()];
        cells.extend(columns.iter().map(|c| fmt_cell(r, dataset, c)));
        Row::new(cells)
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(22),
            Constraint::Length(5),
            Constraint::Percentage(20),
            Constraint::Percentage(18),
            Constraint::Percentage(15),
            Constraint::Percentage(15),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Dataset Preview"));
    f.render_widget(table, area);
}

fn draw_map_or_notice(f: &mut Frame, area: Rect, state: &AppState, title: &str, colors: &Choropleth, highlight: Option<&str>) {
    match &state.map {
        Some(map) => map.render(f, area, title, colors, highlight),
        None => {
            let txt = Paragraph::new("No world geometry loaded; set input.world_geojson to draw the map.")
                .block(Block::default().borders(Borders::ALL).title(title.to_string()))
                .wrap(Wrap { trim: true });
            f.render_widget(txt, area);
        }
    }
}

fn range_line(range: Option<&MetricRange>) -> String {
    match range {
        Some(r) => format!("Color range: {} – {}", short(r.low), short(r.high)),
        None => "Color range: n/a".to_string(),
    }
}

fn short(v: f64) -> String {
    if v.abs() >= 1_000.0 {
        format_population(v)
    } else {
        format!("{:.2}", v)
    }
}

fn draw_world_map(f: &mut Frame, area: Rect, state: &mut AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(PREVIEW_ROWS as u16 + 3), Constraint::Min(0)])
        .split(area);
    draw_preview(f, rows[0], &state.dataset);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(32)])
        .split(rows[1]);

    let selected = state.dataset.records().get(state.map_selected).cloned();
    let highlight = selected.as_ref().map(|r| r.code.as_str());
    draw_map_or_notice(
        f,
        cols[0],
        state,
        "World Population by Country (2022)",
        &state.population_colors,
        highlight,
    );

    let info_text = match &selected {
        Some(r) => format!(
            "{}\nCapital: {}\nArea (km²): {}\n2022 Population: {}\n\n{}",
            r.name,
            r.capital,
            fmt_cell(r, &state.dataset, Metric::Area.column_name()),
            fmt_cell(r, &state.dataset, "2022 Population"),
            range_line(state.population_range.as_ref()),
        ),
        None => "Dataset is empty".to_string(),
    };
    let info = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("Country"))
        .wrap(Wrap { trim: true });
    f.render_widget(info, cols[1]);
}

fn draw_top_n(f: &mut Frame, area: Rect, state: &mut AppState) {
    let detail_height = (state.selection.len() as u16 + 3).min(12);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(detail_height),
        ])
        .split(area);

    let years: Vec<Span> = Year::ALL
        .iter()
        .map(|y| {
            let style = if *y == state.year {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Span::styled(format!(" {} ", y), style)
        })
        .collect();
    let mut controls = vec![Span::raw("Year:")];
    controls.extend(years);
    controls.push(Span::raw(format!("  | {}  | Top {}  | d → {}", state.chart_kind, state.top_n,
        state.export_path().file_name().and_then(|n| n.to_str()).unwrap_or(""))));
    let controls = Paragraph::new(Line::from(controls))
        .block(Block::default().borders(Borders::ALL).title("Top N Countries by Population"));
    f.render_widget(controls, rows[0]);

    chart::render(state.chart_kind, f, rows[1], &state.selection);

    // Hover metadata: the ranked value and the world share.
    let header = Row::new(["#", "Country", "Population", "World %"].map(|h| {
        Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))
    }));
    let detail_rows = state.selection.rows.iter().enumerate().map(|(i, r)| {
        Row::new(vec![
            (i + 1).to_string(),
            r.record.name.clone(),
            format!("{:.0}", r.value),
            r.world_share.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "-".to_string()),
        ])
    });
    let table = Table::new(
        detail_rows,
        [Constraint::Length(4), Constraint::Percentage(40), Constraint::Percentage(30), Constraint::Percentage(20)],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(state.selection.column.clone()));
    f.render_widget(table, rows[2]);
}

fn draw_metric_rankings(f: &mut Frame, area: Rect, state: &mut AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(0)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(Metric::ALL.len() as u16 + 2), Constraint::Min(0)])
        .split(cols[0]);

    let items: Vec<ListItem> = Metric::ALL
        .iter()
        .map(|m| ListItem::new(m.column_name()))
        .collect();
    let mut list_state = ListState::default();
    list_state.select(Metric::ALL.iter().position(|m| *m == state.metric));
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Metric"))
        .highlight_symbol(">> ")
        .highlight_style(Style::default().fg(Color::Red));
    f.render_stateful_widget(list, left[0], &mut list_state);

    let mut notes = vec![range_line(state.metric_range.as_ref())];
    if state.metric.is_skewed() {
        notes.push("Clamped to the 5th–95th percentile.".to_string());
    }
    let notes = Paragraph::new(notes.join("\n"))
        .block(Block::default().borders(Borders::ALL).title("Scale"))
        .wrap(Wrap { trim: true });
    f.render_widget(notes, left[1]);

    let title = format!("World Map by {}", state.metric);
    draw_map_or_notice(f, cols[1], state, &title, &state.metric_colors, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::data::fixtures;
    use crate::map_draw::tests::two_squares;
    use crossterm::event::KeyCode;
    use ratatui::{Terminal, backend::TestBackend};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn render(state: &mut AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();
        terminal.draw(|f| draw(f, state)).unwrap();
        screen(&terminal)
    }

    fn make_state(with_map: bool) -> AppState {
        let map = with_map.then(two_squares);
        AppState::new(Arc::new(fixtures::sample()), map, &DashboardConfig::default(), PathBuf::from("."))
    }

    #[test]
    fn world_map_tab_shows_preview_and_country() {
        let mut state = make_state(true);
        let text = render(&mut state);
        assert!(text.contains("Dataset Preview"));
        assert!(text.contains("Afghanistan"));
        assert!(text.contains("Capital: Kabul"));
        assert!(text.contains("World Population by Country (2022)"));
    }

    #[test]
    fn top_n_tab_lists_selection() {
        let mut state = make_state(false);
        state.handle_input(KeyCode::Char('2'));
        let text = render(&mut state);
        assert!(text.contains("Top 10 Countries by Population in 2022"));
        assert!(text.contains("2022 Population"));
        assert!(text.contains("1425887337"));
    }

    #[test]
    fn metric_tab_without_geometry_shows_notice() {
        let mut state = make_state(false);
        state.handle_input(KeyCode::Char('3'));
        state.handle_input(KeyCode::Down);
        let text = render(&mut state);
        assert!(text.contains("World Map by Density (per km²)"));
        assert!(text.contains("No world geometry loaded"));
        assert!(text.contains("percentile"));
    }
}
