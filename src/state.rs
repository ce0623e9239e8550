use crossterm::event::KeyCode;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    chart::ChartKind,
    config::DashboardConfig,
    data::{Dataset, Metric, Year},
    export,
    map_draw::{Choropleth, JoinKey, MapView},
    range::{MetricRange, resolve_range},
    selection::{Selection, select_top_n},
};

pub const TOP_N_MIN: usize = 5;
pub const TOP_N_MAX: usize = 50;
pub const TOP_N_STEP: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    WorldMap,
    TopN,
    MetricRankings,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::WorldMap, Tab::TopN, Tab::MetricRankings];

    pub fn title(self) -> &'static str {
        match self {
            Tab::WorldMap => "World Map",
            Tab::TopN => "Top N by Year",
            Tab::MetricRankings => "Metric Rankings",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::WorldMap => 0,
            Tab::TopN => 1,
            Tab::MetricRankings => 2,
        }
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

/// Rounds to the slider step and keeps N within the slider bounds.
pub fn clamp_top_n(n: usize) -> usize {
    let stepped = (n + TOP_N_STEP / 2) / TOP_N_STEP * TOP_N_STEP;
    stepped.clamp(TOP_N_MIN, TOP_N_MAX)
}

pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub map: Option<MapView>,
    pub tab: Tab,
    pub year: Year,
    pub chart_kind: ChartKind,
    pub top_n: usize,
    pub metric: Metric,
    /// Row of the dataset highlighted on the world map.
    pub map_selected: usize,
    pub selection: Selection,
    pub selection_warning: Option<String>,
    pub population_range: Option<MetricRange>,
    pub population_colors: Choropleth,
    pub metric_range: Option<MetricRange>,
    pub metric_colors: Choropleth,
    pub metric_warning: Option<String>,
    pub status: String,
    export_dir: PathBuf,
}

impl AppState {
    pub const HELP_TEXT: &'static str = "\
Tab / 1-3: switch view
↑/↓: country (map) / metric
←/→: year
c: bar / pie
+/-: top N
d: download CSV
q / Esc: quit";

    pub fn new(dataset: Arc<Dataset>, map: Option<MapView>, config: &DashboardConfig, export_dir: PathBuf) -> Self {
        let year = Year::from_value(config.year).unwrap_or_else(|| {
            warn!(year = config.year, "configured year is not a census year, using 2022");
            Year::Y2022
        });
        let top_n = clamp_top_n(config.top_n);

        let (population_range, population_colors, population_warning) =
            Self::choropleth(&dataset, Metric::Population2022, JoinKey::Code);

        let status = population_warning
            .unwrap_or_else(|| format!("{} countries loaded", dataset.len()));

        let mut state = Self {
            dataset,
            map,
            tab: Tab::WorldMap,
            year,
            chart_kind: config.chart,
            top_n,
            metric: config.metric,
            map_selected: 0,
            selection: Selection::empty(year.value(), top_n),
            selection_warning: None,
            population_range,
            population_colors,
            metric_range: None,
            metric_colors: Choropleth::empty(JoinKey::Name),
            metric_warning: None,
            status,
            export_dir,
        };
        state.refresh_selection();
        state.refresh_metric();
        state
    }

    fn choropleth(dataset: &Dataset, metric: Metric, join: JoinKey) -> (Option<MetricRange>, Choropleth, Option<String>) {
        match resolve_range(dataset, metric) {
            Ok(range) => {
                let colors = Choropleth::build(dataset, metric.column_name(), &range, join);
                (Some(range), colors, None)
            }
            Err(e) => {
                warn!("{}", e);
                (None, Choropleth::empty(join), Some(e.to_string()))
            }
        }
    }

    pub fn refresh_selection(&mut self) {
        match select_top_n(&self.dataset, self.year.value(), self.top_n) {
            Ok(sel) => {
                self.selection = sel;
                self.selection_warning = None;
            }
            Err(e) => {
                warn!("{}", e);
                self.selection = Selection::empty(self.year.value(), self.top_n);
                self.selection_warning = Some(e.to_string());
            }
        }
    }

    pub fn refresh_metric(&mut self) {
        let (range, colors, warning) = Self::choropleth(&self.dataset, self.metric, JoinKey::Name);
        self.metric_range = range;
        self.metric_colors = colors;
        self.metric_warning = warning;
    }

    pub fn export_path(&self) -> PathBuf {
        self.export_dir.join(export::export_filename(self.top_n, self.year.value()))
    }

    pub fn export_selection(&mut self) {
        match export::save_selection(&self.selection, &self.dataset, &self.export_dir) {
            Ok(path) => self.status = format!("Saved {}", path.display()),
            Err(e) => {
                warn!("export failed: {:#}", e);
                self.status = format!("Export failed: {}", e);
            }
        }
    }

    fn shift_year(&mut self, forward: bool) {
        let pos = Year::ALL.iter().position(|y| *y == self.year).unwrap_or(0);
        let len = Year::ALL.len();
        let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
        self.year = Year::ALL[next];
        self.refresh_selection();
    }

    fn shift_metric(&mut self, forward: bool) {
        let pos = Metric::ALL.iter().position(|m| *m == self.metric).unwrap_or(0);
        let len = Metric::ALL.len();
        let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
        self.metric = Metric::ALL[next];
        info!(metric = %self.metric, "metric changed");
        self.refresh_metric();
    }

    fn set_top_n(&mut self, n: usize) {
        let n = clamp_top_n(n);
        if n != self.top_n {
            self.top_n = n;
            self.refresh_selection();
        }
    }

    /// Returns true when the user asked to quit.
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::Char('1') => self.tab = Tab::WorldMap,
            KeyCode::Char('2') => self.tab = Tab::TopN,
            KeyCode::Char('3') => self.tab = Tab::MetricRankings,
            _ => match (self.tab, key) {
                (Tab::WorldMap, KeyCode::Up) => self.map_selected = self.map_selected.saturating_sub(1),
                (Tab::WorldMap, KeyCode::Down) => {
                    if self.map_selected + 1 < self.dataset.len() {
                        self.map_selected += 1;
                    }
                }
                (Tab::TopN, KeyCode::Left) => self.shift_year(false),
                (Tab::TopN, KeyCode::Right) => self.shift_year(true),
                (Tab::TopN, KeyCode::Char('c')) => self.chart_kind = self.chart_kind.toggle(),
                (Tab::TopN, KeyCode::Char('+') | KeyCode::Char('=')) => self.set_top_n(self.top_n + TOP_N_STEP),
                (Tab::TopN, KeyCode::Char('-')) => self.set_top_n(self.top_n.saturating_sub(TOP_N_STEP)),
                (Tab::TopN, KeyCode::Char('d')) => self.export_selection(),
                (Tab::MetricRankings, KeyCode::Up) => self.shift_metric(false),
                (Tab::MetricRankings, KeyCode::Down) => self.shift_metric(true),
                _ => {}
            },
        }
        false
    }
}
