use anyhow::{Context, Result};
use geo::{BoundingRect, Contains, Geometry, MultiPolygon, Point, Polygon, Rect};
use geojson::GeoJson;
use ratatui::{
    Frame,
    layout::Rect as TuiRect,
    style::Color,
    symbols::Marker,
    widgets::{
        Block, Borders,
        canvas::{Canvas, Line, Points},
    },
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::data::Dataset;
use crate::range::MetricRange;

/// Columns × rows of the sampling grid used to fill country shapes.
const FILL_GRID: (usize, usize) = (360, 180);

const NO_DATA: Color = Color::DarkGray;

/// Shoelace area, planar approximation.
fn poly_area(poly: &Polygon<f64>) -> f64 {
    let coords = &poly.exterior().0;
    let mut sum = 0.0;
    for window in coords.windows(2) {
        let a = window[0];
        let b = window[1];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum * 0.5).abs()
}

/// Viridis color for `t` in `[0, 1]`.
pub fn viridis(t: f64) -> Color {
    const STOPS: [(f64, [f64; 3]); 5] = [
        (0.00, [68.0, 1.0, 84.0]),
        (0.25, [59.0, 82.0, 139.0]),
        (0.50, [33.0, 145.0, 140.0]),
        (0.75, [94.0, 201.0, 98.0]),
        (1.00, [253.0, 231.0, 37.0]),
    ];
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    for pair in STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let k = (t - t0) / (t1 - t0);
            let mix = |i: usize| (c0[i] + (c1[i] - c0[i]) * k).round() as u8;
            return Color::Rgb(mix(0), mix(1), mix(2));
        }
    }
    Color::Rgb(253, 231, 37)
}

/// One country outline plus the grid points that fall inside it.
pub struct MapFeature {
    pub name: String,
    pub code: String,
    shape: MultiPolygon<f64>,
    fill: Vec<(f64, f64)>,
}

/// Which dataset column links a row to a map feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKey {
    Code,
    Name,
}

/// Per-country colors for one metric.
#[derive(Clone, Debug)]
pub struct Choropleth {
    join: JoinKey,
    colors: HashMap<String, Color>,
}

impl Choropleth {
    pub fn empty(join: JoinKey) -> Self {
        Self { join, colors: HashMap::new() }
    }

    pub fn build(dataset: &Dataset, column: &str, range: &MetricRange, join: JoinKey) -> Self {
        let Ok(idx) = dataset.column_index(column) else {
            return Self::empty(join);
        };
        let colors = dataset
            .records()
            .iter()
            .filter_map(|r| {
                let value = r.number(idx)?;
                let key = match join {
                    JoinKey::Code => r.code.to_uppercase(),
                    JoinKey::Name => r.name.to_lowercase(),
                };
                if key.is_empty() {
                    return None;
                }
                Some((key, viridis(range.normalize(value))))
            })
            .collect();
        Self { join, colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color_of(&self, feature: &MapFeature) -> Option<Color> {
        match self.join {
            JoinKey::Code => self.colors.get(&feature.code.to_uppercase()).copied(),
            JoinKey::Name => self.colors.get(&feature.name.to_lowercase()).copied(),
        }
    }
}

/// World geometry prepared for drawing a choropleth on a braille canvas.
pub struct MapView {
    items: Vec<MapFeature>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// First usable value among `keys`. Natural Earth writes `-99` for unknown codes.
fn string_property(props: Option<&geojson::JsonObject>, keys: &[&str]) -> String {
    props
        .and_then(|p| {
            keys.iter().find_map(|k| {
                p.get(*k)
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|v| !v.is_empty() && *v != "-99")
            })
        })
        .unwrap_or("")
        .to_string()
}

impl MapView {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path)
            .with_context(|| format!("Failed to read GeoJSON file: {:?}", path))?;
        let raw = GeoJson::from_str(&txt).context("Failed to parse GeoJSON")?;
        let view = Self::new(raw)?;
        info!(features = view.feature_count(), "loaded map geometry from {:?}", path);
        Ok(view)
    }

    pub fn new(raw: GeoJson) -> Result<Self> {
        let mut shapes = Vec::new();

        if let GeoJson::FeatureCollection(fc) = raw {
            for feature in fc.features {
                let props = feature.properties.as_ref();
                let name = string_property(props, &["ADMIN", "NAME", "name"]);
                let code = string_property(props, &["ISO_A3", "ADM0_A3", "iso_a3", "id"]);

                if let Some(gj) = feature.geometry {
                    let geom: Geometry<f64> = gj
                        .value
                        .try_into()
                        .with_context(|| format!("Invalid geometry for feature '{}'", name))?;
                    let mut mp = match geom {
                        Geometry::Polygon(p) => p.into(),
                        Geometry::MultiPolygon(m) => m,
                        _ => continue,
                    };

                    // Drop slivers next to a much larger main landmass.
                    if mp.0.len() > 1 {
                        let areas: Vec<f64> = mp.0.iter().map(poly_area).collect();
                        let max_area = areas.iter().cloned().fold(0.0, f64::max);
                        let threshold = max_area * 0.20;
                        let kept: Vec<Polygon<f64>> = mp
                            .0
                            .iter()
                            .zip(areas)
                            .filter(|(_, area)| *area >= threshold)
                            .map(|(poly, _)| poly.clone())
                            .collect();
                        if !kept.is_empty() {
                            mp = MultiPolygon(kept);
                        }
                    }

                    shapes.push((name, code, mp));
                }
            }
        }

        let (mut minx, mut miny, mut maxx, mut maxy) =
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (_, _, mp) in &shapes {
            if let Some(r) = mp.bounding_rect() {
                minx = minx.min(r.min().x);
                miny = miny.min(r.min().y);
                maxx = maxx.max(r.max().x);
                maxy = maxy.max(r.max().y);
            }
        }
        if !minx.is_finite() {
            (minx, miny, maxx, maxy) = (-180.0, -90.0, 180.0, 90.0);
        }

        let step_x = (maxx - minx) / FILL_GRID.0 as f64;
        let step_y = (maxy - miny) / FILL_GRID.1 as f64;
        let items = shapes
            .into_iter()
            .map(|(name, code, shape)| {
                let fill = shape
                    .bounding_rect()
                    .map(|bbox| sample_inside(&shape, &bbox, [minx, miny], [step_x, step_y]))
                    .unwrap_or_default();
                MapFeature { name, code, shape, fill }
            })
            .collect::<Vec<_>>();
        debug!(features = items.len(), "prepared map fill");

        Ok(Self { items, x_bounds: [minx, maxx], y_bounds: [miny, maxy] })
    }

    pub fn feature_count(&self) -> usize {
        self.items.len()
    }

    pub fn features(&self) -> &[MapFeature] {
        &self.items
    }

    /// Fills every country with its choropleth color, outlines all borders,
    /// then outlines `highlight` (matched by code or name) in red.
    pub fn render(
        &self,
        f: &mut Frame,
        area: TuiRect,
        title: &str,
        colors: &Choropleth,
        highlight: Option<&str>,
    ) {
        let canvas = Canvas::default()
            .block(Block::default().title(title.to_string()).borders(Borders::ALL))
            .marker(Marker::Braille)
            .x_bounds(self.x_bounds)
            .y_bounds(self.y_bounds)
            .paint(|ctx| {
                for feature in &self.items {
                    let color = colors.color_of(feature).unwrap_or(NO_DATA);
                    ctx.draw(&Points { coords: &feature.fill, color });
                }
                ctx.layer();
                for feature in &self.items {
                    draw_outline(ctx, &feature.shape, Color::Gray);
                }
                if let Some(sel) = highlight {
                    for feature in &self.items {
                        if feature.code.eq_ignore_ascii_case(sel) || feature.name.eq_ignore_ascii_case(sel) {
                            draw_outline(ctx, &feature.shape, Color::Red);
                        }
                    }
                }
            });
        f.render_widget(canvas, area);
    }
}

fn sample_inside(shape: &MultiPolygon<f64>, bbox: &Rect<f64>, origin: [f64; 2], step: [f64; 2]) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    if step[0] <= 0.0 || step[1] <= 0.0 {
        return points;
    }
    let col0 = ((bbox.min().x - origin[0]) / step[0]).floor().max(0.0) as usize;
    let col1 = ((bbox.max().x - origin[0]) / step[0]).ceil() as usize;
    let row0 = ((bbox.min().y - origin[1]) / step[1]).floor().max(0.0) as usize;
    let row1 = ((bbox.max().y - origin[1]) / step[1]).ceil() as usize;
    for row in row0..=row1 {
        let y = origin[1] + (row as f64 + 0.5) * step[1];
        for col in col0..=col1 {
            let x = origin[0] + (col as f64 + 0.5) * step[0];
            if shape.contains(&Point::new(x, y)) {
                points.push((x, y));
            }
        }
    }
    points
}

fn draw_outline(ctx: &mut ratatui::widgets::canvas::Context, shape: &MultiPolygon<f64>, color: Color) {
    for poly in &shape.0 {
        for window in poly.exterior().0.windows(2) {
            let a = window[0];
            let b = window[1];
            ctx.draw(&Line { x1: a.x, y1: a.y, x2: b.x, y2: b.y, color });
        }
    }
}
