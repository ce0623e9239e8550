use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;
use tracing::warn;

use crate::data::{Dataset, Metric};
use crate::export;
use crate::range::resolve_range;
use crate::selection::Selection;

/// Output format of the headless `top` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Serialize)]
pub struct TopRow<'a> {
    pub rank: usize,
    pub country: &'a str,
    pub cca3: &'a str,
    pub population: f64,
    pub world_population_percentage: Option<f64>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct RangeReport {
    pub metric: &'static str,
    pub percentile_clamped: bool,
    pub low: Option<f64>,
    pub high: Option<f64>,
}

pub fn top_rows(selection: &Selection) -> Vec<TopRow<'_>> {
    selection
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| TopRow {
            rank: i + 1,
            country: &r.record.name,
            cca3: &r.record.code,
            population: r.value,
            world_population_percentage: r.world_share,
        })
        .collect()
}

pub fn write_top<W: Write>(selection: &Selection, dataset: &Dataset, format: OutputFormat, mut writer: W) -> Result<()> {
    match format {
        OutputFormat::Csv => export::write_csv(selection, dataset, writer),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &top_rows(selection))?;
            writeln!(writer)?;
            Ok(())
        }
    }
}

/// Range of `metric`; a missing column yields null bounds after a warning.
pub fn range_report(dataset: &Dataset, metric: Metric) -> RangeReport {
    let range = resolve_range(dataset, metric)
        .map_err(|e| warn!("{}", e))
        .ok();
    RangeReport {
        metric: metric.column_name(),
        percentile_clamped: metric.is_skewed(),
        low: range.map(|r| r.low),
        high: range.map(|r| r.high),
    }
}
