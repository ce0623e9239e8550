use serde::Serialize;
use tracing::debug;

use crate::data::{Dataset, Metric};
use crate::error::MissingColumn;

/// Lower and upper bound of a choropleth color scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MetricRange {
    pub low: f64,
    pub high: f64,
}

impl MetricRange {
    /// Position of `value` on the scale, clamped to `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.high - self.low;
        if span <= 0.0 {
            return 0.5;
        }
        ((value - self.low) / span).clamp(0.0, 1.0)
    }
}

/// Linear-interpolated quantile of ascending `sorted` values.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Color range for `metric`: 5th/95th percentiles for skewed metrics,
/// exact min/max otherwise.
pub fn resolve_range(dataset: &Dataset, metric: Metric) -> Result<MetricRange, MissingColumn> {
    let column = metric.column_name();
    let mut values = dataset.values(column)?;
    if values.is_empty() {
        return Err(MissingColumn::new(column));
    }
    values.sort_by(f64::total_cmp);

    let (low, high) = if metric.is_skewed() {
        (quantile(&values, 0.05), quantile(&values, 0.95))
    } else {
        (values.first().copied(), values.last().copied())
    };
    let range = match (low, high) {
        (Some(low), Some(high)) => MetricRange { low, high },
        _ => return Err(MissingColumn::new(column)),
    };
    debug!(%metric, low = range.low, high = range.high, "resolved color range");
    Ok(range)
}
