pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod map_draw;
pub mod range;
pub mod report;
pub mod selection;
pub mod state;
pub mod ui;

pub use data::{CountryRecord, Dataset, Metric, Year};
pub use error::MissingColumn;
pub use range::{MetricRange, resolve_range};
pub use selection::{Selection, select_top_n};
