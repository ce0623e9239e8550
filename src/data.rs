use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::Read,
    path::Path,
    str::FromStr,
};
use tracing::{info, warn};

use crate::error::MissingColumn;

pub const COUNTRY_COLUMN: &str = "Country/Territory";
pub const CODE_COLUMN: &str = "CCA3";
pub const CAPITAL_COLUMN: &str = "Capital";
pub const WORLD_SHARE_COLUMN: &str = "World Population Percentage";

/// Name of the population column recorded for a census year.
pub fn population_column(year: u16) -> String {
    format!("{year} Population")
}

/// Census years offered by the year selector, newest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Year {
    Y2022,
    Y2020,
    Y2015,
    Y2010,
    Y2000,
    Y1990,
    Y1980,
    Y1970,
}

impl Year {
    pub const ALL: [Year; 8] = [
        Year::Y2022,
        Year::Y2020,
        Year::Y2015,
        Year::Y2010,
        Year::Y2000,
        Year::Y1990,
        Year::Y1980,
        Year::Y1970,
    ];

    pub fn value(self) -> u16 {
        match self {
            Year::Y2022 => 2022,
            Year::Y2020 => 2020,
            Year::Y2015 => 2015,
            Year::Y2010 => 2010,
            Year::Y2000 => 2000,
            Year::Y1990 => 1990,
            Year::Y1980 => 1980,
            Year::Y1970 => 1970,
        }
    }

    pub fn from_value(year: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|y| y.value() == year)
    }

    pub fn column_name(self) -> String {
        population_column(self.value())
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Metrics that can drive the ranking choropleth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    Area,
    Density,
    GrowthRate,
    WorldPopulationPercentage,
    Population2022,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Area,
        Metric::Density,
        Metric::GrowthRate,
        Metric::WorldPopulationPercentage,
        Metric::Population2022,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            Metric::Area => "Area (km²)",
            Metric::Density => "Density (per km²)",
            Metric::GrowthRate => "Growth Rate",
            Metric::WorldPopulationPercentage => WORLD_SHARE_COLUMN,
            Metric::Population2022 => "2022 Population",
        }
    }

    /// Long-tailed metrics get a percentile-clamped color range.
    pub fn is_skewed(self) -> bool {
        matches!(self, Metric::Density | Metric::GrowthRate)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace(['_', ' '], "-");
        match key.as_str() {
            "area" => Ok(Metric::Area),
            "density" => Ok(Metric::Density),
            "growth-rate" | "growth" => Ok(Metric::GrowthRate),
            "world-population-percentage" | "share" => Ok(Metric::WorldPopulationPercentage),
            "2022-population" | "population" => Ok(Metric::Population2022),
            _ => Metric::ALL
                .into_iter()
                .find(|m| m.column_name().eq_ignore_ascii_case(s.trim()))
                .ok_or_else(|| anyhow!("unknown metric '{}'", s)),
        }
    }
}

/// One row of the dataset. The raw cells are kept so exports reproduce the
/// source schema exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct CountryRecord {
    pub name: String,
    pub code: String,
    pub capital: String,
    cells: Vec<String>,
}

impl CountryRecord {
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Numeric cell at `idx`. Empty, unparsable and non-finite cells are missing.
    pub fn number(&self, idx: usize) -> Option<f64> {
        let raw = self.cells.get(idx)?.trim();
        if raw.is_empty() {
            return None;
        }
        raw.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// The whole table, loaded once and only ever read afterwards.
#[derive(Clone, Debug)]
pub struct Dataset {
    headers: Vec<String>,
    columns: HashMap<String, usize>,
    records: Vec<CountryRecord>,
}

impl Dataset {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open dataset CSV: {:?}", path))?;
        let dataset = Self::from_reader(file)
            .with_context(|| format!("Failed to read dataset CSV: {:?}", path))?;
        info!(rows = dataset.len(), columns = dataset.headers.len(), "loaded dataset from {:?}", path);
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        let name_idx = *columns
            .get(COUNTRY_COLUMN)
            .ok_or_else(|| anyhow!("Column '{}' not found in CSV", COUNTRY_COLUMN))?;
        let code_idx = *columns
            .get(CODE_COLUMN)
            .ok_or_else(|| anyhow!("Column '{}' not found in CSV", CODE_COLUMN))?;
        let capital_idx = columns.get(CAPITAL_COLUMN).copied();

        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result?;
            let mut cells: Vec<String> = row.iter().map(str::to_string).collect();
            cells.resize(headers.len(), String::new());

            let name = cells[name_idx].trim().to_string();
            if name.is_empty() {
                warn!(row = records.len() + 1, "row has no country name");
            }
            let code = cells[code_idx].trim().to_string();
            let capital = capital_idx
                .map(|i| cells[i].trim().to_string())
                .unwrap_or_default();

            records.push(CountryRecord { name, code, capital, cells });
        }

        Ok(Self { headers, columns, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[CountryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, MissingColumn> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| MissingColumn::new(name))
    }

    /// All non-missing values of a numeric column, in row order.
    pub fn values(&self, name: &str) -> Result<Vec<f64>, MissingColumn> {
        let idx = self.column_index(name)?;
        Ok(self.records.iter().filter_map(|r| r.number(idx)).collect())
    }

    /// First `n` records, for the dataset preview.
    pub fn head(&self, n: usize) -> &[CountryRecord] {
        &self.records[..n.min(self.records.len())]
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Dataset;

    pub const SAMPLE_CSV: &str = "\
Rank,CCA3,Country/Territory,Capital,Continent,2022 Population,2020 Population,2015 Population,2010 Population,2000 Population,1990 Population,1980 Population,1970 Population,Area (km²),Density (per km²),Growth Rate,World Population Percentage
36,AFG,Afghanistan,Kabul,Asia,41128771,38972230,33753499,28189672,19542982,10694796,12486631,10752971,652230,63.0587,1.0257,0.52
2,CHN,China,Beijing,Asia,1425887337,1424929781,1393715448,1348191368,1264099069,1153704252,982372466,822534450,9706961,146.8933,1.0,17.88
1,IND,India,New Delhi,Asia,1417173173,1396387127,1322866505,1240613620,1059633675,870452165,696828385,557501301,3287590,431.0675,1.0068,17.77
3,USA,United States,\"Washington, D.C.\",North America,338289857,335942003,324607776,311182845,282398554,248083732,223140018,200328340,9372610,36.0935,1.0038,4.24
4,IDN,Indonesia,Jakarta,Asia,275501339,271857970,259091970,244016173,214072421,182159874,148177096,,1904569,144.6529,1.0064,3.45
5,PAK,Pakistan,Islamabad,Asia,235824862,227196741,210969298,194454498,154369924,115414069,80624057,59290872,881912,267.4018,1.0191,2.96
217,MCO,Monaco,Monaco,Europe,36469,36922,36760,33178,32465,30329,27076,24270,2,18234.5,0.9971,0.0
234,VAT,Vatican City,Vatican City,Europe,510,520,564,596,651,700,733,752,1,510.0,0.998,0.0
";

    pub fn sample() -> Dataset {
        Dataset::from_reader(SAMPLE_CSV.as_bytes()).unwrap()
    }

    pub fn from_csv(csv: &str) -> Dataset {
        Dataset::from_reader(csv.as_bytes()).unwrap()
    }
}
