use tracing::debug;

use crate::data::{CountryRecord, Dataset, WORLD_SHARE_COLUMN, population_column};
use crate::error::MissingColumn;

/// A selected country together with its hover metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedCountry {
    pub record: CountryRecord,
    /// Value of the year-population column the selection was ranked by.
    pub value: f64,
    pub world_share: Option<f64>,
}

/// Top-N countries for one census year, largest population first.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub year: u16,
    pub top_n: usize,
    pub column: String,
    pub rows: Vec<SelectedCountry>,
}

impl Selection {
    pub fn empty(year: u16, top_n: usize) -> Self {
        Self {
            year,
            top_n,
            column: population_column(year),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn title(&self) -> String {
        format!("Top {} Countries by Population in {}", self.top_n, self.year)
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.value).sum()
    }

    /// Rows ordered for the bar presentation. Selections are built in this
    /// order already; the stable sort keeps ties where they were.
    pub fn sorted_desc(&self) -> Vec<&SelectedCountry> {
        let mut rows: Vec<&SelectedCountry> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.value.total_cmp(&a.value));
        rows
    }
}

/// Picks the `top_n` records with the largest `"<year> Population"` value.
///
/// Rows without a value for that year are skipped. Equal values keep their
/// dataset order. The dataset is never modified.
pub fn select_top_n(dataset: &Dataset, year: u16, top_n: usize) -> Result<Selection, MissingColumn> {
    let column = population_column(year);
    let idx = dataset.column_index(&column)?;
    let share_idx = dataset.column_index(WORLD_SHARE_COLUMN).ok();

    let mut ranked: Vec<(&CountryRecord, f64)> = dataset
        .records()
        .iter()
        .filter_map(|r| r.number(idx).map(|v| (r, v)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_n);

    let rows = ranked
        .into_iter()
        .map(|(record, value)| SelectedCountry {
            record: record.clone(),
            value,
            world_share: share_idx.and_then(|i| record.number(i)),
        })
        .collect::<Vec<_>>();

    debug!(year, top_n, selected = rows.len(), "top-n selection");
    Ok(Selection { year, top_n, column, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Year, fixtures};

    fn names(sel: &Selection) -> Vec<&str> {
        sel.rows.iter().map(|r| r.record.name.as_str()).collect()
    }

    #[test]
    fn top_one_in_2022_is_china() {
        let ds = fixtures::sample();
        let sel = select_top_n(&ds, 2022, 1).unwrap();
        assert_eq!(names(&sel), vec!["China"]);
        assert_eq!(sel.rows[0].value, 1_425_887_337.0);
        assert_eq!(sel.rows[0].world_share, Some(17.88));
    }

    #[test]
    fn unsupported_year_is_missing_column() {
        let ds = fixtures::sample();
        let err = select_top_n(&ds, 1969, 10).unwrap_err();
        assert_eq!(err.column, "1969 Population");
        assert!(Selection::empty(1969, 10).is_empty());
    }

    #[test]
    fn length_is_bounded_by_available_rows() {
        let ds = fixtures::sample();
        for year in Year::ALL {
            let available = ds.values(&year.column_name()).unwrap().len();
            for top_n in (5..=50).step_by(5) {
                let sel = select_top_n(&ds, year.value(), top_n).unwrap();
                assert_eq!(sel.len(), top_n.min(available), "{year} top {top_n}");
            }
        }
    }

    #[test]
    fn rows_are_descending() {
        let ds = fixtures::sample();
        for year in Year::ALL {
            let sel = select_top_n(&ds, year.value(), 50).unwrap();
            assert!(sel.rows.windows(2).all(|w| w[0].value >= w[1].value));
        }
    }

    #[test]
    fn missing_values_are_skipped() {
        let ds = fixtures::sample();
        let sel = select_top_n(&ds, 1970, 50).unwrap();
        assert!(!names(&sel).contains(&"Indonesia"));
        assert_eq!(sel.len(), 7);
    }

    #[test]
    fn ties_keep_dataset_order() {
        let ds = fixtures::from_csv(
            "CCA3,Country/Territory,2022 Population\n\
             AAA,First,100\n\
             BBB,Second,300\n\
             CCC,Third,100\n\
             DDD,Fourth,100\n",
        );
        let sel = select_top_n(&ds, 2022, 3).unwrap();
        assert_eq!(names(&sel), vec!["Second", "First", "Third"]);
        let bar: Vec<&str> = sel.sorted_desc().iter().map(|r| r.record.name.as_str()).collect();
        assert_eq!(bar, names(&sel));
    }

    #[test]
    fn unnamed_rows_still_rank() {
        let ds = fixtures::from_csv("CCA3,Country/Territory,2022 Population\n,,5\nZZZ,Z,6\n");
        let sel = select_top_n(&ds, 2022, 5).unwrap();
        assert_eq!(names(&sel), vec!["Z", ""]);
    }

    #[test]
    fn selection_is_repeatable() {
        let ds = fixtures::sample();
        let first = select_top_n(&ds, 2010, 5).unwrap();
        let second = select_top_n(&ds, 2010, 5).unwrap();
        assert_eq!(first, second);
        assert_eq!(ds.len(), 8);
    }

    #[test]
    fn title_names_count_and_year() {
        let ds = fixtures::sample();
        let sel = select_top_n(&ds, 2000, 10).unwrap();
        assert_eq!(sel.title(), "Top 10 Countries by Population in 2000");
        assert_eq!(sel.column, "2000 Population");
    }
}
