use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::data::Dataset;
use crate::selection::Selection;

pub fn export_filename(top_n: usize, year: u16) -> String {
    format!("top_{}_countries_{}.csv", top_n, year)
}

/// Writes the dataset header followed by the selected rows, in selection order.
pub fn write_csv<W: Write>(selection: &Selection, dataset: &Dataset, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(dataset.headers())?;
    for row in &selection.rows {
        wtr.write_record(row.record.cells())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Saves the selection as `top_<N>_countries_<year>.csv` inside `dir`.
pub fn save_selection(selection: &Selection, dataset: &Dataset, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {:?}", dir))?;
    let path = dir.join(export_filename(selection.top_n, selection.year));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create export file: {:?}", path))?;
    write_csv(selection, dataset, file)
        .with_context(|| format!("Failed to write export file: {:?}", path))?;
    info!(rows = selection.len(), "exported selection to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures;
    use crate::selection::select_top_n;

    #[test]
    fn filename_follows_download_pattern() {
        assert_eq!(export_filename(10, 2022), "top_10_countries_2022.csv");
        assert_eq!(export_filename(45, 1970), "top_45_countries_1970.csv");
    }

    #[test]
    fn csv_keeps_header_and_selection_order() {
        let ds = fixtures::sample();
        let sel = select_top_n(&ds, 2022, 3).unwrap();
        let mut out = Vec::new();
        write_csv(&sel, &ds, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], ds.headers().join(","));
        assert!(lines[1].starts_with("2,CHN,China,"));
        assert!(lines[2].starts_with("1,IND,India,"));
        assert!(lines[3].contains("\"Washington, D.C.\""));
    }

    #[test]
    fn empty_selection_writes_header_only() {
        let ds = fixtures::sample();
        let mut out = Vec::new();
        write_csv(&Selection::empty(1969, 10), &ds, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn save_creates_named_file() {
        let ds = fixtures::sample();
        let sel = select_top_n(&ds, 1990, 5).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = save_selection(&sel, &ds, &dir.path().join("exports")).unwrap();
        assert_eq!(path.file_name().unwrap(), "top_5_countries_1990.csv");
        let reloaded = Dataset::load(&path).unwrap();
        assert_eq!(reloaded.len(), 5);
        assert_eq!(reloaded.records()[0].name, "China");
    }
}
