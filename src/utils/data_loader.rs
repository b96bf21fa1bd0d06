//! SONAR dataset loading
//!
//! The canonical sonar CSV is headerless: 60 numeric band-energy columns
//! followed by a single `R`/`M` label column. The loader also accepts a
//! headered file that already uses `band_0`..`band_59` and `label` columns.

use crate::assessment::BAND_COUNT;
use crate::error::{Result, SonarError};
use polars::prelude::*;
use std::path::Path;

/// Name of the target column after loading
pub const LABEL_COLUMN: &str = "label";

/// Summary of a loaded sonar dataset
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub rows: usize,
    pub bands: usize,
    pub rocks: usize,
    pub mines: usize,
}

impl DatasetSummary {
    /// Compute a summary from a loaded frame
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let label = df
            .column(LABEL_COLUMN)
            .map_err(|_| SonarError::FeatureNotFound(LABEL_COLUMN.to_string()))?;
        let ca = label
            .f64()
            .map_err(|e| SonarError::DataError(e.to_string()))?;

        let mines = ca.into_iter().flatten().filter(|&v| v >= 0.5).count();
        let rocks = df.height() - mines;

        Ok(Self {
            rows: df.height(),
            bands: df.width().saturating_sub(1),
            rocks,
            mines,
        })
    }
}

/// Band column name for index `i`
pub fn band_name(i: usize) -> String {
    format!("band_{}", i)
}

/// All 60 band column names
pub fn band_names() -> Vec<String> {
    (0..BAND_COUNT).map(band_name).collect()
}

/// Load a sonar CSV into a DataFrame with `band_0`..`band_59` feature columns
/// and a numeric `label` column (0.0 = rock, 1.0 = mine).
pub fn load_sonar_csv(path: &Path) -> Result<DataFrame> {
    let df = read_csv(path, false)?;

    // A headered file read as headerless turns every column into strings;
    // re-read with the header row in that case.
    let df = if df.width() > 1 && df.dtypes().iter().take(df.width() - 1).all(is_numeric) {
        rename_positional_columns(df)?
    } else {
        read_csv(path, true)?
    };

    let df = encode_labels(df)?;
    validate_band_columns(&df)?;
    Ok(df)
}

fn read_csv(path: &Path, has_header: bool) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(has_header)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| SonarError::DataError(e.to_string()))?
        .finish()
        .map_err(|e| SonarError::DataError(e.to_string()))?;
    Ok(df)
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32
    )
}

/// Rename polars' positional `column_1`..`column_61` to band/label names
fn rename_positional_columns(mut df: DataFrame) -> Result<DataFrame> {
    let width = df.width();
    if width != BAND_COUNT + 1 {
        return Err(SonarError::ShapeError {
            expected: format!("{} columns (60 bands + label)", BAND_COUNT + 1),
            actual: format!("{} columns", width),
        });
    }

    for i in 0..BAND_COUNT {
        df.rename(&format!("column_{}", i + 1), band_name(i).into())
            .map_err(|e| SonarError::DataError(e.to_string()))?;
    }
    df.rename(&format!("column_{}", width), LABEL_COLUMN.into())
        .map_err(|e| SonarError::DataError(e.to_string()))?;

    Ok(df)
}

/// Map `R`/`M` string labels to 0.0/1.0; numeric labels pass through as f64
fn encode_labels(mut df: DataFrame) -> Result<DataFrame> {
    let label = df
        .column(LABEL_COLUMN)
        .map_err(|_| SonarError::FeatureNotFound(LABEL_COLUMN.to_string()))?;

    if label.dtype() == &DataType::String {
        let ca = label
            .str()
            .map_err(|e| SonarError::DataError(e.to_string()))?;

        let mut encoded = Vec::with_capacity(ca.len());
        for (row, value) in ca.into_iter().enumerate() {
            let code = match value.map(|s| s.trim()) {
                Some("R") | Some("r") => 0.0,
                Some("M") | Some("m") => 1.0,
                Some(other) => {
                    return Err(SonarError::DataError(format!(
                        "Row {}: unknown label '{}' (expected R or M)",
                        row, other
                    )));
                }
                None => {
                    return Err(SonarError::DataError(format!("Row {}: missing label", row)));
                }
            };
            encoded.push(code);
        }

        let series = Series::new(LABEL_COLUMN.into(), encoded);
        df.with_column(series)
            .map_err(|e| SonarError::DataError(e.to_string()))?;
    } else {
        let cast = label
            .cast(&DataType::Float64)
            .map_err(|e| SonarError::DataError(e.to_string()))?;
        df.with_column(cast.take_materialized_series())
            .map_err(|e| SonarError::DataError(e.to_string()))?;
    }

    Ok(df)
}

fn validate_band_columns(df: &DataFrame) -> Result<()> {
    for name in band_names() {
        if df.column(&name).is_err() {
            return Err(SonarError::FeatureNotFound(name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(tag: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sonar-loader-test-{}-{}.csv",
            std::process::id(),
            tag
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn headerless_rows(n_rock: usize, n_mine: usize) -> String {
        let mut out = String::new();
        for i in 0..(n_rock + n_mine) {
            let base = 0.01 + (i as f64) * 0.001;
            let row: Vec<String> = (0..BAND_COUNT).map(|b| format!("{:.4}", base + b as f64 * 0.001)).collect();
            let label = if i < n_rock { "R" } else { "M" };
            out.push_str(&format!("{},{}\n", row.join(","), label));
        }
        out
    }

    #[test]
    fn test_load_headerless_csv() {
        let path = write_temp_csv("headerless", &headerless_rows(3, 2));
        let df = load_sonar_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(df.height(), 5);
        assert_eq!(df.width(), BAND_COUNT + 1);
        assert!(df.column("band_0").is_ok());
        assert!(df.column("band_59").is_ok());

        let summary = DatasetSummary::from_frame(&df).unwrap();
        assert_eq!(summary.rocks, 3);
        assert_eq!(summary.mines, 2);
    }

    #[test]
    fn test_unknown_label_rejected() {
        let mut rows = headerless_rows(1, 1);
        rows = rows.replacen(",M\n", ",X\n", 1);
        let path = write_temp_csv("badlabel", &rows);
        let result = load_sonar_csv(&path);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_width_rejected() {
        let path = write_temp_csv("narrow", "0.1,0.2,R\n0.3,0.4,M\n");
        let result = load_sonar_csv(&path);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}
