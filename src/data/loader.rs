//! Semicolon-delimited wine file loading

use super::{Origin, WineDataset, DEFAULT_LABEL_THRESHOLD};
use crate::error::{Result, WineError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Physicochemical feature columns, in model order
pub const PHYSICOCHEMICAL_FEATURES: [&str; 11] = [
    "fixed acidity",
    "volatile acidity",
    "citric acid",
    "residual sugar",
    "chlorides",
    "free sulfur dioxide",
    "total sulfur dioxide",
    "density",
    "pH",
    "sulphates",
    "alcohol",
];

/// Quality score column
pub const QUALITY_COLUMN: &str = "quality";

/// Canonical form used to match header names: lower case, `_`/`.` as spaces,
/// surrounding quotes and whitespace removed.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim()
        .to_lowercase()
        .replace(['_', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Guess the delimiter from the header line (`;` when present, else `,`)
pub fn detect_separator(path: &Path) -> Result<u8> {
    let file = File::open(path)
        .map_err(|e| WineError::DataError(format!("{}: {}", path.display(), e)))?;
    let mut header = String::new();
    BufReader::new(file).read_line(&mut header)?;

    Ok(if header.contains(';') {
        b';'
    } else if header.contains('\t') {
        b'\t'
    } else {
        b','
    })
}

/// Loader for the red/white wine-quality files
#[derive(Debug, Clone)]
pub struct WineLoader {
    /// Fixed delimiter; detected per file when unset
    separator: Option<u8>,
    label_threshold: f64,
    include_origin: bool,
}

impl Default for WineLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl WineLoader {
    pub fn new() -> Self {
        Self {
            separator: None,
            label_threshold: DEFAULT_LABEL_THRESHOLD,
            include_origin: true,
        }
    }

    /// Use a fixed field delimiter instead of detecting it per file
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Set the quality threshold for the positive label
    pub fn with_label_threshold(mut self, threshold: f64) -> Self {
        self.label_threshold = threshold;
        self
    }

    /// Whether to append the red/white flag as a model feature
    pub fn with_include_origin(mut self, include: bool) -> Self {
        self.include_origin = include;
        self
    }

    /// Read a delimited file with a header into a DataFrame.
    ///
    /// Every column is read as text; numeric conversion happens per cell in
    /// [`frame_to_dataset`](Self::frame_to_dataset) so one bad cell drops one row.
    pub fn load_frame(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(WineError::DataError(format!("file not found: {}", path.display())));
        }

        let separator = match self.separator {
            Some(separator) => separator,
            None => detect_separator(path)?,
        };
        let parse_opts = CsvParseOptions::default().with_separator(separator);

        // schema length 0: all columns as String
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Read delimited file");
        Ok(df)
    }

    /// Load one file, tagging every row with `origin`. Incomplete rows are dropped.
    pub fn load_origin(&self, path: &Path, origin: Origin) -> Result<WineDataset> {
        let df = self.load_frame(path)?;
        let dataset = self.frame_to_dataset(&df, origin)?;
        info!(
            path = %path.display(),
            origin = %origin,
            rows = dataset.n_samples(),
            "Loaded wine samples"
        );
        Ok(dataset)
    }

    /// Load the red and white files and stack them (red rows first)
    pub fn load_pair(&self, red: &Path, white: &Path) -> Result<WineDataset> {
        let red_ds = self.load_origin(red, Origin::Red)?;
        let white_ds = self.load_origin(white, Origin::White)?;
        let combined = red_ds.concat(&white_ds)?;

        let combined = if self.include_origin {
            combined.with_origin_feature()?
        } else {
            combined
        };

        let (neg, pos) = combined.class_balance();
        info!(
            rows = combined.n_samples(),
            features = combined.n_features(),
            positives = pos,
            negatives = neg,
            threshold = self.label_threshold,
            "Combined wine dataset"
        );
        Ok(combined)
    }

    /// Convert a DataFrame holding the wine columns into a dataset
    pub fn frame_to_dataset(&self, df: &DataFrame, origin: Origin) -> Result<WineDataset> {
        let feature_cols: Vec<String> = PHYSICOCHEMICAL_FEATURES
            .iter()
            .map(|name| resolve_column(df, name))
            .collect::<Result<Vec<_>>>()?;
        let quality_col = resolve_column(df, QUALITY_COLUMN)?;

        let columns: Vec<Vec<Option<f64>>> = feature_cols
            .iter()
            .map(|name| column_values(df, name))
            .collect::<Result<Vec<_>>>()?;
        let quality_values = column_values(df, &quality_col)?;

        let n_rows = df.height();
        let n_cols = columns.len();
        let mut flat = Vec::with_capacity(n_rows * n_cols);
        let mut quality = Vec::with_capacity(n_rows);
        let mut dropped = 0usize;

        for row in 0..n_rows {
            let q = match quality_values[row] {
                Some(q) if q.is_finite() => q,
                _ => {
                    dropped += 1;
                    continue;
                }
            };
            let values: Option<Vec<f64>> = columns
                .iter()
                .map(|c| c[row].filter(|v| v.is_finite()))
                .collect();
            match values {
                Some(values) => {
                    flat.extend(values);
                    quality.push(q);
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(origin = %origin, dropped, "Dropped rows with missing or non-numeric values");
        }

        let n_kept = quality.len();
        let features = Array2::from_shape_vec((n_kept, n_cols), flat)?;
        let names = PHYSICOCHEMICAL_FEATURES.iter().map(|s| s.to_string()).collect();

        WineDataset::new(
            features,
            Array1::from_vec(quality),
            vec![origin; n_kept],
            names,
            self.label_threshold,
        )
    }
}

/// Find the actual header matching a canonical column name
fn resolve_column(df: &DataFrame, wanted: &str) -> Result<String> {
    let target = normalize_column_name(wanted);
    df.get_column_names()
        .into_iter()
        .find(|name| normalize_column_name(name.as_str()) == target)
        .map(|name| name.to_string())
        .ok_or_else(|| WineError::FeatureNotFound(wanted.to_string()))
}

/// Column as `f64` values; cells that fail to parse become `None`
fn column_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| WineError::FeatureNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| WineError::DataError(e.to_string()))?;
    let values = casted
        .as_materialized_series()
        .f64()
        .map_err(|e| WineError::DataError(e.to_string()))?
        .into_iter()
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "\"fixed acidity\";\"volatile acidity\";\"citric acid\";\"residual sugar\";\"chlorides\";\"free sulfur dioxide\";\"total sulfur dioxide\";\"density\";\"pH\";\"sulphates\";\"alcohol\";\"quality\"";

    fn write_file(dir: &tempfile::TempDir, name: &str, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        writeln!(f, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(f, "{}", row).unwrap();
        }
        path
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("\"fixed acidity\""), "fixed acidity");
        assert_eq!(normalize_column_name("fixed_acidity"), "fixed acidity");
        assert_eq!(normalize_column_name("Fixed.Acidity "), "fixed acidity");
        assert_eq!(normalize_column_name("pH"), "ph");
    }

    #[test]
    fn test_load_origin_drops_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "red.csv",
            &[
                "7.4;0.7;0;1.9;0.076;11;34;0.9978;3.51;0.56;9.4;5",
                "7.8;0.88;0;2.6;0.098;25;67;0.9968;3.2;0.68;9.8;6",
                "7.8;;0.04;2.3;0.092;15;54;0.997;3.26;0.65;9.8;5",
            ],
        );

        let ds = WineLoader::new().load_origin(&path, Origin::Red).unwrap();
        assert_eq!(ds.n_samples(), 2);
        assert_eq!(ds.n_features(), 11);
        assert_eq!(ds.labels.to_vec(), vec![0.0, 1.0]);
        assert!((ds.features[[1, 10]] - 9.8).abs() < 1e-12);
    }

    #[test]
    fn test_bad_cell_after_many_rows_is_dropped() {
        let valid = "6.3;0.3;0.34;1.6;0.049;14;132;0.994;3.3;0.49;9.5;6";
        let mut rows = vec![valid; 1200];
        rows.push("7;0.27;0.36;20.7;0.045;45;170;1.001;3;0.45;abc;6");
        rows.push("7.2;0.23;0.32;8.5;0.058;47;186;0.9956;3.19;0.4;9.9;5");

        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "white.csv", &rows);
        let ds = WineLoader::new().load_origin(&path, Origin::White).unwrap();
        assert_eq!(ds.n_samples(), 1201);
        assert_eq!(ds.quality[1200], 5.0);
    }

    #[test]
    fn test_load_pair_appends_origin() {
        let dir = tempfile::tempdir().unwrap();
        let red = write_file(&dir, "red.csv", &["7.4;0.7;0;1.9;0.076;11;34;0.9978;3.51;0.56;9.4;5"]);
        let white = write_file(
            &dir,
            "white.csv",
            &[
                "7;0.27;0.36;20.7;0.045;45;170;1.001;3;0.45;8.8;6",
                "6.3;0.3;0.34;1.6;0.049;14;132;0.994;3.3;0.49;9.5;6",
            ],
        );

        let ds = WineLoader::new().load_pair(&red, &white).unwrap();
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.n_features(), 12);
        assert_eq!(ds.features.column(11).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(ds.origins[0], Origin::Red);
    }

    #[test]
    fn test_pair_detects_delimiter_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let red = write_file(&dir, "red.csv", &["7.4;0.7;0;1.9;0.076;11;34;0.9978;3.51;0.56;9.4;5"]);
        let white = dir.path().join("white.csv");
        std::fs::write(
            &white,
            format!("{}\n7;0.27;0.36;20.7;0.045;45;170;1.001;3;0.45;8.8;6\n", HEADER).replace(';', ","),
        )
        .unwrap();

        let ds = WineLoader::new().load_pair(&red, &white).unwrap();
        assert_eq!(ds.n_samples(), 2);
        assert_eq!(ds.origins, vec![Origin::Red, Origin::White]);
        assert!((ds.features[[1, 3]] - 20.7).abs() < 1e-12);
    }

    #[test]
    fn test_missing_column_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a;b\n1;2\n").unwrap();

        let err = WineLoader::new().load_origin(&path, Origin::White);
        assert!(matches!(err, Err(WineError::FeatureNotFound(_))));
    }

    #[test]
    fn test_detect_separator() {
        let dir = tempfile::tempdir().unwrap();
        let semi = write_file(&dir, "s.csv", &[]);
        assert_eq!(detect_separator(&semi).unwrap(), b';');

        let comma = dir.path().join("c.csv");
        std::fs::write(&comma, "a,b\n1,2\n").unwrap();
        assert_eq!(detect_separator(&comma).unwrap(), b',');
    }
}
