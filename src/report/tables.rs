//! CSV and JSON exports

use crate::comparison::{ComparisonTable, StudyReport};
use crate::error::Result;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Comparison table as a DataFrame; undefined metrics are null
pub fn comparison_frame(table: &ComparisonTable) -> Result<DataFrame> {
    let rows = &table.rows;
    let df = df!(
        "model" => rows.iter().map(|r| r.model.clone()).collect::<Vec<_>>(),
        "accuracy" => rows.iter().map(|r| r.accuracy).collect::<Vec<_>>(),
        "precision" => rows.iter().map(|r| r.precision).collect::<Vec<_>>(),
        "recall" => rows.iter().map(|r| r.recall).collect::<Vec<_>>(),
        "f1" => rows.iter().map(|r| r.f1).collect::<Vec<_>>(),
        "roc_auc" => rows.iter().map(|r| r.roc_auc).collect::<Vec<_>>(),
        "cv_score" => rows.iter().map(|r| r.cv_score).collect::<Vec<_>>(),
        "fit_secs" => rows.iter().map(|r| r.fit_secs).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

/// Write the comparison table as CSV
pub fn write_comparison_csv(table: &ComparisonTable, path: &Path) -> Result<()> {
    let mut df = comparison_frame(table)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(())
}

/// Write the full study report as pretty JSON
pub fn write_json(report: &StudyReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
