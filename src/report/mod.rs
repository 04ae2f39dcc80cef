//! Study output
//!
//! Console rendering plus the files written under the output directory:
//! `comparison.csv`, `comparison.json`, `roc.svg` and `report.md`.

mod console;
mod markdown;
mod plot;
mod tables;

pub use console::{
    print_comparison, print_eda, print_failures, print_model, render_comparison, render_eda, render_model,
};
pub use markdown::render_markdown;
pub use plot::plot_roc_curves;
pub use tables::{comparison_frame, write_comparison_csv, write_json};

use crate::comparison::StudyReport;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CSV_FILE: &str = "comparison.csv";
pub const JSON_FILE: &str = "comparison.json";
pub const ROC_FILE: &str = "roc.svg";
pub const MARKDOWN_FILE: &str = "report.md";

/// Format an optional metric, `—` when undefined
pub fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "—".to_string(),
    }
}

/// Paths of the files written for one study
#[derive(Debug, Clone)]
pub struct ReportFiles {
    pub csv: PathBuf,
    pub json: PathBuf,
    pub roc: Option<PathBuf>,
    pub markdown: PathBuf,
}

/// Write every report file into `dir`, creating it if missing.
///
/// The ROC figure is skipped when no model produced a curve.
pub fn write_all(report: &StudyReport, dir: &Path) -> Result<ReportFiles> {
    std::fs::create_dir_all(dir)?;

    let csv = dir.join(CSV_FILE);
    write_comparison_csv(&report.table, &csv)?;

    let json = dir.join(JSON_FILE);
    write_json(report, &json)?;

    let roc = if report.models.iter().any(|m| m.roc.is_some()) {
        let path = dir.join(ROC_FILE);
        plot_roc_curves(&report.models, &path)?;
        Some(path)
    } else {
        None
    };

    let markdown = dir.join(MARKDOWN_FILE);
    std::fs::write(&markdown, render_markdown(report, roc.as_ref().map(|_| ROC_FILE)))?;

    info!(dir = %dir.display(), "Wrote report files");
    Ok(ReportFiles { csv, json, roc, markdown })
}
