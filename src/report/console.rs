//! Terminal output

use super::fmt_metric;
use crate::comparison::{ComparisonTable, FailedModel, ModelReport};
use crate::explore::EdaReport;
use crate::tuning::format_params;
use colored::*;
use std::fmt::Write;

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString { s.truecolor(230, 180, 80) }

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", title.white().bold());
    let _ = writeln!(out, "  {}", dim(&"─".repeat(64)));
}

fn kv(out: &mut String, key: &str, val: &str) {
    let _ = writeln!(out, "  {} {}", muted(&format!("{:<20}", key)), val.white());
}

/// Dataset overview, label balance and strongest quality correlations
pub fn render_eda(eda: &EdaReport) -> String {
    let mut out = String::new();
    section(&mut out, "Dataset");
    kv(&mut out, "samples", &eda.n_samples.to_string());
    kv(&mut out, "features", &eda.n_features.to_string());
    kv(&mut out, "label", &format!("quality >= {}", eda.label_threshold));
    kv(
        &mut out,
        "balance",
        &format!(
            "{} good / {} not good ({} positive)",
            eda.positives,
            eda.negatives,
            eda.positive_rate().map_or("—".to_string(), |r| format!("{:.1}%", r * 100.0))
        ),
    );
    for profile in &eda.by_origin {
        kv(
            &mut out,
            &format!("{} wines", profile.origin),
            &format!("{} ({} good)", profile.n_samples, profile.positives),
        );
    }

    section(&mut out, "Quality distribution");
    let max = eda.quality_counts.values().copied().max().unwrap_or(0).max(1);
    for (quality, count) in &eda.quality_counts {
        let bar = "█".repeat((count * 40).div_ceil(max));
        let _ = writeln!(out, "  {:>3} {:>6}  {}", quality, count, dim(&bar));
    }

    section(&mut out, "Correlation with quality");
    for corr in eda.correlations.iter().take(6) {
        let _ = writeln!(out, "  {:<24} {:>8}", corr.feature, fmt_metric(corr.r));
    }
    out
}

/// Confusion matrix and test metrics of one model
pub fn render_model(report: &ModelReport) -> String {
    let mut out = String::new();
    section(&mut out, &report.name);
    kv(&mut out, "best params", &format_params(&report.best_params));
    if let Some(cv) = &report.cv {
        kv(
            &mut out,
            &format!("cv {}", report.search.scoring),
            &format!("{:.4} ± {:.4} ({} folds)", cv.mean_score, cv.std_score, cv.n_folds),
        );
    }
    kv(
        &mut out,
        "search",
        &format!(
            "{} combinations, {} rows, {:.1}s",
            report.search.trials.len(),
            report.search.n_samples_searched,
            report.tuning_secs
        ),
    );

    let _ = writeln!(out);
    for line in report.metrics.confusion.to_string().lines() {
        let _ = writeln!(out, "  {}", line);
    }
    let _ = writeln!(out);

    let m = &report.metrics;
    for (name, value) in [
        ("accuracy", m.accuracy),
        ("precision", m.precision),
        ("recall", m.recall),
        ("specificity", m.specificity),
        ("f1", m.f1_score),
        ("roc auc", m.auc_roc),
        ("log loss", m.log_loss),
        ("brier", m.brier_score),
    ] {
        kv(&mut out, name, &fmt_metric(value));
    }

    if let Some(importances) = &report.feature_importances {
        let top: Vec<String> = importances
            .iter()
            .take(3)
            .map(|f| format!("{} ({:.3})", f.feature, f.importance))
            .collect();
        kv(&mut out, "top features", &top.join(", "));
    }
    out
}

/// Comparison table, best ROC-AUC first
pub fn render_comparison(table: &ComparisonTable) -> String {
    let mut out = String::new();
    section(&mut out, "Model comparison (test split)");
    let _ = writeln!(
        out,
        "  {}",
        muted(&format!(
            "{:<24} {:>8} {:>9} {:>8} {:>8} {:>8} {:>8}",
            "model", "accuracy", "precision", "recall", "f1", "roc auc", "cv"
        ))
    );
    for (i, row) in table.rows.iter().enumerate() {
        let line = format!(
            "{:<24} {:>8} {:>9} {:>8} {:>8} {:>8} {:>8}",
            row.model,
            fmt_metric(row.accuracy),
            fmt_metric(row.precision),
            fmt_metric(row.recall),
            fmt_metric(row.f1),
            fmt_metric(row.roc_auc),
            fmt_metric(row.cv_score),
        );
        if i == 0 && row.roc_auc.is_some() {
            let _ = writeln!(out, "  {}", line.white().bold());
        } else {
            let _ = writeln!(out, "  {}", line);
        }
    }

    if let Some(best) = table.best() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {} best model: {} (ROC AUC {})",
            ok("✓"),
            best.model.white().bold(),
            fmt_metric(best.roc_auc)
        );
    }
    out
}

pub fn print_eda(eda: &EdaReport) {
    print!("{}", render_eda(eda));
}

pub fn print_model(report: &ModelReport) {
    print!("{}", render_model(report));
}

pub fn print_comparison(table: &ComparisonTable) {
    print!("{}", render_comparison(table));
}

pub fn print_failures(failures: &[FailedModel]) {
    for failure in failures {
        println!("  {} {} failed: {}", warn("!"), failure.name, dim(&failure.error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::{ComparisonRow, ModelKind};

    #[test]
    fn test_comparison_lists_models_in_order() {
        colored::control::set_override(false);
        let row = |kind: ModelKind, auc| ComparisonRow {
            kind,
            model: kind.display_name().to_string(),
            accuracy: Some(0.8),
            precision: Some(0.8),
            recall: Some(0.8),
            f1: Some(0.8),
            roc_auc: auc,
            cv_score: None,
            fit_secs: 0.1,
        };
        let table = ComparisonTable {
            rows: vec![row(ModelKind::Svm, Some(0.88)), row(ModelKind::Knn, None)],
        };
        let text = render_comparison(&table);
        let svm = text.find("Support Vector Machine").unwrap();
        let knn = text.find("K-Nearest Neighbors").unwrap();
        assert!(svm < knn);
        assert!(text.contains("best model: Support Vector Machine (ROC AUC 0.8800)"));
        assert!(text.contains("—"));
    }
}
